//! Camera and face detector capabilities.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::frame::{FaceBox, Frame};

/// Vision boundary errors.
#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Camera unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Camera is not open")]
    NotOpen,

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Detector error: {0}")]
    Detector(String),

    #[error("Display error: {0}")]
    Display(String),
}

pub type VisionResult<T> = Result<T, VisionError>;

/// A located face together with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub face: FaceBox,
    pub embedding: Vec<f64>,
}

/// A camera or any other producer of frames.
///
/// `read` returns `Ok(None)` when the device is open but produced no frame.
pub trait FrameSource {
    fn open(&mut self) -> VisionResult<()>;

    fn read(&mut self) -> VisionResult<Option<Frame>>;

    fn release(&mut self);

    fn is_open(&self) -> bool;
}

/// Face detection and embedding model.
pub trait FaceDetector {
    /// Bounding boxes of every face in the frame (possibly none).
    fn locate(&mut self, frame: &Frame) -> VisionResult<Vec<FaceBox>>;

    /// One embedding per box, in the same order.
    fn encode(&mut self, frame: &Frame, faces: &[FaceBox]) -> VisionResult<Vec<Vec<f64>>>;

    /// Locate and encode in one pass.
    fn detect(&mut self, frame: &Frame) -> VisionResult<Vec<Detection>> {
        let faces = self.locate(frame)?;
        if faces.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = self.encode(frame, &faces)?;
        if embeddings.len() != faces.len() {
            return Err(VisionError::Detector(format!(
                "detector returned {} embeddings for {} faces",
                embeddings.len(),
                faces.len()
            )));
        }

        Ok(faces
            .into_iter()
            .zip(embeddings)
            .map(|(face, embedding)| Detection { face, embedding })
            .collect())
    }
}

impl<T: FrameSource + ?Sized> FrameSource for &mut T {
    fn open(&mut self) -> VisionResult<()> {
        (**self).open()
    }

    fn read(&mut self) -> VisionResult<Option<Frame>> {
        (**self).read()
    }

    fn release(&mut self) {
        (**self).release()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}

/// Opened camera that is released when dropped, on every exit path.
pub struct CameraGuard<S: FrameSource> {
    source: S,
}

impl<S: FrameSource> CameraGuard<S> {
    /// Open the source, failing with `DeviceUnavailable` if it cannot be opened.
    pub fn open(mut source: S) -> VisionResult<Self> {
        match source.open() {
            Ok(()) => {
                log::info!("Camera opened");
                Ok(Self { source })
            }
            Err(VisionError::DeviceUnavailable(msg)) => {
                source.release();
                Err(VisionError::DeviceUnavailable(msg))
            }
            Err(e) => {
                source.release();
                Err(VisionError::DeviceUnavailable(e.to_string()))
            }
        }
    }

    pub fn read(&mut self) -> VisionResult<Option<Frame>> {
        self.source.read()
    }
}

impl<S: FrameSource> Drop for CameraGuard<S> {
    fn drop(&mut self) {
        self.source.release();
        log::info!("Camera released");
    }
}

//! Scripted camera and detector for running the kiosk without hardware.

use std::collections::VecDeque;

use crate::detector::{Detection, FaceDetector, FrameSource, VisionError, VisionResult};
use crate::frame::{FaceBox, Frame};

/// Camera that replays a fixed queue of reads.
///
/// Each queued entry is one `read()`: `Some(frame)` delivers a frame, `None`
/// simulates a failed grab. Once the queue is drained, reads return `None`.
#[derive(Debug, Default)]
pub struct ScriptedCamera {
    reads: VecDeque<Option<Frame>>,
    fail_open: bool,
    open: bool,
    open_count: usize,
    release_count: usize,
}

impl ScriptedCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// A camera whose `open()` always fails (device busy or absent).
    pub fn unavailable() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }

    /// Queue `count` copies of `frame`.
    pub fn with_frames(frame: Frame, count: usize) -> Self {
        let mut camera = Self::new();
        for _ in 0..count {
            camera.push_frame(frame.clone());
        }
        camera
    }

    pub fn push_frame(&mut self, frame: Frame) {
        self.reads.push_back(Some(frame));
    }

    pub fn push_failed_read(&mut self) {
        self.reads.push_back(None);
    }

    pub fn remaining(&self) -> usize {
        self.reads.len()
    }

    pub fn open_count(&self) -> usize {
        self.open_count
    }

    pub fn release_count(&self) -> usize {
        self.release_count
    }
}

impl FrameSource for ScriptedCamera {
    fn open(&mut self) -> VisionResult<()> {
        if self.fail_open {
            return Err(VisionError::DeviceUnavailable(
                "scripted camera configured to fail".into(),
            ));
        }
        self.open = true;
        self.open_count += 1;
        Ok(())
    }

    fn read(&mut self) -> VisionResult<Option<Frame>> {
        if !self.open {
            return Err(VisionError::NotOpen);
        }
        Ok(self.reads.pop_front().flatten())
    }

    fn release(&mut self) {
        self.open = false;
        self.release_count += 1;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

/// Detector that answers each `locate` call with the next queued response.
///
/// Responses are expressed in coordinates of the frame the detector is given.
/// When the queue is empty, no faces are found.
#[derive(Debug, Default)]
pub struct ScriptedDetector {
    responses: VecDeque<Vec<Detection>>,
    pending: Vec<Detection>,
    calls: usize,
}

impl ScriptedDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the detections for the next frame.
    pub fn push_response(&mut self, detections: Vec<Detection>) {
        self.responses.push_back(detections);
    }

    /// Queue a frame with exactly one face.
    pub fn push_single(&mut self, face: FaceBox, embedding: Vec<f64>) {
        self.push_response(vec![Detection { face, embedding }]);
    }

    /// Queue a frame with no faces.
    pub fn push_empty(&mut self) {
        self.push_response(Vec::new());
    }

    /// Number of frames the detector has been asked to locate faces in.
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl FaceDetector for ScriptedDetector {
    fn locate(&mut self, _frame: &Frame) -> VisionResult<Vec<FaceBox>> {
        self.calls += 1;
        self.pending = self.responses.pop_front().unwrap_or_default();
        Ok(self.pending.iter().map(|d| d.face).collect())
    }

    fn encode(&mut self, _frame: &Frame, faces: &[FaceBox]) -> VisionResult<Vec<Vec<f64>>> {
        faces
            .iter()
            .map(|face| {
                self.pending
                    .iter()
                    .find(|d| d.face == *face)
                    .map(|d| d.embedding.clone())
                    .ok_or_else(|| {
                        VisionError::Detector(format!("no scripted embedding for {:?}", face))
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::CameraGuard;

    #[test]
    fn test_camera_read_requires_open() {
        let mut camera = ScriptedCamera::with_frames(Frame::blank(4, 4), 1);
        assert!(matches!(camera.read(), Err(VisionError::NotOpen)));
        camera.open().unwrap();
        assert!(camera.read().unwrap().is_some());
        assert!(camera.read().unwrap().is_none());
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let mut camera = ScriptedCamera::with_frames(Frame::blank(4, 4), 2);
        {
            let mut guard = CameraGuard::open(&mut camera).unwrap();
            assert!(guard.read().unwrap().is_some());
        }
        assert_eq!(camera.open_count(), 1);
        assert_eq!(camera.release_count(), 1);
        assert!(!camera.is_open());
    }

    #[test]
    fn test_guard_open_failure_is_device_unavailable() {
        let mut camera = ScriptedCamera::unavailable();
        let result = CameraGuard::open(&mut camera);
        assert!(matches!(result, Err(VisionError::DeviceUnavailable(_))));
        drop(result);
        assert!(!camera.is_open());
    }

    #[test]
    fn test_detector_replays_responses() {
        let mut detector = ScriptedDetector::new();
        let face = FaceBox::new(1, 5, 5, 1);
        detector.push_single(face, vec![0.5, 0.5]);
        detector.push_empty();

        let frame = Frame::blank(8, 8);
        let first = detector.detect(&frame).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].embedding, vec![0.5, 0.5]);

        assert!(detector.detect(&frame).unwrap().is_empty());
        // Exhausted queue means no faces
        assert!(detector.detect(&frame).unwrap().is_empty());
        assert_eq!(detector.calls(), 3);
    }
}

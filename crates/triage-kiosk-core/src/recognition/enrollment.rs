//! Enrollment: capture several clean single-face frames and reduce them to
//! one mean embedding.
//!
//! ```text
//! AwaitingCapture → Evaluating → Accepted ─┐
//!        ▲                  └──→ Retry  ───┤
//!        └─────────────────────────────────┘
//!                 (target reached or attempts spent)
//!                      → Averaging → Done | Failed
//! ```

use std::path::{Path, PathBuf};

use triage_kiosk_vision::{CameraGuard, FaceDetector, Frame, FrameSource};

use super::{mean_vector, RecognitionError, RecognitionResult};
use crate::config::EnrollmentConfig;

/// Where a session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentState {
    AwaitingCapture,
    Evaluating,
    Accepted,
    Retry,
    Averaging,
    Done,
    Failed,
}

impl EnrollmentState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, EnrollmentState::Done | EnrollmentState::Failed)
    }
}

/// Receives the full-resolution frame of every accepted capture.
pub trait CaptureArtifactSink {
    fn store(&mut self, identifier: &str, sequence: usize, frame: &Frame) -> std::io::Result<()>;
}

/// Writes captures as `<root>/<identifier>/<identifier>_<n>.ppm`.
#[derive(Debug, Clone)]
pub struct DirectoryArtifactSink {
    root: PathBuf,
}

impl DirectoryArtifactSink {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, identifier: &str, sequence: usize) -> PathBuf {
        self.root
            .join(identifier)
            .join(format!("{}_{}.ppm", identifier, sequence))
    }
}

impl CaptureArtifactSink for DirectoryArtifactSink {
    fn store(&mut self, identifier: &str, sequence: usize, frame: &Frame) -> std::io::Result<()> {
        let path = self.path_for(identifier, sequence);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, frame.to_ppm())?;
        log::debug!("Saved capture {}", path.display());
        Ok(())
    }
}

/// Result of a completed session.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrollmentOutcome {
    pub identifier: String,
    pub mean: Vec<f64>,
    pub captures: usize,
    pub attempts: usize,
}

/// One enrollment run for a single identifier.
#[derive(Debug)]
pub struct EnrollmentSession {
    identifier: String,
    target: usize,
    max_attempts: usize,
    min_captures: usize,
    frame_scale: f64,
    state: EnrollmentState,
    attempts: usize,
    captures: Vec<Vec<f64>>,
    mean: Option<Vec<f64>>,
}

impl EnrollmentSession {
    pub fn new(identifier: &str, config: &EnrollmentConfig, frame_scale: f64) -> Self {
        Self {
            identifier: identifier.to_string(),
            target: config.captures,
            max_attempts: config.max_attempts,
            min_captures: config.min_captures,
            frame_scale,
            state: EnrollmentState::AwaitingCapture,
            attempts: 0,
            captures: Vec::new(),
            mean: None,
        }
    }

    pub fn state(&self) -> EnrollmentState {
        self.state
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }

    pub fn captured(&self) -> usize {
        self.captures.len()
    }

    /// Advance by one transition.
    ///
    /// Each capture attempt reads one frame. Detector failures propagate;
    /// camera read failures and ambiguous frames become `Retry`.
    pub fn step<S, D, A>(
        &mut self,
        camera: &mut CameraGuard<S>,
        detector: &mut D,
        sink: &mut A,
    ) -> RecognitionResult<EnrollmentState>
    where
        S: FrameSource,
        D: FaceDetector + ?Sized,
        A: CaptureArtifactSink + ?Sized,
    {
        if self.state.is_terminal() {
            return Ok(self.state);
        }

        if self.captures.len() >= self.target || self.attempts >= self.max_attempts {
            return self.finish();
        }

        self.state = EnrollmentState::AwaitingCapture;
        self.attempts += 1;

        let frame = match camera.read() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                log::warn!("Failed to grab frame. Retrying...");
                self.state = EnrollmentState::Retry;
                return Ok(self.state);
            }
            Err(e) => {
                log::warn!("Failed to grab frame: {}. Retrying...", e);
                self.state = EnrollmentState::Retry;
                return Ok(self.state);
            }
        };

        self.state = EnrollmentState::Evaluating;
        let small = frame.downscale(self.frame_scale);
        let mut detections = detector.detect(&small)?;

        if detections.len() != 1 {
            log::debug!(
                "Attempt {}: {} faces in frame, need exactly one",
                self.attempts,
                detections.len()
            );
            self.state = EnrollmentState::Retry;
            return Ok(self.state);
        }

        let detection = detections.remove(0);
        self.captures.push(detection.embedding);
        let sequence = self.captures.len();

        if let Err(e) = sink.store(&self.identifier, sequence, &frame) {
            log::warn!(
                "Could not save capture {} for {}: {}",
                sequence,
                self.identifier,
                e
            );
        }

        log::info!(
            "Captured image {}/{} for {}",
            sequence,
            self.target,
            self.identifier
        );
        self.state = EnrollmentState::Accepted;
        Ok(self.state)
    }

    /// Run to a terminal state.
    pub fn run<S, D, A>(
        mut self,
        camera: &mut CameraGuard<S>,
        detector: &mut D,
        sink: &mut A,
    ) -> RecognitionResult<EnrollmentOutcome>
    where
        S: FrameSource,
        D: FaceDetector + ?Sized,
        A: CaptureArtifactSink + ?Sized,
    {
        log::info!(
            "Starting capture for {}. Look directly at the camera.",
            self.identifier
        );

        while !self.step(camera, detector, sink)?.is_terminal() {}

        match (self.state, self.mean.take()) {
            (EnrollmentState::Done, Some(mean)) => Ok(EnrollmentOutcome {
                identifier: self.identifier,
                mean,
                captures: self.captures.len(),
                attempts: self.attempts,
            }),
            _ => Err(RecognitionError::EnrollmentFailed {
                name: self.identifier,
                reason: format!(
                    "only {} of {} captures after {} attempts",
                    self.captures.len(),
                    self.target,
                    self.attempts
                ),
            }),
        }
    }

    fn finish(&mut self) -> RecognitionResult<EnrollmentState> {
        if self.captures.len() < self.min_captures {
            log::error!(
                "Enrollment for {} failed: {} usable captures in {} attempts",
                self.identifier,
                self.captures.len(),
                self.attempts
            );
            self.state = EnrollmentState::Failed;
            return Ok(self.state);
        }

        if self.captures.len() < self.target {
            log::warn!(
                "Attempts exhausted for {}; averaging {} of {} captures",
                self.identifier,
                self.captures.len(),
                self.target
            );
        }

        self.state = EnrollmentState::Averaging;
        match mean_vector(&self.captures) {
            Ok(mean) => {
                self.mean = Some(mean);
                self.state = EnrollmentState::Done;
                Ok(self.state)
            }
            Err(e) => {
                self.state = EnrollmentState::Failed;
                Err(e)
            }
        }
    }
}

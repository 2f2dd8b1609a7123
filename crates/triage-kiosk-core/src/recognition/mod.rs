//! Face recognition and record correlation.
//!
//! Pipeline per frame: Downscale → Detect → Match → Correlate → Render panel
//!
//! Enrollment runs the same detector over a short burst of frames and stores
//! one mean embedding per patient.

mod correlation;
mod enrollment;
mod monitor;
mod panel;
mod vector_store;

pub use correlation::*;
pub use enrollment::*;
pub use monitor::*;
pub use panel::*;
pub use vector_store::*;

use thiserror::Error;
use triage_kiosk_vision::VisionError;

/// Recognition errors.
#[derive(Error, Debug)]
pub enum RecognitionError {
    #[error("Database error: {0}")]
    Database(#[from] crate::db::DbError),

    #[error("Vision error: {0}")]
    Vision(#[from] VisionError),

    #[error("Cannot enroll without capture vectors")]
    EmptyEnrollment,

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Enrollment failed for '{name}': {reason}")]
    EnrollmentFailed { name: String, reason: String },

    #[error("Could not write capture artifact: {0}")]
    Artifact(#[from] std::io::Error),
}

pub type RecognitionResult<T> = Result<T, RecognitionError>;

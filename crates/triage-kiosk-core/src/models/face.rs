//! Face identity models.

use serde::{Deserialize, Serialize};

use super::patient::UNKNOWN_IDENTITY;

/// An enrolled face: one mean embedding per patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FaceEncoding {
    pub name: String,
    pub vector: Vec<f64>,
}

/// Result of matching a query embedding against the enrolled faces.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Identity {
    /// Closest enrolled face within tolerance
    Known { name: String, distance: f64 },
    /// Nothing within tolerance (or nothing enrolled)
    Unknown,
}

impl Identity {
    /// Label to display; "Unknown" for unmatched faces.
    pub fn label(&self) -> &str {
        match self {
            Identity::Known { name, .. } => name.as_str(),
            Identity::Unknown => UNKNOWN_IDENTITY,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Identity::Known { .. })
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Identity::Known { name, .. } => Some(name.as_str()),
            Identity::Unknown => None,
        }
    }
}

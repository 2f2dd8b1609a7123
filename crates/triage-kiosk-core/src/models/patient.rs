//! Patient models.

use serde::{Deserialize, Serialize};

/// Identity shown when no enrolled face matches.
pub const UNKNOWN_IDENTITY: &str = "Unknown";

/// Allergy values (upper-cased) that mean "nothing to alert on".
pub const ALLERGY_SENTINELS: [&str; 2] = ["NONE", "N/A"];

/// Timestamp format for `last_visit`.
pub const LAST_VISIT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A patient record keyed by name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientRecord {
    /// Patient name (primary key, also the face label)
    pub name: String,
    /// Attributes shown on the triage panel
    pub details: PatientDetails,
}

/// Free-form patient attributes, as stored in the legacy patient file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientDetails {
    pub age: String,
    pub gender: String,
    /// Free text; "None" / "N/A" mean no known allergies
    pub allergies: String,
    pub history: String,
    /// `YYYY-MM-DD HH:MM:SS`
    pub last_visit: String,
}

impl PatientRecord {
    pub fn new(name: String, details: PatientDetails) -> Self {
        Self { name, details }
    }
}

impl PatientDetails {
    /// Whether the allergy text names something other than a sentinel.
    pub fn has_critical_allergy(&self) -> bool {
        let upper = self.allergies.trim().to_uppercase();
        !upper.is_empty() && !ALLERGY_SENTINELS.contains(&upper.as_str())
    }

    /// Date part of `last_visit`.
    pub fn last_visit_date(&self) -> &str {
        self.last_visit.split(' ').next().unwrap_or("")
    }
}

/// Names that can never identify a patient.
pub fn is_reserved_identity(name: &str) -> bool {
    name.trim().eq_ignore_ascii_case(UNKNOWN_IDENTITY)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(allergies: &str) -> PatientDetails {
        PatientDetails {
            age: "34".into(),
            gender: "F".into(),
            allergies: allergies.into(),
            history: "Asthma".into(),
            last_visit: "2025-01-15 09:30:00".into(),
        }
    }

    #[test]
    fn test_allergy_sentinels() {
        assert!(!details("None").has_critical_allergy());
        assert!(!details("none").has_critical_allergy());
        assert!(!details("N/A").has_critical_allergy());
        assert!(!details("").has_critical_allergy());
        assert!(details("Penicillin").has_critical_allergy());
    }

    #[test]
    fn test_last_visit_date() {
        assert_eq!(details("None").last_visit_date(), "2025-01-15");
    }

    #[test]
    fn test_reserved_identity() {
        assert!(is_reserved_identity("unknown"));
        assert!(is_reserved_identity("UNKNOWN"));
        assert!(is_reserved_identity(" Unknown "));
        assert!(!is_reserved_identity("Unknowna"));
    }
}

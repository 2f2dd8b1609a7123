//! Doctor models.

use serde::{Deserialize, Serialize};

/// Weekday abbreviations in week order.
pub const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// A doctor record keyed by name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoctorRecord {
    pub name: String,
    pub details: DoctorDetails,
}

/// Doctor attributes, as stored in the legacy doctor file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoctorDetails {
    pub specialization: String,
    pub schedule: Schedule,
    pub contact: String,
}

/// Declared availability. Not enforced against bookings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Schedule {
    /// Weekday abbreviations, see [`WEEKDAYS`]
    pub days: Vec<String>,
    /// `HH:MM`, 24-hour
    pub start_time: String,
    /// `HH:MM`, 24-hour
    pub end_time: String,
}

impl DoctorRecord {
    pub fn new(name: String, details: DoctorDetails) -> Self {
        Self { name, details }
    }
}

impl Schedule {
    /// `start-end`, as shown on the roster.
    pub fn hours(&self) -> String {
        format!("{}-{}", self.start_time, self.end_time)
    }

    /// First three days, with "..." when more are set.
    pub fn days_summary(&self) -> String {
        if self.days.is_empty() {
            return "N/A".into();
        }
        let mut summary = self
            .days
            .iter()
            .take(3)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        if self.days.len() > 3 {
            summary.push_str("...");
        }
        summary
    }
}

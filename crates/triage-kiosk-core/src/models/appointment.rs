//! Appointment models.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Storage format for appointment dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Storage format for appointment times (24-hour).
pub const TIME_FORMAT: &str = "%H:%M";

/// Doctor shown for legacy appointments booked without one.
pub const UNASSIGNED_DOCTOR: &str = "Unassigned";

/// A booked appointment.
///
/// `id` is assigned at creation and never changes, so cancellation does not
/// depend on where the appointment currently sits in the sorted list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    /// Stable UUID
    pub id: String,
    /// Patient name
    pub name: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`, 24-hour
    pub time: String,
    pub reason: String,
    /// Doctor name
    pub doctor: String,
    /// Creation timestamp
    pub created_at: String,
}

impl Appointment {
    /// Create a new appointment with a fresh id.
    pub fn new(
        name: String,
        date: NaiveDate,
        time: NaiveTime,
        reason: String,
        doctor: String,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            date: date.format(DATE_FORMAT).to_string(),
            time: time.format(TIME_FORMAT).to_string(),
            reason,
            doctor,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Ordering key. Zero-padded strings sort chronologically.
    pub fn sort_key(&self) -> (&str, &str) {
        (&self.date, &self.time)
    }

    /// Parsed date, if the stored text is well-formed.
    pub fn date_value(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, DATE_FORMAT).ok()
    }

    /// Whether this appointment falls on `day`.
    pub fn is_on(&self, day: NaiveDate) -> bool {
        self.date_value() == Some(day)
    }

    /// Whether the appointment belongs to `patient`, ignoring case.
    pub fn is_for(&self, patient: &str) -> bool {
        self.name.to_lowercase() == patient.to_lowercase()
    }

    /// Short id for display.
    pub fn short_id(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }
}

/// Appointment as stored in the legacy appointments file (no id).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LegacyAppointment {
    pub name: String,
    pub date: String,
    pub time: String,
    pub reason: String,
    #[serde(default)]
    pub doctor: Option<String>,
}

impl LegacyAppointment {
    /// Promote to an appointment with a fresh stable id.
    pub fn into_appointment(self) -> Appointment {
        Appointment {
            id: uuid::Uuid::new_v4().to_string(),
            name: self.name,
            date: self.date,
            time: self.time,
            reason: self.reason,
            doctor: self.doctor.unwrap_or_else(|| UNASSIGNED_DOCTOR.to_string()),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl From<&Appointment> for LegacyAppointment {
    fn from(appt: &Appointment) -> Self {
        Self {
            name: appt.name.clone(),
            date: appt.date.clone(),
            time: appt.time.clone(),
            reason: appt.reason.clone(),
            doctor: Some(appt.doctor.clone()),
        }
    }
}

/// Sort by (date, time) ascending, keeping insertion order for ties.
pub fn sort_appointments(appointments: &mut [Appointment]) {
    appointments.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}

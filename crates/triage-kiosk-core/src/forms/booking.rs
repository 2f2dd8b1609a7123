//! Appointment booking.
//!
//! The booking form mirrors drop-down pickers: every date and time component
//! arrives as the text of the selected option.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use super::{FormError, FormResult};
use crate::models::Appointment;

pub const MONTH_ABBR: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub const MINUTE_OPTIONS: [&str; 4] = ["00", "15", "30", "45"];

pub const MERIDIEM_OPTIONS: [&str; 2] = ["AM", "PM"];

/// Years offered by the picker.
pub const YEARS_AHEAD: i32 = 10;

/// Minimum Jaro-Winkler similarity for a "did you mean" suggestion.
pub const SUGGESTION_THRESHOLD: f64 = 0.85;

/// Raw booking input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingForm {
    pub patient: String,
    pub reason: String,
    pub doctor: String,
    pub year: String,
    pub month: String,
    pub day: String,
    pub hour: String,
    pub minute: String,
    pub meridiem: String,
}

impl BookingForm {
    /// A form pre-filled the way the pickers open: today, the current
    /// 12-hour clock rounded to a quarter hour, and the first doctor.
    pub fn prefilled(now: NaiveDateTime, doctors: &[String]) -> Self {
        let (is_pm, hour) = now.hour12();
        Self {
            patient: String::new(),
            reason: String::new(),
            doctor: doctors.first().cloned().unwrap_or_default(),
            year: now.year().to_string(),
            month: MONTH_ABBR[now.month0() as usize].to_string(),
            day: format!("{:02}", now.day()),
            hour: format!("{:02}", hour),
            minute: default_minute(now.minute()).to_string(),
            meridiem: MERIDIEM_OPTIONS[is_pm as usize].to_string(),
        }
    }

    /// Validate into a new appointment.
    ///
    /// `doctors` is the registered roster; booking needs at least one and the
    /// chosen doctor must be on it.
    pub fn validate(&self, doctors: &[String], now: NaiveDateTime) -> FormResult<Appointment> {
        let patient = self.patient.trim();
        let reason = self.reason.trim();
        if patient.is_empty() || reason.is_empty() {
            return Err(FormError::MissingBookingFields);
        }

        if doctors.is_empty() {
            return Err(FormError::NoDoctors);
        }
        let doctor = self.doctor.trim();
        if !doctors.iter().any(|d| d == doctor) {
            return Err(FormError::UnknownDoctor(doctor.to_string()));
        }

        let when = self.scheduled_for().ok_or(FormError::InvalidDateTime)?;
        if when < now {
            return Err(FormError::PastAppointment);
        }

        Ok(Appointment::new(
            patient.to_string(),
            when.date(),
            when.time(),
            reason.to_string(),
            doctor.to_string(),
        ))
    }

    /// The selected date and 12-hour time as a 24-hour timestamp.
    pub fn scheduled_for(&self) -> Option<NaiveDateTime> {
        let year: i32 = self.year.trim().parse().ok()?;
        let month = month_number(&self.month)?;
        let day: u32 = self.day.trim().parse().ok()?;
        let date = NaiveDate::from_ymd_opt(year, month, day)?;

        let hour: u32 = self.hour.trim().parse().ok()?;
        let minute: u32 = self.minute.trim().parse().ok()?;
        if !(1..=12).contains(&hour) {
            return None;
        }
        let pm = match self.meridiem.trim().to_uppercase().as_str() {
            "AM" => false,
            "PM" => true,
            _ => return None,
        };
        let hour24 = hour % 12 + if pm { 12 } else { 0 };
        let time = NaiveTime::from_hms_opt(hour24, minute, 0)?;

        Some(date.and_time(time))
    }
}

/// 1-based month for an abbreviation such as "Mar".
pub fn month_number(abbr: &str) -> Option<u32> {
    let abbr = abbr.trim();
    MONTH_ABBR
        .iter()
        .position(|m| m.eq_ignore_ascii_case(abbr))
        .map(|i| i as u32 + 1)
}

/// Number of days in a month, leap years included.
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((next - first).num_days() as u32)
}

/// Zero-padded day options for the day picker.
pub fn day_options(year: i32, month: u32) -> Vec<String> {
    days_in_month(year, month)
        .map(|n| (1..=n).map(|d| format!("{:02}", d)).collect())
        .unwrap_or_default()
}

/// The current year and the ten after it.
pub fn year_options(today: NaiveDate) -> Vec<String> {
    let year = today.year();
    (year..=year + YEARS_AHEAD).map(|y| y.to_string()).collect()
}

/// "01" through "12".
pub fn hour_options() -> Vec<String> {
    (1..=12).map(|h| format!("{:02}", h)).collect()
}

/// Nearest quarter-hour option to `minute`; ties go to the earlier option.
pub fn default_minute(minute: u32) -> &'static str {
    let mut best = MINUTE_OPTIONS[0];
    let mut best_gap = u32::MAX;
    for option in MINUTE_OPTIONS {
        let value: u32 = option.parse().unwrap_or(0);
        let gap = value.abs_diff(minute);
        if gap < best_gap {
            best = option;
            best_gap = gap;
        }
    }
    best
}

/// Closest registered name to an unregistered `name`, if any is similar
/// enough. Booking is never blocked by this.
pub fn suggest_patient(name: &str, registered: &[String]) -> Option<String> {
    let query = name.trim().to_lowercase();
    if query.is_empty() || registered.iter().any(|r| r.to_lowercase() == query) {
        return None;
    }

    registered
        .iter()
        .map(|candidate| {
            (
                candidate,
                strsim::jaro_winkler(&query, &candidate.to_lowercase()),
            )
        })
        .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(candidate, _)| candidate.clone())
}

//! Doctor registration.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::{FormError, FormResult};
use crate::models::{DoctorDetails, DoctorRecord, Schedule, TIME_FORMAT, WEEKDAYS};

/// Raw doctor registration input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DoctorForm {
    pub name: String,
    pub specialization: String,
    pub contact: String,
    pub days: Vec<String>,
    pub start_time: String,
    pub end_time: String,
}

impl DoctorForm {
    /// Validate into a doctor record. Days come back deduplicated in week
    /// order and times zero-padded.
    pub fn validate<F>(&self, is_registered: F) -> FormResult<DoctorRecord>
    where
        F: Fn(&str) -> bool,
    {
        let name = self.name.trim();
        let specialization = self.specialization.trim();
        let contact = self.contact.trim();
        let start = self.start_time.trim();
        let end = self.end_time.trim();

        if [name, specialization, contact, start, end]
            .iter()
            .any(|field| field.is_empty())
        {
            return Err(FormError::MissingDoctorFields);
        }

        let days = normalize_days(&self.days)?;
        if days.is_empty() {
            return Err(FormError::NoDays);
        }

        let start = parse_clock(start)?;
        let end = parse_clock(end)?;
        if start >= end {
            return Err(FormError::InvalidHours);
        }

        if is_registered(name) {
            return Err(FormError::DoctorExists(name.to_string()));
        }

        Ok(DoctorRecord::new(
            name.to_string(),
            DoctorDetails {
                specialization: specialization.to_string(),
                contact: contact.to_string(),
                schedule: Schedule {
                    days,
                    start_time: start.format(TIME_FORMAT).to_string(),
                    end_time: end.format(TIME_FORMAT).to_string(),
                },
            },
        ))
    }
}

/// Map day names onto the canonical abbreviations, in week order.
fn normalize_days(days: &[String]) -> FormResult<Vec<String>> {
    let mut selected = [false; 7];
    for day in days {
        let day = day.trim();
        if day.is_empty() {
            continue;
        }
        let index = WEEKDAYS
            .iter()
            .position(|w| w.eq_ignore_ascii_case(day))
            .ok_or_else(|| FormError::InvalidDay(day.to_string()))?;
        selected[index] = true;
    }

    Ok(WEEKDAYS
        .iter()
        .zip(selected)
        .filter(|(_, on)| *on)
        .map(|(day, _)| day.to_string())
        .collect())
}

fn parse_clock(value: &str) -> FormResult<NaiveTime> {
    NaiveTime::parse_from_str(value, TIME_FORMAT).map_err(|_| FormError::InvalidTimeFormat)
}

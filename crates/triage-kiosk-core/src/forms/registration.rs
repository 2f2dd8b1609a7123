//! New patient registration.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{FormError, FormResult};
use crate::models::{is_reserved_identity, PatientDetails, PatientRecord, LAST_VISIT_FORMAT};

pub const MAX_AGE: u32 = 150;

/// Raw registration input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrationForm {
    pub name: String,
    pub age: String,
    pub gender: String,
    pub allergies: String,
    pub history: String,
}

impl RegistrationForm {
    /// Validate into a patient record stamped with `now` as the last visit.
    ///
    /// `is_registered` reports whether a (trimmed) name is already taken.
    pub fn validate<F>(&self, is_registered: F, now: NaiveDateTime) -> FormResult<PatientRecord>
    where
        F: Fn(&str) -> bool,
    {
        let name = self.name.trim();
        let age = self.age.trim();
        let gender = self.gender.trim();
        let allergies = self.allergies.trim();
        let history = self.history.trim();

        if [name, age, gender, allergies, history]
            .iter()
            .any(|field| field.is_empty())
        {
            return Err(FormError::MissingFields);
        }
        if is_reserved_identity(name) {
            return Err(FormError::ReservedName);
        }
        if is_registered(name) {
            return Err(FormError::PatientExists(name.to_string()));
        }

        let years: u32 = age.parse().map_err(|_| FormError::InvalidAge)?;
        if years > MAX_AGE {
            return Err(FormError::InvalidAge);
        }

        Ok(PatientRecord::new(
            name.to_string(),
            PatientDetails {
                age: years.to_string(),
                gender: gender.to_string(),
                allergies: allergies.to_string(),
                history: history.to_string(),
                last_visit: now.format(LAST_VISIT_FORMAT).to_string(),
            },
        ))
    }
}

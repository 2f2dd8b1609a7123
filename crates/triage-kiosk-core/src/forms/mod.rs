//! Form validation.
//!
//! Each form turns raw operator input into a validated record. Nothing here
//! touches storage; callers pass in what the checks need to know.

mod booking;
mod cancellation;
mod doctor;
mod registration;

pub use booking::*;
pub use cancellation::*;
pub use doctor::*;
pub use registration::*;

use thiserror::Error;

/// Validation failures, worded for the operator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("All fields must be filled.")]
    MissingFields,

    #[error("Name cannot be 'Unknown' or empty.")]
    ReservedName,

    #[error("Patient ID '{0}' already exists. Use the Existing User flow to update records.")]
    PatientExists(String),

    #[error("Age must be a whole number between 0 and 150.")]
    InvalidAge,

    #[error("Patient Name and Appointment Reason must be filled.")]
    MissingBookingFields,

    #[error("Cannot book appointment. Please register a doctor first via Doctor Management.")]
    NoDoctors,

    #[error("Doctor '{0}' is not registered.")]
    UnknownDoctor(String),

    #[error("Invalid Date or Time selection. Please ensure all drop-downs are selected.")]
    InvalidDateTime,

    #[error("Appointment date/time cannot be in the past.")]
    PastAppointment,

    #[error("Name, Specialization, Contact, and Times must be filled.")]
    MissingDoctorFields,

    #[error("Please select at least one available day.")]
    NoDays,

    #[error("'{0}' is not a weekday. Use Mon, Tue, Wed, Thu, Fri, Sat or Sun.")]
    InvalidDay(String),

    #[error("Time format must be HH:MM (e.g., 10:00 or 17:30).")]
    InvalidTimeFormat,

    #[error("Start time must be before end time.")]
    InvalidHours,

    #[error("Doctor ID '{0}' already exists.")]
    DoctorExists(String),

    #[error("Please enter a number for the Appointment ID.")]
    NotANumber,

    #[error("Invalid Appointment ID: {0}. Please enter a valid ID from the list.")]
    InvalidAppointmentId(i64),
}

pub type FormResult<T> = Result<T, FormError>;

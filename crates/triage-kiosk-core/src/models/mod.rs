//! Domain models for the triage kiosk.

mod appointment;
mod doctor;
mod face;
mod patient;

pub use appointment::*;
pub use doctor::*;
pub use face::*;
pub use patient::*;

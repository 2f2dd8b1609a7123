//! Triage Kiosk Core Library
//!
//! Webcam check-in for a single clinic: recognise a returning patient's face,
//! show their record and appointments on a triage panel, and manage patient,
//! doctor and appointment records.
//!
//! # Architecture
//!
//! ```text
//!   Registration form ──▶ Enrollment pipeline ──▶ mean vector ─┐
//!                         (N single-face captures)              │
//!                                                               ▼
//!   Booking / doctor forms ─────────────────────────▶ ┌──────────────────┐
//!                                                     │  SQLite stores   │
//!                                                     │ patients doctors │
//!                                                     │ appts    faces   │
//!                                                     └────────┬─────────┘
//!                                                              │ read
//!   Camera frame ──▶ Downscale ──▶ Detect ──▶ Match ──▶ Correlate ──▶ Panel
//! ```
//!
//! Camera, detector and display are supplied by the host through the traits
//! in `triage_kiosk_vision`.
//!
//! # Modules
//!
//! - [`config`]: TOML configuration
//! - [`db`]: SQLite database layer
//! - [`models`]: Domain types (PatientRecord, Appointment, DoctorRecord, etc.)
//! - [`recognition`]: Vector store, enrollment, per-frame correlation, panel
//! - [`forms`]: Operator input validation
//! - [`export`]: Legacy flat-file import/export and roster views
//! - [`context`]: The application context tying the stores together

pub mod config;
pub mod context;
pub mod db;
pub mod export;
pub mod forms;
pub mod models;
pub mod recognition;

// Re-export commonly used types
pub use config::{KioskConfig, SubjectPolicy};
pub use context::{Booking, ContextError, KioskContext};
pub use db::Database;
pub use models::{Appointment, DoctorRecord, FaceEncoding, Identity, PatientRecord};
pub use recognition::{PanelView, VectorStore};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Local;

use crate::forms::{BookingForm, DoctorForm, RegistrationForm};
use crate::models::{DoctorDetails, PatientDetails, Schedule};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum KioskError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Camera unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Enrollment failed: {0}")]
    EnrollmentFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl From<db::DbError> for KioskError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::NotFound(what) => KioskError::NotFound(what),
            db::DbError::Constraint(msg) => KioskError::InvalidInput(msg),
            other => KioskError::DatabaseError(other.to_string()),
        }
    }
}

impl From<forms::FormError> for KioskError {
    fn from(e: forms::FormError) -> Self {
        KioskError::InvalidInput(e.to_string())
    }
}

impl From<triage_kiosk_vision::VisionError> for KioskError {
    fn from(e: triage_kiosk_vision::VisionError) -> Self {
        match e {
            triage_kiosk_vision::VisionError::DeviceUnavailable(msg) => {
                KioskError::DeviceUnavailable(msg)
            }
            other => KioskError::IoError(other.to_string()),
        }
    }
}

impl From<recognition::RecognitionError> for KioskError {
    fn from(e: recognition::RecognitionError) -> Self {
        use recognition::RecognitionError;
        match e {
            RecognitionError::Database(e) => e.into(),
            RecognitionError::Vision(e) => e.into(),
            RecognitionError::Artifact(e) => KioskError::IoError(e.to_string()),
            err @ (RecognitionError::EmptyEnrollment
            | RecognitionError::DimensionMismatch { .. }) => {
                KioskError::InvalidInput(err.to_string())
            }
            other => KioskError::EnrollmentFailed(other.to_string()),
        }
    }
}

impl From<export::LegacyError> for KioskError {
    fn from(e: export::LegacyError) -> Self {
        match e {
            export::LegacyError::Database(e) => e.into(),
            export::LegacyError::Json(e) => e.into(),
            other => KioskError::IoError(other.to_string()),
        }
    }
}

impl From<config::ConfigError> for KioskError {
    fn from(e: config::ConfigError) -> Self {
        KioskError::ConfigError(e.to_string())
    }
}

impl From<ContextError> for KioskError {
    fn from(e: ContextError) -> Self {
        match e {
            ContextError::Form(e) => e.into(),
            ContextError::Database(e) => e.into(),
            ContextError::Recognition(e) => e.into(),
            ContextError::Vision(e) => e.into(),
            ContextError::Legacy(e) => e.into(),
        }
    }
}

impl From<serde_json::Error> for KioskError {
    fn from(e: serde_json::Error) -> Self {
        KioskError::SerializationError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for KioskError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        KioskError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open a kiosk using the TOML config at `config_path`, or defaults when the
/// file does not exist.
#[uniffi::export]
pub fn open_kiosk(config_path: String) -> Result<Arc<TriageKiosk>, KioskError> {
    let config = KioskConfig::load_or_default(&config_path)?;
    let ctx = KioskContext::open(config)?;
    Ok(Arc::new(TriageKiosk {
        ctx: Arc::new(Mutex::new(ctx)),
    }))
}

/// Create an in-memory kiosk with default settings (for testing).
#[uniffi::export]
pub fn open_kiosk_in_memory() -> Result<Arc<TriageKiosk>, KioskError> {
    let ctx = KioskContext::in_memory(KioskConfig::default())?;
    Ok(Arc::new(TriageKiosk {
        ctx: Arc::new(Mutex::new(ctx)),
    }))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe kiosk context wrapper for FFI.
#[derive(uniffi::Object)]
pub struct TriageKiosk {
    ctx: Arc<Mutex<KioskContext>>,
}

#[uniffi::export]
impl TriageKiosk {
    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Register a patient from embeddings the host captured.
    pub fn register_patient(
        &self,
        form: FfiRegistrationForm,
        captures: Vec<Vec<f64>>,
    ) -> Result<FfiPatient, KioskError> {
        let mut ctx = self.ctx.lock()?;
        let record =
            ctx.register_patient_with_captures(&form.into(), &captures, Local::now().naive_local())?;
        Ok(record.into())
    }

    /// Update a registered patient's details.
    pub fn update_patient(&self, patient: FfiPatient) -> Result<(), KioskError> {
        let ctx = self.ctx.lock()?;
        ctx.update_patient(&patient.into())?;
        Ok(())
    }

    pub fn get_patient(&self, name: String) -> Result<Option<FfiPatient>, KioskError> {
        let ctx = self.ctx.lock()?;
        let patient = ctx.db().get_patient(&name)?;
        Ok(patient.map(|p| p.into()))
    }

    pub fn list_patients(&self) -> Result<Vec<FfiPatient>, KioskError> {
        let ctx = self.ctx.lock()?;
        let patients = ctx.db().list_patients()?;
        Ok(patients.into_iter().map(|p| p.into()).collect())
    }

    /// Search patients by name prefix.
    pub fn search_patients(&self, query: String, limit: u32) -> Result<Vec<FfiPatient>, KioskError> {
        let ctx = self.ctx.lock()?;
        let patients = ctx.db().search_patients(&query, limit as usize)?;
        Ok(patients.into_iter().map(|p| p.into()).collect())
    }

    // =========================================================================
    // Doctor Operations
    // =========================================================================

    pub fn register_doctor(&self, form: FfiDoctorForm) -> Result<FfiDoctor, KioskError> {
        let ctx = self.ctx.lock()?;
        let doctor = ctx.register_doctor(&form.into())?;
        Ok(doctor.into())
    }

    /// Doctors sorted by name.
    pub fn list_doctors(&self) -> Result<Vec<FfiDoctor>, KioskError> {
        let ctx = self.ctx.lock()?;
        let doctors = ctx.db().list_doctors()?;
        Ok(doctors.into_iter().map(|d| d.into()).collect())
    }

    /// Plain-text doctor roster.
    pub fn doctor_table(&self) -> Result<String, KioskError> {
        let ctx = self.ctx.lock()?;
        Ok(export::doctor_table(&ctx.db().list_doctors()?))
    }

    // =========================================================================
    // Appointment Operations
    // =========================================================================

    /// Booking form pre-filled with the current date, time and first doctor.
    pub fn booking_defaults(&self) -> Result<FfiBookingForm, KioskError> {
        let ctx = self.ctx.lock()?;
        let doctors = ctx.db().list_doctor_names()?;
        Ok(BookingForm::prefilled(Local::now().naive_local(), &doctors).into())
    }

    /// Day picker options for a year and month abbreviation.
    pub fn day_options(&self, year: i32, month: String) -> Vec<String> {
        forms::month_number(&month)
            .map(|m| forms::day_options(year, m))
            .unwrap_or_default()
    }

    pub fn book_appointment(&self, form: FfiBookingForm) -> Result<FfiBooking, KioskError> {
        let ctx = self.ctx.lock()?;
        let booking = ctx.book_appointment(&form.into(), Local::now().naive_local())?;
        Ok(booking.into())
    }

    /// All appointments in (date, time) order.
    pub fn list_appointments(&self) -> Result<Vec<FfiAppointment>, KioskError> {
        let ctx = self.ctx.lock()?;
        let appointments = ctx.db().list_appointments()?;
        Ok(appointments.into_iter().map(|a| a.into()).collect())
    }

    pub fn appointments_for_patient(&self, name: String) -> Result<Vec<FfiAppointment>, KioskError> {
        let ctx = self.ctx.lock()?;
        let appointments = ctx.db().appointments_for_patient(&name)?;
        Ok(appointments.into_iter().map(|a| a.into()).collect())
    }

    /// Cancel by stable appointment id.
    pub fn cancel_appointment(&self, id: String) -> Result<FfiAppointment, KioskError> {
        let ctx = self.ctx.lock()?;
        Ok(ctx.cancel_appointment(&id)?.into())
    }

    /// Cancel by the 1-based position shown in the appointment table.
    pub fn cancel_appointment_at(&self, position: String) -> Result<FfiAppointment, KioskError> {
        let ctx = self.ctx.lock()?;
        Ok(ctx.cancel_appointment_at(&position)?.into())
    }

    /// Plain-text appointment management table.
    pub fn appointment_table(&self) -> Result<String, KioskError> {
        let ctx = self.ctx.lock()?;
        Ok(export::appointment_table(&ctx.db().list_appointments()?))
    }

    pub fn export_appointments_csv(&self) -> Result<String, KioskError> {
        let ctx = self.ctx.lock()?;
        Ok(export::appointments_to_csv(&ctx.db().list_appointments()?))
    }

    // =========================================================================
    // Recognition Operations
    // =========================================================================

    /// Match one embedding against the enrolled faces.
    pub fn match_embedding(&self, embedding: Vec<f64>) -> Result<FfiIdentity, KioskError> {
        let ctx = self.ctx.lock()?;
        let identity = ctx
            .faces()
            .match_face(&embedding, ctx.config().recognition.tolerance);
        Ok(identity.into())
    }

    /// Triage panel for a matched name, or for an unknown face when `None`.
    pub fn triage_panel(&self, name: Option<String>) -> Result<FfiPanel, KioskError> {
        let ctx = self.ctx.lock()?;
        let identity = match name {
            Some(name) => Identity::Known {
                name,
                distance: 0.0,
            },
            None => Identity::Unknown,
        };
        let now = Local::now().naive_local();
        let data = recognition::resolve_panel(ctx.db(), &identity, now.date())?;
        let view = recognition::render_panel(&data, &ctx.config().panel, now);
        Ok(FfiPanel {
            subject: data.subject.clone(),
            has_record: data.has_record,
            critical_allergy: data.critical_allergy(),
            lines: view.lines.into_iter().map(|l| l.into()).collect(),
        })
    }

    pub fn known_face_count(&self) -> Result<u32, KioskError> {
        let ctx = self.ctx.lock()?;
        Ok(ctx.faces().len() as u32)
    }

    // =========================================================================
    // Import / Export Operations
    // =========================================================================

    /// Import patient, doctor, appointment and face files from a directory.
    pub fn import_legacy(&self, dir: String) -> Result<FfiTransferSummary, KioskError> {
        let mut ctx = self.ctx.lock()?;
        Ok(ctx.import_legacy(Path::new(&dir))?.into())
    }

    /// Export every store to a directory in the flat-file layout.
    pub fn export_legacy(&self, dir: String) -> Result<FfiTransferSummary, KioskError> {
        let ctx = self.ctx.lock()?;
        Ok(ctx.export_legacy(Path::new(&dir))?.into())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub name: String,
    pub age: String,
    pub gender: String,
    pub allergies: String,
    pub history: String,
    pub last_visit: String,
}

impl From<PatientRecord> for FfiPatient {
    fn from(patient: PatientRecord) -> Self {
        let d = patient.details;
        Self {
            name: patient.name,
            age: d.age,
            gender: d.gender,
            allergies: d.allergies,
            history: d.history,
            last_visit: d.last_visit,
        }
    }
}

impl From<FfiPatient> for PatientRecord {
    fn from(patient: FfiPatient) -> Self {
        PatientRecord::new(
            patient.name,
            PatientDetails {
                age: patient.age,
                gender: patient.gender,
                allergies: patient.allergies,
                history: patient.history,
                last_visit: patient.last_visit,
            },
        )
    }
}

/// FFI-safe registration form.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRegistrationForm {
    pub name: String,
    pub age: String,
    pub gender: String,
    pub allergies: String,
    pub history: String,
}

impl From<FfiRegistrationForm> for RegistrationForm {
    fn from(form: FfiRegistrationForm) -> Self {
        RegistrationForm {
            name: form.name,
            age: form.age,
            gender: form.gender,
            allergies: form.allergies,
            history: form.history,
        }
    }
}

/// FFI-safe doctor.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDoctor {
    pub name: String,
    pub specialization: String,
    pub contact: String,
    pub days: Vec<String>,
    pub start_time: String,
    pub end_time: String,
}

impl From<DoctorRecord> for FfiDoctor {
    fn from(doctor: DoctorRecord) -> Self {
        let DoctorDetails {
            specialization,
            contact,
            schedule: Schedule {
                days,
                start_time,
                end_time,
            },
        } = doctor.details;
        Self {
            name: doctor.name,
            specialization,
            contact,
            days,
            start_time,
            end_time,
        }
    }
}

/// FFI-safe doctor registration form.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDoctorForm {
    pub name: String,
    pub specialization: String,
    pub contact: String,
    pub days: Vec<String>,
    pub start_time: String,
    pub end_time: String,
}

impl From<FfiDoctorForm> for DoctorForm {
    fn from(form: FfiDoctorForm) -> Self {
        DoctorForm {
            name: form.name,
            specialization: form.specialization,
            contact: form.contact,
            days: form.days,
            start_time: form.start_time,
            end_time: form.end_time,
        }
    }
}

/// FFI-safe appointment.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAppointment {
    pub id: String,
    pub name: String,
    pub date: String,
    pub time: String,
    pub reason: String,
    pub doctor: String,
}

impl From<Appointment> for FfiAppointment {
    fn from(appt: Appointment) -> Self {
        Self {
            id: appt.id,
            name: appt.name,
            date: appt.date,
            time: appt.time,
            reason: appt.reason,
            doctor: appt.doctor,
        }
    }
}

/// FFI-safe booking form; every date/time field is the picker's text.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiBookingForm {
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

impl From<FfiBookingForm> for BookingForm {
    fn from(form: FfiBookingForm) -> Self {
        BookingForm {
            patient: form.patient,
            reason: form.reason,
            doctor: form.doctor,
            year: form.year,
            month: form.month,
            day: form.day,
            hour: form.hour,
            minute: form.minute,
            meridiem: form.meridiem,
        }
    }
}

impl From<BookingForm> for FfiBookingForm {
    fn from(form: BookingForm) -> Self {
        Self {
            patient: form.patient,
            reason: form.reason,
            doctor: form.doctor,
            year: form.year,
            month: form.month,
            day: form.day,
            hour: form.hour,
            minute: form.minute,
            meridiem: form.meridiem,
        }
    }
}

/// FFI-safe booking result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiBooking {
    pub appointment: FfiAppointment,
    pub suggestion: Option<String>,
}

impl From<Booking> for FfiBooking {
    fn from(booking: Booking) -> Self {
        Self {
            appointment: booking.appointment.into(),
            suggestion: booking.suggestion,
        }
    }
}

/// FFI-safe match result. `name` is `None` for an unknown face.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiIdentity {
    pub name: Option<String>,
    pub label: String,
    pub distance: Option<f64>,
}

impl From<Identity> for FfiIdentity {
    fn from(identity: Identity) -> Self {
        let label = identity.label().to_string();
        match identity {
            Identity::Known { name, distance } => Self {
                name: Some(name),
                label,
                distance: Some(distance),
            },
            Identity::Unknown => Self {
                name: None,
                label,
                distance: None,
            },
        }
    }
}

/// FFI-safe panel line.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPanelLine {
    pub text: String,
    pub style: String,
}

impl From<recognition::PanelLine> for FfiPanelLine {
    fn from(line: recognition::PanelLine) -> Self {
        Self {
            text: line.text,
            style: format!("{:?}", line.style),
        }
    }
}

/// FFI-safe triage panel.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPanel {
    pub subject: String,
    pub has_record: bool,
    pub critical_allergy: bool,
    pub lines: Vec<FfiPanelLine>,
}

/// FFI-safe import/export counts.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTransferSummary {
    pub patients: u32,
    pub doctors: u32,
    pub appointments: u32,
    pub faces: u32,
    pub skipped: u32,
}

impl From<export::TransferSummary> for FfiTransferSummary {
    fn from(summary: export::TransferSummary) -> Self {
        Self {
            patients: summary.patients as u32,
            doctors: summary.doctors as u32,
            appointments: summary.appointments as u32,
            faces: summary.faces as u32,
            skipped: summary.skipped as u32,
        }
    }
}

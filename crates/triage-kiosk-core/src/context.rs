//! Application context.
//!
//! One `KioskContext` is built at start-up and owns every store. Components
//! receive it explicitly; there is no global state.

use std::path::Path;

use chrono::NaiveDateTime;
use thiserror::Error;
use triage_kiosk_vision::{CameraGuard, FaceDetector, Frame, FrameSource, VisionError};

use crate::config::KioskConfig;
use crate::db::{Database, DbError};
use crate::export::{export_dir, import_dir, LegacyError, TransferSummary};
use crate::forms::{
    parse_cancellation, suggest_patient, BookingForm, DoctorForm, FormError, RegistrationForm,
};
use crate::models::{Appointment, DoctorRecord, FaceEncoding, PatientRecord};
use crate::recognition::{
    mean_vector, process_frame, run_monitor, CaptureArtifactSink, EnrollmentSession,
    MonitorSummary, RecognitionError, TriageDisplay, TriageFrame, VectorStore,
};

/// Errors surfaced by kiosk operations.
#[derive(Error, Debug)]
pub enum ContextError {
    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Recognition(#[from] RecognitionError),

    #[error(transparent)]
    Vision(#[from] VisionError),

    #[error(transparent)]
    Legacy(#[from] LegacyError),
}

pub type ContextResult<T> = Result<T, ContextError>;

/// A booked appointment plus an optional name hint for the operator.
#[derive(Debug, Clone, PartialEq)]
pub struct Booking {
    pub appointment: Appointment,
    /// Closest registered name when the patient is not registered
    pub suggestion: Option<String>,
}

pub struct KioskContext {
    db: Database,
    faces: VectorStore,
    config: KioskConfig,
}

impl KioskContext {
    /// Open the database named in `config` and load enrolled faces.
    pub fn open(config: KioskConfig) -> ContextResult<Self> {
        let db = Database::open(&config.storage.database_path)?;
        Ok(Self::with_database(db, config))
    }

    pub fn in_memory(config: KioskConfig) -> ContextResult<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self::with_database(db, config))
    }

    pub fn with_database(db: Database, config: KioskConfig) -> Self {
        let faces = VectorStore::load(&db, config.recognition.distance);
        Self { db, faces, config }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn faces(&self) -> &VectorStore {
        &self.faces
    }

    pub fn config(&self) -> &KioskConfig {
        &self.config
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a new patient by capturing their face from `camera`.
    ///
    /// Nothing is persisted unless enrollment succeeds. The camera is
    /// released before the records are written.
    pub fn register_patient<S, D, A>(
        &mut self,
        form: &RegistrationForm,
        camera: S,
        detector: &mut D,
        sink: &mut A,
        now: NaiveDateTime,
    ) -> ContextResult<PatientRecord>
    where
        S: FrameSource,
        D: FaceDetector + ?Sized,
        A: CaptureArtifactSink + ?Sized,
    {
        let record = self.validate_registration(form, now)?;

        let outcome = {
            let mut guard = CameraGuard::open(camera)?;
            EnrollmentSession::new(
                &record.name,
                &self.config.enrollment,
                self.config.recognition.frame_scale,
            )
            .run(&mut guard, detector, sink)?
        };

        self.commit_registration(record, outcome.mean)
    }

    /// Register a new patient from embeddings captured by the host.
    pub fn register_patient_with_captures(
        &mut self,
        form: &RegistrationForm,
        captures: &[Vec<f64>],
        now: NaiveDateTime,
    ) -> ContextResult<PatientRecord> {
        let record = self.validate_registration(form, now)?;
        let mean = mean_vector(captures)?;
        self.commit_registration(record, mean)
    }

    /// Replace an existing patient's details (the returning-patient flow).
    pub fn update_patient(&self, record: &PatientRecord) -> ContextResult<()> {
        if !self.db.patient_exists(&record.name)? {
            return Err(DbError::NotFound(format!("patient {}", record.name)).into());
        }
        self.db.upsert_patient(record)?;
        Ok(())
    }

    fn validate_registration(
        &self,
        form: &RegistrationForm,
        now: NaiveDateTime,
    ) -> ContextResult<PatientRecord> {
        let name = form.name.trim();
        let taken = self.db.patient_exists(name)? || self.faces.contains(name);
        Ok(form.validate(|_| taken, now)?)
    }

    fn commit_registration(
        &mut self,
        record: PatientRecord,
        mean: Vec<f64>,
    ) -> ContextResult<PatientRecord> {
        let encoding = FaceEncoding {
            name: record.name.clone(),
            vector: mean,
        };

        self.db.with_transaction(|db| {
            db.insert_face_encoding(&encoding)?;
            db.insert_patient(&record)
        })?;
        self.faces.insert(encoding);

        log::info!("Registration complete for {}.", record.name);
        Ok(record)
    }

    // =========================================================================
    // Appointments
    // =========================================================================

    /// Validate and store a booking.
    pub fn book_appointment(
        &self,
        form: &BookingForm,
        now: NaiveDateTime,
    ) -> ContextResult<Booking> {
        let doctors = self.db.list_doctor_names()?;
        let appointment = form.validate(&doctors, now)?;

        let suggestion = if self.db.patient_exists(&appointment.name)? {
            None
        } else {
            let suggestion = suggest_patient(&appointment.name, &self.db.list_patient_names()?);
            if let Some(candidate) = &suggestion {
                log::warn!(
                    "{} is not a registered patient. Did you mean {}?",
                    appointment.name,
                    candidate
                );
            }
            suggestion
        };

        self.db.insert_appointment(&appointment)?;
        Ok(Booking {
            appointment,
            suggestion,
        })
    }

    /// Cancel by stable id.
    pub fn cancel_appointment(&self, id: &str) -> ContextResult<Appointment> {
        Ok(self.db.delete_appointment(id)?)
    }

    /// Cancel by the 1-based position the operator typed, resolved against
    /// the current order.
    pub fn cancel_appointment_at(&self, input: &str) -> ContextResult<Appointment> {
        let position = parse_cancellation(input, self.db.count_appointments()?)?;
        let id = self
            .db
            .appointment_id_at(position)?
            .ok_or(FormError::InvalidAppointmentId(position as i64))?;
        self.cancel_appointment(&id)
    }

    // =========================================================================
    // Doctors
    // =========================================================================

    pub fn register_doctor(&self, form: &DoctorForm) -> ContextResult<DoctorRecord> {
        let taken = self.db.doctor_exists(form.name.trim())?;
        let doctor = form.validate(|_| taken)?;
        self.db.insert_doctor(&doctor)?;
        Ok(doctor)
    }

    // =========================================================================
    // Recognition
    // =========================================================================

    /// Identify the faces in one frame and lay out the panel.
    pub fn recognize_frame<D: FaceDetector + ?Sized>(
        &self,
        frame: &Frame,
        detector: &mut D,
        now: NaiveDateTime,
    ) -> ContextResult<TriageFrame> {
        Ok(process_frame(
            frame,
            detector,
            &self.faces,
            &self.db,
            &self.config,
            now,
        )?)
    }

    /// Open `camera` and run the live monitor until quit or a failed read.
    pub fn run_monitor<S, D, T, C>(
        &self,
        camera: S,
        detector: &mut D,
        display: &mut T,
        clock: C,
    ) -> ContextResult<MonitorSummary>
    where
        S: FrameSource,
        D: FaceDetector + ?Sized,
        T: TriageDisplay + ?Sized,
        C: FnMut() -> NaiveDateTime,
    {
        let mut guard = CameraGuard::open(camera)?;
        Ok(run_monitor(
            &mut guard,
            detector,
            display,
            &self.faces,
            &self.db,
            &self.config,
            clock,
        )?)
    }

    // =========================================================================
    // Import / export
    // =========================================================================

    /// Import a legacy directory and reload the face store.
    pub fn import_legacy(&mut self, dir: &Path) -> ContextResult<TransferSummary> {
        let summary = import_dir(&mut self.db, dir)?;
        self.faces = VectorStore::load(&self.db, self.config.recognition.distance);
        Ok(summary)
    }

    pub fn export_legacy(&self, dir: &Path) -> ContextResult<TransferSummary> {
        Ok(export_dir(&self.db, dir)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::DirectoryArtifactSink;
    use chrono::NaiveDate;
    use triage_kiosk_vision::{FaceBox, ScriptedCamera, ScriptedDetector};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn context() -> KioskContext {
        KioskContext::in_memory(KioskConfig::default()).unwrap()
    }

    fn registration(name: &str) -> RegistrationForm {
        RegistrationForm {
            name: name.into(),
            age: "34".into(),
            gender: "F".into(),
            allergies: "Penicillin".into(),
            history: "Asthma".into(),
        }
    }

    fn add_doctor(ctx: &KioskContext, name: &str) {
        ctx.register_doctor(&DoctorForm {
            name: name.into(),
            specialization: "General".into(),
            contact: "555-0101".into(),
            days: vec!["Mon".into()],
            start_time: "09:00".into(),
            end_time: "17:00".into(),
        })
        .unwrap();
    }

    fn booking(patient: &str, day: &str, hour: &str) -> BookingForm {
        BookingForm {
            patient: patient.into(),
            reason: "Checkup".into(),
            doctor: "House".into(),
            year: "2025".into(),
            month: "Mar".into(),
            day: day.into(),
            hour: hour.into(),
            minute: "00".into(),
            meridiem: "AM".into(),
        }
    }

    #[test]
    fn test_register_with_camera() {
        let mut ctx = context();
        let mut detector = ScriptedDetector::new();
        for _ in 0..5 {
            detector.push_single(FaceBox::new(1, 3, 3, 1), vec![1.0, 0.0, 0.0]);
        }
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectoryArtifactSink::new(dir.path());
        let mut camera = ScriptedCamera::with_frames(Frame::blank(16, 16), 10);

        let record = ctx
            .register_patient(&registration("alice"), &mut camera, &mut detector, &mut sink, now())
            .unwrap();

        assert_eq!(record.details.last_visit, "2025-01-15 09:00:00");
        assert_eq!(camera.release_count(), 1);
        assert!(ctx.faces().contains("alice"));
        assert!(ctx.db().patient_exists("alice").unwrap());
        assert!(dir.path().join("alice").join("alice_5.ppm").exists());
    }

    #[test]
    fn test_camera_unavailable_persists_nothing() {
        let mut ctx = context();
        let mut detector = ScriptedDetector::new();
        let mut sink = DirectoryArtifactSink::new(tempfile::tempdir().unwrap().path());

        let result = ctx.register_patient(
            &registration("alice"),
            ScriptedCamera::unavailable(),
            &mut detector,
            &mut sink,
            now(),
        );
        assert!(matches!(
            result,
            Err(ContextError::Vision(VisionError::DeviceUnavailable(_)))
        ));
        assert_eq!(ctx.db().count_patients().unwrap(), 0);
    }

    #[test]
    fn test_failed_enrollment_persists_nothing() {
        let mut ctx = context();
        let mut detector = ScriptedDetector::new();
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectoryArtifactSink::new(dir.path());
        let camera = ScriptedCamera::with_frames(Frame::blank(8, 8), 30);

        let result = ctx.register_patient(&registration("alice"), camera, &mut detector, &mut sink, now());
        assert!(matches!(
            result,
            Err(ContextError::Recognition(RecognitionError::EnrollmentFailed { .. }))
        ));
        assert!(ctx.faces().is_empty());
        assert_eq!(ctx.db().count_patients().unwrap(), 0);
        assert!(ctx.db().list_face_encodings().unwrap().is_empty());
    }

    #[test]
    fn test_register_with_captures_then_recognize() {
        let mut ctx = context();
        ctx.register_patient_with_captures(
            &registration("bob"),
            &[vec![2.0, 2.0], vec![0.0, 0.0]],
            now(),
        )
        .unwrap();
        assert_eq!(ctx.faces().vector_for("bob"), Some(&[1.0, 1.0][..]));

        let mut detector = ScriptedDetector::new();
        detector.push_single(FaceBox::new(0, 4, 4, 0), vec![1.0, 1.1]);
        let triage = ctx
            .recognize_frame(&Frame::blank(16, 16), &mut detector, now())
            .unwrap();
        assert_eq!(triage.data.subject, "bob");
        assert!(triage.data.critical_allergy());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut ctx = context();
        ctx.register_patient_with_captures(&registration("bob"), &[vec![1.0]], now())
            .unwrap();
        let result = ctx.register_patient_with_captures(&registration("bob"), &[vec![1.0]], now());
        assert!(matches!(
            result,
            Err(ContextError::Form(FormError::PatientExists(_)))
        ));
        assert_eq!(ctx.faces().len(), 1);
    }

    #[test]
    fn test_book_and_cancel_by_position() {
        let ctx = context();
        add_doctor(&ctx, "House");

        ctx.book_appointment(&booking("alice", "01", "09"), now()).unwrap();
        let second = ctx.book_appointment(&booking("alice", "02", "10"), now()).unwrap();

        let removed = ctx.cancel_appointment_at("1").unwrap();
        assert_eq!(removed.date, "2025-03-01");
        let remaining = ctx.db().list_appointments().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, second.appointment.id);

        assert!(matches!(
            ctx.cancel_appointment_at("5"),
            Err(ContextError::Form(FormError::InvalidAppointmentId(5)))
        ));
        assert_eq!(ctx.db().count_appointments().unwrap(), 1);
    }

    #[test]
    fn test_booking_requires_doctor() {
        let ctx = context();
        assert!(matches!(
            ctx.book_appointment(&booking("alice", "01", "09"), now()),
            Err(ContextError::Form(FormError::NoDoctors))
        ));
    }

    #[test]
    fn test_booking_suggests_registered_name() {
        let mut ctx = context();
        add_doctor(&ctx, "House");
        ctx.register_patient_with_captures(&registration("Alice"), &[vec![1.0]], now())
            .unwrap();

        let booked = ctx.book_appointment(&booking("Alcie", "01", "09"), now()).unwrap();
        assert_eq!(booked.suggestion.as_deref(), Some("Alice"));
        let exact = ctx.book_appointment(&booking("Alice", "01", "10"), now()).unwrap();
        assert_eq!(exact.suggestion, None);
    }

    #[test]
    fn test_update_patient_requires_existing() {
        let mut ctx = context();
        let record = ctx
            .register_patient_with_captures(&registration("alice"), &[vec![1.0]], now())
            .unwrap();

        let mut updated = record.clone();
        updated.details.allergies = "None".into();
        ctx.update_patient(&updated).unwrap();
        assert_eq!(
            ctx.db().get_patient("alice").unwrap().unwrap().details.allergies,
            "None"
        );

        updated.name = "nobody".into();
        assert!(matches!(
            ctx.update_patient(&updated),
            Err(ContextError::Database(DbError::NotFound(_)))
        ));
    }
}

//! Flat-file import and export.
//!
//! Four files make up a legacy kiosk directory:
//!
//! | file                 | contents                                        |
//! |----------------------|-------------------------------------------------|
//! | `patient_data.json`  | `{name: {age, gender, allergies, history, ...}}` |
//! | `doctor_data.json`   | `{name: {specialization, schedule, contact}}`   |
//! | `appointments.json`  | `[{name, date, time, reason, doctor}]`, sorted   |
//! | `encodings.bin`      | magic, SHA-256, `{"names": [], "encodings": []}` |
//!
//! Loading never fails the caller: a missing file is an empty collection and
//! a corrupt one is an empty collection plus an error log.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::db::{Database, DbError};
use crate::models::{
    is_reserved_identity, sort_appointments, Appointment, DoctorDetails, DoctorRecord, FaceEncoding, LegacyAppointment,
    PatientDetails, PatientRecord,
};

pub const PATIENT_FILE: &str = "patient_data.json";
pub const DOCTOR_FILE: &str = "doctor_data.json";
pub const APPOINTMENT_FILE: &str = "appointments.json";
pub const ENCODINGS_FILE: &str = "encodings.bin";

pub const ENCODINGS_MAGIC: &[u8; 8] = b"TKFACES1";
const CHECKSUM_LEN: usize = 32;

/// Import/export errors.
#[derive(Error, Debug)]
pub enum LegacyError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Corrupt encodings file: {0}")]
    CorruptEncodings(String),
}

pub type LegacyResult<T> = Result<T, LegacyError>;

#[derive(Debug, Serialize, Deserialize)]
struct EncodingsPayload {
    names: Vec<String>,
    encodings: Vec<Vec<f64>>,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> LegacyError + '_ {
    move |source| LegacyError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Read a JSON file, degrading to `T::default()` when missing or corrupt.
fn load_json<T: DeserializeOwned + Default>(path: &Path, what: &str) -> T {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::warn!("{} not found at {}. Starting fresh.", what, path.display());
            return T::default();
        }
        Err(e) => {
            log::error!("Could not read {} at {}: {}", what, path.display(), e);
            return T::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            log::error!(
                "Error decoding {}: {}. Starting with empty records.",
                path.display(),
                e
            );
            T::default()
        }
    }
}

/// Overwrite `path` with 4-space indented JSON.
fn write_json<T: Serialize>(path: &Path, value: &T) -> LegacyResult<()> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    std::fs::write(path, out).map_err(io_error(path))
}

pub fn load_patients(path: &Path) -> Vec<PatientRecord> {
    let map: BTreeMap<String, PatientDetails> = load_json(path, "Patient data");
    map.into_iter()
        .map(|(name, details)| PatientRecord::new(name, details))
        .collect()
}

pub fn load_doctors(path: &Path) -> Vec<DoctorRecord> {
    let map: BTreeMap<String, DoctorDetails> = load_json(path, "Doctor data");
    map.into_iter()
        .map(|(name, details)| DoctorRecord::new(name, details))
        .collect()
}

/// Legacy appointments with fresh ids, sorted by (date, time).
pub fn load_appointments(path: &Path) -> Vec<Appointment> {
    let legacy: Vec<LegacyAppointment> = load_json(path, "Appointments");
    let mut appointments: Vec<Appointment> = legacy
        .into_iter()
        .map(LegacyAppointment::into_appointment)
        .collect();
    sort_appointments(&mut appointments);
    appointments
}

/// Read `encodings.bin`; any defect yields an empty list and a warning.
pub fn load_encodings(path: &Path) -> Vec<FaceEncoding> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::warn!("No known faces found at {}.", path.display());
            return Vec::new();
        }
        Err(e) => {
            log::warn!("Could not read {}: {}. Starting fresh.", path.display(), e);
            return Vec::new();
        }
    };

    match decode_encodings(&bytes) {
        Ok(encodings) => encodings,
        Err(e) => {
            log::warn!("Could not load {}: {}. Starting fresh.", path.display(), e);
            Vec::new()
        }
    }
}

pub fn save_patients(path: &Path, patients: &[PatientRecord]) -> LegacyResult<()> {
    let map: BTreeMap<&str, &PatientDetails> = patients
        .iter()
        .map(|p| (p.name.as_str(), &p.details))
        .collect();
    write_json(path, &map)
}

pub fn save_doctors(path: &Path, doctors: &[DoctorRecord]) -> LegacyResult<()> {
    let map: BTreeMap<&str, &DoctorDetails> = doctors
        .iter()
        .map(|d| (d.name.as_str(), &d.details))
        .collect();
    write_json(path, &map)
}

/// Write appointments in (date, time) order without their ids.
pub fn save_appointments(path: &Path, appointments: &[Appointment]) -> LegacyResult<()> {
    let mut sorted = appointments.to_vec();
    sort_appointments(&mut sorted);
    let legacy: Vec<LegacyAppointment> = sorted.iter().map(LegacyAppointment::from).collect();
    write_json(path, &legacy)
}

pub fn save_encodings(path: &Path, encodings: &[FaceEncoding]) -> LegacyResult<()> {
    let bytes = encode_encodings(encodings)?;
    std::fs::write(path, bytes).map_err(io_error(path))
}

/// Serialize encodings as magic + checksum + JSON payload.
pub fn encode_encodings(encodings: &[FaceEncoding]) -> LegacyResult<Vec<u8>> {
    let payload = EncodingsPayload {
        names: encodings.iter().map(|e| e.name.clone()).collect(),
        encodings: encodings.iter().map(|e| e.vector.clone()).collect(),
    };
    let json = serde_json::to_vec(&payload)?;
    let checksum = Sha256::digest(&json);

    let mut out = Vec::with_capacity(ENCODINGS_MAGIC.len() + CHECKSUM_LEN + json.len());
    out.extend_from_slice(ENCODINGS_MAGIC);
    out.extend_from_slice(&checksum);
    out.extend_from_slice(&json);
    Ok(out)
}

/// Parse bytes written by [`encode_encodings`].
pub fn decode_encodings(bytes: &[u8]) -> LegacyResult<Vec<FaceEncoding>> {
    let header = ENCODINGS_MAGIC.len() + CHECKSUM_LEN;
    if bytes.len() < header || &bytes[..ENCODINGS_MAGIC.len()] != ENCODINGS_MAGIC {
        return Err(LegacyError::CorruptEncodings("bad magic".into()));
    }

    let stored = &bytes[ENCODINGS_MAGIC.len()..header];
    let json = &bytes[header..];
    let actual = Sha256::digest(json);
    if stored != actual.as_slice() {
        return Err(LegacyError::CorruptEncodings(format!(
            "checksum mismatch (stored {}, computed {})",
            hex::encode(stored),
            hex::encode(actual)
        )));
    }

    let payload: EncodingsPayload = serde_json::from_slice(json)
        .map_err(|e| LegacyError::CorruptEncodings(e.to_string()))?;
    if payload.names.len() != payload.encodings.len() {
        return Err(LegacyError::CorruptEncodings(format!(
            "{} names but {} encodings",
            payload.names.len(),
            payload.encodings.len()
        )));
    }

    Ok(payload
        .names
        .into_iter()
        .zip(payload.encodings)
        .map(|(name, vector)| FaceEncoding { name, vector })
        .collect())
}

/// Counts from an import or export run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransferSummary {
    pub patients: usize,
    pub doctors: usize,
    pub appointments: usize,
    pub faces: usize,
    pub skipped: usize,
}

/// Import a legacy directory in one transaction.
///
/// Patients, doctors and faces already present are skipped, as are
/// appointments identical to an existing one.
pub fn import_dir(db: &mut Database, dir: &Path) -> LegacyResult<TransferSummary> {
    let patients = load_patients(&dir.join(PATIENT_FILE));
    let doctors = load_doctors(&dir.join(DOCTOR_FILE));
    let appointments = load_appointments(&dir.join(APPOINTMENT_FILE));
    let faces = load_encodings(&dir.join(ENCODINGS_FILE));

    let summary = db.with_transaction(|db| {
        let mut summary = TransferSummary::default();

        for patient in &patients {
            if is_reserved_identity(&patient.name) {
                log::warn!("Skipping patient with reserved name {:?}", patient.name);
                summary.skipped += 1;
            } else if db.patient_exists(&patient.name)? {
                log::info!("Skipping existing patient {}", patient.name);
                summary.skipped += 1;
            } else {
                db.insert_patient(patient)?;
                summary.patients += 1;
            }
        }

        for doctor in &doctors {
            if db.doctor_exists(&doctor.name)? {
                log::info!("Skipping existing doctor {}", doctor.name);
                summary.skipped += 1;
            } else {
                db.insert_doctor(doctor)?;
                summary.doctors += 1;
            }
        }

        let mut existing: Vec<LegacyAppointment> = db
            .list_appointments()?
            .iter()
            .map(LegacyAppointment::from)
            .collect();
        for appointment in &appointments {
            let key = LegacyAppointment::from(appointment);
            if existing.contains(&key) {
                log::info!(
                    "Skipping duplicate appointment for {} on {} at {}",
                    appointment.name,
                    appointment.date,
                    appointment.time
                );
                summary.skipped += 1;
            } else {
                db.insert_appointment(appointment)?;
                existing.push(key);
                summary.appointments += 1;
            }
        }

        for face in &faces {
            if is_reserved_identity(&face.name) {
                log::warn!("Skipping face encoding with reserved name {:?}", face.name);
                summary.skipped += 1;
            } else if face.vector.is_empty() || db.face_encoding_exists(&face.name)? {
                log::info!("Skipping face encoding for {}", face.name);
                summary.skipped += 1;
            } else {
                db.insert_face_encoding(face)?;
                summary.faces += 1;
            }
        }

        Ok(summary)
    })?;

    log::info!(
        "Imported {} patients, {} doctors, {} appointments, {} faces from {} ({} skipped)",
        summary.patients,
        summary.doctors,
        summary.appointments,
        summary.faces,
        dir.display(),
        summary.skipped
    );
    Ok(summary)
}

/// Write every store to `dir` in the legacy layout, overwriting.
pub fn export_dir(db: &Database, dir: &Path) -> LegacyResult<TransferSummary> {
    std::fs::create_dir_all(dir).map_err(io_error(dir))?;

    let patients = db.list_patients()?;
    let doctors = db.list_doctors()?;
    let appointments = db.list_appointments()?;
    let faces = db.list_face_encodings()?;

    save_patients(&dir.join(PATIENT_FILE), &patients)?;
    save_doctors(&dir.join(DOCTOR_FILE), &doctors)?;
    save_appointments(&dir.join(APPOINTMENT_FILE), &appointments)?;
    save_encodings(&dir.join(ENCODINGS_FILE), &faces)?;

    log::info!("Exported kiosk data to {}", dir.display());
    Ok(TransferSummary {
        patients: patients.len(),
        doctors: doctors.len(),
        appointments: appointments.len(),
        faces: faces.len(),
        skipped: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn face(name: &str, vector: Vec<f64>) -> FaceEncoding {
        FaceEncoding {
            name: name.into(),
            vector,
        }
    }

    #[test]
    fn test_invalid_patient_json_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PATIENT_FILE);
        std::fs::write(&path, "{ not json").unwrap();
        assert!(load_patients(&path).is_empty());
    }

    #[test]
    fn test_missing_files_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_doctors(&dir.path().join(DOCTOR_FILE)).is_empty());
        assert!(load_appointments(&dir.path().join(APPOINTMENT_FILE)).is_empty());
        assert!(load_encodings(&dir.path().join(ENCODINGS_FILE)).is_empty());
    }

    #[test]
    fn test_json_uses_four_space_indent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PATIENT_FILE);
        save_patients(
            &path,
            &[PatientRecord::new(
                "alice".into(),
                PatientDetails {
                    age: "34".into(),
                    gender: "F".into(),
                    allergies: "None".into(),
                    history: "Asthma".into(),
                    last_visit: "2025-01-15 09:30:00".into(),
                },
            )],
        )
        .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n    \"alice\": {\n        \"age\": \"34\""));
        assert_eq!(load_patients(&path)[0].details.history, "Asthma");
    }

    #[test]
    fn test_appointments_saved_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(APPOINTMENT_FILE);
        let mk = |date: &str| {
            Appointment::new(
                "alice".into(),
                NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                "Checkup".into(),
                "House".into(),
            )
        };
        save_appointments(&path, &[mk("2025-03-01"), mk("2025-02-01")]).unwrap();

        let raw: Vec<LegacyAppointment> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw[0].date, "2025-02-01");
        assert_eq!(load_appointments(&path).len(), 2);
    }

    #[test]
    fn test_encodings_file() {
        let faces = vec![face("alice", vec![1.0, 0.0]), face("bob", vec![0.5, 0.5])];
        let bytes = encode_encodings(&faces).unwrap();
        assert!(bytes.starts_with(ENCODINGS_MAGIC));
        assert_eq!(decode_encodings(&bytes).unwrap(), faces);

        let mut tampered = bytes.clone();
        let last = tampered.len() - 2;
        tampered[last] ^= 0x01;
        assert!(matches!(
            decode_encodings(&tampered),
            Err(LegacyError::CorruptEncodings(_))
        ));
        assert!(decode_encodings(b"PICKLE").is_err());
    }

    #[test]
    fn test_unequal_sequences_rejected() {
        let json = br#"{"names": ["alice", "bob"], "encodings": [[1.0]]}"#;
        let mut bytes = ENCODINGS_MAGIC.to_vec();
        bytes.extend_from_slice(&Sha256::digest(json));
        bytes.extend_from_slice(json);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ENCODINGS_FILE);
        std::fs::write(&path, bytes).unwrap();
        assert!(load_encodings(&path).is_empty());
    }

    #[test]
    fn test_import_skips_existing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PATIENT_FILE),
            r#"{
                "alice": {"age": "34", "gender": "F", "allergies": "None", "history": "Asthma", "last_visit": "2025-01-15 09:30:00"},
                "bob": {"age": "50", "gender": "M", "allergies": "Latex", "history": "None", "last_visit": "2025-01-16 10:00:00"}
            }"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join(APPOINTMENT_FILE),
            r#"[{"name": "alice", "date": "2025-03-01", "time": "09:00", "reason": "Flu"}]"#,
        )
        .unwrap();
        save_encodings(&dir.path().join(ENCODINGS_FILE), &[face("alice", vec![1.0, 0.0])]).unwrap();

        let mut db = Database::open_in_memory().unwrap();
        let first = import_dir(&mut db, dir.path()).unwrap();
        assert_eq!(first.patients, 2);
        assert_eq!(first.appointments, 1);
        assert_eq!(first.faces, 1);
        assert_eq!(first.skipped, 0);

        let second = import_dir(&mut db, dir.path()).unwrap();
        assert_eq!(second.patients + second.appointments + second.faces, 0);
        assert_eq!(second.skipped, 4);
        assert_eq!(db.count_appointments().unwrap(), 1);
        assert_eq!(db.list_appointments().unwrap()[0].doctor, "Unassigned");
    }

    #[test]
    fn test_export_then_import_into_fresh_db() {
        let source = Database::open_in_memory().unwrap();
        source
            .insert_face_encoding(&face("alice", vec![0.1, 0.2, 0.3]))
            .unwrap();
        source
            .insert_appointment(&Appointment::new(
                "alice".into(),
                NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                "Checkup".into(),
                "House".into(),
            ))
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let exported = export_dir(&source, dir.path()).unwrap();
        assert_eq!(exported.faces, 1);

        let mut target = Database::open_in_memory().unwrap();
        let imported = import_dir(&mut target, dir.path()).unwrap();
        assert_eq!(imported.faces, 1);
        assert_eq!(imported.appointments, 1);
        assert_eq!(
            target.list_face_encodings().unwrap()[0].vector,
            vec![0.1, 0.2, 0.3]
        );
    }
}

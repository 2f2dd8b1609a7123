//! Per-frame matching and record correlation.
//!
//! Stateless across frames: each call reads the vector store and the
//! record store and produces a fresh view.

use chrono::NaiveDate;
use triage_kiosk_vision::{FaceBox, FaceDetector, Frame};

use super::{RecognitionResult, VectorStore};
use crate::config::{RecognitionConfig, SubjectPolicy};
use crate::db::Database;
use crate::models::{Appointment, Identity, PatientDetails};

/// A detected face in full-resolution coordinates with its identity.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceLabel {
    pub face: FaceBox,
    pub identity: Identity,
}

/// Every face found in a frame plus the one chosen to drive the panel.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameView {
    pub labels: Vec<FaceLabel>,
    pub subject: Option<usize>,
}

impl FrameView {
    pub fn subject_label(&self) -> Option<&FaceLabel> {
        self.subject.and_then(|i| self.labels.get(i))
    }

    /// Identity of the subject, `Unknown` when no face was found.
    pub fn subject_identity(&self) -> Identity {
        self.subject_label()
            .map(|label| label.identity.clone())
            .unwrap_or(Identity::Unknown)
    }
}

/// Detect and identify every face in `frame`.
pub fn correlate_frame<D: FaceDetector + ?Sized>(
    frame: &Frame,
    detector: &mut D,
    store: &VectorStore,
    config: &RecognitionConfig,
) -> RecognitionResult<FrameView> {
    let small = frame.downscale(config.frame_scale);

    let labels: Vec<FaceLabel> = detector
        .detect(&small)?
        .into_iter()
        .map(|detection| FaceLabel {
            face: detection.face.restore(&small, frame),
            identity: store.match_face(&detection.embedding, config.tolerance),
        })
        .collect();

    let subject = select_subject(&labels, config.subject_policy);
    Ok(FrameView { labels, subject })
}

/// Index of the face whose record the panel shows.
///
/// `LargestFace` breaks area ties in favour of the later face, which makes it
/// agree with `LastFace` whenever all boxes are the same size.
pub fn select_subject(labels: &[FaceLabel], policy: SubjectPolicy) -> Option<usize> {
    if labels.is_empty() {
        return None;
    }
    match policy {
        SubjectPolicy::LastFace => Some(labels.len() - 1),
        SubjectPolicy::LargestFace => {
            let mut best = 0;
            for (index, label) in labels.iter().enumerate().skip(1) {
                if label.face.area() >= labels[best].face.area() {
                    best = index;
                }
            }
            Some(best)
        }
    }
}

/// An appointment as shown on the panel.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledVisit {
    pub appointment: Appointment,
    pub is_today: bool,
}

/// Everything the panel needs about the subject.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelData {
    pub subject: String,
    pub details: PatientDetails,
    pub has_record: bool,
    pub visits: Vec<ScheduledVisit>,
}

impl PanelData {
    /// Placeholder details for a subject with no patient record.
    pub fn missing_details() -> PatientDetails {
        PatientDetails {
            age: "N/A".into(),
            gender: "N/A".into(),
            allergies: "Unknown".into(),
            history: "No record found.".into(),
            last_visit: "N/A".into(),
        }
    }

    pub fn is_known(&self) -> bool {
        self.has_record
    }

    /// Allergy alert escalates only for a real record with real allergies.
    pub fn critical_allergy(&self) -> bool {
        self.has_record && self.details.has_critical_allergy()
    }
}

/// Join an identity to its patient record and appointments.
///
/// A matched identity whose record is missing is presented like an unknown
/// face. Appointments are matched case-insensitively with no date filter.
pub fn resolve_panel(
    db: &Database,
    identity: &Identity,
    today: NaiveDate,
) -> RecognitionResult<PanelData> {
    let subject = identity.label().to_string();

    let record = match identity.name() {
        Some(name) => db.get_patient(name)?,
        None => None,
    };
    if identity.is_known() && record.is_none() {
        log::warn!("Recognized {} but no patient record exists", subject);
    }

    let visits = db
        .appointments_for_patient(&subject)?
        .into_iter()
        .map(|appointment| ScheduledVisit {
            is_today: appointment.is_on(today),
            appointment,
        })
        .collect();

    Ok(match record {
        Some(record) => PanelData {
            subject,
            details: record.details,
            has_record: true,
            visits,
        },
        None => PanelData {
            subject,
            details: PanelData::missing_details(),
            has_record: false,
            visits,
        },
    })
}

//! Triage panel layout.
//!
//! Rendering is a pure function of the resolved panel data and the clock, so
//! a host can draw the result with any toolkit.

use chrono::NaiveDateTime;
use serde::Serialize;

use super::PanelData;
use crate::config::PanelConfig;
use crate::models::UNKNOWN_IDENTITY;

pub const PANEL_TITLE: &str = ":: ITS TRIAGE CONSOLE ::";
pub const HISTORY_HEADING: &str = ":: HISTORY LOG ::";
pub const APPOINTMENT_HEADING: &str = ":: APPOINTMENT STATUS ::";
pub const NO_APPOINTMENT: &str = "NO APPOINTMENT FOUND.";
pub const SYSTEM_STATUS: &str = "SYSTEM ONLINE";

/// Visual role of a panel line. Hosts map these to colours and weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStyle {
    Title,
    Identity,
    UnknownIdentity,
    Field,
    Alert,
    CriticalAlert,
    Heading,
    AppointmentHeading,
    Body,
    Today,
    Clock,
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelLine {
    pub text: String,
    pub style: LineStyle,
}

impl PanelLine {
    fn new(text: impl Into<String>, style: LineStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// The composed status panel, top to bottom. The last two lines are the
/// footer clock and system status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelView {
    pub lines: Vec<PanelLine>,
}

impl PanelView {
    pub fn texts(&self) -> Vec<&str> {
        self.lines.iter().map(|l| l.text.as_str()).collect()
    }

    pub fn has_style(&self, style: LineStyle) -> bool {
        self.lines.iter().any(|l| l.style == style)
    }

    /// Plain-text rendering, one line per panel line.
    pub fn to_text(&self) -> String {
        self.texts().join("\n")
    }
}

/// Lay out the panel for `data` at time `now`.
pub fn render_panel(data: &PanelData, config: &PanelConfig, now: NaiveDateTime) -> PanelView {
    let details = &data.details;
    let mut lines = vec![PanelLine::new(PANEL_TITLE, LineStyle::Title)];

    let identity_style = if data.subject == UNKNOWN_IDENTITY {
        LineStyle::UnknownIdentity
    } else {
        LineStyle::Identity
    };
    lines.push(PanelLine::new(
        format!("ID: {}", data.subject.to_uppercase()),
        identity_style,
    ));

    for (label, value) in [
        ("AGE", details.age.as_str()),
        ("GENDER", details.gender.as_str()),
        ("LAST VISIT", details.last_visit_date()),
    ] {
        lines.push(PanelLine::new(
            format!("{}: {}", label, value.to_uppercase()),
            LineStyle::Field,
        ));
    }

    let alert_style = if data.critical_allergy() {
        LineStyle::CriticalAlert
    } else {
        LineStyle::Alert
    };
    lines.push(PanelLine::new(
        format!("ALERT: {}", details.allergies.to_uppercase()),
        alert_style,
    ));

    lines.push(PanelLine::new(HISTORY_HEADING, LineStyle::Heading));
    for line in wrap_words(&details.history, config.wrap_columns) {
        lines.push(PanelLine::new(line, LineStyle::Body));
    }

    lines.push(PanelLine::new(
        APPOINTMENT_HEADING,
        LineStyle::AppointmentHeading,
    ));
    if data.visits.is_empty() {
        lines.push(PanelLine::new(NO_APPOINTMENT, LineStyle::Body));
    }
    for visit in &data.visits {
        let appt = &visit.appointment;
        let prefix = if visit.is_today { "TODAY " } else { "" };
        lines.push(PanelLine::new(
            format!("{}{} | Dr. {} | {}", prefix, appt.time, appt.doctor, appt.reason),
            if visit.is_today {
                LineStyle::Today
            } else {
                LineStyle::Body
            },
        ));
    }

    lines.push(PanelLine::new(
        now.format("%H:%M:%S").to_string(),
        LineStyle::Clock,
    ));
    lines.push(PanelLine::new(SYSTEM_STATUS, LineStyle::Status));

    PanelView { lines }
}

/// Greedy word wrap. A word longer than `columns` gets a line of its own.
pub fn wrap_words(text: &str, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
        } else if current.chars().count() + 1 + word.chars().count() <= columns {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Appointment, PatientDetails};
    use crate::recognition::ScheduledVisit;
    use chrono::{NaiveDate, NaiveTime};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(14, 5, 9)
            .unwrap()
    }

    fn known(allergies: &str) -> PanelData {
        PanelData {
            subject: "alice".into(),
            details: PatientDetails {
                age: "34".into(),
                gender: "f".into(),
                allergies: allergies.into(),
                history: "Mild asthma since childhood, uses inhaler as needed".into(),
                last_visit: "2025-01-15 09:30:00".into(),
            },
            has_record: true,
            visits: Vec::new(),
        }
    }

    #[test]
    fn test_known_patient_layout() {
        let view = render_panel(&known("Penicillin"), &PanelConfig::default(), now());
        let texts = view.texts();

        assert_eq!(texts[0], PANEL_TITLE);
        assert_eq!(texts[1], "ID: ALICE");
        assert_eq!(texts[2], "AGE: 34");
        assert_eq!(texts[3], "GENDER: F");
        assert_eq!(texts[4], "LAST VISIT: 2025-01-15");
        assert_eq!(texts[5], "ALERT: PENICILLIN");
        assert_eq!(view.lines[5].style, LineStyle::CriticalAlert);
        assert!(texts.contains(&NO_APPOINTMENT));
        assert_eq!(texts[texts.len() - 2], "14:05:09");
        assert_eq!(texts[texts.len() - 1], SYSTEM_STATUS);
    }

    #[test]
    fn test_sentinel_allergies_not_critical() {
        for allergies in ["None", "n/a"] {
            let view = render_panel(&known(allergies), &PanelConfig::default(), now());
            assert!(!view.has_style(LineStyle::CriticalAlert));
            assert!(view.has_style(LineStyle::Alert));
        }
    }

    #[test]
    fn test_unknown_subject() {
        let data = PanelData {
            subject: "Unknown".into(),
            details: PanelData::missing_details(),
            has_record: false,
            visits: Vec::new(),
        };
        let view = render_panel(&data, &PanelConfig::default(), now());
        assert_eq!(view.lines[1].style, LineStyle::UnknownIdentity);
        assert!(view.texts().contains(&"ALERT: UNKNOWN"));
        assert!(view.texts().contains(&"No record found."));
        assert!(!view.has_style(LineStyle::CriticalAlert));
    }

    #[test]
    fn test_appointment_lines() {
        let mut data = known("None");
        let appt = Appointment::new(
            "alice".into(),
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            "Follow-up".into(),
            "House".into(),
        );
        data.visits = vec![
            ScheduledVisit { appointment: appt.clone(), is_today: true },
            ScheduledVisit { appointment: appt, is_today: false },
        ];

        let view = render_panel(&data, &PanelConfig::default(), now());
        let texts = view.texts();
        assert!(texts.contains(&"TODAY 09:00 | Dr. House | Follow-up"));
        assert!(texts.contains(&"09:00 | Dr. House | Follow-up"));
        assert!(!texts.contains(&NO_APPOINTMENT));
        assert!(view.has_style(LineStyle::Today));
    }

    #[test]
    fn test_wrap_words() {
        assert_eq!(
            wrap_words("one two three four", 9),
            vec!["one two", "three", "four"]
        );
        assert_eq!(wrap_words("supercalifragilistic ok", 8), vec!["supercalifragilistic", "ok"]);
        assert!(wrap_words("   ", 10).is_empty());
    }

    #[test]
    fn test_history_respects_columns() {
        let config = PanelConfig { wrap_columns: 12 };
        let view = render_panel(&known("None"), &config, now());
        let body: Vec<_> = view
            .lines
            .iter()
            .take_while(|l| l.style != LineStyle::AppointmentHeading)
            .filter(|l| l.style == LineStyle::Body)
            .collect();
        assert!(body.len() > 1);
        assert!(body.iter().all(|l| l.text.chars().count() <= 12));
    }
}

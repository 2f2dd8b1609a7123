//! Plain-text roster views and CSV export.

use crate::models::{Appointment, DoctorRecord};

pub const APPOINTMENTS_TITLE: &str = ":: SCHEDULED APPOINTMENTS LOG ::";
pub const NO_APPOINTMENTS: &str = ":: NO CURRENT APPOINTMENTS FOUND ::";
pub const DOCTORS_TITLE: &str = ":: DOCTOR ROSTER AND SCHEDULES ::";
pub const NO_DOCTORS: &str = ":: NO DOCTOR RECORDS FOUND ::";

const REASON_LIMIT: usize = 23;
const REASON_KEEP: usize = 20;

/// Shorten a reason for single-line display.
pub fn truncate_reason(reason: &str) -> String {
    if reason.chars().count() > REASON_LIMIT {
        let kept: String = reason.chars().take(REASON_KEEP).collect();
        format!("{}...", kept)
    } else {
        reason.to_string()
    }
}

/// Appointment management table. Row numbers are the 1-based positions
/// accepted for cancellation.
pub fn appointment_table(appointments: &[Appointment]) -> String {
    if appointments.is_empty() {
        return NO_APPOINTMENTS.to_string();
    }

    let mut out = format!("{}\n", APPOINTMENTS_TITLE);
    out.push_str(&format!(
        "{:<4} | {:<15} | {:<10} | {:<6} | {:<10} | REASON\n",
        "ID", "PATIENT ID", "DATE", "TIME", "DOCTOR"
    ));
    out.push_str(&"-".repeat(65));
    out.push('\n');

    for (i, appt) in appointments.iter().enumerate() {
        out.push_str(&format!(
            "{:<4} | {:<15} | {:<10} | {:<6} | {:<10} | {}\n",
            i + 1,
            appt.name,
            appt.date,
            appt.time,
            appt.doctor,
            truncate_reason(&appt.reason)
        ));
    }
    out
}

/// Doctor roster, sorted by name.
pub fn doctor_table(doctors: &[DoctorRecord]) -> String {
    if doctors.is_empty() {
        return NO_DOCTORS.to_string();
    }

    let mut sorted: Vec<&DoctorRecord> = doctors.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let mut out = format!("{}\n", DOCTORS_TITLE);
    out.push_str(&format!(
        "{:<15} | {:<15} | {:<11} | AVAILABLE DAYS | CONTACT\n",
        "DOCTOR NAME", "SPECIALIZATION", "HOURS"
    ));
    out.push_str(&"-".repeat(75));
    out.push('\n');

    for doctor in sorted {
        let schedule = &doctor.details.schedule;
        out.push_str(&format!(
            "{:<15} | {:<15} | {:<11} | {:<15} | {}\n",
            doctor.name,
            doctor.details.specialization,
            schedule.hours(),
            schedule.days_summary(),
            doctor.details.contact
        ));
    }
    out
}

/// Appointments as CSV, in list order.
pub fn appointments_to_csv(appointments: &[Appointment]) -> String {
    let mut csv = String::from("position,id,patient,date,time,doctor,reason\n");
    for (i, appt) in appointments.iter().enumerate() {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            i + 1,
            escape_csv(&appt.id),
            escape_csv(&appt.name),
            escape_csv(&appt.date),
            escape_csv(&appt.time),
            escape_csv(&appt.doctor),
            escape_csv(&appt.reason),
        ));
    }
    csv
}

/// Escape a string for CSV output.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

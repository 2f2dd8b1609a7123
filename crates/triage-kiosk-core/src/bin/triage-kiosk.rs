//! Operator command line for the triage kiosk stores.
//!
//! The camera loop is driven by the host shell; this tool covers the record
//! keeping side: listing, booking, cancelling and legacy file transfer.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Datelike, Local, NaiveDateTime, Timelike};
use clap::{Parser, Subcommand};
use env_logger::Env;

use triage_kiosk_core::export::{appointment_table, appointments_to_csv, doctor_table};
use triage_kiosk_core::forms::{BookingForm, DoctorForm, MERIDIEM_OPTIONS, MONTH_ABBR};
use triage_kiosk_core::{KioskConfig, KioskContext};

#[derive(Parser)]
#[command(name = "triage-kiosk")]
#[command(about = "Triage kiosk record management")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, default_value = "triage_kiosk.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import legacy patient, doctor, appointment and face files
    Import { dir: PathBuf },
    /// Export every store in the legacy flat-file layout
    Export { dir: PathBuf },
    /// List registered patients
    Patients,
    /// Print the doctor roster
    Doctors,
    /// Print the appointment table
    Appointments {
        #[arg(long, default_value_t = false)]
        csv: bool,
    },
    /// Book an appointment
    Book {
        #[arg(long)]
        patient: String,
        #[arg(long)]
        doctor: String,
        #[arg(long)]
        reason: String,
        /// Local date and time, "YYYY-MM-DD HH:MM"
        #[arg(long)]
        at: String,
    },
    /// Cancel by table position or appointment id
    Cancel { target: String },
    /// Register a doctor
    AddDoctor {
        #[arg(long)]
        name: String,
        #[arg(long)]
        specialization: String,
        #[arg(long)]
        contact: String,
        /// Comma-separated day abbreviations, e.g. "Mon,Wed,Fri"
        #[arg(long, value_delimiter = ',')]
        days: Vec<String>,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let config = KioskConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let mut ctx = KioskContext::open(config).context("opening kiosk database")?;

    match cli.command {
        Commands::Import { dir } => {
            let summary = ctx
                .import_legacy(&dir)
                .with_context(|| format!("importing {}", dir.display()))?;
            println!(
                "Imported {} patients, {} doctors, {} appointments, {} faces ({} skipped)",
                summary.patients,
                summary.doctors,
                summary.appointments,
                summary.faces,
                summary.skipped
            );
        }
        Commands::Export { dir } => {
            let summary = ctx
                .export_legacy(&dir)
                .with_context(|| format!("exporting to {}", dir.display()))?;
            println!(
                "Exported {} patients, {} doctors, {} appointments, {} faces",
                summary.patients, summary.doctors, summary.appointments, summary.faces
            );
        }
        Commands::Patients => {
            for patient in ctx.db().list_patients()? {
                println!(
                    "{:<15} | {:<4} | {:<8} | {}",
                    patient.name,
                    patient.details.age,
                    patient.details.gender,
                    patient.details.allergies
                );
            }
        }
        Commands::Doctors => {
            println!("{}", doctor_table(&ctx.db().list_doctors()?));
        }
        Commands::Appointments { csv } => {
            let appointments = ctx.db().list_appointments()?;
            if csv {
                print!("{}", appointments_to_csv(&appointments));
            } else {
                println!("{}", appointment_table(&appointments));
            }
        }
        Commands::Book {
            patient,
            doctor,
            reason,
            at,
        } => {
            let when = NaiveDateTime::parse_from_str(&at, "%Y-%m-%d %H:%M")
                .with_context(|| format!("invalid date/time '{}'", at))?;
            let form = picker_form(patient, doctor, reason, when);
            let booking = ctx.book_appointment(&form, Local::now().naive_local())?;
            if let Some(name) = booking.suggestion {
                log::warn!("Patient not registered. Did you mean '{}'?", name);
            }
            let appt = booking.appointment;
            println!(
                "Booked {} with {} on {} at {} ({})",
                appt.name,
                appt.doctor,
                appt.date,
                appt.time,
                appt.short_id()
            );
        }
        Commands::Cancel { target } => {
            let cancelled = if target.trim().parse::<i64>().is_ok() {
                ctx.cancel_appointment_at(&target)?
            } else {
                ctx.cancel_appointment(target.trim())?
            };
            println!(
                "Cancelled {} on {} at {}",
                cancelled.name, cancelled.date, cancelled.time
            );
        }
        Commands::AddDoctor {
            name,
            specialization,
            contact,
            days,
            start,
            end,
        } => {
            let doctor = ctx.register_doctor(&DoctorForm {
                name,
                specialization,
                contact,
                days,
                start_time: start,
                end_time: end,
            })?;
            println!(
                "Registered Dr. {} ({})",
                doctor.name,
                doctor.details.schedule.hours()
            );
        }
    }

    Ok(())
}

/// Express a timestamp the way the booking pickers would show it.
fn picker_form(patient: String, doctor: String, reason: String, when: NaiveDateTime) -> BookingForm {
    let (is_pm, hour) = when.hour12();
    BookingForm {
        patient,
        reason,
        doctor,
        year: when.year().to_string(),
        month: MONTH_ABBR[when.month0() as usize].to_string(),
        day: format!("{:02}", when.day()),
        hour: format!("{:02}", hour),
        minute: format!("{:02}", when.minute()),
        meridiem: MERIDIEM_OPTIONS[is_pm as usize].to_string(),
    }
}

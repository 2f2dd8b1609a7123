//! Doctor database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::{DoctorDetails, DoctorRecord, Schedule};

/// Raw doctor row before JSON decoding of the day list.
struct DoctorRow {
    name: String,
    specialization: String,
    contact: String,
    days: String,
    start_time: String,
    end_time: String,
}

impl TryFrom<DoctorRow> for DoctorRecord {
    type Error = DbError;

    fn try_from(row: DoctorRow) -> DbResult<Self> {
        Ok(DoctorRecord {
            name: row.name,
            details: DoctorDetails {
                specialization: row.specialization,
                contact: row.contact,
                schedule: Schedule {
                    days: serde_json::from_str(&row.days)?,
                    start_time: row.start_time,
                    end_time: row.end_time,
                },
            },
        })
    }
}

fn doctor_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DoctorRow> {
    Ok(DoctorRow {
        name: row.get(0)?,
        specialization: row.get(1)?,
        contact: row.get(2)?,
        days: row.get(3)?,
        start_time: row.get(4)?,
        end_time: row.get(5)?,
    })
}

impl Database {
    /// Insert a new doctor. Fails if the name is already registered.
    pub fn insert_doctor(&self, doctor: &DoctorRecord) -> DbResult<()> {
        if self.doctor_exists(&doctor.name)? {
            return Err(DbError::Constraint(format!(
                "Doctor ID '{}' already exists",
                doctor.name
            )));
        }
        self.upsert_doctor(doctor)?;
        log::info!("Doctor {} saved.", doctor.name);
        Ok(())
    }

    /// Insert or replace a doctor by name.
    pub fn upsert_doctor(&self, doctor: &DoctorRecord) -> DbResult<()> {
        let d = &doctor.details;
        let days_json = serde_json::to_string(&d.schedule.days)?;

        self.conn.execute(
            r#"
            INSERT INTO doctors (name, specialization, contact, days, start_time, end_time)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(name) DO UPDATE SET
                specialization = excluded.specialization,
                contact = excluded.contact,
                days = excluded.days,
                start_time = excluded.start_time,
                end_time = excluded.end_time,
                updated_at = datetime('now')
            "#,
            params![
                doctor.name,
                d.specialization,
                d.contact,
                days_json,
                d.schedule.start_time,
                d.schedule.end_time,
            ],
        )?;
        Ok(())
    }

    /// Get a doctor by exact name.
    pub fn get_doctor(&self, name: &str) -> DbResult<Option<DoctorRecord>> {
        self.conn
            .query_row(
                r#"
                SELECT name, specialization, contact, days, start_time, end_time
                FROM doctors
                WHERE name = ?
                "#,
                [name],
                doctor_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    pub fn doctor_exists(&self, name: &str) -> DbResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM doctors WHERE name = ?",
            [name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// List all doctors ordered by name.
    pub fn list_doctors(&self) -> DbResult<Vec<DoctorRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT name, specialization, contact, days, start_time, end_time
            FROM doctors
            ORDER BY name
            "#,
        )?;

        let rows = stmt.query_map([], doctor_row)?;

        let mut doctors = Vec::new();
        for row in rows {
            doctors.push(row?.try_into()?);
        }
        Ok(doctors)
    }

    /// Doctor names, ordered (for the booking drop-down).
    pub fn list_doctor_names(&self) -> DbResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT name FROM doctors ORDER BY name")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

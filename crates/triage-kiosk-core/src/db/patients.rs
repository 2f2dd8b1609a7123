//! Patient database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{PatientDetails, PatientRecord};

const PATIENT_COLUMNS: &str = "name, age, gender, allergies, history, last_visit";

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<PatientRecord> {
    Ok(PatientRecord {
        name: row.get(0)?,
        details: PatientDetails {
            age: row.get(1)?,
            gender: row.get(2)?,
            allergies: row.get(3)?,
            history: row.get(4)?,
            last_visit: row.get(5)?,
        },
    })
}

impl Database {
    /// Insert a new patient. Fails if the name is already registered.
    pub fn insert_patient(&self, patient: &PatientRecord) -> DbResult<()> {
        if self.patient_exists(&patient.name)? {
            return Err(DbError::Constraint(format!(
                "Patient ID '{}' already exists",
                patient.name
            )));
        }

        let d = &patient.details;
        self.conn.execute(
            r#"
            INSERT INTO patients (name, age, gender, allergies, history, last_visit)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![patient.name, d.age, d.gender, d.allergies, d.history, d.last_visit],
        )?;
        log::info!("Patient {} saved.", patient.name);
        Ok(())
    }

    /// Insert or replace a patient by name.
    pub fn upsert_patient(&self, patient: &PatientRecord) -> DbResult<()> {
        let d = &patient.details;
        self.conn.execute(
            r#"
            INSERT INTO patients (name, age, gender, allergies, history, last_visit)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(name) DO UPDATE SET
                age = excluded.age,
                gender = excluded.gender,
                allergies = excluded.allergies,
                history = excluded.history,
                last_visit = excluded.last_visit,
                updated_at = datetime('now')
            "#,
            params![patient.name, d.age, d.gender, d.allergies, d.history, d.last_visit],
        )?;
        Ok(())
    }

    /// Get a patient by exact name.
    pub fn get_patient(&self, name: &str) -> DbResult<Option<PatientRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM patients WHERE name = ?", PATIENT_COLUMNS),
                [name],
                patient_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Whether a patient with this exact name exists.
    pub fn patient_exists(&self, name: &str) -> DbResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM patients WHERE name = ?",
            [name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// List all patients ordered by name.
    pub fn list_patients(&self) -> DbResult<Vec<PatientRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM patients ORDER BY name",
            PATIENT_COLUMNS
        ))?;
        let rows = stmt.query_map([], patient_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// All registered patient names, ordered.
    pub fn list_patient_names(&self) -> DbResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT name FROM patients ORDER BY name")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Search patients by name (prefix match, case-insensitive).
    ///
    /// `%` and `_` in the query match literally.
    pub fn search_patients(&self, query: &str, limit: usize) -> DbResult<Vec<PatientRecord>> {
        let pattern = format!("{}%", escape_like(query));
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM patients WHERE name LIKE ? ESCAPE '\\' ORDER BY name LIMIT ?",
            PATIENT_COLUMNS
        ))?;
        let rows = stmt.query_map(params![pattern, limit as i64], patient_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn count_patients(&self) -> DbResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

//! Appointment database operations.
//!
//! Reads always come back ordered by (date, time), with insertion order
//! breaking ties, so the sort invariant holds after every insert and delete.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::Appointment;

const APPOINTMENT_SELECT: &str = r#"
    SELECT id, name, date, time, reason, doctor, created_at
    FROM appointments
"#;

const APPOINTMENT_ORDER: &str = "ORDER BY date, time, seq";

fn appointment_from_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: row.get(0)?,
        name: row.get(1)?,
        date: row.get(2)?,
        time: row.get(3)?,
        reason: row.get(4)?,
        doctor: row.get(5)?,
        created_at: row.get(6)?,
    })
}

impl Database {
    /// Insert a new appointment.
    pub fn insert_appointment(&self, appt: &Appointment) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO appointments (id, name, date, time, reason, doctor, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                appt.id,
                appt.name,
                appt.date,
                appt.time,
                appt.reason,
                appt.doctor,
                appt.created_at,
            ],
        )?;
        log::info!(
            "New appointment booked for {} on {} at {} with Dr. {}.",
            appt.name,
            appt.date,
            appt.time,
            appt.doctor
        );
        Ok(())
    }

    /// Get an appointment by stable id.
    pub fn get_appointment(&self, id: &str) -> DbResult<Option<Appointment>> {
        self.conn
            .query_row(
                &format!("{} WHERE id = ?", APPOINTMENT_SELECT),
                [id],
                appointment_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// All appointments in (date, time) order.
    pub fn list_appointments(&self) -> DbResult<Vec<Appointment>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} {}", APPOINTMENT_SELECT, APPOINTMENT_ORDER))?;
        let rows = stmt.query_map([], appointment_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Appointments for a patient, matched case-insensitively, in order.
    ///
    /// Past and future appointments are both returned.
    pub fn appointments_for_patient(&self, patient: &str) -> DbResult<Vec<Appointment>> {
        Ok(self
            .list_appointments()?
            .into_iter()
            .filter(|appt| appt.is_for(patient))
            .collect())
    }

    /// Stable id of the appointment at 1-based `position` in the current order.
    pub fn appointment_id_at(&self, position: usize) -> DbResult<Option<String>> {
        if position == 0 {
            return Ok(None);
        }
        self.conn
            .query_row(
                &format!(
                    "SELECT id FROM appointments {} LIMIT 1 OFFSET ?",
                    APPOINTMENT_ORDER
                ),
                [(position - 1) as i64],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Delete an appointment by stable id, returning what was removed.
    pub fn delete_appointment(&self, id: &str) -> DbResult<Appointment> {
        let appt = self
            .get_appointment(id)?
            .ok_or_else(|| DbError::NotFound(format!("appointment {}", id)))?;
        self.conn
            .execute("DELETE FROM appointments WHERE id = ?", [id])?;
        log::info!(
            "Appointment {} for {} has been cancelled.",
            appt.short_id(),
            appt.name
        );
        Ok(appt)
    }

    pub fn count_appointments(&self) -> DbResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM appointments", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn appt(name: &str, date: &str, time: &str) -> Appointment {
        Appointment::new(
            name.into(),
            NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            NaiveTime::parse_from_str(time, "%H:%M").unwrap(),
            "Follow-up".into(),
            "House".into(),
        )
    }

    #[test]
    fn test_insert_keeps_order() {
        let db = Database::open_in_memory().unwrap();
        db.insert_appointment(&appt("alice", "2025-03-01", "09:00")).unwrap();
        db.insert_appointment(&appt("alice", "2025-02-01", "10:00")).unwrap();

        let dates: Vec<_> = db
            .list_appointments()
            .unwrap()
            .into_iter()
            .map(|a| a.date)
            .collect();
        assert_eq!(dates, vec!["2025-02-01", "2025-03-01"]);
    }

    #[test]
    fn test_for_patient_case_insensitive() {
        let db = Database::open_in_memory().unwrap();
        db.insert_appointment(&appt("Alice", "2025-03-01", "09:00")).unwrap();
        db.insert_appointment(&appt("bob", "2025-03-01", "10:00")).unwrap();
        db.insert_appointment(&appt("ALICE", "2024-01-01", "10:00")).unwrap();

        let list = db.appointments_for_patient("alice").unwrap();
        assert_eq!(list.len(), 2);
        // Past appointments are included, still in order
        assert_eq!(list[0].date, "2024-01-01");
    }

    #[test]
    fn test_id_at_position() {
        let db = Database::open_in_memory().unwrap();
        let late = appt("alice", "2025-03-01", "09:00");
        let early = appt("bob", "2025-02-01", "10:00");
        db.insert_appointment(&late).unwrap();
        db.insert_appointment(&early).unwrap();

        assert_eq!(db.appointment_id_at(1).unwrap(), Some(early.id.clone()));
        assert_eq!(db.appointment_id_at(2).unwrap(), Some(late.id.clone()));
        assert_eq!(db.appointment_id_at(0).unwrap(), None);
        assert_eq!(db.appointment_id_at(3).unwrap(), None);
    }

    #[test]
    fn test_delete_by_id() {
        let db = Database::open_in_memory().unwrap();
        let a = appt("alice", "2025-03-01", "09:00");
        db.insert_appointment(&a).unwrap();

        let removed = db.delete_appointment(&a.id).unwrap();
        assert_eq!(removed.id, a.id);
        assert_eq!(db.count_appointments().unwrap(), 0);
        assert!(matches!(
            db.delete_appointment(&a.id),
            Err(DbError::NotFound(_))
        ));
    }
}

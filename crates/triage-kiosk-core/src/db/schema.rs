//! SQLite schema definition.

/// Complete database schema for the triage kiosk.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    name TEXT PRIMARY KEY CHECK (length(trim(name)) > 0),
    age TEXT NOT NULL,
    gender TEXT NOT NULL,
    allergies TEXT NOT NULL,
    history TEXT NOT NULL,
    last_visit TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- The reserved identity can never be stored
CREATE TRIGGER IF NOT EXISTS patients_reserved_name BEFORE INSERT ON patients
WHEN lower(trim(new.name)) = 'unknown'
BEGIN
    SELECT RAISE(ABORT, 'Patient name cannot be Unknown');
END;

-- ============================================================================
-- Doctors
-- ============================================================================

CREATE TABLE IF NOT EXISTS doctors (
    name TEXT PRIMARY KEY CHECK (length(trim(name)) > 0),
    specialization TEXT NOT NULL,
    contact TEXT NOT NULL,
    days TEXT NOT NULL DEFAULT '[]',              -- JSON array of weekday abbreviations
    start_time TEXT NOT NULL,                     -- HH:MM
    end_time TEXT NOT NULL,                       -- HH:MM
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- ============================================================================
-- Appointments (kept ordered by date, time; seq breaks ties)
-- ============================================================================

CREATE TABLE IF NOT EXISTS appointments (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,                      -- stable UUID
    name TEXT NOT NULL,
    date TEXT NOT NULL,                           -- YYYY-MM-DD
    time TEXT NOT NULL,                           -- HH:MM
    reason TEXT NOT NULL,
    doctor TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_appointments_order ON appointments(date, time, seq);
CREATE INDEX IF NOT EXISTS idx_appointments_name ON appointments(name COLLATE NOCASE);

-- ============================================================================
-- Face encodings (append-only, one per patient)
-- ============================================================================

CREATE TABLE IF NOT EXISTS face_encodings (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    dims INTEGER NOT NULL CHECK (dims > 0),
    vector BLOB NOT NULL,                         -- little-endian f64 x dims
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TRIGGER IF NOT EXISTS face_encodings_immutable BEFORE UPDATE ON face_encodings
BEGIN
    SELECT RAISE(ABORT, 'Face encodings are immutable');
END;
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        assert!(conn.execute_batch(SCHEMA).is_ok());
    }

    #[test]
    fn test_reserved_patient_name() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        let result = conn.execute(
            "INSERT INTO patients (name, age, gender, allergies, history, last_visit) VALUES (?, '1', 'F', 'None', '-', '-')",
            ["UNKNOWN"],
        );
        assert!(result.is_err());

        let result = conn.execute(
            "INSERT INTO patients (name, age, gender, allergies, history, last_visit) VALUES (?, '1', 'F', 'None', '-', '-')",
            [""],
        );
        assert!(result.is_err());

        let result = conn.execute(
            "INSERT INTO patients (name, age, gender, allergies, history, last_visit) VALUES (?, '1', 'F', 'None', '-', '-')",
            ["alice"],
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_face_encodings_immutable() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        conn.execute(
            "INSERT INTO face_encodings (name, dims, vector) VALUES ('alice', 1, x'000000000000F03F')",
            [],
        )
        .unwrap();

        let result = conn.execute("UPDATE face_encodings SET dims = 2 WHERE name = 'alice'", []);
        assert!(result.is_err());

        // Second vector for the same patient is rejected
        let result = conn.execute(
            "INSERT INTO face_encodings (name, dims, vector) VALUES ('alice', 1, x'0000000000000000')",
            [],
        );
        assert!(result.is_err());
    }
}

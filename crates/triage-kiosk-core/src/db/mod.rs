//! Database layer for the triage kiosk.
//!
//! All four stores (patients, doctors, appointments, face encodings) live in
//! one SQLite file, so every write is transactional.

mod appointments;
mod doctors;
mod faces;
mod patients;
mod schema;

use schema::SCHEMA;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use thiserror::Error;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        log::info!("Opened kiosk database at {}", path.display());
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` inside a transaction, committing only if it succeeds.
    ///
    /// The transaction rolls back when dropped, so an error or a panic in
    /// `f` leaves the connection usable.
    pub fn with_transaction<T, F>(&mut self, f: F) -> DbResult<T>
    where
        F: FnOnce(&Database) -> DbResult<T>,
    {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }
}

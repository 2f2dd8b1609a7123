//! Face encoding storage.
//!
//! Vectors are stored as little-endian `f64` blobs next to their length.

use rusqlite::params;

use super::{Database, DbError, DbResult};
use crate::models::FaceEncoding;

/// Pack a vector into its blob representation.
pub fn encode_vector(vector: &[f64]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Unpack a blob written by [`encode_vector`].
pub fn decode_vector(blob: &[u8], dims: usize) -> DbResult<Vec<f64>> {
    if blob.len() != dims * 8 {
        return Err(DbError::Corrupt(format!(
            "face vector blob has {} bytes, expected {} for {} dims",
            blob.len(),
            dims * 8,
            dims
        )));
    }
    Ok(blob
        .chunks_exact(8)
        .map(|chunk| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(chunk);
            f64::from_le_bytes(bytes)
        })
        .collect())
}

impl Database {
    /// Append an enrolled face. One per patient; encodings are immutable.
    pub fn insert_face_encoding(&self, encoding: &FaceEncoding) -> DbResult<()> {
        if encoding.vector.is_empty() {
            return Err(DbError::Constraint(format!(
                "face encoding for '{}' is empty",
                encoding.name
            )));
        }
        if self.face_encoding_exists(&encoding.name)? {
            return Err(DbError::Constraint(format!(
                "a face is already enrolled for '{}'",
                encoding.name
            )));
        }

        self.conn.execute(
            "INSERT INTO face_encodings (name, dims, vector) VALUES (?1, ?2, ?3)",
            params![
                encoding.name,
                encoding.vector.len() as i64,
                encode_vector(&encoding.vector),
            ],
        )?;
        Ok(())
    }

    pub fn face_encoding_exists(&self, name: &str) -> DbResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM face_encodings WHERE name = ?",
            [name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// All enrolled faces in enrollment order.
    ///
    /// Any undecodable row fails the whole load; callers decide how to degrade.
    pub fn list_face_encodings(&self) -> DbResult<Vec<FaceEncoding>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, dims, vector FROM face_encodings ORDER BY seq")?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, Vec<u8>>(2)?,
            ))
        })?;

        let mut encodings = Vec::new();
        for row in rows {
            let (name, dims, blob) = row?;
            let vector = decode_vector(&blob, dims.max(0) as usize)?;
            encodings.push(FaceEncoding { name, vector });
        }
        Ok(encodings)
    }
}

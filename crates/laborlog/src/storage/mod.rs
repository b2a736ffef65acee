//! Storage layer for laborlog.
//!
//! This module provides `SQLite`-based persistent storage for contraction
//! and hospital records.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::config::EndTimePolicy;
use crate::error::{Error, Result};
use crate::model::{whole_seconds, Contraction, Hospital, HospitalPatch, NewHospital};

const CONTRACTION_COLUMNS: &str =
    "id, start_time, end_time, duration_seconds, created_at, updated_at";

const HOSPITAL_COLUMNS: &str =
    "id, name, phone_number, address, notes, is_primary, created_at, updated_at";

/// Storage engine for contraction and hospital records.
///
/// Every statement that touches the primary-hospital flag runs in the same
/// transaction as the write that needs it, so no reader ever sees two
/// primaries.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    // === Contractions ===

    /// All contractions, newest start first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_contractions(&self) -> Result<Vec<Contraction>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CONTRACTION_COLUMNS} FROM contractions ORDER BY start_time DESC, id DESC"
        ))?;

        let contractions = stmt
            .query_map([], Self::row_to_contraction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(contractions)
    }

    /// Get a contraction by its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_contraction(&self, id: i64) -> Result<Option<Contraction>> {
        let result = self
            .conn
            .query_row(
                &format!("SELECT {CONTRACTION_COLUMNS} FROM contractions WHERE id = ?1"),
                [id],
                Self::row_to_contraction,
            )
            .optional()?;
        Ok(result)
    }

    /// Record the start of a contraction.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_contraction(&self, start_time: DateTime<Utc>) -> Result<Contraction> {
        let now = to_db(Utc::now());
        self.conn.execute(
            r"
            INSERT INTO contractions (start_time, created_at, updated_at)
            VALUES (?1, ?2, ?2)
            ",
            params![to_db(start_time), now],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("Inserted contraction with id {}", id);
        self.get_contraction(id)?
            .ok_or_else(|| Error::internal(format!("contraction {id} vanished after insert")))
    }

    /// Set the end time of a contraction and recompute its duration.
    ///
    /// The duration is derived from the stored start time. Returns `None` if
    /// no contraction has the given ID.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `end_time` precedes the start and the
    /// policy is [`EndTimePolicy::Reject`], or an error if the database
    /// operation fails.
    pub fn finish_contraction(
        &self,
        id: i64,
        end_time: DateTime<Utc>,
        policy: EndTimePolicy,
    ) -> Result<Option<Contraction>> {
        let start: Option<String> = self
            .conn
            .query_row(
                "SELECT start_time FROM contractions WHERE id = ?1",
                [id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(start) = start else {
            return Ok(None);
        };
        let start = from_db(&start).map_err(|e| Error::internal(e.to_string()))?;
        let end_time = end_time.trunc_subsecs(3);

        let mut duration = whole_seconds(start, end_time);
        if end_time < start {
            match policy {
                EndTimePolicy::Allow => {}
                EndTimePolicy::Reject => {
                    return Err(Error::validation("endTime must not be before startTime"));
                }
                EndTimePolicy::Clamp => duration = 0,
            }
        }

        self.conn.execute(
            r"
            UPDATE contractions
            SET end_time = ?1, duration_seconds = ?2, updated_at = ?3
            WHERE id = ?4
            ",
            params![to_db(end_time), duration, to_db(Utc::now()), id],
        )?;

        debug!("Finished contraction {} after {}s", id, duration);
        self.get_contraction(id)
    }

    /// Delete a contraction by ID.
    ///
    /// Returns `true` if a contraction was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_contraction(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM contractions WHERE id = ?1", [id])?;
        Ok(affected > 0)
    }

    // === Hospitals ===

    /// All hospitals, primary first, then by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_hospitals(&self) -> Result<Vec<Hospital>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {HOSPITAL_COLUMNS} FROM hospitals ORDER BY is_primary DESC, name ASC"
        ))?;

        let hospitals = stmt
            .query_map([], Self::row_to_hospital)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(hospitals)
    }

    /// Get a hospital by its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_hospital(&self, id: i64) -> Result<Option<Hospital>> {
        let result = self
            .conn
            .query_row(
                &format!("SELECT {HOSPITAL_COLUMNS} FROM hospitals WHERE id = ?1"),
                [id],
                Self::row_to_hospital,
            )
            .optional()?;
        Ok(result)
    }

    /// The hospital flagged as primary, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn primary_hospital(&self) -> Result<Option<Hospital>> {
        let result = self
            .conn
            .query_row(
                &format!("SELECT {HOSPITAL_COLUMNS} FROM hospitals WHERE is_primary = 1 LIMIT 1"),
                [],
                Self::row_to_hospital,
            )
            .optional()?;
        Ok(result)
    }

    /// Register a hospital.
    ///
    /// If the new hospital is primary, the previous primary is demoted in the
    /// same transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_hospital(&mut self, hospital: &NewHospital) -> Result<Hospital> {
        let now = to_db(Utc::now());
        let tx = self.conn.transaction()?;

        if hospital.is_primary {
            let demoted = tx.execute(
                "UPDATE hospitals SET is_primary = 0, updated_at = ?1 WHERE is_primary = 1",
                [&now],
            )?;
            if demoted > 0 {
                debug!("Demoted previous primary hospital");
            }
        }

        tx.execute(
            r"
            INSERT INTO hospitals (name, phone_number, address, notes, is_primary, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            ",
            params![
                hospital.name,
                hospital.phone_number,
                hospital.address,
                hospital.notes,
                hospital.is_primary,
                now,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        debug!("Inserted hospital with id {}", id);
        self.get_hospital(id)?
            .ok_or_else(|| Error::internal(format!("hospital {id} vanished after insert")))
    }

    /// Apply a partial update to a hospital.
    ///
    /// Setting `is_primary` to `true` demotes every other hospital in the same
    /// transaction. Empty address or notes clear the field. Returns `None` if
    /// no hospital has the given ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn update_hospital(&mut self, id: i64, patch: &HospitalPatch) -> Result<Option<Hospital>> {
        if patch.is_empty() {
            return self.get_hospital(id);
        }

        let now = to_db(Utc::now());
        let tx = self.conn.transaction()?;

        let exists: Option<i64> = tx
            .query_row("SELECT id FROM hospitals WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .optional()?;
        if exists.is_none() {
            return Ok(None);
        }

        if patch.is_primary == Some(true) {
            tx.execute(
                "UPDATE hospitals SET is_primary = 0, updated_at = ?1 WHERE is_primary = 1 AND id != ?2",
                params![now, id],
            )?;
        }

        let mut assignments: Vec<(&str, Value)> = Vec::new();
        if let Some(name) = &patch.name {
            assignments.push(("name", Value::Text(name.clone())));
        }
        if let Some(phone) = &patch.phone_number {
            assignments.push(("phone_number", Value::Text(phone.clone())));
        }
        if let Some(address) = &patch.address {
            assignments.push(("address", optional_text(address)));
        }
        if let Some(notes) = &patch.notes {
            assignments.push(("notes", optional_text(notes)));
        }
        if let Some(is_primary) = patch.is_primary {
            assignments.push(("is_primary", Value::Integer(i64::from(is_primary))));
        }
        assignments.push(("updated_at", Value::Text(now)));

        let set_clause = assignments
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{column} = ?{}", i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE hospitals SET {set_clause} WHERE id = ?{}",
            assignments.len() + 1
        );

        let values = assignments
            .into_iter()
            .map(|(_, value)| value)
            .chain(std::iter::once(Value::Integer(id)));
        tx.execute(&sql, params_from_iter(values))?;
        tx.commit()?;

        debug!("Updated hospital {}", id);
        self.get_hospital(id)
    }

    /// Delete a hospital by ID.
    ///
    /// Returns `true` if a hospital was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_hospital(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM hospitals WHERE id = ?1", [id])?;
        Ok(affected > 0)
    }

    /// Convert a database row to a Contraction struct.
    fn row_to_contraction(row: &rusqlite::Row) -> rusqlite::Result<Contraction> {
        let end_time: Option<String> = row.get(2)?;
        Ok(Contraction {
            id: row.get(0)?,
            start_time: timestamp_column(row, 1)?,
            end_time: end_time
                .map(|s| from_db(&s).map_err(|e| conversion_error(2, e)))
                .transpose()?,
            duration_seconds: row.get(3)?,
            created_at: timestamp_column(row, 4)?,
            updated_at: timestamp_column(row, 5)?,
        })
    }

    /// Convert a database row to a Hospital struct.
    fn row_to_hospital(row: &rusqlite::Row) -> rusqlite::Result<Hospital> {
        Ok(Hospital {
            id: row.get(0)?,
            name: row.get(1)?,
            phone_number: row.get(2)?,
            address: row.get(3)?,
            notes: row.get(4)?,
            is_primary: row.get(5)?,
            created_at: timestamp_column(row, 6)?,
            updated_at: timestamp_column(row, 7)?,
        })
    }
}

fn to_db(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn from_db(value: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc))
}

fn timestamp_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let value: String = row.get(idx)?;
    from_db(&value).map_err(|e| conversion_error(idx, e))
}

fn conversion_error(idx: usize, err: chrono::ParseError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn optional_text(value: &str) -> Value {
    if value.is_empty() {
        Value::Null
    } else {
        Value::Text(value.to_string())
    }
}

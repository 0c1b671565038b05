//! Storage layer for fakerestaurant.
//!
//! `SQLite`-backed persistence for users, restaurants, reviews and the vote
//! ledger. Each entity's queries live in their own submodule as an
//! `impl Storage` block; this module owns the connection and the helpers
//! they share.

pub mod migrations;
pub mod schema;

mod restaurants;
mod reviews;
mod users;
mod votes;

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Storage engine for the review platform.
///
/// Wraps a single `SQLite` connection with foreign keys enforced, so deleting
/// a restaurant or review cascades to everything that hangs off it.
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
        let mut conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;
        migrations::initialize_schema(&mut conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrations::initialize_schema(&mut conn)?;

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

    /// True when no user has registered yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.count_rows("users")? == 0)
    }

    /// Delete every user and, through the cascades, everything they own.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn clear(&self) -> Result<()> {
        let removed = self.conn.execute("DELETE FROM users", [])?;
        debug!("Cleared {} users and their data", removed);
        Ok(())
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            users: self.count_rows("users")?,
            restaurants: self.count_rows("restaurants")?,
            reviews: self.count_rows("reviews")?,
            votes: self.count_rows("votes")?,
            db_size_bytes,
        })
    }

    fn count_rows(&self, table: &str) -> Result<i64> {
        let count = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?;
        Ok(count)
    }
}

/// Row counts and file size of a database.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    /// Registered users.
    pub users: i64,
    /// Restaurant listings.
    pub restaurants: i64,
    /// Reviews across all restaurants.
    pub reviews: i64,
    /// Votes currently held.
    pub votes: i64,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

/// Current time in the fixed-width RFC 3339 form stored in every timestamp
/// column, so that text ordering matches time ordering.
pub(crate) fn timestamp_now() -> String {
    format_timestamp(Utc::now())
}

pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Read an RFC 3339 column into a UTC timestamp.
pub(crate) fn timestamp_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

//! Database migration system for fakerestaurant.
//!
//! The schema version lives in the `metadata` table. Opening a database
//! creates any missing tables, replays pending migrations in order, and
//! refuses to continue if the file was written by a newer build or holds
//! rows that break a foreign key.

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::schema::SCHEMA_STATEMENTS;

/// The current schema version.
pub const CURRENT_VERSION: i32 = 1;

/// Key used to store the schema version in the metadata table.
const VERSION_KEY: &str = "schema_version";

/// Initialize the database schema.
///
/// Creates all tables and indexes if they don't exist, runs any pending
/// migrations, then checks foreign-key integrity. Everything before the
/// integrity check happens in one transaction.
///
/// # Errors
///
/// Returns an error if schema creation or migration fails, if the database
/// schema is newer than this build, or if orphaned rows are found.
pub fn initialize_schema(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;

    for statement in SCHEMA_STATEMENTS {
        tx.execute(statement, [])?;
    }

    let version = get_schema_version(&tx)?;
    if version > CURRENT_VERSION {
        return Err(Error::DatabaseMigration {
            message: format!(
                "database schema version {version} is newer than supported version {CURRENT_VERSION}"
            ),
        });
    }
    if version < CURRENT_VERSION {
        run_migrations(&tx, version)?;
    }

    tx.commit()?;
    check_foreign_keys(conn)
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (fresh database).
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            [VERSION_KEY],
            |row| row.get(0),
        )
        .optional()?;

    match value {
        None => Ok(0),
        Some(value) => value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        }),
    }
}

/// Set the schema version in the database.
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT INTO metadata (key, value) VALUES (?1, ?2)
         ON CONFLICT (key) DO UPDATE SET value = excluded.value",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}

/// Run migrations from the given version to the current version.
fn run_migrations(conn: &Connection, from_version: i32) -> Result<()> {
    for version in (from_version + 1)..=CURRENT_VERSION {
        debug!("Applying schema migration {}", version);
        run_migration(conn, version)?;
        set_schema_version(conn, version)?;
    }

    info!(
        "Database schema migrated from version {} to {}",
        from_version, CURRENT_VERSION
    );
    Ok(())
}

/// Run a specific migration version.
fn run_migration(_conn: &Connection, version: i32) -> Result<()> {
    match version {
        // Version 1 is the base schema created by `SCHEMA_STATEMENTS`.
        1 => Ok(()),
        _ => Err(Error::DatabaseMigration {
            message: format!("unknown migration version: {version}"),
        }),
    }
}

/// Fail if any row references a parent that no longer exists.
fn check_foreign_keys(conn: &Connection) -> Result<()> {
    let mut stmt = conn.prepare("PRAGMA foreign_key_check")?;
    let violations: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<_, _>>()?;

    if let Some(table) = violations.first() {
        return Err(Error::DatabaseMigration {
            message: format!(
                "{} foreign key violation(s), first in table {table}",
                violations.len()
            ),
        });
    }
    Ok(())
}

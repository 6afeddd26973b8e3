use crate::error::Result;
use crate::vault::VaultEntry;

use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// System-of-record sink for persisted vault entries.
///
/// The pipeline treats every call as best effort: a failing sink is
/// logged and the session continues, so implementations never need
/// to retry internally.
pub trait RegistrySink: Send {
    /// Record one vault entry in the registry
    fn record(&self, entry: &VaultEntry) -> Result<()>;
}

/// SQLite-backed registry. A fresh connection is opened per call so a
/// poisoned handle cannot outlive the statement that broke it.
pub struct SqliteRegistry {
    database: PathBuf,
}

impl SqliteRegistry {
    /// Open the registry, creating the database and schema if needed
    pub fn open<P: AsRef<Path>>(database: P) -> Result<Self> {
        let database = database.as_ref().to_path_buf();
        let conn = Connection::open(&database)?;
        Self::ensure_schema(&conn)?;
        info!("Event registry ready at '{}'", database.display());
        Ok(Self { database })
    }

    fn ensure_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS vault_events (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                filename      TEXT NOT NULL,
                absolute_path TEXT NOT NULL,
                created_at    INTEGER NOT NULL
            );",
        )?;
        Ok(())
    }
}

impl RegistrySink for SqliteRegistry {
    fn record(&self, entry: &VaultEntry) -> Result<()> {
        let conn = Connection::open(&self.database)?;
        let absolute_path = entry.absolute_path.to_string_lossy();
        conn.execute(
            "INSERT INTO vault_events (filename, absolute_path, created_at)
             VALUES (?1, ?2, ?3)",
            params![
                entry.filename,
                absolute_path.as_ref(),
                entry.created_at.timestamp_millis(),
            ],
        )?;
        debug!("Registered vault entry '{}'", entry.filename);
        Ok(())
    }
}

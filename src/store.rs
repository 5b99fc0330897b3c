//! Connection provider for the storefront database
//!
//! Every operation opens its own connection and owns it until it returns.
//! There is no pooling: dropping the `Connection` closes it, and dropping an
//! uncommitted `Transaction` rolls it back.

use crate::error::{Result, SyncError};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};

/// Static connection parameters for the store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    pub path: PathBuf,
    /// Create the database file when it does not exist yet
    pub create_if_missing: bool,
    /// Enforce `REFERENCES` constraints
    pub foreign_keys: bool,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            create_if_missing: true,
            foreign_keys: true,
        }
    }

    /// Fail instead of creating a fresh database file
    pub fn existing_only(mut self) -> Self {
        self.create_if_missing = false;
        self
    }
}

/// Opens connections described by a `StoreConfig`
#[derive(Debug, Clone)]
pub struct ConnectionProvider {
    config: StoreConfig,
}

impl ConnectionProvider {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Open a new session to the store
    ///
    /// A single attempt is made; any failure is returned as
    /// `SyncError::Connection`.
    pub fn open(&self) -> Result<Connection> {
        self.open_session(self.config.create_if_missing)
    }

    /// Open a session for reading, never creating the database file
    pub fn open_existing(&self) -> Result<Connection> {
        self.open_session(false)
    }

    fn open_session(&self, create: bool) -> Result<Connection> {
        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if create {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }

        let conn = Connection::open_with_flags(&self.config.path, flags)
            .map_err(|e| self.connection_error(e))?;

        // Touch the schema so a file that is not a database fails here
        // rather than in the middle of an operation.
        let foreign_keys = if self.config.foreign_keys { "ON" } else { "OFF" };
        conn.execute_batch(&format!("PRAGMA foreign_keys = {}", foreign_keys))
            .and_then(|_| {
                conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| {
                    row.get::<_, i64>(0)
                })
            })
            .map_err(|e| self.connection_error(e))?;

        log::debug!("Opened database: {}", self.config.path.display());
        Ok(conn)
    }

    /// Close a session, surfacing close failures
    pub fn close(&self, conn: Connection) -> Result<()> {
        conn.close().map_err(|(_, e)| self.connection_error(e))?;
        log::debug!("Closed database: {}", self.config.path.display());
        Ok(())
    }

    fn connection_error(&self, source: rusqlite::Error) -> SyncError {
        SyncError::Connection {
            path: self.config.path.display().to_string(),
            source,
        }
    }
}

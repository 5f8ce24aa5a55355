//! SQLite connection handling and the system store

use std::path::{Path, PathBuf};
use std::time::Duration;
use rusqlite::{Connection, OpenFlags};
use crate::config::DbkeeperConfig;
use crate::{Error, Result};
use super::schema;

/// Whether opening a file may create it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Create,
    Existing,
}

/// Open a connection for a single operation.
///
/// With [`OpenMode::Existing`] a missing file is reported as
/// [`Error::NotFound`] instead of being created empty.
pub fn open_connection(path: &Path, mode: OpenMode, busy_timeout: Duration) -> Result<Connection> {
    let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;

    match mode {
        OpenMode::Create => flags |= OpenFlags::SQLITE_OPEN_CREATE,
        OpenMode::Existing => {
            if !path.is_file() {
                return Err(Error::NotFound(path.display().to_string()));
            }
        }
    }

    let conn = Connection::open_with_flags(path, flags)?;
    conn.busy_timeout(busy_timeout)?;
    Ok(conn)
}

/// The system-wide store shared by the credential and access control layers
#[derive(Debug, Clone)]
pub struct SystemStore {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SystemStore {
    /// Describe a store file; nothing is touched on disk until [`Self::connect`]
    pub fn new(path: impl Into<PathBuf>, busy_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            busy_timeout,
        }
    }

    pub fn from_config(config: &DbkeeperConfig) -> Self {
        Self::new(config.system_db_path(), config.busy_timeout())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a connection, creating the file if needed
    pub fn connect(&self) -> Result<Connection> {
        open_connection(&self.path, OpenMode::Create, self.busy_timeout)
    }

    /// Create the users and permissions tables if missing
    pub fn initialize_schema(&self, conn: &Connection) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            conn.execute(stmt, [])?;
        }
        Ok(())
    }
}

//! # dbkeeper - Personal SQLite Database Manager
//!
//! Lets registered users create their own SQLite databases, define tables at
//! runtime and share databases with each other.
//!
//! dbkeeper provides:
//! - A credential store for registered users
//! - An access control list mapping databases to the users allowed to open them
//! - A dynamic table engine over one SQLite file per logical database
//! - A session-scoped workspace that routes user intents to the layers above

pub mod access;
pub mod config;
pub mod credentials;
pub mod csv;
pub mod engine;
pub mod identifier;
pub mod output;
pub mod session;
pub mod storage;
pub mod ui;
pub mod value;

// Re-exports for convenient access
pub use access::{AccessControlStore, DatabaseEntry, GrantOutcome};
pub use config::DbkeeperConfig;
pub use credentials::{CredentialStore, RegisterOutcome};
pub use engine::{ColumnDef, ColumnType, DatabaseEngine, StoredRow, TableData};
pub use session::{Session, Workspace};
pub use storage::SystemStore;
pub use value::Cell;

/// Result type alias for dbkeeper operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for dbkeeper operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Username already exists: {0}")]
    DuplicateUsername(String),

    #[error("User {username} already has access to {database}")]
    AlreadyGranted { database: String, username: String },

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Invalid {kind} name: {name:?}")]
    InvalidIdentifier { kind: &'static str, name: String },

    #[error("Database already exists: {0}")]
    DatabaseExists(String),

    #[error("Invalid credentials")]
    AuthenticationFailed,

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("No database is open")]
    NoDatabaseOpen,

    #[error("Access denied to database {0}")]
    AccessDenied(String),

    #[error("Storage error: {0}")]
    Storage(#[source] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;

        match err.sqlite_error_code() {
            Some(
                ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::CannotOpen
                | ErrorCode::PermissionDenied
                | ErrorCode::DiskFull
                | ErrorCode::ReadOnly
                | ErrorCode::SystemIoFailure,
            ) => Error::StorageUnavailable(err.to_string()),
            Some(ErrorCode::ConstraintViolation | ErrorCode::TypeMismatch) => {
                Error::ConstraintViolation(err.to_string())
            }
            _ => Error::Storage(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_maps_to_storage_unavailable() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            Some("database is locked".to_string()),
        );
        assert!(matches!(Error::from(err), Error::StorageUnavailable(_)));
    }

    #[test]
    fn test_constraint_maps_to_constraint_violation() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
            None,
        );
        assert!(matches!(Error::from(err), Error::ConstraintViolation(_)));
    }

    #[test]
    fn test_other_errors_stay_storage() {
        let err = rusqlite::Error::QueryReturnedNoRows;
        assert!(matches!(Error::from(err), Error::Storage(_)));
    }
}

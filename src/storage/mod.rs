//! Storage Layer - SQLite-backed persistence
//!
//! The system store is one SQLite file with tables:
//! - users(username, password)
//! - permissions(id, db_name, username, created_by)
//!
//! Every logical database lives in its own file next to it. Connections are
//! opened per operation and dropped before the operation returns.

pub mod schema;
pub mod sqlite;

pub use sqlite::{open_connection, OpenMode, SystemStore};

//! Access Control Store - which users may open which databases
//!
//! Grants live in the `permissions` table of the system store, unique per
//! (database, user). Deleting a database does not remove its grants by
//! itself; callers must run [`AccessControlStore::cascade_delete_database`].

use rusqlite::{params, OptionalExtension};
use serde::Serialize;
use crate::storage::SystemStore;
use crate::Result;

/// Result of a grant attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    Granted,
    AlreadyGranted,
}

/// A database visible to some user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseEntry {
    pub name: String,
    /// Grantor of the user's permission row; the owner for self-grants
    pub creator: String,
}

#[derive(Debug, Clone)]
pub struct AccessControlStore {
    system: SystemStore,
}

impl AccessControlStore {
    pub fn new(system: SystemStore) -> Self {
        Self { system }
    }

    pub fn grant(&self, database: &str, grantee: &str, grantor: &str) -> Result<GrantOutcome> {
        let conn = self.system.connect()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO permissions (db_name, username, created_by) VALUES (?1, ?2, ?3)",
            params![database, grantee, grantor],
        )?;

        if inserted == 0 {
            return Ok(GrantOutcome::AlreadyGranted);
        }
        tracing::info!("{} granted {} access to {}", grantor, grantee, database);
        Ok(GrantOutcome::Granted)
    }

    /// Remove a grant; revoking a missing grant is a no-op
    pub fn revoke(&self, database: &str, username: &str) -> Result<()> {
        let conn = self.system.connect()?;
        let removed = conn.execute(
            "DELETE FROM permissions WHERE db_name = ?1 AND username = ?2",
            params![database, username],
        )?;
        if removed > 0 {
            tracing::info!("Revoked {} from {}", username, database);
        }
        Ok(())
    }

    /// Databases the user holds a grant on, oldest grant first
    pub fn list_accessible_databases(&self, username: &str) -> Result<Vec<DatabaseEntry>> {
        let conn = self.system.connect()?;
        let mut stmt = conn.prepare(
            "SELECT db_name, created_by FROM permissions WHERE username = ?1 ORDER BY id",
        )?;

        let entries = stmt
            .query_map([username], |row| {
                Ok(DatabaseEntry {
                    name: row.get(0)?,
                    creator: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// Users holding a grant on the database, oldest grant first
    pub fn list_authorized_users(&self, database: &str) -> Result<Vec<String>> {
        let conn = self.system.connect()?;
        let mut stmt = conn.prepare("SELECT username FROM permissions WHERE db_name = ?1 ORDER BY id")?;
        let users = stmt
            .query_map([database], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(users)
    }

    pub fn has_access(&self, database: &str, username: &str) -> Result<bool> {
        let conn = self.system.connect()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT id FROM permissions WHERE db_name = ?1 AND username = ?2",
                params![database, username],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Drop every grant on a deleted database
    pub fn cascade_delete_database(&self, database: &str) -> Result<usize> {
        let conn = self.system.connect()?;
        let removed = conn.execute("DELETE FROM permissions WHERE db_name = ?1", [database])?;
        tracing::info!("Removed {} grants for {}", removed, database);
        Ok(removed)
    }
}

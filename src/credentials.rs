//! Credential Store - registered users and login checks
//!
//! Passwords are stored and compared as plain text. This store does not hash
//! them and must not be exposed beyond a single local user.

use rusqlite::{params, OptionalExtension};
use crate::config::DefaultAccount;
use crate::storage::SystemStore;
use crate::Result;

/// Result of a registration attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Created,
    DuplicateUsername,
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    system: SystemStore,
}

impl CredentialStore {
    pub fn new(system: SystemStore) -> Self {
        Self { system }
    }

    /// Ensure the schema exists and the default account is present.
    ///
    /// Safe to call on every start; an existing default account keeps its
    /// stored password.
    pub fn initialize(&self, default_account: &DefaultAccount) -> Result<()> {
        let conn = self.system.connect()?;
        self.system.initialize_schema(&conn)?;
        let seeded = conn.execute(
            crate::storage::schema::SEED_DEFAULT_ACCOUNT,
            params![default_account.username, default_account.password],
        )?;
        if seeded > 0 {
            tracing::info!("Seeded default account {}", default_account.username);
        }
        Ok(())
    }

    /// True iff the user exists and the password matches exactly
    pub fn authenticate(&self, username: &str, password: &str) -> Result<bool> {
        let conn = self.system.connect()?;
        let stored: Option<String> = conn
            .query_row(
                "SELECT password FROM users WHERE username = ?1",
                [username],
                |row| row.get(0),
            )
            .optional()?;

        let ok = stored.is_some_and(|p| p == password);
        if !ok {
            tracing::warn!("Failed login for {}", username);
        }
        Ok(ok)
    }

    pub fn register(&self, username: &str, password: &str) -> Result<RegisterOutcome> {
        let conn = self.system.connect()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO users (username, password) VALUES (?1, ?2)",
            params![username, password],
        )?;

        if inserted == 0 {
            tracing::debug!("Registration rejected, {} exists", username);
            return Ok(RegisterOutcome::DuplicateUsername);
        }
        tracing::info!("Registered user {}", username);
        Ok(RegisterOutcome::Created)
    }

    /// All registered usernames in registration order
    pub fn list_users(&self) -> Result<Vec<String>> {
        let conn = self.system.connect()?;
        let mut stmt = conn.prepare("SELECT username FROM users ORDER BY rowid")?;
        let users = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(users)
    }

    pub fn user_exists(&self, username: &str) -> Result<bool> {
        let conn = self.system.connect()?;
        let found: Option<i64> = conn
            .query_row("SELECT 1 FROM users WHERE username = ?1", [username], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn store(dir: &tempfile::TempDir) -> CredentialStore {
        let system = SystemStore::new(dir.path().join("users.db"), Duration::from_secs(1));
        let store = CredentialStore::new(system);
        store.initialize(&DefaultAccount::default()).unwrap();
        store
    }

    #[test]
    fn test_default_account_seeded_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        assert!(store.authenticate("admin", "test").unwrap());

        // Re-initializing with another password keeps the stored one
        let other = DefaultAccount {
            username: "admin".to_string(),
            password: "changed".to_string(),
        };
        store.initialize(&other).unwrap();
        assert!(store.authenticate("admin", "test").unwrap());
        assert!(!store.authenticate("admin", "changed").unwrap());
        assert_eq!(store.list_users().unwrap(), vec!["admin"]);
    }

    #[test]
    fn test_register_then_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        assert_eq!(store.register("alice", "pw").unwrap(), RegisterOutcome::Created);
        assert_eq!(store.register("alice", "other").unwrap(), RegisterOutcome::DuplicateUsername);
        // The first password survives
        assert!(store.authenticate("alice", "pw").unwrap());
    }

    #[test]
    fn test_authenticate_exact_match_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        store.register("bob", "Secret").unwrap();

        assert!(store.authenticate("bob", "Secret").unwrap());
        assert!(!store.authenticate("bob", "secret").unwrap());
        assert!(!store.authenticate("bob", "Secret ").unwrap());
        assert!(!store.authenticate("Bob", "Secret").unwrap());
        assert!(!store.authenticate("nobody", "Secret").unwrap());
    }

    #[test]
    fn test_empty_values_not_rejected_here() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        assert_eq!(store.register("", "").unwrap(), RegisterOutcome::Created);
        assert!(store.authenticate("", "").unwrap());
    }

    #[test]
    fn test_list_users_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        store.register("zoe", "1").unwrap();
        store.register("carl", "2").unwrap();

        assert_eq!(store.list_users().unwrap(), vec!["admin", "zoe", "carl"]);
        assert!(store.user_exists("carl").unwrap());
        assert!(!store.user_exists("dave").unwrap());
    }
}

//! Session routing - resolves "who is logged in" and "which database is open"
//!
//! [`Session`] is a plain value owned by the caller and passed into every
//! [`Workspace`] call, so several sessions can share one workspace. The
//! workspace checks the session context and the user's grants, then hands
//! the call to the credential store, the access control store or the engine.

use std::path::{Path, PathBuf};
use serde::Serialize;
use crate::access::{AccessControlStore, DatabaseEntry, GrantOutcome};
use crate::config::{self, DbkeeperConfig};
use crate::credentials::{CredentialStore, RegisterOutcome};
use crate::engine::{ColumnDef, DatabaseEngine, TableData};
use crate::storage::SystemStore;
use crate::value::Cell;
use crate::{Error, Result};

/// Per-session context
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub user: Option<String>,
    pub database: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(&self) -> Result<&str> {
        self.user.as_deref().ok_or(Error::NotAuthenticated)
    }

    pub fn database(&self) -> Result<&str> {
        self.database.as_deref().ok_or(Error::NoDatabaseOpen)
    }
}

/// A registered user as seen from a database's sharing view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareCandidate {
    pub username: String,
    pub has_access: bool,
}

/// Everything a session routes to
#[derive(Debug, Clone)]
pub struct Workspace {
    config: DbkeeperConfig,
    credentials: CredentialStore,
    access: AccessControlStore,
    engine: DatabaseEngine,
}

impl Workspace {
    /// Prepare the data directory and the system store
    pub fn open(config: DbkeeperConfig) -> Result<Self> {
        config::ensure_dir(&config.data_dir)?;

        let system = SystemStore::from_config(&config);
        let credentials = CredentialStore::new(system.clone());
        credentials.initialize(&config.default_account)?;

        tracing::debug!("Workspace ready at {}", config.data_dir.display());
        Ok(Self {
            access: AccessControlStore::new(system),
            engine: DatabaseEngine::from_config(&config),
            credentials,
            config,
        })
    }

    pub fn config(&self) -> &DbkeeperConfig {
        &self.config
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn access(&self) -> &AccessControlStore {
        &self.access
    }

    pub fn engine(&self) -> &DatabaseEngine {
        &self.engine
    }

    // ========== Accounts ==========

    /// Log in, replacing whatever the session held
    pub fn login(&self, session: &mut Session, username: &str, password: &str) -> Result<()> {
        if !self.credentials.authenticate(username, password)? {
            return Err(Error::AuthenticationFailed);
        }
        session.user = Some(username.to_string());
        session.database = None;
        tracing::info!("{} logged in", username);
        Ok(())
    }

    pub fn logout(&self, session: &mut Session) {
        if let Some(user) = session.user.take() {
            tracing::info!("{} logged out", user);
        }
        session.database = None;
    }

    pub fn register(&self, username: &str, password: &str) -> Result<()> {
        match self.credentials.register(username, password)? {
            RegisterOutcome::Created => Ok(()),
            RegisterOutcome::DuplicateUsername => Err(Error::DuplicateUsername(username.to_string())),
        }
    }

    // ========== Databases & Sharing ==========

    pub fn databases(&self, session: &Session) -> Result<Vec<DatabaseEntry>> {
        self.access.list_accessible_databases(session.user()?)
    }

    /// Create a database owned by the session user.
    ///
    /// The file is removed again when the creator's grant cannot be
    /// recorded, so no file is left that nobody can open.
    pub fn create_database(&self, session: &Session, name: &str) -> Result<()> {
        let user = session.user()?;
        self.engine.create_database(name)?;

        if let Err(e) = self.access.grant(name, user, user) {
            tracing::warn!("Could not grant {} access to new database {}: {}", user, name, e);
            if let Err(cleanup) = self.engine.discard_database(name) {
                tracing::error!("Could not remove {} after failed grant: {}", name, cleanup);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Make `name` the open database; requires a grant
    pub fn open_database(&self, session: &mut Session, name: &str) -> Result<()> {
        self.authorize(session, name)?;
        if !self.engine.database_exists(name)? {
            return Err(Error::NotFound(format!("database {}", name)));
        }
        session.database = Some(name.to_string());
        Ok(())
    }

    /// Delete a database the session user holds a grant on.
    ///
    /// Only the grant is checked, not the file, so grants on a database
    /// whose file has vanished can still be purged; that case is reported as
    /// [`Error::NotFound`] after the purge. Closes the database if it was open.
    pub fn delete_database(&self, session: &mut Session, name: &str) -> Result<()> {
        self.authorize(session, name)?;
        let result = self.engine.delete_database(name, &self.access);
        if matches!(result, Ok(()) | Err(Error::NotFound(_))) && session.database.as_deref() == Some(name) {
            session.database = None;
        }
        result
    }

    /// Grant `grantee` access to a database the session user can open
    pub fn share(&self, session: &Session, database: &str, grantee: &str) -> Result<()> {
        let user = self.authorize(session, database)?;
        if !self.credentials.user_exists(grantee)? {
            return Err(Error::NotFound(format!("user {}", grantee)));
        }

        match self.access.grant(database, grantee, user)? {
            GrantOutcome::Granted => Ok(()),
            GrantOutcome::AlreadyGranted => Err(Error::AlreadyGranted {
                database: database.to_string(),
                username: grantee.to_string(),
            }),
        }
    }

    pub fn revoke(&self, session: &Session, database: &str, username: &str) -> Result<()> {
        self.authorize(session, database)?;
        self.access.revoke(database, username)
    }

    pub fn authorized_users(&self, session: &Session, database: &str) -> Result<Vec<String>> {
        self.authorize(session, database)?;
        self.access.list_authorized_users(database)
    }

    /// Every other registered user and whether they can open the database
    pub fn sharing_candidates(&self, session: &Session, database: &str) -> Result<Vec<ShareCandidate>> {
        let user = self.authorize(session, database)?;
        let authorized = self.access.list_authorized_users(database)?;

        Ok(self
            .credentials
            .list_users()?
            .into_iter()
            .filter(|u| u != user)
            .map(|username| ShareCandidate {
                has_access: authorized.contains(&username),
                username,
            })
            .collect())
    }

    // ========== Tables in the open database ==========

    pub fn tables(&self, session: &Session) -> Result<Vec<String>> {
        self.engine.list_tables(self.current(session)?)
    }

    pub fn create_table(&self, session: &Session, table: &str, columns: &[ColumnDef]) -> Result<()> {
        self.engine.create_table(self.current(session)?, table, columns)
    }

    pub fn describe_table(&self, session: &Session, table: &str) -> Result<Vec<ColumnDef>> {
        self.engine.describe_table(self.current(session)?, table)
    }

    pub fn columns(&self, session: &Session, table: &str) -> Result<Vec<String>> {
        self.engine.get_columns(self.current(session)?, table)
    }

    pub fn insert_row(&self, session: &Session, table: &str, values: &[(String, Cell)]) -> Result<i64> {
        self.engine.insert_row(self.current(session)?, table, values)
    }

    pub fn rows(&self, session: &Session, table: &str) -> Result<TableData> {
        self.engine.fetch_all_rows(self.current(session)?, table)
    }

    pub fn drop_table(&self, session: &Session, table: &str) -> Result<()> {
        self.engine.drop_table(self.current(session)?, table)
    }

    pub fn delete_rows(&self, session: &Session, table: &str, rows: &[Vec<Cell>]) -> Result<usize> {
        self.engine.delete_rows(self.current(session)?, table, rows)
    }

    pub fn delete_rows_by_id(&self, session: &Session, table: &str, ids: &[i64]) -> Result<usize> {
        self.engine.delete_rows_by_id(self.current(session)?, table, ids)
    }

    /// Export into the configured export directory
    pub fn export_csv(&self, session: &Session, table: &str) -> Result<PathBuf> {
        self.export_csv_to(session, table, &self.config.export_dir)
    }

    pub fn export_csv_to(&self, session: &Session, table: &str, dir: &Path) -> Result<PathBuf> {
        self.engine.export_csv(self.current(session)?, table, dir)
    }

    // ========== Helpers ==========

    /// Session user, provided they hold a grant on `database`
    fn authorize<'s>(&self, session: &'s Session, database: &str) -> Result<&'s str> {
        let user = session.user()?;
        if !self.access.has_access(database, user)? {
            return Err(Error::AccessDenied(database.to_string()));
        }
        Ok(user)
    }

    /// The open database, re-checked against the user's grants
    fn current<'s>(&self, session: &'s Session) -> Result<&'s str> {
        session.user()?;
        let database = session.database()?;
        self.authorize(session, database)?;
        Ok(database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ColumnType;

    fn workspace(dir: &tempfile::TempDir) -> Workspace {
        Workspace::open(DbkeeperConfig::in_dir(dir.path())).unwrap()
    }

    fn logged_in(ws: &Workspace, user: &str) -> Session {
        ws.register(user, "pw").ok();
        let mut session = Session::new();
        ws.login(&mut session, user, "pw").unwrap();
        session
    }

    #[test]
    fn test_login_and_logout() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(&dir);
        let mut session = Session::new();

        assert!(matches!(ws.login(&mut session, "admin", "wrong"), Err(Error::AuthenticationFailed)));
        assert!(matches!(ws.login(&mut session, "ghost", "test"), Err(Error::AuthenticationFailed)));
        assert_eq!(session, Session::new());

        ws.login(&mut session, "admin", "test").unwrap();
        assert_eq!(session.user.as_deref(), Some("admin"));

        ws.logout(&mut session);
        assert_eq!(session, Session::new());
    }

    #[test]
    fn test_register_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(&dir);
        ws.register("alice", "pw").unwrap();
        assert!(matches!(ws.register("alice", "pw"), Err(Error::DuplicateUsername(_))));
    }

    #[test]
    fn test_requires_login_and_open_database() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(&dir);
        let anonymous = Session::new();

        assert!(matches!(ws.databases(&anonymous), Err(Error::NotAuthenticated)));
        assert!(matches!(ws.create_database(&anonymous, "shop"), Err(Error::NotAuthenticated)));

        let session = logged_in(&ws, "alice");
        assert!(matches!(ws.tables(&session), Err(Error::NoDatabaseOpen)));
    }

    #[test]
    fn test_create_database_auto_grants_creator() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(&dir);
        let session = logged_in(&ws, "alice");

        ws.create_database(&session, "shop").unwrap();
        assert_eq!(
            ws.databases(&session).unwrap(),
            vec![DatabaseEntry { name: "shop".into(), creator: "alice".into() }]
        );

        // Someone else cannot take over the same file
        let bob = logged_in(&ws, "bob");
        assert!(matches!(ws.create_database(&bob, "shop"), Err(Error::DatabaseExists(_))));
        assert!(ws.databases(&bob).unwrap().is_empty());
    }

    #[test]
    fn test_open_database_requires_grant() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(&dir);
        let alice = logged_in(&ws, "alice");
        ws.create_database(&alice, "shop").unwrap();

        let mut bob = logged_in(&ws, "bob");
        assert!(matches!(ws.open_database(&mut bob, "shop"), Err(Error::AccessDenied(_))));

        ws.share(&alice, "shop", "bob").unwrap();
        ws.open_database(&mut bob, "shop").unwrap();
        assert_eq!(bob.database.as_deref(), Some("shop"));
        assert_eq!(
            ws.databases(&bob).unwrap(),
            vec![DatabaseEntry { name: "shop".into(), creator: "alice".into() }]
        );

        // Revocation takes effect on the next call
        ws.revoke(&alice, "shop", "bob").unwrap();
        assert!(matches!(ws.tables(&bob), Err(Error::AccessDenied(_))));
    }

    #[test]
    fn test_share_errors() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(&dir);
        let alice = logged_in(&ws, "alice");
        let bob = logged_in(&ws, "bob");
        ws.create_database(&alice, "shop").unwrap();

        ws.share(&alice, "shop", "bob").unwrap();
        assert!(matches!(ws.share(&alice, "shop", "bob"), Err(Error::AlreadyGranted { .. })));
        assert!(matches!(ws.share(&alice, "shop", "nobody"), Err(Error::NotFound(_))));

        // Any user with access may share further
        ws.share(&bob, "shop", "admin").unwrap();
        assert_eq!(ws.authorized_users(&alice, "shop").unwrap(), vec!["alice", "bob", "admin"]);

        let carol = logged_in(&ws, "carol");
        assert!(matches!(ws.share(&carol, "shop", "carol"), Err(Error::AccessDenied(_))));
    }

    #[test]
    fn test_sharing_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(&dir);
        let alice = logged_in(&ws, "alice");
        logged_in(&ws, "bob");
        ws.create_database(&alice, "shop").unwrap();
        ws.share(&alice, "shop", "bob").unwrap();

        assert_eq!(
            ws.sharing_candidates(&alice, "shop").unwrap(),
            vec![
                ShareCandidate { username: "admin".into(), has_access: false },
                ShareCandidate { username: "bob".into(), has_access: true },
            ]
        );
    }

    #[test]
    fn test_switching_databases() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(&dir);
        let mut session = logged_in(&ws, "alice");
        ws.create_database(&session, "shop").unwrap();
        ws.create_database(&session, "notes").unwrap();

        ws.open_database(&mut session, "shop").unwrap();
        ws.create_table(&session, "items", &[ColumnDef::new("name", ColumnType::Text)]).unwrap();

        ws.open_database(&mut session, "notes").unwrap();
        assert!(ws.tables(&session).unwrap().is_empty());

        ws.open_database(&mut session, "shop").unwrap();
        assert_eq!(ws.tables(&session).unwrap(), vec!["items"]);
    }

    #[test]
    fn test_delete_database_clears_session_and_grants() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(&dir);
        let mut alice = logged_in(&ws, "alice");
        let bob = logged_in(&ws, "bob");
        ws.create_database(&alice, "shop").unwrap();
        ws.share(&alice, "shop", "bob").unwrap();

        ws.open_database(&mut alice, "shop").unwrap();
        ws.delete_database(&mut alice, "shop").unwrap();

        assert!(alice.database.is_none());
        assert!(ws.databases(&alice).unwrap().is_empty());
        assert!(ws.databases(&bob).unwrap().is_empty());
        assert!(matches!(ws.delete_database(&mut alice, "shop"), Err(Error::AccessDenied(_))));
    }

    #[test]
    fn test_delete_database_requires_grant_and_keeps_other_open_db() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(&dir);
        let alice = logged_in(&ws, "alice");
        let mut bob = logged_in(&ws, "bob");
        ws.create_database(&alice, "shop").unwrap();
        ws.create_database(&bob, "notes").unwrap();

        assert!(matches!(ws.delete_database(&mut bob, "shop"), Err(Error::AccessDenied(_))));
        assert!(dir.path().join("shop.db").exists());

        ws.create_database(&bob, "scratch").unwrap();
        ws.open_database(&mut bob, "notes").unwrap();
        ws.delete_database(&mut bob, "scratch").unwrap();
        assert_eq!(bob.database.as_deref(), Some("notes"));
    }

    #[test]
    fn test_delete_database_with_missing_file_purges_grants() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(&dir);
        let mut alice = logged_in(&ws, "alice");
        let bob = logged_in(&ws, "bob");
        ws.create_database(&alice, "shop").unwrap();
        ws.share(&alice, "shop", "bob").unwrap();

        std::fs::remove_file(dir.path().join("shop.db")).unwrap();
        assert!(matches!(ws.open_database(&mut alice, "shop"), Err(Error::NotFound(_))));

        assert!(matches!(ws.delete_database(&mut alice, "shop"), Err(Error::NotFound(_))));
        assert!(ws.databases(&alice).unwrap().is_empty());
        assert!(ws.databases(&bob).unwrap().is_empty());

        // The name can be reused
        ws.create_database(&alice, "shop").unwrap();
        assert_eq!(ws.authorized_users(&alice, "shop").unwrap(), vec!["alice"]);
    }

    #[test]
    fn test_create_database_removes_file_when_grant_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbkeeperConfig {
            busy_timeout_ms: 10,
            ..DbkeeperConfig::in_dir(dir.path())
        };
        let ws = Workspace::open(config).unwrap();
        let alice = logged_in(&ws, "alice");

        let lock = rusqlite::Connection::open(ws.config().system_db_path()).unwrap();
        lock.execute_batch("BEGIN EXCLUSIVE;").unwrap();

        let err = ws.create_database(&alice, "shop").unwrap_err();
        assert!(matches!(err, Error::StorageUnavailable(_)));
        assert!(!dir.path().join("shop.db").exists());

        lock.execute_batch("COMMIT;").unwrap();
        ws.create_database(&alice, "shop").unwrap();
        assert_eq!(
            ws.databases(&alice).unwrap(),
            vec![DatabaseEntry { name: "shop".into(), creator: "alice".into() }]
        );
    }
}

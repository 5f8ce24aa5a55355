//! System store schema definitions

/// SQL to create the users table
pub const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    username TEXT PRIMARY KEY,
    password TEXT NOT NULL
)
"#;

/// SQL to create the permissions table
/// One row per (database, user) grant; the creator of a database holds a
/// self-granted row
pub const CREATE_PERMISSIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS permissions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    db_name TEXT NOT NULL,
    username TEXT NOT NULL,
    created_by TEXT NOT NULL,
    UNIQUE(db_name, username)
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_permissions_username ON permissions(username)",
];

/// SQL to seed the default account
pub const SEED_DEFAULT_ACCOUNT: &str = "INSERT OR IGNORE INTO users (username, password) VALUES (?1, ?2)";

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![CREATE_USERS_TABLE, CREATE_PERMISSIONS_TABLE];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}

//! Identifier validation for names that end up inside SQL text or file names
//!
//! Table, column and database names are supplied by end users at runtime and
//! cannot be bound as statement parameters. Every such name must pass
//! [`validate`] before it is interpolated, and is then double-quoted.
//!
//! Accepted form: `[A-Za-z_][A-Za-z0-9_]{0,63}`

use crate::{Error, Result};
use regex::Regex;
use std::sync::OnceLock;

static IDENTIFIER: OnceLock<Regex> = OnceLock::new();

/// Names SQLite resolves to the implicit row identity
const ROW_ID_ALIASES: &[&str] = &["rowid", "oid", "_rowid_"];

fn pattern() -> &'static Regex {
    IDENTIFIER.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,63}$").expect("identifier pattern is valid")
    })
}

/// What a name identifies, used in error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Database,
    Table,
    Column,
}

impl IdentifierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierKind::Database => "database",
            IdentifierKind::Table => "table",
            IdentifierKind::Column => "column",
        }
    }
}

/// Check a user-supplied name against the allow-list.
pub fn validate(kind: IdentifierKind, name: &str) -> Result<&str> {
    if !pattern().is_match(name) {
        return Err(Error::InvalidIdentifier {
            kind: kind.as_str(),
            name: name.to_string(),
        });
    }

    // Tables starting with sqlite_ are reserved by the engine
    if kind == IdentifierKind::Table && name.to_ascii_lowercase().starts_with("sqlite_") {
        return Err(Error::InvalidIdentifier {
            kind: kind.as_str(),
            name: name.to_string(),
        });
    }

    // Rows are addressed by rowid, a column must not shadow it
    if kind == IdentifierKind::Column
        && ROW_ID_ALIASES.iter().any(|alias| alias.eq_ignore_ascii_case(name))
    {
        return Err(Error::InvalidIdentifier {
            kind: kind.as_str(),
            name: name.to_string(),
        });
    }

    Ok(name)
}

/// Validate and double-quote a name for use in statement text.
pub fn quoted(kind: IdentifierKind, name: &str) -> Result<String> {
    validate(kind, name).map(|n| format!("\"{}\"", n))
}

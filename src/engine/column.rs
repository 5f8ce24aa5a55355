//! Column schema types

use crate::identifier::{self, IdentifierKind};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declared column type.
///
/// Types are advisory: SQLite applies column affinity but stores whatever
/// value it is given when conversion is not possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    Text,
    Integer,
    Real,
    Blob,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Blob => "BLOB",
        }
    }

    pub fn all() -> &'static [ColumnType] {
        &[
            ColumnType::Text,
            ColumnType::Integer,
            ColumnType::Real,
            ColumnType::Blob,
        ]
    }

    /// Map any declared type string to the closest variant using SQLite's
    /// affinity rules. NUMERIC affinity maps to `Real`.
    pub fn from_declared(declared: &str) -> Self {
        let upper = declared.to_ascii_uppercase();
        if upper.contains("INT") {
            ColumnType::Integer
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            ColumnType::Text
        } else if upper.is_empty() || upper.contains("BLOB") {
            ColumnType::Blob
        } else {
            ColumnType::Real
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ColumnType::all()
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Parse(format!("Unknown column type: {} (expected TEXT, INTEGER, REAL or BLOB)", s)))
    }
}

/// One column of a table schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub declared_type: ColumnType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, declared_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            declared_type,
        }
    }

    /// Column definition as it appears inside CREATE TABLE
    pub fn to_sql(&self) -> Result<String> {
        Ok(format!(
            "{} {}",
            identifier::quoted(IdentifierKind::Column, &self.name)?,
            self.declared_type
        ))
    }
}

/// Parses `name:TYPE`; a bare `name` is a TEXT column
impl FromStr for ColumnDef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (name, declared_type) = match s.split_once(':') {
            Some((name, ty)) => (name.trim(), ty.parse()?),
            None => (s.trim(), ColumnType::Text),
        };
        identifier::validate(IdentifierKind::Column, name)?;
        Ok(Self::new(name, declared_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_column_type() {
        assert_eq!("real".parse::<ColumnType>().unwrap(), ColumnType::Real);
        assert_eq!(" Blob ".parse::<ColumnType>().unwrap(), ColumnType::Blob);
        assert!("VARCHAR".parse::<ColumnType>().is_err());
    }

    #[test]
    fn test_from_declared_affinity() {
        assert_eq!(ColumnType::from_declared("BIGINT"), ColumnType::Integer);
        assert_eq!(ColumnType::from_declared("varchar(20)"), ColumnType::Text);
        assert_eq!(ColumnType::from_declared(""), ColumnType::Blob);
        assert_eq!(ColumnType::from_declared("DOUBLE"), ColumnType::Real);
        assert_eq!(ColumnType::from_declared("NUMERIC"), ColumnType::Real);
    }

    #[test]
    fn test_parse_column_def() {
        assert_eq!(
            "price:REAL".parse::<ColumnDef>().unwrap(),
            ColumnDef::new("price", ColumnType::Real)
        );
        assert_eq!("name".parse::<ColumnDef>().unwrap(), ColumnDef::new("name", ColumnType::Text));
        assert!(matches!(
            "bad name:TEXT".parse::<ColumnDef>(),
            Err(Error::InvalidIdentifier { .. })
        ));
        assert!(matches!("x:DATE".parse::<ColumnDef>(), Err(Error::Parse(_))));
    }

    #[test]
    fn test_to_sql() {
        assert_eq!(
            ColumnDef::new("qty", ColumnType::Integer).to_sql().unwrap(),
            "\"qty\" INTEGER"
        );
    }
}

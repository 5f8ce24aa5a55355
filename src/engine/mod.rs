//! Dynamic Table Engine - user-defined tables inside per-database files
//!
//! Each logical database is the file `<data_dir>/<name>.db`. Every operation
//! opens that file, runs its statements and drops the connection before
//! returning. Only the row deletions group several statements into one
//! transaction.
//!
//! Table and column names are user input and are validated by
//! [`crate::identifier`] before being quoted into statement text; values are
//! always bound as parameters.

pub mod column;

pub use column::{ColumnDef, ColumnType};

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;
use rusqlite::{params_from_iter, Connection};
use serde::Serialize;
use crate::access::AccessControlStore;
use crate::config::{self, DbkeeperConfig};
use crate::identifier::{self, IdentifierKind};
use crate::storage::{open_connection, OpenMode};
use crate::value::Cell;
use crate::{csv, Error, Result};

/// A stored row together with its SQLite rowid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRow {
    pub id: i64,
    pub values: Vec<Cell>,
}

/// Full contents of a table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableData {
    pub columns: Vec<String>,
    pub rows: Vec<StoredRow>,
}

impl TableData {
    /// Row values without their ids
    pub fn values(&self) -> Vec<Vec<Cell>> {
        self.rows.iter().map(|r| r.values.clone()).collect()
    }
}

/// Engine over the database files of one data directory
#[derive(Debug, Clone)]
pub struct DatabaseEngine {
    data_dir: PathBuf,
    busy_timeout: Duration,
}

impl DatabaseEngine {
    pub fn new(data_dir: impl Into<PathBuf>, busy_timeout: Duration) -> Self {
        Self {
            data_dir: data_dir.into(),
            busy_timeout,
        }
    }

    pub fn from_config(config: &DbkeeperConfig) -> Self {
        Self::new(config.data_dir.clone(), config.busy_timeout())
    }

    /// File backing a logical database
    pub fn database_path(&self, database: &str) -> Result<PathBuf> {
        identifier::validate(IdentifierKind::Database, database)?;
        Ok(self.data_dir.join(format!("{}.db", database)))
    }

    fn connect(&self, database: &str) -> Result<Connection> {
        let path = self.database_path(database)?;
        open_connection(&path, OpenMode::Existing, self.busy_timeout)
            .map_err(|e| match e {
                Error::NotFound(_) => Error::NotFound(format!("database {}", database)),
                other => other,
            })
    }

    // ========== Database Operations ==========

    /// Create an empty database file
    pub fn create_database(&self, database: &str) -> Result<()> {
        let path = self.database_path(database)?;
        if path.exists() {
            return Err(Error::DatabaseExists(database.to_string()));
        }

        config::ensure_dir(&self.data_dir)?;
        open_connection(&path, OpenMode::Create, self.busy_timeout)?;
        tracing::info!("Created database {} at {}", database, path.display());
        Ok(())
    }

    pub fn database_exists(&self, database: &str) -> Result<bool> {
        Ok(self.database_path(database)?.is_file())
    }

    /// Remove the database file, then its grants.
    ///
    /// A missing file still has its grants purged and is reported as
    /// [`Error::NotFound`]. Any other removal failure leaves the grants in
    /// place and is reported as [`Error::StorageUnavailable`].
    pub fn delete_database(&self, database: &str, access: &AccessControlStore) -> Result<()> {
        match self.remove_files(database)? {
            true => {
                access.cascade_delete_database(database)?;
                tracing::info!("Deleted database {}", database);
                Ok(())
            }
            false => {
                tracing::warn!("Database file for {} is missing, purging its grants", database);
                access.cascade_delete_database(database)?;
                Err(Error::NotFound(format!("database {}", database)))
            }
        }
    }

    /// Remove the database file without touching grants
    pub fn discard_database(&self, database: &str) -> Result<()> {
        if self.remove_files(database)? {
            tracing::info!("Discarded database file for {}", database);
        }
        Ok(())
    }

    /// Remove the file and its sidecars; `false` when the file was already gone
    fn remove_files(&self, database: &str) -> Result<bool> {
        let path = self.database_path(database)?;

        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                return Err(Error::StorageUnavailable(format!(
                    "cannot remove {}: {}",
                    path.display(),
                    e
                )));
            }
        }

        for suffix in ["-journal", "-wal", "-shm"] {
            let sidecar = self.data_dir.join(format!("{}.db{}", database, suffix));
            if let Err(e) = std::fs::remove_file(&sidecar) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Could not remove {}: {}", sidecar.display(), e);
                }
            }
        }
        Ok(true)
    }

    // ========== Table Operations ==========

    /// User tables in catalog order
    pub fn list_tables(&self, database: &str) -> Result<Vec<String>> {
        let conn = self.connect(database)?;
        let mut stmt = conn.prepare(
            r"SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite\_%' ESCAPE '\' ORDER BY rowid",
        )?;
        let tables = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(tables)
    }

    /// Create a table unless one with that name exists
    pub fn create_table(&self, database: &str, table: &str, columns: &[ColumnDef]) -> Result<()> {
        let table_sql = identifier::quoted(IdentifierKind::Table, table)?;
        if columns.is_empty() {
            return Err(Error::ConstraintViolation(format!("table {} needs at least one column", table)));
        }

        let column_sql = columns
            .iter()
            .map(ColumnDef::to_sql)
            .collect::<Result<Vec<_>>>()?
            .join(", ");

        let conn = self.connect(database)?;
        let sql = format!("CREATE TABLE IF NOT EXISTS {} ({})", table_sql, column_sql);
        tracing::debug!("{}", sql);
        conn.execute(&sql, [])?;
        tracing::info!("Created table {}.{}", database, table);
        Ok(())
    }

    /// Drop a table; dropping a missing table is a no-op
    pub fn drop_table(&self, database: &str, table: &str) -> Result<()> {
        let table_sql = identifier::quoted(IdentifierKind::Table, table)?;
        let conn = self.connect(database)?;
        conn.execute(&format!("DROP TABLE IF EXISTS {}", table_sql), [])?;
        tracing::info!("Dropped table {}.{}", database, table);
        Ok(())
    }

    /// Column names in declaration order
    pub fn get_columns(&self, database: &str, table: &str) -> Result<Vec<String>> {
        Ok(self
            .describe_table(database, table)?
            .into_iter()
            .map(|c| c.name)
            .collect())
    }

    /// Columns with their declared types
    pub fn describe_table(&self, database: &str, table: &str) -> Result<Vec<ColumnDef>> {
        identifier::validate(IdentifierKind::Table, table)?;
        let conn = self.connect(database)?;
        Self::table_schema(&conn, table)
    }

    fn table_schema(conn: &Connection, table: &str) -> Result<Vec<ColumnDef>> {
        let mut stmt = conn.prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")?;
        let columns = stmt
            .query_map([table], |row| {
                let name: String = row.get(0)?;
                let declared: String = row.get(1)?;
                Ok(ColumnDef::new(name, ColumnType::from_declared(&declared)))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        if columns.is_empty() {
            return Err(Error::NotFound(format!("table {}", table)));
        }
        Ok(columns)
    }

    // ========== Row Operations ==========

    /// Insert one row and return its rowid.
    ///
    /// Columns left out of `values` receive NULL. Naming a column the table
    /// does not have is a constraint violation.
    pub fn insert_row(&self, database: &str, table: &str, values: &[(String, Cell)]) -> Result<i64> {
        let table_sql = identifier::quoted(IdentifierKind::Table, table)?;
        let conn = self.connect(database)?;
        let schema = Self::table_schema(&conn, table)?;

        for (i, (column, _)) in values.iter().enumerate() {
            if !schema.iter().any(|c| c.name.eq_ignore_ascii_case(column)) {
                return Err(Error::ConstraintViolation(format!(
                    "table {} has no column named {}",
                    table, column
                )));
            }
            if values[..i].iter().any(|(seen, _)| seen.eq_ignore_ascii_case(column)) {
                return Err(Error::ConstraintViolation(format!("column {} given more than once", column)));
            }
        }

        let sql = if values.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", table_sql)
        } else {
            let names = values
                .iter()
                .map(|(column, _)| identifier::quoted(IdentifierKind::Column, column))
                .collect::<Result<Vec<_>>>()?
                .join(", ");
            let placeholders = (1..=values.len())
                .map(|i| format!("?{}", i))
                .collect::<Vec<_>>()
                .join(", ");
            format!("INSERT INTO {} ({}) VALUES ({})", table_sql, names, placeholders)
        };

        tracing::debug!("{}", sql);
        conn.execute(&sql, params_from_iter(values.iter().map(|(_, v)| v)))?;
        Ok(conn.last_insert_rowid())
    }

    /// Every row of the table with its rowid, in scan order
    pub fn fetch_all_rows(&self, database: &str, table: &str) -> Result<TableData> {
        let table_sql = identifier::quoted(IdentifierKind::Table, table)?;
        let conn = self.connect(database)?;
        let columns: Vec<String> = Self::table_schema(&conn, table)?
            .into_iter()
            .map(|c| c.name)
            .collect();

        let mut stmt = conn.prepare(&format!("SELECT rowid, * FROM {} ORDER BY rowid", table_sql))?;
        let width = columns.len();
        let rows = stmt
            .query_map([], |row| {
                let id: i64 = row.get(0)?;
                let values = (1..=width)
                    .map(|i| row.get::<_, Cell>(i))
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(StoredRow { id, values })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(TableData { columns, rows })
    }

    /// Delete stored rows equal to any of the given tuples.
    ///
    /// A tuple matches a stored row when every column compares equal
    /// (`IS`, so NULLs match NULLs). Identical stored rows are therefore all
    /// removed together; use [`Self::delete_rows_by_id`] to remove exactly one.
    /// All deletions commit together. Returns the number of rows removed.
    pub fn delete_rows(&self, database: &str, table: &str, rows: &[Vec<Cell>]) -> Result<usize> {
        let table_sql = identifier::quoted(IdentifierKind::Table, table)?;
        let mut conn = self.connect(database)?;
        let columns = Self::table_schema(&conn, table)?;

        if let Some(bad) = rows.iter().find(|r| r.len() != columns.len()) {
            return Err(Error::ConstraintViolation(format!(
                "expected {} values per row, got {}",
                columns.len(),
                bad.len()
            )));
        }

        let where_clause = columns
            .iter()
            .enumerate()
            .map(|(i, c)| -> Result<String> {
                Ok(format!("{} IS ?{}", identifier::quoted(IdentifierKind::Column, &c.name)?, i + 1))
            })
            .collect::<Result<Vec<_>>>()?
            .join(" AND ");
        let sql = format!("DELETE FROM {} WHERE {}", table_sql, where_clause);

        let tx = conn.transaction()?;
        let mut removed = 0;
        {
            let mut stmt = tx.prepare(&sql)?;
            for row in rows {
                removed += stmt.execute(params_from_iter(row.iter()))?;
            }
        }
        tx.commit()?;

        tracing::info!("Deleted {} rows from {}.{}", removed, database, table);
        Ok(removed)
    }

    /// Delete exactly the rows with the given rowids, in one transaction
    pub fn delete_rows_by_id(&self, database: &str, table: &str, ids: &[i64]) -> Result<usize> {
        let table_sql = identifier::quoted(IdentifierKind::Table, table)?;
        let mut conn = self.connect(database)?;
        Self::table_schema(&conn, table)?;

        let tx = conn.transaction()?;
        let mut removed = 0;
        {
            let mut stmt = tx.prepare(&format!("DELETE FROM {} WHERE rowid = ?1", table_sql))?;
            for id in ids {
                removed += stmt.execute([id])?;
            }
        }
        tx.commit()?;

        tracing::info!("Deleted {} rows from {}.{}", removed, database, table);
        Ok(removed)
    }

    // ========== Export ==========

    /// Write `<dir>/<table>.csv`, replacing any existing file
    pub fn export_csv(&self, database: &str, table: &str, dir: &Path) -> Result<PathBuf> {
        let data = self.fetch_all_rows(database, table)?;

        config::ensure_dir(dir)?;
        let path = dir.join(format!("{}.csv", table));
        let mut out = BufWriter::new(File::create(&path)?);
        csv::write_table(&mut out, &data.columns, &data.values())?;

        tracing::info!("Exported {}.{} ({} rows) to {}", database, table, data.rows.len(), path.display());
        Ok(path)
    }
}

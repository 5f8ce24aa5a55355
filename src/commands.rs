use std::path::Path;
use anyhow::{bail, Context as _};
use dbkeeper::config::{self, DbkeeperConfig};
use dbkeeper::output::{emit_success, OutputMode};
use dbkeeper::ui::{self, grid, theme, Icons, TableBuilder};
use dbkeeper::{Cell, ColumnDef, Session, Workspace};
use owo_colors::OwoColorize;
use serde_json::json;

pub fn run_init(mode: OutputMode, path: &Path, config: &DbkeeperConfig, force: bool) -> anyhow::Result<()> {
    config::write_config(path, config, force)?;
    Workspace::open(config.clone())?;

    if mode.is_human() {
        ui::success(&format!("Wrote {}", path.display()));
        ui::info("User store", &config.system_db_path().display().to_string());
    } else {
        emit_success(mode, "init", json!({ "config": path, "system_db": config.system_db_path() }))?;
    }
    Ok(())
}

/// Parse `column=value`; the value is stored as text and converted by the
/// column's affinity
fn parse_assignment(raw: &str) -> anyhow::Result<(String, Cell)> {
    let (column, value) = raw
        .split_once('=')
        .with_context(|| format!("expected column=value, got {:?}", raw))?;
    Ok((column.trim().to_string(), Cell::from(value)))
}

/// Split `v1,v2,..` into text cells. Values cannot contain commas and never
/// match NULL; use row ids for those rows.
fn parse_match(raw: &str) -> Vec<Cell> {
    raw.split(',').map(Cell::from).collect()
}

/// Everything a subcommand needs
pub struct Context {
    ws: Workspace,
    mode: OutputMode,
    user: Option<String>,
    password: Option<String>,
}

impl Context {
    pub fn new(
        config: DbkeeperConfig,
        mode: OutputMode,
        user: Option<String>,
        password: Option<String>,
    ) -> anyhow::Result<Self> {
        let ws = Workspace::open(config)?;
        Ok(Self { ws, mode, user, password })
    }

    fn session(&self) -> anyhow::Result<Session> {
        let user = self.user.as_deref().context("--user is required for this command")?;
        let password = self.password.as_deref().context("--password is required for this command")?;

        let mut session = Session::new();
        self.ws.login(&mut session, user, password)?;
        Ok(session)
    }

    fn session_with(&self, database: &str) -> anyhow::Result<Session> {
        let mut session = self.session()?;
        self.ws.open_database(&mut session, database)?;
        Ok(session)
    }

    // ========== Accounts ==========

    pub fn register(&self, username: &str) -> anyhow::Result<()> {
        let password = self.password.as_deref().unwrap_or_default();
        if username.trim().is_empty() || password.is_empty() {
            bail!("username and password must not be empty");
        }

        self.ws.register(username, password)?;
        if self.mode.is_human() {
            ui::success(&format!("Account {} created", username));
        } else {
            emit_success(self.mode, "register", json!({ "username": username }))?;
        }
        Ok(())
    }

    pub fn login(&self) -> anyhow::Result<()> {
        let session = self.session()?;
        let user = session.user()?;
        if self.mode.is_human() {
            ui::success(&format!("Welcome, {}", user));
        } else {
            emit_success(self.mode, "login", json!({ "username": user }))?;
        }
        Ok(())
    }

    pub fn users(&self) -> anyhow::Result<()> {
        self.session()?;
        let users = self.ws.credentials().list_users()?;
        if self.mode.is_human() {
            ui::header(Icons::PERSON, "Registered users");
            for user in &users {
                println!("  {}", user);
            }
        } else {
            emit_success(self.mode, "users", json!(users))?;
        }
        Ok(())
    }

    // ========== Databases & Sharing ==========

    pub fn databases(&self) -> anyhow::Result<()> {
        let session = self.session()?;
        let entries = self.ws.databases(&session)?;

        if self.mode.is_human() {
            if entries.is_empty() {
                println!("{} No databases yet. Create one with `create-db`.", Icons::INFO);
                return Ok(());
            }
            ui::header(Icons::DATABASE, &format!("Databases for {}", session.user()?));
            let rows: Vec<Vec<String>> = entries
                .iter()
                .map(|e| vec![e.name.clone(), e.creator.clone()])
                .collect();
            println!("{}", grid(&["Database".to_string(), "Created by".to_string()], &rows));
        } else {
            emit_success(self.mode, "databases", json!(entries))?;
        }
        Ok(())
    }

    pub fn create_db(&self, name: &str) -> anyhow::Result<()> {
        let session = self.session()?;
        self.ws.create_database(&session, name)?;
        if self.mode.is_human() {
            ui::success(&format!("Database {} created", name.style(theme().name.clone())));
        } else {
            emit_success(self.mode, "create-db", json!({ "name": name }))?;
        }
        Ok(())
    }

    pub fn delete_db(&self, name: &str, yes: bool) -> anyhow::Result<()> {
        if !yes {
            bail!("deleting {} removes all of its tables; pass --yes to confirm", name);
        }

        let mut session = self.session()?;
        let file_missing = match self.ws.delete_database(&mut session, name) {
            Ok(()) => false,
            Err(dbkeeper::Error::NotFound(_)) => true,
            Err(e) => return Err(e.into()),
        };

        if self.mode.is_human() {
            if file_missing {
                ui::warn(&format!("The file for {} was already gone; its grants were removed", name));
            } else {
                println!("{} Database {} deleted", Icons::DEL, name.style(theme().name.clone()));
            }
        } else {
            emit_success(self.mode, "delete-db", json!({ "name": name, "file_missing": file_missing }))?;
        }
        Ok(())
    }

    pub fn share(&self, database: &str, username: &str) -> anyhow::Result<()> {
        let session = self.session()?;
        self.ws.share(&session, database, username)?;
        if self.mode.is_human() {
            println!("{} {} can now open {}", Icons::KEY, username, database.style(theme().name.clone()));
        } else {
            emit_success(self.mode, "share", json!({ "database": database, "username": username }))?;
        }
        Ok(())
    }

    pub fn revoke(&self, database: &str, username: &str) -> anyhow::Result<()> {
        let session = self.session()?;
        self.ws.revoke(&session, database, username)?;
        if self.mode.is_human() {
            println!("{} {} can no longer open {}", Icons::LOCK, username, database.style(theme().name.clone()));
        } else {
            emit_success(self.mode, "revoke", json!({ "database": database, "username": username }))?;
        }
        Ok(())
    }

    pub fn access(&self, database: &str) -> anyhow::Result<()> {
        let session = self.session()?;
        let candidates = self.ws.sharing_candidates(&session, database)?;

        if self.mode.is_human() {
            ui::header(Icons::KEY, &format!("Share: {}", database));
            for c in &candidates {
                let status = if c.has_access {
                    "Has Access".style(theme().success.clone()).to_string()
                } else {
                    ui::muted("No Access")
                };
                println!("  {:<24} {}", c.username, status);
            }
            if candidates.is_empty() {
                println!("  {}", ui::dim("No other registered users"));
            }
        } else {
            emit_success(self.mode, "access", json!(candidates))?;
        }
        Ok(())
    }

    // ========== Tables ==========

    pub fn tables(&self, database: &str) -> anyhow::Result<()> {
        let session = self.session_with(database)?;
        let tables = self.ws.tables(&session)?;

        if self.mode.is_human() {
            ui::header(Icons::DATABASE, &format!("DB: {}", database));
            if tables.is_empty() {
                println!("  {}", ui::dim("No tables"));
            }
            for table in &tables {
                println!("  {} {}", Icons::TABLE, table);
            }
        } else {
            emit_success(self.mode, "tables", json!(tables))?;
        }
        Ok(())
    }

    pub fn create_table(&self, database: &str, table: &str, columns: &[String]) -> anyhow::Result<()> {
        let columns = columns
            .iter()
            .map(|c| c.parse::<ColumnDef>())
            .collect::<dbkeeper::Result<Vec<_>>>()?;
        if columns.is_empty() {
            bail!("add at least one column");
        }

        let session = self.session_with(database)?;
        self.ws.create_table(&session, table, &columns)?;
        if self.mode.is_human() {
            ui::success(&format!("Table {} ready", table.style(theme().name.clone())));
        } else {
            emit_success(self.mode, "create-table", json!({ "table": table, "columns": columns }))?;
        }
        Ok(())
    }

    pub fn describe(&self, database: &str, table: &str) -> anyhow::Result<()> {
        let session = self.session_with(database)?;
        let columns = self.ws.describe_table(&session, table)?;

        if self.mode.is_human() {
            let mut builder = TableBuilder::new();
            for c in &columns {
                builder.add_row(&c.name, c.declared_type.as_str());
            }
            ui::header(Icons::TABLE, &format!("Table: {}", table));
            println!("{}", builder.build());
        } else {
            emit_success(self.mode, "describe", json!(columns))?;
        }
        Ok(())
    }

    pub fn insert(&self, database: &str, table: &str, values: &[String]) -> anyhow::Result<()> {
        let values = values
            .iter()
            .map(|v| parse_assignment(v))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let session = self.session_with(database)?;
        let id = self.ws.insert_row(&session, table, &values)?;
        if self.mode.is_human() {
            println!("{} Inserted row {}", Icons::NEW, id);
        } else {
            emit_success(self.mode, "insert", json!({ "id": id }))?;
        }
        Ok(())
    }

    pub fn show(&self, database: &str, table: &str) -> anyhow::Result<()> {
        let session = self.session_with(database)?;
        let data = self.ws.rows(&session, table)?;

        if self.mode.is_human() {
            ui::header(Icons::TABLE, &format!("Table: {}", table));
            let mut header = vec!["id".to_string()];
            header.extend(data.columns.iter().cloned());
            let rows: Vec<Vec<String>> = data
                .rows
                .iter()
                .map(|r| {
                    let mut cells = vec![r.id.to_string()];
                    cells.extend(r.values.iter().map(|v| v.to_string()));
                    cells
                })
                .collect();
            println!("{}", grid(&header, &rows));
            ui::summary_row("Rows:", &data.rows.len().to_string());
        } else {
            emit_success(self.mode, "show", json!(data))?;
        }
        Ok(())
    }

    pub fn delete_rows(&self, database: &str, table: &str, ids: &[i64], matches: &[String]) -> anyhow::Result<()> {
        if ids.is_empty() && matches.is_empty() {
            bail!("select rows with --id or --match");
        }

        let session = self.session_with(database)?;
        let removed = if ids.is_empty() {
            let rows: Vec<Vec<Cell>> = matches.iter().map(|m| parse_match(m)).collect();
            self.ws.delete_rows(&session, table, &rows)?
        } else {
            self.ws.delete_rows_by_id(&session, table, ids)?
        };

        if self.mode.is_human() {
            println!("{} Deleted {} row(s)", Icons::DEL, removed);
        } else {
            emit_success(self.mode, "delete-rows", json!({ "removed": removed }))?;
        }
        Ok(())
    }

    pub fn drop_table(&self, database: &str, table: &str, yes: bool) -> anyhow::Result<()> {
        if !yes {
            bail!("dropping {} deletes all of its rows; pass --yes to confirm", table);
        }

        let session = self.session_with(database)?;
        self.ws.drop_table(&session, table)?;
        if self.mode.is_human() {
            println!("{} Table {} dropped", Icons::DEL, table.style(theme().name.clone()));
        } else {
            emit_success(self.mode, "drop-table", json!({ "table": table }))?;
        }
        Ok(())
    }

    pub fn export(&self, database: &str, table: &str, out: Option<&Path>) -> anyhow::Result<()> {
        let session = self.session_with(database)?;
        let path = match out {
            Some(dir) => self.ws.export_csv_to(&session, table, dir)?,
            None => self.ws.export_csv(&session, table)?,
        };

        if self.mode.is_human() {
            println!("{} Exported to {}", Icons::EXPORT, path.display());
        } else {
            emit_success(self.mode, "export", json!({ "path": path }))?;
        }
        Ok(())
    }
}

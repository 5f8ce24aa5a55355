use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Account seeded into a fresh system store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DefaultAccount {
    pub username: String,
    pub password: String,
}

impl Default for DefaultAccount {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "test".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DbkeeperConfig {
    /// Directory holding the system store and every database file
    pub data_dir: PathBuf,
    /// File name of the system store inside `data_dir`
    pub system_db: String,
    /// Where CSV exports are written
    pub export_dir: PathBuf,
    pub busy_timeout_ms: u64,
    pub default_account: DefaultAccount,
}

impl Default for DbkeeperConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            system_db: "user_management.db".to_string(),
            export_dir: PathBuf::from("."),
            busy_timeout_ms: 5_000,
            default_account: DefaultAccount::default(),
        }
    }
}

impl DbkeeperConfig {
    /// Defaults rooted at `data_dir`, exports included
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            export_dir: data_dir.clone(),
            data_dir,
            ..Self::default()
        }
    }

    pub fn system_db_path(&self) -> PathBuf {
        self.data_dir.join(&self.system_db)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("dbkeeper.toml")
}

pub fn load_config(path: Option<&Path>) -> Result<Option<DbkeeperConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: DbkeeperConfig = toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &DbkeeperConfig, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::Config(format!(
            "config already exists at {} (use --force to overwrite)",
            path.display()
        )));
    }

    let contents = toml::to_string_pretty(config).map_err(|e| Error::Config(e.to_string()))?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.as_os_str().is_empty() && !dir.exists() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

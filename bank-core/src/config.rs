//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "database": "bank.duckdb",
//!   "logLevel": "info"
//! }
//! ```
//! Keys this crate does not manage are preserved when saving.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};

pub const SETTINGS_FILE: &str = "settings.json";
pub const DEFAULT_DATABASE: &str = "bank.duckdb";

/// Env var overriding the database file (name relative to the data dir, or absolute path)
pub const DATABASE_ENV: &str = "BANK_DATABASE";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    log_level: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Bank configuration (simplified view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    pub database: String,
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DEFAULT_DATABASE.to_string(),
            log_level: None,
        }
    }
}

impl Config {
    /// Load config from the data directory
    ///
    /// The database file can be overridden with the BANK_DATABASE env var.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let raw = read_settings(&data_dir.join(SETTINGS_FILE))?;

        let database = std::env::var(DATABASE_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or(raw.database)
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

        Ok(Self {
            database,
            log_level: raw.log_level,
        })
    }

    /// Save config to the data directory
    /// Preserves other settings this crate doesn't manage
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let settings_path = data_dir.join(SETTINGS_FILE);
        let mut settings = read_settings(&settings_path)?;

        settings.database = Some(self.database.clone());
        settings.log_level = self.log_level.clone();

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }

    /// Resolve the database file against the data directory
    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        let path = Path::new(&self.database);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            data_dir.join(path)
        }
    }
}

fn read_settings(path: &Path) -> Result<SettingsFile> {
    if !path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
}

//! CLI command implementations

pub mod admin;
pub mod client;
pub mod config;
pub mod query;
pub mod status;
pub mod user;

use std::path::PathBuf;

use anyhow::{Context, Result};
use bank_core::config::Config;
use bank_core::BankContext;
use dialoguer::{Confirm, Password};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Env var naming the data directory
pub const DATA_DIR_ENV: &str = "BANK_DIR";

/// Env var holding a tracing filter directive (e.g. `bank_core=debug`)
pub const LOG_ENV: &str = "BANK_LOG";

/// Get the data directory from environment or default (~/.bank)
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".bank"))
        .context("Could not find home directory; set BANK_DIR")
}

/// Install the stderr log subscriber
///
/// Filter priority: BANK_LOG > logLevel in settings.json > "warn"
pub fn init_logging() {
    let config_level = get_data_dir()
        .ok()
        .and_then(|dir| Config::load(&dir).ok())
        .and_then(|config| config.log_level);

    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(config_level.as_deref().unwrap_or("warn")))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Get or create the bank context
pub fn get_context() -> Result<BankContext> {
    let data_dir = get_data_dir()?;

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;
    debug!(data_dir = %data_dir.display(), "using data directory");

    BankContext::new(&data_dir).context("Failed to initialize bank context")
}

/// Use the given secret or prompt for it without echo
pub fn secret_or_prompt(value: Option<String>, prompt: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => Ok(Password::new().with_prompt(prompt).interact()?),
    }
}

/// Prompt for a new secret twice
pub fn new_secret_or_prompt(value: Option<String>, prompt: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => Ok(Password::new()
            .with_prompt(prompt)
            .with_confirmation("Repeat to confirm", "Entries do not match")
            .interact()?),
    }
}

/// Ask before a destructive action unless --force was given
pub fn confirm(force: bool, prompt: &str) -> Result<bool> {
    if force {
        return Ok(true);
    }
    Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
}

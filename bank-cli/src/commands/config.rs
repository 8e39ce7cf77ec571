//! Config command - show or change settings.json

use anyhow::{Context, Result};
use bank_core::config::Config;

use super::get_data_dir;
use crate::output;

pub fn run(database: Option<String>, log_level: Option<String>) -> Result<()> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

    let mut config = Config::load(&data_dir)?;

    if database.is_some() || log_level.is_some() {
        if let Some(database) = database {
            config.database = database;
        }
        if let Some(level) = log_level {
            config.log_level = Some(level).filter(|l| !l.trim().is_empty());
        }
        config.save(&data_dir)?;
        output::success("Settings saved");
    }

    let mut table = output::create_table();
    table.add_row(vec!["Data directory", &data_dir.display().to_string()]);
    table.add_row(vec![
        "Database",
        &config.database_path(&data_dir).display().to_string(),
    ]);
    table.add_row(vec!["Log level", config.log_level.as_deref().unwrap_or("warn")]);
    println!("{}", table);
    Ok(())
}

//! Bank CLI - users, client accounts and administrators from the terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{admin, client, config, query, status, user};

/// Bank - manage users, accounts and administrators
#[derive(Parser)]
#[command(name = "bank", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show record counts and deposit totals
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        command: user::UserCommands,
    },

    /// Manage client accounts
    Client {
        #[command(subcommand)]
        command: client::ClientCommands,
    },

    /// Manage administrators
    Admin {
        #[command(subcommand)]
        command: admin::AdminCommands,
    },

    /// Show settings, or change them with the given flags
    Config {
        /// Database file (name relative to the data directory, or absolute path)
        #[arg(long)]
        database: Option<String>,
        /// Log filter directive; an empty value clears it
        #[arg(long)]
        log_level: Option<String>,
    },

    /// Execute one SQL statement against the database
    Query {
        /// SQL statement to execute
        sql: Option<String>,
        /// Read SQL from file
        #[arg(short, long, conflicts_with = "sql")]
        file: Option<PathBuf>,
        /// Positional parameter as a JSON literal (repeatable)
        #[arg(short, long = "param")]
        params: Vec<String>,
        /// Output format
        #[arg(long, default_value = "table", value_parser = ["table", "json", "csv"])]
        format: String,
        /// Output as JSON (shorthand for --format json)
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    commands::init_logging();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Status { json } => status::run(json),
        Commands::User { command } => user::run(command),
        Commands::Client { command } => client::run(command),
        Commands::Admin { command } => admin::run(command),
        Commands::Config { database, log_level } => config::run(database, log_level),
        Commands::Query { sql, file, params, format, json } => {
            let fmt = if json { "json" } else { format.as_str() };
            query::run(sql.as_deref(), file.as_deref(), &params, fmt)
        }
    }
}

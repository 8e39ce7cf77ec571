//! Bank Core - persistence layer for users, client accounts and administrators
//!
//! The crate is organised in the same layers throughout:
//!
//! - **domain**: Records (User, Client, Admin), sanitizer, credential hashing
//! - **ports**: The `Persist` capability records implement
//! - **adapters**: The DuckDB query executor
//! - **services**: Read-side summaries
//! - **schema**: The fixed, embedded table definitions

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod schema;
pub mod services;

use std::path::Path;

use adapters::duckdb::Database;
use config::Config;
use services::StatusService;

// Re-export commonly used types at crate root
pub use adapters::duckdb::{Outcome, QueryResult, Row, SqlParam};
pub use domain::result::{Error, OperationResult, Result};
pub use domain::{Admin, Client, User, UserChanges};
pub use ports::Persist;

/// Main context for bank operations
///
/// Holds the configuration and the one store connection for the process.
pub struct BankContext {
    pub config: Config,
    pub db: Database,
}

impl BankContext {
    /// Load configuration from `data_dir`, open the database and ensure its schema
    pub fn new(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir)?;
        let db = Database::open(&config.database_path(data_dir))?;
        db.ensure_schema()?;

        Ok(Self { config, db })
    }

    pub fn status_service(&self) -> StatusService<'_> {
        StatusService::new(&self.db)
    }
}

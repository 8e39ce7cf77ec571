//! Status service - record counts and deposit totals

use rust_decimal::Decimal;
use serde::Serialize;

use crate::adapters::duckdb::Database;
use crate::domain::result::Result;

/// Status service for store summaries
pub struct StatusService<'a> {
    db: &'a Database,
}

impl<'a> StatusService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Get overall status summary
    pub fn summary(&self) -> Result<StatusSummary> {
        let result = self.db.query(
            "SELECT
                (SELECT COUNT(*) FROM users) AS users,
                (SELECT COUNT(*) FROM clients) AS clients,
                (SELECT COUNT(*) FROM admins) AS admins,
                (SELECT CAST(COALESCE(SUM(account_balance), 0) AS DECIMAL(18, 2)) FROM clients) AS total_deposits",
            &[],
        )?;

        match result.rows.first() {
            Some(row) => Ok(StatusSummary {
                total_users: row.get_i64("users")?,
                total_clients: row.get_i64("clients")?,
                total_admins: row.get_i64("admins")?,
                total_deposits: row.get_decimal("total_deposits")?,
            }),
            None => Ok(StatusSummary::default()),
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct StatusSummary {
    pub total_users: i64,
    pub total_clients: i64,
    pub total_admins: i64,
    pub total_deposits: Decimal,
}

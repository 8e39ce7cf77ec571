//! Status command - record counts and deposit totals

use anyhow::Result;
use colored::Colorize;

use super::get_context;
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let summary = ctx.status_service().summary()?;

    if json {
        return output::json(&summary);
    }

    println!("{}", "Bank Status".bold());
    println!();

    let mut table = output::create_table();
    table.add_row(vec!["Users", &summary.total_users.to_string()]);
    table.add_row(vec!["Client accounts", &summary.total_clients.to_string()]);
    table.add_row(vec!["Administrators", &summary.total_admins.to_string()]);
    table.add_row(vec!["Total deposits", &summary.total_deposits.to_string()]);
    println!("{}", table);

    if let Some(path) = ctx.db.path() {
        println!();
        println!("Database: {}", path.display());
    }

    Ok(())
}

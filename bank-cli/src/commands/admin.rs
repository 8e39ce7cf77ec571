//! Admin commands - manage administrator profiles

use anyhow::{bail, Result};
use bank_core::adapters::duckdb::Database;
use bank_core::{Admin, Persist};
use clap::Subcommand;

use super::client::Holder;
use super::{confirm, get_context, new_secret_or_prompt, secret_or_prompt};
use crate::output;

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Create an administrator for a new or existing user
    Add {
        #[command(flatten)]
        holder: Holder,
        /// Login name
        #[arg(long)]
        user_name: String,
        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
        /// Permission level
        #[arg(long, default_value_t = 0)]
        permission: i32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show an administrator by id or login name
    Show {
        #[arg(long, conflicts_with = "user_name")]
        id: Option<i64>,
        #[arg(long)]
        user_name: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a login name and password
    Verify {
        #[arg(long)]
        user_name: String,
        #[arg(long)]
        password: Option<String>,
    },

    /// Delete an administrator profile
    Delete {
        #[arg(long)]
        id: i64,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

pub fn run(command: AdminCommands) -> Result<()> {
    match command {
        AdminCommands::Add { holder, user_name, password, permission, json } => {
            run_add(holder, &user_name, password, permission, json)
        }
        AdminCommands::Show { id, user_name, json } => run_show(id, user_name, json),
        AdminCommands::Verify { user_name, password } => run_verify(&user_name, password),
        AdminCommands::Delete { id, force } => run_delete(id, force),
    }
}

fn find_admin(db: &Database, id: i64) -> Result<Admin> {
    match Admin::find_by_id(db, id)? {
        Some(admin) => Ok(admin),
        None => bail!("Admin {} not found", id),
    }
}

fn run_add(
    holder: Holder,
    user_name: &str,
    password: Option<String>,
    permission: i32,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;
    let user = holder.resolve(&ctx.db)?;

    let password = new_secret_or_prompt(password, "Password")?;
    let mut admin = Admin::new(user, user_name, &password, permission)?;
    let admin_id = admin.save(&ctx.db)?;

    if json {
        return output::json(&admin);
    }
    output::success(&format!("Created admin {} ({})", admin.user_name(), admin_id));
    Ok(())
}

fn run_show(id: Option<i64>, user_name: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;

    let admin = match (id, user_name) {
        (Some(id), _) => Admin::find_by_id(&ctx.db, id)?,
        (None, Some(name)) => Admin::find_by_name(&ctx.db, &name)?,
        (None, None) => bail!("Specify --id or --user-name"),
    };
    let Some(admin) = admin else {
        bail!("Admin not found");
    };

    if json {
        return output::json(&admin);
    }

    let mut table = output::create_table();
    table.add_row(vec![
        "Admin id",
        &admin.admin_id().map(|id| id.to_string()).unwrap_or_default(),
    ]);
    table.add_row(vec!["User name", admin.user_name()]);
    table.add_row(vec!["Name", &admin.user().full_name()]);
    table.add_row(vec!["Email", admin.user().email()]);
    table.add_row(vec!["Permission", &admin.permission().to_string()]);
    println!("{}", table);
    Ok(())
}

fn run_verify(user_name: &str, password: Option<String>) -> Result<()> {
    let ctx = get_context()?;
    let password = secret_or_prompt(password, "Password")?;

    // Same message for unknown names and wrong passwords
    let accepted = match Admin::find_by_name(&ctx.db, user_name)? {
        Some(admin) => admin.verify_password(&password)?,
        None => false,
    };
    if !accepted {
        bail!("Invalid user name or password");
    }
    output::success("Credentials accepted");
    Ok(())
}

fn run_delete(id: i64, force: bool) -> Result<()> {
    let ctx = get_context()?;
    let mut admin = find_admin(&ctx.db, id)?;

    if !confirm(force, &format!("Delete admin {}?", admin.user_name()))? {
        output::warning("Cancelled");
        return Ok(());
    }

    admin.delete(&ctx.db)?;
    output::success(&format!("Deleted admin {}", id));
    Ok(())
}

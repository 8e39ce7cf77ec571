//! User commands - manage user records

use anyhow::{bail, Result};
use bank_core::{Persist, User, UserChanges};
use clap::Subcommand;

use super::{confirm, get_context};
use crate::output;

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a user
    Add {
        #[arg(long)]
        first: String,
        #[arg(long)]
        last: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a user by id, name or email
    Show {
        #[arg(long)]
        id: Option<i64>,
        #[arg(long, requires = "last")]
        first: Option<String>,
        #[arg(long, requires = "first")]
        last: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change some fields of a user
    Update {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        first: Option<String>,
        #[arg(long)]
        last: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },

    /// Delete a user without an account or admin profile
    Delete {
        #[arg(long)]
        id: i64,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

pub fn run(command: UserCommands) -> Result<()> {
    match command {
        UserCommands::Add { first, last, email, phone, json } => {
            run_add(&first, &last, &email, &phone, json)
        }
        UserCommands::Show { id, first, last, email, json } => {
            run_show(id, first.zip(last), email, json)
        }
        UserCommands::Update { id, first, last, email, phone } => {
            let changes = UserChanges { first_name: first, last_name: last, email, phone };
            run_update(id, changes)
        }
        UserCommands::Delete { id, force } => run_delete(id, force),
    }
}

fn run_add(first: &str, last: &str, email: &str, phone: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let mut user = User::new(first, last, email, phone)?;
    user.save(&ctx.db)?;

    if json {
        return output::json(&user);
    }
    output::success(&format!(
        "Created user {} ({})",
        user.full_name(),
        user.id().unwrap_or_default()
    ));
    Ok(())
}

fn run_show(
    id: Option<i64>,
    name: Option<(String, String)>,
    email: Option<String>,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;

    let user = match (id, name, email) {
        (Some(id), _, _) => User::find_by_id(&ctx.db, id)?,
        (None, Some((first, last)), _) => User::find_by_name(&ctx.db, &first, &last)?,
        (None, None, Some(email)) => User::find_by_email(&ctx.db, &email)?,
        (None, None, None) => bail!("Specify --id, --first/--last or --email"),
    };

    let Some(user) = user else {
        bail!("User not found");
    };

    if json {
        return output::json(&user);
    }
    print_user(&user);
    Ok(())
}

fn run_update(id: i64, changes: UserChanges) -> Result<()> {
    if changes.is_empty() {
        bail!("Nothing to update; pass at least one of --first, --last, --email, --phone");
    }

    let ctx = get_context()?;
    let Some(mut user) = User::find_by_id(&ctx.db, id)? else {
        bail!("User {} not found", id);
    };
    user.update_fields(&ctx.db, changes)?;

    output::success(&format!("Updated user {}", id));
    print_user(&user);
    Ok(())
}

fn run_delete(id: i64, force: bool) -> Result<()> {
    let ctx = get_context()?;
    let Some(mut user) = User::find_by_id(&ctx.db, id)? else {
        bail!("User {} not found", id);
    };

    if !confirm(force, &format!("Delete user {}?", user.full_name()))? {
        output::warning("Cancelled");
        return Ok(());
    }

    user.delete(&ctx.db)?;
    output::success(&format!("Deleted user {}", id));
    Ok(())
}

fn print_user(user: &User) {
    let mut table = output::create_table();
    table.add_row(vec!["Id", &user.id().map(|id| id.to_string()).unwrap_or_default()]);
    table.add_row(vec!["First name", user.first_name()]);
    table.add_row(vec!["Last name", user.last_name()]);
    table.add_row(vec!["Email", user.email()]);
    table.add_row(vec!["Phone", user.phone()]);
    println!("{}", table);
}

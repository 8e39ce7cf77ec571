//! Client commands - open, inspect and operate bank accounts

use std::collections::HashMap;

use anyhow::{bail, Result};
use bank_core::adapters::duckdb::Database;
use bank_core::{Client, OperationResult, Persist, User};
use clap::{Args, Subcommand};
use rust_decimal::Decimal;

use super::{confirm, get_context, new_secret_or_prompt, secret_or_prompt};
use crate::output;

#[derive(Subcommand)]
pub enum ClientCommands {
    /// Open an account for a new or existing user
    Open {
        #[command(flatten)]
        holder: Holder,
        /// Opening balance
        #[arg(long, default_value = "0")]
        balance: Decimal,
        /// PIN (prompted when omitted)
        #[arg(long)]
        pin: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show an account by number or holder name
    Show {
        #[arg(long)]
        account: Option<i64>,
        #[arg(long, requires = "last")]
        first: Option<String>,
        #[arg(long, requires = "first")]
        last: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Put money into an account
    Deposit {
        #[arg(long)]
        account: i64,
        amount: Decimal,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Take money out of an account after checking the PIN
    Withdraw {
        #[arg(long)]
        account: i64,
        amount: Decimal,
        /// PIN (prompted when omitted)
        #[arg(long)]
        pin: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a PIN against an account
    VerifyPin {
        #[arg(long)]
        account: i64,
        #[arg(long)]
        pin: Option<String>,
    },

    /// Close an account; the holder's user record goes too unless it has an admin profile
    Close {
        #[arg(long)]
        account: i64,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

/// Account holder: an existing user id, or the fields of a new user
#[derive(Args)]
pub struct Holder {
    /// Id of an existing user
    #[arg(long, conflicts_with_all = ["first", "last", "email", "phone"])]
    pub user_id: Option<i64>,
    #[arg(long, requires_all = ["last", "email", "phone"])]
    pub first: Option<String>,
    #[arg(long)]
    pub last: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
}

impl Holder {
    /// Resolve to a saved user or a new unsaved one
    pub fn resolve(self, db: &Database) -> Result<User> {
        if let Some(id) = self.user_id {
            return match User::find_by_id(db, id)? {
                Some(user) => Ok(user),
                None => bail!("User {} not found", id),
            };
        }
        match (self.first, self.last, self.email, self.phone) {
            (Some(first), Some(last), Some(email), Some(phone)) => {
                Ok(User::new(first, last, email, phone)?)
            }
            _ => bail!("Specify --user-id, or --first, --last, --email and --phone"),
        }
    }
}

pub fn run(command: ClientCommands) -> Result<()> {
    match command {
        ClientCommands::Open { holder, balance, pin, json } => run_open(holder, balance, pin, json),
        ClientCommands::Show { account, first, last, json } => {
            run_show(account, first.zip(last), json)
        }
        ClientCommands::Deposit { account, amount, json } => run_deposit(account, amount, json),
        ClientCommands::Withdraw { account, amount, pin, json } => {
            run_withdraw(account, amount, pin, json)
        }
        ClientCommands::VerifyPin { account, pin } => run_verify_pin(account, pin),
        ClientCommands::Close { account, force } => run_close(account, force),
    }
}

fn find_client(db: &Database, account: i64) -> Result<Client> {
    match Client::find_by_id(db, account)? {
        Some(client) => Ok(client),
        None => bail!("Account {} not found", account),
    }
}

fn run_open(holder: Holder, balance: Decimal, pin: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let user = holder.resolve(&ctx.db)?;

    let pin = new_secret_or_prompt(pin, "PIN")?;
    let mut client = Client::new(user, &pin)?.with_opening_balance(balance)?;
    let account_number = client.save(&ctx.db)?;

    if json {
        return output::json(&client);
    }
    output::success(&format!(
        "Opened account {} for {}",
        account_number,
        client.user().full_name()
    ));
    Ok(())
}

fn run_show(account: Option<i64>, name: Option<(String, String)>, json: bool) -> Result<()> {
    let ctx = get_context()?;

    let client = match (account, name) {
        (Some(account), _) => Client::find_by_id(&ctx.db, account)?,
        (None, Some((first, last))) => Client::find_by_name(&ctx.db, &first, &last)?,
        (None, None) => bail!("Specify --account or --first/--last"),
    };
    let Some(client) = client else {
        bail!("Account not found");
    };

    if json {
        return output::json(&client);
    }
    print_client(&client);
    Ok(())
}

/// JSON body for a balance change, carrying the account and amount as context
fn balance_result(
    account: i64,
    amount: Decimal,
    outcome: &bank_core::Result<Decimal>,
) -> OperationResult<Decimal> {
    let context = HashMap::from([
        ("accountNumber".to_string(), serde_json::json!(account)),
        ("amount".to_string(), serde_json::json!(amount)),
    ]);
    match outcome {
        Ok(balance) => OperationResult::ok_with_context(*balance, context),
        Err(e) => OperationResult::fail(e.to_string()).with_context(context),
    }
}

/// Print the JSON body; a rejected change still exits with failure
fn print_balance_result(result: &OperationResult<Decimal>) -> Result<()> {
    output::json(result)?;
    if !result.success {
        bail!("Balance change rejected");
    }
    Ok(())
}

fn run_deposit(account: i64, amount: Decimal, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let mut client = find_client(&ctx.db, account)?;

    let outcome = client.deposit(&ctx.db, amount);
    if json {
        return print_balance_result(&balance_result(account, amount, &outcome));
    }
    let balance = outcome?;
    output::success(&format!("Deposited {}; balance is now {}", amount, balance));
    Ok(())
}

fn run_withdraw(account: i64, amount: Decimal, pin: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let mut client = find_client(&ctx.db, account)?;

    let pin = secret_or_prompt(pin, "PIN")?;
    if !client.verify_pin(&pin)? {
        bail!("Incorrect PIN");
    }

    let outcome = client.withdraw(&ctx.db, amount);
    if json {
        return print_balance_result(&balance_result(account, amount, &outcome));
    }
    let balance = outcome?;
    output::success(&format!("Withdrew {}; balance is now {}", amount, balance));
    Ok(())
}

fn run_verify_pin(account: i64, pin: Option<String>) -> Result<()> {
    let ctx = get_context()?;
    let client = find_client(&ctx.db, account)?;

    let pin = secret_or_prompt(pin, "PIN")?;
    if !client.verify_pin(&pin)? {
        bail!("Incorrect PIN");
    }
    output::success("PIN accepted");
    Ok(())
}

fn run_close(account: i64, force: bool) -> Result<()> {
    let ctx = get_context()?;
    let mut client = find_client(&ctx.db, account)?;

    if client.balance() > Decimal::ZERO {
        output::warning(&format!("Account {} still holds {}", account, client.balance()));
    }
    if !confirm(force, &format!("Close account {}?", account))? {
        output::warning("Cancelled");
        return Ok(());
    }

    client.delete(&ctx.db)?;
    output::success(&format!("Closed account {}", account));
    Ok(())
}

fn print_client(client: &Client) {
    let mut table = output::create_table();
    table.add_row(vec![
        "Account",
        &client.account_number().map(|n| n.to_string()).unwrap_or_default(),
    ]);
    table.add_row(vec!["Holder", &client.user().full_name()]);
    table.add_row(vec!["Email", client.user().email()]);
    table.add_row(vec!["Phone", client.user().phone()]);
    table.add_row(vec!["Balance", &client.balance().to_string()]);
    println!("{}", table);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_result_shape() {
        let outcome = Ok(Decimal::new(7500, 2));
        let result = balance_result(10000001, Decimal::new(2500, 2), &outcome);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["data"], "75.00");
        assert_eq!(value["context"]["accountNumber"], 10000001);
        assert_eq!(value["context"]["amount"], "25.00");
        assert!(value["error"].is_null());
    }

    #[test]
    fn test_rejected_balance_result() {
        let outcome = Err(bank_core::Error::validation("insufficient funds"));
        let result = balance_result(10000001, Decimal::new(2500, 2), &outcome);
        assert!(!result.success);
        assert!(result.data.is_none());
        assert!(result.error.as_deref().unwrap().contains("insufficient funds"));
        assert_eq!(result.context.unwrap()["amount"], "25.00");

        let rejected = OperationResult::<Decimal>::fail("insufficient funds");
        assert!(print_balance_result(&rejected).is_err());
    }
}

//! Client domain model
//!
//! A client is a [`User`] plus a bank account: a store-assigned account
//! number, a hashed PIN and a non-negative balance.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use super::credentials::{hash_secret, verify_secret};
use super::result::{Error, Result};
use super::sanitize::{normalize_amount, sanitize};
use super::user::User;
use crate::adapters::duckdb::{Database, Row, SqlParam};
use crate::params;
use crate::ports::Persist;

/// Accepted PIN length range (digits)
pub const MIN_PIN_LEN: usize = 4;
pub const MAX_PIN_LEN: usize = 8;

const SELECT_CLIENT: &str = "SELECT c.account_number, c.pin_code, c.account_balance,
        u.id, u.first_name, u.last_name, u.email, u.phone
 FROM clients c JOIN users u ON u.id = c.user_id";

fn hash_pin(pin: &str) -> Result<String> {
    let pin = pin.trim();
    let valid_len = (MIN_PIN_LEN..=MAX_PIN_LEN).contains(&pin.len());
    if !valid_len || !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::validation(format!(
            "PIN must be {} to {} digits",
            MIN_PIN_LEN, MAX_PIN_LEN
        )));
    }
    hash_secret(pin)
}

/// Largest value the DECIMAL(18, 2) balance column holds
pub const MAX_BALANCE: Decimal = Decimal::from_parts(2_808_348_671, 232_830_643, 0, false, 2);

fn checked_balance(balance: Decimal) -> Result<Decimal> {
    let balance = normalize_amount(balance);
    if balance < Decimal::ZERO {
        return Err(Error::validation("balance cannot be negative"));
    }
    if balance > MAX_BALANCE {
        return Err(Error::validation(format!(
            "balance cannot exceed {}",
            MAX_BALANCE
        )));
    }
    Ok(balance)
}

/// A bank customer with an account
#[derive(Debug, Clone, Serialize)]
pub struct Client {
    #[serde(flatten)]
    user: User,
    account_number: Option<i64>,
    #[serde(skip)]
    pin_hash: String,
    account_balance: Decimal,
}

impl Client {
    /// Create an unsaved client with a zero balance; the PIN is hashed immediately
    pub fn new(user: User, pin: &str) -> Result<Self> {
        Ok(Self {
            user,
            account_number: None,
            pin_hash: hash_pin(pin)?,
            account_balance: Decimal::ZERO,
        })
    }

    /// Set the balance the account opens with (before `save`)
    pub fn with_opening_balance(mut self, balance: Decimal) -> Result<Self> {
        self.account_balance = checked_balance(balance)?;
        Ok(self)
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn user_mut(&mut self) -> &mut User {
        &mut self.user
    }

    pub fn account_number(&self) -> Option<i64> {
        self.account_number
    }

    /// Balance as of the last read or write through this record
    pub fn balance(&self) -> Decimal {
        self.account_balance
    }

    pub fn set_pin(&mut self, pin: &str) -> Result<()> {
        self.pin_hash = hash_pin(pin)?;
        Ok(())
    }

    /// Check a candidate PIN against the stored hash
    pub fn verify_pin(&self, candidate: &str) -> Result<bool> {
        verify_secret(candidate.trim(), &self.pin_hash)
    }

    fn persisted_account(&self) -> Result<i64> {
        self.account_number
            .ok_or_else(|| Error::not_found("client account has not been saved"))
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            user: User::from_row(row)?,
            account_number: Some(row.get_i64("account_number")?),
            pin_hash: row.get_str("pin_code")?,
            account_balance: row.get_decimal("account_balance")?,
        })
    }

    fn find_one(db: &Database, filter: &str, filter_params: &[SqlParam]) -> Result<Option<Self>> {
        let sql = format!("{} WHERE {}", SELECT_CLIENT, filter);
        db.query_single(&sql, filter_params)?
            .map(|row| Self::from_row(&row))
            .transpose()
    }

    /// Look a client up by the id of its user row
    pub fn find_by_user_id(db: &Database, user_id: i64) -> Result<Option<Self>> {
        Self::find_one(db, "c.user_id = ?", &params![user_id])
    }

    /// Look a client up by first and last name; ambiguous names yield `None`
    pub fn find_by_name(db: &Database, first_name: &str, last_name: &str) -> Result<Option<Self>> {
        Self::find_one(
            db,
            "u.first_name = ? AND u.last_name = ?",
            &params![sanitize(first_name), sanitize(last_name)],
        )
    }

    /// Read the stored balance, bypassing the in-memory value
    pub fn stored_balance(db: &Database, account_number: i64) -> Result<Decimal> {
        db.query_single(
            "SELECT account_balance FROM clients WHERE account_number = ?",
            &params![account_number],
        )?
        .ok_or_else(|| Error::not_found(format!("client account {}", account_number)))?
        .get_decimal("account_balance")
    }

    /// Take money out of the account; returns the new balance
    ///
    /// Rejects negative amounts and amounts larger than the stored balance.
    pub fn withdraw(&mut self, db: &Database, amount: Decimal) -> Result<Decimal> {
        if amount < Decimal::ZERO {
            return Err(Error::validation("withdrawal amount cannot be negative"));
        }
        let account_number = self.persisted_account()?;
        let amount = normalize_amount(amount);

        let current = Self::stored_balance(db, account_number)?;
        if amount > current {
            return Err(Error::validation(format!(
                "insufficient funds: balance {} is less than {}",
                current, amount
            )));
        }

        self.apply_balance(db, current - amount)
    }

    /// Put money into the account; returns the new balance
    ///
    /// Rejects zero and negative amounts.
    pub fn deposit(&mut self, db: &Database, amount: Decimal) -> Result<Decimal> {
        let amount = normalize_amount(amount);
        if amount <= Decimal::ZERO {
            return Err(Error::validation("deposit amount must be positive"));
        }
        let account_number = self.persisted_account()?;

        let current = Self::stored_balance(db, account_number)?;
        let new_balance = current.checked_add(amount).ok_or_else(|| {
            Error::validation(format!("balance cannot exceed {}", MAX_BALANCE))
        })?;
        self.apply_balance(db, new_balance)
    }

    /// Single write path for balance changes: normalize, validate, persist
    fn apply_balance(&mut self, db: &Database, new_balance: Decimal) -> Result<Decimal> {
        let account_number = self.persisted_account()?;
        let balance = checked_balance(new_balance)?;

        let affected = db.execute(
            "UPDATE clients SET account_balance = CAST(? AS DECIMAL(18, 2)) WHERE account_number = ?",
            &params![balance, account_number],
        )?;
        if affected == 0 {
            return Err(Error::not_found(format!("client account {}", account_number)));
        }
        info!(account_number, "updated account balance");

        self.account_balance = balance;
        Ok(balance)
    }
}

impl Persist for Client {
    /// Saves the user row first when it has no id yet, then the account row.
    /// The two inserts are independent statements.
    fn save(&mut self, db: &Database) -> Result<i64> {
        if let Some(account_number) = self.account_number {
            return Err(Error::validation(format!(
                "client account {} is already saved",
                account_number
            )));
        }

        let user_id = match self.user.id() {
            Some(id) => id,
            None => self.user.save(db)?,
        };

        let account_number = db.insert(
            "INSERT INTO clients (user_id, pin_code, account_balance)
             VALUES (?, ?, CAST(? AS DECIMAL(18, 2)))
             RETURNING account_number",
            &params![user_id, &self.pin_hash, self.account_balance],
        )?;
        info!(user_id, account_number, "opened client account");

        self.account_number = Some(account_number);
        Ok(account_number)
    }

    /// Writes the user fields and the PIN; the balance only moves through
    /// `withdraw` and `deposit`
    fn update(&self, db: &Database) -> Result<()> {
        let account_number = self.persisted_account()?;

        self.user.update(db)?;
        let affected = db.execute(
            "UPDATE clients SET pin_code = ? WHERE account_number = ?",
            &params![&self.pin_hash, account_number],
        )?;
        if affected == 0 {
            return Err(Error::not_found(format!("client account {}", account_number)));
        }
        Ok(())
    }

    /// Removes the account row, then the user row unless an admin profile still uses it
    fn delete(&mut self, db: &Database) -> Result<()> {
        let account_number = self.persisted_account()?;
        let user_id = self.user.persisted_id()?;

        let affected = db.execute(
            "DELETE FROM clients WHERE account_number = ?",
            &params![account_number],
        )?;
        if affected == 0 {
            return Err(Error::not_found(format!("client account {}", account_number)));
        }
        info!(account_number, "closed client account");
        self.account_number = None;

        if !User::has_dependents(db, user_id)? {
            self.user.delete_row(db)?;
        }
        Ok(())
    }

    /// Look a client up by account number
    fn find_by_id(db: &Database, account_number: i64) -> Result<Option<Self>> {
        Self::find_one(db, "c.account_number = ?", &params![account_number])
    }

    fn is_persisted(&self) -> bool {
        self.account_number.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.ensure_schema().unwrap();
        db
    }

    fn grace() -> User {
        User::new("Grace", "Hopper", "grace@example.com", "+1 555-0100").unwrap()
    }

    fn saved_client(db: &Database, opening: Decimal) -> Client {
        let mut client = Client::new(grace(), "2468")
            .unwrap()
            .with_opening_balance(opening)
            .unwrap();
        client.save(db).unwrap();
        client
    }

    #[test]
    fn test_pin_must_be_digits() {
        assert!(Client::new(grace(), "12").is_err());
        assert!(Client::new(grace(), "12a4").is_err());
        assert!(Client::new(grace(), "123456789").is_err());
        assert!(Client::new(grace(), "1234").is_ok());
    }

    #[test]
    fn test_pin_verify_only_matches_original() {
        let mut client = Client::new(grace(), "2468").unwrap();
        assert!(client.verify_pin("2468").unwrap());
        assert!(!client.verify_pin("8642").unwrap());

        client.set_pin("1357").unwrap();
        assert!(client.verify_pin("1357").unwrap());
        assert!(!client.verify_pin("2468").unwrap());
    }

    #[test]
    fn test_pin_is_never_stored_in_plaintext() {
        let db = test_db();
        let client = saved_client(&db, Decimal::ZERO);
        let row = db
            .query_single(
                "SELECT pin_code FROM clients WHERE account_number = ?",
                &params![client.account_number().unwrap()],
            )
            .unwrap()
            .unwrap();
        let stored = row.get_str("pin_code").unwrap();
        assert_ne!(stored, "2468");
        assert!(stored.starts_with("$argon2id$"));
    }

    #[test]
    fn test_negative_opening_balance_rejected() {
        let client = Client::new(grace(), "2468").unwrap();
        assert!(client.with_opening_balance(Decimal::new(-1, 2)).is_err());
    }

    #[test]
    fn test_save_assigns_account_number_and_user_id() {
        let db = test_db();
        let client = saved_client(&db, Decimal::new(5000, 2));
        assert!(client.account_number().unwrap() > 0);
        assert!(client.user().id().unwrap() > 0);

        let loaded = Client::find_by_id(&db, client.account_number().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(loaded.balance(), Decimal::new(5000, 2));
        assert_eq!(loaded.user(), client.user());
        assert!(loaded.verify_pin("2468").unwrap());
    }

    #[test]
    fn test_withdraw_reduces_balance() {
        let db = test_db();
        let mut client = saved_client(&db, Decimal::new(10000, 2));

        let balance = client.withdraw(&db, Decimal::new(2550, 2)).unwrap();
        assert_eq!(balance, Decimal::new(7450, 2));
        assert_eq!(
            Client::stored_balance(&db, client.account_number().unwrap()).unwrap(),
            Decimal::new(7450, 2)
        );
    }

    #[test]
    fn test_withdraw_rejects_negative_and_overdraft() {
        let db = test_db();
        let mut client = saved_client(&db, Decimal::new(1000, 2));

        assert!(client.withdraw(&db, Decimal::new(-100, 2)).is_err());
        let err = client.withdraw(&db, Decimal::new(1001, 2)).unwrap_err();
        assert!(err.to_string().contains("insufficient funds"));
        assert_eq!(client.balance(), Decimal::new(1000, 2));

        // Exactly the balance is allowed
        assert_eq!(client.withdraw(&db, Decimal::new(1000, 2)).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_deposit_increases_balance() {
        let db = test_db();
        let mut client = saved_client(&db, Decimal::ZERO);
        assert_eq!(client.deposit(&db, Decimal::new(1999, 2)).unwrap(), Decimal::new(1999, 2));
        assert_eq!(client.deposit(&db, Decimal::new(1, 2)).unwrap(), Decimal::new(2000, 2));
    }

    #[test]
    fn test_deposit_rejects_non_positive() {
        let db = test_db();
        let mut client = saved_client(&db, Decimal::ZERO);
        assert!(client.deposit(&db, Decimal::ZERO).is_err());
        assert!(client.deposit(&db, Decimal::new(-500, 2)).is_err());
        assert!(client.deposit(&db, Decimal::new(1, 3)).is_err());
    }

    #[test]
    fn test_balance_operations_reread_store() {
        let db = test_db();
        let mut first = saved_client(&db, Decimal::new(10000, 2));
        let mut second = Client::find_by_id(&db, first.account_number().unwrap())
            .unwrap()
            .unwrap();

        first.withdraw(&db, Decimal::new(6000, 2)).unwrap();
        // `second` still holds 100.00 in memory but must see 40.00
        assert!(second.withdraw(&db, Decimal::new(6000, 2)).is_err());
        assert_eq!(second.deposit(&db, Decimal::new(500, 2)).unwrap(), Decimal::new(4500, 2));
    }

    #[test]
    fn test_unsaved_client_cannot_move_money() {
        let db = test_db();
        let mut client = Client::new(grace(), "2468").unwrap();
        assert!(client
            .deposit(&db, Decimal::new(100, 2))
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_delete_removes_client_and_user() {
        let db = test_db();
        let mut client = saved_client(&db, Decimal::ZERO);
        let account_number = client.account_number().unwrap();
        let user_id = client.user().id().unwrap();

        client.delete(&db).unwrap();

        assert!(Client::find_by_id(&db, account_number).unwrap().is_none());
        assert!(User::find_by_id(&db, user_id).unwrap().is_none());
        assert!(!client.is_persisted());
    }

    #[test]
    fn test_find_by_name() {
        let db = test_db();
        let client = saved_client(&db, Decimal::ZERO);
        let found = Client::find_by_name(&db, "Grace", "Hopper").unwrap().unwrap();
        assert_eq!(found.account_number(), client.account_number());
        assert!(Client::find_by_name(&db, "Grace", "Kelly").unwrap().is_none());
    }

    #[test]
    fn test_find_by_name_ambiguous_is_none() {
        let db = test_db();
        saved_client(&db, Decimal::ZERO);
        let namesake =
            User::new("Grace", "Hopper", "grace2@example.com", "+1 555-0101").unwrap();
        Client::new(namesake, "1111").unwrap().save(&db).unwrap();

        assert!(Client::find_by_name(&db, "Grace", "Hopper").unwrap().is_none());
    }

    #[test]
    fn test_update_does_not_overwrite_balance() {
        let db = test_db();
        let mut stale = saved_client(&db, Decimal::new(10000, 2));
        let account_number = stale.account_number().unwrap();

        let mut fresh = Client::find_by_id(&db, account_number).unwrap().unwrap();
        fresh.withdraw(&db, Decimal::new(6000, 2)).unwrap();

        stale.set_pin("1357").unwrap();
        stale.update(&db).unwrap();

        assert_eq!(
            Client::stored_balance(&db, account_number).unwrap(),
            Decimal::new(4000, 2)
        );
        let reloaded = Client::find_by_id(&db, account_number).unwrap().unwrap();
        assert!(reloaded.verify_pin("1357").unwrap());
    }

    #[test]
    fn test_deposit_overflow_is_rejected() {
        let db = test_db();
        let mut client = saved_client(&db, Decimal::new(100, 2));

        let err = client.deposit(&db, Decimal::MAX).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(client.balance(), Decimal::new(100, 2));
        assert_eq!(
            Client::stored_balance(&db, client.account_number().unwrap()).unwrap(),
            Decimal::new(100, 2)
        );
    }

    #[test]
    fn test_balance_limited_to_column_range() {
        assert_eq!(MAX_BALANCE.to_string(), "9999999999999999.99");

        let opening = Client::new(grace(), "2468").unwrap();
        assert!(opening
            .with_opening_balance(MAX_BALANCE + Decimal::new(1, 2))
            .unwrap_err()
            .is_validation());

        let db = test_db();
        let mut client = saved_client(&db, MAX_BALANCE - Decimal::ONE);
        assert!(client.deposit(&db, Decimal::new(200, 2)).is_err());
        assert_eq!(client.deposit(&db, Decimal::ONE).unwrap(), MAX_BALANCE);
    }
}

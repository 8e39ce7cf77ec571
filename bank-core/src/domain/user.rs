//! User domain model
//!
//! The base record shared by clients and administrators. Text is sanitized on
//! every write path; email and phone are format-checked after sanitizing.

use serde::Serialize;
use tracing::info;

use super::result::{Error, Result};
use super::sanitize::{sanitize, validate_email, validate_phone};
use crate::adapters::duckdb::{Database, Row};
use crate::params;
use crate::ports::Persist;

const SELECT_USER: &str = "SELECT id, first_name, last_name, email, phone FROM users";

/// A person known to the bank
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    id: Option<i64>,
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
}

fn required_name(field: &str, value: &str) -> Result<String> {
    let clean = sanitize(value);
    if clean.is_empty() {
        return Err(Error::validation(format!("{} cannot be empty", field)));
    }
    Ok(clean)
}

fn checked_email(value: &str) -> Result<String> {
    let clean = sanitize(value).to_lowercase();
    validate_email(&clean)?;
    Ok(clean)
}

fn checked_phone(value: &str) -> Result<String> {
    let clean = sanitize(value);
    validate_phone(&clean)?;
    Ok(clean)
}

impl User {
    /// Create an unsaved user; every field is sanitized and validated
    pub fn new(
        first_name: impl AsRef<str>,
        last_name: impl AsRef<str>,
        email: impl AsRef<str>,
        phone: impl AsRef<str>,
    ) -> Result<Self> {
        Ok(Self {
            id: None,
            first_name: required_name("first name", first_name.as_ref())?,
            last_name: required_name("last name", last_name.as_ref())?,
            email: checked_email(email.as_ref())?,
            phone: checked_phone(phone.as_ref())?,
        })
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn set_first_name(&mut self, value: impl AsRef<str>) -> Result<()> {
        self.first_name = required_name("first name", value.as_ref())?;
        Ok(())
    }

    pub fn set_last_name(&mut self, value: impl AsRef<str>) -> Result<()> {
        self.last_name = required_name("last name", value.as_ref())?;
        Ok(())
    }

    pub fn set_email(&mut self, value: impl AsRef<str>) -> Result<()> {
        self.email = checked_email(value.as_ref())?;
        Ok(())
    }

    pub fn set_phone(&mut self, value: impl AsRef<str>) -> Result<()> {
        self.phone = checked_phone(value.as_ref())?;
        Ok(())
    }

    pub(crate) fn persisted_id(&self) -> Result<i64> {
        self.id
            .ok_or_else(|| Error::not_found("user has not been saved"))
    }

    pub(crate) fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: Some(row.get_i64("id")?),
            first_name: row.get_str("first_name")?,
            last_name: row.get_str("last_name")?,
            email: row.get_str("email")?,
            phone: row.get_str("phone")?,
        })
    }

    /// Look a user up by first and last name; ambiguous names yield `None`
    pub fn find_by_name(db: &Database, first_name: &str, last_name: &str) -> Result<Option<Self>> {
        let sql = format!("{} WHERE first_name = ? AND last_name = ?", SELECT_USER);
        db.query_single(&sql, &params![sanitize(first_name), sanitize(last_name)])?
            .map(|row| Self::from_row(&row))
            .transpose()
    }

    /// Look a user up by email address
    pub fn find_by_email(db: &Database, email: &str) -> Result<Option<Self>> {
        let sql = format!("{} WHERE email = ?", SELECT_USER);
        db.query_single(&sql, &params![sanitize(email).to_lowercase()])?
            .map(|row| Self::from_row(&row))
            .transpose()
    }

    /// Apply a partial change set and persist it in one statement
    ///
    /// Fields left as `None` keep their stored value.
    pub fn update_fields(&mut self, db: &Database, changes: UserChanges) -> Result<()> {
        let id = self.persisted_id()?;

        let first_name = changes
            .first_name
            .as_deref()
            .map(|v| required_name("first name", v))
            .transpose()?;
        let last_name = changes
            .last_name
            .as_deref()
            .map(|v| required_name("last name", v))
            .transpose()?;
        let email = changes.email.as_deref().map(checked_email).transpose()?;
        let phone = changes.phone.as_deref().map(checked_phone).transpose()?;

        let affected = db.execute(
            "UPDATE users SET
                first_name = COALESCE(?, first_name),
                last_name = COALESCE(?, last_name),
                email = COALESCE(?, email),
                phone = COALESCE(?, phone)
             WHERE id = ?",
            &params![first_name.clone(), last_name.clone(), email.clone(), phone.clone(), id],
        )?;
        if affected == 0 {
            return Err(Error::not_found(format!("user {}", id)));
        }

        if let Some(v) = first_name {
            self.first_name = v;
        }
        if let Some(v) = last_name {
            self.last_name = v;
        }
        if let Some(v) = email {
            self.email = v;
        }
        if let Some(v) = phone {
            self.phone = v;
        }
        Ok(())
    }

    /// Whether a client account or admin profile still points at this user
    pub(crate) fn has_dependents(db: &Database, id: i64) -> Result<bool> {
        let result = db.query(
            "SELECT (SELECT COUNT(*) FROM clients WHERE user_id = ?)
                  + (SELECT COUNT(*) FROM admins WHERE user_id = ?) AS dependents",
            &params![id, id],
        )?;
        let dependents = result
            .rows
            .first()
            .map(|row| row.get_i64("dependents"))
            .transpose()?
            .unwrap_or(0);
        Ok(dependents > 0)
    }

    /// Delete the users row without checking for dependents
    pub(crate) fn delete_row(&mut self, db: &Database) -> Result<()> {
        let id = self.persisted_id()?;
        let affected = db.execute("DELETE FROM users WHERE id = ?", &params![id])?;
        if affected == 0 {
            return Err(Error::not_found(format!("user {}", id)));
        }
        info!(user_id = id, "deleted user");
        self.id = None;
        Ok(())
    }
}

impl Persist for User {
    fn save(&mut self, db: &Database) -> Result<i64> {
        if let Some(id) = self.id {
            return Err(Error::validation(format!("user {} is already saved", id)));
        }

        let id = db.insert(
            "INSERT INTO users (first_name, last_name, email, phone)
             VALUES (?, ?, ?, ?)
             RETURNING id",
            &params![&self.first_name, &self.last_name, &self.email, &self.phone],
        )?;
        info!(user_id = id, "created user");

        self.id = Some(id);
        Ok(id)
    }

    fn update(&self, db: &Database) -> Result<()> {
        let id = self.persisted_id()?;
        let affected = db.execute(
            "UPDATE users SET first_name = ?, last_name = ?, email = ?, phone = ? WHERE id = ?",
            &params![&self.first_name, &self.last_name, &self.email, &self.phone, id],
        )?;
        if affected == 0 {
            return Err(Error::not_found(format!("user {}", id)));
        }
        Ok(())
    }

    fn delete(&mut self, db: &Database) -> Result<()> {
        let id = self.persisted_id()?;
        if Self::has_dependents(db, id)? {
            return Err(Error::validation(format!(
                "user {} still has a client account or admin profile",
                id
            )));
        }
        self.delete_row(db)
    }

    fn find_by_id(db: &Database, id: i64) -> Result<Option<Self>> {
        let sql = format!("{} WHERE id = ?", SELECT_USER);
        db.query_single(&sql, &params![id])?
            .map(|row| Self::from_row(&row))
            .transpose()
    }

    fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

/// Partial update for [`User::update_fields`]
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl UserChanges {
    pub fn first_name(mut self, value: impl Into<String>) -> Self {
        self.first_name = Some(value.into());
        self
    }

    pub fn last_name(mut self, value: impl Into<String>) -> Self {
        self.last_name = Some(value.into());
        self
    }

    pub fn email(mut self, value: impl Into<String>) -> Self {
        self.email = Some(value.into());
        self
    }

    pub fn phone(mut self, value: impl Into<String>) -> Self {
        self.phone = Some(value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
    }
}

//! Admin domain model

use serde::Serialize;
use tracing::info;

use super::credentials::{hash_secret, verify_secret};
use super::result::{Error, Result};
use super::sanitize::sanitize;
use super::user::User;
use crate::adapters::duckdb::{Database, Row, SqlParam};
use crate::params;
use crate::ports::Persist;

pub const MIN_PASSWORD_LEN: usize = 8;

const SELECT_ADMIN: &str = "SELECT a.admin_id, a.user_name, a.password, a.permission,
        u.id, u.first_name, u.last_name, u.email, u.phone
 FROM admins a JOIN users u ON u.id = a.user_id";

fn hash_password(password: &str) -> Result<String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    hash_secret(password)
}

fn checked_user_name(value: &str) -> Result<String> {
    let clean = sanitize(value);
    if clean.is_empty() {
        return Err(Error::validation("user name cannot be empty"));
    }
    Ok(clean)
}

fn checked_permission(level: i32) -> Result<i32> {
    if level < 0 {
        return Err(Error::validation("permission level cannot be negative"));
    }
    Ok(level)
}

/// A back-office administrator
#[derive(Debug, Clone, Serialize)]
pub struct Admin {
    #[serde(flatten)]
    user: User,
    admin_id: Option<i64>,
    user_name: String,
    #[serde(skip)]
    password_hash: String,
    permission: i32,
}

impl Admin {
    pub fn new(user: User, user_name: &str, password: &str, permission: i32) -> Result<Self> {
        Ok(Self {
            user,
            admin_id: None,
            user_name: checked_user_name(user_name)?,
            password_hash: hash_password(password)?,
            permission: checked_permission(permission)?,
        })
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn user_mut(&mut self) -> &mut User {
        &mut self.user
    }

    pub fn admin_id(&self) -> Option<i64> {
        self.admin_id
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn permission(&self) -> i32 {
        self.permission
    }

    /// Whether this admin holds at least the given level
    pub fn has_permission(&self, level: i32) -> bool {
        self.permission >= level
    }

    pub fn set_user_name(&mut self, value: &str) -> Result<()> {
        self.user_name = checked_user_name(value)?;
        Ok(())
    }

    pub fn set_permission(&mut self, level: i32) -> Result<()> {
        self.permission = checked_permission(level)?;
        Ok(())
    }

    pub fn set_password(&mut self, password: &str) -> Result<()> {
        self.password_hash = hash_password(password)?;
        Ok(())
    }

    pub fn verify_password(&self, candidate: &str) -> Result<bool> {
        verify_secret(candidate, &self.password_hash)
    }

    fn persisted_admin(&self) -> Result<i64> {
        self.admin_id
            .ok_or_else(|| Error::not_found("admin has not been saved"))
    }

    fn from_row(row: &Row) -> Result<Self> {
        let permission = i32::try_from(row.get_i64("permission")?)
            .map_err(|e| Error::database(format!("permission out of range: {}", e)))?;
        Ok(Self {
            user: User::from_row(row)?,
            admin_id: Some(row.get_i64("admin_id")?),
            user_name: row.get_str("user_name")?,
            password_hash: row.get_str("password")?,
            permission,
        })
    }

    fn find_one(db: &Database, filter: &str, filter_params: &[SqlParam]) -> Result<Option<Self>> {
        let sql = format!("{} WHERE {}", SELECT_ADMIN, filter);
        db.query_single(&sql, filter_params)?
            .map(|row| Self::from_row(&row))
            .transpose()
    }

    /// Look an admin up by login name
    pub fn find_by_name(db: &Database, user_name: &str) -> Result<Option<Self>> {
        Self::find_one(db, "a.user_name = ?", &params![sanitize(user_name)])
    }
}

impl Persist for Admin {
    fn save(&mut self, db: &Database) -> Result<i64> {
        if let Some(admin_id) = self.admin_id {
            return Err(Error::validation(format!("admin {} is already saved", admin_id)));
        }

        let user_id = match self.user.id() {
            Some(id) => id,
            None => self.user.save(db)?,
        };

        let admin_id = db.insert(
            "INSERT INTO admins (user_id, user_name, password, permission)
             VALUES (?, ?, ?, ?)
             RETURNING admin_id",
            &params![user_id, &self.user_name, &self.password_hash, self.permission],
        )?;
        info!(user_id, admin_id, "created admin");

        self.admin_id = Some(admin_id);
        Ok(admin_id)
    }

    fn update(&self, db: &Database) -> Result<()> {
        let admin_id = self.persisted_admin()?;

        self.user.update(db)?;
        let affected = db.execute(
            "UPDATE admins SET user_name = ?, password = ?, permission = ? WHERE admin_id = ?",
            &params![&self.user_name, &self.password_hash, self.permission, admin_id],
        )?;
        if affected == 0 {
            return Err(Error::not_found(format!("admin {}", admin_id)));
        }
        Ok(())
    }

    /// Removes the admin row, then the user row unless a client account still uses it
    fn delete(&mut self, db: &Database) -> Result<()> {
        let admin_id = self.persisted_admin()?;
        let user_id = self.user.persisted_id()?;

        let affected = db.execute("DELETE FROM admins WHERE admin_id = ?", &params![admin_id])?;
        if affected == 0 {
            return Err(Error::not_found(format!("admin {}", admin_id)));
        }
        info!(admin_id, "deleted admin");
        self.admin_id = None;

        if !User::has_dependents(db, user_id)? {
            self.user.delete_row(db)?;
        }
        Ok(())
    }

    fn find_by_id(db: &Database, admin_id: i64) -> Result<Option<Self>> {
        Self::find_one(db, "a.admin_id = ?", &params![admin_id])
    }

    fn is_persisted(&self) -> bool {
        self.admin_id.is_some()
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

    fn linus() -> User {
        User::new("Linus", "Admin", "linus@example.com", "+1 555-0177").unwrap()
    }

    #[test]
    fn test_admin_validation() {
        assert!(Admin::new(linus(), "linus", "short", 1).is_err());
        assert!(Admin::new(linus(), "  ", "long enough", 1).is_err());
        assert!(Admin::new(linus(), "linus", "long enough", -1).is_err());
        assert!(Admin::new(linus(), "linus", "long enough", 0).is_ok());
    }

    #[test]
    fn test_password_round_trip() {
        let mut admin = Admin::new(linus(), "linus", "hunter2hunter2", 3).unwrap();
        assert!(admin.verify_password("hunter2hunter2").unwrap());
        assert!(!admin.verify_password("hunter2").unwrap());

        admin.set_password("another-secret").unwrap();
        assert!(admin.verify_password("another-secret").unwrap());
        assert!(!admin.verify_password("hunter2hunter2").unwrap());
    }

    #[test]
    fn test_save_and_find() {
        let db = test_db();
        let mut admin = Admin::new(linus(), "linus", "hunter2hunter2", 3).unwrap();
        let admin_id = admin.save(&db).unwrap();
        assert!(admin_id > 0);

        let by_id = Admin::find_by_id(&db, admin_id).unwrap().unwrap();
        assert_eq!(by_id.user_name(), "linus");
        assert_eq!(by_id.permission(), 3);
        assert!(by_id.verify_password("hunter2hunter2").unwrap());

        let by_name = Admin::find_by_name(&db, " linus ").unwrap().unwrap();
        assert_eq!(by_name.admin_id(), Some(admin_id));
        assert!(Admin::find_by_name(&db, "root").unwrap().is_none());
    }

    #[test]
    fn test_update_permission() {
        let db = test_db();
        let mut admin = Admin::new(linus(), "linus", "hunter2hunter2", 1).unwrap();
        let admin_id = admin.save(&db).unwrap();

        admin.set_permission(5).unwrap();
        admin.update(&db).unwrap();

        let stored = Admin::find_by_id(&db, admin_id).unwrap().unwrap();
        assert!(stored.has_permission(5));
        assert!(!stored.has_permission(6));
    }

    #[test]
    fn test_delete_keeps_user_with_client_account() {
        use crate::domain::Client;

        let db = test_db();
        let mut user = linus();
        user.save(&db).unwrap();

        let mut client = Client::new(user.clone(), "9999").unwrap();
        client.save(&db).unwrap();
        let mut admin = Admin::new(user.clone(), "linus", "hunter2hunter2", 1).unwrap();
        admin.save(&db).unwrap();

        admin.delete(&db).unwrap();

        let user_id = user.id().unwrap();
        assert!(User::find_by_id(&db, user_id).unwrap().is_some());
        assert!(Client::find_by_user_id(&db, user_id).unwrap().is_some());
    }

    #[test]
    fn test_delete_removes_unreferenced_user() {
        let db = test_db();
        let mut admin = Admin::new(linus(), "linus", "hunter2hunter2", 1).unwrap();
        let admin_id = admin.save(&db).unwrap();
        let user_id = admin.user().id().unwrap();

        admin.delete(&db).unwrap();

        assert!(!admin.is_persisted());
        assert!(Admin::find_by_id(&db, admin_id).unwrap().is_none());
        assert!(User::find_by_id(&db, user_id).unwrap().is_none());
    }
}

//! Persistence port - single-row CRUD for records

use crate::adapters::duckdb::Database;
use crate::domain::result::Result;

/// Single-row persistence for a record type
///
/// Each operation is exactly one SQL statement against the record's own
/// table, except for records composed over a `User`, which also write the
/// `users` row.
pub trait Persist: Sized {
    /// Insert the record and back-fill the store-assigned id, which is returned
    fn save(&mut self, db: &Database) -> Result<i64>;

    /// Push every field of the record to its row
    ///
    /// Fails with `NotFound` when the record was never saved or its row is gone.
    fn update(&self, db: &Database) -> Result<()>;

    /// Remove the record's row; the in-memory record becomes unsaved
    fn delete(&mut self, db: &Database) -> Result<()>;

    /// Load a record by its primary id
    fn find_by_id(db: &Database, id: i64) -> Result<Option<Self>>;

    /// Whether the record has been saved
    fn is_persisted(&self) -> bool;
}

//! Integration tests for bank-core records
//!
//! These tests run against a real DuckDB file in a temp directory.
//!
//! Run with: cargo test --test integration_tests -- --nocapture

use rust_decimal::Decimal;
use tempfile::TempDir;

use bank_core::adapters::duckdb::Database;
use bank_core::{params, Admin, BankContext, Client, Persist, User, UserChanges};

// ============================================================================
// Test Helpers
// ============================================================================

/// Create a file-backed database with schema initialized
fn create_test_db(temp_dir: &TempDir) -> Database {
    let db_path = temp_dir.path().join("test.duckdb");
    let db = Database::open(&db_path).expect("Failed to open database");
    db.ensure_schema().expect("Failed to initialize schema");
    db
}

fn create_test_user(n: usize) -> User {
    User::new(
        format!("First{}", n),
        format!("Last{}", n),
        format!("user{}@example.com", n),
        "+1 555-0100",
    )
    .unwrap()
}

fn count(db: &Database, table: &str) -> i64 {
    let result = db
        .query(&format!("SELECT COUNT(*) AS n FROM {}", table), &[])
        .unwrap();
    result.rows[0].get_i64("n").unwrap()
}

// ============================================================================
// Single-row targeting
// ============================================================================

#[test]
fn test_update_affects_only_targeted_row() {
    let temp_dir = TempDir::new().unwrap();
    let db = create_test_db(&temp_dir);

    let mut users: Vec<User> = (0..3).map(create_test_user).collect();
    for user in users.iter_mut() {
        user.save(&db).unwrap();
    }

    users[1].set_last_name("Renamed").unwrap();
    users[1].update(&db).unwrap();

    for (i, user) in users.iter().enumerate() {
        let stored = User::find_by_id(&db, user.id().unwrap()).unwrap().unwrap();
        if i == 1 {
            assert_eq!(stored.last_name(), "Renamed");
        } else {
            assert_eq!(stored.last_name(), format!("Last{}", i));
        }
    }
}

#[test]
fn test_delete_affects_only_targeted_row() {
    let temp_dir = TempDir::new().unwrap();
    let db = create_test_db(&temp_dir);

    let mut users: Vec<User> = (0..3).map(create_test_user).collect();
    for user in users.iter_mut() {
        user.save(&db).unwrap();
    }
    let ids: Vec<i64> = users.iter().map(|u| u.id().unwrap()).collect();

    users[0].delete(&db).unwrap();

    assert_eq!(count(&db, "users"), 2);
    assert!(User::find_by_id(&db, ids[0]).unwrap().is_none());
    assert!(User::find_by_id(&db, ids[1]).unwrap().is_some());
    assert!(User::find_by_id(&db, ids[2]).unwrap().is_some());
}

#[test]
fn test_save_ids_are_positive_and_distinct() {
    let temp_dir = TempDir::new().unwrap();
    let db = create_test_db(&temp_dir);

    let mut ids = Vec::new();
    for n in 0..5 {
        let mut user = create_test_user(n);
        let id = user.save(&db).unwrap();
        assert!(id > 0);
        assert_eq!(db.last_insert_id(), Some(id));
        ids.push(id);
    }
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 5);
}

#[test]
fn test_deleted_row_update_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let db = create_test_db(&temp_dir);

    let mut user = create_test_user(1);
    let id = user.save(&db).unwrap();
    db.execute("DELETE FROM users WHERE id = ?", &params![id])
        .unwrap();

    let err = user.update(&db).unwrap_err();
    assert!(err.is_not_found());
}

// ============================================================================
// Store-enforced constraints
// ============================================================================

#[test]
fn test_duplicate_email_rejected_by_store() {
    let temp_dir = TempDir::new().unwrap();
    let db = create_test_db(&temp_dir);

    let mut first = create_test_user(1);
    first.save(&db).unwrap();

    let mut duplicate = User::new("Other", "Person", "USER1@example.com", "+1 555-0111").unwrap();
    assert!(duplicate.save(&db).is_err());
    assert_eq!(duplicate.id(), None);
    assert_eq!(count(&db, "users"), 1);
}

#[test]
fn test_user_with_account_cannot_be_deleted_directly() {
    let temp_dir = TempDir::new().unwrap();
    let db = create_test_db(&temp_dir);

    let mut client = Client::new(create_test_user(1), "1234").unwrap();
    client.save(&db).unwrap();

    let mut user = client.user().clone();
    assert!(user.delete(&db).is_err());
    assert_eq!(count(&db, "users"), 1);
    assert_eq!(count(&db, "clients"), 1);
}

// ============================================================================
// Persistence across reopen
// ============================================================================

#[test]
fn test_records_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let (account_number, admin_id) = {
        let db = create_test_db(&temp_dir);
        let mut client = Client::new(create_test_user(1), "4321")
            .unwrap()
            .with_opening_balance(Decimal::new(25000, 2))
            .unwrap();
        let account_number = client.save(&db).unwrap();
        client.withdraw(&db, Decimal::new(5000, 2)).unwrap();

        let mut admin = Admin::new(create_test_user(2), "root", "correct horse", 9).unwrap();
        let admin_id = admin.save(&db).unwrap();
        (account_number, admin_id)
    };

    let db = create_test_db(&temp_dir);
    let client = Client::find_by_id(&db, account_number).unwrap().unwrap();
    assert_eq!(client.balance(), Decimal::new(20000, 2));
    assert!(client.verify_pin("4321").unwrap());
    assert!(!client.verify_pin("1234").unwrap());

    let admin = Admin::find_by_id(&db, admin_id).unwrap().unwrap();
    assert_eq!(admin.user().email(), "user2@example.com");
    assert!(admin.verify_password("correct horse").unwrap());
}

#[test]
fn test_context_opens_configured_database() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = BankContext::new(temp_dir.path()).unwrap();

    let mut user = create_test_user(7);
    user.save(&ctx.db).unwrap();

    let summary = ctx.status_service().summary().unwrap();
    assert_eq!(summary.total_users, 1);
    assert!(ctx.db.path().unwrap().starts_with(temp_dir.path()));
}

// ============================================================================
// Balance flow
// ============================================================================

#[test]
fn test_deposit_withdraw_sequence() {
    let temp_dir = TempDir::new().unwrap();
    let db = create_test_db(&temp_dir);

    let mut client = Client::new(create_test_user(1), "1234").unwrap();
    let account_number = client.save(&db).unwrap();

    client.deposit(&db, Decimal::new(10000, 2)).unwrap();
    client.withdraw(&db, Decimal::new(3333, 2)).unwrap();
    client.deposit(&db, Decimal::new(1, 2)).unwrap();
    assert!(client.withdraw(&db, Decimal::new(100000, 2)).is_err());
    assert!(client.deposit(&db, Decimal::ZERO).is_err());

    assert_eq!(client.balance(), Decimal::new(6668, 2));
    assert_eq!(
        Client::stored_balance(&db, account_number).unwrap(),
        Decimal::new(6668, 2)
    );
}

#[test]
fn test_partial_update_through_client() {
    let temp_dir = TempDir::new().unwrap();
    let db = create_test_db(&temp_dir);

    let mut client = Client::new(create_test_user(1), "1234").unwrap();
    let account_number = client.save(&db).unwrap();

    client
        .user_mut()
        .update_fields(&db, UserChanges::default().email("moved@example.com"))
        .unwrap();

    let stored = Client::find_by_id(&db, account_number).unwrap().unwrap();
    assert_eq!(stored.user().email(), "moved@example.com");
    assert_eq!(stored.user().first_name(), "First1");
}

//! Database schema - embedded SQL
//!
//! The schema is compiled into the binary at build time using include_str!
//! and applied on every open. All statements use IF NOT EXISTS, so applying
//! it to an existing database is a no-op. There is no version tracking.

/// Schema DDL, embedded at compile time
pub const SCHEMA: &str = include_str!("schema.sql");

/// Tables created by [`SCHEMA`]
pub const TABLES: &[&str] = &["users", "clients", "admins"];

//! Adapter implementations
//!
//! - DuckDB query executor for the relational store

pub mod duckdb;

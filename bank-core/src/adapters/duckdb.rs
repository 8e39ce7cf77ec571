//! DuckDB query executor
//!
//! Wraps the single store connection. Each call validates one SQL statement,
//! binds explicitly typed positional parameters, executes it and maps the
//! result set to rows keyed by column name. Failures propagate; nothing is
//! retried.

use std::cell::Cell;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use duckdb::types::{ToSqlOutput, Value};
use duckdb::{Connection, ToSql};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlparser::ast::Statement;
use sqlparser::dialect::DuckDbDialect;
use sqlparser::parser::Parser;
use tracing::{debug, info};

use crate::domain::result::{Error, Result};
use crate::schema::SCHEMA;

/// Parse SQL and require exactly one statement.
/// Malformed SQL is rejected here, before it reaches the database engine.
fn parse_single_statement(sql: &str) -> Result<Statement> {
    let dialect = DuckDbDialect {};
    let mut statements = Parser::parse_sql(&dialect, sql)?;
    if statements.len() != 1 {
        return Err(Error::database(format!(
            "expected exactly one statement, found {}",
            statements.len()
        )));
    }
    Ok(statements.remove(0))
}

/// SELECT and INSERT ... RETURNING produce rows, everything else an affected count
fn returns_rows(statement: &Statement) -> bool {
    match statement {
        Statement::Query(_) => true,
        Statement::Insert(insert) => insert.returning.is_some(),
        _ => false,
    }
}

/// A positional parameter with an explicit storage type
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    /// Bound as text; the statement casts it to its DECIMAL column type
    Decimal(Decimal),
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        let value = match self {
            SqlParam::Null => Value::Null,
            SqlParam::Integer(i) => Value::BigInt(*i),
            SqlParam::Float(f) => Value::Double(*f),
            SqlParam::Text(s) => Value::Text(s.clone()),
            SqlParam::Decimal(d) => Value::Text(d.to_string()),
        };
        Ok(ToSqlOutput::Owned(value))
    }
}

impl From<i64> for SqlParam {
    fn from(value: i64) -> Self {
        SqlParam::Integer(value)
    }
}

impl From<i32> for SqlParam {
    fn from(value: i32) -> Self {
        SqlParam::Integer(i64::from(value))
    }
}

impl From<f64> for SqlParam {
    fn from(value: f64) -> Self {
        SqlParam::Float(value)
    }
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        SqlParam::Text(value.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(value: String) -> Self {
        SqlParam::Text(value)
    }
}

impl From<&String> for SqlParam {
    fn from(value: &String) -> Self {
        SqlParam::Text(value.clone())
    }
}

impl From<Decimal> for SqlParam {
    fn from(value: Decimal) -> Self {
        SqlParam::Decimal(value)
    }
}

impl<T: Into<SqlParam>> From<Option<T>> for SqlParam {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlParam::Null)
    }
}

/// Infer the storage type of an untyped (JSON) value.
///
/// Only integers, floats, strings and null are supported; anything else is
/// rejected rather than coerced.
impl TryFrom<&serde_json::Value> for SqlParam {
    type Error = Error;

    fn try_from(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Null => Ok(SqlParam::Null),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(SqlParam::Integer(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(SqlParam::Float(f))
                } else {
                    Err(Error::validation(format!("unsupported numeric parameter: {}", n)))
                }
            }
            serde_json::Value::String(s) => Ok(SqlParam::Text(s.clone())),
            serde_json::Value::Bool(_) => {
                Err(Error::validation("unsupported parameter type: boolean"))
            }
            serde_json::Value::Array(_) => {
                Err(Error::validation("unsupported parameter type: array"))
            }
            serde_json::Value::Object(_) => {
                Err(Error::validation("unsupported parameter type: object"))
            }
        }
    }
}

/// Build a typed parameter list: `params![id, name, balance]`
#[macro_export]
macro_rules! params {
    () => {
        Vec::<$crate::adapters::duckdb::SqlParam>::new()
    };
    ($($value:expr),+ $(,)?) => {
        vec![$($crate::adapters::duckdb::SqlParam::from($value)),+]
    };
}

/// One result row; values are kept in select order next to the shared column names
///
/// Serializes as a plain array of values, matching the order of
/// [`QueryResult::columns`].
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<serde_json::Value>,
}

impl Serialize for Row {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.values.serialize(serializer)
    }
}

impl Row {
    /// Value of the first column with this name
    pub fn get(&self, column: &str) -> Option<&serde_json::Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx))
    }

    fn require(&self, column: &str) -> Result<&serde_json::Value> {
        self.get(column)
            .ok_or_else(|| Error::database(format!("column '{}' missing from result", column)))
    }

    pub fn get_i64(&self, column: &str) -> Result<i64> {
        self.require(column)?
            .as_i64()
            .ok_or_else(|| Error::database(format!("column '{}' is not an integer", column)))
    }

    pub fn get_str(&self, column: &str) -> Result<String> {
        match self.require(column)? {
            serde_json::Value::String(s) => Ok(s.clone()),
            other => Err(Error::database(format!(
                "column '{}' is not text: {}",
                column, other
            ))),
        }
    }

    pub fn get_decimal(&self, column: &str) -> Result<Decimal> {
        let invalid = |e: &dyn fmt::Display| Error::database(format!("column '{}': {}", column, e));
        match self.require(column)? {
            serde_json::Value::String(s) => s.parse::<Decimal>().map_err(|e| invalid(&e)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Decimal::from(i))
                } else {
                    let f = n
                        .as_f64()
                        .ok_or_else(|| invalid(&format!("{} is not representable", n)))?;
                    Decimal::try_from(f).map_err(|e| invalid(&e))
                }
            }
            other => Err(Error::database(format!(
                "column '{}' is not numeric: {}",
                column, other
            ))),
        }
    }

    /// Values in select order
    pub fn values(&self) -> &[serde_json::Value] {
        &self.values
    }
}

/// Query result structure
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub row_count: usize,
}

/// What a statement produced
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Rows(QueryResult),
    Affected { success: bool, affected_rows: usize },
}

/// Query executor over a single DuckDB connection
pub struct Database {
    conn: Connection,
    db_path: Option<PathBuf>,
    last_insert_id: Cell<Option<i64>>,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("db_path", &self.db_path)
            .field("last_insert_id", &self.last_insert_id.get())
            .finish()
    }
}

impl Database {
    /// Open (or create) a database file
    pub fn open(db_path: &Path) -> Result<Self> {
        // Extension autoloading stays off; nothing here needs extensions
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_with_flags(db_path, config)?;
        info!(path = %db_path.display(), "opened database");

        Ok(Self {
            conn,
            db_path: Some(db_path.to_path_buf()),
            last_insert_id: Cell::new(None),
        })
    }

    /// Open a throwaway in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;

        Ok(Self {
            conn,
            db_path: None,
            last_insert_id: Cell::new(None),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Create the fixed schema if it does not exist yet
    pub fn ensure_schema(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Id returned by the most recent [`Database::insert`]
    pub fn last_insert_id(&self) -> Option<i64> {
        self.last_insert_id.get()
    }

    /// Execute one statement, returning rows or an affected-row count
    pub fn run(&self, sql: &str, params: &[SqlParam]) -> Result<Outcome> {
        let statement = parse_single_statement(sql)?;
        if returns_rows(&statement) {
            Ok(Outcome::Rows(self.fetch(sql, params)?))
        } else {
            let affected = self.write(sql, params)?;
            Ok(Outcome::Affected {
                success: true,
                affected_rows: affected,
            })
        }
    }

    /// Execute a row-producing statement
    pub fn query(&self, sql: &str, params: &[SqlParam]) -> Result<QueryResult> {
        let statement = parse_single_statement(sql)?;
        if !returns_rows(&statement) {
            return Err(Error::database("statement does not return rows; use execute"));
        }
        self.fetch(sql, params)
    }

    /// Execute a write statement, returning the number of affected rows
    pub fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<usize> {
        let statement = parse_single_statement(sql)?;
        if returns_rows(&statement) {
            return Err(Error::database("statement returns rows; use query"));
        }
        self.write(sql, params)
    }

    /// Return the row only when exactly one row matched
    pub fn query_single(&self, sql: &str, params: &[SqlParam]) -> Result<Option<Row>> {
        let mut result = self.query(sql, params)?;
        if result.rows.len() == 1 {
            Ok(result.rows.pop())
        } else {
            debug!(matches = result.rows.len(), "lookup did not match exactly one row");
            Ok(None)
        }
    }

    /// Run an `INSERT ... RETURNING <id>` and record the returned id
    pub fn insert(&self, sql: &str, params: &[SqlParam]) -> Result<i64> {
        let statement = parse_single_statement(sql)?;
        if !matches!(&statement, Statement::Insert(insert) if insert.returning.is_some()) {
            return Err(Error::database("insert requires an INSERT ... RETURNING statement"));
        }

        let result = self.fetch(sql, params)?;
        let column = result
            .columns
            .first()
            .ok_or_else(|| Error::database("insert returned no columns"))?;
        let id = result
            .rows
            .first()
            .ok_or_else(|| Error::database("insert returned no rows"))?
            .get_i64(column)?;

        self.last_insert_id.set(Some(id));
        Ok(id)
    }

    fn bind<'p>(params: &'p [SqlParam]) -> Vec<&'p dyn ToSql> {
        params.iter().map(|p| p as &dyn ToSql).collect()
    }

    fn fetch(&self, sql: &str, params: &[SqlParam]) -> Result<QueryResult> {
        debug!(sql, params = params.len(), "executing query");

        let mut stmt = self.conn.prepare(sql)?;
        let param_refs = Self::bind(params);
        let mut result_rows = stmt.query(param_refs.as_slice())?;

        let mut raw_rows: Vec<Vec<serde_json::Value>> = Vec::new();
        let mut column_count = 0;

        while let Some(row) = result_rows.next()? {
            if raw_rows.is_empty() {
                column_count = row.as_ref().column_count();
            }
            let values = (0..column_count).map(|i| get_column_value(row, i)).collect();
            raw_rows.push(values);
        }

        drop(result_rows);

        if column_count == 0 {
            column_count = stmt.column_count();
        }
        let columns: Vec<String> = (0..column_count)
            .map(|i| {
                stmt.column_name(i)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|_| format!("col{}", i))
            })
            .collect();

        let shared: Arc<[String]> = columns.iter().cloned().collect();
        let rows: Vec<Row> = raw_rows
            .into_iter()
            .map(|values| Row {
                columns: Arc::clone(&shared),
                values,
            })
            .collect();
        let row_count = rows.len();

        Ok(QueryResult {
            columns,
            rows,
            row_count,
        })
    }

    fn write(&self, sql: &str, params: &[SqlParam]) -> Result<usize> {
        debug!(sql, params = params.len(), "executing statement");

        let mut stmt = self.conn.prepare(sql)?;
        let param_refs = Self::bind(params);
        Ok(stmt.execute(param_refs.as_slice())?)
    }
}

fn get_column_value(row: &duckdb::Row, idx: usize) -> serde_json::Value {
    use duckdb::types::ValueRef;

    match row.get_ref(idx) {
        Ok(ValueRef::Null) => serde_json::Value::Null,
        Ok(ValueRef::Boolean(b)) => serde_json::Value::Bool(b),
        Ok(ValueRef::TinyInt(i)) => serde_json::json!(i),
        Ok(ValueRef::SmallInt(i)) => serde_json::json!(i),
        Ok(ValueRef::Int(i)) => serde_json::json!(i),
        Ok(ValueRef::BigInt(i)) => serde_json::json!(i),
        Ok(ValueRef::HugeInt(i)) => match i64::try_from(i) {
            Ok(small) => serde_json::json!(small),
            Err(_) => serde_json::Value::String(i.to_string()),
        },
        Ok(ValueRef::UTinyInt(i)) => serde_json::json!(i),
        Ok(ValueRef::USmallInt(i)) => serde_json::json!(i),
        Ok(ValueRef::UInt(i)) => serde_json::json!(i),
        Ok(ValueRef::UBigInt(i)) => serde_json::json!(i),
        Ok(ValueRef::Float(f)) => serde_json::json!(f),
        Ok(ValueRef::Double(f)) => serde_json::json!(f),
        // Kept as text so money amounts never pass through f64
        Ok(ValueRef::Decimal(d)) => serde_json::Value::String(d.to_string()),
        Ok(ValueRef::Text(bytes)) => {
            serde_json::Value::String(String::from_utf8_lossy(bytes).to_string())
        }
        Ok(ValueRef::Blob(bytes)) => {
            serde_json::Value::String(format!("<blob {} bytes>", bytes.len()))
        }
        _ => serde_json::Value::Null,
    }
}

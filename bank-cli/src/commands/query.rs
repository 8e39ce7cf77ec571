//! Query command - run one parameterized SQL statement against the store

use std::path::Path;

use anyhow::{bail, Context, Result};
use bank_core::{Outcome, QueryResult, SqlParam};

use super::get_context;
use crate::output;

pub fn run(sql: Option<&str>, file: Option<&Path>, params: &[String], format: &str) -> Result<()> {
    let sql_content = match (sql, file) {
        (Some(sql), _) => sql.to_string(),
        (None, Some(file_path)) => std::fs::read_to_string(file_path)
            .with_context(|| format!("Failed to read SQL file: {:?}", file_path))?,
        (None, None) => bail!("No SQL provided. Use a positional argument or --file."),
    };

    let bound = params
        .iter()
        .map(|raw| parse_param(raw))
        .collect::<Result<Vec<_>>>()?;

    let ctx = get_context()?;
    let outcome = ctx.db.run(&sql_content, &bound)?;

    match (format, outcome) {
        ("json", outcome) => output::json(&outcome)?,
        ("csv", Outcome::Rows(result)) => print_csv(&result),
        (_, Outcome::Rows(result)) => print_table(&result),
        (_, Outcome::Affected { affected_rows, .. }) => {
            output::success(&format!("{} row(s) affected", affected_rows));
        }
    }

    Ok(())
}

/// A parameter is a JSON literal (`42`, `"text"`, `null`); anything that does
/// not parse as JSON is bound as text
fn parse_param(raw: &str) -> Result<SqlParam> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value) => SqlParam::try_from(&value)
            .with_context(|| format!("Invalid parameter: {}", raw)),
        Err(_) => Ok(SqlParam::Text(raw.to_string())),
    }
}

fn print_table(result: &QueryResult) {
    let mut table = output::create_table();
    table.set_header(&result.columns);

    for row in &result.rows {
        let values: Vec<String> = row.values().iter().map(output::value_to_string).collect();
        table.add_row(values);
    }

    println!("{}", table);
    println!();
    println!("{} row(s) returned", result.row_count);
}

fn print_csv(result: &QueryResult) {
    for line in csv_lines(result) {
        println!("{}", line);
    }
}

/// Header line, then one line per row in column order
fn csv_lines(result: &QueryResult) -> Vec<String> {
    let mut lines = vec![result.columns.join(",")];
    for row in &result.rows {
        let values: Vec<String> = row.values().iter().map(value_to_csv).collect();
        lines.push(values.join(","));
    }
    lines
}

fn value_to_csv(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => {
            if s.contains(',') || s.contains('"') || s.contains('\n') {
                format!("\"{}\"", s.replace('"', "\"\""))
            } else {
                s.clone()
            }
        }
        other => output::value_to_string(other),
    }
}

//! DuckDB executor for compiled job searches

use duckdb::types::{TimeUnit, ValueRef};
use duckdb::Connection;
use jobql_sql::CompiledStatement;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

mod pool;
pub use pool::{DuckPool, PoolConfig, PooledConnection};

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),

    #[error("Connection pool is closed")]
    PoolClosed,

    #[error("Invalid pool configuration: {0}")]
    PoolConfig(String),

    #[error("Query worker failed: {0}")]
    Worker(String),
}

/// Rows as column-name → value objects, in the order the database returned them
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
    pub row_count: usize,
}

impl DuckPool {
    /// Run one compiled statement on a pooled connection.
    ///
    /// The query runs on the blocking thread pool; the connection is released
    /// when that closure returns or unwinds.
    pub async fn execute(&self, statement: &CompiledStatement) -> Result<QueryResult, ExecutionError> {
        let conn = self.acquire().await?;
        let sql = statement.sql.clone();
        let params = statement.params.clone();

        tokio::task::spawn_blocking(move || run_query(&conn, &sql, &params))
            .await
            .map_err(|e| ExecutionError::Worker(e.to_string()))?
    }
}

/// Prepare `sql`, bind `params` positionally to `$1..$N` and collect all rows.
pub fn run_query(conn: &Connection, sql: &str, params: &[String]) -> Result<QueryResult, ExecutionError> {
    debug!(sql, param_count = params.len(), "Executing statement");

    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(duckdb::params_from_iter(params.iter()))?;

    let mut columns: Vec<String> = Vec::new();
    let mut result_rows = Vec::new();

    while let Some(row) = rows.next()? {
        // Column names are only available once the statement has run
        if columns.is_empty() {
            let executed = row.as_ref();
            for i in 0..executed.column_count() {
                columns.push(executed.column_name(i)?.to_string());
            }
        }

        let mut row_obj = Map::new();
        for (i, col_name) in columns.iter().enumerate() {
            row_obj.insert(col_name.clone(), value_to_json(row.get_ref(i)?));
        }
        result_rows.push(row_obj);
    }

    let row_count = result_rows.len();
    debug!(row_count, "Statement finished");

    Ok(QueryResult {
        columns,
        rows: result_rows,
        row_count,
    })
}

fn value_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(b) => Value::Bool(b),
        ValueRef::TinyInt(i) => Value::from(i),
        ValueRef::SmallInt(i) => Value::from(i),
        ValueRef::Int(i) => Value::from(i),
        ValueRef::BigInt(i) => Value::from(i),
        ValueRef::HugeInt(i) => i64::try_from(i)
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(i.to_string())),
        ValueRef::UTinyInt(i) => Value::from(i),
        ValueRef::USmallInt(i) => Value::from(i),
        ValueRef::UInt(i) => Value::from(i),
        ValueRef::UBigInt(i) => Value::from(i),
        ValueRef::Float(f) => Value::from(f),
        ValueRef::Double(f) => Value::from(f),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Timestamp(unit, v) => timestamp_to_json(unit, v),
        ValueRef::Blob(b) => Value::String(format!("<blob {} bytes>", b.len())),
        _ => Value::String("<unsupported>".to_string()),
    }
}

/// RFC 3339 in UTC
fn timestamp_to_json(unit: TimeUnit, value: i64) -> Value {
    let micros = match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    };

    chrono::DateTime::from_timestamp_micros(micros)
        .map(|ts| Value::String(ts.to_rfc3339()))
        .unwrap_or(Value::Null)
}

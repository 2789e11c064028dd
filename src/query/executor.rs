//! Bounded statement execution.
//!
//! Every execution-time fault is turned into a failed [`TabularResult`]
//! here; callers never see an `Err` from [`QueryEngine::execute`].

use super::classifier::{classify, leading_keyword, statement_count};
use crate::db::{DatabaseHandle, Row, StatementCategory, TabularResult, Value};
use crate::error::{CoachError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{Sqlite, SqliteColumn, SqlitePool, SqliteRow};
use sqlx::{
    Column as _, Connection as _, Executor as _, Row as _, Statement as _, TypeInfo as _,
    ValueRef as _,
};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default per-statement time bound.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default row cap for read statements.
pub const DEFAULT_MAX_ROWS: usize = 1000;

/// VM instructions between deadline checks.
const PROGRESS_INTERVAL_OPS: i32 = 1000;

/// Extra time the outer watchdog allows the store to honor the deadline.
const CANCEL_GRACE: Duration = Duration::from_millis(500);

/// Bounds applied to one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteOptions {
    pub timeout_secs: u64,
    /// Row cap for reads; 0 disables the cap.
    pub max_rows: usize,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_rows: DEFAULT_MAX_ROWS,
        }
    }
}

impl ExecuteOptions {
    pub fn new(timeout_secs: u64, max_rows: usize) -> Self {
        Self {
            timeout_secs,
            max_rows,
        }
    }

    /// The time bound as a duration. A zero bound is treated as one second.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Outcome of a no-execute syntax check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxCheck {
    pub valid: bool,
    pub message: String,
}

impl SyntaxCheck {
    fn valid() -> Self {
        Self {
            valid: true,
            message: "SQL syntax is valid".to_string(),
        }
    }

    fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
        }
    }
}

/// Runs single statements against a store handle.
#[derive(Debug, Clone, Default)]
pub struct QueryEngine {
    options: ExecuteOptions,
}

impl QueryEngine {
    /// Creates an engine whose `execute` uses the given bounds.
    pub fn new(options: ExecuteOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExecuteOptions {
        &self.options
    }

    /// Executes one statement with the engine's default bounds.
    pub async fn execute(&self, sql: &str, handle: &DatabaseHandle) -> TabularResult {
        self.execute_with(sql, handle, &self.options).await
    }

    /// Executes one statement with explicit bounds.
    ///
    /// Blank input fails with "Empty query" and text holding more than one
    /// statement is refused, both without touching the store.
    /// A statement that outlives the bound is interrupted; if the store does
    /// not stop in time the handle's pool is replaced so the next call gets
    /// a usable store.
    pub async fn execute_with(
        &self,
        sql: &str,
        handle: &DatabaseHandle,
        options: &ExecuteOptions,
    ) -> TabularResult {
        let category = match classify(sql) {
            Ok(category) => category,
            Err(e) => return TabularResult::failure(StatementCategory::Unknown, e.to_string(), 0),
        };
        let count = statement_count(sql);
        if count > 1 {
            let err = CoachError::MultipleStatements(count);
            return TabularResult::failure(category, err.to_string(), 0);
        }

        let mut lane = match handle.lane().await {
            Ok(lane) => lane,
            Err(e) => return TabularResult::failure(category, e.to_string(), 0),
        };
        let pool = match lane.pool() {
            Ok(pool) => pool,
            Err(e) => return TabularResult::failure(category, e.to_string(), 0),
        };

        debug!("Executing {} statement on {}: {}", category, handle.kind(), sql);

        let start = Instant::now();
        let deadline = start + options.timeout();
        let work = run_statement(&pool, sql, category, options, deadline);
        let outcome = tokio::time::timeout(options.timeout() + CANCEL_GRACE, work).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(result)) => result.with_execution_time_ms(elapsed_ms),
            Ok(Err(e)) => {
                if matches!(e, CoachError::Timeout { .. }) {
                    warn!("{} statement interrupted after {}s", handle.kind(), options.timeout_secs);
                } else if e.is_execution_fault() {
                    debug!("Statement failed: {}", e);
                } else {
                    warn!("Statement failed unexpectedly: {}", e);
                }
                TabularResult::failure(category, e.to_string(), elapsed_ms)
            }
            Err(_) => {
                warn!(
                    "{} statement did not stop after {}s, replacing the connection",
                    handle.kind(),
                    options.timeout_secs
                );
                drop(pool);
                lane.recover().await;
                let err = CoachError::Timeout {
                    seconds: options.timeout_secs,
                };
                TabularResult::failure(category, err.to_string(), elapsed_ms)
            }
        }
    }

    /// Prepares a statement without executing it.
    ///
    /// Never mutates the store and is not an attempt.
    pub async fn validate_syntax(&self, sql: &str, handle: &DatabaseHandle) -> SyntaxCheck {
        if sql.trim().is_empty() {
            return SyntaxCheck::invalid(CoachError::EmptyInput.to_string());
        }
        let count = statement_count(sql);
        if count > 1 {
            return SyntaxCheck::invalid(CoachError::MultipleStatements(count).to_string());
        }

        let lane = match handle.lane().await {
            Ok(lane) => lane,
            Err(e) => return SyntaxCheck::invalid(e.to_string()),
        };
        let pool = match lane.pool() {
            Ok(pool) => pool,
            Err(e) => return SyntaxCheck::invalid(e.to_string()),
        };

        let prepared = async {
            let mut conn = pool.acquire().await.map_err(store_error)?;
            (&mut *conn).prepare(sql).await.map_err(store_error)?;
            Ok::<_, CoachError>(())
        }
        .await;

        match prepared {
            Ok(()) => SyntaxCheck::valid(),
            Err(CoachError::Query(text)) => SyntaxCheck::invalid(format!("SQL syntax error: {text}")),
            Err(e) => SyntaxCheck::invalid(e.to_string()),
        }
    }
}

/// Runs the statement on one connection with the deadline armed.
async fn run_statement(
    pool: &SqlitePool,
    sql: &str,
    category: StatementCategory,
    options: &ExecuteOptions,
    deadline: Instant,
) -> Result<TabularResult> {
    let ExecuteOptions {
        timeout_secs,
        max_rows,
    } = *options;
    let mut conn = pool.acquire().await.map_err(store_error)?;
    arm_deadline(&mut conn, deadline).await?;

    let result = if category.returns_rows() {
        fetch_rows(&mut conn, sql, max_rows).await
    } else {
        run_command(&mut conn, sql, category).await
    };

    disarm_deadline(&mut conn).await;

    result.map_err(|e| match e {
        CoachError::Query(ref text) if text.contains("interrupted") && Instant::now() >= deadline => {
            CoachError::Timeout {
                seconds: timeout_secs,
            }
        }
        other => other,
    })
}

/// Installs a progress handler that interrupts the store once the deadline passes.
async fn arm_deadline(conn: &mut PoolConnection<Sqlite>, deadline: Instant) -> Result<()> {
    let mut locked = conn.lock_handle().await.map_err(store_error)?;
    locked.set_progress_handler(PROGRESS_INTERVAL_OPS, move || Instant::now() < deadline);
    Ok(())
}

async fn disarm_deadline(conn: &mut PoolConnection<Sqlite>) {
    match conn.lock_handle().await {
        Ok(mut locked) => locked.remove_progress_handler(),
        Err(e) => warn!("Failed to clear statement deadline: {}", e),
    }
}

/// Fetches up to `max_rows` rows, keeping the store's column order.
///
/// Column names come from the rows themselves; the cached prepared statement
/// is only consulted when there are no rows to describe.
async fn fetch_rows(
    conn: &mut PoolConnection<Sqlite>,
    sql: &str,
    max_rows: usize,
) -> Result<TabularResult> {
    let mut rows: Vec<Row> = Vec::new();
    let mut described: Option<(Vec<String>, Vec<String>)> = None;
    let mut truncated = false;
    {
        let mut stream = sqlx::query(sql).persistent(false).fetch(&mut **conn);
        while let Some(row) = stream.try_next().await.map_err(store_error)? {
            if max_rows > 0 && rows.len() >= max_rows {
                truncated = true;
                break;
            }
            let (_, declared) = described.get_or_insert_with(|| describe(row.columns()));
            rows.push(decode_row(&row, declared)?);
        }
    }

    let (column_names, _) = match described {
        Some(described) => described,
        None => {
            let statement = (&mut **conn).prepare(sql).await.map_err(store_error)?;
            describe(statement.columns())
        }
    };

    let mut result = TabularResult::with_rows(column_names, rows);
    if truncated {
        result.truncated = true;
        result
            .message
            .push_str(&format!(" Result truncated to {max_rows} rows."));
    }
    Ok(result)
}

/// Column names and upper-cased declared types.
fn describe(columns: &[SqliteColumn]) -> (Vec<String>, Vec<String>) {
    columns
        .iter()
        .map(|c| (c.name().to_string(), c.type_info().name().to_uppercase()))
        .unzip()
}

/// Executes a statement that does not return rows.
async fn run_command(
    conn: &mut PoolConnection<Sqlite>,
    sql: &str,
    category: StatementCategory,
) -> Result<TabularResult> {
    let done = sqlx::query(sql)
        .persistent(false)
        .execute(&mut **conn)
        .await
        .map_err(store_error)?;

    let keyword = leading_keyword(sql).unwrap_or_default();
    let result = match category {
        StatementCategory::Mutate => {
            let affected = done.rows_affected() as usize;
            TabularResult::affected(
                category,
                format!("{keyword} executed successfully. {affected} row(s) affected."),
                affected,
            )
        }
        StatementCategory::SchemaDefine => {
            // Cached statements may describe the old shape of a table.
            if let Err(e) = (&mut **conn).clear_cached_statements().await {
                warn!("Failed to clear cached statements: {}", e);
            }
            TabularResult::affected(
                category,
                format!("{keyword} statement executed successfully."),
                0,
            )
        }
        _ => TabularResult::affected(category, "Statement executed successfully.", 0),
    };
    Ok(result)
}

fn decode_row(row: &SqliteRow, declared: &[String]) -> Result<Row> {
    (0..row.len())
        .map(|idx| decode_value(row, idx, declared.get(idx).map(String::as_str).unwrap_or("")))
        .collect()
}

/// Decodes one cell from its runtime storage class, using the declared
/// column type to recover booleans and dates.
fn decode_value(row: &SqliteRow, idx: usize, declared: &str) -> Result<Value> {
    let storage = {
        let raw = row.try_get_raw(idx).map_err(store_error)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        raw.type_info().name().to_string()
    };

    let value = match storage.as_str() {
        "INTEGER" => {
            let v: i64 = row.try_get_unchecked(idx).map_err(store_error)?;
            if declared == "BOOLEAN" {
                Value::Bool(v != 0)
            } else {
                Value::Int(v)
            }
        }
        "REAL" => Value::Float(row.try_get_unchecked(idx).map_err(store_error)?),
        "BLOB" => Value::Bytes(row.try_get_unchecked(idx).map_err(store_error)?),
        _ => {
            let text: String = row.try_get_unchecked(idx).map_err(store_error)?;
            text_with_hint(text, declared)
        }
    };
    Ok(value)
}

fn text_with_hint(text: String, declared: &str) -> Value {
    match declared {
        "DATE" => NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
            .map(Value::Date)
            .unwrap_or(Value::Text(text)),
        "DATETIME" => parse_datetime(text.trim())
            .map(Value::DateTime)
            .unwrap_or(Value::Text(text)),
        _ => Value::Text(text),
    }
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

/// Converts a driver error into a statement fault carrying the store's text.
fn store_error(e: sqlx::Error) -> CoachError {
    match e {
        sqlx::Error::Database(db) => CoachError::Query(db.message().to_string()),
        other => CoachError::Query(other.to_string()),
    }
}

//! Result model types for sqlcoach.
//!
//! Defines the structures used to represent one statement's outcome.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse classification of a SQL statement by its leading keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StatementCategory {
    /// SELECT, WITH, VALUES, EXPLAIN, ...
    Read,
    /// INSERT, UPDATE, DELETE, REPLACE, MERGE, UPSERT
    Mutate,
    /// CREATE, DROP, ALTER, TRUNCATE, RENAME, COMMENT
    SchemaDefine,
    /// BEGIN, START, COMMIT, ROLLBACK, SAVEPOINT, RELEASE, END
    TransactionControl,
    /// GRANT, REVOKE
    AccessControl,
    /// A keyword we do not recognize (PRAGMA, VACUUM, ...).
    Other,
    /// No leading keyword could be found.
    #[default]
    Unknown,
}

impl StatementCategory {
    /// Maps an upper-cased leading keyword to its category.
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword {
            "SELECT" | "WITH" | "VALUES" | "EXPLAIN" | "TABLE" | "SHOW" | "DESCRIBE" => Self::Read,
            "INSERT" | "UPDATE" | "DELETE" | "REPLACE" | "MERGE" | "UPSERT" => Self::Mutate,
            "CREATE" | "DROP" | "ALTER" | "TRUNCATE" | "RENAME" | "COMMENT" => {
                Self::SchemaDefine
            }
            "BEGIN" | "START" | "COMMIT" | "ROLLBACK" | "SAVEPOINT" | "RELEASE" | "END" => {
                Self::TransactionControl
            }
            "GRANT" | "REVOKE" => Self::AccessControl,
            _ => Self::Other,
        }
    }

    /// Returns true if statements of this category produce rows to fetch.
    pub fn returns_rows(&self) -> bool {
        matches!(self, Self::Read)
    }
}

impl fmt::Display for StatementCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "Read"),
            Self::Mutate => write!(f, "Mutate"),
            Self::SchemaDefine => write!(f, "Schema"),
            Self::TransactionControl => write!(f, "Transaction"),
            Self::AccessControl => write!(f, "Access Control"),
            Self::Other => write!(f, "Other"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Outcome of executing one statement.
///
/// A failed execution carries no rows; `message` explains the failure.
/// For `Read` statements `row_count == rows.len()` and every row holds one
/// value per entry of `column_names`. For other categories `row_count` is
/// the affected-row count reported by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabularResult {
    pub success: bool,

    /// Human-readable status or error text.
    pub message: String,

    pub category: StatementCategory,

    /// Column names in the order the store reported them. Empty for
    /// statements that do not return rows.
    #[serde(default)]
    pub column_names: Vec<String>,

    /// Rows of data, positionally aligned with `column_names`.
    #[serde(default)]
    pub rows: Vec<Row>,

    pub row_count: usize,

    /// Whether the row cap cut the result short.
    #[serde(default)]
    pub truncated: bool,

    pub execution_time_ms: u64,
}

impl TabularResult {
    /// Creates a failed result with the given message.
    pub fn failure(
        category: StatementCategory,
        message: impl Into<String>,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            success: false,
            message: message.into(),
            category,
            execution_time_ms,
            ..Default::default()
        }
    }

    /// Creates a successful read result from the given columns and rows.
    pub fn with_rows(column_names: Vec<String>, rows: Vec<Row>) -> Self {
        let row_count = rows.len();
        Self {
            success: true,
            message: format!("Query executed successfully. Retrieved {row_count} row(s)."),
            category: StatementCategory::Read,
            column_names,
            rows,
            row_count,
            truncated: false,
            execution_time_ms: 0,
        }
    }

    /// Creates a successful result for a statement that returns no rows.
    pub fn affected(category: StatementCategory, message: impl Into<String>, affected: usize) -> Self {
        Self {
            success: true,
            message: message.into(),
            category,
            row_count: affected,
            ..Default::default()
        }
    }

    /// Sets the execution time.
    pub fn with_execution_time_ms(mut self, ms: u64) -> Self {
        self.execution_time_ms = ms;
        self
    }

    /// Number of result columns.
    pub fn column_count(&self) -> usize {
        self.column_names.len()
    }

    /// Returns true if the result set has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Looks up a cell by row index and column name (case-insensitive).
    ///
    /// With duplicate column names the first match wins.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self
            .column_names
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))?;
        self.rows.get(row)?.get(idx)
    }
}

/// A row of data from a query result.
pub type Row = Vec<Value>;

/// A single cell value from a store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed integer (up to i64).
    Int(i64),

    /// Floating point number.
    Float(f64),

    /// Text/string value.
    Text(String),

    /// Calendar date.
    Date(NaiveDate),

    /// Date and time without zone.
    DateTime(NaiveDateTime),

    /// Binary data.
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Renders the value for display.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => s.clone(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            Value::Bytes(b) => format!("<{} bytes>", b.len()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

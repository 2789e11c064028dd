//! Result equivalence.
//!
//! Two results are the same answer when they agree on row count, column
//! count, and column names (by position, ignoring case), and their rows match
//! position by position after each side is sorted on its first column.
//! Ties on the first column keep their fetched order, so equal multisets that
//! tie there can still compare unequal.

use crate::db::{TabularResult, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// First difference found between an expected and an actual result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mismatch {
    RowCount {
        expected: usize,
        actual: usize,
    },
    ColumnCount {
        expected: usize,
        actual: usize,
    },
    ColumnName {
        position: usize,
        expected: String,
        actual: String,
    },
    Value {
        /// Row index after sorting.
        row: usize,
        column: String,
        expected: Option<String>,
        actual: Option<String>,
    },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RowCount { expected, actual } => {
                write!(f, "Row count mismatch: expected {expected} rows, got {actual}.")
            }
            Self::ColumnCount { expected, actual } => write!(
                f,
                "Column count mismatch: expected {expected} columns, got {actual}."
            ),
            Self::ColumnName {
                position,
                expected,
                actual,
            } => write!(
                f,
                "Column name mismatch at position {}: expected '{}', got '{}'.",
                position + 1,
                expected,
                actual
            ),
            Self::Value {
                row,
                column,
                expected,
                actual,
            } => write!(
                f,
                "Value mismatch in column '{}' (row {} after sorting): expected {}, got {}.",
                column,
                row + 1,
                expected.as_deref().unwrap_or("NULL"),
                actual.as_deref().unwrap_or("NULL")
            ),
        }
    }
}

/// Verdict of [`compare_results`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    Equivalent,
    Mismatch(Mismatch),
}

impl Comparison {
    pub fn is_equivalent(&self) -> bool {
        matches!(self, Self::Equivalent)
    }

    pub fn mismatch(&self) -> Option<&Mismatch> {
        match self {
            Self::Equivalent => None,
            Self::Mismatch(m) => Some(m),
        }
    }
}

/// Compares an actual result against the expected one.
pub fn compare_results(expected: &TabularResult, actual: &TabularResult) -> Comparison {
    if expected.row_count != actual.row_count {
        return Comparison::Mismatch(Mismatch::RowCount {
            expected: expected.row_count,
            actual: actual.row_count,
        });
    }

    if expected.column_count() != actual.column_count() {
        return Comparison::Mismatch(Mismatch::ColumnCount {
            expected: expected.column_count(),
            actual: actual.column_count(),
        });
    }

    let renamed = expected
        .column_names
        .iter()
        .zip(&actual.column_names)
        .position(|(e, a)| !e.eq_ignore_ascii_case(a));
    if let Some(position) = renamed {
        return Comparison::Mismatch(Mismatch::ColumnName {
            position,
            expected: expected.column_names[position].clone(),
            actual: actual.column_names[position].clone(),
        });
    }

    let expected_rows = sorted_rows(&expected.rows);
    let actual_rows = sorted_rows(&actual.rows);

    for (row, (e_row, a_row)) in expected_rows.iter().zip(&actual_rows).enumerate() {
        for (col, (e, a)) in e_row.iter().zip(a_row).enumerate() {
            if e != a {
                return Comparison::Mismatch(Mismatch::Value {
                    row,
                    column: expected.column_names.get(col).cloned().unwrap_or_default(),
                    expected: e.clone(),
                    actual: a.clone(),
                });
            }
        }
    }

    Comparison::Equivalent
}

/// Canonical comparison form of a cell. `None` is NULL.
///
/// Whole floats render like integers so `10` and `10.0` agree; text is
/// trimmed.
pub fn normalize(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(b.to_string()),
        Value::Int(i) => Some(i.to_string()),
        Value::Float(f) => Some(normalize_float(*f)),
        Value::Text(s) => Some(s.trim().to_string()),
        Value::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        Value::DateTime(dt) => Some(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        Value::Bytes(bytes) => Some(bytes.iter().map(|b| format!("{b:02x}")).collect()),
    }
}

fn normalize_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        (f as i64).to_string()
    } else {
        f.to_string()
    }
}

/// Normalizes every row and stable-sorts on the first column, NULL first.
fn sorted_rows(rows: &[Vec<Value>]) -> Vec<Vec<Option<String>>> {
    let mut normalized: Vec<Vec<Option<String>>> = rows
        .iter()
        .map(|row| row.iter().map(normalize).collect())
        .collect();
    normalized.sort_by(|a, b| first_key(a).cmp(&first_key(b)));
    normalized
}

fn first_key(row: &[Option<String>]) -> Option<&str> {
    row.first().and_then(|v| v.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn result(columns: &[&str], rows: Vec<Vec<Value>>) -> TabularResult {
        TabularResult::with_rows(columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    #[test]
    fn test_identical_results_are_equivalent() {
        let a = result(&["id", "name"], vec![vec![1.into(), "a".into()], vec![2.into(), "b".into()]]);
        assert!(compare_results(&a, &a.clone()).is_equivalent());
    }

    #[test]
    fn test_row_order_is_ignored() {
        let expected = result(
            &["id", "name"],
            vec![vec![1.into(), "a".into()], vec![2.into(), "b".into()], vec![Value::Null, "z".into()]],
        );
        let actual = result(
            &["id", "name"],
            vec![vec![2.into(), "b".into()], vec![Value::Null, "z".into()], vec![1.into(), "a".into()]],
        );
        assert_eq!(compare_results(&expected, &actual), Comparison::Equivalent);
    }

    #[test]
    fn test_whitespace_and_numeric_form_are_ignored() {
        let expected = result(&["name", "salary"], vec![vec!["Alice".into(), Value::Int(10)]]);
        let actual = result(&["NAME", "Salary"], vec![vec!["  Alice ".into(), Value::Float(10.0)]]);
        assert!(compare_results(&expected, &actual).is_equivalent());
    }

    #[test]
    fn test_row_count_checked_first() {
        let expected = result(&["id"], vec![vec![1.into()], vec![2.into()]]);
        let actual = result(&["id", "extra"], vec![vec![1.into(), 2.into()]]);
        let cmp = compare_results(&expected, &actual);
        assert_eq!(
            cmp.mismatch().map(ToString::to_string).as_deref(),
            Some("Row count mismatch: expected 2 rows, got 1.")
        );
    }

    #[test]
    fn test_column_count_mismatch() {
        let expected = result(&["id"], vec![vec![1.into()]]);
        let actual = result(&["id", "name"], vec![vec![1.into(), "a".into()]]);
        assert_eq!(
            compare_results(&expected, &actual),
            Comparison::Mismatch(Mismatch::ColumnCount {
                expected: 1,
                actual: 2
            })
        );
    }

    #[test]
    fn test_swapped_columns_mismatch_on_name() {
        let expected = result(&["id", "name"], vec![vec![1.into(), "a".into()]]);
        let actual = result(&["name", "id"], vec![vec!["a".into(), 1.into()]]);
        assert_eq!(
            compare_results(&expected, &actual),
            Comparison::Mismatch(Mismatch::ColumnName {
                position: 0,
                expected: "id".to_string(),
                actual: "name".to_string(),
            })
        );
    }

    #[test]
    fn test_null_only_matches_null() {
        let expected = result(&["id", "city"], vec![vec![1.into(), Value::Null]]);
        let actual = result(&["id", "city"], vec![vec![1.into(), "".into()]]);
        let cmp = compare_results(&expected, &actual);
        assert_eq!(
            cmp.mismatch().unwrap().to_string(),
            "Value mismatch in column 'city' (row 1 after sorting): expected NULL, got ."
        );
    }

    #[test]
    fn test_first_column_ties_keep_fetched_order() {
        let expected = result(
            &["dept", "name"],
            vec![vec![1.into(), "a".into()], vec![1.into(), "b".into()]],
        );
        let actual = result(
            &["dept", "name"],
            vec![vec![1.into(), "b".into()], vec![1.into(), "a".into()]],
        );
        assert!(!compare_results(&expected, &actual).is_equivalent());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(&Value::Null), None);
        assert_eq!(normalize(&Value::Float(10.0)).as_deref(), Some("10"));
        assert_eq!(normalize(&Value::Float(10.5)).as_deref(), Some("10.5"));
        assert_eq!(normalize(&Value::Text(" x ".into())).as_deref(), Some("x"));
        assert_eq!(normalize(&Value::Bool(false)).as_deref(), Some("false"));
        assert_eq!(normalize(&Value::Bytes(vec![0xab, 1])).as_deref(), Some("ab01"));
    }
}

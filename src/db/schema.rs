//! Schema introspection for the SQLite stores.
//!
//! Lists tables with their columns, foreign keys, indexes, and row counts so
//! a learner can browse the practice dataset.

use super::DatabaseHandle;
use crate::error::{CoachError, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;

/// Represents the complete schema of a store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Schema {
    /// All user tables, sorted by name.
    pub tables: Vec<Table>,
}

impl Schema {
    /// Finds a table by name (case-insensitive).
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Formats the schema as indented text.
    pub fn format_for_display(&self) -> String {
        let mut out = String::new();
        for table in &self.tables {
            out.push_str(&format!("{} ({} rows)\n", table.name, table.row_count));
            for column in &table.columns {
                let mut annotations = Vec::new();
                if column.primary_key {
                    annotations.push("PK".to_string());
                }
                if !column.nullable {
                    annotations.push("NOT NULL".to_string());
                }
                if let Some(fk) = table
                    .foreign_keys
                    .iter()
                    .find(|fk| fk.from_column == column.name)
                {
                    annotations.push(format!("FK -> {}.{}", fk.to_table, fk.to_column));
                }
                if annotations.is_empty() {
                    out.push_str(&format!("  - {}: {}\n", column.name, column.data_type));
                } else {
                    out.push_str(&format!(
                        "  - {}: {} ({})\n",
                        column.name,
                        column.data_type,
                        annotations.join(", ")
                    ));
                }
            }
            for index in &table.indexes {
                let unique = if index.is_unique { " UNIQUE" } else { "" };
                out.push_str(&format!(
                    "  * index {} ({}){}\n",
                    index.name,
                    index.columns.join(", "),
                    unique
                ));
            }
        }
        out
    }
}

/// A table in the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub foreign_keys: Vec<ForeignKey>,
    /// Indexes on the table, including those SQLite creates for UNIQUE and
    /// composite PRIMARY KEY constraints.
    pub indexes: Vec<Index>,
    pub row_count: i64,
}

/// A column in a table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Column {
    pub name: String,
    /// Declared type as written in the schema (may be empty).
    pub data_type: String,
    pub nullable: bool,
    pub primary_key: bool,
}

/// A foreign key from one column to another table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ForeignKey {
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

/// An index on a table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Index {
    pub name: String,
    /// Indexed columns in key order.
    pub columns: Vec<String>,
    pub is_unique: bool,
}

/// Introspects all user tables behind the handle.
pub async fn introspect(handle: &DatabaseHandle) -> Result<Schema> {
    let lane = handle.lane().await?;
    let pool = lane.pool()?;

    let names: Vec<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| CoachError::query(format!("Failed to list tables: {e}")))?;

    let mut tables = Vec::with_capacity(names.len());
    for (name,) in names {
        tables.push(fetch_table(&pool, name).await?);
    }

    Ok(Schema { tables })
}

async fn fetch_table(pool: &SqlitePool, name: String) -> Result<Table> {
    let quoted = quote_identifier(&name);

    let column_rows: Vec<(i64, String, String, i64, Option<String>, i64)> =
        sqlx::query_as(&format!("PRAGMA table_info({quoted})"))
            .fetch_all(pool)
            .await
            .map_err(|e| CoachError::query(format!("Failed to read columns of {name}: {e}")))?;

    let columns = column_rows
        .into_iter()
        .map(|(_, column, data_type, not_null, _, pk)| Column {
            name: column,
            data_type,
            nullable: not_null == 0 && pk == 0,
            primary_key: pk > 0,
        })
        .collect();

    let fk_rows: Vec<(i64, i64, String, String, Option<String>, String, String, String)> =
        sqlx::query_as(&format!("PRAGMA foreign_key_list({quoted})"))
            .fetch_all(pool)
            .await
            .map_err(|e| {
                CoachError::query(format!("Failed to read foreign keys of {name}: {e}"))
            })?;

    let foreign_keys = fk_rows
        .into_iter()
        .map(|(_, _, to_table, from_column, to_column, _, _, _)| ForeignKey {
            from_column,
            to_table,
            to_column: to_column.unwrap_or_default(),
        })
        .collect();

    let indexes = fetch_indexes(pool, &name).await?;

    let (row_count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {quoted}"))
        .fetch_one(pool)
        .await
        .map_err(|e| CoachError::query(format!("Failed to count rows of {name}: {e}")))?;

    Ok(Table {
        name,
        columns,
        foreign_keys,
        indexes,
        row_count,
    })
}

async fn fetch_indexes(pool: &SqlitePool, table: &str) -> Result<Vec<Index>> {
    let index_rows: Vec<(i64, String, i64, String, i64)> =
        sqlx::query_as(&format!("PRAGMA index_list({})", quote_identifier(table)))
            .fetch_all(pool)
            .await
            .map_err(|e| CoachError::query(format!("Failed to read indexes of {table}: {e}")))?;

    let mut indexes = Vec::with_capacity(index_rows.len());
    for (_, name, unique, _, _) in index_rows {
        let key_rows: Vec<(i64, i64, Option<String>)> =
            sqlx::query_as(&format!("PRAGMA index_info({})", quote_identifier(&name)))
                .fetch_all(pool)
                .await
                .map_err(|e| {
                    CoachError::query(format!("Failed to read columns of index {name}: {e}"))
                })?;

        // Expression keys have no column name.
        let columns = key_rows
            .into_iter()
            .map(|(_, _, column)| column.unwrap_or_else(|| "<expression>".to_string()))
            .collect();

        indexes.push(Index {
            name,
            columns,
            is_unique: unique != 0,
        });
    }
    indexes.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(indexes)
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

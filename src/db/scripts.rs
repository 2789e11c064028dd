//! Schema and seed scripts for the two stores.
//!
//! Scripts are plain statement sequences separated by `;`. They are loaded
//! from a [`ScriptSource`], split with the same tokenizer the classifier
//! uses, and applied inside a single transaction so a failing script leaves
//! nothing behind.

use crate::error::{CoachError, Result};
use crate::query::split_statements;
use sqlx::sqlite::SqlitePool;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

/// The scripts the lifecycle manager knows how to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptName {
    /// Main store schema, applied once.
    MainSchema,
    /// Practice store tables, applied on every open/reset.
    PracticeSchema,
    /// Practice store rows, applied on every open/reset.
    PracticeSeed,
}

impl ScriptName {
    /// File name used when scripts are read from a directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::MainSchema => "main_schema.sql",
            Self::PracticeSchema => "practice_schema.sql",
            Self::PracticeSeed => "practice_seed.sql",
        }
    }
}

impl fmt::Display for ScriptName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file_name())
    }
}

/// Supplies script text by name.
pub trait ScriptSource: Send + Sync {
    /// Returns the full text of the named script.
    fn load(&self, name: ScriptName) -> Result<String>;
}

/// Scripts compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledScripts;

impl ScriptSource for BundledScripts {
    fn load(&self, name: ScriptName) -> Result<String> {
        let text = match name {
            ScriptName::MainSchema => include_str!("../../sql/main_schema.sql"),
            ScriptName::PracticeSchema => include_str!("../../sql/practice_schema.sql"),
            ScriptName::PracticeSeed => include_str!("../../sql/practice_seed.sql"),
        };
        Ok(text.to_string())
    }
}

/// Scripts read from `<dir>/<file_name>` at load time.
#[derive(Debug, Clone)]
pub struct DirectoryScripts {
    dir: PathBuf,
}

impl DirectoryScripts {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ScriptSource for DirectoryScripts {
    fn load(&self, name: ScriptName) -> Result<String> {
        let path = self.dir.join(name.file_name());
        if !path.exists() {
            return Err(CoachError::initialization(format!(
                "Script not found: {}",
                path.display()
            )));
        }
        std::fs::read_to_string(&path).map_err(|e| {
            CoachError::initialization(format!("Failed to read script {}: {e}", path.display()))
        })
    }
}

/// Applies every statement of a script inside one transaction.
pub async fn apply_script(pool: &SqlitePool, name: ScriptName, script: &str) -> Result<usize> {
    let statements = split_statements(script);
    let mut tx = pool.begin().await.map_err(|e| {
        CoachError::initialization(format!("Failed to start transaction for {name}: {e}"))
    })?;

    for (i, statement) in statements.iter().enumerate() {
        debug!("Applying {} statement {}: {}", name, i + 1, statement);
        sqlx::query(statement)
            .persistent(false)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                CoachError::initialization(format!(
                    "Failed to apply {name} (statement {}): {e}",
                    i + 1
                ))
            })?;
    }

    tx.commit()
        .await
        .map_err(|e| CoachError::initialization(format!("Failed to commit {name}: {e}")))?;

    Ok(statements.len())
}

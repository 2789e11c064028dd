//! Embedded database layer for sqlcoach.
//!
//! Two SQLite stores live behind [`DatabaseHandle`]s owned by a
//! [`DatabaseManager`]: a durable Main store for application data and a
//! disposable Practice store holding the seeded sample dataset.

mod handle;
mod manager;
mod schema;
mod scripts;
mod store;
mod types;

pub use handle::DatabaseHandle;
pub(crate) use handle::Lane;
pub use manager::DatabaseManager;
pub use schema::{introspect, Column, ForeignKey, Index, Schema, Table};
pub use scripts::{
    apply_script, BundledScripts, DirectoryScripts, ScriptName, ScriptSource,
};
pub use store::MAIN_SENTINEL_TABLE;
pub use types::{Row, StatementCategory, TabularResult, Value};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which of the two stores a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    /// Durable application store.
    Main,
    /// Resettable sample dataset.
    #[default]
    Practice,
}

impl DatabaseKind {
    /// Returns the kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Practice => "practice",
        }
    }

    /// Parses a kind from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "main" => Some(Self::Main),
            "practice" => Some(Self::Practice),
            _ => None,
        }
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Main => write!(f, "Main"),
            Self::Practice => write!(f, "Practice"),
        }
    }
}

//! Configuration management for sqlcoach.
//!
//! Handles loading configuration from a TOML file and environment
//! variables: where the Main store lives, optional script and question
//! catalog overrides, and the execution bounds.

use crate::error::{CoachError, Result};
use crate::query::{ExecuteOptions, DEFAULT_MAX_ROWS, DEFAULT_TIMEOUT_SECS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_MAIN_DB: &str = "SQLCOACH_MAIN_DB";
pub const ENV_TIMEOUT_SECS: &str = "SQLCOACH_TIMEOUT_SECS";
pub const ENV_MAX_ROWS: &str = "SQLCOACH_MAX_ROWS";

/// Main configuration structure for sqlcoach.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub execution: ExecutionConfig,

    #[serde(default)]
    pub questions: QuestionsConfig,
}

/// Store locations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    /// File backing the Main store.
    #[serde(default = "default_main_path")]
    pub main_path: PathBuf,

    /// Directory whose `*.sql` files replace the bundled scripts.
    #[serde(default)]
    pub scripts_dir: Option<PathBuf>,
}

fn default_main_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sqlcoach")
        .join("main.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            main_path: default_main_path(),
            scripts_dir: None,
        }
    }
}

/// Per-statement bounds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutionConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_rows() -> usize {
    DEFAULT_MAX_ROWS
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_rows: default_max_rows(),
        }
    }
}

impl ExecutionConfig {
    pub fn options(&self) -> ExecuteOptions {
        ExecuteOptions::new(self.timeout_secs, self.max_rows)
    }
}

/// Question catalog source.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct QuestionsConfig {
    /// TOML catalog replacing the built-in questions.
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sqlcoach")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| CoachError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            CoachError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Loads the file, then applies environment overrides and validates.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::load_from_file(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `SQLCOACH_*` overrides using the given variable lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_MAIN_DB).filter(|p| !p.trim().is_empty()) {
            self.database.main_path = PathBuf::from(path);
        }
        if let Some(value) = lookup(ENV_TIMEOUT_SECS) {
            self.execution.timeout_secs = parse_env_number(ENV_TIMEOUT_SECS, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_ROWS) {
            self.execution.max_rows = parse_env_number(ENV_MAX_ROWS, &value)?;
        }
        Ok(())
    }

    /// Checks that the execution bounds are usable.
    pub fn validate(&self) -> Result<()> {
        if self.execution.timeout_secs == 0 {
            return Err(CoachError::config("execution.timeout_secs must be greater than 0"));
        }
        if self.execution.max_rows == 0 {
            return Err(CoachError::config("execution.max_rows must be greater than 0"));
        }
        Ok(())
    }
}

fn parse_env_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CoachError::config(format!("{key} must be a number, got '{value}'")))
}

//! Logging setup for sqlcoach.
//!
//! The CLI logs to stderr so stdout stays clean for results; `--log-file`
//! sends logs to a file under the platform state directory instead.
//! `RUST_LOG` replaces the default directives of either target.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File,
}

impl LogTarget {
    /// Filter directives used when `RUST_LOG` is unset.
    ///
    /// sqlx warns about every slow statement, so runaway learner queries
    /// would otherwise drown out the engine's own messages.
    pub fn default_directives(self) -> &'static str {
        match self {
            Self::Stderr => "sqlcoach=warn,sqlx=error",
            Self::File => "sqlcoach=info,sqlx=warn",
        }
    }
}

/// Installs the global subscriber for the given target.
///
/// Returns the log file path when logging to a file. If the file cannot be
/// created, logging falls back to stderr.
pub fn init(target: LogTarget) -> Option<PathBuf> {
    let filter = env_filter(target.default_directives());
    match target {
        LogTarget::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .init();
            None
        }
        LogTarget::File => {
            let log_path = get_log_path();
            match create_log_file(&log_path) {
                Ok(file) => {
                    tracing_subscriber::fmt()
                        .with_env_filter(filter)
                        .with_writer(file)
                        .with_ansi(false)
                        .init();
                    Some(log_path)
                }
                Err(e) => {
                    eprintln!(
                        "Warning: Could not create log file {}: {e}; logging to stderr",
                        log_path.display()
                    );
                    init(LogTarget::Stderr)
                }
            }
        }
    }
}

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Creates (or truncates) the log file and its parent directory.
fn create_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    File::create(path)
}

/// Returns the path for the log file.
///
/// `~/.local/state/sqlcoach/sqlcoach.log` on Linux, the platform config
/// directory elsewhere, and the temp directory as a last resort.
pub fn get_log_path() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        return state_dir.join("sqlcoach").join("sqlcoach.log");
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("sqlcoach").join("sqlcoach.log");
    }

    std::env::temp_dir().join("sqlcoach.log")
}

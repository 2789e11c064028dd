//! Command-line argument parsing for sqlcoach.

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlcoach::config::Config;
use sqlcoach::db::DatabaseKind;
use sqlcoach::grading::Difficulty;
use sqlcoach::logging::LogTarget;
use sqlcoach::query::ExecuteOptions;
use std::io::Read;
use std::path::PathBuf;

/// Practice SQL against a sandboxed dataset and get your answers graded.
#[derive(Parser, Debug)]
#[command(name = "sqlcoach")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Main database file (overrides config and SQLCOACH_MAIN_DB)
    #[arg(long, value_name = "PATH", global = true)]
    pub main_db: Option<PathBuf>,

    /// Emit JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Write logs to the state-directory log file instead of stderr
    #[arg(long, global = true)]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List practice questions
    Questions {
        /// Only show one difficulty (easy, medium, hard, pro)
        #[arg(short, long, value_parser = parse_difficulty)]
        difficulty: Option<Difficulty>,
    },

    /// Show one question
    Show {
        /// Question id, e.g. easy_1
        id: String,
    },

    /// Execute SQL; several `;`-separated statements run in order
    Run {
        /// Run against the Main store instead of the practice sandbox
        #[arg(long)]
        main: bool,

        /// Per-statement time bound in seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Row cap for reads (0 disables the cap)
        #[arg(long, value_name = "N")]
        max_rows: Option<usize>,

        /// SQL text, or "-" to read stdin
        sql: String,
    },

    /// Check SQL syntax without executing it
    Syntax {
        #[arg(long)]
        main: bool,

        /// SQL text, or "-" to read stdin
        sql: String,
    },

    /// Grade a submission for a question
    Check {
        /// Question id, e.g. easy_1
        id: String,

        /// SQL text, or "-" to read stdin
        sql: String,
    },

    /// List tables with their columns and row counts
    Tables {
        #[arg(long)]
        main: bool,
    },
}

fn parse_difficulty(s: &str) -> std::result::Result<Difficulty, String> {
    Difficulty::parse(s).ok_or_else(|| {
        format!("Invalid difficulty: {s}. Expected: easy, medium, hard, or pro")
    })
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path, using the default if not specified.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Applies flags that override the loaded configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(path) = &self.main_db {
            config.database.main_path = path.clone();
        }
    }

    /// Where logs should go.
    pub fn log_target(&self) -> LogTarget {
        if self.log_file {
            LogTarget::File
        } else {
            LogTarget::Stderr
        }
    }

    /// Bounds for `run`, starting from the configured ones.
    pub fn run_options(&self, base: ExecuteOptions) -> ExecuteOptions {
        match &self.command {
            Command::Run {
                timeout, max_rows, ..
            } => ExecuteOptions::new(
                timeout.unwrap_or(base.timeout_secs),
                max_rows.unwrap_or(base.max_rows),
            ),
            _ => base,
        }
    }
}

/// Maps the `--main` flag to a store.
pub fn target(main: bool) -> DatabaseKind {
    if main {
        DatabaseKind::Main
    } else {
        DatabaseKind::Practice
    }
}

/// Returns the SQL argument, reading stdin when it is "-".
pub fn read_sql(arg: &str) -> anyhow::Result<String> {
    if arg != "-" {
        return Ok(arg.to_string());
    }
    let mut sql = String::new();
    std::io::stdin()
        .read_to_string(&mut sql)
        .context("Failed to read SQL from stdin")?;
    Ok(sql)
}

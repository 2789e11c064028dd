//! Opening the embedded SQLite stores.
//!
//! The Main store is a file that receives its schema exactly once. The
//! Practice store is a private in-memory database kept alive by a
//! single-connection pool and seeded on every open.

use super::scripts::{apply_script, ScriptName, ScriptSource};
use super::DatabaseKind;
use crate::error::{CoachError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Table whose presence marks the Main schema as applied.
pub const MAIN_SENTINEL_TABLE: &str = "user_progress";

const MAX_RETRY_ATTEMPTS: u32 = 3;
const RETRY_DELAY_MS: u64 = 100;

/// Knows how to open a fresh pool for either store kind.
pub struct StoreFactory {
    main_path: PathBuf,
    scripts: Arc<dyn ScriptSource>,
}

impl StoreFactory {
    pub fn new(main_path: impl Into<PathBuf>, scripts: Arc<dyn ScriptSource>) -> Self {
        Self {
            main_path: main_path.into(),
            scripts,
        }
    }

    /// Path of the durable Main store.
    pub fn main_path(&self) -> &Path {
        &self.main_path
    }

    /// Opens a ready-to-use pool for the given kind.
    pub async fn open(&self, kind: DatabaseKind) -> Result<SqlitePool> {
        match kind {
            DatabaseKind::Main => self.open_main().await,
            DatabaseKind::Practice => self.open_practice().await,
        }
    }

    /// Opens the Main store, applying its schema if the sentinel table is missing.
    async fn open_main(&self) -> Result<SqlitePool> {
        ensure_parent_dirs(&self.main_path)?;
        let pool = connect_main_with_retry(&self.main_path).await?;

        if sentinel_exists(&pool).await? {
            info!("Main database schema already exists");
        } else {
            info!("Creating main database schema...");
            let script = self.scripts.load(ScriptName::MainSchema)?;
            if let Err(e) = apply_script(&pool, ScriptName::MainSchema, &script).await {
                pool.close().await;
                return Err(e);
            }
            info!("Main database schema created at {}", self.main_path.display());
        }

        Ok(pool)
    }

    /// Opens a new in-memory Practice store with schema and seed applied.
    ///
    /// The pool is only returned once both scripts succeeded.
    async fn open_practice(&self) -> Result<SqlitePool> {
        let schema = self.scripts.load(ScriptName::PracticeSchema)?;
        let seed = self.scripts.load(ScriptName::PracticeSeed)?;

        let pool = connect_practice().await?;
        let applied = async {
            let tables = apply_script(&pool, ScriptName::PracticeSchema, &schema).await?;
            let rows = apply_script(&pool, ScriptName::PracticeSeed, &seed).await?;
            Ok::<_, CoachError>((tables, rows))
        }
        .await;

        match applied {
            Ok((tables, rows)) => {
                debug!(
                    "Practice database seeded ({} schema statements, {} seed statements)",
                    tables, rows
                );
                Ok(pool)
            }
            Err(e) => {
                pool.close().await;
                Err(e)
            }
        }
    }
}

/// Attempts to open the Main store with retries for lock contention.
async fn connect_main_with_retry(path: &Path) -> Result<SqlitePool> {
    let mut last_error = None;

    for attempt in 0..MAX_RETRY_ATTEMPTS {
        if attempt > 0 {
            tokio::time::sleep(Duration::from_millis(RETRY_DELAY_MS * 2u64.pow(attempt))).await;
        }

        match connect_main(path).await {
            Ok(pool) => return Ok(pool),
            Err(e) => {
                debug!("Main database open attempt {} failed: {}", attempt + 1, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| CoachError::initialization("Failed to open main database after retries")))
}

async fn connect_main(path: &Path) -> Result<SqlitePool> {
    let conn_str = format!("sqlite:{}?mode=rwc", path.display());
    let options = SqliteConnectOptions::from_str(&conn_str)
        .map_err(|e| CoachError::initialization(format!("Invalid database path: {e}")))?
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .create_if_missing(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
        .map_err(|e| CoachError::initialization(format!("Failed to connect to main database: {e}")))
}

async fn connect_practice() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(|e| CoachError::initialization(format!("Invalid practice options: {e}")))?;

    // Every connection to :memory: is its own database, so the pool must
    // hold exactly one connection for its whole life.
    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
        .map_err(|e| {
            CoachError::initialization(format!("Failed to create practice database: {e}"))
        })
}

async fn sentinel_exists(pool: &SqlitePool) -> Result<bool> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(MAIN_SENTINEL_TABLE)
            .fetch_optional(pool)
            .await
            .map_err(|e| CoachError::initialization(format!("Failed to probe main schema: {e}")))?;
    Ok(row.is_some())
}

/// Ensures parent directories exist for the database path.
fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if parent.as_os_str().is_empty() {
            return Ok(());
        }
        std::fs::create_dir_all(parent).map_err(|e| {
            CoachError::initialization(format!(
                "Failed to create data directory {}: {e}",
                parent.display()
            ))
        })?;
    }
    Ok(())
}

//! Database lifecycle manager.
//!
//! Owns the two store handles: a durable file-backed Main store and a
//! disposable in-memory Practice store that is rebuilt from the seed scripts
//! on every open and reset.

use super::handle::DatabaseHandle;
use super::scripts::ScriptSource;
use super::store::StoreFactory;
use super::DatabaseKind;
use crate::error::{CoachError, Result};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Creates, resets, and tears down the Main and Practice handles.
pub struct DatabaseManager {
    main: DatabaseHandle,
    practice: DatabaseHandle,
    initialized: AtomicBool,
    lifecycle: Mutex<()>,
}

impl DatabaseManager {
    /// Creates a manager with both handles closed.
    pub fn new(main_path: impl Into<PathBuf>, scripts: Arc<dyn ScriptSource>) -> Self {
        let factory = Arc::new(StoreFactory::new(main_path, scripts));
        Self {
            main: DatabaseHandle::new(DatabaseKind::Main, factory.clone()),
            practice: DatabaseHandle::new(DatabaseKind::Practice, factory),
            initialized: AtomicBool::new(false),
            lifecycle: Mutex::new(()),
        }
    }

    /// Opens both stores.
    ///
    /// Creates the Main store (applying its schema once) and a freshly seeded
    /// Practice store. Calling `open()` on an open manager does nothing.
    pub async fn open(&self) -> Result<()> {
        let _lifecycle = self.lifecycle.lock().await;
        if self.is_initialized() {
            return Ok(());
        }

        info!("Initializing embedded database system...");

        let main_pool = self.main.open_fresh().await?;
        let practice_pool = match self.practice.open_fresh().await {
            Ok(pool) => pool,
            Err(e) => {
                main_pool.close().await;
                return Err(e);
            }
        };

        self.main.install(main_pool).await;
        self.practice.install(practice_pool).await;
        self.initialized.store(true, Ordering::Release);

        info!("Database system initialized successfully");
        Ok(())
    }

    /// Rebuilds the Practice store from its schema and seed scripts.
    ///
    /// Statements are rejected with `Busy` for the whole reset. The new store
    /// is only installed once fully seeded; if building it fails, one more
    /// attempt is made before surfacing `Reset`.
    pub async fn reset(&self) -> Result<()> {
        let _lifecycle = self.lifecycle.lock().await;
        if !self.is_initialized() {
            return Err(CoachError::NotInitialized(DatabaseKind::Practice));
        }

        info!("Resetting practice database...");
        let mut exclusive = self.practice.exclusive().await;

        if let Some(old) = exclusive.take() {
            old.close().await;
        }

        let pool = match exclusive.factory().open(DatabaseKind::Practice).await {
            Ok(pool) => pool,
            Err(first) => {
                warn!("Practice database rebuild failed ({first}), retrying once");
                exclusive
                    .factory()
                    .open(DatabaseKind::Practice)
                    .await
                    .map_err(reset_error)?
            }
        };

        exclusive.install(pool);
        info!("Practice database reset completed");
        Ok(())
    }

    /// Returns the Main handle.
    pub fn main_handle(&self) -> Result<DatabaseHandle> {
        self.handle(DatabaseKind::Main)
    }

    /// Returns the Practice handle.
    pub fn practice_handle(&self) -> Result<DatabaseHandle> {
        self.handle(DatabaseKind::Practice)
    }

    /// Returns the handle of the given kind.
    pub fn handle(&self, kind: DatabaseKind) -> Result<DatabaseHandle> {
        if !self.is_initialized() {
            return Err(CoachError::NotInitialized(kind));
        }
        Ok(match kind {
            DatabaseKind::Main => self.main.clone(),
            DatabaseKind::Practice => self.practice.clone(),
        })
    }

    /// Returns true once `open()` has completed and until `close()`.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Closes both handles. Safe to call more than once.
    pub async fn close(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        if !self.is_initialized() {
            return;
        }

        info!("Closing database connections...");
        self.initialized.store(false, Ordering::Release);

        self.practice.shutdown().await;
        self.main.shutdown().await;

        info!("Database shutdown completed");
    }
}

/// Rebuild failures surface as `Reset`, keeping the underlying cause text.
fn reset_error(e: CoachError) -> CoachError {
    match e {
        CoachError::Initialization(cause) => CoachError::Reset(cause),
        other => CoachError::reset(other.to_string()),
    }
}

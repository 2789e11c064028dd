//! Live store handles with per-handle exclusivity.
//!
//! A [`DatabaseHandle`] keeps a stable identity while the pool behind it is
//! replaced by resets and timeout recovery. Statements run one at a time
//! while holding the handle's lane; a reset raises the `resetting` flag
//! first, so executions arriving during a reset fail fast with `Busy`.

use super::store::StoreFactory;
use super::DatabaseKind;
use crate::error::{CoachError, Result};
use sqlx::sqlite::SqlitePool;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// One live connection to a relational store.
#[derive(Clone)]
pub struct DatabaseHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    kind: DatabaseKind,
    factory: Arc<StoreFactory>,
    lane: Mutex<Option<SqlitePool>>,
    open: AtomicBool,
    resetting: AtomicBool,
    store_calls: AtomicU64,
}

impl DatabaseHandle {
    /// Creates a closed handle.
    pub(crate) fn new(kind: DatabaseKind, factory: Arc<StoreFactory>) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                kind,
                factory,
                lane: Mutex::new(None),
                open: AtomicBool::new(false),
                resetting: AtomicBool::new(false),
                store_calls: AtomicU64::new(0),
            }),
        }
    }

    pub fn kind(&self) -> DatabaseKind {
        self.inner.kind
    }

    /// Whether a live pool is installed.
    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::Acquire)
    }

    /// Whether a reset currently owns this handle.
    pub fn is_resetting(&self) -> bool {
        self.inner.resetting.load(Ordering::Acquire)
    }

    /// Number of times the engine has touched the store through this handle.
    pub fn store_calls(&self) -> u64 {
        self.inner.store_calls.load(Ordering::Relaxed)
    }

    /// Returns true if both values refer to the same handle.
    pub fn same_handle(&self, other: &DatabaseHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Acquires the lane for one statement.
    ///
    /// Fails fast with `Busy` if a reset is pending or running.
    pub(crate) async fn lane(&self) -> Result<Lane<'_>> {
        if self.is_resetting() {
            return Err(CoachError::Busy(self.kind()));
        }
        let guard = self.inner.lane.lock().await;
        // A reset may have started while we queued behind another statement.
        if self.is_resetting() {
            return Err(CoachError::Busy(self.kind()));
        }
        Ok(Lane {
            handle: self,
            guard,
        })
    }

    /// Takes exclusive ownership of the handle for a reset.
    ///
    /// Waits for an in-flight statement to finish; new statements are
    /// rejected from the moment this is called. The flag is lowered again
    /// if the wait is abandoned.
    pub(crate) async fn exclusive(&self) -> Exclusive<'_> {
        let resetting = ResettingFlag::raise(self);
        let guard = self.inner.lane.lock().await;
        Exclusive {
            _resetting: resetting,
            lane: Lane {
                handle: self,
                guard,
            },
        }
    }

    /// Opens a fresh pool for this handle's kind without installing it.
    pub(crate) async fn open_fresh(&self) -> Result<SqlitePool> {
        self.factory().open(self.kind()).await
    }

    /// Installs a pool, replacing and closing any previous one.
    pub(crate) async fn install(&self, pool: SqlitePool) {
        let mut lane = self.inner.lane.lock().await;
        if let Some(old) = lane.replace(pool) {
            old.close().await;
        }
        self.inner.open.store(true, Ordering::Release);
    }

    /// Closes the live pool, if any.
    pub(crate) async fn shutdown(&self) {
        let mut lane = self.inner.lane.lock().await;
        if let Some(pool) = lane.take() {
            pool.close().await;
            debug!("{} database connection closed", self.kind());
        }
        self.inner.open.store(false, Ordering::Release);
    }

    fn factory(&self) -> &StoreFactory {
        &self.inner.factory
    }
}

impl fmt::Debug for DatabaseHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseHandle")
            .field("kind", &self.kind())
            .field("is_open", &self.is_open())
            .field("resetting", &self.is_resetting())
            .finish()
    }
}

/// Exclusive access to a handle's pool for the duration of one statement.
pub(crate) struct Lane<'a> {
    handle: &'a DatabaseHandle,
    guard: MutexGuard<'a, Option<SqlitePool>>,
}

impl Lane<'_> {
    /// Returns the live pool, counting one store interaction.
    pub(crate) fn pool(&self) -> Result<SqlitePool> {
        let pool = self
            .guard
            .as_ref()
            .ok_or_else(|| CoachError::query(format!("{} database is not open", self.handle.kind())))?;
        self.handle.inner.store_calls.fetch_add(1, Ordering::Relaxed);
        Ok(pool.clone())
    }

    /// Replaces a pool that may still be running an abandoned statement.
    ///
    /// The old pool is closed in the background; a fresh one is opened in
    /// its place (Practice: reseeded, Main: reconnected). If reopening fails
    /// the handle is left closed.
    pub(crate) async fn recover(&mut self) {
        let kind = self.handle.kind();
        if let Some(old) = self.guard.take() {
            tokio::spawn(async move {
                old.close().await;
            });
        }

        match self.handle.factory().open(kind).await {
            Ok(pool) => {
                *self.guard = Some(pool);
                warn!("{} database reopened after an abandoned statement", kind);
            }
            Err(e) => {
                self.handle.inner.open.store(false, Ordering::Release);
                warn!("Failed to reopen {} database: {}", kind, e);
            }
        }
    }
}

/// Lane held by a reset; clears the resetting flag when dropped.
pub(crate) struct Exclusive<'a> {
    // Declared first: the flag is lowered before the lane is released.
    _resetting: ResettingFlag<'a>,
    lane: Lane<'a>,
}

impl Exclusive<'_> {
    /// Takes the live pool out of the handle.
    pub(crate) fn take(&mut self) -> Option<SqlitePool> {
        self.lane.handle.inner.open.store(false, Ordering::Release);
        self.lane.guard.take()
    }

    /// Installs a fully prepared pool.
    pub(crate) fn install(&mut self, pool: SqlitePool) {
        *self.lane.guard = Some(pool);
        self.lane.handle.inner.open.store(true, Ordering::Release);
    }

    pub(crate) fn factory(&self) -> &StoreFactory {
        self.lane.handle.factory()
    }
}

/// Raises a handle's `resetting` flag for as long as it lives.
struct ResettingFlag<'a> {
    handle: &'a DatabaseHandle,
}

impl<'a> ResettingFlag<'a> {
    fn raise(handle: &'a DatabaseHandle) -> Self {
        handle.inner.resetting.store(true, Ordering::Release);
        Self { handle }
    }
}

impl Drop for ResettingFlag<'_> {
    fn drop(&mut self) {
        self.handle.inner.resetting.store(false, Ordering::Release);
    }
}

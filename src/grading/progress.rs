//! Progress events emitted while grading.
//!
//! The verifier only reports what happened; persistence and statistics
//! belong to whatever [`ProgressSink`] the caller plugs in.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

/// Something worth recording about a learner's attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// A submission was made for a known question.
    Attempted {
        question_id: String,
        at: DateTime<Utc>,
    },
    /// The submission was judged correct.
    Completed {
        question_id: String,
        points: u32,
        at: DateTime<Utc>,
    },
    /// The submission ran but produced a different answer.
    Incorrect {
        question_id: String,
        at: DateTime<Utc>,
    },
}

impl ProgressEvent {
    pub fn question_id(&self) -> &str {
        match self {
            Self::Attempted { question_id, .. }
            | Self::Completed { question_id, .. }
            | Self::Incorrect { question_id, .. } => question_id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Attempted { at, .. } | Self::Completed { at, .. } | Self::Incorrect { at, .. } => {
                *at
            }
        }
    }
}

/// Receives progress events from the verifier.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn record(&self, event: ProgressEvent) -> Result<()>;
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

#[async_trait]
impl ProgressSink for NoopProgress {
    async fn record(&self, _event: ProgressEvent) -> Result<()> {
        Ok(())
    }
}

/// Point-in-time copy of the statistics kept by [`InMemoryProgress`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub attempts: HashMap<String, u32>,
    pub last_attempted: HashMap<String, DateTime<Utc>>,
    pub completed: BTreeSet<String>,
    pub total_points: u32,
    pub correct_answers: u32,
    pub current_streak: u32,
    pub best_streak: u32,
}

/// Keeps attempt and completion statistics in memory.
#[derive(Debug, Default)]
pub struct InMemoryProgress {
    state: Mutex<ProgressSnapshot>,
}

impl InMemoryProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.lock().clone()
    }

    pub fn attempts(&self, question_id: &str) -> u32 {
        self.lock().attempts.get(question_id).copied().unwrap_or(0)
    }

    pub fn is_completed(&self, question_id: &str) -> bool {
        self.lock().completed.contains(question_id)
    }

    pub fn total_points(&self) -> u32 {
        self.lock().total_points
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ProgressSnapshot> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn apply(&self, event: ProgressEvent) {
        let mut state = self.lock();
        match event {
            ProgressEvent::Attempted { question_id, at } => {
                *state.attempts.entry(question_id.clone()).or_insert(0) += 1;
                state.last_attempted.insert(question_id, at);
            }
            ProgressEvent::Completed {
                question_id,
                points,
                ..
            } => {
                state.completed.insert(question_id);
                state.total_points += points;
                state.correct_answers += 1;
                state.current_streak += 1;
                state.best_streak = state.best_streak.max(state.current_streak);
            }
            ProgressEvent::Incorrect { .. } => {
                state.current_streak = 0;
            }
        }
    }
}

#[async_trait]
impl ProgressSink for InMemoryProgress {
    async fn record(&self, event: ProgressEvent) -> Result<()> {
        self.apply(event);
        Ok(())
    }
}

//! Answer verification for sqlcoach.
//!
//! Runs a learner's submission and the question's reference solution on the
//! Practice store and decides whether they produce the same answer.

pub mod compare;
pub mod progress;
pub mod questions;

pub use compare::{compare_results, normalize, Comparison, Mismatch};
pub use progress::{InMemoryProgress, NoopProgress, ProgressEvent, ProgressSink, ProgressSnapshot};
pub use questions::{Difficulty, PracticeQuestion, QuestionCatalog};

use crate::db::{DatabaseManager, TabularResult};
use crate::error::Result;
use crate::query::QueryEngine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

pub const CORRECT_MESSAGE: &str = "Excellent! Your solution is correct!";
pub const INCORRECT_MESSAGE: &str = "Not quite right. Compare your output with the expected result.";
pub const NOT_FOUND_MESSAGE: &str = "Question not found";

/// Verdict for one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub question_id: String,
    /// The SQL text as the learner submitted it.
    pub submitted_query: String,
    pub correct: bool,
    pub message: String,
    /// First detected mismatch followed by the question's own hint.
    pub hint: Option<String>,
    pub points_earned: u32,
    pub submitted: Option<TabularResult>,
    pub expected: Option<TabularResult>,
    pub execution_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl ValidationOutcome {
    fn rejected(question_id: &str, submitted_sql: &str, message: impl Into<String>) -> Self {
        Self {
            question_id: question_id.to_string(),
            submitted_query: submitted_sql.to_string(),
            correct: false,
            message: message.into(),
            hint: None,
            points_earned: 0,
            submitted: None,
            expected: None,
            execution_time_ms: 0,
            timestamp: Utc::now(),
        }
    }

    /// Message with the awarded points appended when correct.
    pub fn formatted_message(&self) -> String {
        if self.correct && self.points_earned > 0 {
            format!("{} (+{} points)", self.message, self.points_earned)
        } else {
            self.message.clone()
        }
    }
}

/// Grades submissions against the catalog's reference solutions.
pub struct AnswerVerifier {
    manager: Arc<DatabaseManager>,
    catalog: Arc<QuestionCatalog>,
    engine: QueryEngine,
    progress: Arc<dyn ProgressSink>,
}

impl AnswerVerifier {
    pub fn new(
        manager: Arc<DatabaseManager>,
        catalog: Arc<QuestionCatalog>,
        engine: QueryEngine,
    ) -> Self {
        Self {
            manager,
            catalog,
            engine,
            progress: Arc::new(NoopProgress),
        }
    }

    /// Sends progress events to the given sink.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn catalog(&self) -> &QuestionCatalog {
        &self.catalog
    }

    /// Validates a submission for a question.
    ///
    /// Only lifecycle faults are returned as `Err`; everything else,
    /// including unknown questions and failing SQL, is an outcome. The
    /// Practice store is not reset between the two executions.
    pub async fn validate(&self, question_id: &str, submitted_sql: &str) -> Result<ValidationOutcome> {
        let Some(question) = self.catalog.get(question_id) else {
            debug!("Validation requested for unknown question {}", question_id);
            return Ok(ValidationOutcome::rejected(
                question_id,
                submitted_sql,
                NOT_FOUND_MESSAGE,
            ));
        };

        let handle = self.manager.practice_handle()?;
        self.emit(ProgressEvent::Attempted {
            question_id: question_id.to_string(),
            at: Utc::now(),
        })
        .await;

        let start = Instant::now();
        let submitted = self.engine.execute(submitted_sql, &handle).await;
        if !submitted.success {
            let mut outcome =
                ValidationOutcome::rejected(question_id, submitted_sql, submitted.message.clone());
            outcome.execution_time_ms = start.elapsed().as_millis() as u64;
            outcome.submitted = Some(submitted);
            return Ok(outcome);
        }

        let expected = self.engine.execute(&question.reference_solution, &handle).await;
        let execution_time_ms = start.elapsed().as_millis() as u64;
        if !expected.success {
            error!(
                "Reference solution for {} failed: {}",
                question_id, expected.message
            );
            let mut outcome = ValidationOutcome::rejected(
                question_id,
                submitted_sql,
                format!("Reference solution failed: {}", expected.message),
            );
            outcome.execution_time_ms = execution_time_ms;
            outcome.submitted = Some(submitted);
            return Ok(outcome);
        }

        let comparison = compare_results(&expected, &submitted);
        let outcome = match comparison {
            Comparison::Equivalent => {
                let points = question.points();
                info!("Question {} answered correctly (+{} points)", question_id, points);
                self.emit(ProgressEvent::Completed {
                    question_id: question_id.to_string(),
                    points,
                    at: Utc::now(),
                })
                .await;
                ValidationOutcome {
                    question_id: question_id.to_string(),
                    submitted_query: submitted_sql.to_string(),
                    correct: true,
                    message: CORRECT_MESSAGE.to_string(),
                    hint: None,
                    points_earned: points,
                    submitted: Some(submitted),
                    expected: Some(expected),
                    execution_time_ms,
                    timestamp: Utc::now(),
                }
            }
            Comparison::Mismatch(mismatch) => {
                debug!("Question {} answered incorrectly: {}", question_id, mismatch);
                self.emit(ProgressEvent::Incorrect {
                    question_id: question_id.to_string(),
                    at: Utc::now(),
                })
                .await;
                ValidationOutcome {
                    question_id: question_id.to_string(),
                    submitted_query: submitted_sql.to_string(),
                    correct: false,
                    message: INCORRECT_MESSAGE.to_string(),
                    hint: Some(build_hint(&mismatch, question.hint.as_deref())),
                    points_earned: 0,
                    submitted: Some(submitted),
                    expected: Some(expected),
                    execution_time_ms,
                    timestamp: Utc::now(),
                }
            }
        };
        Ok(outcome)
    }

    async fn emit(&self, event: ProgressEvent) {
        if let Err(e) = self.progress.record(event).await {
            warn!("Progress sink rejected event: {}", e);
        }
    }
}

fn build_hint(mismatch: &Mismatch, static_hint: Option<&str>) -> String {
    match static_hint.filter(|h| !h.trim().is_empty()) {
        Some(hint) => format!("{mismatch}\n{hint}"),
        None => mismatch.to_string(),
    }
}

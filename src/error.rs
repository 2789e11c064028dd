//! Error types for sqlcoach.
//!
//! Defines the main error enum used throughout the engine. Execution-time
//! variants are folded into failed results by the query engine; lifecycle
//! variants are returned to the caller.

use crate::db::DatabaseKind;
use thiserror::Error;

/// Main error type for sqlcoach operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoachError {
    /// Blank SQL text, rejected before it reaches a store.
    #[error("Empty query")]
    EmptyInput,

    /// More than one statement in a single execution request.
    #[error("Only one statement can be executed at a time (found {0})")]
    MultipleStatements(usize),

    /// The store rejected or failed a statement.
    #[error("SQL Error: {0}")]
    Query(String),

    /// Execution exceeded the configured bound.
    #[error("Query timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// A handle was requested before `open()` completed (or after `close()`).
    #[error("{0} database is not initialized")]
    NotInitialized(DatabaseKind),

    /// Schema or seed application failed while opening the stores.
    #[error("Database initialization failed: {0}")]
    Initialization(String),

    /// The practice store could not be rebuilt.
    #[error("Practice database reset failed: {0}")]
    Reset(String),

    /// A reset of the handle is in progress.
    #[error("{0} database is being reset, try again shortly")]
    Busy(DatabaseKind),

    /// Unknown question id.
    #[error("Question not found: {0}")]
    QuestionNotFound(String),

    /// Configuration errors (invalid config file, bad values, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoachError {
    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates an initialization error with the given message.
    pub fn initialization(msg: impl Into<String>) -> Self {
        Self::Initialization(msg.into())
    }

    /// Creates a reset error with the given message.
    pub fn reset(msg: impl Into<String>) -> Self {
        Self::Reset(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::EmptyInput | Self::MultipleStatements(_) => "Input Error",
            Self::Query(_) => "Query Error",
            Self::Timeout { .. } => "Timeout",
            Self::NotInitialized(_) => "Lifecycle Error",
            Self::Initialization(_) => "Initialization Error",
            Self::Reset(_) => "Reset Error",
            Self::Busy(_) => "Busy",
            Self::QuestionNotFound(_) => "Question Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns true for errors that end a single execution but leave the
    /// system usable.
    pub fn is_execution_fault(&self) -> bool {
        matches!(
            self,
            Self::EmptyInput
                | Self::MultipleStatements(_)
                | Self::Query(_)
                | Self::Timeout { .. }
                | Self::Busy(_)
        )
    }
}

/// Result type alias using CoachError.
pub type Result<T> = std::result::Result<T, CoachError>;

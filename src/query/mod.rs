//! Query classification and bounded execution for sqlcoach.
//!
//! This module isolates SQL execution and result shaping from the lifecycle
//! and grading layers.

pub mod classifier;
pub mod executor;

pub use classifier::{classify, leading_keyword, split_statements, statement_count};
pub use executor::{
    ExecuteOptions, QueryEngine, SyntaxCheck, DEFAULT_MAX_ROWS, DEFAULT_TIMEOUT_SECS,
};

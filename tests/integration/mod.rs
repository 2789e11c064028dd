//! Integration tests for sqlcoach.

pub mod common;
pub mod execution_test;
pub mod grading_test;
pub mod lifecycle_test;

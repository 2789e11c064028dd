//! sqlcoach - SQL practice with automatic answer verification.
//!
//! This library exposes the core modules for the CLI and for integration
//! tests.

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod grading;
pub mod logging;
pub mod output;
pub mod query;

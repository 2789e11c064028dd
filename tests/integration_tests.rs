//! Integration tests for sqlcoach.
//!
//! Every test opens its own stores: the Main store lives in a temporary
//! directory and the Practice store is in memory, so no external database
//! is needed.
//!
//! Run with: `cargo test --test integration_tests`

mod integration;

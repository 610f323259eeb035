//! Helpers for tests that run against a real SQLite database and a fake payment processor.
//!
//! Not intended for production use.
pub mod callbacks;
pub mod fake_processor;
pub mod prepare_env;

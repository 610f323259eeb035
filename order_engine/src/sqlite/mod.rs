//! SQLite backend for the order engine.
//!
//! Schema migrations live in `migrations/` and are embedded into the binary with [`sqlx::migrate!`]. Call
//! [`SqliteDatabase::migrate`] once at start-up.
mod errors;
mod sqlite_impl;

pub mod db;
pub use errors::SqliteDatabaseError;
pub use sqlite_impl::SqliteDatabase;

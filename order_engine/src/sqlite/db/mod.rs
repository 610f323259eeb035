//! # SQLite Database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interactions are simple functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument. Callers can obtain a connection from a pool, or open a transaction and pass
//! `&mut tx` through to several of these functions to make them atomic.
//!
//! Functions that write always lead with the write statement. SQLite then takes the write lock at the start of the
//! transaction, and a second writer waits on the busy timeout rather than failing later on a stale read.
use std::{env, str::FromStr};

use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Error as SqlxError,
    SqlitePool,
};

pub mod adjustments;
pub mod items;
pub mod orders;
pub mod transactions;

const SQLITE_DB_URL: &str = "sqlite://data/order_engine.db";

pub fn db_url() -> String {
    let result = env::var("OE_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ OE_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}

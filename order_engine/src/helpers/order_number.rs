use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};

use crate::db_types::OrderNumber;

const SUFFIX_LENGTH: usize = 8;

/// Generates a fresh order number of the form `ORD-{YYYYMMDDHHMMSS}-{8 uppercase alphanumerics}`.
///
/// Collisions are astronomically unlikely within the same second, but the database enforces uniqueness regardless
/// and the caller retries with a new number on conflict.
pub fn generate_order_number(now: DateTime<Utc>) -> OrderNumber {
    let suffix = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LENGTH)
        .map(|c| char::from(c).to_ascii_uppercase())
        .collect::<String>();
    OrderNumber(format!("ORD-{}-{suffix}", now.format("%Y%m%d%H%M%S")))
}

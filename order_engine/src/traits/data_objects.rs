use serde::{Deserialize, Serialize};

use crate::db_types::{Order, PaymentStatusType};

/// The result of an all-or-nothing stock reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationResult {
    /// Every line was decremented.
    Reserved,
    /// Nothing was decremented. `item_id` is the first line that could not be supplied.
    Unavailable { item_id: i64 },
}

impl ReservationResult {
    pub fn is_reserved(&self) -> bool {
        matches!(self, ReservationResult::Reserved)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOrderResult {
    /// Stock was reserved and the order persisted, in one transaction.
    Inserted(Order),
    /// A line could not be reserved. Nothing was written.
    Unavailable { item_id: i64 },
    /// The order number is already taken. Nothing was written; retry with a fresh number.
    DuplicateOrderNumber,
}

/// The result of a compare-and-set status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdateResult {
    Updated(Order),
    /// The order was no longer in the expected status. Carries the order as it is now.
    Stale(Order),
    NotFound,
}

/// The order-side effect of a gateway transaction, applied only while the payment is still `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentUpdate {
    pub payment_status: PaymentStatusType,
    /// Also move the order from `pending` to `processing`.
    pub advance_status: bool,
}

impl PaymentUpdate {
    pub fn new(payment_status: PaymentStatusType, advance_status: bool) -> Self {
        Self { payment_status, advance_status }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyTransactionResult {
    /// The transaction id is already in the ledger. Nothing was written.
    AlreadyProcessed,
    /// The transaction was logged but the order was left as it was.
    Recorded(Order),
    /// The transaction was logged and the order updated.
    Applied(Order),
}

use serde::{Deserialize, Serialize};

use crate::db_types::{Order, PaymentStatusType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: Order,
}

impl OrderCreatedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
    /// The gateway transaction that paid for the order
    pub transaction_id: i64,
}

impl OrderPaidEvent {
    pub fn new(order: Order, transaction_id: i64) -> Self {
        Self { order, transaction_id }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFailedEvent {
    pub order: Order,
    pub transaction_id: i64,
}

impl PaymentFailedEvent {
    pub fn new(order: Order, transaction_id: i64) -> Self {
        Self { order, transaction_id }
    }

    pub fn payment_status(&self) -> PaymentStatusType {
        self.order.payment_status
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelledEvent {
    pub order: Order,
    /// Who cancelled the order: a user id, or `system` for expiry.
    pub cancelled_by: String,
}

impl OrderCancelledEvent {
    pub fn new<S: Into<String>>(order: Order, cancelled_by: S) -> Self {
        Self { order, cancelled_by: cancelled_by.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    OrderCreated(OrderCreatedEvent),
    OrderPaid(OrderPaidEvent),
    PaymentFailed(PaymentFailedEvent),
    OrderCancelled(OrderCancelledEvent),
}

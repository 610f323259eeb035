use std::fmt::Display;

use thiserror::Error;

use crate::{
    db_types::{OrderStatusType, PaymentStatusType},
    state_machine::TransitionError,
};

/// The broad category of an engine error. The boundary layer maps these onto transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request is structurally invalid. Safe to show the details to the caller.
    Validation,
    NotFound,
    /// The current state precludes the operation.
    Conflict,
    Authorization,
    /// The payment processor failed or refused.
    Payment,
    InvalidSignature,
    Internal,
}

fn transition_kind(e: &TransitionError) -> ErrorKind {
    if e.is_forbidden() {
        ErrorKind::Authorization
    } else {
        ErrorKind::Conflict
    }
}

#[derive(Debug, Clone, Error)]
pub enum InventoryError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Invalid inventory request. {0}")]
    ValidationError(String),
    #[error("Item {0} does not exist")]
    ItemNotFound(i64),
    #[error("Item {item_id} does not have enough stock available")]
    UnavailableItem { item_id: i64 },
    #[error("Insufficient permissions. {0}")]
    Forbidden(String),
}

impl InventoryError {
    pub fn database<E: Display>(e: E) -> Self {
        InventoryError::DatabaseError(e.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            InventoryError::DatabaseError(_) => ErrorKind::Internal,
            InventoryError::ValidationError(_) => ErrorKind::Validation,
            InventoryError::ItemNotFound(_) => ErrorKind::NotFound,
            InventoryError::UnavailableItem { .. } => ErrorKind::Conflict,
            InventoryError::Forbidden(_) => ErrorKind::Authorization,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Invalid order request. {0}")]
    ValidationError(String),
    #[error("These items do not exist: {0:?}")]
    ItemsNotFound(Vec<i64>),
    #[error("Insufficient stock for item {item_id}")]
    InsufficientStock { item_id: i64 },
    #[error("Order {0} does not exist")]
    OrderNotFound(String),
    #[error("Insufficient permissions. {0}")]
    Forbidden(String),
    #[error("{0}")]
    IllegalTransition(#[from] TransitionError),
    #[error("Order {order_number} was changed by someone else and is now {status}")]
    ConcurrentModification { order_number: String, status: OrderStatusType },
    #[error("Could not generate a unique order number after {0} attempts")]
    OrderNumberExhausted(usize),
}

impl OrderFlowError {
    pub fn database<E: Display>(e: E) -> Self {
        OrderFlowError::DatabaseError(e.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderFlowError::DatabaseError(_) | OrderFlowError::OrderNumberExhausted(_) => ErrorKind::Internal,
            OrderFlowError::ValidationError(_) => ErrorKind::Validation,
            OrderFlowError::ItemsNotFound(_) | OrderFlowError::OrderNotFound(_) => ErrorKind::NotFound,
            OrderFlowError::InsufficientStock { .. } | OrderFlowError::ConcurrentModification { .. } => {
                ErrorKind::Conflict
            },
            OrderFlowError::Forbidden(_) => ErrorKind::Authorization,
            OrderFlowError::IllegalTransition(e) => transition_kind(e),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Invalid checkout request. {0}")]
    ValidationError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(i64),
    #[error("Insufficient permissions. {0}")]
    Forbidden(String),
    #[error("Order {order_number} cannot be checked out while it is {status} with payment {payment_status}")]
    InvalidOrderState { order_number: String, status: OrderStatusType, payment_status: PaymentStatusType },
    /// Deliberately vague. The processor's own message is logged, never returned.
    #[error("Payment could not be initiated")]
    PaymentInitiationFailed,
}

impl CheckoutError {
    pub fn database<E: Display>(e: E) -> Self {
        CheckoutError::DatabaseError(e.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckoutError::DatabaseError(_) => ErrorKind::Internal,
            CheckoutError::ValidationError(_) => ErrorKind::Validation,
            CheckoutError::OrderNotFound(_) => ErrorKind::NotFound,
            CheckoutError::Forbidden(_) => ErrorKind::Authorization,
            CheckoutError::InvalidOrderState { .. } => ErrorKind::Conflict,
            CheckoutError::PaymentInitiationFailed => ErrorKind::Payment,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum WebhookError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Malformed callback payload. {0}")]
    MalformedPayload(String),
    #[error("Callback signature is invalid")]
    InvalidSignature,
}

impl WebhookError {
    pub fn database<E: Display>(e: E) -> Self {
        WebhookError::DatabaseError(e.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            WebhookError::DatabaseError(_) => ErrorKind::Internal,
            WebhookError::MalformedPayload(_) => ErrorKind::Validation,
            WebhookError::InvalidSignature => ErrorKind::InvalidSignature,
        }
    }
}

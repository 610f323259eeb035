//! The order and payment state machines.
//!
//! Every status change in the engine is checked here before it is written, and then written with a compare-and-set
//! against the status that was checked. Callers never set a status directly.
//!
//! ```text
//!   status:          pending ──► processing ──► shipped ──► delivered
//!                       │
//!                       └──► cancelled
//!
//!   payment_status:  pending ──► paid ──► refunded
//!                       │
//!                       └──► failed
//! ```
use std::fmt::Display;

use thiserror::Error;

use crate::db_types::{OrderStatusType, PaymentStatusType};

/// Who is attempting a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    /// The customer who placed the order.
    Owner,
    /// Staff or admin.
    Privileged,
    /// The payment webhook reconciler. The only actor that may move `payment_status`.
    Reconciler,
    /// Background jobs, e.g. unpaid order expiry.
    System,
}

impl Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::Owner => write!(f, "The order owner"),
            Actor::Privileged => write!(f, "A privileged user"),
            Actor::Reconciler => write!(f, "The payment reconciler"),
            Actor::System => write!(f, "The system"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("An order cannot move from {from} to {to}")]
    IllegalStatus { from: OrderStatusType, to: OrderStatusType },
    #[error("A payment cannot move from {from} to {to}")]
    IllegalPayment { from: PaymentStatusType, to: PaymentStatusType },
    #[error("{actor} may not change the status from {from} to {to}")]
    Forbidden { actor: Actor, from: String, to: String },
}

impl TransitionError {
    pub fn is_forbidden(&self) -> bool {
        matches!(self, TransitionError::Forbidden { .. })
    }
}

/// Checks that `actor` may move an order from `from` to `to`.
///
/// | From \ To  | processing | shipped    | delivered  | cancelled           |
/// |------------|------------|------------|------------|---------------------|
/// | pending    | Reconciler | Err        | Err        | Owner, Priv, System |
/// | processing | Err        | Privileged | Err        | Err                 |
/// | shipped    | Err        | Err        | Privileged | Err                 |
///
/// Every other pair, including a status to itself, is illegal.
pub fn check_status_transition(
    from: OrderStatusType,
    to: OrderStatusType,
    actor: Actor,
) -> Result<(), TransitionError> {
    use Actor::*;
    use OrderStatusType::*;
    let allowed: &[Actor] = match (from, to) {
        (Pending, Cancelled) => &[Owner, Privileged, System],
        (Pending, Processing) => &[Reconciler],
        (Processing, Shipped) | (Shipped, Delivered) => &[Privileged],
        _ => return Err(TransitionError::IllegalStatus { from, to }),
    };
    if allowed.contains(&actor) {
        Ok(())
    } else {
        Err(TransitionError::Forbidden { actor, from: from.to_string(), to: to.to_string() })
    }
}

/// Checks that `actor` may move a payment from `from` to `to`. Only the reconciler ever may.
pub fn check_payment_transition(
    from: PaymentStatusType,
    to: PaymentStatusType,
    actor: Actor,
) -> Result<(), TransitionError> {
    use PaymentStatusType::*;
    match (from, to) {
        (Pending, Paid) | (Pending, Failed) | (Paid, Refunded) => {},
        _ => return Err(TransitionError::IllegalPayment { from, to }),
    }
    if actor == Actor::Reconciler {
        Ok(())
    } else {
        Err(TransitionError::Forbidden { actor, from: from.to_string(), to: to.to_string() })
    }
}

/// The payment status reported by a transaction callback.
pub fn payment_status_for(success: bool, pending: bool) -> PaymentStatusType {
    match (success, pending) {
        (true, false) => PaymentStatusType::Paid,
        (false, false) => PaymentStatusType::Failed,
        (_, true) => PaymentStatusType::Pending,
    }
}

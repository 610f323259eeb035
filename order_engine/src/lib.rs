//! Order Engine
//!
//! The order engine is the core of a shop backend. It takes an order from a basket of catalog items to a paid order,
//! keeping stock, prices and payment state consistent along the way. It is storage-agnostic and transport-agnostic;
//! `order_server` puts an HTTP surface in front of it.
//!
//! The library is divided into these sections:
//! 1. Storage contracts ([`mod@traits`]) and the SQLite backend that implements them ([`SqliteDatabase`]). The data
//!    types that pass through them live in [`mod@db_types`].
//! 2. The public API ([`mod@oe_api`]): the inventory ledger, the order flow (creation, reads, cancellation, status
//!    moves, expiry), checkout against the payment processor, and the webhook reconciler.
//! 3. The rules those APIs consult: the order and payment [`mod@state_machine`], role-based [`mod@permissions`] and
//!    [`mod@pricing`].
//!
//! The engine also publishes events after each committed state change ([`mod@events`]). For example, when a payment
//! callback marks an order as paid, an `OrderPaid` event is emitted. Subscribers register async closures through
//! [`events::EventHooks`].
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod oe_api;
pub mod permissions;
pub mod pricing;
pub mod state_machine;
#[cfg(feature = "sqlite")]
pub mod test_utils;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteDatabase, SqliteDatabaseError};
pub use oe_api::{
    checkout_api::CheckoutApi,
    errors::{CheckoutError, ErrorKind, InventoryError, OrderFlowError, WebhookError},
    inventory_api::InventoryApi,
    order_flow_api::OrderFlowApi,
    order_objects,
    payment_processor::PaymentProcessor,
    webhook_api::WebhookApi,
};
pub use traits::{
    ApplyTransactionResult,
    CatalogManagement,
    InsertOrderResult,
    InventoryManagement,
    OrderManagement,
    PaymentLedger,
    PaymentUpdate,
    ReservationResult,
    StatusUpdateResult,
    StorageBackend,
};

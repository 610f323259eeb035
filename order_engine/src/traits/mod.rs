//! # Storage backend contracts
//!
//! This module defines the behaviour a storage backend must expose in order to back the order engine. The engine's
//! public APIs are generic over these traits, so a backend only needs to implement the traits the API in question
//! requires.
//!
//! * [`StorageBackend`] carries the backend's error type and identity. Every other trait builds on it.
//! * [`CatalogManagement`] creates, edits and looks up catalog items. It never moves stock.
//! * [`InventoryManagement`] owns every change to an item's available quantity, and the audit trail that goes with it.
//! * [`OrderManagement`] persists orders together with their stock reservations, and applies compare-and-set status
//!   changes.
//! * [`PaymentLedger`] is the append-only idempotency ledger of gateway transactions.
//!
//! Anything that changes more than one row happens in a single storage transaction inside the backend. Callers never
//! see, or need to manage, a transaction.
mod catalog_management;
mod data_objects;
mod inventory_management;
mod order_management;
mod payment_ledger;

pub use catalog_management::CatalogManagement;
pub use data_objects::{
    ApplyTransactionResult,
    InsertOrderResult,
    PaymentUpdate,
    ReservationResult,
    StatusUpdateResult,
};
pub use inventory_management::InventoryManagement;
pub use order_management::OrderManagement;
pub use payment_ledger::PaymentLedger;

/// The root of every storage trait.
pub trait StorageBackend: Clone {
    type Error: std::error::Error + Send + Sync + 'static;

    /// The URL of the database
    fn url(&self) -> &str;
}

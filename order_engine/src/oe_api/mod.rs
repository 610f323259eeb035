//! # Order engine public API
//!
//! The `oe_api` module exposes the programmatic API of the order engine. Each API is generic over the storage traits
//! it needs, so callers can pick the parts they want.
//!
//! * [`inventory_api`] is the inventory ledger: availability, all-or-nothing reservations, restocking.
//! * [`order_flow_api`] builds and prices orders, and moves them through their lifecycle.
//! * [`checkout_api`] runs the payment processor handshake for a pending order.
//! * [`webhook_api`] reconciles processor callbacks with orders. It is the only thing that changes payment status.
//!
//! # API usage
//!
//! An API instance is created by supplying a backend that implements the required traits.
//!
//! ```rust,ignore
//! use order_engine::{events::EventProducers, OrderFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/orders.db", 25).await?;
//! let api = OrderFlowApi::new(db, EventProducers::default());
//! let order = api.create_order(&caller, request).await?;
//! ```
pub mod checkout_api;
pub mod errors;
pub mod inventory_api;
pub mod order_flow_api;
pub mod order_objects;
pub mod payment_processor;
pub mod webhook_api;

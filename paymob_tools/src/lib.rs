//! # Paymob tools
//!
//! A small client for the [Paymob Accept](https://docs.paymob.com) API, covering the three-step card payment
//! handshake (authenticate, register an order, request a payment key) and the HMAC scheme Paymob uses to sign
//! transaction callbacks.
//!
//! The client holds no global state. Construct a [`PaymobApi`] from a [`PaymobConfig`] and pass it to whoever needs
//! it.
mod api;
mod config;
mod error;

pub mod data_objects;
pub mod signature;

pub use api::PaymobApi;
pub use config::PaymobConfig;
pub use data_objects::{BillingData, PaymentKeyRequest, RemoteOrderRequest, TransactionCallback, TransactionObj};
pub use error::PaymobApiError;

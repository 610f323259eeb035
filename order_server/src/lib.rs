//! # Order server
//! This crate hosts the HTTP boundary of the order engine. It is responsible for:
//! * Identifying callers from the headers set by the authenticating proxy, and checking their role against the
//!   permission table.
//! * Handing order, checkout and inventory requests to the engine APIs and rendering their results as JSON.
//! * Receiving Paymob transaction callbacks and return redirects.
//! * Running the unpaid order expiry worker.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/orders...`: Placing, reading, cancelling, fulfilling and checking out orders.
//! * `/api/inventory/{item_id}/...`: Stock availability, the stock audit trail, and restocking.
//! * `/paymob/webhook`: Paymob transaction callbacks.
//! * `/paymob/response`: The page Paymob redirects shoppers to after payment.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod helpers;
pub mod middleware;
pub mod routes;
pub mod server;

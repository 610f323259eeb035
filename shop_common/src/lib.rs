//! Shared primitives for the order engine and its collaborators.
//!
//! * [`Money`] is the only type used for monetary amounts. It is an exact fixed-point decimal and never touches binary
//!   floating point.
//! * [`Secret`] hides configuration values (API keys, HMAC secrets) from `Debug` and `Display` output.
mod money;

pub mod helpers;
pub mod op;
mod secret;

pub use money::{Money, MoneyConversionError, DEFAULT_CURRENCY};
pub use secret::Secret;

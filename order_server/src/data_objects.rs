use std::fmt::Display;

use order_engine::db_types::OrderStatusType;
use paymob_tools::BillingData;
use serde::{Deserialize, Serialize};

/// The acknowledgement returned to the payment processor for every accepted callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub status: String,
    pub message: String,
}

impl WebhookResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { status: "success".to_string(), message: message.to_string() }
    }
}

/// Query string of the callback route. The signature may also arrive in the `X-Paymob-Hmac` header.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookParams {
    pub hmac: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: OrderStatusType,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub billing_data: Option<BillingData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestockRequest {
    pub quantity: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityQuery {
    #[serde(default = "one")]
    pub qty: i64,
}

fn one() -> i64 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub item_id: i64,
    pub quantity: i64,
    pub available: bool,
}

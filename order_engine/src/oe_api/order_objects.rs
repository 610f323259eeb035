use serde::{Deserialize, Serialize};

use crate::db_types::{Address, ItemQuantity, OrderNumber, OrderStatusType, PaymentStatusType};

/// A request to place an order. Prices are never taken from the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<ItemQuantity>,
    pub shipping_address: Address,
    #[serde(default)]
    pub billing_address: Option<Address>,
}

impl CreateOrderRequest {
    pub fn new(items: Vec<ItemQuantity>, shipping_address: Address) -> Self {
        Self { items, shipping_address, billing_address: None }
    }

    pub fn with_billing_address(mut self, address: Address) -> Self {
        self.billing_address = Some(address);
        self
    }
}

/// What a shopper needs to complete payment on the processor's hosted form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSession {
    pub order_number: OrderNumber,
    /// The processor's id for this order
    pub remote_order_id: i64,
    pub payment_key: String,
    pub checkout_url: String,
    /// HMAC over the remote order id and payment key, for the client to present back
    pub signature: String,
}

/// How a transaction callback was handled. Every variant is a successful delivery from the processor's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CallbackOutcome {
    /// The order's payment status changed.
    Applied { order_number: OrderNumber, payment_status: PaymentStatusType, status: OrderStatusType },
    /// The transaction was logged but the order was left as it was.
    Recorded { order_number: OrderNumber },
    /// This transaction id has been seen before. Nothing changed.
    AlreadyProcessed,
    /// The callback names an order this system does not know.
    UnknownOrder,
}

impl CallbackOutcome {
    pub fn message(&self) -> String {
        match self {
            CallbackOutcome::Applied { order_number, payment_status, .. } => {
                format!("order {order_number} payment is {payment_status}")
            },
            CallbackOutcome::Recorded { order_number } => format!("transaction recorded for order {order_number}"),
            CallbackOutcome::AlreadyProcessed => "already processed".to_string(),
            CallbackOutcome::UnknownOrder => "order not found".to_string(),
        }
    }
}

/// A verified, read-only view of the processor's return-URL redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnSummary {
    pub transaction_id: Option<i64>,
    pub merchant_order_id: Option<String>,
    pub success: bool,
    pub pending: bool,
    pub amount_cents: Option<i64>,
    pub currency: Option<String>,
}

//! Request and response bodies for the Paymob Accept API.
use serde::{Deserialize, Serialize};

use crate::signature::HmacFields;

/// Value Paymob accepts for billing fields that the merchant does not collect.
pub const PLACEHOLDER_FIELD: &str = "NA";

//--------------------------------------     Handshake requests     --------------------------------------------------
#[derive(Debug, Clone, Serialize)]
pub(crate) struct AuthRequest<'a> {
    pub api_key: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AuthResponse {
    pub token: Option<String>,
}

/// The merchant-side order as registered with Paymob (`POST /api/ecommerce/orders`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteOrderRequest {
    pub delivery_needed: bool,
    pub amount_cents: i64,
    pub currency: String,
    /// This system's order number. Paymob echoes it back in callbacks.
    pub merchant_order_id: String,
    pub items: Vec<serde_json::Value>,
}

impl RemoteOrderRequest {
    pub fn new<S: Into<String>>(merchant_order_id: S, amount_cents: i64, currency: S) -> Self {
        Self {
            delivery_needed: false,
            amount_cents,
            currency: currency.into(),
            merchant_order_id: merchant_order_id.into(),
            items: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AuthenticatedRequest<'a, T: Serialize> {
    pub auth_token: &'a str,
    #[serde(flatten)]
    pub body: &'a T,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RemoteOrderResponse {
    pub id: Option<i64>,
}

/// Parameters for `POST /api/acceptance/payment_keys`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentKeyRequest {
    pub amount_cents: i64,
    /// Lifetime of the key in seconds
    pub expiration: u64,
    pub order_id: i64,
    pub billing_data: BillingData,
    pub currency: String,
    pub integration_id: i64,
    pub lock_order_when_paid: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PaymentKeyResponse {
    pub token: Option<String>,
}

//--------------------------------------        BillingData         --------------------------------------------------
/// Customer billing details. Paymob requires every field to be present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingData {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub apartment: String,
    pub floor: String,
    pub street: String,
    pub building: String,
    pub shipping_method: String,
    pub postal_code: String,
    pub city: String,
    pub state: String,
    pub country: String,
}

impl Default for BillingData {
    fn default() -> Self {
        Self::placeholder()
    }
}

impl BillingData {
    /// Billing data with every field set to [`PLACEHOLDER_FIELD`]. Paymob's sandbox accepts this, live accounts may
    /// not.
    pub fn placeholder() -> Self {
        let na = || PLACEHOLDER_FIELD.to_string();
        Self {
            first_name: na(),
            last_name: na(),
            email: na(),
            phone_number: na(),
            apartment: na(),
            floor: na(),
            street: na(),
            building: na(),
            shipping_method: na(),
            postal_code: na(),
            city: na(),
            state: na(),
            country: na(),
        }
    }

    /// Replaces empty fields with the placeholder value, since Paymob rejects blank strings.
    pub fn with_placeholders(mut self) -> Self {
        for field in [
            &mut self.first_name,
            &mut self.last_name,
            &mut self.email,
            &mut self.phone_number,
            &mut self.apartment,
            &mut self.floor,
            &mut self.street,
            &mut self.building,
            &mut self.shipping_method,
            &mut self.postal_code,
            &mut self.city,
            &mut self.state,
            &mut self.country,
        ] {
            if field.trim().is_empty() {
                *field = PLACEHOLDER_FIELD.to_string();
            }
        }
        self
    }
}

//--------------------------------------    Transaction callback    --------------------------------------------------
/// The body of a "transaction processed" callback. Only the fields this system uses, or that are covered by the
/// HMAC, are modelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionCallback {
    #[serde(rename = "type", default)]
    pub callback_type: Option<String>,
    pub obj: TransactionObj,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionObj {
    pub id: i64,
    pub success: bool,
    pub pending: bool,
    pub amount_cents: i64,
    pub currency: String,
    #[serde(default)]
    pub integration_id: i64,
    pub order: RemoteOrderRef,
    #[serde(default)]
    pub source_data: SourceData,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub error_occured: bool,
    #[serde(default)]
    pub has_parent_transaction: bool,
    #[serde(default)]
    pub is_3d_secure: bool,
    #[serde(default)]
    pub is_auth: bool,
    #[serde(default)]
    pub is_capture: bool,
    #[serde(default)]
    pub is_refunded: bool,
    #[serde(default)]
    pub is_standalone_payment: bool,
    #[serde(default)]
    pub is_voided: bool,
    #[serde(default)]
    pub owner: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteOrderRef {
    pub id: i64,
    #[serde(default)]
    pub merchant_order_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceData {
    pub pan: Option<String>,
    pub sub_type: Option<String>,
    #[serde(rename = "type")]
    pub source_type: Option<String>,
}

impl HmacFields for TransactionObj {
    fn hmac_field(&self, name: &str) -> String {
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        match name {
            "amount_cents" => self.amount_cents.to_string(),
            "created_at" => self.created_at.clone(),
            "currency" => self.currency.clone(),
            "error_occured" => self.error_occured.to_string(),
            "has_parent_transaction" => self.has_parent_transaction.to_string(),
            "id" => self.id.to_string(),
            "integration_id" => self.integration_id.to_string(),
            "is_3d_secure" => self.is_3d_secure.to_string(),
            "is_auth" => self.is_auth.to_string(),
            "is_capture" => self.is_capture.to_string(),
            "is_refunded" => self.is_refunded.to_string(),
            "is_standalone_payment" => self.is_standalone_payment.to_string(),
            "is_voided" => self.is_voided.to_string(),
            "order" => self.order.id.to_string(),
            "owner" => self.owner.to_string(),
            "pending" => self.pending.to_string(),
            "source_data.pan" => opt(&self.source_data.pan),
            "source_data.sub_type" => opt(&self.source_data.sub_type),
            "source_data.type" => opt(&self.source_data.source_type),
            "success" => self.success.to_string(),
            _ => String::default(),
        }
    }
}

//! Paymob HMAC signatures.
//!
//! Paymob signs transaction callbacks with HMAC-SHA512, keyed by the merchant's HMAC secret, over the plain
//! concatenation of a fixed list of transaction fields in lexicographic order ([`TRANSACTION_HMAC_FIELDS`]). The
//! signature is delivered as lowercase hex, either as the `hmac` query parameter or in a header.
//!
//! The same scheme applies to the shopper's return-URL redirect, where the fields arrive as flat query parameters
//! (`order`, `source_data.pan`, ...). Anything that can look a field up by name implements [`HmacFields`].
use std::collections::HashMap;

use hmac::{Hmac, Mac};
use sha2::Sha512;

use crate::PaymobApiError;

type HmacSha512 = Hmac<Sha512>;

/// The fields covered by a transaction signature, in the order they are concatenated.
pub const TRANSACTION_HMAC_FIELDS: [&str; 20] = [
    "amount_cents",
    "created_at",
    "currency",
    "error_occured",
    "has_parent_transaction",
    "id",
    "integration_id",
    "is_3d_secure",
    "is_auth",
    "is_capture",
    "is_refunded",
    "is_standalone_payment",
    "is_voided",
    "order",
    "owner",
    "pending",
    "source_data.pan",
    "source_data.sub_type",
    "source_data.type",
    "success",
];

/// Renders a named transaction field exactly as Paymob renders it when signing. Absent fields render as `""`.
pub trait HmacFields {
    fn hmac_field(&self, name: &str) -> String;

    fn hmac_message(&self) -> String {
        TRANSACTION_HMAC_FIELDS.iter().map(|f| self.hmac_field(f)).collect()
    }
}

/// Flat query parameters from the return-URL redirect.
#[derive(Debug, Clone, Default)]
pub struct ResponseParams(pub HashMap<String, String>);

impl ResponseParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn flag(&self, name: &str) -> bool {
        self.get(name).map(|v| v.eq_ignore_ascii_case("true")).unwrap_or(false)
    }
}

impl HmacFields for ResponseParams {
    fn hmac_field(&self, name: &str) -> String {
        self.get(name).unwrap_or_default().to_string()
    }
}

fn new_mac(secret: &str) -> Result<HmacSha512, PaymobApiError> {
    HmacSha512::new_from_slice(secret.as_bytes()).map_err(|_| PaymobApiError::InvalidHmacKey)
}

/// Calculates the lowercase hex HMAC-SHA512 of `message`.
pub fn calculate_hmac(secret: &str, message: &[u8]) -> Result<String, PaymobApiError> {
    let mut mac = new_mac(secret)?;
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Checks a hex signature against `message` in constant time. Hex case is ignored. An empty secret never verifies.
pub fn verify_hmac(secret: &str, message: &[u8], signature: &str) -> bool {
    if secret.is_empty() {
        return false;
    }
    let Ok(supplied) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = new_mac(secret) else {
        return false;
    };
    mac.update(message);
    mac.verify_slice(&supplied).is_ok()
}

/// The signature Paymob would attach to a callback or redirect carrying `fields`.
pub fn transaction_signature<F: HmacFields>(secret: &str, fields: &F) -> Result<String, PaymobApiError> {
    calculate_hmac(secret, fields.hmac_message().as_bytes())
}

pub fn verify_transaction<F: HmacFields>(secret: &str, fields: &F, signature: &str) -> bool {
    verify_hmac(secret, fields.hmac_message().as_bytes(), signature)
}

/// Signature handed to the client alongside a payment key, binding it to the remote order.
pub fn session_signature(secret: &str, remote_order_id: i64, payment_key: &str) -> Result<String, PaymobApiError> {
    calculate_hmac(secret, format!("{remote_order_id}{payment_key}").as_bytes())
}

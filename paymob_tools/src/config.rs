use std::time::Duration;

use log::*;
use shop_common::{helpers::parse_env_var, Secret};

pub const DEFAULT_PAYMOB_BASE_URL: &str = "https://accept.paymob.com";
pub const DEFAULT_PAYMENT_KEY_EXPIRY: u64 = 3600;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct PaymobConfig {
    /// e.g. "https://accept.paymob.com". No trailing slash.
    pub base_url: String,
    pub api_key: Secret<String>,
    /// Shared secret used to sign transaction callbacks and checkout sessions.
    pub hmac_secret: Secret<String>,
    /// The card payment integration id from the Paymob dashboard.
    pub integration_id: i64,
    pub iframe_id: String,
    /// Lifetime of a payment key, in seconds.
    pub payment_key_expiry: u64,
    /// Timeout applied to every individual HTTP request.
    pub request_timeout: Duration,
}

impl Default for PaymobConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PAYMOB_BASE_URL.to_string(),
            api_key: Secret::default(),
            hmac_secret: Secret::default(),
            integration_id: 0,
            iframe_id: String::default(),
            payment_key_expiry: DEFAULT_PAYMENT_KEY_EXPIRY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl PaymobConfig {
    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("OE_PAYMOB_BASE_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| {
                info!("🪛️ OE_PAYMOB_BASE_URL not set, using {DEFAULT_PAYMOB_BASE_URL}");
                DEFAULT_PAYMOB_BASE_URL.to_string()
            });
        let api_key = Secret::new(std::env::var("OE_PAYMOB_API_KEY").unwrap_or_else(|_| {
            warn!("🪛️ OE_PAYMOB_API_KEY not set. Checkout requests will be rejected by Paymob.");
            String::default()
        }));
        let hmac_secret = Secret::new(std::env::var("OE_PAYMOB_HMAC_SECRET").unwrap_or_else(|_| {
            warn!("🚨️ OE_PAYMOB_HMAC_SECRET not set. Every transaction callback will fail signature verification.");
            String::default()
        }));
        let integration_id = parse_env_var::<i64>("OE_PAYMOB_INTEGRATION_ID")
            .unwrap_or_else(|e| {
                warn!("🪛️ {e}");
                None
            })
            .unwrap_or_else(|| {
                warn!("🪛️ OE_PAYMOB_INTEGRATION_ID not set. Payment key requests will fail.");
                0
            });
        let iframe_id = std::env::var("OE_PAYMOB_IFRAME_ID").unwrap_or_else(|_| {
            warn!("🪛️ OE_PAYMOB_IFRAME_ID not set. Checkout URLs will not be usable.");
            String::default()
        });
        let payment_key_expiry = parse_env_var::<u64>("OE_PAYMOB_PAYMENT_KEY_EXPIRY")
            .unwrap_or_else(|e| {
                warn!("🪛️ {e}");
                None
            })
            .unwrap_or(DEFAULT_PAYMENT_KEY_EXPIRY);
        let request_timeout = parse_env_var::<u64>("OE_PAYMOB_REQUEST_TIMEOUT")
            .unwrap_or_else(|e| {
                warn!("🪛️ {e}");
                None
            })
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        Self { base_url, api_key, hmac_secret, integration_id, iframe_id, payment_key_expiry, request_timeout }
    }
}

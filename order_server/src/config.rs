use std::{env, str::FromStr, time::Duration as StdDuration};

use chrono::Duration;
use log::*;
use order_engine::{oe_api::checkout_api::DEFAULT_GATEWAY_TIMEOUT, pricing::PricingPolicy};
use paymob_tools::PaymobConfig;
use rust_decimal::Decimal;
use shop_common::{
    helpers::{parse_boolean_flag, parse_env_var},
    Money,
    DEFAULT_CURRENCY,
};

const DEFAULT_OE_HOST: &str = "127.0.0.1";
const DEFAULT_OE_PORT: u16 = 8360;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/order_engine.db";
const DEFAULT_MAX_DB_CONNECTIONS: u32 = 25;
const DEFAULT_UNPAID_ORDER_TIMEOUT: Duration = Duration::hours(48);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_db_connections: u32,
    /// Flat shipping fee, tax rate and currency applied to every new order.
    pub pricing: PricingPolicy,
    /// Orders still unpaid after this long are cancelled and restocked. Zero disables the expiry worker.
    pub unpaid_order_timeout: Duration,
    /// Upper bound on the whole payment handshake with the processor.
    pub gateway_timeout: StdDuration,
    /// If false, checkout requests must carry billing data.
    pub allow_placeholder_billing: bool,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address.
    pub use_forwarded: bool,
    pub paymob: PaymobConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_OE_HOST.to_string(),
            port: DEFAULT_OE_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_db_connections: DEFAULT_MAX_DB_CONNECTIONS,
            pricing: PricingPolicy::default(),
            unpaid_order_timeout: DEFAULT_UNPAID_ORDER_TIMEOUT,
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
            allow_placeholder_billing: true,
            use_x_forwarded_for: false,
            use_forwarded: false,
            paymob: PaymobConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let host = env::var("OE_HOST").ok().unwrap_or_else(|| DEFAULT_OE_HOST.into());
        let port = env_or("OE_PORT", DEFAULT_OE_PORT);
        let database_url = env::var("OE_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ OE_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}");
            DEFAULT_DATABASE_URL.to_string()
        });
        let max_db_connections = env_or("OE_MAX_DB_CONNECTIONS", DEFAULT_MAX_DB_CONNECTIONS);
        let pricing = configure_pricing(defaults.pricing);
        let unpaid_order_timeout = configure_unpaid_order_timeout();
        let gateway_timeout = StdDuration::from_secs(env_or("OE_GATEWAY_TIMEOUT", DEFAULT_GATEWAY_TIMEOUT.as_secs()));
        let allow_placeholder_billing = parse_boolean_flag(env::var("OE_ALLOW_PLACEHOLDER_BILLING").ok(), true);
        if allow_placeholder_billing {
            info!(
                "🪛️ Placeholder billing data will be sent to the payment processor when a shopper omits it. Set \
                 OE_ALLOW_PLACEHOLDER_BILLING=false to require billing data at checkout."
            );
        }
        let use_x_forwarded_for = parse_boolean_flag(env::var("OE_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("OE_USE_FORWARDED").ok(), false);
        let paymob = PaymobConfig::new_from_env_or_default();
        Self {
            host,
            port,
            database_url,
            max_db_connections,
            pricing,
            unpaid_order_timeout,
            gateway_timeout,
            allow_placeholder_billing,
            use_x_forwarded_for,
            use_forwarded,
            paymob,
        }
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that is used to configure the server's behaviour. Generally we try to keep this
/// as small as possible, and exclude secrets to avoid passing sensitive information around the system.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for, use_forwarded: config.use_forwarded }
    }
}

/// Reads `name`, falling back to `default` (with a log message) when it is missing or invalid.
fn env_or<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match parse_env_var::<T>(name) {
        Ok(Some(v)) => v,
        Ok(None) => {
            debug!("🪛️ {name} is not set. Using the default, {default}");
            default
        },
        Err(e) => {
            error!("🪛️ {e} Using the default, {default}, instead.");
            default
        },
    }
}

fn configure_pricing(defaults: PricingPolicy) -> PricingPolicy {
    let shipping_fee = env_or::<Money>("OE_SHIPPING_FEE", defaults.shipping_fee);
    let tax_rate = env_or::<Decimal>("OE_TAX_RATE", defaults.tax_rate);
    let tax_rate = if tax_rate.is_sign_negative() {
        error!("🪛️ OE_TAX_RATE cannot be negative. Using the default, {}", defaults.tax_rate);
        defaults.tax_rate
    } else {
        tax_rate
    };
    let currency = env::var("OE_CURRENCY")
        .ok()
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
    info!("🪛️ Orders are priced in {currency} with {shipping_fee} shipping and a tax rate of {tax_rate}");
    PricingPolicy::new(shipping_fee, tax_rate, &currency)
}

fn configure_unpaid_order_timeout() -> Duration {
    env::var("OE_UNPAID_ORDER_TIMEOUT")
        .map_err(|_| {
            info!(
                "🪛️ OE_UNPAID_ORDER_TIMEOUT is not set. Using the default value of {} hrs.",
                DEFAULT_UNPAID_ORDER_TIMEOUT.num_hours()
            )
        })
        .and_then(|s| {
            s.trim()
                .parse::<i64>()
                .map(Duration::hours)
                .map_err(|e| warn!("🪛️ Invalid configuration value for OE_UNPAID_ORDER_TIMEOUT. {e}"))
        })
        .ok()
        .unwrap_or(DEFAULT_UNPAID_ORDER_TIMEOUT)
}

use paymob_tools::{PaymentKeyRequest, PaymobApi, PaymobApiError, RemoteOrderRequest};

/// The three-step card payment handshake, as the checkout flow sees it.
///
/// [`PaymobApi`] is the production implementation. Tests substitute a fake.
#[allow(async_fn_in_trait)]
pub trait PaymentProcessor {
    type Error: std::error::Error;

    /// Returns a short-lived auth token.
    async fn authenticate(&self) -> Result<String, Self::Error>;

    /// Registers the order with the processor and returns the processor's id for it.
    async fn register_order(&self, auth_token: &str, order: &RemoteOrderRequest) -> Result<i64, Self::Error>;

    async fn request_payment_key(&self, auth_token: &str, request: &PaymentKeyRequest) -> Result<String, Self::Error>;

    fn integration_id(&self) -> i64;

    /// Payment key lifetime, in seconds
    fn payment_key_expiry(&self) -> u64;

    fn checkout_url(&self, payment_key: &str) -> String;

    fn session_signature(&self, remote_order_id: i64, payment_key: &str) -> Result<String, Self::Error>;
}

impl PaymentProcessor for PaymobApi {
    type Error = PaymobApiError;

    async fn authenticate(&self) -> Result<String, Self::Error> {
        PaymobApi::authenticate(self).await
    }

    async fn register_order(&self, auth_token: &str, order: &RemoteOrderRequest) -> Result<i64, Self::Error> {
        PaymobApi::register_order(self, auth_token, order).await
    }

    async fn request_payment_key(&self, auth_token: &str, request: &PaymentKeyRequest) -> Result<String, Self::Error> {
        PaymobApi::request_payment_key(self, auth_token, request).await
    }

    fn integration_id(&self) -> i64 {
        self.config().integration_id
    }

    fn payment_key_expiry(&self) -> u64 {
        self.config().payment_key_expiry
    }

    fn checkout_url(&self, payment_key: &str) -> String {
        PaymobApi::checkout_url(self, payment_key)
    }

    fn session_signature(&self, remote_order_id: i64, payment_key: &str) -> Result<String, Self::Error> {
        PaymobApi::session_signature(self, remote_order_id, payment_key)
    }
}

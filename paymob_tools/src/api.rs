use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::PaymobConfig,
    data_objects::{
        AuthRequest,
        AuthResponse,
        AuthenticatedRequest,
        PaymentKeyRequest,
        PaymentKeyResponse,
        RemoteOrderRequest,
        RemoteOrderResponse,
    },
    signature,
    PaymobApiError,
};

/// Thin client for the Paymob Accept REST API.
///
/// None of the handshake calls are safe to retry blindly, so the client never retries. A failed call surfaces as a
/// [`PaymobApiError`] carrying whatever Paymob said; callers decide what, if anything, to show users.
#[derive(Clone)]
pub struct PaymobApi {
    config: PaymobConfig,
    client: Arc<Client>,
}

impl PaymobApi {
    pub fn new(config: PaymobConfig) -> Result<Self, PaymobApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PaymobApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &PaymobConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, PaymobApiError> {
        let url = self.url(path);
        trace!("💳️ Sending POST request: {url}");
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| PaymobApiError::RestRequestError(e.to_string()))?;
        if response.status().is_success() {
            trace!("💳️ POST {path} successful. {}", response.status());
            response.json::<T>().await.map_err(|e| PaymobApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| PaymobApiError::RestResponseError(e.to_string()))?;
            Err(PaymobApiError::QueryError { status, message })
        }
    }

    /// Step 1: exchange the API key for a short-lived auth token.
    pub async fn authenticate(&self) -> Result<String, PaymobApiError> {
        let body = AuthRequest { api_key: self.config.api_key.reveal() };
        let response = self.post::<AuthResponse, _>("/api/auth/tokens", &body).await?;
        debug!("💳️ Authenticated with Paymob");
        response.token.ok_or(PaymobApiError::MissingField("token"))
    }

    /// Step 2: register the merchant order. Returns Paymob's id for it.
    pub async fn register_order(&self, auth_token: &str, order: &RemoteOrderRequest) -> Result<i64, PaymobApiError> {
        let body = AuthenticatedRequest { auth_token, body: order };
        let response = self.post::<RemoteOrderResponse, _>("/api/ecommerce/orders", &body).await?;
        let id = response.id.ok_or(PaymobApiError::MissingField("id"))?;
        debug!("💳️ Order {} registered with Paymob as #{id}", order.merchant_order_id);
        Ok(id)
    }

    /// Step 3: request a payment key for a registered order.
    pub async fn request_payment_key(
        &self,
        auth_token: &str,
        request: &PaymentKeyRequest,
    ) -> Result<String, PaymobApiError> {
        let body = AuthenticatedRequest { auth_token, body: request };
        let response = self.post::<PaymentKeyResponse, _>("/api/acceptance/payment_keys", &body).await?;
        debug!("💳️ Payment key issued for Paymob order #{}", request.order_id);
        response.token.ok_or(PaymobApiError::MissingField("token"))
    }

    /// The hosted card form for a payment key.
    pub fn checkout_url(&self, payment_key: &str) -> String {
        self.url(&format!("/api/acceptance/iframes/{}?payment_token={payment_key}", self.config.iframe_id))
    }

    pub fn session_signature(&self, remote_order_id: i64, payment_key: &str) -> Result<String, PaymobApiError> {
        signature::session_signature(self.config.hmac_secret.reveal(), remote_order_id, payment_key)
    }
}

use std::{
    sync::{
        atomic::{AtomicI64, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use paymob_tools::{signature::session_signature, PaymentKeyRequest, RemoteOrderRequest};
use thiserror::Error;

use crate::PaymentProcessor;

pub const FAKE_INTEGRATION_ID: i64 = 4411;
pub const FAKE_HMAC_SECRET: &str = "fake-hmac-secret";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Authenticate,
    RegisterOrder,
    PaymentKey,
}

#[derive(Debug, Clone, Error)]
#[error("Fake processor failure: {0}")]
pub struct FakeProcessorError(pub String);

#[derive(Debug, Default)]
pub struct CallCounts {
    pub authenticate: AtomicUsize,
    pub register_order: AtomicUsize,
    pub payment_key: AtomicUsize,
}

/// An in-memory stand-in for the payment processor. Remote order ids are handed out from 9001 upwards.
#[derive(Debug, Clone)]
pub struct FakeProcessor {
    fail_at: Option<FailAt>,
    delay: Option<Duration>,
    calls: Arc<CallCounts>,
    next_remote_id: Arc<AtomicI64>,
    last_registration: Arc<std::sync::Mutex<Option<RemoteOrderRequest>>>,
}

impl Default for FakeProcessor {
    fn default() -> Self {
        Self {
            fail_at: None,
            delay: None,
            calls: Arc::new(CallCounts::default()),
            next_remote_id: Arc::new(AtomicI64::new(9001)),
            last_registration: Arc::new(std::sync::Mutex::new(None)),
        }
    }
}

impl FakeProcessor {
    pub fn failing_at(mut self, step: FailAt) -> Self {
        self.fail_at = Some(step);
        self
    }

    /// Every remote call sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> &CallCounts {
        &self.calls
    }

    pub fn registrations(&self) -> usize {
        self.calls.register_order.load(Ordering::SeqCst)
    }

    pub fn last_registration(&self) -> Option<RemoteOrderRequest> {
        self.last_registration.lock().ok().and_then(|r| r.clone())
    }

    async fn step(&self, step: FailAt, counter: &AtomicUsize) -> Result<(), FakeProcessorError> {
        counter.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_at == Some(step) {
            return Err(FakeProcessorError(format!("{step:?} rejected")));
        }
        Ok(())
    }
}

impl PaymentProcessor for FakeProcessor {
    type Error = FakeProcessorError;

    async fn authenticate(&self) -> Result<String, Self::Error> {
        self.step(FailAt::Authenticate, &self.calls.authenticate).await?;
        Ok("fake-auth-token".into())
    }

    async fn register_order(&self, _auth_token: &str, order: &RemoteOrderRequest) -> Result<i64, Self::Error> {
        self.step(FailAt::RegisterOrder, &self.calls.register_order).await?;
        if let Ok(mut last) = self.last_registration.lock() {
            *last = Some(order.clone());
        }
        Ok(self.next_remote_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn request_payment_key(&self, _auth_token: &str, request: &PaymentKeyRequest) -> Result<String, Self::Error> {
        self.step(FailAt::PaymentKey, &self.calls.payment_key).await?;
        Ok(format!("fake-payment-key-{}", request.order_id))
    }

    fn integration_id(&self) -> i64 {
        FAKE_INTEGRATION_ID
    }

    fn payment_key_expiry(&self) -> u64 {
        3600
    }

    fn checkout_url(&self, payment_key: &str) -> String {
        format!("https://pay.example.test/iframe?payment_token={payment_key}")
    }

    fn session_signature(&self, remote_order_id: i64, payment_key: &str) -> Result<String, Self::Error> {
        session_signature(FAKE_HMAC_SECRET, remote_order_id, payment_key).map_err(|e| FakeProcessorError(e.to_string()))
    }
}

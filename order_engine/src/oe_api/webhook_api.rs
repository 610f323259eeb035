use std::fmt::Debug;

use log::*;
use paymob_tools::{
    signature::{verify_transaction, ResponseParams},
    TransactionCallback,
    TransactionObj,
};
use shop_common::Secret;

use crate::{
    db_types::{NewPaymentTransaction, Order, OrderNumber, OrderStatusType, PaymentStatusType},
    events::{EventProducers, OrderPaidEvent, PaymentFailedEvent},
    oe_api::{
        errors::WebhookError,
        order_objects::{CallbackOutcome, ReturnSummary},
    },
    state_machine::{check_payment_transition, payment_status_for, Actor},
    traits::{ApplyTransactionResult, OrderManagement, PaymentLedger, PaymentUpdate},
};

/// `WebhookApi` reconciles the payment processor's transaction callbacks with local orders.
///
/// Each delivery is handled in this order, stopping at the first step that decides the outcome:
/// 1. The payload is parsed and its HMAC checked. A bad signature changes nothing.
/// 2. A transaction id already in the ledger is acknowledged as `already processed`.
/// 3. The order is looked up by the order number the processor echoes back. Unknown orders are acknowledged and
///    logged, so the processor stops retrying.
/// 4. The ledger row is inserted and the order's payment status advanced, in one storage transaction. If a
///    concurrent delivery of the same transaction won the insert, this one is reported as `already processed`.
///
/// This is the only component that changes an order's payment status.
pub struct WebhookApi<B> {
    db: B,
    producers: EventProducers,
    hmac_secret: Secret<String>,
}

impl<B> Debug for WebhookApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WebhookApi")
    }
}

impl<B> WebhookApi<B> {
    pub fn new(db: B, producers: EventProducers, hmac_secret: Secret<String>) -> Self {
        Self { db, producers, hmac_secret }
    }

    /// Verifies the signed query string of the shopper's return redirect and summarises it. This never changes any
    /// state; only the server-to-server callback does.
    pub fn verify_return(&self, params: &ResponseParams, signature: &str) -> Result<ReturnSummary, WebhookError> {
        if !verify_transaction(self.hmac_secret.reveal(), params, signature) {
            warn!("🪝️ Return redirect for transaction {} has an invalid signature", params.get("id").unwrap_or("?"));
            return Err(WebhookError::InvalidSignature);
        }
        Ok(ReturnSummary {
            transaction_id: params.get("id").and_then(|v| v.parse().ok()),
            merchant_order_id: params.get("merchant_order_id").map(String::from),
            success: params.flag("success"),
            pending: params.flag("pending"),
            amount_cents: params.get("amount_cents").and_then(|v| v.parse().ok()),
            currency: params.get("currency").map(String::from),
        })
    }
}

impl<B> WebhookApi<B>
where B: OrderManagement + PaymentLedger
{
    pub async fn handle_callback(&self, payload: &[u8], signature: &str) -> Result<CallbackOutcome, WebhookError> {
        let callback = serde_json::from_slice::<TransactionCallback>(payload).map_err(|e| {
            warn!("🪝️ Received a malformed transaction callback. {e}");
            WebhookError::MalformedPayload(e.to_string())
        })?;
        let tx = &callback.obj;
        if !verify_transaction(self.hmac_secret.reveal(), tx, signature) {
            warn!(
                "🪝️ Transaction callback {} for processor order #{} has an invalid signature. It has been rejected.",
                tx.id, tx.order.id
            );
            return Err(WebhookError::InvalidSignature);
        }
        if self.db.fetch_transaction(tx.id).await.map_err(WebhookError::database)?.is_some() {
            debug!("🪝️ Transaction {} has already been processed", tx.id);
            return Ok(CallbackOutcome::AlreadyProcessed);
        }
        let Some(order) = self.resolve_order(tx).await? else {
            warn!(
                "🪝️ Transaction {} refers to an unknown order ({:?}, processor order #{}). It has been acknowledged and \
                 ignored.",
                tx.id, tx.order.merchant_order_id, tx.order.id
            );
            return Ok(CallbackOutcome::UnknownOrder);
        };
        log_anomalies(&order, tx);
        let update = payment_update_for(&order, tx);
        let payload = serde_json::from_slice::<serde_json::Value>(payload)
            .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;
        let record = NewPaymentTransaction {
            id: tx.id,
            order_id: order.id,
            success: tx.success,
            pending: tx.pending,
            amount_cents: tx.amount_cents,
            currency: tx.currency.clone(),
            payload,
        };
        let outcome = match self.db.apply_transaction(record, update).await.map_err(WebhookError::database)? {
            ApplyTransactionResult::AlreadyProcessed => {
                debug!("🪝️ Transaction {} was processed by a concurrent delivery", tx.id);
                CallbackOutcome::AlreadyProcessed
            },
            ApplyTransactionResult::Recorded(order) => {
                info!(
                    "🪝️ Transaction {} recorded for order {}. Payment remains {}",
                    tx.id, order.order_number, order.payment_status
                );
                CallbackOutcome::Recorded { order_number: order.order_number }
            },
            ApplyTransactionResult::Applied(order) => {
                info!(
                    "🪝️ Transaction {} applied to order {}. Payment is {}, order is {}",
                    tx.id, order.order_number, order.payment_status, order.status
                );
                self.publish(&order, tx.id).await;
                CallbackOutcome::Applied {
                    order_number: order.order_number,
                    payment_status: order.payment_status,
                    status: order.status,
                }
            },
        };
        Ok(outcome)
    }

    async fn resolve_order(&self, tx: &TransactionObj) -> Result<Option<Order>, WebhookError> {
        let Some(number) = tx.order.merchant_order_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        let order_number = OrderNumber::from(number.to_string());
        self.db.fetch_order_by_number(&order_number).await.map_err(WebhookError::database)
    }

    async fn publish(&self, order: &Order, transaction_id: i64) {
        match order.payment_status {
            PaymentStatusType::Paid => {
                self.producers.publish_order_paid(OrderPaidEvent::new(order.clone(), transaction_id)).await
            },
            PaymentStatusType::Failed => {
                self.producers.publish_payment_failed(PaymentFailedEvent::new(order.clone(), transaction_id)).await
            },
            _ => {},
        }
    }
}

/// What the transaction means for the order, if anything. Still-pending transactions and illegal payment transitions
/// are recorded without touching the order.
fn payment_update_for(order: &Order, tx: &TransactionObj) -> Option<PaymentUpdate> {
    let new_status = payment_status_for(tx.success, tx.pending);
    if new_status == PaymentStatusType::Pending {
        return None;
    }
    match check_payment_transition(order.payment_status, new_status, Actor::Reconciler) {
        Ok(()) => Some(PaymentUpdate::new(new_status, new_status == PaymentStatusType::Paid)),
        Err(e) => {
            warn!("🪝️ Transaction {} for order {} will be recorded but not applied. {e}", tx.id, order.order_number);
            None
        },
    }
}

/// Things an operator should know about, but that do not change how the callback is handled.
fn log_anomalies(order: &Order, tx: &TransactionObj) {
    if let Some(expected) = order.gateway_order_id {
        if expected != tx.order.id {
            warn!(
                "🪝️ Transaction {} names processor order #{}, but order {} is registered as #{expected}",
                tx.id, tx.order.id, order.order_number
            );
        }
    }
    match order.total.to_minor_units() {
        Ok(cents) if cents != tx.amount_cents => warn!(
            "🪝️ Transaction {} is for {} cents, but order {} totals {cents} cents",
            tx.id, tx.amount_cents, order.order_number
        ),
        Err(e) => warn!("🪝️ Could not compare the amount of transaction {}. {e}", tx.id),
        _ => {},
    }
    if !tx.currency.eq_ignore_ascii_case(&order.currency) {
        warn!(
            "🪝️ Transaction {} is in {}, but order {} is in {}",
            tx.id, tx.currency, order.order_number, order.currency
        );
    }
    if order.status == OrderStatusType::Cancelled && tx.success && !tx.pending {
        error!(
            "🪝️ Transaction {} paid for order {}, which has been cancelled. The customer needs a manual refund.",
            tx.id, order.order_number
        );
    }
}

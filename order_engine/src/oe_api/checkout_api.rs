use std::{fmt::Debug, sync::Arc, time::Duration};

use log::*;
use paymob_tools::{BillingData, PaymentKeyRequest, RemoteOrderRequest};

use crate::{
    db_types::{Address, Caller, Order, OrderStatusType, PaymentStatusType},
    oe_api::{errors::CheckoutError, order_objects::PaymentSession, payment_processor::PaymentProcessor},
    permissions::{Action, PermissionTable, Resource},
    traits::OrderManagement,
};

pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(30);

/// `CheckoutApi` turns a pending order into a payment session on the processor's hosted card form.
///
/// The handshake is three remote calls (authenticate, register the order, request a payment key). None of them is
/// retried, and the whole handshake runs under a single timeout. The only local write is storing the processor's
/// order id on the order, and that only happens after the handshake has fully succeeded.
pub struct CheckoutApi<B, P> {
    db: B,
    processor: P,
    permissions: Arc<PermissionTable>,
    gateway_timeout: Duration,
    allow_placeholder_billing: bool,
}

impl<B, P> Debug for CheckoutApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi")
    }
}

impl<B, P> CheckoutApi<B, P> {
    pub fn new(db: B, processor: P) -> Self {
        Self {
            db,
            processor,
            permissions: Arc::new(PermissionTable::default()),
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
            allow_placeholder_billing: true,
        }
    }

    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }

    /// When disabled, callers must supply billing data.
    pub fn with_placeholder_billing(mut self, allow: bool) -> Self {
        self.allow_placeholder_billing = allow;
        self
    }

    pub fn with_permissions(mut self, permissions: Arc<PermissionTable>) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }
}

impl<B, P> CheckoutApi<B, P>
where
    B: OrderManagement,
    P: PaymentProcessor,
{
    /// Obtains a payment key for the order.
    ///
    /// The order must belong to the caller (staff and admins may check out any order), and both its status and its
    /// payment status must still be `pending`. If an earlier checkout already registered the order with the
    /// processor, that registration is reused.
    ///
    /// Any processor failure, including the timeout, is reported as [`CheckoutError::PaymentInitiationFailed`] and
    /// leaves the order exactly as it was.
    pub async fn request_payment_key(
        &self,
        caller: &Caller,
        order_id: i64,
        billing: Option<BillingData>,
    ) -> Result<PaymentSession, CheckoutError> {
        let order = self
            .db
            .fetch_order_by_id(order_id)
            .await
            .map_err(CheckoutError::database)?
            .ok_or(CheckoutError::OrderNotFound(order_id))?;
        let may_checkout = self.permissions.is_allowed_on_order(
            caller,
            &order,
            Resource::Payment,
            Action::CheckoutOwn,
            Action::CheckoutAny,
        );
        if !may_checkout {
            return Err(CheckoutError::Forbidden(format!(
                "{} may not check out order {}",
                caller.user_id, order.order_number
            )));
        }
        if order.status != OrderStatusType::Pending || order.payment_status != PaymentStatusType::Pending {
            return Err(CheckoutError::InvalidOrderState {
                order_number: order.order_number.to_string(),
                status: order.status,
                payment_status: order.payment_status,
            });
        }
        let billing = self.billing_data_for(&order, billing)?;
        let amount_cents = order.total.to_minor_units().map_err(|e| {
            error!("💳️ Order {} has a total that cannot be charged: {e}", order.order_number);
            CheckoutError::PaymentInitiationFailed
        })?;
        let handshake = self.handshake(&order, amount_cents, billing);
        let (remote_order_id, payment_key, newly_registered) =
            match tokio::time::timeout(self.gateway_timeout, handshake).await {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => {
                    error!("💳️ Payment handshake for order {} failed. {e}", order.order_number);
                    return Err(CheckoutError::PaymentInitiationFailed);
                },
                Err(_) => {
                    error!(
                        "💳️ Payment handshake for order {} timed out after {:?}",
                        order.order_number, self.gateway_timeout
                    );
                    return Err(CheckoutError::PaymentInitiationFailed);
                },
            };
        if newly_registered {
            self.db
                .set_gateway_ids(order.id, remote_order_id, self.processor.integration_id())
                .await
                .map_err(CheckoutError::database)?;
        }
        let checkout_url = self.processor.checkout_url(&payment_key);
        let signature = self.processor.session_signature(remote_order_id, &payment_key).map_err(|e| {
            error!("💳️ Could not sign the payment session for order {}. {e}", order.order_number);
            CheckoutError::PaymentInitiationFailed
        })?;
        info!("💳️ Payment session issued for order {} (processor order #{remote_order_id})", order.order_number);
        Ok(PaymentSession {
            order_number: order.order_number,
            remote_order_id,
            payment_key,
            checkout_url,
            signature,
        })
    }

    /// The three remote calls. Returns the processor's order id, the payment key and whether the order was
    /// registered by this call.
    async fn handshake(
        &self,
        order: &Order,
        amount_cents: i64,
        billing_data: BillingData,
    ) -> Result<(i64, String, bool), P::Error> {
        let token = self.processor.authenticate().await?;
        let (remote_order_id, newly_registered) = match order.gateway_order_id {
            Some(id) => {
                debug!("💳️ Order {} is already registered as processor order #{id}", order.order_number);
                (id, false)
            },
            None => {
                let request =
                    RemoteOrderRequest::new(order.order_number.as_str(), amount_cents, order.currency.as_str());
                (self.processor.register_order(&token, &request).await?, true)
            },
        };
        let request = PaymentKeyRequest {
            amount_cents,
            expiration: self.processor.payment_key_expiry(),
            order_id: remote_order_id,
            billing_data,
            currency: order.currency.clone(),
            integration_id: self.processor.integration_id(),
            lock_order_when_paid: true,
        };
        let payment_key = self.processor.request_payment_key(&token, &request).await?;
        Ok((remote_order_id, payment_key, newly_registered))
    }

    fn billing_data_for(&self, order: &Order, supplied: Option<BillingData>) -> Result<BillingData, CheckoutError> {
        match supplied {
            Some(billing) => Ok(billing.with_placeholders()),
            None if self.allow_placeholder_billing => {
                warn!(
                    "💳️ No billing data supplied for order {}. Falling back to the order's address and placeholder \
                     values",
                    order.order_number
                );
                let address = order.billing_address.as_ref().unwrap_or(&order.shipping_address);
                Ok(billing_from_address(address))
            },
            None => Err(CheckoutError::ValidationError("Billing data is required".into())),
        }
    }
}

/// Fills what it can from an address. Everything else gets Paymob's placeholder value.
pub fn billing_from_address(address: &Address) -> BillingData {
    let mut names = address.recipient.split_whitespace();
    let first_name = names.next().unwrap_or_default().to_string();
    let last_name = names.collect::<Vec<_>>().join(" ");
    BillingData {
        first_name,
        last_name,
        email: String::default(),
        phone_number: address.phone.clone().unwrap_or_default(),
        apartment: String::default(),
        floor: String::default(),
        street: address.street.clone(),
        building: String::default(),
        shipping_method: String::default(),
        postal_code: address.postal_code.clone().unwrap_or_default(),
        city: address.city.clone(),
        state: address.state.clone().unwrap_or_default(),
        country: address.country.clone(),
    }
    .with_placeholders()
}

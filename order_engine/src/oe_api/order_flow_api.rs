use std::{collections::HashSet, fmt::Debug, sync::Arc};

use chrono::{Duration, Utc};
use log::*;

use crate::{
    db_types::{merge_item_quantities, Caller, NewOrder, Order, OrderNumber, OrderStatusType},
    events::{EventProducers, OrderCancelledEvent, OrderCreatedEvent},
    helpers::generate_order_number,
    oe_api::{errors::OrderFlowError, order_objects::CreateOrderRequest},
    permissions::{Action, PermissionTable, Resource},
    pricing::{PricingError, PricingPolicy},
    state_machine::{check_status_transition, Actor},
    traits::{CatalogManagement, InsertOrderResult, OrderManagement, StatusUpdateResult},
};

/// How many fresh order numbers to try before giving up on a collision.
pub const MAX_ORDER_NUMBER_ATTEMPTS: usize = 3;

/// The operator name recorded against changes made by background jobs.
pub const SYSTEM_OPERATOR: &str = "system";

/// `OrderFlowApi` is the primary API for building orders and moving them through their lifecycle.
///
/// | Operation          | Who                          | Effect                                         |
/// |--------------------|------------------------------|------------------------------------------------|
/// | `create_order`     | anyone with `order:create`   | price, reserve stock, persist as `pending`     |
/// | `cancel_order`     | owner, or staff/admin        | `pending` → `cancelled`, every line restocked  |
/// | `update_status`    | staff/admin                  | `processing` → `shipped` → `delivered`          |
/// | `expire_unpaid`    | the system                   | cancels stale unpaid orders                    |
///
/// Payment status is never changed here. That belongs to the webhook reconciler.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
    pricing: PricingPolicy,
    permissions: Arc<PermissionTable>,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, pricing: PricingPolicy::default(), permissions: Arc::new(PermissionTable::default()) }
    }

    pub fn with_pricing(mut self, pricing: PricingPolicy) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_permissions(mut self, permissions: Arc<PermissionTable>) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn pricing(&self) -> &PricingPolicy {
        &self.pricing
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    /// The actor a caller acts as on `order`, if the permission table lets them act on it at all.
    fn actor_for(&self, caller: &Caller, order: &Order, own: Action, any: Action) -> Result<Actor, OrderFlowError> {
        if !self.permissions.is_allowed_on_order(caller, order, Resource::Order, own, any) {
            return Err(OrderFlowError::Forbidden(format!(
                "{} may not {own} order {}",
                caller.user_id, order.order_number
            )));
        }
        if self.permissions.is_allowed(caller.role, Resource::Order, any) {
            Ok(Actor::Privileged)
        } else {
            Ok(Actor::Owner)
        }
    }
}

impl<B> OrderFlowApi<B>
where B: CatalogManagement + OrderManagement
{
    /// Builds, prices and persists a new order for the caller.
    ///
    /// 1. The request is validated and repeated item ids are merged.
    /// 2. The items are fetched in one batch. Unknown ids fail with [`OrderFlowError::ItemsNotFound`].
    /// 3. Every line is checked against current stock, failing with [`OrderFlowError::InsufficientStock`].
    /// 4. The lines are priced from the catalog and frozen into the order.
    /// 5. Stock is reserved and the order inserted in one storage transaction. If another order took the stock in
    ///    the meantime, nothing is written and `InsufficientStock` is returned.
    ///
    /// Nothing is mutated on any failure path.
    pub async fn create_order(&self, caller: &Caller, request: CreateOrderRequest) -> Result<Order, OrderFlowError> {
        if !self.permissions.is_allowed(caller.role, Resource::Order, Action::Create) {
            return Err(OrderFlowError::Forbidden(format!("{} may not place orders", caller.role)));
        }
        validate_request(&request)?;
        let lines = merge_item_quantities(&request.items);
        let ids = lines.iter().map(|l| l.item_id).collect::<Vec<_>>();
        let items = self.db.fetch_items(&ids).await.map_err(OrderFlowError::database)?;
        let found = items.iter().map(|i| i.id).collect::<HashSet<_>>();
        let missing = ids.iter().filter(|id| !found.contains(id)).copied().collect::<Vec<_>>();
        if !missing.is_empty() {
            debug!("🧾️ Order request from {} names unknown items {missing:?}", caller.user_id);
            return Err(OrderFlowError::ItemsNotFound(missing));
        }
        for line in &lines {
            let supplied = items.iter().any(|i| i.id == line.item_id && i.can_supply(line.quantity));
            if !supplied {
                debug!("🧾️ Item {} cannot supply {} units for {}", line.item_id, line.quantity, caller.user_id);
                return Err(OrderFlowError::InsufficientStock { item_id: line.item_id });
            }
        }
        let priced = self.pricing.price(&lines, &items).map_err(|e| match e {
            PricingError::MissingItem(id) => OrderFlowError::ItemsNotFound(vec![id]),
            PricingError::Overflow => OrderFlowError::ValidationError(e.to_string()),
        })?;
        for attempt in 1..=MAX_ORDER_NUMBER_ATTEMPTS {
            let order = NewOrder {
                order_number: generate_order_number(Utc::now()),
                user_id: caller.user_id.clone(),
                items: priced.lines.clone(),
                subtotal: priced.subtotal,
                shipping: priced.shipping,
                tax: priced.tax,
                discount: priced.discount,
                total: priced.total,
                currency: self.pricing.currency.clone(),
                shipping_address: request.shipping_address.clone(),
                billing_address: request.billing_address.clone(),
            };
            match self.db.insert_order_with_reservation(order).await.map_err(OrderFlowError::database)? {
                InsertOrderResult::Inserted(order) => {
                    info!(
                        "🧾️ Order {} created for {} with {} lines. Total {} {}",
                        order.order_number,
                        order.user_id,
                        order.items.len(),
                        order.total,
                        order.currency
                    );
                    self.producers.publish_order_created(OrderCreatedEvent::new(order.clone())).await;
                    return Ok(order);
                },
                InsertOrderResult::Unavailable { item_id } => {
                    debug!("🧾️ Item {item_id} sold out while the order for {} was being placed", caller.user_id);
                    return Err(OrderFlowError::InsufficientStock { item_id });
                },
                InsertOrderResult::DuplicateOrderNumber => {
                    warn!("🧾️ Order number collision on attempt {attempt}. Trying again with a new number");
                },
            }
        }
        error!("🧾️ Could not find a free order number in {MAX_ORDER_NUMBER_ATTEMPTS} attempts");
        Err(OrderFlowError::OrderNumberExhausted(MAX_ORDER_NUMBER_ATTEMPTS))
    }

    pub async fn order_by_id(&self, caller: &Caller, id: i64) -> Result<Order, OrderFlowError> {
        let order = self.fetch_order(id).await?;
        self.actor_for(caller, &order, Action::ReadOwn, Action::ReadAny)?;
        Ok(order)
    }

    pub async fn order_by_number(&self, caller: &Caller, order_number: &OrderNumber) -> Result<Order, OrderFlowError> {
        let order = self
            .db
            .fetch_order_by_number(order_number)
            .await
            .map_err(OrderFlowError::database)?
            .ok_or_else(|| OrderFlowError::OrderNotFound(order_number.to_string()))?;
        self.actor_for(caller, &order, Action::ReadOwn, Action::ReadAny)?;
        Ok(order)
    }

    /// The caller's own orders, newest first.
    pub async fn orders_for_caller(&self, caller: &Caller) -> Result<Vec<Order>, OrderFlowError> {
        if !self.permissions.is_allowed(caller.role, Resource::Order, Action::ReadOwn) {
            return Err(OrderFlowError::Forbidden(format!("{} may not view orders", caller.role)));
        }
        self.db.fetch_orders_for_user(&caller.user_id).await.map_err(OrderFlowError::database)
    }

    /// Cancels a `pending` order and returns every reserved line to stock, atomically.
    ///
    /// Orders that have moved past `pending` (including paid orders now in `processing`) cannot be cancelled here.
    pub async fn cancel_order(&self, caller: &Caller, id: i64) -> Result<Order, OrderFlowError> {
        let order = self.fetch_order(id).await?;
        let actor = self.actor_for(caller, &order, Action::CancelOwn, Action::CancelAny)?;
        check_status_transition(order.status, OrderStatusType::Cancelled, actor)?;
        self.cancel_checked(order, caller.user_id.as_str()).await
    }

    /// Moves an order along the fulfilment path. Only staff and admins may do this.
    ///
    /// A request to move to `cancelled` goes through [`Self::cancel_order`], so stock is returned.
    pub async fn update_status(&self, caller: &Caller, id: i64, to: OrderStatusType) -> Result<Order, OrderFlowError> {
        if !self.permissions.is_allowed(caller.role, Resource::Order, Action::UpdateStatus) {
            return Err(OrderFlowError::Forbidden(format!("{} may not change order status", caller.role)));
        }
        if to == OrderStatusType::Cancelled {
            return self.cancel_order(caller, id).await;
        }
        let order = self.fetch_order(id).await?;
        check_status_transition(order.status, to, Actor::Privileged)?;
        match self.db.update_order_status(id, order.status, to).await.map_err(OrderFlowError::database)? {
            StatusUpdateResult::Updated(order) => {
                info!("🧾️ {} moved order {} to {to}", caller.user_id, order.order_number);
                Ok(order)
            },
            StatusUpdateResult::Stale(current) => Err(OrderFlowError::ConcurrentModification {
                order_number: current.order_number.to_string(),
                status: current.status,
            }),
            StatusUpdateResult::NotFound => Err(OrderFlowError::OrderNotFound(id.to_string())),
        }
    }

    /// Cancels every order that has been waiting for payment for at least `older_than`. Returns the orders that were
    /// cancelled.
    ///
    /// A failure on one order is logged and the rest are still processed.
    pub async fn expire_unpaid_orders(&self, older_than: Duration) -> Result<Vec<Order>, OrderFlowError> {
        let stale = self.db.fetch_stale_unpaid_orders(older_than).await.map_err(OrderFlowError::database)?;
        trace!("🧾️ {} unpaid orders are older than {older_than}", stale.len());
        let mut expired = Vec::with_capacity(stale.len());
        for order in stale {
            let order_number = order.order_number.clone();
            if let Err(e) = check_status_transition(order.status, OrderStatusType::Cancelled, Actor::System) {
                warn!("🧾️ Skipping expiry of {order_number}. {e}");
                continue;
            }
            match self.cancel_checked(order, SYSTEM_OPERATOR).await {
                Ok(order) => expired.push(order),
                Err(OrderFlowError::ConcurrentModification { status, .. }) => {
                    debug!("🧾️ Order {order_number} became {status} before it could be expired");
                },
                Err(e) => error!("🧾️ Could not expire order {order_number}. {e}"),
            }
        }
        Ok(expired)
    }

    async fn fetch_order(&self, id: i64) -> Result<Order, OrderFlowError> {
        self.db
            .fetch_order_by_id(id)
            .await
            .map_err(OrderFlowError::database)?
            .ok_or_else(|| OrderFlowError::OrderNotFound(id.to_string()))
    }

    /// The transition has already been checked. This does the compare-and-set write and the restock.
    async fn cancel_checked(&self, order: Order, operator: &str) -> Result<Order, OrderFlowError> {
        match self.db.cancel_order(order.id, operator).await.map_err(OrderFlowError::database)? {
            StatusUpdateResult::Updated(order) => {
                info!("🧾️ Order {} cancelled by {operator}. {} lines restocked", order.order_number, order.items.len());
                self.producers.publish_order_cancelled(OrderCancelledEvent::new(order.clone(), operator)).await;
                Ok(order)
            },
            StatusUpdateResult::Stale(current) => Err(OrderFlowError::ConcurrentModification {
                order_number: current.order_number.to_string(),
                status: current.status,
            }),
            StatusUpdateResult::NotFound => Err(OrderFlowError::OrderNotFound(order.id.to_string())),
        }
    }
}

fn validate_request(request: &CreateOrderRequest) -> Result<(), OrderFlowError> {
    if request.items.is_empty() {
        return Err(OrderFlowError::ValidationError("An order must contain at least one item".into()));
    }
    if let Some(line) = request.items.iter().find(|l| l.quantity <= 0) {
        return Err(OrderFlowError::ValidationError(format!(
            "Quantity for item {} must be strictly positive, not {}",
            line.item_id, line.quantity
        )));
    }
    if !request.shipping_address.is_complete() {
        return Err(OrderFlowError::ValidationError(
            "A shipping address with a street, city and country is required".into(),
        ));
    }
    if request.billing_address.as_ref().is_some_and(|a| !a.is_complete()) {
        return Err(OrderFlowError::ValidationError("The billing address is incomplete".into()));
    }
    Ok(())
}

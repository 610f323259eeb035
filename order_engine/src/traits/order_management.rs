use chrono::Duration;

use crate::{
    db_types::{NewOrder, Order, OrderNumber, OrderStatusType, UserId},
    traits::{InsertOrderResult, StatusUpdateResult, StorageBackend},
};

/// Order persistence.
///
/// Status changes are all compare-and-set: the caller names the status it checked, and the write only happens if the
/// order is still in that status. Deciding *whether* a transition is legal is the job of the
/// [`state_machine`](crate::state_machine), not the backend.
#[allow(async_fn_in_trait)]
pub trait OrderManagement: StorageBackend {
    /// In a single transaction, reserves the stock for every line of the order and then inserts it with
    /// `status = pending` and `payment_status = pending`.
    ///
    /// If a line cannot be reserved, or the order number is already taken, the transaction is rolled back and
    /// nothing is written.
    async fn insert_order_with_reservation(&self, order: NewOrder) -> Result<InsertOrderResult, Self::Error>;

    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, Self::Error>;

    async fn fetch_order_by_number(&self, order_number: &OrderNumber) -> Result<Option<Order>, Self::Error>;

    /// All orders for a user, newest first.
    async fn fetch_orders_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, Self::Error>;

    /// In a single transaction, moves the order from `pending` to `cancelled` and returns every reserved line to
    /// stock.
    ///
    /// `operator` is recorded against the stock adjustments.
    async fn cancel_order(&self, id: i64, operator: &str) -> Result<StatusUpdateResult, Self::Error>;

    /// Moves the order from `from` to `to`, if it is still in `from`. Does not touch stock, so it must not be used
    /// for cancellations.
    async fn update_order_status(
        &self,
        id: i64,
        from: OrderStatusType,
        to: OrderStatusType,
    ) -> Result<StatusUpdateResult, Self::Error>;

    /// Stores the gateway correlation ids on the order. These can be set once. Writing the same values again is a
    /// no-op; writing different ones is an error.
    async fn set_gateway_ids(
        &self,
        id: i64,
        gateway_order_id: i64,
        gateway_integration_id: i64,
    ) -> Result<Order, Self::Error>;

    /// Orders still waiting for payment that were created at least `older_than` ago.
    async fn fetch_stale_unpaid_orders(&self, older_than: Duration) -> Result<Vec<Order>, Self::Error>;
}

//! `SqliteDatabase` is the concrete SQLite backend for the order engine.
//!
//! It implements every trait in [`crate::traits`]. Multi-row changes each run in one transaction opened here; the
//! functions in [`super::db`] do the individual statements.
use std::fmt::Debug;

use chrono::Duration;
use log::*;
use sqlx::SqlitePool;

use super::{
    db::{adjustments, db_url, items, new_pool, orders, transactions},
    SqliteDatabaseError,
};
use crate::{
    db_types::{
        InventoryAdjustment,
        Item,
        ItemQuantity,
        ItemUpdate,
        NewItem,
        NewOrder,
        NewPaymentTransaction,
        Order,
        OrderNumber,
        OrderStatusType,
        PaymentTransaction,
        UserId,
    },
    traits::{
        ApplyTransactionResult,
        CatalogManagement,
        InsertOrderResult,
        InventoryManagement,
        OrderManagement,
        PaymentLedger,
        PaymentUpdate,
        ReservationResult,
        StatusUpdateResult,
        StorageBackend,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl StorageBackend for SqliteDatabase {
    type Error = SqliteDatabaseError;

    fn url(&self) -> &str {
        self.url.as_str()
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn insert_item(&self, item: NewItem) -> Result<Item, Self::Error> {
        let mut tx = self.pool.begin().await?;
        let item = items::insert_item(item, &mut tx).await?;
        tx.commit().await?;
        Ok(item)
    }

    async fn update_item(&self, item_id: i64, update: ItemUpdate) -> Result<Option<Item>, Self::Error> {
        let mut tx = self.pool.begin().await?;
        let item = items::update_item(item_id, update, &mut tx).await?;
        tx.commit().await?;
        Ok(item)
    }

    async fn fetch_item(&self, item_id: i64) -> Result<Option<Item>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let item = items::fetch_item(item_id, &mut conn).await?;
        Ok(item)
    }

    async fn fetch_items(&self, ids: &[i64]) -> Result<Vec<Item>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let items = items::fetch_items(ids, &mut conn).await?;
        Ok(items)
    }
}

impl InventoryManagement for SqliteDatabase {
    async fn reserve_items(
        &self,
        lines: &[ItemQuantity],
        operator: &str,
        reason: &str,
    ) -> Result<ReservationResult, Self::Error> {
        let mut tx = self.pool.begin().await?;
        let result = items::reserve_lines(lines, operator, reason, &mut tx).await?;
        match result {
            ReservationResult::Reserved => {
                tx.commit().await?;
                debug!("🗃️ Reserved {} lines for {reason}", lines.len());
            },
            ReservationResult::Unavailable { item_id } => {
                tx.rollback().await?;
                debug!("🗃️ Reservation for {reason} rolled back. Item {item_id} is unavailable");
            },
        }
        Ok(result)
    }

    async fn restock_item(
        &self,
        item_id: i64,
        quantity: i64,
        operator: &str,
        reason: &str,
    ) -> Result<Option<Item>, Self::Error> {
        let mut tx = self.pool.begin().await?;
        let item = items::restock(item_id, quantity, operator, reason, &mut tx).await?;
        tx.commit().await?;
        Ok(item)
    }

    async fn fetch_adjustments_for_item(&self, item_id: i64) -> Result<Vec<InventoryAdjustment>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let adjustments = adjustments::fetch_adjustments_for_item(item_id, &mut conn).await?;
        Ok(adjustments)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order_with_reservation(&self, order: NewOrder) -> Result<InsertOrderResult, Self::Error> {
        let mut tx = self.pool.begin().await?;
        let reason = format!("reservation:{}", order.order_number);
        let lines = order.reserved_items();
        let operator = order.user_id.to_string();
        if let ReservationResult::Unavailable { item_id } =
            items::reserve_lines(&lines, &operator, &reason, &mut tx).await?
        {
            tx.rollback().await?;
            return Ok(InsertOrderResult::Unavailable { item_id });
        }
        let order_number = order.order_number.clone();
        match orders::insert_order(order, &mut tx).await? {
            Some(order) => {
                tx.commit().await?;
                Ok(InsertOrderResult::Inserted(order))
            },
            None => {
                tx.rollback().await?;
                warn!("🗃️ Order number {order_number} is already in use. The reservation has been rolled back");
                Ok(InsertOrderResult::DuplicateOrderNumber)
            },
        }
    }

    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_id(id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_number(&self, order_number: &OrderNumber) -> Result<Option<Order>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_number(order_number, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_orders_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_user(user_id, &mut conn).await?;
        Ok(orders)
    }

    async fn cancel_order(&self, id: i64, operator: &str) -> Result<StatusUpdateResult, Self::Error> {
        let mut tx = self.pool.begin().await?;
        let cancelled = orders::update_status(id, OrderStatusType::Pending, OrderStatusType::Cancelled, &mut tx).await?;
        let Some(order) = cancelled else {
            let current = orders::fetch_order_by_id(id, &mut tx).await?;
            tx.rollback().await?;
            return Ok(current.map(StatusUpdateResult::Stale).unwrap_or(StatusUpdateResult::NotFound));
        };
        let reason = format!("cancellation:{}", order.order_number);
        for line in order.reserved_items() {
            if items::restock(line.item_id, line.quantity, operator, &reason, &mut tx).await?.is_none() {
                error!(
                    "🗃️ Item {} on order {} no longer exists, so {} units could not be returned to stock",
                    line.item_id, order.order_number, line.quantity
                );
            }
        }
        tx.commit().await?;
        debug!("🗃️ Order {} cancelled and {} lines restocked", order.order_number, order.items.len());
        Ok(StatusUpdateResult::Updated(order))
    }

    async fn update_order_status(
        &self,
        id: i64,
        from: OrderStatusType,
        to: OrderStatusType,
    ) -> Result<StatusUpdateResult, Self::Error> {
        let mut tx = self.pool.begin().await?;
        let result = match orders::update_status(id, from, to, &mut tx).await? {
            Some(order) => StatusUpdateResult::Updated(order),
            None => match orders::fetch_order_by_id(id, &mut tx).await? {
                Some(order) => StatusUpdateResult::Stale(order),
                None => StatusUpdateResult::NotFound,
            },
        };
        tx.commit().await?;
        Ok(result)
    }

    async fn set_gateway_ids(
        &self,
        id: i64,
        gateway_order_id: i64,
        gateway_integration_id: i64,
    ) -> Result<Order, Self::Error> {
        let mut tx = self.pool.begin().await?;
        let updated = orders::set_gateway_ids(id, gateway_order_id, gateway_integration_id, &mut tx).await?;
        let result = match updated {
            Some(order) => Ok(order),
            None => match orders::fetch_order_by_id(id, &mut tx).await? {
                Some(_) => Err(SqliteDatabaseError::GatewayIdsAlreadySet(id)),
                None => Err(SqliteDatabaseError::OrderNotFound(id)),
            },
        };
        tx.commit().await?;
        result
    }

    async fn fetch_stale_unpaid_orders(&self, older_than: Duration) -> Result<Vec<Order>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_stale_unpaid_orders(older_than, &mut conn).await?;
        Ok(orders)
    }
}

impl PaymentLedger for SqliteDatabase {
    async fn fetch_transaction(&self, id: i64) -> Result<Option<PaymentTransaction>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let tx = transactions::fetch_transaction(id, &mut conn).await?;
        Ok(tx)
    }

    async fn fetch_transactions_for_order(&self, order_id: i64) -> Result<Vec<PaymentTransaction>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let txs = transactions::fetch_transactions_for_order(order_id, &mut conn).await?;
        Ok(txs)
    }

    async fn apply_transaction(
        &self,
        transaction: NewPaymentTransaction,
        update: Option<PaymentUpdate>,
    ) -> Result<ApplyTransactionResult, Self::Error> {
        let mut tx = self.pool.begin().await?;
        let txid = transaction.id;
        let order_id = transaction.order_id;
        if !transactions::insert_transaction(transaction, &mut tx).await? {
            tx.rollback().await?;
            debug!("🗃️ Gateway transaction {txid} is already in the ledger");
            return Ok(ApplyTransactionResult::AlreadyProcessed);
        }
        let applied = match update {
            Some(update) => orders::apply_payment_update(order_id, update, &mut tx).await?,
            None => None,
        };
        let result = match applied {
            Some(order) => {
                debug!(
                    "🗃️ Transaction {txid} applied to order {}. Payment is {}, status is {}",
                    order.order_number, order.payment_status, order.status
                );
                ApplyTransactionResult::Applied(order)
            },
            None => {
                let order = orders::fetch_order_by_id(order_id, &mut tx)
                    .await?
                    .ok_or(SqliteDatabaseError::OrderNotFound(order_id))?;
                ApplyTransactionResult::Recorded(order)
            },
        };
        tx.commit().await?;
        Ok(result)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using `OE_DATABASE_URL` or the default URL.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date. Safe to call on every start-up.
    pub async fn migrate(&self) -> Result<(), SqliteDatabaseError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await
    }
}

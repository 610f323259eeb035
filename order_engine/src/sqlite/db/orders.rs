use chrono::Duration;
use log::debug;
use sqlx::{types::Json, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderNumber, OrderStatusType, UserId},
    traits::PaymentUpdate,
};

/// Inserts a new order with `status` and `payment_status` both `pending`. Returns `None`, having written nothing, if
/// the order number is already taken.
///
/// This does not reserve stock. See [`super::items::reserve_lines`].
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order: Option<Order> = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_number,
                user_id,
                items,
                subtotal,
                shipping,
                tax,
                discount,
                total,
                currency,
                shipping_address,
                billing_address
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (order_number) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(order.order_number)
    .bind(order.user_id)
    .bind(Json(order.items))
    .bind(order.subtotal)
    .bind(order.shipping)
    .bind(order.tax)
    .bind(order.discount)
    .bind(order.total)
    .bind(order.currency)
    .bind(Json(order.shipping_address))
    .bind(order.billing_address.map(Json))
    .fetch_optional(conn)
    .await?;
    if let Some(o) = &order {
        debug!("🗃️ Order {} inserted with id {}", o.order_number, o.id);
    }
    Ok(order)
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_by_number(
    order_number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE order_number = $1")
        .bind(order_number.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_orders_for_user(user_id: &UserId, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(user_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

/// Compare-and-set on `status`. Returns `None` if the order does not exist or is no longer in `from`.
pub async fn update_status(
    id: i64,
    from: OrderStatusType,
    to: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order: Option<Order> = sqlx::query_as(
        r#"
            UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND status = $3
            RETURNING *;
        "#,
    )
    .bind(to)
    .bind(id)
    .bind(from)
    .fetch_optional(conn)
    .await?;
    if order.is_some() {
        debug!("🗃️ Order #{id} moved from {from} to {to}");
    }
    Ok(order)
}

/// Sets the gateway correlation ids if they are unset, or already hold exactly these values. Returns `None` if the
/// order does not exist or is linked to something else.
pub async fn set_gateway_ids(
    id: i64,
    gateway_order_id: i64,
    gateway_integration_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET gateway_order_id = $1, gateway_integration_id = $2, updated_at = CURRENT_TIMESTAMP
            WHERE id = $3
              AND (gateway_order_id IS NULL OR gateway_order_id = $1)
              AND (gateway_integration_id IS NULL OR gateway_integration_id = $2)
            RETURNING *;
        "#,
    )
    .bind(gateway_order_id)
    .bind(gateway_integration_id)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Applies a payment result to an order whose payment is still `pending`. Returns `None` if the payment status had
/// already moved on.
pub async fn apply_payment_update(
    id: i64,
    update: PaymentUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET
                payment_status = $1,
                status = CASE WHEN $2 AND status = 'pending' THEN 'processing' ELSE status END,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $3 AND payment_status = 'pending'
            RETURNING *;
        "#,
    )
    .bind(update.payment_status)
    .bind(update.advance_status)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Orders that are still `pending` and unpaid, created at least `older_than` ago. Oldest first.
pub async fn fetch_stale_unpaid_orders(
    older_than: Duration,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let modifier = format!("-{} seconds", older_than.num_seconds());
    let orders = sqlx::query_as(
        r#"
            SELECT * FROM orders
            WHERE status = 'pending' AND payment_status = 'pending' AND created_at <= datetime('now', $1)
            ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(modifier)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}

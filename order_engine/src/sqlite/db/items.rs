use log::{debug, trace};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use super::adjustments;
use crate::{
    db_types::{Item, ItemQuantity, ItemUpdate, NewItem},
    sqlite::SqliteDatabaseError,
    traits::ReservationResult,
};

pub async fn insert_item(item: NewItem, conn: &mut SqliteConnection) -> Result<Item, SqliteDatabaseError> {
    let sku = item.sku.clone();
    let item: Item = sqlx::query_as(
        r#"
            INSERT INTO items (sku, name, unit_price, quantity, is_active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(item.sku)
    .bind(item.name)
    .bind(item.unit_price)
    .bind(item.quantity)
    .bind(item.is_active)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => SqliteDatabaseError::DuplicateSku(sku),
        _ => SqliteDatabaseError::from(e),
    })?;
    debug!("🗃️ Item {} [{}] created with id {}", item.sku, item.name, item.id);
    Ok(item)
}

pub async fn update_item(
    item_id: i64,
    update: ItemUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Item>, sqlx::Error> {
    if update.is_empty() {
        return fetch_item(item_id, conn).await;
    }
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE items SET ");
    let mut set_clause = builder.separated(", ");
    if let Some(name) = update.name {
        set_clause.push("name = ");
        set_clause.push_bind_unseparated(name);
    }
    if let Some(price) = update.unit_price {
        set_clause.push("unit_price = ");
        set_clause.push_bind_unseparated(price);
    }
    if let Some(active) = update.is_active {
        set_clause.push("is_active = ");
        set_clause.push_bind_unseparated(active);
    }
    set_clause.push("updated_at = CURRENT_TIMESTAMP");
    builder.push(" WHERE id = ");
    builder.push_bind(item_id);
    builder.push(" RETURNING *");
    trace!("🗃️ Executing query: {}", builder.sql());
    let item = builder.build_query_as::<Item>().fetch_optional(conn).await?;
    Ok(item)
}

pub async fn fetch_item(item_id: i64, conn: &mut SqliteConnection) -> Result<Option<Item>, sqlx::Error> {
    let item = sqlx::query_as("SELECT * FROM items WHERE id = $1").bind(item_id).fetch_optional(conn).await?;
    Ok(item)
}

/// Fetches every item in `ids` in one query. Unknown ids are skipped.
pub async fn fetch_items(ids: &[i64], conn: &mut SqliteConnection) -> Result<Vec<Item>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM items WHERE id IN (");
    let mut in_clause = builder.separated(", ");
    for id in ids {
        in_clause.push_bind(*id);
    }
    builder.push(") ORDER BY id ASC");
    let items = builder.build_query_as::<Item>().fetch_all(conn).await?;
    Ok(items)
}

/// The conditional decrement. Returns `false`, having changed nothing, if the item is missing, inactive or short of
/// stock.
async fn decrement_stock(line: &ItemQuantity, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE items SET quantity = quantity - $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND is_active = 1 AND quantity >= $1
        "#,
    )
    .bind(line.quantity)
    .bind(line.item_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Reserves every line, recording an adjustment for each. This is NOT atomic on its own. Run it inside a transaction
/// and roll back if the result is [`ReservationResult::Unavailable`], otherwise earlier lines stay decremented.
pub async fn reserve_lines(
    lines: &[ItemQuantity],
    operator: &str,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<ReservationResult, SqliteDatabaseError> {
    for line in lines {
        if line.quantity <= 0 {
            return Err(SqliteDatabaseError::InvalidQuantity(line.quantity));
        }
        if !decrement_stock(line, conn).await? {
            trace!("🗃️ Item {} cannot supply {} units", line.item_id, line.quantity);
            return Ok(ReservationResult::Unavailable { item_id: line.item_id });
        }
        adjustments::record_adjustment(line.item_id, -line.quantity, operator, reason, conn).await?;
    }
    Ok(ReservationResult::Reserved)
}

/// Adds `quantity` units back to an item's stock and records the adjustment. Returns `None` if the item does not
/// exist.
pub async fn restock(
    item_id: i64,
    quantity: i64,
    operator: &str,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Item>, SqliteDatabaseError> {
    if quantity <= 0 {
        return Err(SqliteDatabaseError::InvalidQuantity(quantity));
    }
    let item: Option<Item> = sqlx::query_as(
        r#"
            UPDATE items SET quantity = quantity + $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2
            RETURNING *;
        "#,
    )
    .bind(quantity)
    .bind(item_id)
    .fetch_optional(&mut *conn)
    .await?;
    if item.is_some() {
        adjustments::record_adjustment(item_id, quantity, operator, reason, conn).await?;
    }
    Ok(item)
}

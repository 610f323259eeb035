use sqlx::SqliteConnection;

use crate::db_types::InventoryAdjustment;

/// Appends an entry to the stock audit trail. `delta` is negative for reservations.
pub async fn record_adjustment(
    item_id: i64,
    delta: i64,
    operator: &str,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO inventory_adjustments (item_id, delta, operator, reason) VALUES ($1, $2, $3, $4)")
        .bind(item_id)
        .bind(delta)
        .bind(operator)
        .bind(reason)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn fetch_adjustments_for_item(
    item_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<InventoryAdjustment>, sqlx::Error> {
    let adjustments = sqlx::query_as("SELECT * FROM inventory_adjustments WHERE item_id = $1 ORDER BY id ASC")
        .bind(item_id)
        .fetch_all(conn)
        .await?;
    Ok(adjustments)
}

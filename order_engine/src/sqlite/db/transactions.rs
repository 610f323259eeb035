use log::debug;
use sqlx::{types::Json, SqliteConnection};

use crate::db_types::{NewPaymentTransaction, PaymentTransaction};

/// Appends a transaction to the ledger. Returns `false`, having written nothing, if the transaction id is already
/// there.
pub async fn insert_transaction(
    transaction: NewPaymentTransaction,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let id = transaction.id;
    let result = sqlx::query(
        r#"
            INSERT INTO payment_transactions (id, order_id, success, pending, amount_cents, currency, payload)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(transaction.id)
    .bind(transaction.order_id)
    .bind(transaction.success)
    .bind(transaction.pending)
    .bind(transaction.amount_cents)
    .bind(transaction.currency)
    .bind(Json(transaction.payload))
    .execute(conn)
    .await?;
    let inserted = result.rows_affected() == 1;
    if inserted {
        debug!("🗃️ Gateway transaction {id} added to the ledger");
    }
    Ok(inserted)
}

pub async fn fetch_transaction(id: i64, conn: &mut SqliteConnection) -> Result<Option<PaymentTransaction>, sqlx::Error> {
    let tx = sqlx::query_as("SELECT * FROM payment_transactions WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(tx)
}

pub async fn fetch_transactions_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentTransaction>, sqlx::Error> {
    let txs = sqlx::query_as("SELECT * FROM payment_transactions WHERE order_id = $1 ORDER BY created_at ASC, id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(txs)
}

use chrono::Duration;
use log::*;
use order_engine::{db_types::Order, events::EventProducers, OrderFlowApi, SqliteDatabase};
use tokio::task::JoinHandle;

/// Starts the unpaid order expiry worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Every minute, orders that are still waiting for payment after `unpaid_expiry` are cancelled and their stock
/// returned. A failed run is logged and the worker carries on.
pub fn start_expiry_worker(
    db: SqliteDatabase,
    producers: EventProducers,
    unpaid_expiry: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(std::time::Duration::from_secs(60));
        let api = OrderFlowApi::new(db, producers);
        info!("🕰️ Unpaid order expiry worker started. Orders expire after {} hrs", unpaid_expiry.num_hours());
        loop {
            timer.tick().await;
            trace!("🕰️ Running unpaid order expiry job");
            match api.expire_unpaid_orders(unpaid_expiry).await {
                Ok(expired) if expired.is_empty() => trace!("🕰️ No orders expired"),
                Ok(expired) => {
                    info!("🕰️ {} unpaid orders expired", expired.len());
                    debug!("🕰️ Expired unpaid orders: {}", order_list(&expired));
                },
                Err(e) => {
                    error!("🕰️ Error running unpaid order expiry job: {e}");
                },
            }
        }
    })
}

fn order_list(orders: &[Order]) -> String {
    orders
        .iter()
        .map(|o| format!("[{}] {} user: {}", o.id, o.order_number, o.user_id))
        .collect::<Vec<String>>()
        .join(", ")
}

use std::{sync::Arc, time::Duration};

use actix_web::{
    dev::Server,
    error::{JsonPayloadError, PathError, QueryPayloadError},
    http::KeepAlive,
    middleware::Logger,
    web,
    web::ServiceConfig,
    App,
    HttpRequest,
    HttpServer,
};
use futures::FutureExt;
use log::*;
use order_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    permissions::PermissionTable,
    CheckoutApi,
    InventoryApi,
    OrderFlowApi,
    SqliteDatabase,
    WebhookApi,
};
use paymob_tools::PaymobApi;

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    routes::{
        health,
        CancelOrderRoute,
        CheckoutRoute,
        CreateOrderRoute,
        ItemAdjustmentsRoute,
        ItemAvailabilityRoute,
        MyOrdersRoute,
        OrderByIdRoute,
        OrderByNumberRoute,
        PaymobResponseRoute,
        PaymobWebhookRoute,
        RestockItemRoute,
        UpdateOrderStatusRoute,
    },
};

const EVENT_BUFFER_SIZE: usize = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.max_db_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    info!("🗃️ Database migrations are up to date");
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, default_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    if config.unpaid_order_timeout.num_seconds() > 0 {
        let _ = start_expiry_worker(db.clone(), producers.clone(), config.unpaid_order_timeout);
    } else {
        info!("🕰️ OE_UNPAID_ORDER_TIMEOUT is zero. Unpaid orders will never expire.");
    }
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Event hooks registered by the server. They log each event so operators can follow an order's progress.
pub fn default_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_created(|ev| {
            async move {
                info!("📬️ Order {} created. Total {} {}", ev.order.order_number, ev.order.total, ev.order.currency);
            }
            .boxed()
        })
        .on_order_paid(|ev| {
            async move {
                info!("📬️ Order {} paid with transaction {}", ev.order.order_number, ev.transaction_id);
            }
            .boxed()
        })
        .on_payment_failed(|ev| {
            async move {
                info!("📬️ Payment for order {} failed (transaction {})", ev.order.order_number, ev.transaction_id);
            }
            .boxed()
        })
        .on_order_cancelled(|ev| {
            async move {
                info!("📬️ Order {} cancelled by {}", ev.order.order_number, ev.cancelled_by);
            }
            .boxed()
        });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let processor = PaymobApi::new(config.paymob.clone())
        .map_err(|e| ServerError::InitializeError(format!("Could not create the Paymob client. {e}")))?;
    let permissions = Arc::new(PermissionTable::default());
    let (host, port) = (config.host.clone(), config.port);
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone())
            .with_pricing(config.pricing.clone())
            .with_permissions(permissions.clone());
        let inventory_api = InventoryApi::new(db.clone()).with_permissions(permissions.clone());
        let checkout_api = CheckoutApi::new(db.clone(), processor.clone())
            .with_gateway_timeout(config.gateway_timeout)
            .with_placeholder_billing(config.allow_placeholder_billing)
            .with_permissions(permissions.clone());
        let webhook_api = WebhookApi::new(db.clone(), producers.clone(), config.paymob.hmac_secret.clone());
        let api_scope = web::scope("/api")
            .service(CreateOrderRoute::<SqliteDatabase>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(OrderByNumberRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(CancelOrderRoute::<SqliteDatabase>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase>::new())
            .service(CheckoutRoute::<SqliteDatabase, PaymobApi>::new())
            .service(ItemAvailabilityRoute::<SqliteDatabase>::new())
            .service(ItemAdjustmentsRoute::<SqliteDatabase>::new())
            .service(RestockItemRoute::<SqliteDatabase>::new());
        let paymob_scope = web::scope("/paymob")
            .service(PaymobWebhookRoute::<SqliteDatabase>::new())
            .service(PaymobResponseRoute::<SqliteDatabase>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("oe::access_log"))
            .app_data(web::Data::from(permissions.clone()))
            .app_data(web::Data::new(ServerOptions::from_config(&config)))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(inventory_api))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(webhook_api))
            .configure(configure_extractors)
            .service(health)
            .service(api_scope)
            .service(paymob_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}

/// Extractor failures get the same JSON error body as every other error.
pub fn configure_extractors(cfg: &mut ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::PathConfig::default().error_handler(path_error))
        .app_data(web::QueryConfig::default().error_handler(query_error));
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ServerError::InvalidRequestBody(err.to_string()).into()
}

fn path_error(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    ServerError::InvalidRequestPath(err.to_string()).into()
}

fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ServerError::InvalidRequestPath(err.to_string()).into()
}

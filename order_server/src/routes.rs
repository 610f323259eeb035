//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use std::collections::HashMap;

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use order_engine::{
    db_types::OrderNumber,
    order_objects::CreateOrderRequest,
    traits::{CatalogManagement, InventoryManagement, OrderManagement, PaymentLedger, StorageBackend},
    CheckoutApi,
    InventoryApi,
    OrderFlowApi,
    PaymentProcessor,
    WebhookApi,
    WebhookError,
};
use paymob_tools::signature::ResponseParams;

use crate::{
    auth::CallerIdentity,
    config::ServerOptions,
    data_objects::{
        AvailabilityQuery,
        AvailabilityResponse,
        CheckoutRequest,
        RestockRequest,
        StatusUpdateRequest,
        WebhookParams,
        WebhookResponse,
    },
    errors::ServerError,
    helpers::get_remote_ip,
};

pub const PAYMOB_HMAC_HEADER: &str = "X-Paymob-Hmac";

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:path),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:path),+ where requires ($resource:ident, $action:ident)) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(
                        order_engine::permissions::Resource::$resource,
                        order_engine::permissions::Action::$action,
                    ));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    // Routes that also talk to the payment processor carry a second type parameter for it
    ($name:ident => $method:ident $path:literal impl $($bounds:path),+ ; $proc:path where requires ($resource:ident, $action:ident)) => {
        paste::paste! { pub struct [<$name:camel Route>]<A, P>(core::marker::PhantomData<fn() -> (A, P)>);}
        paste::paste! { impl<A, P> [<$name:camel Route>]<A, P> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> (A, P)>)
            }
        }}
        paste::paste! { impl<A, P> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A, P>
        where
            A: $($bounds +)+ 'static,
            P: $proc + 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A, P>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(
                        order_engine::permissions::Resource::$resource,
                        order_engine::permissions::Action::$action,
                    ));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(create_order => Post "/orders" impl CatalogManagement, OrderManagement where requires (Order, Create));
/// Places a new order for the caller.
///
/// The body names items and quantities only. Prices are taken from the catalog, and stock is reserved as part of
/// placing the order. A `409` means at least one item cannot supply the requested quantity.
pub async fn create_order<B>(
    caller: CallerIdentity,
    body: web::Json<CreateOrderRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: CatalogManagement + OrderManagement,
{
    let caller = caller.0;
    debug!("💻️ POST create_order for {}", caller.user_id);
    let order = api.create_order(&caller, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(my_orders => Get "/orders" impl CatalogManagement, OrderManagement where requires (Order, ReadOwn));
/// The caller's own orders, newest first.
pub async fn my_orders<B>(caller: CallerIdentity, api: web::Data<OrderFlowApi<B>>) -> Result<HttpResponse, ServerError>
where B: CatalogManagement + OrderManagement {
    debug!("💻️ GET my_orders for {}", caller.0.user_id);
    let orders = api.orders_for_caller(&caller.0).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/orders/{id}" impl CatalogManagement, OrderManagement where requires (Order, ReadOwn));
/// Customers can only fetch their own orders. Staff and admins can fetch any order.
pub async fn order_by_id<B>(
    caller: CallerIdentity,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: CatalogManagement + OrderManagement,
{
    let id = path.into_inner();
    debug!("💻️ GET order {id} for {}", caller.0.user_id);
    let order = api.order_by_id(&caller.0, id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(order_by_number => Get "/orders/number/{order_number}" impl CatalogManagement, OrderManagement where requires (Order, ReadOwn));
pub async fn order_by_number<B>(
    caller: CallerIdentity,
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: CatalogManagement + OrderManagement,
{
    let order_number = path
        .into_inner()
        .parse::<OrderNumber>()
        .map_err(|e| ServerError::InvalidRequestPath(e.to_string()))?;
    debug!("💻️ GET order {order_number} for {}", caller.0.user_id);
    let order = api.order_by_number(&caller.0, &order_number).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(cancel_order => Post "/orders/{id}/cancel" impl CatalogManagement, OrderManagement where requires (Order, CancelOwn));
/// Cancels a pending order and returns its stock. Orders that have been paid for or shipped cannot be cancelled.
pub async fn cancel_order<B>(
    caller: CallerIdentity,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: CatalogManagement + OrderManagement,
{
    let id = path.into_inner();
    info!("💻️ Cancel request for order {id} from {}", caller.0.user_id);
    let order = api.cancel_order(&caller.0, id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(update_order_status => Post "/orders/{id}/status" impl CatalogManagement, OrderManagement where requires (Order, UpdateStatus));
/// Moves an order along the fulfilment path (`processing` → `shipped` → `delivered`). Staff and admins only.
pub async fn update_order_status<B>(
    caller: CallerIdentity,
    path: web::Path<i64>,
    body: web::Json<StatusUpdateRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: CatalogManagement + OrderManagement,
{
    let id = path.into_inner();
    let StatusUpdateRequest { status } = body.into_inner();
    info!("💻️ Status change for order {id} to {status} requested by {}", caller.0.user_id);
    let order = api.update_status(&caller.0, id, status).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(checkout => Post "/orders/{id}/checkout" impl OrderManagement; PaymentProcessor where requires (Payment, CheckoutOwn));
/// Issues a payment key for a pending order and returns the hosted checkout URL.
///
/// The body is optional. When it carries `billing_data`, that is sent to the processor as is. A body that is present
/// but is not a valid checkout request is rejected.
pub async fn checkout<B, P>(
    caller: CallerIdentity,
    path: web::Path<i64>,
    body: web::Bytes,
    api: web::Data<CheckoutApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement,
    P: PaymentProcessor,
{
    let id = path.into_inner();
    let billing = parse_checkout_request(&body)?.and_then(|r| r.billing_data);
    debug!("💻️ Checkout requested for order {id} by {}", caller.0.user_id);
    let session = api.request_payment_key(&caller.0, id, billing).await?;
    Ok(HttpResponse::Ok().json(session))
}

//----------------------------------------------   Inventory  ----------------------------------------------------
route!(item_availability => Get "/inventory/{item_id}/availability" impl CatalogManagement, InventoryManagement where requires (Inventory, Read));
pub async fn item_availability<B>(
    path: web::Path<i64>,
    query: web::Query<AvailabilityQuery>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: CatalogManagement + InventoryManagement,
{
    let item_id = path.into_inner();
    let quantity = query.qty;
    let available = api.check_availability(item_id, quantity).await?;
    Ok(HttpResponse::Ok().json(AvailabilityResponse { item_id, quantity, available }))
}

route!(item_adjustments => Get "/inventory/{item_id}/adjustments" impl CatalogManagement, InventoryManagement where requires (Inventory, Read));
/// The stock audit trail for an item, oldest first.
pub async fn item_adjustments<B>(
    caller: CallerIdentity,
    path: web::Path<i64>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: CatalogManagement + InventoryManagement,
{
    let adjustments = api.adjustments(&caller.0, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(adjustments))
}

route!(restock_item => Post "/inventory/{item_id}/restock" impl CatalogManagement, InventoryManagement where requires (Inventory, Restock));
pub async fn restock_item<B>(
    caller: CallerIdentity,
    path: web::Path<i64>,
    body: web::Json<RestockRequest>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: CatalogManagement + InventoryManagement,
{
    let item_id = path.into_inner();
    let item = api.restock(&caller.0, item_id, body.quantity).await?;
    Ok(HttpResponse::Ok().json(item))
}

//----------------------------------------------   Paymob  ----------------------------------------------------
route!(paymob_webhook => Post "/webhook" impl OrderManagement, PaymentLedger);
/// Transaction callbacks from Paymob.
///
/// The signature is read from the `hmac` query parameter, or the `X-Paymob-Hmac` header if the query parameter is
/// absent. Once the callback is verified, the response is always `200 {"status": "success"}`, including for
/// redeliveries and for orders this system does not know, so that Paymob stops retrying. Malformed or unsigned
/// callbacks get a `400`.
pub async fn paymob_webhook<B>(
    req: HttpRequest,
    params: web::Query<WebhookParams>,
    body: web::Bytes,
    api: web::Data<WebhookApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentLedger,
{
    trace!("🪝️ Received transaction callback");
    let signature = params
        .into_inner()
        .hmac
        .or_else(|| req.headers().get(PAYMOB_HMAC_HEADER).and_then(|v| v.to_str().ok()).map(String::from))
        .unwrap_or_default();
    match api.handle_callback(&body, &signature).await {
        Ok(outcome) => Ok(HttpResponse::Ok().json(WebhookResponse::success(outcome.message()))),
        Err(e @ WebhookError::InvalidSignature) => {
            let peer = remote_peer(&req);
            warn!("🪝️ Rejected a transaction callback from {peer} with an invalid signature");
            Err(e.into())
        },
        Err(e) => Err(e.into()),
    }
}

route!(paymob_response => Get "/response" impl StorageBackend);
/// The page Paymob redirects shoppers to after payment. It only reports what the signed redirect says. The callback
/// is what changes the order.
pub async fn paymob_response<B>(
    req: HttpRequest,
    query: web::Query<HashMap<String, String>>,
    api: web::Data<WebhookApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: StorageBackend,
{
    let params = ResponseParams(query.into_inner());
    let signature = params.get("hmac").unwrap_or_default().to_string();
    let summary = api.verify_return(&params, &signature).map_err(|e| {
        warn!("🪝️ Return redirect from {} failed verification. {e}", remote_peer(&req));
        e
    })?;
    Ok(HttpResponse::Ok().json(summary))
}

fn remote_peer(req: &HttpRequest) -> String {
    let options = req.app_data::<web::Data<ServerOptions>>().map(|o| *o.get_ref()).unwrap_or_default();
    get_remote_ip(req, options.use_x_forwarded_for, options.use_forwarded)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "an unknown address".to_string())
}

fn parse_checkout_request(body: &[u8]) -> Result<Option<CheckoutRequest>, ServerError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body).map(Some).map_err(|e| ServerError::InvalidRequestBody(e.to_string()))
}

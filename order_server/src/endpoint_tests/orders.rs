use actix_web::{http::StatusCode, web, web::ServiceConfig};
use mockall::predicate::eq;
use order_engine::{
    db_types::{Order, OrderStatusType, PaymentStatusType},
    events::EventProducers,
    traits::{InsertOrderResult, StatusUpdateResult},
    OrderFlowApi,
};

use super::{
    helpers::{get_request, inserted, item, order, post_request},
    mocks::MockOrderStore,
};
use crate::{
    routes::{
        CancelOrderRoute,
        CreateOrderRoute,
        MyOrdersRoute,
        OrderByIdRoute,
        OrderByNumberRoute,
        UpdateOrderStatusRoute,
    },
    server::configure_extractors,
};

const ORDER_REQUEST: &str = r#"{
    "items": [{"item_id": 1, "quantity": 2}, {"item_id": 1, "quantity": 1}],
    "shipping_address": {"recipient": "Nour Hassan", "street": "14 Talaat Harb St", "city": "Cairo", "country": "EG"}
}"#;

fn configure(store: MockOrderStore) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = OrderFlowApi::new(store, EventProducers::default());
        configure_extractors(cfg);
        cfg.app_data(web::Data::new(api))
            .service(CreateOrderRoute::<MockOrderStore>::new())
            .service(MyOrdersRoute::<MockOrderStore>::new())
            .service(OrderByNumberRoute::<MockOrderStore>::new())
            .service(OrderByIdRoute::<MockOrderStore>::new())
            .service(CancelOrderRoute::<MockOrderStore>::new())
            .service(UpdateOrderStatusRoute::<MockOrderStore>::new());
    }
}

fn pending_order(user: &str) -> Order {
    order(7, "ORD-20240501103000-AAAA1111", user, OrderStatusType::Pending, PaymentStatusType::Pending)
}

#[actix_web::test]
async fn requests_without_identity_are_rejected() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(None, "/orders", configure(MockOrderStore::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"error":"Missing or invalid caller identity. X-User-Id header is missing"}"#);
}

#[actix_web::test]
async fn unknown_roles_are_rejected() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(Some(("alice", "root")), "/orders", configure(MockOrderStore::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Invalid role: root"), "{body}");
}

#[actix_web::test]
async fn create_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_fetch_items().withf(|ids| ids == [1]).times(1).returning(|_| Ok(vec![item(1, 10)]));
    store
        .expect_insert_order_with_reservation()
        .withf(|new| new.user_id.as_str() == "alice" && new.items.len() == 1 && new.items[0].quantity == 3)
        .times(1)
        .returning(|new| Ok(InsertOrderResult::Inserted(inserted(12, new))));
    let (status, body) = post_request(Some(("alice", "customer")), "/orders", ORDER_REQUEST, configure(store)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let order = serde_json::from_str::<Order>(&body).expect("Response is not an order");
    assert_eq!(order.id, 12);
    assert_eq!(order.user_id.as_str(), "alice");
    assert_eq!(order.status, OrderStatusType::Pending);
    assert_eq!(order.payment_status, PaymentStatusType::Pending);
    assert_eq!(order.items[0].unit_price.to_string(), "15.00");
    assert!(order.order_number.as_str().starts_with("ORD-"));
}

#[actix_web::test]
async fn create_order_with_insufficient_stock() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_fetch_items().returning(|_| Ok(vec![item(1, 2)]));
    store.expect_insert_order_with_reservation().never();
    let (status, body) = post_request(Some(("alice", "customer")), "/orders", ORDER_REQUEST, configure(store)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, r#"{"error":"Insufficient stock for item 1"}"#);
}

#[actix_web::test]
async fn create_order_loses_the_race_for_stock() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_fetch_items().returning(|_| Ok(vec![item(1, 10)]));
    store.expect_insert_order_with_reservation().times(1).returning(|_| Ok(InsertOrderResult::Unavailable { item_id: 1 }));
    let (status, _) = post_request(Some(("alice", "customer")), "/orders", ORDER_REQUEST, configure(store)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn create_empty_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_fetch_items().never();
    let body = r#"{"items": [], "shipping_address": {"street": "1 Nile St", "city": "Giza", "country": "EG"}}"#;
    let (status, body) = post_request(Some(("alice", "customer")), "/orders", body, configure(store)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("at least one item"), "{body}");
}

#[actix_web::test]
async fn create_order_with_unknown_item() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_fetch_items().returning(|_| Ok(vec![]));
    let (status, body) = post_request(Some(("alice", "customer")), "/orders", ORDER_REQUEST, configure(store)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"The data was not found. These items do not exist: [1]"}"#);
}

#[actix_web::test]
async fn create_order_with_malformed_body() {
    let _ = env_logger::try_init().ok();
    let (status, _) =
        post_request(Some(("alice", "customer")), "/orders", r#"{"items": "lots"}"#, configure(MockOrderStore::new()))
            .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn fetch_my_orders() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store
        .expect_fetch_orders_for_user()
        .withf(|user| user.as_str() == "alice")
        .times(1)
        .returning(|_| Ok(vec![pending_order("alice")]));
    let (status, body) = get_request(Some(("alice", "customer")), "/orders", configure(store)).await;
    assert_eq!(status, StatusCode::OK);
    let orders = serde_json::from_str::<Vec<Order>>(&body).expect("Response is not a list of orders");
    assert_eq!(orders, vec![pending_order("alice")]);
}

#[actix_web::test]
async fn fetch_own_order_by_id() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_fetch_order_by_id().with(eq(7)).returning(|_| Ok(Some(pending_order("alice"))));
    let (status, body) = get_request(Some(("alice", "customer")), "/orders/7", configure(store)).await;
    assert_eq!(status, StatusCode::OK);
    let order = serde_json::from_str::<Order>(&body).expect("Response is not an order");
    assert_eq!(order, pending_order("alice"));
}

#[actix_web::test]
async fn fetch_another_customers_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_fetch_order_by_id().with(eq(7)).returning(|_| Ok(Some(pending_order("alice"))));
    let (status, _) = get_request(Some(("mallory", "customer")), "/orders/7", configure(store)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn staff_can_fetch_any_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_fetch_order_by_id().with(eq(7)).returning(|_| Ok(Some(pending_order("alice"))));
    let (status, _) = get_request(Some(("sam", "staff")), "/orders/7", configure(store)).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn fetch_missing_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_fetch_order_by_id().returning(|_| Ok(None));
    let (status, body) = get_request(Some(("alice", "customer")), "/orders/99", configure(store)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"The data was not found. Order 99 does not exist"}"#);
}

#[actix_web::test]
async fn fetch_order_with_bad_id() {
    let _ = env_logger::try_init().ok();
    let (status, _) = get_request(Some(("alice", "customer")), "/orders/seven", configure(MockOrderStore::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn fetch_order_by_number() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store
        .expect_fetch_order_by_number()
        .withf(|n| n.as_str() == "ORD-20240501103000-AAAA1111")
        .returning(|_| Ok(Some(pending_order("alice"))));
    let (status, body) =
        get_request(Some(("alice", "customer")), "/orders/number/ORD-20240501103000-AAAA1111", configure(store)).await;
    assert_eq!(status, StatusCode::OK);
    let order = serde_json::from_str::<Order>(&body).expect("Response is not an order");
    assert_eq!(order.id, 7);
}

#[actix_web::test]
async fn cancel_pending_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_fetch_order_by_id().with(eq(7)).returning(|_| Ok(Some(pending_order("alice"))));
    store.expect_cancel_order().withf(|id, operator| *id == 7 && operator == "alice").times(1).returning(|_, _| {
        let mut order = pending_order("alice");
        order.status = OrderStatusType::Cancelled;
        Ok(StatusUpdateResult::Updated(order))
    });
    let (status, body) = post_request(Some(("alice", "customer")), "/orders/7/cancel", "", configure(store)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let order = serde_json::from_str::<Order>(&body).expect("Response is not an order");
    assert_eq!(order.status, OrderStatusType::Cancelled);
}

#[actix_web::test]
async fn cancel_shipped_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_fetch_order_by_id().with(eq(7)).returning(|_| {
        let mut order = pending_order("alice");
        order.status = OrderStatusType::Shipped;
        order.payment_status = PaymentStatusType::Paid;
        Ok(Some(order))
    });
    store.expect_cancel_order().never();
    let (status, _) = post_request(Some(("alice", "customer")), "/orders/7/cancel", "", configure(store)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn cancel_races_with_payment() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_fetch_order_by_id().returning(|_| Ok(Some(pending_order("alice"))));
    store.expect_cancel_order().returning(|_, _| {
        let mut order = pending_order("alice");
        order.status = OrderStatusType::Processing;
        Ok(StatusUpdateResult::Stale(order))
    });
    let (status, body) = post_request(Some(("alice", "customer")), "/orders/7/cancel", "", configure(store)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("is now processing"), "{body}");
}

#[actix_web::test]
async fn customers_cannot_change_status() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_fetch_order_by_id().never();
    store.expect_update_order_status().never();
    let (status, _) = post_request(
        Some(("alice", "customer")),
        "/orders/7/status",
        r#"{"status": "shipped"}"#,
        configure(store),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn staff_ship_an_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_fetch_order_by_id().with(eq(7)).returning(|_| {
        let mut order = pending_order("alice");
        order.status = OrderStatusType::Processing;
        order.payment_status = PaymentStatusType::Paid;
        Ok(Some(order))
    });
    store
        .expect_update_order_status()
        .with(eq(7), eq(OrderStatusType::Processing), eq(OrderStatusType::Shipped))
        .times(1)
        .returning(|_, _, _| {
            let mut order = pending_order("alice");
            order.status = OrderStatusType::Shipped;
            order.payment_status = PaymentStatusType::Paid;
            Ok(StatusUpdateResult::Updated(order))
        });
    let (status, body) =
        post_request(Some(("sam", "staff")), "/orders/7/status", r#"{"status": "shipped"}"#, configure(store)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let order = serde_json::from_str::<Order>(&body).expect("Response is not an order");
    assert_eq!(order.status, OrderStatusType::Shipped);
}

#[actix_web::test]
async fn staff_cannot_skip_payment() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_fetch_order_by_id().returning(|_| Ok(Some(pending_order("alice"))));
    store.expect_update_order_status().never();
    let (status, _) =
        post_request(Some(("sam", "admin")), "/orders/7/status", r#"{"status": "processing"}"#, configure(store)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

use actix_web::{http::StatusCode, web, web::ServiceConfig};
use mockall::predicate::eq;
use order_engine::{
    db_types::{OrderStatusType, PaymentStatusType},
    order_objects::PaymentSession,
    test_utils::fake_processor::{FailAt, FakeProcessor, FAKE_INTEGRATION_ID},
    CheckoutApi,
};

use super::{
    helpers::{order, post_request},
    mocks::MockOrderStore,
};
use crate::{routes::CheckoutRoute, server::configure_extractors};

const ORDER_NUMBER: &str = "ORD-20240501103000-AAAA1111";

fn configure(store: MockOrderStore, processor: FakeProcessor) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        configure_extractors(cfg);
        cfg.app_data(web::Data::new(CheckoutApi::new(store, processor)))
            .service(CheckoutRoute::<MockOrderStore, FakeProcessor>::new());
    }
}

fn store_with_order(status: OrderStatusType, payment_status: PaymentStatusType) -> MockOrderStore {
    let mut store = MockOrderStore::new();
    store.expect_fetch_order_by_id().with(eq(7)).returning(move |_| Ok(Some(order(7, ORDER_NUMBER, "alice", status, payment_status))));
    store
}

#[actix_web::test]
async fn checkout_pending_order() {
    let _ = env_logger::try_init().ok();
    let mut store = store_with_order(OrderStatusType::Pending, PaymentStatusType::Pending);
    store.expect_set_gateway_ids().with(eq(7), eq(9001), eq(FAKE_INTEGRATION_ID)).times(1).returning(|_, gw, integration| {
        let mut order = order(7, ORDER_NUMBER, "alice", OrderStatusType::Pending, PaymentStatusType::Pending);
        order.gateway_order_id = Some(gw);
        order.gateway_integration_id = Some(integration);
        Ok(order)
    });
    let processor = FakeProcessor::default();
    let (status, body) =
        post_request(Some(("alice", "customer")), "/orders/7/checkout", "", configure(store, processor.clone())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let session = serde_json::from_str::<PaymentSession>(&body).expect("Response is not a payment session");
    assert_eq!(session.order_number.as_str(), ORDER_NUMBER);
    assert_eq!(session.remote_order_id, 9001);
    assert_eq!(session.payment_key, "fake-payment-key-9001");
    assert!(session.checkout_url.ends_with("payment_token=fake-payment-key-9001"));
    assert!(!session.signature.is_empty());
    assert_eq!(processor.registrations(), 1);
    let registration = processor.last_registration().expect("Order was not registered");
    assert_eq!(registration.amount_cents, 3500);
}

#[actix_web::test]
async fn checkout_with_billing_data() {
    let _ = env_logger::try_init().ok();
    let mut store = store_with_order(OrderStatusType::Pending, PaymentStatusType::Pending);
    store.expect_set_gateway_ids().times(1).returning(|_, _, _| {
        Ok(order(7, ORDER_NUMBER, "alice", OrderStatusType::Pending, PaymentStatusType::Pending))
    });
    let body = r#"{"billing_data": {"first_name": "Nour", "last_name": "Hassan", "email": "nour@example.com",
        "phone_number": "+201000000000"}}"#;
    let (status, body) =
        post_request(Some(("alice", "customer")), "/orders/7/checkout", body, configure(store, FakeProcessor::default()))
            .await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[actix_web::test]
async fn previously_registered_orders_are_reused() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_fetch_order_by_id().returning(|_| {
        let mut order = order(7, ORDER_NUMBER, "alice", OrderStatusType::Pending, PaymentStatusType::Pending);
        order.gateway_order_id = Some(8800);
        order.gateway_integration_id = Some(FAKE_INTEGRATION_ID);
        Ok(Some(order))
    });
    store.expect_set_gateway_ids().never();
    let processor = FakeProcessor::default();
    let (status, body) =
        post_request(Some(("alice", "customer")), "/orders/7/checkout", "", configure(store, processor.clone())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let session = serde_json::from_str::<PaymentSession>(&body).expect("Response is not a payment session");
    assert_eq!(session.remote_order_id, 8800);
    assert_eq!(processor.registrations(), 0);
}

#[actix_web::test]
async fn malformed_billing_data_is_rejected() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_fetch_order_by_id().never();
    store.expect_set_gateway_ids().never();
    let processor = FakeProcessor::default();
    let body = r#"{"billing_data": {"first_name": 42, "email": ["x"]}}"#;
    let (status, body) =
        post_request(Some(("alice", "customer")), "/orders/7/checkout", body, configure(store, processor.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with(r#"{"error":"#), "{body}");
    assert_eq!(processor.calls().authenticate.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[actix_web::test]
async fn processor_failure() {
    let _ = env_logger::try_init().ok();
    let mut store = store_with_order(OrderStatusType::Pending, PaymentStatusType::Pending);
    store.expect_set_gateway_ids().never();
    let processor = FakeProcessor::default().failing_at(FailAt::PaymentKey);
    let (status, body) =
        post_request(Some(("alice", "customer")), "/orders/7/checkout", "", configure(store, processor)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, r#"{"error":"Payment could not be initiated"}"#);
}

#[actix_web::test]
async fn paid_orders_cannot_be_checked_out() {
    let _ = env_logger::try_init().ok();
    let mut store = store_with_order(OrderStatusType::Processing, PaymentStatusType::Paid);
    store.expect_set_gateway_ids().never();
    let processor = FakeProcessor::default();
    let (status, _) =
        post_request(Some(("alice", "customer")), "/orders/7/checkout", "", configure(store, processor.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(processor.calls().authenticate.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[actix_web::test]
async fn checkout_someone_elses_order() {
    let _ = env_logger::try_init().ok();
    let store = store_with_order(OrderStatusType::Pending, PaymentStatusType::Pending);
    let (status, _) =
        post_request(Some(("mallory", "customer")), "/orders/7/checkout", "", configure(store, FakeProcessor::default()))
            .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn checkout_missing_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_fetch_order_by_id().returning(|_| Ok(None));
    let (status, _) =
        post_request(Some(("alice", "customer")), "/orders/7/checkout", "", configure(store, FakeProcessor::default()))
            .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

use std::collections::HashMap;

use actix_web::{
    http::{header::ContentType, StatusCode},
    test::TestRequest,
    web,
    web::ServiceConfig,
};
use mockall::predicate::eq;
use order_engine::{
    db_types::{OrderStatusType, PaymentStatusType, PaymentTransaction},
    events::EventProducers,
    test_utils::{
        callbacks::{signed_callback, transaction},
        fake_processor::FAKE_HMAC_SECRET,
    },
    traits::{ApplyTransactionResult, PaymentUpdate},
    WebhookApi,
};
use paymob_tools::signature::{transaction_signature, ResponseParams};
use shop_common::Secret;

use super::{
    helpers::{get_request, order, send_request, timestamp},
    mocks::MockOrderStore,
};
use crate::{
    routes::{PaymobResponseRoute, PaymobWebhookRoute, PAYMOB_HMAC_HEADER},
    server::configure_extractors,
};

fn configure(store: MockOrderStore) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = WebhookApi::new(store, EventProducers::default(), Secret::new(FAKE_HMAC_SECRET.to_string()));
        configure_extractors(cfg);
        cfg.app_data(web::Data::new(api))
            .service(PaymobWebhookRoute::<MockOrderStore>::new())
            .service(PaymobResponseRoute::<MockOrderStore>::new());
    }
}

async fn deliver(body: Vec<u8>, signature: &str, store: MockOrderStore) -> (StatusCode, String) {
    let req = TestRequest::post()
        .uri(&format!("/webhook?hmac={signature}"))
        .insert_header(ContentType::json())
        .set_payload(body);
    send_request(req, configure(store)).await
}

/// A store that has never seen a transaction and knows order ORD-1 as a pending order.
fn store_with_pending_order() -> MockOrderStore {
    let mut store = MockOrderStore::new();
    store.expect_fetch_transaction().returning(|_| Ok(None));
    store
        .expect_fetch_order_by_number()
        .withf(|n| n.as_str() == "ORD-1")
        .returning(|_| Ok(Some(order(7, "ORD-1", "alice", OrderStatusType::Pending, PaymentStatusType::Pending))));
    store
}

#[actix_web::test]
async fn successful_payment() {
    let _ = env_logger::try_init().ok();
    let mut store = store_with_pending_order();
    store
        .expect_apply_transaction()
        .withf(|tx, update| {
            tx.id == 501 &&
                tx.order_id == 7 &&
                tx.success &&
                tx.amount_cents == 3500 &&
                *update == Some(PaymentUpdate::new(PaymentStatusType::Paid, true))
        })
        .times(1)
        .returning(|_, _| {
            let order = order(7, "ORD-1", "alice", OrderStatusType::Processing, PaymentStatusType::Paid);
            Ok(ApplyTransactionResult::Applied(order))
        });
    let (body, signature) = signed_callback(FAKE_HMAC_SECRET, transaction(501, "ORD-1", 3500, true, false));
    let (status, body) = deliver(body, &signature, store).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"status":"success","message":"order ORD-1 payment is paid"}"#);
}

#[actix_web::test]
async fn failed_payment() {
    let _ = env_logger::try_init().ok();
    let mut store = store_with_pending_order();
    store
        .expect_apply_transaction()
        .withf(|tx, update| !tx.success && *update == Some(PaymentUpdate::new(PaymentStatusType::Failed, false)))
        .times(1)
        .returning(|_, _| {
            let order = order(7, "ORD-1", "alice", OrderStatusType::Pending, PaymentStatusType::Failed);
            Ok(ApplyTransactionResult::Applied(order))
        });
    let (body, signature) = signed_callback(FAKE_HMAC_SECRET, transaction(502, "ORD-1", 3500, false, false));
    let (status, body) = deliver(body, &signature, store).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"status":"success","message":"order ORD-1 payment is failed"}"#);
}

#[actix_web::test]
async fn pending_transactions_are_only_recorded() {
    let _ = env_logger::try_init().ok();
    let mut store = store_with_pending_order();
    store.expect_apply_transaction().withf(|_, update| update.is_none()).times(1).returning(|_, _| {
        let order = order(7, "ORD-1", "alice", OrderStatusType::Pending, PaymentStatusType::Pending);
        Ok(ApplyTransactionResult::Recorded(order))
    });
    let (body, signature) = signed_callback(FAKE_HMAC_SECRET, transaction(503, "ORD-1", 3500, false, true));
    let (status, body) = deliver(body, &signature, store).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"status":"success","message":"transaction recorded for order ORD-1"}"#);
}

#[actix_web::test]
async fn signature_in_header() {
    let _ = env_logger::try_init().ok();
    let mut store = store_with_pending_order();
    store.expect_apply_transaction().times(1).returning(|_, _| {
        let order = order(7, "ORD-1", "alice", OrderStatusType::Processing, PaymentStatusType::Paid);
        Ok(ApplyTransactionResult::Applied(order))
    });
    let (body, signature) = signed_callback(FAKE_HMAC_SECRET, transaction(501, "ORD-1", 3500, true, false));
    let req = TestRequest::post()
        .uri("/webhook")
        .insert_header(ContentType::json())
        .insert_header((PAYMOB_HMAC_HEADER, signature))
        .set_payload(body);
    let (status, _) = send_request(req, configure(store)).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn invalid_signature() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_fetch_transaction().never();
    store.expect_apply_transaction().never();
    let (body, _) = signed_callback(FAKE_HMAC_SECRET, transaction(501, "ORD-1", 3500, true, false));
    let (_, forged) = signed_callback("not-the-secret", transaction(501, "ORD-1", 3500, true, false));
    let (status, body) = deliver(body, &forged, store).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Callback signature is invalid"}"#);
}

#[actix_web::test]
async fn tampered_amount() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_apply_transaction().never();
    let (_, signature) = signed_callback(FAKE_HMAC_SECRET, transaction(501, "ORD-1", 3500, true, false));
    let (tampered, _) = signed_callback(FAKE_HMAC_SECRET, transaction(501, "ORD-1", 100, true, false));
    let (status, _) = deliver(tampered, &signature, store).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn unsigned_callback() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_apply_transaction().never();
    let (body, _) = signed_callback(FAKE_HMAC_SECRET, transaction(501, "ORD-1", 3500, true, false));
    let req = TestRequest::post().uri("/webhook").insert_header(ContentType::json()).set_payload(body);
    let (status, _) = send_request(req, configure(store)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn malformed_callback() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_apply_transaction().never();
    let (status, body) = deliver(b"{\"obj\": 12".to_vec(), "abcd", store).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with(r#"{"error":"#), "{body}");
}

#[actix_web::test]
async fn duplicate_delivery() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_fetch_transaction().with(eq(501)).times(1).returning(|_| {
        Ok(Some(PaymentTransaction {
            id: 501,
            order_id: 7,
            success: true,
            pending: false,
            amount_cents: 3500,
            currency: "EGP".into(),
            payload: serde_json::json!({}),
            created_at: timestamp(),
        }))
    });
    store.expect_fetch_order_by_number().never();
    store.expect_apply_transaction().never();
    let (body, signature) = signed_callback(FAKE_HMAC_SECRET, transaction(501, "ORD-1", 3500, true, false));
    let (status, body) = deliver(body, &signature, store).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"status":"success","message":"already processed"}"#);
}

#[actix_web::test]
async fn concurrent_duplicate_delivery() {
    let _ = env_logger::try_init().ok();
    let mut store = store_with_pending_order();
    store.expect_apply_transaction().times(1).returning(|_, _| Ok(ApplyTransactionResult::AlreadyProcessed));
    let (body, signature) = signed_callback(FAKE_HMAC_SECRET, transaction(501, "ORD-1", 3500, true, false));
    let (status, body) = deliver(body, &signature, store).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"status":"success","message":"already processed"}"#);
}

#[actix_web::test]
async fn unknown_order_is_acknowledged() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_fetch_transaction().returning(|_| Ok(None));
    store.expect_fetch_order_by_number().returning(|_| Ok(None));
    store.expect_apply_transaction().never();
    let (body, signature) = signed_callback(FAKE_HMAC_SECRET, transaction(504, "ORD-UNKNOWN", 3500, true, false));
    let (status, body) = deliver(body, &signature, store).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"status":"success","message":"order not found"}"#);
}

fn return_params() -> HashMap<String, String> {
    [
        ("id", "501"),
        ("success", "true"),
        ("pending", "false"),
        ("amount_cents", "3500"),
        ("currency", "EGP"),
        ("order", "9001"),
        ("merchant_order_id", "ORD-1"),
        ("integration_id", "4411"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn query_string(params: &HashMap<String, String>) -> String {
    params.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("&")
}

#[actix_web::test]
async fn signed_return_redirect() {
    let _ = env_logger::try_init().ok();
    let mut params = return_params();
    let signature = transaction_signature(FAKE_HMAC_SECRET, &ResponseParams(params.clone())).unwrap();
    params.insert("hmac".into(), signature);
    let path = format!("/response?{}", query_string(&params));
    let (status, body) = get_request(None, &path, configure(MockOrderStore::new())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(
        body,
        r#"{"transaction_id":501,"merchant_order_id":"ORD-1","success":true,"pending":false,"amount_cents":3500,"currency":"EGP"}"#
    );
}

#[actix_web::test]
async fn unsigned_return_redirect() {
    let _ = env_logger::try_init().ok();
    let path = format!("/response?{}", query_string(&return_params()));
    let (status, body) = get_request(None, &path, configure(MockOrderStore::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Callback signature is invalid"}"#);
}

use actix_web::{
    body::to_bytes,
    http::{header::ContentType, StatusCode},
    test,
    test::TestRequest,
    web::ServiceConfig,
    App,
};
use chrono::{TimeZone, Utc};
use log::debug;
use order_engine::db_types::{
    Address,
    Item,
    NewOrder,
    Order,
    OrderLine,
    OrderNumber,
    OrderStatusType,
    PaymentStatusType,
    UserId,
};
use shop_common::Money;

use crate::auth::{USER_ID_HEADER, USER_ROLE_HEADER};

/// Sends `req` to an app built by `configure` and returns the status and body. Errors raised by middleware are
/// rendered the same way the server would render them.
pub async fn send_request<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let res = match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => res.into_parts().1.map_into_boxed_body(),
        Err(e) => e.error_response(),
    };
    let status = res.status();
    let body = to_bytes(res.into_body()).await.map(|b| String::from_utf8_lossy(&b).into_owned()).unwrap_or_default();
    (status, body)
}

pub async fn get_request<F>(identity: Option<(&str, &str)>, path: &str, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let req = with_identity(TestRequest::get().uri(path), identity);
    send_request(req, configure).await
}

pub async fn post_request<F>(
    identity: Option<(&str, &str)>,
    path: &str,
    body: &str,
    configure: F,
) -> (StatusCode, String)
where
    F: FnOnce(&mut ServiceConfig),
{
    let req = with_identity(TestRequest::post().uri(path), identity)
        .insert_header(ContentType::json())
        .set_payload(body.to_string());
    send_request(req, configure).await
}

fn with_identity(req: TestRequest, identity: Option<(&str, &str)>) -> TestRequest {
    match identity {
        Some((user, role)) => {
            req.insert_header((USER_ID_HEADER, user.to_string())).insert_header((USER_ROLE_HEADER, role.to_string()))
        },
        None => req,
    }
}

pub fn timestamp() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap()
}

pub fn address() -> Address {
    Address {
        recipient: "Nour Hassan".into(),
        street: "14 Talaat Harb St".into(),
        city: "Cairo".into(),
        country: "EG".into(),
        phone: Some("+201000000000".into()),
        ..Default::default()
    }
}

pub fn item(id: i64, quantity: i64) -> Item {
    Item {
        id,
        sku: format!("SKU-{id}"),
        name: format!("Item {id}"),
        unit_price: Money::from_minor_units(1500),
        quantity,
        is_active: true,
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}

/// An order for two units of item 1, totalling 35.00 EGP.
pub fn order(id: i64, number: &str, user: &str, status: OrderStatusType, payment_status: PaymentStatusType) -> Order {
    let line = OrderLine::from_item(&item(1, 10), 2).expect("Line total overflowed");
    Order {
        id,
        order_number: OrderNumber::from(number.to_string()),
        user_id: UserId::from(user),
        status,
        payment_status,
        subtotal: line.line_total,
        items: vec![line],
        shipping: Money::from_minor_units(500),
        tax: Money::zero(),
        discount: Money::zero(),
        total: Money::from_minor_units(3500),
        currency: "EGP".into(),
        shipping_address: address(),
        billing_address: None,
        gateway_order_id: None,
        gateway_integration_id: None,
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}

/// What the backend would hand back after persisting `new`.
pub fn inserted(id: i64, new: NewOrder) -> Order {
    Order {
        id,
        order_number: new.order_number,
        user_id: new.user_id,
        status: OrderStatusType::Pending,
        payment_status: PaymentStatusType::Pending,
        items: new.items,
        subtotal: new.subtotal,
        shipping: new.shipping,
        tax: new.tax,
        discount: new.discount,
        total: new.total,
        currency: new.currency,
        shipping_address: new.shipping_address,
        billing_address: new.billing_address,
        gateway_order_id: None,
        gateway_integration_id: None,
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}

use std::str::FromStr;

use cucumber::{given, then, when};
use order_engine::{
    db_types::{ItemQuantity, OrderStatusType, PaymentStatusType},
    order_objects::CreateOrderRequest,
    test_utils::callbacks::{signed_callback, transaction},
    CatalogManagement,
    ErrorKind,
};
use shop_common::Money;

use crate::{
    cucumber::{
        order_world::{caller, HMAC_SECRET},
        OrderWorld,
    },
    support::address,
};

async fn place_order(world: &mut OrderWorld, name: &str, lines: Vec<(i64, String)>, label: Option<String>) {
    let system = world.system();
    let items = lines.iter().map(|(qty, sku)| ItemQuantity::new(system.item(sku).id, *qty)).collect();
    let request = CreateOrderRequest::new(items, address());
    match system.orders.create_order(&caller(name), request).await {
        Ok(order) => {
            system.last_error = None;
            if let Some(label) = label {
                system.placed.insert(label, order);
            }
        },
        Err(e) => system.last_error = Some(format!("{:?}: {e}", e.kind())),
    }
}

#[given(expr = "{word} has ordered {int} {word} as order {string}")]
async fn existing_order(world: &mut OrderWorld, name: String, qty: i64, sku: String, label: String) {
    place_order(world, &name, vec![(qty, sku)], Some(label)).await;
    assert_eq!(world.system().last_error, None);
}

#[when(expr = "{word} orders {int} {word} as order {string}")]
async fn order_one(world: &mut OrderWorld, name: String, qty: i64, sku: String, label: String) {
    place_order(world, &name, vec![(qty, sku)], Some(label)).await;
    assert_eq!(world.system().last_error, None);
}

#[when(expr = "{word} orders {int} {word} and {int} {word} as order {string}")]
async fn order_two(world: &mut OrderWorld, name: String, q1: i64, sku1: String, q2: i64, sku2: String, label: String) {
    place_order(world, &name, vec![(q1, sku1), (q2, sku2)], Some(label)).await;
    assert_eq!(world.system().last_error, None);
}

#[when(expr = "{word} tries to order {int} {word}")]
async fn try_order(world: &mut OrderWorld, name: String, qty: i64, sku: String) {
    place_order(world, &name, vec![(qty, sku)], None).await;
}

#[when(expr = "{word} cancels order {string}")]
async fn cancel(world: &mut OrderWorld, name: String, label: String) {
    let system = world.system();
    let id = system.order(&label).id;
    let order = system.orders.cancel_order(&caller(&name), id).await.expect("Error cancelling order");
    system.placed.insert(label, order);
}

#[when(expr = "{word} tries to cancel order {string}")]
async fn try_cancel(world: &mut OrderWorld, name: String, label: String) {
    let system = world.system();
    let id = system.order(&label).id;
    system.last_error = system.orders.cancel_order(&caller(&name), id).await.err().map(|e| format!("{:?}: {e}", e.kind()));
}

#[when(expr = "{word} marks order {string} as {word}")]
async fn update_status(world: &mut OrderWorld, name: String, label: String, status: String) {
    let system = world.system();
    let id = system.order(&label).id;
    let status = OrderStatusType::from_str(&status).expect("Invalid order status");
    let order = system.orders.update_status(&caller(&name), id, status).await.expect("Error updating status");
    system.placed.insert(label, order);
}

#[when(expr = "{word} checks out order {string}")]
async fn checkout(world: &mut OrderWorld, name: String, label: String) {
    let system = world.system();
    let id = system.order(&label).id;
    match system.checkout.request_payment_key(&caller(&name), id, None).await {
        Ok(session) => {
            system.last_error = None;
            system.last_response = Some(session.checkout_url);
        },
        Err(e) => system.last_error = Some(format!("{:?}: {e}", e.kind())),
    }
}

async fn deliver(world: &mut OrderWorld, txid: i64, label: &str, success: bool, pending: bool, secret: &str) {
    let system = world.system();
    let order = system.order(label);
    let cents = order.total.to_minor_units().expect("Order total out of range");
    let (body, sig) = signed_callback(secret, transaction(txid, order.order_number.as_str(), cents, success, pending));
    system.callbacks.insert(txid, (body, sig));
    send_callback(world, txid).await;
}

#[when(expr = "the processor reports transaction {int} paid for order {string}")]
async fn payment_succeeds(world: &mut OrderWorld, txid: i64, label: String) {
    deliver(world, txid, &label, true, false, HMAC_SECRET).await;
}

#[when(expr = "the processor reports transaction {int} failed for order {string}")]
async fn payment_fails(world: &mut OrderWorld, txid: i64, label: String) {
    deliver(world, txid, &label, false, false, HMAC_SECRET).await;
}

#[when(expr = "a forged callback reports transaction {int} paid for order {string}")]
async fn forged_payment(world: &mut OrderWorld, txid: i64, label: String) {
    deliver(world, txid, &label, true, false, "a guessed secret").await;
}

#[when(expr = "the processor redelivers transaction {int}")]
async fn redeliver(world: &mut OrderWorld, txid: i64) {
    send_callback(world, txid).await;
}

async fn send_callback(world: &mut OrderWorld, txid: i64) {
    let system = world.system();
    let (body, sig) = system.callbacks.get(&txid).cloned().expect("Transaction was never delivered");
    match system.webhooks.handle_callback(&body, &sig).await {
        Ok(outcome) => {
            system.last_error = None;
            system.last_response = Some(outcome.message());
        },
        Err(e) => {
            system.last_response = None;
            system.last_error = Some(format!("{:?}: {e}", e.kind()));
        },
    }
}

#[then(expr = "order {string} is {word} with payment {word}")]
async fn check_status(world: &mut OrderWorld, label: String, status: String, payment: String) {
    let system = world.system();
    let id = system.order(&label).id;
    let order = system.orders.order_by_id(&caller("sam"), id).await.expect("Error fetching order");
    assert_eq!(order.status, OrderStatusType::from_str(&status).unwrap());
    assert_eq!(order.payment_status, PaymentStatusType::from_str(&payment).unwrap());
    system.placed.insert(label, order);
}

#[then(expr = "order {string} has a subtotal of {word}, tax of {word} and a total of {word}")]
async fn check_totals(world: &mut OrderWorld, label: String, subtotal: String, tax: String, total: String) {
    let order = world.system().order(&label);
    assert_eq!(order.subtotal, Money::from_str(&subtotal).unwrap());
    assert_eq!(order.tax, Money::from_str(&tax).unwrap());
    assert_eq!(order.total, Money::from_str(&total).unwrap());
    assert!(order.totals_are_consistent());
}

#[then(expr = "item {word} has {int} units in stock")]
async fn check_stock(world: &mut OrderWorld, sku: String, quantity: i64) {
    let system = world.system();
    let id = system.item(&sku).id;
    let item = system.db.fetch_item(id).await.expect("Error fetching item").expect("Item has gone");
    assert_eq!(item.quantity, quantity);
}

#[then(expr = "the request fails with a/an {word} error")]
async fn check_error(world: &mut OrderWorld, kind: String) {
    let error = world.system().last_error.clone().expect("The last request did not fail");
    let expected = match kind.as_str() {
        "validation" => ErrorKind::Validation,
        "conflict" => ErrorKind::Conflict,
        "authorization" => ErrorKind::Authorization,
        "signature" => ErrorKind::InvalidSignature,
        "payment" => ErrorKind::Payment,
        _ => ErrorKind::NotFound,
    };
    assert!(error.starts_with(&format!("{expected:?}:")), "{error}");
}

#[then(expr = "the callback is acknowledged with {string}")]
async fn check_acknowledged(world: &mut OrderWorld, message: String) {
    let system = world.system();
    assert_eq!(system.last_error, None);
    assert_eq!(system.last_response.as_deref(), Some(message.as_str()));
}

#[then(expr = "order {string} is registered with the payment processor")]
async fn check_registered(world: &mut OrderWorld, label: String) {
    let system = world.system();
    assert_eq!(system.last_error, None);
    let id = system.order(&label).id;
    let order = system.orders.order_by_id(&caller("sam"), id).await.expect("Error fetching order");
    assert!(order.gateway_order_id.is_some());
    let url = system.last_response.clone().expect("No checkout url");
    assert!(url.contains("payment_token="), "{url}");
}

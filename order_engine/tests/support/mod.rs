#![allow(dead_code)]
use std::str::FromStr;

use order_engine::{
    db_types::{Address, Caller, Item, ItemQuantity, NewItem, Role},
    events::EventProducers,
    order_objects::CreateOrderRequest,
    CatalogManagement,
    OrderFlowApi,
    SqliteDatabase,
};
use shop_common::Money;

pub fn alice() -> Caller {
    Caller::new("alice", Role::Customer)
}

pub fn bob() -> Caller {
    Caller::new("bob", Role::Customer)
}

pub fn staff() -> Caller {
    Caller::new("sam", Role::Staff)
}

pub fn admin() -> Caller {
    Caller::new("root", Role::Admin)
}

pub fn address() -> Address {
    Address {
        recipient: "Alice Smith".into(),
        street: "12 Tahrir Sq".into(),
        city: "Cairo".into(),
        country: "EG".into(),
        phone: Some("+201111111111".into()),
        ..Default::default()
    }
}

pub fn money(s: &str) -> Money {
    Money::from_str(s).expect("Invalid money value")
}

pub async fn add_item(db: &SqliteDatabase, sku: &str, price: &str, quantity: i64) -> Item {
    db.insert_item(NewItem::new(sku, sku, money(price), quantity)).await.expect("Error inserting item")
}

pub fn order_request(lines: &[(i64, i64)]) -> CreateOrderRequest {
    let items = lines.iter().map(|(id, qty)| ItemQuantity::new(*id, *qty)).collect();
    CreateOrderRequest::new(items, address())
}

pub fn order_api(db: &SqliteDatabase) -> OrderFlowApi<SqliteDatabase> {
    OrderFlowApi::new(db.clone(), EventProducers::default())
}

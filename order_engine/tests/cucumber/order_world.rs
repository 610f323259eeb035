use std::collections::HashMap;

use cucumber::World;
use log::*;
use order_engine::{
    db_types::{Caller, Item, Order, Role},
    events::EventProducers,
    test_utils::{
        fake_processor::FakeProcessor,
        prepare_env::{create_database, random_db_path, run_migrations},
    },
    CheckoutApi,
    OrderFlowApi,
    SqliteDatabase,
    WebhookApi,
};
use shop_common::Secret;

pub const HMAC_SECRET: &str = "cucumber-hmac-secret";

#[derive(Default, Debug, World)]
pub struct OrderWorld {
    pub system: Option<OrderSystem>,
}

#[derive(Debug)]
pub struct OrderSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub orders: OrderFlowApi<SqliteDatabase>,
    pub checkout: CheckoutApi<SqliteDatabase, FakeProcessor>,
    pub webhooks: WebhookApi<SqliteDatabase>,
    /// Catalog items by SKU
    pub items: HashMap<String, Item>,
    /// Orders by the label the scenario gave them
    pub placed: HashMap<String, Order>,
    /// Signed callback bodies by transaction id, so they can be redelivered
    pub callbacks: HashMap<i64, (Vec<u8>, String)>,
    pub last_error: Option<String>,
    pub last_response: Option<String>,
}

impl OrderWorld {
    pub fn system(&mut self) -> &mut OrderSystem {
        self.system.as_mut().expect("The system has not been initialised")
    }
}

impl OrderSystem {
    pub async fn new() -> Self {
        let url = prepare_test_env().await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        let producers = EventProducers::default();
        Self {
            db_path: url,
            orders: OrderFlowApi::new(db.clone(), producers.clone()),
            checkout: CheckoutApi::new(db.clone(), FakeProcessor::default()),
            webhooks: WebhookApi::new(db.clone(), producers, Secret::new(HMAC_SECRET.to_string())),
            db,
            items: HashMap::new(),
            placed: HashMap::new(),
            callbacks: HashMap::new(),
            last_error: None,
            last_response: None,
        }
    }

    pub fn item(&self, sku: &str) -> &Item {
        self.items.get(sku).unwrap_or_else(|| panic!("No item with SKU {sku} in the catalog"))
    }

    pub fn order(&self, label: &str) -> &Order {
        self.placed.get(label).unwrap_or_else(|| panic!("No order labelled {label}"))
    }
}

/// Scenario actors. Alice and Bob are customers, Sam is staff and Root is an admin.
pub fn caller(name: &str) -> Caller {
    let role = match name {
        "sam" => Role::Staff,
        "root" => Role::Admin,
        _ => Role::Customer,
    };
    Caller::new(name, role)
}

pub async fn prepare_test_env() -> String {
    let path = random_db_path();
    create_database(&path).await;
    run_migrations(&path).await;
    path
}

use std::str::FromStr;

use cucumber::{gherkin::Step, given};
use order_engine::{db_types::NewItem, CatalogManagement};
use shop_common::Money;

use crate::cucumber::{OrderSystem, OrderWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut OrderWorld) {
    let system = OrderSystem::new().await;
    world.system = Some(system);
}

#[given("the catalog contains")]
async fn catalog(world: &mut OrderWorld, step: &Step) {
    let system = world.system();
    let table = step.table.as_ref().expect("The catalog step needs a table");
    for row in table.rows.iter().skip(1) {
        let price = Money::from_str(&row[2]).expect("Invalid price");
        let quantity = row[3].parse::<i64>().expect("Invalid quantity");
        let item = system
            .db
            .insert_item(NewItem::new(row[0].as_str(), row[1].as_str(), price, quantity))
            .await
            .expect("Error adding item");
        system.items.insert(row[0].clone(), item);
    }
}

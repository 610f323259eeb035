mod order_world;
mod setups;
mod steps;

pub use order_world::{OrderSystem, OrderWorld};

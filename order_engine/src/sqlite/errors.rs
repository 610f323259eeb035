use sqlx::migrate::MigrateError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database driver error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Could not run database migrations: {0}")]
    MigrationError(String),
    #[error("An item with SKU {0} already exists")]
    DuplicateSku(String),
    #[error("Item {0} does not exist")]
    ItemNotFound(i64),
    #[error("Order {0} does not exist")]
    OrderNotFound(i64),
    #[error("Order {0} is already linked to a different gateway order")]
    GatewayIdsAlreadySet(i64),
    #[error("Stock adjustments must be strictly positive. Got {0}")]
    InvalidQuantity(i64),
}

impl From<MigrateError> for SqliteDatabaseError {
    fn from(e: MigrateError) -> Self {
        SqliteDatabaseError::MigrationError(e.to_string())
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaymobApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST request: {0}")]
    RestRequestError(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("The response did not contain the expected field: {0}")]
    MissingField(&'static str),
    #[error("The HMAC secret is not usable as a key")]
    InvalidHmacKey,
}

//! Error type shared by the query layer, the store backends and the service.

use thiserror::Error;

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Failures surfaced by the data-access layer.
///
/// Not-found on update/delete is not represented here: those operations
/// report a zero count instead.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Driver error: {0}")]
    Driver(#[from] mongodb::error::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bson::ser::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] bson::de::Error),

    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),
}

impl StoreError {
    pub(crate) fn invalid_query(msg: impl Into<String>) -> Self {
        StoreError::InvalidQuery(msg.into())
    }

    /// True for failures that end the run (configuration or connectivity).
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::Config(_) | StoreError::Connection(_))
    }
}

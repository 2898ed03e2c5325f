use common::RecordId;
use thiserror::Error;

/// Errors that can occur when reading or writing checkout records.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No order exists with the given number.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// No checkout session exists with the given id.
    #[error("Checkout session not found: {0}")]
    SessionNotFound(RecordId),

    /// A different session already holds this provider token.
    #[error("Checkout session token already recorded: {0}")]
    DuplicateToken(String),

    /// A stored column could not be mapped back onto a record.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

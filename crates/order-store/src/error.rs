use thiserror::Error;

use crate::OrderId;

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An order with this id already exists (unique constraint rejection).
    #[error("Duplicate order id: {0}")]
    DuplicateOrder(OrderId),

    /// A bulk update was issued without a status predicate.
    #[error("Bulk update requires a status predicate")]
    UnguardedUpdate,

    /// A stored value could not be decoded into a record.
    #[error("Corrupt stored value: {0}")]
    Corrupt(String),

    /// The store cannot serve requests right now.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

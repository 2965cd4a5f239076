//! Sweep error types.

use order_store::StoreError;
use thiserror::Error;

use crate::OrderId;

/// Errors that end a single sweep run or reject a scheduler configuration.
///
/// A failed run is logged by the runner; the next tick runs as usual.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid scheduler configuration: {0}")]
    Config(String),
}

/// Errors returned by a reminder notifier for one order.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Reminder for order {order_id} rejected: {reason}")]
    Rejected { order_id: OrderId, reason: String },
}

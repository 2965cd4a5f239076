//! Domain error types.

use std::time::Duration;

use order_store::StoreError;
use thiserror::Error;

use crate::lifecycle::Transition;
use crate::{OrderId, OrderStatus};

/// Errors returned by order lifecycle operations.
///
/// `InvalidInput`, `OrderNotFound` and `InvalidStateTransition` are expected
/// outcomes a caller handles explicitly. The remaining variants are
/// server-side failures. Nothing here is retried automatically.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Malformed or missing caller data. No write was attempted.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The referenced order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order exists but is not in a state the transition starts from.
    #[error("Invalid state transition: cannot {transition} order {order_id} in {current} state")]
    InvalidStateTransition {
        order_id: OrderId,
        current: OrderStatus,
        transition: Transition,
    },

    /// Unknown transition name.
    #[error("Unknown transition: {0:?}")]
    InvalidTransition(String),

    /// The atomic creation unit failed; no rows were persisted.
    #[error("Order creation failed: {0}")]
    CreationFailed(#[source] StoreError),

    /// The store rejected or could not serve a request.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// A store call did not finish within its deadline.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

impl OrderError {
    /// Returns true for outcomes the caller is expected to handle, as opposed
    /// to server-side failures.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            OrderError::InvalidInput(_)
                | OrderError::OrderNotFound(_)
                | OrderError::InvalidStateTransition { .. }
        )
    }
}

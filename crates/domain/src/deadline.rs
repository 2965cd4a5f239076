use std::future::Future;
use std::time::Duration;

use order_store::StoreError;

use crate::error::OrderError;

/// Runs a store call under `deadline`.
///
/// Elapsed deadlines become `Timeout`; store failures become
/// `StoreUnavailable`. Dropping the future abandons the call, so an atomic
/// unit that did not commit leaves nothing behind.
pub(crate) async fn within<T, F>(
    deadline: Duration,
    operation: &'static str,
    fut: F,
) -> Result<T, OrderError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result.map_err(OrderError::from),
        Err(_) => {
            tracing::warn!(operation, ?deadline, "store call exceeded deadline");
            Err(OrderError::Timeout {
                operation,
                after: deadline,
            })
        }
    }
}

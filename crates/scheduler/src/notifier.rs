//! Outbound reminder notifications.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::OrderId;
use crate::error::NotifyError;

/// Why a reminder is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DueReason {
    /// The order is still waiting for payment.
    PaymentPending,
}

impl std::fmt::Display for DueReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DueReason::PaymentPending => write!(f, "payment_pending"),
        }
    }
}

/// A reminder-due event for one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderDue {
    pub order_id: OrderId,
    pub email: String,
    pub reason: DueReason,
}

/// Delivers reminder-due events.
///
/// Delivery is at-least-once: the same order may be reported on consecutive
/// sweep runs.
#[async_trait]
pub trait ReminderNotifier: Send + Sync + 'static {
    async fn notify(&self, due: &ReminderDue) -> Result<(), NotifyError>;
}

/// Writes each reminder to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl ReminderNotifier for LoggingNotifier {
    async fn notify(&self, due: &ReminderDue) -> Result<(), NotifyError> {
        tracing::info!(
            order_id = %due.order_id,
            email = %due.email,
            reason = %due.reason,
            "sending payment reminder"
        );
        Ok(())
    }
}

/// Records reminders in memory. Failures can be injected per order or for
/// every call.
#[derive(Clone, Default)]
pub struct InMemoryNotifier {
    sent: Arc<RwLock<Vec<ReminderDue>>>,
    failing_orders: Arc<RwLock<HashSet<OrderId>>>,
    failing: Arc<AtomicBool>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every reminder delivered so far, in delivery order.
    pub async fn sent(&self) -> Vec<ReminderDue> {
        self.sent.read().await.clone()
    }

    /// Rejects reminders for one order.
    pub async fn fail_for(&self, order_id: OrderId) {
        self.failing_orders.write().await.insert(order_id);
    }

    /// Rejects every reminder until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl ReminderNotifier for InMemoryNotifier {
    async fn notify(&self, due: &ReminderDue) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst)
            || self.failing_orders.read().await.contains(&due.order_id)
        {
            return Err(NotifyError::Rejected {
                order_id: due.order_id.clone(),
                reason: "in-memory notifier set to fail".to_string(),
            });
        }

        self.sent.write().await.push(due.clone());
        Ok(())
    }
}

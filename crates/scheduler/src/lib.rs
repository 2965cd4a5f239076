//! Background reconciliation for the order lifecycle.
//!
//! Two independent recurring sweeps run beside the foreground callers:
//! - [`TimeoutCancelSweep`]: cancels orders left unpaid past the grace period
//! - [`PaymentReminderSweep`]: emits reminders for orders nearing that point
//!
//! Each sweep owns its timer and re-entrancy guard. They never block each
//! other.

pub mod config;
pub mod error;
pub mod notifier;
pub mod payment_reminder;
pub mod runner;
pub mod sweep;
pub mod timeout_cancel;

pub use common::{Money, OrderId, OrderStatus, ProductId, UserId};
pub use config::{ReminderWindow, SchedulerConfig, SweepConfig};
pub use error::{NotifyError, SweepError};
pub use notifier::{DueReason, InMemoryNotifier, LoggingNotifier, ReminderDue, ReminderNotifier};
pub use payment_reminder::PaymentReminderSweep;
pub use runner::{RecurringSweep, TickOutcome};
pub use sweep::{Sweep, SweepReport};
pub use timeout_cancel::TimeoutCancelSweep;

use order_store::OrderStore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Owns the configuration and collaborators of both sweeps.
pub struct ReconciliationScheduler<S, N> {
    store: S,
    notifier: N,
    config: SchedulerConfig,
}

impl<S, N> ReconciliationScheduler<S, N>
where
    S: OrderStore + Clone + 'static,
    N: ReminderNotifier,
{
    /// Creates a scheduler, rejecting an invalid configuration.
    pub fn new(store: S, notifier: N, config: SchedulerConfig) -> Result<Self, SweepError> {
        config.validate()?;
        Ok(Self {
            store,
            notifier,
            config,
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Spawns both sweeps. Each runs once immediately, then on its interval,
    /// until `shutdown` is cancelled.
    pub fn start(self, shutdown: CancellationToken) -> SchedulerHandle {
        let cancel = RecurringSweep::new(
            TimeoutCancelSweep::new(self.store.clone(), self.config.cancel_grace),
            self.config.timeout_cancel,
        );
        let remind = RecurringSweep::new(
            PaymentReminderSweep::new(self.store, self.notifier, self.config.reminder_window),
            self.config.payment_reminder,
        );

        tracing::info!(config = ?self.config, "starting reconciliation scheduler");

        SchedulerHandle {
            tasks: vec![
                tokio::spawn(cancel.run(shutdown.clone())),
                tokio::spawn(remind.run(shutdown)),
            ],
        }
    }
}

/// Join handle for the running sweeps.
pub struct SchedulerHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Waits for both sweeps to stop after their shutdown token is cancelled.
    pub async fn join(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "sweep task ended abnormally");
            }
        }
    }
}

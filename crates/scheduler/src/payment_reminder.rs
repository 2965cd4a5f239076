//! Reminds customers about orders still waiting for payment.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use order_store::{OrderFilter, OrderStore};

use crate::OrderStatus;
use crate::config::ReminderWindow;
use crate::error::SweepError;
use crate::notifier::{DueReason, ReminderDue, ReminderNotifier};
use crate::sweep::{Sweep, SweepReport};

/// Emits a reminder for every pending order whose age lies strictly inside
/// the reminder window. Order state is never changed.
pub struct PaymentReminderSweep<S, N> {
    store: S,
    notifier: N,
    window: ReminderWindow,
}

impl<S, N> PaymentReminderSweep<S, N>
where
    S: OrderStore,
    N: ReminderNotifier,
{
    pub fn new(store: S, notifier: N, window: ReminderWindow) -> Self {
        Self {
            store,
            notifier,
            window,
        }
    }

    fn bounds(&self, now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>), SweepError> {
        let delta = |d| {
            TimeDelta::from_std(d)
                .map_err(|_| SweepError::Config(format!("reminder window {d:?} out of range")))
        };
        Ok((now - delta(self.window.end)?, now - delta(self.window.start)?))
    }
}

#[async_trait]
impl<S, N> Sweep for PaymentReminderSweep<S, N>
where
    S: OrderStore + 'static,
    N: ReminderNotifier,
{
    fn name(&self) -> &'static str {
        "payment_reminder"
    }

    #[tracing::instrument(skip(self), fields(sweep = "payment_reminder"))]
    async fn run(&self, now: DateTime<Utc>) -> Result<SweepReport, SweepError> {
        let (oldest, newest) = self.bounds(now)?;
        let filter = OrderFilter::with_status(OrderStatus::Pending)
            .created_after(oldest)
            .created_before(newest);
        let due = self.store.find(&filter).await?;

        let mut report = SweepReport {
            selected: due.len() as u64,
            ..SweepReport::default()
        };

        for order in due {
            let reminder = ReminderDue {
                order_id: order.order_id,
                email: order.email,
                reason: DueReason::PaymentPending,
            };
            match self.notifier.notify(&reminder).await {
                Ok(()) => {
                    report.affected += 1;
                    metrics::counter!("payment_reminders_sent_total").increment(1);
                }
                Err(e) => {
                    report.failed += 1;
                    metrics::counter!("payment_reminder_failures_total").increment(1);
                    tracing::warn!(
                        order_id = %reminder.order_id,
                        error = %e,
                        "payment reminder failed"
                    );
                }
            }
        }

        if report.selected > 0 {
            tracing::info!(
                due = report.selected,
                sent = report.affected,
                failed = report.failed,
                "payment reminders processed"
            );
        }

        Ok(report)
    }
}

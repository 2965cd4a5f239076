//! Cancels orders left unpaid past the grace period.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use domain::Transition;
use order_store::{OrderFilter, OrderStore, StatusUpdate};

use crate::OrderStatus;
use crate::error::SweepError;
use crate::sweep::{Sweep, SweepReport};

/// Bulk-cancels pending orders created before `now - grace`.
///
/// The status predicate is the compare-and-set guard: an order paid between
/// selection and write no longer matches and is left alone.
pub struct TimeoutCancelSweep<S> {
    store: S,
    grace: Duration,
}

impl<S: OrderStore> TimeoutCancelSweep<S> {
    pub fn new(store: S, grace: Duration) -> Self {
        Self { store, grace }
    }
}

#[async_trait]
impl<S> Sweep for TimeoutCancelSweep<S>
where
    S: OrderStore + 'static,
{
    fn name(&self) -> &'static str {
        "timeout_cancel"
    }

    #[tracing::instrument(skip(self), fields(sweep = "timeout_cancel"))]
    async fn run(&self, now: DateTime<Utc>) -> Result<SweepReport, SweepError> {
        let grace = TimeDelta::from_std(self.grace)
            .map_err(|_| SweepError::Config(format!("grace {:?} out of range", self.grace)))?;
        let cutoff = now - grace;

        let filter = OrderFilter::with_status(OrderStatus::Pending).created_before(cutoff);
        let update = StatusUpdate::to(Transition::Cancel.target(), now);
        let cancelled = self.store.update_matching(&filter, &update).await?;

        metrics::counter!("orders_auto_cancelled_total").increment(cancelled);
        if cancelled > 0 {
            tracing::info!(cancelled, %cutoff, "cancelled unpaid orders");
        } else {
            tracing::debug!(%cutoff, "no unpaid orders past grace period");
        }

        Ok(SweepReport {
            selected: cancelled,
            affected: cancelled,
            failed: 0,
        })
    }
}

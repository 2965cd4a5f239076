use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SweepError;

/// One recurring reconciliation job over a predicate-selected set of orders.
#[async_trait]
pub trait Sweep: Send + Sync + 'static {
    /// Name used in logs and metric labels.
    fn name(&self) -> &'static str;

    /// Runs the sweep once as of `now`.
    async fn run(&self, now: DateTime<Utc>) -> Result<SweepReport, SweepError>;
}

/// What a single run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Orders the predicate selected.
    pub selected: u64,
    /// Orders acted on successfully.
    pub affected: u64,
    /// Orders the run could not act on.
    pub failed: u64,
}

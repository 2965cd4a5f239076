//! Drives a [`Sweep`] on a fixed interval.
//!
//! Each tick is bounded by the sweep's deadline and guarded so that at most
//! one run of the same sweep executes at a time. A tick that finds the
//! previous run still executing is skipped, not queued.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::SweepConfig;
use crate::sweep::{Sweep, SweepReport};

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Completed(SweepReport),
    /// The previous run was still executing.
    Skipped,
    Failed,
    TimedOut,
}

impl TickOutcome {
    fn label(&self) -> &'static str {
        match self {
            TickOutcome::Completed(_) => "completed",
            TickOutcome::Skipped => "skipped",
            TickOutcome::Failed => "failed",
            TickOutcome::TimedOut => "timed_out",
        }
    }
}

/// A sweep together with its schedule and re-entrancy guard.
pub struct RecurringSweep<W> {
    sweep: W,
    config: SweepConfig,
    guard: Arc<Mutex<()>>,
}

impl<W: Sweep> RecurringSweep<W> {
    pub fn new(sweep: W, config: SweepConfig) -> Self {
        Self {
            sweep,
            config,
            guard: Arc::new(Mutex::new(())),
        }
    }

    pub fn sweep(&self) -> &W {
        &self.sweep
    }

    /// Runs one guarded, deadline-bounded iteration.
    pub async fn tick(&self) -> TickOutcome {
        let name = self.sweep.name();
        let Ok(_running) = Arc::clone(&self.guard).try_lock_owned() else {
            tracing::warn!(sweep = name, "previous run still executing, skipping tick");
            metrics::counter!("sweep_runs_total", "sweep" => name, "outcome" => "skipped")
                .increment(1);
            return TickOutcome::Skipped;
        };

        let started = Instant::now();
        let outcome =
            match tokio::time::timeout(self.config.deadline, self.sweep.run(Utc::now())).await {
                Ok(Ok(report)) => {
                    tracing::debug!(sweep = name, ?report, "sweep run completed");
                    TickOutcome::Completed(report)
                }
                Ok(Err(e)) => {
                    tracing::error!(sweep = name, error = %e, "sweep run failed");
                    TickOutcome::Failed
                }
                Err(_) => {
                    tracing::error!(
                        sweep = name,
                        deadline = ?self.config.deadline,
                        "sweep run exceeded deadline"
                    );
                    TickOutcome::TimedOut
                }
            };

        metrics::histogram!("sweep_duration_seconds", "sweep" => name)
            .record(started.elapsed().as_secs_f64());
        metrics::counter!("sweep_runs_total", "sweep" => name, "outcome" => outcome.label())
            .increment(1);

        outcome
    }

    /// Ticks every interval until `shutdown` is cancelled.
    ///
    /// The first tick fires immediately. Each run is spawned so a slow run
    /// never delays the timer. On shutdown this waits for an in-flight run to
    /// finish, which the deadline bounds.
    pub async fn run(self, shutdown: CancellationToken) {
        let name = self.sweep.name();
        let this = Arc::new(self);
        let mut interval = tokio::time::interval(this.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(sweep = name, interval = ?this.config.interval, "sweep started");

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    let this = Arc::clone(&this);
                    tokio::spawn(async move {
                        this.tick().await;
                    });
                }
            }
        }

        let _drained = this.guard.lock().await;
        tracing::info!(sweep = name, "sweep stopped");
    }
}

//! Scheduler configuration loaded from environment variables.

use std::time::Duration;

use crate::error::SweepError;

/// How often a sweep fires and how long one run may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepConfig {
    pub interval: Duration,
    pub deadline: Duration,
}

impl SweepConfig {
    pub fn new(interval: Duration, deadline: Duration) -> Self {
        Self { interval, deadline }
    }
}

/// Age range of pending orders that are due a payment reminder.
///
/// Both bounds are exclusive: an order qualifies when
/// `now - end < created_at < now - start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderWindow {
    pub start: Duration,
    pub end: Duration,
}

/// Configuration for both reconciliation sweeps.
///
/// Reads from environment variables (values in seconds):
/// - `ORDER_CANCEL_INTERVAL_SECS` (default: `600`)
/// - `ORDER_CANCEL_GRACE_SECS` (default: `1800`)
/// - `ORDER_REMINDER_INTERVAL_SECS` (default: `1800`)
/// - `ORDER_REMINDER_WINDOW_START_SECS` (default: `900`)
/// - `ORDER_REMINDER_WINDOW_END_SECS` (default: `1500`)
/// - `ORDER_SWEEP_DEADLINE_SECS` (default: `30`), shared by both sweeps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub timeout_cancel: SweepConfig,
    /// Pending orders older than this are cancelled.
    pub cancel_grace: Duration,
    pub payment_reminder: SweepConfig,
    pub reminder_window: ReminderWindow,
}

const MINUTE: u64 = 60;

impl Default for SchedulerConfig {
    fn default() -> Self {
        let deadline = Duration::from_secs(30);
        Self {
            timeout_cancel: SweepConfig::new(Duration::from_secs(10 * MINUTE), deadline),
            cancel_grace: Duration::from_secs(30 * MINUTE),
            payment_reminder: SweepConfig::new(Duration::from_secs(30 * MINUTE), deadline),
            reminder_window: ReminderWindow {
                start: Duration::from_secs(15 * MINUTE),
                end: Duration::from_secs(25 * MINUTE),
            },
        }
    }
}

impl SchedulerConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults for
    /// missing or unparseable values.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let secs = |key: &str, default: Duration| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        };

        let defaults = Self::default();
        let deadline = secs("ORDER_SWEEP_DEADLINE_SECS", defaults.timeout_cancel.deadline);

        Self {
            timeout_cancel: SweepConfig::new(
                secs("ORDER_CANCEL_INTERVAL_SECS", defaults.timeout_cancel.interval),
                deadline,
            ),
            cancel_grace: secs("ORDER_CANCEL_GRACE_SECS", defaults.cancel_grace),
            payment_reminder: SweepConfig::new(
                secs(
                    "ORDER_REMINDER_INTERVAL_SECS",
                    defaults.payment_reminder.interval,
                ),
                deadline,
            ),
            reminder_window: ReminderWindow {
                start: secs(
                    "ORDER_REMINDER_WINDOW_START_SECS",
                    defaults.reminder_window.start,
                ),
                end: secs(
                    "ORDER_REMINDER_WINDOW_END_SECS",
                    defaults.reminder_window.end,
                ),
            },
        }
    }

    /// Rejects configurations the sweeps cannot run with.
    pub fn validate(&self) -> Result<(), SweepError> {
        for (name, sweep) in [
            ("timeout-cancel", self.timeout_cancel),
            ("payment-reminder", self.payment_reminder),
        ] {
            if sweep.interval.is_zero() {
                return Err(SweepError::Config(format!("{name} interval must be positive")));
            }
            if sweep.deadline.is_zero() {
                return Err(SweepError::Config(format!("{name} deadline must be positive")));
            }
        }

        if self.reminder_window.start >= self.reminder_window.end {
            return Err(SweepError::Config(format!(
                "reminder window start ({:?}) must be before its end ({:?})",
                self.reminder_window.start, self.reminder_window.end
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = SchedulerConfig::default();
        assert_eq!(config.timeout_cancel.interval, Duration::from_secs(600));
        assert_eq!(config.timeout_cancel.deadline, Duration::from_secs(30));
        assert_eq!(config.cancel_grace, Duration::from_secs(1800));
        assert_eq!(config.payment_reminder.interval, Duration::from_secs(1800));
        assert_eq!(config.reminder_window.start, Duration::from_secs(900));
        assert_eq!(config.reminder_window.end, Duration::from_secs(1500));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = SchedulerConfig::from_vars(vars(&[
            ("ORDER_CANCEL_INTERVAL_SECS", "60"),
            ("ORDER_SWEEP_DEADLINE_SECS", "5"),
            ("ORDER_REMINDER_WINDOW_END_SECS", "2000"),
        ]));

        assert_eq!(config.timeout_cancel.interval, Duration::from_secs(60));
        assert_eq!(config.timeout_cancel.deadline, Duration::from_secs(5));
        assert_eq!(config.payment_reminder.deadline, Duration::from_secs(5));
        assert_eq!(config.reminder_window.end, Duration::from_secs(2000));
        assert_eq!(config.cancel_grace, Duration::from_secs(1800));
    }

    #[test]
    fn test_unparseable_values_fall_back() {
        let config = SchedulerConfig::from_vars(vars(&[("ORDER_CANCEL_GRACE_SECS", "soon")]));
        assert_eq!(config.cancel_grace, Duration::from_secs(1800));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = SchedulerConfig::from_vars(vars(&[("ORDER_REMINDER_INTERVAL_SECS", "0")]));
        assert!(matches!(config.validate(), Err(SweepError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_deadline() {
        let config = SchedulerConfig::from_vars(vars(&[("ORDER_SWEEP_DEADLINE_SECS", "0")]));
        assert!(matches!(config.validate(), Err(SweepError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_inverted_window() {
        let config = SchedulerConfig::from_vars(vars(&[
            ("ORDER_REMINDER_WINDOW_START_SECS", "1500"),
            ("ORDER_REMINDER_WINDOW_END_SECS", "900"),
        ]));
        assert!(matches!(config.validate(), Err(SweepError::Config(_))));
    }
}

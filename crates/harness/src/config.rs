//! Harness timing configuration.
//!
//! Defaults match the pipeline test contract: a one minute global deadline,
//! predicate evaluation every 100 ms and a five second shutdown grace window.
//! Each can be overridden through the environment for slow CI machines:
//!
//! | Variable | Unit |
//! |----------|------|
//! | `PIPELINE_TESTS_DEADLINE_SECS` | seconds |
//! | `PIPELINE_TESTS_POLL_INTERVAL_MS` | milliseconds |
//! | `PIPELINE_TESTS_SHUTDOWN_GRACE_SECS` | seconds |

use std::time::Duration;

use tracing::warn;

use crate::error::HarnessError;

/// Global deadline override.
pub const DEADLINE_ENV: &str = "PIPELINE_TESTS_DEADLINE_SECS";
/// Poll interval override.
pub const POLL_INTERVAL_ENV: &str = "PIPELINE_TESTS_POLL_INTERVAL_MS";
/// Shutdown grace override.
pub const SHUTDOWN_GRACE_ENV: &str = "PIPELINE_TESTS_SHUTDOWN_GRACE_SECS";

/// Default global deadline.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(60);
/// Default predicate evaluation interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Default shutdown grace window.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Timing knobs of one harness run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Bound on the whole race; expiry is always fatal
    pub deadline: Duration,
    /// Interval between predicate evaluations
    pub poll_interval: Duration,
    /// Time the engine gets to stop after cancellation
    pub shutdown_grace: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            deadline: DEFAULT_DEADLINE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

impl HarnessConfig {
    /// Defaults plus environment overrides, validated.
    pub fn from_env() -> Result<Self, HarnessError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Override fields from `PIPELINE_TESTS_*` variables.
    ///
    /// Unparseable or zero values are ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        override_duration(&mut self.deadline, DEADLINE_ENV, Duration::from_secs);
        override_duration(&mut self.poll_interval, POLL_INTERVAL_ENV, Duration::from_millis);
        override_duration(&mut self.shutdown_grace, SHUTDOWN_GRACE_ENV, Duration::from_secs);
    }

    /// Reject zero durations.
    pub fn validate(&self) -> Result<(), HarnessError> {
        for (field, value) in [
            ("deadline", self.deadline),
            ("poll_interval", self.poll_interval),
            ("shutdown_grace", self.shutdown_grace),
        ] {
            if value.is_zero() {
                return Err(HarnessError::InvalidConfig {
                    field: field.to_owned(),
                    reason: "must be greater than zero".to_owned(),
                });
            }
        }
        Ok(())
    }

    /// Replace the deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Replace the poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Replace the shutdown grace window.
    pub fn with_shutdown_grace(mut self, shutdown_grace: Duration) -> Self {
        self.shutdown_grace = shutdown_grace;
        self
    }
}

fn override_duration(target: &mut Duration, env_key: &str, unit: fn(u64) -> Duration) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(n) if n > 0 => *target = unit(n),
            _ => warn!(env_key, value = %val, "ignoring invalid env override"),
        }
    }
}

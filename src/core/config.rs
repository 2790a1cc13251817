//! # Global runtime configuration.
//!
//! Provides [`Config`]: centralized settings for the driver, its scheduler and its workers.
//!
//! Config is used in three ways:
//! 1. **Driver creation**: `Driver::builder(config)`
//! 2. **Scheduler creation**: `WakeScheduler::from_config(&config, bus)`
//! 3. **Worker targets**: `config.sleep_range().next()` per worker
//!
//! ## Command line
//! [`Config::from_args`] accepts either no arguments (defaults) or exactly
//! `workers min_ms max_ms`, with fractional milliseconds allowed.
//!
//! ## Sentinel values
//! - `max_sleep < min_sleep` → every worker sleeps `min_sleep`
//! - `bus_capacity = 0` → clamped to 1

use std::time::Duration;

use crate::error::ConfigError;
use crate::policies::{PollPolicy, SleepRange};
use crate::scheduler::QueueKind;

/// Usage line printed when the binary runs without arguments or with a wrong count.
pub const USAGE: &str =
    "Usage: sleep_drift [workers(unsigned int)] [min_sleep_ms(float)] [max_sleep_ms(float)]";

/// Global configuration for the driver runtime.
///
/// Defines:
/// - **Fleet shape**: number of workers and the range their targets are drawn from
/// - **Wake loop**: poll pacing and pending-wake structure
/// - **Shutdown behavior**: grace period for stopping task contexts
/// - **Event system**: bus capacity for event delivery
///
/// ## Field semantics
/// - `workers`: Number of workers to start (must be positive)
/// - `min_sleep`/`max_sleep`: Target range, `[min, max)`; inverted degrades to `min`
/// - `poll`: Wake loop pacing (`Busy` = yield between scans)
/// - `queue`: Pending-wake structure (`Scan` for small fleets, `Heap` for large)
/// - `grace`: Maximum wait for contexts to stop (`0s` = report stuck immediately)
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
#[derive(Clone, Debug)]
pub struct Config {
    /// Number of workers the driver starts.
    pub workers: usize,

    /// Lower bound of the per-worker target sleep.
    pub min_sleep: Duration,

    /// Upper bound (exclusive) of the per-worker target sleep.
    pub max_sleep: Duration,

    /// Wake loop pacing.
    pub poll: PollPolicy,

    /// Pending-wake structure used by the scheduler.
    pub queue: QueueKind,

    /// Maximum time to wait for task contexts to stop during shutdown.
    ///
    /// If exceeded, shutdown returns `RuntimeError::GraceExceeded`.
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Observers that lag behind more than `bus_capacity` messages receive `Lagged`
    /// and skip older items. Every worker publishes one event per cycle, so size it
    /// with `workers / min_sleep` in mind.
    pub bus_capacity: usize,
}

/// Result of [`Config::from_args`].
#[derive(Clone, Debug)]
pub struct ParsedArgs {
    /// Configuration to run with.
    pub config: Config,
    /// `true` when no arguments were given and defaults apply.
    pub defaulted: bool,
}

impl Config {
    /// Returns the generator worker targets are drawn from.
    #[inline]
    pub fn sleep_range(&self) -> SleepRange {
        SleepRange::new(self.min_sleep, self.max_sleep)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Checks the configuration before anything is built.
    ///
    /// A target of zero makes the error rate undefined, so any range whose floor is
    /// zero is refused.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.sleep_range().floor().is_zero() {
            return Err(ConfigError::ZeroSleep {
                min: self.min_sleep,
                max: self.max_sleep,
            });
        }
        Ok(())
    }

    /// Parses `workers min_ms max_ms` (program name excluded).
    ///
    /// No arguments yields the defaults with `defaulted = true`; any other count or a
    /// malformed value is an [`ConfigError::InvalidArgument`].
    pub fn from_args<I, S>(args: I) -> Result<ParsedArgs, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<S> = args.into_iter().collect();
        match args.as_slice() {
            [] => Ok(ParsedArgs {
                config: Config::default(),
                defaulted: true,
            }),
            [workers, min_ms, max_ms] => {
                let workers = workers.as_ref().trim().parse::<usize>().map_err(|e| {
                    ConfigError::InvalidArgument {
                        name: "workers",
                        reason: e.to_string(),
                    }
                })?;
                let config = Config {
                    workers,
                    min_sleep: parse_millis("min_ms", min_ms.as_ref())?,
                    max_sleep: parse_millis("max_ms", max_ms.as_ref())?,
                    ..Config::default()
                };
                Ok(ParsedArgs {
                    config,
                    defaulted: false,
                })
            }
            other => Err(ConfigError::InvalidArgument {
                name: "argc",
                reason: format!("expected 0 or 3 arguments, got {}", other.len()),
            }),
        }
    }
}

fn parse_millis(name: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    let ms = raw
        .trim()
        .parse::<f64>()
        .map_err(|e| ConfigError::InvalidArgument {
            name,
            reason: e.to_string(),
        })?;
    Duration::try_from_secs_f64(ms / 1000.0).map_err(|e| ConfigError::InvalidArgument {
        name,
        reason: e.to_string(),
    })
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `workers = 10`
    /// - `min_sleep = 1ms`, `max_sleep = 100ms`
    /// - `poll = PollPolicy::Busy`
    /// - `queue = QueueKind::Scan`
    /// - `grace = 5s`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            workers: 10,
            min_sleep: Duration::from_millis(1),
            max_sleep: Duration::from_millis(100),
            poll: PollPolicy::default(),
            queue: QueueKind::default(),
            grace: Duration::from_secs(5),
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = Config::default();
        assert_eq!(cfg.workers, 10);
        assert_eq!(cfg.min_sleep, Duration::from_millis(1));
        assert_eq!(cfg.max_sleep, Duration::from_millis(100));
        cfg.validate().expect("defaults must validate");
    }

    #[test]
    fn zero_workers_is_rejected() {
        let cfg = Config {
            workers: 0,
            ..Config::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::NoWorkers));
    }

    #[test]
    fn zero_floor_is_rejected_even_when_inverted() {
        let zero_min = Config {
            min_sleep: Duration::ZERO,
            ..Config::default()
        };
        assert!(matches!(
            zero_min.validate(),
            Err(ConfigError::ZeroSleep { .. })
        ));

        // Inverted ranges degrade to min, so a positive min is fine.
        let inverted = Config {
            min_sleep: Duration::from_millis(5),
            max_sleep: Duration::ZERO,
            ..Config::default()
        };
        inverted.validate().expect("inverted with positive min");
        assert_eq!(inverted.sleep_range().next(), Duration::from_millis(5));
    }

    #[test]
    fn no_args_means_defaults() {
        let parsed = Config::from_args(Vec::<String>::new()).expect("empty");
        assert!(parsed.defaulted);
        assert_eq!(parsed.config.workers, 10);
    }

    #[test]
    fn three_args_are_parsed_with_fractional_millis() {
        let parsed = Config::from_args(["4", "0.5", "2.25"]).expect("valid");
        assert!(!parsed.defaulted);
        assert_eq!(parsed.config.workers, 4);
        assert_eq!(parsed.config.min_sleep, Duration::from_micros(500));
        assert_eq!(parsed.config.max_sleep, Duration::from_micros(2250));
    }

    #[test]
    fn wrong_count_or_bad_values_are_rejected() {
        let err = Config::from_args(["4", "1"]).expect_err("two args");
        assert_eq!(err.as_label(), "config_invalid_argument");
        assert!(matches!(
            err,
            ConfigError::InvalidArgument { name: "argc", .. }
        ));

        let err = Config::from_args(["many", "1", "2"]).expect_err("bad workers");
        assert!(matches!(
            err,
            ConfigError::InvalidArgument {
                name: "workers",
                ..
            }
        ));

        let err = Config::from_args(["1", "-3", "2"]).expect_err("negative");
        assert!(matches!(
            err,
            ConfigError::InvalidArgument { name: "min_ms", .. }
        ));
    }
}

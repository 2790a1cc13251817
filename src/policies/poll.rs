//! # Wake loop pacing.
//!
//! [`PollPolicy`] decides what the scheduler loop does between two scans of the
//! pending-wake structure.
//!
//! - [`PollPolicy::Busy`]: yield to the runtime and scan again immediately. Lowest wake
//!   latency; keeps one runtime worker permanently busy.
//! - [`PollPolicy::Interval`]: sleep for a fixed period between scans. Wake latency grows
//!   by up to the period plus the timer granularity (1 ms for tokio).

use std::time::Duration;

/// Pacing of the scheduler's scan loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PollPolicy {
    /// Scan continuously, yielding once per iteration.
    #[default]
    Busy,
    /// Sleep for the given period between scans (`0` behaves like `Busy`).
    Interval(Duration),
}

impl PollPolicy {
    /// Waits according to the policy. Called once per loop iteration.
    pub async fn idle(&self) {
        match self {
            PollPolicy::Interval(period) if !period.is_zero() => {
                tokio::time::sleep(*period).await;
            }
            _ => tokio::task::yield_now().await,
        }
    }

    /// Worst-case delay the policy itself adds to a wake.
    pub fn added_latency(&self) -> Duration {
        match self {
            PollPolicy::Busy => Duration::ZERO,
            PollPolicy::Interval(period) => *period,
        }
    }
}

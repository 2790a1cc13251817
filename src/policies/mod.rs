//! Scheduling knobs.
//!
//! ## Contents
//! - [`SleepRange`] how long each worker sleeps (drawn once per worker)
//! - [`PollPolicy`] how the wake loop paces its scans
//!
//! ## Quick wiring
//! ```text
//! Config { min_sleep, max_sleep, poll, .. }
//!      ├─► SleepRange::new(min_sleep, max_sleep).next() ─► Worker target
//!      └─► WakeScheduler loop: scan(); poll.idle().await; repeat
//! ```
//!
//! ## Defaults
//! - `PollPolicy::Busy` (lowest latency, one busy runtime worker).
//! - `SleepRange` 1ms..100ms through `Config::default()`.

mod poll;
mod sleep_range;

pub use poll::PollPolicy;
pub use sleep_range::SleepRange;

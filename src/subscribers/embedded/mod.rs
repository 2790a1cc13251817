//! # Built-in subscribers
//!
//! - [`DriftTracker`]: per-worker drift summary (always available; the driver uses it).
//! - [`LogWriter`]: prints events in a human-readable form (feature `logging`).

mod drift;
#[cfg(feature = "logging")]
mod log;

pub use drift::{DriftTracker, WorkerDrift};
#[cfg(feature = "logging")]
pub use log::LogWriter;

//! # Event subscribers for the wakevisor runtime.
//!
//! Runtime events travel over the [`Bus`](crate::Bus); the driver's listener hands
//! each one to a [`SubscriberSet`], which feeds every [`Subscribe`] implementation
//! through its own bounded queue.
//!
//! ```text
//! Worker / WakeScheduler ── publish(Event) ──► Bus ──► driver listener
//!                                                          │
//!                                                  SubscriberSet::emit()
//!                                          ┌───────────────┼───────────────┐
//!                                          ▼               ▼               ▼
//!                                     DriftTracker     LogWriter        custom
//! ```
//!
//! ## Subscriber types
//! - **Passive**: observe and react (logging, exporters)
//! - **Stateful**: fold events into state ([`DriftTracker`])

mod embedded;
mod set;
mod subscriber;

pub use embedded::{DriftTracker, WorkerDrift};
#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;

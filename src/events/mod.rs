//! Runtime events: types, observation payload and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and metadata
//! - [`Observation`] one measured sleep cycle of a worker
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `WakeScheduler` (start, registration, task stop/death),
//!   `Worker` (observations), `Driver` (shutdown), `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the driver's listener (fans out to `SubscriberSet`) and anything that
//!   calls [`Bus::subscribe`].

mod bus;
mod event;
mod observation;

pub use bus::Bus;
pub use event::{Event, EventKind};
pub use observation::Observation;

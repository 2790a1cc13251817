//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`] so that the scheduler, every task context and
//! the driver can publish without blocking, while the driver's listener (and tests) read
//! the stream.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                    Receivers:
//!   Worker 1 (SleepObserved) ──┐
//!   Worker N (SleepObserved) ──┼──► Bus ──► driver listener ──► SubscriberSet
//!   WakeScheduler (lifecycle) ─┤        └─► any other bus.subscribe()
//!   Driver (shutdown)         ─┘
//! ```
//!
//! ## Rules
//! - `publish()` never blocks and never fails; without receivers the event is dropped.
//! - One ring buffer of `capacity` events is shared by all receivers.
//! - A receiver that falls behind gets `RecvError::Lagged(n)` and skips `n` events.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events.
///
/// Cheap to clone (holds the `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus; `capacity` is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all receivers alive at send time.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates an independent receiver observing events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

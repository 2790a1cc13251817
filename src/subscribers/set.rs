//! # Non-blocking event fan-out to multiple subscribers.
//!
//! Provides [`SubscriberSet`], which hands every event to each subscriber's own
//! bounded queue without awaiting any of them.
//!
//! ## Architecture
//! ```text
//! emit(event)
//!     │
//!     ├──► [queue 1] ──► worker 1 ──► subscriber1.on_event()
//!     │    (bounded)         └──────► panic → SubscriberPanicked
//!     ├──► [queue 2] ──► worker 2 ──► subscriber2.on_event()
//!     └──► [queue N] ──► worker N ──► subscriberN.on_event()
//! ```
//!
//! ## Rules
//! - **No cross-subscriber ordering**
//! - **Overflow**: event dropped for that subscriber only, `SubscriberOverflow` published
//! - **Non-blocking**: `emit()` returns immediately (uses `try_send`)
//! - **Per-subscriber FIFO**
//! - **Drain on shutdown**: `shutdown()` closes every queue and waits for the backlog;
//!   later emits are dropped silently
//!
//! `AssertUnwindSafe` is used around `on_event`; a subscriber that panics while holding
//! one of its own locks may leave that state inconsistent.

use std::sync::Arc;

use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use tokio::{sync::mpsc, task::JoinHandle};

use crate::error::panic_message;
use crate::events::{Bus, Event};

use super::Subscribe;

struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator for event subscribers.
pub struct SubscriberSet {
    channels: RwLock<Vec<SubscriberChannel>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    count: usize,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let name = sub.name();
            let (tx, rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));
            workers.push(tokio::spawn(Self::worker(sub, rx, bus.clone())));
            channels.push(SubscriberChannel { name, sender: tx });
        }
        Self {
            count: channels.len(),
            channels: RwLock::new(channels),
            workers: Mutex::new(workers),
            bus,
        }
    }

    async fn worker(sub: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Event>>, bus: Bus) {
        while let Some(ev) = rx.recv().await {
            let fut = sub.on_event(ev.as_ref());
            if let Err(payload) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                bus.publish(Event::subscriber_panicked(
                    sub.name(),
                    panic_message(&*payload),
                ));
            }
        }
    }

    /// Emits an event to all subscribers (clones the event once).
    pub fn emit(&self, event: &Event) {
        self.emit_arc(Arc::new(event.clone()));
    }

    /// Emits a shared event to all subscribers.
    ///
    /// Overflow reports are not re-reported when they overflow themselves.
    pub fn emit_arc(&self, event: Arc<Event>) {
        let quiet = event.is_subscriber_overflow();
        for channel in self.channels.read().iter() {
            let reason = match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !quiet {
                self.bus
                    .publish(Event::subscriber_overflow(channel.name, reason));
            }
        }
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Closes all queues and waits until every worker has drained its backlog.
    ///
    /// Idempotent. Events emitted afterwards reach no subscriber.
    pub async fn shutdown(&self) {
        drop(std::mem::take(&mut *self.channels.write()));
        let workers = std::mem::take(&mut *self.workers.lock());
        for h in workers {
            let _ = h.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use async_trait::async_trait;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<u64>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            self.seen.lock().push(ev.seq);
        }
        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    struct Exploding;

    #[async_trait]
    impl Subscribe for Exploding {
        async fn on_event(&self, _ev: &Event) {
            panic!("subscriber exploded");
        }
        fn name(&self) -> &'static str {
            "exploding"
        }
    }

    struct Stalled;

    #[async_trait]
    impl Subscribe for Stalled {
        async fn on_event(&self, _ev: &Event) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        fn name(&self) -> &'static str {
            "stalled"
        }
        fn queue_capacity(&self) -> usize {
            1
        }
    }

    #[tokio::test]
    async fn delivers_in_order_and_drains_on_shutdown() {
        let bus = Bus::new(16);
        let rec = Arc::new(Recorder::default());
        let set = SubscriberSet::new(vec![rec.clone() as Arc<dyn Subscribe>], bus);
        let events: Vec<Event> = (0..5).map(|_| Event::new(EventKind::TaskStopped)).collect();
        for ev in &events {
            set.emit(ev);
        }
        set.shutdown().await;
        let expected: Vec<u64> = events.iter().map(|e| e.seq).collect();
        assert_eq!(*rec.seen.lock(), expected);
    }

    #[tokio::test]
    async fn panics_are_isolated_and_reported() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let rec = Arc::new(Recorder::default());
        let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Exploding), rec.clone()];
        let set = SubscriberSet::new(subs, bus);
        set.emit(&Event::new(EventKind::SchedulerStarted));
        set.emit(&Event::new(EventKind::SchedulerStarted));
        set.shutdown().await;

        assert_eq!(rec.seen.lock().len(), 2);
        let ev = rx.recv().await.expect("panic report");
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert_eq!(ev.task.as_deref(), Some("exploding"));
        assert_eq!(ev.reason.as_deref(), Some("subscriber exploded"));
    }

    #[tokio::test]
    async fn overflow_drops_for_one_subscriber_only() {
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let rec = Arc::new(Recorder::default());
        let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Stalled), rec.clone()];
        let set = SubscriberSet::new(subs, bus);
        for _ in 0..4 {
            set.emit(&Event::new(EventKind::TaskRegistered));
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(rec.seen.lock().len(), 4);

        let overflow = rx.try_recv().expect("overflow reported");
        assert!(overflow.is_subscriber_overflow());
        assert_eq!(overflow.task.as_deref(), Some("stalled"));
        assert_eq!(set.len(), 2);
    }

    #[tokio::test]
    async fn shared_set_drains_once_and_ignores_later_emits() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let rec = Arc::new(Recorder::default());
        let set = Arc::new(SubscriberSet::new(vec![rec.clone() as Arc<dyn Subscribe>], bus));
        let before = Event::new(EventKind::TaskStopped);
        set.emit(&before);

        let other = Arc::clone(&set);
        other.shutdown().await;
        assert_eq!(*rec.seen.lock(), [before.seq]);

        set.emit(&Event::new(EventKind::AllStoppedWithin));
        set.shutdown().await;
        assert_eq!(rec.seen.lock().len(), 1);
        assert!(rx.try_recv().is_err(), "closed queues are not overflow");
        assert_eq!(set.len(), 1);
    }
}

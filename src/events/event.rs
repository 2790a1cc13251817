//! # Runtime events emitted by the scheduler, tasks and workers.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Scheduler events**: loop started, task registered
//! - **Measurement events**: one observation per completed sleep cycle
//! - **Shutdown events**: shutdown requested, tasks stopped or dead, grace outcome
//! - **Subscriber events**: overflow and panic reports from subscriber workers
//!
//! The [`Event`] struct carries additional metadata such as timestamps, task name,
//! reasons and the [`Observation`] payload.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use wakevisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TaskDead)
//!     .with_task("worker-1")
//!     .with_reason("boom");
//!
//! assert_eq!(ev.kind, EventKind::TaskDead);
//! assert_eq!(ev.task.as_deref(), Some("worker-1"));
//! assert_eq!(ev.reason.as_deref(), Some("boom"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use super::observation::Observation;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Scheduler events ===
    /// Wake loop started.
    SchedulerStarted,

    /// Task registered with the scheduler.
    ///
    /// Sets:
    /// - `task`: task name
    TaskRegistered,

    // === Measurement events ===
    /// A worker completed a sleep cycle.
    ///
    /// Sets:
    /// - `task`: worker task name
    /// - `observation`: the measured record
    SleepObserved,

    // === Shutdown events ===
    /// Shutdown requested (OS signal or caller-supplied trigger).
    ShutdownRequested,

    /// Task context stopped and was joined.
    ///
    /// Sets:
    /// - `task`: task name
    TaskStopped,

    /// Task context terminated by a panic in its cycle.
    ///
    /// Sets:
    /// - `task`: task name
    /// - `reason`: panic message
    TaskDead,

    /// All task contexts stopped within the configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some contexts did not stop in time.
    ///
    /// Sets:
    /// - `delay_ms`: the grace period (ms)
    GraceExceeded,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the task, if applicable.
    pub task: Option<Arc<str>>,
    /// Human-readable reason (panics, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// A duration attached to the event in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Sleep measurement, set for [`EventKind::SleepObserved`].
    pub observation: Option<Observation>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            reason: None,
            delay_ms: None,
            observation: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a task name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a duration (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a sleep observation.
    #[inline]
    pub fn with_observation(mut self, obs: Observation) -> Self {
        self.observation = Some(obs);
        self
    }

    /// Creates a sleep observation event for `task`.
    #[inline]
    pub fn observed(task: impl Into<Arc<str>>, obs: Observation) -> Self {
        Event::new(EventKind::SleepObserved)
            .with_task(task)
            .with_observation(obs)
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }
}

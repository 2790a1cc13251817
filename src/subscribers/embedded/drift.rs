//! # Per-worker drift tracker with sequence-based ordering.
//!
//! Folds `SleepObserved` events into one [`WorkerDrift`] summary per worker and marks
//! workers finished on `TaskStopped` / `TaskDead`.
//!
//! ## Architecture
//! ```text
//! Worker ──► Bus ──► driver listener ──► SubscriberSet ──► DriftTracker::update()
//!                                                                 │
//!                                                                 ▼
//!                                                   HashMap<String, WorkerDrift>
//!                                                 (name → {seq, records, rates})
//! ```
//!
//! ## Rules
//! - Events with `seq <= last_seq` for the same task are **rejected** (stale)
//! - Events without a task name are ignored
//! - Reads (`snapshot`, `get`) are **eventually consistent** with the bus

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Summary of one worker's measurements.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerDrift {
    /// Task name of the worker.
    pub name: String,
    /// Worker id (from its observations; `0` until the first one).
    pub worker: u64,
    /// Number of observations folded in.
    pub records: u64,
    /// Error rate of the latest observation.
    pub last_error_rate: f64,
    /// Largest error rate reported by the worker.
    pub max_error_rate: f64,
    /// `true` once the worker's context stopped or died.
    pub finished: bool,
    last_seq: Option<u64>,
}

impl WorkerDrift {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            worker: 0,
            records: 0,
            last_error_rate: 0.0,
            max_error_rate: 0.0,
            finished: false,
            last_seq: None,
        }
    }
}

/// Stateful subscriber summarizing drift per worker.
pub struct DriftTracker {
    state: RwLock<HashMap<String, WorkerDrift>>,
    capacity: usize,
}

impl DriftTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(HashMap::new()),
            capacity: 4096,
        }
    }

    /// Configures the subscriber queue capacity (clamped to ≥ 1).
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Applies `ev` if it is newer than the last one seen for its task.
    ///
    /// Returns `true` if the summary changed.
    /// ```text
    /// update(SleepObserved, seq=100) → records += 1, last_seq=100
    /// update(SleepObserved, seq=99)  → rejected (stale)
    /// ```
    pub async fn update(&self, ev: &Event) -> bool {
        let Some(name) = ev.task.as_deref() else {
            return false;
        };
        let relevant = matches!(
            ev.kind,
            EventKind::SleepObserved | EventKind::TaskStopped | EventKind::TaskDead
        );
        if !relevant {
            return false;
        }

        let mut state = self.state.write().await;
        let entry = state
            .entry(name.to_string())
            .or_insert_with(|| WorkerDrift::new(name));
        if entry.last_seq.is_some_and(|last| ev.seq <= last) {
            return false;
        }
        entry.last_seq = Some(ev.seq);

        match (ev.kind, ev.observation) {
            (EventKind::SleepObserved, Some(obs)) => {
                entry.worker = obs.worker;
                entry.records += 1;
                entry.last_error_rate = obs.error_rate;
                if obs.max_error_rate > entry.max_error_rate {
                    entry.max_error_rate = obs.max_error_rate;
                }
                true
            }
            (EventKind::SleepObserved, None) => false,
            _ => {
                entry.finished = true;
                true
            }
        }
    }

    /// Returns every summary sorted by worker name.
    pub async fn snapshot(&self) -> Vec<WorkerDrift> {
        let state = self.state.read().await;
        let mut all: Vec<WorkerDrift> = state.values().cloned().collect();
        all.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Summary for one worker, if it has reported anything.
    pub async fn get(&self, name: &str) -> Option<WorkerDrift> {
        self.state.read().await.get(name).cloned()
    }
}

impl Default for DriftTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Subscribe for DriftTracker {
    async fn on_event(&self, ev: &Event) {
        self.update(ev).await;
    }

    fn name(&self) -> &'static str {
        "drift-tracker"
    }

    fn queue_capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Observation;
    use std::time::Duration;

    fn observed(name: &str, cycle: u64, rate: f64, max: f64) -> Event {
        Event::observed(
            name,
            Observation {
                worker: 7,
                cycle,
                actual: Duration::from_millis(11),
                target: Duration::from_millis(10),
                error_rate: rate,
                max_error_rate: max,
            },
        )
    }

    #[tokio::test]
    async fn folds_observations_per_worker() {
        let tracker = DriftTracker::new();
        assert!(tracker.update(&observed("worker-7", 1, 0.1, 0.1)).await);
        assert!(tracker.update(&observed("worker-7", 2, 0.05, 0.1)).await);
        assert!(tracker.update(&observed("worker-8", 1, 0.3, 0.3)).await);

        let snap = tracker.snapshot().await;
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].name, "worker-7");
        assert_eq!(snap[0].records, 2);
        assert_eq!(snap[0].worker, 7);
        assert!((snap[0].last_error_rate - 0.05).abs() < 1e-12);
        assert!((snap[0].max_error_rate - 0.1).abs() < 1e-12);
        assert!(!snap[0].finished);
    }

    #[tokio::test]
    async fn stale_events_are_rejected() {
        let tracker = DriftTracker::new();
        let older = observed("w", 1, 0.9, 0.9);
        let newer = Event::new(EventKind::TaskStopped).with_task("w");
        assert!(tracker.update(&newer).await);
        assert!(!tracker.update(&older).await);

        let w = tracker.get("w").await.expect("tracked");
        assert!(w.finished);
        assert_eq!(w.records, 0);
    }

    #[tokio::test]
    async fn unrelated_or_anonymous_events_are_ignored() {
        let tracker = DriftTracker::new();
        assert!(!tracker.update(&Event::new(EventKind::SchedulerStarted)).await);
        assert!(
            !tracker
                .update(&Event::new(EventKind::TaskRegistered).with_task("w"))
                .await
        );
        assert!(tracker.snapshot().await.is_empty());
    }
}

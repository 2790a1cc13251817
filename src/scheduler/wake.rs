//! # WakeScheduler: one loop that wakes every sleeping task.
//!
//! Tasks suspend themselves with [`WakeScheduler::sleep_until`]; a single background
//! loop scans the pending-wake structure and resumes every task whose deadline has
//! passed. No per-task timers exist.
//!
//! ## Architecture
//! ```text
//! task context (many)                         wake loop (one)
//!   cycle ─► sleep_until(task, d)               loop {
//!              ├─► task.pause()                   ├─► lock state
//!              ├─► deadline = now + d             ├─► pop_due(now) ─► task.resume()
//!              └─► lock ─► pending.insert()       ├─► unlock
//!                                                 └─► poll.idle()   (yield or sleep)
//!                                               }
//! shutdown():
//!   stop loop ─► join loop ─► drain pending + registry ─► resume pending
//!             ─► stop every registered task (within grace) ─► TaskStopped/TaskDead
//! ```
//!
//! ## Rules
//! - The registry and the pending structure sit behind **one** lock, held only for a
//!   scan or an insert, never across an await.
//! - A task is pending at most once; sleeping again replaces its deadline.
//! - The pause is applied **before** the entry is inserted, so the loop can never resume
//!   a task that then pauses and waits forever.
//! - Sleeping a task that was never registered is a logic error and panics.
//! - Dropping the scheduler stops the loop and signals every registered task to stop.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::Config;
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::policies::PollPolicy;
use crate::tasks::{TaskId, TaskRef};

use super::queue::{QueueKind, WakeQueue};

/// Fallback horizon for durations that overflow `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Scheduler knobs, usually taken from [`Config`].
#[derive(Clone, Copy, Debug)]
pub struct SchedulerOptions {
    /// Pacing of the wake loop.
    pub poll: PollPolicy,
    /// Pending-wake structure.
    pub queue: QueueKind,
    /// Maximum time `shutdown()` waits for task contexts to stop.
    pub grace: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            poll: PollPolicy::default(),
            queue: QueueKind::default(),
            grace: Duration::from_secs(5),
        }
    }
}

impl From<&Config> for SchedulerOptions {
    fn from(cfg: &Config) -> Self {
        Self {
            poll: cfg.poll,
            queue: cfg.queue,
            grace: cfg.grace,
        }
    }
}

struct State {
    known: HashMap<TaskId, TaskRef>,
    pending: Box<dyn WakeQueue>,
}

struct Shared {
    state: Mutex<State>,
    running: CancellationToken,
    poll: PollPolicy,
    bus: Bus,
}

impl Shared {
    /// Resumes and removes every entry due at `now`.
    fn scan(&self, now: Instant) -> usize {
        let mut due = Vec::new();
        let mut state = self.state.lock();
        state.pending.pop_due(now, &mut due);
        for task in &due {
            task.resume();
        }
        due.len()
    }

    /// Empties the registry and the pending structure, resumes every pending task and
    /// signals every registered one to stop. Returns the registered tasks by id.
    fn release_all(&self) -> Vec<TaskRef> {
        let (pending, known) = {
            let mut state = self.state.lock();
            (state.pending.drain(), std::mem::take(&mut state.known))
        };
        for task in &pending {
            task.resume();
        }
        let mut tasks: Vec<TaskRef> = known.into_values().collect();
        tasks.sort_by_key(|t| t.id());
        for task in &tasks {
            task.signal_stop();
        }
        tasks
    }

    async fn wake_loop(self: Arc<Self>) {
        self.bus.publish(Event::new(EventKind::SchedulerStarted));
        loop {
            self.scan(Instant::now());
            tokio::select! {
                biased;
                _ = self.running.cancelled() => break,
                _ = self.poll.idle() => {}
            }
        }
    }
}

/// Single-loop sleep/wake coordinator.
pub struct WakeScheduler {
    shared: Arc<Shared>,
    wake_loop: Mutex<Option<JoinHandle<()>>>,
    closed: tokio::sync::Mutex<bool>,
    grace: Duration,
}

impl WakeScheduler {
    /// Creates a scheduler with default options and starts its loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(bus: Bus) -> Arc<Self> {
        Self::with_options(SchedulerOptions::default(), bus)
    }

    /// Creates a scheduler configured from `cfg` and starts its loop.
    pub fn from_config(cfg: &Config, bus: Bus) -> Arc<Self> {
        Self::with_options(SchedulerOptions::from(cfg), bus)
    }

    /// Creates a scheduler with explicit options and starts its loop.
    pub fn with_options(opts: SchedulerOptions, bus: Bus) -> Arc<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                known: HashMap::new(),
                pending: opts.queue.build(),
            }),
            running: CancellationToken::new(),
            poll: opts.poll,
            bus,
        });
        let handle = tokio::spawn(Arc::clone(&shared).wake_loop());
        Arc::new(Self {
            shared,
            wake_loop: Mutex::new(Some(handle)),
            closed: tokio::sync::Mutex::new(false),
            grace: opts.grace,
        })
    }

    /// Bus the scheduler (and its workers) publish to.
    pub fn bus(&self) -> &Bus {
        &self.shared.bus
    }

    /// Returns `true` until shutdown starts.
    pub fn is_running(&self) -> bool {
        !self.shared.running.is_cancelled()
    }

    /// Adds `task` to the set stopped on shutdown. Returns `false` if it was already
    /// known or the scheduler is shut down.
    pub fn register(&self, task: &TaskRef) -> bool {
        let inserted = {
            let mut state = self.shared.state.lock();
            if !self.is_running() || state.known.contains_key(&task.id()) {
                false
            } else {
                state.known.insert(task.id(), Arc::clone(task));
                true
            }
        };
        if inserted {
            self.shared
                .bus
                .publish(Event::new(EventKind::TaskRegistered).with_task(task.name()));
        }
        inserted
    }

    /// Pauses `task` and schedules its resumption `duration` from now.
    ///
    /// A pending wake for the same task is replaced. After shutdown the task is only
    /// paused; its stop is already under way.
    ///
    /// # Panics
    /// If `task` was never registered.
    pub fn sleep_until(&self, task: &TaskRef, duration: Duration) {
        task.pause();
        let now = Instant::now();
        let deadline = now
            .checked_add(duration)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);

        let mut state = self.shared.state.lock();
        if !self.is_running() {
            return;
        }
        assert!(
            state.known.contains_key(&task.id()),
            "sleep_until on unregistered task {}",
            task.name()
        );
        state.pending.insert(Arc::clone(task), deadline);
    }

    /// Runs one scan immediately. Returns the number of tasks resumed.
    pub fn scan_now(&self) -> usize {
        self.shared.scan(Instant::now())
    }

    /// Number of tasks with a pending wake.
    pub fn pending_len(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    /// Number of registered tasks.
    pub fn registered_len(&self) -> usize {
        self.shared.state.lock().known.len()
    }

    /// Pending deadline of `id`, if it is sleeping.
    pub fn deadline_of(&self, id: TaskId) -> Option<Instant> {
        self.shared.state.lock().pending.deadline_of(id)
    }

    /// Stops the loop, wakes and stops every registered task, clears all state.
    ///
    /// Idempotent; a concurrent second call waits for the first and returns `Ok(())`.
    /// Returns [`RuntimeError::GraceExceeded`] if some contexts did not stop in time.
    /// Those contexts were already told to stop; [`SuspendableTask::stop`](crate::tasks::SuspendableTask::stop)
    /// on them joins.
    ///
    /// Dropping the last handle without calling this signals every task to stop but
    /// joins nothing.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let mut closed = self.closed.lock().await;
        if *closed {
            return Ok(());
        }
        *closed = true;

        self.shared.running.cancel();
        let wake_loop = self.wake_loop.lock().take();
        if let Some(handle) = wake_loop {
            let _ = handle.await;
        }

        let tasks = self.shared.release_all();
        self.stop_all(tasks).await
    }

    /// Joins every task within the grace period and reports each outcome.
    async fn stop_all(&self, tasks: Vec<TaskRef>) -> Result<(), RuntimeError> {
        let bus = &self.shared.bus;
        let stops = join_all(tasks.iter().map(|t| async move { (t, t.stop().await) }));

        match tokio::time::timeout(self.grace, stops).await {
            Ok(results) => {
                for (task, res) in results {
                    match res {
                        Ok(()) => {
                            bus.publish(Event::new(EventKind::TaskStopped).with_task(task.name()))
                        }
                        Err(e) => bus.publish(
                            Event::new(EventKind::TaskDead)
                                .with_task(task.name())
                                .with_reason(e.as_message()),
                        ),
                    }
                }
                bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_elapsed) => {
                bus.publish(Event::new(EventKind::GraceExceeded).with_delay(self.grace));
                let stuck = tasks
                    .iter()
                    .filter(|t| !t.has_exited())
                    .map(|t| t.name().to_string())
                    .collect();
                Err(RuntimeError::GraceExceeded {
                    grace: self.grace,
                    stuck,
                })
            }
        }
    }
}

impl Drop for WakeScheduler {
    fn drop(&mut self) {
        self.shared.running.cancel();
        self.shared.release_all();
    }
}

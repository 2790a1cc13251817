//! # wakevisor
//!
//! **Wakevisor** is a cooperative sleep/wake scheduler for many long-running tasks.
//!
//! Each task runs on its own execution context and voluntarily suspends itself for a
//! duration; a **single** wake loop resumes every task whose deadline has passed. No
//! per-task timers are involved. On top of it, [`Worker`]s measure how late they are
//! woken (the drift) and publish one [`Observation`] per cycle.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   Worker 1   │   │   Worker 2   │   │   Worker N   │
//!     │ (DriftMeter) │   │ (DriftMeter) │   │ (DriftMeter) │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            │ sleep_until      │ sleep_until      │ sleep_until
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  WakeScheduler                                                    │
//! │  - registry of tasks (stopped on shutdown)                        │
//! │  - WakeQueue: one pending deadline per sleeping task              │
//! │  - wake loop: scan ─► resume due tasks ─► PollPolicy::idle        │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        │ resume           │ resume           │ resume
//!        ▼                  ▼                  ▼
//!     SuspendableTask    SuspendableTask    SuspendableTask
//!     (PauseGate)        (PauseGate)        (PauseGate)
//!
//!  Worker / WakeScheduler ── publish(Event) ──► Bus ──► Driver listener
//!                                                           │
//!                                                    SubscriberSet
//!                                                 ┌─────────┴─────────┐
//!                                                 ▼                   ▼
//!                                           DriftTracker          LogWriter ...
//! ```
//!
//! ### Lifecycle
//! ```text
//! Driver::start() ──► WakeScheduler::from_config() ──► Worker::new() × cfg.workers
//!
//! worker context:
//! loop {
//!   ├─► wait while paused            (exit if stopped)
//!   ├─► measure actual vs target     (skipped on the first cycle)
//!   ├─► publish SleepObserved
//!   └─► scheduler.sleep_until(task, target)   ─► paused until the loop resumes it
//! }
//!
//! shutdown:
//!   ShutdownRequested ─► stop wake loop ─► resume + stop every task (within grace)
//!                     ─► TaskStopped / TaskDead ─► AllStoppedWithin | GraceExceeded
//! ```
//!
//! ## Features
//! | Area              | Description                                               | Key types / traits                        |
//! |-------------------|-----------------------------------------------------------|-------------------------------------------|
//! | **Tasks**         | Pausable execution contexts running a repeated cycle.     | [`SuspendableTask`], [`Cycle`], [`Suspend`] |
//! | **Scheduling**    | One loop waking every sleeping task at its deadline.      | [`WakeScheduler`], [`WakeQueue`]          |
//! | **Measurement**   | Drift-measuring workers and their observations.           | [`Worker`], [`Observation`]               |
//! | **Driver**        | Fleet startup, signal handling, graceful shutdown.        | [`Driver`], [`Fleet`]                     |
//! | **Subscriber API**| Hook into runtime events.                                 | [`Subscribe`], [`DriftTracker`]           |
//! | **Policies**      | Sleep range and wake loop pacing.                         | [`SleepRange`], [`PollPolicy`]            |
//! | **Errors**        | Typed errors for runtime, tasks and configuration.        | [`RuntimeError`], [`TaskError`], [`ConfigError`] |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use wakevisor::{Bus, CycleFn, SuspendableTask, TaskRef, WakeScheduler};
//!
//! #[tokio::main(flavor = "multi_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scheduler = WakeScheduler::new(Bus::new(64));
//!
//!     let task = SuspendableTask::new("ticker");
//!     scheduler.register(&task);
//!     let s = Arc::clone(&scheduler);
//!     task.start(CycleFn::arc(move |task: TaskRef| {
//!         let s = Arc::clone(&s);
//!         async move {
//!             // work ...
//!             s.sleep_until(&task, Duration::from_millis(5));
//!         }
//!     }));
//!
//!     tokio::time::sleep(Duration::from_millis(50)).await;
//!     scheduler.shutdown().await?;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod policies;
mod scheduler;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use crate::core::{Config, Driver, DriverBuilder, Fleet, ParsedArgs, USAGE, Worker};
pub use error::{ConfigError, RuntimeError, TaskError};
pub use events::{Bus, Event, EventKind, Observation};
pub use policies::{PollPolicy, SleepRange};
pub use scheduler::{HeapQueue, QueueKind, ScanQueue, SchedulerOptions, WakeQueue, WakeScheduler};
pub use subscribers::{DriftTracker, Subscribe, SubscriberSet, WorkerDrift};
pub use tasks::{Cycle, CycleFn, PauseGate, Suspend, SuspendableTask, TaskId, TaskRef};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;

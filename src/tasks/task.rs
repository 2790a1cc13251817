//! # SuspendableTask: one execution context gated by a pause flag.
//!
//! A [`SuspendableTask`] owns exactly one tokio task (its execution context) that
//! repeats a [`Cycle`] forever, waiting at the top of every pass while the task is
//! paused.
//!
//! ## Lifecycle
//! ```text
//! new() ──► start(cycle) ──► loop {
//!                              ├─► wait while paused   (or exit if stopped)
//!                              └─► cycle.run_cycle(&task)
//!                            }
//! stop() ──► alive = false ──► resume() ──► join context
//! ```
//!
//! ## Rules
//! - `start()` is a no-op when the task was already started or stopped.
//! - `pause()` never preempts: an in-flight cycle always runs to completion.
//! - `stop()` returns only after the context has exited. The join handle stays in place
//!   until then, so a `stop()` dropped early (by a timeout) can be retried.
//! - A `stop()` after a completed one is a no-op.
//! - Calling `stop()` from inside the task's own cycle would wait on itself; don't.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{TaskError, panic_message};

use super::cycle::Cycle;
use super::gate::{PauseGate, Suspend};

/// Shared handle to a task.
pub type TaskRef = Arc<SuspendableTask>;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque, process-unique task identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

enum Context {
    Idle,
    Running(JoinHandle<()>),
    Stopped,
}

/// A task whose execution context can be paused, resumed and stopped.
pub struct SuspendableTask {
    id: TaskId,
    name: Arc<str>,
    gate: PauseGate,
    alive: CancellationToken,
    exited: AtomicBool,
    context: Mutex<Context>,
}

/// Marks the context as exited when the drive loop ends, including by panic.
struct ExitGuard<'a>(&'a AtomicBool);

impl Drop for ExitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

impl SuspendableTask {
    /// Creates a task that is not started yet.
    pub fn new(name: impl Into<Arc<str>>) -> TaskRef {
        Arc::new(Self::with_id(TaskId::next(), name.into()))
    }

    /// Creates a task named `{prefix}-{id}`.
    pub fn with_prefix(prefix: &str) -> TaskRef {
        let id = TaskId::next();
        Arc::new(Self::with_id(id, format!("{prefix}-{id}").into()))
    }

    fn with_id(id: TaskId, name: Arc<str>) -> Self {
        Self {
            id,
            name,
            gate: PauseGate::new(),
            alive: CancellationToken::new(),
            exited: AtomicBool::new(false),
            context: Mutex::new(Context::Idle),
        }
    }

    /// Task identity.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Human-readable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Spawns the execution context running `cycle`.
    ///
    /// Must be called from within a tokio runtime. Ignored while a `stop()` is joining.
    pub fn start(self: &Arc<Self>, cycle: Arc<dyn Cycle>) {
        let Ok(mut ctx) = self.context.try_lock() else {
            return;
        };
        if !matches!(*ctx, Context::Idle) || self.alive.is_cancelled() {
            return;
        }
        let me = Arc::clone(self);
        *ctx = Context::Running(tokio::spawn(me.drive(cycle)));
    }

    async fn drive(self: Arc<Self>, cycle: Arc<dyn Cycle>) {
        let _exit = ExitGuard(&self.exited);
        loop {
            tokio::select! {
                biased;
                _ = self.alive.cancelled() => break,
                _ = self.gate.wait_while_paused() => {}
            }
            cycle.run_cycle(&self).await;
        }
    }

    /// Requests a pause before the next cycle.
    pub fn pause(&self) {
        self.gate.pause();
    }

    /// Clears the pause and wakes the context if it is waiting.
    pub fn resume(&self) {
        self.gate.resume();
    }

    /// Returns `true` while a pause is pending or in effect.
    pub fn is_paused(&self) -> bool {
        self.gate.is_paused()
    }

    /// Returns `false` once `stop()` has been requested.
    pub fn is_alive(&self) -> bool {
        !self.alive.is_cancelled()
    }

    /// Returns `true` once the execution context has left its loop.
    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::Acquire)
    }

    /// Clears `alive` and releases a paused context so it can observe it.
    pub(crate) fn signal_stop(&self) {
        self.alive.cancel();
        self.gate.resume();
    }

    /// Stops the context and waits for it to exit.
    ///
    /// Returns [`TaskError::Panicked`] if the cycle had panicked.
    pub async fn stop(&self) -> Result<(), TaskError> {
        self.signal_stop();
        let mut ctx = self.context.lock().await;
        let joined = match &mut *ctx {
            Context::Running(join) => Some(join.await),
            Context::Idle | Context::Stopped => None,
        };
        *ctx = Context::Stopped;
        let Some(joined) = joined else {
            return Ok(());
        };
        match joined {
            Ok(()) => Ok(()),
            Err(e) if e.is_panic() => Err(TaskError::Panicked {
                task: self.name.to_string(),
                reason: panic_message(&*e.into_panic()),
            }),
            Err(_cancelled) => Ok(()),
        }
    }
}

impl fmt::Debug for SuspendableTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuspendableTask")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("paused", &self.is_paused())
            .field("alive", &self.is_alive())
            .finish()
    }
}

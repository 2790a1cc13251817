//! # Cycle: the body a suspendable task repeats.
//!
//! A [`Cycle`] is invoked once per pass of a task's loop, whenever the task is not
//! paused. Concrete workers implement this single method; the execution context around
//! it is owned by [`SuspendableTask`](crate::SuspendableTask).
//!
//! A cycle typically ends by suspending itself through
//! [`WakeScheduler::sleep_until`](crate::WakeScheduler::sleep_until) and must not do
//! anything after that call.
//!
//! [`CycleFn`] wraps a closure `F: Fn(TaskRef) -> Fut`, producing a fresh future per
//! invocation.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use wakevisor::{CycleFn, TaskRef};
//!
//! let cycle = CycleFn::arc(|task: TaskRef| async move {
//!     // do work, then hand control back to the scheduler
//!     let _ = (task, Duration::from_millis(10));
//! });
//! # let _ = cycle;
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use super::task::TaskRef;

/// One pass of a task's loop.
#[async_trait]
pub trait Cycle: Send + Sync + 'static {
    /// Runs one invocation. `task` is the handle of the task running it.
    async fn run_cycle(&self, task: &TaskRef);
}

/// Function-backed cycle.
pub struct CycleFn<F> {
    f: F,
}

impl<F> CycleFn<F> {
    /// Wraps `f`.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Wraps `f` and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Cycle for CycleFn<F>
where
    F: Fn(TaskRef) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn run_cycle(&self, task: &TaskRef) {
        (self.f)(Arc::clone(task)).await
    }
}

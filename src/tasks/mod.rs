//! # Suspendable tasks.
//!
//! This module provides the execution-context side of the scheduler:
//! - [`Suspend`] / [`PauseGate`] - the pause capability `{pause, resume, wait_while_paused}`
//! - [`Cycle`] / [`CycleFn`] - the body a task repeats
//! - [`SuspendableTask`] - one tokio task looping over a cycle, gated by a pause flag
//! - [`TaskRef`] / [`TaskId`] - shared handle and identity

mod cycle;
mod gate;
mod task;

pub use cycle::{Cycle, CycleFn};
pub use gate::{PauseGate, Suspend};
pub use task::{SuspendableTask, TaskId, TaskRef};

//! # Pause gate: the suspension capability of a task.
//!
//! [`Suspend`] is the capability interface `{pause, resume, wait_while_paused}` that
//! the scheduler relies on; [`PauseGate`] implements it on top of
//! [`tokio::sync::watch`].
//!
//! ## Rules
//! - The `paused` flag and its wake notification live behind the watch channel's lock,
//!   so a `resume()` racing with `wait_while_paused()` is never lost.
//! - `pause()` and `resume()` are idempotent: repeating one only notifies once.
//! - Waiting is a blocking (non-spinning) await released only by `resume()`.

use async_trait::async_trait;
use tokio::sync::watch;

/// Capability to suspend and resume an execution context.
#[async_trait]
pub trait Suspend: Send + Sync + 'static {
    /// Marks the context paused; takes effect at its next wait point.
    fn pause(&self);

    /// Clears the pause and wakes a blocked waiter.
    fn resume(&self);

    /// Returns the current flag.
    fn is_paused(&self) -> bool;

    /// Completes once the flag is clear (immediately if it already is).
    async fn wait_while_paused(&self);
}

/// Watch-backed pause flag.
#[derive(Debug)]
pub struct PauseGate {
    tx: watch::Sender<bool>,
}

impl PauseGate {
    /// Creates an open (not paused) gate.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }
}

impl Default for PauseGate {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Suspend for PauseGate {
    fn pause(&self) {
        self.tx.send_if_modified(|paused| {
            if *paused {
                return false;
            }
            *paused = true;
            true
        });
    }

    fn resume(&self) {
        self.tx.send_if_modified(|paused| {
            if !*paused {
                return false;
            }
            *paused = false;
            true
        });
    }

    fn is_paused(&self) -> bool {
        *self.tx.borrow()
    }

    async fn wait_while_paused(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|paused| !*paused).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn open_gate_does_not_block() {
        let gate = PauseGate::new();
        assert!(!gate.is_paused());
        tokio::time::timeout(Duration::from_millis(100), gate.wait_while_paused())
            .await
            .expect("open gate must not block");
    }

    #[test]
    fn pause_and_resume_are_idempotent() {
        let gate = PauseGate::new();
        gate.pause();
        gate.pause();
        assert!(gate.is_paused());
        gate.resume();
        gate.resume();
        assert!(!gate.is_paused());
    }

    #[tokio::test]
    async fn paused_gate_blocks_until_resumed() {
        let gate = Arc::new(PauseGate::new());
        gate.pause();

        let blocked =
            tokio::time::timeout(Duration::from_millis(50), gate.wait_while_paused()).await;
        assert!(blocked.is_err(), "paused gate must block");

        let waiter = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.wait_while_paused().await })
        };
        tokio::task::yield_now().await;
        gate.resume();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("resume must release the waiter")
            .expect("waiter task");
    }

    #[tokio::test]
    async fn resume_before_wait_is_not_lost() {
        let gate = PauseGate::new();
        gate.pause();
        gate.resume();
        tokio::time::timeout(Duration::from_millis(100), gate.wait_while_paused())
            .await
            .expect("earlier resume must be observed");
    }
}

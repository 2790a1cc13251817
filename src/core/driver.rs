//! # Driver: starts the fleet, waits for a shutdown trigger, tears everything down.
//!
//! The [`Driver`] owns the event bus, a [`SubscriberSet`] (always including the
//! [`DriftTracker`]) and the runtime [`Config`]. Starting it builds one
//! [`WakeScheduler`] and `cfg.workers` [`Worker`]s, returned as a [`Fleet`].
//!
//! ## High-level architecture
//! ```text
//! build():
//!   Bus ──► subscriber_listener(): Bus.subscribe() ─► SubscriberSet::emit(&Event)
//!
//! start():
//!   cfg.validate()?
//!   WakeScheduler::from_config(&cfg, bus)          (spawns the wake loop)
//!   for _ in 0..cfg.workers:
//!       Worker::new(&scheduler, cfg.sleep_range().next())
//!
//! run() / run_until(trigger):
//!   fleet = start()?
//!   trigger.await                                  (OS signal or caller future)
//!   Bus.publish(ShutdownRequested)
//!   fleet.shutdown():
//!       scheduler.shutdown() ─► stop loop, wake + stop every task within cfg.grace
//!       join every worker
//!   listener: forward what is already on the bus, then exit
//!   SubscriberSet::shutdown()                      (drain every subscriber queue)
//! ```
//!
//! A driver runs once: after `run()`/`run_until()` returns, every subscriber has seen
//! the final events and no further events are delivered.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use wakevisor::{Config, Driver};
//!
//! #[tokio::main(flavor = "multi_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config {
//!         workers: 2,
//!         min_sleep: Duration::from_millis(5),
//!         max_sleep: Duration::from_millis(10),
//!         ..Config::default()
//!     };
//!     let driver = Driver::builder(cfg).build();
//!     driver.run_until(tokio::time::sleep(Duration::from_millis(50))).await?;
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{builder::DriverBuilder, config::Config, shutdown, worker::Worker};
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::scheduler::WakeScheduler;
use crate::subscribers::{DriftTracker, SubscriberSet};

/// Coordinates the scheduler, its workers, event delivery and shutdown.
pub struct Driver {
    /// Runtime configuration.
    pub cfg: Config,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    drift: Arc<DriftTracker>,
    listener: Mutex<Option<JoinHandle<()>>>,
    closing: CancellationToken,
}

impl Driver {
    /// Starts building a driver with `cfg`.
    pub fn builder(cfg: Config) -> DriverBuilder {
        DriverBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: Config,
        bus: Bus,
        subs: Arc<SubscriberSet>,
        drift: Arc<DriftTracker>,
    ) -> Self {
        let closing = CancellationToken::new();
        let listener = Self::subscriber_listener(&bus, Arc::clone(&subs), closing.clone());
        Self {
            cfg,
            bus,
            subs,
            drift,
            listener: Mutex::new(Some(listener)),
            closing,
        }
    }

    /// Event bus shared with the scheduler and workers.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Drift summaries of every worker this driver started.
    pub fn drift(&self) -> &Arc<DriftTracker> {
        &self.drift
    }

    /// Number of subscribers, the built-in drift tracker included.
    pub fn subscriber_count(&self) -> usize {
        self.subs.len()
    }

    /// Forwards bus events to the subscriber set (fire-and-forget).
    ///
    /// Once `closing` fires, events already on the bus are still forwarded before exit.
    fn subscriber_listener(
        bus: &Bus,
        set: Arc<SubscriberSet>,
        closing: CancellationToken,
    ) -> JoinHandle<()> {
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    res = rx.recv() => match res {
                        Ok(ev) => set.emit(&ev),
                        Err(RecvError::Lagged(_)) => {
                            set.emit(&Event::subscriber_overflow("listener", "lagged"));
                        }
                        Err(RecvError::Closed) => return,
                    },
                    _ = closing.cancelled() => break,
                }
            }
            loop {
                match rx.try_recv() {
                    Ok(ev) => set.emit(&ev),
                    Err(TryRecvError::Lagged(_)) => {
                        set.emit(&Event::subscriber_overflow("listener", "lagged"));
                    }
                    Err(TryRecvError::Empty | TryRecvError::Closed) => break,
                }
            }
        })
    }

    /// Stops the listener once it has forwarded everything published so far, then
    /// drains every subscriber queue.
    async fn flush_subscribers(&self) {
        self.closing.cancel();
        let listener = self.listener.lock().take();
        if let Some(listener) = listener {
            let _ = listener.await;
        }
        self.subs.shutdown().await;
    }

    /// Validates the configuration and starts the scheduler and every worker.
    pub fn start(&self) -> Result<Fleet, RuntimeError> {
        self.cfg.validate()?;
        let scheduler = WakeScheduler::from_config(&self.cfg, self.bus.clone());
        let range = self.cfg.sleep_range();
        let workers = (0..self.cfg.workers)
            .map(|_| Worker::new(&scheduler, range.next()))
            .collect();
        Ok(Fleet { scheduler, workers })
    }

    /// Runs until the process receives a termination signal, then shuts down and
    /// drains every subscriber.
    pub async fn run(&self) -> Result<(), RuntimeError> {
        self.drive(async {
            match shutdown::wait_for_shutdown_signal().await {
                Ok(signal) => signal.to_string(),
                Err(e) => format!("signal listener failed: {e}"),
            }
        })
        .await
    }

    /// Runs until `trigger` completes, then shuts down and drains every subscriber.
    pub async fn run_until<F>(&self, trigger: F) -> Result<(), RuntimeError>
    where
        F: Future<Output = ()>,
    {
        self.drive(async {
            trigger.await;
            "requested".to_string()
        })
        .await
    }

    async fn drive(&self, trigger: impl Future<Output = String>) -> Result<(), RuntimeError> {
        let fleet = self.start()?;
        let reason = trigger.await;
        self.bus
            .publish(Event::new(EventKind::ShutdownRequested).with_reason(reason));
        let res = fleet.shutdown().await;
        self.flush_subscribers().await;
        res
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.lock().take() {
            listener.abort();
        }
    }
}

/// A running scheduler and its workers.
pub struct Fleet {
    scheduler: Arc<WakeScheduler>,
    workers: Vec<Worker>,
}

impl Fleet {
    /// The fleet's scheduler.
    pub fn scheduler(&self) -> &Arc<WakeScheduler> {
        &self.scheduler
    }

    /// The fleet's workers, in creation order.
    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    /// Shuts the scheduler down, then joins every worker.
    ///
    /// On [`RuntimeError::GraceExceeded`] the error is returned without waiting
    /// further. Every context was told to stop; [`Worker::stop`] joins a stuck one
    /// whenever it finishes its cycle.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.scheduler.shutdown().await?;
        for worker in &self.workers {
            // Panics were already reported as TaskDead by the scheduler.
            let _ = worker.stop().await;
        }
        Ok(())
    }
}

//! # Worker: a task that measures how accurately it is woken.
//!
//! A [`Worker`] owns one [`SuspendableTask`] whose cycle is a private `DriftMeter`.
//! Every cycle after the first measures how long the task was actually suspended,
//! publishes an [`Observation`], then hands itself back to the scheduler for
//! another `target`.
//!
//! ## Cycle
//! ```text
//! run_cycle(task):
//!   ├─► now = Instant::now()
//!   ├─► if last_suspend is set:                      (skipped on the first cycle)
//!   │     actual     = now - last_suspend
//!   │     error_rate = (actual - target) / target
//!   │     max        = max(max, error_rate)
//!   │     bus.publish(SleepObserved{ Observation })
//!   ├─► last_suspend = now
//!   └─► scheduler.sleep_until(task, target)          (last statement of the cycle)
//! ```
//!
//! ## Rules
//! - `target` is fixed at construction.
//! - `max_error_rate` starts at `0.0` and never decreases.
//! - The meter holds the scheduler weakly; if it is gone the task stops itself.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::TaskError;
use crate::events::{Bus, Event, Observation};
use crate::scheduler::WakeScheduler;
use crate::tasks::{Cycle, SuspendableTask, TaskId, TaskRef};

#[derive(Default)]
struct MeterState {
    last_suspend: Option<Instant>,
    max_error_rate: f64,
    cycles: u64,
}

struct DriftMeter {
    scheduler: Weak<WakeScheduler>,
    bus: Bus,
    target: Duration,
    state: Mutex<MeterState>,
}

impl DriftMeter {
    fn measure(&self, worker: u64, now: Instant) -> Option<Observation> {
        let mut st = self.state.lock();
        let last = st.last_suspend?;
        let actual = now.saturating_duration_since(last);
        let error_rate = Observation::error_rate(actual, self.target);
        if error_rate > st.max_error_rate {
            st.max_error_rate = error_rate;
        }
        st.cycles += 1;
        Some(Observation {
            worker,
            cycle: st.cycles,
            actual,
            target: self.target,
            error_rate,
            max_error_rate: st.max_error_rate,
        })
    }
}

#[async_trait]
impl Cycle for DriftMeter {
    async fn run_cycle(&self, task: &TaskRef) {
        if let Some(obs) = self.measure(task.id().get(), Instant::now()) {
            self.bus.publish(Event::observed(task.name(), obs));
        }
        self.state.lock().last_suspend = Some(Instant::now());

        match self.scheduler.upgrade() {
            Some(scheduler) => scheduler.sleep_until(task, self.target),
            None => task.signal_stop(),
        }
    }
}

/// Periodic sleeper that reports its wake-up drift.
pub struct Worker {
    task: TaskRef,
    meter: Arc<DriftMeter>,
}

impl Worker {
    /// Creates a worker sleeping `target` per cycle, registers it with `scheduler`
    /// and starts its context.
    ///
    /// A scheduler that is already shut down refuses the registration; the worker is
    /// then born stopped and its context never starts.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(scheduler: &Arc<WakeScheduler>, target: Duration) -> Self {
        let task = SuspendableTask::with_prefix("worker");
        let meter = Arc::new(DriftMeter {
            scheduler: Arc::downgrade(scheduler),
            bus: scheduler.bus().clone(),
            target,
            state: Mutex::new(MeterState::default()),
        });
        if scheduler.register(&task) {
            task.start(Arc::clone(&meter) as Arc<dyn Cycle>);
        } else {
            task.signal_stop();
        }
        Self { task, meter }
    }

    /// Identity of the worker's task (the `worker` field of its observations).
    pub fn id(&self) -> TaskId {
        self.task.id()
    }

    /// Task name, as carried by its events.
    pub fn name(&self) -> &str {
        self.task.name()
    }

    /// Requested sleep per cycle.
    pub fn target(&self) -> Duration {
        self.meter.target
    }

    /// Largest error rate seen so far (`0.0` before the first measurement).
    pub fn max_error_rate(&self) -> f64 {
        self.meter.state.lock().max_error_rate
    }

    /// Number of measured cycles.
    pub fn cycles(&self) -> u64 {
        self.meter.state.lock().cycles
    }

    /// Underlying task handle.
    pub fn task(&self) -> &TaskRef {
        &self.task
    }

    /// Stops the worker's context and waits for it.
    pub async fn stop(&self) -> Result<(), TaskError> {
        self.task.stop().await
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id())
            .field("target", &self.target())
            .field("cycles", &self.cycles())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use std::collections::HashMap;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn three_workers_report_drift_for_half_a_second() {
        let bus = Bus::new(4096);
        let mut rx = bus.subscribe();
        let scheduler = WakeScheduler::new(bus);
        let target = Duration::from_millis(10);
        let workers: Vec<Worker> = (0..3).map(|_| Worker::new(&scheduler, target)).collect();

        tokio::time::sleep(Duration::from_millis(500)).await;
        tokio::time::timeout(Duration::from_secs(5), scheduler.shutdown())
            .await
            .expect("bounded shutdown")
            .expect("clean shutdown");

        let mut per_worker: HashMap<u64, Vec<Observation>> = HashMap::new();
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::SleepObserved {
                let obs = ev.observation.expect("observation payload");
                per_worker.entry(obs.worker).or_default().push(obs);
            }
        }

        for w in &workers {
            let records = per_worker.get(&w.id().get()).map(Vec::as_slice).unwrap_or(&[]);
            assert!(records.len() >= 40, "{}: only {} records", w.name(), records.len());
            assert_eq!(w.cycles(), records.len() as u64);

            let mut prev_max = 0.0;
            for (i, obs) in records.iter().enumerate() {
                assert_eq!(obs.cycle, i as u64 + 1);
                assert_eq!(obs.target, target);
                assert!(obs.error_rate.is_finite());
                assert!(obs.actual >= target, "woken early: {obs}");
                assert!(obs.max_error_rate >= prev_max, "max decreased");
                assert!(obs.max_error_rate >= obs.error_rate);
                prev_max = obs.max_error_rate;
            }
            assert_eq!(w.max_error_rate(), prev_max);
            assert!(w.task().has_exited());
        }
    }

    #[tokio::test]
    async fn first_cycle_only_records_the_suspension() {
        let scheduler = WakeScheduler::new(Bus::new(16));
        let mut rx = scheduler.bus().subscribe();
        let worker = Worker::new(&scheduler, Duration::from_secs(60));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(worker.cycles(), 0);
        assert_eq!(worker.max_error_rate(), 0.0);
        assert!(worker.task().is_paused());
        assert!(scheduler.deadline_of(worker.id()).is_some());
        assert!(
            std::iter::from_fn(|| rx.try_recv().ok())
                .all(|ev| ev.kind != EventKind::SleepObserved)
        );
        scheduler.shutdown().await.expect("shutdown");
        worker.stop().await.expect("second stop is a no-op");
    }

    #[tokio::test]
    async fn meter_measures_against_last_suspension() {
        let scheduler = WakeScheduler::new(Bus::new(16));
        let meter = DriftMeter {
            scheduler: Arc::downgrade(&scheduler),
            bus: scheduler.bus().clone(),
            target: Duration::from_millis(10),
            state: Mutex::new(MeterState::default()),
        };
        let t0 = Instant::now();
        assert!(meter.measure(1, t0).is_none());

        meter.state.lock().last_suspend = Some(t0);
        let late = meter.measure(1, t0 + Duration::from_millis(12)).expect("measured");
        assert!((late.error_rate - 0.2).abs() < 1e-9);
        assert!((late.max_error_rate - 0.2).abs() < 1e-9);

        let early = meter.measure(1, t0 + Duration::from_millis(9)).expect("measured");
        assert!(early.error_rate < 0.0);
        assert!((early.max_error_rate - 0.2).abs() < 1e-9, "max never decreases");
        assert_eq!(early.cycle, 2);
        scheduler.shutdown().await.expect("shutdown");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn worker_stops_itself_when_scheduler_is_gone() {
        let scheduler = WakeScheduler::new(Bus::new(16));
        let task = SuspendableTask::new("orphan");
        let meter = Arc::new(DriftMeter {
            scheduler: Arc::downgrade(&scheduler),
            bus: scheduler.bus().clone(),
            target: Duration::from_millis(1),
            state: Mutex::new(MeterState::default()),
        });
        drop(scheduler);

        task.start(meter as Arc<dyn Cycle>);
        tokio::time::timeout(Duration::from_secs(1), async {
            while !task.has_exited() {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("context must exit");
        assert!(!task.is_alive());
    }

    #[tokio::test]
    async fn worker_on_a_shut_down_scheduler_never_starts() {
        let scheduler = WakeScheduler::new(Bus::new(16));
        scheduler.shutdown().await.expect("shutdown");

        let worker = Worker::new(&scheduler, Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(scheduler.registered_len(), 0);
        assert!(!worker.task().is_alive());
        assert!(!worker.task().is_paused());
        assert!(!worker.task().has_exited(), "context was never spawned");
        assert_eq!(worker.cycles(), 0);
        tokio::time::timeout(Duration::from_millis(100), worker.stop())
            .await
            .expect("nothing to join")
            .expect("clean stop");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn dropped_scheduler_releases_a_sleeping_worker() {
        let scheduler = WakeScheduler::new(Bus::new(256));
        let worker = Worker::new(&scheduler, Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(30)).await;
        drop(scheduler);

        tokio::time::timeout(Duration::from_secs(1), async {
            while !worker.task().has_exited() {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("worker context must exit");
        assert!(!worker.task().is_alive());
        worker.stop().await.expect("clean stop");
    }
}

//! # LogWriter: simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! [scheduler-started]
//! [registered] task="worker-3"
//! Thread(3) slept 10.112 ms, targeted 10.000 ms, error rate 1.12%, max error rate 4.87%
//! [shutdown-requested] reason="SIGINT"
//! [stopped] task="worker-3"
//! [dead] task="worker-4" reason="panic: boom"
//! [all-stopped-within-grace]
//! [grace-exceeded] grace_ms=5000
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Renders one event as the line `on_event` prints.
    pub fn render(e: &Event) -> String {
        let task = e.task.as_deref().unwrap_or("unknown");
        let reason = e.reason.as_deref().unwrap_or("unknown");
        match e.kind {
            EventKind::SchedulerStarted => "[scheduler-started]".to_string(),
            EventKind::TaskRegistered => format!("[registered] task={task:?}"),
            EventKind::SleepObserved => match &e.observation {
                Some(obs) => obs.to_string(),
                None => format!("[observed] task={task:?}"),
            },
            EventKind::ShutdownRequested => match e.reason.as_deref() {
                Some(r) => format!("[shutdown-requested] reason={r:?}"),
                None => "[shutdown-requested]".to_string(),
            },
            EventKind::TaskStopped => format!("[stopped] task={task:?}"),
            EventKind::TaskDead => format!("[dead] task={task:?} reason={reason:?}"),
            EventKind::AllStoppedWithin => "[all-stopped-within-grace]".to_string(),
            EventKind::GraceExceeded => {
                format!("[grace-exceeded] grace_ms={}", e.delay_ms.unwrap_or(0))
            }
            EventKind::SubscriberOverflow => {
                format!("[subscriber-overflow] subscriber={task} reason={reason}")
            }
            EventKind::SubscriberPanicked => {
                format!("[subscriber-panicked] subscriber={task} info={reason}")
            }
        }
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        println!("{}", Self::render(e));
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }

    fn queue_capacity(&self) -> usize {
        8192
    }
}

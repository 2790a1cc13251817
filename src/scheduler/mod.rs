//! # Sleep/wake scheduling.
//!
//! - [`WakeScheduler`]: registration, `sleep_until`, the wake loop and shutdown
//! - [`WakeQueue`]: pending-wake structure, with [`ScanQueue`] and [`HeapQueue`]
//!   selected through [`QueueKind`]

mod queue;
mod wake;

pub use queue::{HeapQueue, QueueKind, ScanQueue, WakeQueue};
pub use wake::{SchedulerOptions, WakeScheduler};

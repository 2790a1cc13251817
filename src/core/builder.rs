use std::sync::Arc;

use super::{config::Config, driver::Driver};
use crate::{
    events::Bus,
    subscribers::{DriftTracker, Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Driver`].
pub struct DriverBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    drift: Option<Arc<DriftTracker>>,
}

impl DriverBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            drift: None,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (observations, lifecycle, shutdown)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Uses the given tracker instead of a fresh one (e.g. with a larger queue).
    pub fn with_drift_tracker(mut self, drift: Arc<DriftTracker>) -> Self {
        self.drift = Some(drift);
        self
    }

    /// Builds the driver: event bus, drift tracker and subscriber workers.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Arc<Driver> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let drift = self.drift.unwrap_or_default();

        let mut subscribers = self.subscribers;
        subscribers.push(Arc::clone(&drift) as Arc<dyn Subscribe>);
        let subs = Arc::new(SubscriberSet::new(subscribers, bus.clone()));

        Arc::new(Driver::new_internal(self.cfg, bus, subs, drift))
    }
}

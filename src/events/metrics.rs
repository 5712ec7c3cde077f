//! # Event Publisher Metrics
//!
//! Prometheus metrics for the resilient event publisher.
//!
//! ## Metrics Exported
//!
//! - `events_published_total` - Counter of events written straight to the store
//! - `events_buffered_total` - Counter of events queued during an outage
//! - `events_dropped_total` - Counter of events dropped (buffer full or closed)
//! - `events_drained_total` - Counter of buffered events flushed by the recovery loop
//! - `events_pending` - Gauge of events currently buffered
//!
//! Metrics belong to one publisher instance and are only exported once
//! registered into a `prometheus::Registry`.

use prometheus::{IntCounter, IntGauge, Registry};

#[derive(Clone)]
pub struct PublisherMetrics {
    pub published: IntCounter,
    pub buffered: IntCounter,
    pub dropped: IntCounter,
    pub drained: IntCounter,
    pub pending: IntGauge,
}

impl PublisherMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        Ok(Self {
            published: IntCounter::new(
                "events_published_total",
                "Total number of events written directly to the event store",
            )?,
            buffered: IntCounter::new(
                "events_buffered_total",
                "Total number of events buffered while the event store was unreachable",
            )?,
            dropped: IntCounter::new(
                "events_dropped_total",
                "Total number of events dropped because the buffer was full or closed",
            )?,
            drained: IntCounter::new(
                "events_drained_total",
                "Total number of buffered events flushed by the recovery loop",
            )?,
            pending: IntGauge::new("events_pending", "Number of events currently buffered")?,
        })
    }

    /// Register every metric into `registry`
    pub fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.published.clone()))?;
        registry.register(Box::new(self.buffered.clone()))?;
        registry.register(Box::new(self.dropped.clone()))?;
        registry.register(Box::new(self.drained.clone()))?;
        registry.register(Box::new(self.pending.clone()))?;
        Ok(())
    }
}

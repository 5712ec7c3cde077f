//! Resilient event publisher.
//!
//! Events are written straight to the store while it answers its probe. During
//! an outage they are queued in a bounded FIFO buffer that a background
//! recovery loop flushes, oldest first, once the store is healthy again. The
//! publish path never blocks on the outage and never fails because of it.

use crate::core::errors::EventError;
use crate::core::time::now_nanos;
use crate::events::buffer::{PendingBuffer, PushOutcome};
use crate::events::metrics::PublisherMetrics;
use crate::events::{Event, EventPublisher, EventRecord, EventStore, FieldValue, OCCURRED_AT};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_STREAM: &str = "mainflux.mqtt";
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(100);
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_PENDING: usize = 1_000_000;
pub const DEFAULT_MAX_STREAM_LEN: u64 = 1_000_000_000;

/// Tuning of a `ResilientEventPublisher`
#[derive(Debug, Clone, PartialEq)]
pub struct PublisherSettings {
    /// Stream every event is appended to
    pub stream: String,
    /// Approximate length the stream is trimmed to
    pub max_stream_len: u64,
    /// Capacity of the outage buffer
    pub max_pending: usize,
    /// Period of the recovery loop
    pub check_interval: Duration,
    /// Deadline of each connectivity probe
    pub probe_timeout: Duration,
    /// Deadline of each append; a timed-out direct write is buffered
    pub write_timeout: Duration,
}

impl Default for PublisherSettings {
    fn default() -> Self {
        Self {
            stream: DEFAULT_STREAM.to_string(),
            max_stream_len: DEFAULT_MAX_STREAM_LEN,
            max_pending: DEFAULT_MAX_PENDING,
            check_interval: DEFAULT_CHECK_INTERVAL,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

impl PublisherSettings {
    pub fn validate(&self) -> Result<(), EventError> {
        if self.stream.is_empty() {
            return Err(EventError::Settings("stream name must not be empty".to_string()));
        }
        if self.max_stream_len == 0 {
            return Err(EventError::Settings("max_stream_len must be > 0".to_string()));
        }
        if self.max_pending == 0 {
            return Err(EventError::Settings("max_pending must be > 0".to_string()));
        }
        if self.check_interval.is_zero() {
            return Err(EventError::Settings("check_interval must be > 0".to_string()));
        }
        if self.probe_timeout.is_zero() {
            return Err(EventError::Settings("probe_timeout must be > 0".to_string()));
        }
        if self.write_timeout.is_zero() {
            return Err(EventError::Settings("write_timeout must be > 0".to_string()));
        }
        Ok(())
    }
}

/// State shared between the publish path and the recovery loop
struct Shared<S> {
    store: S,
    settings: PublisherSettings,
    buffer: Mutex<PendingBuffer>,
    metrics: PublisherMetrics,
}

impl<S: EventStore> Shared<S> {
    async fn probe(&self) -> Result<(), EventError> {
        match timeout(self.settings.probe_timeout, self.store.ping()).await {
            Ok(result) => result,
            Err(_) => Err(EventError::ProbeTimeout(
                self.settings.probe_timeout.as_millis() as u64,
            )),
        }
    }

    async fn append(&self, record: &EventRecord) -> Result<(), EventError> {
        match timeout(self.settings.write_timeout, self.store.append(record)).await {
            Ok(result) => result,
            Err(_) => Err(EventError::WriteTimeout(
                self.settings.write_timeout.as_millis() as u64,
            )),
        }
    }

    async fn enqueue(&self, record: EventRecord) {
        let mut buffer = self.buffer.lock().await;
        match buffer.try_push(record) {
            PushOutcome::Queued => {
                self.metrics.buffered.inc();
                self.metrics.pending.set(buffer.len() as i64);
                debug!(pending = buffer.len(), "Event store unreachable, event buffered");
            }
            PushOutcome::Full => {
                self.metrics.dropped.inc();
                warn!(capacity = buffer.capacity(), "Event buffer full, dropping event");
            }
            PushOutcome::Closed => {
                self.metrics.dropped.inc();
                debug!("Event recovery loop stopped, dropping event");
            }
        }
    }

    /// Flush the buffer oldest first; stop at the first failed write
    async fn drain(&self) -> usize {
        let mut buffer = self.buffer.lock().await;
        let mut drained = 0;

        while let Some(record) = buffer.pop_front() {
            if let Err(e) = self.append(&record).await {
                buffer.push_front(record);
                warn!(error = %e, pending = buffer.len(), "Failed to drain buffered event");
                break;
            }
            drained += 1;
        }

        self.metrics.drained.inc_by(drained as u64);
        self.metrics.pending.set(buffer.len() as i64);
        drained
    }
}

/// Event publisher that survives event store outages
///
/// Owns exactly one recovery task, spawned by `new` and stopped by `close`,
/// by dropping the publisher, or by cancelling the token passed to `new`.
/// Records still buffered when the task stops are lost.
pub struct ResilientEventPublisher<S> {
    shared: Arc<Shared<S>>,
    shutdown: CancellationToken,
    worker: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl<S: EventStore + 'static> ResilientEventPublisher<S> {
    /// Validate `settings` and start the recovery loop
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        store: S,
        settings: PublisherSettings,
        shutdown: CancellationToken,
    ) -> Result<Self, EventError> {
        settings.validate()?;
        let metrics = PublisherMetrics::new().map_err(|e| EventError::Settings(e.to_string()))?;

        let shared = Arc::new(Shared {
            store,
            buffer: Mutex::new(PendingBuffer::new(settings.max_pending)),
            settings,
            metrics,
        });

        let shutdown = shutdown.child_token();
        let worker = tokio::spawn(run_recovery(shared.clone(), shutdown.clone()));

        info!(
            stream = %shared.settings.stream,
            check_interval_secs = shared.settings.check_interval.as_secs(),
            max_pending = shared.settings.max_pending,
            "Event publisher started"
        );

        Ok(Self {
            shared,
            shutdown,
            worker: std::sync::Mutex::new(Some(worker)),
        })
    }

    pub fn metrics(&self) -> &PublisherMetrics {
        &self.shared.metrics
    }

    pub fn settings(&self) -> &PublisherSettings {
        &self.shared.settings
    }

    /// Number of events waiting for the store
    pub async fn pending(&self) -> usize {
        self.shared.buffer.lock().await.len()
    }

    fn record(&self, event: &dyn Event) -> Result<EventRecord, EventError> {
        let mut fields = event.encode()?;
        fields.insert(OCCURRED_AT.to_string(), FieldValue::Int(now_nanos()));

        Ok(EventRecord {
            stream: self.shared.settings.stream.clone(),
            max_len: self.shared.settings.max_stream_len,
            fields,
        })
    }
}

#[async_trait]
impl<S: EventStore + 'static> EventPublisher for ResilientEventPublisher<S> {
    async fn publish(&self, event: &dyn Event) -> Result<(), EventError> {
        let record = self.record(event)?;

        match self.shared.probe().await {
            Ok(()) => match self.shared.append(&record).await {
                Ok(()) => {
                    self.shared.metrics.published.inc();
                    Ok(())
                }
                Err(EventError::WriteTimeout(ms)) => {
                    warn!(timeout_ms = ms, "Event store write timed out, buffering event");
                    self.shared.enqueue(record).await;
                    Ok(())
                }
                Err(e) => Err(e),
            },
            Err(e) => {
                debug!(error = %e, "Event store probe failed");
                self.shared.enqueue(record).await;
                Ok(())
            }
        }
    }

    async fn close(&self) -> Result<(), EventError> {
        self.shutdown.cancel();

        let worker = self
            .worker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = worker {
            if let Err(e) = handle.await {
                warn!(error = %e, "Event recovery loop terminated abnormally");
            }
        }

        self.shared.store.close().await
    }
}

impl<S> Drop for ResilientEventPublisher<S> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn run_recovery<S: EventStore>(shared: Arc<Shared<S>>, shutdown: CancellationToken) {
    let period = shared.settings.check_interval;
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                if shared.buffer.lock().await.is_empty() {
                    continue;
                }

                match shared.probe().await {
                    Ok(()) => {
                        let drained = shared.drain().await;
                        if drained > 0 {
                            info!(drained, "Flushed buffered events to the event store");
                        }
                    }
                    Err(e) => debug!(error = %e, "Event store still unreachable"),
                }
            }
        }
    }

    shared.buffer.lock().await.close();
    debug!("Event recovery loop stopped");
}

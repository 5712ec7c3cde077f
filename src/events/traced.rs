// Tracing decorator for event publishers

use crate::core::errors::EventError;
use crate::events::{Event, EventPublisher};
use async_trait::async_trait;
use tracing::{field, info_span, Instrument};

/// Wraps an `EventPublisher` with one span per published event
pub struct TracedEventPublisher<P> {
    inner: P,
}

impl<P> TracedEventPublisher<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<P: EventPublisher> EventPublisher for TracedEventPublisher<P> {
    async fn publish(&self, event: &dyn Event) -> Result<(), EventError> {
        let span = info_span!(
            "publish_event",
            operation = %event.operation(),
            error = field::Empty
        );

        let result = self.inner.publish(event).instrument(span.clone()).await;
        if let Err(e) = &result {
            span.record("error", field::display(e));
        }
        result
    }

    async fn close(&self) -> Result<(), EventError> {
        self.inner.close().await
    }
}

//! Tracing middleware for the message bus.
//!
//! Wraps any `BusPublisher` / `PubSub` and every subscribed `MessageHandler`
//! with spans carrying the operation, client id, topic, subtopic and payload
//! size. Results pass through untouched. Spans are attached with
//! `Instrument`, so they observe the wrapped future and never cancel it.

use crate::core::errors::BusError;
use crate::core::models::RoutedMessage;
use crate::messaging::{BusPublisher, MessageHandler, PubSub};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{field, info_span, Instrument, Span};

const PUBLISH_OP: &str = "publish";
const SUBSCRIBE_OP: &str = "receive";
// Not part of the OpenTelemetry messaging conventions
const UNSUBSCRIBE_OP: &str = "unsubscribe";
const PROCESS_OP: &str = "process";

/// Tracing decorator for a bus publisher or pub/sub
pub struct TracedPubSub<P> {
    inner: P,
}

/// Publish-only view of the same decorator
pub type TracedPublisher<P> = TracedPubSub<P>;

impl<P> TracedPubSub<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> P {
        self.inner
    }
}

fn record_outcome<T>(span: &Span, result: &Result<T, BusError>) {
    if let Err(e) = result {
        span.record("error", field::display(e));
    }
}

#[async_trait]
impl<P: BusPublisher> BusPublisher for TracedPubSub<P> {
    async fn publish(&self, msg: &RoutedMessage) -> Result<(), BusError> {
        let span = info_span!(
            "publish",
            messaging.operation = PUBLISH_OP,
            client_id = %msg.publisher(),
            channel = %msg.channel(),
            subtopic = %msg.subtopic(),
            payload_size = msg.payload().len(),
            error = field::Empty,
        );

        let result = self.inner.publish(msg).instrument(span.clone()).await;
        record_outcome(&span, &result);
        result
    }

    async fn close(&self) -> Result<(), BusError> {
        self.inner.close().await
    }
}

#[async_trait]
impl<P: PubSub> PubSub for TracedPubSub<P> {
    async fn subscribe(
        &self,
        id: &str,
        topic: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), BusError> {
        let span = info_span!(
            "subscribe",
            messaging.operation = SUBSCRIBE_OP,
            client_id = %id,
            topic = %topic,
            error = field::Empty,
        );

        let traced: Arc<dyn MessageHandler> = Arc::new(TracedMessageHandler {
            inner: handler,
            parent: span.clone(),
            client_id: id.to_string(),
            topic: topic.to_string(),
        });

        let result = self
            .inner
            .subscribe(id, topic, traced)
            .instrument(span.clone())
            .await;
        record_outcome(&span, &result);
        result
    }

    async fn unsubscribe(&self, id: &str, topic: &str) -> Result<(), BusError> {
        let span = info_span!(
            "unsubscribe",
            messaging.operation = UNSUBSCRIBE_OP,
            client_id = %id,
            topic = %topic,
            error = field::Empty,
        );

        let result = self
            .inner
            .unsubscribe(id, topic)
            .instrument(span.clone())
            .await;
        record_outcome(&span, &result);
        result
    }
}

/// Message handler whose `handle` calls run inside a `process` span
/// parented to the subscription span
pub struct TracedMessageHandler {
    inner: Arc<dyn MessageHandler>,
    parent: Span,
    client_id: String,
    topic: String,
}

#[async_trait]
impl MessageHandler for TracedMessageHandler {
    async fn handle(&self, msg: &RoutedMessage) -> Result<(), BusError> {
        let span = info_span!(
            parent: &self.parent,
            "process",
            messaging.operation = PROCESS_OP,
            client_id = %self.client_id,
            topic = %self.topic,
            subtopic = %msg.subtopic(),
            payload_size = msg.payload().len(),
            error = field::Empty,
        );

        let result = self.inner.handle(msg).instrument(span.clone()).await;
        record_outcome(&span, &result);
        result
    }

    async fn cancel(&self) -> Result<(), BusError> {
        self.inner.cancel().await
    }
}

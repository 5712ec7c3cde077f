// Tracing decorator for session handlers

use crate::core::errors::GatewayError;
use crate::core::models::Session;
use crate::handler::SessionHandler;
use async_trait::async_trait;
use std::future::Future;
use tracing::{field, info_span, Instrument, Span};

/// Wraps a `SessionHandler` with one span per hook
pub struct TracedHandler<H> {
    inner: H,
}

impl<H> TracedHandler<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

fn client_id(session: Option<&Session>) -> &str {
    session.map(|s| s.id.as_str()).unwrap_or_default()
}

async fn traced<F>(span: Span, fut: F) -> Result<(), GatewayError>
where
    F: Future<Output = Result<(), GatewayError>>,
{
    let result = fut.instrument(span.clone()).await;
    if let Err(e) = &result {
        span.record("error", field::display(e));
    }
    result
}

#[async_trait]
impl<H: SessionHandler> SessionHandler for TracedHandler<H> {
    async fn auth_connect(&self, session: Option<&Session>) -> Result<(), GatewayError> {
        let span = info_span!(
            "auth_connect",
            client_id = %client_id(session),
            error = field::Empty,
        );
        traced(span, self.inner.auth_connect(session)).await
    }

    async fn auth_publish(
        &self,
        session: Option<&Session>,
        topic: Option<&str>,
        payload: &[u8],
    ) -> Result<(), GatewayError> {
        let span = info_span!(
            "auth_publish",
            client_id = %client_id(session),
            topic = %topic.unwrap_or_default(),
            payload_size = payload.len(),
            error = field::Empty,
        );
        traced(span, self.inner.auth_publish(session, topic, payload)).await
    }

    async fn auth_subscribe(
        &self,
        session: Option<&Session>,
        topics: Option<&[String]>,
    ) -> Result<(), GatewayError> {
        let span = info_span!(
            "auth_subscribe",
            client_id = %client_id(session),
            topics = %topics.map(|t| t.join(",")).unwrap_or_default(),
            error = field::Empty,
        );
        traced(span, self.inner.auth_subscribe(session, topics)).await
    }

    async fn connect(&self, session: Option<&Session>) -> Result<(), GatewayError> {
        let span = info_span!(
            "connect",
            client_id = %client_id(session),
            error = field::Empty,
        );
        traced(span, self.inner.connect(session)).await
    }

    async fn publish(
        &self,
        session: Option<&Session>,
        topic: &str,
        payload: &[u8],
    ) -> Result<(), GatewayError> {
        let span = info_span!(
            "publish",
            client_id = %client_id(session),
            topic = %topic,
            payload_size = payload.len(),
            error = field::Empty,
        );
        traced(span, self.inner.publish(session, topic, payload)).await
    }

    async fn subscribe(
        &self,
        session: Option<&Session>,
        topics: &[String],
    ) -> Result<(), GatewayError> {
        let span = info_span!(
            "subscribe",
            client_id = %client_id(session),
            topics = %topics.join(","),
            error = field::Empty,
        );
        traced(span, self.inner.subscribe(session, topics)).await
    }

    async fn unsubscribe(
        &self,
        session: Option<&Session>,
        topics: &[String],
    ) -> Result<(), GatewayError> {
        let span = info_span!(
            "unsubscribe",
            client_id = %client_id(session),
            topics = %topics.join(","),
            error = field::Empty,
        );
        traced(span, self.inner.unsubscribe(session, topics)).await
    }

    async fn disconnect(&self, session: Option<&Session>) -> Result<(), GatewayError> {
        let span = info_span!(
            "disconnect",
            client_id = %client_id(session),
            error = field::Empty,
        );
        traced(span, self.inner.disconnect(session)).await
    }
}

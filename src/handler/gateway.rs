//! Gateway session handler.
//!
//! Gatekeeps every protocol operation: validates topics, resolves the
//! session credential through the policy client, authorizes channel access
//! and fans accepted messages out to the bus publishers. Connects and
//! disconnects are recorded as lifecycle events.

use crate::auth::{Action, AuthorizeRequest, PolicyClient};
use crate::core::errors::{GatewayError, Operation};
use crate::core::models::{RoutedMessage, Session};
use crate::core::time::now_nanos;
use crate::events::lifecycle::LifecycleEvent;
use crate::events::{Event, EventPublisher};
use crate::handler::SessionHandler;
use crate::messaging::BusPublisher;
use crate::topic;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

pub struct GatewayHandler {
    publishers: Vec<Arc<dyn BusPublisher>>,
    events: Arc<dyn EventPublisher>,
    policy: Arc<dyn PolicyClient>,
    instance_id: String,
}

fn require_session(session: Option<&Session>) -> Result<&Session, GatewayError> {
    session.ok_or(GatewayError::ClientNotInitialized)
}

/// Guard shared by the `auth_*` hooks; runs before any policy call
fn auth_session(session: Option<&Session>) -> Result<&Session, GatewayError> {
    let session = require_session(session)?;
    if session.id.is_empty() {
        return Err(GatewayError::MissingClientId);
    }
    Ok(session)
}

fn hook_session(session: Option<&Session>, op: Operation) -> Result<&Session, GatewayError> {
    require_session(session).map_err(|e| GatewayError::failed(op, e))
}

impl GatewayHandler {
    /// # Parameters
    /// * `publishers` - bus sinks every accepted message is forwarded to
    /// * `events` - receives connect / disconnect lifecycle events
    /// * `policy` - identity resolution and channel authorization
    /// * `instance_id` - tag identifying this gateway instance on lifecycle events
    pub fn new(
        publishers: Vec<Arc<dyn BusPublisher>>,
        events: Arc<dyn EventPublisher>,
        policy: Arc<dyn PolicyClient>,
        instance_id: impl Into<String>,
    ) -> Self {
        Self {
            publishers,
            events,
            policy,
            instance_id: instance_id.into(),
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Resolve the session credential to a subject id
    async fn identify(&self, session: &Session) -> Result<String, GatewayError> {
        match self.policy.identify(session.credential.expose_secret()).await {
            Ok(subject) if !subject.is_empty() => Ok(subject),
            Ok(_) => {
                warn!(client_id = %session.id, "Policy client resolved an empty identity");
                Err(GatewayError::Authentication)
            }
            Err(e) => {
                let fingerprint = session.credential.fingerprint();
                warn!(
                    client_id = %session.id,
                    credential = %fingerprint.short(),
                    error = %e,
                    "Failed to identify client"
                );
                Err(GatewayError::Authentication)
            }
        }
    }

    /// Check `action` on `channel` for an already identified subject
    async fn authorize_channel(
        &self,
        session: &Session,
        subject: &str,
        channel: &str,
        action: Action,
    ) -> Result<(), GatewayError> {
        let request = AuthorizeRequest::new(subject, channel, action);
        match self.policy.authorize(&request).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                info!(
                    client_id = %session.id,
                    channel = %request.object,
                    action = %action,
                    "Access denied"
                );
                Err(GatewayError::Authorization)
            }
            Err(e) => {
                warn!(
                    client_id = %session.id,
                    channel = %request.object,
                    action = %action,
                    error = %e,
                    "Failed to authorize client"
                );
                Err(GatewayError::Authorization)
            }
        }
    }

    async fn emit(&self, event: LifecycleEvent) {
        if let Err(e) = self.events.publish(&event).await {
            warn!(
                client_id = %event.client_id,
                operation = %event.operation(),
                error = %e,
                "Failed to publish lifecycle event"
            );
        }
    }

    /// Forward to every sink; report the first failure
    async fn fan_out(&self, msg: &RoutedMessage) -> Result<(), GatewayError> {
        let mut first_error = None;

        for publisher in &self.publishers {
            if let Err(e) = publisher.publish(msg).await {
                if first_error.is_none() {
                    first_error = Some(e);
                } else {
                    warn!(
                        client_id = %msg.publisher(),
                        channel = %msg.channel(),
                        error = %e,
                        "Additional bus publisher failed"
                    );
                }
            }
        }

        match first_error {
            Some(e) => Err(GatewayError::failed(
                Operation::Publish,
                GatewayError::Broker(e),
            )),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SessionHandler for GatewayHandler {
    async fn auth_connect(&self, session: Option<&Session>) -> Result<(), GatewayError> {
        let session = auth_session(session)?;

        let subject = self.identify(session).await?;
        if subject != session.principal {
            warn!(
                client_id = %session.id,
                principal = %session.principal,
                "Credential does not belong to the claimed principal"
            );
            return Err(GatewayError::Authentication);
        }

        self.emit(LifecycleEvent::connect(&session.id, &self.instance_id))
            .await;
        Ok(())
    }

    async fn auth_publish(
        &self,
        session: Option<&Session>,
        topic: Option<&str>,
        _payload: &[u8],
    ) -> Result<(), GatewayError> {
        let session = auth_session(session)?;
        let topic = topic.ok_or(GatewayError::MissingTopicPub)?;

        let (channel, _) = topic::parse(topic)?;
        let subject = self.identify(session).await?;
        self.authorize_channel(session, &subject, &channel, Action::Write)
            .await
    }

    async fn auth_subscribe(
        &self,
        session: Option<&Session>,
        topics: Option<&[String]>,
    ) -> Result<(), GatewayError> {
        let session = auth_session(session)?;
        let topics = topics.ok_or(GatewayError::MissingTopicSub)?;

        // resolved on the first well-formed topic, reused for the rest of the batch
        let mut subject: Option<String> = None;
        for topic in topics {
            let (channel, _) = topic::parse(topic)?;
            if subject.is_none() {
                subject = Some(self.identify(session).await?);
            }
            let subject = subject.as_deref().unwrap_or_default();
            self.authorize_channel(session, subject, &channel, Action::Read)
                .await?;
        }
        Ok(())
    }

    async fn connect(&self, session: Option<&Session>) -> Result<(), GatewayError> {
        let session = hook_session(session, Operation::Connect)?;
        info!("connected with client_id {}", session.id);
        Ok(())
    }

    async fn publish(
        &self,
        session: Option<&Session>,
        topic: &str,
        payload: &[u8],
    ) -> Result<(), GatewayError> {
        let session = hook_session(session, Operation::Publish)?;
        info!("published with client_id {} to the topic {}", session.id, topic);

        let parts =
            topic::split(topic).map_err(|e| GatewayError::failed(Operation::Publish, e))?;
        let subtopic = topic::parse_subtopic(parts.raw_subtopic)
            .map_err(|e| GatewayError::failed(Operation::ParseSubtopic, e))?;

        let msg = RoutedMessage::new(
            parts.channel,
            subtopic,
            session.id.as_str(),
            payload.to_vec(),
            now_nanos(),
        );
        self.fan_out(&msg).await
    }

    async fn subscribe(
        &self,
        session: Option<&Session>,
        topics: &[String],
    ) -> Result<(), GatewayError> {
        let session = hook_session(session, Operation::Subscribe)?;
        info!(
            "subscribed with client_id {} to topics {}",
            session.id,
            topics.join(", ")
        );
        Ok(())
    }

    async fn unsubscribe(
        &self,
        session: Option<&Session>,
        topics: &[String],
    ) -> Result<(), GatewayError> {
        let session = hook_session(session, Operation::Unsubscribe)?;
        info!(
            "unsubscribed client_id {} from topics {}",
            session.id,
            topics.join(", ")
        );
        Ok(())
    }

    async fn disconnect(&self, session: Option<&Session>) -> Result<(), GatewayError> {
        let session = hook_session(session, Operation::Disconnect)?;
        info!(
            "disconnected client_id {} and username {}",
            session.id, session.principal
        );

        self.emit(LifecycleEvent::disconnect(&session.id, &self.instance_id))
            .await;
        Ok(())
    }
}

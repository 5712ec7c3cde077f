// In-process pub/sub bus

use crate::core::errors::BusError;
use crate::core::models::RoutedMessage;
use crate::messaging::{BusPublisher, MessageHandler, PubSub};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

type Subscribers = HashMap<String, Arc<dyn MessageHandler>>;

/// Pub/sub bus living inside the process
///
/// Subscription topics are matched against `RoutedMessage::subject()`, either
/// exactly or as a prefix when they end in `.>` (`channels.ch1.>` receives every
/// subtopic of `ch1`). Handler errors are logged and do not fail the publish.
#[derive(Default)]
pub struct InMemoryPubSub {
    /// topic -> subscriber id -> handler
    subscriptions: RwLock<HashMap<String, Subscribers>>,
    closed: AtomicBool,
}

impl InMemoryPubSub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(HashMap::len)
            .sum()
    }

    fn ensure_open(&self) -> Result<(), BusError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BusError::Closed);
        }
        Ok(())
    }

    fn matching_handlers(&self, subject: &str) -> Vec<Arc<dyn MessageHandler>> {
        self.subscriptions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|(topic, _)| topic_matches(topic, subject))
            .flat_map(|(_, subscribers)| subscribers.values().cloned())
            .collect()
    }
}

/// Exact match, or prefix match for patterns ending in `.>`
pub fn topic_matches(pattern: &str, subject: &str) -> bool {
    match pattern.strip_suffix(".>") {
        Some(prefix) => subject
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.len() > 1 && rest.starts_with('.')),
        None => pattern == subject,
    }
}

#[async_trait]
impl BusPublisher for InMemoryPubSub {
    async fn publish(&self, msg: &RoutedMessage) -> Result<(), BusError> {
        self.ensure_open()?;

        let subject = msg.subject();
        let handlers = self.matching_handlers(&subject);
        debug!(subject = %subject, subscribers = handlers.len(), "Dispatching message");

        for handler in handlers {
            if let Err(e) = handler.handle(msg).await {
                warn!(subject = %subject, error = %e, "Message handler failed");
            }
        }

        Ok(())
    }

    async fn close(&self) -> Result<(), BusError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let drained: Vec<Arc<dyn MessageHandler>> = {
            let mut subscriptions = self
                .subscriptions
                .write()
                .unwrap_or_else(|e| e.into_inner());
            subscriptions
                .drain()
                .flat_map(|(_, subscribers)| subscribers.into_values())
                .collect()
        };

        for handler in drained {
            if let Err(e) = handler.cancel().await {
                warn!(error = %e, "Failed to cancel handler on close");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PubSub for InMemoryPubSub {
    async fn subscribe(
        &self,
        id: &str,
        topic: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), BusError> {
        self.ensure_open()?;
        if id.is_empty() || topic.is_empty() {
            return Err(BusError::Subscribe(
                "subscriber id and topic must not be empty".to_string(),
            ));
        }

        let replaced = self
            .subscriptions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(topic.to_string())
            .or_default()
            .insert(id.to_string(), handler);

        if let Some(previous) = replaced {
            previous.cancel().await?;
        }
        Ok(())
    }

    async fn unsubscribe(&self, id: &str, topic: &str) -> Result<(), BusError> {
        self.ensure_open()?;

        let removed = {
            let mut subscriptions = self
                .subscriptions
                .write()
                .unwrap_or_else(|e| e.into_inner());
            let removed = subscriptions
                .get_mut(topic)
                .and_then(|subscribers| subscribers.remove(id));
            if subscriptions.get(topic).is_some_and(HashMap::is_empty) {
                subscriptions.remove(topic);
            }
            removed
        };

        match removed {
            Some(handler) => handler.cancel().await,
            None => Err(BusError::NotSubscribed {
                id: id.to_string(),
                topic: topic.to_string(),
            }),
        }
    }
}

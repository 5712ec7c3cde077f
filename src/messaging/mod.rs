// Internal message bus contracts

pub mod memory;
pub mod traced;

use crate::core::errors::BusError;
use crate::core::models::RoutedMessage;
use std::sync::Arc;

/// Fan-out sink for routed messages
#[async_trait::async_trait]
pub trait BusPublisher: Send + Sync {
    async fn publish(&self, msg: &RoutedMessage) -> Result<(), BusError>;

    async fn close(&self) -> Result<(), BusError>;
}

#[async_trait::async_trait]
impl<T: BusPublisher + ?Sized> BusPublisher for Arc<T> {
    async fn publish(&self, msg: &RoutedMessage) -> Result<(), BusError> {
        (**self).publish(msg).await
    }

    async fn close(&self) -> Result<(), BusError> {
        (**self).close().await
    }
}

/// Consumer side of a subscription
#[async_trait::async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, msg: &RoutedMessage) -> Result<(), BusError>;

    /// Called once when the subscription is removed or replaced
    async fn cancel(&self) -> Result<(), BusError>;
}

/// Publisher that also manages subscriptions
#[async_trait::async_trait]
pub trait PubSub: BusPublisher {
    /// Subscribe `handler` under subscriber `id` to `topic`
    async fn subscribe(
        &self,
        id: &str,
        topic: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), BusError>;

    async fn unsubscribe(&self, id: &str, topic: &str) -> Result<(), BusError>;
}

#[async_trait::async_trait]
impl<T: PubSub + ?Sized> PubSub for Arc<T> {
    async fn subscribe(
        &self,
        id: &str,
        topic: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), BusError> {
        (**self).subscribe(id, topic, handler).await
    }

    async fn unsubscribe(&self, id: &str, topic: &str) -> Result<(), BusError> {
        (**self).unsubscribe(id, topic).await
    }
}

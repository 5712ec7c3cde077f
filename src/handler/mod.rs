// Session authorization and dispatch hooks invoked by the transport layer

pub mod gateway;
pub mod traced;

pub use gateway::GatewayHandler;
pub use traced::TracedHandler;

use crate::core::errors::GatewayError;
use crate::core::models::Session;
use async_trait::async_trait;

/// Per-operation hooks of a protocol session
///
/// `session` is `None` when the transport has no session in context. The
/// transport calls each `auth_*` hook before the matching side-effect hook, but
/// every hook validates its own inputs again.
#[async_trait]
pub trait SessionHandler: Send + Sync {
    /// Authenticate the session credential against the claimed principal
    async fn auth_connect(&self, session: Option<&Session>) -> Result<(), GatewayError>;

    /// Authorize a `write` on the topic's channel
    async fn auth_publish(
        &self,
        session: Option<&Session>,
        topic: Option<&str>,
        payload: &[u8],
    ) -> Result<(), GatewayError>;

    /// Authorize a `read` on every topic's channel; the first failure wins
    async fn auth_subscribe(
        &self,
        session: Option<&Session>,
        topics: Option<&[String]>,
    ) -> Result<(), GatewayError>;

    async fn connect(&self, session: Option<&Session>) -> Result<(), GatewayError>;

    /// Route the payload to every bus publisher
    async fn publish(
        &self,
        session: Option<&Session>,
        topic: &str,
        payload: &[u8],
    ) -> Result<(), GatewayError>;

    async fn subscribe(
        &self,
        session: Option<&Session>,
        topics: &[String],
    ) -> Result<(), GatewayError>;

    async fn unsubscribe(
        &self,
        session: Option<&Session>,
        topics: &[String],
    ) -> Result<(), GatewayError>;

    async fn disconnect(&self, session: Option<&Session>) -> Result<(), GatewayError>;
}

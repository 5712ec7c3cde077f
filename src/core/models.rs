// Session and message models shared by the handler and the bus

use crate::core::credential::Credential;
use serde::{Deserialize, Serialize};

/// Protocol name stamped on every routed message
pub const PROTOCOL: &str = "mqtt";

/// One connected principal, as handed over by the transport layer
///
/// The transport creates and destroys sessions; the handler only borrows one
/// for the duration of a single hook call.
#[derive(Debug, Clone)]
pub struct Session {
    /// Transport client id, must be non-empty
    pub id: String,
    /// Identity the client claims (thing id)
    pub principal: String,
    pub credential: Credential,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        principal: impl Into<String>,
        credential: impl Into<Credential>,
    ) -> Self {
        Self {
            id: id.into(),
            principal: principal.into(),
            credential: credential.into(),
        }
    }
}

/// Message routed from a session to the internal bus
///
/// Immutable once built by the handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutedMessage {
    channel: String,
    subtopic: String,
    publisher: String,
    protocol: String,
    payload: Vec<u8>,
    /// Unix timestamp in nanoseconds
    created: i64,
}

impl RoutedMessage {
    pub fn new(
        channel: impl Into<String>,
        subtopic: impl Into<String>,
        publisher: impl Into<String>,
        payload: Vec<u8>,
        created: i64,
    ) -> Self {
        Self {
            channel: channel.into(),
            subtopic: subtopic.into(),
            publisher: publisher.into(),
            protocol: PROTOCOL.to_string(),
            payload,
            created,
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn subtopic(&self) -> &str {
        &self.subtopic
    }

    pub fn publisher(&self) -> &str {
        &self.publisher
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn created(&self) -> i64 {
        self.created
    }

    /// Bus subject: `channels.<channel>` or `channels.<channel>.<subtopic>`
    pub fn subject(&self) -> String {
        if self.subtopic.is_empty() {
            format!("channels.{}", self.channel)
        } else {
            format!("channels.{}.{}", self.channel, self.subtopic)
        }
    }
}

// Domain error types for the gateway, the bus, the policy client and the event store

use std::fmt;
use thiserror::Error;

/// Hook a wrapped error failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Connect,
    Publish,
    Subscribe,
    Unsubscribe,
    Disconnect,
    ParseSubtopic,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Connect => "failed to connect",
            Operation::Publish => "failed to publish",
            Operation::Subscribe => "failed to subscribe",
            Operation::Unsubscribe => "failed to unsubscribe",
            Operation::Disconnect => "failed to disconnect",
            Operation::ParseSubtopic => "failed to parse subtopic",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned to the transport layer by the session handler
///
/// The transport decides how to reject the protocol operation; nothing here is retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("client is not initialized")]
    ClientNotInitialized,

    #[error("client_id not found")]
    MissingClientId,

    #[error("failed to publish due to missing topic")]
    MissingTopicPub,

    #[error("failed to subscribe due to missing topic")]
    MissingTopicSub,

    #[error("malformed topic")]
    MalformedTopic,

    #[error("malformed subtopic")]
    MalformedSubtopic,

    /// Credential could not be resolved to the session principal
    #[error("failed to perform authentication over the entity")]
    Authentication,

    /// Policy denied the action or could not be consulted
    #[error("failed to perform authorization over the entity")]
    Authorization,

    /// A bus publisher rejected the routed message
    #[error("failed to publish to message broker: {0}")]
    Broker(#[from] BusError),

    /// An operation hook failed with the wrapped cause
    #[error("{op}: {cause}")]
    Failed {
        op: Operation,
        #[source]
        cause: Box<GatewayError>,
    },
}

impl GatewayError {
    /// Wrap `cause` as the failure of `op`
    pub fn failed(op: Operation, cause: GatewayError) -> Self {
        GatewayError::Failed {
            op,
            cause: Box::new(cause),
        }
    }

    /// Innermost error of a `Failed` chain, or `self`
    pub fn root_cause(&self) -> &GatewayError {
        let mut current = self;
        while let GatewayError::Failed { cause, .. } = current {
            current = cause;
        }
        current
    }

    /// True if `self` or any wrapped cause equals `other`
    pub fn contains(&self, other: &GatewayError) -> bool {
        let mut current = self;
        loop {
            if current == other {
                return true;
            }
            match current {
                GatewayError::Failed { cause, .. } => current = cause,
                _ => return false,
            }
        }
    }
}

/// Bus publisher / pub-sub errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("publish failed: {0}")]
    Publish(String),

    #[error("subscription failed: {0}")]
    Subscribe(String),

    #[error("not subscribed to topic {topic} with id {id}")]
    NotSubscribed { id: String, topic: String },

    #[error("message handler failed: {0}")]
    Handler(String),

    #[error("publisher is closed")]
    Closed,
}

/// Policy service errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// No entity matches the presented secret
    #[error("entity not found")]
    NotFound,

    /// The policy backend could not answer
    #[error("policy service unavailable: {0}")]
    Unavailable(String),

    #[error("invalid policy definition: {0}")]
    InvalidDefinition(String),
}

/// Event encoding and event store errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    #[error("failed to encode event: {0}")]
    Encode(String),

    #[error("event store error: {0}")]
    Store(String),

    #[error("event store probe timed out after {0} ms")]
    ProbeTimeout(u64),

    #[error("event store write timed out after {0} ms")]
    WriteTimeout(u64),

    #[error("invalid event publisher settings: {0}")]
    Settings(String),

    #[error("event publisher is closed")]
    Closed,
}

/// Configuration loading errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid {key} value '{value}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Invalid(String),
}

/// Errors assembling the gateway from configuration
#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Events(#[from] EventError),
}

// Event model, event store contract and the publisher contracts

pub mod buffer;
pub mod lifecycle;
pub mod metrics;
pub mod publisher;
pub mod redis_store;
pub mod traced;

use crate::core::errors::EventError;
use async_trait::async_trait;
use redis::{RedisWrite, ToRedisArgs};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Field stamped on every published event with the send time (Unix nanoseconds)
pub const OCCURRED_AT: &str = "occurred_at";

/// Scalar value of an encoded event field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Str(s) => f.write_str(s),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::UInt(u) => write!(f, "{}", u),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Str(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::UInt(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl ToRedisArgs for FieldValue {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        match self {
            FieldValue::Str(s) => s.write_redis_args(out),
            FieldValue::Int(i) => i.write_redis_args(out),
            FieldValue::UInt(u) => u.write_redis_args(out),
            FieldValue::Float(v) => v.write_redis_args(out),
            FieldValue::Bool(b) => {
                let text = if *b { "true" } else { "false" };
                text.write_redis_args(out)
            }
        }
    }
}

/// Flat, ordered field map of an encoded event
pub type EventFields = BTreeMap<String, FieldValue>;

/// Anything that can be flattened into stream fields
pub trait Event: Send + Sync {
    /// Name stamped on the stream entry and on tracing spans
    fn operation(&self) -> String;

    fn encode(&self) -> Result<EventFields, EventError>;
}

/// One entry destined for a stream, approximately trimmed to `max_len`
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub stream: String,
    pub max_len: u64,
    pub fields: EventFields,
}

/// Durable append-only stream store
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Cheap connectivity check
    async fn ping(&self) -> Result<(), EventError>;

    async fn append(&self, record: &EventRecord) -> Result<(), EventError>;

    async fn close(&self) -> Result<(), EventError>;
}

#[async_trait]
impl<T: EventStore + ?Sized> EventStore for Arc<T> {
    async fn ping(&self) -> Result<(), EventError> {
        (**self).ping().await
    }

    async fn append(&self, record: &EventRecord) -> Result<(), EventError> {
        (**self).append(record).await
    }

    async fn close(&self) -> Result<(), EventError> {
        (**self).close().await
    }
}

/// Sink for domain events
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &dyn Event) -> Result<(), EventError>;

    async fn close(&self) -> Result<(), EventError>;
}

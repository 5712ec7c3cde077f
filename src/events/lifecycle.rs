// Session lifecycle events emitted on connect and disconnect

use crate::core::errors::EventError;
use crate::events::{Event, EventFields, FieldValue};
use std::fmt;

const OPERATION_PREFIX: &str = "mqtt.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleKind {
    Connect,
    Disconnect,
}

impl LifecycleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleKind::Connect => "connect",
            LifecycleKind::Disconnect => "disconnect",
        }
    }
}

impl fmt::Display for LifecycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A client connected to or disconnected from this gateway instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub client_id: String,
    pub kind: LifecycleKind,
    /// Gateway instance that served the session
    pub instance: String,
}

impl LifecycleEvent {
    pub fn connect(client_id: impl Into<String>, instance: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            kind: LifecycleKind::Connect,
            instance: instance.into(),
        }
    }

    pub fn disconnect(client_id: impl Into<String>, instance: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            kind: LifecycleKind::Disconnect,
            instance: instance.into(),
        }
    }
}

impl Event for LifecycleEvent {
    /// `mqtt.connect` / `mqtt.disconnect`
    fn operation(&self) -> String {
        format!("{}{}", OPERATION_PREFIX, self.kind)
    }

    fn encode(&self) -> Result<EventFields, EventError> {
        if self.client_id.is_empty() {
            return Err(EventError::Encode(
                "lifecycle event requires a client_id".to_string(),
            ));
        }

        let mut fields = EventFields::new();
        fields.insert("operation".to_string(), FieldValue::Str(self.operation()));
        fields.insert(
            "client_id".to_string(),
            FieldValue::Str(self.client_id.clone()),
        );
        fields.insert(
            "instance".to_string(),
            FieldValue::Str(self.instance.clone()),
        );
        Ok(fields)
    }
}

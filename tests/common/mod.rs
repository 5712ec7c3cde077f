// Common test utilities and helpers for all test modules
#![allow(dead_code)]

use async_trait::async_trait;
use mqtt_gateway::auth::static_policy::StaticPolicyClient;
use mqtt_gateway::auth::{Action, AuthorizeRequest, PolicyClient};
use mqtt_gateway::core::errors::{BusError, EventError, PolicyError};
use mqtt_gateway::core::models::{RoutedMessage, Session};
use mqtt_gateway::events::{Event, EventFields, EventPublisher, EventRecord, EventStore, FieldValue};
use mqtt_gateway::handler::GatewayHandler;
use mqtt_gateway::messaging::{BusPublisher, MessageHandler};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const THING_ID: &str = "513d02d2-16c1-4f23-98be-9e12f8fee898";
pub const THING_ID1: &str = "513d02d2-16c1-4f23-98be-9e12f8fee899";
pub const PASSWORD: &str = "password";
pub const PASSWORD1: &str = "password1";
pub const CHAN_ID: &str = "123e4567-e89b-12d3-a456-000000000001";
pub const INVALID_ID: &str = "invalidID";
pub const CLIENT_ID: &str = "clientID";
pub const CLIENT_ID1: &str = "clientID1";
pub const SUBTOPIC: &str = "testSubtopic";
pub const INSTANCE_ID: &str = "gw-test";

pub fn topic(channel: &str) -> String {
    format!("channels/{}/messages", channel)
}

/// `THING_ID` may write `CHAN_ID`, `THING_ID1` may read it
pub fn policy() -> Arc<StaticPolicyClient> {
    let mut policy = StaticPolicyClient::new();
    policy.add_thing(THING_ID, PASSWORD).unwrap();
    policy.add_thing(THING_ID1, PASSWORD1).unwrap();
    policy.grant(THING_ID, CHAN_ID, &[Action::Write]).unwrap();
    policy.grant(THING_ID1, CHAN_ID, &[Action::Read]).unwrap();
    Arc::new(policy)
}

pub fn publisher_session() -> Session {
    Session::new(CLIENT_ID, THING_ID, PASSWORD)
}

pub fn subscriber_session() -> Session {
    Session::new(CLIENT_ID1, THING_ID1, PASSWORD1)
}

pub fn invalid_thing_session() -> Session {
    Session::new(CLIENT_ID, INVALID_ID, PASSWORD)
}

/// Bus publisher recording every message, optionally failing each publish
#[derive(Default)]
pub struct RecordingPublisher {
    messages: Mutex<Vec<RoutedMessage>>,
    failure: Option<BusError>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(error: BusError) -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            failure: Some(error),
        }
    }

    pub fn messages(&self) -> Vec<RoutedMessage> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl BusPublisher for RecordingPublisher {
    async fn publish(&self, msg: &RoutedMessage) -> Result<(), BusError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        self.messages.lock().unwrap().push(msg.clone());
        Ok(())
    }

    async fn close(&self) -> Result<(), BusError> {
        Ok(())
    }
}

/// Message handler recording deliveries
#[derive(Default)]
pub struct RecordingHandler {
    received: Mutex<Vec<RoutedMessage>>,
    cancelled: AtomicUsize,
}

impl RecordingHandler {
    pub fn received(&self) -> Vec<RoutedMessage> {
        self.received.lock().unwrap().clone()
    }

    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageHandler for RecordingHandler {
    async fn handle(&self, msg: &RoutedMessage) -> Result<(), BusError> {
        self.received.lock().unwrap().push(msg.clone());
        Ok(())
    }

    async fn cancel(&self) -> Result<(), BusError> {
        self.cancelled.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Event publisher keeping encoded events in memory
#[derive(Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<EventFields>>,
    fail: AtomicBool,
}

impl RecordingEventPublisher {
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn operations(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|fields| fields.get("operation").map(ToString::to_string))
            .collect()
    }

    pub fn events(&self) -> Vec<EventFields> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(&self, event: &dyn Event) -> Result<(), EventError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EventError::Store("event store unavailable".to_string()));
        }
        let fields = event.encode()?;
        self.events.lock().unwrap().push(fields);
        Ok(())
    }

    async fn close(&self) -> Result<(), EventError> {
        Ok(())
    }
}

/// Event store that can be switched between healthy and unreachable
#[derive(Default)]
pub struct FakeEventStore {
    down: AtomicBool,
    appended: Mutex<Vec<EventRecord>>,
    closed: AtomicBool,
}

impl FakeEventStore {
    pub fn unreachable() -> Self {
        let store = Self::default();
        store.set_down(true);
        store
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn appended(&self) -> Vec<EventRecord> {
        self.appended.lock().unwrap().clone()
    }

    /// Display value of `field` for every appended record, in append order
    pub fn values_of(&self, field: &str) -> Vec<String> {
        self.appended
            .lock()
            .unwrap()
            .iter()
            .filter_map(|record| record.fields.get(field).map(ToString::to_string))
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventStore for FakeEventStore {
    async fn ping(&self) -> Result<(), EventError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(EventError::Store("connection refused".to_string()));
        }
        Ok(())
    }

    async fn append(&self, record: &EventRecord) -> Result<(), EventError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(EventError::Store("connection refused".to_string()));
        }
        self.appended.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn close(&self) -> Result<(), EventError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Policy client counting every call it forwards
pub struct CountingPolicyClient {
    inner: Arc<dyn PolicyClient>,
    calls: AtomicUsize,
}

impl CountingPolicyClient {
    pub fn new(inner: Arc<dyn PolicyClient>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PolicyClient for CountingPolicyClient {
    async fn identify(&self, secret: &str) -> Result<String, PolicyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.identify(secret).await
    }

    async fn authorize(&self, request: &AuthorizeRequest) -> Result<bool, PolicyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.authorize(request).await
    }
}

/// Domain event produced outside the session handler
pub struct ThingUpdated {
    pub id: String,
    pub revision: u64,
    pub enabled: bool,
}

impl Event for ThingUpdated {
    fn operation(&self) -> String {
        "thing.update".to_string()
    }

    fn encode(&self) -> Result<EventFields, EventError> {
        let mut fields = EventFields::new();
        fields.insert("operation".to_string(), FieldValue::Str(self.operation()));
        fields.insert("id".to_string(), FieldValue::Str(self.id.clone()));
        fields.insert("revision".to_string(), FieldValue::UInt(self.revision));
        fields.insert("enabled".to_string(), FieldValue::Bool(self.enabled));
        Ok(fields)
    }
}

pub fn thing_updated(id: &str) -> ThingUpdated {
    ThingUpdated {
        id: id.to_string(),
        revision: 1,
        enabled: true,
    }
}

/// Gateway handler over recording fakes
pub struct TestGateway {
    pub handler: GatewayHandler,
    pub sinks: Vec<Arc<RecordingPublisher>>,
    pub events: Arc<RecordingEventPublisher>,
}

pub fn gateway_with(sinks: Vec<Arc<RecordingPublisher>>) -> TestGateway {
    let events = Arc::new(RecordingEventPublisher::default());
    let publishers: Vec<Arc<dyn BusPublisher>> = sinks
        .iter()
        .map(|sink| sink.clone() as Arc<dyn BusPublisher>)
        .collect();

    TestGateway {
        handler: GatewayHandler::new(publishers, events.clone(), policy(), INSTANCE_ID),
        sinks,
        events,
    }
}

pub fn gateway() -> TestGateway {
    gateway_with(vec![Arc::new(RecordingPublisher::new())])
}

// Full stack: cached policy, traced handler, traced bus and traced resilient publisher

use crate::common::*;
use mqtt_gateway::auth::policy_cache::CachedPolicyClient;
use mqtt_gateway::auth::PolicyClient;
use mqtt_gateway::events::publisher::{PublisherSettings, ResilientEventPublisher};
use mqtt_gateway::events::redis_store::RedisStreamStore;
use mqtt_gateway::events::traced::TracedEventPublisher;
use mqtt_gateway::events::EventPublisher;
use mqtt_gateway::handler::{GatewayHandler, SessionHandler, TracedHandler};
use mqtt_gateway::messaging::memory::InMemoryPubSub;
use mqtt_gateway::messaging::traced::TracedPubSub;
use mqtt_gateway::messaging::{BusPublisher, PubSub};
use mqtt_gateway::telemetry::LogCapture;
use static_assertions::assert_impl_all;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

assert_impl_all!(GatewayHandler: Send, Sync);
assert_impl_all!(TracedHandler<GatewayHandler>: Send, Sync);
assert_impl_all!(InMemoryPubSub: Send, Sync);
assert_impl_all!(TracedPubSub<InMemoryPubSub>: Send, Sync);
assert_impl_all!(CachedPolicyClient: Send, Sync);
assert_impl_all!(ResilientEventPublisher<RedisStreamStore>: Send, Sync);

struct Stack {
    handler: TracedHandler<GatewayHandler>,
    bus: Arc<TracedPubSub<Arc<InMemoryPubSub>>>,
    store: Arc<FakeEventStore>,
    events: Arc<dyn EventPublisher>,
}

fn stack(store: FakeEventStore) -> Stack {
    let store = Arc::new(store);
    let publisher = ResilientEventPublisher::new(
        store.clone(),
        PublisherSettings::default(),
        CancellationToken::new(),
    )
    .unwrap();
    let events: Arc<dyn EventPublisher> = Arc::new(TracedEventPublisher::new(publisher));

    let policy_client: Arc<dyn PolicyClient> = Arc::new(CachedPolicyClient::new(
        policy(),
        Duration::from_secs(10),
        100,
    ));

    let bus = Arc::new(TracedPubSub::new(Arc::new(InMemoryPubSub::new())));
    let publishers: Vec<Arc<dyn BusPublisher>> = vec![bus.clone()];

    Stack {
        handler: TracedHandler::new(GatewayHandler::new(
            publishers,
            events.clone(),
            policy_client,
            INSTANCE_ID,
        )),
        bus,
        store,
        events,
    }
}

#[tokio::test]
async fn test_session_lifecycle_end_to_end() {
    let capture = LogCapture::new();
    let _guard = tracing::subscriber::set_default(capture.subscriber());

    let stack = stack(FakeEventStore::default());
    let reader = Arc::new(RecordingHandler::default());
    stack
        .bus
        .subscribe(CLIENT_ID1, &format!("channels.{}.>", CHAN_ID), reader.clone())
        .await
        .unwrap();

    let session = publisher_session();
    let topic = format!("{}/room%201/temp", topic(CHAN_ID));

    stack.handler.auth_connect(Some(&session)).await.unwrap();
    stack.handler.connect(Some(&session)).await.unwrap();
    stack
        .handler
        .auth_publish(Some(&session), Some(topic.as_str()), b"21.5")
        .await
        .unwrap();
    stack
        .handler
        .publish(Some(&session), &topic, b"21.5")
        .await
        .unwrap();
    stack.handler.disconnect(Some(&session)).await.unwrap();

    let received = reader.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].subtopic(), "room 1.temp");
    assert_eq!(
        received[0].subject(),
        format!("channels.{}.room 1.temp", CHAN_ID)
    );

    assert_eq!(
        stack.store.values_of("operation"),
        vec!["mqtt.connect", "mqtt.disconnect"]
    );

    let logs = capture.contents();
    for span in ["auth_connect{", "auth_publish{", "publish{", "process{", "publish_event{"] {
        assert!(logs.contains(span), "missing span {}", span);
    }

    stack.events.close().await.unwrap();
    assert!(stack.store.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_connects_during_outage_are_recorded_after_recovery() {
    let stack = stack(FakeEventStore::unreachable());

    stack
        .handler
        .auth_connect(Some(&publisher_session()))
        .await
        .unwrap();
    stack
        .handler
        .auth_connect(Some(&subscriber_session()))
        .await
        .unwrap();
    assert!(stack.store.appended().is_empty());

    stack.store.set_down(false);
    tokio::time::sleep(Duration::from_secs(61)).await;

    assert_eq!(
        stack.store.values_of("client_id"),
        vec![CLIENT_ID, CLIENT_ID1]
    );
}

#[tokio::test]
async fn test_unsubscribed_reader_receives_nothing() {
    let stack = stack(FakeEventStore::default());
    let reader = Arc::new(RecordingHandler::default());
    let subject = format!("channels.{}", CHAN_ID);

    stack
        .bus
        .subscribe(CLIENT_ID1, &subject, reader.clone())
        .await
        .unwrap();
    stack.bus.unsubscribe(CLIENT_ID1, &subject).await.unwrap();
    assert_eq!(reader.cancelled(), 1);

    stack
        .handler
        .publish(Some(&publisher_session()), &topic(CHAN_ID), b"1")
        .await
        .unwrap();
    assert!(reader.received().is_empty());
}

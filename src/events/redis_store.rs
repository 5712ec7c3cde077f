// Redis streams backed event store

use crate::core::errors::EventError;
use crate::events::{EventRecord, EventStore};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Client;
use tokio::sync::Mutex;
use url::Url;

const SUPPORTED_SCHEMES: [&str; 3] = ["redis", "rediss", "redis+unix"];

/// Event store appending records to Redis streams with `XADD`
///
/// The connection manager is created on first use, so the store can be built
/// while Redis is unreachable; the publisher's probes establish it later.
pub struct RedisStreamStore {
    client: Client,
    connection: Mutex<Option<ConnectionManager>>,
}

impl RedisStreamStore {
    /// Validate `redis_url` and prepare a client without connecting
    pub fn new(redis_url: &str) -> Result<Self, EventError> {
        let parsed = Url::parse(redis_url)
            .map_err(|e| EventError::Settings(format!("Invalid event store URL: {}", e)))?;
        if !SUPPORTED_SCHEMES.contains(&parsed.scheme()) {
            return Err(EventError::Settings(format!(
                "Unsupported event store URL scheme '{}'",
                parsed.scheme()
            )));
        }

        let client = Client::open(redis_url)
            .map_err(|e| EventError::Settings(format!("Failed to create Redis client: {}", e)))?;

        Ok(Self {
            client,
            connection: Mutex::new(None),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, EventError> {
        let mut slot = self.connection.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }

        let conn = ConnectionManager::new(self.client.clone())
            .await
            .map_err(|e| EventError::Store(format!("Failed to connect to Redis: {}", e)))?;
        tracing::info!("Connected to Redis event store");

        *slot = Some(conn.clone());
        Ok(conn)
    }
}

/// `XADD <stream> MAXLEN ~ <max_len> * <field> <value> ...`
pub fn xadd_command(record: &EventRecord) -> redis::Cmd {
    let mut cmd = redis::cmd("XADD");
    cmd.arg(&record.stream)
        .arg("MAXLEN")
        .arg("~")
        .arg(record.max_len)
        .arg("*");
    for (field, value) in &record.fields {
        cmd.arg(field).arg(value);
    }
    cmd
}

#[async_trait]
impl EventStore for RedisStreamStore {
    async fn ping(&self) -> Result<(), EventError> {
        let mut conn = self.connection().await?;
        let result: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| EventError::Store(format!("Redis ping failed: {}", e)))?;

        if result == "PONG" {
            Ok(())
        } else {
            Err(EventError::Store(format!(
                "Redis ping returned unexpected response: {}",
                result
            )))
        }
    }

    async fn append(&self, record: &EventRecord) -> Result<(), EventError> {
        if record.fields.is_empty() {
            return Err(EventError::Encode("event has no fields".to_string()));
        }

        let mut conn = self.connection().await?;
        let _entry_id: String = xadd_command(record)
            .query_async(&mut conn)
            .await
            .map_err(|e| EventError::Store(format!("Failed to append to {}: {}", record.stream, e)))?;
        Ok(())
    }

    async fn close(&self) -> Result<(), EventError> {
        self.connection.lock().await.take();
        Ok(())
    }
}

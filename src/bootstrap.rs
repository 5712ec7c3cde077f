// Assembles the decorated gateway stack from configuration

use crate::auth::policy_cache::CachedPolicyClient;
use crate::auth::static_policy::StaticPolicyClient;
use crate::auth::PolicyClient;
use crate::config::Config;
use crate::core::errors::{EventError, StartupError};
use crate::events::publisher::ResilientEventPublisher;
use crate::events::redis_store::RedisStreamStore;
use crate::events::traced::TracedEventPublisher;
use crate::events::EventPublisher;
use crate::handler::{GatewayHandler, SessionHandler, TracedHandler};
use crate::messaging::traced::TracedPubSub;
use crate::messaging::BusPublisher;
use prometheus::Registry;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Maximum entries per policy cache
pub const AUTH_CACHE_CAPACITY: u64 = 10_000;

/// Static policy client behind the TTL cache
pub fn policy_client(config: &Config) -> Result<Arc<dyn PolicyClient>, StartupError> {
    let inner = match &config.policies_yaml_path {
        Some(path) => StaticPolicyClient::from_file(path)?,
        None => {
            warn!("No policies file configured, every credential will be rejected");
            StaticPolicyClient::new()
        }
    };
    info!(things = inner.thing_count(), "Policy client loaded");

    Ok(Arc::new(CachedPolicyClient::new(
        Arc::new(inner),
        config.auth_cache_ttl(),
        AUTH_CACHE_CAPACITY,
    )))
}

/// Traced resilient publisher over the Redis stream store
///
/// Starts the recovery loop, so it must run inside a Tokio runtime. Metrics
/// are registered into `registry` when one is given.
pub fn event_publisher(
    config: &Config,
    shutdown: &CancellationToken,
    registry: Option<&Registry>,
) -> Result<Arc<dyn EventPublisher>, StartupError> {
    let store = RedisStreamStore::new(&config.es_url)?;
    let publisher =
        ResilientEventPublisher::new(store, config.publisher_settings(), shutdown.clone())?;

    if let Some(registry) = registry {
        publisher
            .metrics()
            .register(registry)
            .map_err(|e| EventError::Settings(format!("Failed to register metrics: {}", e)))?;
    }

    Ok(Arc::new(TracedEventPublisher::new(publisher)))
}

/// Traced gateway handler fanning out to traced bus publishers
pub fn session_handler(
    config: &Config,
    publishers: Vec<Arc<dyn BusPublisher>>,
    events: Arc<dyn EventPublisher>,
    policy: Arc<dyn PolicyClient>,
) -> Arc<dyn SessionHandler> {
    let publishers = publishers
        .into_iter()
        .map(|p| Arc::new(TracedPubSub::new(p)) as Arc<dyn BusPublisher>)
        .collect();

    Arc::new(TracedHandler::new(GatewayHandler::new(
        publishers,
        events,
        policy,
        config.instance_id.clone(),
    )))
}

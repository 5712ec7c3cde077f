// Moka cache in front of the policy service

use crate::auth::{AuthorizeRequest, PolicyClient};
use crate::core::credential::CredentialHash;
use crate::core::errors::PolicyError;
use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

/// Caching decorator for any `PolicyClient`
///
/// Identities are keyed by the credential fingerprint, never the raw secret.
/// Decisions (grants and denials) live for `ttl`; errors are not cached.
pub struct CachedPolicyClient {
    inner: Arc<dyn PolicyClient>,
    identities: Cache<CredentialHash, String>,
    decisions: Cache<AuthorizeRequest, bool>,
}

impl CachedPolicyClient {
    /// # Parameters
    /// * `inner` - policy client consulted on cache misses
    /// * `ttl` - time-to-live of cached identities and decisions
    /// * `max_capacity` - maximum entries per cache
    pub fn new(inner: Arc<dyn PolicyClient>, ttl: Duration, max_capacity: u64) -> Self {
        Self {
            inner,
            identities: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(max_capacity)
                .build(),
            decisions: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(max_capacity)
                .build(),
        }
    }
}

#[async_trait]
impl PolicyClient for CachedPolicyClient {
    async fn identify(&self, secret: &str) -> Result<String, PolicyError> {
        let key = CredentialHash::from_secret(secret);
        if let Some(id) = self.identities.get(&key).await {
            return Ok(id);
        }

        let id = self.inner.identify(secret).await?;
        self.identities.insert(key, id.clone()).await;
        Ok(id)
    }

    async fn authorize(&self, request: &AuthorizeRequest) -> Result<bool, PolicyError> {
        if let Some(granted) = self.decisions.get(request).await {
            return Ok(granted);
        }

        let granted = self.inner.authorize(request).await?;
        self.decisions.insert(request.clone(), granted).await;
        Ok(granted)
    }
}

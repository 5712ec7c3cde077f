// Authentication & authorization against the policy service

pub mod policy_cache;
pub mod static_policy;

use crate::core::errors::PolicyError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Action a subject asks to perform on a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Write,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Write => "write",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subject / object / action triple sent to the policy service
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthorizeRequest {
    /// Identified thing id
    pub subject: String,
    /// Channel id
    pub object: String,
    pub action: Action,
}

impl AuthorizeRequest {
    pub fn new(subject: impl Into<String>, object: impl Into<String>, action: Action) -> Self {
        Self {
            subject: subject.into(),
            object: object.into(),
            action,
        }
    }
}

/// Trait for the external policy service
#[async_trait::async_trait]
pub trait PolicyClient: Send + Sync {
    /// Resolve a secret to the id of the entity owning it
    async fn identify(&self, secret: &str) -> Result<String, PolicyError>;

    /// Decide whether `subject` may perform `action` on `object`
    async fn authorize(&self, request: &AuthorizeRequest) -> Result<bool, PolicyError>;
}

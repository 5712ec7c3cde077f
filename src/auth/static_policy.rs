// YAML-backed policy client - things, their secrets and per-channel grants

use crate::auth::{Action, AuthorizeRequest, PolicyClient};
use crate::core::credential::Credential;
use crate::core::errors::PolicyError;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use subtle::ConstantTimeEq;

/// Root of the policies YAML file
///
/// ```yaml
/// things:
///   - id: thing1
///     secret: pw1
///     channels:
///       ch1: [write]
///       ch2: [read, write]
/// ```
#[derive(Debug, Deserialize)]
struct PoliciesYaml {
    #[serde(default)]
    things: Vec<ThingEntry>,
}

#[derive(Debug, Deserialize)]
struct ThingEntry {
    id: String,
    secret: String,
    #[serde(default)]
    channels: HashMap<String, Vec<Action>>,
}

struct StaticThing {
    id: String,
    credential: Credential,
}

/// In-memory policy client for standalone deployments and tests
#[derive(Default)]
pub struct StaticPolicyClient {
    things: Vec<StaticThing>,
    /// (thing id, channel id) -> granted actions
    grants: HashMap<(String, String), HashSet<Action>>,
}

impl StaticPolicyClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load things and grants from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PolicyError> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(PolicyError::InvalidDefinition(format!(
                "Policies file not found at {:?}",
                path_ref
            )));
        }

        let yaml_content = fs::read_to_string(path_ref).map_err(|e| {
            PolicyError::InvalidDefinition(format!("Failed to read policies file: {}", e))
        })?;

        Self::from_yaml_str(&yaml_content)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, PolicyError> {
        let policies: PoliciesYaml = serde_yaml::from_str(yaml).map_err(|e| {
            PolicyError::InvalidDefinition(format!("Failed to parse policies YAML: {}", e))
        })?;

        let mut client = Self::new();
        for entry in policies.things {
            client.add_thing(&entry.id, &entry.secret)?;
            for (channel, actions) in entry.channels {
                client.grant(&entry.id, &channel, &actions)?;
            }
        }

        Ok(client)
    }

    /// Register a thing; ids and secrets must be non-empty and unique
    pub fn add_thing(&mut self, id: &str, secret: &str) -> Result<(), PolicyError> {
        if id.is_empty() || secret.is_empty() {
            return Err(PolicyError::InvalidDefinition(
                "thing id and secret must not be empty".to_string(),
            ));
        }
        if self.things.iter().any(|t| t.id == id) {
            return Err(PolicyError::InvalidDefinition(format!(
                "duplicate thing id '{}'",
                id
            )));
        }
        if self
            .things
            .iter()
            .any(|t| t.credential.expose_secret() == secret)
        {
            return Err(PolicyError::InvalidDefinition(format!(
                "thing '{}' reuses another thing's secret",
                id
            )));
        }

        self.things.push(StaticThing {
            id: id.to_string(),
            credential: Credential::new(secret),
        });
        Ok(())
    }

    /// Grant `actions` on `channel` to an already registered thing
    pub fn grant(&mut self, thing_id: &str, channel: &str, actions: &[Action]) -> Result<(), PolicyError> {
        if !self.things.iter().any(|t| t.id == thing_id) {
            return Err(PolicyError::InvalidDefinition(format!(
                "grant references unknown thing '{}'",
                thing_id
            )));
        }
        if channel.is_empty() {
            return Err(PolicyError::InvalidDefinition(format!(
                "thing '{}' has a grant with an empty channel id",
                thing_id
            )));
        }

        self.grants
            .entry((thing_id.to_string(), channel.to_string()))
            .or_default()
            .extend(actions.iter().copied());
        Ok(())
    }

    pub fn thing_count(&self) -> usize {
        self.things.len()
    }
}

#[async_trait]
impl PolicyClient for StaticPolicyClient {
    async fn identify(&self, secret: &str) -> Result<String, PolicyError> {
        if secret.is_empty() {
            return Err(PolicyError::NotFound);
        }

        // Scan every entry so the lookup time does not depend on the match position
        let mut found = None;
        for thing in &self.things {
            let matches: bool = thing
                .credential
                .expose_secret()
                .as_bytes()
                .ct_eq(secret.as_bytes())
                .into();
            if matches && found.is_none() {
                found = Some(thing.id.clone());
            }
        }

        found.ok_or(PolicyError::NotFound)
    }

    async fn authorize(&self, request: &AuthorizeRequest) -> Result<bool, PolicyError> {
        let key = (request.subject.clone(), request.object.clone());
        Ok(self
            .grants
            .get(&key)
            .is_some_and(|actions| actions.contains(&request.action)))
    }
}

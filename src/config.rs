// Configuration management

use crate::core::errors::ConfigError;
use crate::events::publisher::{
    PublisherSettings, DEFAULT_MAX_PENDING, DEFAULT_MAX_STREAM_LEN, DEFAULT_STREAM,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Gateway configuration loaded from environment variables
///
/// All values are validated on load with clear error messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Tag stamped on lifecycle events
    pub instance_id: String,

    // Event store configuration
    pub es_url: String,
    pub es_stream: String,
    pub es_check_interval_secs: u64,
    pub es_ping_timeout_ms: u64,
    pub es_write_timeout_ms: u64,
    pub es_max_unpublished: usize,
    pub es_max_stream_len: u64,

    // Policy configuration
    pub policies_yaml_path: Option<PathBuf>,
    pub auth_cache_ttl_secs: u64,

    // Logging configuration
    pub log_level: String,
    pub log_format: String, // "json" or "text"
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Reads a `.env` file first when present (non-test builds only).
    pub fn from_env() -> Result<Self, ConfigError> {
        #[cfg(not(test))]
        {
            dotenv::dotenv().ok();
        }

        let config = Self {
            instance_id: Self::get_optional_env("MQTT_ADAPTER_INSTANCE_ID")
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            es_url: Self::get_env_or_default("MQTT_ADAPTER_ES_URL", "redis://localhost:6379/0"),
            es_stream: Self::get_env_or_default("MQTT_ADAPTER_ES_STREAM", DEFAULT_STREAM),
            es_check_interval_secs: Self::parse_positive_or_default(
                "MQTT_ADAPTER_ES_CHECK_INTERVAL_SECS",
                60,
            )?,
            es_ping_timeout_ms: Self::parse_positive_or_default(
                "MQTT_ADAPTER_ES_PING_TIMEOUT_MS",
                100,
            )?,
            es_write_timeout_ms: Self::parse_positive_or_default(
                "MQTT_ADAPTER_ES_WRITE_TIMEOUT_MS",
                1000,
            )?,
            es_max_unpublished: Self::parse_positive_or_default(
                "MQTT_ADAPTER_ES_MAX_UNPUBLISHED",
                DEFAULT_MAX_PENDING,
            )?,
            es_max_stream_len: Self::parse_positive_or_default(
                "MQTT_ADAPTER_ES_MAX_STREAM_LEN",
                DEFAULT_MAX_STREAM_LEN,
            )?,
            policies_yaml_path: Self::get_optional_env("MQTT_ADAPTER_POLICIES_YAML_PATH")
                .map(PathBuf::from),
            auth_cache_ttl_secs: Self::parse_positive_or_default(
                "MQTT_ADAPTER_AUTH_CACHE_TTL_SECS",
                10,
            )?,
            log_level: Self::get_env_or_default("LOG_LEVEL", "info"),
            log_format: Self::get_env_or_default("LOG_FORMAT", "json"),
        };

        config.validate()?;

        Ok(config)
    }

    fn get_env_or_default(key: &str, default: &str) -> String {
        env::var(key).unwrap_or_else(|_| default.to_string())
    }

    fn get_optional_env(key: &str) -> Option<String> {
        match env::var(key) {
            Ok(value) if !value.is_empty() => Some(value),
            _ => None,
        }
    }

    /// Parse a numeric environment variable that must be greater than zero
    fn parse_positive_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr + PartialEq + Default,
        T::Err: std::fmt::Display,
    {
        let value = match env::var(key) {
            Ok(value) => value,
            Err(_) => return Ok(default),
        };

        let parsed = value.parse::<T>().map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.clone(),
            reason: e.to_string(),
        })?;

        if parsed == T::default() {
            return Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value,
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(parsed)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instance_id.is_empty() {
            return Err(ConfigError::Invalid(
                "MQTT_ADAPTER_INSTANCE_ID must not be empty".to_string(),
            ));
        }
        if self.es_stream.is_empty() {
            return Err(ConfigError::Invalid(
                "MQTT_ADAPTER_ES_STREAM must not be empty".to_string(),
            ));
        }

        Self::validate_url(&self.es_url, "MQTT_ADAPTER_ES_URL")?;

        if let Some(ref path) = self.policies_yaml_path {
            Self::validate_file_path(path, "Policies YAML file")?;
        }

        Self::validate_log_level(&self.log_level)?;
        Self::validate_log_format(&self.log_format)?;

        Ok(())
    }

    /// Validate that a file path exists and is readable
    fn validate_file_path(path: &Path, description: &str) -> Result<(), ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::Invalid(format!(
                "{} not found at {:?}",
                description, path
            )));
        }

        std::fs::File::open(path).map_err(|e| {
            ConfigError::Invalid(format!("Cannot read {} at {:?}: {}", description, path, e))
        })?;

        Ok(())
    }

    fn validate_url(url: &str, key: &str) -> Result<(), ConfigError> {
        url::Url::parse(url).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            value: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    fn validate_log_level(level: &str) -> Result<(), ConfigError> {
        if !VALID_LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "LOG_LEVEL".to_string(),
                value: level.to_string(),
                reason: format!("must be one of {}", VALID_LOG_LEVELS.join(", ")),
            });
        }
        Ok(())
    }

    fn validate_log_format(format: &str) -> Result<(), ConfigError> {
        if format != "json" && format != "text" {
            return Err(ConfigError::InvalidValue {
                key: "LOG_FORMAT".to_string(),
                value: format.to_string(),
                reason: "must be 'json' or 'text'".to_string(),
            });
        }
        Ok(())
    }

    /// Event publisher settings derived from the event store section
    pub fn publisher_settings(&self) -> PublisherSettings {
        PublisherSettings {
            stream: self.es_stream.clone(),
            max_stream_len: self.es_max_stream_len,
            max_pending: self.es_max_unpublished,
            check_interval: Duration::from_secs(self.es_check_interval_secs),
            probe_timeout: Duration::from_millis(self.es_ping_timeout_ms),
            write_timeout: Duration::from_millis(self.es_write_timeout_ms),
        }
    }

    pub fn auth_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.auth_cache_ttl_secs)
    }
}

impl Config {
    /// Configuration for tests
    ///
    /// Bypasses environment loading and file validation.
    pub fn test_config() -> Self {
        Self {
            instance_id: "test-instance".to_string(),
            es_url: "redis://localhost:6379/0".to_string(),
            es_stream: DEFAULT_STREAM.to_string(),
            es_check_interval_secs: 60,
            es_ping_timeout_ms: 100,
            es_write_timeout_ms: 1000,
            es_max_unpublished: 1000,
            es_max_stream_len: DEFAULT_MAX_STREAM_LEN,
            policies_yaml_path: None,
            auth_cache_ttl_secs: 10,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}

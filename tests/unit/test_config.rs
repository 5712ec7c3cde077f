// Unit tests for configuration management
// NOTE: environment variables are process-global, tests serialize on ENV_MUTEX

use mqtt_gateway::config::Config;
use mqtt_gateway::core::errors::ConfigError;
use std::env;
use std::fs;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

static ENV_MUTEX: Mutex<()> = Mutex::new(());

const KEYS: [&str; 12] = [
    "MQTT_ADAPTER_INSTANCE_ID",
    "MQTT_ADAPTER_ES_URL",
    "MQTT_ADAPTER_ES_STREAM",
    "MQTT_ADAPTER_ES_CHECK_INTERVAL_SECS",
    "MQTT_ADAPTER_ES_PING_TIMEOUT_MS",
    "MQTT_ADAPTER_ES_WRITE_TIMEOUT_MS",
    "MQTT_ADAPTER_ES_MAX_UNPUBLISHED",
    "MQTT_ADAPTER_ES_MAX_STREAM_LEN",
    "MQTT_ADAPTER_POLICIES_YAML_PATH",
    "MQTT_ADAPTER_AUTH_CACHE_TTL_SECS",
    "LOG_LEVEL",
    "LOG_FORMAT",
];

fn clear_env_vars() {
    for key in KEYS {
        env::remove_var(key);
    }
}

#[test]
fn test_config_default_values() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    clear_env_vars();

    let config = Config::from_env().unwrap();

    assert!(uuid::Uuid::parse_str(&config.instance_id).is_ok());
    assert_eq!(config.es_url, "redis://localhost:6379/0");
    assert_eq!(config.es_stream, "mainflux.mqtt");
    assert_eq!(config.es_check_interval_secs, 60);
    assert_eq!(config.es_ping_timeout_ms, 100);
    assert_eq!(config.es_write_timeout_ms, 1000);
    assert_eq!(config.es_max_unpublished, 1_000_000);
    assert_eq!(config.es_max_stream_len, 1_000_000_000);
    assert!(config.policies_yaml_path.is_none());
    assert_eq!(config.auth_cache_ttl(), Duration::from_secs(10));
    assert_eq!(config.log_level, "info");
    assert_eq!(config.log_format, "json");
}

#[test]
fn test_config_overrides() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    clear_env_vars();

    let temp_dir = TempDir::new().unwrap();
    let policies = temp_dir.path().join("policies.yaml");
    fs::write(&policies, "things: []\n").unwrap();

    env::set_var("MQTT_ADAPTER_INSTANCE_ID", "gw-7");
    env::set_var("MQTT_ADAPTER_ES_URL", "redis://es:6379/1");
    env::set_var("MQTT_ADAPTER_ES_STREAM", "events.mqtt");
    env::set_var("MQTT_ADAPTER_ES_CHECK_INTERVAL_SECS", "5");
    env::set_var("MQTT_ADAPTER_ES_MAX_UNPUBLISHED", "42");
    env::set_var("MQTT_ADAPTER_POLICIES_YAML_PATH", policies.to_str().unwrap());
    env::set_var("LOG_FORMAT", "text");

    let config = Config::from_env().unwrap();
    clear_env_vars();

    assert_eq!(config.instance_id, "gw-7");
    assert_eq!(config.es_url, "redis://es:6379/1");
    assert_eq!(config.policies_yaml_path.as_deref(), Some(policies.as_path()));

    let settings = config.publisher_settings();
    assert_eq!(settings.stream, "events.mqtt");
    assert_eq!(settings.check_interval, Duration::from_secs(5));
    assert_eq!(settings.max_pending, 42);
}

#[test]
fn test_config_rejects_zero_and_garbage_numbers() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

    for value in ["0", "-1", "soon"] {
        clear_env_vars();
        env::set_var("MQTT_ADAPTER_ES_CHECK_INTERVAL_SECS", value);

        let err = Config::from_env().unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "MQTT_ADAPTER_ES_CHECK_INTERVAL_SECS"),
            "{}: {}",
            value,
            err
        );
    }
    clear_env_vars();
}

#[test]
fn test_config_rejects_missing_policies_file() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    clear_env_vars();

    env::set_var("MQTT_ADAPTER_POLICIES_YAML_PATH", "/nonexistent/policies.yaml");
    let result = Config::from_env();
    clear_env_vars();

    assert!(matches!(result, Err(ConfigError::Invalid(ref msg)) if msg.contains("not found")));
}

#[test]
fn test_config_rejects_invalid_log_level() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    clear_env_vars();

    env::set_var("LOG_LEVEL", "loud");
    let result = Config::from_env();
    clear_env_vars();

    assert!(result.is_err());
}

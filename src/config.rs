use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // MQTT configuration
    /// MQTT broker URL (mqtt://host:port)
    #[serde(default = "default_mqtt_broker_url")]
    pub mqtt_broker_url: String,

    /// MQTT username (empty means anonymous)
    #[serde(default)]
    pub mqtt_username: String,

    /// MQTT password
    #[serde(default)]
    pub mqtt_password: String,

    /// Topic the ingestion feed subscribes to
    #[serde(default = "default_mqtt_topic")]
    pub mqtt_topic: String,

    /// Max consecutive MQTT connection attempts before giving up
    #[serde(default = "default_mqtt_max_retry_attempts")]
    pub mqtt_max_retry_attempts: u32,

    /// Delay between MQTT connection attempts in seconds
    #[serde(default = "default_mqtt_retry_delay_secs")]
    pub mqtt_retry_delay_secs: u64,

    // ClickHouse configuration
    /// ClickHouse HTTP endpoint
    #[serde(default = "default_clickhouse_url")]
    pub clickhouse_url: String,

    #[serde(default = "default_clickhouse_database")]
    pub clickhouse_database: String,

    #[serde(default = "default_clickhouse_username")]
    pub clickhouse_username: String,

    #[serde(default)]
    pub clickhouse_password: String,

    /// Table that stores one row per sensor event
    #[serde(default = "default_clickhouse_table")]
    pub clickhouse_table: String,

    // HTTP configuration
    /// Listen address for the query API and WebSocket channel
    #[serde(default = "default_http_listen_addr")]
    pub http_listen_addr: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_mqtt_broker_url() -> String {
    "mqtt://localhost:1883".to_string()
}

fn default_mqtt_topic() -> String {
    "ecostream/events".to_string()
}

fn default_mqtt_max_retry_attempts() -> u32 {
    10
}

fn default_mqtt_retry_delay_secs() -> u64 {
    5
}

fn default_clickhouse_url() -> String {
    "http://localhost:8123".to_string()
}

fn default_clickhouse_database() -> String {
    "default".to_string()
}

fn default_clickhouse_username() -> String {
    "default".to_string()
}

fn default_clickhouse_table() -> String {
    "sensor_events".to_string()
}

fn default_http_listen_addr() -> String {
    "0.0.0.0:3333".to_string()
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("ECOSTREAM"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure tests run serially and don't interfere with each other
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_config() {
        let _lock = TEST_LOCK.lock().unwrap();

        std::env::remove_var("ECOSTREAM_LOG_LEVEL");
        std::env::remove_var("ECOSTREAM_MQTT_TOPIC");
        std::env::remove_var("ECOSTREAM_CLICKHOUSE_TABLE");

        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.mqtt_broker_url, "mqtt://localhost:1883");
        assert_eq!(config.mqtt_topic, "ecostream/events");
        assert_eq!(config.clickhouse_table, "sensor_events");
        assert_eq!(config.http_listen_addr, "0.0.0.0:3333");
    }

    #[test]
    fn test_custom_config() {
        let _lock = TEST_LOCK.lock().unwrap();

        std::env::set_var("ECOSTREAM_LOG_LEVEL", "debug");
        std::env::set_var("ECOSTREAM_MQTT_TOPIC", "plant-a/bags");
        std::env::set_var("ECOSTREAM_CLICKHOUSE_TABLE", "bag_events");

        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.mqtt_topic, "plant-a/bags");
        assert_eq!(config.clickhouse_table, "bag_events");

        std::env::remove_var("ECOSTREAM_LOG_LEVEL");
        std::env::remove_var("ECOSTREAM_MQTT_TOPIC");
        std::env::remove_var("ECOSTREAM_CLICKHOUSE_TABLE");
    }
}

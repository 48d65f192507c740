use schema_replicator::config::{
    Config, LoggingConfig, RegistryConfig, ReplicationConfig,
};
use std::collections::HashMap;
use std::env;

fn registry(var: &str, default: &str) -> RegistryConfig {
    RegistryConfig {
        url: env::var(var).unwrap_or_else(|_| default.to_string()),
        basic_auth_user_info: None,
        timeout_secs: 10,
    }
}

/// Get test configuration from environment variables
pub fn get_test_config() -> Config {
    // Use TEST_ prefix for test environment variables
    let suffix = std::process::id();

    let src_kafka = HashMap::from([
        (
            "bootstrap.servers".to_string(),
            env::var("TEST_SRC_BROKERS").unwrap_or_else(|_| "localhost:9092".to_string()),
        ),
        ("group.id".to_string(), format!("test_replicator_{}", suffix)),
        ("auto.offset.reset".to_string(), "earliest".to_string()),
    ]);

    let dst_kafka = HashMap::from([
        (
            "bootstrap.servers".to_string(),
            env::var("TEST_DST_BROKERS").unwrap_or_else(|_| "localhost:9093".to_string()),
        ),
        ("linger.ms".to_string(), "0".to_string()), // Immediate sending for tests
    ]);

    Config {
        src_kafka,
        src_topics: vec![format!("test_source_{}", suffix)],
        dst_kafka,
        dst_topic: format!("test_destination_{}", suffix),
        src_schema_registry: registry("TEST_SRC_REGISTRY_URL", "http://localhost:8081"),
        dst_schema_registry: registry("TEST_DST_REGISTRY_URL", "http://localhost:8082"),
        subject_name: format!("test_destination_{}-value", suffix),
        replication: ReplicationConfig {
            poll_timeout_ms: 200,
        },
        logging: LoggingConfig::default(),
    }
}

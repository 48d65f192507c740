use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Runtime configuration, loaded once at startup.
///
/// The Kafka sections are handed to librdkafka verbatim, so any client
/// property (`bootstrap.servers`, `group.id`, `security.protocol`, ...)
/// can be set there.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub src_kafka: HashMap<String, String>,
    pub src_topics: Vec<String>,
    pub dst_kafka: HashMap<String, String>,
    pub dst_topic: String,
    pub src_schema_registry: RegistryConfig,
    pub dst_schema_registry: RegistryConfig,
    pub subject_name: String,
    #[serde(default)]
    pub replication: ReplicationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegistryConfig {
    pub url: String,
    #[serde(rename = "basic.auth.user.info", default)]
    pub basic_auth_user_info: Option<String>,
    #[serde(default = "default_registry_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReplicationConfig {
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            poll_timeout_ms: default_poll_timeout_ms(),
        }
    }
}

impl ReplicationConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

impl Config {
    /// Loads the configuration file and applies `SCHEMA_REPLICATOR__*`
    /// environment overrides. The format follows the file extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("SCHEMA_REPLICATOR")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.src_topics.is_empty() || self.src_topics.iter().any(|t| t.trim().is_empty()) {
            return Err(Error::Config(
                "src_topics must list at least one non-empty topic".to_string(),
            ));
        }
        if self.dst_topic.trim().is_empty() {
            return Err(Error::Config("dst_topic must not be empty".to_string()));
        }
        if self.subject_name.trim().is_empty() {
            return Err(Error::Config("subject_name must not be empty".to_string()));
        }
        for (name, registry) in [
            ("src_schema_registry", &self.src_schema_registry),
            ("dst_schema_registry", &self.dst_schema_registry),
        ] {
            if !(registry.url.starts_with("http://") || registry.url.starts_with("https://")) {
                return Err(Error::Config(format!(
                    "{}.url must be an http(s) url, got '{}'",
                    name, registry.url
                )));
            }
        }
        if self.replication.poll_timeout_ms == 0 {
            return Err(Error::Config(
                "replication.poll_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_registry_timeout_secs() -> u64 {
    30
}

fn default_poll_timeout_ms() -> u64 {
    1000
}

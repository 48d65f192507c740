use super::{SourceConsumer, SourcePosition, SourceRecord};
use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::{ClientConfig, Message};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};

/// Source side of the replication, subscribed to the configured topics.
pub struct KafkaSource {
    consumer: Option<StreamConsumer>,
}

impl KafkaSource {
    pub fn new(settings: &HashMap<String, String>, topics: &[String]) -> Result<Self> {
        let consumer: StreamConsumer = client_config(settings).create()?;

        let topics: Vec<&str> = topics.iter().map(String::as_str).collect();
        consumer.subscribe(&topics)?;
        info!(topics = ?topics, "Subscribed to source topics");

        Ok(Self {
            consumer: Some(consumer),
        })
    }
}

#[async_trait]
impl SourceConsumer for KafkaSource {
    async fn poll(&mut self, timeout: Duration) -> Option<Result<SourceRecord>> {
        let consumer = self.consumer.as_ref()?;

        match tokio::time::timeout(timeout, consumer.recv()).await {
            Err(_) => None,
            Ok(Err(e)) => Some(Err(Error::Kafka(e))),
            Ok(Ok(message)) => Some(Ok(SourceRecord {
                position: SourcePosition {
                    topic: message.topic().to_string(),
                    partition: message.partition(),
                    offset: message.offset(),
                },
                value: message.payload().map(Bytes::copy_from_slice),
            })),
        }
    }

    async fn close(&mut self) {
        let Some(consumer) = self.consumer.take() else {
            return;
        };

        consumer.unsubscribe();
        // Dropping the consumer leaves the group and blocks until it has.
        if let Err(e) = tokio::task::spawn_blocking(move || drop(consumer)).await {
            warn!("Failed to close source consumer cleanly: {}", e);
            return;
        }
        info!("Closed source consumer");
    }
}

/// Copies librdkafka properties from the configuration file verbatim.
pub(crate) fn client_config(settings: &HashMap<String, String>) -> ClientConfig {
    let mut config = ClientConfig::new();
    for (key, value) in settings {
        config.set(key, value);
    }
    config
}

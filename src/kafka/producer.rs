use super::{DeliveryReport, DeliveryTracker, DestinationProducer, OutboundRecord};
use crate::kafka::consumer::client_config;
use crate::{Error, Result};
use async_trait::async_trait;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Destination side of the replication.
///
/// Every accepted record gets a task that awaits its delivery report and
/// hands it to the [`DeliveryTracker`]. The tasks live in a [`JoinSet`] so
/// a flush can wait for all of them.
pub struct KafkaSink {
    producer: FutureProducer,
    in_flight: JoinSet<()>,
    deliveries: Arc<DeliveryTracker>,
}

impl KafkaSink {
    pub fn new(settings: &HashMap<String, String>) -> Result<Self> {
        let producer: FutureProducer = client_config(settings).create()?;

        Ok(Self {
            producer,
            in_flight: JoinSet::new(),
            deliveries: Arc::new(DeliveryTracker::new()),
        })
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn deliveries(&self) -> Arc<DeliveryTracker> {
        Arc::clone(&self.deliveries)
    }

    fn reap(result: std::result::Result<(), tokio::task::JoinError>) {
        if let Err(e) = result {
            warn!("Delivery report task failed: {}", e);
        }
    }
}

#[async_trait]
impl DestinationProducer for KafkaSink {
    fn send(&mut self, record: OutboundRecord) -> Result<()> {
        let OutboundRecord {
            topic,
            value,
            source,
        } = record;

        let delivery = self
            .producer
            .send_result(FutureRecord::<(), [u8]>::to(&topic).payload(&value[..]))
            .map_err(|(e, _)| Error::Kafka(e))?;

        let deliveries = Arc::clone(&self.deliveries);
        self.in_flight.spawn(async move {
            let report = match delivery.await {
                Ok(Ok((partition, offset))) => DeliveryReport::Delivered { partition, offset },
                Ok(Err((e, _))) => DeliveryReport::Failed {
                    error: e.to_string(),
                },
                Err(_) => DeliveryReport::Failed {
                    error: "delivery canceled before a report was received".to_string(),
                },
            };
            deliveries.report(&topic, &source, &report);
        });

        Ok(())
    }

    fn poll(&mut self) {
        while let Some(result) = self.in_flight.try_join_next() {
            Self::reap(result);
        }
    }

    /// Waits without a deadline. Each queued record resolves on its own
    /// once librdkafka's `message.timeout.ms` expires, so this returns after
    /// every delivery report, success or failure, has been handled.
    async fn flush(&mut self) -> Result<()> {
        info!(in_flight = self.in_flight.len(), "Flushing destination producer");

        let producer = self.producer.clone();
        let flushed = tokio::task::spawn_blocking(move || producer.flush(Timeout::Never)).await;

        while let Some(result) = self.in_flight.join_next().await {
            Self::reap(result);
        }

        flushed.map_err(|e| Error::Io(std::io::Error::other(e)))??;
        info!(
            delivered = self.deliveries.delivered(),
            failed = self.deliveries.failed(),
            "Destination producer flushed"
        );
        Ok(())
    }
}

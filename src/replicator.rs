use crate::envelope;
use crate::kafka::{
    DestinationProducer, KafkaSink, KafkaSource, OutboundRecord, SourceConsumer, SourceRecord,
};
use crate::registry::RegistryClient;
use crate::shutdown::ShutdownSignal;
use crate::translator::SchemaIdTranslator;
use crate::{Config, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, trace, warn};

const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
    Running,
    Stopping,
}

/// Counters for one replication run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplicationStats {
    pub polled: u64,
    pub replicated: u64,
    pub skipped: u64,
    pub consumer_errors: u64,
}

/// Copies records from the source topics to the destination topic,
/// rewriting the schema id in each envelope.
///
/// One loop owns both clients, so records from a source partition are
/// submitted in the order they were consumed.
pub struct Replicator<C, P> {
    consumer: C,
    producer: P,
    translator: SchemaIdTranslator,
    destination_topic: String,
    poll_timeout: Duration,
    stats: ReplicationStats,
}

impl Replicator<KafkaSource, KafkaSink> {
    /// Connects to both registries and both clusters.
    ///
    /// Any failure here is fatal; the destination subject's compatibility
    /// is relaxed before the consumer joins its group.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let source_registry = Arc::new(RegistryClient::new(&config.src_schema_registry)?);
        let destination_registry = Arc::new(RegistryClient::new(&config.dst_schema_registry)?);
        let translator =
            SchemaIdTranslator::new(source_registry, destination_registry, &config.subject_name)
                .await?;

        let consumer = KafkaSource::new(&config.src_kafka, &config.src_topics)?;
        let producer = KafkaSink::new(&config.dst_kafka)?;

        Ok(Self::new(consumer, producer, translator, &config.dst_topic)
            .with_poll_timeout(config.replication.poll_timeout()))
    }
}

impl<C, P> Replicator<C, P>
where
    C: SourceConsumer,
    P: DestinationProducer,
{
    pub fn new(
        consumer: C,
        producer: P,
        translator: SchemaIdTranslator,
        destination_topic: impl Into<String>,
    ) -> Self {
        Self {
            consumer,
            producer,
            translator,
            destination_topic: destination_topic.into(),
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            stats: ReplicationStats::default(),
        }
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Replicates until `shutdown` is triggered, then flushes the producer
    /// and closes the consumer, in that order.
    ///
    /// The signal is checked between records only; a record that is being
    /// processed when it fires is still submitted. An error that is not
    /// scoped to one record ends the loop early; the producer is still
    /// flushed and the consumer closed before it is returned.
    pub async fn run(mut self, shutdown: ShutdownSignal) -> Result<ReplicationStats> {
        info!(
            destination_topic = %self.destination_topic,
            subject = %self.translator.subject(),
            "Replicator starting"
        );

        let mut state = LoopState::Running;
        let mut outcome = Ok(());
        while state == LoopState::Running {
            if shutdown.is_triggered() {
                state = LoopState::Stopping;
                continue;
            }
            if let Err(e) = self.step().await {
                error!(error = %e, "Replication aborted: {}", e);
                outcome = Err(e);
                state = LoopState::Stopping;
            }
        }

        self.stop().await;
        outcome?;
        Ok(self.stats)
    }

    async fn step(&mut self) -> Result<()> {
        let record = match self.consumer.poll(self.poll_timeout).await {
            None => return Ok(()),
            Some(Err(e)) => {
                self.stats.consumer_errors += 1;
                warn!(error = %e, "Consumer error: {}", e);
                return Ok(());
            }
            Some(Ok(record)) => record,
        };
        self.stats.polled += 1;

        let position = record.position.clone();
        match self.replicate(record).await {
            Ok(destination_id) => {
                self.stats.replicated += 1;
                trace!(source = %position, destination_id, "Submitted record");
            }
            Err(e) if e.is_per_message() => {
                self.stats.skipped += 1;
                error!(
                    source = %position,
                    error = %e,
                    "Failed to replicate record {}: {}",
                    position,
                    e
                );
            }
            Err(e) => return Err(e),
        }

        self.producer.poll();
        Ok(())
    }

    /// Decode, translate, re-encode and submit one record.
    async fn replicate(&mut self, record: SourceRecord) -> Result<u32> {
        let value = record.value.unwrap_or_default();
        let envelope = envelope::decode(&value)?;

        let destination_id = self.translator.translate(envelope.schema_id).await?;
        let translated = envelope.with_schema_id(destination_id);

        self.producer.send(OutboundRecord {
            topic: self.destination_topic.clone(),
            value: translated.encode(),
            source: record.position,
        })?;

        Ok(destination_id)
    }

    async fn stop(&mut self) {
        info!("Stopping replication");

        if let Err(e) = self.producer.flush().await {
            error!(error = %e, "Failed to flush destination producer: {}", e);
        }
        self.consumer.close().await;

        info!(
            polled = self.stats.polled,
            replicated = self.stats.replicated,
            skipped = self.stats.skipped,
            consumer_errors = self.stats.consumer_errors,
            cached_schemas = self.translator.len(),
            "Replication stopped"
        );
    }
}

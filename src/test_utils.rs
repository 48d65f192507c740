//! In-memory stand-ins for the registries and Kafka clients.

use crate::kafka::{
    DeliveryReport, DeliveryTracker, DestinationProducer, OutboundRecord, SourceConsumer,
    SourcePosition, SourceRecord,
};
use crate::registry::{CompatibilityLevel, RegisteredSchema, SchemaRegistry};
use crate::shutdown::ShutdownController;
use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Registry that stores schemas in memory and records every call.
///
/// Registration deduplicates on schema content and hands out ids
/// starting at 1, like an empty Confluent registry.
#[derive(Debug, Default)]
pub struct MockRegistry {
    state: Mutex<MockRegistryState>,
}

#[derive(Debug, Default)]
struct MockRegistryState {
    schemas: HashMap<u32, RegisteredSchema>,
    registered: Vec<RegisteredSchema>,
    registrations: Vec<(String, RegisteredSchema)>,
    fetch_calls: Vec<u32>,
    compatibility_calls: Vec<(String, CompatibilityLevel)>,
    fail_registrations: bool,
    fail_compatibility: bool,
    fetch_failure: Option<fn() -> Error>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: u32, schema: RegisteredSchema) {
        self.state.lock().unwrap().schemas.insert(id, schema);
    }

    pub fn fail_registrations(&self, fail: bool) {
        self.state.lock().unwrap().fail_registrations = fail;
    }

    pub fn fail_compatibility(&self) {
        self.state.lock().unwrap().fail_compatibility = true;
    }

    /// Every fetch after this returns the error built by `failure`.
    pub fn fail_fetches_with(&self, failure: fn() -> Error) {
        self.state.lock().unwrap().fetch_failure = Some(failure);
    }

    pub fn fetch_calls(&self) -> Vec<u32> {
        self.state.lock().unwrap().fetch_calls.clone()
    }

    pub fn registrations(&self) -> Vec<(String, RegisteredSchema)> {
        self.state.lock().unwrap().registrations.clone()
    }

    pub fn compatibility_calls(&self) -> Vec<(String, CompatibilityLevel)> {
        self.state.lock().unwrap().compatibility_calls.clone()
    }
}

#[async_trait]
impl SchemaRegistry for MockRegistry {
    async fn fetch_schema_by_id(&self, id: u32) -> Result<RegisteredSchema> {
        let mut state = self.state.lock().unwrap();
        state.fetch_calls.push(id);
        if let Some(failure) = state.fetch_failure {
            return Err(failure());
        }
        state
            .schemas
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::RegistryLookup {
                context: format!("schema id {}", id),
                message: "Schema not found (error code 40403, HTTP 404)".to_string(),
            })
    }

    async fn register_schema(&self, subject: &str, schema: &RegisteredSchema) -> Result<u32> {
        let mut state = self.state.lock().unwrap();
        if state.fail_registrations {
            return Err(Error::RegistryLookup {
                context: format!("register under subject '{}'", subject),
                message: "Schema being registered is incompatible (error code 409, HTTP 409)"
                    .to_string(),
            });
        }
        state
            .registrations
            .push((subject.to_string(), schema.clone()));

        let existing = state.registered.iter().position(|s| s == schema);
        let index = match existing {
            Some(index) => index,
            None => {
                state.registered.push(schema.clone());
                state.registered.len() - 1
            }
        };
        Ok(index as u32 + 1)
    }

    async fn set_subject_compatibility(
        &self,
        subject: &str,
        level: CompatibilityLevel,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_compatibility {
            return Err(Error::RegistryLookup {
                context: format!("compatibility of subject '{}'", subject),
                message: "HTTP 503 Service Unavailable".to_string(),
            });
        }
        state
            .compatibility_calls
            .push((subject.to_string(), level));
        Ok(())
    }
}

/// Everything the mock consumer and producer did, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Poll,
    Send(Bytes),
    ProducerPoll,
    Delivered(SourcePosition),
    DeliveryFailed(SourcePosition),
    Flush,
    Close,
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn events(log: &EventLog) -> Vec<Event> {
    log.lock().unwrap().clone()
}

pub fn record(offset: i64, value: &[u8]) -> SourceRecord {
    SourceRecord {
        position: SourcePosition {
            topic: "source".to_string(),
            partition: 0,
            offset,
        },
        value: Some(Bytes::copy_from_slice(value)),
    }
}

/// Replays a fixed sequence of poll results, then triggers shutdown.
pub struct MockConsumer {
    script: VecDeque<Option<Result<SourceRecord>>>,
    log: EventLog,
    shutdown: ShutdownController,
    close_hook: Option<Box<dyn FnMut() + Send>>,
}

impl MockConsumer {
    pub fn new(
        script: Vec<Option<Result<SourceRecord>>>,
        log: EventLog,
        shutdown: ShutdownController,
    ) -> Self {
        Self {
            script: script.into(),
            log,
            shutdown,
            close_hook: None,
        }
    }

    /// Runs `hook` when the consumer is closed, before `Event::Close` is
    /// recorded.
    pub fn with_close_hook(mut self, hook: impl FnMut() + Send + 'static) -> Self {
        self.close_hook = Some(Box::new(hook));
        self
    }
}

#[async_trait]
impl SourceConsumer for MockConsumer {
    async fn poll(&mut self, _timeout: Duration) -> Option<Result<SourceRecord>> {
        self.log.lock().unwrap().push(Event::Poll);
        match self.script.pop_front() {
            Some(result) => result,
            None => {
                self.shutdown.trigger();
                None
            }
        }
    }

    async fn close(&mut self) {
        if let Some(hook) = self.close_hook.as_mut() {
            hook();
        }
        self.log.lock().unwrap().push(Event::Close);
    }
}

/// Accepts records into a pending queue; deliveries complete on `flush`
/// and are reported to a [`DeliveryTracker`].
pub struct MockProducer {
    log: EventLog,
    pending: Vec<OutboundRecord>,
    rejected_sends: usize,
    failing_offsets: Vec<i64>,
    deliveries: Arc<DeliveryTracker>,
}

impl MockProducer {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            pending: Vec::new(),
            rejected_sends: 0,
            failing_offsets: Vec::new(),
            deliveries: Arc::new(DeliveryTracker::new()),
        }
    }

    pub fn deliveries(&self) -> Arc<DeliveryTracker> {
        Arc::clone(&self.deliveries)
    }

    /// Records read from these source offsets are accepted but their
    /// delivery fails.
    pub fn fail_deliveries_at(mut self, offsets: &[i64]) -> Self {
        self.failing_offsets = offsets.to_vec();
        self
    }

    /// The next `count` sends fail as if the local queue were full.
    pub fn reject_next(mut self, count: usize) -> Self {
        self.rejected_sends = count;
        self
    }

    fn deliver_pending(&mut self) {
        for (offset, record) in self.pending.drain(..).enumerate() {
            let (report, event) = if self.failing_offsets.contains(&record.source.offset) {
                (
                    DeliveryReport::Failed {
                        error: "Local: Message timed out".to_string(),
                    },
                    Event::DeliveryFailed(record.source.clone()),
                )
            } else {
                (
                    DeliveryReport::Delivered {
                        partition: 0,
                        offset: offset as i64,
                    },
                    Event::Delivered(record.source.clone()),
                )
            };
            self.deliveries.report(&record.topic, &record.source, &report);
            self.log.lock().unwrap().push(event);
        }
    }
}

#[async_trait]
impl DestinationProducer for MockProducer {
    fn send(&mut self, record: OutboundRecord) -> Result<()> {
        if self.rejected_sends > 0 {
            self.rejected_sends -= 1;
            return Err(Error::Kafka(KafkaError::MessageProduction(
                RDKafkaErrorCode::QueueFull,
            )));
        }
        self.log
            .lock()
            .unwrap()
            .push(Event::Send(record.value.clone()));
        self.pending.push(record);
        Ok(())
    }

    fn poll(&mut self) {
        self.log.lock().unwrap().push(Event::ProducerPoll);
    }

    async fn flush(&mut self) -> Result<()> {
        self.deliver_pending();
        self.log.lock().unwrap().push(Event::Flush);
        Ok(())
    }
}

pub mod consumer;
pub mod delivery;
pub mod producer;


use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::time::Duration;

pub use consumer::KafkaSource;
pub use delivery::{DeliveryReport, DeliveryTracker};
pub use producer::KafkaSink;

/// Where a record was read from on the source cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePosition {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]@{}", self.topic, self.partition, self.offset)
    }
}

/// A record consumed from the source topic.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    pub position: SourcePosition,
    /// `None` for tombstones.
    pub value: Option<Bytes>,
}

/// A record ready to be produced to the destination topic.
#[derive(Debug, Clone)]
pub struct OutboundRecord {
    pub topic: String,
    pub value: Bytes,
    /// Identity of the record this one was copied from, for delivery logs.
    pub source: SourcePosition,
}

#[async_trait]
pub trait SourceConsumer: Send {
    /// Waits up to `timeout` for the next record.
    ///
    /// `None` means nothing arrived. `Some(Err(_))` is a consumer-level
    /// error reported in place of a record.
    async fn poll(&mut self, timeout: Duration) -> Option<Result<SourceRecord>>;

    /// Leaves the consumer group. Polling afterwards yields nothing.
    async fn close(&mut self);
}

#[async_trait]
pub trait DestinationProducer: Send {
    /// Enqueues a record for asynchronous delivery.
    ///
    /// Errors here (such as a full local queue) mean the record was not
    /// accepted. Delivery outcomes are reported later through a
    /// [`DeliveryTracker`].
    fn send(&mut self, record: OutboundRecord) -> Result<()>;

    /// Reaps deliveries that have already completed, without blocking.
    fn poll(&mut self);

    /// Blocks until every outstanding delivery has been reported.
    async fn flush(&mut self) -> Result<()>;
}

use super::SourcePosition;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error};

/// Outcome of one produce attempt, as reported by the destination cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryReport {
    Delivered { partition: i32, offset: i64 },
    Failed { error: String },
}

/// Delivery callback target.
///
/// Runs once per accepted record, off the replication loop. It logs the
/// outcome and keeps running totals; failed deliveries are not retried.
#[derive(Debug, Default)]
pub struct DeliveryTracker {
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl DeliveryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self, topic: &str, source: &SourcePosition, report: &DeliveryReport) {
        match report {
            DeliveryReport::Delivered { partition, offset } => {
                self.delivered.fetch_add(1, Ordering::Relaxed);
                debug!(
                    source = %source,
                    topic,
                    partition,
                    offset,
                    "Delivered record"
                );
            }
            DeliveryReport::Failed { error } => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                error!(
                    source = %source,
                    topic,
                    error = %error,
                    "Failed to deliver message from {} to {}: {}",
                    source,
                    topic,
                    error
                );
            }
        }
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

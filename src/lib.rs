pub mod config;
pub mod envelope;
pub mod error;
pub mod replicator;
pub mod shutdown;
pub mod translator;

pub mod kafka;
pub mod registry;

#[cfg(test)]
mod test_utils;

pub use crate::config::Config;
pub use envelope::{Envelope, EnvelopeError};
pub use error::{Error, Result};
pub use replicator::{ReplicationStats, Replicator};
pub use shutdown::{ShutdownController, ShutdownSignal};
pub use translator::SchemaIdTranslator;

//! Error types and result handling for schema-replicator.
//!
//! This module defines the main error type [`Error`] and a convenience
//! [`Result`] type alias used throughout the crate.
//!
//! Errors fall into two groups. Failures raised while handling a single
//! record (a malformed envelope, an unknown schema id, a full producer
//! queue, an unreadable registry response) are recovered by the replication
//! loop: it logs them and moves on. Configuration errors stop it.
//!
//! # Example
//!
//! ```rust
//! use schema_replicator::{Error, Result};
//!
//! fn lookup(id: u32) -> Result<u32> {
//!     Err(Error::RegistryLookup {
//!         context: format!("schema id {}", id),
//!         message: "Schema not found".to_string(),
//!     })
//! }
//!
//! match lookup(7) {
//!     Ok(_) => println!("found"),
//!     Err(e) if e.is_per_message() => eprintln!("skipping record: {}", e),
//!     Err(e) => eprintln!("fatal: {}", e),
//! }
//! ```

use crate::envelope::EnvelopeError;
use thiserror::Error;

/// The main error type for schema-replicator operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error, from an unreadable or invalid configuration file.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The record value is not a valid schema registry envelope.
    #[error("Invalid envelope: {0}")]
    Format(#[from] EnvelopeError),

    /// The schema registry could not resolve or accept a schema.
    #[error("Schema registry error ({context}): {message}")]
    RegistryLookup {
        /// What was being looked up or registered
        context: String,
        /// Detail reported by the registry
        message: String,
    },

    /// Transport-level failure talking to a schema registry.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Kafka client, consumer or producer error.
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    /// JSON error when encoding or decoding registry payloads.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true for failures that concern a single record and must not
    /// stop replication.
    pub fn is_per_message(&self) -> bool {
        match self {
            Error::Format(_)
            | Error::RegistryLookup { .. }
            | Error::Http(_)
            | Error::Kafka(_)
            | Error::Serialization(_)
            | Error::Io(_) => true,
            Error::Config(_) => false,
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}

/// A convenient Result type alias for schema-replicator operations.
///
/// This is equivalent to `std::result::Result<T, schema_replicator::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

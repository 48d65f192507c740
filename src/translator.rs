//! Source to destination schema id translation.
//!
//! Schema ids are only meaningful inside the registry that issued them. The
//! translator resolves a source id to its schema document, registers that
//! document with the destination registry under a single subject and
//! remembers the resulting id. Mappings are never evicted: the number of
//! distinct schemas on a topic is small, and a restart rebuilds the cache
//! lazily because registration is idempotent per schema content.

use crate::registry::{CompatibilityLevel, SchemaRegistry};
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub struct SchemaIdTranslator {
    source: Arc<dyn SchemaRegistry>,
    destination: Arc<dyn SchemaRegistry>,
    subject: String,
    mappings: HashMap<u32, u32>,
}

impl SchemaIdTranslator {
    /// Creates the translator and disables compatibility checking on the
    /// destination subject.
    ///
    /// Source topics routinely carry schema versions that are incompatible
    /// with each other, and the destination registry must accept all of
    /// them. This happens once here, never per record.
    pub async fn new(
        source: Arc<dyn SchemaRegistry>,
        destination: Arc<dyn SchemaRegistry>,
        subject: impl Into<String>,
    ) -> Result<Self> {
        let subject = subject.into();

        destination
            .set_subject_compatibility(&subject, CompatibilityLevel::None)
            .await?;
        info!(subject = %subject, "Disabled compatibility checks on destination subject");

        Ok(Self {
            source,
            destination,
            subject,
            mappings: HashMap::new(),
        })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Returns the destination id for `source_id`, registering the schema
    /// with the destination registry on first sight.
    ///
    /// Failures are not cached; a later record with the same id retries.
    #[instrument(skip(self), fields(subject = %self.subject))]
    pub async fn translate(&mut self, source_id: u32) -> Result<u32> {
        if let Some(&destination_id) = self.mappings.get(&source_id) {
            return Ok(destination_id);
        }

        debug!("Schema id {} not cached, resolving", source_id);
        let schema = self.source.fetch_schema_by_id(source_id).await?;
        let destination_id = self
            .destination
            .register_schema(&self.subject, &schema)
            .await?;

        info!(
            source_id,
            destination_id,
            "Registered source schema id {} with destination schema registry as id {}",
            source_id,
            destination_id
        );
        self.mappings.insert(source_id, destination_id);

        Ok(destination_id)
    }

    pub fn cached(&self, source_id: u32) -> Option<u32> {
        self.mappings.get(&source_id).copied()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

//! Storage abstractions for media-relink.
//!
//! Two external systems are involved in a migration run:
//!
//! - the **content store** holding the dataset being migrated
//!   ([`DocumentStore`]), and
//! - the **media library** registry the legacy assets were linked to
//!   ([`MediaRegistry`]).
//!
//! Both are async traits (via `async-trait`) so the HTTP clients and the
//! [`memory::InMemoryStore`] test backend plug into the same pipeline.
//! Implementations must be `Send + Sync`.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::models::{Document, LegacyAsset};
use crate::path::FieldPath;

/// All `set` instructions for one document, committed as one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentPatch {
    pub document_id: String,
    pub set: Vec<(FieldPath, Value)>,
}

impl DocumentPatch {
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            set: Vec::new(),
        }
    }

    pub fn set(mut self, path: FieldPath, value: Value) -> Self {
        self.set.push((path, value));
        self
    }
}

/// The dataset being migrated.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`legacy_assets`](DocumentStore::legacy_assets) | List all records of the legacy asset kind |
/// | [`referencing_documents`](DocumentStore::referencing_documents) | Documents whose references contain any of the ids |
/// | [`commit`](DocumentStore::commit) | Apply one document's sets atomically |
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// List every record whose `_type` is `kind`.
    async fn legacy_assets(&self, kind: &str) -> Result<Vec<LegacyAsset>>;

    /// All documents (published and draft) referencing any of `ids`.
    ///
    /// Callers pass both the canonical and the `drafts.` prefixed id, see
    /// [`reference_targets`](crate::reference::reference_targets).
    async fn referencing_documents(&self, ids: &[String]) -> Result<Vec<Document>>;

    /// Apply every `set` of `patch` to one document in a single transaction.
    ///
    /// The previous values at the paths are not checked.
    async fn commit(&self, patch: &DocumentPatch) -> Result<()>;
}

/// The media library the legacy assets were linked to.
///
/// Lookups are scoped to one library. `Ok(None)` means the lookup succeeded
/// and found nothing; `Err` is a transport or query failure.
#[async_trait]
pub trait MediaRegistry: Send + Sync {
    /// Find the instance document with id `instance_id`, returning its id.
    async fn find_instance(&self, library_id: &str, instance_id: &str) -> Result<Option<String>>;

    /// Find the container whose `currentVersion` references `instance_id`,
    /// returning the container id.
    async fn find_container(&self, library_id: &str, instance_id: &str)
        -> Result<Option<String>>;
}

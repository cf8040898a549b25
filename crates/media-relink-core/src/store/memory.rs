//! In-memory [`DocumentStore`] and [`MediaRegistry`] for testing.
//!
//! Documents live in a `BTreeMap` behind `std::sync::RwLock`. Reference
//! queries scan every `_ref` in every document, matching the exact ids passed
//! (callers pass both canonical and draft ids). Media-library entries are
//! stored per library as instance documents plus containers whose
//! `currentVersion` points at an instance.
//!
//! Commits can be made to fail for chosen ids, and successful commits are
//! counted so tests can assert that a preview run sent no mutations.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::models::{decode_legacy_assets, Document, LegacyAsset};
use crate::path::value_at_mut;

use super::{DocumentPatch, DocumentStore, MediaRegistry};

/// In-memory store for tests and local dry runs.
pub struct InMemoryStore {
    documents: RwLock<BTreeMap<String, Value>>,
    libraries: RwLock<HashMap<String, Vec<Value>>>,
    failing: RwLock<HashSet<String>>,
    commits: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(BTreeMap::new()),
            libraries: RwLock::new(HashMap::new()),
            failing: RwLock::new(HashSet::new()),
            commits: AtomicUsize::new(0),
        }
    }

    /// Insert or replace a document, keyed by its `_id`.
    ///
    /// # Panics
    ///
    /// Panics if `body` has no string `_id`.
    pub fn insert_document(&self, body: Value) {
        let id = body
            .get("_id")
            .and_then(Value::as_str)
            .expect("document must have a string _id")
            .to_string();
        self.documents.write().unwrap().insert(id, body);
    }

    pub fn document(&self, id: &str) -> Option<Value> {
        self.documents.read().unwrap().get(id).cloned()
    }

    /// Register an instance in `library_id`, plus a container pointing at it
    /// when `container_id` is given.
    pub fn add_library_instance(&self, library_id: &str, instance_id: &str, container_id: Option<&str>) {
        let mut libraries = self.libraries.write().unwrap();
        let entries = libraries.entry(library_id.to_string()).or_default();
        entries.push(json!({"_id": instance_id, "_type": "sanity.videoAsset"}));
        if let Some(container_id) = container_id {
            entries.push(json!({
                "_id": container_id,
                "_type": "sanity.asset",
                "currentVersion": {"_type": "reference", "_ref": instance_id}
            }));
        }
    }

    /// Make every later commit for `document_id` fail.
    pub fn fail_commits_for(&self, document_id: &str) {
        self.failing.write().unwrap().insert(document_id.to_string());
    }

    /// Number of successful commits so far.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_refs<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::Object(map) => {
            if let Some(target) = map.get("_ref").and_then(Value::as_str) {
                out.push(target);
            }
            for child in map.values() {
                collect_refs(child, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_refs(item, out);
            }
        }
        _ => {}
    }
}

fn set_at_path(body: &mut Value, patch_path: &crate::path::FieldPath, value: Value) -> Result<()> {
    let field = patch_path
        .last_field()
        .ok_or_else(|| anyhow!("path '{}' does not end in a field", patch_path))?
        .to_string();
    let parent_path = patch_path.parent().unwrap_or_default();
    let parent = value_at_mut(body, &parent_path)
        .ok_or_else(|| anyhow!("no value at '{}'", parent_path))?;
    let map = parent
        .as_object_mut()
        .ok_or_else(|| anyhow!("value at '{}' is not an object", parent_path))?;
    map.insert(field, value);
    Ok(())
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn legacy_assets(&self, kind: &str) -> Result<Vec<LegacyAsset>> {
        let documents = self.documents.read().unwrap();
        let records: Vec<Value> = documents
            .values()
            .filter(|body| body.get("_type").and_then(Value::as_str) == Some(kind))
            .cloned()
            .collect();
        Ok(decode_legacy_assets(&records))
    }

    async fn referencing_documents(&self, ids: &[String]) -> Result<Vec<Document>> {
        let documents = self.documents.read().unwrap();
        let mut found = Vec::new();
        for (id, body) in documents.iter() {
            let mut refs = Vec::new();
            collect_refs(body, &mut refs);
            if refs.iter().any(|r| ids.iter().any(|wanted| wanted == r)) {
                found.push(Document::new(id.clone(), body.clone()));
            }
        }
        Ok(found)
    }

    async fn commit(&self, patch: &DocumentPatch) -> Result<()> {
        if self.failing.read().unwrap().contains(&patch.document_id) {
            bail!("transaction rejected for '{}'", patch.document_id);
        }
        let mut documents = self.documents.write().unwrap();
        let current = documents
            .get(&patch.document_id)
            .ok_or_else(|| anyhow!("document not found: {}", patch.document_id))?;

        // Apply to a copy so a bad path leaves the document untouched.
        let mut updated = current.clone();
        for (path, value) in &patch.set {
            set_at_path(&mut updated, path, value.clone())?;
        }
        documents.insert(patch.document_id.clone(), updated);
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl MediaRegistry for InMemoryStore {
    async fn find_instance(&self, library_id: &str, instance_id: &str) -> Result<Option<String>> {
        let libraries = self.libraries.read().unwrap();
        Ok(libraries.get(library_id).and_then(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry.get("_id").and_then(Value::as_str))
                .find(|id| *id == instance_id)
                .map(str::to_string)
        }))
    }

    async fn find_container(&self, library_id: &str, instance_id: &str) -> Result<Option<String>> {
        let libraries = self.libraries.read().unwrap();
        Ok(libraries.get(library_id).and_then(|entries| {
            entries
                .iter()
                .find(|entry| entry["currentVersion"]["_ref"].as_str() == Some(instance_id))
                .and_then(|entry| entry.get("_id").and_then(Value::as_str))
                .map(str::to_string)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::FieldPath;
    use crate::reference::reference_targets;

    #[tokio::test]
    async fn legacy_assets_filters_by_type() {
        let store = InMemoryStore::new();
        store.insert_document(json!({"_id": "videoA", "_type": "mux.videoAsset", "filename": "a.mp4"}));
        store.insert_document(json!({"_id": "post", "_type": "post"}));
        let assets = store.legacy_assets("mux.videoAsset").await.unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].filename.as_deref(), Some("a.mp4"));
    }

    #[tokio::test]
    async fn referencing_documents_matches_draft_ids() {
        let store = InMemoryStore::new();
        store.insert_document(json!({"_id": "p1", "v": {"asset": {"_type": "reference", "_ref": "videoA"}}}));
        store.insert_document(json!({"_id": "drafts.p2", "v": {"asset": {"_type": "reference", "_ref": "drafts.videoA"}}}));
        store.insert_document(json!({"_id": "p3", "v": {"asset": {"_type": "reference", "_ref": "videoB"}}}));

        let canonical_only = store
            .referencing_documents(&["videoA".to_string()])
            .await
            .unwrap();
        assert_eq!(canonical_only.len(), 1);

        let both = store
            .referencing_documents(&reference_targets("videoA"))
            .await
            .unwrap();
        let ids: Vec<&str> = both.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["drafts.p2", "p1"]);
    }

    #[tokio::test]
    async fn commit_creates_missing_sibling_field() {
        let store = InMemoryStore::new();
        store.insert_document(json!({"_id": "p", "video": {"asset": 1}}));
        let patch = DocumentPatch::new("p")
            .set(FieldPath::root().field("video").field("asset"), json!(2))
            .set(FieldPath::root().field("video").field("media"), json!(3));
        store.commit(&patch).await.unwrap();
        assert_eq!(store.document("p").unwrap()["video"], json!({"asset": 2, "media": 3}));
        assert_eq!(store.commit_count(), 1);
    }

    #[tokio::test]
    async fn commit_is_all_or_nothing() {
        let store = InMemoryStore::new();
        store.insert_document(json!({"_id": "p", "video": {"asset": 1}}));
        let patch = DocumentPatch::new("p")
            .set(FieldPath::root().field("video").field("asset"), json!(2))
            .set(FieldPath::root().field("missing").field("media"), json!(3));
        assert!(store.commit(&patch).await.is_err());
        assert_eq!(store.document("p").unwrap()["video"]["asset"], json!(1));
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn commit_unknown_document_fails() {
        let store = InMemoryStore::new();
        let err = store.commit(&DocumentPatch::new("ghost")).await.unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[tokio::test]
    async fn registry_lookups_are_scoped_by_library() {
        let store = InMemoryStore::new();
        store.add_library_instance("lib1", "inst1", Some("cont1"));
        assert_eq!(
            store.find_instance("lib1", "inst1").await.unwrap().as_deref(),
            Some("inst1")
        );
        assert_eq!(store.find_instance("lib2", "inst1").await.unwrap(), None);
        assert_eq!(
            store.find_container("lib1", "inst1").await.unwrap().as_deref(),
            Some("cont1")
        );
        assert_eq!(store.find_container("lib1", "other").await.unwrap(), None);
    }
}

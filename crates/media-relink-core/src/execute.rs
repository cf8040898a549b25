//! Patch executor.
//!
//! Groups planned operations by document and either describes them
//! ([`ExecutionMode::Preview`]) or commits one transaction per document
//! ([`ExecutionMode::Apply`]).
//!
//! In apply mode a failed commit is logged with the document id, recorded in
//! [`ExecutionReport::failed`], and the remaining documents are still
//! processed. There is no retry; a failed document is picked up again by the
//! next run.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, error, info};

use crate::plan::{OperationKind, PatchOperation};
use crate::store::{DocumentPatch, DocumentStore};

/// Whether the executor may write to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Preview,
    Apply,
}

/// All operations targeting one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentChanges {
    pub document_id: String,
    pub operations: Vec<PatchOperation>,
}

impl DocumentChanges {
    /// The single multi-field transaction for this document.
    pub fn to_patch(&self) -> DocumentPatch {
        DocumentPatch {
            document_id: self.document_id.clone(),
            set: self
                .operations
                .iter()
                .map(|op| (op.path.clone(), op.replacement.to_value()))
                .collect(),
        }
    }

    pub fn count(&self, kind: OperationKind) -> usize {
        self.operations.iter().filter(|op| op.kind == kind).count()
    }
}

/// A document whose transaction was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDocument {
    pub document_id: String,
    pub error: String,
}

/// What the executor did, or would do in preview mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionReport {
    pub mode: ExecutionMode,
    pub documents: Vec<DocumentChanges>,
    /// Ids committed successfully. Always empty in preview mode.
    pub applied: Vec<String>,
    pub failed: Vec<FailedDocument>,
}

impl ExecutionReport {
    pub fn operation_count(&self) -> usize {
        self.documents.iter().map(|d| d.operations.len()).sum()
    }
}

/// Group operations by target document, keeping first-appearance order of
/// documents and the original order of operations within each.
pub fn group_by_document(ops: Vec<PatchOperation>) -> Vec<DocumentChanges> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<DocumentChanges> = Vec::new();

    for op in ops {
        match index.get(&op.document_id) {
            Some(&i) => groups[i].operations.push(op),
            None => {
                index.insert(op.document_id.clone(), groups.len());
                groups.push(DocumentChanges {
                    document_id: op.document_id.clone(),
                    operations: vec![op],
                });
            }
        }
    }
    groups
}

/// Preview or apply `ops` against `store`.
pub async fn execute(
    store: &dyn DocumentStore,
    ops: Vec<PatchOperation>,
    mode: ExecutionMode,
) -> ExecutionReport {
    execute_with_progress(store, ops, mode, |_, _| {}).await
}

/// Like [`execute`], calling `on_document(n, total)` after each document is
/// committed (apply mode only).
pub async fn execute_with_progress<F>(
    store: &dyn DocumentStore,
    ops: Vec<PatchOperation>,
    mode: ExecutionMode,
    mut on_document: F,
) -> ExecutionReport
where
    F: FnMut(usize, usize) + Send,
{
    let documents = group_by_document(ops);
    let mut report = ExecutionReport {
        mode,
        documents: Vec::new(),
        applied: Vec::new(),
        failed: Vec::new(),
    };

    if mode == ExecutionMode::Preview {
        debug!(documents = documents.len(), "preview only, no mutations sent");
        report.documents = documents;
        return report;
    }

    let total = documents.len();
    for (n, changes) in documents.iter().enumerate() {
        let patch = changes.to_patch();
        match store.commit(&patch).await {
            Ok(()) => {
                info!(
                    document_id = %changes.document_id,
                    fields = patch.set.len(),
                    "patched document"
                );
                report.applied.push(changes.document_id.clone());
            }
            Err(e) => {
                let message = format!("{:#}", e);
                error!(
                    document_id = %changes.document_id,
                    error = %message,
                    "failed to patch document"
                );
                report.failed.push(FailedDocument {
                    document_id: changes.document_id.clone(),
                    error: message,
                });
            }
        }
        on_document(n + 1, total);
    }

    report.documents = documents;
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Document;
    use crate::plan::plan_document;
    use crate::resolve::ResolvedMedia;
    use crate::store::memory::InMemoryStore;
    use serde_json::json;

    fn resolved() -> ResolvedMedia {
        ResolvedMedia {
            library_id: "lib1".into(),
            instance_id: "inst1".into(),
            container_id: "cont1".into(),
        }
    }

    fn doc(id: &str) -> serde_json::Value {
        json!({
            "_id": id,
            "_type": "post",
            "video": {"_type": "mux.video", "asset": {"_type": "reference", "_ref": "videoA"}}
        })
    }

    fn planned(store: &InMemoryStore, ids: &[&str]) -> Vec<PatchOperation> {
        ids.iter()
            .flat_map(|id| {
                let body = store.document(id).unwrap();
                plan_document(&Document::new(*id, body), "videoA", &resolved())
            })
            .collect()
    }

    #[test]
    fn groups_preserve_first_seen_order() {
        let store = InMemoryStore::new();
        store.insert_document(doc("b"));
        store.insert_document(doc("a"));
        let mut ops = planned(&store, &["b", "a"]);
        // interleave: b.asset, a.asset, b.media, a.media
        ops.swap(1, 2);
        let groups = group_by_document(ops);
        let ids: Vec<&str> = groups.iter().map(|g| g.document_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(groups[0].count(OperationKind::Asset), 1);
        assert_eq!(groups[0].count(OperationKind::Media), 1);
    }

    #[test]
    fn patch_contains_every_operation() {
        let store = InMemoryStore::new();
        store.insert_document(doc("postX"));
        let groups = group_by_document(planned(&store, &["postX"]));
        let patch = groups[0].to_patch();
        assert_eq!(patch.document_id, "postX");
        let paths: Vec<String> = patch.set.iter().map(|(p, _)| p.to_string()).collect();
        assert_eq!(paths, vec!["video.asset", "video.media"]);
    }

    #[tokio::test]
    async fn preview_does_not_touch_store() {
        let store = InMemoryStore::new();
        store.insert_document(doc("postX"));
        let ops = planned(&store, &["postX"]);
        let report = execute(&store, ops, ExecutionMode::Preview).await;
        assert_eq!(store.commit_count(), 0);
        assert_eq!(report.documents.len(), 1);
        assert_eq!(report.operation_count(), 2);
        assert!(report.applied.is_empty());
        assert_eq!(store.document("postX").unwrap(), doc("postX"));
    }

    #[tokio::test]
    async fn apply_writes_global_references() {
        let store = InMemoryStore::new();
        store.insert_document(doc("postX"));
        let ops = planned(&store, &["postX"]);
        let report = execute(&store, ops, ExecutionMode::Apply).await;
        assert_eq!(report.applied, vec!["postX"]);
        assert_eq!(store.commit_count(), 1);
        let body = store.document("postX").unwrap();
        assert_eq!(body["video"]["asset"]["_ref"], json!("media-library:lib1:inst1"));
        assert_eq!(body["video"]["media"]["_ref"], json!("media-library:lib1:cont1"));
        assert_eq!(body["video"]["media"]["_weak"], json!(true));
    }

    #[tokio::test]
    async fn failure_on_one_document_does_not_stop_others() {
        let store = InMemoryStore::new();
        for id in ["a", "b", "c"] {
            store.insert_document(doc(id));
        }
        store.fail_commits_for("b");
        let ops = planned(&store, &["a", "b", "c"]);

        let mut seen = Vec::new();
        let report =
            execute_with_progress(&store, ops, ExecutionMode::Apply, |n, total| seen.push((n, total)))
                .await;

        assert_eq!(report.applied, vec!["a", "c"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].document_id, "b");
        assert_eq!(seen, vec![(1, 3), (2, 3), (3, 3)]);
        assert_eq!(store.document("b").unwrap(), doc("b"));
    }

    #[tokio::test]
    async fn empty_plan_is_a_no_op() {
        let store = InMemoryStore::new();
        let report = execute(&store, Vec::new(), ExecutionMode::Apply).await;
        assert!(report.documents.is_empty());
        assert_eq!(store.commit_count(), 0);
    }
}

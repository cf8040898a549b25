//! Patch planner.
//!
//! Turns the reference paths found in one document into replacement
//! operations. Every located `asset` path produces exactly two operations:
//!
//! 1. `…asset` → weak global reference to `media-library:<lib>:<instance>`
//! 2. `…media` → weak global reference to `media-library:<lib>:<container>`
//!
//! The pair is never split. A document with no located path produces no
//! operations, which is how an already-migrated document shows up on a
//! re-run.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::locate::reference_paths;
use crate::models::Document;
use crate::path::{value_at, FieldPath};
use crate::reference::Reference;
use crate::resolve::ResolvedMedia;

/// Field holding the legacy reference.
pub const ASSET_FIELD: &str = "asset";

/// Sibling field receiving the container reference.
pub const MEDIA_FIELD: &str = "media";

/// Which half of a replacement pair an operation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Asset,
    Media,
}

/// A single field replacement in one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchOperation {
    pub document_id: String,
    pub path: FieldPath,
    pub kind: OperationKind,
    /// Value at `path` when the operation was planned. Informational only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<Value>,
    pub replacement: Reference,
}

/// Field names the planner looks for and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Planner {
    pub field: String,
    pub sibling_field: String,
}

impl Default for Planner {
    fn default() -> Self {
        Self {
            field: ASSET_FIELD.to_string(),
            sibling_field: MEDIA_FIELD.to_string(),
        }
    }
}

impl Planner {
    pub fn new(field: impl Into<String>, sibling_field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            sibling_field: sibling_field.into(),
        }
    }

    /// Plan the replacements for every reference to `legacy_asset_id` in
    /// `document`.
    pub fn plan(
        &self,
        document: &Document,
        legacy_asset_id: &str,
        resolved: &ResolvedMedia,
    ) -> Vec<PatchOperation> {
        let asset_reference = resolved.asset_reference();
        let media_reference = resolved.media_reference();

        let mut ops = Vec::new();
        for path in reference_paths(&document.body, &self.field, Some(legacy_asset_id)) {
            let sibling = match path.sibling(&self.sibling_field) {
                Some(sibling) => sibling,
                None => continue,
            };
            ops.push(PatchOperation {
                document_id: document.id.clone(),
                previous: value_at(&document.body, &path).cloned(),
                path,
                kind: OperationKind::Asset,
                replacement: asset_reference.clone(),
            });
            ops.push(PatchOperation {
                document_id: document.id.clone(),
                previous: value_at(&document.body, &sibling).cloned(),
                path: sibling,
                kind: OperationKind::Media,
                replacement: media_reference.clone(),
            });
        }
        ops
    }
}

/// Plan with the default `asset` / `media` field names.
pub fn plan_document(
    document: &Document,
    legacy_asset_id: &str,
    resolved: &ResolvedMedia,
) -> Vec<PatchOperation> {
    Planner::default().plan(document, legacy_asset_id, resolved)
}

/// A violation of the asset/media pairing rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PairingError {
    #[error("{kind:?} operation at '{path}' in '{document_id}' has no sibling")]
    Unpaired {
        document_id: String,
        path: String,
        kind: OperationKind,
    },
    #[error("duplicate {kind:?} operation at '{path}' in '{document_id}'")]
    Duplicate {
        document_id: String,
        path: String,
        kind: OperationKind,
    },
}

/// Check that every `asset` operation has exactly one `media` operation under
/// the same parent in the same document, and vice versa.
pub fn check_pairing(ops: &[PatchOperation]) -> Result<(), PairingError> {
    type Slot<'a> = (&'a str, Option<FieldPath>);
    let mut seen: HashMap<OperationKind, HashSet<Slot<'_>>> = HashMap::new();

    for op in ops {
        let slot = (op.document_id.as_str(), op.path.parent());
        if !seen.entry(op.kind).or_default().insert(slot) {
            return Err(PairingError::Duplicate {
                document_id: op.document_id.clone(),
                path: op.path.to_string(),
                kind: op.kind,
            });
        }
    }

    let empty = HashSet::new();
    let assets = seen.get(&OperationKind::Asset).unwrap_or(&empty);
    let media = seen.get(&OperationKind::Media).unwrap_or(&empty);

    for op in ops {
        let slot = (op.document_id.as_str(), op.path.parent());
        let other = match op.kind {
            OperationKind::Asset => media,
            OperationKind::Media => assets,
        };
        if !other.contains(&slot) {
            return Err(PairingError::Unpaired {
                document_id: op.document_id.clone(),
                path: op.path.to_string(),
                kind: op.kind,
            });
        }
    }
    Ok(())
}

//! Documents and records read from the content store.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::reference::is_draft_id;

/// A document fetched from the store: its id plus the full JSON tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub body: Value,
}

impl Document {
    pub fn new(id: impl Into<String>, body: Value) -> Self {
        Self {
            id: id.into(),
            body,
        }
    }

    /// Build a document from a raw store result, reading `_id` from the tree.
    ///
    /// Returns `None` for values without a string `_id`, which the store
    /// never produces for real documents.
    pub fn from_value(body: Value) -> Option<Self> {
        let id = body.get("_id")?.as_str()?.to_string();
        Some(Self { id, body })
    }

    pub fn is_draft(&self) -> bool {
        is_draft_id(&self.id)
    }
}

/// A legacy video asset record: a locally uploaded file, optionally already
/// linked to a media-library entry through `media`.
///
/// `media` is kept as the raw stored value. Whether it is a usable reference
/// is decided by the resolver, so one odd record never fails a whole listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegacyAsset {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "uploadId", default, skip_serializing_if = "Option::is_none")]
    pub upload_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<Value>,
}

impl LegacyAsset {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            upload_id: None,
            filename: None,
            size: None,
            media: None,
        }
    }

    /// Read one store record. Fields of the wrong type are treated as absent
    /// and a `null` `media` as missing; only a record without a string `_id`
    /// is rejected.
    pub fn from_value(record: &Value) -> Option<Self> {
        let text = |name: &str| record.get(name).and_then(Value::as_str).map(str::to_string);
        Some(Self {
            id: record.get("_id")?.as_str()?.to_string(),
            upload_id: text("uploadId"),
            filename: text("filename"),
            size: record.get("size").and_then(Value::as_u64),
            media: record.get("media").filter(|m| !m.is_null()).cloned(),
        })
    }

    /// Short label for log lines: the filename when known, else the id.
    pub fn label(&self) -> &str {
        self.filename.as_deref().unwrap_or(&self.id)
    }
}

/// Decode a listing of legacy asset records, dropping (and logging) records
/// that have no string `_id`.
pub fn decode_legacy_assets(records: &[Value]) -> Vec<LegacyAsset> {
    records
        .iter()
        .filter_map(|record| {
            let asset = LegacyAsset::from_value(record);
            if asset.is_none() {
                warn!(%record, "ignoring legacy asset record without a string _id");
            }
            asset
        })
        .collect()
}

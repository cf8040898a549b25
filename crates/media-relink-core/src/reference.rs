//! Reference values and identifier tokens.
//!
//! Local references point at a document in the same dataset:
//!
//! ```json
//! { "_type": "reference", "_ref": "videoA" }
//! ```
//!
//! Global references point into another store and carry a three-part token:
//!
//! ```json
//! { "_type": "globalDocumentReference", "_ref": "media-library:lib1:inst1", "_weak": true }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// `_type` tag of a local reference.
pub const LOCAL_REFERENCE_TYPE: &str = "reference";

/// `_type` tag of a cross-store reference.
pub const GLOBAL_REFERENCE_TYPE: &str = "globalDocumentReference";

/// First segment of a media-library token.
pub const MEDIA_LIBRARY_KIND: &str = "media-library";

/// Prefix carried by the draft variant of a document id.
pub const DRAFTS_PREFIX: &str = "drafts.";

/// Strip the draft marker from a document id, if present.
pub fn canonical_id(id: &str) -> &str {
    id.strip_prefix(DRAFTS_PREFIX).unwrap_or(id)
}

pub fn is_draft_id(id: &str) -> bool {
    id.starts_with(DRAFTS_PREFIX)
}

/// Draft variant of a canonical id.
pub fn draft_id(id: &str) -> String {
    format!("{}{}", DRAFTS_PREFIX, canonical_id(id))
}

/// Both ids a referencing document may use for `id`: canonical and draft.
pub fn reference_targets(id: &str) -> Vec<String> {
    let canonical = canonical_id(id);
    vec![canonical.to_string(), draft_id(canonical)]
}

/// A reference value as stored in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "_type")]
    pub kind: String,
    #[serde(rename = "_ref")]
    pub target: String,
    #[serde(rename = "_weak", default, skip_serializing_if = "Option::is_none")]
    pub weak: Option<bool>,
}

impl Reference {
    pub fn local(target: impl Into<String>) -> Self {
        Self {
            kind: LOCAL_REFERENCE_TYPE.to_string(),
            target: target.into(),
            weak: None,
        }
    }

    /// A weak global reference to an entry of a media library.
    pub fn media_library(library_id: &str, document_id: &str) -> Self {
        Self {
            kind: GLOBAL_REFERENCE_TYPE.to_string(),
            target: MediaLibraryRef::new(library_id, document_id).to_string(),
            weak: Some(true),
        }
    }

    pub fn is_weak(&self) -> bool {
        self.weak.unwrap_or(false)
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!(self)
    }
}

/// Returns the target of `value` when it is a local reference.
pub fn local_reference_target(value: &Value) -> Option<&str> {
    let obj = value.as_object()?;
    if obj.get("_type").and_then(Value::as_str) != Some(LOCAL_REFERENCE_TYPE) {
        return None;
    }
    obj.get("_ref").and_then(Value::as_str)
}

/// Why a media token failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("expected 3 ':'-separated parts, found {0}")]
    PartCount(usize),
    #[error("expected store kind 'media-library', found '{0}'")]
    StoreKind(String),
    #[error("empty identifier in token")]
    EmptyPart,
    #[error("'_ref' is missing or not a string")]
    NotAString,
}

/// A parsed `media-library:<library>:<document>` token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaLibraryRef {
    pub library_id: String,
    pub document_id: String,
}

impl MediaLibraryRef {
    pub fn new(library_id: &str, document_id: &str) -> Self {
        Self {
            library_id: library_id.to_string(),
            document_id: document_id.to_string(),
        }
    }

    pub fn parse(token: &str) -> Result<Self, TokenError> {
        let parts: Vec<&str> = token.split(':').collect();
        if parts.len() != 3 {
            return Err(TokenError::PartCount(parts.len()));
        }
        if parts[0] != MEDIA_LIBRARY_KIND {
            return Err(TokenError::StoreKind(parts[0].to_string()));
        }
        if parts[1].is_empty() || parts[2].is_empty() {
            return Err(TokenError::EmptyPart);
        }
        Ok(Self::new(parts[1], parts[2]))
    }
}

impl fmt::Display for MediaLibraryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", MEDIA_LIBRARY_KIND, self.library_id, self.document_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_and_draft_ids() {
        assert_eq!(canonical_id("drafts.abc"), "abc");
        assert_eq!(canonical_id("abc"), "abc");
        assert_eq!(draft_id("abc"), "drafts.abc");
        assert_eq!(draft_id("drafts.abc"), "drafts.abc");
        assert!(is_draft_id("drafts.abc"));
        assert!(!is_draft_id("abc"));
        assert_eq!(reference_targets("drafts.abc"), vec!["abc", "drafts.abc"]);
    }

    #[test]
    fn parse_valid_token() {
        let r = MediaLibraryRef::parse("media-library:lib1:inst1").unwrap();
        assert_eq!(r.library_id, "lib1");
        assert_eq!(r.document_id, "inst1");
        assert_eq!(r.to_string(), "media-library:lib1:inst1");
    }

    #[test]
    fn parse_rejects_two_parts() {
        assert_eq!(
            MediaLibraryRef::parse("media-library:x"),
            Err(TokenError::PartCount(2))
        );
    }

    #[test]
    fn parse_rejects_wrong_kind() {
        assert_eq!(
            MediaLibraryRef::parse("other-kind:x:y"),
            Err(TokenError::StoreKind("other-kind".into()))
        );
    }

    #[test]
    fn parse_rejects_empty_parts() {
        assert_eq!(
            MediaLibraryRef::parse("media-library::y"),
            Err(TokenError::EmptyPart)
        );
    }

    #[test]
    fn media_library_reference_serializes_weak_global() {
        let value = Reference::media_library("lib1", "inst1").to_value();
        assert_eq!(
            value,
            json!({
                "_type": "globalDocumentReference",
                "_ref": "media-library:lib1:inst1",
                "_weak": true
            })
        );
    }

    #[test]
    fn local_reference_omits_weak_flag() {
        let value = Reference::local("videoA").to_value();
        assert_eq!(value, json!({"_type": "reference", "_ref": "videoA"}));
    }

    #[test]
    fn local_target_requires_reference_tag() {
        assert_eq!(
            local_reference_target(&json!({"_type": "reference", "_ref": "a"})),
            Some("a")
        );
        assert_eq!(
            local_reference_target(&json!({"_type": "globalDocumentReference", "_ref": "a"})),
            None
        );
        assert_eq!(local_reference_target(&json!("reference")), None);
    }
}

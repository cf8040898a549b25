//! Reference locator.
//!
//! Walks a document tree depth-first and yields the [`FieldPath`] of every
//! field with a given name (normally `asset`) whose value is a local
//! reference, optionally restricted to references pointing at one target.
//!
//! Sequence elements carrying a string `_key` are addressed by identity
//! rather than by position, so a located path stays valid if siblings are
//! reordered between the query and the patch.
//!
//! The walk is lazy: [`reference_paths`] returns an iterator backed by an
//! explicit stack, and nothing is visited until the caller pulls. Output order
//! is unspecified.
//!
//! ```rust
//! use media_relink_core::locate::reference_paths;
//! use serde_json::json;
//!
//! let doc = json!({"video": {"asset": {"_type": "reference", "_ref": "videoA"}}});
//! let paths: Vec<String> = reference_paths(&doc, "asset", Some("videoA"))
//!     .map(|p| p.to_string())
//!     .collect();
//! assert_eq!(paths, vec!["video.asset"]);
//! ```

use serde_json::Value;

use crate::path::{item_key, FieldPath, PathSegment};
use crate::reference::{canonical_id, local_reference_target};

/// Lazy iterator over located reference paths. See [`reference_paths`].
pub struct ReferencePaths<'a> {
    field: &'a str,
    target: Option<&'a str>,
    stack: Vec<(FieldPath, &'a Value)>,
}

/// Locate `field`-named local references in `document`.
///
/// With `target`, only references whose `_ref` equals it after stripping the
/// draft prefix are yielded. An empty document, or one without a matching
/// field, yields nothing.
pub fn reference_paths<'a>(
    document: &'a Value,
    field: &'a str,
    target: Option<&'a str>,
) -> ReferencePaths<'a> {
    ReferencePaths {
        field,
        target: target.map(canonical_id),
        stack: vec![(FieldPath::root(), document)],
    }
}

impl ReferencePaths<'_> {
    fn matches(&self, found: &str) -> bool {
        match self.target {
            Some(target) => canonical_id(found) == target,
            None => true,
        }
    }
}

impl Iterator for ReferencePaths<'_> {
    type Item = FieldPath;

    fn next(&mut self) -> Option<FieldPath> {
        while let Some((path, value)) = self.stack.pop() {
            if path.last_field() == Some(self.field) {
                if let Some(found) = local_reference_target(value) {
                    if self.matches(found) {
                        return Some(path);
                    }
                    // A reference has no children worth visiting.
                    continue;
                }
            }

            match value {
                Value::Object(map) => {
                    for (name, child) in map {
                        if child.is_object() || child.is_array() {
                            self.stack.push((path.field(name.as_str()), child));
                        }
                    }
                }
                Value::Array(items) => {
                    for (index, item) in items.iter().enumerate() {
                        if !(item.is_object() || item.is_array()) {
                            continue;
                        }
                        let segment = match item_key(item) {
                            Some(key) => PathSegment::Key(key.to_string()),
                            None => PathSegment::Index(index),
                        };
                        self.stack.push((path.child(segment), item));
                    }
                }
                _ => {}
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::value_at;
    use serde_json::json;
    use std::collections::HashSet;

    fn located(doc: &Value, target: Option<&str>) -> HashSet<String> {
        reference_paths(doc, "asset", target)
            .map(|p| p.to_string())
            .collect()
    }

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn finds_top_level_field() {
        let doc = json!({
            "_id": "postX",
            "video": {"_type": "mux.video", "asset": {"_type": "reference", "_ref": "videoA"}}
        });
        assert_eq!(located(&doc, Some("videoA")), set(&["video.asset"]));
    }

    #[test]
    fn empty_document_yields_nothing() {
        assert!(located(&json!({}), None).is_empty());
        assert!(located(&json!(null), Some("x")).is_empty());
        assert!(located(&json!([]), None).is_empty());
    }

    #[test]
    fn no_matching_field_yields_nothing() {
        let doc = json!({"title": "hi", "image": {"ref": {"_type": "reference", "_ref": "videoA"}}});
        assert!(located(&doc, Some("videoA")).is_empty());
    }

    #[test]
    fn filter_selects_only_target() {
        let doc = json!({
            "hero": {"asset": {"_type": "reference", "_ref": "T"}},
            "footer": {"asset": {"_type": "reference", "_ref": "T2"}}
        });
        assert_eq!(located(&doc, Some("T")), set(&["hero.asset"]));
        assert_eq!(located(&doc, None), set(&["hero.asset", "footer.asset"]));
    }

    #[test]
    fn draft_prefix_is_ignored_when_matching() {
        let doc = json!({"video": {"asset": {"_type": "reference", "_ref": "drafts.videoA"}}});
        assert_eq!(located(&doc, Some("videoA")), set(&["video.asset"]));
        assert_eq!(located(&doc, Some("drafts.videoA")), set(&["video.asset"]));
    }

    #[test]
    fn keyed_items_use_identity_segments() {
        let doc = json!({
            "body": [
                {"_key": "k1", "_type": "block", "children": []},
                {"_key": "k2", "_type": "mux.video", "asset": {"_type": "reference", "_ref": "videoA"}},
                [{"asset": {"_type": "reference", "_ref": "videoA"}}]
            ]
        });
        assert_eq!(
            located(&doc, Some("videoA")),
            set(&[r#"body[_key=="k2"].asset"#, "body[2][0].asset"])
        );
    }

    #[test]
    fn unkeyed_items_use_positions() {
        let doc = json!({
            "gallery": [
                {"asset": {"_type": "reference", "_ref": "videoA"}},
                {"asset": {"_type": "reference", "_ref": "videoB"}}
            ]
        });
        assert_eq!(located(&doc, Some("videoB")), set(&["gallery[1].asset"]));
    }

    #[test]
    fn global_references_are_not_matched() {
        let doc = json!({
            "video": {
                "asset": {"_type": "globalDocumentReference", "_ref": "media-library:lib1:inst1", "_weak": true},
                "media": {"_type": "globalDocumentReference", "_ref": "media-library:lib1:cont1", "_weak": true}
            }
        });
        assert!(located(&doc, None).is_empty());
    }

    #[test]
    fn only_named_field_counts() {
        let doc = json!({"video": {"poster": {"_type": "reference", "_ref": "videoA"}}});
        assert!(located(&doc, Some("videoA")).is_empty());
        let paths: Vec<_> = reference_paths(&doc, "poster", Some("videoA")).collect();
        assert_eq!(paths.len(), 1);
    }

    #[test]
    fn located_paths_resolve_back_to_references() {
        let doc = json!({
            "sections": [
                {"_key": "a", "clips": [{"_key": "c", "asset": {"_type": "reference", "_ref": "videoA"}}]}
            ]
        });
        for path in reference_paths(&doc, "asset", Some("videoA")) {
            let value = value_at(&doc, &path).unwrap();
            assert_eq!(value["_ref"], json!("videoA"));
        }
    }

    #[test]
    fn iterator_is_lazy() {
        let doc = json!({
            "a": {"asset": {"_type": "reference", "_ref": "x"}},
            "b": {"asset": {"_type": "reference", "_ref": "x"}}
        });
        let mut iter = reference_paths(&doc, "asset", None);
        assert!(iter.next().is_some());
        assert!(iter.next().is_some());
        assert!(iter.next().is_none());
    }
}

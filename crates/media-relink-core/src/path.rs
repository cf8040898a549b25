//! Typed structural paths into a document tree.
//!
//! A [`FieldPath`] is an ordered list of [`PathSegment`]s. Paths are built and
//! compared as data; they are rendered to the store's path syntax only when a
//! patch is sent over the wire:
//!
//! | Segment | Rendered |
//! |---------|----------|
//! | `Field("video")` | `video` (or `.video` after another segment) |
//! | `Index(2)` | `[2]` |
//! | `Key("a1b2")` | `[_key=="a1b2"]` |
//!
//! so `video.asset`, `items[0].asset` and `items[_key=="a1b2"].asset` are all
//! representable without string concatenation at call sites.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

/// One step into a document tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    /// A named field of a mapping.
    Field(String),
    /// A positional element of an ordered sequence.
    Index(usize),
    /// A sequence element addressed by its `_key` identity.
    Key(String),
}

/// A structural path from a document root to a value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// The empty path, addressing the document root.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Returns a new path with `segment` appended.
    pub fn child(&self, segment: PathSegment) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend_from_slice(&self.segments);
        segments.push(segment);
        Self { segments }
    }

    pub fn field(&self, name: impl Into<String>) -> Self {
        self.child(PathSegment::Field(name.into()))
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Name of the last segment when it is a field segment.
    pub fn last_field(&self) -> Option<&str> {
        match self.segments.last() {
            Some(PathSegment::Field(name)) => Some(name),
            _ => None,
        }
    }

    /// Replace the trailing field segment with `name`.
    ///
    /// Returns `None` when the path does not end in a field segment, since a
    /// sibling of a sequence element has no field name to swap.
    pub fn sibling(&self, name: &str) -> Option<Self> {
        self.last_field()?;
        let parent = self.parent()?;
        Some(parent.field(name))
    }
}

/// Paths serialize as their rendered string form.
impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<Vec<PathSegment>> for FieldPath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self::from_segments(segments)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Field(name) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(name)?;
                }
                PathSegment::Index(index) => write!(f, "[{}]", index)?,
                PathSegment::Key(key) => write!(f, "[_key=={}]", quote(key))?,
            }
        }
        Ok(())
    }
}

fn quote(key: &str) -> String {
    let escaped = key.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

/// Resolve `path` against `root`, returning the addressed value if present.
pub fn value_at<'a>(root: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.segments() {
        current = step(current, segment)?;
    }
    Some(current)
}

/// Mutable counterpart of [`value_at`].
pub fn value_at_mut<'a>(root: &'a mut Value, path: &FieldPath) -> Option<&'a mut Value> {
    let mut current = root;
    for segment in path.segments() {
        current = step_mut(current, segment)?;
    }
    Some(current)
}

fn step<'a>(value: &'a Value, segment: &PathSegment) -> Option<&'a Value> {
    match (segment, value) {
        (PathSegment::Field(name), Value::Object(map)) => map.get(name),
        (PathSegment::Index(index), Value::Array(items)) => items.get(*index),
        (PathSegment::Key(key), Value::Array(items)) => {
            items.iter().find(|item| item_key(item) == Some(key.as_str()))
        }
        _ => None,
    }
}

fn step_mut<'a>(value: &'a mut Value, segment: &PathSegment) -> Option<&'a mut Value> {
    match (segment, value) {
        (PathSegment::Field(name), Value::Object(map)) => map.get_mut(name),
        (PathSegment::Index(index), Value::Array(items)) => items.get_mut(*index),
        (PathSegment::Key(key), Value::Array(items)) => {
            items.iter_mut().find(|item| item_key(item) == Some(key.as_str()))
        }
        _ => None,
    }
}

/// The `_key` identity of a sequence element, if it has one.
pub fn item_key(value: &Value) -> Option<&str> {
    value.get("_key").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(segments: Vec<PathSegment>) -> FieldPath {
        FieldPath::from_segments(segments)
    }

    #[test]
    fn renders_field_chain() {
        let p = FieldPath::root().field("video").field("asset");
        assert_eq!(p.to_string(), "video.asset");
    }

    #[test]
    fn renders_index_and_key_segments() {
        let p = path(vec![
            PathSegment::Field("body".into()),
            PathSegment::Index(3),
            PathSegment::Field("items".into()),
            PathSegment::Key("a1".into()),
            PathSegment::Field("asset".into()),
        ]);
        assert_eq!(p.to_string(), r#"body[3].items[_key=="a1"].asset"#);
    }

    #[test]
    fn key_segment_is_escaped() {
        let p = path(vec![
            PathSegment::Field("items".into()),
            PathSegment::Key(r#"we"ird"#.into()),
        ]);
        assert_eq!(p.to_string(), r#"items[_key=="we\"ird"]"#);
    }

    #[test]
    fn root_renders_empty() {
        assert_eq!(FieldPath::root().to_string(), "");
        assert!(FieldPath::root().parent().is_none());
    }

    #[test]
    fn sibling_swaps_last_field() {
        let p = FieldPath::root().field("video").field("asset");
        let s = p.sibling("media").unwrap();
        assert_eq!(s.to_string(), "video.media");
        assert_eq!(s.parent(), p.parent());
    }

    #[test]
    fn sibling_of_index_is_none() {
        let p = path(vec![PathSegment::Field("list".into()), PathSegment::Index(0)]);
        assert!(p.sibling("media").is_none());
    }

    #[test]
    fn value_at_follows_keys_and_indices() {
        let doc = json!({
            "items": [
                {"_key": "x", "video": {"asset": {"_ref": "one"}}},
                {"_key": "y", "video": {"asset": {"_ref": "two"}}}
            ]
        });
        let by_key = path(vec![
            PathSegment::Field("items".into()),
            PathSegment::Key("y".into()),
            PathSegment::Field("video".into()),
            PathSegment::Field("asset".into()),
            PathSegment::Field("_ref".into()),
        ]);
        assert_eq!(value_at(&doc, &by_key), Some(&json!("two")));

        let by_index = path(vec![
            PathSegment::Field("items".into()),
            PathSegment::Index(0),
            PathSegment::Field("_key".into()),
        ]);
        assert_eq!(value_at(&doc, &by_index), Some(&json!("x")));
    }

    #[test]
    fn value_at_missing_is_none() {
        let doc = json!({"a": [1, 2]});
        assert!(value_at(&doc, &FieldPath::root().field("b")).is_none());
        let out_of_range = path(vec![PathSegment::Field("a".into()), PathSegment::Index(5)]);
        assert!(value_at(&doc, &out_of_range).is_none());
    }

    #[test]
    fn value_at_mut_allows_in_place_edit() {
        let mut doc = json!({"video": {"asset": null}});
        let p = FieldPath::root().field("video").field("asset");
        *value_at_mut(&mut doc, &p).unwrap() = json!("new");
        assert_eq!(doc["video"]["asset"], json!("new"));
    }
}

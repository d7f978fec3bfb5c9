//! The target record built by the mapper.
//!
//! An [`Instance`] is an ordered JSON object that grows attribute by
//! attribute as rules fire. Writes follow three shapes:
//!
//! - scalar assignment (`title`), last writer wins
//! - list append of a plain value (`languages`)
//! - list append of an object (`identifiers.value` appends `{"value": ...}`)
//!
//! Empty values are never written.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// A target inventory instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Instance {
    attributes: Map<String, Value>,
}

/// Whether a value counts as populated: non-null and not an empty string,
/// list or object.
#[must_use]
pub fn is_populated(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

impl Instance {
    /// Create an empty instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw attribute value
    #[must_use]
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.attributes.get(attribute)
    }

    /// String attribute value, if the attribute holds a string
    #[must_use]
    pub fn get_str(&self, attribute: &str) -> Option<&str> {
        self.get(attribute).and_then(Value::as_str)
    }

    /// Non-empty string attribute value
    #[must_use]
    pub fn non_empty_str(&self, attribute: &str) -> Option<&str> {
        self.get_str(attribute).filter(|s| !s.is_empty())
    }

    /// Instance identifier
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.get_str("id")
    }

    /// Title
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.non_empty_str("title")
    }

    /// Type classification
    #[must_use]
    pub fn instance_type_id(&self) -> Option<&str> {
        self.non_empty_str("instanceTypeId")
    }

    /// Human-readable identifier
    #[must_use]
    pub fn hrid(&self) -> Option<&str> {
        self.non_empty_str("hrid")
    }

    /// Set an attribute, replacing any previous value.
    pub fn set(&mut self, attribute: impl Into<String>, value: Value) {
        self.attributes.insert(attribute.into(), value);
    }

    /// Append to a list attribute, creating it if needed.
    ///
    /// A scalar already stored under the attribute is promoted to the first
    /// list element.
    pub fn append(&mut self, attribute: &str, value: Value) {
        let slot = self
            .attributes
            .entry(attribute.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if slot.is_null() {
            *slot = Value::Array(Vec::new());
        } else if !slot.is_array() {
            let previous = slot.take();
            *slot = Value::Array(vec![previous]);
        }
        if let Value::Array(items) = slot {
            items.push(value);
        }
    }

    /// Write a value at a dotted target path.
    ///
    /// When `multi_valued` is set the top-level attribute is a list: a plain
    /// path appends the value, a dotted path appends `{leaf: value}`.
    /// Otherwise the path is assigned, nesting objects for dotted paths.
    /// Empty values are ignored.
    pub fn write_path(&mut self, path: &str, value: &str, multi_valued: bool) {
        if value.is_empty() || path.is_empty() {
            return;
        }
        let (root, rest) = match path.split_once('.') {
            Some((root, rest)) => (root, Some(rest)),
            None => (path, None),
        };
        match (rest, multi_valued) {
            (None, true) => self.append(root, Value::String(value.to_string())),
            (None, false) => self.set(root, Value::String(value.to_string())),
            (Some(rest), true) => {
                let mut object = Map::new();
                insert_nested(&mut object, rest, value);
                self.append(root, Value::Object(object));
            },
            (Some(rest), false) => {
                let slot = self
                    .attributes
                    .entry(root.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !slot.is_object() {
                    *slot = Value::Object(Map::new());
                }
                if let Value::Object(object) = slot {
                    insert_nested(object, rest, value);
                }
            },
        }
    }

    /// String elements of a list attribute, in order.
    #[must_use]
    pub fn strings(&self, attribute: &str) -> Vec<String> {
        match self.get(attribute) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(Value::String(s)) => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    /// Replace a list attribute with the given strings.
    pub fn set_strings<I, S>(&mut self, attribute: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items = values
            .into_iter()
            .map(|value| Value::String(value.into()))
            .collect();
        self.set(attribute, Value::Array(items));
    }

    /// Remove duplicate elements from every list attribute.
    ///
    /// The first occurrence of each element is kept.
    pub fn dedupe(&mut self) {
        for value in self.attributes.values_mut() {
            if let Value::Array(items) = value {
                let mut seen = HashSet::new();
                items.retain(|item| seen.insert(item.to_string()));
            }
        }
    }

    /// Names of the attributes holding a populated value, in write order.
    pub fn populated_attributes(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .iter()
            .filter(|(_, value)| is_populated(value))
            .map(|(name, _)| name.as_str())
    }
}

pub(crate) fn insert_nested(object: &mut Map<String, Value>, path: &str, value: &str) {
    match path.split_once('.') {
        None => {
            object.insert(path.to_string(), Value::String(value.to_string()));
        },
        Some((head, rest)) => {
            let child = object
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(child) = child {
                insert_nested(child, rest, value);
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_write_last_writer_wins() {
        let mut instance = Instance::new();
        instance.write_path("title", "First", false);
        instance.write_path("title", "Second", false);
        assert_eq!(instance.title(), Some("Second"));
    }

    #[test]
    fn test_empty_values_are_never_written() {
        let mut instance = Instance::new();
        instance.write_path("title", "", false);
        instance.write_path("languages", "", true);
        assert!(instance.get("title").is_none());
        assert!(instance.get("languages").is_none());
    }

    #[test]
    fn test_list_writes_append() {
        let mut instance = Instance::new();
        instance.write_path("languages", "eng", true);
        instance.write_path("languages", "fre", true);
        instance.write_path("identifiers.value", "0-123", true);
        assert_eq!(instance.strings("languages"), vec!["eng", "fre"]);
        assert_eq!(instance.get("identifiers"), Some(&json!([{"value": "0-123"}])));
    }

    #[test]
    fn test_nested_scalar_write() {
        let mut instance = Instance::new();
        instance.write_path("metadata.createdByUserId", "u1", false);
        instance.write_path("metadata.updatedByUserId", "u1", false);
        assert_eq!(
            instance.get("metadata"),
            Some(&json!({"createdByUserId": "u1", "updatedByUserId": "u1"}))
        );
    }

    #[test]
    fn test_dedupe_keeps_distinct_values() {
        let mut instance = Instance::new();
        instance.set_strings("instanceFormatIds", ["X", "X", "Y"]);
        instance.append("identifiers", json!({"value": "1"}));
        instance.append("identifiers", json!({"value": "1"}));
        instance.dedupe();

        let formats: HashSet<String> = instance.strings("instanceFormatIds").into_iter().collect();
        assert_eq!(formats, HashSet::from(["X".to_string(), "Y".to_string()]));
        assert_eq!(instance.get("identifiers"), Some(&json!([{"value": "1"}])));
    }

    #[test]
    fn test_populated_attributes_skip_empty() {
        let mut instance = Instance::new();
        instance.set("title", json!("T"));
        instance.set("languages", json!([]));
        instance.set("discoverySuppress", json!(false));
        let populated: Vec<&str> = instance.populated_attributes().collect();
        assert_eq!(populated, vec!["title", "discoverySuppress"]);
    }
}

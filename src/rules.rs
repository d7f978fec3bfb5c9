//! The data-driven rule table.
//!
//! A [`RuleTable`] maps a source field tag to an ordered list of
//! [`FieldMapping`]s. The table is opaque data supplied with the reference
//! data snapshot; the dispatcher never branches on particular tags.
//!
//! The JSON shape follows the inventory platform's mapping-rules document:
//!
//! ```json
//! {
//!   "245": [{
//!     "target": "title",
//!     "subfield": ["a", "b", "n", "p"],
//!     "applyRulesOnConcatenatedData": true,
//!     "ignoreSubsequentFields": true,
//!     "rules": [{ "conditions": [{ "type": "remove_ending_punc, trim" }] }]
//!   }]
//! }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One mapping from (part of) a source field into a target attribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    /// Dotted target attribute path, e.g. `title` or `identifiers.value`
    #[serde(default)]
    pub target: Option<String>,
    /// Subfield codes read by this mapping; empty reads the whole field
    #[serde(default)]
    pub subfield: Vec<char>,
    /// Rules applied in order; the first producing a value wins
    #[serde(default)]
    pub rules: Vec<MappingRule>,
    /// Sub-mappings that together build one object per field occurrence
    #[serde(default)]
    pub entity: Vec<FieldMapping>,
    /// Build one entity object per repetition of the entity's subfields
    #[serde(default)]
    pub entity_per_repeated_subfield: bool,
    /// Join the selected subfields before applying the rules
    #[serde(default)]
    pub apply_rules_on_concatenated_data: bool,
    /// Skip all later occurrences of this tag within the same record
    #[serde(default)]
    pub ignore_subsequent_fields: bool,
    /// Free text for humans
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A value transformation: conditions to run and an optional constant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingRule {
    /// Conditions applied in order to the selected value
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Constant emitted instead of the conditioned value when that is non-empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Reference to one or more condition functions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Comma-separated function names, applied left to right
    #[serde(rename = "type")]
    pub kind: String,
    /// Function argument, shared by every function named in `kind`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<Value>,
}

impl Condition {
    /// Function names named by this condition, in application order.
    pub fn functions(&self) -> impl Iterator<Item = &str> {
        self.kind
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

impl FieldMapping {
    /// Top-level attribute this mapping writes, if it has a target.
    #[must_use]
    pub fn root_attribute(&self) -> Option<&str> {
        self.target
            .as_deref()
            .and_then(|target| target.split('.').next())
    }
}

/// Tag-indexed mapping rules, immutable for the duration of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleTable(IndexMap<String, Vec<FieldMapping>>);

impl RuleTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the rule list for a tag.
    pub fn insert(&mut self, tag: impl Into<String>, mappings: Vec<FieldMapping>) {
        self.0.insert(tag.into(), mappings);
    }

    /// Ordered rule list for a tag.
    #[must_use]
    pub fn get(&self, tag: &str) -> Option<&[FieldMapping]> {
        self.0.get(tag).map(Vec::as_slice)
    }

    /// Whether any rule exists for the tag.
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains_key(tag)
    }

    /// Number of tags with rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the table has no rules at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

//! MARC bibliographic record structures and operations.
//!
//! This module provides the source record types the mapping core reads:
//! - [`Record`]: Leader plus an ordered sequence of variable fields
//! - [`VariableField`]: Either a [`ControlField`] (001-009) or a data [`Field`]
//! - [`Subfield`]: Named data elements within data fields
//!
//! Field order is the order the fields appeared in the source, across tags.
//! The mapping pass depends on it for last-writer-wins semantics.
//!
//! # Examples
//!
//! ```
//! use bibmap::{Field, Leader, Record};
//!
//! let record = Record::builder(Leader::default())
//!     .control_field_str("001", "12345")
//!     .field(
//!         Field::builder("245".to_string(), '1', '0')
//!             .subfield_str('a', "Title")
//!             .build(),
//!     )
//!     .build();
//!
//! assert_eq!(record.get_control_field("001"), Some("12345"));
//! assert_eq!(record.get_field("245").and_then(|f| f.get_subfield('a')), Some("Title"));
//! ```

use crate::leader::Leader;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A MARC bibliographic record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Record leader
    pub leader: Leader,
    /// Control and data fields in source order
    pub fields: Vec<VariableField>,
}

/// One tagged field of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableField {
    /// Control field (001-009): tag plus unstructured data
    Control(ControlField),
    /// Data field (010+): tag, indicators and subfields
    Data(Field),
}

/// A control field in a MARC record (fields 001-009)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlField {
    /// Field tag
    pub tag: String,
    /// Field data
    pub data: String,
}

/// A data field in a MARC record (fields 010 and higher)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field tag (3 characters)
    pub tag: String,
    /// First indicator
    pub indicator1: char,
    /// Second indicator
    pub indicator2: char,
    /// Subfields (stored in `SmallVec` to avoid allocation for typical fields with 4 or fewer subfields)
    pub subfields: SmallVec<[Subfield; 4]>,
}

/// A subfield within a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subfield {
    /// Subfield code (single character)
    pub code: char,
    /// Subfield value
    pub value: String,
}

/// Whether a tag names a control field (numeric and below 010).
#[must_use]
pub fn is_control_tag(tag: &str) -> bool {
    tag.len() == 3 && tag.starts_with("00") && tag.chars().all(|c| c.is_ascii_digit())
}

impl VariableField {
    /// Field tag
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            VariableField::Control(field) => &field.tag,
            VariableField::Data(field) => &field.tag,
        }
    }

    /// The data field, if this is one
    #[must_use]
    pub fn as_data(&self) -> Option<&Field> {
        match self {
            VariableField::Data(field) => Some(field),
            VariableField::Control(_) => None,
        }
    }

    /// The control field data, if this is a control field
    #[must_use]
    pub fn control_data(&self) -> Option<&str> {
        match self {
            VariableField::Control(field) => Some(&field.data),
            VariableField::Data(_) => None,
        }
    }
}

impl Record {
    /// Create a new MARC record with the given leader
    #[must_use]
    pub fn new(leader: Leader) -> Self {
        Record {
            leader,
            fields: Vec::new(),
        }
    }

    /// Create a builder for fluently constructing MARC records
    #[must_use]
    pub fn builder(leader: Leader) -> RecordBuilder {
        RecordBuilder {
            record: Record::new(leader),
        }
    }

    /// Append a control field (001-009)
    pub fn add_control_field(&mut self, tag: String, data: String) {
        self.fields
            .push(VariableField::Control(ControlField { tag, data }));
    }

    /// Append a control field using string slices
    pub fn add_control_field_str(&mut self, tag: &str, data: &str) {
        self.add_control_field(tag.to_string(), data.to_string());
    }

    /// Append a data field
    pub fn add_field(&mut self, field: Field) {
        self.fields.push(VariableField::Data(field));
    }

    /// Insert a field before the first field with a greater tag.
    ///
    /// Keeps a tag-sorted record sorted; on an unsorted record the field lands
    /// before the first out-of-order tag that sorts after it.
    pub fn add_ordered_field(&mut self, field: VariableField) {
        let position = self
            .fields
            .iter()
            .position(|existing| existing.tag() > field.tag())
            .unwrap_or(self.fields.len());
        self.fields.insert(position, field);
    }

    /// Get the data of the first control field with a given tag
    #[must_use]
    pub fn get_control_field(&self, tag: &str) -> Option<&str> {
        self.fields
            .iter()
            .filter(|field| field.tag() == tag)
            .find_map(VariableField::control_data)
    }

    /// Get first data field with a given tag
    #[must_use]
    pub fn get_field(&self, tag: &str) -> Option<&Field> {
        self.fields
            .iter()
            .filter(|field| field.tag() == tag)
            .find_map(VariableField::as_data)
    }

    /// Iterate over all fields in source order
    pub fn fields(&self) -> impl Iterator<Item = &VariableField> {
        self.fields.iter()
    }

    /// Iterate over data fields matching a specific tag, in source order
    ///
    /// # Examples
    ///
    /// ```ignore
    /// for field in record.fields_by_tag("650") {
    ///     if let Some(subject) = field.get_subfield('a') {
    ///         println!("Subject: {}", subject);
    ///     }
    /// }
    /// ```
    pub fn fields_by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Field> + 'a {
        self.fields
            .iter()
            .filter(move |field| field.tag() == tag)
            .filter_map(VariableField::as_data)
    }

    /// Whether any field (control or data) carries the tag
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.fields.iter().any(|field| field.tag() == tag)
    }

    /// Remove all fields with a given tag
    ///
    /// Returns the removed fields.
    pub fn remove_fields_by_tag(&mut self, tag: &str) -> Vec<VariableField> {
        let mut removed = Vec::new();
        self.fields.retain(|field| {
            if field.tag() == tag {
                removed.push(field.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    /// Get the control number (system number) from field 001
    #[must_use]
    pub fn control_number(&self) -> Option<&str> {
        self.get_control_field("001")
    }
}

/// Builder for fluently constructing MARC records
#[derive(Debug)]
pub struct RecordBuilder {
    record: Record,
}

impl RecordBuilder {
    /// Add a control field to the record being built
    #[must_use]
    pub fn control_field_str(mut self, tag: &str, data: &str) -> Self {
        self.record.add_control_field_str(tag, data);
        self
    }

    /// Add a data field to the record being built
    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.record.add_field(field);
        self
    }

    /// Build the record
    #[must_use]
    pub fn build(self) -> Record {
        self.record
    }
}

impl Field {
    /// Create a new data field
    #[must_use]
    pub fn new(tag: String, indicator1: char, indicator2: char) -> Self {
        Field {
            tag,
            indicator1,
            indicator2,
            subfields: SmallVec::new(),
        }
    }

    /// Create a builder for constructing fields fluently
    ///
    /// # Examples
    ///
    /// ```
    /// use bibmap::Field;
    ///
    /// let field = Field::builder("245".to_string(), '1', '0')
    ///     .subfield('a', "The Great Gatsby".to_string())
    ///     .subfield('c', "F. Scott Fitzgerald".to_string())
    ///     .build();
    /// assert_eq!(field.get_subfield('c'), Some("F. Scott Fitzgerald"));
    /// ```
    #[must_use]
    pub fn builder(tag: String, indicator1: char, indicator2: char) -> FieldBuilder {
        FieldBuilder {
            field: Field::new(tag, indicator1, indicator2),
        }
    }

    /// Add a subfield
    pub fn add_subfield(&mut self, code: char, value: String) {
        self.subfields.push(Subfield { code, value });
    }

    /// Add a subfield using a string slice
    pub fn add_subfield_str(&mut self, code: char, value: &str) {
        self.add_subfield(code, value.to_string());
    }

    /// Get first value for a subfield code
    #[must_use]
    pub fn get_subfield(&self, code: char) -> Option<&str> {
        self.subfields
            .iter()
            .find(|sf| sf.code == code)
            .map(|sf| sf.value.as_str())
    }

    /// Iterate over all subfields
    pub fn subfields(&self) -> impl Iterator<Item = &Subfield> {
        self.subfields.iter()
    }

    /// Iterate over subfield values with a specific code, in field order
    pub fn subfields_by_code(&self, code: char) -> impl Iterator<Item = &str> {
        self.subfields
            .iter()
            .filter(move |sf| sf.code == code)
            .map(|sf| sf.value.as_str())
    }

    /// Get all subfield values matching any of the given codes
    ///
    /// Returns values in the order they appear in the field.
    #[must_use]
    pub fn get_subfields(&self, codes: &[char]) -> Vec<&str> {
        self.subfields
            .iter()
            .filter(|sf| codes.contains(&sf.code))
            .map(|sf| sf.value.as_str())
            .collect()
    }

    /// Concatenate all subfield values with spaces
    #[must_use]
    pub fn value(&self) -> String {
        self.subfields
            .iter()
            .map(|sf| sf.value.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Builder for fluently constructing MARC fields
#[derive(Debug)]
pub struct FieldBuilder {
    field: Field,
}

impl FieldBuilder {
    /// Add a subfield to the field being built
    #[must_use]
    pub fn subfield(mut self, code: char, value: String) -> Self {
        self.field.add_subfield(code, value);
        self
    }

    /// Add a subfield using a string slice
    #[must_use]
    pub fn subfield_str(mut self, code: char, value: &str) -> Self {
        self.field.add_subfield_str(code, value);
        self
    }

    /// Build the field
    #[must_use]
    pub fn build(self) -> Field {
        self.field
    }
}

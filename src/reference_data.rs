//! Reference data snapshot.
//!
//! [`ReferenceData`] bundles everything the mapping core needs from the target
//! platform: the rule table, the controlled vocabularies, the numbering
//! settings and the user that provenance metadata is attributed to. It is
//! loaded once before any record is processed and never changes afterwards.

use crate::error::{MappingError, MappingResult};
use crate::rules::RuleTable;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Name of the mode-of-issuance term used whenever nothing better matches.
pub const UNSPECIFIED_MODE_OF_ISSUANCE: &str = "unspecified";

/// Instance attributes that hold lists in the target schema.
const DEFAULT_LIST_ATTRIBUTES: &[&str] = &[
    "alternativeTitles",
    "editions",
    "series",
    "identifiers",
    "contributors",
    "subjects",
    "classifications",
    "publication",
    "publicationFrequency",
    "publicationRange",
    "electronicAccess",
    "instanceFormatIds",
    "physicalDescriptions",
    "languages",
    "notes",
    "natureOfContentTermIds",
    "statisticalCodeIds",
];

/// A vocabulary term identified by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedTerm {
    /// Target platform identifier
    pub id: String,
    /// Display name
    pub name: String,
}

/// A vocabulary term identified by code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodedTerm {
    /// Target platform identifier
    pub id: String,
    /// Short code, e.g. `nc` for volume
    pub code: String,
    /// Display name
    #[serde(default)]
    pub name: String,
}

/// Prefix and first number of a numbering sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceSettings {
    /// Prepended to every formatted number
    #[serde(default)]
    pub prefix: String,
    /// First number handed out
    #[serde(default = "default_start_number")]
    pub start_number: u64,
}

fn default_start_number() -> u64 {
    1
}

/// Human-readable identifier settings per record kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HridSettings {
    /// Settings for instance records
    pub instances: SequenceSettings,
}

fn default_list_attributes() -> HashSet<String> {
    DEFAULT_LIST_ATTRIBUTES
        .iter()
        .map(|attribute| (*attribute).to_string())
        .collect()
}

/// Everything the mapping core reads from the target platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceData {
    /// Tag-indexed mapping rules
    #[serde(default)]
    pub mapping_rules: RuleTable,
    /// Modes of issuance
    #[serde(default)]
    pub modes_of_issuance: Vec<NamedTerm>,
    /// Instance formats (carrier types)
    #[serde(default)]
    pub instance_formats: Vec<CodedTerm>,
    /// Instance (resource) types
    #[serde(default)]
    pub instance_types: Vec<CodedTerm>,
    /// Identifier types
    #[serde(default)]
    pub identifier_types: Vec<NamedTerm>,
    /// Contributor name types
    #[serde(default)]
    pub contributor_name_types: Vec<NamedTerm>,
    /// Canonical 3-letter language codes
    #[serde(default)]
    pub language_codes: HashSet<String>,
    /// Numbering-sequence settings
    pub hrid_settings: HridSettings,
    /// User recorded as creator and updater in provenance metadata
    #[serde(default)]
    pub user_id: String,
    /// Top-level target attributes that hold lists
    #[serde(default = "default_list_attributes")]
    pub list_attributes: HashSet<String>,
}

impl ReferenceData {
    /// Parse and validate a JSON snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::ReferenceData`] if the JSON is malformed or the
    /// snapshot fails [`ReferenceData::validate`].
    pub fn from_json_str(json: &str) -> MappingResult<Self> {
        let data: ReferenceData = serde_json::from_str(json)
            .map_err(|e| MappingError::ReferenceData(format!("Malformed snapshot: {e}")))?;
        data.validate()?;
        Ok(data)
    }

    /// Read, parse and validate a JSON snapshot file.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::ReferenceData`] if the file cannot be read or
    /// [`ReferenceData::from_json_str`] fails.
    pub fn from_path(path: impl AsRef<Path>) -> MappingResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            MappingError::ReferenceData(format!("Cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    /// Check the invariants the mapper relies on.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::ReferenceData`] when the modes-of-issuance
    /// vocabulary has no "unspecified" term.
    pub fn validate(&self) -> MappingResult<()> {
        self.unspecified_mode_of_issuance_id().map(|_| ())
    }

    /// Identifier of the "unspecified" mode of issuance.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::ReferenceData`] if the vocabulary has no such term.
    pub fn unspecified_mode_of_issuance_id(&self) -> MappingResult<&str> {
        self.mode_of_issuance_id(UNSPECIFIED_MODE_OF_ISSUANCE)
            .ok_or_else(|| {
                MappingError::ReferenceData(
                    "Modes of issuance contain no \"unspecified\" term".to_string(),
                )
            })
    }

    /// Mode of issuance identifier by case-insensitive name.
    #[must_use]
    pub fn mode_of_issuance_id(&self, name: &str) -> Option<&str> {
        find_by_name(&self.modes_of_issuance, name)
    }

    /// Instance format identifier by exact code.
    #[must_use]
    pub fn instance_format_id(&self, code: &str) -> Option<&str> {
        find_by_code(&self.instance_formats, code)
    }

    /// Instance type identifier by exact code.
    #[must_use]
    pub fn instance_type_id(&self, code: &str) -> Option<&str> {
        find_by_code(&self.instance_types, code)
    }

    /// Identifier type identifier by case-insensitive name.
    #[must_use]
    pub fn identifier_type_id(&self, name: &str) -> Option<&str> {
        find_by_name(&self.identifier_types, name)
    }

    /// Contributor name type identifier by case-insensitive name.
    #[must_use]
    pub fn contributor_name_type_id(&self, name: &str) -> Option<&str> {
        find_by_name(&self.contributor_name_types, name)
    }

    /// Whether a code is in the canonical language list.
    #[must_use]
    pub fn is_language_code(&self, code: &str) -> bool {
        self.language_codes.contains(code)
    }

    /// Whether a top-level attribute holds a list.
    #[must_use]
    pub fn is_list_attribute(&self, attribute: &str) -> bool {
        self.list_attributes.contains(attribute)
    }
}

fn find_by_name<'a>(terms: &'a [NamedTerm], name: &str) -> Option<&'a str> {
    terms
        .iter()
        .find(|term| term.name.eq_ignore_ascii_case(name))
        .map(|term| term.id.as_str())
}

fn find_by_code<'a>(terms: &'a [CodedTerm], code: &str) -> Option<&'a str> {
    terms
        .iter()
        .find(|term| term.code == code)
        .map(|term| term.id.as_str())
}

/// Snapshot shared by unit tests across the crate.
#[cfg(test)]
pub(crate) fn sample_reference_data() -> ReferenceData {
    let json = r#"{
        "modesOfIssuance": [
            {"id": "moi-single", "name": "single unit"},
            {"id": "moi-serial", "name": "serial"},
            {"id": "moi-integrating", "name": "integrating resource"},
            {"id": "moi-unspecified", "name": "unspecified"}
        ],
        "instanceFormats": [
            {"id": "fmt-nc", "code": "nc", "name": "unmediated -- volume"},
            {"id": "fmt-cr", "code": "cr", "name": "computer -- online resource"},
            {"id": "fmt-ba", "code": "ba", "name": "audio -- audio belt"}
        ],
        "instanceTypes": [{"id": "type-txt", "code": "txt", "name": "text"}],
        "identifierTypes": [{"id": "idt-isbn", "name": "ISBN"}],
        "contributorNameTypes": [{"id": "cnt-personal", "name": "Personal name"}],
        "languageCodes": ["eng", "fre", "ger", "jpn", "swe", "zxx"],
        "hridSettings": {"instances": {"prefix": "in", "startNumber": 1}},
        "userId": "user-1"
    }"#;
    match ReferenceData::from_json_str(json) {
        Ok(data) => data,
        Err(e) => panic!("sample snapshot is valid: {e}"),
    }
}

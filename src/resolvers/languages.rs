//! Language extraction and normalisation.
//!
//! Candidates come from the 041 language code fields, or from positions
//! 35-37 of the 008 field when the record has no 041. Every candidate is
//! lower-cased with spaces removed; values that are a run of 3-letter codes
//! (`engfre`) are split into their codes.

use crate::record::Record;
use crate::reference_data::ReferenceData;
use crate::report::MigrationReport;
use indexmap::IndexSet;
use tracing::warn;

/// Report category for codes neither canonical nor correctable.
pub const UNRECOGNIZED_LANGUAGES: &str = "Unrecognized language codes in records";

const LANGUAGE_CODE_TAG: &str = "041";
const LANGUAGE_SUBFIELDS: &[char] = &['a', 'b', 'd', 'e', 'f', 'g', 'h', 'j', 'k', 'm', 'n'];
const FIXED_FIELD_LANGUAGE: std::ops::Range<usize> = 35..38;

/// Placeholders never accepted as a language.
const FORBIDDEN_VALUES: &[&str] = &["###", "zxx", "n/a", "N/A", "|||"];

/// Obsolete or misspelled codes and their canonical replacements.
const CORRECTIONS: &[(&str, &str)] = &[("jap", "jpn"), ("fra", "fre"), ("sve", "swe"), ("tys", "ger")];

/// Normalise one raw language value into candidate codes.
///
/// # Examples
///
/// ```
/// use bibmap::resolvers::normalize_language_value;
///
/// assert_eq!(normalize_language_value("Eng Fre"), vec!["eng", "fre"]);
/// assert_eq!(normalize_language_value("eng"), vec!["eng"]);
/// assert!(normalize_language_value("english").is_empty());
/// ```
#[must_use]
pub fn normalize_language_value(raw: &str) -> Vec<String> {
    let code: String = raw
        .chars()
        .filter(|c| *c != ' ')
        .flat_map(char::to_lowercase)
        .collect();
    let chars: Vec<char> = code.chars().collect();
    match chars.len() {
        3 => vec![code],
        len if len > 3 && len % 3 == 0 => chars.chunks(3).map(|chunk| chunk.iter().collect()).collect(),
        _ => Vec::new(),
    }
}

/// Collect the record's raw language candidates, distinct and in order.
#[must_use]
pub fn extract_language_candidates(record: &Record) -> Vec<String> {
    let mut candidates = IndexSet::new();
    if record.has_tag(LANGUAGE_CODE_TAG) {
        for field in record.fields_by_tag(LANGUAGE_CODE_TAG) {
            for value in field.get_subfields(LANGUAGE_SUBFIELDS) {
                candidates.extend(normalize_language_value(value));
            }
        }
    } else if let Some(data) = record.get_control_field("008") {
        let fixed: String = data
            .chars()
            .skip(FIXED_FIELD_LANGUAGE.start)
            .take(FIXED_FIELD_LANGUAGE.len())
            .collect();
        if fixed.chars().count() == FIXED_FIELD_LANGUAGE.len() {
            candidates.insert(fixed.to_lowercase());
        }
    }
    candidates.into_iter().collect()
}

/// Keep canonical codes, apply the known corrections and report the rest.
///
/// Blank values and placeholders are dropped silently. The result is
/// distinct, in first-seen order.
pub fn filter_languages<I>(
    candidates: I,
    reference_data: &ReferenceData,
    report: &MigrationReport,
    legacy_ids: &[String],
) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut accepted = IndexSet::new();
    for candidate in candidates {
        let forbidden = FORBIDDEN_VALUES.contains(&candidate.as_str());
        if reference_data.is_language_code(&candidate) && !forbidden {
            accepted.insert(candidate);
        } else if let Some((_, corrected)) = CORRECTIONS.iter().find(|(from, _)| *from == candidate) {
            accepted.insert((*corrected).to_string());
        } else if candidate.trim().is_empty() || forbidden {
            continue;
        } else {
            warn!(code = %candidate, ?legacy_ids, "Unrecognized language code");
            report.record(UNRECOGNIZED_LANGUAGES, candidate);
        }
    }
    accepted.into_iter().collect()
}

//! Instance format inference from media (337) and carrier (338) types.
//!
//! A 338 whose `$2` names the RDA carrier vocabulary contributes its `$b`
//! codes. Two-character codes resolve directly. A one-character code is
//! completed by the `$b` at the same subfield index of the 337 at the same
//! repetition index, giving `media + carrier` (e.g. `b` + `a` = `ba`).

use crate::record::Record;
use crate::reference_data::ReferenceData;
use crate::report::MigrationReport;
use indexmap::IndexSet;
use tracing::debug;

/// Report category for everything the format resolver notices.
pub const FORMAT_HANDLING: &str = "Instance format ids handling (337 + 338)";

/// `$2` value marking a 338 as using the RDA carrier vocabulary.
pub const RDA_CARRIER: &str = "rdacarrier";

const MEDIA_TYPE_TAG: &str = "337";
const CARRIER_TYPE_TAG: &str = "338";

/// Resolve the record's distinct instance format ids, in discovery order.
///
/// Broken pairings and unknown codes are reported, never fatal.
#[must_use]
pub fn resolve_instance_format_ids(
    record: &Record,
    reference_data: &ReferenceData,
    report: &MigrationReport,
) -> Vec<String> {
    let media_types: Vec<_> = record.fields_by_tag(MEDIA_TYPE_TAG).collect();
    let mut ids = IndexSet::new();

    for (field_index, carrier) in record.fields_by_tag(CARRIER_TYPE_TAG).enumerate() {
        let source = carrier.get_subfield('2').unwrap_or("Not set");
        report.record(FORMAT_HANDLING, format!("Source ($2) is set to {source}"));
        if source != RDA_CARRIER {
            continue;
        }

        for (subfield_index, code) in carrier.subfields_by_code('b').enumerate() {
            let code = code.trim();
            let combined = match code.chars().count() {
                2 => code.to_string(),
                1 => {
                    let Some(media) = media_types.get(field_index) else {
                        debug!(field_index, "No 337 paired with 338");
                        report.record(
                            FORMAT_HANDLING,
                            "No corresponding 337 to 338 even though 338$b was one character code",
                        );
                        continue;
                    };
                    let media_code = media
                        .subfields_by_code('b')
                        .nth(subfield_index)
                        .map(str::trim)
                        .unwrap_or_default();
                    if media_code.is_empty() {
                        debug!(field_index, subfield_index, "No paired 337 $b");
                        report.record(FORMAT_HANDLING, "No corresponding $b in corresponding 337");
                        continue;
                    }
                    format!("{media_code}{code}")
                },
                _ => {
                    report.record(FORMAT_HANDLING, format!("Unexpected 338 $b code: {code}"));
                    continue;
                },
            };

            if combined.chars().count() != 2 {
                report.record(FORMAT_HANDLING, format!("Combined code is not two characters: {combined}"));
                continue;
            }
            match reference_data.instance_format_id(&combined) {
                Some(id) => {
                    debug!(code = %combined, id, "Resolved instance format");
                    ids.insert(id.to_string());
                },
                None => report.record(FORMAT_HANDLING, format!("Unrecognized format code {combined}")),
            }
        }
    }

    ids.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leader::Leader;
    use crate::record::Field;
    use crate::reference_data::sample_reference_data;

    fn typed_field(tag: &str, codes: &[&str], source: Option<&str>) -> Field {
        let mut field = Field::new(tag.to_string(), ' ', ' ');
        for code in codes {
            field.add_subfield_str('b', code);
        }
        if let Some(source) = source {
            field.add_subfield_str('2', source);
        }
        field
    }

    #[test]
    fn test_two_character_codes_resolve_directly() {
        let record = Record::builder(Leader::default())
            .field(typed_field("338", &["nc", "cr", "nc"], Some(RDA_CARRIER)))
            .build();
        let report = MigrationReport::new();
        let ids = resolve_instance_format_ids(&record, &sample_reference_data(), &report);
        assert_eq!(ids, vec!["fmt-nc", "fmt-cr"]);
        assert_eq!(report.count(FORMAT_HANDLING, "Source ($2) is set to rdacarrier"), 1);
    }

    #[test]
    fn test_one_character_code_pairs_with_337() {
        let record = Record::builder(Leader::default())
            .field(typed_field("337", &["b"], Some("rdamedia")))
            .field(typed_field("338", &["a"], Some(RDA_CARRIER)))
            .build();
        let report = MigrationReport::new();
        let ids = resolve_instance_format_ids(&record, &sample_reference_data(), &report);
        assert_eq!(ids, vec!["fmt-ba"]);
    }

    #[test]
    fn test_missing_337_is_a_reconciliation_gap() {
        let record = Record::builder(Leader::default())
            .field(typed_field("338", &["a"], Some(RDA_CARRIER)))
            .build();
        let report = MigrationReport::new();
        let ids = resolve_instance_format_ids(&record, &sample_reference_data(), &report);
        assert!(ids.is_empty());
        assert_eq!(
            report.count(
                FORMAT_HANDLING,
                "No corresponding 337 to 338 even though 338$b was one character code"
            ),
            1
        );
    }

    #[test]
    fn test_other_sources_and_unknown_codes() {
        let record = Record::builder(Leader::default())
            .field(typed_field("338", &["nc"], None))
            .field(typed_field("338", &["zz"], Some(RDA_CARRIER)))
            .build();
        let report = MigrationReport::new();
        let ids = resolve_instance_format_ids(&record, &sample_reference_data(), &report);
        assert!(ids.is_empty());
        assert_eq!(report.count(FORMAT_HANDLING, "Source ($2) is set to Not set"), 1);
        assert_eq!(report.count(FORMAT_HANDLING, "Unrecognized format code zz"), 1);
    }
}

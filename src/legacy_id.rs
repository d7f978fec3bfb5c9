//! Legacy identifier extraction.
//!
//! Every accepted record is keyed in the identifier map by the identifier it
//! carried in the source system. Where that identifier lives depends on the
//! [`IlsFlavour`].

use crate::config::IlsFlavour;
use crate::error::{MappingError, MappingResult};
use crate::record::Record;
use crate::report::MigrationReport;
use indexmap::IndexSet;
use tracing::debug;

/// Statistic counted when the Aleph strategy falls back to the 001 field.
pub const FALLBACK_TO_001: &str = "Legacy id not found. 001 returned";

/// Extract the record's legacy identifiers.
///
/// Returns one or more non-empty identifiers in source order.
///
/// # Errors
///
/// Returns [`MappingError::MissingIdentifier`] when none of the fields the
/// flavour reads carries a value.
pub fn extract_legacy_ids(
    record: &Record,
    flavour: IlsFlavour,
    report: &MigrationReport,
) -> MappingResult<Vec<String>> {
    let ids = match flavour {
        IlsFlavour::Sierra => first_subfield(record, "907", 'a'),
        IlsFlavour::Field907y => first_subfield(record, "907", 'y'),
        IlsFlavour::Field035 => first_subfield(record, "035", 'a'),
        IlsFlavour::Aleph => {
            let ids = aleph_ids(record);
            if ids.is_empty() {
                let fallback = control_number(record);
                if !fallback.is_empty() {
                    debug!("No 998 $b found, using 001 as legacy id");
                    report.stat(FALLBACK_TO_001);
                }
                fallback
            } else {
                ids
            }
        },
        IlsFlavour::Voyager => control_number(record),
    };

    if ids.is_empty() {
        return Err(MappingError::MissingIdentifier {
            flavour: flavour.to_string(),
        });
    }
    Ok(ids)
}

fn first_subfield(record: &Record, tag: &str, code: char) -> Vec<String> {
    record
        .get_field(tag)
        .and_then(|field| field.get_subfield(code))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| vec![value.to_string()])
        .unwrap_or_default()
}

fn aleph_ids(record: &Record) -> Vec<String> {
    let ids: IndexSet<String> = record
        .fields_by_tag("998")
        .filter_map(|field| field.get_subfield('b'))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect();
    ids.into_iter().collect()
}

fn control_number(record: &Record) -> Vec<String> {
    record
        .control_number()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| vec![value.to_string()])
        .unwrap_or_default()
}

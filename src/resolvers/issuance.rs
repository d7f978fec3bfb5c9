//! Mode of issuance from leader position 7 (bibliographic level).

use crate::error::MappingResult;
use crate::leader::Leader;
use crate::reference_data::{ReferenceData, UNSPECIFIED_MODE_OF_ISSUANCE};
use crate::report::MigrationReport;
use tracing::warn;

/// Report category for codes resolved to a vocabulary term.
pub const MATCHED_ISSUANCE: &str = "Matched Modes of issuance code";
/// Report category for codes that fell back to the "unspecified" term.
pub const UNMATCHED_ISSUANCE: &str = "Unmatched Modes of issuance code";
/// Report category for codes outside the bibliographic level table.
pub const UNSPECIFIED_ISSUANCE: &str = "unspecified Modes of issuance code";
/// Report category for records needing manual cleanup.
pub const CLEANING_TASKS: &str = "Possible cleaning tasks";

/// Mode of issuance name for a bibliographic level code.
#[must_use]
pub fn issuance_name(level: char) -> &'static str {
    match level {
        'a' | 'c' | 'd' | 'm' => "single unit",
        'b' | 's' => "serial",
        'i' => "integrating resource",
        _ => UNSPECIFIED_MODE_OF_ISSUANCE,
    }
}

/// Resolves modes of issuance, holding the "unspecified" fallback id.
#[derive(Debug, Clone)]
pub struct IssuanceResolver {
    fallback_id: String,
}

impl IssuanceResolver {
    /// Create a resolver from the reference data.
    ///
    /// # Errors
    ///
    /// Returns [`crate::MappingError::ReferenceData`] if the vocabulary has
    /// no "unspecified" term.
    pub fn new(reference_data: &ReferenceData) -> MappingResult<Self> {
        Ok(Self {
            fallback_id: reference_data.unspecified_mode_of_issuance_id()?.to_string(),
        })
    }

    /// Identifier used when nothing better matches.
    #[must_use]
    pub fn fallback_id(&self) -> &str {
        &self.fallback_id
    }

    /// Resolve the mode of issuance id for a leader. Never fails.
    #[must_use]
    pub fn resolve(
        &self,
        leader: &Leader,
        reference_data: &ReferenceData,
        report: &MigrationReport,
    ) -> String {
        let Some(level) = leader.bibliographic_level() else {
            warn!(leader = leader.as_str(), "Leader too short for bibliographic level");
            report.record(CLEANING_TASKS, "No Leader[7]");
            return self.fallback_id.clone();
        };

        let name = issuance_name(level);
        if name == UNSPECIFIED_MODE_OF_ISSUANCE {
            report.record(UNSPECIFIED_ISSUANCE, level.to_string());
            report.record(UNMATCHED_ISSUANCE, level.to_string());
            return self.fallback_id.clone();
        }

        match reference_data.mode_of_issuance_id(name) {
            Some(id) => {
                report.record(MATCHED_ISSUANCE, format!("{id} - {name}"));
                id.to_string()
            },
            None => {
                warn!(level = %level, name, "Mode of issuance missing from vocabulary");
                report.record(UNMATCHED_ISSUANCE, level.to_string());
                self.fallback_id.clone()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference_data::sample_reference_data;

    fn resolve(leader: &str) -> (String, MigrationReport) {
        let data = sample_reference_data();
        let report = MigrationReport::new();
        let id = IssuanceResolver::new(&data)
            .unwrap()
            .resolve(&Leader::new(leader), &data, &report);
        (id, report)
    }

    #[test]
    fn test_level_b_is_serial() {
        let (id, report) = resolve("00000nab a2200000 a 4500");
        assert_eq!(id, "moi-serial");
        assert_eq!(report.count(MATCHED_ISSUANCE, "moi-serial - serial"), 1);
        assert_eq!(resolve("00000nas a2200000 a 4500").0, "moi-serial");
    }

    #[test]
    fn test_table_codes() {
        assert_eq!(resolve("00000nam a2200000 a 4500").0, "moi-single");
        assert_eq!(resolve("00000nai a2200000 a 4500").0, "moi-integrating");
    }

    #[test]
    fn test_out_of_table_code_falls_back() {
        let (id, report) = resolve("00000naz a2200000 a 4500");
        assert_eq!(id, "moi-unspecified");
        assert_eq!(report.count(UNMATCHED_ISSUANCE, "z"), 1);
        assert_eq!(report.count(UNSPECIFIED_ISSUANCE, "z"), 1);
    }

    #[test]
    fn test_short_leader_falls_back() {
        let (id, report) = resolve("00000na");
        assert_eq!(id, "moi-unspecified");
        assert_eq!(report.count(CLEANING_TASKS, "No Leader[7]"), 1);
    }

    #[test]
    fn test_name_missing_from_vocabulary_falls_back() {
        let mut data = sample_reference_data();
        data.modes_of_issuance.retain(|term| term.name != "serial");
        let report = MigrationReport::new();
        let resolver = IssuanceResolver::new(&data).unwrap();
        let id = resolver.resolve(&Leader::new("00000nas a2200000 a 4500"), &data, &report);
        assert_eq!(id, resolver.fallback_id());
        assert_eq!(report.count(UNMATCHED_ISSUANCE, "s"), 1);
    }
}

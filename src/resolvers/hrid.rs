//! Human-readable identifier assignment.
//!
//! Records without a rule-assigned `hrid` take the next number of the run's
//! [`NumberingSequence`]. Either way the final identifier is written back to
//! the source record as its 001 so the stored source record and the instance
//! agree.

use crate::instance::Instance;
use crate::record::{ControlField, Record, VariableField};
use crate::reference_data::SequenceSettings;
use crate::report::MigrationReport;
use std::sync::atomic::{AtomicU64, Ordering};

/// Statistic counted when an identifier is generated.
pub const CREATED_HRID: &str = "Records without HRID from rules. Created HRID";
/// Statistic counted when the rules already supplied an identifier.
pub const HRID_FROM_RULES: &str = "Records with HRID from Rules";

/// Control field the identifier is written back to.
pub const CONTROL_NUMBER_TAG: &str = "001";

/// Run-wide counter producing prefixed, zero-padded identifiers.
///
/// Taking a number is a single atomic step, so concurrent mappers never
/// share or skip a value.
#[derive(Debug)]
pub struct NumberingSequence {
    prefix: String,
    width: usize,
    next: AtomicU64,
}

impl NumberingSequence {
    /// Create a sequence starting at `start`.
    #[must_use]
    pub fn new(prefix: impl Into<String>, start: u64, width: usize) -> Self {
        Self {
            prefix: prefix.into(),
            width,
            next: AtomicU64::new(start),
        }
    }

    /// Create a sequence from reference data settings.
    #[must_use]
    pub fn from_settings(settings: &SequenceSettings, width: usize) -> Self {
        Self::new(settings.prefix.clone(), settings.start_number, width)
    }

    /// Take the current number, format it and advance the counter.
    ///
    /// # Examples
    ///
    /// ```
    /// use bibmap::resolvers::NumberingSequence;
    ///
    /// let sequence = NumberingSequence::new("in", 7, 11);
    /// assert_eq!(sequence.next_number(), "in00000000007");
    /// assert_eq!(sequence.next_number(), "in00000000008");
    /// ```
    pub fn next_number(&self) -> String {
        let number = self.next.fetch_add(1, Ordering::SeqCst);
        format!("{}{:0width$}", self.prefix, number, width = self.width)
    }

    /// The number the next call to [`NumberingSequence::next_number`] takes.
    #[must_use]
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }
}

/// Give the instance an identifier and write it back to the record's 001.
pub fn assign_hrid(
    instance: &mut Instance,
    record: &mut Record,
    sequence: &NumberingSequence,
    report: &MigrationReport,
) {
    let hrid = match instance.hrid() {
        Some(existing) => {
            report.stat(HRID_FROM_RULES);
            existing.to_string()
        },
        None => {
            report.stat(CREATED_HRID);
            let generated = sequence.next_number();
            instance.set("hrid", serde_json::Value::String(generated.clone()));
            generated
        },
    };

    record.remove_fields_by_tag(CONTROL_NUMBER_TAG);
    record.add_ordered_field(VariableField::Control(ControlField {
        tag: CONTROL_NUMBER_TAG.to_string(),
        data: hrid,
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leader::Leader;
    use crate::report::GENERAL_STATISTICS;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_generated_hrid_replaces_001() {
        let sequence = NumberingSequence::new("in", 1, 11);
        let report = MigrationReport::new();
        let mut record = Record::builder(Leader::default())
            .control_field_str("001", "ocm1")
            .control_field_str("001", "ocm2")
            .control_field_str("008", "850101s1985")
            .build();
        let mut instance = Instance::new();

        assign_hrid(&mut instance, &mut record, &sequence, &report);

        assert_eq!(instance.hrid(), Some("in00000000001"));
        let control_numbers: Vec<&str> = record
            .fields()
            .filter(|f| f.tag() == "001")
            .filter_map(VariableField::control_data)
            .collect();
        assert_eq!(control_numbers, vec!["in00000000001"]);
        assert_eq!(record.fields[0].tag(), "001");
        assert_eq!(sequence.peek(), 2);
        assert_eq!(report.count(GENERAL_STATISTICS, CREATED_HRID), 1);
    }

    #[test]
    fn test_rule_assigned_hrid_is_kept_and_not_counted() {
        let sequence = NumberingSequence::new("in", 1, 11);
        let report = MigrationReport::new();
        let mut record = Record::new(Leader::default());
        let mut instance = Instance::new();
        instance.set("hrid", serde_json::json!("legacy-9"));

        assign_hrid(&mut instance, &mut record, &sequence, &report);

        assert_eq!(instance.hrid(), Some("legacy-9"));
        assert_eq!(record.control_number(), Some("legacy-9"));
        assert_eq!(sequence.peek(), 1);
        assert_eq!(report.count(GENERAL_STATISTICS, HRID_FROM_RULES), 1);
    }

    #[test]
    fn test_concurrent_numbers_are_distinct() {
        let sequence = Arc::new(NumberingSequence::new("in", 1, 11));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let sequence = Arc::clone(&sequence);
                std::thread::spawn(move || (0..250).map(|_| sequence.next_number()).collect::<Vec<_>>())
            })
            .collect();
        let numbers: HashSet<String> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        assert_eq!(numbers.len(), 1000);
        assert_eq!(sequence.peek(), 1001);
    }

    proptest! {
        #[test]
        fn prop_numbers_are_injective_and_increasing(start in 0u64..1_000_000, count in 1usize..200) {
            let sequence = NumberingSequence::new("in", start, 11);
            let numbers: Vec<String> = (0..count).map(|_| sequence.next_number()).collect();
            // Fixed width makes string order match numeric order.
            prop_assert!(numbers.windows(2).all(|pair| pair[0] < pair[1]));
            prop_assert_eq!(numbers[0].clone(), format!("in{start:011}"));
        }
    }
}

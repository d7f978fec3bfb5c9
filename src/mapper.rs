//! Bibliographic record to inventory instance mapping.
//!
//! [`BibsMapper`] performs one mapping pass per source record:
//!
//! 1. extract the legacy identifiers
//! 2. create the instance with its id and provenance metadata
//! 3. run the rule-driven field pass
//! 4. derive formats, type fallback, mode of issuance and languages
//! 5. validate
//! 6. assign the human-readable identifier and suppression flags
//! 7. deduplicate, count, and record the identifier map entries
//!
//! [`MigrationRun`] drives a batch of records through the mapper, isolating
//! per-record failures so the rest of the batch still maps.

use crate::conditions::{ConditionEvaluator, StandardConditions};
use crate::config::MapperConfig;
use crate::dispatcher::{DispatchContext, FieldDispatcher};
use crate::error::{MappingError, MappingResult};
use crate::instance::Instance;
use crate::legacy_id::extract_legacy_ids;
use crate::record::Record;
use crate::reference_data::ReferenceData;
use crate::report::MigrationReport;
use crate::resolvers::{
    assign_hrid, extract_language_candidates, filter_languages, resolve_instance_format_ids,
    IssuanceResolver, NumberingSequence,
};
use crate::validation::InstanceValidator;
use chrono::{SecondsFormat, Utc};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Report category for leader position 5 values.
pub const RECORD_STATUS: &str = "Record status (leader pos 5)";
/// Report category for populated instance attributes.
pub const MAPPED_ATTRIBUTES: &str = "Mapped instance attributes";
/// Report category for rejected records, by error kind.
pub const FAILED_RECORDS: &str = "Failed records";
/// Statistic counted when a legacy identifier is already mapped.
pub const DUPLICATE_LEGACY_ID: &str = "Duplicate legacy identifiers";
/// Statistic counted for every record handed to a run.
pub const RECORDS_PROCESSED: &str = "Records processed";
/// Statistic counted for every record accepted by a run.
pub const RECORDS_MAPPED: &str = "Records successfully mapped";

/// Value of the instance `source` attribute.
pub const INSTANCE_SOURCE: &str = "MARC";

const PROGRESS_INTERVAL: u64 = 1000;
const DEFAULT_BATCH: &str = "input";

/// Run-wide mapping from legacy identifier to instance id.
///
/// Append-only: the first instance to claim a legacy identifier keeps it.
#[derive(Debug, Default)]
pub struct IdentifierMap {
    entries: Mutex<IndexMap<String, String>>,
}

impl IdentifierMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Record an entry. Returns `false` if the legacy id was already mapped.
    pub fn insert(&self, legacy_id: impl Into<String>, instance_id: impl Into<String>) -> bool {
        let mut entries = self.lock();
        let legacy_id = legacy_id.into();
        if entries.contains_key(&legacy_id) {
            return false;
        }
        entries.insert(legacy_id, instance_id.into());
        true
    }

    /// Instance id for a legacy id
    #[must_use]
    pub fn get(&self, legacy_id: &str) -> Option<String> {
        self.lock().get(legacy_id).cloned()
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the map is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Render as `{legacy_id: {"id": instance_id}}`, in insertion order.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let object: Map<String, Value> = self
            .lock()
            .iter()
            .map(|(legacy_id, id)| (legacy_id.clone(), json!({ "id": id })))
            .collect();
        Value::Object(object)
    }
}

/// Maps bibliographic records to inventory instances.
///
/// Owns the run's shared state: the numbering sequence, the identifier map
/// and the migration report. All of it is reachable through `&self`, so one
/// mapper can serve several workers.
#[derive(Debug)]
pub struct BibsMapper<E = StandardConditions> {
    config: MapperConfig,
    reference_data: ReferenceData,
    conditions: E,
    dispatcher: FieldDispatcher,
    issuance: IssuanceResolver,
    sequence: NumberingSequence,
    id_map: IdentifierMap,
    report: MigrationReport,
}

impl BibsMapper<StandardConditions> {
    /// Create a mapper using the standard condition functions.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::ReferenceData`] if the reference data is
    /// unusable. Nothing has been mapped at that point.
    pub fn new(config: MapperConfig, reference_data: ReferenceData) -> MappingResult<Self> {
        Self::with_conditions(config, reference_data, StandardConditions::new())
    }
}

impl<E: ConditionEvaluator> BibsMapper<E> {
    /// Create a mapper with a custom condition registry.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::ReferenceData`] if the reference data is
    /// unusable.
    pub fn with_conditions(
        config: MapperConfig,
        reference_data: ReferenceData,
        conditions: E,
    ) -> MappingResult<Self> {
        reference_data.validate()?;
        let issuance = IssuanceResolver::new(&reference_data)?;
        let sequence =
            NumberingSequence::from_settings(&reference_data.hrid_settings.instances, config.hrid_width);
        info!(
            prefix = %reference_data.hrid_settings.instances.prefix,
            start = reference_data.hrid_settings.instances.start_number,
            rules = reference_data.mapping_rules.len(),
            "Mapper ready"
        );
        Ok(Self {
            config,
            reference_data,
            conditions,
            dispatcher: FieldDispatcher::new(),
            issuance,
            sequence,
            id_map: IdentifierMap::new(),
            report: MigrationReport::new(),
        })
    }

    /// Run configuration
    #[must_use]
    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Migration report accumulated so far
    #[must_use]
    pub fn report(&self) -> &MigrationReport {
        &self.report
    }

    /// Identifier map accumulated so far
    #[must_use]
    pub fn id_map(&self) -> &IdentifierMap {
        &self.id_map
    }

    /// Numbering sequence of the run
    #[must_use]
    pub fn sequence(&self) -> &NumberingSequence {
        &self.sequence
    }

    /// Map one record into an instance.
    ///
    /// On success the record's 001 holds the instance's human-readable
    /// identifier.
    ///
    /// # Errors
    ///
    /// Returns the per-record failure: a missing legacy identifier, a
    /// failing condition or a validation error. Report counts recorded
    /// before the failure stay.
    pub fn parse_bib(&self, record: &mut Record) -> MappingResult<Instance> {
        let legacy_ids = extract_legacy_ids(record, self.config.ils_flavour, &self.report)?;
        let mut instance = Instance::new();
        instance.set("id", Value::String(Uuid::new_v4().to_string()));
        instance.set("metadata", self.metadata());
        instance.set("source", Value::String(INSTANCE_SOURCE.to_string()));

        let status = record
            .leader
            .record_status()
            .map_or_else(|| "Missing".to_string(), |status| status.to_string());
        self.report.record(RECORD_STATUS, status);

        let context = DispatchContext {
            reference_data: &self.reference_data,
            conditions: &self.conditions,
            report: &self.report,
        };
        let outcome = self.dispatcher.dispatch(record, &mut instance, &context)?;
        if !outcome.unmapped_tags.is_empty() {
            debug!(?legacy_ids, tags = ?outcome.unmapped_tags, "Unmapped tags");
        }

        self.derive_attributes(&mut instance, outcome.type_snapshot, record, &legacy_ids);
        InstanceValidator::validate(&instance, &legacy_ids)?;

        assign_hrid(&mut instance, record, &self.sequence, &self.report);
        instance.set("discoverySuppress", Value::Bool(self.config.suppress));
        instance.set("staffSuppress", Value::Bool(self.config.suppress));

        instance.dedupe();
        for attribute in instance.populated_attributes() {
            self.report.record(MAPPED_ATTRIBUTES, attribute);
        }

        let instance_id = instance.id().unwrap_or_default().to_string();
        for legacy_id in &legacy_ids {
            if !self.id_map.insert(legacy_id.as_str(), instance_id.as_str()) {
                warn!(legacy_id = %legacy_id, "Legacy identifier already mapped");
                self.report.stat(DUPLICATE_LEGACY_ID);
            }
        }
        Ok(instance)
    }

    fn metadata(&self) -> Value {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        json!({
            "createdDate": now,
            "createdByUserId": self.reference_data.user_id,
            "updatedDate": now,
            "updatedByUserId": self.reference_data.user_id,
        })
    }

    /// Attributes the rule table cannot express.
    fn derive_attributes(
        &self,
        instance: &mut Instance,
        type_snapshot: Option<String>,
        record: &Record,
        legacy_ids: &[String],
    ) {
        let formats = resolve_instance_format_ids(record, &self.reference_data, &self.report);
        instance.set_strings("instanceFormatIds", formats);

        if instance.instance_type_id().is_none() {
            if let Some(snapshot) = type_snapshot {
                instance.set("instanceTypeId", Value::String(snapshot));
            }
        }

        let mode = self
            .issuance
            .resolve(&record.leader, &self.reference_data, &self.report);
        instance.set("modeOfIssuanceId", Value::String(mode));

        let mut languages = instance.strings("languages");
        languages.extend(extract_language_candidates(record));
        let languages = filter_languages(languages, &self.reference_data, &self.report, legacy_ids);
        instance.set_strings("languages", languages);
    }
}

/// A mapped record: the instance and the source record carrying its new 001.
#[derive(Debug, Clone)]
pub struct MappedRecord {
    /// Target instance
    pub instance: Instance,
    /// Source record after identifier write-back
    pub source: Record,
}

/// Where a rejected record sat in its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecord {
    /// Name of the batch (usually the file) the record came from
    pub source: String,
    /// Zero-based position within that batch
    pub position: u64,
    /// The record's 001, when it could be read
    pub control_number: Option<String>,
    /// Failure kind, as counted in the report
    pub kind: &'static str,
}

/// Drives a batch of records through a [`BibsMapper`].
///
/// # Examples
///
/// ```no_run
/// use bibmap::{BibsMapper, IlsFlavour, MapperConfig, MarcReader, MigrationRun, ReferenceData};
/// use std::fs::File;
///
/// # fn main() -> anyhow::Result<()> {
/// let reference_data = ReferenceData::from_path("reference_data.json")?;
/// let mapper = BibsMapper::new(MapperConfig::new(IlsFlavour::Sierra), reference_data)?;
/// let mut run = MigrationRun::new(mapper);
/// run.process_batch("records.mrc", MarcReader::new(File::open("records.mrc")?));
/// println!("{}", run.mapper().report().to_markdown());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MigrationRun<E = StandardConditions> {
    mapper: BibsMapper<E>,
    mapped: Vec<MappedRecord>,
    rejected: Vec<RejectedRecord>,
    batch: String,
    batch_position: u64,
    processed: u64,
    failed: u64,
    started: Instant,
}

impl<E: ConditionEvaluator> MigrationRun<E> {
    /// Start a run.
    #[must_use]
    pub fn new(mapper: BibsMapper<E>) -> Self {
        Self {
            mapper,
            mapped: Vec::new(),
            rejected: Vec::new(),
            batch: DEFAULT_BATCH.to_string(),
            batch_position: 0,
            processed: 0,
            failed: 0,
            started: Instant::now(),
        }
    }

    /// The mapper and its shared state
    #[must_use]
    pub fn mapper(&self) -> &BibsMapper<E> {
        &self.mapper
    }

    /// Records accepted so far, in input order
    #[must_use]
    pub fn mapped(&self) -> &[MappedRecord] {
        &self.mapped
    }

    /// Records that failed, with their place in the source batch
    #[must_use]
    pub fn rejected(&self) -> &[RejectedRecord] {
        &self.rejected
    }

    /// Number of records handed to the run
    #[must_use]
    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Number of rejected records
    #[must_use]
    pub fn failed(&self) -> u64 {
        self.failed
    }

    /// Map one record, or count and log its failure.
    ///
    /// Returns the error so callers can inspect it; the run itself has
    /// already accounted for it.
    pub fn process(&mut self, mut record: Record) -> MappingResult<()> {
        let position = self.advance();

        let result = match self.mapper.parse_bib(&mut record) {
            Ok(instance) => {
                self.mapper.report.stat(RECORDS_MAPPED);
                self.mapped.push(MappedRecord {
                    instance,
                    source: record,
                });
                Ok(())
            },
            Err(err) => {
                self.reject(position, record.control_number(), &err);
                Err(err)
            },
        };
        self.log_progress();
        result
    }

    /// Map every record of a source, skipping unreadable ones.
    ///
    /// Positions of rejected records are counted from the start of
    /// `records`, which is reported under the name `source`.
    pub fn process_batch<I>(&mut self, source: &str, records: I)
    where
        I: IntoIterator<Item = crate::error::Result<Record>>,
    {
        self.batch = source.to_string();
        self.batch_position = 0;
        for record in records {
            match record {
                Ok(record) => {
                    // Already counted and logged by `process`.
                    if let Err(err) = self.process(record) {
                        debug!(error = %err, "Continuing after rejected record");
                    }
                },
                Err(err) => {
                    let position = self.advance();
                    self.reject(position, None, &MappingError::from(err));
                    self.log_progress();
                },
            }
        }
    }

    /// [`MigrationRun::process_batch`] for a source with no name.
    pub fn process_all<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = crate::error::Result<Record>>,
    {
        self.process_batch(DEFAULT_BATCH, records);
    }

    fn advance(&mut self) -> u64 {
        let position = self.batch_position;
        self.batch_position += 1;
        self.processed += 1;
        self.mapper.report.stat(RECORDS_PROCESSED);
        position
    }

    fn reject(&mut self, position: u64, control_number: Option<&str>, err: &MappingError) {
        self.failed += 1;
        error!(
            source = %self.batch,
            position,
            control_number,
            error = %err,
            "Record rejected"
        );
        self.mapper.report.record(FAILED_RECORDS, err.kind());
        self.rejected.push(RejectedRecord {
            source: self.batch.clone(),
            position,
            control_number: control_number.map(str::to_string),
            kind: err.kind(),
        });
    }

    fn log_progress(&self) {
        if self.processed % PROGRESS_INTERVAL != 0 {
            return;
        }
        let elapsed = self.started.elapsed().as_secs_f64();
        #[allow(clippy::cast_precision_loss)]
        let rate = if elapsed > 0.0 {
            self.processed as f64 / elapsed
        } else {
            0.0
        };
        info!(
            processed = self.processed,
            failed = self.failed,
            records_per_second = rate,
            "Progress"
        );
    }

    /// End the run, returning the mapper and the accepted records.
    #[must_use]
    pub fn finish(self) -> (BibsMapper<E>, Vec<MappedRecord>) {
        info!(
            processed = self.processed,
            failed = self.failed,
            next_number = self.mapper.sequence().peek(),
            seconds = self.started.elapsed().as_secs(),
            "Run finished"
        );
        (self.mapper, self.mapped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IlsFlavour;
    use crate::leader::Leader;
    use crate::record::Field;
    use crate::reference_data::sample_reference_data;
    use crate::rules::RuleTable;

    fn mapper() -> BibsMapper {
        let mut data = sample_reference_data();
        data.mapping_rules = serde_json::from_value::<RuleTable>(json!({
            "245": [{"target": "title", "subfield": ["a"], "ignoreSubsequentFields": true,
                     "rules": [{"conditions": [{"type": "remove_ending_punc"}]}]}],
            "336": [{"target": "instanceTypeId", "subfield": ["b"],
                     "rules": [{"conditions": [{"type": "set_instance_type_id"}]}]}]
        }))
        .unwrap();
        BibsMapper::new(MapperConfig::new(IlsFlavour::Sierra), data).unwrap()
    }

    fn record(legacy_id: &str, title: Option<&str>) -> Record {
        let mut builder = Record::builder(Leader::new("00000cam a2200000 a 4500"))
            .control_field_str("001", "ocm1")
            .field(
                Field::builder("336".to_string(), ' ', ' ')
                    .subfield_str('b', "txt")
                    .build(),
            )
            .field(
                Field::builder("907".to_string(), ' ', ' ')
                    .subfield_str('a', legacy_id)
                    .build(),
            );
        if let Some(title) = title {
            builder = builder.field(
                Field::builder("245".to_string(), '1', '0')
                    .subfield_str('a', title)
                    .build(),
            );
        }
        builder.build()
    }

    #[test]
    fn test_parse_bib_builds_valid_instance() {
        let mapper = mapper();
        let mut source = record(".b1", Some("Title /"));
        let instance = mapper.parse_bib(&mut source).unwrap();

        assert_eq!(instance.title(), Some("Title"));
        assert_eq!(instance.instance_type_id(), Some("type-txt"));
        assert_eq!(instance.get_str("source"), Some("MARC"));
        assert_eq!(instance.get_str("modeOfIssuanceId"), Some("moi-single"));
        assert_eq!(instance.hrid(), Some("in00000000001"));
        assert_eq!(instance.get("discoverySuppress"), Some(&Value::Bool(false)));
        assert_eq!(source.control_number(), Some("in00000000001"));
        assert_eq!(mapper.id_map().get(".b1").as_deref(), instance.id());
        assert_eq!(mapper.report().count(RECORD_STATUS, "c"), 1);
        assert_eq!(mapper.report().count(MAPPED_ATTRIBUTES, "title"), 1);
    }

    #[test]
    fn test_rejected_record_takes_no_number() {
        let mapper = mapper();
        let err = mapper.parse_bib(&mut record(".b1", None)).unwrap_err();
        assert!(matches!(err, MappingError::Validation(_)));
        assert_eq!(mapper.sequence().peek(), 1);
        assert!(mapper.id_map().is_empty());
    }

    #[test]
    fn test_run_isolates_failures() {
        let mut run = MigrationRun::new(mapper());
        run.process_all(vec![
            Ok(record(".b1", Some("One"))),
            Ok(record(".b2", None)),
            Err(crate::error::MarcError::TruncatedRecord("eof".to_string())),
            Ok(record(".b3", Some("Three"))),
        ]);

        assert_eq!(run.processed(), 4);
        assert_eq!(run.failed(), 2);
        let hrids: Vec<&str> = run.mapped().iter().filter_map(|m| m.instance.hrid()).collect();
        assert_eq!(hrids, vec!["in00000000001", "in00000000002"]);

        let report = run.mapper().report();
        assert_eq!(report.count(FAILED_RECORDS, "Validation error"), 1);
        assert_eq!(report.count(FAILED_RECORDS, "Unreadable source record"), 1);
        assert_eq!(run.mapper().id_map().len(), 2);
    }

    #[test]
    fn test_rejections_keep_their_batch_position() {
        let mut run = MigrationRun::new(mapper());
        run.process_batch(
            "first.mrc",
            vec![Ok(record(".b1", Some("One"))), Ok(record(".b2", None))],
        );
        run.process_batch(
            "second.mrc",
            vec![
                Ok(record(".b3", Some("Three"))),
                Err(crate::error::MarcError::InvalidLeader("bad".to_string())),
                Ok(record(".b4", Some("Four"))),
            ],
        );

        assert_eq!(run.processed(), 5);
        assert_eq!(
            run.rejected(),
            &[
                RejectedRecord {
                    source: "first.mrc".to_string(),
                    position: 1,
                    control_number: Some("ocm1".to_string()),
                    kind: "Validation error",
                },
                RejectedRecord {
                    source: "second.mrc".to_string(),
                    position: 1,
                    control_number: None,
                    kind: "Unreadable source record",
                },
            ]
        );
    }

    #[test]
    fn test_binary_record_with_bad_leader_fails_alone() {
        use crate::reader::{encode_record, MarcReader, RecoveryMode};

        let mut bytes = Vec::new();
        let mut starts = Vec::new();
        let titles = [(".b1", "One"), (".b2", "Two"), (".b3", "Three"), (".b4", "Four")];
        for (legacy_id, title) in titles {
            starts.push(bytes.len());
            bytes.extend(encode_record(&record(legacy_id, Some(title))));
        }
        bytes[starts[1]] = b'X';

        let mut run = MigrationRun::new(mapper());
        run.process_batch(
            "records.mrc",
            MarcReader::new(std::io::Cursor::new(bytes)).with_recovery_mode(RecoveryMode::Lenient),
        );

        assert_eq!(run.processed(), 4);
        assert_eq!(run.failed(), 1);
        assert_eq!(run.mapped().len(), 3);
        assert_eq!(run.rejected()[0].position, 1);
    }

    #[test]
    fn test_duplicate_legacy_id_keeps_first_mapping() {
        let mapper = mapper();
        let first = mapper.parse_bib(&mut record(".b1", Some("One"))).unwrap();
        mapper.parse_bib(&mut record(".b1", Some("Again"))).unwrap();
        assert_eq!(mapper.id_map().get(".b1").as_deref(), first.id());
        assert_eq!(
            mapper.report().count(crate::report::GENERAL_STATISTICS, DUPLICATE_LEGACY_ID),
            1
        );
    }
}

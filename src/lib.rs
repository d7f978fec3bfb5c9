#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # bibmap: rule-driven MARC to inventory mapping
//!
//! Maps MARC bibliographic records into inventory instance records using a
//! rule table supplied as data, plus a handful of derived attributes the
//! rules cannot express (formats, mode of issuance, languages and
//! human-readable identifiers).
//!
//! ## Quick Start
//!
//! ```
//! use bibmap::{BibsMapper, Field, IlsFlavour, Leader, MapperConfig, Record, ReferenceData};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let reference_data = ReferenceData::from_json_str(r#"{
//!     "mappingRules": {
//!         "245": [{"target": "title", "subfield": ["a"],
//!                  "rules": [{"conditions": [{"type": "remove_ending_punc"}]}]}],
//!         "336": [{"target": "instanceTypeId", "subfield": ["b"],
//!                  "rules": [{"conditions": [{"type": "set_instance_type_id"}]}]}]
//!     },
//!     "modesOfIssuance": [{"id": "moi-1", "name": "unspecified"}],
//!     "instanceTypes": [{"id": "type-1", "code": "txt", "name": "text"}],
//!     "hridSettings": {"instances": {"prefix": "in", "startNumber": 1}}
//! }"#)?;
//! let mapper = BibsMapper::new(MapperConfig::new(IlsFlavour::Voyager), reference_data)?;
//!
//! let mut record = Record::builder(Leader::default())
//!     .control_field_str("001", "12345")
//!     .field(Field::builder("245".to_string(), '1', '0').subfield_str('a', "A title /").build())
//!     .field(Field::builder("336".to_string(), ' ', ' ').subfield_str('b', "txt").build())
//!     .build();
//!
//! let instance = mapper.parse_bib(&mut record)?;
//! assert_eq!(instance.title(), Some("A title"));
//! assert_eq!(instance.hrid(), Some("in00000000001"));
//! assert_eq!(record.control_number(), Some("in00000000001"));
//! assert_eq!(mapper.id_map().get("12345").as_deref(), instance.id());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`record`]: Source record structures (`Record`, `Field`, `Subfield`)
//! - [`reader`]: Reading ISO 2709 records from binary streams
//! - [`marcxml`]: Reading MARCXML records
//! - [`marcjson`]: MARC-in-JSON output for source record storage
//! - [`leader`]: Record leader with positional accessors
//! - [`reference_data`]: The reference data snapshot and its vocabularies
//! - [`config`]: Source system flavour and run options
//! - [`rules`]: The mapping rule table
//! - [`conditions`]: Condition functions invoked by rules
//! - [`legacy_id`]: Legacy identifier extraction
//! - [`dispatcher`]: The rule-driven field pass
//! - [`instance`]: The target instance record
//! - [`resolvers`]: Formats, mode of issuance, languages and identifiers
//! - [`validation`]: Required instance attributes
//! - [`mapper`]: The per-record mapping pass and batch driver
//! - [`report`]: The migration report
//! - [`sink`]: Output files of a run
//! - [`error`]: Error types and result types

pub mod conditions;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod instance;
pub mod leader;
pub mod legacy_id;
pub mod mapper;
pub mod marcjson;
pub mod marcxml;
pub mod reader;
/// Source record structures (`Record`, `Field`, `Subfield`)
pub mod record;
pub mod reference_data;
pub mod report;
pub mod resolvers;
pub mod rules;
pub mod sink;
pub mod validation;

pub use conditions::{ConditionContext, ConditionEvaluator, StandardConditions};
pub use config::{IlsFlavour, MapperConfig};
pub use dispatcher::{DispatchOutcome, FieldDispatcher};
pub use error::{MappingError, MappingResult, MarcError, Result};
pub use instance::Instance;
pub use leader::Leader;
pub use legacy_id::extract_legacy_ids;
pub use mapper::{BibsMapper, IdentifierMap, MappedRecord, MigrationRun, RejectedRecord};
pub use reader::{MarcReader, RecoveryMode};
pub use record::{ControlField, Field, FieldBuilder, Record, RecordBuilder, Subfield, VariableField};
pub use reference_data::ReferenceData;
pub use report::{MigrationReport, ReportSection};
pub use rules::{FieldMapping, RuleTable};
pub use validation::InstanceValidator;

//! Condition functions invoked by mapping rules.
//!
//! Rules name their value transformations by string. The dispatcher resolves
//! those names through a [`ConditionEvaluator`]; [`StandardConditions`] is the
//! registry covering the functions used by the shipped rule tables.
//!
//! Unknown function names are not fatal: they are counted under
//! [`UNMAPPED_CONDITIONS`] and the value passes through unchanged.

use crate::error::{MappingError, MappingResult};
use crate::record::Field;
use crate::reference_data::ReferenceData;
use crate::report::MigrationReport;
use serde_json::Value;
use tracing::debug;

/// Report category for condition names no evaluator recognises.
pub const UNMAPPED_CONDITIONS: &str = "Unmapped conditions";

/// Report category for resource type codes missing from the vocabulary.
pub const UNMAPPED_INSTANCE_TYPES: &str = "Unmapped instance type codes (336$b)";

/// Characters stripped by `remove_ending_punc`.
const ENDING_PUNCTUATION: &[char] = &['.', ';', ':', ',', '/', '+', '=', '-', ' '];

/// What a condition function may look at besides the value itself.
#[derive(Debug, Clone, Copy)]
pub struct ConditionContext<'a> {
    /// The source field being mapped
    pub field: &'a Field,
    /// Vocabularies for identifier lookups
    pub reference_data: &'a ReferenceData,
    /// Report for data-quality notes
    pub report: &'a MigrationReport,
}

/// A registry of named value transformations.
pub trait ConditionEvaluator {
    /// Apply the function `function` to `value`.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::Condition`] when the function rejects its
    /// input, which rejects the whole record.
    fn evaluate(
        &self,
        function: &str,
        value: &str,
        parameter: Option<&Value>,
        context: &ConditionContext<'_>,
    ) -> MappingResult<String>;
}

/// The default condition functions.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardConditions;

impl StandardConditions {
    /// Create the default registry.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ConditionEvaluator for StandardConditions {
    fn evaluate(
        &self,
        function: &str,
        value: &str,
        parameter: Option<&Value>,
        context: &ConditionContext<'_>,
    ) -> MappingResult<String> {
        match function {
            "trim" => Ok(value.trim().to_string()),
            "trim_period" => Ok(value.trim().trim_end_matches('.').to_string()),
            "remove_ending_punc" => Ok(remove_ending_punc(value).to_string()),
            "capitalize" => Ok(capitalize(value)),
            "char_select" => char_select(value, parameter),
            "remove_prefix_by_indicator" => Ok(remove_prefix_by_indicator(value, context.field)),
            "set_instance_type_id" => Ok(set_instance_type_id(value, context)),
            "set_identifier_type_id_by_name" => set_identifier_type_id_by_name(parameter, context),
            "set_contributor_name_type_id" => set_contributor_name_type_id(context),
            unknown => {
                debug!(condition = unknown, tag = %context.field.tag, "Unmapped condition");
                context.report.record(UNMAPPED_CONDITIONS, unknown);
                Ok(value.to_string())
            },
        }
    }
}

/// Strip trailing punctuation and spaces.
#[must_use]
pub fn remove_ending_punc(value: &str) -> &str {
    value.trim_end_matches(ENDING_PUNCTUATION)
}

/// Upper-case the first character and lower-case the rest.
#[must_use]
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn parameter_usize(parameter: Option<&Value>, key: &str) -> Option<usize> {
    parameter
        .and_then(|p| p.get(key))
        .and_then(Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
}

fn parameter_str<'a>(parameter: Option<&'a Value>, key: &str) -> Option<&'a str> {
    parameter.and_then(|p| p.get(key)).and_then(Value::as_str)
}

/// Character range `from..to` of the value (`to` defaults to the end).
fn char_select(value: &str, parameter: Option<&Value>) -> MappingResult<String> {
    let from = parameter_usize(parameter, "from").ok_or_else(|| MappingError::Condition {
        function: "char_select".to_string(),
        message: "parameter needs a numeric \"from\"".to_string(),
    })?;
    let selected = match parameter_usize(parameter, "to") {
        Some(to) => value
            .chars()
            .skip(from)
            .take(to.saturating_sub(from))
            .collect(),
        None => value.chars().skip(from).collect(),
    };
    Ok(selected)
}

/// Drop the number of leading non-filing characters given by indicator 2.
fn remove_prefix_by_indicator(value: &str, field: &Field) -> String {
    match field.indicator2.to_digit(10) {
        Some(skip) if skip > 0 => value.chars().skip(skip as usize).collect(),
        _ => value.to_string(),
    }
}

fn set_instance_type_id(value: &str, context: &ConditionContext<'_>) -> String {
    let code = value.trim();
    if let Some(id) = context.reference_data.instance_type_id(code) {
        return id.to_string();
    }
    if !code.is_empty() {
        context.report.record(UNMAPPED_INSTANCE_TYPES, code);
    }
    String::new()
}

fn set_identifier_type_id_by_name(
    parameter: Option<&Value>,
    context: &ConditionContext<'_>,
) -> MappingResult<String> {
    let name = parameter_str(parameter, "name").ok_or_else(|| MappingError::Condition {
        function: "set_identifier_type_id_by_name".to_string(),
        message: "parameter needs a \"name\"".to_string(),
    })?;
    context
        .reference_data
        .identifier_type_id(name)
        .map(str::to_string)
        .ok_or_else(|| MappingError::Condition {
            function: "set_identifier_type_id_by_name".to_string(),
            message: format!("no identifier type named {name}"),
        })
}

fn set_contributor_name_type_id(context: &ConditionContext<'_>) -> MappingResult<String> {
    let name = match context.field.tag.get(1..) {
        Some("00") => "Personal name",
        Some("10") => "Corporate name",
        Some("11") => "Meeting name",
        _ => {
            return Err(MappingError::Condition {
                function: "set_contributor_name_type_id".to_string(),
                message: format!("tag {} names no contributor type", context.field.tag),
            })
        },
    };
    context
        .reference_data
        .contributor_name_type_id(name)
        .map(str::to_string)
        .ok_or_else(|| MappingError::Condition {
            function: "set_contributor_name_type_id".to_string(),
            message: format!("no contributor name type named {name}"),
        })
}

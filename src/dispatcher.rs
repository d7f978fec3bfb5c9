//! Rule-driven field mapping.
//!
//! [`FieldDispatcher`] walks a record's fields in source order and applies
//! the rule table to each one. The dispatcher knows nothing about particular
//! tags: every tag/rule association comes from the
//! [`RuleTable`](crate::rules::RuleTable). The one built-in exception is the
//! general information field (008), which is never reported as unmapped and
//! whose position in the pass marks the type classification snapshot used as
//! a fallback later on.

use crate::conditions::{ConditionContext, ConditionEvaluator};
use crate::error::MappingResult;
use crate::instance::{insert_nested, Instance};
use crate::record::{Field, Record, VariableField};
use crate::reference_data::ReferenceData;
use crate::report::MigrationReport;
use crate::rules::{FieldMapping, MappingRule};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Statistic counted for every field of every record.
pub const TAGS_PROCESSED: &str = "Total number of Tags processed";
/// Report category for tags that are not three digits.
pub const NON_NUMERIC_TAGS: &str = "Non-numeric tags in records";
/// Report category for tags with mapping rules.
pub const MAPPED_TAGS: &str = "Mapped MARC fields";
/// Report category for tags without mapping rules.
pub const UNMAPPED_TAGS: &str = "Unmapped MARC fields";
/// Report category for repeated tags skipped after their first occurrence.
pub const SUPPRESSED_TAGS: &str = "Suppressed subsequent MARC fields";

/// General information field; whitelisted and used for the type snapshot.
pub const GENERAL_INFORMATION_TAG: &str = "008";

/// What the field pass observed besides the instance it populated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Tags without rules, one entry per occurrence
    pub unmapped_tags: Vec<String>,
    /// Tags skipped because an earlier occurrence suppressed them
    pub suppressed_tags: Vec<String>,
    /// Type classification assigned when the pass reached the 008 field
    pub type_snapshot: Option<String>,
}

/// Shared collaborators of one mapping pass.
#[derive(Debug)]
pub struct DispatchContext<'a, E: ?Sized> {
    /// Reference data holding the rule table
    pub reference_data: &'a ReferenceData,
    /// Condition registry
    pub conditions: &'a E,
    /// Run report
    pub report: &'a MigrationReport,
}

/// Applies the rule table to records.
///
/// Holds the only run-wide state of the pass: the set of non-numeric tags
/// already reported, so each is reported once per run.
#[derive(Debug, Default)]
pub struct FieldDispatcher {
    reported_non_numeric: Mutex<HashSet<String>>,
}

impl FieldDispatcher {
    /// Create a dispatcher with no tags reported yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Map every field of `record` into `instance`.
    ///
    /// # Errors
    ///
    /// Propagates a failing condition function, which rejects the record.
    pub fn dispatch<E: ConditionEvaluator + ?Sized>(
        &self,
        record: &Record,
        instance: &mut Instance,
        context: &DispatchContext<'_, E>,
    ) -> MappingResult<DispatchOutcome> {
        let rules = &context.reference_data.mapping_rules;
        let mut outcome = DispatchOutcome::default();
        let mut ignored_subsequent: HashSet<&str> = HashSet::new();

        for field in record.fields() {
            let tag = field.tag();
            context.report.stat(TAGS_PROCESSED);

            if !tag.chars().all(|c| c.is_ascii_digit()) && tag != "LDR" {
                self.report_non_numeric(tag, context.report);
            }

            match rules.get(tag) {
                None => {
                    if tag != GENERAL_INFORMATION_TAG {
                        context.report.record(UNMAPPED_TAGS, tag);
                        outcome.unmapped_tags.push(tag.to_string());
                    }
                },
                Some(_) if ignored_subsequent.contains(tag) => {
                    debug!(tag, "Skipping subsequent occurrence");
                    context.report.record(SUPPRESSED_TAGS, tag);
                    outcome.suppressed_tags.push(tag.to_string());
                },
                Some(mappings) => {
                    context.report.record(MAPPED_TAGS, tag);
                    map_field(field, mappings, instance, context)?;
                    if mappings.iter().any(|m| m.ignore_subsequent_fields) {
                        ignored_subsequent.insert(tag);
                    }
                },
            }

            if tag == GENERAL_INFORMATION_TAG {
                outcome.type_snapshot = instance.instance_type_id().map(str::to_string);
            }
        }

        Ok(outcome)
    }

    fn report_non_numeric(&self, tag: &str, report: &MigrationReport) {
        let newly_seen = self
            .reported_non_numeric
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(tag.to_string());
        if newly_seen {
            warn!(tag, "Non-numeric tag in source records");
            report.record(NON_NUMERIC_TAGS, tag);
        }
    }
}

// Control fields are presented to conditions as a field without
// indicators or subfields.
fn map_field<E: ConditionEvaluator + ?Sized>(
    field: &VariableField,
    mappings: &[FieldMapping],
    instance: &mut Instance,
    context: &DispatchContext<'_, E>,
) -> MappingResult<()> {
    let placeholder;
    let data_field = match field {
        VariableField::Data(data) => data,
        VariableField::Control(control) => {
            placeholder = Field::new(control.tag.clone(), ' ', ' ');
            &placeholder
        },
    };
    let condition_context = ConditionContext {
        field: data_field,
        reference_data: context.reference_data,
        report: context.report,
    };

    for mapping in mappings {
        if mapping.entity.is_empty() {
            map_simple(field, mapping, instance, context, &condition_context)?;
        } else {
            map_entity(field, mapping, instance, context, &condition_context)?;
        }
    }
    Ok(())
}

fn map_simple<E: ConditionEvaluator + ?Sized>(
    field: &VariableField,
    mapping: &FieldMapping,
    instance: &mut Instance,
    context: &DispatchContext<'_, E>,
    condition_context: &ConditionContext<'_>,
) -> MappingResult<()> {
    let (Some(target), Some(root)) = (mapping.target.as_deref(), mapping.root_attribute()) else {
        return Ok(());
    };
    let multi_valued = context.reference_data.is_list_attribute(root);
    for value in selected_values(field, mapping) {
        let mapped = apply_rules(&mapping.rules, &value, context.conditions, condition_context)?;
        instance.write_path(target, &mapped, multi_valued);
    }
    Ok(())
}

/// Build entity objects from the sub-mappings and write them under their
/// shared root attribute.
fn map_entity<E: ConditionEvaluator + ?Sized>(
    field: &VariableField,
    mapping: &FieldMapping,
    instance: &mut Instance,
    context: &DispatchContext<'_, E>,
    condition_context: &ConditionContext<'_>,
) -> MappingResult<()> {
    let Some(root) = mapping.entity.iter().find_map(FieldMapping::root_attribute) else {
        return Ok(());
    };

    // Per sub-mapping: the mapping, its leaf path and the values it read.
    let parts: Vec<(&FieldMapping, &str, Vec<String>)> = mapping
        .entity
        .iter()
        .filter_map(|sub| {
            let target = sub.target.as_deref()?;
            let leaf = target.split_once('.').map_or(target, |(_, leaf)| leaf);
            let values = if mapping.entity_per_repeated_subfield {
                each_subfield(field, sub)
            } else {
                vec![joined_value(field, sub)]
            };
            Some((sub, leaf, values))
        })
        .collect();

    let occurrences = parts.iter().map(|(_, _, values)| values.len()).max().unwrap_or(0);
    let multi_valued = context.reference_data.is_list_attribute(root);

    for index in 0..occurrences {
        let mut object = Map::new();
        for (sub, leaf, values) in &parts {
            // A sub-mapping that read a single value shares it with every occurrence.
            let raw = values.get(index).or_else(|| values.first().filter(|_| values.len() == 1));
            let Some(raw) = raw else { continue };
            let mapped = apply_rules(&sub.rules, raw, context.conditions, condition_context)?;
            if !mapped.is_empty() {
                insert_nested(&mut object, leaf, &mapped);
            }
        }
        if object.is_empty() {
            continue;
        }
        if multi_valued {
            instance.append(root, Value::Object(object));
        } else {
            for (leaf, value) in object {
                if let Some(value) = value.as_str() {
                    instance.write_path(&format!("{root}.{leaf}"), value, false);
                }
            }
        }
    }
    Ok(())
}

/// Values a simple mapping reads: the whole field, the joined subfields, or
/// each subfield separately.
fn selected_values(field: &VariableField, mapping: &FieldMapping) -> Vec<String> {
    if mapping.subfield.is_empty() || mapping.apply_rules_on_concatenated_data {
        return vec![joined_value(field, mapping)];
    }
    each_subfield(field, mapping)
}

fn joined_value(field: &VariableField, mapping: &FieldMapping) -> String {
    match field {
        VariableField::Control(control) => control.data.clone(),
        VariableField::Data(data) if mapping.subfield.is_empty() => data.value(),
        VariableField::Data(data) => data.get_subfields(&mapping.subfield).join(" "),
    }
}

fn each_subfield(field: &VariableField, mapping: &FieldMapping) -> Vec<String> {
    match field {
        VariableField::Control(control) => vec![control.data.clone()],
        VariableField::Data(_) if mapping.subfield.is_empty() => vec![joined_value(field, mapping)],
        VariableField::Data(data) => data
            .get_subfields(&mapping.subfield)
            .into_iter()
            .map(str::to_string)
            .collect(),
    }
}

/// Run the rules in order; the first one producing a non-empty value wins.
///
/// A mapping without rules passes the value through. A rule carrying a
/// constant emits it once its conditions yield something.
fn apply_rules<E: ConditionEvaluator + ?Sized>(
    rules: &[MappingRule],
    value: &str,
    conditions: &E,
    context: &ConditionContext<'_>,
) -> MappingResult<String> {
    if rules.is_empty() {
        return Ok(value.to_string());
    }
    for rule in rules {
        let mut current = value.to_string();
        for condition in &rule.conditions {
            for function in condition.functions() {
                current = conditions.evaluate(function, &current, condition.parameter.as_ref(), context)?;
            }
        }
        if !current.is_empty() {
            return Ok(rule.value.clone().unwrap_or(current));
        }
    }
    Ok(String::new())
}

//! The mapping engine: drives the per-tag rules over a record's fields and
//! owns the run statistics.

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use marcmig_model::{
    MapError, MappingRule, Result, RuleSet, Schema, SourceField, SourceRecord,
};
use marcmig_transform::TransformRegistry;

use crate::entity::{self, AdmissionPolicy, is_truthy};
use crate::evaluate::{self, RuleKind};
use crate::path;
use crate::report::{MigrationReport, topic};

/// Subfield code linking a field to the tag whose rules it borrows.
const LINK_SUBFIELD: char = '6';
/// Leading link-value characters naming the linked tag.
const LINK_DIGITS: usize = 3;

/// Maps source records into schema-conformant destination records.
///
/// One engine maps one record at a time; the schema, rule set, and transform
/// registry are read-only, and the per-run [`MigrationReport`] is the only
/// mutable state. For parallel batch processing, give each worker its own
/// engine and merge the finalized reports.
///
/// # Example
///
/// ```ignore
/// use marcmig_map::MappingEngine;
///
/// let mut engine = MappingEngine::new(schema, rules, TransformRegistry::with_defaults());
/// let destination = engine.map_record(&record)?;
/// let report = engine.finalize();
/// ```
#[derive(Debug)]
pub struct MappingEngine {
    schema: Schema,
    rules: RuleSet,
    registry: TransformRegistry,
    policy: AdmissionPolicy,
    required_properties: Vec<String>,
    report: MigrationReport,
}

impl MappingEngine {
    pub fn new(schema: Schema, rules: RuleSet, registry: TransformRegistry) -> Self {
        Self {
            schema,
            rules,
            registry,
            policy: AdmissionPolicy::default(),
            required_properties: Vec::new(),
            report: MigrationReport::new(),
        }
    }

    /// Replace the entity admission policy.
    pub fn with_policy(mut self, policy: AdmissionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Properties that must be present and non-empty after mapping; a record
    /// missing one fails with the recoverable data-quality error.
    pub fn with_required_properties<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_properties = properties.into_iter().map(Into::into).collect();
        self
    }

    /// The statistics accumulated so far.
    pub fn report(&self) -> &MigrationReport {
        &self.report
    }

    /// Consume the engine, yielding the run statistics.
    pub fn finalize(self) -> MigrationReport {
        self.report
    }

    /// Map one source record into a destination record.
    ///
    /// Single pass over the fields in source order. The returned record is
    /// schema-shaped, deduplicated, and owned by the caller.
    pub fn map_record(&mut self, record: &SourceRecord) -> Result<Map<String, Value>> {
        let Self {
            schema,
            rules,
            registry,
            policy,
            required_properties,
            report,
        } = self;

        let mut destination = Map::new();
        let mut suppressed_tags: BTreeSet<String> = BTreeSet::new();
        let mut noted_tags: BTreeSet<String> = BTreeSet::new();
        report.record_processed();

        for field in &record.fields {
            note_non_numeric_tag(field, &mut noted_tags, report);

            if suppressed_tags.contains(&field.tag) {
                report.record_source(&field.tag, true, false, true);
                continue;
            }
            if rules.rules_for(&field.tag).is_none() {
                report.record_source(&field.tag, true, false, true);
                continue;
            }
            report.record_source(&field.tag, true, true, false);

            let Some(tag_rules) = resolve_rules(rules, field, report) else {
                report.add_diagnostic(topic::UNMAPPED_TAG, field.tag.clone());
                continue;
            };
            apply_field_rules(
                field,
                tag_rules,
                schema,
                registry,
                policy,
                report,
                &mut destination,
            )?;
            if tag_rules.iter().any(|rule| rule.ignore_subsequent_fields) {
                suppressed_tags.insert(field.tag.clone());
            }
        }

        for property in required_properties.iter() {
            if !destination.get(property).is_some_and(is_truthy) {
                return Err(MapError::CriticalData {
                    message: format!("required property {property:?} is missing or empty"),
                });
            }
        }

        dedupe_lists(&mut destination);

        for name in schema.properties().keys() {
            match destination.get(name) {
                Some(value) => report.record_destination(name, true, !is_truthy(value)),
                None => report.record_destination(name, false, false),
            }
        }

        Ok(destination)
    }
}

/// The rules a field is mapped with: its own tag's, or, for a linking field
/// carrying a link subfield, the rules of the tag its leading link digits
/// name.
fn resolve_rules<'r>(
    rules: &'r RuleSet,
    field: &SourceField,
    report: &mut MigrationReport,
) -> Option<&'r [MappingRule]> {
    let tag_rules = rules.rules_for(&field.tag)?;
    let Some(proxy) = tag_rules
        .first()
        .filter(|rule| !rule.field_replacement_rule.is_empty())
    else {
        return Some(tag_rules);
    };
    let link = field.first_subfield(LINK_SUBFIELD)?;
    let digits: String = link.chars().take(LINK_DIGITS).collect();
    let replacement = proxy
        .field_replacement_rule
        .iter()
        .find(|entry| entry.source_digits == digits)?;
    debug!(tag = %field.tag, replacement = %replacement.target_field, "linked field replacement");
    report.add_diagnostic(
        topic::LINKED_FIELD,
        format!("{digits} -> {}", replacement.target_field),
    );
    rules.rules_for(&replacement.target_field)
}

fn note_non_numeric_tag(
    field: &SourceField,
    noted: &mut BTreeSet<String>,
    report: &mut MigrationReport,
) {
    let numeric = !field.tag.is_empty() && field.tag.chars().all(|c| c.is_ascii_digit());
    if !numeric && field.tag != "LDR" && noted.insert(field.tag.clone()) {
        report.add_diagnostic(topic::NON_NUMERIC_TAG, field.tag.clone());
    }
}

fn apply_field_rules(
    field: &SourceField,
    tag_rules: &[MappingRule],
    schema: &Schema,
    registry: &TransformRegistry,
    policy: &AdmissionPolicy,
    report: &mut MigrationReport,
    destination: &mut Map<String, Value>,
) -> Result<()> {
    for rule in tag_rules {
        if rule.is_entity() {
            apply_entity_rule(field, rule, schema, registry, policy, report, destination)?;
        } else {
            let kind = RuleKind::classify(&field.tag, rule);
            let values = evaluate::evaluate(field, rule, kind, registry)?;
            if values.is_empty() {
                continue;
            }
            path::write_values(destination, schema, &rule.target, &values)?;
        }
    }
    Ok(())
}

fn apply_entity_rule(
    field: &SourceField,
    rule: &MappingRule,
    schema: &Schema,
    registry: &TransformRegistry,
    policy: &AdmissionPolicy,
    report: &mut MigrationReport,
    destination: &mut Map<String, Value>,
) -> Result<()> {
    let entities = entity::build(
        field,
        &rule.entity,
        rule.entity_per_repeated_subfield,
        registry,
    )?;
    let parent = entity::parent_key(&rule.entity);
    for built in entities {
        if policy.admits(parent, &built) {
            path::append_entity(destination, schema, parent, built.into_value())?;
        } else {
            warn!(tag = %field.tag, parent, "entity rejected by admission policy");
            let codes: Vec<String> = field
                .subfields
                .iter()
                .map(|sf| sf.code.to_string())
                .collect();
            report.add_diagnostic(
                topic::INCOMPLETE_ENTITY,
                format!(
                    "{} {} --- {} {}",
                    field.tag,
                    codes.join(" - "),
                    parent,
                    built.truthiness_pattern()
                ),
            );
        }
    }
    Ok(())
}

/// Remove duplicate elements from every list-valued top-level property,
/// preserving first occurrence. Idempotent: a second pass is a no-op.
pub fn dedupe_lists(record: &mut Map<String, Value>) {
    for value in record.values_mut() {
        if let Value::Array(items) = value {
            let taken = std::mem::take(items);
            for item in taken {
                if !items.contains(&item) {
                    items.push(item);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let mut record = Map::new();
        record.insert(
            "subjects".to_string(),
            json!(["art", "history", "art", "maps"]),
        );
        record.insert(
            "contributors".to_string(),
            json!([{ "name": "Smith" }, { "name": "Smith" }]),
        );
        record.insert("title".to_string(), json!("unchanged"));

        dedupe_lists(&mut record);
        assert_eq!(record["subjects"], json!(["art", "history", "maps"]));
        assert_eq!(record["contributors"], json!([{ "name": "Smith" }]));
        assert_eq!(record["title"], json!("unchanged"));

        let before = record.clone();
        dedupe_lists(&mut record);
        assert_eq!(record, before);
    }
}

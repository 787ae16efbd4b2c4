//! Rule evaluation: one field plus one rule yields zero or more values.

use std::collections::BTreeSet;

use serde_json::Value;

use marcmig_model::{MappingRule, Result, SourceField};
use marcmig_transform::{Parameter, TransformRegistry};

/// Width of the fixed-size chunks produced under `subFieldSplit`.
const SPLIT_WIDTH: usize = 3;

/// Tag carrying genre/form headings, whose mapped values get a label prefix.
const GENRE_FORM_TAG: &str = "655";
/// Label prefixed to genre/form heading values.
const GENRE_LABEL: &str = "Genre: ";

/// How a rule applies to a field.
///
/// Classification happens once per (tag, rule) pair, keeping the set of rule
/// behaviors closed and exhaustively matchable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// The rule carries a literal value; field content is ignored.
    Constant,
    /// The rule names a transformation chain over the selected subfields.
    Transform,
    /// Transformation chain whose first produced value gets the genre/form
    /// label prefix.
    LabeledTransform,
    /// No conditions and no constant: the selected subfields are joined
    /// as-is.
    RawJoin,
}

impl RuleKind {
    /// Classify how `rule` applies to fields carrying `tag`.
    pub fn classify(tag: &str, rule: &MappingRule) -> Self {
        if rule.has_conditions() {
            if tag == GENRE_FORM_TAG {
                Self::LabeledTransform
            } else {
                Self::Transform
            }
        } else if rule.constant_value().is_some() {
            Self::Constant
        } else {
            Self::RawJoin
        }
    }

    /// Classify an entity member rule. Member values never take the
    /// genre/form label.
    pub fn classify_member(rule: &MappingRule) -> Self {
        if rule.has_conditions() {
            Self::Transform
        } else if rule.constant_value().is_some() {
            Self::Constant
        } else {
            Self::RawJoin
        }
    }
}

/// Evaluate `rule` against `field`, yielding the produced values.
///
/// Pure over its inputs: statistics are recorded by the caller.
pub fn evaluate(
    field: &SourceField,
    rule: &MappingRule,
    kind: RuleKind,
    registry: &TransformRegistry,
) -> Result<Vec<Value>> {
    match kind {
        RuleKind::Constant => Ok(vec![constant_value(rule)]),
        RuleKind::Transform => {
            let text = transformed_text(field, rule, registry)?;
            Ok(split_or_single(rule, text))
        }
        RuleKind::LabeledTransform => {
            let text = transformed_text(field, rule, registry)?;
            let mut values = split_or_single(rule, text);
            if let Some(Value::String(first)) = values.first_mut() {
                *first = format!("{GENRE_LABEL}{first}");
            }
            Ok(values)
        }
        RuleKind::RawJoin => {
            let text = if rule.subfield.is_empty() {
                field.format_field()
            } else {
                field.subfield_values(&rule.subfield).join(" ")
            };
            Ok(split_or_single(rule, text))
        }
    }
}

/// Literal rule values `"true"`/`"false"` become booleans; anything else
/// passes through as a string.
fn constant_value(rule: &MappingRule) -> Value {
    match rule.constant_value().unwrap_or_default() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        other => Value::String(other.to_string()),
    }
}

fn transformed_text(
    field: &SourceField,
    rule: &MappingRule,
    registry: &TransformRegistry,
) -> Result<String> {
    let Some(condition) = rule.rules.first().and_then(|step| step.conditions.first()) else {
        // Classification guarantees a condition; an empty chain degrades to
        // the untransformed join.
        return Ok(field.subfield_values(&rule.subfield).join(" "));
    };
    let kinds = condition.kinds();
    let parameter: &Parameter = &condition.parameter;

    if rule.apply_rules_on_concatenated_data {
        let joined = field.subfield_values(&rule.subfield).join(" ");
        return registry.invoke_chain(&kinds, &joined, parameter, field);
    }
    if rule.subfield.is_empty() {
        let text = field.format_field();
        return registry.invoke_chain(&kinds, &text, parameter, field);
    }
    if rule.ignore_subsequent_fields {
        // First occurrence of each selected code, transformed one by one.
        let mut parts = Vec::with_capacity(rule.subfield.len());
        for code in &rule.subfield {
            let raw = field.first_subfield(*code).unwrap_or("");
            parts.push(registry.invoke_chain(&kinds, raw, parameter, field)?);
        }
        return Ok(parts.join(" "));
    }
    // All occurrences of all selected codes, transformed and deduplicated
    // keeping first-seen order.
    let mut seen = BTreeSet::new();
    let mut parts = Vec::new();
    for raw in field.subfield_values(&rule.subfield) {
        let transformed = registry.invoke_chain(&kinds, raw, parameter, field)?;
        if seen.insert(transformed.clone()) {
            parts.push(transformed);
        }
    }
    Ok(parts.join(" "))
}

/// Under `subFieldSplit`, break the text into fixed-width chunks, one
/// produced value per chunk; otherwise a single value.
fn split_or_single(rule: &MappingRule, text: String) -> Vec<Value> {
    if !rule.sub_field_split {
        return vec![Value::String(text)];
    }
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(SPLIT_WIDTH)
        .map(|chunk| Value::String(chunk.iter().collect()))
        .collect()
}

//! Declarative mapping rules, deserialized from the per-tag rule document.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{MapError, Result};

/// A named transformation step with its parameters.
///
/// The `type` key of the document may carry several comma-separated
/// transformation names; they are applied in order to the same value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Condition {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub parameter: Map<String, Value>,
}

impl Condition {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            parameter: Map::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.parameter.insert(key.into(), value);
        self
    }

    /// The individual transformation names, split on commas and trimmed.
    pub fn kinds(&self) -> Vec<&str> {
        self.kind
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .collect()
    }
}

/// One step of a rule: a transformation chain, a constant value, or neither.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleStep {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub value: String,
}

impl RuleStep {
    /// The literal value this step writes, if any. Rule documents use an
    /// empty string to mean "no constant".
    pub fn constant(&self) -> Option<&str> {
        if self.value.is_empty() {
            None
        } else {
            Some(&self.value)
        }
    }
}

/// Linked-field replacement: a field whose link subfield starts with
/// `source_digits` is mapped with the rules of `target_field`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReplacement {
    pub source_digits: String,
    pub target_field: String,
}

/// Declarative instruction mapping a field (or its sub-elements) to a
/// destination path.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MappingRule {
    /// Dotted destination path, e.g. `contributors.name`.
    pub target: String,
    /// Subfield codes this rule selects; empty means the whole field.
    pub subfield: Vec<char>,
    /// Rule steps; only the first step is consulted.
    pub rules: Vec<RuleStep>,
    /// Child rules building grouped array elements. Mutually exclusive with
    /// plain `target` handling.
    pub entity: Vec<MappingRule>,
    /// Build one entity per repeated (code, value) pair instead of one per
    /// field.
    pub entity_per_repeated_subfield: bool,
    /// Join the selected subfields before transforming, instead of
    /// transforming each value separately.
    pub apply_rules_on_concatenated_data: bool,
    /// Take only the first occurrence of each selected code, and suppress
    /// later fields with the same tag within one record.
    pub ignore_subsequent_fields: bool,
    /// Split the produced value into fixed-width chunks (encoded fixed-field
    /// data).
    pub sub_field_split: bool,
    /// Linked-field proxy mapping table, carried by the rule entry of the
    /// linking tag.
    pub field_replacement_rule: Vec<FieldReplacement>,
}

impl MappingRule {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }

    /// Whether the first rule step names a transformation chain.
    pub fn has_conditions(&self) -> bool {
        self.rules
            .first()
            .is_some_and(|step| !step.conditions.is_empty())
    }

    /// The constant value of the first rule step, if any.
    pub fn constant_value(&self) -> Option<&str> {
        self.rules.first().and_then(RuleStep::constant)
    }

    /// Whether this rule builds grouped array elements.
    pub fn is_entity(&self) -> bool {
        !self.entity.is_empty()
    }

    /// Last segment of the target path: the property the value lands in.
    pub fn leaf_property(&self) -> &str {
        self.target.rsplit('.').next().unwrap_or("")
    }

    /// First segment of the target path.
    pub fn parent_property(&self) -> &str {
        self.target.split('.').next().unwrap_or("")
    }
}

/// Per-tag mapping rules in document order.
///
/// Rule order within a tag decides which destination array row absorbs which
/// value when arrays of objects are grown incrementally.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    rules: BTreeMap<String, Vec<MappingRule>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deserialize a rule set from its nested key-value document.
    pub fn from_json(doc: Value) -> Result<Self> {
        serde_json::from_value(doc).map_err(|source| MapError::RuleDocument { source })
    }

    /// Deserialize a rule set from document text.
    pub fn from_json_str(doc: &str) -> Result<Self> {
        serde_json::from_str(doc).map_err(|source| MapError::RuleDocument { source })
    }

    pub fn insert(&mut self, tag: impl Into<String>, rules: Vec<MappingRule>) {
        self.rules.insert(tag.into(), rules);
    }

    /// The ordered rules for `tag`, if the tag is mapped at all.
    pub fn rules_for(&self, tag: &str) -> Option<&[MappingRule]> {
        self.rules.get(tag).map(Vec::as_slice)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

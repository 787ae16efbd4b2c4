//! Entity construction: grouping a field's subfields into array elements.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use marcmig_model::{MappingRule, Result, SourceField};
use marcmig_transform::TransformRegistry;

use crate::evaluate::{self, RuleKind};

/// One constructed element destined for an array target.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    /// The usual case: a flat key → value map, one destination array row.
    Object(Map<String, Value>),
    /// A member rule targeting the parent key itself collapses the entity to
    /// a single scalar array element.
    Scalar(Value),
}

impl Entity {
    pub fn into_value(self) -> Value {
        match self {
            Self::Object(map) => Value::Object(map),
            Self::Scalar(value) => value,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Object(map) => map.is_empty(),
            Self::Scalar(value) => !is_truthy(value),
        }
    }

    /// Per-key truthiness pattern, used in the diagnostic counter for
    /// rejected entities.
    pub fn truthiness_pattern(&self) -> String {
        match self {
            Self::Object(map) => {
                let parts: Vec<String> = map
                    .iter()
                    .map(|(key, value)| format!("{key}:{}", is_truthy(value)))
                    .collect();
                parts.join(" - ")
            }
            Self::Scalar(value) => is_truthy(value).to_string(),
        }
    }
}

/// The array property all member rules write under: the first segment of the
/// first member's target.
pub fn parent_key(member_rules: &[MappingRule]) -> &str {
    member_rules
        .first()
        .map(MappingRule::parent_property)
        .unwrap_or("")
}

/// Build the entities `field` produces under `member_rules`.
///
/// With `per_repeated_subfield`, each (code, value) pair becomes its own
/// temporary single-subfield field (same tag, same indicators) and yields
/// its own entity. Otherwise the whole field yields exactly one entity.
pub fn build(
    field: &SourceField,
    member_rules: &[MappingRule],
    per_repeated_subfield: bool,
    registry: &TransformRegistry,
) -> Result<Vec<Entity>> {
    let parent = parent_key(member_rules);
    if !per_repeated_subfield {
        return Ok(vec![build_one(field, member_rules, parent, registry)?]);
    }
    let mut entities = Vec::with_capacity(field.subfields.len());
    for subfield in &field.subfields {
        let synthesized = SourceField {
            tag: field.tag.clone(),
            indicators: field.indicators,
            subfields: vec![subfield.clone()],
        };
        entities.push(build_one(&synthesized, member_rules, parent, registry)?);
    }
    Ok(entities)
}

fn build_one(
    field: &SourceField,
    member_rules: &[MappingRule],
    parent: &str,
    registry: &TransformRegistry,
) -> Result<Entity> {
    let mut map = Map::new();
    for rule in member_rules {
        let kind = RuleKind::classify_member(rule);
        let values = evaluate::evaluate(field, rule, kind, registry)?;
        let Some(first) = values.into_iter().next() else {
            continue;
        };
        let key = rule.leaf_property();
        if key == parent {
            // The member maps the parent itself: the entity is that value.
            return Ok(Entity::Scalar(first));
        }
        map.insert(key.to_string(), first);
    }
    Ok(Entity::Object(map))
}

/// Decides whether a built entity is written to the record or only counted
/// as incomplete.
#[derive(Debug, Clone)]
pub struct AdmissionPolicy {
    /// Keys whose falsy values never block admission: flags and
    /// identifier-presence markers.
    pub exempt_keys: BTreeSet<String>,
    /// Parent properties whose entities are always admitted.
    pub always_admit: BTreeSet<String>,
    /// Parent-property prefix of the statement family, admitted when any
    /// value is truthy.
    pub statement_prefix: String,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self {
            exempt_keys: ["staffOnly", "primary", "isbnValue", "issnValue"]
                .into_iter()
                .map(String::from)
                .collect(),
            always_admit: ["electronicAccess", "publication"]
                .into_iter()
                .map(String::from)
                .collect(),
            statement_prefix: "holdingsStatements".to_string(),
        }
    }
}

impl AdmissionPolicy {
    /// Whether `entity` under `parent` may be appended to the record.
    /// Empty entities are never admitted.
    pub fn admits(&self, parent: &str, entity: &Entity) -> bool {
        if entity.is_empty() {
            return false;
        }
        if self.always_admit.contains(parent) {
            return true;
        }
        match entity {
            Entity::Scalar(value) => is_truthy(value),
            Entity::Object(map) => {
                if parent.starts_with(&self.statement_prefix) {
                    map.values().any(is_truthy)
                } else {
                    map.iter()
                        .filter(|(key, _)| !self.exempt_keys.contains(key.as_str()))
                        .all(|(_, value)| is_truthy(value))
                }
            }
        }
    }
}

/// Truthiness in the rule-document sense: empty strings, `false`, zero, and
/// empty containers all count as absent.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marcmig_model::{Condition, RuleStep};
    use serde_json::json;

    fn member(target: &str, code: char) -> MappingRule {
        let mut rule = MappingRule::new(target);
        rule.subfield = vec![code];
        rule.rules = vec![RuleStep {
            conditions: vec![Condition::new("trim")],
            value: String::new(),
        }];
        rule
    }

    #[test]
    fn whole_field_builds_one_entity() {
        let field = SourceField::new("856")
            .with_subfield('u', "http://example.org")
            .with_subfield('y', "Full text");
        let rules = vec![
            member("electronicAccess.uri", 'u'),
            member("electronicAccess.linkText", 'y'),
        ];
        let registry = TransformRegistry::with_defaults();
        let entities = build(&field, &rules, false, &registry).unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(
            entities[0],
            Entity::Object(
                json!({ "uri": "http://example.org", "linkText": "Full text" })
                    .as_object()
                    .cloned()
                    .unwrap()
            )
        );
    }

    #[test]
    fn per_repeated_subfield_builds_one_entity_per_pair() {
        let field = SourceField::new("035")
            .with_subfield('a', "(OCoLC)1234")
            .with_subfield('a', "(OCoLC)5678");
        let rules = vec![member("identifiers.value", 'a')];
        let registry = TransformRegistry::with_defaults();
        let entities = build(&field, &rules, true, &registry).unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(
            entities[1],
            Entity::Object(json!({ "value": "(OCoLC)5678" }).as_object().cloned().unwrap())
        );
    }

    #[test]
    fn member_targeting_parent_collapses_to_scalar() {
        let field = SourceField::new("655").with_subfield('a', "maps");
        let rules = vec![member("genres", 'a')];
        let registry = TransformRegistry::with_defaults();
        let entities = build(&field, &rules, false, &registry).unwrap();
        assert_eq!(entities[0], Entity::Scalar(json!("maps")));
    }

    #[test]
    fn admission_requires_all_non_exempt_values() {
        let policy = AdmissionPolicy::default();

        let complete = Entity::Object(
            json!({ "name": "Smith", "role": "author" })
                .as_object()
                .cloned()
                .unwrap(),
        );
        assert!(policy.admits("contributors", &complete));

        let incomplete = Entity::Object(
            json!({ "name": "Smith", "role": "" }).as_object().cloned().unwrap(),
        );
        assert!(!policy.admits("contributors", &incomplete));

        // Exempt flags do not block admission even when falsy.
        let flagged = Entity::Object(
            json!({ "value": "1234", "staffOnly": false })
                .as_object()
                .cloned()
                .unwrap(),
        );
        assert!(policy.admits("identifiers", &flagged));
    }

    #[test]
    fn always_admit_parents_skip_the_check() {
        let policy = AdmissionPolicy::default();
        let partial = Entity::Object(
            json!({ "uri": "http://example.org", "linkText": "" })
                .as_object()
                .cloned()
                .unwrap(),
        );
        assert!(policy.admits("electronicAccess", &partial));
        assert!(!policy.admits("contributors", &partial));
    }

    #[test]
    fn statement_family_admits_on_any_truthy_value() {
        let policy = AdmissionPolicy::default();
        let partial = Entity::Object(
            json!({ "statement": "v.1-", "note": "" }).as_object().cloned().unwrap(),
        );
        assert!(policy.admits("holdingsStatements", &partial));
        assert!(policy.admits("holdingsStatementsForIndexes", &partial));

        let all_falsy = Entity::Object(
            json!({ "statement": "", "note": "" }).as_object().cloned().unwrap(),
        );
        assert!(!policy.admits("holdingsStatements", &all_falsy));
    }

    #[test]
    fn empty_entities_are_never_admitted() {
        let policy = AdmissionPolicy::default();
        assert!(!policy.admits("electronicAccess", &Entity::Object(Map::new())));
        assert!(!policy.admits("genres", &Entity::Scalar(json!(""))));
    }

    #[test]
    fn truthiness_pattern_reports_each_key() {
        let entity = Entity::Object(
            json!({ "name": "Smith", "role": "" }).as_object().cloned().unwrap(),
        );
        assert_eq!(entity.truthiness_pattern(), "name:true - role:false");
    }
}

//! Built-in transformation functions.
//!
//! The transformation library proper is supplied by the integration; this
//! module ships only the pure string transformations the default rule
//! documents reference, so a registry built with
//! [`TransformRegistry::with_defaults`] can run them out of the box.

use serde_json::Value;

use marcmig_model::SourceField;

use crate::registry::{Parameter, TransformRegistry};

/// Trailing characters stripped by `remove_ending_punc`.
const ENDING_PUNCTUATION: &[char] = &['.', ';', ':', ',', '/', '+', '=', ' '];

pub(crate) fn register_defaults(registry: &mut TransformRegistry) {
    registry.register("trim", |value, _, _| trim(value));
    registry.register("trim_period", |value, _, _| trim_period(value));
    registry.register("remove_ending_punc", |value, _, _| {
        remove_ending_punc(value)
    });
    registry.register("capitalize", |value, _, _| capitalize(value));
    registry.register("char_select", |value, parameter, _| {
        char_select(value, parameter)
    });
    registry.register("remove_prefix_by_indicator", |value, _, field| {
        remove_prefix_by_indicator(value, field)
    });
    registry.register("concat_subfields_by_name", |value, parameter, field| {
        concat_subfields_by_name(value, parameter, field)
    });
}

/// Strip surrounding whitespace.
pub fn trim(value: &str) -> String {
    value.trim().to_string()
}

/// Strip one trailing period, if present.
pub fn trim_period(value: &str) -> String {
    let trimmed = value.trim_end();
    trimmed.strip_suffix('.').unwrap_or(trimmed).to_string()
}

/// Strip trailing cataloguing punctuation.
pub fn remove_ending_punc(value: &str) -> String {
    value.trim_end_matches(ENDING_PUNCTUATION).to_string()
}

/// Uppercase the first character, leaving the rest unchanged.
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Select the character range `[from, to)` named by the rule parameters.
/// Used on encoded fixed-field data. Out-of-range bounds are clamped.
pub fn char_select(value: &str, parameter: &Parameter) -> String {
    let from = parameter_index(parameter, "from").unwrap_or(0);
    let to = parameter_index(parameter, "to").unwrap_or_else(|| value.chars().count());
    if from >= to {
        return String::new();
    }
    value.chars().skip(from).take(to - from).collect()
}

/// Drop the non-filing prefix: the field's second indicator names how many
/// leading characters to skip (e.g. "The " in a title).
pub fn remove_prefix_by_indicator(value: &str, field: &SourceField) -> String {
    let skip = field
        .indicators
        .1
        .to_digit(10)
        .map(|n| n as usize)
        .unwrap_or(0);
    value.chars().skip(skip).collect()
}

/// Append the values of the subfields named by `subfieldsToConcat`,
/// space-joined, after the current value.
pub fn concat_subfields_by_name(value: &str, parameter: &Parameter, field: &SourceField) -> String {
    let codes: Vec<char> = parameter
        .get("subfieldsToConcat")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(Value::as_str)
                .filter_map(|s| s.chars().next())
                .collect()
        })
        .unwrap_or_default();
    let mut out = value.to_string();
    for extra in field.subfield_values(&codes) {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(extra);
    }
    out
}

fn parameter_index(parameter: &Parameter, key: &str) -> Option<usize> {
    parameter.get(key).and_then(Value::as_u64).map(|n| n as usize)
}

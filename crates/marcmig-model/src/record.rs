//! Source record model: tagged fields carrying ordered (code, value) subfields.

use serde::{Deserialize, Serialize};

/// The two indicator characters of a field.
///
/// Opaque to the engine; forwarded unchanged when temporary per-subfield
/// fields are synthesized during entity construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indicators(pub char, pub char);

impl Default for Indicators {
    fn default() -> Self {
        Self(' ', ' ')
    }
}

/// One (code, value) sub-element of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subfield {
    pub code: char,
    pub value: String,
}

impl Subfield {
    pub fn new(code: char, value: impl Into<String>) -> Self {
        Self {
            code,
            value: value.into(),
        }
    }
}

/// One tagged unit of a source record.
///
/// Subfield order is input order and is semantically significant: it decides
/// how repeated subfields group into destination array elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceField {
    pub tag: String,
    #[serde(default)]
    pub indicators: Indicators,
    #[serde(default)]
    pub subfields: Vec<Subfield>,
}

impl SourceField {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            indicators: Indicators::default(),
            subfields: Vec::new(),
        }
    }

    pub fn with_indicators(mut self, first: char, second: char) -> Self {
        self.indicators = Indicators(first, second);
        self
    }

    pub fn with_subfield(mut self, code: char, value: impl Into<String>) -> Self {
        self.subfields.push(Subfield::new(code, value));
        self
    }

    /// Values of all subfields whose code is in `codes`, in field order.
    pub fn subfield_values(&self, codes: &[char]) -> Vec<&str> {
        self.subfields
            .iter()
            .filter(|sf| codes.contains(&sf.code))
            .map(|sf| sf.value.as_str())
            .collect()
    }

    /// Value of the first subfield with the given code.
    pub fn first_subfield(&self, code: char) -> Option<&str> {
        self.subfields
            .iter()
            .find(|sf| sf.code == code)
            .map(|sf| sf.value.as_str())
    }

    pub fn has_subfield(&self, code: char) -> bool {
        self.subfields.iter().any(|sf| sf.code == code)
    }

    /// The whole field formatted as text: subfield values joined by single
    /// spaces. Used when a rule selects no subfield codes.
    pub fn format_field(&self) -> String {
        let mut out = String::new();
        for sf in &self.subfields {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&sf.value);
        }
        out
    }
}

/// A source record: fields in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub fields: Vec<SourceField>,
}

impl SourceRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_field(&mut self, field: SourceField) {
        self.fields.push(field);
    }

    pub fn with_field(mut self, field: SourceField) -> Self {
        self.fields.push(field);
        self
    }

    /// All fields carrying `tag`, in document order.
    pub fn fields_with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a SourceField> {
        self.fields.iter().filter(move |f| f.tag == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subfield_values_keep_field_order() {
        let field = SourceField::new("100")
            .with_subfield('a', "Smith")
            .with_subfield('d', "1920")
            .with_subfield('a', "Jones");
        assert_eq!(field.subfield_values(&['a']), vec!["Smith", "Jones"]);
        assert_eq!(field.subfield_values(&['a', 'd']), vec!["Smith", "1920", "Jones"]);
        assert_eq!(field.first_subfield('a'), Some("Smith"));
        assert_eq!(field.first_subfield('x'), None);
    }

    #[test]
    fn format_field_joins_all_values() {
        let field = SourceField::new("245")
            .with_subfield('a', "A title")
            .with_subfield('b', "a subtitle");
        assert_eq!(field.format_field(), "A title a subtitle");
        assert_eq!(SourceField::new("245").format_field(), "");
    }

    #[test]
    fn indicators_default_to_blanks() {
        let field = SourceField::new("245");
        assert_eq!(field.indicators, Indicators(' ', ' '));
    }
}

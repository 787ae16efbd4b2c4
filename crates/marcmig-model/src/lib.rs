//! Data model for the record mapping engine: source records, per-tag mapping
//! rules, the target schema tree, and the error taxonomy.

pub mod error;
pub mod record;
pub mod rules;
pub mod schema;

pub use error::{MapError, Result};
pub use record::{Indicators, SourceField, SourceRecord, Subfield};
pub use rules::{Condition, FieldReplacement, MappingRule, RuleSet, RuleStep};
pub use schema::{Schema, SchemaNode, SchemaProperties};

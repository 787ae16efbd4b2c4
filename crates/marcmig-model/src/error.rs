use thiserror::Error;

/// Failures raised while mapping records.
///
/// Configuration defects (unresolvable targets, unexpected schema shapes,
/// unknown transformations, malformed documents) indicate a mismatch between
/// the rule set and the schema and must abort the run. [`MapError::CriticalData`]
/// is the one per-record failure a batch driver may skip and count.
#[derive(Debug, Error)]
pub enum MapError {
    /// A rule names a target path the schema does not declare.
    #[error("target path {path:?} does not resolve against the schema")]
    UnresolvedTarget { path: String },

    /// A schema shape was encountered that no write branch handles.
    #[error("unexpected schema shape at {path:?}: {message}")]
    UnexpectedShape { path: String, message: String },

    /// A rule names a transformation the registry does not know.
    #[error("unknown transformation {name:?}")]
    UnknownTransform { name: String },

    /// A required value is missing from one record. Recoverable: the batch
    /// driver can skip the record and continue.
    #[error("critical data missing: {message}")]
    CriticalData { message: String },

    /// The mapping-rule document could not be deserialized.
    #[error("failed to parse rule document: {source}")]
    RuleDocument {
        #[source]
        source: serde_json::Error,
    },

    /// The schema document could not be interpreted.
    #[error("failed to parse schema document: {message}")]
    SchemaDocument { message: String },
}

impl MapError {
    /// Whether the enclosing batch driver may skip the current record and
    /// continue, as opposed to aborting the whole run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::CriticalData { .. })
    }

    pub(crate) fn unresolved(path: impl Into<String>) -> Self {
        Self::UnresolvedTarget { path: path.into() }
    }
}

pub type Result<T> = std::result::Result<T, MapError>;

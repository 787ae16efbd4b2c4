//! Name → transformation lookup.
//!
//! Mapping rules reference transformations by name only; the registry is the
//! lookup the engine calls through. It is shared read-only across batch
//! workers. An unknown name is a configuration defect, never silently
//! skipped.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};
use tracing::debug;

use marcmig_model::{MapError, Result, SourceField};

use crate::builtin;

/// Parameter map a rule condition passes to its transformations.
pub type Parameter = Map<String, Value>;

/// A single-value transformation: raw value in, transformed value out, with
/// access to the rule parameters and the owning field.
pub type TransformFn = dyn Fn(&str, &Parameter, &SourceField) -> String + Send + Sync;

/// Registry of named transformations.
pub struct TransformRegistry {
    transforms: BTreeMap<String, Box<TransformFn>>,
}

impl TransformRegistry {
    /// An empty registry. Every transformation must be registered explicitly.
    pub fn new() -> Self {
        Self {
            transforms: BTreeMap::new(),
        }
    }

    /// A registry preloaded with the built-in transformations the default
    /// rule documents reference.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        builtin::register_defaults(&mut registry);
        registry
    }

    /// Register a transformation under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: impl Into<String>, transform: F)
    where
        F: Fn(&str, &Parameter, &SourceField) -> String + Send + Sync + 'static,
    {
        self.transforms.insert(name.into(), Box::new(transform));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.transforms.keys().map(String::as_str)
    }

    /// Invoke one transformation by name.
    pub fn invoke(
        &self,
        name: &str,
        value: &str,
        parameter: &Parameter,
        field: &SourceField,
    ) -> Result<String> {
        let transform = self
            .transforms
            .get(name)
            .ok_or_else(|| MapError::UnknownTransform {
                name: name.to_string(),
            })?;
        let out = transform(value, parameter, field);
        debug!(transform = name, tag = %field.tag, "applied transformation");
        Ok(out)
    }

    /// Apply a chain of transformations in order, feeding each output into
    /// the next.
    pub fn invoke_chain(
        &self,
        names: &[&str],
        value: &str,
        parameter: &Parameter,
        field: &SourceField,
    ) -> Result<String> {
        let mut current = value.to_string();
        for name in names {
            current = self.invoke(name, &current, parameter, field)?;
        }
        Ok(current)
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformRegistry")
            .field("transforms", &self.transforms.keys().collect::<Vec<_>>())
            .finish()
    }
}

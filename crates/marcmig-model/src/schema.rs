//! Target schema tree: the property shapes consulted by the path resolver.
//!
//! Only `type`, `properties`, `items.type`, and `items.properties` of the
//! schema document are consulted. A property that declares no `type` is
//! treated as a string.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{MapError, Result};

/// Property name → shape, at one level of the schema tree.
pub type SchemaProperties = BTreeMap<String, SchemaNode>;

/// Shape of one schema property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaNode {
    /// Scalar string; also the default when a property declares no type.
    String,
    /// Scalar boolean.
    Boolean,
    /// Array with string items.
    StringArray,
    /// Array with object items and their declared properties.
    ObjectArray(SchemaProperties),
    /// Nested object with declared properties.
    Object(SchemaProperties),
}

impl SchemaNode {
    /// The nested properties of object and array-of-object nodes.
    pub fn properties(&self) -> Option<&SchemaProperties> {
        match self {
            Self::ObjectArray(props) | Self::Object(props) => Some(props),
            Self::String | Self::Boolean | Self::StringArray => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Self::StringArray | Self::ObjectArray(_))
    }

    fn from_value(name: &str, value: &Value) -> Result<Self> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("string");
        match kind {
            "string" => Ok(Self::String),
            "boolean" => Ok(Self::Boolean),
            "object" => Ok(Self::Object(parse_properties(name, value)?)),
            "array" => {
                let items = value.get("items").ok_or_else(|| MapError::SchemaDocument {
                    message: format!("array property {name:?} declares no items"),
                })?;
                let item_kind = items
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or("string");
                match item_kind {
                    "string" => Ok(Self::StringArray),
                    "object" => Ok(Self::ObjectArray(parse_properties(name, items)?)),
                    other => Err(MapError::SchemaDocument {
                        message: format!("array property {name:?} has unsupported item type {other:?}"),
                    }),
                }
            }
            // Other scalar kinds (integer, number) are carried as strings;
            // the engine never arithmetizes destination values.
            _ => Ok(Self::String),
        }
    }
}

fn parse_properties(name: &str, value: &Value) -> Result<SchemaProperties> {
    let props = value
        .get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| MapError::SchemaDocument {
            message: format!("object property {name:?} declares no properties"),
        })?;
    let mut out = SchemaProperties::new();
    for (key, prop) in props {
        out.insert(key.clone(), SchemaNode::from_value(key, prop)?);
    }
    Ok(out)
}

/// The target schema: a tree of named property shapes.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    properties: SchemaProperties,
}

impl Schema {
    /// Build a schema from already-parsed properties. Mostly for tests.
    pub fn from_properties(properties: SchemaProperties) -> Self {
        Self { properties }
    }

    /// Parse a schema-description document.
    pub fn from_json(doc: &Value) -> Result<Self> {
        let properties = parse_properties("<root>", doc)?;
        Ok(Self { properties })
    }

    /// Parse a schema-description document from text.
    pub fn from_json_str(doc: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(doc).map_err(|err| MapError::SchemaDocument {
            message: err.to_string(),
        })?;
        Self::from_json(&value)
    }

    /// The shape of a top-level property.
    pub fn property(&self, name: &str) -> Option<&SchemaNode> {
        self.properties.get(name)
    }

    pub fn properties(&self) -> &SchemaProperties {
        &self.properties
    }
}

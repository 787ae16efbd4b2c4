//! Target-path writes against the schema tree.
//!
//! The input stream carries no "close this object" signal, so array-of-object
//! boundaries are reconstructed from the write sequence alone: every array
//! keeps exactly one open row (its last element), and a write closes that row
//! the moment it would overwrite a key the row already holds, or the row
//! already holds as many keys as its schema declares. Closed rows are never
//! revisited.

use serde_json::{Map, Value};
use tracing::debug;

use marcmig_model::{MapError, Result, Schema, SchemaNode, SchemaProperties};

/// Decision for the open row of an array-of-objects node, given the key
/// about to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowState {
    /// No row is open; a fresh one must be started.
    Empty,
    /// The open row accepts this key.
    Accepts,
    /// The open row is full or already holds this key; it is closed and a
    /// fresh row receives the write.
    Closed,
}

/// `leaf_key` is the key about to land in the row, when the write targets
/// the row directly; passing `None` (the write only passes through on its
/// way deeper) closes on fullness alone, since overwriting is a leaf-write
/// signal.
fn row_state(rows: &[Value], leaf_key: Option<&str>, declared: usize) -> RowState {
    match rows.last() {
        None => RowState::Empty,
        Some(Value::Object(row)) => {
            let overwrites = leaf_key.is_some_and(|key| row.contains_key(key));
            if overwrites || row.len() >= declared {
                RowState::Closed
            } else {
                RowState::Accepts
            }
        }
        // A non-object element (entity-as-scalar) never reopens.
        Some(_) => RowState::Closed,
    }
}

/// Write `values` at the dotted `target` path, growing the destination
/// structure as the schema dictates. Empty `values` is a no-op.
pub fn write_values(
    record: &mut Map<String, Value>,
    schema: &Schema,
    target: &str,
    values: &[Value],
) -> Result<()> {
    if values.is_empty() {
        return Ok(());
    }
    let segments: Vec<&str> = target.split('.').collect();
    match segments.as_slice() {
        [single] => write_top_level(record, schema, single, values),
        _ => write_path(record, schema.properties(), &segments, target, values),
    }
}

/// Single-segment write: arrays of strings extend, scalars overwrite.
fn write_top_level(
    record: &mut Map<String, Value>,
    schema: &Schema,
    property: &str,
    values: &[Value],
) -> Result<()> {
    let node = schema
        .property(property)
        .ok_or_else(|| MapError::UnresolvedTarget {
            path: property.to_string(),
        })?;
    match node {
        SchemaNode::StringArray => {
            extend_string_array(record, property, values);
            Ok(())
        }
        SchemaNode::String | SchemaNode::Boolean => {
            record.insert(property.to_string(), values[0].clone());
            Ok(())
        }
        SchemaNode::ObjectArray(_) | SchemaNode::Object(_) => Err(MapError::UnexpectedShape {
            path: property.to_string(),
            message: "plain value written to an object-shaped property".to_string(),
        }),
    }
}

/// Append all non-empty values; growth is monotonic, existing elements are
/// never touched.
fn extend_string_array(container: &mut Map<String, Value>, property: &str, values: &[Value]) {
    let entry = container
        .entry(property.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(items) = entry {
        for value in values {
            if matches!(value, Value::String(s) if s.is_empty()) {
                continue;
            }
            items.push(value.clone());
        }
    }
}

/// Multi-segment write: walk the schema and the destination structure in
/// lockstep, allocating arrays and closing rows as needed.
fn write_path(
    container: &mut Map<String, Value>,
    props: &SchemaProperties,
    segments: &[&str],
    target: &str,
    values: &[Value],
) -> Result<()> {
    let segment = segments[0];
    let node = props.get(segment).ok_or_else(|| MapError::UnresolvedTarget {
        path: target.to_string(),
    })?;

    if segments.len() == 1 {
        return write_leaf(container, node, segment, target, values);
    }

    match node {
        SchemaNode::Object(inner) => {
            let entry = container
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            let Value::Object(child) = entry else {
                return Err(MapError::UnexpectedShape {
                    path: target.to_string(),
                    message: format!("{segment:?} holds a non-object value"),
                });
            };
            write_path(child, inner, &segments[1..], target, values)
        }
        SchemaNode::ObjectArray(inner) => {
            let rows = open_rows(container, segment);
            let leaf_key = (segments.len() == 2).then_some(segments[1]);
            match row_state(rows, leaf_key, inner.len()) {
                RowState::Empty | RowState::Closed => {
                    debug!(path = target, rows = rows.len(), "starting a new open row");
                    rows.push(Value::Object(Map::new()));
                }
                RowState::Accepts => {}
            }
            let Some(Value::Object(row)) = rows.last_mut() else {
                return Err(MapError::UnexpectedShape {
                    path: target.to_string(),
                    message: format!("{segment:?} holds a non-object array element"),
                });
            };
            write_path(row, inner, &segments[1..], target, values)
        }
        SchemaNode::String | SchemaNode::Boolean | SchemaNode::StringArray => {
            Err(MapError::UnexpectedShape {
                path: target.to_string(),
                message: format!("cannot descend through scalar segment {segment:?}"),
            })
        }
    }
}

/// Write into the final segment of a nested path.
fn write_leaf(
    container: &mut Map<String, Value>,
    node: &SchemaNode,
    segment: &str,
    target: &str,
    values: &[Value],
) -> Result<()> {
    match node {
        SchemaNode::String | SchemaNode::Boolean => {
            container.insert(segment.to_string(), values[0].clone());
            Ok(())
        }
        SchemaNode::StringArray => {
            extend_string_array(container, segment, values);
            Ok(())
        }
        SchemaNode::ObjectArray(_) | SchemaNode::Object(_) => Err(MapError::UnexpectedShape {
            path: target.to_string(),
            message: "plain value written to an object-shaped property".to_string(),
        }),
    }
}

fn open_rows<'a>(container: &'a mut Map<String, Value>, segment: &str) -> &'a mut Vec<Value> {
    let entry = container
        .entry(segment.to_string())
        .or_insert_with(|| Value::Array(vec![Value::Object(Map::new())]));
    match entry {
        Value::Array(rows) => rows,
        // A previous write of a different shape is replaced outright; the
        // schema said array, so an array it becomes.
        other => {
            *other = Value::Array(vec![Value::Object(Map::new())]);
            match other {
                Value::Array(rows) => rows,
                _ => unreachable!("just assigned an array"),
            }
        }
    }
}

/// Append one built entity under its parent property: array parents push,
/// scalar parents overwrite.
pub fn append_entity(
    record: &mut Map<String, Value>,
    schema: &Schema,
    parent: &str,
    entity: Value,
) -> Result<()> {
    let node = schema
        .property(parent)
        .ok_or_else(|| MapError::UnresolvedTarget {
            path: parent.to_string(),
        })?;
    if node.is_array() {
        let entry = record
            .entry(parent.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(items) = entry {
            items.push(entity);
        }
    } else {
        record.insert(parent.to_string(), entity);
    }
    Ok(())
}

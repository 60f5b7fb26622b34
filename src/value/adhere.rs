//! Structural adherence
//!
//! Decides whether a runtime value matches a candidate schema, which is how
//! the currently-inhabited variant of a sum type is recognized. Deliberately
//! a subset of full schema validation: shape and constants only, no bounds or
//! length checks. The registry is authoritative; values are at worst stale.

use serde_json::Value;

use crate::schema::{Items, JsonType, SchemaNode};

/// Does `value` structurally match `schema`?
pub fn adheres(value: &Value, schema: &SchemaNode) -> bool {
    if let Some(constant) = &schema.const_value {
        return value == constant;
    }

    match schema.ty {
        Some(JsonType::Object) => match (&schema.properties, value.as_object()) {
            (Some(properties), Some(object)) => properties.iter().all(|(name, child)| {
                object
                    .get(name)
                    .map(|field| adheres(field, child))
                    .unwrap_or(false)
            }),
            (None, Some(_)) => true,
            _ => false,
        },
        Some(JsonType::Array) => match value.as_array() {
            Some(elements) => match &schema.items {
                Some(Items::Tuple(fixed)) => fixed
                    .iter()
                    .enumerate()
                    .all(|(i, child)| elements.get(i).map(|e| adheres(e, child)).unwrap_or(false)),
                _ => true,
            },
            None => false,
        },
        Some(JsonType::String) => value.is_string(),
        Some(JsonType::Number) => value.is_number(),
        Some(JsonType::Boolean) => value.is_boolean(),
        Some(JsonType::Null) => value.is_null(),
        // No structural constraints to violate
        None => true,
    }
}

/// Index of the first variant the value adheres to; 0 when nothing matches
/// (the registry wins over a stale value)
pub fn find_selected_index(value: &Value, variants: &[SchemaNode]) -> usize {
    variants
        .iter()
        .position(|candidate| adheres(value, candidate))
        .unwrap_or(0)
}

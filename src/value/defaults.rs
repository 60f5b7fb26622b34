//! Schema-conformant default synthesis
//!
//! Used when a new array element is inserted, an optional is toggled on, or a
//! sum-type slot needs an initial value for a not-yet-visited variant.

use serde_json::{Number, Value};

use crate::schema::{Items, JsonType, SchemaNode};

/// Synthesize a value that satisfies `schema`
pub fn generate_default(schema: &SchemaNode) -> Value {
    if let Some(constant) = &schema.const_value {
        return constant.clone();
    }

    if !schema.one_of.is_empty() {
        // Optionals default to absent; other sums to their first variant
        return if schema.is_optional() {
            Value::Null
        } else {
            schema
                .one_of
                .first()
                .map(generate_default)
                .unwrap_or(Value::Null)
        };
    }

    match schema.ty {
        None | Some(JsonType::Null) => Value::Null,
        Some(JsonType::Boolean) => Value::Bool(false),
        Some(JsonType::Number) => Value::Number(default_number(schema)),
        Some(JsonType::String) => Value::String(String::new()),
        Some(JsonType::Array) => match &schema.items {
            Some(Items::Tuple(elements)) => {
                Value::Array(elements.iter().map(generate_default).collect())
            }
            Some(Items::Single(element)) => {
                let len = schema.min_items.unwrap_or(0);
                Value::Array((0..len).map(|_| generate_default(element)).collect())
            }
            None => Value::Array(Vec::new()),
        },
        Some(JsonType::Object) => match &schema.properties {
            Some(properties) => Value::Object(
                properties
                    .iter()
                    .map(|(name, child)| (name.clone(), generate_default(child)))
                    .collect(),
            ),
            // Map-shaped or opaque objects start empty
            None => Value::Object(serde_json::Map::new()),
        },
    }
}

/// Zero, clamped into the schema's declared bounds so non-zero wrappers get
/// a valid initial value
fn default_number(schema: &SchemaNode) -> Number {
    let mut value = 0.0f64;
    if let Some(minimum) = schema.minimum {
        value = value.max(minimum);
    }
    if let Some(maximum) = schema.maximum {
        value = value.min(maximum);
    }

    if schema.multiple_of.is_some() {
        Number::from(value as i64)
    } else {
        Number::from_f64(value).unwrap_or_else(|| Number::from(0))
    }
}

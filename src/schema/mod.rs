//! Normalized schema tree
//!
//! `SchemaNode` is this crate's dereferenced, JSON-schema-shaped description
//! of one registered type. It is produced by the codec (`codec`), patched by
//! the special-case fixups (`fixups`), and fully inlined by the registry's
//! dereferencing pass (`registry`). The serialized form is the one wire
//! format this crate owns and must stay stable.

pub mod codec;
pub mod fixups;
pub mod registry;

pub use codec::descriptor_to_schema;
pub use fixups::apply_fixup;
pub use registry::{RegistrySnapshot, SchemaRegistry, TypeSearchResult};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON primitive type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

/// `items` of an array schema: one schema for homogeneous sequences, an
/// ordered list for fixed-arity tuples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Items {
    Single(Box<SchemaNode>),
    Tuple(Vec<SchemaNode>),
}

/// Normalized structural description of one type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaNode {
    /// Fully-qualified type identifier; matches the registry key this node
    /// was derived from, restored after dereferencing if necessary
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub type_path: String,
    /// Display name for the same type
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub short_path: String,
    /// Primitive type tag; absent for opaque fallback nodes
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<JsonType>,
    /// Exact constant value (discriminated variants)
    #[serde(rename = "const", default, skip_serializing_if = "Option::is_none")]
    pub const_value: Option<Value>,
    /// Human-readable label (variant titles)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Named properties in declaration order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, SchemaNode>>,
    /// Required property names
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Array element schema(s)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Items>,
    /// Map value schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<SchemaNode>>,
    /// Sum-type variants in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<SchemaNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub read_only: bool,
    /// Internal reference to another registry entry; present only between
    /// codec output and the dereferencing pass, never in a finished snapshot
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl SchemaNode {
    /// Bare reference node, inlined later by the registry
    pub fn reference(type_path: impl Into<String>) -> Self {
        SchemaNode {
            reference: Some(type_path.into()),
            ..Default::default()
        }
    }

    /// Node with only a primitive type tag
    pub fn of_type(ty: JsonType) -> Self {
        SchemaNode {
            ty: Some(ty),
            ..Default::default()
        }
    }

    /// Minimal fallback for a type the registry does not know: identity only,
    /// no structure. Renders as an opaque surface.
    pub fn fallback(type_path: &str) -> Self {
        SchemaNode {
            type_path: type_path.to_string(),
            short_path: short_type_name(type_path),
            ..Default::default()
        }
    }

    /// Two-variant sum with a null branch, i.e. the rewritten optional shape
    pub fn is_optional(&self) -> bool {
        self.one_of.len() == 2
            && self
                .one_of
                .iter()
                .any(|variant| variant.ty == Some(JsonType::Null))
    }

    /// The non-null branch of an optional shape
    pub fn optional_payload(&self) -> Option<&SchemaNode> {
        if !self.is_optional() {
            return None;
        }
        self.one_of
            .iter()
            .find(|variant| variant.ty != Some(JsonType::Null))
    }
}

/// Derive a display name from a fully-qualified type path.
///
/// Strips every `module::path::` segment up to the last separator before the
/// final identifier and shortens generic parameters recursively:
/// `core::option::Option<alloc::string::String>` becomes `Option<String>`.
pub fn short_type_name(type_path: &str) -> String {
    let type_path = type_path.trim();
    let (base, generics) = match type_path.find('<') {
        Some(open) if type_path.ends_with('>') => {
            (&type_path[..open], Some(&type_path[open + 1..type_path.len() - 1]))
        }
        _ => (type_path, None),
    };

    let short_base = base.rsplit("::").next().unwrap_or(base);

    match generics {
        None => short_base.to_string(),
        Some(args) => {
            let shortened: Vec<String> = split_top_level_args(args)
                .into_iter()
                .map(short_type_name)
                .collect();
            format!("{}<{}>", short_base, shortened.join(", "))
        }
    }
}

/// Split generic arguments on commas that sit outside nested angle brackets
fn split_top_level_args(args: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for (i, c) in args.char_indices() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                out.push(args[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = args[start..].trim();
    if !last.is_empty() {
        out.push(last);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_name_plain_path() {
        assert_eq!(short_type_name("bevy_transform::components::transform::Transform"), "Transform");
        assert_eq!(short_type_name("f32"), "f32");
    }

    #[test]
    fn short_name_generic_path() {
        assert_eq!(
            short_type_name("core::option::Option<alloc::string::String>"),
            "Option<String>"
        );
        assert_eq!(
            short_type_name("std::collections::HashMap<alloc::string::String, glam::Vec3>"),
            "HashMap<String, Vec3>"
        );
        assert_eq!(
            short_type_name("alloc::vec::Vec<core::option::Option<u32>>"),
            "Vec<Option<u32>>"
        );
    }

    #[test]
    fn optional_shape_detection() {
        let optional = SchemaNode {
            one_of: vec![
                SchemaNode {
                    ty: Some(JsonType::Null),
                    const_value: Some(Value::Null),
                    title: Some("None".to_string()),
                    ..Default::default()
                },
                SchemaNode {
                    ty: Some(JsonType::Number),
                    title: Some("f32".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        assert!(optional.is_optional());
        assert_eq!(optional.optional_payload().unwrap().ty, Some(JsonType::Number));
    }

    #[test]
    fn schema_node_wire_format_is_json_schema_shaped() {
        let node = SchemaNode {
            type_path: "core::time::Duration".to_string(),
            short_path: "Duration".to_string(),
            ty: Some(JsonType::Object),
            ..Default::default()
        };
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["typePath"], "core::time::Duration");
        assert_eq!(json["type"], "object");
        // Unset fields stay off the wire
        assert!(json.get("oneOf").is_none());
        assert!(json.get("$ref").is_none());
    }
}

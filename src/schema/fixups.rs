//! Special-case schema fixups
//!
//! Some foreign types are not faithfully reflected by the remote registry:
//! textual wrappers reflect as opaque structs, math vectors as named-field
//! structs even though they serialize as arrays, optionals as ordinary enums.
//! This pass rewrites the codec output for those type paths so the value
//! layer can treat them uniformly. Runs after the codec, before dereferencing.

use serde_json::Value;

use super::codec::integer_schema;
use super::{short_type_name, Items, JsonType, SchemaNode};

/// Rewrite a freshly encoded node when its type path is one of the known
/// special cases. Identity fields are always preserved.
pub fn apply_fixup(node: SchemaNode) -> SchemaNode {
    let type_path = node.type_path.clone();
    let short_path = node.short_path.clone();

    let mut patched = match type_path.as_str() {
        // Textual wrappers reflect as structs but serialize as plain strings
        "alloc::borrow::Cow<str>"
        | "smol_str::SmolStr"
        | "bevy_ecs::name::Name"
        | "uuid::Uuid"
        | "std::path::PathBuf" => SchemaNode::of_type(JsonType::String),

        // Entity ids travel as their u64 bit representation; writing one
        // through the value editor is never meaningful
        "bevy_ecs::entity::Entity" => SchemaNode {
            read_only: true,
            ..integer_schema("u64", false)
        },

        "core::time::Duration" => two_field_object("secs", integer_schema("u64", false), "nanos", integer_schema("u32", false)),

        path if path.starts_with("bevy_asset::path::AssetPath") => SchemaNode::of_type(JsonType::String),

        path if path.starts_with("core::ops::Range<") => {
            let element = generic_argument(path)
                .map(SchemaNode::reference)
                .unwrap_or_else(|| SchemaNode::of_type(JsonType::Number));
            two_field_object("start", element.clone(), "end", element)
        }

        path => {
            if let Some((backing, minimum_one)) = nonzero_backing(path) {
                let mut schema = integer_schema(backing, backing.starts_with('i'));
                if minimum_one {
                    schema.minimum = Some(1.0);
                }
                schema
            } else if let Some(arity) = vector_arity(path) {
                fixed_float_array(arity)
            } else if is_optional_enum(&node) {
                rewrite_optional(node.clone())
            } else {
                return node;
            }
        }
    };

    patched.type_path = type_path;
    patched.short_path = short_path;
    patched.read_only = patched.read_only || node.read_only;
    patched
}

/// Fixed-length float vector / quaternion arity by type path
pub(crate) fn vector_arity(type_path: &str) -> Option<usize> {
    match type_path {
        "glam::Vec2" | "glam::DVec2" => Some(2),
        "glam::Vec3" | "glam::Vec3A" | "glam::DVec3" => Some(3),
        "glam::Vec4" | "glam::DVec4" | "glam::Quat" | "glam::DQuat" => Some(4),
        _ => None,
    }
}

/// Backing integer for the non-zero wrappers; `minimum: 1` only where zero is
/// the excluded value of an unsigned range
fn nonzero_backing(type_path: &str) -> Option<(&'static str, bool)> {
    match type_path {
        "core::num::NonZeroU8" | "core::num::NonZero<u8>" => Some(("u8", true)),
        "core::num::NonZeroU16" | "core::num::NonZero<u16>" => Some(("u16", true)),
        "core::num::NonZeroU32" | "core::num::NonZero<u32>" => Some(("u32", true)),
        "core::num::NonZeroU64" | "core::num::NonZero<u64>" => Some(("u64", true)),
        "core::num::NonZeroUsize" | "core::num::NonZero<usize>" => Some(("usize", true)),
        "core::num::NonZeroI8" | "core::num::NonZero<i8>" => Some(("i8", false)),
        "core::num::NonZeroI16" | "core::num::NonZero<i16>" => Some(("i16", false)),
        "core::num::NonZeroI32" | "core::num::NonZero<i32>" => Some(("i32", false)),
        "core::num::NonZeroI64" | "core::num::NonZero<i64>" => Some(("i64", false)),
        "core::num::NonZeroIsize" | "core::num::NonZero<isize>" => Some(("isize", false)),
        _ => None,
    }
}

fn fixed_float_array(arity: usize) -> SchemaNode {
    SchemaNode {
        ty: Some(JsonType::Array),
        items: Some(Items::Single(Box::new(SchemaNode::of_type(JsonType::Number)))),
        min_items: Some(arity),
        max_items: Some(arity),
        ..Default::default()
    }
}

fn two_field_object(
    first: &str,
    first_schema: SchemaNode,
    second: &str,
    second_schema: SchemaNode,
) -> SchemaNode {
    let mut properties = indexmap::IndexMap::new();
    properties.insert(first.to_string(), first_schema);
    properties.insert(second.to_string(), second_schema);
    SchemaNode {
        ty: Some(JsonType::Object),
        required: vec![first.to_string(), second.to_string()],
        properties: Some(properties),
        ..Default::default()
    }
}

/// First top-level generic argument of a path like `core::ops::Range<f32>`
fn generic_argument(type_path: &str) -> Option<&str> {
    let open = type_path.find('<')?;
    let inner = type_path.get(open + 1..type_path.len() - 1)?;
    let mut depth = 0usize;
    for (i, c) in inner.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => return Some(inner[..i].trim()),
            _ => {}
        }
    }
    Some(inner.trim())
}

/// A two-variant enum standing for "nothing vs. something": exactly one bare
/// variant, and either the canonical optional type path or a variant named
/// `None`
fn is_optional_enum(node: &SchemaNode) -> bool {
    if node.one_of.len() != 2 {
        return false;
    }
    let unit_count = node
        .one_of
        .iter()
        .filter(|variant| variant.const_value.is_some())
        .count();
    if unit_count != 1 {
        return false;
    }
    node.type_path.starts_with("core::option::Option<")
        || node
            .one_of
            .iter()
            .any(|variant| variant.const_value == Some(Value::String("None".to_string())))
}

/// Rewrite the optional enum: nothing-branch becomes the null schema, the
/// payload branch is unwrapped from its variant envelope and retitled with
/// the payload type's short name. The value layer then treats optionality as
/// a presence toggle rather than a generic sum type.
fn rewrite_optional(node: SchemaNode) -> SchemaNode {
    let one_of = node
        .one_of
        .into_iter()
        .map(|variant| {
            if variant.const_value.is_some() {
                SchemaNode {
                    ty: Some(JsonType::Null),
                    const_value: Some(Value::Null),
                    title: Some("None".to_string()),
                    ..Default::default()
                }
            } else {
                unwrap_payload_variant(variant)
            }
        })
        .collect();

    SchemaNode {
        one_of,
        ..Default::default()
    }
}

/// `{ "Some": <payload> }` envelope -> the payload itself, retitled
fn unwrap_payload_variant(variant: SchemaNode) -> SchemaNode {
    let payload = variant
        .properties
        .as_ref()
        .and_then(|properties| properties.values().next().cloned());

    match payload {
        Some(mut payload) => {
            let payload_path = payload
                .reference
                .clone()
                .unwrap_or_else(|| payload.type_path.clone());
            payload.title = Some(short_type_name(&payload_path));
            payload
        }
        // Payload-less non-unit variant; keep it but make the title usable
        None => SchemaNode {
            title: variant.title.clone().or_else(|| Some("Some".to_string())),
            ..variant
        },
    }
}

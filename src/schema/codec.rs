//! Descriptor-to-schema codec
//!
//! Pure conversion of one raw registry entry into a normalized `SchemaNode`,
//! dispatched exhaustively over `TypeKind`. Total by construction: every kind
//! produces a node, unknown shapes degrade to opaque objects instead of
//! failing. References to other registry entries stay symbolic (`$ref`) until
//! the registry's dereferencing pass inlines them.

use indexmap::IndexMap;
use serde_json::Value;

use crate::descriptor::{PrimitiveKind, RawTypeDescriptor, TypeKind, TypeRef, VariantDescriptor};

use super::{Items, JsonType, SchemaNode};

/// Largest integer the value layer can carry without precision loss.
///
/// 64/128-bit integer bounds are approximated by this range rather than the
/// true bit-width bounds; values beyond it would not survive the JSON value
/// representation anyway.
pub const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Convert one registry entry into its normalized schema node.
///
/// Pure and total; never fails.
pub fn descriptor_to_schema(descriptor: &RawTypeDescriptor) -> SchemaNode {
    let mut node = match descriptor.kind {
        TypeKind::Value => value_schema(descriptor),
        TypeKind::List | TypeKind::Array | TypeKind::Set => sequence_schema(descriptor),
        TypeKind::Map => map_schema(descriptor),
        TypeKind::Struct => struct_schema(&descriptor.properties, &descriptor.required),
        TypeKind::Tuple => tuple_schema(&descriptor.prefix_items),
        TypeKind::TupleStruct => tuple_struct_schema(&descriptor.prefix_items),
        TypeKind::Enum => enum_schema(&descriptor.one_of),
    };

    node.type_path = descriptor.type_path.clone();
    node.short_path = descriptor.short_path.clone();
    node.read_only = descriptor.read_only;
    node
}

fn value_schema(descriptor: &RawTypeDescriptor) -> SchemaNode {
    match descriptor.primitive {
        Some(PrimitiveKind::Boolean) => SchemaNode::of_type(JsonType::Boolean),
        Some(PrimitiveKind::Float) => SchemaNode::of_type(JsonType::Number),
        Some(PrimitiveKind::Int) => integer_schema(&descriptor.type_path, true),
        Some(PrimitiveKind::Uint) => integer_schema(&descriptor.type_path, false),
        Some(PrimitiveKind::String) => SchemaNode::of_type(JsonType::String),
        // Reflected-but-opaque values keep an object tag so they render as a
        // group rather than crashing the dispatch
        Some(PrimitiveKind::Object) | None => SchemaNode::of_type(JsonType::Object),
    }
}

/// Integer schema with bounds from the fixed per-type table
pub fn integer_schema(type_path: &str, signed: bool) -> SchemaNode {
    let (minimum, maximum) = integer_bounds(type_path, signed);
    SchemaNode {
        ty: Some(JsonType::Number),
        multiple_of: Some(1.0),
        minimum: Some(minimum),
        maximum: Some(maximum),
        ..Default::default()
    }
}

fn integer_bounds(type_path: &str, signed: bool) -> (f64, f64) {
    match type_path {
        "i8" => (i8::MIN as f64, i8::MAX as f64),
        "i16" => (i16::MIN as f64, i16::MAX as f64),
        "i32" => (i32::MIN as f64, i32::MAX as f64),
        "u8" => (0.0, u8::MAX as f64),
        "u16" => (0.0, u16::MAX as f64),
        "u32" => (0.0, u32::MAX as f64),
        // i64/i128/isize and u64/u128/usize: approximated, see MAX_SAFE_INTEGER
        _ if signed => (-MAX_SAFE_INTEGER, MAX_SAFE_INTEGER),
        _ => (0.0, MAX_SAFE_INTEGER),
    }
}

fn sequence_schema(descriptor: &RawTypeDescriptor) -> SchemaNode {
    let items = match &descriptor.items {
        Some(element) => Items::Single(Box::new(SchemaNode::reference(element.type_path()))),
        // Registry entry without an element type; keep the array tag
        None => Items::Tuple(Vec::new()),
    };
    SchemaNode {
        ty: Some(JsonType::Array),
        items: Some(items),
        ..Default::default()
    }
}

fn map_schema(descriptor: &RawTypeDescriptor) -> SchemaNode {
    SchemaNode {
        ty: Some(JsonType::Object),
        additional_properties: descriptor
            .value_type
            .as_ref()
            .map(|value| Box::new(SchemaNode::reference(value.type_path()))),
        ..Default::default()
    }
}

fn struct_schema(properties: &IndexMap<String, TypeRef>, required: &[String]) -> SchemaNode {
    let props: IndexMap<String, SchemaNode> = properties
        .iter()
        .map(|(name, ty)| (name.clone(), SchemaNode::reference(ty.type_path())))
        .collect();
    SchemaNode {
        ty: Some(JsonType::Object),
        required: required.to_vec(),
        properties: Some(props),
        ..Default::default()
    }
}

fn tuple_schema(prefix_items: &[TypeRef]) -> SchemaNode {
    SchemaNode {
        ty: Some(JsonType::Array),
        items: Some(Items::Tuple(
            prefix_items
                .iter()
                .map(|item| SchemaNode::reference(item.type_path()))
                .collect(),
        )),
        ..Default::default()
    }
}

/// Single-field wrappers collapse to a direct reference to their sole
/// element; anything else keeps the tuple encoding
fn tuple_struct_schema(prefix_items: &[TypeRef]) -> SchemaNode {
    match prefix_items {
        [sole] => SchemaNode::reference(sole.type_path()),
        items => tuple_schema(items),
    }
}

fn enum_schema(variants: &[VariantDescriptor]) -> SchemaNode {
    SchemaNode {
        one_of: variants.iter().map(variant_schema).collect(),
        ..Default::default()
    }
}

fn variant_schema(variant: &VariantDescriptor) -> SchemaNode {
    match variant {
        VariantDescriptor::Unit(name) => SchemaNode {
            ty: Some(JsonType::String),
            const_value: Some(Value::String(name.clone())),
            title: Some(name.clone()),
            ..Default::default()
        },
        VariantDescriptor::Tuple { name, prefix_items } => {
            let payload = match prefix_items.as_slice() {
                [sole] => SchemaNode::reference(sole.type_path()),
                items => tuple_schema(items),
            };
            variant_envelope(name, payload)
        }
        VariantDescriptor::Struct {
            name,
            properties,
            required,
        } => variant_envelope(name, struct_schema(properties, required)),
    }
}

/// Externally-tagged variant envelope: `{ "VariantName": <payload> }`
fn variant_envelope(name: &str, payload: SchemaNode) -> SchemaNode {
    let mut properties = IndexMap::new();
    properties.insert(name.to_string(), payload);
    SchemaNode {
        ty: Some(JsonType::Object),
        required: vec![name.to_string()],
        properties: Some(properties),
        title: Some(name.to_string()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{PrimitiveKind, RawTypeDescriptor, TypeKind, TypeRef, VariantDescriptor};

    #[test]
    fn value_boolean() {
        let descriptor = RawTypeDescriptor::new("bool", "bool", TypeKind::Value)
            .with_primitive(PrimitiveKind::Boolean);
        let node = descriptor_to_schema(&descriptor);
        assert_eq!(node.ty, Some(JsonType::Boolean));
        assert_eq!(node.type_path, "bool");
    }

    #[test]
    fn value_float() {
        let descriptor =
            RawTypeDescriptor::new("f32", "f32", TypeKind::Value).with_primitive(PrimitiveKind::Float);
        let node = descriptor_to_schema(&descriptor);
        assert_eq!(node.ty, Some(JsonType::Number));
        assert_eq!(node.multiple_of, None);
    }

    #[test]
    fn value_small_int_exact_bounds() {
        let descriptor =
            RawTypeDescriptor::new("i8", "i8", TypeKind::Value).with_primitive(PrimitiveKind::Int);
        let node = descriptor_to_schema(&descriptor);
        assert_eq!(node.ty, Some(JsonType::Number));
        assert_eq!(node.multiple_of, Some(1.0));
        assert_eq!(node.minimum, Some(-128.0));
        assert_eq!(node.maximum, Some(127.0));

        let descriptor =
            RawTypeDescriptor::new("u32", "u32", TypeKind::Value).with_primitive(PrimitiveKind::Uint);
        let node = descriptor_to_schema(&descriptor);
        assert_eq!(node.minimum, Some(0.0));
        assert_eq!(node.maximum, Some(4_294_967_295.0));
    }

    #[test]
    fn value_wide_int_approximated_bounds() {
        let descriptor =
            RawTypeDescriptor::new("u64", "u64", TypeKind::Value).with_primitive(PrimitiveKind::Uint);
        let node = descriptor_to_schema(&descriptor);
        assert_eq!(node.minimum, Some(0.0));
        assert_eq!(node.maximum, Some(MAX_SAFE_INTEGER));

        let descriptor =
            RawTypeDescriptor::new("i64", "i64", TypeKind::Value).with_primitive(PrimitiveKind::Int);
        let node = descriptor_to_schema(&descriptor);
        assert_eq!(node.minimum, Some(-MAX_SAFE_INTEGER));
    }

    #[test]
    fn value_string_and_opaque() {
        let descriptor = RawTypeDescriptor::new("alloc::string::String", "String", TypeKind::Value)
            .with_primitive(PrimitiveKind::String);
        assert_eq!(descriptor_to_schema(&descriptor).ty, Some(JsonType::String));

        let descriptor = RawTypeDescriptor::new("some::Opaque", "Opaque", TypeKind::Value);
        assert_eq!(descriptor_to_schema(&descriptor).ty, Some(JsonType::Object));
    }

    #[test]
    fn list_array_set_share_shape() {
        for kind in [TypeKind::List, TypeKind::Array, TypeKind::Set] {
            let descriptor = RawTypeDescriptor::new("seq", "seq", kind)
                .with_items(TypeRef::new("f32"));
            let node = descriptor_to_schema(&descriptor);
            assert_eq!(node.ty, Some(JsonType::Array));
            match node.items {
                Some(Items::Single(element)) => assert_eq!(element.reference.as_deref(), Some("f32")),
                other => panic!("Expected single-element items, got {:?}", other),
            }
        }
    }

    #[test]
    fn struct_keeps_declaration_order() {
        let descriptor = RawTypeDescriptor::new(
            "bevy_transform::components::transform::Transform",
            "Transform",
            TypeKind::Struct,
        )
        .with_property("translation", TypeRef::new("glam::Vec3"), true)
        .with_property("rotation", TypeRef::new("glam::Quat"), true)
        .with_property("scale", TypeRef::new("glam::Vec3"), true);

        let node = descriptor_to_schema(&descriptor);
        assert_eq!(node.ty, Some(JsonType::Object));
        let names: Vec<&str> = node.properties.as_ref().unwrap().keys().map(String::as_str).collect();
        assert_eq!(names, ["translation", "rotation", "scale"]);
        assert_eq!(node.required, ["translation", "rotation", "scale"]);
    }

    #[test]
    fn tuple_fixed_arity() {
        let descriptor = RawTypeDescriptor::new("(f32, u8)", "(f32, u8)", TypeKind::Tuple)
            .with_prefix_items(vec![TypeRef::new("f32"), TypeRef::new("u8")]);
        let node = descriptor_to_schema(&descriptor);
        match node.items {
            Some(Items::Tuple(items)) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0].reference.as_deref(), Some("f32"));
                assert_eq!(items[1].reference.as_deref(), Some("u8"));
            }
            other => panic!("Expected tuple items, got {:?}", other),
        }
    }

    #[test]
    fn tuple_struct_unwraps_sole_element() {
        let descriptor = RawTypeDescriptor::new("my_game::Health", "Health", TypeKind::TupleStruct)
            .with_prefix_items(vec![TypeRef::new("f32")]);
        let node = descriptor_to_schema(&descriptor);
        assert_eq!(node.reference.as_deref(), Some("f32"));
        // Identity stays with the wrapper even though the shape is elided
        assert_eq!(node.type_path, "my_game::Health");
    }

    #[test]
    fn map_uses_additional_properties() {
        let descriptor = RawTypeDescriptor::new(
            "std::collections::HashMap<alloc::string::String, f32>",
            "HashMap<String, f32>",
            TypeKind::Map,
        )
        .with_entry_types(TypeRef::new("alloc::string::String"), TypeRef::new("f32"));
        let node = descriptor_to_schema(&descriptor);
        assert_eq!(node.ty, Some(JsonType::Object));
        assert!(node.properties.is_none());
        assert_eq!(
            node.additional_properties.unwrap().reference.as_deref(),
            Some("f32")
        );
    }

    #[test]
    fn enum_variant_shapes() {
        let descriptor = RawTypeDescriptor::new("my_game::Input", "Input", TypeKind::Enum)
            .with_variant(VariantDescriptor::Unit("Mouse".to_string()))
            .with_variant(VariantDescriptor::Tuple {
                name: "Touch".to_string(),
                prefix_items: vec![TypeRef::new("u32")],
            })
            .with_variant(VariantDescriptor::Struct {
                name: "Custom".to_string(),
                properties: [("id".to_string(), TypeRef::new("alloc::string::String"))]
                    .into_iter()
                    .collect(),
                required: vec!["id".to_string()],
            });

        let node = descriptor_to_schema(&descriptor);
        assert_eq!(node.one_of.len(), 3);

        let unit = &node.one_of[0];
        assert_eq!(unit.ty, Some(JsonType::String));
        assert_eq!(unit.const_value, Some(Value::String("Mouse".to_string())));
        assert_eq!(unit.title.as_deref(), Some("Mouse"));

        let tuple = &node.one_of[1];
        assert_eq!(tuple.ty, Some(JsonType::Object));
        assert_eq!(tuple.required, ["Touch"]);
        assert_eq!(
            tuple.properties.as_ref().unwrap()["Touch"].reference.as_deref(),
            Some("u32")
        );

        let named = &node.one_of[2];
        assert_eq!(named.title.as_deref(), Some("Custom"));
        let payload = &named.properties.as_ref().unwrap()["Custom"];
        assert_eq!(payload.ty, Some(JsonType::Object));
        assert!(payload.properties.as_ref().unwrap().contains_key("id"));
    }
}

//! Raw type-registry descriptors
//!
//! Parsed form of the type registry served by the remote reflection protocol.
//! One `RawTypeDescriptor` per registered type; references between types are
//! plain type paths resolved later by the registry's dereferencing pass.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Entity identifier as exposed by the remote protocol
pub type EntityId = u64;

/// Structural kind of a registered type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    /// Primitive leaf (bool, integers, floats, strings, opaque values)
    Value,
    /// Growable homogeneous sequence
    List,
    /// Fixed-length homogeneous sequence
    Array,
    /// Unordered homogeneous collection
    Set,
    /// Key/value mapping
    Map,
    /// Named-field product type
    Struct,
    /// Anonymous ordered product type
    Tuple,
    /// Named single-or-multi field wrapper
    TupleStruct,
    /// Sum type with named variants
    Enum,
}

/// Primitive tag carried by `TypeKind::Value` descriptors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    Boolean,
    Float,
    Int,
    Uint,
    String,
    /// Reflected but not serializable to a primitive; rendered opaque
    Object,
}

/// Reference to another registry entry by fully-qualified type path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeRef(pub String);

impl TypeRef {
    pub fn new(type_path: impl Into<String>) -> Self {
        TypeRef(type_path.into())
    }

    pub fn type_path(&self) -> &str {
        &self.0
    }
}

/// One variant of an enum descriptor
///
/// A variant is either a bare name (unit), tuple-shaped with positional
/// payload types, or struct-shaped with named fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariantDescriptor {
    Unit(String),
    Tuple {
        name: String,
        #[serde(rename = "prefixItems")]
        prefix_items: Vec<TypeRef>,
    },
    Struct {
        name: String,
        properties: IndexMap<String, TypeRef>,
        #[serde(default)]
        required: Vec<String>,
    },
}

impl VariantDescriptor {
    /// Variant name regardless of shape
    pub fn name(&self) -> &str {
        match self {
            VariantDescriptor::Unit(name) => name,
            VariantDescriptor::Tuple { name, .. } => name,
            VariantDescriptor::Struct { name, .. } => name,
        }
    }

    /// Whether this variant carries no payload
    pub fn is_unit(&self) -> bool {
        matches!(self, VariantDescriptor::Unit(_))
    }
}

/// One entry of the remote type registry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTypeDescriptor {
    /// Globally unique type identifier (e.g. `glam::Vec3`)
    pub type_path: String,
    /// Display name (e.g. `Vec3`)
    pub short_path: String,
    /// Structural kind, drives codec dispatch
    pub kind: TypeKind,
    /// Primitive tag (kind = Value)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primitive: Option<PrimitiveKind>,
    /// Element type (kind = List/Array/Set)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<TypeRef>,
    /// Key type (kind = Map)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_type: Option<TypeRef>,
    /// Value type (kind = Map)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<TypeRef>,
    /// Named fields in declaration order (kind = Struct)
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, TypeRef>,
    /// Names of required fields (kind = Struct)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Positional element types (kind = Tuple/TupleStruct)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prefix_items: Vec<TypeRef>,
    /// Variants in declaration order (kind = Enum)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<VariantDescriptor>,
    /// The remote reflects this type but refuses writes to it
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub read_only: bool,
}

impl RawTypeDescriptor {
    /// Minimal descriptor with just identity and kind; kind-specific fields
    /// are filled by the builder-style helpers below (used heavily in tests).
    pub fn new(type_path: impl Into<String>, short_path: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            type_path: type_path.into(),
            short_path: short_path.into(),
            kind,
            primitive: None,
            items: None,
            key_type: None,
            value_type: None,
            properties: IndexMap::new(),
            required: Vec::new(),
            prefix_items: Vec::new(),
            one_of: Vec::new(),
            read_only: false,
        }
    }

    pub fn with_read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn with_primitive(mut self, primitive: PrimitiveKind) -> Self {
        self.primitive = Some(primitive);
        self
    }

    pub fn with_items(mut self, items: TypeRef) -> Self {
        self.items = Some(items);
        self
    }

    pub fn with_entry_types(mut self, key: TypeRef, value: TypeRef) -> Self {
        self.key_type = Some(key);
        self.value_type = Some(value);
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, ty: TypeRef, required: bool) -> Self {
        let name = name.into();
        if required {
            self.required.push(name.clone());
        }
        self.properties.insert(name, ty);
        self
    }

    pub fn with_prefix_items(mut self, items: Vec<TypeRef>) -> Self {
        self.prefix_items = items;
        self
    }

    pub fn with_variant(mut self, variant: VariantDescriptor) -> Self {
        self.one_of.push(variant);
        self
    }
}

/// A runtime value paired with its type, or the error that replaced it
///
/// The remote data layer produces one of these per requested component or
/// resource. `value` and `error` are mutually exclusive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedValue {
    pub type_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TypedValue {
    pub fn ok(type_path: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            type_path: type_path.into(),
            value: Some(value),
            error: None,
        }
    }

    pub fn err(type_path: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            type_path: type_path.into(),
            value: None,
            error: Some(error.into()),
        }
    }

    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }
}

/// Flat entity row returned by the remote query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRow {
    pub id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<EntityId>,
}

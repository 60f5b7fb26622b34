//! Value tree
//!
//! Pairs one component/resource value with its schema. `render` produces a
//! declarative widget description for the host to draw; the edit operations
//! produce merged copies of the value plus the single outgoing update event,
//! so no callback ever captures stale sibling state.
//!
//! Bubbling rules: an object container re-emits a child edit at the object's
//! own path carrying the merged shallow copy; arrays, tuples and optionals
//! pass events through; any edit inside a sum-type's payload is flattened to
//! the sum's own path with the whole updated variant value, because the
//! remote mutation call cannot address paths inside an enum payload. The
//! mount root forwards without rewrapping.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::descriptor::TypedValue;
use crate::error::{InspectorError, Result};
use crate::schema::{fixups::vector_arity, Items, JsonType, SchemaNode};

use super::adhere::find_selected_index;
use super::defaults::generate_default;
use super::path::{get_at, push_field, push_index, set_at, split_first, Segment};

/// A path-addressed update leaving the tree, tagged with the owning type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditEvent {
    pub type_path: String,
    pub path: String,
    pub value: Value,
}

/// Declarative description of one rendered node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Widget {
    NumberField {
        path: String,
        value: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        minimum: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        maximum: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        step: Option<f64>,
        read_only: bool,
    },
    TextField {
        path: String,
        value: String,
        read_only: bool,
    },
    Checkbox {
        path: String,
        value: bool,
    },
    /// Fixed-arity numeric row (vectors, quaternions)
    VectorRow {
        path: String,
        label: String,
        values: Vec<f64>,
    },
    StructGroup {
        path: String,
        fields: Vec<NamedWidget>,
    },
    MapGroup {
        path: String,
        entries: Vec<NamedWidget>,
    },
    SequenceEditor {
        path: String,
        items: Vec<Widget>,
        /// Fixed-length sequences take no insertion/removal
        fixed: bool,
    },
    TupleGroup {
        path: String,
        items: Vec<Widget>,
    },
    VariantSelect {
        path: String,
        options: Vec<String>,
        selected: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        body: Option<Box<Widget>>,
    },
    OptionalField {
        path: String,
        present: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        body: Option<Box<Widget>>,
    },
    /// Null leaf with nothing to edit
    Unit { path: String },
    /// Type without a usable schema; shown, not edited
    Opaque { path: String, type_path: String },
    /// Value that arrived as an error; excluded from editing
    ErrorCard { path: String, message: String },
}

/// A child widget labelled by its property or entry name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedWidget {
    pub name: String,
    pub widget: Widget,
}

/// Per-mount state of one sum-type node: the variant resolved by structural
/// adherence and one eagerly-defaulted value slot per variant, so switching
/// back and forth is non-destructive within an editing session
#[derive(Debug, Clone)]
struct SumState {
    selected: usize,
    slots: Vec<Value>,
}

/// Container classification used during edit bubbling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Sum,
    Object,
    Transparent,
}

/// One mounted value/schema pairing
pub struct ValueTree {
    type_path: String,
    schema: Arc<SchemaNode>,
    value: Value,
    error: Option<String>,
    sums: HashMap<String, SumState>,
}

impl ValueTree {
    /// Mount a fetched value against its resolved schema. Sum-type variant
    /// selection happens once, here.
    pub fn mount(typed: &TypedValue, schema: Arc<SchemaNode>) -> Self {
        let error = typed.error.clone();
        let value = typed.value.clone().unwrap_or(Value::Null);

        let mut sums = HashMap::new();
        if error.is_none() {
            collect_sum_states(&value, &schema, String::new(), &mut sums);
        }

        Self {
            type_path: typed.type_path.clone(),
            schema,
            value,
            error,
            sums,
        }
    }

    pub fn type_path(&self) -> &str {
        &self.type_path
    }

    /// Current merged value copy
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Whether edits are accepted at all (error values and opaque fallback
    /// schemas are excluded from the mutation path)
    pub fn is_editable(&self) -> bool {
        self.error.is_none() && (self.schema.ty.is_some() || !self.schema.one_of.is_empty())
    }

    // ========== Rendering ==========

    /// Produce the widget description for the whole tree
    pub fn render(&self) -> Widget {
        if let Some(message) = &self.error {
            return Widget::ErrorCard {
                path: String::new(),
                message: message.clone(),
            };
        }
        self.render_node(&self.value, &self.schema, String::new())
    }

    fn render_node(&self, value: &Value, schema: &SchemaNode, path: String) -> Widget {
        // Type-path special cases come first
        if let Some(arity) = vector_arity(&schema.type_path) {
            let mut values: Vec<f64> = value
                .as_array()
                .map(|elements| elements.iter().filter_map(Value::as_f64).collect())
                .unwrap_or_default();
            values.resize(arity, 0.0);
            return Widget::VectorRow {
                path,
                label: schema.short_path.clone(),
                values,
            };
        }

        if schema.is_optional() {
            let present = !value.is_null();
            let body = match (present, schema.optional_payload()) {
                (true, Some(payload)) => {
                    // Payload renders at the optional's own path
                    Some(Box::new(self.render_node(value, payload, path.clone())))
                }
                _ => None,
            };
            return Widget::OptionalField { path, present, body };
        }

        if !schema.one_of.is_empty() {
            let selected = self
                .sums
                .get(&path)
                .map(|state| state.selected)
                .unwrap_or_else(|| find_selected_index(value, &schema.one_of));
            let options = schema
                .one_of
                .iter()
                .enumerate()
                .map(|(index, variant)| variant_title(variant, index))
                .collect();
            let body = schema.one_of.get(selected).and_then(|variant| {
                if variant.const_value.is_some() {
                    None
                } else {
                    Some(Box::new(self.render_node(value, variant, path.clone())))
                }
            });
            return Widget::VariantSelect {
                path,
                options,
                selected,
                body,
            };
        }

        match schema.ty {
            Some(JsonType::Number) => Widget::NumberField {
                path,
                value: value.as_f64().unwrap_or(0.0),
                minimum: schema.minimum,
                maximum: schema.maximum,
                step: schema.multiple_of,
                read_only: schema.read_only,
            },
            Some(JsonType::String) => Widget::TextField {
                path,
                value: value.as_str().unwrap_or_default().to_string(),
                read_only: schema.read_only,
            },
            Some(JsonType::Boolean) => Widget::Checkbox {
                path,
                value: value.as_bool().unwrap_or(false),
            },
            Some(JsonType::Null) => Widget::Unit { path },
            Some(JsonType::Array) => self.render_array(value, schema, path),
            Some(JsonType::Object) => self.render_object(value, schema, path),
            None => Widget::Opaque {
                path,
                type_path: schema.type_path.clone(),
            },
        }
    }

    fn render_array(&self, value: &Value, schema: &SchemaNode, path: String) -> Widget {
        let null = Value::Null;
        match &schema.items {
            Some(Items::Tuple(elements)) => Widget::TupleGroup {
                items: elements
                    .iter()
                    .enumerate()
                    .map(|(index, element)| {
                        let child = value.get(index).unwrap_or(&null);
                        self.render_node(child, element, push_index(&path, index))
                    })
                    .collect(),
                path,
            },
            Some(Items::Single(element)) => {
                let fixed = schema.min_items.is_some() && schema.min_items == schema.max_items;
                let items = value
                    .as_array()
                    .map(|children| {
                        children
                            .iter()
                            .enumerate()
                            .map(|(index, child)| {
                                self.render_node(child, element, push_index(&path, index))
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                Widget::SequenceEditor { path, items, fixed }
            }
            None => Widget::SequenceEditor {
                path,
                items: Vec::new(),
                fixed: false,
            },
        }
    }

    fn render_object(&self, value: &Value, schema: &SchemaNode, path: String) -> Widget {
        let null = Value::Null;
        if let Some(properties) = &schema.properties {
            let fields = properties
                .iter()
                .map(|(name, child_schema)| {
                    let child = value.get(name).unwrap_or(&null);
                    NamedWidget {
                        name: name.clone(),
                        widget: self.render_node(child, child_schema, push_field(&path, name)),
                    }
                })
                .collect();
            return Widget::StructGroup { path, fields };
        }

        if let Some(value_schema) = &schema.additional_properties {
            let entries = value
                .as_object()
                .map(|object| {
                    object
                        .iter()
                        .map(|(key, entry)| NamedWidget {
                            name: key.clone(),
                            widget: self.render_node(entry, value_schema, push_field(&path, key)),
                        })
                        .collect()
                })
                .unwrap_or_default();
            return Widget::MapGroup { path, entries };
        }

        Widget::Opaque {
            path,
            type_path: schema.type_path.clone(),
        }
    }

    // ========== Editing ==========

    /// Apply a leaf edit and return the single event that leaves the tree
    pub fn set_value(&mut self, path: &str, new_value: Value) -> Result<EditEvent> {
        self.ensure_editable(path)?;
        self.value = set_at(&self.value, path, new_value)?;
        self.update_ancestor_slots(path);
        self.bubble(path)
    }

    /// Append a schema-conformant default element to a growable sequence
    pub fn insert_element(&mut self, path: &str) -> Result<EditEvent> {
        let schema = self
            .schema_at(path)
            .ok_or_else(|| not_addressable(path))?;
        let element = match (&schema.items, schema.min_items == schema.max_items && schema.min_items.is_some()) {
            (Some(Items::Single(element)), false) => element.as_ref().clone(),
            _ => return Err(InspectorError::NotEditable(path.to_string())),
        };

        let mut elements = get_at(&self.value, path)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        elements.push(generate_default(&element));

        // Indices change, so the whole array is the unit of update
        let event = self.set_value(path, Value::Array(elements))?;
        self.recollect_under(path, &schema);
        Ok(event)
    }

    /// Splice an element out of a growable sequence
    pub fn remove_element(&mut self, path: &str, index: usize) -> Result<EditEvent> {
        let schema = self
            .schema_at(path)
            .ok_or_else(|| not_addressable(path))?;
        if !matches!(&schema.items, Some(Items::Single(_)))
            || (schema.min_items.is_some() && schema.min_items == schema.max_items)
        {
            return Err(InspectorError::NotEditable(path.to_string()));
        }

        let mut elements = get_at(&self.value, path)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        if index >= elements.len() {
            return Err(InspectorError::InvalidPath {
                path: push_index(path, index),
                message: "index out of bounds".to_string(),
            });
        }
        elements.remove(index);

        let event = self.set_value(path, Value::Array(elements))?;
        self.recollect_under(path, &schema);
        Ok(event)
    }

    /// Switch the inhabited variant of a sum type. The slot for the variant
    /// being left keeps its current value; the newly selected slot's value
    /// (a prior edit or its eager default) becomes the sum's value.
    pub fn select_variant(&mut self, path: &str, index: usize) -> Result<EditEvent> {
        self.ensure_editable(path)?;
        let schema = self
            .schema_at(path)
            .ok_or_else(|| not_addressable(path))?;
        if schema.one_of.is_empty() || schema.is_optional() {
            return Err(InspectorError::NotEditable(path.to_string()));
        }

        let current = get_at(&self.value, path).cloned();
        let state = self
            .sums
            .get_mut(path)
            .ok_or_else(|| not_addressable(path))?;
        if index >= state.slots.len() {
            return Err(InspectorError::InvalidPath {
                path: path.to_string(),
                message: format!("variant index {} out of range", index),
            });
        }

        if let Some(current) = current {
            state.slots[state.selected] = current;
        }
        state.selected = index;
        let new_value = state.slots[index].clone();

        self.value = set_at(&self.value, path, new_value)?;
        self.update_ancestor_slots(path);
        if let Some(variant) = schema.one_of.get(index) {
            self.recollect_under(path, variant);
        }
        self.bubble(path)
    }

    /// Toggle an optional: off emits null at the optional's own path, on
    /// emits a freshly synthesized default for the payload schema
    pub fn set_present(&mut self, path: &str, present: bool) -> Result<EditEvent> {
        let schema = self
            .schema_at(path)
            .ok_or_else(|| not_addressable(path))?;
        let payload = schema
            .optional_payload()
            .ok_or_else(|| InspectorError::NotEditable(path.to_string()))?
            .clone();

        let new_value = if present {
            generate_default(&payload)
        } else {
            Value::Null
        };
        let event = self.set_value(path, new_value)?;

        if present {
            self.recollect_under(path, &payload);
        } else {
            self.drop_states_under(path);
        }
        Ok(event)
    }

    // ========== Internals ==========

    fn ensure_editable(&self, path: &str) -> Result<()> {
        if let Some(message) = &self.error {
            return Err(InspectorError::NotEditable(format!(
                "{} ({})",
                path, message
            )));
        }
        if !self.is_editable() {
            return Err(InspectorError::NotEditable(path.to_string()));
        }
        if let Some(schema) = self.schema_at(path) {
            if schema.read_only {
                return Err(InspectorError::NotEditable(path.to_string()));
            }
        }
        Ok(())
    }

    /// Schema node addressed by `path`, descending through optionals and the
    /// currently selected sum variants at intermediate nodes
    fn schema_at(&self, path: &str) -> Option<SchemaNode> {
        let mut current: &SchemaNode = &self.schema;
        let mut prefix = String::new();
        let mut remaining = path;

        loop {
            if remaining.is_empty() {
                return Some(current.clone());
            }

            current = self.effective_schema(current, &prefix)?;
            match split_first(remaining).ok()?? {
                (Segment::Field(name), rest) => {
                    let child = current
                        .properties
                        .as_ref()
                        .and_then(|properties| properties.get(name))
                        .or(current.additional_properties.as_deref())?;
                    prefix = push_field(&prefix, name);
                    remaining = rest;
                    current = child;
                }
                (Segment::Index(index), rest) => {
                    let child = match current.items.as_ref()? {
                        Items::Single(element) => element.as_ref(),
                        Items::Tuple(elements) => elements.get(index)?,
                    };
                    prefix = push_index(&prefix, index);
                    remaining = rest;
                    current = child;
                }
            }
        }
    }

    /// Unwrap optionals and sums sitting at `prefix` down to the schema that
    /// actually describes the children there
    fn effective_schema<'s>(
        &self,
        mut schema: &'s SchemaNode,
        prefix: &str,
    ) -> Option<&'s SchemaNode> {
        loop {
            if schema.is_optional() {
                schema = schema.optional_payload()?;
            } else if !schema.one_of.is_empty() {
                let selected = self
                    .sums
                    .get(prefix)
                    .map(|state| state.selected)
                    .unwrap_or_else(|| {
                        find_selected_index(
                            get_at(&self.value, prefix).unwrap_or(&Value::Null),
                            &schema.one_of,
                        )
                    });
                schema = schema.one_of.get(selected)?;
            } else {
                return Some(schema);
            }
        }
    }

    /// Compute the outgoing event for an edit already applied at `edit_path`
    fn bubble(&self, edit_path: &str) -> Result<EditEvent> {
        let mut containers: Vec<(String, Container)> = Vec::new();
        let mut current: &SchemaNode = &self.schema;
        let mut prefix = String::new();
        let mut remaining = edit_path;

        'walk: while !remaining.is_empty() {
            // Wrappers sharing this prefix: a sum here flattens any deeper
            // edit to its own path; optionals are transparent
            let mut node = current;
            loop {
                if node.is_optional() {
                    match node.optional_payload() {
                        Some(payload) => node = payload,
                        None => break 'walk,
                    }
                } else if !node.one_of.is_empty() {
                    containers.push((prefix.clone(), Container::Sum));
                    let selected = self
                        .sums
                        .get(&prefix)
                        .map(|state| state.selected)
                        .unwrap_or_else(|| {
                            find_selected_index(
                                get_at(&self.value, &prefix).unwrap_or(&Value::Null),
                                &node.one_of,
                            )
                        });
                    match node.one_of.get(selected) {
                        Some(variant) => node = variant,
                        None => break 'walk,
                    }
                } else {
                    break;
                }
            }

            match split_first(remaining)? {
                Some((Segment::Field(name), rest)) => {
                    containers.push((prefix.clone(), Container::Object));
                    let child = node
                        .properties
                        .as_ref()
                        .and_then(|properties| properties.get(name))
                        .or(node.additional_properties.as_deref());
                    prefix = push_field(&prefix, name);
                    remaining = rest;
                    match child {
                        Some(child) => current = child,
                        // Past the known schema; remaining ancestors are
                        // unknowable, bubble what we have
                        None => break,
                    }
                }
                Some((Segment::Index(index), rest)) => {
                    containers.push((prefix.clone(), Container::Transparent));
                    let child = match node.items.as_ref() {
                        Some(Items::Single(element)) => Some(element.as_ref()),
                        Some(Items::Tuple(elements)) => elements.get(index),
                        None => None,
                    };
                    prefix = push_index(&prefix, index);
                    remaining = rest;
                    match child {
                        Some(child) => current = child,
                        None => break,
                    }
                }
                None => break,
            }
        }

        // Deepest container first; the shallowest rewrapping container wins
        let mut event_path = edit_path.to_string();
        for (container_path, kind) in containers.iter().rev() {
            match kind {
                Container::Sum => event_path = container_path.clone(),
                Container::Object if !container_path.is_empty() => {
                    event_path = container_path.clone()
                }
                _ => {}
            }
        }

        let value = get_at(&self.value, &event_path)
            .cloned()
            .ok_or_else(|| not_addressable(&event_path))?;

        Ok(EditEvent {
            type_path: self.type_path.clone(),
            path: event_path,
            value,
        })
    }

    /// Refresh the selected slot of every sum on the path to an edit
    fn update_ancestor_slots(&mut self, edit_path: &str) {
        let mut updates: Vec<(String, Value)> = Vec::new();
        for sum_path in self.sums.keys() {
            if sum_path == edit_path || path_contains(sum_path, edit_path) {
                if let Some(value) = get_at(&self.value, sum_path) {
                    updates.push((sum_path.clone(), value.clone()));
                }
            }
        }
        for (sum_path, value) in updates {
            if let Some(state) = self.sums.get_mut(&sum_path) {
                state.slots[state.selected] = value;
            }
        }
    }

    /// Re-derive sum states strictly inside `path` after a wholesale value
    /// change there (variant switch, optional toggle, element churn)
    fn recollect_under(&mut self, path: &str, schema: &SchemaNode) {
        self.drop_states_under(path);
        let value = get_at(&self.value, path).cloned().unwrap_or(Value::Null);
        let preserved = self.sums.get(path).cloned();
        collect_sum_states(&value, schema, path.to_string(), &mut self.sums);
        if let Some(preserved) = preserved {
            self.sums.insert(path.to_string(), preserved);
        }
    }

    fn drop_states_under(&mut self, path: &str) {
        self.sums
            .retain(|sum_path, _| sum_path == path || !path_contains(path, sum_path));
    }
}

/// Is `inner` strictly inside the subtree rooted at `outer`?
fn path_contains(outer: &str, inner: &str) -> bool {
    if outer.is_empty() {
        return !inner.is_empty();
    }
    inner.len() > outer.len()
        && inner.starts_with(outer)
        && matches!(inner.as_bytes()[outer.len()], b'.' | b'[')
}

fn variant_title(variant: &SchemaNode, index: usize) -> String {
    variant
        .title
        .clone()
        .or_else(|| {
            variant
                .const_value
                .as_ref()
                .and_then(|constant| constant.as_str().map(String::from))
        })
        .unwrap_or_else(|| format!("variant {}", index))
}

fn not_addressable(path: &str) -> InspectorError {
    InspectorError::InvalidPath {
        path: path.to_string(),
        message: "no schema node at this path".to_string(),
    }
}

/// Walk the mounted value and record state for every sum-type node: the
/// variant the value adheres to, plus eager defaults for every other slot
fn collect_sum_states(
    value: &Value,
    schema: &SchemaNode,
    path: String,
    sums: &mut HashMap<String, SumState>,
) {
    if schema.is_optional() {
        if let (false, Some(payload)) = (value.is_null(), schema.optional_payload()) {
            collect_sum_states(value, payload, path, sums);
        }
        return;
    }

    if !schema.one_of.is_empty() {
        let selected = find_selected_index(value, &schema.one_of);
        let mut slots: Vec<Value> = schema.one_of.iter().map(generate_default).collect();
        if selected < slots.len() {
            slots[selected] = value.clone();
        }
        sums.insert(path.clone(), SumState { selected, slots });

        if let Some(variant) = schema.one_of.get(selected) {
            collect_sum_states(value, variant, path, sums);
        }
        return;
    }

    match schema.ty {
        Some(JsonType::Object) => {
            if let Some(properties) = &schema.properties {
                for (name, child_schema) in properties {
                    if let Some(child) = value.get(name) {
                        collect_sum_states(child, child_schema, push_field(&path, name), sums);
                    }
                }
            } else if let Some(value_schema) = &schema.additional_properties {
                if let Some(object) = value.as_object() {
                    for (key, entry) in object {
                        collect_sum_states(entry, value_schema, push_field(&path, key), sums);
                    }
                }
            }
        }
        Some(JsonType::Array) => match (&schema.items, value.as_array()) {
            (Some(Items::Single(element)), Some(children)) => {
                for (index, child) in children.iter().enumerate() {
                    collect_sum_states(child, element, push_index(&path, index), sums);
                }
            }
            (Some(Items::Tuple(elements)), Some(children)) => {
                for (index, (child, element)) in children.iter().zip(elements).enumerate() {
                    collect_sum_states(child, element, push_index(&path, index), sums);
                }
            }
            _ => {}
        },
        _ => {}
    }
}

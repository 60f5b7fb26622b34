//! Value-path algebra
//!
//! Paths locate a value inside a nested tree with `.name` and `[index]`
//! segments relative to an implicit root. The root is the empty string, so a
//! first-level field's path is just its name: `translation.x`, `points[2]`,
//! `points[2].x`.

use serde_json::Value;

use crate::error::{InspectorError, Result};

/// One parsed path segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Field(&'a str),
    Index(usize),
}

/// Append a field segment to a path
pub fn push_field(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

/// Append an index segment to a path
pub fn push_index(base: &str, index: usize) -> String {
    format!("{}[{}]", base, index)
}

/// Split the leading segment off a path; `None` for the root path
pub fn split_first(path: &str) -> Result<Option<(Segment<'_>, &str)>> {
    if path.is_empty() {
        return Ok(None);
    }

    if let Some(rest) = path.strip_prefix('[') {
        let close = rest.find(']').ok_or_else(|| invalid(path, "unterminated index"))?;
        let index: usize = rest[..close]
            .parse()
            .map_err(|_| invalid(path, "index is not a number"))?;
        let mut tail = &rest[close + 1..];
        if let Some(stripped) = tail.strip_prefix('.') {
            tail = stripped;
        }
        return Ok(Some((Segment::Index(index), tail)));
    }

    let stop = path
        .find(|c| c == '.' || c == '[')
        .unwrap_or(path.len());
    if stop == 0 {
        return Err(invalid(path, "empty field name"));
    }
    let (name, rest) = path.split_at(stop);
    let rest = rest.strip_prefix('.').unwrap_or(rest);
    Ok(Some((Segment::Field(name), rest)))
}

/// Borrow the value at `path`, if the tree has that shape
pub fn get_at<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    let mut current = value;
    let mut remaining = path;
    while let Ok(Some((segment, rest))) = split_first(remaining) {
        current = match segment {
            Segment::Field(name) => current.get(name)?,
            Segment::Index(index) => current.get(index)?,
        };
        remaining = rest;
    }
    if remaining.is_empty() {
        Some(current)
    } else {
        None
    }
}

/// Produce a new tree with `new_value` substituted at `path`.
///
/// Containers along the way are shallow-copied, never mutated in place; the
/// untouched siblings are carried over as-is.
pub fn set_at(value: &Value, path: &str, new_value: Value) -> Result<Value> {
    match split_first(path)? {
        None => Ok(new_value),
        Some((Segment::Field(name), rest)) => {
            let object = value
                .as_object()
                .ok_or_else(|| invalid(path, "field access on a non-object"))?;
            let child = object.get(name).cloned().unwrap_or(Value::Null);
            let mut merged = object.clone();
            merged.insert(name.to_string(), set_at(&child, rest, new_value)?);
            Ok(Value::Object(merged))
        }
        Some((Segment::Index(index), rest)) => {
            let array = value
                .as_array()
                .ok_or_else(|| invalid(path, "index access on a non-array"))?;
            let child = array
                .get(index)
                .ok_or_else(|| invalid(path, "index out of bounds"))?;
            let mut merged = array.clone();
            merged[index] = set_at(child, rest, new_value)?;
            Ok(Value::Array(merged))
        }
    }
}

fn invalid(path: &str, message: &str) -> InspectorError {
    InspectorError::InvalidPath {
        path: path.to_string(),
        message: message.to_string(),
    }
}

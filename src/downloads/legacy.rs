//! The boundary type for JSON fields whose shape was never enforced.

use serde_json::{Map, Value};

/// A stored JSON value classified by shape.
///
/// Legacy rows hold the same logical field as a mapping, as a JSON-encoded
/// string, as a bare list or as some unrelated scalar. Callers match on this
/// instead of probing `serde_json::Value` ad hoc.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LegacyValue<'a> {
    /// Missing field or JSON `null`.
    Absent,
    Mapping(&'a Map<String, Value>),
    Text(&'a str),
    Sequence(&'a [Value]),
    /// Numbers and booleans.
    Scalar(&'a Value),
}

impl<'a> LegacyValue<'a> {
    pub fn of(value: Option<&'a Value>) -> Self {
        match value {
            None | Some(Value::Null) => LegacyValue::Absent,
            Some(Value::Object(map)) => LegacyValue::Mapping(map),
            Some(Value::String(text)) => LegacyValue::Text(text),
            Some(Value::Array(items)) => LegacyValue::Sequence(items),
            Some(scalar) => LegacyValue::Scalar(scalar),
        }
    }
}

/// Reads a field that is supposed to be a JSON object.
///
/// Objects are returned as they are, strings are decoded as JSON once and kept
/// only if they decode to an object. Every other shape, and any decoding
/// failure, yields `None`.
pub fn parse_permissive(raw: Option<&Value>) -> Option<Map<String, Value>> {
    match LegacyValue::of(raw) {
        LegacyValue::Mapping(map) => Some(map.clone()),
        LegacyValue::Text(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        },
        LegacyValue::Absent | LegacyValue::Sequence(_) | LegacyValue::Scalar(_) => None,
    }
}

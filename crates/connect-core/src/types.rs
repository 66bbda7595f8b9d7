// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core data types shared by every adapter.
//!
//! - [`Value`]: a dynamically typed field value
//! - [`Event`]: a label to value mapping handed to the downstream pipeline
//! - [`SelectOption`]: one entry of an interactively resolved option list

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

// =============================================================================
// Value Types
// =============================================================================

/// A protocol-agnostic field value.
///
/// # Examples
///
/// ```
/// use connect_core::types::Value;
///
/// let temp = Value::Float64(25.5);
/// assert_eq!(temp.as_f64(), Some(25.5));
///
/// let status = Value::Bool(true);
/// assert_eq!(status.as_bool(), Some(true));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// Boolean value
    Bool(bool),

    /// Signed 8-bit integer
    Int8(i8),

    /// Signed 16-bit integer
    Int16(i16),

    /// Signed 32-bit integer
    Int32(i32),

    /// Signed 64-bit integer
    Int64(i64),

    /// Unsigned 8-bit integer
    UInt8(u8),

    /// Unsigned 16-bit integer
    UInt16(u16),

    /// Unsigned 32-bit integer
    UInt32(u32),

    /// Unsigned 64-bit integer
    UInt64(u64),

    /// 32-bit floating point
    Float32(f32),

    /// 64-bit floating point
    Float64(f64),

    /// UTF-8 string
    String(String),

    /// Raw bytes
    Bytes(Vec<u8>),

    /// Array of values
    Array(Vec<Value>),

    /// Date and time
    DateTime(DateTime<Utc>),

    /// Null/undefined value
    Null,
}

impl Value {
    /// Returns the type name of this value.
    ///
    /// ```
    /// use connect_core::types::Value;
    ///
    /// assert_eq!(Value::Float64(1.0).type_name(), "float64");
    /// assert_eq!(Value::Bool(true).type_name(), "bool");
    /// ```
    #[inline]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int8(_) => "int8",
            Value::Int16(_) => "int16",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::UInt8(_) => "uint8",
            Value::UInt16(_) => "uint16",
            Value::UInt32(_) => "uint32",
            Value::UInt64(_) => "uint64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Array(_) => "array",
            Value::DateTime(_) => "datetime",
            Value::Null => "null",
        }
    }

    /// Returns `true` if this is a null value.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Attempts to convert this value to a boolean.
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Attempts to convert this value to an i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int8(v) => Some(i64::from(*v)),
            Value::Int16(v) => Some(i64::from(*v)),
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            Value::UInt8(v) => Some(i64::from(*v)),
            Value::UInt16(v) => Some(i64::from(*v)),
            Value::UInt32(v) => Some(i64::from(*v)),
            Value::UInt64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Attempts to convert this value to an f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float32(v) => Some(f64::from(*v)),
            Value::Float64(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// Attempts to get this value as a string reference.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    /// Converts this value to a plain JSON value, as written into events.
    ///
    /// Datetimes become RFC 3339 strings and bytes an array of numbers.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Bool(v) => Json::Bool(*v),
            Value::Float32(v) => Json::from(*v),
            Value::Float64(v) => Json::from(*v),
            Value::String(v) => Json::String(v.clone()),
            Value::Bytes(v) => Json::from(v.clone()),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::DateTime(v) => Json::String(v.to_rfc3339()),
            Value::Null => Json::Null,
            Value::UInt64(v) => Json::from(*v),
            integer => integer.as_i64().map_or(Json::Null, Json::from),
        }
    }

    /// Builds a value from plain JSON.
    ///
    /// Integers become `Int64` (or `UInt64` when they exceed `i64`), other
    /// numbers `Float64`. Objects are not representable and map to their
    /// JSON text.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int64(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt64(u)
                } else {
                    Value::Float64(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => Value::Array(items.iter().map(Value::from_json).collect()),
            serde_json::Value::Object(_) => Value::String(json.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(v) => f.write_str(v),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Value::Array(v) => write!(f, "[{} elements]", v.len()),
            Value::DateTime(v) => f.write_str(&v.to_rfc3339()),
            Value::Null => f.write_str("null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::UInt64(v) => write!(f, "{}", v),
            integer => match integer.as_i64() {
                Some(v) => write!(f, "{}", v),
                None => f.write_str("?"),
            },
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

macro_rules! value_from {
    ($($type:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$type> for Value {
                fn from(v: $type) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
    String => String,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

// =============================================================================
// Event
// =============================================================================

/// A structured event: field label to raw value.
///
/// Events handed downstream are owned values. Cloning one produces an
/// independent copy, which is what adapters emit as snapshots.
///
/// ```
/// use connect_core::types::{Event, Value};
///
/// let event = Event::new()
///     .with_field("temperature", 21.5)
///     .with_field("running", true);
///
/// assert_eq!(event.len(), 2);
/// assert_eq!(event.get("running"), Some(&Value::Bool(true)));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Event {
    fields: BTreeMap<String, Value>,
}

impl Event {
    /// Creates an empty event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, builder style.
    pub fn with_field(mut self, label: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(label.into(), value.into());
        self
    }

    /// Sets a field, returning the previous value for that label.
    pub fn insert(&mut self, label: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(label.into(), value.into())
    }

    /// Returns the value of a field.
    pub fn get(&self, label: &str) -> Option<&Value> {
        self.fields.get(label)
    }

    /// Returns `true` if the event has a field with this label.
    pub fn contains(&self, label: &str) -> bool {
        self.fields.contains_key(label)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the event has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field labels in sorted order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Iterates over `(label, value)` pairs in label order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.fields.iter()
    }

    /// Converts the event to a JSON object of plain values.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl FromIterator<(String, Value)> for Event {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Event {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (label, value) in &self.fields {
            map.serialize_entry(label, &value.to_json())?;
        }
        map.end()
    }
}

// =============================================================================
// SelectOption
// =============================================================================

/// One selectable entry of an option list.
///
/// `label` is what a user sees, `internal_name` is the stable key stored in
/// the configuration when the option is selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    /// Display label.
    pub label: String,
    /// Stable key of the option.
    pub internal_name: String,
    /// Whether the option is currently selected.
    #[serde(default)]
    pub selected: bool,
}

impl SelectOption {
    /// Creates an unselected option.
    pub fn new(label: impl Into<String>, internal_name: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            internal_name: internal_name.into(),
            selected: false,
        }
    }

    /// Marks the option as selected.
    pub fn selected(mut self) -> Self {
        self.selected = true;
        self
    }
}

// =============================================================================
// Tests
// =============================================================================

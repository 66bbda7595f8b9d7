// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Event schema types.
//!
//! A guessed schema is an ordered list of [`EventProperty`] entries. Each one
//! names a field, its primitive type and, optionally, a measurement unit URI.
//! Schemas are produced per request and never cached.

use serde::{Deserialize, Serialize};

use crate::types::{Event, Value};

// =============================================================================
// PrimitiveType
// =============================================================================

/// Primitive type of an event field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    /// xsd:boolean
    Boolean,
    /// xsd:integer (32 bit and narrower)
    Integer,
    /// xsd:long
    Long,
    /// xsd:float
    Float,
    /// xsd:double
    Double,
    /// xsd:string
    String,
}

impl PrimitiveType {
    /// Returns the XML schema datatype URI.
    pub fn uri(&self) -> &'static str {
        match self {
            Self::Boolean => "http://www.w3.org/2001/XMLSchema#boolean",
            Self::Integer => "http://www.w3.org/2001/XMLSchema#integer",
            Self::Long => "http://www.w3.org/2001/XMLSchema#long",
            Self::Float => "http://www.w3.org/2001/XMLSchema#float",
            Self::Double => "http://www.w3.org/2001/XMLSchema#double",
            Self::String => "http://www.w3.org/2001/XMLSchema#string",
        }
    }

    /// Derives the primitive type of a sampled value.
    ///
    /// Values without a primitive counterpart (bytes, arrays, datetimes,
    /// null) are reported as strings.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Bool(_) => Self::Boolean,
            Value::Int8(_) | Value::Int16(_) | Value::Int32(_) | Value::UInt8(_) | Value::UInt16(_) => {
                Self::Integer
            }
            Value::Int64(_) | Value::UInt32(_) | Value::UInt64(_) => Self::Long,
            Value::Float32(_) => Self::Float,
            Value::Float64(_) => Self::Double,
            Value::String(_)
            | Value::Bytes(_)
            | Value::Array(_)
            | Value::DateTime(_)
            | Value::Null => Self::String,
        }
    }
}

// =============================================================================
// EventProperty / EventSchema
// =============================================================================

/// One field of an event schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventProperty {
    /// Field key in emitted events.
    pub runtime_name: String,
    /// Human readable label.
    pub label: String,
    /// Primitive type of the field.
    pub runtime_type: PrimitiveType,
    /// Measurement unit URI, absent when the source reports no unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement_unit: Option<String>,
}

impl EventProperty {
    /// Creates a property whose runtime name and label are both `name`.
    pub fn primitive(name: impl Into<String>, runtime_type: PrimitiveType) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            runtime_name: name,
            runtime_type,
            measurement_unit: None,
        }
    }

    /// Attaches a measurement unit URI.
    pub fn with_measurement_unit(mut self, unit: impl Into<String>) -> Self {
        self.measurement_unit = Some(unit.into());
        self
    }
}

/// Ordered list of event fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSchema {
    /// Fields in discovery order.
    pub properties: Vec<EventProperty>,
}

impl EventSchema {
    /// Creates a schema from properties.
    pub fn new(properties: Vec<EventProperty>) -> Self {
        Self { properties }
    }

    /// Looks up a field by runtime name.
    pub fn property(&self, runtime_name: &str) -> Option<&EventProperty> {
        self.properties.iter().find(|p| p.runtime_name == runtime_name)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Returns `true` if the schema has no fields.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// Result of a schema guess.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GuessSchema {
    /// The guessed schema.
    pub event_schema: EventSchema,
    /// Sample events observed while guessing.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub preview: Vec<Event>,
}

impl GuessSchema {
    /// Creates a guess without preview events.
    pub fn new(event_schema: EventSchema) -> Self {
        Self {
            event_schema,
            preview: Vec::new(),
        }
    }

    /// Attaches preview events.
    pub fn with_preview(mut self, preview: Vec<Event>) -> Self {
        self.preview = preview;
        self
    }
}

/// Derives a schema from sample events.
///
/// Fields appear in the order they are first seen. The first non-null value
/// of a field decides its type.
pub fn infer_schema(events: &[Event]) -> EventSchema {
    let mut properties: Vec<EventProperty> = Vec::new();
    let mut typed: Vec<bool> = Vec::new();

    for event in events {
        for (label, value) in event.iter() {
            match properties.iter().position(|p| &p.runtime_name == label) {
                Some(idx) => {
                    if !typed[idx] && !value.is_null() {
                        properties[idx].runtime_type = PrimitiveType::of(value);
                        typed[idx] = true;
                    }
                }
                None => {
                    properties.push(EventProperty::primitive(label.clone(), PrimitiveType::of(value)));
                    typed.push(!value.is_null());
                }
            }
        }
    }

    EventSchema::new(properties)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_type_of_value() {
        assert_eq!(PrimitiveType::of(&Value::Bool(true)), PrimitiveType::Boolean);
        assert_eq!(PrimitiveType::of(&Value::Int16(1)), PrimitiveType::Integer);
        assert_eq!(PrimitiveType::of(&Value::UInt32(1)), PrimitiveType::Long);
        assert_eq!(PrimitiveType::of(&Value::Float32(1.0)), PrimitiveType::Float);
        assert_eq!(PrimitiveType::of(&Value::Float64(1.0)), PrimitiveType::Double);
        assert_eq!(PrimitiveType::of(&Value::Null), PrimitiveType::String);
    }

    #[test]
    fn test_unit_is_omitted_when_absent() {
        let prop = EventProperty::primitive("speed", PrimitiveType::Double);
        let json = serde_json::to_value(&prop).unwrap();
        assert!(json.get("measurement_unit").is_none());
        assert_eq!(json["runtime_type"], "double");

        let prop = prop.with_measurement_unit("http://qudt.org/vocab/unit#MeterPerSecond");
        let json = serde_json::to_value(&prop).unwrap();
        assert_eq!(json["measurement_unit"], "http://qudt.org/vocab/unit#MeterPerSecond");
    }

    #[test]
    fn test_infer_schema_from_events() {
        let events = vec![
            Event::new().with_field("a", Value::Null).with_field("b", 1i64),
            Event::new().with_field("a", 2.5f64).with_field("c", "x"),
        ];
        let schema = infer_schema(&events);
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.property("a").unwrap().runtime_type, PrimitiveType::Double);
        assert_eq!(schema.property("b").unwrap().runtime_type, PrimitiveType::Long);
        assert_eq!(schema.property("c").unwrap().runtime_type, PrimitiveType::String);
    }
}

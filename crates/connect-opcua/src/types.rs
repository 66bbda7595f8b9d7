// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA specific types.
//!
//! - **NodeId**: the four OPC UA identifier kinds, with parsing
//! - **OpcUaDataType**: built-in data types and their schema counterparts
//! - **NodeClass**: node classes as reported by browse
//! - **SubscriptionSettings**: publishing and sampling parameters
//!
//! # Examples
//!
//! ```
//! use connect_opcua::types::NodeId;
//!
//! let node_id: NodeId = "ns=2;s=Plant.Line1.Speed".parse().unwrap();
//! assert_eq!(node_id.namespace_index, 2);
//! assert_eq!(node_id.native_identifier(), "Plant.Line1.Speed");
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use connect_core::PrimitiveType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ConfigurationError, OpcUaError};

// =============================================================================
// NodeId
// =============================================================================

/// OPC UA Node Identifier.
///
/// A NodeId is a namespace index plus an identifier, which can be numeric,
/// string, GUID or opaque (byte string).
///
/// # Examples
///
/// ```
/// use connect_opcua::types::NodeId;
///
/// let numeric = NodeId::numeric(2, 1001);
/// let string = NodeId::string(2, "MyDevice.Temperature");
/// let parsed: NodeId = "ns=2;s=MyDevice.Temperature".parse().unwrap();
///
/// assert_eq!(parsed, string);
/// assert_eq!(numeric.to_string(), "ns=2;i=1001");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    /// Namespace index (0 = OPC UA standard namespace).
    pub namespace_index: u16,

    /// The node identifier.
    pub identifier: NodeIdentifier,
}

impl NodeId {
    /// Creates a numeric node ID.
    #[inline]
    pub fn numeric(namespace_index: u16, value: u32) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Numeric(value),
        }
    }

    /// Creates a string node ID.
    #[inline]
    pub fn string(namespace_index: u16, value: impl Into<String>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::String(value.into()),
        }
    }

    /// Creates a GUID node ID.
    #[inline]
    pub fn guid(namespace_index: u16, value: Uuid) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Guid(value),
        }
    }

    /// Creates an opaque node ID.
    #[inline]
    pub fn opaque(namespace_index: u16, value: Vec<u8>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Opaque(value),
        }
    }

    /// The well-known `Objects` folder (`ns=0;i=85`).
    pub fn objects_folder() -> Self {
        Self::numeric(0, 85)
    }

    /// Builds the root node id from configuration values.
    ///
    /// `identifier` may be a full node id string (`ns=2;s=Plant`), in which
    /// case its own namespace wins. Otherwise a purely numeric identifier
    /// becomes a numeric node id and anything else a string node id in
    /// `namespace_index`.
    ///
    /// ```
    /// use connect_opcua::types::NodeId;
    ///
    /// assert_eq!(NodeId::from_parts(2, "1001").unwrap(), NodeId::numeric(2, 1001));
    /// assert_eq!(NodeId::from_parts(3, "Plant").unwrap(), NodeId::string(3, "Plant"));
    /// assert_eq!(NodeId::from_parts(3, "ns=1;i=5").unwrap(), NodeId::numeric(1, 5));
    /// ```
    pub fn from_parts(namespace_index: u16, identifier: &str) -> Result<Self, OpcUaError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(OpcUaError::configuration(ConfigurationError::invalid_node_id(
                identifier,
                "Empty identifier",
            )));
        }
        if identifier.starts_with("ns=") || has_type_prefix(identifier) {
            let mut parsed: NodeId = identifier.parse()?;
            if !identifier.starts_with("ns=") {
                parsed.namespace_index = namespace_index;
            }
            return Ok(parsed);
        }
        Ok(match identifier.parse::<u32>() {
            Ok(n) => Self::numeric(namespace_index, n),
            Err(_) => Self::string(namespace_index, identifier),
        })
    }

    /// Returns the identifier without namespace or type prefix.
    ///
    /// This is the key notifications are matched by and the value stored
    /// when a point is selected.
    pub fn native_identifier(&self) -> String {
        match &self.identifier {
            NodeIdentifier::Numeric(v) => v.to_string(),
            NodeIdentifier::String(v) => v.clone(),
            NodeIdentifier::Guid(v) => v.to_string(),
            NodeIdentifier::Opaque(v) => BASE64.encode(v),
        }
    }

    /// Returns the OPC UA string form, e.g. `ns=2;s=Temperature`.
    pub fn to_opc_string(&self) -> String {
        format!("ns={};{}", self.namespace_index, self.identifier)
    }
}

fn has_type_prefix(s: &str) -> bool {
    ["i=", "s=", "g=", "b="].iter().any(|p| s.starts_with(p))
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_opc_string())
    }
}

impl FromStr for NodeId {
    type Err = OpcUaError;

    /// Parses a NodeId from OPC UA string format.
    ///
    /// Supported formats:
    /// - `ns=2;i=1001` (numeric)
    /// - `ns=2;s=MyNode` (string)
    /// - `ns=2;g=550e8400-e29b-41d4-a716-446655440000` (GUID)
    /// - `ns=2;b=SGVsbG8=` (opaque, base64 encoded)
    /// - `i=1001`, `s=MyNode` (namespace 0)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = |reason: String| OpcUaError::configuration(ConfigurationError::invalid_node_id(s, reason));

        let (namespace_index, identifier_part) = match s.strip_prefix("ns=") {
            Some(rest) => {
                let (ns_str, id) = rest
                    .split_once(';')
                    .ok_or_else(|| invalid("Missing identifier after namespace".to_string()))?;
                let ns: u16 = ns_str
                    .parse()
                    .map_err(|_| invalid("Invalid namespace index".to_string()))?;
                (ns, id)
            }
            None => (0, s),
        };

        let identifier = if let Some(id) = identifier_part.strip_prefix("i=") {
            let value: u32 = id
                .parse()
                .map_err(|_| invalid("Invalid numeric identifier".to_string()))?;
            NodeIdentifier::Numeric(value)
        } else if let Some(id) = identifier_part.strip_prefix("s=") {
            NodeIdentifier::String(id.to_string())
        } else if let Some(id) = identifier_part.strip_prefix("g=") {
            let uuid = Uuid::parse_str(id).map_err(|e| invalid(format!("Invalid GUID: {}", e)))?;
            NodeIdentifier::Guid(uuid)
        } else if let Some(id) = identifier_part.strip_prefix("b=") {
            let bytes = BASE64
                .decode(id)
                .map_err(|e| invalid(format!("Invalid base64: {}", e)))?;
            NodeIdentifier::Opaque(bytes)
        } else {
            return Err(invalid(
                "Unknown identifier type. Expected i=, s=, g=, or b=".to_string(),
            ));
        };

        Ok(Self {
            namespace_index,
            identifier,
        })
    }
}

// =============================================================================
// NodeIdentifier
// =============================================================================

/// OPC UA node identifier kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum NodeIdentifier {
    /// Numeric identifier.
    Numeric(u32),

    /// String identifier.
    String(String),

    /// GUID identifier.
    Guid(Uuid),

    /// Opaque identifier.
    Opaque(Vec<u8>),
}

impl fmt::Display for NodeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(v) => write!(f, "i={}", v),
            Self::String(v) => write!(f, "s={}", v),
            Self::Guid(v) => write!(f, "g={}", v),
            Self::Opaque(v) => write!(f, "b={}", BASE64.encode(v)),
        }
    }
}

// =============================================================================
// OpcUaDataType
// =============================================================================

/// OPC UA built-in data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpcUaDataType {
    /// Boolean value.
    Boolean,
    /// Signed 8-bit integer.
    SByte,
    /// Unsigned 8-bit integer.
    Byte,
    /// Signed 16-bit integer.
    Int16,
    /// Unsigned 16-bit integer.
    UInt16,
    /// Signed 32-bit integer.
    Int32,
    /// Unsigned 32-bit integer.
    UInt32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 64-bit integer.
    UInt64,
    /// 32-bit IEEE 754 float.
    Float,
    /// 64-bit IEEE 754 double.
    Double,
    /// UTF-8 string.
    String,
    /// Date and time.
    DateTime,
    /// GUID.
    Guid,
    /// Raw byte string.
    ByteString,
    /// Status code.
    StatusCode,
    /// Localized text.
    LocalizedText,
    /// Anything else.
    Variant,
}

impl OpcUaDataType {
    /// Returns the OPC UA type id (`ns=0;i=<id>`) of this data type.
    pub const fn type_id(&self) -> u32 {
        match self {
            Self::Boolean => 1,
            Self::SByte => 2,
            Self::Byte => 3,
            Self::Int16 => 4,
            Self::UInt16 => 5,
            Self::Int32 => 6,
            Self::UInt32 => 7,
            Self::Int64 => 8,
            Self::UInt64 => 9,
            Self::Float => 10,
            Self::Double => 11,
            Self::String => 12,
            Self::DateTime => 13,
            Self::Guid => 14,
            Self::ByteString => 15,
            Self::StatusCode => 19,
            Self::LocalizedText => 21,
            Self::Variant => 24,
        }
    }

    /// Maps a data type node id to a built-in type.
    ///
    /// Non built-in types (structures, enumerations, subtypes) map to
    /// `Variant`.
    pub fn from_type_node(node_id: &NodeId) -> Self {
        match (node_id.namespace_index, &node_id.identifier) {
            (0, NodeIdentifier::Numeric(id)) => Self::from_type_id(*id),
            _ => Self::Variant,
        }
    }

    /// Maps a namespace 0 type id to a built-in type.
    pub fn from_type_id(id: u32) -> Self {
        match id {
            1 => Self::Boolean,
            2 => Self::SByte,
            3 => Self::Byte,
            4 => Self::Int16,
            5 => Self::UInt16,
            6 => Self::Int32,
            7 => Self::UInt32,
            8 => Self::Int64,
            9 => Self::UInt64,
            10 => Self::Float,
            11 => Self::Double,
            12 => Self::String,
            13 => Self::DateTime,
            14 => Self::Guid,
            15 => Self::ByteString,
            19 => Self::StatusCode,
            21 => Self::LocalizedText,
            _ => Self::Variant,
        }
    }

    /// Returns the schema primitive type values of this type are reported as.
    pub const fn primitive_type(&self) -> PrimitiveType {
        match self {
            Self::Boolean => PrimitiveType::Boolean,
            Self::SByte | Self::Byte | Self::Int16 | Self::UInt16 | Self::Int32 => PrimitiveType::Integer,
            Self::UInt32 | Self::Int64 | Self::UInt64 | Self::StatusCode => PrimitiveType::Long,
            Self::Float => PrimitiveType::Float,
            Self::Double => PrimitiveType::Double,
            _ => PrimitiveType::String,
        }
    }

    /// Returns the display name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::SByte => "SByte",
            Self::Byte => "Byte",
            Self::Int16 => "Int16",
            Self::UInt16 => "UInt16",
            Self::Int32 => "Int32",
            Self::UInt32 => "UInt32",
            Self::Int64 => "Int64",
            Self::UInt64 => "UInt64",
            Self::Float => "Float",
            Self::Double => "Double",
            Self::String => "String",
            Self::DateTime => "DateTime",
            Self::Guid => "Guid",
            Self::ByteString => "ByteString",
            Self::StatusCode => "StatusCode",
            Self::LocalizedText => "LocalizedText",
            Self::Variant => "Variant",
        }
    }
}

impl fmt::Display for OpcUaDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// =============================================================================
// NodeClass
// =============================================================================

/// OPC UA node class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeClass {
    /// Object node.
    Object,
    /// Variable node.
    Variable,
    /// Method node.
    Method,
    /// Object type node.
    ObjectType,
    /// Variable type node.
    VariableType,
    /// Reference type node.
    ReferenceType,
    /// Data type node.
    DataType,
    /// View node.
    View,
}

impl NodeClass {
    /// Creates from OPC UA value.
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Object),
            2 => Some(Self::Variable),
            4 => Some(Self::Method),
            8 => Some(Self::ObjectType),
            16 => Some(Self::VariableType),
            32 => Some(Self::ReferenceType),
            64 => Some(Self::DataType),
            128 => Some(Self::View),
            _ => None,
        }
    }

    /// Returns `true` if nodes of this class carry a value.
    pub const fn has_value(&self) -> bool {
        matches!(self, Self::Variable)
    }

    /// Returns `true` if nodes of this class organise other nodes.
    pub const fn is_container(&self) -> bool {
        matches!(self, Self::Object | Self::View)
    }
}

// =============================================================================
// SubscriptionSettings
// =============================================================================

/// OPC UA subscription parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionSettings {
    /// Publishing interval in milliseconds.
    #[serde(default = "default_publishing_interval_ms")]
    pub publishing_interval_ms: u64,

    /// Sampling interval of monitored items in milliseconds.
    #[serde(default = "default_sampling_interval_ms")]
    pub sampling_interval_ms: u64,

    /// Lifetime count (publishing intervals before the subscription expires).
    #[serde(default = "default_lifetime_count")]
    pub lifetime_count: u32,

    /// Max keep-alive count.
    #[serde(default = "default_keepalive_count")]
    pub keepalive_count: u32,

    /// Maximum notifications per publish.
    #[serde(default = "default_max_notifications")]
    pub max_notifications_per_publish: u32,

    /// Priority (0-255, higher is more important).
    #[serde(default)]
    pub priority: u8,
}

fn default_publishing_interval_ms() -> u64 {
    1000
}

fn default_sampling_interval_ms() -> u64 {
    250
}

fn default_lifetime_count() -> u32 {
    60
}

fn default_keepalive_count() -> u32 {
    10
}

fn default_max_notifications() -> u32 {
    65535
}

impl Default for SubscriptionSettings {
    fn default() -> Self {
        Self {
            publishing_interval_ms: default_publishing_interval_ms(),
            sampling_interval_ms: default_sampling_interval_ms(),
            lifetime_count: default_lifetime_count(),
            keepalive_count: default_keepalive_count(),
            max_notifications_per_publish: default_max_notifications(),
            priority: 0,
        }
    }
}

impl SubscriptionSettings {
    /// Publishing interval.
    pub fn publishing_interval(&self) -> Duration {
        Duration::from_millis(self.publishing_interval_ms)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_node_ids() {
        let n: NodeId = "ns=2;i=1001".parse().unwrap();
        assert_eq!(n, NodeId::numeric(2, 1001));

        let s: NodeId = "ns=2;s=Temperature.Zone1.Sensor3".parse().unwrap();
        assert_eq!(s.native_identifier(), "Temperature.Zone1.Sensor3");

        let zero: NodeId = "i=85".parse().unwrap();
        assert_eq!(zero, NodeId::objects_folder());

        let g: NodeId = "ns=1;g=550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
        assert!(matches!(g.identifier, NodeIdentifier::Guid(_)));

        let b: NodeId = "ns=1;b=SGVsbG8=".parse().unwrap();
        assert_eq!(b.identifier, NodeIdentifier::Opaque(b"Hello".to_vec()));
        assert_eq!(b.native_identifier(), "SGVsbG8=");
    }

    #[test]
    fn test_parse_invalid_node_ids() {
        assert!("ns=x;i=1".parse::<NodeId>().is_err());
        assert!("ns=2".parse::<NodeId>().is_err());
        assert!("ns=2;i=abc".parse::<NodeId>().is_err());
        assert!("ns=2;q=abc".parse::<NodeId>().is_err());
        assert!(NodeId::from_parts(2, "  ").is_err());
    }

    #[test]
    fn test_from_parts_prefixed_identifier_uses_namespace() {
        assert_eq!(NodeId::from_parts(4, "s=Line").unwrap(), NodeId::string(4, "Line"));
    }

    #[test]
    fn test_display_roundtrip() {
        let node = NodeId::string(3, "Plant.Line1");
        assert_eq!(node.to_string(), "ns=3;s=Plant.Line1");
        assert_eq!(node.to_string().parse::<NodeId>().unwrap(), node);
    }

    #[test]
    fn test_data_type_mapping() {
        assert_eq!(OpcUaDataType::from_type_node(&NodeId::numeric(0, 11)), OpcUaDataType::Double);
        assert_eq!(OpcUaDataType::from_type_node(&NodeId::numeric(2, 11)), OpcUaDataType::Variant);
        assert_eq!(OpcUaDataType::Int32.primitive_type(), PrimitiveType::Integer);
        assert_eq!(OpcUaDataType::UInt32.primitive_type(), PrimitiveType::Long);
        assert_eq!(OpcUaDataType::DateTime.primitive_type(), PrimitiveType::String);
        for t in [OpcUaDataType::Boolean, OpcUaDataType::Double, OpcUaDataType::LocalizedText] {
            assert_eq!(OpcUaDataType::from_type_id(t.type_id()), t);
        }
    }

    #[test]
    fn test_node_class() {
        assert_eq!(NodeClass::from_value(2), Some(NodeClass::Variable));
        assert!(NodeClass::Variable.has_value());
        assert!(NodeClass::Object.is_container());
        assert!(NodeClass::from_value(3).is_none());
    }

    #[test]
    fn test_subscription_settings_defaults() {
        let settings: SubscriptionSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, SubscriptionSettings::default());
        assert_eq!(settings.publishing_interval(), Duration::from_secs(1));
    }
}

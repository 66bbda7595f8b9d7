// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA transport abstraction layer.
//!
//! [`OpcUaTransport`] is the seam between the adapter logic and an actual
//! OPC UA stack. Two implementations exist:
//!
//! - [`SimulatedTransport`](super::simulated::SimulatedTransport): an
//!   in-process address space, used by tests and `--simulate`
//! - `RealOpcUaTransport` (feature `real-transport`): the `opcua` crate
//!
//! Value-change notifications are pushed into a [`NotificationHandler`]. The
//! handler is synchronous because the underlying stacks deliver from their
//! own worker threads, outside any async runtime.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use connect_core::Value;
use serde::{Deserialize, Serialize};

use crate::config::ConnectionTarget;
use crate::error::OpcUaResult;
use crate::types::{NodeClass, NodeId, OpcUaDataType, SubscriptionSettings};

// =============================================================================
// TransportState
// =============================================================================

/// Connection state of the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransportState {
    /// Transport is not connected.
    #[default]
    Disconnected,

    /// Transport is establishing connection.
    Connecting,

    /// Transport is connected and ready.
    Connected,

    /// The last connection attempt failed.
    Failed,
}

impl TransportState {
    /// Returns `true` if the transport is connected.
    #[inline]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

// =============================================================================
// OpcUaValue
// =============================================================================

/// OPC UA value as delivered by the transport layer.
#[derive(Debug, Clone, PartialEq)]
pub enum OpcUaValue {
    /// Boolean value.
    Boolean(bool),

    /// Signed byte.
    SByte(i8),

    /// Unsigned byte.
    Byte(u8),

    /// 16-bit signed integer.
    Int16(i16),

    /// 16-bit unsigned integer.
    UInt16(u16),

    /// 32-bit signed integer.
    Int32(i32),

    /// 32-bit unsigned integer.
    UInt32(u32),

    /// 64-bit signed integer.
    Int64(i64),

    /// 64-bit unsigned integer.
    UInt64(u64),

    /// 32-bit float.
    Float(f32),

    /// 64-bit double.
    Double(f64),

    /// String value.
    String(String),

    /// Date/time value.
    DateTime(DateTime<Utc>),

    /// GUID value.
    Guid(uuid::Uuid),

    /// Byte string.
    ByteString(Vec<u8>),

    /// Array of values.
    Array(Vec<OpcUaValue>),

    /// Null value.
    Null,
}

impl OpcUaValue {
    /// Returns the data type of this value.
    pub fn data_type(&self) -> OpcUaDataType {
        match self {
            Self::Boolean(_) => OpcUaDataType::Boolean,
            Self::SByte(_) => OpcUaDataType::SByte,
            Self::Byte(_) => OpcUaDataType::Byte,
            Self::Int16(_) => OpcUaDataType::Int16,
            Self::UInt16(_) => OpcUaDataType::UInt16,
            Self::Int32(_) => OpcUaDataType::Int32,
            Self::UInt32(_) => OpcUaDataType::UInt32,
            Self::Int64(_) => OpcUaDataType::Int64,
            Self::UInt64(_) => OpcUaDataType::UInt64,
            Self::Float(_) => OpcUaDataType::Float,
            Self::Double(_) => OpcUaDataType::Double,
            Self::String(_) => OpcUaDataType::String,
            Self::DateTime(_) => OpcUaDataType::DateTime,
            Self::Guid(_) => OpcUaDataType::Guid,
            Self::ByteString(_) => OpcUaDataType::ByteString,
            Self::Array(_) | Self::Null => OpcUaDataType::Variant,
        }
    }

    /// Returns `true` if this is a null value.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl Default for OpcUaValue {
    fn default() -> Self {
        Self::Null
    }
}

impl fmt::Display for OpcUaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(v) => write!(f, "{}", v),
            Self::SByte(v) => write!(f, "{}", v),
            Self::Byte(v) => write!(f, "{}", v),
            Self::Int16(v) => write!(f, "{}", v),
            Self::UInt16(v) => write!(f, "{}", v),
            Self::Int32(v) => write!(f, "{}", v),
            Self::UInt32(v) => write!(f, "{}", v),
            Self::Int64(v) => write!(f, "{}", v),
            Self::UInt64(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{}", v),
            Self::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
            Self::Guid(v) => write!(f, "{}", v),
            Self::ByteString(v) => write!(f, "<{} bytes>", v.len()),
            Self::Array(v) => write!(f, "[{} items]", v.len()),
            Self::Null => write!(f, "null"),
        }
    }
}

impl From<OpcUaValue> for Value {
    fn from(value: OpcUaValue) -> Self {
        match value {
            OpcUaValue::Boolean(v) => Value::Bool(v),
            OpcUaValue::SByte(v) => Value::Int8(v),
            OpcUaValue::Byte(v) => Value::UInt8(v),
            OpcUaValue::Int16(v) => Value::Int16(v),
            OpcUaValue::UInt16(v) => Value::UInt16(v),
            OpcUaValue::Int32(v) => Value::Int32(v),
            OpcUaValue::UInt32(v) => Value::UInt32(v),
            OpcUaValue::Int64(v) => Value::Int64(v),
            OpcUaValue::UInt64(v) => Value::UInt64(v),
            OpcUaValue::Float(v) => Value::Float32(v),
            OpcUaValue::Double(v) => Value::Float64(v),
            OpcUaValue::String(v) => Value::String(v),
            OpcUaValue::DateTime(v) => Value::DateTime(v),
            OpcUaValue::Guid(v) => Value::String(v.to_string()),
            OpcUaValue::ByteString(v) => Value::Bytes(v),
            OpcUaValue::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            OpcUaValue::Null => Value::Null,
        }
    }
}

// =============================================================================
// BrowseResult
// =============================================================================

/// One reference returned by browsing a node.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowseResult {
    /// The node ID of the referenced node.
    pub node_id: NodeId,

    /// Browse name.
    pub browse_name: String,

    /// Display name.
    pub display_name: String,

    /// Node class.
    pub node_class: NodeClass,
}

impl BrowseResult {
    /// Creates a browse result whose browse and display names are equal.
    pub fn new(node_id: NodeId, name: impl Into<String>, node_class: NodeClass) -> Self {
        let name = name.into();
        Self {
            node_id,
            display_name: name.clone(),
            browse_name: name,
            node_class,
        }
    }
}

// =============================================================================
// Notifications
// =============================================================================

/// A value change pushed by a subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct DataChange {
    /// The node whose value changed.
    pub node_id: NodeId,

    /// The new value.
    pub value: OpcUaValue,

    /// Source timestamp, if the server provided one.
    pub source_timestamp: Option<DateTime<Utc>>,
}

impl DataChange {
    /// Creates a data change without timestamp.
    pub fn new(node_id: NodeId, value: OpcUaValue) -> Self {
        Self {
            node_id,
            value,
            source_timestamp: None,
        }
    }
}

/// Receives value changes of a subscription.
///
/// Called from transport worker threads, possibly concurrently.
pub trait NotificationHandler: Send + Sync {
    /// Handles one value change.
    ///
    /// An error signals that the change could not be processed; transports
    /// log it and keep delivering.
    fn on_data_change(&self, change: DataChange) -> OpcUaResult<()>;
}

// =============================================================================
// OpcUaTransport Trait
// =============================================================================

/// Abstract transport for OPC UA communication.
///
/// Connect, disconnect, browse and reads are request/response calls made
/// from the caller's task and must not overlap on one transport. Only
/// subscription notifications arrive asynchronously.
#[async_trait]
pub trait OpcUaTransport: Send + Sync {
    // =========================================================================
    // Connection Management
    // =========================================================================

    /// Opens a session to `target`. A single attempt; no retry.
    async fn connect(&mut self, target: &ConnectionTarget) -> OpcUaResult<()>;

    /// Closes the session. Must succeed when already disconnected.
    async fn disconnect(&mut self) -> OpcUaResult<()>;

    /// Returns `true` if a session is open.
    fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Returns the current transport state.
    fn state(&self) -> TransportState;

    // =========================================================================
    // Browse & Read
    // =========================================================================

    /// Returns the hierarchical forward references of `node_id`.
    async fn browse(&self, node_id: &NodeId) -> OpcUaResult<Vec<BrowseResult>>;

    /// Reads the current value of a node.
    async fn read_value(&self, node_id: &NodeId) -> OpcUaResult<OpcUaValue>;

    /// Reads the node class attribute.
    async fn read_node_class(&self, node_id: &NodeId) -> OpcUaResult<NodeClass>;

    /// Reads the data type attribute of a variable node.
    async fn read_data_type(&self, node_id: &NodeId) -> OpcUaResult<OpcUaDataType>;

    /// Reads the engineering unit id of a variable node; `0` if it has none.
    async fn read_engineering_unit(&self, node_id: &NodeId) -> OpcUaResult<i32>;

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Creates one subscription monitoring all `nodes`.
    ///
    /// Returns the subscription id.
    async fn create_subscription(
        &self,
        nodes: &[NodeId],
        settings: &SubscriptionSettings,
        handler: Arc<dyn NotificationHandler>,
    ) -> OpcUaResult<u32>;

    /// Deletes a subscription. No notification is delivered for it afterwards.
    async fn delete_subscription(&self, subscription_id: u32) -> OpcUaResult<()>;
}

/// Creates fresh transports.
///
/// Adapters open a new session for every schema guess, option resolution and
/// start, so they hold a provider rather than a transport.
pub trait TransportProvider: Send + Sync {
    /// Short name for logging.
    fn name(&self) -> &str;

    /// Creates a disconnected transport.
    fn create(&self) -> Box<dyn OpcUaTransport>;
}

// =============================================================================
// Tests
// =============================================================================

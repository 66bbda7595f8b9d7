// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA adapter error types.
//!
//! # Error Categories
//!
//! ```text
//! OpcUaError
//! ├── Configuration - a required alternative or value is missing or invalid
//! ├── Connection    - session establishment failed (network, auth, address)
//! ├── Discovery     - browsing failed mid-traversal
//! ├── Sampling      - reading a point value failed
//! ├── Subscription  - creating or deleting a subscription failed
//! └── Assembly      - a notification referenced an unknown point
//! ```
//!
//! Configuration errors mean "not ready yet" and are the only category the
//! option resolver treats differently. Assembly defects indicate a mismatch
//! between what was subscribed and what was notified and are never retryable.
//!
//! # Examples
//!
//! ```
//! use connect_opcua::error::{OpcUaError, ConnectionError};
//!
//! let error = OpcUaError::connection(ConnectionError::refused(
//!     "opc.tcp://localhost:4840",
//!     "no route to host",
//! ));
//!
//! assert!(error.is_retryable());
//! assert!(!error.is_configuration());
//! ```

use connect_core::AdapterError;
use thiserror::Error;
use tracing::Level;

/// Result type alias for OPC UA operations.
pub type OpcUaResult<T> = Result<T, OpcUaError>;

// =============================================================================
// OpcUaError - Main Error Type
// =============================================================================

/// The main error type for OPC UA operations.
#[derive(Debug, Error)]
pub enum OpcUaError {
    /// Configuration errors.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// Connection-related errors.
    #[error("{0}")]
    Connection(#[from] ConnectionError),

    /// Namespace discovery errors.
    #[error("{0}")]
    Discovery(#[from] DiscoveryError),

    /// Point sampling errors.
    #[error("{0}")]
    Sampling(#[from] SamplingError),

    /// Subscription errors.
    #[error("{0}")]
    Subscription(#[from] SubscriptionError),

    /// Event assembly defects.
    #[error("{0}")]
    Assembly(#[from] AssemblyDefect),
}

impl OpcUaError {
    // =========================================================================
    // Factory Methods
    // =========================================================================

    /// Creates a configuration error.
    #[inline]
    pub fn configuration(error: ConfigurationError) -> Self {
        Self::Configuration(error)
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(error: ConnectionError) -> Self {
        Self::Connection(error)
    }

    /// Creates a discovery error.
    #[inline]
    pub fn discovery(error: DiscoveryError) -> Self {
        Self::Discovery(error)
    }

    /// Creates a sampling error.
    #[inline]
    pub fn sampling(error: SamplingError) -> Self {
        Self::Sampling(error)
    }

    /// Creates a subscription error.
    #[inline]
    pub fn subscription(error: SubscriptionError) -> Self {
        Self::Subscription(error)
    }

    /// Creates a not connected error.
    pub fn not_connected() -> Self {
        Self::Connection(ConnectionError::NotConnected)
    }

    /// Creates a node not found error.
    pub fn node_not_found(node_id: impl Into<String>) -> Self {
        Self::Discovery(DiscoveryError::node_not_found(node_id))
    }

    /// Creates a read failed error.
    pub fn read_failed(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Sampling(SamplingError::read_failed(node_id, message))
    }

    // =========================================================================
    // Error Properties
    // =========================================================================

    /// Returns `true` if the configuration is incomplete or invalid.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Returns `true` if a later attempt could succeed.
    ///
    /// Nothing in this crate retries; the caller owns any retry policy.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(e) => e.is_retryable(),
            Self::Discovery(_) | Self::Sampling(_) | Self::Subscription(_) => true,
            Self::Configuration(_) | Self::Assembly(_) => false,
        }
    }

    /// Returns the severity level of this error.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Connection(ConnectionError::NotConnected) => ErrorSeverity::Warning,
            Self::Connection(_) | Self::Discovery(_) | Self::Sampling(_) | Self::Subscription(_) => {
                ErrorSeverity::Error
            }
            Self::Configuration(_) => ErrorSeverity::Warning,
            Self::Assembly(_) => ErrorSeverity::Critical,
        }
    }

    /// Returns the error category for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Connection(_) => "connection",
            Self::Discovery(_) => "discovery",
            Self::Sampling(_) => "sampling",
            Self::Subscription(_) => "subscription",
            Self::Assembly(_) => "assembly",
        }
    }

    /// Returns the tracing level for this error.
    pub fn tracing_level(&self) -> Level {
        match self.severity() {
            ErrorSeverity::Warning => Level::WARN,
            ErrorSeverity::Error | ErrorSeverity::Critical => Level::ERROR,
        }
    }

    /// Logs this error with the appropriate level.
    pub fn log(&self, context: &str) {
        match self.tracing_level() {
            Level::ERROR => tracing::error!(
                category = self.category(),
                context = context,
                retryable = self.is_retryable(),
                "{self}"
            ),
            _ => tracing::warn!(
                category = self.category(),
                context = context,
                retryable = self.is_retryable(),
                "{self}"
            ),
        }
    }

    /// Converts into the adapter-level error, attaching the server address.
    ///
    /// Configuration errors stay configuration errors; everything else is a
    /// source failure for `address`.
    pub fn into_adapter_error(self, address: impl Into<String>) -> AdapterError {
        match self {
            Self::Configuration(e) => AdapterError::configuration(e.to_string()),
            other => AdapterError::connector(address, other),
        }
    }
}

// =============================================================================
// ErrorSeverity
// =============================================================================

/// Severity of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Expected during normal operation, e.g. an incomplete configuration.
    Warning,
    /// The requested operation failed.
    Error,
    /// An invariant was violated.
    Critical,
}

// =============================================================================
// ConfigurationError
// =============================================================================

/// Invalid or incomplete adapter configuration.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// No branch of a required alternative is selected.
    #[error("No option selected for '{name}'")]
    MissingAlternative {
        /// Internal name of the alternatives property.
        name: String,
    },

    /// The selected branch is not one this adapter knows.
    #[error("Unknown option '{selected}' for '{name}'")]
    UnknownAlternative {
        /// Internal name of the alternatives property.
        name: String,
        /// The selected branch.
        selected: String,
    },

    /// A required value is missing.
    #[error("Missing required value: {field}")]
    MissingValue {
        /// Internal name of the property.
        field: String,
    },

    /// A value could not be interpreted.
    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidValue {
        /// Internal name of the property.
        field: String,
        /// The offending value.
        value: String,
        /// Why it is invalid.
        reason: String,
    },

    /// A node id could not be parsed.
    #[error("Invalid node id '{node_id}': {reason}")]
    InvalidNodeId {
        /// The offending node id.
        node_id: String,
        /// Why it is invalid.
        reason: String,
    },

    /// Two discovered points derive the same label.
    #[error("Duplicate label '{label}' derived from '{first}' and '{second}'")]
    DuplicateLabel {
        /// The label.
        label: String,
        /// Native identifier of the first point.
        first: String,
        /// Native identifier of the second point.
        second: String,
    },

    /// The requested feature is not available in this build.
    #[error("Unsupported: {message}")]
    Unsupported {
        /// Error message.
        message: String,
    },
}

impl ConfigurationError {
    /// Creates a missing alternative error.
    pub fn missing_alternative(name: impl Into<String>) -> Self {
        Self::MissingAlternative { name: name.into() }
    }

    /// Creates an unknown alternative error.
    pub fn unknown_alternative(name: impl Into<String>, selected: impl Into<String>) -> Self {
        Self::UnknownAlternative {
            name: name.into(),
            selected: selected.into(),
        }
    }

    /// Creates a missing value error.
    pub fn missing_value(field: impl Into<String>) -> Self {
        Self::MissingValue { field: field.into() }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid node id error.
    pub fn invalid_node_id(node_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidNodeId {
            node_id: node_id.into(),
            reason: reason.into(),
        }
    }

    /// Creates a duplicate label error.
    pub fn duplicate_label(
        label: impl Into<String>,
        first: impl Into<String>,
        second: impl Into<String>,
    ) -> Self {
        Self::DuplicateLabel {
            label: label.into(),
            first: first.into(),
            second: second.into(),
        }
    }

    /// Creates an unsupported feature error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }
}

// =============================================================================
// ConnectionError
// =============================================================================

/// Session establishment errors.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The server could not be reached or refused the session.
    #[error("Connection refused to '{endpoint}': {message}")]
    Refused {
        /// Target endpoint.
        endpoint: String,
        /// Error message.
        message: String,
    },

    /// The endpoint URL is malformed.
    #[error("Invalid endpoint URL: '{url}' - {reason}")]
    InvalidEndpoint {
        /// The invalid URL.
        url: String,
        /// Reason.
        reason: String,
    },

    /// The server rejected the credentials.
    #[error("Authentication failed for '{endpoint}': {message}")]
    AuthenticationFailed {
        /// Target endpoint.
        endpoint: String,
        /// Error message.
        message: String,
    },

    /// No session is open.
    #[error("Not connected to OPC UA server")]
    NotConnected,
}

impl ConnectionError {
    /// Creates a connection refused error.
    pub fn refused(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Refused {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid endpoint error.
    pub fn invalid_endpoint(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an authentication failed error.
    pub fn authentication_failed(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AuthenticationFailed {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Refused { .. } | Self::NotConnected)
    }
}

// =============================================================================
// DiscoveryError
// =============================================================================

/// Namespace browsing errors.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Browsing a node failed.
    #[error("Browse failed for node '{node_id}': {message}")]
    BrowseFailed {
        /// The node being browsed.
        node_id: String,
        /// Error message.
        message: String,
    },

    /// The node does not exist.
    #[error("Node not found: '{node_id}'")]
    NodeNotFound {
        /// The missing node.
        node_id: String,
    },

    /// Reading a node attribute during discovery failed.
    #[error("Reading {attribute} of node '{node_id}' failed: {message}")]
    AttributeReadFailed {
        /// The node.
        node_id: String,
        /// Attribute name.
        attribute: String,
        /// Error message.
        message: String,
    },
}

impl DiscoveryError {
    /// Creates a browse failed error.
    pub fn browse_failed(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BrowseFailed {
            node_id: node_id.into(),
            message: message.into(),
        }
    }

    /// Creates a node not found error.
    pub fn node_not_found(node_id: impl Into<String>) -> Self {
        Self::NodeNotFound {
            node_id: node_id.into(),
        }
    }

    /// Creates an attribute read failed error.
    pub fn attribute_read_failed(
        node_id: impl Into<String>,
        attribute: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::AttributeReadFailed {
            node_id: node_id.into(),
            attribute: attribute.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// SamplingError
// =============================================================================

/// Point value read errors.
#[derive(Debug, Error)]
pub enum SamplingError {
    /// The read request failed.
    #[error("Read failed for node '{node_id}': {message}")]
    ReadFailed {
        /// The node.
        node_id: String,
        /// Error message.
        message: String,
    },

    /// The server returned a bad status for the value.
    #[error("Bad status for node '{node_id}': {status}")]
    BadStatus {
        /// The node.
        node_id: String,
        /// Status description.
        status: String,
    },
}

impl SamplingError {
    /// Creates a read failed error.
    pub fn read_failed(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ReadFailed {
            node_id: node_id.into(),
            message: message.into(),
        }
    }

    /// Creates a bad status error.
    pub fn bad_status(node_id: impl Into<String>, status: impl Into<String>) -> Self {
        Self::BadStatus {
            node_id: node_id.into(),
            status: status.into(),
        }
    }
}

// =============================================================================
// SubscriptionError
// =============================================================================

/// Subscription lifecycle errors.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    /// The subscription could not be created.
    #[error("Failed to create subscription: {message}")]
    CreationFailed {
        /// Error message.
        message: String,
    },

    /// Monitored items could not be created.
    #[error("Failed to monitor {count} node(s): {message}")]
    MonitoringFailed {
        /// Number of nodes that could not be monitored.
        count: usize,
        /// Error message.
        message: String,
    },

    /// The subscription does not exist.
    #[error("Subscription {subscription_id} not found")]
    NotFound {
        /// The subscription id.
        subscription_id: u32,
    },
}

impl SubscriptionError {
    /// Creates a creation failed error.
    pub fn creation_failed(message: impl Into<String>) -> Self {
        Self::CreationFailed {
            message: message.into(),
        }
    }

    /// Creates a monitoring failed error.
    pub fn monitoring_failed(count: usize, message: impl Into<String>) -> Self {
        Self::MonitoringFailed {
            count,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(subscription_id: u32) -> Self {
        Self::NotFound { subscription_id }
    }
}

// =============================================================================
// AssemblyDefect
// =============================================================================

/// A notification that cannot be matched to the subscription set.
#[derive(Debug, Error)]
pub enum AssemblyDefect {
    /// The notified node is not part of the subscription.
    #[error("Notification for node '{node_id}' which is not among the {subscribed} subscribed point(s)")]
    UnknownPoint {
        /// Native identifier of the notified node.
        node_id: String,
        /// Size of the subscription set.
        subscribed: usize,
    },
}

impl AssemblyDefect {
    /// Creates an unknown point defect.
    pub fn unknown_point(node_id: impl Into<String>, subscribed: usize) -> Self {
        Self::UnknownPoint {
            node_id: node_id.into(),
            subscribed,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_is_not_retryable() {
        let err = OpcUaError::configuration(ConfigurationError::missing_alternative("ACCESS_MODE"));
        assert!(err.is_configuration());
        assert!(!err.is_retryable());
        assert_eq!(err.category(), "configuration");
        assert_eq!(err.to_string(), "No option selected for 'ACCESS_MODE'");
    }

    #[test]
    fn test_assembly_defect_is_critical() {
        let err: OpcUaError = AssemblyDefect::unknown_point("Plant.Ghost", 3).into();
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.tracing_level(), Level::ERROR);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_into_adapter_error_keeps_configuration() {
        let err = OpcUaError::configuration(ConfigurationError::missing_value("NODE_ID"));
        let adapter = err.into_adapter_error("opc.tcp://x:4840");
        assert!(adapter.is_configuration());
    }

    #[test]
    fn test_into_adapter_error_wraps_address() {
        let err = OpcUaError::connection(ConnectionError::refused("opc.tcp://x:4840", "down"));
        let adapter = err.into_adapter_error("opc.tcp://x:4840");
        assert_eq!(adapter.address(), Some("opc.tcp://x:4840"));
        assert!(adapter.is_retryable());
    }

    #[test]
    fn test_auth_failure_is_not_retryable() {
        let err = OpcUaError::connection(ConnectionError::authentication_failed("opc.tcp://x", "bad password"));
        assert!(!err.is_retryable());
    }
}

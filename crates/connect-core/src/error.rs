// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Adapter-level error hierarchy.
//!
//! Every error that crosses the boundary between an adapter and the container
//! that hosts it is an [`AdapterError`]. Protocol crates keep their own, richer
//! error types and wrap them here, always attaching the address of the source
//! they were talking to.
//!
//! # Error Hierarchy
//!
//! ```text
//! AdapterError (root)
//! ├── Configuration   - a required setting or alternative is missing
//! ├── Source          - connect / browse / sample / subscribe failed
//! ├── Schema          - schema guessing against a source failed
//! ├── Parse           - a raw record could not be turned into an event
//! ├── Lifecycle       - start/stop called in the wrong state
//! └── UnknownAdapter  - no factory registered for an adapter id
//! ```
//!
//! # Examples
//!
//! ```
//! use connect_core::error::AdapterError;
//!
//! let error = AdapterError::configuration("no access mode selected");
//! assert!(error.is_configuration());
//! assert!(!error.is_retryable());
//! ```

use thiserror::Error;

/// Boxed error used as the source of wrapped protocol failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type alias for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

// =============================================================================
// AdapterError
// =============================================================================

/// Errors surfaced by adapters to their hosting container.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The configuration is incomplete or invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message.
        message: String,
    },

    /// Talking to the data source failed.
    #[error("Could not connect to server {address}: {source}")]
    Source {
        /// Address of the server the adapter was talking to.
        address: String,
        /// Underlying protocol error.
        #[source]
        source: BoxError,
    },

    /// Guessing a schema against the data source failed.
    #[error("Could not guess schema for server {address}: {source}")]
    Schema {
        /// Address of the server the adapter was talking to.
        address: String,
        /// Underlying protocol error.
        #[source]
        source: BoxError,
    },

    /// A raw record could not be parsed into an event.
    #[error("Parse error: {message}")]
    Parse {
        /// Error message.
        message: String,
    },

    /// An operation was invoked in the wrong lifecycle state.
    #[error("Lifecycle error: {message}")]
    Lifecycle {
        /// Error message.
        message: String,
    },

    /// No factory is registered for the requested adapter id.
    #[error("No adapter registered with id '{id}'")]
    UnknownAdapter {
        /// The requested adapter id.
        id: String,
    },
}

impl AdapterError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Wraps a protocol failure, attaching the server address.
    pub fn connector<E>(address: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Source {
            address: address.into(),
            source: Box::new(source),
        }
    }

    /// Wraps a schema guessing failure, attaching the server address.
    pub fn schema<E>(address: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Schema {
            address: address.into(),
            source: Box::new(source),
        }
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Creates a lifecycle error.
    pub fn lifecycle(message: impl Into<String>) -> Self {
        Self::Lifecycle {
            message: message.into(),
        }
    }

    /// Creates an unknown adapter error.
    pub fn unknown_adapter(id: impl Into<String>) -> Self {
        Self::UnknownAdapter { id: id.into() }
    }

    /// Returns `true` if this error means the configuration is not complete yet.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// Returns `true` if retrying the same operation later could succeed.
    ///
    /// Adapters never retry on their own; this only informs the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Source { .. } | Self::Schema { .. })
    }

    /// Returns the server address carried by this error, if any.
    pub fn address(&self) -> Option<&str> {
        match self {
            Self::Source { address, .. } | Self::Schema { address, .. } => Some(address),
            _ => None,
        }
    }

    /// Returns a short error type name for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration",
            Self::Source { .. } => "source",
            Self::Schema { .. } => "schema",
            Self::Parse { .. } => "parse",
            Self::Lifecycle { .. } => "lifecycle",
            Self::UnknownAdapter { .. } => "unknown_adapter",
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

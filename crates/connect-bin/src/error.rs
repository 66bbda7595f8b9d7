// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Errors of the ua-connect binary and their process exit codes.
//!
//! | Code | Cause                                                   |
//! |------|---------------------------------------------------------|
//! | 1    | description file or adapter configuration is unusable   |
//! | 2    | server unreachable, or sampling for the schema failed   |
//! | 3    | adapter lifecycle misuse or unknown adapter id          |
//! | 4    | command output could not be written or encoded          |

use connect_config::ConfigError;
use connect_core::AdapterError;
use thiserror::Error;

/// Result alias for the binary.
pub type BinResult<T> = Result<T, BinError>;

/// Failure of a ua-connect command.
#[derive(Debug, Error)]
pub enum BinError {
    /// The description file could not be loaded or failed validation.
    #[error(transparent)]
    Description(#[from] ConfigError),

    /// The adapter rejected its description or failed at the source.
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// No transport can reach the configured server in this build.
    #[error("No OPC UA transport available: {0}")]
    TransportUnavailable(String),

    /// Writing to stdout failed.
    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),

    /// Command output could not be encoded as JSON.
    #[error("Failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),

    /// Another error, prefixed with what the command was doing.
    #[error("{context}: {source}")]
    Context {
        /// What was being done.
        context: String,
        /// Why it failed.
        #[source]
        source: Box<BinError>,
    },
}

impl BinError {
    /// Creates a transport-unavailable error.
    pub fn transport_unavailable(reason: impl Into<String>) -> Self {
        Self::TransportUnavailable(reason.into())
    }

    /// Wraps the error with what the command was doing.
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns true if fixing the description or the build would resolve it.
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::Description(_) | Self::TransportUnavailable(_) => true,
            Self::Adapter(e) => e.is_configuration(),
            Self::Context { source, .. } => source.is_configuration(),
            Self::Output(_) | Self::Encode(_) => false,
        }
    }

    /// Process exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Context { source, .. } => source.exit_code(),
            _ if self.is_configuration() => 1,
            Self::Adapter(e) if e.is_retryable() => 2,
            Self::Adapter(_) => 3,
            _ => 4,
        }
    }
}

// =============================================================================
// Reporting
// =============================================================================

/// Prints the error and its causes to stderr.
pub fn report(error: &BinError) {
    eprintln!("error: {}", error);

    let mut cause = std::error::Error::source(error);
    while let Some(inner) = cause {
        eprintln!("  caused by: {}", inner);
        cause = inner.source();
    }

    if error.is_configuration() {
        eprintln!("hint: `ua-connect validate` checks the description file without connecting");
    }
}

/// Reports the error and terminates the process with its exit code.
pub fn exit_with(error: BinError) -> ! {
    report(&error);
    std::process::exit(error.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_by_cause() {
        let missing = BinError::from(ConfigError::missing_field("adapter.node_id"));
        assert_eq!(missing.exit_code(), 1);

        let incomplete = BinError::from(AdapterError::configuration("NODE_ID is empty"));
        assert_eq!(incomplete.exit_code(), 1);

        let unreachable = BinError::from(AdapterError::connector(
            "opc.tcp://plc:4840",
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
        ));
        assert_eq!(unreachable.exit_code(), 2);

        assert_eq!(BinError::from(AdapterError::lifecycle("already running")).exit_code(), 3);
        assert_eq!(BinError::transport_unavailable("no network transport").exit_code(), 1);

        let broken_pipe = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        assert_eq!(BinError::from(broken_pipe).exit_code(), 4);
    }

    #[test]
    fn test_context_keeps_exit_code() {
        let err = BinError::from(ConfigError::missing_field("adapter.server")).context("Validation failed for plant.yaml");
        assert_eq!(err.exit_code(), 1);
        assert!(err.is_configuration());
        assert_eq!(
            err.to_string(),
            "Validation failed for plant.yaml: Missing required field: adapter.server"
        );
    }
}

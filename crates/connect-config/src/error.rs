// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Description file errors.
//!
//! Loading fails with `NotFound`, `Read`, `UnknownFormat` or `Syntax`.
//! The strict check fails with `Missing` or `Invalid`.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Origin used for content that did not come from a file.
const INLINE: &str = "<inline>";

/// Errors raised while loading or checking a description file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No file at the given path.
    #[error("Description file not found: {path}")]
    NotFound {
        /// Requested path.
        path: PathBuf,
    },

    /// The file exists but could not be read.
    #[error("Cannot read description file '{path}': {source}")]
    Read {
        /// Requested path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The extension names no supported format.
    #[error("Cannot tell the format of '{path}' (expected .yaml, .yml, .toml or .json)")]
    UnknownFormat {
        /// Offending path.
        path: PathBuf,
    },

    /// The content is not valid for its format or does not fit the file shape.
    #[error("Invalid {format} in {origin}: {message}")]
    Syntax {
        /// Format name.
        format: &'static str,
        /// File path, or `<inline>` for string input.
        origin: String,
        /// Parser message.
        message: String,
    },

    /// A field the strict check requires is absent.
    #[error("Missing required field: {field}")]
    Missing {
        /// Dotted field path.
        field: String,
    },

    /// A field is present but unusable.
    #[error("Invalid value for '{field}': {reason}")]
    Invalid {
        /// Dotted field path.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// An environment override was set to an unusable value.
    #[error("Environment override {name} rejected: {reason}")]
    EnvOverride {
        /// Variable name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn unknown_format(path: impl Into<PathBuf>) -> Self {
        Self::UnknownFormat { path: path.into() }
    }

    pub(crate) fn syntax(format: &'static str, message: impl ToString) -> Self {
        Self::Syntax {
            format,
            origin: INLINE.to_string(),
            message: message.to_string(),
        }
    }

    /// Creates a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::Missing { field: field.into() }
    }

    /// Creates an invalid value error.
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn env_override(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvOverride {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Attributes a syntax error to the file it came from.
    pub(crate) fn in_file(self, path: &Path) -> Self {
        match self {
            Self::Syntax { format, message, .. } => Self::Syntax {
                format,
                origin: path.display().to_string(),
                message,
            },
            other => other,
        }
    }

    /// Returns `true` if the file could not be turned into a description at all,
    /// as opposed to describing an incomplete adapter.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Read { .. } | Self::UnknownFormat { .. } | Self::Syntax { .. }
        )
    }
}

/// Result type for description file operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

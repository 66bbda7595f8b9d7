// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Description file model.
//!
//! # Structure
//!
//! ```text
//! DescriptionFile
//! ├── adapter: AdapterSection
//! │   ├── server: ServerSection      (url, or host + port)
//! │   ├── auth: AuthSection          (omitted = anonymous)
//! │   ├── namespace_index
//! │   ├── node_id
//! │   └── selected_nodes
//! ├── subscription: SubscriptionSettings
//! └── logging: LoggingSection
//! ```
//!
//! Every section is optional at load time. Missing pieces surface later, as
//! configuration errors of the adapter or through [`DescriptionFile::validate`].

use connect_core::{AdapterDescription, SelectOption};
use connect_opcua::config::{keys, AdapterSettings};
use connect_opcua::{declare_model, derive_label, SubscriptionSettings};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// DescriptionFile
// =============================================================================

/// Root of a description file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DescriptionFile {
    /// Adapter parameters.
    #[serde(default)]
    pub adapter: AdapterSection,

    /// Subscription parameters.
    #[serde(default)]
    pub subscription: SubscriptionSettings,

    /// Logging parameters.
    #[serde(default)]
    pub logging: LoggingSection,
}

impl DescriptionFile {
    /// Fills the OPC UA adapter model with the values of this file.
    ///
    /// Missing values stay unset, so the result may be incomplete.
    pub fn into_description(&self) -> AdapterDescription {
        let mut description = declare_model();
        let adapter = &self.adapter;

        if let Some(url) = &adapter.server.url {
            description.select_alternative(keys::OPC_HOST_OR_URL, keys::OPC_URL);
            description.set_value(keys::OPC_SERVER_URL, url.as_str());
        } else if adapter.server.host.is_some() || adapter.server.port.is_some() {
            description.select_alternative(keys::OPC_HOST_OR_URL, keys::OPC_HOST);
            if let Some(host) = &adapter.server.host {
                description.set_value(keys::OPC_SERVER_HOST, host.as_str());
            }
            if let Some(port) = adapter.server.port {
                description.set_value(keys::OPC_SERVER_PORT, port.to_string());
            }
        }

        match &adapter.auth {
            Some(auth) => {
                description.select_alternative(keys::ACCESS_MODE, keys::USERNAME_GROUP);
                if let Some(username) = &auth.username {
                    description.set_value(keys::USERNAME, username.as_str());
                }
                if let Some(password) = &auth.password {
                    description.set_value(keys::PASSWORD, password.as_str());
                }
            }
            None => {
                description.select_alternative(keys::ACCESS_MODE, keys::UNAUTHENTICATED);
            }
        }

        if let Some(namespace_index) = adapter.namespace_index {
            description.set_value(keys::NAMESPACE_INDEX, namespace_index.to_string());
        }
        if let Some(node_id) = &adapter.node_id {
            description.set_value(keys::NODE_ID, node_id.as_str());
        }

        let selected = adapter
            .selected_nodes
            .iter()
            .map(|id| SelectOption::new(derive_label(id), id.as_str()).selected())
            .collect();
        description.set_options(keys::AVAILABLE_NODES, selected);

        description
    }

    /// Strict check used before running: the description must be complete.
    pub fn validate(&self) -> ConfigResult<()> {
        let server = &self.adapter.server;
        match (&server.url, &server.host, server.port) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
                return Err(ConfigError::invalid(
                    "adapter.server",
                    "either url or host and port, not both",
                ));
            }
            (None, None, None) => return Err(ConfigError::missing_field("adapter.server")),
            (None, None, Some(_)) => return Err(ConfigError::missing_field("adapter.server.host")),
            (None, Some(_), None) => return Err(ConfigError::missing_field("adapter.server.port")),
            (None, Some(_), Some(0)) => {
                return Err(ConfigError::invalid("adapter.server.port", "must be greater than 0"));
            }
            _ => {}
        }

        if let Some(auth) = &self.adapter.auth {
            if auth.username.as_deref().map_or(true, str::is_empty) {
                return Err(ConfigError::missing_field("adapter.auth.username"));
            }
            if auth.password.as_deref().map_or(true, str::is_empty) {
                return Err(ConfigError::missing_field("adapter.auth.password"));
            }
        }

        if self.adapter.namespace_index.is_none() {
            return Err(ConfigError::missing_field("adapter.namespace_index"));
        }
        if self.adapter.node_id.as_deref().map_or(true, |n| n.trim().is_empty()) {
            return Err(ConfigError::missing_field("adapter.node_id"));
        }

        if self.subscription.publishing_interval_ms == 0 {
            return Err(ConfigError::invalid(
                "subscription.publishing_interval_ms",
                "must be greater than 0",
            ));
        }

        // What remains is the adapter's own resolution (URL shape, node id syntax).
        let description = self.into_description();
        AdapterSettings::resolve(&description.extractor())
            .map_err(|e| ConfigError::invalid("adapter", e.to_string()))?;
        Ok(())
    }
}

// =============================================================================
// Sections
// =============================================================================

/// OPC UA adapter parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdapterSection {
    /// Server address.
    #[serde(default)]
    pub server: ServerSection,

    /// Username authentication; anonymous when absent.
    #[serde(default)]
    pub auth: Option<AuthSection>,

    /// Namespace index of the root node.
    #[serde(default)]
    pub namespace_index: Option<u16>,

    /// Identifier of the root node.
    #[serde(default)]
    pub node_id: Option<String>,

    /// Native identifiers to subscribe; all points when empty.
    #[serde(default)]
    pub selected_nodes: Vec<String>,
}

/// Server address, either a full URL or host and port.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerSection {
    /// Endpoint URL, e.g. `opc.tcp://localhost:4840`.
    #[serde(default)]
    pub url: Option<String>,

    /// Host name.
    #[serde(default)]
    pub host: Option<String>,

    /// TCP port.
    #[serde(default)]
    pub port: Option<u16>,
}

/// Username and password.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthSection {
    /// User name.
    #[serde(default)]
    pub username: Option<String>,

    /// Password, usually a `${VAR}` placeholder.
    #[serde(default)]
    pub password: Option<String>,
}

impl std::fmt::Debug for AuthSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSection")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Logging parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Returns the filter directive for this level.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Parses a level name, accepting `warning` for `warn`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON lines.
    Json,
    /// Compact text.
    Compact,
}

// =============================================================================
// Tests
// =============================================================================

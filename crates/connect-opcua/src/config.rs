// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Connection configuration resolution.
//!
//! The adapter description carries two mutually exclusive alternative groups:
//!
//! ```text
//! OPC_HOST_OR_URL                    ACCESS_MODE
//! ├── OPC_URL                        ├── UNAUTHENTICATED
//! │   └── OPC_SERVER_URL             └── USERNAME_GROUP
//! └── OPC_HOST                           ├── USERNAME
//!     ├── OPC_SERVER_HOST                └── PASSWORD
//!     └── OPC_SERVER_PORT
//! ```
//!
//! Resolution picks the selected branch of each group and turns it into a
//! typed [`ConnectionTarget`]. A group with nothing selected is a
//! [`ConfigurationError`], meaning "not ready yet" rather than "failed".

use std::fmt;

use connect_core::StaticPropertyExtractor;
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::types::NodeId;

/// Internal names of the adapter's static properties.
pub mod keys {
    /// Authentication alternatives.
    pub const ACCESS_MODE: &str = "ACCESS_MODE";
    /// Anonymous branch.
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    /// Username/password branch.
    pub const USERNAME_GROUP: &str = "USERNAME_GROUP";
    /// Username.
    pub const USERNAME: &str = "USERNAME";
    /// Password.
    pub const PASSWORD: &str = "PASSWORD";

    /// Addressing alternatives.
    pub const OPC_HOST_OR_URL: &str = "OPC_HOST_OR_URL";
    /// URL branch.
    pub const OPC_URL: &str = "OPC_URL";
    /// Host/port branch.
    pub const OPC_HOST: &str = "OPC_HOST";
    /// Server URL.
    pub const OPC_SERVER_URL: &str = "OPC_SERVER_URL";
    /// Server host.
    pub const OPC_SERVER_HOST: &str = "OPC_SERVER_HOST";
    /// Server port.
    pub const OPC_SERVER_PORT: &str = "OPC_SERVER_PORT";

    /// Namespace index of the root node.
    pub const NAMESPACE_INDEX: &str = "NAMESPACE_INDEX";
    /// Identifier of the root node.
    pub const NODE_ID: &str = "NODE_ID";
    /// Selected points.
    pub const AVAILABLE_NODES: &str = "AVAILABLE_NODES";
}

/// URL scheme used when only host and port are given.
pub const OPC_TCP_SCHEME: &str = "opc.tcp";

// =============================================================================
// ServerAddress
// =============================================================================

/// Where the server is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServerAddress {
    /// A complete endpoint URL.
    Url {
        /// The endpoint URL.
        url: String,
    },
    /// Host and port; the URL is derived with the `opc.tcp` scheme.
    HostPort {
        /// Host name or address.
        host: String,
        /// TCP port.
        port: u16,
    },
}

impl ServerAddress {
    /// Returns the endpoint URL.
    ///
    /// ```
    /// use connect_opcua::config::ServerAddress;
    ///
    /// let addr = ServerAddress::HostPort { host: "plc".into(), port: 4840 };
    /// assert_eq!(addr.endpoint_url(), "opc.tcp://plc:4840");
    /// ```
    pub fn endpoint_url(&self) -> String {
        match self {
            Self::Url { url } => url.clone(),
            Self::HostPort { host, port } => format!("{}://{}:{}", OPC_TCP_SCHEME, host, port),
        }
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.endpoint_url())
    }
}

// =============================================================================
// Credentials
// =============================================================================

/// How to authenticate.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Credentials {
    /// Anonymous session.
    Anonymous,
    /// Username and secret.
    UserName {
        /// User name.
        username: String,
        /// Secret.
        password: String,
    },
}

impl Credentials {
    /// Returns `true` for anonymous sessions.
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => write!(f, "Anonymous"),
            Self::UserName { username, .. } => f
                .debug_struct("UserName")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}

// =============================================================================
// ConnectionTarget
// =============================================================================

/// A resolved server address plus credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionTarget {
    /// Where to connect.
    pub address: ServerAddress,
    /// How to authenticate.
    pub credentials: Credentials,
}

impl ConnectionTarget {
    /// Creates an anonymous target for an endpoint URL.
    pub fn anonymous(url: impl Into<String>) -> Self {
        Self {
            address: ServerAddress::Url { url: url.into() },
            credentials: Credentials::Anonymous,
        }
    }

    /// Replaces the credentials.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Returns the endpoint URL.
    pub fn endpoint_url(&self) -> String {
        self.address.endpoint_url()
    }

    /// Resolves both alternative groups.
    ///
    /// # Errors
    ///
    /// - `MissingAlternative` if a group has no selected branch
    /// - `MissingValue` / `InvalidValue` if the selected branch is not filled in
    pub fn resolve(extractor: &StaticPropertyExtractor<'_>) -> Result<Self, ConfigurationError> {
        let address = resolve_address(extractor)?;
        let credentials = resolve_credentials(extractor)?;
        Ok(Self { address, credentials })
    }
}

/// Best-effort address for diagnostics, available even when resolution fails.
pub fn describe_address(extractor: &StaticPropertyExtractor<'_>) -> String {
    resolve_address(extractor)
        .map(|a| a.endpoint_url())
        .unwrap_or_else(|_| "<unresolved>".to_string())
}

fn resolve_address(extractor: &StaticPropertyExtractor<'_>) -> Result<ServerAddress, ConfigurationError> {
    let selected = extractor
        .selected_alternative(keys::OPC_HOST_OR_URL)
        .ok_or_else(|| ConfigurationError::missing_alternative(keys::OPC_HOST_OR_URL))?;

    match selected {
        keys::OPC_URL => {
            let url = required_text(extractor, keys::OPC_SERVER_URL)?;
            if !url.contains("://") {
                return Err(ConfigurationError::invalid_value(
                    keys::OPC_SERVER_URL,
                    url,
                    "expected a URL such as opc.tcp://host:4840",
                ));
            }
            Ok(ServerAddress::Url { url: url.to_string() })
        }
        keys::OPC_HOST => {
            let host = required_text(extractor, keys::OPC_SERVER_HOST)?;
            let port_text = required_text(extractor, keys::OPC_SERVER_PORT)?;
            let port = port_text
                .parse::<u16>()
                .ok()
                .filter(|p| *p > 0)
                .ok_or_else(|| {
                    ConfigurationError::invalid_value(keys::OPC_SERVER_PORT, port_text, "expected a port between 1 and 65535")
                })?;
            Ok(ServerAddress::HostPort {
                host: host.to_string(),
                port,
            })
        }
        other => Err(ConfigurationError::unknown_alternative(keys::OPC_HOST_OR_URL, other)),
    }
}

fn resolve_credentials(extractor: &StaticPropertyExtractor<'_>) -> Result<Credentials, ConfigurationError> {
    let selected = extractor
        .selected_alternative(keys::ACCESS_MODE)
        .ok_or_else(|| ConfigurationError::missing_alternative(keys::ACCESS_MODE))?;

    match selected {
        keys::UNAUTHENTICATED => Ok(Credentials::Anonymous),
        keys::USERNAME_GROUP => {
            let username = required_text(extractor, keys::USERNAME)?;
            let password = extractor
                .secret(keys::PASSWORD)
                .ok_or_else(|| ConfigurationError::missing_value(keys::PASSWORD))?;
            Ok(Credentials::UserName {
                username: username.to_string(),
                password: password.to_string(),
            })
        }
        other => Err(ConfigurationError::unknown_alternative(keys::ACCESS_MODE, other)),
    }
}

fn required_text<'a>(extractor: &StaticPropertyExtractor<'a>, key: &str) -> Result<&'a str, ConfigurationError> {
    extractor
        .text(key)
        .ok_or_else(|| ConfigurationError::missing_value(key))
}

// =============================================================================
// AdapterSettings
// =============================================================================

/// Everything the adapter needs from its description.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterSettings {
    /// Server and credentials.
    pub target: ConnectionTarget,
    /// Root node discovery starts from.
    pub root: NodeId,
    /// Native identifiers of the selected points. Empty means all.
    pub selected_nodes: Vec<String>,
}

impl AdapterSettings {
    /// Resolves connection target, root node and selection.
    pub fn resolve(extractor: &StaticPropertyExtractor<'_>) -> Result<Self, ConfigurationError> {
        let target = ConnectionTarget::resolve(extractor)?;
        let root = resolve_root(extractor)?;
        let selected_nodes = extractor
            .selected_options(keys::AVAILABLE_NODES)
            .into_iter()
            .map(|o| o.internal_name.clone())
            .collect();
        Ok(Self {
            target,
            root,
            selected_nodes,
        })
    }
}

/// Resolves the discovery root from `NAMESPACE_INDEX` and `NODE_ID`.
pub fn resolve_root(extractor: &StaticPropertyExtractor<'_>) -> Result<NodeId, ConfigurationError> {
    let ns_text = required_text(extractor, keys::NAMESPACE_INDEX)?;
    let namespace_index = ns_text.parse::<u16>().map_err(|_| {
        ConfigurationError::invalid_value(keys::NAMESPACE_INDEX, ns_text, "expected an integer between 0 and 65535")
    })?;
    let node_id = required_text(extractor, keys::NODE_ID)?;
    NodeId::from_parts(namespace_index, node_id).map_err(|e| match e {
        crate::error::OpcUaError::Configuration(c) => c,
        other => ConfigurationError::invalid_node_id(node_id, other.to_string()),
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::declare_model;
    use connect_core::{AdapterDescription, SelectOption};

    fn filled() -> AdapterDescription {
        let mut desc = declare_model();
        desc.select_alternative(keys::OPC_HOST_OR_URL, keys::OPC_URL);
        desc.set_value(keys::OPC_SERVER_URL, "opc.tcp://plant:4840");
        desc.select_alternative(keys::ACCESS_MODE, keys::UNAUTHENTICATED);
        desc.set_value(keys::NAMESPACE_INDEX, "2");
        desc.set_value(keys::NODE_ID, "Plant");
        desc
    }

    #[test]
    fn test_resolve_url_anonymous() {
        let desc = filled();
        let target = ConnectionTarget::resolve(&desc.extractor()).unwrap();
        assert_eq!(target.endpoint_url(), "opc.tcp://plant:4840");
        assert!(target.credentials.is_anonymous());
    }

    #[test]
    fn test_resolve_host_port_username() {
        let mut desc = filled();
        desc.select_alternative(keys::OPC_HOST_OR_URL, keys::OPC_HOST);
        desc.set_value(keys::OPC_SERVER_HOST, "10.0.0.5");
        desc.set_value(keys::OPC_SERVER_PORT, "4841");
        desc.select_alternative(keys::ACCESS_MODE, keys::USERNAME_GROUP);
        desc.set_value(keys::USERNAME, "operator");
        desc.set_value(keys::PASSWORD, "s3cret");

        let target = ConnectionTarget::resolve(&desc.extractor()).unwrap();
        assert_eq!(
            target.address,
            ServerAddress::HostPort {
                host: "10.0.0.5".into(),
                port: 4841
            }
        );
        assert_eq!(
            target.credentials,
            Credentials::UserName {
                username: "operator".into(),
                password: "s3cret".into()
            }
        );
        assert!(!format!("{:?}", target.credentials).contains("s3cret"));
    }

    #[test]
    fn test_missing_access_mode() {
        let mut desc = declare_model();
        desc.select_alternative(keys::OPC_HOST_OR_URL, keys::OPC_URL);
        desc.set_value(keys::OPC_SERVER_URL, "opc.tcp://plant:4840");

        let err = ConnectionTarget::resolve(&desc.extractor()).unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingAlternative { ref name } if name == keys::ACCESS_MODE));
    }

    #[test]
    fn test_missing_addressing() {
        let desc = declare_model();
        let err = ConnectionTarget::resolve(&desc.extractor()).unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingAlternative { ref name } if name == keys::OPC_HOST_OR_URL));
        assert_eq!(describe_address(&desc.extractor()), "<unresolved>");
    }

    #[test]
    fn test_invalid_port() {
        let mut desc = filled();
        desc.select_alternative(keys::OPC_HOST_OR_URL, keys::OPC_HOST);
        desc.set_value(keys::OPC_SERVER_HOST, "plc");
        desc.set_value(keys::OPC_SERVER_PORT, "0");
        let err = ConnectionTarget::resolve(&desc.extractor()).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidValue { .. }));
    }

    #[test]
    fn test_username_without_password() {
        let mut desc = filled();
        desc.select_alternative(keys::ACCESS_MODE, keys::USERNAME_GROUP);
        desc.set_value(keys::USERNAME, "operator");
        let err = ConnectionTarget::resolve(&desc.extractor()).unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingValue { ref field } if field == keys::PASSWORD));
    }

    #[test]
    fn test_adapter_settings_selection() {
        let mut desc = filled();
        desc.set_options(
            keys::AVAILABLE_NODES,
            vec![
                SelectOption::new("Speed", "Plant.Speed").selected(),
                SelectOption::new("Temp", "Plant.Temp"),
            ],
        );
        let settings = AdapterSettings::resolve(&desc.extractor()).unwrap();
        assert_eq!(settings.root, NodeId::string(2, "Plant"));
        assert_eq!(settings.selected_nodes, vec!["Plant.Speed".to_string()]);
    }

    #[test]
    fn test_invalid_namespace_index() {
        let mut desc = filled();
        desc.set_value(keys::NAMESPACE_INDEX, "two");
        let err = AdapterSettings::resolve(&desc.extractor()).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidValue { .. }));
    }
}

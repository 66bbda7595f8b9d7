// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # connect-config
//!
//! Adapter description files for ua-connect.
//!
//! ## Features
//!
//! - **Multi-Format Support**: YAML, TOML, and JSON description files
//! - **Environment Placeholders**: `${VAR}` and `${VAR:default}` in values
//! - **Environment Overrides**: `UA_CONNECT_SERVER_URL`, `UA_CONNECT_LOG_LEVEL`
//! - **Description Mapping**: files become the static-property description
//!   the OPC UA adapter consumes
//!
//! ## Quick Start
//!
//! ```no_run
//! use connect_config::loader::load_description;
//!
//! let file = load_description("adapter.yaml").unwrap();
//! let description = file.into_description();
//! println!("Adapter: {}", description.app_id);
//! ```
//!
//! ## File Layout
//!
//! - `adapter` - Server address, authentication, root node and selection
//! - `subscription` - Publishing and sampling intervals
//! - `logging` - Level and output format
//!
//! ```
//! use connect_config::{ConfigFormat, ConfigLoader};
//!
//! let yaml = "adapter:\n  server:\n    url: opc.tcp://localhost:4840\n  namespace_index: 2\n  node_id: Plant\n";
//! let file = ConfigLoader::new()
//!     .with_env_vars(false)
//!     .load_from_str(yaml, ConfigFormat::Yaml)
//!     .unwrap();
//! assert!(file.validate().is_ok());
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod loader;
pub mod schema;

// Re-export commonly used types
pub use error::{ConfigError, ConfigResult};
pub use loader::{load_description, ConfigFormat, ConfigLoader, DEFAULT_ENV_PREFIX};
pub use schema::{
    AdapterSection, AuthSection, DescriptionFile, LogFormat, LogLevel, LoggingSection, ServerSection,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name() {
        assert_eq!(NAME, "connect-config");
    }
}

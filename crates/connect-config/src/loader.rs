// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Description file loading.
//!
//! # Loading Pipeline
//!
//! 1. Read the file and pick the format from its extension
//! 2. Resolve `${VAR}` / `${VAR:default}` placeholders in the raw content
//! 3. Parse YAML/TOML/JSON into a [`DescriptionFile`]
//! 4. Apply environment variable overrides
//!
//! Loading does not validate: partial files are legal so that option
//! resolution works while the description is still being filled in. Use
//! [`ConfigLoader::load_validated`] for the strict check.
//!
//! # Environment Variable Override
//!
//! ```text
//! UA_CONNECT_SERVER_URL=opc.tcp://plc-7:4840
//! UA_CONNECT_LOG_LEVEL=debug
//! ```

use std::env;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::schema::{DescriptionFile, LogLevel};

/// Default environment variable prefix.
pub const DEFAULT_ENV_PREFIX: &str = "UA_CONNECT";

// =============================================================================
// ConfigLoader
// =============================================================================

/// Loader for adapter description files.
///
/// # Examples
///
/// ```no_run
/// use connect_config::loader::ConfigLoader;
///
/// let file = ConfigLoader::new().load("adapter.yaml").unwrap();
/// let description = file.into_description();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Environment variable prefix.
    env_prefix: String,

    /// Whether to resolve placeholders and apply overrides.
    resolve_env_vars: bool,
}

impl ConfigLoader {
    /// Creates a loader with the `UA_CONNECT` prefix.
    pub fn new() -> Self {
        Self {
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            resolve_env_vars: true,
        }
    }

    /// Sets the environment variable prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Enables or disables environment variable resolution.
    pub fn with_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = enabled;
        self
    }

    /// Loads a description file.
    ///
    /// The format is determined by the extension: `.yaml`/`.yml`, `.toml`
    /// or `.json`.
    pub fn load(&self, path: impl AsRef<Path>) -> ConfigResult<DescriptionFile> {
        let path = path.as_ref();
        info!("Loading description from: {}", path.display());

        let format = ConfigFormat::from_path(path)?;
        let content = self.read_file(path)?;
        let content = self.prepare(&content);

        let mut file: DescriptionFile = parse_str(&content, format).map_err(|e| e.in_file(path))?;

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut file)?;
        }

        debug!(
            server = ?file.adapter.server.url.as_deref().or(file.adapter.server.host.as_deref()),
            node_id = ?file.adapter.node_id,
            selected = file.adapter.selected_nodes.len(),
            "Description loaded"
        );
        Ok(file)
    }

    /// Loads a description file and runs the strict check.
    pub fn load_validated(&self, path: impl AsRef<Path>) -> ConfigResult<DescriptionFile> {
        let file = self.load(path)?;
        file.validate()?;
        Ok(file)
    }

    /// Loads a description from a string.
    pub fn load_from_str(&self, content: &str, format: ConfigFormat) -> ConfigResult<DescriptionFile> {
        let content = self.prepare(content);
        let mut file: DescriptionFile = parse_str(&content, format)?;
        if self.resolve_env_vars {
            self.apply_env_overrides(&mut file)?;
        }
        Ok(file)
    }

    fn read_file(&self, path: &Path) -> ConfigResult<String> {
        if !path.exists() {
            return Err(ConfigError::not_found(path));
        }
        fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))
    }

    fn prepare(&self, content: &str) -> String {
        if self.resolve_env_vars {
            self.resolve_env_placeholders(content)
        } else {
            content.to_string()
        }
    }

    /// Resolves `${VAR_NAME}` and `${VAR_NAME:default}` placeholders.
    ///
    /// An unset variable without default keeps its placeholder.
    fn resolve_env_placeholders(&self, content: &str) -> String {
        let mut result = String::with_capacity(content.len());
        let mut chars = content.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' || chars.peek() != Some(&'{') {
                result.push(c);
                continue;
            }
            chars.next();

            let mut var_content = String::new();
            let mut found_close = false;
            for c in chars.by_ref() {
                if c == '}' {
                    found_close = true;
                    break;
                }
                var_content.push(c);
            }

            if !found_close {
                result.push_str("${");
                result.push_str(&var_content);
                continue;
            }

            let (var_name, default_value) = match var_content.split_once(':') {
                Some((name, default)) => (name, Some(default)),
                None => (var_content.as_str(), None),
            };

            match (env::var(var_name), default_value) {
                (Ok(value), _) => result.push_str(&value),
                (Err(_), Some(default)) => result.push_str(default),
                (Err(_), None) => {
                    warn!("Environment variable '{}' not found", var_name);
                    result.push_str(&format!("${{{}}}", var_name));
                }
            }
        }

        result
    }

    fn apply_env_overrides(&self, file: &mut DescriptionFile) -> ConfigResult<()> {
        let url_var = format!("{}_SERVER_URL", self.env_prefix);
        if let Ok(value) = env::var(&url_var) {
            if value.trim().is_empty() {
                return Err(ConfigError::env_override(url_var, "expected a server URL"));
            }
            debug!(variable = %url_var, "Server URL overridden from environment");
            file.adapter.server.url = Some(value);
            file.adapter.server.host = None;
            file.adapter.server.port = None;
        }

        let level_var = format!("{}_LOG_LEVEL", self.env_prefix);
        if let Ok(value) = env::var(&level_var) {
            match LogLevel::parse(&value) {
                Some(level) => file.logging.level = level,
                None => warn!(variable = %level_var, value = %value, "Ignoring unknown log level"),
            }
        }

        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ConfigFormat
// =============================================================================

/// Supported description file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format.
    Yaml,
    /// TOML format.
    Toml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Determines the format from a file path.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            _ => Err(ConfigError::unknown_format(path)),
        }
    }

    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn parse_str<T: DeserializeOwned>(content: &str, format: ConfigFormat) -> ConfigResult<T> {
    match format {
        ConfigFormat::Yaml => parse_yaml(content),
        ConfigFormat::Toml => toml::from_str(content).map_err(|e| ConfigError::syntax("TOML", e)),
        ConfigFormat::Json => {
            serde_json::from_str(content).map_err(|e| ConfigError::syntax("JSON", e))
        }
    }
}

/// YAML goes through the `config` crate.
fn parse_yaml<T: DeserializeOwned>(content: &str) -> ConfigResult<T> {
    let config = config::Config::builder()
        .add_source(config::File::from_str(content, config::FileFormat::Yaml))
        .build()
        .map_err(|e| ConfigError::syntax("YAML", e))?;

    config
        .try_deserialize()
        .map_err(|e| ConfigError::syntax("YAML", e))
}

// =============================================================================
// Convenience Functions
// =============================================================================

/// Loads a description file with default settings.
pub fn load_description(path: impl AsRef<Path>) -> ConfigResult<DescriptionFile> {
    ConfigLoader::new().load(path)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::LogFormat;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const YAML: &str = r#"
adapter:
  server:
    url: opc.tcp://localhost:4840
  namespace_index: 2
  node_id: Plant
  selected_nodes:
    - Plant.Line1.Temperature
subscription:
  publishing_interval_ms: 500
logging:
  level: debug
  format: json
"#;

    fn write(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::with_suffix(suffix).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_yaml() {
        let tmp = write(".yaml", YAML);
        let file = ConfigLoader::new().with_env_prefix("UA_CONNECT_T_YAML").load(tmp.path()).unwrap();

        assert_eq!(file.adapter.server.url.as_deref(), Some("opc.tcp://localhost:4840"));
        assert_eq!(file.adapter.namespace_index, Some(2));
        assert_eq!(file.adapter.node_id.as_deref(), Some("Plant"));
        assert_eq!(file.adapter.selected_nodes, vec!["Plant.Line1.Temperature".to_string()]);
        assert_eq!(file.subscription.publishing_interval_ms, 500);
        assert_eq!(file.subscription.sampling_interval_ms, 250);
        assert_eq!(file.logging.level, LogLevel::Debug);
        assert_eq!(file.logging.format, LogFormat::Json);
        assert!(file.adapter.auth.is_none());
    }

    #[test]
    fn test_load_toml() {
        let toml = r#"
[adapter]
namespace_index = 3
node_id = "Line"

[adapter.server]
host = "plc-7"
port = 4841

[adapter.auth]
username = "operator"
password = "${UA_CONNECT_T_TOML_UNSET_PASSWORD:fallback}"
"#;
        let tmp = write(".toml", toml);
        let file = ConfigLoader::new().with_env_prefix("UA_CONNECT_T_TOML").load(tmp.path()).unwrap();

        assert_eq!(file.adapter.server.host.as_deref(), Some("plc-7"));
        assert_eq!(file.adapter.server.port, Some(4841));
        let auth = file.adapter.auth.as_ref().unwrap();
        assert_eq!(auth.password.as_deref(), Some("fallback"));
        assert!(file.validate().is_ok());
    }

    #[test]
    fn test_load_json_partial() {
        let tmp = write(".json", r#"{ "adapter": { "namespace_index": 2 } }"#);
        let file = ConfigLoader::new().with_env_prefix("UA_CONNECT_T_JSON").load(tmp.path()).unwrap();

        assert!(file.adapter.server.url.is_none());
        assert!(file.validate().is_err());
    }

    #[test]
    fn test_load_validated_rejects_partial() {
        let tmp = write(".yaml", "adapter:\n  node_id: Plant\n");
        let result = ConfigLoader::new()
            .with_env_prefix("UA_CONNECT_T_STRICT")
            .load_validated(tmp.path());
        assert!(matches!(result, Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_config_format_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.yml")).unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.TOML")).unwrap(), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")).unwrap(), ConfigFormat::Json);
        assert!(ConfigFormat::from_path(Path::new("a.ini")).is_err());
        assert!(ConfigFormat::from_path(Path::new("adapter")).is_err());
    }

    #[test]
    fn test_env_placeholders() {
        let loader = ConfigLoader::new();
        env::set_var("UA_CONNECT_T_PLACEHOLDER", "opc.tcp://env:4840");

        assert_eq!(
            loader.resolve_env_placeholders("url: ${UA_CONNECT_T_PLACEHOLDER}"),
            "url: opc.tcp://env:4840"
        );
        assert_eq!(
            loader.resolve_env_placeholders("port: ${UA_CONNECT_T_MISSING:4840}"),
            "port: 4840"
        );
        assert_eq!(
            loader.resolve_env_placeholders("x: ${UA_CONNECT_T_MISSING}"),
            "x: ${UA_CONNECT_T_MISSING}"
        );
        assert_eq!(loader.resolve_env_placeholders("x: ${unclosed"), "x: ${unclosed");
    }

    #[test]
    fn test_env_overrides() {
        env::set_var("UA_CONNECT_T_OVR_SERVER_URL", "opc.tcp://override:4840");
        env::set_var("UA_CONNECT_T_OVR_LOG_LEVEL", "warning");

        let yaml = "adapter:\n  server:\n    host: plc\n    port: 4840\n";
        let file = ConfigLoader::new()
            .with_env_prefix("UA_CONNECT_T_OVR")
            .load_from_str(yaml, ConfigFormat::Yaml)
            .unwrap();

        assert_eq!(file.adapter.server.url.as_deref(), Some("opc.tcp://override:4840"));
        assert!(file.adapter.server.host.is_none());
        assert_eq!(file.logging.level, LogLevel::Warn);
    }

    #[test]
    fn test_env_vars_disabled() {
        env::set_var("UA_CONNECT_T_OFF_SERVER_URL", "opc.tcp://override:4840");
        let file = ConfigLoader::new()
            .with_env_prefix("UA_CONNECT_T_OFF")
            .with_env_vars(false)
            .load_from_str(r#"{"adapter":{"server":{"url":"${X}"}}}"#, ConfigFormat::Json)
            .unwrap();
        assert_eq!(file.adapter.server.url.as_deref(), Some("${X}"));
    }

    #[test]
    fn test_file_not_found() {
        let result = ConfigLoader::new().load("/nonexistent/path/adapter.yaml");
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[test]
    fn test_parse_error_carries_path() {
        let tmp = write(".json", "{ not json");
        let result = ConfigLoader::new().load(tmp.path());
        assert!(matches!(result, Err(ConfigError::Syntax { .. })));
    }
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! - `run`: Start the adapter and print events (default)
//! - `schema`: Print the guessed event schema
//! - `options`: Print the selectable points below the root node
//! - `validate`: Validate the description file
//! - `describe`: Print the static adapter description
//! - `version`: Show version information

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// =============================================================================
// Main CLI Structure
// =============================================================================

/// ua-connect - OPC UA subscription adapter
///
/// Connects to an OPC UA server, subscribes to the points below a root node
/// and prints one JSON event per line.
#[derive(Parser, Debug)]
#[command(
    name = "ua-connect",
    author = "Sylvex <contact@sylvex.io>",
    version = connect_core::VERSION,
    about = "OPC UA subscription adapter",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Description file path
    #[arg(
        short,
        long,
        default_value = "ua-connect.yaml",
        env = "UA_CONNECT_CONFIG",
        global = true
    )]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the file
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Log format (text, json, compact); overrides the file
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Enable quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Use an in-process simulated server with a changing demo namespace
    #[arg(long, env = "UA_CONNECT_SIMULATE", global = true)]
    pub simulate: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands for the ua-connect CLI.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the adapter
    ///
    /// This is the default command when no subcommand is specified.
    /// Events are written to stdout as JSON lines until SIGINT or SIGTERM.
    Run(RunArgs),

    /// Print the guessed event schema
    ///
    /// Connects once, samples every selected point and prints the schema as JSON.
    Schema(SchemaArgs),

    /// Print the selectable points below the root node
    ///
    /// Prints an empty list when the description is incomplete or the server
    /// cannot be reached.
    Options,

    /// Validate the description file
    ///
    /// Performs the strict check without connecting to the server.
    Validate(ValidateArgs),

    /// Print the static adapter description
    Describe,

    /// Show detailed version information
    Version,
}

// =============================================================================
// Command Arguments
// =============================================================================

/// Arguments for the `run` command.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Interval between simulated value changes in milliseconds
    #[arg(long, default_value = "1000")]
    pub simulate_interval_ms: u64,
}

/// Arguments for the `schema` command.
#[derive(Args, Debug, Default, Clone)]
pub struct SchemaArgs {
    /// Include the preview event
    #[arg(long)]
    pub preview: bool,
}

/// Arguments for the `validate` command.
#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Show the resulting description after validation
    #[arg(short, long)]
    pub show_config: bool,

    /// Output format for validation results
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

// =============================================================================
// Enums
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for structured logging
    Json,
    /// Compact format for minimal output
    Compact,
}

impl From<connect_config::LogFormat> for LogFormat {
    fn from(format: connect_config::LogFormat) -> Self {
        match format {
            connect_config::LogFormat::Text => LogFormat::Text,
            connect_config::LogFormat::Json => LogFormat::Json,
            connect_config::LogFormat::Compact => LogFormat::Compact,
        }
    }
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for programmatic parsing
    Json,
}

// =============================================================================
// Helper Methods
// =============================================================================

impl Cli {
    /// Parse CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective command, defaulting to `Run` if none specified.
    pub fn effective_command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Run(RunArgs::default()))
    }

    /// Get the effective log level: flags first, then `--log-level`, then
    /// the file's level.
    pub fn effective_log_level<'a>(&'a self, file_level: &'a str) -> &'a str {
        if self.quiet {
            "warn"
        } else if self.verbose {
            "debug"
        } else {
            self.log_level.as_deref().unwrap_or(file_level)
        }
    }

    /// Get the effective log format, `--log-format` winning over the file.
    pub fn effective_log_format(&self, file_format: connect_config::LogFormat) -> LogFormat {
        self.log_format.unwrap_or_else(|| file_format.into())
    }
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            simulate_interval_ms: 1000,
        }
    }
}

impl Default for ValidateArgs {
    fn default() -> Self {
        Self {
            show_config: false,
            format: OutputFormat::Text,
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
    fn test_default_command() {
        let cli = Cli::parse_from(["ua-connect"]);
        assert!(cli.command.is_none());
        assert!(matches!(cli.effective_command(), Commands::Run(_)));
    }

    #[test]
    fn test_subcommands() {
        let cli = Cli::parse_from(["ua-connect", "schema", "--preview"]);
        assert!(matches!(cli.command, Some(Commands::Schema(SchemaArgs { preview: true }))));

        let cli = Cli::parse_from(["ua-connect", "options"]);
        assert!(matches!(cli.command, Some(Commands::Options)));

        let cli = Cli::parse_from(["ua-connect", "describe"]);
        assert!(matches!(cli.command, Some(Commands::Describe)));
    }

    #[test]
    fn test_validate_command() {
        let cli = Cli::parse_from(["ua-connect", "validate", "--show-config", "-f", "json"]);
        if let Some(Commands::Validate(args)) = cli.command {
            assert!(args.show_config);
            assert_eq!(args.format, OutputFormat::Json);
        } else {
            panic!("Expected Validate command");
        }
    }

    #[test]
    fn test_config_path_and_simulate() {
        let cli = Cli::parse_from(["ua-connect", "-c", "/etc/ua/plant.yaml", "--simulate", "run"]);
        assert_eq!(cli.config, PathBuf::from("/etc/ua/plant.yaml"));
        assert!(cli.simulate);
    }

    #[test]
    fn test_run_interval() {
        let cli = Cli::parse_from(["ua-connect", "run", "--simulate-interval-ms", "250"]);
        if let Some(Commands::Run(args)) = cli.command {
            assert_eq!(args.simulate_interval_ms, 250);
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_log_level_precedence() {
        let cli = Cli::parse_from(["ua-connect"]);
        assert_eq!(cli.effective_log_level("error"), "error");

        let cli = Cli::parse_from(["ua-connect", "-l", "trace"]);
        assert_eq!(cli.effective_log_level("error"), "trace");

        let cli = Cli::parse_from(["ua-connect", "-q", "-l", "trace"]);
        assert_eq!(cli.effective_log_level("error"), "warn");
    }

    #[test]
    fn test_log_format_precedence() {
        let cli = Cli::parse_from(["ua-connect"]);
        assert_eq!(cli.effective_log_format(connect_config::LogFormat::Json), LogFormat::Json);

        let cli = Cli::parse_from(["ua-connect", "--log-format", "compact"]);
        assert_eq!(cli.effective_log_format(connect_config::LogFormat::Json), LogFormat::Compact);
    }
}

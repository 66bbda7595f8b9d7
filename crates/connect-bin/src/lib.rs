// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # connect-bin
//!
//! Command line front end for the OPC UA subscription adapter.
//!
//! The binary loads a description file, builds the adapter through the
//! registry and either streams assembled events to stdout as JSON lines or
//! answers one of the design-time questions (options, schema, description).
//!
//! ## Architecture
//!
//! ```text
//!                  ┌──────────────┐
//!                  │   main.rs    │
//!                  └──────┬───────┘
//!                         │
//!                  ┌──────▼───────┐
//!                  │    cli.rs    │
//!                  └──────┬───────┘
//!                         │
//!          ┌──────────────┼──────────────┐
//!          ▼              ▼              ▼
//!   ┌────────────┐ ┌────────────┐ ┌────────────┐
//!   │  commands  │ │  context   │ │  logging   │
//!   └─────┬──────┘ └─────┬──────┘ └────────────┘
//!         │              │
//!   ┌─────▼──────┐ ┌─────▼──────────────┐
//!   │ sink       │ │ connect-config     │
//!   │ shutdown   │ │ connect-opcua      │
//!   │ simulate   │ │ (AdapterRegistry)  │
//!   └────────────┘ └────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Stream events (default command)
//! ua-connect -c plant.yaml
//!
//! # Try it against the built-in simulated server
//! ua-connect --simulate run --simulate-interval-ms 500
//!
//! # Design-time queries
//! ua-connect -c plant.yaml options
//! ua-connect -c plant.yaml schema --preview
//! ua-connect describe
//!
//! # Check a description file
//! ua-connect -c plant.yaml validate --format json
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod cli;
pub mod commands;
pub mod context;
pub mod error;
pub mod logging;
pub mod shutdown;
pub mod simulate;
pub mod sink;

// =============================================================================
// Re-exports
// =============================================================================

pub use cli::{Cli, Commands};
pub use context::AppContext;
pub use error::{BinError, BinResult};
pub use logging::init_logging;
pub use shutdown::{ShutdownCoordinator, ShutdownSignal};
pub use simulate::ValueSimulator;
pub use sink::JsonLinesSink;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

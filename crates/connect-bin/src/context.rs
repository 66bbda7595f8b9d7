// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Command context: description file, transport and adapter registry.
//!
//! ```text
//! description file ──▶ DescriptionFile ──▶ AdapterDescription
//!                                               │
//! --simulate ──▶ SimulatedProvider ─┐           ▼
//!                                   ├──▶ AdapterRegistry ──▶ Box<dyn Adapter>
//! (default)  ──▶ RealTransportProvider ┘
//! ```

use std::sync::Arc;

use connect_config::{ConfigLoader, DescriptionFile, LoggingSection};
use connect_core::{Adapter, AdapterDescription, AdapterRegistry};
use connect_opcua::client::{SimulatedProvider, SimulatedServer, TransportProvider, DEMO_NAMESPACE, DEMO_ROOT};
use connect_opcua::OpcUaAdapterFactory;
use tracing::{debug, info};

use crate::cli::Cli;
use crate::error::BinResult;

/// Endpoint the demo description points at; any `opc.tcp` URL reaches the
/// simulated server.
pub const DEMO_ENDPOINT: &str = "opc.tcp://localhost:4840";

// =============================================================================
// AppContext
// =============================================================================

/// Everything a command needs to talk to the adapter.
pub struct AppContext {
    file: DescriptionFile,
    registry: AdapterRegistry,
    simulated: Option<SimulatedServer>,
}

impl AppContext {
    /// Loads the description file named on the command line and sets up the
    /// transport.
    pub fn load(cli: &Cli) -> BinResult<Self> {
        let file = load_file(cli)?;
        Self::build(file, cli.simulate)
    }

    /// Builds a context from an already loaded file.
    pub fn build(file: DescriptionFile, simulate: bool) -> BinResult<Self> {
        let (provider, simulated) = if simulate {
            let server = SimulatedServer::demo();
            info!(root = DEMO_ROOT, namespace = DEMO_NAMESPACE, "Using simulated OPC UA server");
            let provider: Arc<dyn TransportProvider> = Arc::new(SimulatedProvider::new(server.clone()));
            (provider, Some(server))
        } else {
            (network_provider()?, None)
        };

        let factory = OpcUaAdapterFactory::new(provider).with_subscription_settings(file.subscription.clone());
        let mut registry = AdapterRegistry::new();
        registry.register(Box::new(factory));

        Ok(Self {
            file,
            registry,
            simulated,
        })
    }

    /// Returns the loaded file.
    pub fn file(&self) -> &DescriptionFile {
        &self.file
    }

    /// Returns the adapter registry.
    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Returns the simulated server when running with `--simulate`.
    pub fn simulated_server(&self) -> Option<&SimulatedServer> {
        self.simulated.as_ref()
    }

    /// Returns the adapter description built from the file.
    pub fn description(&self) -> AdapterDescription {
        self.file.into_description()
    }

    /// Instantiates the adapter through the registry.
    pub fn create_adapter(&self) -> BinResult<Box<dyn Adapter>> {
        Ok(self.registry.create(self.description())?)
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("adapters", &self.registry.ids())
            .field("simulated", &self.simulated.is_some())
            .finish()
    }
}

// =============================================================================
// Description File
// =============================================================================

/// Loads the description file.
///
/// With `--simulate` and no file on disk, the demo description is used.
pub fn load_file(cli: &Cli) -> BinResult<DescriptionFile> {
    if cli.simulate && !cli.config.exists() {
        debug!(path = %cli.config.display(), "No description file, using the demo description");
        return Ok(demo_file());
    }
    Ok(ConfigLoader::new().load(&cli.config)?)
}

/// Logging section of the description file, or defaults if it cannot be read.
///
/// Runs before logging is set up, so load errors are left to the command.
pub fn logging_section(cli: &Cli) -> LoggingSection {
    load_file(cli).map(|file| file.logging).unwrap_or_default()
}

/// Description of the simulated demo namespace.
pub fn demo_file() -> DescriptionFile {
    let mut file = DescriptionFile::default();
    file.adapter.server.url = Some(DEMO_ENDPOINT.to_string());
    file.adapter.namespace_index = Some(DEMO_NAMESPACE);
    file.adapter.node_id = Some(DEMO_ROOT.to_string());
    file
}

// =============================================================================
// Transport
// =============================================================================

#[cfg(feature = "real-transport")]
fn network_provider() -> BinResult<Arc<dyn TransportProvider>> {
    Ok(Arc::new(connect_opcua::client::RealTransportProvider))
}

#[cfg(not(feature = "real-transport"))]
fn network_provider() -> BinResult<Arc<dyn TransportProvider>> {
    Err(crate::error::BinError::transport_unavailable(
        "this build has no network transport; rebuild with --features real-transport or pass --simulate",
    ))
}

// =============================================================================
// Tests
// =============================================================================

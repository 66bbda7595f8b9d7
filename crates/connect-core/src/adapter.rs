// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Adapter capability traits and the adapter registry.
//!
//! Every adapter family implements the same capability set, whether it is
//! subscription driven (a protocol client that is pushed value changes) or
//! pull-parse driven (a byte stream that is parsed into records).
//!
//! # Lifecycle
//!
//! ```text
//!  AdapterFactory::declare_model()        static description, no I/O
//!          │
//!  AdapterFactory::resolve_options()      best effort, never fails
//!          │
//!  AdapterFactory::create(description)    pure construction
//!          │
//!  Adapter::get_schema()                  connects, samples, disconnects
//!          │
//!  Adapter::start(sink) ───► events ───► EventSink::process
//!          │
//!  Adapter::stop()                        idempotent
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use connect_core::adapter::AdapterRegistry;
//!
//! let mut registry = AdapterRegistry::new();
//! registry.register(Box::new(OpcUaAdapterFactory::simulated(server)));
//!
//! let mut adapter = registry.create(description)?;
//! adapter.start(sink).await?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::description::AdapterDescription;
use crate::error::{AdapterError, AdapterResult};
use crate::pipeline::EventSink;
use crate::schema::GuessSchema;
use crate::types::SelectOption;

// =============================================================================
// Adapter Trait
// =============================================================================

/// A configured adapter instance.
///
/// `start` and `stop` take `&mut self` and must be called with exclusive
/// access. `get_schema` may be called on a stopped adapter.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Returns the adapter id this instance was created for.
    fn id(&self) -> &str;

    /// Returns the description the adapter was instantiated with.
    fn description(&self) -> &AdapterDescription;

    /// Starts producing events into `sink`.
    ///
    /// # Errors
    ///
    /// - `AdapterError::Configuration` if the description is incomplete
    /// - `AdapterError::Source` if the source cannot be reached
    /// - `AdapterError::Lifecycle` if the adapter is already running
    async fn start(&mut self, sink: Arc<dyn EventSink>) -> AdapterResult<()>;

    /// Stops producing events.
    ///
    /// Once this returns, no further event reaches the sink. Stopping an
    /// adapter that is not running is a no-op.
    async fn stop(&mut self) -> AdapterResult<()>;

    /// Guesses the schema of the events this adapter would produce.
    async fn get_schema(&self) -> AdapterResult<GuessSchema>;

    /// Returns `true` while the adapter is started.
    fn is_running(&self) -> bool;
}

// =============================================================================
// AdapterFactory Trait
// =============================================================================

/// Factory for one adapter family.
#[async_trait]
pub trait AdapterFactory: Send + Sync {
    /// Stable adapter id.
    fn id(&self) -> &str;

    /// Returns the static description. Performs no I/O.
    fn declare_model(&self) -> AdapterDescription;

    /// Creates an adapter instance from a filled-in description.
    fn create(&self, description: AdapterDescription) -> Box<dyn Adapter>;

    /// Resolves the options of a selection property against a possibly
    /// incomplete description.
    ///
    /// This never fails: an incomplete description or an unreachable source
    /// both produce an empty list.
    async fn resolve_options(
        &self,
        _property: &str,
        _description: &AdapterDescription,
    ) -> Vec<SelectOption> {
        Vec::new()
    }
}

// =============================================================================
// AdapterRegistry
// =============================================================================

/// Registry of adapter factories, keyed by adapter id.
#[derive(Default)]
pub struct AdapterRegistry {
    factories: BTreeMap<String, Box<dyn AdapterFactory>>,
}

impl AdapterRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory.
    ///
    /// If a factory with the same id already exists, it will be replaced.
    pub fn register(&mut self, factory: Box<dyn AdapterFactory>) {
        let id = factory.id().to_string();
        tracing::debug!(adapter_id = %id, "Registered adapter factory");
        self.factories.insert(id, factory);
    }

    /// Returns the factory registered under `id`.
    pub fn factory(&self, id: &str) -> Option<&dyn AdapterFactory> {
        self.factories.get(id).map(|f| f.as_ref())
    }

    /// Returns the static descriptions of all registered adapters.
    pub fn declare_models(&self) -> Vec<AdapterDescription> {
        self.factories.values().map(|f| f.declare_model()).collect()
    }

    /// Creates an adapter for the description's `app_id`.
    ///
    /// # Errors
    ///
    /// - `AdapterError::UnknownAdapter` if no factory is registered for it
    pub fn create(&self, description: AdapterDescription) -> AdapterResult<Box<dyn Adapter>> {
        let factory = self
            .factory(&description.app_id)
            .ok_or_else(|| AdapterError::unknown_adapter(&description.app_id))?;
        Ok(factory.create(description))
    }

    /// Resolves options through the factory for the description's `app_id`.
    ///
    /// Unknown adapters produce an empty list.
    pub async fn resolve_options(
        &self,
        property: &str,
        description: &AdapterDescription,
    ) -> Vec<SelectOption> {
        match self.factory(&description.app_id) {
            Some(factory) => factory.resolve_options(property, description).await,
            None => {
                tracing::warn!(adapter_id = %description.app_id, "No adapter registered for option resolution");
                Vec::new()
            }
        }
    }

    /// Returns the registered adapter ids.
    pub fn ids(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

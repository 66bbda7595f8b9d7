// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The subscription-driven OPC UA adapter.
//!
//! # Lifecycle
//!
//! ```text
//! declare_model ──▶ resolve_options* ──▶ create ──▶ get_schema* ──▶ start ──▶ stop
//!   (no I/O)         (best effort)      (pure)     (own session)   (session held)
//! ```
//!
//! `start` resolves the description, opens one session, discovers the
//! namespace recursively, and subscribes the selected points with a fresh
//! [`SubscriptionEventAssembler`]. `stop` closes the assembler first, so no
//! event is emitted once it returns, then releases the subscription and the
//! session.

use std::sync::Arc;

use async_trait::async_trait;
use connect_core::{
    Adapter, AdapterDescription, AdapterError, AdapterFactory, AdapterResult, EventSink, GuessSchema,
    SelectOption, StaticProperty, StaticPropertyAlternative,
};
use tracing::{debug, info, warn};

use crate::assembler::SubscriptionEventAssembler;
use crate::browse::{select_points, Point};
use crate::client::TransportProvider;
use crate::config::{describe_address, keys, AdapterSettings};
use crate::connector::{SourceConnector, SubscriptionHandle};
use crate::error::{OpcUaError, OpcUaResult};
use crate::options::{OptionResolver, OptionsOutcome};
use crate::schema::SchemaInference;
use crate::types::SubscriptionSettings;

/// Adapter id.
pub const ADAPTER_ID: &str = "org.apache.streampipes.connect.adapters.opcua";

/// Returns the static description of the OPC UA adapter.
pub fn declare_model() -> AdapterDescription {
    AdapterDescription::builder(ADAPTER_ID)
        .name("OPC UA")
        .description("Reads values from an OPC UA server")
        .category("Generic")
        .property(StaticProperty::alternatives(
            keys::ACCESS_MODE,
            vec![
                StaticPropertyAlternative::new(keys::UNAUTHENTICATED),
                StaticPropertyAlternative::with_property(
                    keys::USERNAME_GROUP,
                    StaticProperty::group(
                        keys::USERNAME_GROUP,
                        vec![
                            StaticProperty::free_text(keys::USERNAME),
                            StaticProperty::secret(keys::PASSWORD),
                        ],
                    ),
                ),
            ],
        ))
        .property(StaticProperty::alternatives(
            keys::OPC_HOST_OR_URL,
            vec![
                StaticPropertyAlternative::with_property(
                    keys::OPC_URL,
                    StaticProperty::free_text(keys::OPC_SERVER_URL),
                ),
                StaticPropertyAlternative::with_property(
                    keys::OPC_HOST,
                    StaticProperty::group(
                        keys::OPC_HOST,
                        vec![
                            StaticProperty::free_text(keys::OPC_SERVER_HOST),
                            StaticProperty::free_text(keys::OPC_SERVER_PORT),
                        ],
                    ),
                ),
            ],
        ))
        .property(StaticProperty::free_text(keys::NAMESPACE_INDEX))
        .property(StaticProperty::free_text(keys::NODE_ID))
        .property(StaticProperty::multi_value_selection(
            keys::AVAILABLE_NODES,
            &[keys::NAMESPACE_INDEX, keys::NODE_ID],
        ))
        .build()
}

// =============================================================================
// OpcUaAdapter
// =============================================================================

struct Running {
    connector: SourceConnector,
    assembler: Arc<SubscriptionEventAssembler>,
    handle: SubscriptionHandle,
    address: String,
}

/// A configured OPC UA adapter instance.
pub struct OpcUaAdapter {
    description: AdapterDescription,
    provider: Arc<dyn TransportProvider>,
    subscription: SubscriptionSettings,
    running: Option<Running>,
}

impl OpcUaAdapter {
    /// Creates a stopped adapter. Performs no I/O.
    pub fn new(
        description: AdapterDescription,
        provider: Arc<dyn TransportProvider>,
        subscription: SubscriptionSettings,
    ) -> Self {
        Self {
            description,
            provider,
            subscription,
            running: None,
        }
    }

    /// Returns the assembler of the running subscription.
    pub fn assembler(&self) -> Option<&Arc<SubscriptionEventAssembler>> {
        self.running.as_ref().map(|r| &r.assembler)
    }

    /// Returns the subscribed points' count, if running.
    pub fn subscribed_points(&self) -> Option<usize> {
        self.running.as_ref().map(|r| r.handle.points())
    }

    fn settings(&self) -> AdapterResult<AdapterSettings> {
        AdapterSettings::resolve(&self.description.extractor())
            .map_err(|e| OpcUaError::from(e).into_adapter_error(describe_address(&self.description.extractor())))
    }

    async fn discover(connector: &SourceConnector, settings: &AdapterSettings) -> OpcUaResult<Vec<Point>> {
        let points = connector.browse(&settings.root, true).await?;
        Ok(select_points(points, &settings.selected_nodes)?)
    }

    async fn subscribe(
        &self,
        connector: &SourceConnector,
        settings: &AdapterSettings,
        sink: Arc<dyn EventSink>,
    ) -> OpcUaResult<(Arc<SubscriptionEventAssembler>, SubscriptionHandle)> {
        let points = Self::discover(connector, settings).await?;
        let assembler = Arc::new(SubscriptionEventAssembler::new(&points, sink));
        let handle = connector
            .subscribe(&points, &self.subscription, assembler.clone())
            .await?;
        Ok((assembler, handle))
    }
}

#[async_trait]
impl Adapter for OpcUaAdapter {
    fn id(&self) -> &str {
        ADAPTER_ID
    }

    fn description(&self) -> &AdapterDescription {
        &self.description
    }

    async fn start(&mut self, sink: Arc<dyn EventSink>) -> AdapterResult<()> {
        if self.running.is_some() {
            return Err(AdapterError::lifecycle("OPC UA adapter is already running"));
        }
        let settings = self.settings()?;
        let address = settings.target.endpoint_url();

        let mut connector = SourceConnector::new(self.provider.create());
        if let Err(e) = connector.connect(&settings.target).await {
            return Err(e.into_adapter_error(address));
        }

        let (assembler, handle) = match self.subscribe(&connector, &settings, sink).await {
            Ok(subscribed) => subscribed,
            Err(e) => {
                e.log("start");
                connector.disconnect().await;
                return Err(e.into_adapter_error(address));
            }
        };

        info!(
            endpoint = %address,
            root = %settings.root,
            points = handle.points(),
            transport = self.provider.name(),
            "OPC UA adapter started"
        );
        self.running = Some(Running {
            connector,
            assembler,
            handle,
            address,
        });
        Ok(())
    }

    async fn stop(&mut self) -> AdapterResult<()> {
        let Some(mut running) = self.running.take() else {
            debug!("OPC UA adapter is not running");
            return Ok(());
        };

        running.assembler.close();
        if let Err(e) = running.connector.unsubscribe(running.handle).await {
            warn!(endpoint = %running.address, error = %e, "Failed to delete subscription");
        }
        running.connector.disconnect().await;

        let stats = running.assembler.stats();
        info!(
            endpoint = %running.address,
            notifications = stats.notifications,
            emitted = stats.emitted,
            defects = stats.defects,
            "OPC UA adapter stopped"
        );
        Ok(())
    }

    async fn get_schema(&self) -> AdapterResult<GuessSchema> {
        let settings = self.settings()?;
        let address = settings.target.endpoint_url();

        let mut connector = SourceConnector::new(self.provider.create());
        let result = match connector.connect(&settings.target).await {
            Ok(()) => match Self::discover(&connector, &settings).await {
                Ok(points) => SchemaInference::new(&connector).infer(&points).await,
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };
        connector.disconnect().await;

        result.map_err(|e| {
            if e.is_configuration() {
                e.into_adapter_error(address)
            } else {
                AdapterError::schema(address, e)
            }
        })
    }

    fn is_running(&self) -> bool {
        self.running.is_some()
    }
}

/// Dropping a running adapter closes the assembler, so nothing is emitted
/// afterwards. The subscription and the session go away when the transport
/// is dropped with it. `stop` does the same in order and should be preferred.
impl Drop for OpcUaAdapter {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            running.assembler.close();
            warn!(endpoint = %running.address, "OPC UA adapter dropped while running");
        }
    }
}

impl std::fmt::Debug for OpcUaAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpcUaAdapter")
            .field("transport", &self.provider.name())
            .field("running", &self.running.is_some())
            .finish()
    }
}

// =============================================================================
// OpcUaAdapterFactory
// =============================================================================

/// Factory for [`OpcUaAdapter`]s sharing one transport provider.
#[derive(Clone)]
pub struct OpcUaAdapterFactory {
    provider: Arc<dyn TransportProvider>,
    subscription: SubscriptionSettings,
}

impl OpcUaAdapterFactory {
    /// Creates a factory with default subscription settings.
    pub fn new(provider: Arc<dyn TransportProvider>) -> Self {
        Self {
            provider,
            subscription: SubscriptionSettings::default(),
        }
    }

    /// Sets the subscription settings of created adapters.
    pub fn with_subscription_settings(mut self, subscription: SubscriptionSettings) -> Self {
        self.subscription = subscription;
        self
    }

    /// Resolves `AVAILABLE_NODES` options, keeping the failure reason.
    pub async fn resolve_node_options(&self, description: &AdapterDescription) -> OptionsOutcome {
        OptionResolver::new(self.provider.as_ref()).resolve(description).await
    }
}

#[async_trait]
impl AdapterFactory for OpcUaAdapterFactory {
    fn id(&self) -> &str {
        ADAPTER_ID
    }

    fn declare_model(&self) -> AdapterDescription {
        declare_model()
    }

    fn create(&self, description: AdapterDescription) -> Box<dyn Adapter> {
        Box::new(OpcUaAdapter::new(
            description,
            Arc::clone(&self.provider),
            self.subscription.clone(),
        ))
    }

    async fn resolve_options(&self, property: &str, description: &AdapterDescription) -> Vec<SelectOption> {
        if property != keys::AVAILABLE_NODES {
            debug!(property = %property, "Property has no dynamic options");
            return Vec::new();
        }
        self.resolve_node_options(description).await.into_options()
    }
}

impl std::fmt::Debug for OpcUaAdapterFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpcUaAdapterFactory")
            .field("transport", &self.provider.name())
            .field("subscription", &self.subscription)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{OpcUaValue, SimulatedProvider, SimulatedServer};
    use crate::types::NodeId;
    use connect_core::pipeline::CollectingSink;
    use connect_core::StaticPropertyExtractor;

    fn filled() -> AdapterDescription {
        let mut desc = declare_model();
        desc.select_alternative(keys::OPC_HOST_OR_URL, keys::OPC_URL);
        desc.set_value(keys::OPC_SERVER_URL, "opc.tcp://sim:4840");
        desc.select_alternative(keys::ACCESS_MODE, keys::UNAUTHENTICATED);
        desc.set_value(keys::NAMESPACE_INDEX, "2");
        desc.set_value(keys::NODE_ID, "Plant");
        desc
    }

    fn quiet_server() -> SimulatedServer {
        let server = SimulatedServer::demo();
        server.set_initial_notifications(false);
        server
    }

    #[test]
    fn test_declare_model() {
        let model = declare_model();
        assert_eq!(model.app_id, ADAPTER_ID);
        let names: Vec<_> = model.static_properties.iter().map(|p| p.internal_name()).collect();
        assert_eq!(
            names,
            vec![
                keys::ACCESS_MODE,
                keys::OPC_HOST_OR_URL,
                keys::NAMESPACE_INDEX,
                keys::NODE_ID,
                keys::AVAILABLE_NODES
            ]
        );
        let extractor = StaticPropertyExtractor::new(&model.static_properties);
        assert!(extractor.selected_alternative(keys::ACCESS_MODE).is_none());
    }

    #[tokio::test]
    async fn test_start_requires_configuration() {
        let provider = Arc::new(SimulatedProvider::new(quiet_server()));
        let mut adapter = OpcUaAdapter::new(declare_model(), provider, SubscriptionSettings::default());
        let err = adapter.start(Arc::new(CollectingSink::new())).await.unwrap_err();
        assert!(err.is_configuration());
        assert!(!adapter.is_running());
    }

    #[tokio::test]
    async fn test_start_emits_and_stop_is_idempotent() {
        let server = quiet_server();
        let provider = Arc::new(SimulatedProvider::new(server.clone()));
        let mut desc = filled();
        desc.set_options(
            keys::AVAILABLE_NODES,
            vec![
                SelectOption::new("Speed", "Plant.Line1.Speed").selected(),
                SelectOption::new("Pressure", "Plant.Pressure").selected(),
            ],
        );
        let mut adapter = OpcUaAdapter::new(desc, provider, SubscriptionSettings::default());
        let sink = Arc::new(CollectingSink::new());
        adapter.start(sink.clone()).await.unwrap();
        assert_eq!(adapter.subscribed_points(), Some(2));
        assert!(adapter.start(sink.clone()).await.is_err());

        let speed = NodeId::string(2, "Plant.Line1.Speed");
        server.write_value(&speed, OpcUaValue::Int32(10)).unwrap();
        server
            .write_value(&NodeId::string(2, "Plant.Pressure"), OpcUaValue::Float(2.0))
            .unwrap();
        assert_eq!(sink.len(), 1);

        adapter.stop().await.unwrap();
        adapter.stop().await.unwrap();
        server.write_value(&speed, OpcUaValue::Int32(11)).unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(server.session_count(), 0);
        assert_eq!(server.subscription_count(), 0);
    }

    #[tokio::test]
    async fn test_drop_while_running_releases_session() {
        let server = quiet_server();
        let provider = Arc::new(SimulatedProvider::new(server.clone()));
        let mut adapter = OpcUaAdapter::new(filled(), provider, SubscriptionSettings::default());
        let sink = Arc::new(CollectingSink::new());
        adapter.start(sink.clone()).await.unwrap();
        assert_eq!(server.session_count(), 1);

        drop(adapter);
        assert_eq!(server.session_count(), 0);
        assert_eq!(server.subscription_count(), 0);
        server
            .write_value(&NodeId::string(2, "Plant.Pressure"), OpcUaValue::Float(2.0))
            .unwrap();
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_start_unreachable_carries_address() {
        let server = quiet_server();
        server.set_reachable(false);
        let provider = Arc::new(SimulatedProvider::new(server));
        let mut adapter = OpcUaAdapter::new(filled(), provider, SubscriptionSettings::default());
        let err = adapter.start(Arc::new(CollectingSink::new())).await.unwrap_err();
        assert_eq!(err.address(), Some("opc.tcp://sim:4840"));
    }

    #[tokio::test]
    async fn test_get_schema_closes_session() {
        let server = quiet_server();
        let provider = Arc::new(SimulatedProvider::new(server.clone()));
        let adapter = OpcUaAdapter::new(filled(), provider, SubscriptionSettings::default());
        let guess = adapter.get_schema().await.unwrap();
        assert_eq!(guess.event_schema.len(), 5);
        assert_eq!(server.session_count(), 0);
    }

    #[tokio::test]
    async fn test_factory_resolve_options() {
        let factory = OpcUaAdapterFactory::new(Arc::new(SimulatedProvider::new(quiet_server())));
        assert!(factory.resolve_options(keys::AVAILABLE_NODES, &declare_model()).await.is_empty());
        assert!(factory.resolve_options(keys::NODE_ID, &filled()).await.is_empty());
        assert_eq!(factory.resolve_options(keys::AVAILABLE_NODES, &filled()).await.len(), 1);
    }
}

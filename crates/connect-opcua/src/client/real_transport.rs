// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA transport backed by the `opcua` crate.
//!
//! Sessions use security policy `None`. The `opcua` client is synchronous;
//! its calls block the caller, and subscription callbacks run on the
//! session's own worker thread.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, trace};

use opcua::client::prelude::*;
use opcua::sync::RwLock as OpcUaRwLock;

use crate::client::transport::{
    BrowseResult, DataChange, NotificationHandler, OpcUaTransport, OpcUaValue, TransportProvider,
    TransportState,
};
use crate::config::{ConnectionTarget, Credentials};
use crate::error::{
    ConnectionError, DiscoveryError, OpcUaError, OpcUaResult, SamplingError, SubscriptionError,
};
use crate::types::{NodeClass, NodeId, NodeIdentifier, OpcUaDataType, SubscriptionSettings};

const APPLICATION_NAME: &str = "ua-connect";
const APPLICATION_URI: &str = "urn:ua-connect:client";
const ENGINEERING_UNITS: &str = "EngineeringUnits";

// =============================================================================
// RealOpcUaTransport
// =============================================================================

/// Network transport using the `opcua` client stack.
pub struct RealOpcUaTransport {
    state: TransportState,
    endpoint: Option<String>,
    session: Option<Arc<OpcUaRwLock<Session>>>,
    session_loop: Option<tokio::sync::oneshot::Sender<SessionCommand>>,
}

impl RealOpcUaTransport {
    /// Creates a disconnected transport.
    pub fn new() -> Self {
        Self {
            state: TransportState::Disconnected,
            endpoint: None,
            session: None,
            session_loop: None,
        }
    }

    fn session(&self) -> OpcUaResult<&Arc<OpcUaRwLock<Session>>> {
        self.session.as_ref().ok_or_else(OpcUaError::not_connected)
    }

    fn identity_token(credentials: &Credentials) -> (IdentityToken, UserTokenPolicy) {
        match credentials {
            Credentials::Anonymous => (IdentityToken::Anonymous, UserTokenPolicy::anonymous()),
            Credentials::UserName { username, password } => (
                IdentityToken::UserName(username.clone(), password.clone()),
                UserTokenPolicy {
                    token_type: UserTokenType::UserName,
                    ..UserTokenPolicy::anonymous()
                },
            ),
        }
    }

    fn to_opcua_node_id(node_id: &NodeId) -> opcua::types::NodeId {
        let ns = node_id.namespace_index;
        match &node_id.identifier {
            NodeIdentifier::Numeric(v) => opcua::types::NodeId::new(ns, *v),
            NodeIdentifier::String(v) => opcua::types::NodeId::new(ns, v.clone()),
            NodeIdentifier::Guid(v) => opcua::types::NodeId::new(ns, opcua::types::Guid::from(*v)),
            NodeIdentifier::Opaque(v) => opcua::types::NodeId::new(ns, opcua::types::ByteString::from(v.as_slice())),
        }
    }

    fn from_opcua_node_id(node_id: &opcua::types::NodeId) -> NodeId {
        let ns = node_id.namespace;
        match &node_id.identifier {
            opcua::types::Identifier::Numeric(v) => NodeId::numeric(ns, *v),
            opcua::types::Identifier::String(v) => NodeId::string(ns, v.as_ref()),
            opcua::types::Identifier::Guid(v) => NodeId::guid(ns, uuid::Uuid::from_bytes(*v.as_bytes())),
            opcua::types::Identifier::ByteString(v) => NodeId::opaque(ns, v.value.clone().unwrap_or_default()),
        }
    }

    fn from_opcua_variant(variant: &Variant) -> OpcUaValue {
        match variant {
            Variant::Empty => OpcUaValue::Null,
            Variant::Boolean(v) => OpcUaValue::Boolean(*v),
            Variant::SByte(v) => OpcUaValue::SByte(*v),
            Variant::Byte(v) => OpcUaValue::Byte(*v),
            Variant::Int16(v) => OpcUaValue::Int16(*v),
            Variant::UInt16(v) => OpcUaValue::UInt16(*v),
            Variant::Int32(v) => OpcUaValue::Int32(*v),
            Variant::UInt32(v) => OpcUaValue::UInt32(*v),
            Variant::Int64(v) => OpcUaValue::Int64(*v),
            Variant::UInt64(v) => OpcUaValue::UInt64(*v),
            Variant::Float(v) => OpcUaValue::Float(*v),
            Variant::Double(v) => OpcUaValue::Double(*v),
            Variant::String(v) => OpcUaValue::String(v.as_ref().to_string()),
            Variant::DateTime(v) => OpcUaValue::DateTime(v.as_chrono()),
            Variant::Guid(v) => OpcUaValue::Guid(uuid::Uuid::from_bytes(*v.as_bytes())),
            Variant::ByteString(v) => OpcUaValue::ByteString(v.value.clone().unwrap_or_default()),
            Variant::Array(arr) => {
                OpcUaValue::Array(arr.values.iter().map(Self::from_opcua_variant).collect())
            }
            other => OpcUaValue::String(format!("{:?}", other)),
        }
    }

    fn read_attribute(&self, node_id: &NodeId, attribute: AttributeId) -> OpcUaResult<DataValue> {
        let session = self.session()?;
        let request = ReadValueId {
            node_id: Self::to_opcua_node_id(node_id),
            attribute_id: attribute as u32,
            index_range: UAString::null(),
            data_encoding: QualifiedName::null(),
        };
        let mut results = session
            .read()
            .read(&[request], TimestampsToReturn::Source, 0.0)
            .map_err(|status| SamplingError::read_failed(node_id.to_string(), format!("{}", status)))?;
        if results.is_empty() {
            return Err(SamplingError::read_failed(node_id.to_string(), "Empty read response").into());
        }
        let data_value = results.swap_remove(0);
        if let Some(status) = data_value.status {
            if status.is_bad() {
                return Err(SamplingError::bad_status(node_id.to_string(), format!("{}", status)).into());
            }
        }
        Ok(data_value)
    }

    fn browse_references(
        &self,
        node_id: &NodeId,
        reference_type: ReferenceTypeId,
    ) -> OpcUaResult<Vec<ReferenceDescription>> {
        let session = self.session()?;
        let description = BrowseDescription {
            node_id: Self::to_opcua_node_id(node_id),
            browse_direction: BrowseDirection::Forward,
            reference_type_id: reference_type.into(),
            include_subtypes: true,
            node_class_mask: 0,
            result_mask: BrowseDescriptionResultMask::all().bits(),
        };
        let results = session
            .read()
            .browse(&[description])
            .map_err(|status| DiscoveryError::browse_failed(node_id.to_string(), format!("{}", status)))?
            .ok_or_else(|| DiscoveryError::browse_failed(node_id.to_string(), "No browse results returned"))?;

        let Some(result) = results.into_iter().next() else {
            return Ok(Vec::new());
        };
        if result.status_code.is_bad() {
            return Err(DiscoveryError::browse_failed(node_id.to_string(), format!("{}", result.status_code)).into());
        }
        Ok(result.references.unwrap_or_default())
    }
}

impl RealOpcUaTransport {
    /// Closes the session and stops its worker thread.
    fn close_session(&mut self) {
        if let Some(session) = self.session.take() {
            session.read().disconnect();
            info!(endpoint = ?self.endpoint, "Disconnected from OPC UA server");
        }
        if let Some(tx) = self.session_loop.take() {
            let _ = tx.send(SessionCommand::Stop);
        }
        self.state = TransportState::Disconnected;
    }
}

impl Drop for RealOpcUaTransport {
    fn drop(&mut self) {
        self.close_session();
    }
}

impl Default for RealOpcUaTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OpcUaTransport for RealOpcUaTransport {
    async fn connect(&mut self, target: &ConnectionTarget) -> OpcUaResult<()> {
        if self.state.is_connected() {
            return Ok(());
        }
        let endpoint = target.endpoint_url();
        self.state = TransportState::Connecting;
        info!(endpoint = %endpoint, "Connecting to OPC UA server");

        let mut client = ClientBuilder::new()
            .application_name(APPLICATION_NAME)
            .application_uri(APPLICATION_URI)
            .create_sample_keypair(true)
            .trust_server_certs(true)
            .session_retry_limit(0)
            .client()
            .ok_or_else(|| {
                self.state = TransportState::Failed;
                ConnectionError::invalid_endpoint(&endpoint, "Failed to build OPC UA client")
            })?;

        let (identity, policy) = Self::identity_token(&target.credentials);
        let description: EndpointDescription = (
            endpoint.as_str(),
            SecurityPolicy::None.to_str(),
            MessageSecurityMode::None,
            policy,
        )
            .into();

        let session = client.connect_to_endpoint(description, identity).map_err(|status| {
            self.state = TransportState::Failed;
            if status == StatusCode::BadUserAccessDenied || status == StatusCode::BadIdentityTokenRejected {
                ConnectionError::authentication_failed(&endpoint, format!("{}", status))
            } else {
                ConnectionError::refused(&endpoint, format!("{}", status))
            }
        })?;

        self.session_loop = Some(Session::run_async(Arc::clone(&session)));
        self.session = Some(session);
        self.endpoint = Some(endpoint.clone());
        self.state = TransportState::Connected;
        info!(endpoint = %endpoint, "Connected to OPC UA server");
        Ok(())
    }

    async fn disconnect(&mut self) -> OpcUaResult<()> {
        self.close_session();
        Ok(())
    }

    fn state(&self) -> TransportState {
        self.state
    }

    async fn browse(&self, node_id: &NodeId) -> OpcUaResult<Vec<BrowseResult>> {
        trace!(node_id = %node_id, "Browsing node");
        let references = self.browse_references(node_id, ReferenceTypeId::HierarchicalReferences)?;
        Ok(references
            .iter()
            .filter_map(|r| {
                let node_class = NodeClass::from_value(r.node_class as u32)?;
                Some(BrowseResult {
                    node_id: Self::from_opcua_node_id(&r.node_id.node_id),
                    browse_name: r.browse_name.name.as_ref().to_string(),
                    display_name: r.display_name.text.as_ref().to_string(),
                    node_class,
                })
            })
            .collect())
    }

    async fn read_value(&self, node_id: &NodeId) -> OpcUaResult<OpcUaValue> {
        let data_value = self.read_attribute(node_id, AttributeId::Value)?;
        Ok(data_value
            .value
            .as_ref()
            .map(Self::from_opcua_variant)
            .unwrap_or_default())
    }

    async fn read_node_class(&self, node_id: &NodeId) -> OpcUaResult<NodeClass> {
        let data_value = self
            .read_attribute(node_id, AttributeId::NodeClass)
            .map_err(|e| DiscoveryError::attribute_read_failed(node_id.to_string(), "NodeClass", e.to_string()))?;
        match data_value.value {
            Some(Variant::Int32(v)) => NodeClass::from_value(v as u32),
            _ => None,
        }
        .ok_or_else(|| DiscoveryError::attribute_read_failed(node_id.to_string(), "NodeClass", "Unexpected value").into())
    }

    async fn read_data_type(&self, node_id: &NodeId) -> OpcUaResult<OpcUaDataType> {
        let data_value = self
            .read_attribute(node_id, AttributeId::DataType)
            .map_err(|e| DiscoveryError::attribute_read_failed(node_id.to_string(), "DataType", e.to_string()))?;
        match data_value.value {
            Some(Variant::NodeId(type_node)) => Ok(OpcUaDataType::from_type_node(&Self::from_opcua_node_id(&type_node))),
            _ => Ok(OpcUaDataType::Variant),
        }
    }

    async fn read_engineering_unit(&self, node_id: &NodeId) -> OpcUaResult<i32> {
        let properties = self.browse_references(node_id, ReferenceTypeId::HasProperty)?;
        let Some(eu) = properties
            .iter()
            .find(|r| r.browse_name.name.as_ref() == ENGINEERING_UNITS)
        else {
            return Ok(0);
        };

        let eu_node = Self::from_opcua_node_id(&eu.node_id.node_id);
        let data_value = self
            .read_attribute(&eu_node, AttributeId::Value)
            .map_err(|e| DiscoveryError::attribute_read_failed(node_id.to_string(), ENGINEERING_UNITS, e.to_string()))?;
        match data_value.value {
            Some(Variant::ExtensionObject(obj)) => obj
                .decode_inner::<EUInformation>(&DecodingOptions::default())
                .map(|info| info.unit_id)
                .map_err(|status| {
                    DiscoveryError::attribute_read_failed(node_id.to_string(), ENGINEERING_UNITS, format!("{}", status))
                        .into()
                }),
            _ => Ok(0),
        }
    }

    async fn create_subscription(
        &self,
        nodes: &[NodeId],
        settings: &SubscriptionSettings,
        handler: Arc<dyn NotificationHandler>,
    ) -> OpcUaResult<u32> {
        let session = self.session()?;
        let callback = DataChangeCallback::new(move |items| {
            for item in items.iter() {
                let last = item.last_value();
                let change = DataChange {
                    node_id: Self::from_opcua_node_id(&item.item_to_monitor().node_id),
                    value: last.value.as_ref().map(Self::from_opcua_variant).unwrap_or_default(),
                    source_timestamp: last.source_timestamp.as_ref().map(|t| t.as_chrono()),
                };
                if let Err(e) = handler.on_data_change(change) {
                    e.log("data change notification");
                }
            }
        });

        let session = session.read();
        let subscription_id = session
            .create_subscription(
                settings.publishing_interval_ms as f64,
                settings.lifetime_count,
                settings.keepalive_count,
                settings.max_notifications_per_publish,
                settings.priority,
                true,
                callback,
            )
            .map_err(|status| SubscriptionError::creation_failed(format!("{}", status)))?;

        let requests: Vec<MonitoredItemCreateRequest> = nodes
            .iter()
            .map(|n| {
                let mut request: MonitoredItemCreateRequest = Self::to_opcua_node_id(n).into();
                request.requested_parameters.sampling_interval = settings.sampling_interval_ms as f64;
                request
            })
            .collect();

        let results = session
            .create_monitored_items(subscription_id, TimestampsToReturn::Both, &requests)
            .map_err(|status| SubscriptionError::monitoring_failed(nodes.len(), format!("{}", status)))?;

        let failed: Vec<String> = results
            .iter()
            .zip(nodes)
            .filter(|(r, _)| r.status_code.is_bad())
            .map(|(r, n)| format!("{} ({})", n, r.status_code))
            .collect();
        if !failed.is_empty() {
            let _ = session.delete_subscription(subscription_id);
            return Err(SubscriptionError::monitoring_failed(failed.len(), failed.join(", ")).into());
        }

        debug!(subscription_id, items = nodes.len(), "Created OPC UA subscription");
        Ok(subscription_id)
    }

    async fn delete_subscription(&self, subscription_id: u32) -> OpcUaResult<()> {
        let session = self.session()?;
        session
            .read()
            .delete_subscription(subscription_id)
            .map_err(|_| SubscriptionError::not_found(subscription_id))?;
        debug!(subscription_id, "Deleted OPC UA subscription");
        Ok(())
    }
}

/// Creates [`RealOpcUaTransport`]s.
#[derive(Debug, Default, Clone)]
pub struct RealTransportProvider;

impl TransportProvider for RealTransportProvider {
    fn name(&self) -> &str {
        "opcua"
    }

    fn create(&self) -> Box<dyn OpcUaTransport> {
        Box::new(RealOpcUaTransport::new())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_conversion() {
        for node in [NodeId::numeric(2, 1001), NodeId::string(3, "Plant.Line1.Speed")] {
            let back = RealOpcUaTransport::from_opcua_node_id(&RealOpcUaTransport::to_opcua_node_id(&node));
            assert_eq!(node, back);
        }
    }

    #[test]
    fn test_variant_conversion() {
        assert_eq!(
            RealOpcUaTransport::from_opcua_variant(&Variant::Double(2.5)),
            OpcUaValue::Double(2.5)
        );
        assert_eq!(RealOpcUaTransport::from_opcua_variant(&Variant::Empty), OpcUaValue::Null);
    }

    #[test]
    fn test_transport_starts_disconnected() {
        let transport = RealOpcUaTransport::new();
        assert_eq!(transport.state(), TransportState::Disconnected);
        assert!(RealOpcUaTransport::new().session().is_err());
    }
}

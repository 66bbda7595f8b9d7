// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-process OPC UA server simulation.
//!
//! [`SimulatedServer`] holds an address space, a user table and the active
//! subscriptions. [`SimulatedTransport`] opens sessions against it the same
//! way a network transport would, so adapter code cannot tell the difference.
//!
//! Value changes are pushed with [`SimulatedServer::write_value`], which
//! delivers the notification synchronously on the calling thread. Tests use
//! this to drive exact notification orders; concurrent callers model the
//! worker threads of a real stack.
//!
//! # Examples
//!
//! ```
//! use connect_opcua::client::{OpcUaValue, SimulatedServer};
//! use connect_opcua::types::NodeId;
//!
//! let server = SimulatedServer::new();
//! let plant = NodeId::string(2, "Plant");
//! server.add_object(&NodeId::objects_folder(), plant.clone(), "Plant");
//! server.add_variable(&plant, NodeId::string(2, "Plant.Speed"), "Speed", OpcUaValue::Int32(0), 0);
//!
//! assert_eq!(server.node_count(), 3);
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use super::transport::{
    BrowseResult, DataChange, NotificationHandler, OpcUaTransport, OpcUaValue, TransportProvider,
    TransportState,
};
use crate::config::{ConnectionTarget, Credentials};
use crate::error::{
    ConnectionError, DiscoveryError, OpcUaError, OpcUaResult, SamplingError, SubscriptionError,
};
use crate::types::{NodeClass, NodeId, OpcUaDataType, SubscriptionSettings};
use crate::units::encode_unit_code;

/// Namespace index used by [`SimulatedServer::demo`].
pub const DEMO_NAMESPACE: u16 = 2;

/// Root identifier of the demo namespace.
pub const DEMO_ROOT: &str = "Plant";

// =============================================================================
// SimulatedServer
// =============================================================================

#[derive(Debug, Clone)]
struct SimNode {
    browse_name: String,
    node_class: NodeClass,
    children: Vec<NodeId>,
    value: OpcUaValue,
    data_type: OpcUaDataType,
    unit_id: i32,
}

impl SimNode {
    fn object(name: &str) -> Self {
        Self {
            browse_name: name.to_string(),
            node_class: NodeClass::Object,
            children: Vec::new(),
            value: OpcUaValue::Null,
            data_type: OpcUaDataType::Variant,
            unit_id: 0,
        }
    }
}

struct SimSubscription {
    nodes: HashSet<NodeId>,
    handler: Arc<dyn NotificationHandler>,
}

struct ServerState {
    nodes: RwLock<HashMap<NodeId, SimNode>>,
    users: RwLock<HashMap<String, String>>,
    allow_anonymous: AtomicBool,
    reachable: AtomicBool,
    initial_notifications: AtomicBool,
    subscriptions: Mutex<HashMap<u32, SimSubscription>>,
    next_subscription_id: AtomicU32,
    sessions: AtomicUsize,
}

/// An in-memory OPC UA server.
///
/// Cheap to clone; clones share the same address space.
#[derive(Clone)]
pub struct SimulatedServer {
    state: Arc<ServerState>,
}

impl SimulatedServer {
    /// Creates a server whose address space only holds the Objects folder.
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(NodeId::objects_folder(), SimNode::object("Objects"));
        Self {
            state: Arc::new(ServerState {
                nodes: RwLock::new(nodes),
                users: RwLock::new(HashMap::new()),
                allow_anonymous: AtomicBool::new(true),
                reachable: AtomicBool::new(true),
                initial_notifications: AtomicBool::new(false),
                subscriptions: Mutex::new(HashMap::new()),
                next_subscription_id: AtomicU32::new(1),
                sessions: AtomicUsize::new(0),
            }),
        }
    }

    /// Creates a server with a small plant namespace in namespace 2.
    ///
    /// ```text
    /// Plant
    /// ├── Plant.Line1
    /// │   ├── Plant.Line1.Temperature   Double   CEL
    /// │   ├── Plant.Line1.Speed         Int32    RPM
    /// │   ├── Plant.Line1.Running       Boolean
    /// │   └── Plant.Line1.Status        String
    /// └── Plant.Pressure                Float    BAR
    /// ```
    ///
    /// New subscriptions receive the current values immediately, as real
    /// servers do.
    pub fn demo() -> Self {
        let server = Self::new();
        let ns = DEMO_NAMESPACE;
        let plant = NodeId::string(ns, DEMO_ROOT);
        let line = NodeId::string(ns, "Plant.Line1");

        server.add_object(&NodeId::objects_folder(), plant.clone(), "Plant");
        server.add_object(&plant, line.clone(), "Line1");
        server.add_variable(
            &line,
            NodeId::string(ns, "Plant.Line1.Temperature"),
            "Temperature",
            OpcUaValue::Double(21.5),
            encode_unit_code("CEL"),
        );
        server.add_variable(
            &line,
            NodeId::string(ns, "Plant.Line1.Speed"),
            "Speed",
            OpcUaValue::Int32(1200),
            encode_unit_code("RPM"),
        );
        server.add_variable(
            &line,
            NodeId::string(ns, "Plant.Line1.Running"),
            "Running",
            OpcUaValue::Boolean(true),
            0,
        );
        server.add_variable(
            &line,
            NodeId::string(ns, "Plant.Line1.Status"),
            "Status",
            OpcUaValue::String("OK".to_string()),
            0,
        );
        server.add_variable(
            &plant,
            NodeId::string(ns, "Plant.Pressure"),
            "Pressure",
            OpcUaValue::Float(1.8),
            encode_unit_code("BAR"),
        );
        server.set_initial_notifications(true);
        server
    }

    // =========================================================================
    // Address Space
    // =========================================================================

    /// Adds an object node below `parent`.
    pub fn add_object(&self, parent: &NodeId, node_id: NodeId, name: &str) -> &Self {
        self.insert(parent, node_id, SimNode::object(name))
    }

    /// Adds a variable node below `parent`.
    ///
    /// The data type follows the initial value; `unit_id` 0 means no unit.
    pub fn add_variable(
        &self,
        parent: &NodeId,
        node_id: NodeId,
        name: &str,
        value: OpcUaValue,
        unit_id: i32,
    ) -> &Self {
        let node = SimNode {
            browse_name: name.to_string(),
            node_class: NodeClass::Variable,
            children: Vec::new(),
            data_type: value.data_type(),
            value,
            unit_id,
        };
        self.insert(parent, node_id, node)
    }

    fn insert(&self, parent: &NodeId, node_id: NodeId, node: SimNode) -> &Self {
        let mut nodes = self.state.nodes.write();
        match nodes.get_mut(parent) {
            Some(p) => p.children.push(node_id.clone()),
            None => tracing::warn!(parent = %parent, node = %node_id, "Parent node missing, node is unreachable by browse"),
        }
        nodes.insert(node_id, node);
        self
    }

    /// Returns the number of nodes, including the Objects folder.
    pub fn node_count(&self) -> usize {
        self.state.nodes.read().len()
    }

    /// Returns all variable nodes with their current values.
    pub fn variables(&self) -> Vec<(NodeId, OpcUaValue)> {
        let nodes = self.state.nodes.read();
        let mut vars: Vec<_> = nodes
            .iter()
            .filter(|(_, n)| n.node_class.has_value())
            .map(|(id, n)| (id.clone(), n.value.clone()))
            .collect();
        vars.sort_by_key(|(id, _)| id.to_opc_string());
        vars
    }

    /// Returns the current value of a node.
    pub fn value(&self, node_id: &NodeId) -> Option<OpcUaValue> {
        self.state.nodes.read().get(node_id).map(|n| n.value.clone())
    }

    // =========================================================================
    // Server Behaviour
    // =========================================================================

    /// Registers a user account.
    pub fn add_user(&self, username: impl Into<String>, password: impl Into<String>) -> &Self {
        self.state.users.write().insert(username.into(), password.into());
        self
    }

    /// Allows or rejects anonymous sessions.
    pub fn set_allow_anonymous(&self, allow: bool) -> &Self {
        self.state.allow_anonymous.store(allow, Ordering::SeqCst);
        self
    }

    /// Makes the server reachable or unreachable for new sessions.
    pub fn set_reachable(&self, reachable: bool) -> &Self {
        self.state.reachable.store(reachable, Ordering::SeqCst);
        self
    }

    /// Sends current values to new subscriptions.
    pub fn set_initial_notifications(&self, enabled: bool) -> &Self {
        self.state.initial_notifications.store(enabled, Ordering::SeqCst);
        self
    }

    /// Returns the number of open sessions.
    pub fn session_count(&self) -> usize {
        self.state.sessions.load(Ordering::SeqCst)
    }

    /// Returns the number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.state.subscriptions.lock().len()
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    /// Writes a value and notifies every subscription monitoring the node.
    ///
    /// Returns the number of subscriptions notified. A handler error is
    /// returned after all handlers have been called.
    pub fn write_value(&self, node_id: &NodeId, value: OpcUaValue) -> OpcUaResult<usize> {
        {
            let mut nodes = self.state.nodes.write();
            let node = nodes
                .get_mut(node_id)
                .filter(|n| n.node_class.has_value())
                .ok_or_else(|| OpcUaError::node_not_found(node_id.to_string()))?;
            node.value = value.clone();
        }

        let handlers: Vec<_> = self
            .state
            .subscriptions
            .lock()
            .values()
            .filter(|s| s.nodes.contains(node_id))
            .map(|s| Arc::clone(&s.handler))
            .collect();

        deliver(&handlers, node_id, value)
    }

    /// Delivers a notification for `node_id` to every live subscription,
    /// whether or not the node is monitored by it.
    ///
    /// Models a server reporting a node the client never asked for.
    pub fn inject_notification(&self, node_id: NodeId, value: OpcUaValue) -> OpcUaResult<usize> {
        let handlers: Vec<_> = self
            .state
            .subscriptions
            .lock()
            .values()
            .map(|s| Arc::clone(&s.handler))
            .collect();
        deliver(&handlers, &node_id, value)
    }

    fn check_credentials(&self, endpoint: &str, credentials: &Credentials) -> OpcUaResult<()> {
        match credentials {
            Credentials::Anonymous => {
                if self.state.allow_anonymous.load(Ordering::SeqCst) {
                    Ok(())
                } else {
                    Err(ConnectionError::authentication_failed(endpoint, "Anonymous access is disabled").into())
                }
            }
            Credentials::UserName { username, password } => {
                match self.state.users.read().get(username) {
                    Some(expected) if expected == password => Ok(()),
                    _ => Err(ConnectionError::authentication_failed(endpoint, "BadUserAccessDenied").into()),
                }
            }
        }
    }

    fn node<T>(&self, node_id: &NodeId, f: impl FnOnce(&SimNode) -> T) -> Option<T> {
        self.state.nodes.read().get(node_id).map(f)
    }
}

impl Default for SimulatedServer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SimulatedServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedServer")
            .field("nodes", &self.node_count())
            .field("sessions", &self.session_count())
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

fn deliver(
    handlers: &[Arc<dyn NotificationHandler>],
    node_id: &NodeId,
    value: OpcUaValue,
) -> OpcUaResult<usize> {
    let mut first_error = None;
    for handler in handlers {
        let change = DataChange {
            node_id: node_id.clone(),
            value: value.clone(),
            source_timestamp: Some(chrono::Utc::now()),
        };
        if let Err(e) = handler.on_data_change(change) {
            first_error.get_or_insert(e);
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(handlers.len()),
    }
}

// =============================================================================
// SimulatedTransport
// =============================================================================

/// A session against a [`SimulatedServer`].
pub struct SimulatedTransport {
    server: SimulatedServer,
    state: TransportState,
    endpoint: Option<String>,
    owned_subscriptions: Mutex<Vec<u32>>,
}

impl SimulatedTransport {
    /// Creates a disconnected transport.
    pub fn new(server: SimulatedServer) -> Self {
        Self {
            server,
            state: TransportState::Disconnected,
            endpoint: None,
            owned_subscriptions: Mutex::new(Vec::new()),
        }
    }

    fn ensure_connected(&self) -> OpcUaResult<()> {
        if self.state.is_connected() {
            Ok(())
        } else {
            Err(OpcUaError::not_connected())
        }
    }

    /// Releases the session and every subscription it created.
    fn close_session(&mut self) {
        if !self.state.is_connected() {
            self.state = TransportState::Disconnected;
            return;
        }
        let owned: Vec<u32> = std::mem::take(&mut *self.owned_subscriptions.lock());
        {
            let mut subs = self.server.state.subscriptions.lock();
            for id in owned {
                subs.remove(&id);
            }
        }
        self.server.state.sessions.fetch_sub(1, Ordering::SeqCst);
        self.state = TransportState::Disconnected;
        tracing::trace!(endpoint = ?self.endpoint, "Simulated session closed");
    }
}

impl Drop for SimulatedTransport {
    fn drop(&mut self) {
        self.close_session();
    }
}

#[async_trait]
impl OpcUaTransport for SimulatedTransport {
    async fn connect(&mut self, target: &ConnectionTarget) -> OpcUaResult<()> {
        if self.state.is_connected() {
            return Ok(());
        }
        self.state = TransportState::Connecting;
        let endpoint = target.endpoint_url();

        let result = if !endpoint.starts_with("opc.tcp://") {
            Err(ConnectionError::invalid_endpoint(&endpoint, "Expected scheme opc.tcp").into())
        } else if !self.server.state.reachable.load(Ordering::SeqCst) {
            Err(ConnectionError::refused(&endpoint, "BadCommunicationError").into())
        } else {
            self.server.check_credentials(&endpoint, &target.credentials)
        };

        match result {
            Ok(()) => {
                self.server.state.sessions.fetch_add(1, Ordering::SeqCst);
                self.state = TransportState::Connected;
                self.endpoint = Some(endpoint);
                Ok(())
            }
            Err(e) => {
                self.state = TransportState::Failed;
                Err(e)
            }
        }
    }

    async fn disconnect(&mut self) -> OpcUaResult<()> {
        self.close_session();
        Ok(())
    }

    fn state(&self) -> TransportState {
        self.state
    }

    async fn browse(&self, node_id: &NodeId) -> OpcUaResult<Vec<BrowseResult>> {
        self.ensure_connected()?;
        let nodes = self.server.state.nodes.read();
        let node = nodes
            .get(node_id)
            .ok_or_else(|| DiscoveryError::node_not_found(node_id.to_string()))?;
        Ok(node
            .children
            .iter()
            .filter_map(|child| {
                nodes
                    .get(child)
                    .map(|c| BrowseResult::new(child.clone(), c.browse_name.clone(), c.node_class))
            })
            .collect())
    }

    async fn read_value(&self, node_id: &NodeId) -> OpcUaResult<OpcUaValue> {
        self.ensure_connected()?;
        self.server
            .node(node_id, |n| n.value.clone())
            .ok_or_else(|| SamplingError::read_failed(node_id.to_string(), "BadNodeIdUnknown").into())
    }

    async fn read_node_class(&self, node_id: &NodeId) -> OpcUaResult<NodeClass> {
        self.ensure_connected()?;
        self.server
            .node(node_id, |n| n.node_class)
            .ok_or_else(|| DiscoveryError::node_not_found(node_id.to_string()).into())
    }

    async fn read_data_type(&self, node_id: &NodeId) -> OpcUaResult<OpcUaDataType> {
        self.ensure_connected()?;
        self.server.node(node_id, |n| n.data_type).ok_or_else(|| {
            DiscoveryError::attribute_read_failed(node_id.to_string(), "DataType", "BadNodeIdUnknown").into()
        })
    }

    async fn read_engineering_unit(&self, node_id: &NodeId) -> OpcUaResult<i32> {
        self.ensure_connected()?;
        self.server.node(node_id, |n| n.unit_id).ok_or_else(|| {
            DiscoveryError::attribute_read_failed(node_id.to_string(), "EngineeringUnits", "BadNodeIdUnknown")
                .into()
        })
    }

    async fn create_subscription(
        &self,
        nodes: &[NodeId],
        settings: &SubscriptionSettings,
        handler: Arc<dyn NotificationHandler>,
    ) -> OpcUaResult<u32> {
        self.ensure_connected()?;
        let missing: Vec<String> = {
            let known = self.server.state.nodes.read();
            nodes
                .iter()
                .filter(|n| !known.get(*n).is_some_and(|k| k.node_class.has_value()))
                .map(|n| n.to_string())
                .collect()
        };
        if !missing.is_empty() {
            return Err(SubscriptionError::monitoring_failed(
                missing.len(),
                format!("BadNodeIdUnknown: {}", missing.join(", ")),
            )
            .into());
        }

        let id = self.server.state.next_subscription_id.fetch_add(1, Ordering::SeqCst);
        self.server.state.subscriptions.lock().insert(
            id,
            SimSubscription {
                nodes: nodes.iter().cloned().collect(),
                handler: Arc::clone(&handler),
            },
        );
        self.owned_subscriptions.lock().push(id);
        tracing::debug!(
            subscription_id = id,
            items = nodes.len(),
            publishing_interval_ms = settings.publishing_interval_ms,
            "Simulated subscription created"
        );

        if self.server.state.initial_notifications.load(Ordering::SeqCst) {
            for node_id in nodes {
                if let Some(value) = self.server.value(node_id) {
                    if let Err(e) = deliver(&[Arc::clone(&handler)], node_id, value) {
                        e.log("initial notification");
                    }
                }
            }
        }
        Ok(id)
    }

    async fn delete_subscription(&self, subscription_id: u32) -> OpcUaResult<()> {
        self.ensure_connected()?;
        self.owned_subscriptions.lock().retain(|id| *id != subscription_id);
        match self.server.state.subscriptions.lock().remove(&subscription_id) {
            Some(_) => Ok(()),
            None => Err(SubscriptionError::not_found(subscription_id).into()),
        }
    }
}

impl std::fmt::Debug for SimulatedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedTransport")
            .field("state", &self.state)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

// =============================================================================
// SimulatedProvider
// =============================================================================

/// Creates [`SimulatedTransport`]s for one shared server.
#[derive(Debug, Clone)]
pub struct SimulatedProvider {
    server: SimulatedServer,
}

impl SimulatedProvider {
    /// Creates a provider for `server`.
    pub fn new(server: SimulatedServer) -> Self {
        Self { server }
    }

    /// Returns the server.
    pub fn server(&self) -> &SimulatedServer {
        &self.server
    }
}

impl TransportProvider for SimulatedProvider {
    fn name(&self) -> &str {
        "simulated"
    }

    fn create(&self) -> Box<dyn OpcUaTransport> {
        Box::new(SimulatedTransport::new(self.server.clone()))
    }
}

// =============================================================================
// Tests
// =============================================================================

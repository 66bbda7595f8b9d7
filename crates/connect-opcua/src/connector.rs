// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The live session to one OPC UA server.
//!
//! [`SourceConnector`] owns exactly one transport. Connect makes a single
//! attempt; retry policy belongs to whoever drives the adapter.
//! Connect, browse and sample run on the caller's task and must not overlap.

use std::sync::Arc;

use connect_core::Value;
use tracing::{debug, info, warn};

use crate::browse::{NamespaceDiscovery, Point};
use crate::client::{NotificationHandler, OpcUaTransport};
use crate::config::ConnectionTarget;
use crate::error::{OpcUaError, OpcUaResult};
use crate::types::{NodeId, SubscriptionSettings};
use crate::units;

// =============================================================================
// SubscriptionHandle
// =============================================================================

/// One subscription covering a whole point set.
///
/// There is no per-point unsubscribe; the handle is released as a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionHandle {
    id: u32,
    points: usize,
}

impl SubscriptionHandle {
    /// Returns the transport's subscription id.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Returns the number of monitored points.
    pub fn points(&self) -> usize {
        self.points
    }
}

// =============================================================================
// SourceConnector
// =============================================================================

/// Session owner: connect, browse, sample, subscribe.
pub struct SourceConnector {
    transport: Box<dyn OpcUaTransport>,
    endpoint: Option<String>,
}

impl SourceConnector {
    /// Wraps a disconnected transport.
    pub fn new(transport: Box<dyn OpcUaTransport>) -> Self {
        Self {
            transport,
            endpoint: None,
        }
    }

    /// Opens the session. One attempt, no retry.
    pub async fn connect(&mut self, target: &ConnectionTarget) -> OpcUaResult<()> {
        let endpoint = target.endpoint_url();
        debug!(endpoint = %endpoint, anonymous = target.credentials.is_anonymous(), "Opening session");
        match self.transport.connect(target).await {
            Ok(()) => {
                info!(endpoint = %endpoint, "Session established");
                self.endpoint = Some(endpoint);
                Ok(())
            }
            Err(e) => {
                e.log("connect");
                Err(e)
            }
        }
    }

    /// Closes the session.
    ///
    /// Never fails: an already closed session is a no-op, and transport
    /// errors while closing are logged.
    pub async fn disconnect(&mut self) {
        if !self.transport.is_connected() {
            return;
        }
        if let Err(e) = self.transport.disconnect().await {
            warn!(endpoint = ?self.endpoint, error = %e, "Error while closing session");
        } else {
            debug!(endpoint = ?self.endpoint, "Session closed");
        }
    }

    /// Returns `true` while a session is open.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Returns the endpoint of the last successful connect.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Discovers points below `root`.
    ///
    /// `include_subnodes` selects a recursive walk; otherwise only the
    /// direct children of the root are listed.
    pub async fn browse(&self, root: &NodeId, include_subnodes: bool) -> OpcUaResult<Vec<Point>> {
        self.ensure_connected()?;
        NamespaceDiscovery::new(self.transport.as_ref())
            .discover(root, include_subnodes)
            .await
    }

    /// Reads the current value of one point.
    pub async fn sample(&self, point: &Point) -> OpcUaResult<Value> {
        self.ensure_connected()?;
        let value = self.transport.read_value(&point.node_id).await?;
        Ok(value.into())
    }

    /// Subscribes to value changes of all `points`.
    pub async fn subscribe(
        &self,
        points: &[Point],
        settings: &SubscriptionSettings,
        handler: Arc<dyn NotificationHandler>,
    ) -> OpcUaResult<SubscriptionHandle> {
        self.ensure_connected()?;
        let nodes: Vec<NodeId> = points.iter().map(|p| p.node_id.clone()).collect();
        let id = self.transport.create_subscription(&nodes, settings, handler).await?;
        info!(
            endpoint = ?self.endpoint,
            subscription_id = id,
            points = nodes.len(),
            publishing_interval = ?settings.publishing_interval(),
            "Subscription created"
        );
        Ok(SubscriptionHandle {
            id,
            points: nodes.len(),
        })
    }

    /// Releases a subscription. After this returns no notification for it
    /// is delivered.
    pub async fn unsubscribe(&self, handle: SubscriptionHandle) -> OpcUaResult<()> {
        self.ensure_connected()?;
        self.transport.delete_subscription(handle.id).await?;
        debug!(subscription_id = handle.id, "Subscription deleted");
        Ok(())
    }

    /// Maps an engineering unit id to a unit URI; `None` for no unit.
    pub fn unit_label(unit_id: i32) -> Option<String> {
        units::unit_label(unit_id)
    }

    fn ensure_connected(&self) -> OpcUaResult<()> {
        if self.transport.is_connected() {
            Ok(())
        } else {
            Err(OpcUaError::not_connected())
        }
    }
}

impl std::fmt::Debug for SourceConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceConnector")
            .field("endpoint", &self.endpoint)
            .field("state", &self.transport.state())
            .finish()
    }
}

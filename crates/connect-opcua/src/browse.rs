// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Namespace discovery.
//!
//! Walks the address space below a root node and flattens it into
//! [`Point`]s, the addressable leaves that become event fields.
//!
//! Two depths exist:
//!
//! - **Recursive**: depth-first over objects and views. Only variables
//!   become points; an object or view without children carries no value and
//!   is skipped. Used by adapter start and schema inference.
//! - **Single level**: only the direct variable children of the root. Used
//!   to list selectable options while the user is still configuring.
//!
//! If the root has no children and is itself a variable, it is the only point.

use std::collections::{BTreeMap, HashSet};

use connect_core::PrimitiveType;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::client::{BrowseResult, OpcUaTransport};
use crate::config::keys;
use crate::error::{ConfigurationError, OpcUaResult};
use crate::types::{NodeClass, NodeId, OpcUaDataType};
use crate::units::NO_UNIT;

// =============================================================================
// Point
// =============================================================================

/// One discovered, addressable leaf of the namespace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    /// The node.
    pub node_id: NodeId,

    /// Event field name derived from the native identifier.
    pub label: String,

    /// Data type reported by the server.
    pub data_type: OpcUaDataType,

    /// Engineering unit id; `0` when the node has none.
    pub unit_id: i32,
}

impl Point {
    /// Creates a point, deriving its label from the node id.
    pub fn new(node_id: NodeId, data_type: OpcUaDataType, unit_id: i32) -> Self {
        let label = derive_label(&node_id.native_identifier()).to_string();
        Self {
            node_id,
            label,
            data_type,
            unit_id,
        }
    }

    /// Returns the identifier without namespace or type prefix.
    pub fn native_identifier(&self) -> String {
        self.node_id.native_identifier()
    }

    /// Returns the schema type of this point.
    pub fn primitive_type(&self) -> PrimitiveType {
        self.data_type.primitive_type()
    }

    /// Returns `true` if the point carries an engineering unit.
    pub fn has_unit(&self) -> bool {
        self.unit_id != NO_UNIT
    }
}

/// Derives the event field label of a native identifier.
///
/// The label is the last `.`-separated segment. Trailing empty segments are
/// ignored, and an identifier without `.` is its own label.
///
/// ```
/// use connect_opcua::browse::derive_label;
///
/// assert_eq!(derive_label("ns=2;i=Temperature.Zone1.Sensor3"), "Sensor3");
/// assert_eq!(derive_label("Speed"), "Speed");
/// ```
pub fn derive_label(native_id: &str) -> &str {
    native_id
        .rsplit('.')
        .find(|segment| !segment.is_empty())
        .unwrap_or(native_id)
}

// =============================================================================
// Discovery
// =============================================================================

/// Discovers points on one open session.
pub struct NamespaceDiscovery<'a> {
    transport: &'a dyn OpcUaTransport,
}

impl<'a> NamespaceDiscovery<'a> {
    /// Creates a discovery over `transport`, which must be connected.
    pub fn new(transport: &'a dyn OpcUaTransport) -> Self {
        Self { transport }
    }

    /// Discovers the points below `root`.
    ///
    /// Any browse or attribute failure aborts the whole walk; partial
    /// results are never returned.
    pub async fn discover(&self, root: &NodeId, include_subnodes: bool) -> OpcUaResult<Vec<Point>> {
        let children = self.transport.browse(root).await?;
        let points = if children.is_empty() {
            self.root_as_point(root).await?
        } else if include_subnodes {
            self.walk(root, children).await?
        } else {
            self.direct_variables(children).await?
        };

        debug!(
            root = %root,
            recursive = include_subnodes,
            points = points.len(),
            "Namespace discovery finished"
        );
        Ok(points)
    }

    async fn root_as_point(&self, root: &NodeId) -> OpcUaResult<Vec<Point>> {
        if self.transport.read_node_class(root).await? == NodeClass::Variable {
            Ok(vec![self.point(root.clone()).await?])
        } else {
            Ok(Vec::new())
        }
    }

    async fn direct_variables(&self, children: Vec<BrowseResult>) -> OpcUaResult<Vec<Point>> {
        let mut points = Vec::new();
        for child in children {
            if child.node_class.has_value() {
                points.push(self.point(child.node_id).await?);
            }
        }
        Ok(points)
    }

    async fn walk(&self, root: &NodeId, children: Vec<BrowseResult>) -> OpcUaResult<Vec<Point>> {
        let mut visited: HashSet<NodeId> = HashSet::from([root.clone()]);
        let mut points = Vec::new();
        let mut stack: Vec<BrowseResult> = children.into_iter().rev().collect();

        while let Some(node) = stack.pop() {
            if !visited.insert(node.node_id.clone()) {
                continue;
            }
            match node.node_class {
                NodeClass::Variable => {
                    trace!(node_id = %node.node_id, "Discovered variable");
                    points.push(self.point(node.node_id).await?);
                }
                class if class.is_container() => {
                    let grandchildren = self.transport.browse(&node.node_id).await?;
                    if grandchildren.is_empty() {
                        trace!(node_id = %node.node_id, "Skipping empty container");
                    }
                    stack.extend(grandchildren.into_iter().rev());
                }
                _ => trace!(node_id = %node.node_id, class = ?node.node_class, "Skipping node"),
            }
        }
        Ok(points)
    }

    async fn point(&self, node_id: NodeId) -> OpcUaResult<Point> {
        let data_type = self.transport.read_data_type(&node_id).await?;
        let unit_id = self.transport.read_engineering_unit(&node_id).await?;
        Ok(Point::new(node_id, data_type, unit_id))
    }
}

// =============================================================================
// Selection
// =============================================================================

/// Restricts discovered points to the selected native identifiers.
///
/// An empty selection keeps every point. The result must be non-empty and
/// carry unique labels, since labels are event field names.
pub fn select_points(points: Vec<Point>, selection: &[String]) -> Result<Vec<Point>, ConfigurationError> {
    let selected: Vec<Point> = if selection.is_empty() {
        points
    } else {
        let wanted: HashSet<&str> = selection.iter().map(String::as_str).collect();
        let found: Vec<Point> = points
            .into_iter()
            .filter(|p| wanted.contains(p.native_identifier().as_str()))
            .collect();
        if found.len() < wanted.len() {
            let present: HashSet<String> = found.iter().map(Point::native_identifier).collect();
            let missing: Vec<&str> = selection
                .iter()
                .map(String::as_str)
                .filter(|s| !present.contains(*s))
                .collect();
            warn!(missing = ?missing, "Selected nodes not found below the root node");
        }
        found
    };

    if selected.is_empty() {
        return Err(ConfigurationError::invalid_value(
            keys::AVAILABLE_NODES,
            selection.join(","),
            "no points to subscribe below the root node",
        ));
    }
    ensure_unique_labels(&selected)?;
    Ok(selected)
}

/// Fails if two points derive the same label.
pub fn ensure_unique_labels(points: &[Point]) -> Result<(), ConfigurationError> {
    let mut seen: BTreeMap<&str, &Point> = BTreeMap::new();
    for point in points {
        if let Some(first) = seen.insert(point.label.as_str(), point) {
            return Err(ConfigurationError::duplicate_label(
                &point.label,
                first.native_identifier(),
                point.native_identifier(),
            ));
        }
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{OpcUaValue, SimulatedServer, SimulatedTransport};
    use crate::config::ConnectionTarget;

    async fn connected(server: &SimulatedServer) -> SimulatedTransport {
        let mut transport = SimulatedTransport::new(server.clone());
        transport
            .connect(&ConnectionTarget::anonymous("opc.tcp://sim:4840"))
            .await
            .unwrap();
        transport
    }

    fn labels(points: &[Point]) -> Vec<&str> {
        points.iter().map(|p| p.label.as_str()).collect()
    }

    #[test]
    fn test_derive_label() {
        assert_eq!(derive_label("ns=2;i=Temperature.Zone1.Sensor3"), "Sensor3");
        assert_eq!(derive_label("Plant.Line1.Speed"), "Speed");
        assert_eq!(derive_label("Speed"), "Speed");
        assert_eq!(derive_label("Plant.Speed."), "Speed");
        assert_eq!(derive_label("1001"), "1001");
    }

    #[test]
    fn test_point_label_from_numeric_id() {
        let point = Point::new(NodeId::numeric(2, 1001), OpcUaDataType::Int32, 0);
        assert_eq!(point.label, "1001");
        assert!(!point.has_unit());
        assert_eq!(point.primitive_type(), PrimitiveType::Integer);
    }

    #[tokio::test]
    async fn test_recursive_discovery() {
        let server = SimulatedServer::demo();
        let transport = connected(&server).await;
        let points = NamespaceDiscovery::new(&transport)
            .discover(&NodeId::string(2, "Plant"), true)
            .await
            .unwrap();
        assert_eq!(labels(&points), vec!["Temperature", "Speed", "Running", "Status", "Pressure"]);
        assert!(points[0].has_unit());
        assert_eq!(points[0].data_type, OpcUaDataType::Double);
    }

    #[tokio::test]
    async fn test_single_level_discovery() {
        let server = SimulatedServer::demo();
        let transport = connected(&server).await;
        let points = NamespaceDiscovery::new(&transport)
            .discover(&NodeId::string(2, "Plant"), false)
            .await
            .unwrap();
        assert_eq!(labels(&points), vec!["Pressure"]);
    }

    #[tokio::test]
    async fn test_root_variable_is_single_point() {
        let server = SimulatedServer::demo();
        let transport = connected(&server).await;
        let points = NamespaceDiscovery::new(&transport)
            .discover(&NodeId::string(2, "Plant.Pressure"), true)
            .await
            .unwrap();
        assert_eq!(labels(&points), vec!["Pressure"]);
    }

    #[tokio::test]
    async fn test_empty_container_is_skipped() {
        let server = SimulatedServer::new();
        let root = NodeId::string(2, "Root");
        server.add_object(&NodeId::objects_folder(), root.clone(), "Root");
        server.add_object(&root, NodeId::string(2, "Root.Spare"), "Spare");
        server.add_variable(&root, NodeId::string(2, "Root.Level"), "Level", OpcUaValue::Double(0.5), 0);

        let transport = connected(&server).await;
        let points = NamespaceDiscovery::new(&transport).discover(&root, true).await.unwrap();
        assert_eq!(labels(&points), vec!["Level"]);

        let spare = NamespaceDiscovery::new(&transport)
            .discover(&NodeId::string(2, "Root.Spare"), true)
            .await
            .unwrap();
        assert!(spare.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_root_fails() {
        let server = SimulatedServer::demo();
        let transport = connected(&server).await;
        let result = NamespaceDiscovery::new(&transport)
            .discover(&NodeId::string(2, "Nope"), true)
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_select_points() {
        let points = vec![
            Point::new(NodeId::string(2, "A.Speed"), OpcUaDataType::Int32, 0),
            Point::new(NodeId::string(2, "A.Temp"), OpcUaDataType::Double, 0),
        ];
        let all = select_points(points.clone(), &[]).unwrap();
        assert_eq!(all.len(), 2);

        let one = select_points(points.clone(), &["A.Temp".to_string()]).unwrap();
        assert_eq!(labels(&one), vec!["Temp"]);

        let none = select_points(points, &["B.Other".to_string()]);
        assert!(matches!(none, Err(ConfigurationError::InvalidValue { .. })));
    }

    #[test]
    fn test_duplicate_labels_rejected() {
        let points = vec![
            Point::new(NodeId::string(2, "Line1.Speed"), OpcUaDataType::Int32, 0),
            Point::new(NodeId::string(2, "Line2.Speed"), OpcUaDataType::Int32, 0),
        ];
        let err = select_points(points, &[]).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::DuplicateLabel { ref label, ref first, ref second }
                if label == "Speed" && first == "Line1.Speed" && second == "Line2.Speed"
        ));
    }
}

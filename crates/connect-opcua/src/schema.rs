// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Schema inference from sampled point values.

use connect_core::{Event, EventProperty, EventSchema, GuessSchema, PrimitiveType, Value};
use tracing::{debug, trace};

use crate::browse::Point;
use crate::connector::SourceConnector;
use crate::error::OpcUaResult;

/// Derives an event schema by reading every point once.
///
/// Values are read directly, never through a subscription. One failed read
/// fails the whole inference.
pub struct SchemaInference<'a> {
    connector: &'a SourceConnector,
}

impl<'a> SchemaInference<'a> {
    /// Creates an inference over a connected session.
    pub fn new(connector: &'a SourceConnector) -> Self {
        Self { connector }
    }

    /// Samples `points` and returns one field per point, in order.
    ///
    /// The preview event carries the sampled values.
    pub async fn infer(&self, points: &[Point]) -> OpcUaResult<GuessSchema> {
        let mut properties = Vec::with_capacity(points.len());
        let mut preview = Event::new();

        for point in points {
            let value = self.connector.sample(point).await?;
            let runtime_type = field_type(point, &value);
            trace!(label = %point.label, runtime_type = ?runtime_type, "Sampled point");

            let mut property = EventProperty::primitive(&point.label, runtime_type);
            if let Some(unit) = SourceConnector::unit_label(point.unit_id) {
                property = property.with_measurement_unit(unit);
            }
            properties.push(property);
            preview.insert(point.label.clone(), value);
        }

        debug!(fields = properties.len(), "Schema inferred");
        Ok(GuessSchema::new(EventSchema::new(properties)).with_preview(vec![preview]))
    }
}

/// The sampled value decides the type; a null sample falls back to the
/// declared data type.
fn field_type(point: &Point, value: &Value) -> PrimitiveType {
    if value.is_null() {
        point.primitive_type()
    } else {
        PrimitiveType::of(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{OpcUaValue, SimulatedServer, SimulatedTransport};
    use crate::config::ConnectionTarget;
    use crate::types::{NodeId, OpcUaDataType};
    use crate::units::encode_unit_code;

    async fn connected(server: &SimulatedServer) -> SourceConnector {
        let mut connector = SourceConnector::new(Box::new(SimulatedTransport::new(server.clone())));
        connector
            .connect(&ConnectionTarget::anonymous("opc.tcp://sim:4840"))
            .await
            .unwrap();
        connector
    }

    #[tokio::test]
    async fn test_infer_demo_schema() {
        let server = SimulatedServer::demo();
        let connector = connected(&server).await;
        let points = connector.browse(&NodeId::string(2, "Plant"), true).await.unwrap();
        let guess = SchemaInference::new(&connector).infer(&points).await.unwrap();

        let schema = &guess.event_schema;
        assert_eq!(schema.len(), 5);
        let names: Vec<_> = schema.properties.iter().map(|p| p.runtime_name.as_str()).collect();
        assert_eq!(names, vec!["Temperature", "Speed", "Running", "Status", "Pressure"]);

        let temperature = schema.property("Temperature").unwrap();
        assert_eq!(temperature.runtime_type, PrimitiveType::Double);
        assert_eq!(
            temperature.measurement_unit.as_deref(),
            Some("http://qudt.org/vocab/unit#DegreeCelsius")
        );
        assert_eq!(schema.property("Speed").unwrap().runtime_type, PrimitiveType::Integer);
        assert_eq!(schema.property("Pressure").unwrap().runtime_type, PrimitiveType::Float);

        assert_eq!(guess.preview[0].get("Status"), Some(&Value::String("OK".into())));
    }

    #[tokio::test]
    async fn test_unit_only_when_present() {
        let server = SimulatedServer::new();
        let root = NodeId::string(2, "R");
        server.add_object(&NodeId::objects_folder(), root.clone(), "R");
        server.add_variable(&root, NodeId::string(2, "R.Plain"), "Plain", OpcUaValue::Double(1.0), 0);
        server.add_variable(
            &root,
            NodeId::string(2, "R.Hot"),
            "Hot",
            OpcUaValue::Double(90.0),
            encode_unit_code("CEL"),
        );

        let connector = connected(&server).await;
        let points = connector.browse(&root, true).await.unwrap();
        let guess = SchemaInference::new(&connector).infer(&points).await.unwrap();

        assert!(guess.event_schema.property("Plain").unwrap().measurement_unit.is_none());
        assert!(guess.event_schema.property("Hot").unwrap().measurement_unit.is_some());
    }

    #[tokio::test]
    async fn test_failed_sample_aborts() {
        let server = SimulatedServer::demo();
        let connector = connected(&server).await;
        let mut points = connector.browse(&NodeId::string(2, "Plant"), true).await.unwrap();
        points.push(Point::new(NodeId::string(2, "Plant.Ghost"), OpcUaDataType::Double, 0));

        let result = SchemaInference::new(&connector).infer(&points).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_null_sample_uses_declared_type() {
        let point = Point::new(NodeId::string(2, "X.Count"), OpcUaDataType::UInt32, 0);
        assert_eq!(field_type(&point, &Value::Null), PrimitiveType::Long);
        assert_eq!(field_type(&point, &Value::Bool(true)), PrimitiveType::Boolean);
    }
}

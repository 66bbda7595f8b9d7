// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Adapter Integration Tests
//!
//! End-to-end tests of the OPC UA adapter against the simulated server:
//!
//! - Option resolution on partial descriptions
//! - Schema inference with engineering units
//! - Event assembly through a running subscription
//! - Lifecycle and authentication
//!
//! ## Test Categories
//!
//! - `test_options_*`: Option resolution
//! - `test_schema_*`: Schema inference
//! - `test_events_*`: Event assembly
//! - `test_lifecycle_*`: Start/stop behaviour

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use connect_core::pipeline::CollectingSink;
use connect_core::{AdapterDescription, AdapterRegistry, Event, SelectOption, Value};
use connect_opcua::client::{OpcUaValue, SimulatedProvider, SimulatedServer};
use connect_opcua::config::keys;
use connect_opcua::units::encode_unit_code;
use connect_opcua::{NodeId, OpcUaAdapterFactory, ADAPTER_ID};

// =============================================================================
// Fixtures
// =============================================================================

fn line_server() -> SimulatedServer {
    let server = SimulatedServer::new();
    let root = NodeId::string(2, "Line");
    server.add_object(&NodeId::objects_folder(), root.clone(), "Line");
    for name in ["A", "B", "C"] {
        server.add_variable(
            &root,
            NodeId::string(2, format!("Line.{}", name)),
            name,
            OpcUaValue::Int32(0),
            0,
        );
    }
    server
}

fn registry(server: &SimulatedServer) -> AdapterRegistry {
    let provider = Arc::new(SimulatedProvider::new(server.clone()));
    let mut registry = AdapterRegistry::new();
    registry.register(Box::new(OpcUaAdapterFactory::new(provider)));
    registry
}

fn description(root: &str) -> AdapterDescription {
    let registry = registry(&SimulatedServer::new());
    let mut desc = registry
        .declare_models()
        .into_iter()
        .find(|d| d.app_id == ADAPTER_ID)
        .unwrap();
    desc.select_alternative(keys::ACCESS_MODE, keys::UNAUTHENTICATED);
    desc.select_alternative(keys::OPC_HOST_OR_URL, keys::OPC_URL);
    desc.set_value(keys::OPC_SERVER_URL, "opc.tcp://plant-gw:4840");
    desc.set_value(keys::NAMESPACE_INDEX, "2");
    desc.set_value(keys::NODE_ID, root);
    desc
}

fn int(server: &SimulatedServer, id: &str, value: i32) {
    server
        .write_value(&NodeId::string(2, id), OpcUaValue::Int32(value))
        .unwrap();
}

// =============================================================================
// Option Resolution Tests
// =============================================================================

#[tokio::test]
async fn test_options_incomplete_description_is_empty() {
    let server = SimulatedServer::demo();
    let registry = registry(&server);
    let mut desc = description("Plant.Line1");
    desc.set_value(keys::NAMESPACE_INDEX, "");

    let options = registry.resolve_options(keys::AVAILABLE_NODES, &desc).await;
    assert!(options.is_empty());
    assert_eq!(server.session_count(), 0);
}

#[tokio::test]
async fn test_options_unreachable_server_is_empty() {
    let server = SimulatedServer::demo();
    server.set_reachable(false);
    let registry = registry(&server);

    let options = registry
        .resolve_options(keys::AVAILABLE_NODES, &description("Plant.Line1"))
        .await;
    assert!(options.is_empty());
}

#[tokio::test]
async fn test_options_label_and_identifier() {
    let server = SimulatedServer::demo();
    let registry = registry(&server);

    let options = registry
        .resolve_options(keys::AVAILABLE_NODES, &description("Plant.Line1"))
        .await;
    let speed = options.iter().find(|o| o.label == "Speed").unwrap();
    assert_eq!(speed.internal_name, "Plant.Line1.Speed");
    assert!(!speed.selected);
}

#[tokio::test]
async fn test_options_other_property_has_none() {
    let registry = registry(&SimulatedServer::demo());
    let options = registry
        .resolve_options(keys::NODE_ID, &description("Plant.Line1"))
        .await;
    assert!(options.is_empty());
}

// =============================================================================
// Schema Tests
// =============================================================================

#[tokio::test]
async fn test_schema_units_only_for_nonzero_ids() {
    let server = SimulatedServer::demo();
    let adapter = registry(&server).create(description("Plant")).unwrap();

    let guess = adapter.get_schema().await.unwrap();
    let schema = &guess.event_schema;
    assert_eq!(schema.len(), 5);
    assert_eq!(
        schema.property("Speed").unwrap().measurement_unit.as_deref(),
        Some("http://qudt.org/vocab/unit#RevolutionPerMinute")
    );
    assert!(schema.property("Running").unwrap().measurement_unit.is_none());
    assert!(schema.property("Status").unwrap().measurement_unit.is_none());
    assert_eq!(server.session_count(), 0);
}

#[tokio::test]
async fn test_schema_respects_selection() {
    let server = SimulatedServer::demo();
    let mut desc = description("Plant");
    desc.set_options(
        keys::AVAILABLE_NODES,
        vec![
            SelectOption::new("Temperature", "Plant.Line1.Temperature").selected(),
            SelectOption::new("Speed", "Plant.Line1.Speed"),
        ],
    );
    let adapter = registry(&server).create(desc).unwrap();

    let guess = adapter.get_schema().await.unwrap();
    let names: Vec<_> = guess
        .event_schema
        .properties
        .iter()
        .map(|p| p.runtime_name.as_str())
        .collect();
    assert_eq!(names, vec!["Temperature"]);
}

#[tokio::test]
async fn test_schema_unknown_unit_code() {
    let server = SimulatedServer::new();
    let root = NodeId::string(2, "Tank");
    server.add_object(&NodeId::objects_folder(), root.clone(), "Tank");
    server.add_variable(
        &root,
        NodeId::string(2, "Tank.Level"),
        "Level",
        OpcUaValue::Double(0.4),
        encode_unit_code("ZZZ"),
    );
    let adapter = registry(&server).create(description("Tank")).unwrap();

    let guess = adapter.get_schema().await.unwrap();
    assert_eq!(
        guess.event_schema.property("Level").unwrap().measurement_unit.as_deref(),
        Some("urn:unece:rec20:ZZZ")
    );
}

#[tokio::test]
async fn test_schema_unreachable_carries_address() {
    let server = SimulatedServer::demo();
    server.set_reachable(false);
    let adapter = registry(&server).create(description("Plant")).unwrap();

    let err = adapter.get_schema().await.unwrap_err();
    assert_eq!(err.address(), Some("opc.tcp://plant-gw:4840"));
    assert!(!err.is_configuration());
}

// =============================================================================
// Event Assembly Tests
// =============================================================================

#[tokio::test]
async fn test_events_coalesce_until_complete() {
    let server = line_server();
    let mut adapter = registry(&server).create(description("Line")).unwrap();
    let sink = Arc::new(CollectingSink::new());
    adapter.start(sink.clone()).await.unwrap();

    int(&server, "Line.A", 1);
    int(&server, "Line.B", 2);
    int(&server, "Line.A", 3);
    assert!(sink.is_empty());

    int(&server, "Line.C", 4);
    int(&server, "Line.B", 5);

    let events = sink.events();
    assert_eq!(
        events,
        vec![
            Event::new().with_field("A", 3).with_field("B", 2).with_field("C", 4),
            Event::new().with_field("A", 3).with_field("B", 5).with_field("C", 4),
        ]
    );

    adapter.stop().await.unwrap();
}

#[tokio::test]
async fn test_events_are_independent_snapshots() {
    let server = line_server();
    let mut adapter = registry(&server).create(description("Line")).unwrap();
    let sink = Arc::new(CollectingSink::new());
    adapter.start(sink.clone()).await.unwrap();

    int(&server, "Line.A", 1);
    int(&server, "Line.B", 1);
    int(&server, "Line.C", 1);
    let first = sink.events()[0].clone();

    int(&server, "Line.C", 9);
    assert_eq!(first.get("C"), Some(&Value::Int32(1)));
    assert_eq!(sink.events()[1].get("C"), Some(&Value::Int32(9)));

    adapter.stop().await.unwrap();
}

#[tokio::test]
async fn test_events_concurrent_writers() {
    let server = line_server();
    let mut adapter = registry(&server).create(description("Line")).unwrap();
    let sink = Arc::new(CollectingSink::new());
    adapter.start(sink.clone()).await.unwrap();

    std::thread::scope(|scope| {
        for name in ["A", "B", "C"] {
            let server = server.clone();
            scope.spawn(move || {
                let id = format!("Line.{}", name);
                for n in 1..=50 {
                    int(&server, &id, n);
                }
            });
        }
    });

    let events = sink.events();
    assert!(!events.is_empty());
    assert!(events.iter().all(|e| e.len() == 3));
    let last = events.last().unwrap();
    for label in ["A", "B", "C"] {
        assert_eq!(last.get(label), Some(&Value::Int32(50)));
    }

    adapter.stop().await.unwrap();
}

#[tokio::test]
async fn test_events_stray_notification_is_rejected() {
    let server = line_server();
    let mut adapter = registry(&server).create(description("Line")).unwrap();
    let sink = Arc::new(CollectingSink::new());
    adapter.start(sink.clone()).await.unwrap();

    let result = server.inject_notification(NodeId::string(2, "Other.A"), OpcUaValue::Int32(1));
    assert!(result.is_err());
    assert!(sink.is_empty());

    adapter.stop().await.unwrap();
}

#[tokio::test]
async fn test_events_initial_values_complete_immediately() {
    let server = SimulatedServer::demo();
    let mut adapter = registry(&server).create(description("Plant")).unwrap();
    let sink = Arc::new(CollectingSink::new());
    adapter.start(sink.clone()).await.unwrap();

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].get("Temperature"), Some(&Value::Float64(21.5)));
    assert_eq!(events[0].get("Pressure"), Some(&Value::Float32(1.8)));

    adapter.stop().await.unwrap();
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[tokio::test]
async fn test_lifecycle_no_events_after_stop() {
    let server = line_server();
    let mut adapter = registry(&server).create(description("Line")).unwrap();
    let sink = Arc::new(CollectingSink::new());
    adapter.start(sink.clone()).await.unwrap();
    assert!(adapter.is_running());

    int(&server, "Line.A", 1);
    int(&server, "Line.B", 1);
    int(&server, "Line.C", 1);
    assert_eq!(sink.len(), 1);

    adapter.stop().await.unwrap();
    assert!(!adapter.is_running());
    assert_eq!(server.subscription_count(), 0);
    assert_eq!(server.session_count(), 0);

    int(&server, "Line.A", 2);
    assert_eq!(sink.len(), 1);

    adapter.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_lifecycle_stop_while_notifications_arrive() {
    let server = line_server();
    let mut adapter = registry(&server).create(description("Line")).unwrap();
    let sink = Arc::new(CollectingSink::new());
    adapter.start(sink.clone()).await.unwrap();

    let writing = Arc::new(AtomicBool::new(true));
    let writers: Vec<_> = ["A", "B", "C"]
        .into_iter()
        .map(|name| {
            let server = server.clone();
            let writing = Arc::clone(&writing);
            let node = NodeId::string(2, format!("Line.{}", name));
            std::thread::spawn(move || {
                let mut n = 0;
                while writing.load(Ordering::SeqCst) {
                    server.write_value(&node, OpcUaValue::Int32(n)).unwrap();
                    n += 1;
                    std::thread::sleep(Duration::from_micros(100));
                }
            })
        })
        .collect();

    for _ in 0..500 {
        if sink.len() >= 20 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    assert!(sink.len() >= 20);

    adapter.stop().await.unwrap();
    let after_stop = sink.len();

    tokio::time::sleep(Duration::from_millis(20)).await;
    writing.store(false, Ordering::SeqCst);
    for writer in writers {
        writer.join().unwrap();
    }

    assert_eq!(sink.len(), after_stop);
    assert!(sink.events().iter().all(|e| e.len() == 3));
}

#[tokio::test]
async fn test_lifecycle_empty_folder_below_root() {
    let server = line_server();
    server.add_object(&NodeId::string(2, "Line"), NodeId::string(2, "Line.Spare"), "Spare");
    let mut adapter = registry(&server).create(description("Line")).unwrap();
    let sink = Arc::new(CollectingSink::new());
    adapter.start(sink.clone()).await.unwrap();

    int(&server, "Line.A", 1);
    int(&server, "Line.B", 2);
    int(&server, "Line.C", 3);

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].len(), 3);
    assert!(events[0].get("Spare").is_none());
    adapter.stop().await.unwrap();
}

#[tokio::test]
async fn test_lifecycle_restart_after_stop() {
    let server = line_server();
    let mut adapter = registry(&server).create(description("Line")).unwrap();
    let sink = Arc::new(CollectingSink::new());

    adapter.start(sink.clone()).await.unwrap();
    assert!(adapter.start(sink.clone()).await.is_err());
    adapter.stop().await.unwrap();

    adapter.start(sink.clone()).await.unwrap();
    assert_eq!(server.subscription_count(), 1);
    adapter.stop().await.unwrap();
}

#[tokio::test]
async fn test_lifecycle_start_without_root_fails() {
    let server = line_server();
    let mut desc = description("Line");
    desc.set_value(keys::NODE_ID, "");
    let mut adapter = registry(&server).create(desc).unwrap();

    let err = adapter.start(Arc::new(CollectingSink::new())).await.unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(server.session_count(), 0);
}

#[tokio::test]
async fn test_lifecycle_username_authentication() {
    let server = line_server();
    server.set_allow_anonymous(false).add_user("operator", "s3cret");
    let registry = registry(&server);

    let mut desc = description("Line");
    desc.select_alternative(keys::ACCESS_MODE, keys::USERNAME_GROUP);
    desc.set_value(keys::USERNAME, "operator");
    desc.set_value(keys::PASSWORD, "wrong");
    let mut rejected = registry.create(desc.clone()).unwrap();
    assert!(rejected.start(Arc::new(CollectingSink::new())).await.is_err());
    assert_eq!(server.session_count(), 0);

    desc.set_value(keys::PASSWORD, "s3cret");
    let mut accepted = registry.create(desc).unwrap();
    accepted.start(Arc::new(CollectingSink::new())).await.unwrap();
    assert_eq!(server.session_count(), 1);
    accepted.stop().await.unwrap();
}

#[tokio::test]
async fn test_lifecycle_host_and_port_address() {
    let server = line_server();
    let mut desc = description("Line");
    desc.select_alternative(keys::OPC_HOST_OR_URL, keys::OPC_HOST);
    desc.set_value(keys::OPC_SERVER_HOST, "plant-gw");
    desc.set_value(keys::OPC_SERVER_PORT, "4840");

    let mut adapter = registry(&server).create(desc).unwrap();
    adapter.start(Arc::new(CollectingSink::new())).await.unwrap();
    adapter.stop().await.unwrap();
}

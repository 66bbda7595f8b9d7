// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Subscription-driven OPC UA adapter.
//!
//! Connects to an OPC UA server, discovers the namespace below a root node,
//! infers an event schema from sampled values, and assembles value-change
//! notifications of the selected points into complete events.
//!
//! # Components
//!
//! ```text
//! config::ConnectionTarget ──▶ SourceConnector::connect
//!                                   │
//!                                   ▼
//!                         NamespaceDiscovery ──▶ SchemaInference   (get_schema)
//!                                   │       └──▶ OptionResolver    (resolve_options)
//!                                   ▼
//!                         SourceConnector::subscribe
//!                                   │
//!                                   ▼
//!                     SubscriptionEventAssembler ──▶ EventSink      (start .. stop)
//! ```
//!
//! # Error Handling
//!
//! ```text
//! OpcUaError
//! ├── Configuration - Incomplete or invalid description
//! ├── Connection    - Session establishment and authentication
//! ├── Discovery     - Browsing and attribute reads
//! ├── Sampling      - Value reads
//! ├── Subscription  - Subscription and monitored items
//! └── Assembly      - Notification for a point outside the subscription
//! ```
//!
//! At the adapter boundary errors become `AdapterError`s carrying the
//! server address.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use connect_core::pipeline::CollectingSink;
//! use connect_core::Adapter;
//! use connect_opcua::client::{SimulatedProvider, SimulatedServer};
//! use connect_opcua::config::keys;
//! use connect_opcua::{declare_model, OpcUaAdapter, SubscriptionSettings};
//!
//! # tokio_test_runtime(async {
//! let mut description = declare_model();
//! description.select_alternative(keys::OPC_HOST_OR_URL, keys::OPC_URL);
//! description.set_value(keys::OPC_SERVER_URL, "opc.tcp://localhost:4840");
//! description.select_alternative(keys::ACCESS_MODE, keys::UNAUTHENTICATED);
//! description.set_value(keys::NAMESPACE_INDEX, "2");
//! description.set_value(keys::NODE_ID, "Plant");
//!
//! let provider = Arc::new(SimulatedProvider::new(SimulatedServer::demo()));
//! let mut adapter = OpcUaAdapter::new(description, provider, SubscriptionSettings::default());
//!
//! let sink = Arc::new(CollectingSink::new());
//! adapter.start(sink.clone()).await.unwrap();
//! adapter.stop().await.unwrap();
//!
//! // the demo server reports current values on subscribe
//! assert!(!sink.is_empty());
//! # });
//! # fn tokio_test_runtime<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod adapter;
pub mod assembler;
pub mod browse;
pub mod client;
pub mod config;
pub mod connector;
pub mod error;
pub mod options;
pub mod schema;
pub mod types;
pub mod units;

// Re-export commonly used types
pub use adapter::{declare_model, OpcUaAdapter, OpcUaAdapterFactory, ADAPTER_ID};
pub use assembler::{AssemblyState, AssemblyStats, SubscriptionEventAssembler};
pub use browse::{derive_label, NamespaceDiscovery, Point};
pub use config::{AdapterSettings, ConnectionTarget, Credentials, ServerAddress};
pub use connector::{SourceConnector, SubscriptionHandle};
pub use error::{
    AssemblyDefect, ConfigurationError, ConnectionError, DiscoveryError, ErrorSeverity, OpcUaError,
    OpcUaResult, SamplingError, SubscriptionError,
};
pub use options::{OptionResolver, OptionsOutcome};
pub use schema::SchemaInference;
pub use types::{NodeClass, NodeId, NodeIdentifier, OpcUaDataType, SubscriptionSettings};
pub use units::unit_label;

// Re-export client types
pub use client::{OpcUaTransport, SimulatedProvider, SimulatedServer, TransportProvider};

// Re-export real transport when feature is enabled
#[cfg(feature = "real-transport")]
pub use client::{RealOpcUaTransport, RealTransportProvider};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

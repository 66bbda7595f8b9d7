// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA client transports.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        OpcUaAdapter                             │
//! │            (start / stop / get_schema / options)                │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      SourceConnector                            │
//! │        (one session: browse, sample, subscribe)                 │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      OpcUaTransport                             │
//! │       SimulatedTransport  |  RealOpcUaTransport (feature)       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod simulated;
mod transport;

#[cfg(feature = "real-transport")]
mod real_transport;

pub use simulated::{
    SimulatedProvider, SimulatedServer, SimulatedTransport, DEMO_NAMESPACE, DEMO_ROOT,
};
pub use transport::{
    BrowseResult, DataChange, NotificationHandler, OpcUaTransport, OpcUaValue, TransportProvider,
    TransportState,
};

#[cfg(feature = "real-transport")]
pub use real_transport::{RealOpcUaTransport, RealTransportProvider};

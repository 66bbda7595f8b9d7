// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # connect-core
//!
//! Core abstractions shared by ua-connect adapters.
//!
//! - **Types**: `Value`, `Event`, `SelectOption`
//! - **Schema**: primitive types, event properties and guessed schemas
//! - **Description**: static adapter descriptions and property extraction
//! - **Adapter**: the capability traits every adapter family implements
//! - **Pipeline**: downstream event sinks
//! - **Generic**: pull-parse driven adapters over byte streams
//! - **Error**: the adapter-level error type
//!
//! ## Example
//!
//! ```
//! use connect_core::types::{Event, Value};
//! use connect_core::pipeline::{CollectingSink, EventSink};
//!
//! let sink = CollectingSink::new();
//! sink.process(Event::new().with_field("temperature", 21.5));
//!
//! let events = sink.events();
//! assert_eq!(events[0].get("temperature"), Some(&Value::Float64(21.5)));
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod adapter;
pub mod description;
pub mod error;
pub mod generic;
pub mod pipeline;
pub mod schema;
pub mod types;

// =============================================================================
// Re-exports
// =============================================================================

pub use adapter::{Adapter, AdapterFactory, AdapterRegistry};
pub use description::{AdapterDescription, StaticProperty, StaticPropertyAlternative, StaticPropertyExtractor};
pub use error::{AdapterError, AdapterResult};
pub use pipeline::EventSink;
pub use schema::{EventProperty, EventSchema, GuessSchema, PrimitiveType};
pub use types::{Event, SelectOption, Value};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Downstream event sinks.
//!
//! Adapters hand finished events to an [`EventSink`]. Emission is fire and
//! forget: `process` must not block on downstream backpressure, since it may
//! be called from a source-driven notification thread while a lock is held.
//!
//! [`CollectingSink`] keeps every event in memory; it backs schema sampling
//! and tests.

use parking_lot::Mutex;

use crate::types::Event;

/// Entry point of a downstream processing pipeline.
pub trait EventSink: Send + Sync {
    /// Accepts one finished event.
    fn process(&self, event: Event);
}

// =============================================================================
// CollectingSink
// =============================================================================

/// Sink that stores every event it receives.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<Event>>,
}

impl CollectingSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all received events.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Takes all received events, leaving the sink empty.
    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Number of received events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns `true` if nothing was received.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for CollectingSink {
    fn process(&self, event: Event) {
        self.events.lock().push(event);
    }
}

// =============================================================================
// Tests
// =============================================================================

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Assembly of per-point notifications into complete events.
//!
//! # State machine
//!
//! ```text
//!            every point reported once
//!   EMPTY ─────────────────────────────▶ COMPLETE ──┐
//!     │                                     ▲       │ any notification:
//!     │ notification: buffer only           └───────┘ buffer, emit snapshot
//!     └──┐
//!        ▼
//!      EMPTY
//! ```
//!
//! The buffer holds the latest value per label. Until every subscribed point
//! has reported, notifications only fill it. From then on, every single
//! notification emits a copy of the whole buffer, so each event carries the
//! last known value of every point. There is no way back to `EMPTY` and
//! values never expire.
//!
//! Mutation, completeness check and emission happen under one lock, so
//! concurrent notifications cannot lose updates and events reach the sink
//! in mutation order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use connect_core::{Event, EventSink, Value};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error, info, trace};

use crate::browse::Point;
use crate::client::{DataChange, NotificationHandler};
use crate::error::{AssemblyDefect, OpcUaResult};

// =============================================================================
// AssemblyState
// =============================================================================

/// Completeness of the assembly buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyState {
    /// Some subscribed point has not reported yet.
    Empty,
    /// Every subscribed point has reported at least once. Terminal.
    Complete,
}

/// Counters of one assembler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyStats {
    /// Notifications accepted into the buffer.
    pub notifications: u64,
    /// Events emitted to the sink.
    pub emitted: u64,
    /// Notifications for points outside the subscription set.
    pub defects: u64,
    /// Notifications dropped because the assembler was closed.
    pub after_close: u64,
}

#[derive(Default)]
struct Counters {
    notifications: AtomicU64,
    emitted: AtomicU64,
    defects: AtomicU64,
    after_close: AtomicU64,
}

struct Buffer {
    event: Event,
    state: AssemblyState,
    closed: bool,
}

// =============================================================================
// SubscriptionEventAssembler
// =============================================================================

/// Turns value-change notifications of a fixed point set into events.
pub struct SubscriptionEventAssembler {
    labels: HashMap<String, String>,
    number_properties: usize,
    buffer: Mutex<Buffer>,
    sink: Arc<dyn EventSink>,
    counters: Counters,
}

impl SubscriptionEventAssembler {
    /// Creates an empty assembler for `points`.
    ///
    /// Labels must be unique across `points`.
    pub fn new(points: &[Point], sink: Arc<dyn EventSink>) -> Self {
        let labels: HashMap<String, String> = points
            .iter()
            .map(|p| (p.native_identifier(), p.label.clone()))
            .collect();
        Self {
            number_properties: points.len(),
            labels,
            buffer: Mutex::new(Buffer {
                event: Event::new(),
                state: AssemblyState::Empty,
                closed: false,
            }),
            sink,
            counters: Counters::default(),
        }
    }

    /// Returns the size of the subscription set.
    pub fn number_properties(&self) -> usize {
        self.number_properties
    }

    /// Returns the current state.
    pub fn state(&self) -> AssemblyState {
        self.buffer.lock().state
    }

    /// Returns a copy of the current buffer.
    pub fn snapshot(&self) -> Event {
        self.buffer.lock().event.clone()
    }

    /// Handles one notification.
    ///
    /// Returns `Ok(true)` if an event was emitted. A notification for a node
    /// outside the subscription set is a defect: it is logged, counted and
    /// returned, and the buffer is left untouched.
    pub fn on_notification(&self, native_id: &str, value: Value) -> Result<bool, AssemblyDefect> {
        let Some(label) = self.labels.get(native_id) else {
            self.counters.defects.fetch_add(1, Ordering::Relaxed);
            let defect = AssemblyDefect::unknown_point(native_id, self.number_properties);
            error!(node_id = %native_id, subscribed = self.number_properties, "{}", defect);
            return Err(defect);
        };

        let mut buffer = self.buffer.lock();
        if buffer.closed {
            self.counters.after_close.fetch_add(1, Ordering::Relaxed);
            trace!(label = %label, "Notification after close dropped");
            return Ok(false);
        }

        buffer.event.insert(label.clone(), value);
        self.counters.notifications.fetch_add(1, Ordering::Relaxed);

        if buffer.event.len() < self.number_properties {
            trace!(
                label = %label,
                reported = buffer.event.len(),
                expected = self.number_properties,
                "Buffered notification"
            );
            return Ok(false);
        }

        if buffer.state == AssemblyState::Empty {
            buffer.state = AssemblyState::Complete;
            info!(points = self.number_properties, "All points reported, emitting events");
        }

        self.sink.process(buffer.event.clone());
        self.counters.emitted.fetch_add(1, Ordering::Relaxed);
        debug!(label = %label, fields = buffer.event.len(), "Emitted event");
        Ok(true)
    }

    /// Stops emission. Notifications arriving afterwards are dropped.
    ///
    /// Waits for an emission in progress to finish.
    pub fn close(&self) {
        self.buffer.lock().closed = true;
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.buffer.lock().closed
    }

    /// Returns the counters.
    pub fn stats(&self) -> AssemblyStats {
        AssemblyStats {
            notifications: self.counters.notifications.load(Ordering::Relaxed),
            emitted: self.counters.emitted.load(Ordering::Relaxed),
            defects: self.counters.defects.load(Ordering::Relaxed),
            after_close: self.counters.after_close.load(Ordering::Relaxed),
        }
    }
}

impl NotificationHandler for SubscriptionEventAssembler {
    fn on_data_change(&self, change: DataChange) -> OpcUaResult<()> {
        let native_id = change.node_id.native_identifier();
        self.on_notification(&native_id, change.value.into())?;
        Ok(())
    }
}

impl std::fmt::Debug for SubscriptionEventAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionEventAssembler")
            .field("number_properties", &self.number_properties)
            .field("state", &self.state())
            .field("stats", &self.stats())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NodeId, OpcUaDataType};
    use connect_core::pipeline::CollectingSink;

    fn points(ids: &[&str]) -> Vec<Point> {
        ids.iter()
            .map(|id| Point::new(NodeId::string(2, *id), OpcUaDataType::Int32, 0))
            .collect()
    }

    fn assembler(ids: &[&str]) -> (SubscriptionEventAssembler, Arc<CollectingSink>) {
        let sink = Arc::new(CollectingSink::new());
        (SubscriptionEventAssembler::new(&points(ids), sink.clone()), sink)
    }

    #[test]
    fn test_scenario_coalescing() {
        let (asm, sink) = assembler(&["Line.A", "Line.B", "Line.C"]);

        assert!(!asm.on_notification("Line.A", Value::from(1)).unwrap());
        assert!(!asm.on_notification("Line.B", Value::from(2)).unwrap());
        assert!(!asm.on_notification("Line.A", Value::from(3)).unwrap());
        assert!(sink.is_empty());
        assert_eq!(asm.state(), AssemblyState::Empty);

        assert!(asm.on_notification("Line.C", Value::from(4)).unwrap());
        assert!(asm.on_notification("Line.B", Value::from(5)).unwrap());
        assert_eq!(asm.state(), AssemblyState::Complete);

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            Event::new().with_field("A", 3).with_field("B", 2).with_field("C", 4)
        );
        assert_eq!(
            events[1],
            Event::new().with_field("A", 3).with_field("B", 5).with_field("C", 4)
        );
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let (asm, sink) = assembler(&["X.A"]);
        asm.on_notification("X.A", Value::from(1)).unwrap();
        let captured = sink.events()[0].clone();

        asm.on_notification("X.A", Value::from(2)).unwrap();
        assert_eq!(captured.get("A"), Some(&Value::Int32(1)));
        assert_eq!(sink.events()[0].get("A"), Some(&Value::Int32(1)));
        assert_eq!(asm.snapshot().get("A"), Some(&Value::Int32(2)));
    }

    #[test]
    fn test_unknown_point_is_defect() {
        let (asm, sink) = assembler(&["X.A", "X.B"]);
        let err = asm.on_notification("X.Z", Value::from(1)).unwrap_err();
        assert!(matches!(err, AssemblyDefect::UnknownPoint { ref node_id, subscribed: 2 } if node_id == "X.Z"));
        assert!(asm.snapshot().is_empty());
        assert!(sink.is_empty());
        assert_eq!(asm.stats().defects, 1);
    }

    #[test]
    fn test_matching_uses_full_identifier() {
        let (asm, _sink) = assembler(&["Line1.Speed"]);
        assert!(asm.on_notification("Speed", Value::from(1)).is_err());
        assert!(asm.on_notification("Line1.Speed", Value::from(1)).is_ok());
    }

    #[test]
    fn test_no_emission_after_close() {
        let (asm, sink) = assembler(&["X.A"]);
        asm.on_notification("X.A", Value::from(1)).unwrap();
        asm.close();
        assert!(!asm.on_notification("X.A", Value::from(2)).unwrap());
        assert_eq!(sink.len(), 1);
        assert!(asm.is_closed());
        assert_eq!(asm.stats().after_close, 1);
    }

    #[test]
    fn test_data_change_handler() {
        let (asm, sink) = assembler(&["X.A"]);
        let change = DataChange::new(NodeId::string(2, "X.A"), crate::client::OpcUaValue::Double(1.5));
        asm.on_data_change(change).unwrap();
        assert_eq!(sink.events()[0].get("A"), Some(&Value::Float64(1.5)));

        let stray = DataChange::new(NodeId::string(2, "X.B"), crate::client::OpcUaValue::Null);
        assert!(asm.on_data_change(stray).is_err());
    }

    #[test]
    fn test_concurrent_distinct_labels() {
        let ids: Vec<String> = (0..8).map(|i| format!("P.L{}", i)).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let (asm, sink) = assembler(&refs);
        let asm = Arc::new(asm);

        std::thread::scope(|scope| {
            for id in &ids {
                let asm = Arc::clone(&asm);
                scope.spawn(move || {
                    for n in 0..100 {
                        asm.on_notification(id, Value::from(n)).unwrap();
                    }
                });
            }
        });

        let events = sink.events();
        assert!(!events.is_empty());
        assert!(events.iter().all(|e| e.len() == 8));
        assert_eq!(asm.snapshot().len(), 8);
        assert_eq!(asm.stats().notifications, 800);
        for label in (0..8).map(|i| format!("L{}", i)) {
            assert_eq!(asm.snapshot().get(&label), Some(&Value::Int32(99)));
        }
    }
}

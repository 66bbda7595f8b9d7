// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Value changes for the simulated demo server.
//!
//! Every tick each variable of the server moves by a small random step and
//! is written back, which fires the value-change notifications a real server
//! would send.

use std::time::Duration;

use connect_opcua::client::{OpcUaValue, SimulatedServer};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::shutdown::ShutdownSignal;

/// Random-walk driver for a [`SimulatedServer`].
pub struct ValueSimulator {
    server: SimulatedServer,
    interval: Duration,
    rng: StdRng,
}

impl ValueSimulator {
    /// Creates a simulator with an entropy-seeded generator.
    pub fn new(server: SimulatedServer, interval: Duration) -> Self {
        Self {
            server,
            interval,
            rng: StdRng::from_entropy(),
        }
    }

    /// Creates a simulator with a fixed seed.
    pub fn with_seed(server: SimulatedServer, interval: Duration, seed: u64) -> Self {
        Self {
            server,
            interval,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Moves every variable one step. Returns the number of writes.
    pub fn step(&mut self) -> usize {
        let mut writes = 0;
        for (node_id, current) in self.server.variables() {
            let next = next_value(&mut self.rng, &current);
            if next == current {
                continue;
            }
            match self.server.write_value(&node_id, next) {
                Ok(notified) => {
                    writes += 1;
                    trace!(node_id = %node_id, notified, "Simulated value change");
                }
                Err(e) => debug!(node_id = %node_id, error = %e, "Simulated write not accepted"),
            }
        }
        writes
    }

    /// Runs until `shutdown` resolves.
    pub fn spawn(mut self, shutdown: ShutdownSignal) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately; the demo server already
            // reported its initial values on subscribe.
            ticker.tick().await;

            tokio::pin!(shutdown);
            loop {
                tokio::select! {
                    _ = &mut shutdown => break,
                    _ = ticker.tick() => {
                        self.step();
                    }
                }
            }
            debug!("Value simulator stopped");
        })
    }
}

fn next_value(rng: &mut StdRng, current: &OpcUaValue) -> OpcUaValue {
    match current {
        OpcUaValue::Double(v) => OpcUaValue::Double(round2(v + rng.gen_range(-0.5..=0.5))),
        OpcUaValue::Float(v) => OpcUaValue::Float((v + rng.gen_range(-0.05f32..=0.05)).max(0.0)),
        OpcUaValue::Int32(v) => OpcUaValue::Int32(v.saturating_add(rng.gen_range(-25..=25))),
        OpcUaValue::Boolean(v) => OpcUaValue::Boolean(if rng.gen_bool(0.1) { !v } else { *v }),
        OpcUaValue::String(s) => {
            if rng.gen_bool(0.05) {
                OpcUaValue::String(if s == "OK" { "WARN".into() } else { "OK".into() })
            } else {
                OpcUaValue::String(s.clone())
            }
        }
        other => other.clone(),
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown::ShutdownCoordinator;
    use connect_opcua::NodeId;

    #[test]
    fn test_step_changes_numeric_values() {
        let server = SimulatedServer::demo();
        let speed = NodeId::string(2, "Plant.Line1.Speed");
        let before = server.value(&speed);

        let mut simulator = ValueSimulator::with_seed(server.clone(), Duration::from_millis(10), 7);
        let mut changed = false;
        for _ in 0..20 {
            simulator.step();
            if server.value(&speed) != before {
                changed = true;
                break;
            }
        }
        assert!(changed);
    }

    #[test]
    fn test_next_value_keeps_type() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(next_value(&mut rng, &OpcUaValue::Double(1.0)), OpcUaValue::Double(_)));
        assert!(matches!(next_value(&mut rng, &OpcUaValue::Int32(1)), OpcUaValue::Int32(_)));
        assert!(matches!(next_value(&mut rng, &OpcUaValue::Float(1.0)), OpcUaValue::Float(_)));
        assert_eq!(next_value(&mut rng, &OpcUaValue::Null), OpcUaValue::Null);
    }

    #[tokio::test]
    async fn test_spawn_stops_on_shutdown() {
        let coordinator = ShutdownCoordinator::new();
        let simulator = ValueSimulator::with_seed(SimulatedServer::demo(), Duration::from_millis(5), 3);
        let handle = simulator.spawn(coordinator.shutdown_signal());

        tokio::time::sleep(Duration::from_millis(20)).await;
        coordinator.trigger();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("simulator should stop")
            .unwrap();
    }
}

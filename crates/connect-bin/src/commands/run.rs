// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `run` command.

use std::sync::Arc;
use std::time::Duration;

use connect_core::EventSink;
use tracing::{info, warn};

use crate::cli::{Cli, RunArgs};
use crate::context::AppContext;
use crate::error::BinResult;
use crate::shutdown::ShutdownCoordinator;
use crate::simulate::ValueSimulator;
use crate::sink::JsonLinesSink;

/// Lower bound for the simulated change interval.
const MIN_SIMULATE_INTERVAL: Duration = Duration::from_millis(10);

/// Starts the adapter and writes events to stdout until a shutdown signal.
pub async fn run(cli: &Cli, args: RunArgs) -> BinResult<()> {
    let context = AppContext::load(cli)?;
    let mut adapter = context.create_adapter()?;

    let sink = Arc::new(JsonLinesSink::stdout());
    let events: Arc<dyn EventSink> = sink.clone();
    adapter.start(events).await?;
    info!(adapter_id = adapter.id(), simulate = cli.simulate, "Adapter started");

    let coordinator = ShutdownCoordinator::new();
    let simulator = context.simulated_server().map(|server| {
        let interval = Duration::from_millis(args.simulate_interval_ms).max(MIN_SIMULATE_INTERVAL);
        ValueSimulator::new(server.clone(), interval).spawn(coordinator.shutdown_signal())
    });

    coordinator.wait_for_shutdown().await;

    let stopped = adapter.stop().await;
    if let Some(handle) = simulator {
        if let Err(e) = handle.await {
            warn!(error = %e, "Value simulator ended abnormally");
        }
    }
    stopped?;

    info!(written = sink.written(), failed = sink.failed(), "Adapter stopped");
    Ok(())
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Graceful shutdown for `run`.
//!
//! ```text
//! SIGTERM / SIGINT ──┐
//!                    ├──▶ ShutdownCoordinator ──▶ adapter.stop()
//! trigger() ─────────┘            │
//!                                 └──▶ ShutdownSignal ──▶ value simulator
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::broadcast;
use tracing::{info, warn};

// =============================================================================
// ShutdownCoordinator
// =============================================================================

/// Fans a single shutdown request out to every waiting task.
///
/// # Example
///
/// ```ignore
/// let coordinator = ShutdownCoordinator::new();
/// let simulator = ValueSimulator::new(server, interval).spawn(coordinator.shutdown_signal());
///
/// coordinator.wait_for_shutdown().await;
/// adapter.stop().await?;
/// simulator.await?;
/// ```
#[derive(Clone)]
pub struct ShutdownCoordinator {
    notify: broadcast::Sender<()>,
    triggered: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    /// Creates a coordinator that has not been triggered.
    pub fn new() -> Self {
        let (notify, _) = broadcast::channel(1);
        Self {
            notify,
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns a future that resolves once shutdown is triggered.
    ///
    /// Signals created after the trigger resolve immediately.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        // Subscribe before reading the flag so a concurrent trigger is not lost.
        let mut receiver = self.notify.subscribe();
        let triggered = self.triggered.clone();
        ShutdownSignal {
            inner: Box::pin(async move {
                if !triggered.load(Ordering::SeqCst) {
                    let _ = receiver.recv().await;
                }
            }),
        }
    }

    /// Triggers shutdown. Only the first call notifies.
    pub fn trigger(&self) {
        if !self.triggered.swap(true, Ordering::SeqCst) {
            info!("Shutdown requested");
            let _ = self.notify.send(());
        }
    }

    /// Returns true once shutdown has been triggered.
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Waits for SIGTERM, SIGINT or a call to [`trigger`](Self::trigger),
    /// then triggers shutdown for everyone else.
    pub async fn wait_for_shutdown(&self) {
        if self.is_triggered() {
            return;
        }

        let manual = self.shutdown_signal();
        tokio::select! {
            _ = os_signal() => {}
            _ = manual => {}
        }
        self.trigger();
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
async fn os_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut term), Ok(mut int)) => {
            tokio::select! {
                _ = term.recv() => info!("Received SIGTERM"),
                _ = int.recv() => info!("Received SIGINT"),
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            warn!(error = %e, "Cannot install signal handlers, falling back to Ctrl+C");
            ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn os_signal() {
    ctrl_c().await;
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C"),
        Err(e) => {
            warn!(error = %e, "Cannot listen for Ctrl+C, only a manual trigger stops the adapter");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// ShutdownSignal
// =============================================================================

/// Resolves when shutdown is triggered.
///
/// The wait is built once and polled to completion, so a wakeup delivered
/// between polls is never lost.
pub struct ShutdownSignal {
    inner: Pin<Box<dyn Future<Output = ()> + Send>>,
}

impl Future for ShutdownSignal {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

// =============================================================================
// Tests
// =============================================================================

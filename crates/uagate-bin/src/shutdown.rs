// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Graceful shutdown coordination.
//!
//! This module coordinates graceful shutdown between the API server and
//! the session layer. It handles OS signals (SIGTERM, SIGINT) and allows
//! components to subscribe to shutdown notifications.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::broadcast;
use tracing::info;

// =============================================================================
// ShutdownCoordinator
// =============================================================================

/// Coordinates graceful shutdown across multiple components.
///
/// The coordinator provides a broadcast channel for notifying all
/// components of shutdown, signal handling for SIGTERM/SIGINT/SIGQUIT,
/// and a future that resolves when shutdown is initiated.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    sender: broadcast::Sender<()>,
    shutdown_initiated: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    /// Creates a new shutdown coordinator.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            sender,
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Subscribes to shutdown notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }

    /// Creates a future that resolves when shutdown is signaled.
    ///
    /// This is useful for passing to servers that accept a shutdown future.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            receiver: self.sender.subscribe(),
            shutdown_initiated: self.shutdown_initiated.clone(),
        }
    }

    /// Initiates shutdown, notifying all subscribers.
    pub fn initiate_shutdown(&self) {
        if self
            .shutdown_initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            info!("Shutdown initiated");
            let _ = self.sender.send(());
        }
    }

    /// Returns true if shutdown has been initiated.
    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_initiated.load(Ordering::SeqCst)
    }

    /// Waits for a shutdown signal (OS signal or manual initiation).
    pub async fn wait_for_shutdown(&self) {
        if self.shutdown_initiated.load(Ordering::SeqCst) {
            return;
        }

        let mut receiver = self.sender.subscribe();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let mut sigterm =
                signal(SignalKind::terminate()).expect("Failed to register SIGTERM handler");
            let mut sigint =
                signal(SignalKind::interrupt()).expect("Failed to register SIGINT handler");
            let mut sigquit = signal(SignalKind::quit()).expect("Failed to register SIGQUIT handler");

            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM");
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT");
                }
                _ = sigquit.recv() => {
                    info!("Received SIGQUIT");
                }
                _ = receiver.recv() => {}
            }
        }

        #[cfg(windows)]
        {
            use tokio::signal::ctrl_c;

            tokio::select! {
                result = ctrl_c() => {
                    result.expect("Failed to register Ctrl+C handler");
                    info!("Received Ctrl+C");
                }
                _ = receiver.recv() => {}
            }
        }

        if self
            .shutdown_initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let _ = self.sender.send(());
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ShutdownSignal
// =============================================================================

/// A future that resolves when shutdown is signaled.
///
/// Implements `Future` so it can be used with APIs that expect a
/// shutdown future (like axum's `with_graceful_shutdown`).
pub struct ShutdownSignal {
    receiver: broadcast::Receiver<()>,
    shutdown_initiated: Arc<AtomicBool>,
}

impl Future for ShutdownSignal {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.shutdown_initiated.load(Ordering::SeqCst) {
            return Poll::Ready(());
        }

        let this = self.get_mut();
        let mut recv_fut = Box::pin(this.receiver.recv());

        match recv_fut.as_mut().poll(cx) {
            Poll::Ready(_) => Poll::Ready(()),
            Poll::Pending => Poll::Pending,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

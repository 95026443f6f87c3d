// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Gateway runtime orchestration.
//!
//! This module provides the core runtime that wires all components:
//!
//! - Configuration loading and validation
//! - Gateway facade over the OPC UA transport seam
//! - API server with its middleware stack
//! - Graceful shutdown coordination
//!
//! The transport factory is an injection point: the runtime never picks
//! a protocol stack itself. A deployment registers its
//! [`TransportFactory`] implementation on the [`RuntimeBuilder`] before
//! starting the gateway.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use uagate_api::{ApiServer, AppState, DataSet};
use uagate_opcua::{Gateway, TransportFactory};

use crate::config::{load_config, AppConfig};
use crate::error::{BinError, BinResult};
use crate::shutdown::ShutdownCoordinator;

// =============================================================================
// GatewayRuntime
// =============================================================================

/// The main gateway runtime.
///
/// The runtime is responsible for initializing all components in the
/// correct order, running the API server, and coordinating graceful
/// shutdown.
pub struct GatewayRuntime {
    config: Arc<AppConfig>,
    transport_factory: Arc<dyn TransportFactory>,
    shutdown: ShutdownCoordinator,
}

impl GatewayRuntime {
    /// Creates a new gateway runtime.
    pub fn new(config: AppConfig, transport_factory: Arc<dyn TransportFactory>) -> Self {
        Self {
            config: Arc::new(config),
            transport_factory,
            shutdown: ShutdownCoordinator::new(),
        }
    }

    /// Returns the shutdown coordinator, for embedding deployments that
    /// drive shutdown themselves.
    pub fn shutdown_handle(&self) -> ShutdownCoordinator {
        self.shutdown.clone()
    }

    /// Runs the gateway until shutdown is signaled.
    pub async fn run(self) -> BinResult<()> {
        info!("Starting uagate v{}", crate::VERSION);

        let components = self.initialize_components()?;
        let result = self.run_main_loop(components).await;

        info!("uagate shutdown complete");
        result
    }

    /// Initializes all gateway components.
    fn initialize_components(&self) -> BinResult<GatewayComponents> {
        info!("Initializing gateway components...");

        self.config
            .client
            .validate()
            .map_err(|e| BinError::init(e.to_string()))?;

        let gateway = Arc::new(Gateway::new(
            self.transport_factory.clone(),
            self.config.client.clone(),
        ));

        let entries: Vec<DataSet> = self
            .config
            .servers
            .iter()
            .map(|server| DataSet::new(&server.url, server.use_security))
            .collect();

        let state = AppState::builder()
            .config(self.config.api.clone())
            .gateway(gateway.clone())
            .data_sets(entries)
            .build()?;

        Ok(GatewayComponents {
            gateway,
            server: ApiServer::new(state),
        })
    }

    /// Runs the API server until shutdown, then tears down sessions.
    async fn run_main_loop(&self, components: GatewayComponents) -> BinResult<()> {
        let GatewayComponents { gateway, server } = components;

        info!(
            "uagate is ready (API: {}, servers configured: {})",
            server.addr(),
            self.config.servers.len()
        );

        let signal = self.shutdown.shutdown_signal();
        let mut server_task = tokio::spawn(server.run_with_shutdown(signal));

        let server_result = tokio::select! {
            _ = self.shutdown.wait_for_shutdown() => {
                info!("Shutdown initiated, cleaning up...");
                (&mut server_task).await
            }
            // The server stopping on its own (bind failure, fatal accept
            // error) also ends the runtime.
            joined = &mut server_task => {
                self.shutdown.initiate_shutdown();
                joined
            }
        };

        gateway.disconnect_all().await;

        match server_result {
            Ok(result) => result.map_err(BinError::from),
            Err(join_error) => Err(BinError::runtime(format!(
                "API server task failed: {join_error}"
            ))),
        }
    }
}

// =============================================================================
// GatewayComponents
// =============================================================================

/// Container for the initialized components.
struct GatewayComponents {
    gateway: Arc<Gateway>,
    server: ApiServer,
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for constructing the gateway runtime.
pub struct RuntimeBuilder {
    config_path: Option<std::path::PathBuf>,
    config: Option<AppConfig>,
    port_override: Option<u16>,
    transport_factory: Option<Arc<dyn TransportFactory>>,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self {
            config_path: None,
            config: None,
            port_override: None,
            transport_factory: None,
        }
    }

    /// Sets the configuration file path.
    pub fn config_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the configuration directly.
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Overrides the API listen port from the configuration.
    pub fn port(mut self, port: Option<u16>) -> Self {
        self.port_override = port;
        self
    }

    /// Registers the protocol stack adapter the gateway connects through.
    pub fn transport_factory(mut self, factory: Arc<dyn TransportFactory>) -> Self {
        self.transport_factory = Some(factory);
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> BinResult<GatewayRuntime> {
        let mut config = match self.config {
            Some(cfg) => cfg,
            None => {
                let path = self
                    .config_path
                    .ok_or_else(|| BinError::Configuration("No configuration provided".into()))?;
                load_config(&path)?
            }
        };

        if let Some(port) = self.port_override {
            config.api.port = port;
        }

        let factory = self.transport_factory.ok_or_else(|| {
            BinError::Configuration(
                "No transport factory registered; the deployment must supply one".into(),
            )
        })?;

        Ok(GatewayRuntime::new(config, factory))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

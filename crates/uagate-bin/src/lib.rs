// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uagate-bin
//!
//! CLI binary for the uagate OPC UA gateway.
//!
//! This crate provides the main binary entry point for uagate, including:
//!
//! - CLI argument parsing with clap
//! - Gateway runtime orchestration
//! - Graceful shutdown handling
//! - Logging initialization
//! - Command implementations (run, validate, version)
//!
//! ## Usage
//!
//! ```bash
//! # Start the gateway (default command)
//! uagate
//!
//! # Start with custom config
//! uagate -c /etc/uagate/config.yaml
//!
//! # Validate configuration
//! uagate validate
//!
//! # Show version
//! uagate version
//! ```
//!
//! The runtime is wired against the [`uagate_opcua::TransportFactory`]
//! seam: a deployment registers its protocol stack adapter on the
//! [`RuntimeBuilder`] before starting the gateway.

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod shutdown;

// =============================================================================
// Re-exports
// =============================================================================

pub use cli::{Cli, Commands};
pub use config::{load_config, AppConfig, ServerEntry};
pub use error::{BinError, BinResult};
pub use logging::init_logging;
pub use runtime::{GatewayRuntime, RuntimeBuilder};
pub use shutdown::{ShutdownCoordinator, ShutdownSignal};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

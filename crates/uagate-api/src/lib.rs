// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uagate-api
//!
//! REST surface for the uagate OPC UA gateway.
//!
//! This crate exposes the orchestration layer of `uagate-opcua` over HTTP:
//! endpoint discovery, data-set routing, address-space browsing, node
//! inspection and writes, monitoring control, and a Server-Sent Events
//! stream for realtime telemetry.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod server;
pub mod state;

pub use config::{ApiConfig, CorsConfig};
pub use error::{ApiError, ApiResult};
pub use server::ApiServer;
pub use state::{AppState, DataSet, DataSets};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! API handlers for all endpoints.
//!
//! This module contains the handler implementations for all API endpoints:
//!
//! - `datasets`: endpoint discovery, routing, browsing
//! - `nodes`: node inspection and writes
//! - `monitor`: monitoring control
//! - `realtime`: Server-Sent Events telemetry stream
//! - `health`: health check endpoints

mod datasets;
mod health;
mod monitor;
mod nodes;
mod realtime;

pub use datasets::*;
pub use health::*;
pub use monitor::*;
pub use nodes::*;
pub use realtime::*;

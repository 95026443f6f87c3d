// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Health check handlers.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

// =============================================================================
// Response Types
// =============================================================================

/// Liveness response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: String,
    /// Crate version.
    pub version: String,
}

/// Readiness response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// Whether the process is ready to serve.
    pub ready: bool,
    /// Per-component status.
    pub components: Vec<ComponentStatus>,
}

/// Status of one component.
#[derive(Debug, Serialize, Deserialize)]
pub struct ComponentStatus {
    /// Component name.
    pub name: String,
    /// Health flag.
    pub healthy: bool,
    /// Optional detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
///
/// Simple liveness check. Returns 200 OK if the service is running.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
    })
}

// =============================================================================
// Readiness Check
// =============================================================================

/// GET /ready
///
/// Readiness check reporting the gateway's counters. Sessions come and go
/// with caller traffic, so the process is ready as soon as it serves.
pub async fn ready(State(state): State<AppState>) -> Json<ReadinessResponse> {
    let sessions = state.gateway.session_stats();
    let monitoring = state.gateway.monitor_stats();

    let components = vec![
        ComponentStatus {
            name: "sessions".to_string(),
            healthy: true,
            message: Some(format!(
                "{} created, {} evicted",
                sessions.created(),
                sessions.evicted()
            )),
        },
        ComponentStatus {
            name: "monitoring".to_string(),
            healthy: true,
            message: Some(format!(
                "{} subscriptions, {} items",
                monitoring.subscriptions(),
                monitoring.items_created()
            )),
        },
        ComponentStatus {
            name: "publishers".to_string(),
            healthy: true,
            message: Some(format!(
                "{} sinks, {} realtime listeners",
                state.gateway.publisher_count(),
                state.gateway.hub().listener_count()
            )),
        },
        ComponentStatus {
            name: "data_sets".to_string(),
            healthy: true,
            message: Some(format!("{} configured", state.data_sets.len().await)),
        },
    ];

    Json(ReadinessResponse {
        ready: true,
        components,
    })
}

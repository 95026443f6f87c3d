// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Monitoring control handlers.

use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::info;

use uagate_opcua::MonitorItemSpec;

use super::datasets::{active_route, ensure_available};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Message for a monitor request body that does not match the contract.
const BAD_PARAMETERS_MESSAGE: &str = "Bad parameters format.";

// =============================================================================
// Monitor
// =============================================================================

/// Request body for starting or extending monitoring.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorRequest {
    /// Server to monitor.
    pub server_url: String,
    /// Nodes to register, each with its own sampling interval and filter.
    pub monitorable_nodes: Vec<MonitorableNode>,
    /// Scheme-prefixed broker URL (`mqtt:...` or `push:...`).
    pub broker_url: String,
    /// Topic the telemetry is published under.
    pub topic: String,
}

/// One node within a monitor request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorableNode {
    /// External node id.
    pub node_id: String,
    /// Sampling interval in milliseconds.
    pub sampling_interval: u64,
    /// Deadband kind: `None`, `Absolute`, or `Percent`.
    #[serde(default = "default_dead_band")]
    pub dead_band: String,
    /// Deadband threshold for the chosen kind.
    #[serde(default)]
    pub dead_band_value: f64,
}

fn default_dead_band() -> String {
    "None".to_string()
}

/// POST /data-sets/monitor
///
/// Starts or extends monitoring for the requested nodes, forwarding
/// notifications to the broker named in the request. Responds with one
/// boolean per node reporting whether its item was created.
pub async fn monitor(
    State(state): State<AppState>,
    payload: Result<Json<MonitorRequest>, JsonRejection>,
) -> ApiResult<Json<JsonValue>> {
    let Json(request) = payload.map_err(|_| ApiError::bad_request(BAD_PARAMETERS_MESSAGE))?;
    if request.monitorable_nodes.is_empty() {
        return Err(ApiError::bad_request(BAD_PARAMETERS_MESSAGE));
    }

    ensure_available(&state, &request.server_url).await?;

    let items: Vec<MonitorItemSpec> = request
        .monitorable_nodes
        .iter()
        .map(|node| {
            MonitorItemSpec::new(
                &node.node_id,
                Duration::from_millis(node.sampling_interval),
            )
            .with_dead_band(&node.dead_band, node.dead_band_value)
        })
        .collect();

    let results = state
        .gateway
        .create_monitored_items(&request.server_url, &items, &request.broker_url, &request.topic)
        .await?;

    info!(
        url = %request.server_url,
        topic = %request.topic,
        requested = items.len(),
        created = results.iter().filter(|ok| **ok).count(),
        "monitoring request handled"
    );
    Ok(Json(json!({ "results": results })))
}

// =============================================================================
// Stop Monitor
// =============================================================================

/// Request body for stopping one publication.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopMonitorRequest {
    /// Topic of the publication to stop.
    pub topic: String,
    /// Broker URL the publication forwards to.
    pub broker_url: String,
}

/// POST /data-sets/stop-monitor
///
/// Tears down the publication for (topic, broker) on the active route.
pub async fn stop_monitor(
    State(state): State<AppState>,
    payload: Result<Json<StopMonitorRequest>, JsonRejection>,
) -> ApiResult<Json<bool>> {
    let Json(request) = payload.map_err(|_| ApiError::bad_request(BAD_PARAMETERS_MESSAGE))?;
    let entry = active_route(&state).await?;

    let removed = state
        .gateway
        .delete_monitoring(&entry.url, &request.broker_url, &request.topic)
        .await;
    if !removed {
        return Err(ApiError::bad_request(format!(
            "No active monitoring for topic {} on broker url {}",
            request.topic, request.broker_url
        )));
    }

    info!(url = %entry.url, topic = %request.topic, "monitoring stopped");
    Ok(Json(true))
}

// =============================================================================
// Tests
// =============================================================================

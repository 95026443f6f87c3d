// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Data-set handlers: endpoint discovery, routing, and tree browsing.

use axum::{extract::State, Json};
use serde::Deserialize;
use tracing::info;

use uagate_opcua::{BrowseView, EndpointSummary, NodeId, UaError};

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, DataSet};

// =============================================================================
// Guards
// =============================================================================

/// The active route, or the unavailable payload when nothing is configured.
pub(crate) async fn active_route(state: &AppState) -> ApiResult<DataSet> {
    state
        .data_sets
        .active()
        .await
        .ok_or_else(|| ApiError::from(UaError::server_unavailable("")))
}

/// Probes the server, surfacing the unavailable payload on failure.
pub(crate) async fn ensure_available(state: &AppState, url: &str) -> ApiResult<()> {
    if state.gateway.is_available(url).await {
        Ok(())
    } else {
        Err(UaError::server_unavailable(url).into())
    }
}

// =============================================================================
// Endpoint Discovery
// =============================================================================

/// Request body for endpoint discovery.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetEndpointsRequest {
    /// Discovery URL of the server.
    pub server_url: String,
}

/// POST /get-endpoints
///
/// Discovers the endpoints a server advertises, without establishing a
/// session.
pub async fn get_endpoints(
    State(state): State<AppState>,
    Json(request): Json<GetEndpointsRequest>,
) -> ApiResult<Json<Vec<EndpointSummary>>> {
    let endpoints = state.gateway.endpoints(&request.server_url).await?;
    Ok(Json(endpoints))
}

// =============================================================================
// Disconnect
// =============================================================================

/// GET /disconnect
///
/// Closes the active server's session. Idempotent; a process with no
/// configured servers still answers OK.
pub async fn disconnect(State(state): State<AppState>) -> Json<&'static str> {
    if let Some(entry) = state.data_sets.active().await {
        let closed = state.gateway.disconnect(&entry.url).await;
        info!(url = %entry.url, closed, "disconnect requested");
    }
    Json("OK")
}

// =============================================================================
// Data-Set Listing and Routing
// =============================================================================

/// GET /data-sets
///
/// The configured server list, active route first.
pub async fn list_data_sets(State(state): State<AppState>) -> Json<Vec<DataSet>> {
    Json(state.data_sets.list().await)
}

/// Request body for route selection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequest {
    /// Server URL to promote to the active route.
    pub server_url: String,
    /// Whether sessions should prefer a secured endpoint.
    #[serde(default)]
    pub use_security: bool,
}

/// POST /data-sets/route
///
/// Promotes the server to the active route, sets the security preference,
/// and returns its root view — expanded one level when the root has
/// children.
pub async fn route(
    State(state): State<AppState>,
    Json(request): Json<RouteRequest>,
) -> ApiResult<Json<BrowseView>> {
    state
        .data_sets
        .set_route(&request.server_url, request.use_security)
        .await;
    state.gateway.set_secure(request.use_security);

    ensure_available(&state, &request.server_url).await?;

    let root = state.gateway.get_root_node(&request.server_url).await?;
    let root_has_children = root.current_view.first().is_some_and(|n| n.has_children);
    if root_has_children {
        let expanded = state
            .gateway
            .get_children(&request.server_url, &NodeId::OBJECTS_FOLDER.to_external())
            .await?;
        return Ok(Json(expanded));
    }
    Ok(Json(root))
}

/// POST /data-sets/route/expand
///
/// One level of children below the node named by the posted external id,
/// on the active route.
pub async fn expand(
    State(state): State<AppState>,
    Json(node_id): Json<String>,
) -> ApiResult<Json<BrowseView>> {
    let entry = active_route(&state).await?;
    ensure_available(&state, &entry.url).await?;

    let view = state.gateway.get_children(&entry.url, &node_id).await?;
    Ok(Json(view))
}

// =============================================================================
// Tests
// =============================================================================

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Node inspection and write handlers.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde_json::{json, Map, Value as JsonValue};
use tracing::debug;

use uagate_opcua::{status, NodeDetail, NodeId};

use super::datasets::{active_route, ensure_available};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Message for a write body that does not carry a usable scalar state.
const INVALID_STATE_MESSAGE: &str = "Insert a valid state for a Variable Node.";

// =============================================================================
// Node Detail
// =============================================================================

/// GET /data-sets/nodes
///
/// Detail of the Objects folder, the default inspection target.
pub async fn node_detail_default(State(state): State<AppState>) -> ApiResult<Json<JsonValue>> {
    node_detail_inner(state, NodeId::OBJECTS_FOLDER.to_external()).await
}

/// GET /data-sets/nodes/{node_id}
///
/// Full detail of one node on the active route: presentation class, value
/// with schema and deadband capability for variables, and outgoing edges.
pub async fn node_detail(
    State(state): State<AppState>,
    Path(node_id): Path<String>,
) -> ApiResult<Json<JsonValue>> {
    node_detail_inner(state, node_id).await
}

async fn node_detail_inner(state: AppState, node_id: String) -> ApiResult<Json<JsonValue>> {
    let entry = active_route(&state).await?;
    ensure_available(&state, &entry.url).await?;

    let detail = state
        .gateway
        .node_detail(&entry.url, &node_id)
        .await
        .map_err(|err| {
            if err.status_code() == Some(status::BAD_NODE_ID_UNKNOWN) {
                ApiError::not_found(format!("Wrong ID: There is no Resource with ID {node_id}"))
            } else {
                ApiError::from(err)
            }
        })?;

    Ok(Json(detail_body(detail)))
}

/// Composes the wire body for a node detail.
///
/// Value fields appear only for variables; edges always, with the target's
/// resolved presentation class under the historical `Type` key.
fn detail_body(detail: NodeDetail) -> JsonValue {
    let mut body = Map::new();
    body.insert("node_id".into(), json!(detail.node_id));
    body.insert("name".into(), json!(detail.name));
    body.insert("type".into(), json!(detail.kind.to_string()));

    if let Some(variable) = detail.variable {
        body.insert("value".into(), variable.value.value);
        body.insert("value-schema".into(), json!(variable.value.schema));
        body.insert("status".into(), json!(variable.value.status));
        body.insert("deadBand".into(), json!(variable.dead_band.to_string()));
        body.insert(
            "minimumSamplingInterval".into(),
            json!(variable.minimum_sampling_interval),
        );
    }

    let edges: Vec<JsonValue> = detail
        .edges
        .iter()
        .map(|edge| {
            json!({
                "node-id": edge.node_id,
                "name": edge.name,
                "Type": edge.kind.to_string(),
                "relationship": edge.relationship,
            })
        })
        .collect();
    body.insert("edges".into(), JsonValue::Array(edges));

    JsonValue::Object(body)
}

// =============================================================================
// Node Write
// =============================================================================

/// POST /data-sets/nodes/{node_id}
///
/// Writes a loosely-typed scalar state to a variable on the active route.
/// Responds `true` on success; every rejection the caller can fix reads
/// as a 400.
pub async fn write_node(
    State(state): State<AppState>,
    Path(node_id): Path<String>,
    payload: Result<Json<JsonValue>, JsonRejection>,
) -> ApiResult<Json<bool>> {
    let Json(raw) = payload.map_err(|_| ApiError::bad_request(INVALID_STATE_MESSAGE))?;
    if !(raw.is_boolean() || raw.is_number() || raw.is_string()) {
        return Err(ApiError::bad_request(INVALID_STATE_MESSAGE));
    }

    let entry = active_route(&state).await?;
    let written = state.gateway.write_value(&entry.url, &node_id, &raw).await?;
    debug!(url = %entry.url, node = %node_id, "write accepted");
    Ok(Json(written))
}

// =============================================================================
// Tests
// =============================================================================

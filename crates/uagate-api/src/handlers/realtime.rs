// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Realtime telemetry stream.

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tracing::debug;

use crate::state::AppState;

// =============================================================================
// SSE Stream
// =============================================================================

/// GET /realtime
///
/// Server-Sent Events stream of monitoring notifications. Every event
/// carries the topic as its event name and the `<node id>: <value>` line
/// as its data. A listener that falls behind the hub's buffer misses the
/// lagged messages and continues with the live ones.
pub async fn realtime(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.gateway.subscribe_push();
    debug!(listeners = state.gateway.hub().listener_count(), "realtime listener attached");

    let stream = BroadcastStream::new(receiver).filter_map(|message| match message {
        Ok(push) => Some(Ok(Event::default().event(push.topic).data(push.body))),
        // Lagged receiver: skip and keep streaming.
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA session registry.
//!
//! One session is held per server URL and shared by every caller. Creation
//! is keyed and single-winner: concurrent first requests for the same URL
//! produce one connect, while requests for different URLs connect in
//! parallel. A session that fails its health probe is evicted and re-created
//! exactly once per probe.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::{UaError, UaResult};
use crate::registry::KeyedRegistry;
use crate::transport::{
    BrowseBatch, BrowseRequest, EndpointSummary, ItemNotification, MonitoredItemRequest,
    MonitoredItemResult, NodeSnapshot, TransportFactory, UaTransport, UaValue, ValueSample,
};
use crate::types::{ClientOptions, NodeId};

// =============================================================================
// UaSession
// =============================================================================

/// One established session against one server.
///
/// Thin wrapper over the transport carrying identity and creation time.
/// Clones share the underlying channel; an evicted session stays usable by
/// existing holders until their next operation fails with a session fault.
pub struct UaSession {
    /// Gateway-local session id, used in logs only.
    pub id: Uuid,

    /// The server endpoint URL the session is connected to.
    pub endpoint_url: String,

    /// Session creation time.
    pub created_at: chrono::DateTime<chrono::Utc>,

    transport: Arc<dyn UaTransport>,
}

impl UaSession {
    /// Wraps an established transport.
    pub fn new(endpoint_url: impl Into<String>, transport: Arc<dyn UaTransport>) -> Self {
        Self {
            id: Uuid::new_v4(),
            endpoint_url: endpoint_url.into(),
            created_at: chrono::Utc::now(),
            transport,
        }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &Arc<dyn UaTransport> {
        &self.transport
    }

    /// Browses references from a node.
    pub async fn browse(&self, request: &BrowseRequest) -> UaResult<BrowseBatch> {
        self.transport.browse(request).await
    }

    /// Resumes a truncated browse.
    pub async fn browse_next(&self, continuation_point: &[u8]) -> UaResult<BrowseBatch> {
        self.transport.browse_next(continuation_point).await
    }

    /// Reads a node's identity and class-specific attributes.
    pub async fn read_node(&self, node_id: &NodeId) -> UaResult<NodeSnapshot> {
        self.transport.read_node(node_id).await
    }

    /// Reads a variable's current value.
    pub async fn read_value(&self, node_id: &NodeId) -> UaResult<ValueSample> {
        self.transport.read_value(node_id).await
    }

    /// Writes a value, returning the operation status code.
    pub async fn write_value(&self, node_id: &NodeId, value: UaValue) -> UaResult<u32> {
        self.transport.write_value(node_id, value).await
    }

    /// Creates a subscription.
    pub async fn create_subscription(&self, publishing_interval: Duration) -> UaResult<u32> {
        self.transport.create_subscription(publishing_interval).await
    }

    /// Revises a subscription's publishing interval.
    pub async fn set_publishing_interval(
        &self,
        subscription_id: u32,
        publishing_interval: Duration,
    ) -> UaResult<()> {
        self.transport
            .set_publishing_interval(subscription_id, publishing_interval)
            .await
    }

    /// Adds monitored items to a subscription in one batch.
    pub async fn create_monitored_items(
        &self,
        subscription_id: u32,
        items: &[MonitoredItemRequest],
    ) -> UaResult<Vec<MonitoredItemResult>> {
        self.transport
            .create_monitored_items(subscription_id, items)
            .await
    }

    /// Removes monitored items from a subscription.
    pub async fn remove_monitored_items(
        &self,
        subscription_id: u32,
        monitored_item_ids: &[u32],
    ) -> UaResult<()> {
        self.transport
            .remove_monitored_items(subscription_id, monitored_item_ids)
            .await
    }

    /// Deletes a subscription.
    pub async fn delete_subscription(&self, subscription_id: u32) -> UaResult<()> {
        self.transport.delete_subscription(subscription_id).await
    }

    /// Subscribes to the session's notification stream.
    pub fn notifications(&self) -> broadcast::Receiver<ItemNotification> {
        self.transport.notifications()
    }

    /// Probes session health.
    pub async fn is_healthy(&self) -> bool {
        self.transport.is_healthy().await
    }

    /// Closes the session.
    pub async fn close(&self) -> UaResult<()> {
        self.transport.close().await
    }
}

impl fmt::Debug for UaSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UaSession")
            .field("id", &self.id)
            .field("endpoint_url", &self.endpoint_url)
            .finish()
    }
}

// =============================================================================
// SessionRegistry
// =============================================================================

/// Shared registry of sessions keyed by server URL.
pub struct SessionRegistry {
    factory: Arc<dyn TransportFactory>,
    options: ClientOptions,
    secure: AtomicBool,
    sessions: KeyedRegistry<String, Arc<UaSession>>,
    stats: SessionRegistryStats,
}

impl SessionRegistry {
    /// Creates a registry backed by the given transport factory.
    pub fn new(factory: Arc<dyn TransportFactory>, options: ClientOptions) -> Self {
        Self {
            factory,
            options,
            secure: AtomicBool::new(false),
            sessions: KeyedRegistry::new(),
            stats: SessionRegistryStats::new(),
        }
    }

    /// Sets the security preference applied to future connects.
    ///
    /// Sessions already established keep the mode they were created with.
    pub fn set_secure(&self, secure: bool) {
        self.secure.store(secure, Ordering::Relaxed);
    }

    /// Current security preference.
    pub fn secure(&self) -> bool {
        self.secure.load(Ordering::Relaxed)
    }

    /// Returns the session for `server_url`, connecting if none exists.
    ///
    /// The cached session is returned without a health probe; callers that
    /// need liveness first go through [`SessionRegistry::is_available`].
    pub async fn get_session(&self, server_url: &str) -> UaResult<Arc<UaSession>> {
        if server_url.is_empty() {
            return Err(UaError::server_unavailable(server_url));
        }

        let url = server_url.to_string();
        self.sessions
            .get_or_try_init(&url, || async {
                let transport = self
                    .factory
                    .connect(&url, self.secure(), &self.options)
                    .await
                    .map_err(|error| {
                        tracing::warn!(url = %url, %error, "OPC UA session creation failed");
                        match error {
                            UaError::CallerInput { .. } => error,
                            _ => UaError::server_unavailable(&url),
                        }
                    })?;

                let session = Arc::new(UaSession::new(&url, transport));
                self.stats.record_created();
                tracing::info!(
                    url = %url,
                    session_id = %session.id,
                    "OPC UA session created"
                );
                Ok(session)
            })
            .await
    }

    /// Returns whether a healthy session can be obtained for `server_url`.
    ///
    /// A cached session that fails its probe is evicted and re-created
    /// once; the outcome of that single retry is the answer. Never
    /// propagates an error.
    pub async fn is_available(&self, server_url: &str) -> bool {
        self.stats.record_probe();

        let existing = if server_url.is_empty() {
            None
        } else {
            self.sessions.get(&server_url.to_string())
        };

        if let Some(session) = existing {
            if session.is_healthy().await {
                return true;
            }

            self.stats.record_health_failure();
            tracing::warn!(
                url = %server_url,
                session_id = %session.id,
                "session failed health probe, recreating"
            );
            self.evict(server_url).await;
        }

        match self.get_session(server_url).await {
            Ok(_) => true,
            Err(error) => {
                tracing::warn!(url = %server_url, %error, "server unavailable");
                false
            }
        }
    }

    /// Drops the session for `server_url`, closing it in the background.
    ///
    /// Returns `true` when a session existed. Repeated calls return
    /// `false` and nothing else happens.
    pub async fn disconnect(&self, server_url: &str) -> bool {
        match self.sessions.remove(&server_url.to_string()) {
            Some(session) => {
                self.stats.record_evicted();
                if let Err(error) = session.close().await {
                    tracing::debug!(
                        url = %server_url,
                        session_id = %session.id,
                        %error,
                        "session close reported an error"
                    );
                }
                tracing::info!(
                    url = %server_url,
                    session_id = %session.id,
                    "OPC UA session disconnected"
                );
                true
            }
            None => false,
        }
    }

    /// Closes every session, for shutdown.
    pub async fn disconnect_all(&self) {
        for (url, session) in self.sessions.take_all() {
            self.stats.record_evicted();
            if let Err(error) = session.close().await {
                tracing::debug!(url = %url, %error, "session close reported an error");
            }
        }
    }

    /// Lists the endpoints `server_url` advertises, without keeping a
    /// session.
    pub async fn endpoints(&self, server_url: &str) -> UaResult<Vec<EndpointSummary>> {
        self.factory
            .discover_endpoints(server_url, self.options.discovery_timeout)
            .await
            .map_err(|error| {
                tracing::warn!(url = %server_url, %error, "endpoint discovery failed");
                UaError::server_unavailable(server_url)
            })
    }

    /// Number of live sessions.
    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` when a session is cached for `server_url`.
    pub fn has_session(&self, server_url: &str) -> bool {
        self.sessions.contains(&server_url.to_string())
    }

    /// Registry statistics.
    pub fn stats(&self) -> &SessionRegistryStats {
        &self.stats
    }

    async fn evict(&self, server_url: &str) {
        if let Some(stale) = self.sessions.remove(&server_url.to_string()) {
            self.stats.record_evicted();
            let _ = stale.close().await;
        }
    }
}

impl fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("active_sessions", &self.sessions.len())
            .finish()
    }
}

// =============================================================================
// SessionRegistryStats
// =============================================================================

/// Counters for session lifecycle events.
#[derive(Debug, Default)]
pub struct SessionRegistryStats {
    created: AtomicU64,
    evicted: AtomicU64,
    probes: AtomicU64,
    health_failures: AtomicU64,
}

impl SessionRegistryStats {
    /// Creates zeroed statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a session creation.
    pub fn record_created(&self) {
        self.created.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an eviction or disconnect.
    pub fn record_evicted(&self) {
        self.evicted.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an availability probe.
    pub fn record_probe(&self) {
        self.probes.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed health probe.
    pub fn record_health_failure(&self) {
        self.health_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Sessions created since start.
    pub fn created(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }

    /// Sessions evicted or disconnected since start.
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    /// Availability probes since start.
    pub fn probes(&self) -> u64 {
        self.probes.load(Ordering::Relaxed)
    }

    /// Failed health probes since start.
    pub fn health_failures(&self) -> u64 {
        self.health_failures.load(Ordering::Relaxed)
    }
}

// =============================================================================
// Tests
// =============================================================================

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The gateway facade the REST layer talks to.
//!
//! One [`Gateway`] owns the session registry, the monitoring manager, the
//! publisher registry, and the realtime hub, and exposes the handful of
//! operations the HTTP surface needs. Handlers never touch the transport
//! directly.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::sync::broadcast;
use tracing::debug;

use crate::browse::{BrowseView, TreeBrowser};
use crate::classify::TypeResolver;
use crate::conversion::{self, ExternalValue};
use crate::error::{status, UaError, UaResult, WRITE_TYPE_MISMATCH_MESSAGE};
use crate::monitor::{MonitorItemSpec, MonitorStats, MonitoringManager};
use crate::publish::{PublisherRegistry, PushHub, PushMessage};
use crate::session::{SessionRegistry, SessionRegistryStats};
use crate::transport::{EndpointSummary, NodeInfo, TransportFactory};
use crate::types::{ClientOptions, DeadbandCapability, NodeClass, NodeId};

// =============================================================================
// Node Detail
// =============================================================================

/// Presentation class of a node on the REST surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Callable method.
    Method,
    /// Value-bearing variable.
    Variable,
    /// Object whose type descends from the folder type.
    Folder,
    /// Any other object.
    Object,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Method => "method",
            Self::Variable => "variable",
            Self::Folder => "folder",
            Self::Object => "object",
        };
        f.write_str(label)
    }
}

/// Value-related detail present only for variables.
#[derive(Debug, Clone)]
pub struct VariableDetail {
    /// Current value with schema and status name.
    pub value: ExternalValue,

    /// Deadband kinds the variable supports for monitoring filters.
    pub dead_band: DeadbandCapability,

    /// Server-declared minimum sampling interval in milliseconds.
    pub minimum_sampling_interval: Option<f64>,
}

/// One outgoing reference as presented on the detail surface.
///
/// Unlike [`BrowseEdge`], the target's presentation class is already
/// resolved, so object targets read as folder or object.
#[derive(Debug, Clone)]
pub struct DetailEdge {
    /// Target external node id.
    pub node_id: String,

    /// Target display name.
    pub name: String,

    /// Presentation class of the target.
    pub kind: NodeKind,

    /// Display name of the reference type connecting the two nodes.
    pub relationship: String,
}

/// Full detail of one node, as composed for the node inspection endpoint.
#[derive(Debug, Clone)]
pub struct NodeDetail {
    /// External node id.
    pub node_id: String,

    /// Display name.
    pub name: String,

    /// Presentation class.
    pub kind: NodeKind,

    /// Present when the node is a variable.
    pub variable: Option<VariableDetail>,

    /// Outgoing hierarchical references with resolved relationship names.
    pub edges: Vec<DetailEdge>,
}

// =============================================================================
// Gateway
// =============================================================================

/// Facade over the OPC UA orchestration layer.
pub struct Gateway {
    sessions: Arc<SessionRegistry>,
    publishers: Arc<PublisherRegistry>,
    monitoring: MonitoringManager,
    hub: Arc<PushHub>,
}

impl Gateway {
    /// Builds the full orchestration stack over a transport factory.
    pub fn new(factory: Arc<dyn TransportFactory>, options: ClientOptions) -> Self {
        let hub = Arc::new(PushHub::new(options.notification_capacity));
        let sessions = Arc::new(SessionRegistry::new(factory, options));
        let publishers = Arc::new(PublisherRegistry::new(hub.clone()));
        let monitoring = MonitoringManager::new(sessions.clone(), publishers.clone());
        Self {
            sessions,
            publishers,
            monitoring,
            hub,
        }
    }

    // =========================================================================
    // Server Lifecycle
    // =========================================================================

    /// Discovers the endpoints a server advertises.
    pub async fn endpoints(&self, server_url: &str) -> UaResult<Vec<EndpointSummary>> {
        self.sessions.endpoints(server_url).await
    }

    /// Sets the security preference for future session connects.
    pub fn set_secure(&self, secure: bool) {
        self.sessions.set_secure(secure);
    }

    /// Probes server availability, recreating a dead session once.
    pub async fn is_available(&self, server_url: &str) -> bool {
        self.sessions.is_available(server_url).await
    }

    /// Closes the server's session. Idempotent.
    pub async fn disconnect(&self, server_url: &str) -> bool {
        self.sessions.disconnect(server_url).await
    }

    /// Closes every session and stops notification forwarding.
    pub async fn disconnect_all(&self) {
        self.monitoring.stop_workers();
        self.sessions.disconnect_all().await;
    }

    // =========================================================================
    // Browsing
    // =========================================================================

    /// The root view of a server's address space.
    pub async fn get_root_node(&self, server_url: &str) -> UaResult<BrowseView> {
        let session = self.sessions.get_session(server_url).await?;
        TreeBrowser::new(session).get_root().await
    }

    /// One level of children below the node named by its external id.
    pub async fn get_children(&self, server_url: &str, external_id: &str) -> UaResult<BrowseView> {
        let node_id = NodeId::from_external(external_id)?;
        let session = self.sessions.get_session(server_url).await?;
        TreeBrowser::new(session).get_children(&node_id).await
    }

    /// Full detail of one node: classification, value and deadband
    /// capability for variables, and outgoing edges.
    pub async fn node_detail(&self, server_url: &str, external_id: &str) -> UaResult<NodeDetail> {
        let node_id = NodeId::from_external(external_id)?;
        let session = self.sessions.get_session(server_url).await?;

        let snapshot = session.read_node(&node_id).await?;
        let resolver = TypeResolver::new(session.clone());

        let kind = match &snapshot.info {
            NodeInfo::Method { .. } => NodeKind::Method,
            NodeInfo::Variable { .. } => NodeKind::Variable,
            _ => {
                if resolver.is_folder(&node_id).await? {
                    NodeKind::Folder
                } else {
                    NodeKind::Object
                }
            }
        };

        let variable = if let NodeInfo::Variable {
            minimum_sampling_interval,
            ..
        } = &snapshot.info
        {
            let sample = session.read_value(&node_id).await?;
            let value = conversion::to_external_value(&sample, &snapshot);
            let dead_band = resolver.dead_band_capability(&snapshot).await?;
            Some(VariableDetail {
                value,
                dead_band,
                minimum_sampling_interval: *minimum_sampling_interval,
            })
        } else {
            None
        };

        let raw_edges = TreeBrowser::new(session).browse_edges(&node_id).await?;
        let mut edges = Vec::with_capacity(raw_edges.len());
        for edge in raw_edges {
            let kind = match edge.node_class {
                NodeClass::Method => NodeKind::Method,
                NodeClass::Variable => NodeKind::Variable,
                _ => {
                    if resolver.is_folder(&edge.target).await? {
                        NodeKind::Folder
                    } else {
                        NodeKind::Object
                    }
                }
            };
            edges.push(DetailEdge {
                node_id: edge.target.to_external(),
                name: edge.display_name,
                kind,
                relationship: edge.relationship,
            });
        }

        debug!(url = %server_url, node = %external_id, %kind, "node detail composed");
        Ok(NodeDetail {
            node_id: node_id.to_external(),
            name: snapshot.display_name,
            kind,
            variable,
            edges,
        })
    }

    // =========================================================================
    // Writing
    // =========================================================================

    /// Writes a loosely-typed scalar to a variable.
    ///
    /// The value is coerced to the variable's declared type first; the
    /// write status is then normalized so every rejection the caller can
    /// fix reads as caller input.
    pub async fn write_value(
        &self,
        server_url: &str,
        external_id: &str,
        raw: &JsonValue,
    ) -> UaResult<bool> {
        let node_id = NodeId::from_external(external_id)?;
        let session = self.sessions.get_session(server_url).await?;

        let snapshot = session.read_node(&node_id).await?;
        if !matches!(snapshot.info, NodeInfo::Variable { .. }) {
            return Err(UaError::caller_input(format!(
                "There is no Value for the Node specified by the NodeId {external_id}"
            )));
        }

        let value = conversion::to_write_value(raw, &snapshot)?;
        let write_status = session.write_value(&node_id, value).await?;

        if status::is_good(write_status) {
            debug!(url = %server_url, node = %external_id, "value written");
            return Ok(true);
        }
        if write_status == status::BAD_TYPE_MISMATCH {
            return Err(UaError::caller_input(WRITE_TYPE_MISMATCH_MESSAGE));
        }
        Err(UaError::caller_input(status::name(write_status)))
    }

    // =========================================================================
    // Monitoring
    // =========================================================================

    /// Starts or extends monitoring; see
    /// [`MonitoringManager::create_monitored_items`].
    pub async fn create_monitored_items(
        &self,
        server_url: &str,
        items: &[MonitorItemSpec],
        broker_url: &str,
        topic: &str,
    ) -> UaResult<Vec<bool>> {
        self.monitoring
            .create_monitored_items(server_url, items, broker_url, topic)
            .await
    }

    /// Stops one publication; see [`MonitoringManager::delete_monitoring`].
    pub async fn delete_monitoring(&self, server_url: &str, broker_url: &str, topic: &str) -> bool {
        self.monitoring
            .delete_monitoring(server_url, broker_url, topic)
            .await
    }

    // =========================================================================
    // Realtime
    // =========================================================================

    /// Attaches a realtime listener to the push hub.
    pub fn subscribe_push(&self) -> broadcast::Receiver<PushMessage> {
        self.hub.subscribe()
    }

    /// The process-wide realtime hub.
    pub fn hub(&self) -> &Arc<PushHub> {
        &self.hub
    }

    /// Session registry counters.
    pub fn session_stats(&self) -> &SessionRegistryStats {
        self.sessions.stats()
    }

    /// Monitoring counters.
    pub fn monitor_stats(&self) -> &MonitorStats {
        self.monitoring.stats()
    }

    /// Number of live publisher sinks.
    pub fn publisher_count(&self) -> usize {
        self.publishers.len()
    }
}

// =============================================================================
// Tests
// =============================================================================

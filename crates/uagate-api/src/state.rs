// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Application state shared across handlers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use uagate_opcua::Gateway;

use crate::config::ApiConfig;

// =============================================================================
// DataSet
// =============================================================================

/// One configured remote server as presented on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSet {
    /// Stable identifier assigned when the entry is registered.
    pub id: String,
    /// Server URL (`opc.tcp://...`).
    pub url: String,
    /// Whether sessions to this server prefer a secured endpoint.
    pub use_security: bool,
}

impl DataSet {
    /// Creates a data set entry with a fresh id.
    pub fn new(url: impl Into<String>, use_security: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            url: url.into(),
            use_security,
        }
    }
}

// =============================================================================
// DataSets
// =============================================================================

/// The configured server list.
///
/// Entry 0 is the active route: the server node and monitoring endpoints
/// operate against it. The route endpoint reorders the list, promoting the
/// requested server to the front and registering it first if unknown.
pub struct DataSets {
    entries: RwLock<Vec<DataSet>>,
}

impl DataSets {
    /// Creates the registry from the configured entries.
    pub fn new(entries: Vec<DataSet>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Snapshot of all entries, active route first.
    pub async fn list(&self) -> Vec<DataSet> {
        self.entries.read().await.clone()
    }

    /// The active route, if any server is configured.
    pub async fn active(&self) -> Option<DataSet> {
        self.entries.read().await.first().cloned()
    }

    /// Promotes the server to the active route, updating its security
    /// preference; an unknown URL is registered as a new entry.
    pub async fn set_route(&self, url: &str, use_security: bool) -> DataSet {
        let mut entries = self.entries.write().await;
        let entry = match entries.iter().position(|e| e.url == url) {
            Some(index) => {
                let mut entry = entries.remove(index);
                entry.use_security = use_security;
                entry
            }
            None => DataSet::new(url, use_security),
        };
        entries.insert(0, entry.clone());
        entry
    }

    /// Number of configured servers.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` when no server is configured.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

// =============================================================================
// AppState
// =============================================================================

/// Application state shared across all handlers.
///
/// This is the central state container that is passed to all handlers via
/// Axum's state extraction mechanism.
#[derive(Clone)]
pub struct AppState {
    /// API configuration.
    pub config: Arc<ApiConfig>,
    /// The OPC UA orchestration facade.
    pub gateway: Arc<Gateway>,
    /// Configured servers with the active route at the front.
    pub data_sets: Arc<DataSets>,
}

impl AppState {
    /// Creates a new app state builder.
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::new()
    }
}

// =============================================================================
// AppStateBuilder
// =============================================================================

/// Builder for constructing AppState.
pub struct AppStateBuilder {
    config: Option<ApiConfig>,
    gateway: Option<Arc<Gateway>>,
    data_sets: Vec<DataSet>,
}

impl AppStateBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            config: None,
            gateway: None,
            data_sets: Vec::new(),
        }
    }

    /// Sets the configuration.
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the gateway facade.
    pub fn gateway(mut self, gateway: Arc<Gateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Sets the configured server list.
    pub fn data_sets(mut self, entries: Vec<DataSet>) -> Self {
        self.data_sets = entries;
        self
    }

    /// Builds the AppState.
    pub fn build(self) -> crate::error::ApiResult<AppState> {
        let gateway = self
            .gateway
            .ok_or_else(|| crate::error::ApiError::internal("No gateway configured"))?;

        Ok(AppState {
            config: Arc::new(self.config.unwrap_or_default()),
            gateway,
            data_sets: Arc::new(DataSets::new(self.data_sets)),
        })
    }
}

impl Default for AppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

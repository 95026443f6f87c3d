// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Gateway configuration loading.
//!
//! The configuration is a single YAML document with three sections: the
//! OPC UA servers to pre-register, the REST API settings, and the
//! client options passed to the session layer.
//!
//! ```yaml
//! servers:
//!   - url: opc.tcp://plc1:4840
//!   - url: opc.tcp://plc2:4840
//!     use_security: true
//! api:
//!   host: 0.0.0.0
//!   port: 8080
//! client:
//!   discovery_timeout: 15s
//!   session_timeout: 60s
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use uagate_api::ApiConfig;
use uagate_opcua::ClientOptions;

use crate::error::{BinError, BinResult};

// =============================================================================
// AppConfig
// =============================================================================

/// Top-level gateway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Servers registered as data sets at startup, first entry active.
    pub servers: Vec<ServerEntry>,

    /// REST API settings.
    pub api: ApiConfig,

    /// Session layer options.
    pub client: ClientOptions,
}

/// One pre-registered server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerEntry {
    /// Server URL (`opc.tcp://...`).
    pub url: String,

    /// Whether sessions to this server prefer a secured endpoint.
    #[serde(default)]
    pub use_security: bool,
}

impl AppConfig {
    /// Validates the configuration, rejecting values the gateway cannot
    /// start with.
    pub fn validate(&self) -> BinResult<()> {
        for server in &self.servers {
            if server.url.trim().is_empty() {
                return Err(BinError::config("Server entry with an empty url"));
            }
        }

        self.client
            .validate()
            .map_err(|e| BinError::config(e.to_string()))?;

        Ok(())
    }

    /// Collects non-fatal findings surfaced by `uagate validate`.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.servers.is_empty() {
            warnings.push("No servers configured; data sets start empty".to_string());
        }

        for server in &self.servers {
            if !server.url.starts_with("opc.tcp://") {
                warnings.push(format!(
                    "Server url does not use the opc.tcp scheme: {}",
                    server.url
                ));
            }
        }

        warnings
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Loads and validates the configuration from a YAML file.
pub fn load_config(path: impl AsRef<Path>) -> BinResult<AppConfig> {
    let path = path.as_ref();

    let contents = std::fs::read_to_string(path).map_err(|e| {
        BinError::Configuration(format!("Failed to read {}: {}", path.display(), e))
    })?;

    let config: AppConfig = serde_yaml::from_str(&contents).map_err(|e| {
        BinError::Configuration(format!("Failed to parse {}: {}", path.display(), e))
    })?;

    config.validate()?;
    Ok(config)
}

// =============================================================================
// Tests
// =============================================================================

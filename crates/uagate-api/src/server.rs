// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! API server implementation.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

use crate::config::ApiConfig;
use crate::error::ApiResult;
use crate::handlers;
use crate::state::AppState;

// =============================================================================
// ApiServer
// =============================================================================

/// The API server.
///
/// This is the main entry point for creating and running the HTTP server.
pub struct ApiServer {
    state: AppState,
    config: Arc<ApiConfig>,
}

impl ApiServer {
    /// Creates a new API server with the given state.
    pub fn new(state: AppState) -> Self {
        let config = state.config.clone();
        Self { state, config }
    }

    /// Creates the router with all routes and middleware.
    pub fn router(&self) -> Router {
        let cors = create_cors_layer(&self.config);

        let middleware_stack = ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            .layer(TimeoutLayer::new(self.config.request_timeout))
            .layer(cors);

        Router::new()
            // Health endpoints
            .route("/health", get(handlers::health))
            .route("/ready", get(handlers::ready))
            // Server lifecycle
            .route("/get-endpoints", post(handlers::get_endpoints))
            .route("/disconnect", get(handlers::disconnect))
            // Data sets and browsing
            .route("/data-sets", get(handlers::list_data_sets))
            .route("/data-sets/route", post(handlers::route))
            .route("/data-sets/route/expand", post(handlers::expand))
            // Node inspection and writes
            .route("/data-sets/nodes", get(handlers::node_detail_default))
            .route(
                "/data-sets/nodes/{node_id}",
                get(handlers::node_detail).post(handlers::write_node),
            )
            // Monitoring
            .route("/data-sets/monitor", post(handlers::monitor))
            .route("/data-sets/stop-monitor", post(handlers::stop_monitor))
            // Realtime stream
            .route("/realtime", get(handlers::realtime))
            // Apply middleware and state
            .layer(middleware_stack)
            .with_state(self.state.clone())
    }

    /// Runs the server.
    pub async fn run(self) -> ApiResult<()> {
        self.run_with_shutdown(std::future::pending()).await
    }

    /// Runs the server with graceful shutdown.
    pub async fn run_with_shutdown(
        self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> ApiResult<()> {
        let addr = self.config.socket_addr();
        let router = self.router();

        info!("Starting API server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| crate::error::ApiError::internal(format!("Failed to bind: {}", e)))?;

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| crate::error::ApiError::internal(format!("Server error: {}", e)))?;

        info!("API server shutdown complete");

        Ok(())
    }

    /// Returns the server address.
    pub fn addr(&self) -> SocketAddr {
        self.config.socket_addr()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Creates the CORS layer from configuration.
fn create_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = &config.cors;

    let mut layer = CorsLayer::new().max_age(Duration::from_secs(cors.max_age));

    if cors.allowed_origins.contains(&"*".to_string()) {
        layer = layer.allow_origin(Any);
    } else {
        let origins: Vec<axum::http::HeaderValue> = cors
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        layer = layer.allow_origin(origins);
    }

    let methods: Vec<Method> = cors
        .allowed_methods
        .iter()
        .filter_map(|m| m.parse().ok())
        .collect();
    layer = layer.allow_methods(methods);

    if cors.allowed_headers.contains(&"*".to_string()) {
        layer = layer.allow_headers(Any);
    } else {
        layer = layer.allow_headers([header::CONTENT_TYPE, header::ACCEPT]);
    }

    layer
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use uagate_opcua::{ClientOptions, Gateway};

    mod stub {
        use std::sync::Arc;
        use std::time::Duration;

        use async_trait::async_trait;
        use uagate_opcua::{
            ClientOptions, EndpointSummary, TransportFactory, UaError, UaResult, UaTransport,
        };

        pub struct RefusingFactory;

        #[async_trait]
        impl TransportFactory for RefusingFactory {
            async fn connect(
                &self,
                endpoint_url: &str,
                _secure: bool,
                _options: &ClientOptions,
            ) -> UaResult<Arc<dyn UaTransport>> {
                Err(UaError::server_unavailable(endpoint_url))
            }

            async fn discover_endpoints(
                &self,
                server_url: &str,
                _timeout: Duration,
            ) -> UaResult<Vec<EndpointSummary>> {
                Err(UaError::server_unavailable(server_url))
            }
        }
    }

    fn test_state() -> AppState {
        let gateway = Arc::new(Gateway::new(
            Arc::new(stub::RefusingFactory),
            ClientOptions::default(),
        ));
        AppState::builder()
            .config(ApiConfig::default())
            .gateway(gateway)
            .build()
            .unwrap()
    }

    #[test]
    fn test_server_addr_follows_config() {
        let state = test_state();
        let server = ApiServer::new(state);
        assert_eq!(server.addr().port(), 8080);
    }

    #[tokio::test]
    async fn test_router_creation() {
        let server = ApiServer::new(test_state());
        let _router = server.router();
    }

    #[tokio::test]
    async fn test_cors_layer() {
        let config = ApiConfig::default();
        let _layer = create_cors_layer(&config);
    }
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA orchestration core for the uagate REST gateway.
//!
//! This crate owns everything between the HTTP surface and the protocol
//! stack: session pooling per server, address-space browsing, node
//! classification, value coercion, and subscription-based monitoring with
//! broker-agnostic telemetry forwarding.
//!
//! # Architecture
//!
//! ```text
//! Gateway
//! ├── SessionRegistry     - one live session per server URL
//! ├── TreeBrowser         - hierarchical views of the address space
//! ├── TypeResolver        - folder and deadband classification
//! ├── MonitoringManager   - subscriptions, items, notification workers
//! ├── PublisherRegistry   - one sink per (scheme, target)
//! └── PushHub             - realtime fan-out for API listeners
//! ```
//!
//! # Error Handling
//!
//! Every failure crossing the gateway boundary is a [`UaError`]:
//!
//! ```text
//! UaError
//! ├── CallerInput        - malformed ids, values, deadbands, broker URLs
//! ├── ServerUnavailable  - endpoint selection or session creation failed
//! ├── SessionFault       - dead session, recreated on the next call
//! └── Protocol           - any other stack status, surfaced raw
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use uagate_opcua::{Gateway, ClientOptions};
//!
//! let gateway = Gateway::new(factory, ClientOptions::default());
//! let view = gateway.get_root_node("opc.tcp://plc:4840").await?;
//! for node in view.current_view {
//!     println!("{} ({})", node.name, node.id);
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod browse;
pub mod classify;
pub mod conversion;
pub mod error;
pub mod gateway;
pub mod monitor;
pub mod publish;
pub mod registry;
pub mod session;
pub mod transport;
pub mod types;

// Re-export the error taxonomy
pub use error::{
    status, UaError, UaResult, MALFORMED_NODE_ID_MESSAGE, UNSUPPORTED_BROKER_MESSAGE,
    WRITE_TYPE_MISMATCH_MESSAGE,
};

// Re-export the identifier and option types
pub use types::{
    BrowseDirection, ClientOptions, DeadbandCapability, DeadbandKind, NodeClass, NodeId,
    NodeIdentifier, UaDataType,
};

// Re-export the transport seam
pub use transport::{
    BrowseBatch, BrowseRequest, DataChangeFilter, DataChangeTrigger, EndpointSummary,
    ItemNotification, MonitoredItemRequest, MonitoredItemResult, NodeInfo, NodeSnapshot,
    ReferenceDescription, TransportFactory, UaTransport, UaValue, ValueSample,
};

// Re-export sessions and registries
pub use registry::KeyedRegistry;
pub use session::{SessionRegistry, SessionRegistryStats, UaSession};

// Re-export browsing and classification
pub use browse::{BrowseEdge, BrowseView, TreeBrowser, TreeNode};
pub use classify::TypeResolver;

// Re-export value conversion
pub use conversion::{to_external_value, to_write_value, ExternalValue, ShapeRank, ValueSchema};

// Re-export monitoring and publishing
pub use monitor::{MonitorItemSpec, MonitorPublishInfo, MonitorStats, MonitoringManager};
pub use publish::{
    BrokerScheme, BrokerUrl, MqttPublisher, Publisher, PublisherRegistry, PushHub, PushMessage,
    PushPublisher,
};

// Re-export the facade
pub use gateway::{DetailEdge, Gateway, NodeDetail, NodeKind, VariableDetail};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA transport abstraction layer.
//!
//! This module defines the low-level operations the gateway needs from an
//! OPC UA stack, enabling testability and flexible backend implementations.
//! Everything above this seam (sessions, browsing, monitoring) is written
//! against [`UaTransport`] and [`TransportFactory`] only.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::UaResult;
use crate::types::{BrowseDirection, ClientOptions, DeadbandKind, NodeClass, NodeId, UaDataType};

// =============================================================================
// UaValue
// =============================================================================

/// A scalar or array value carried over the wire.
///
/// This is the transport-level value representation. Conversion to and from
/// the loose JSON used on REST surfaces lives in [`crate::conversion`].
#[derive(Debug, Clone, PartialEq)]
pub enum UaValue {
    /// Boolean value.
    Boolean(bool),
    /// Signed byte.
    SByte(i8),
    /// Unsigned byte.
    Byte(u8),
    /// 16-bit signed integer.
    Int16(i16),
    /// 16-bit unsigned integer.
    UInt16(u16),
    /// 32-bit signed integer.
    Int32(i32),
    /// 32-bit unsigned integer.
    UInt32(u32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit unsigned integer.
    UInt64(u64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit double.
    Double(f64),
    /// String value.
    String(String),
    /// Date/time value.
    DateTime(chrono::DateTime<chrono::Utc>),
    /// GUID value.
    Guid(uuid::Uuid),
    /// Byte string.
    ByteString(Vec<u8>),
    /// Array of values.
    Array(Vec<UaValue>),
    /// Null value.
    Null,
}

impl UaValue {
    /// Returns the built-in data type of a scalar value.
    pub fn data_type(&self) -> Option<UaDataType> {
        Some(match self {
            Self::Boolean(_) => UaDataType::Boolean,
            Self::SByte(_) => UaDataType::SByte,
            Self::Byte(_) => UaDataType::Byte,
            Self::Int16(_) => UaDataType::Int16,
            Self::UInt16(_) => UaDataType::UInt16,
            Self::Int32(_) => UaDataType::Int32,
            Self::UInt32(_) => UaDataType::UInt32,
            Self::Int64(_) => UaDataType::Int64,
            Self::UInt64(_) => UaDataType::UInt64,
            Self::Float(_) => UaDataType::Float,
            Self::Double(_) => UaDataType::Double,
            Self::String(_) => UaDataType::String,
            Self::DateTime(_) => UaDataType::DateTime,
            Self::Guid(_) => UaDataType::Guid,
            Self::ByteString(_) => UaDataType::ByteString,
            Self::Array(_) | Self::Null => return None,
        })
    }

    /// Returns `true` if this is a null value.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Attempts to get the value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Attempts to get the value as an i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::SByte(v) => Some(*v as i64),
            Self::Byte(v) => Some(*v as i64),
            Self::Int16(v) => Some(*v as i64),
            Self::UInt16(v) => Some(*v as i64),
            Self::Int32(v) => Some(*v as i64),
            Self::UInt32(v) => Some(*v as i64),
            Self::Int64(v) => Some(*v),
            Self::UInt64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Attempts to get the value as an f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::SByte(v) => Some(*v as f64),
            Self::Byte(v) => Some(*v as f64),
            Self::Int16(v) => Some(*v as f64),
            Self::UInt16(v) => Some(*v as f64),
            Self::Int32(v) => Some(*v as f64),
            Self::UInt32(v) => Some(*v as f64),
            Self::Int64(v) => Some(*v as f64),
            Self::UInt64(v) => Some(*v as f64),
            Self::Float(v) => Some(*v as f64),
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Attempts to get the value as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }
}

impl Default for UaValue {
    fn default() -> Self {
        Self::Null
    }
}

impl fmt::Display for UaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(v) => write!(f, "{v}"),
            Self::SByte(v) => write!(f, "{v}"),
            Self::Byte(v) => write!(f, "{v}"),
            Self::Int16(v) => write!(f, "{v}"),
            Self::UInt16(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::UInt32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::UInt64(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v}"),
            Self::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
            Self::Guid(v) => write!(f, "{v}"),
            Self::ByteString(v) => {
                let hex: String = v.iter().map(|b| format!("{b:02x}")).collect();
                write!(f, "{hex}")
            }
            Self::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Null => write!(f, "null"),
        }
    }
}

// =============================================================================
// ValueSample
// =============================================================================

/// A value read from a node, with its status and timestamps.
#[derive(Debug, Clone)]
pub struct ValueSample {
    /// The node the value was read from.
    pub node_id: NodeId,

    /// The value, absent when the read failed.
    pub value: Option<UaValue>,

    /// Status code of the read.
    pub status_code: u32,

    /// Source timestamp reported by the server.
    pub source_timestamp: Option<chrono::DateTime<chrono::Utc>>,

    /// Server timestamp reported by the server.
    pub server_timestamp: Option<chrono::DateTime<chrono::Utc>>,
}

impl ValueSample {
    /// Creates a good sample.
    pub fn good(node_id: NodeId, value: UaValue) -> Self {
        Self {
            node_id,
            value: Some(value),
            status_code: crate::error::status::GOOD,
            source_timestamp: Some(chrono::Utc::now()),
            server_timestamp: Some(chrono::Utc::now()),
        }
    }

    /// Creates a failed sample carrying only the status code.
    pub fn bad(node_id: NodeId, status_code: u32) -> Self {
        Self {
            node_id,
            value: None,
            status_code,
            source_timestamp: None,
            server_timestamp: Some(chrono::Utc::now()),
        }
    }

    /// Returns `true` if the read succeeded.
    #[inline]
    pub fn is_good(&self) -> bool {
        crate::error::status::is_good(self.status_code)
    }
}

// =============================================================================
// Browse Data
// =============================================================================

/// A browse request against a single starting node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowseRequest {
    /// Node to browse from.
    pub node_id: NodeId,

    /// Browse direction.
    #[serde(default)]
    pub direction: BrowseDirection,

    /// Reference type to follow, `None` for all references.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_type: Option<NodeId>,

    /// Include subtypes of the reference type.
    #[serde(default = "default_true")]
    pub include_subtypes: bool,

    /// Node class bit mask, 0 for all classes.
    #[serde(default)]
    pub node_class_mask: u32,

    /// Cap on references per response; the server may hand back a
    /// continuation point when the result is larger.
    #[serde(default = "default_max_references")]
    pub max_references: u32,
}

fn default_true() -> bool {
    true
}

fn default_max_references() -> u32 {
    1000
}

impl BrowseRequest {
    /// Forward browse over hierarchical references, all node classes.
    pub fn hierarchical(node_id: NodeId) -> Self {
        Self {
            node_id,
            direction: BrowseDirection::Forward,
            reference_type: Some(crate::browse::reference_types::hierarchical_references()),
            include_subtypes: true,
            node_class_mask: 0,
            max_references: default_max_references(),
        }
    }

    /// Forward browse following one exact reference type.
    pub fn forward(node_id: NodeId, reference_type: NodeId) -> Self {
        Self {
            node_id,
            direction: BrowseDirection::Forward,
            reference_type: Some(reference_type),
            include_subtypes: true,
            node_class_mask: 0,
            max_references: default_max_references(),
        }
    }

    /// Inverse browse following one exact reference type.
    pub fn inverse(node_id: NodeId, reference_type: NodeId) -> Self {
        Self {
            node_id,
            direction: BrowseDirection::Inverse,
            reference_type: Some(reference_type),
            include_subtypes: true,
            node_class_mask: 0,
            max_references: default_max_references(),
        }
    }

    /// Restricts results to the given node classes.
    pub fn with_node_classes(mut self, classes: &[NodeClass]) -> Self {
        self.node_class_mask = NodeClass::mask_of(classes);
        self
    }

    /// Caps references per response.
    pub fn with_max_references(mut self, max: u32) -> Self {
        self.max_references = max;
        self
    }
}

/// One reference returned by a browse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceDescription {
    /// Target node id.
    pub node_id: NodeId,

    /// Target browse name (namespace-qualified string form).
    pub browse_name: String,

    /// Target display name.
    pub display_name: String,

    /// Target node class.
    pub node_class: NodeClass,

    /// The reference type connecting source and target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_type: Option<NodeId>,

    /// Target type definition node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_definition: Option<NodeId>,
}

/// One page of browse results.
///
/// A populated `continuation_point` means the server truncated the result;
/// callers resume with [`UaTransport::browse_next`] until it comes back
/// `None`.
#[derive(Debug, Clone, Default)]
pub struct BrowseBatch {
    /// References in this page.
    pub references: Vec<ReferenceDescription>,

    /// Opaque resume token, `None` when the result is complete.
    pub continuation_point: Option<Vec<u8>>,
}

impl BrowseBatch {
    /// A complete batch with no continuation.
    pub fn complete(references: Vec<ReferenceDescription>) -> Self {
        Self {
            references,
            continuation_point: None,
        }
    }

    /// A truncated batch with a resume token.
    pub fn partial(references: Vec<ReferenceDescription>, continuation_point: Vec<u8>) -> Self {
        Self {
            references,
            continuation_point: Some(continuation_point),
        }
    }
}

// =============================================================================
// NodeSnapshot
// =============================================================================

/// Class-specific attributes of a node.
///
/// The four classes the gateway reasons about are modeled as a closed set;
/// anything else a server exposes (types, reference types) comes back as
/// [`NodeInfo::Other`] and is passed through untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeInfo {
    /// Variable attributes.
    Variable {
        /// Data type node id.
        data_type: NodeId,
        /// Value rank (-1 scalar, >= 1 array dimensions).
        value_rank: i32,
        /// Access level bit mask as granted to this session.
        user_access_level: u8,
        /// Minimum sampling interval in milliseconds, if declared.
        minimum_sampling_interval: Option<f64>,
        /// Whether the server historizes the variable.
        historizing: bool,
    },
    /// Object attributes.
    Object {
        /// Event notifier bit mask.
        event_notifier: u8,
    },
    /// View attributes.
    View {
        /// Event notifier bit mask.
        event_notifier: u8,
    },
    /// Method attributes.
    Method {
        /// Whether this session may call the method.
        user_executable: bool,
    },
    /// Any other node class, carried as-is.
    Other {
        /// The raw node class.
        node_class: NodeClass,
    },
}

impl NodeInfo {
    /// The node class this info describes.
    pub fn node_class(&self) -> NodeClass {
        match self {
            Self::Variable { .. } => NodeClass::Variable,
            Self::Object { .. } => NodeClass::Object,
            Self::View { .. } => NodeClass::View,
            Self::Method { .. } => NodeClass::Method,
            Self::Other { node_class } => *node_class,
        }
    }
}

/// Identity and class-specific attributes of one node, read in a single
/// round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSnapshot {
    /// The node id.
    pub node_id: NodeId,

    /// Display name.
    pub display_name: String,

    /// Browse name (namespace-qualified string form).
    pub browse_name: String,

    /// Class-specific attributes.
    pub info: NodeInfo,
}

impl NodeSnapshot {
    /// The node class.
    pub fn node_class(&self) -> NodeClass {
        self.info.node_class()
    }

    /// Data type node id for variables, `None` otherwise.
    pub fn data_type(&self) -> Option<&NodeId> {
        match &self.info {
            NodeInfo::Variable { data_type, .. } => Some(data_type),
            _ => None,
        }
    }

    /// Declared built-in kind for variables with a standard data type.
    pub fn built_in_type(&self) -> Option<UaDataType> {
        self.data_type().and_then(UaDataType::from_node_id)
    }
}

// =============================================================================
// Monitoring Data
// =============================================================================

/// Trigger condition of a data-change filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataChangeTrigger {
    /// Report on status changes only.
    Status,
    /// Report on status or value changes.
    #[default]
    StatusValue,
    /// Report on status, value, or timestamp changes.
    StatusValueTimestamp,
}

/// Data-change filter attached to a monitored item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataChangeFilter {
    /// Trigger condition.
    pub trigger: DataChangeTrigger,

    /// Deadband kind.
    pub deadband: DeadbandKind,

    /// Deadband threshold, interpreted per the kind.
    pub deadband_value: f64,
}

impl DataChangeFilter {
    /// An absolute or percent deadband filter triggering on status or value.
    pub fn deadband(kind: DeadbandKind, value: f64) -> Self {
        Self {
            trigger: DataChangeTrigger::StatusValue,
            deadband: kind,
            deadband_value: value,
        }
    }
}

/// Request to add one monitored item to a subscription.
#[derive(Debug, Clone)]
pub struct MonitoredItemRequest {
    /// Node to monitor.
    pub node_id: NodeId,

    /// Requested sampling interval.
    pub sampling_interval: Duration,

    /// Display name registered on the server-side item.
    pub display_name: Option<String>,

    /// Notification queue size on the server.
    pub queue_size: u32,

    /// Optional data-change filter.
    pub filter: Option<DataChangeFilter>,
}

impl MonitoredItemRequest {
    /// An unfiltered item with queue size 1.
    pub fn new(node_id: NodeId, sampling_interval: Duration) -> Self {
        Self {
            node_id,
            sampling_interval,
            display_name: None,
            queue_size: 1,
            filter: None,
        }
    }

    /// Sets the display name registered on the server-side item.
    pub fn named(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Attaches a data-change filter.
    pub fn with_filter(mut self, filter: DataChangeFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// Per-item outcome of a batched monitored-item creation.
#[derive(Debug, Clone)]
pub struct MonitoredItemResult {
    /// The node the item targets.
    pub node_id: NodeId,

    /// Creation status code.
    pub status_code: u32,

    /// Server-assigned item id, meaningful only when the status is good.
    pub monitored_item_id: u32,
}

impl MonitoredItemResult {
    /// Returns `true` if the item was created.
    #[inline]
    pub fn is_good(&self) -> bool {
        crate::error::status::is_good(self.status_code)
    }
}

/// One data-change notification from the server.
#[derive(Debug, Clone)]
pub struct ItemNotification {
    /// Subscription the notification belongs to.
    pub subscription_id: u32,

    /// The monitored node.
    pub node_id: NodeId,

    /// The new value.
    pub value: UaValue,

    /// Status code attached to the value.
    pub status_code: u32,

    /// Source timestamp.
    pub source_timestamp: Option<chrono::DateTime<chrono::Utc>>,
}

// =============================================================================
// EndpointSummary
// =============================================================================

/// One endpoint a server advertises during discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointSummary {
    /// Endpoint URL.
    pub endpoint_url: String,

    /// Security policy URI.
    pub security_policy_uri: String,

    /// Security mode (`None`, `Sign`, `SignAndEncrypt`).
    pub security_mode: String,

    /// Relative security strength assigned by the server.
    pub security_level: u8,
}

// =============================================================================
// UaTransport Trait
// =============================================================================

/// Abstract transport for one established OPC UA session.
///
/// Implementations own the session and secure channel. All methods take
/// `&self`; implementations serialize protocol access internally.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow concurrent access from
/// multiple tasks.
#[async_trait]
pub trait UaTransport: Send + Sync {
    // =========================================================================
    // Browse Operations
    // =========================================================================

    /// Browses references from a node, returning at most one page.
    async fn browse(&self, request: &BrowseRequest) -> UaResult<BrowseBatch>;

    /// Resumes a truncated browse with the server's continuation point.
    async fn browse_next(&self, continuation_point: &[u8]) -> UaResult<BrowseBatch>;

    // =========================================================================
    // Attribute Operations
    // =========================================================================

    /// Reads the identity and class-specific attributes of a node.
    async fn read_node(&self, node_id: &NodeId) -> UaResult<NodeSnapshot>;

    /// Reads the current value of a variable node.
    async fn read_value(&self, node_id: &NodeId) -> UaResult<ValueSample>;

    /// Writes a value to a variable node.
    ///
    /// Returns the operation status code. A bad code that the server
    /// reports per-operation (e.g. a type mismatch) comes back as `Ok`
    /// with that code; only service-level failures produce `Err`.
    async fn write_value(&self, node_id: &NodeId, value: UaValue) -> UaResult<u32>;

    // =========================================================================
    // Subscription Operations
    // =========================================================================

    /// Creates a subscription and returns its id.
    async fn create_subscription(&self, publishing_interval: Duration) -> UaResult<u32>;

    /// Revises the publishing interval of an existing subscription.
    async fn set_publishing_interval(
        &self,
        subscription_id: u32,
        publishing_interval: Duration,
    ) -> UaResult<()>;

    /// Adds monitored items to a subscription in one batch.
    ///
    /// The result vector is positionally aligned with `items`; per-item
    /// failures are carried as bad status codes, not as `Err`.
    async fn create_monitored_items(
        &self,
        subscription_id: u32,
        items: &[MonitoredItemRequest],
    ) -> UaResult<Vec<MonitoredItemResult>>;

    /// Removes monitored items from a subscription.
    async fn remove_monitored_items(
        &self,
        subscription_id: u32,
        monitored_item_ids: &[u32],
    ) -> UaResult<()>;

    /// Deletes a subscription and all of its items.
    async fn delete_subscription(&self, subscription_id: u32) -> UaResult<()>;

    /// Subscribes to the session's data-change notification stream.
    ///
    /// Every call returns a fresh receiver over the same stream.
    fn notifications(&self) -> broadcast::Receiver<ItemNotification>;

    // =========================================================================
    // Session Lifecycle
    // =========================================================================

    /// Probes session health with a lightweight server read.
    async fn is_healthy(&self) -> bool;

    /// Closes the session and releases the channel.
    async fn close(&self) -> UaResult<()>;

    /// The endpoint URL this session is connected to.
    fn endpoint_url(&self) -> &str;
}

// =============================================================================
// TransportFactory Trait
// =============================================================================

/// Creates transports and performs endpoint discovery.
///
/// The session registry is generic over this seam so tests can hand it a
/// mock factory.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    /// Discovers endpoints, connects to the best-matching one honoring
    /// the security preference, and activates a session.
    async fn connect(
        &self,
        endpoint_url: &str,
        secure: bool,
        options: &ClientOptions,
    ) -> UaResult<Arc<dyn UaTransport>>;

    /// Lists the endpoints a server advertises, without creating a session.
    async fn discover_endpoints(
        &self,
        server_url: &str,
        timeout: Duration,
    ) -> UaResult<Vec<EndpointSummary>>;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_accessors() {
        assert_eq!(UaValue::Boolean(true).as_bool(), Some(true));
        assert_eq!(UaValue::Int32(42).as_i64(), Some(42));
        assert_eq!(UaValue::Int32(42).as_f64(), Some(42.0));
        assert_eq!(UaValue::UInt64(u64::MAX).as_i64(), None);
        assert!(UaValue::Null.is_null());
        assert_eq!(UaValue::Double(1.5).data_type(), Some(UaDataType::Double));
        assert_eq!(UaValue::Array(vec![]).data_type(), None);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(UaValue::Double(21.5).to_string(), "21.5");
        assert_eq!(UaValue::String("on".into()).to_string(), "on");
        assert_eq!(
            UaValue::Array(vec![UaValue::Int32(1), UaValue::Int32(2)]).to_string(),
            "[1, 2]"
        );
        assert_eq!(UaValue::Null.to_string(), "null");
    }

    #[test]
    fn test_value_sample_status() {
        let good = ValueSample::good(NodeId::numeric(2, 1001), UaValue::Int32(7));
        assert!(good.is_good());

        let bad = ValueSample::bad(NodeId::numeric(2, 1001), crate::error::status::BAD);
        assert!(!bad.is_good());
        assert!(bad.value.is_none());
    }

    #[test]
    fn test_browse_request_builders() {
        let request = BrowseRequest::hierarchical(NodeId::OBJECTS_FOLDER)
            .with_node_classes(&[NodeClass::Object, NodeClass::Variable]);
        assert_eq!(request.direction, BrowseDirection::Forward);
        assert_eq!(request.node_class_mask, 3);
        assert!(request.include_subtypes);

        let inverse = BrowseRequest::inverse(
            NodeId::numeric(0, 61),
            crate::browse::reference_types::has_subtype(),
        );
        assert_eq!(inverse.direction, BrowseDirection::Inverse);
    }

    #[test]
    fn test_browse_batch_continuation() {
        let complete = BrowseBatch::complete(Vec::new());
        assert!(complete.continuation_point.is_none());

        let partial = BrowseBatch::partial(Vec::new(), vec![1, 2, 3]);
        assert_eq!(partial.continuation_point.as_deref(), Some(&[1, 2, 3][..]));
    }

    #[test]
    fn test_node_info_classes() {
        let variable = NodeInfo::Variable {
            data_type: NodeId::numeric(0, 11),
            value_rank: -1,
            user_access_level: 0x3,
            minimum_sampling_interval: Some(100.0),
            historizing: false,
        };
        assert_eq!(variable.node_class(), NodeClass::Variable);

        let method = NodeInfo::Method {
            user_executable: true,
        };
        assert_eq!(method.node_class(), NodeClass::Method);

        let other = NodeInfo::Other {
            node_class: NodeClass::DataType,
        };
        assert_eq!(other.node_class(), NodeClass::DataType);
    }

    #[test]
    fn test_snapshot_built_in_type() {
        let snapshot = NodeSnapshot {
            node_id: NodeId::numeric(2, 1001),
            display_name: "Speed".into(),
            browse_name: "2:Speed".into(),
            info: NodeInfo::Variable {
                data_type: NodeId::numeric(0, 11),
                value_rank: -1,
                user_access_level: 0x3,
                minimum_sampling_interval: None,
                historizing: false,
            },
        };
        assert_eq!(snapshot.built_in_type(), Some(UaDataType::Double));
        assert_eq!(snapshot.node_class(), NodeClass::Variable);
    }

    #[test]
    fn test_monitored_item_request() {
        let request = MonitoredItemRequest::new(
            NodeId::numeric(2, 1001),
            Duration::from_millis(250),
        )
        .with_filter(DataChangeFilter::deadband(DeadbandKind::Absolute, 0.5));

        assert_eq!(request.queue_size, 1);
        let filter = request.filter.unwrap();
        assert_eq!(filter.trigger, DataChangeTrigger::StatusValue);
        assert_eq!(filter.deadband, DeadbandKind::Absolute);
    }
}

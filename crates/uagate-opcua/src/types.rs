// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core OPC UA types: node identifiers, the external id codec, node
//! classes, deadband kinds, and client options.
//!
//! The external id format is the compact `"<namespaceIndex>-<identifier>"`
//! string used on every REST surface, e.g. `"2-1001"` for `ns=2;i=1001` or
//! `"3-Motor.Speed"` for `ns=3;s=Motor.Speed`. Decoding and encoding are
//! inverse over all valid external strings.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{UaError, UaResult};

// =============================================================================
// NodeId
// =============================================================================

/// An OPC UA node identifier: namespace index plus identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    /// Namespace index (0 = OPC UA standard namespace).
    pub namespace_index: u16,
    /// The identifier within the namespace.
    pub identifier: NodeIdentifier,
}

/// The identifier part of a node id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeIdentifier {
    /// Numeric identifier (most common).
    Numeric(u32),
    /// String identifier.
    String(String),
    /// GUID identifier.
    Guid(Uuid),
    /// Opaque (byte string) identifier.
    Opaque(Vec<u8>),
}

fn external_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d+)-(?:(\d+)|(\S+))$").unwrap())
}

impl NodeId {
    /// The root folder node (`ns=0;i=84`).
    pub const ROOT_FOLDER: NodeId = NodeId {
        namespace_index: 0,
        identifier: NodeIdentifier::Numeric(84),
    };

    /// The objects folder node (`ns=0;i=85`), the browse entry point.
    pub const OBJECTS_FOLDER: NodeId = NodeId {
        namespace_index: 0,
        identifier: NodeIdentifier::Numeric(85),
    };

    /// Creates a numeric node id.
    pub fn numeric(namespace_index: u16, value: u32) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Numeric(value),
        }
    }

    /// Creates a string node id.
    pub fn string(namespace_index: u16, value: impl Into<String>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::String(value.into()),
        }
    }

    /// Creates a GUID node id.
    pub fn guid(namespace_index: u16, value: Uuid) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Guid(value),
        }
    }

    /// Parses the external `"<ns>-<identifier>"` form.
    ///
    /// Group 2 (all digits) yields a numeric identifier; otherwise the
    /// token becomes a GUID identifier when it parses as a UUID and a
    /// string identifier when it does not. Anything that misses the
    /// pattern is rejected as caller input before reaching the stack.
    pub fn from_external(s: &str) -> UaResult<Self> {
        let captures = external_pattern()
            .captures(s)
            .ok_or_else(UaError::malformed_node_id)?;

        let namespace_index: u16 = captures[1]
            .parse()
            .map_err(|_| UaError::malformed_node_id())?;

        if let Some(numeric) = captures.get(2) {
            let value: u32 = numeric
                .as_str()
                .parse()
                .map_err(|_| UaError::malformed_node_id())?;
            return Ok(Self::numeric(namespace_index, value));
        }

        let token = &captures[3];
        if let Ok(guid) = Uuid::parse_str(token) {
            return Ok(Self::guid(namespace_index, guid));
        }
        Ok(Self::string(namespace_index, token))
    }

    /// Formats the external `"<ns>-<identifier>"` form.
    ///
    /// Opaque identifiers cannot be produced by [`NodeId::from_external`];
    /// they render as lowercase hex so that browse results stay printable.
    pub fn to_external(&self) -> String {
        match &self.identifier {
            NodeIdentifier::Numeric(n) => format!("{}-{}", self.namespace_index, n),
            NodeIdentifier::String(s) => format!("{}-{}", self.namespace_index, s),
            NodeIdentifier::Guid(g) => format!("{}-{}", self.namespace_index, g),
            NodeIdentifier::Opaque(bytes) => {
                let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
                format!("{}-{}", self.namespace_index, hex)
            }
        }
    }

    /// Formats the standard OPC UA string form, e.g. `ns=2;i=1001`.
    pub fn to_opc_string(&self) -> String {
        match &self.identifier {
            NodeIdentifier::Numeric(n) => format!("ns={};i={}", self.namespace_index, n),
            NodeIdentifier::String(s) => format!("ns={};s={}", self.namespace_index, s),
            NodeIdentifier::Guid(g) => format!("ns={};g={}", self.namespace_index, g),
            NodeIdentifier::Opaque(bytes) => {
                let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
                format!("ns={};b={}", self.namespace_index, hex)
            }
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_opc_string())
    }
}

impl FromStr for NodeId {
    type Err = UaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_external(s)
    }
}

// =============================================================================
// NodeClass
// =============================================================================

/// OPC UA node class bit values.
///
/// Serialized in PascalCase, matching the stack's own class names on the
/// wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
#[repr(u32)]
pub enum NodeClass {
    /// An object node.
    Object = 1,
    /// A variable node.
    Variable = 2,
    /// A method node.
    Method = 4,
    /// An object type node.
    ObjectType = 8,
    /// A variable type node.
    VariableType = 16,
    /// A reference type node.
    ReferenceType = 32,
    /// A data type node.
    DataType = 64,
    /// A view node.
    View = 128,
}

impl NodeClass {
    /// Returns the bit mask value used in browse requests.
    pub fn mask(self) -> u32 {
        self as u32
    }

    /// Combined mask for a set of node classes.
    pub fn mask_of(classes: &[NodeClass]) -> u32 {
        classes.iter().fold(0, |mask, class| mask | class.mask())
    }

    /// Lowercase label used in REST payloads.
    pub fn label(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Variable => "variable",
            Self::Method => "method",
            Self::ObjectType => "object_type",
            Self::VariableType => "variable_type",
            Self::ReferenceType => "reference_type",
            Self::DataType => "data_type",
            Self::View => "view",
        }
    }
}

impl fmt::Display for NodeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Direction of a browse request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowseDirection {
    /// Follow references from source to target.
    #[default]
    Forward,
    /// Follow references from target to source.
    Inverse,
    /// Follow references both ways.
    Both,
}

// =============================================================================
// Data Types
// =============================================================================

/// Built-in OPC UA scalar data types relevant to value coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UaDataType {
    /// Boolean (i=1).
    Boolean,
    /// Signed 8-bit integer (i=2).
    SByte,
    /// Unsigned 8-bit integer (i=3).
    Byte,
    /// Signed 16-bit integer (i=4).
    Int16,
    /// Unsigned 16-bit integer (i=5).
    UInt16,
    /// Signed 32-bit integer (i=6).
    Int32,
    /// Unsigned 32-bit integer (i=7).
    UInt32,
    /// Signed 64-bit integer (i=8).
    Int64,
    /// Unsigned 64-bit integer (i=9).
    UInt64,
    /// 32-bit float (i=10).
    Float,
    /// 64-bit float (i=11).
    Double,
    /// UTF-8 string (i=12).
    String,
    /// Timestamp (i=13).
    DateTime,
    /// GUID (i=14).
    Guid,
    /// Byte string (i=15).
    ByteString,
}

impl UaDataType {
    /// Resolves a standard-namespace data type node id to a built-in kind.
    pub fn from_node_id(node_id: &NodeId) -> Option<Self> {
        if node_id.namespace_index != 0 {
            return None;
        }
        let NodeIdentifier::Numeric(id) = node_id.identifier else {
            return None;
        };
        Self::from_type_id(id)
    }

    /// Resolves a standard-namespace numeric type id to a built-in kind.
    pub fn from_type_id(id: u32) -> Option<Self> {
        Some(match id {
            1 => Self::Boolean,
            2 => Self::SByte,
            3 => Self::Byte,
            4 => Self::Int16,
            5 => Self::UInt16,
            6 => Self::Int32,
            7 => Self::UInt32,
            8 => Self::Int64,
            9 => Self::UInt64,
            10 => Self::Float,
            11 => Self::Double,
            12 => Self::String,
            13 => Self::DateTime,
            14 => Self::Guid,
            15 => Self::ByteString,
            _ => return None,
        })
    }

    /// The standard-namespace numeric type id.
    pub fn type_id(self) -> u32 {
        match self {
            Self::Boolean => 1,
            Self::SByte => 2,
            Self::Byte => 3,
            Self::Int16 => 4,
            Self::UInt16 => 5,
            Self::Int32 => 6,
            Self::UInt32 => 7,
            Self::Int64 => 8,
            Self::UInt64 => 9,
            Self::Float => 10,
            Self::Double => 11,
            Self::String => 12,
            Self::DateTime => 13,
            Self::Guid => 14,
            Self::ByteString => 15,
        }
    }

    /// Type name as reported in value shape descriptors.
    pub fn name(self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::SByte => "SByte",
            Self::Byte => "Byte",
            Self::Int16 => "Int16",
            Self::UInt16 => "UInt16",
            Self::Int32 => "Int32",
            Self::UInt32 => "UInt32",
            Self::Int64 => "Int64",
            Self::UInt64 => "UInt64",
            Self::Float => "Float",
            Self::Double => "Double",
            Self::String => "String",
            Self::DateTime => "DateTime",
            Self::Guid => "Guid",
            Self::ByteString => "ByteString",
        }
    }

    /// Returns `true` for integer and floating-point kinds.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::SByte
                | Self::Byte
                | Self::Int16
                | Self::UInt16
                | Self::Int32
                | Self::UInt32
                | Self::Int64
                | Self::UInt64
                | Self::Float
                | Self::Double
        )
    }
}

// =============================================================================
// Deadband
// =============================================================================

/// Deadband filter kind requested for a monitored item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeadbandKind {
    /// No filtering.
    #[default]
    None,
    /// Absolute threshold.
    Absolute,
    /// Percent-of-range threshold.
    Percent,
}

impl DeadbandKind {
    /// Parses the wire-level deadband string (`"Absolute"`, `"Percent"`,
    /// `"None"`; case-sensitive, matching the REST contract).
    pub fn parse(s: &str) -> UaResult<Self> {
        match s {
            "None" => Ok(Self::None),
            "Absolute" => Ok(Self::Absolute),
            "Percent" => Ok(Self::Percent),
            other => Err(UaError::caller_input(format!(
                "Value not allowed for DeadBand parameter. Found '{other}'"
            ))),
        }
    }

    /// Numeric deadband type used in data-change filters.
    pub fn filter_value(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Absolute => 1,
            Self::Percent => 2,
        }
    }
}

impl fmt::Display for DeadbandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Absolute => write!(f, "Absolute"),
            Self::Percent => write!(f, "Percent"),
        }
    }
}

/// Deadband capability derived for a variable from its type hierarchy and
/// range properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadbandCapability {
    /// Neither absolute nor percent deadbands apply.
    None,
    /// Numeric type: absolute deadband supported.
    Absolute,
    /// Range-bounded: percent deadband supported.
    Percent,
    /// Numeric and range-bounded: both kinds supported.
    AbsolutePercent,
}

impl DeadbandCapability {
    /// Combines the two independent capability probes.
    pub fn from_probes(absolute: bool, percent: bool) -> Self {
        match (absolute, percent) {
            (true, true) => Self::AbsolutePercent,
            (true, false) => Self::Absolute,
            (false, true) => Self::Percent,
            (false, false) => Self::None,
        }
    }

    /// Returns `true` when absolute deadbands are supported.
    pub fn supports_absolute(self) -> bool {
        matches!(self, Self::Absolute | Self::AbsolutePercent)
    }

    /// Returns `true` when percent deadbands are supported.
    pub fn supports_percent(self) -> bool {
        matches!(self, Self::Percent | Self::AbsolutePercent)
    }
}

impl fmt::Display for DeadbandCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Absolute => write!(f, "Absolute"),
            Self::Percent => write!(f, "Percentage"),
            Self::AbsolutePercent => write!(f, "Absolute, Percentage"),
        }
    }
}

// =============================================================================
// ClientOptions
// =============================================================================

/// Options governing session establishment and subscriptions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientOptions {
    /// Bound on endpoint discovery when creating a session.
    #[serde(with = "humantime_serde", default = "default_discovery_timeout")]
    pub discovery_timeout: Duration,

    /// Requested session lifetime.
    #[serde(with = "humantime_serde", default = "default_session_timeout")]
    pub session_timeout: Duration,

    /// Capacity of the per-session notification channel.
    #[serde(default = "default_notification_capacity")]
    pub notification_capacity: usize,
}

fn default_discovery_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_session_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_notification_capacity() -> usize {
    1024
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            discovery_timeout: default_discovery_timeout(),
            session_timeout: default_session_timeout(),
            notification_capacity: default_notification_capacity(),
        }
    }
}

impl ClientOptions {
    /// Validates option values.
    pub fn validate(&self) -> UaResult<()> {
        if self.discovery_timeout.is_zero() {
            return Err(UaError::caller_input("discovery_timeout must be non-zero"));
        }
        if self.notification_capacity == 0 {
            return Err(UaError::caller_input(
                "notification_capacity must be non-zero",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error taxonomy for the OPC UA orchestration layer.
//!
//! Every failure crossing the gateway boundary falls into one of four
//! classes, each with a fixed HTTP mapping applied by the API crate:
//!
//! ```text
//! UaError
//! ├── CallerInput        → 400 (malformed id, bad deadband kind, bad value)
//! ├── ServerUnavailable  → 500, names the unreachable server
//! ├── SessionFault       → 500 "Connection Lost", recoverable on next call
//! └── Protocol           → raw status surfaced (404/400 for node-id codes)
//! ```

use thiserror::Error;

/// Result type alias for gateway operations.
pub type UaResult<T> = Result<T, UaError>;

// =============================================================================
// Status Codes
// =============================================================================

/// OPC UA status codes and helpers, as delivered by the transport layer.
pub mod status {
    /// Operation succeeded.
    pub const GOOD: u32 = 0x0000_0000;

    /// Session id is not valid on this server.
    pub const BAD_SESSION_ID_INVALID: u32 = 0x8029_0000;
    /// Session was closed by the client or timed out.
    pub const BAD_SESSION_CLOSED: u32 = 0x802A_0000;
    /// Session has not been activated.
    pub const BAD_SESSION_NOT_ACTIVATED: u32 = 0x802B_0000;
    /// Subscription id is not valid.
    pub const BAD_SUBSCRIPTION_ID_INVALID: u32 = 0x802C_0000;
    /// Node id refers to a node that does not exist.
    pub const BAD_NODE_ID_UNKNOWN: u32 = 0x8062_0000;
    /// Node id syntax is not valid.
    pub const BAD_NODE_ID_INVALID: u32 = 0x8061_0000;
    /// Attribute is not readable on this node.
    pub const BAD_NOT_READABLE: u32 = 0x8068_0000;
    /// Attribute is not writable on this node.
    pub const BAD_NOT_WRITABLE: u32 = 0x8069_0000;
    /// Monitored item filter is not supported by the server.
    pub const BAD_MONITORED_ITEM_FILTER_UNSUPPORTED: u32 = 0x8072_0000;
    /// Filters are not allowed for this attribute.
    pub const BAD_FILTER_NOT_ALLOWED: u32 = 0x8073_0000;
    /// Continuation point is no longer valid.
    pub const BAD_CONTINUATION_POINT_INVALID: u32 = 0x807D_0000;
    /// Server has no continuation points left.
    pub const BAD_NO_CONTINUATION_POINTS: u32 = 0x807E_0000;
    /// Server cannot accept more sessions.
    pub const BAD_TOO_MANY_SESSIONS: u32 = 0x808A_0000;
    /// Value supplied does not match the attribute's data type.
    pub const BAD_TYPE_MISMATCH: u32 = 0x80AB_0000;
    /// Request timed out.
    pub const BAD_TIMEOUT: u32 = 0x800C_0000;
    /// Communication with the server failed.
    pub const BAD_COMMUNICATION_ERROR: u32 = 0x8005_0000;
    /// Server is not connected.
    pub const BAD_SERVER_NOT_CONNECTED: u32 = 0x800F_0000;
    /// Unspecified failure.
    pub const BAD: u32 = 0x8000_0000;

    /// Returns `true` for a good (success) status.
    pub fn is_good(code: u32) -> bool {
        code & 0xC000_0000 == 0
    }

    /// Returns `true` for a bad (failure) status.
    pub fn is_bad(code: u32) -> bool {
        code & 0x8000_0000 != 0
    }

    /// Returns `true` for an uncertain status.
    pub fn is_uncertain(code: u32) -> bool {
        code & 0x4000_0000 != 0
    }

    /// Returns `true` when the status indicates a dead or unusable session.
    pub fn is_session_fault(code: u32) -> bool {
        matches!(
            code,
            BAD_SESSION_ID_INVALID
                | BAD_SESSION_CLOSED
                | BAD_SESSION_NOT_ACTIVATED
                | BAD_TOO_MANY_SESSIONS
        )
    }

    /// Human-readable name for a status code.
    pub fn name(code: u32) -> &'static str {
        match code {
            GOOD => "Good",
            BAD => "Bad",
            BAD_COMMUNICATION_ERROR => "BadCommunicationError",
            BAD_TIMEOUT => "BadTimeout",
            BAD_SERVER_NOT_CONNECTED => "BadServerNotConnected",
            BAD_SESSION_ID_INVALID => "BadSessionIdInvalid",
            BAD_SESSION_CLOSED => "BadSessionClosed",
            BAD_SESSION_NOT_ACTIVATED => "BadSessionNotActivated",
            BAD_SUBSCRIPTION_ID_INVALID => "BadSubscriptionIdInvalid",
            BAD_NODE_ID_INVALID => "BadNodeIdInvalid",
            BAD_NODE_ID_UNKNOWN => "BadNodeIdUnknown",
            BAD_NOT_READABLE => "BadNotReadable",
            BAD_NOT_WRITABLE => "BadNotWritable",
            BAD_MONITORED_ITEM_FILTER_UNSUPPORTED => "BadMonitoredItemFilterUnsupported",
            BAD_FILTER_NOT_ALLOWED => "BadFilterNotAllowed",
            BAD_CONTINUATION_POINT_INVALID => "BadContinuationPointInvalid",
            BAD_NO_CONTINUATION_POINTS => "BadNoContinuationPoints",
            BAD_TOO_MANY_SESSIONS => "BadTooManySessions",
            BAD_TYPE_MISMATCH => "BadTypeMismatch",
            _ => "Unknown",
        }
    }
}

// =============================================================================
// UaError
// =============================================================================

/// Message for an external node id that does not match the platform grammar.
pub const MALFORMED_NODE_ID_MESSAGE: &str =
    "Wrong Type Error: String is not formatted as expected (number-yyy where yyy can be string or number or guid)";

/// Message for a write rejected by the server with a type mismatch status.
pub const WRITE_TYPE_MISMATCH_MESSAGE: &str =
    "Wrong Type Error: data sent are not of the type expected. Check your data and try again";

/// Message for a broker URL whose scheme is not a supported telemetry
/// protocol.
pub const UNSUPPORTED_BROKER_MESSAGE: &str =
    "Telemetry protocol provided in the broker url is not supported by the platform.";

/// Errors produced by the orchestration layer.
#[derive(Debug, Clone, Error)]
pub enum UaError {
    /// The caller supplied unusable input (malformed node id, unsupported
    /// deadband kind or broker scheme, value incompatible with the target
    /// type). Maps to a 400-class response with the message verbatim.
    #[error("{message}")]
    CallerInput {
        /// Human-readable description of what was wrong with the input.
        message: String,
    },

    /// Endpoint selection or session creation failed for a server.
    #[error("Data Set For {url} NotAvailable")]
    ServerUnavailable {
        /// The server URL that could not be reached.
        url: String,
    },

    /// The session backing the call is invalid, closed, not activated, or
    /// the server refused another session. The registry recreates the
    /// session on the next call; the current request reports a lost
    /// connection.
    #[error("Connection Lost")]
    SessionFault {
        /// The session-class status code reported by the stack.
        status_code: u32,
    },

    /// Any other stack status, surfaced with its raw status message.
    #[error("{message}")]
    Protocol {
        /// The status code reported by the stack.
        status_code: u32,
        /// The status name or server-provided diagnostic.
        message: String,
    },
}

impl UaError {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Creates a caller-input error.
    pub fn caller_input(message: impl Into<String>) -> Self {
        Self::CallerInput {
            message: message.into(),
        }
    }

    /// Creates a caller-input error for a malformed external node id.
    pub fn malformed_node_id() -> Self {
        Self::caller_input(MALFORMED_NODE_ID_MESSAGE)
    }

    /// Creates a server-unavailable error.
    pub fn server_unavailable(url: impl Into<String>) -> Self {
        Self::ServerUnavailable { url: url.into() }
    }

    /// Classifies a bad status code from the transport into the taxonomy.
    ///
    /// Session-class codes become [`UaError::SessionFault`]; everything else
    /// is carried as [`UaError::Protocol`] with its status name, preserving
    /// the code for the HTTP layer's node-id and type-mismatch mappings.
    pub fn from_status(status_code: u32) -> Self {
        if status::is_session_fault(status_code) {
            Self::SessionFault { status_code }
        } else {
            Self::Protocol {
                status_code,
                message: status::name(status_code).to_string(),
            }
        }
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Returns the stack status code carried by this error, if any.
    pub fn status_code(&self) -> Option<u32> {
        match self {
            Self::CallerInput { .. } | Self::ServerUnavailable { .. } => None,
            Self::SessionFault { status_code } | Self::Protocol { status_code, .. } => {
                Some(*status_code)
            }
        }
    }

    /// Returns `true` when the error reflects bad caller input.
    pub fn is_caller_input(&self) -> bool {
        matches!(self, Self::CallerInput { .. })
    }

    /// Returns `true` when the error is cleared by recreating the session.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::SessionFault { .. })
    }
}

// =============================================================================
// Tests
// =============================================================================

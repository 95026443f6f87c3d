// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! API error types and handling.
//!
//! [`ApiError`] carries the wire message and HTTP status for every failing
//! request. Gateway errors convert through the taxonomy mapping: caller
//! input becomes 400, an unreachable server or a dead session becomes 500,
//! and protocol statuses keep their raw message, with the two node-id
//! codes mapped to 404 and 400.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use uagate_opcua::{status, UaError};

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// ApiError
// =============================================================================

/// API error type with HTTP status code mapping.
///
/// This error type is designed to be returned from handlers and
/// automatically converted to the JSON error envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404).
    #[error("{message}")]
    NotFound {
        /// Wire message, already phrased for the caller.
        message: String,
    },

    /// Bad request (400).
    #[error("{message}")]
    BadRequest {
        /// Wire message, already phrased for the caller.
        message: String,
    },

    /// The session backing the request died mid-call (500).
    #[error("Connection Lost")]
    ConnectionLost,

    /// Endpoint selection or session creation failed for a server (500).
    #[error("{message}")]
    Unavailable {
        /// Wire message naming the unreachable server.
        message: String,
    },

    /// Any other protocol status, surfaced raw (500).
    #[error("{message}")]
    Protocol {
        /// The status name reported by the stack.
        message: String,
    },

    /// Internal server error (500).
    #[error("Internal error: {message}")]
    Internal {
        /// Error message (for logging, not user-facing).
        message: String,
    },
}

impl ApiError {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Creates a server-unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::ConnectionLost
            | ApiError::Unavailable { .. }
            | ApiError::Protocol { .. }
            | ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code for categorization.
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound { .. } => "NOT_FOUND",
            ApiError::BadRequest { .. } => "BAD_REQUEST",
            ApiError::ConnectionLost => "CONNECTION_LOST",
            ApiError::Unavailable { .. } => "SERVER_UNAVAILABLE",
            ApiError::Protocol { .. } => "PROTOCOL_ERROR",
            ApiError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Returns `true` if this error should be logged at error level.
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

// =============================================================================
// UaError Mapping
// =============================================================================

impl From<UaError> for ApiError {
    fn from(err: UaError) -> Self {
        match &err {
            UaError::CallerInput { .. } => ApiError::bad_request(err.to_string()),
            UaError::ServerUnavailable { .. } => ApiError::unavailable(err.to_string()),
            UaError::SessionFault { .. } => ApiError::ConnectionLost,
            UaError::Protocol { status_code, .. } => match *status_code {
                status::BAD_NODE_ID_UNKNOWN => ApiError::not_found(err.to_string()),
                status::BAD_NODE_ID_INVALID => ApiError::bad_request("Provided ID is invalid"),
                _ => ApiError::protocol(err.to_string()),
            },
        }
    }
}

// =============================================================================
// IntoResponse Implementation
// =============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        if self.is_server_error() {
            tracing::error!(
                error = %self,
                error_code = error_code,
                status = %status,
                "Server error occurred"
            );
        } else {
            tracing::debug!(
                error = %self,
                error_code = error_code,
                status = %status,
                "Client error occurred"
            );
        }

        let body = ErrorResponseBody {
            error: ErrorDetails {
                code: error_code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Error Response Body
// =============================================================================

/// Error response body structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponseBody {
    /// Error details.
    pub error: ErrorDetails,
}

/// Error details within the response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            ApiError::not_found("missing").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::bad_request("invalid").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::ConnectionLost.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::unavailable("down").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::internal("crash").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_caller_input_maps_to_bad_request() {
        let err = ApiError::from(UaError::malformed_node_id());
        assert!(matches!(err, ApiError::BadRequest { .. }));
        assert!(err.to_string().contains("number-yyy"));
    }

    #[test]
    fn test_server_unavailable_keeps_wire_message() {
        let err = ApiError::from(UaError::server_unavailable("opc.tcp://plc:4840"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.to_string(),
            "Data Set For opc.tcp://plc:4840 NotAvailable"
        );
    }

    #[test]
    fn test_session_fault_reads_as_connection_lost() {
        let err = ApiError::from(UaError::from_status(status::BAD_SESSION_CLOSED));
        assert!(matches!(err, ApiError::ConnectionLost));
        assert_eq!(err.to_string(), "Connection Lost");
    }

    #[test]
    fn test_unknown_node_id_maps_to_not_found() {
        let err = ApiError::from(UaError::from_status(status::BAD_NODE_ID_UNKNOWN));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_invalid_node_id_maps_to_bad_request() {
        let err = ApiError::from(UaError::from_status(status::BAD_NODE_ID_INVALID));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Provided ID is invalid");
    }

    #[test]
    fn test_other_protocol_status_surfaces_its_name() {
        let err = ApiError::from(UaError::from_status(status::BAD_NOT_WRITABLE));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "BadNotWritable");
    }
}

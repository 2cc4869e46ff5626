//! API request and response types.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::protocol::SessionPointer;
use crate::session::{Status, Token};

/// Response for session creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionResponse {
    /// What the requestor hands to the holder, e.g. as a QR code.
    pub session_ptr: SessionPointer,
    /// Token for the requestor endpoints.
    pub token: Token,
}

/// Response for a session status query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub token: Token,
    pub status: Status,
}

/// Generic API error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "SESSION_UNKNOWN").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn session_unknown(token: &str) -> Self {
        Self::new("SESSION_UNKNOWN", format!("Session '{}' not found", token))
    }

    pub fn session_finished(token: &str) -> Self {
        Self::new(
            "SESSION_FINISHED",
            format!("Session '{}' has already finished", token),
        )
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    /// Map a crate error onto a status code and response body.
    pub fn from_error(err: &SessionError) -> (StatusCode, Self) {
        match err {
            SessionError::SessionUnknown(token) | SessionError::InvalidToken(token) => {
                (StatusCode::NOT_FOUND, Self::session_unknown(token))
            }
            SessionError::SessionFinished(token) => {
                (StatusCode::CONFLICT, Self::session_finished(token))
            }
            SessionError::InvalidRequest(_) => (
                StatusCode::BAD_REQUEST,
                Self::bad_request("Invalid session request").with_details(err.to_string()),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Self::internal_error(err.to_string()),
            ),
        }
    }
}

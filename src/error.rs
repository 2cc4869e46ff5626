//! Error types for credential-session.

use std::fmt;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for credential-session operations.
#[derive(Error, Debug)]
pub enum SessionError {
    /// No session is registered under the given token.
    #[error("unknown session: {0}")]
    SessionUnknown(String),

    /// Session has already reached a terminal state.
    #[error("session already finished: {0}")]
    SessionFinished(String),

    /// The requestor request is structurally invalid.
    #[error("invalid session request: {0}")]
    InvalidRequest(String),

    /// A session with this token is already registered.
    #[error("session already exists: {0}")]
    SessionExists(String),

    /// Invalid state transition attempted.
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        from: crate::session::Status,
        to: crate::session::Status,
    },

    /// Session token has an invalid format.
    #[error("invalid session token: {0}")]
    InvalidToken(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,

    /// Configuration is unusable.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience Result type for credential-session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Kinds of errors reported to holders over the protocol endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Path does not match the protocol grammar.
    UnsupportedPath,
    /// No session exists for the token.
    SessionUnknown,
    /// Session is in a terminal state.
    SessionFinished,
    /// Payload or headers could not be parsed or failed structural checks.
    MalformedInput,
    /// Method, sub-resource, action or state do not fit together.
    InvalidRequest,
    /// No overlap between client and server protocol versions.
    VersionMismatch,
    /// The credential engine rejected the proofs or signature.
    VerificationFailed,
    /// Unexpected server-side failure.
    Internal,
}

impl ErrorKind {
    /// HTTP status code sent along with this kind.
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::UnsupportedPath => StatusCode::NOT_IMPLEMENTED,
            ErrorKind::InvalidRequest => StatusCode::METHOD_NOT_ALLOWED,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::SessionUnknown
            | ErrorKind::SessionFinished
            | ErrorKind::MalformedInput
            | ErrorKind::VersionMismatch
            | ErrorKind::VerificationFailed => StatusCode::BAD_REQUEST,
        }
    }

    /// Human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorKind::UnsupportedPath => "Unsupported by this server",
            ErrorKind::SessionUnknown => "Unknown or expired session",
            ErrorKind::SessionFinished => "Session is already finished",
            ErrorKind::MalformedInput => "Input could not be parsed",
            ErrorKind::InvalidRequest => "Invalid HTTP request",
            ErrorKind::VersionMismatch => "Protocol version negotiation failed",
            ErrorKind::VerificationFailed => "Invalid proofs or signature",
            ErrorKind::Internal => "Internal server error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Reuse the wire name so logs and responses agree.
        match serde_json::to_value(self) {
            Ok(serde_json::Value::String(name)) => f.write_str(&name),
            _ => write!(f, "{:?}", self),
        }
    }
}

/// Error envelope returned to the holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
    /// HTTP status code.
    pub status: u16,
    /// Error kind.
    pub error: ErrorKind,
    /// Fixed description of the kind.
    pub description: String,
    /// Additional detail, if any.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status: kind.status().as_u16(),
            error: kind,
            description: kind.description().to_string(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error
    }

    /// Status code as an HTTP type.
    pub fn status_code(&self) -> StatusCode {
        self.error.status()
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}: {}", self.error, self.description)
        } else {
            write!(f, "{}: {} ({})", self.error, self.description, self.message)
        }
    }
}

impl std::error::Error for RemoteError {}

impl From<SessionError> for RemoteError {
    fn from(err: SessionError) -> Self {
        let kind = match &err {
            SessionError::SessionUnknown(_) | SessionError::InvalidToken(_) => {
                ErrorKind::SessionUnknown
            }
            SessionError::SessionFinished(_) => ErrorKind::SessionFinished,
            SessionError::InvalidRequest(_) | SessionError::InvalidStateTransition { .. } => {
                ErrorKind::InvalidRequest
            }
            SessionError::SessionExists(_)
            | SessionError::Io(_)
            | SessionError::LockPoisoned
            | SessionError::Config(_) => ErrorKind::Internal,
        };
        RemoteError::new(kind, err.to_string())
    }
}

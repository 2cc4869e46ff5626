//! Protocol message routing.
//!
//! Maps `(path, method, headers, body)` onto session handler operations.
//! The router never binds a socket; the transport hands it already-extracted
//! request parts and relays the [`ProtocolResponse`].

use std::sync::Arc;

use axum::http::{HeaderMap, Method, StatusCode};
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::error::{ErrorKind, RemoteError};
use crate::protocol::{
    decode_validated, Action, Disclosure, IssueCommitmentMessage, ProtocolVersion, SessionResult,
    SignedMessage, MAX_VERSION_HEADER, MIN_VERSION_HEADER,
};
use crate::session::{LockedSession, SessionStore, Token};

/// Sub-resource addressed below a session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// The session itself (`{token}`).
    Session,
    Commitments,
    Proofs,
    Status,
    StatusEvents,
}

impl Resource {
    fn from_noun(noun: &str) -> Option<Self> {
        match noun {
            "" => Some(Resource::Session),
            "commitments" => Some(Resource::Commitments),
            "proofs" => Some(Resource::Proofs),
            "status" => Some(Resource::Status),
            "statusevents" => Some(Resource::StatusEvents),
            _ => None,
        }
    }
}

/// Outcome of routing one protocol message.
#[derive(Debug, Clone)]
pub struct ProtocolResponse {
    pub status: StatusCode,
    /// Serialized JSON payload or error envelope; empty for bodiless replies.
    pub body: Vec<u8>,
    /// Present only when this request moved the session to a new status
    /// that carries a result.
    pub result: Option<SessionResult>,
}

impl ProtocolResponse {
    fn error(err: RemoteError) -> Self {
        let (status, body) = error_body(err);
        Self {
            status,
            body,
            result: None,
        }
    }
}

/// Strip one leading and one trailing `/`.
pub fn trim_path(path: &str) -> &str {
    let path = path.strip_prefix('/').unwrap_or(path);
    path.strip_suffix('/').unwrap_or(path)
}

/// Split a trimmed path into token and sub-resource.
///
/// Accepts `<token>` and `<token>/(commitments|proofs|status|statusevents)`
/// where the token is one or more word characters.
pub fn parse_path(path: &str) -> Result<(&str, Resource), RemoteError> {
    let (token, noun) = path.split_once('/').unwrap_or((path, ""));
    match Resource::from_noun(noun) {
        Some(resource) if Token::is_valid(token) => Ok((token, resource)),
        _ => Err(RemoteError::new(
            ErrorKind::UnsupportedPath,
            format!("invalid URL: {}", path),
        )),
    }
}

/// Stateless dispatcher from protocol requests to session handlers.
#[derive(Clone)]
pub struct ProtocolRouter {
    store: Arc<SessionStore>,
}

impl ProtocolRouter {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }

    /// Route one protocol message.
    ///
    /// Every error is turned into an error envelope; nothing propagates.
    pub fn route(
        &self,
        path: &str,
        method: &Method,
        headers: &HeaderMap,
        body: &[u8],
    ) -> ProtocolResponse {
        let path = trim_path(path);
        debug!(%method, path, "routing protocol message");
        if !body.is_empty() {
            trace!(body = %String::from_utf8_lossy(body), "request body");
        }
        trace!(?headers, "request headers");

        let (token, resource) = match parse_path(path) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(path, "unsupported protocol path");
                return ProtocolResponse::error(err);
            }
        };

        // The store lock is released before the session lock is taken.
        let session = match self.store.get(token) {
            Ok(Some(session)) => session,
            Ok(None) => {
                warn!(session = token, "session not found");
                return ProtocolResponse::error(RemoteError::new(ErrorKind::SessionUnknown, ""));
            }
            Err(err) => return ProtocolResponse::error(err.into()),
        };
        let mut locked = match session.lock() {
            Ok(locked) => locked,
            Err(err) => return ProtocolResponse::error(err.into()),
        };

        locked.touch();
        let (status, body) = dispatch(&mut locked, resource, method, headers, body);

        // Report the result only on the request that changed the status.
        let result = locked.observe_transition();
        ProtocolResponse {
            status,
            body,
            result,
        }
    }
}

fn dispatch(
    session: &mut LockedSession<'_>,
    resource: Resource,
    method: &Method,
    headers: &HeaderMap,
    body: &[u8],
) -> (StatusCode, Vec<u8>) {
    match resource {
        Resource::Session if method == Method::DELETE => {
            session.handle_delete();
            (StatusCode::OK, Vec::new())
        }
        Resource::Session if method == Method::GET => match parse_versions(headers) {
            Ok((min, max)) => json_response(session.handle_get_request(min, max)),
            Err(detail) => error_body(session.fail(ErrorKind::MalformedInput, detail)),
        },
        Resource::StatusEvents => error_body(RemoteError::new(
            ErrorKind::InvalidRequest,
            "server sent events not supported via this channel",
        )),
        Resource::Status if method == Method::GET => json_response(Ok(session.handle_get_status())),
        Resource::Commitments
            if method == Method::POST && session.action() == Action::Issuing =>
        {
            match decode_validated::<IssueCommitmentMessage>(body) {
                Ok(commitments) => json_response(session.handle_post_commitments(&commitments)),
                Err(detail) => error_body(session.fail(ErrorKind::MalformedInput, detail)),
            }
        }
        Resource::Proofs if method == Method::POST && session.action() == Action::Disclosing => {
            match decode_validated::<Disclosure>(body) {
                Ok(disclosure) => json_response(session.handle_post_disclosure(&disclosure)),
                Err(detail) => error_body(session.fail(ErrorKind::MalformedInput, detail)),
            }
        }
        Resource::Proofs if method == Method::POST && session.action() == Action::Signing => {
            match decode_validated::<SignedMessage>(body) {
                Ok(signature) => json_response(session.handle_post_signature(&signature)),
                Err(detail) => error_body(session.fail(ErrorKind::MalformedInput, detail)),
            }
        }
        _ => error_body(RemoteError::new(
            ErrorKind::InvalidRequest,
            format!("{} not allowed here for a {} session", method, session.action()),
        )),
    }
}

fn parse_versions(headers: &HeaderMap) -> Result<(ProtocolVersion, ProtocolVersion), String> {
    let parse = |name: &str| -> Result<ProtocolVersion, String> {
        let value = headers
            .get(name)
            .ok_or_else(|| format!("missing header {}", name))?
            .to_str()
            .map_err(|e| format!("unreadable header {}: {}", name, e))?;
        value.parse().map_err(|e: crate::protocol::ParseVersionError| e.to_string())
    };
    Ok((parse(MIN_VERSION_HEADER)?, parse(MAX_VERSION_HEADER)?))
}

fn json_response<T: Serialize>(outcome: Result<T, RemoteError>) -> (StatusCode, Vec<u8>) {
    match outcome {
        Ok(payload) => match serde_json::to_vec(&payload) {
            Ok(body) => (StatusCode::OK, body),
            Err(e) => error_body(RemoteError::new(ErrorKind::Internal, e.to_string())),
        },
        Err(err) => error_body(err),
    }
}

fn error_body(err: RemoteError) -> (StatusCode, Vec<u8>) {
    debug!(error = %err, "protocol error");
    let body = serde_json::to_vec(&err).unwrap_or_default();
    (err.status_code(), body)
}

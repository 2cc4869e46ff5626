//! REST API handlers.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures_util::StreamExt;
use tracing::{info, warn};

use super::types::{ErrorResponse, StartSessionResponse, StatusResponse};
use crate::error::RemoteError;
use crate::protocol::{RequestorRequest, SessionResult};
use crate::server::{parse_path, trim_path, Resource, SessionManager};

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(err: crate::error::SessionError) -> ApiError {
    let (status, body) = ErrorResponse::from_error(&err);
    (status, Json(body))
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<SessionManager>,
}

impl AppState {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }
}

/// Health check endpoint.
pub async fn health() -> &'static str {
    "OK"
}

/// API information endpoint.
pub async fn api_info(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "credential-session",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "sessions": state.manager.store().count(),
    }))
}

/// Start a new session from a requestor request.
pub async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<RequestorRequest>,
) -> Result<Json<StartSessionResponse>, ApiError> {
    let (session_ptr, token) = state.manager.start_session(req).map_err(api_error)?;
    Ok(Json(StartSessionResponse { session_ptr, token }))
}

/// Get session status.
pub async fn session_status(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let status = state.manager.get_session_status(&token).map_err(api_error)?;
    let token = token.parse().map_err(api_error)?;
    Ok(Json(StatusResponse { token, status }))
}

/// Get the result of a finished session.
///
/// Answers `204 No Content` while the session is still running.
pub async fn session_result(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    match state.manager.get_session_result(&token).map_err(api_error)? {
        Some(result) => Ok(Json(result).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// Get the original requestor request.
pub async fn session_request(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<RequestorRequest>, ApiError> {
    let request = state.manager.get_request(&token).map_err(api_error)?;
    Ok(Json(request))
}

/// Cancel a session.
pub async fn cancel_session(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.manager.cancel_session(&token).map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Holder-facing protocol endpoint.
///
/// `GET {token}/statusevents` is served as a server-sent-events stream;
/// everything else goes through the protocol router.
pub async fn protocol_message(
    State(state): State<AppState>,
    Path(path): Path<String>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method == Method::GET {
        if let Ok((token, Resource::StatusEvents)) = parse_path(trim_path(&path)) {
            return status_events(&state.manager, token);
        }
    }

    let response = state
        .manager
        .handle_protocol_message(&path, &method, &headers, &body);
    if let Some(result) = &response.result {
        relay_result(result);
    }

    let mut builder = Response::builder().status(response.status);
    if !response.body.is_empty() {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    builder
        .body(Body::from(response.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn status_events(manager: &SessionManager, token: &str) -> Response {
    match manager.subscribe_server_sent_events(token) {
        Ok(events) => {
            let stream = events
                .into_stream()
                .map(|status| Ok::<_, Infallible>(Event::default().data(status.as_str())));
            Sse::new(stream)
                .keep_alive(KeepAlive::default())
                .into_response()
        }
        Err(err) => {
            let err = RemoteError::from(err);
            (err.status_code(), Json(err)).into_response()
        }
    }
}

fn relay_result(result: &SessionResult) {
    match serde_json::to_string(result) {
        Ok(json) => info!(session = %result.token, status = %result.status, result = %json, "session finished"),
        Err(e) => warn!(session = %result.token, error = %e, "unserializable session result"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::UnverifiedEngine;
    use crate::server::ManagerConfig;

    fn state() -> AppState {
        AppState::new(Arc::new(SessionManager::new(
            ManagerConfig::default(),
            Arc::new(UnverifiedEngine),
        )))
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let response = health().await;
        assert_eq!(response, "OK");
    }

    #[tokio::test]
    async fn test_api_info_endpoint() {
        let response = api_info(State(state())).await;
        let json = response.0;
        assert_eq!(json["name"], "credential-session");
        assert_eq!(json["status"], "running");
        assert_eq!(json["sessions"], 0);
    }

    #[tokio::test]
    async fn test_status_unknown_session() {
        let err = session_status(State(state()), Path("nosuch".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
        assert_eq!(err.1.code, "SESSION_UNKNOWN");
    }
}

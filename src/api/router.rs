//! API router configuration.

use axum::{
    routing::{any, delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    api_info, cancel_session, health, protocol_message, session_request, session_result,
    session_status, start_session, AppState,
};

/// Create the API router with all routes configured.
pub fn create_router(state: AppState) -> Router {
    // Requestor routes
    let session_routes = Router::new()
        .route("/", post(start_session))
        .route("/{token}", delete(cancel_session))
        .route("/{token}/status", get(session_status))
        .route("/{token}/result", get(session_result))
        .route("/{token}/request", get(session_request));

    Router::new()
        .route("/health", get(health))
        .route("/api/v1", get(api_info))
        .route("/protocol/{*path}", any(protocol_message))
        .nest("/session", session_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Stop accepting connections on ctrl-c and drain in-flight requests.
    pub graceful_shutdown: bool,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            graceful_shutdown: true,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("127.0.0.1", 8088)
    }
}

/// Start the API server and run until it stops.
pub async fn serve(config: ServerConfig, state: AppState) -> crate::Result<()> {
    let addr = config.bind_address();
    let router = create_router(state);

    tracing::info!("Starting credential-session server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(crate::error::SessionError::Io)?;

    let server = axum::serve(listener, router);
    let outcome = if config.graceful_shutdown {
        server.with_graceful_shutdown(shutdown_signal()).await
    } else {
        server.await
    };
    outcome.map_err(|e| crate::error::SessionError::Io(std::io::Error::other(e.to_string())))?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

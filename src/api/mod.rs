//! HTTP transport for credential-session.
//!
//! A thin axum layer over [`SessionManager`](crate::server::SessionManager).
//!
//! ## Endpoints
//!
//! ### Health & Info
//! - `GET /health` - Health check
//! - `GET /api/v1` - API information
//!
//! ### Requestor
//! - `POST /session` - Start a session from a requestor request
//! - `GET /session/{token}/status` - Current session status
//! - `GET /session/{token}/result` - Session result (204 while running)
//! - `GET /session/{token}/request` - Original requestor request
//! - `DELETE /session/{token}` - Cancel a session
//!
//! ### Holder
//! - `ANY /protocol/{token}[/commitments|/proofs|/status]` - Protocol messages
//! - `GET /protocol/{token}/statusevents` - Server-sent status events
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use credential_session::api::{serve, AppState, ServerConfig};
//! use credential_session::engine::UnverifiedEngine;
//! use credential_session::server::{ManagerConfig, SessionManager};
//!
//! #[tokio::main]
//! async fn main() -> credential_session::Result<()> {
//!     let manager = SessionManager::new(
//!         ManagerConfig::default().with_url("http://127.0.0.1:8088/protocol"),
//!         Arc::new(UnverifiedEngine),
//!     );
//!     let state = AppState::new(Arc::new(manager));
//!     serve(ServerConfig::default(), state).await
//! }
//! ```

pub mod handlers;
pub mod router;
pub mod types;

pub use handlers::AppState;
pub use router::{create_router, serve, ServerConfig};
pub use types::{ErrorResponse, StartSessionResponse, StatusResponse};

//! # credential-session
//!
//! Session-protocol core for a server that mediates between requestors and
//! holders of attribute-based credentials.
//!
//! A requestor starts a session for one of three actions (issuing,
//! disclosing or signing) and receives a token plus a [`SessionPointer`]
//! to hand to the holder. The holder then talks to the protocol endpoint;
//! the [`ProtocolRouter`](server::ProtocolRouter) dispatches each message to
//! the session's state machine while the [`SessionManager`] expires idle
//! sessions in the background.
//!
//! Cryptographic verification is delegated to a
//! [`CredentialEngine`](engine::CredentialEngine) implementation.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use credential_session::engine::UnverifiedEngine;
//! use credential_session::protocol::{DisclosureRequest, RequestorRequest, SessionRequest};
//! use credential_session::server::{ManagerConfig, SessionManager};
//!
//! #[tokio::main]
//! async fn main() -> credential_session::Result<()> {
//!     let manager = SessionManager::new(
//!         ManagerConfig::default().with_url("https://example.com/protocol"),
//!         Arc::new(UnverifiedEngine),
//!     );
//!
//!     let request = RequestorRequest::new(SessionRequest::Disclosing(DisclosureRequest {
//!         disclose: vec![vec!["demo.issuer.card.name".to_string()]],
//!     }));
//!     let (pointer, token) = manager.start_session(request)?;
//!     println!("session {} at {}", token, pointer.url);
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod server;
pub mod session;

// Re-export commonly used types
pub use error::{ErrorKind, RemoteError, Result, SessionError};
pub use protocol::{Action, ProtocolVersion, RequestorRequest, SessionPointer, SessionResult};
pub use server::{ManagerConfig, SessionManager};
pub use session::{Session, SessionStore, Status, StatusEvents, Token};

//! Top-level entry point for embedding applications.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, Method};
use tracing::{info, warn, Level};

use super::router::{ProtocolResponse, ProtocolRouter};
use super::sweeper::Sweeper;
use crate::engine::CredentialEngine;
use crate::error::SessionError;
use crate::protocol::{RequestorRequest, SessionPointer, SessionRequest, SessionResult};
use crate::session::{Session, SessionStore, SessionTimeouts, Status, StatusEvents, Token};
use crate::Result;

/// Settings for a [`SessionManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Base URL under which the protocol endpoint is reachable; the token is
    /// appended to it.
    pub url: String,
    /// Lifetime of an idle session, and grace period after it finishes.
    pub max_session_lifetime: Duration,
    /// Default deadline for the holder's first contact.
    pub client_timeout: Option<Duration>,
    /// Period of the expiry sweep.
    pub sweep_interval: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_session_lifetime: Duration::from_secs(5 * 60),
            client_timeout: None,
            sweep_interval: Duration::from_secs(10),
        }
    }
}

impl ManagerConfig {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        if !self.url.is_empty() && !self.url.ends_with('/') {
            self.url.push('/');
        }
        self
    }

    fn timeouts(&self) -> SessionTimeouts {
        SessionTimeouts {
            lifetime: self.max_session_lifetime,
            client_timeout: self.client_timeout,
        }
    }
}

/// Owns the session store, the protocol router and the expiry sweeper.
pub struct SessionManager {
    config: ManagerConfig,
    store: Arc<SessionStore>,
    router: ProtocolRouter,
    engine: Arc<dyn CredentialEngine>,
    sweeper: Sweeper,
}

impl SessionManager {
    /// Create a manager and start its expiry sweeper.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn new(config: ManagerConfig, engine: Arc<dyn CredentialEngine>) -> Self {
        let url = config.url.clone();
        let config = config.with_url(url);
        if config.url.is_empty() {
            warn!("no base URL configured; clients cannot connect unless it is prepended elsewhere");
        }

        let store = Arc::new(SessionStore::new());
        let sweeper = Sweeper::spawn(Arc::clone(&store), config.sweep_interval);

        Self {
            router: ProtocolRouter::new(Arc::clone(&store)),
            config,
            store,
            engine,
            sweeper,
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Validate a requestor request and register a new session for it.
    ///
    /// Returns the pointer the holder needs to start, plus the token.
    pub fn start_session(&self, request: RequestorRequest) -> Result<(SessionPointer, Token)> {
        request.request.validate()?;
        if let SessionRequest::Issuing(issuance) = &request.request {
            self.engine
                .validate_issuance_request(issuance)
                .map_err(|e| SessionError::InvalidRequest(e.to_string()))?;
        }

        let action = request.action();
        let logged = if tracing::enabled!(Level::DEBUG) {
            serde_json::to_string(&request)
        } else {
            serde_json::to_string(&request.purged())
        }
        .unwrap_or_default();

        let session = loop {
            let session = Session::new(
                Token::generate(),
                request.clone(),
                Arc::clone(&self.engine),
                self.config.timeouts(),
            );
            match self.store.put(session) {
                Ok(session) => break session,
                Err(SessionError::SessionExists(_)) => continue,
                Err(e) => return Err(e),
            }
        };
        let token = session.token().clone();

        info!(%action, session = %token, "session started");
        info!(session = %token, request = %logged, "session request");

        Ok((
            SessionPointer {
                url: format!("{}{}", self.config.url, token),
                action,
            },
            token,
        ))
    }

    /// Result of a finished session; `None` while it is still running.
    pub fn get_session_result(&self, token: &str) -> Result<Option<SessionResult>> {
        let session = self.lookup(token, "session result requested")?;
        let locked = session.lock()?;
        Ok(locked.result().cloned())
    }

    pub fn get_session_status(&self, token: &str) -> Result<Status> {
        let session = self.lookup(token, "session status requested")?;
        let status = session.lock()?.handle_get_status();
        Ok(status)
    }

    /// The requestor's original request.
    pub fn get_request(&self, token: &str) -> Result<RequestorRequest> {
        let session = self.lookup(token, "session request requested")?;
        Ok(session.request().clone())
    }

    /// Cancel a session. Succeeds without effect if it already finished.
    pub fn cancel_session(&self, token: &str) -> Result<()> {
        let session = self.lookup(token, "cancellation requested")?;
        session.lock()?.handle_delete();
        Ok(())
    }

    /// Subscribe to status changes of a running session.
    ///
    /// The session lock is held only while the listener is registered.
    pub fn subscribe_server_sent_events(&self, token: &str) -> Result<StatusEvents> {
        let session = self.lookup(token, "status events requested")?;
        let locked = session.lock()?;
        if locked.status().is_finished() {
            warn!(session = token, "status events requested for finished session");
            return Err(SessionError::SessionFinished(token.to_string()));
        }
        Ok(locked.subscribe())
    }

    /// Route a protocol message from a holder.
    pub fn handle_protocol_message(
        &self,
        path: &str,
        method: &Method,
        headers: &HeaderMap,
        body: &[u8],
    ) -> ProtocolResponse {
        self.router.route(path, method, headers, body)
    }

    /// Stop the expiry sweeper.
    pub fn shutdown(&self) {
        info!("stopping session manager");
        self.sweeper.stop();
    }

    fn lookup(&self, token: &str, what: &str) -> Result<Arc<Session>> {
        match self.store.get(token)? {
            Some(session) => Ok(session),
            None => {
                warn!(session = token, "{} of unknown session", what);
                Err(SessionError::SessionUnknown(token.to_string()))
            }
        }
    }
}

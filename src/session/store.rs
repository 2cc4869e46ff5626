//! Session storage and expiry.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use tracing::{info, warn};

use super::{Session, Token};
use crate::error::SessionError;
use crate::protocol::SessionResult;
use crate::Result;

/// Thread-safe storage for sessions.
///
/// The store lock is only held for map access and is never held while a
/// session lock is taken. Callers look a session up, the store lock is
/// released, and only then do they lock the session.
pub struct SessionStore {
    sessions: RwLock<HashMap<Token, Arc<Session>>>,
}

impl SessionStore {
    /// Create a new empty session store.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Register a session.
    ///
    /// Fails with [`SessionError::SessionExists`] if its token is taken.
    pub fn put(&self, session: Session) -> Result<Arc<Session>> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| SessionError::LockPoisoned)?;

        if sessions.contains_key(session.token()) {
            return Err(SessionError::SessionExists(session.token().to_string()));
        }
        let session = Arc::new(session);
        sessions.insert(session.token().clone(), Arc::clone(&session));
        Ok(session)
    }

    /// Look up a session by token.
    pub fn get(&self, token: &str) -> Result<Option<Arc<Session>>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| SessionError::LockPoisoned)?;
        Ok(sessions.get(token).cloned())
    }

    /// Check if a session exists.
    pub fn contains(&self, token: &str) -> Result<bool> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| SessionError::LockPoisoned)?;
        Ok(sessions.contains_key(token))
    }

    /// Get the number of sessions in the store.
    pub fn count(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    fn snapshot(&self) -> Result<Vec<Arc<Session>>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| SessionError::LockPoisoned)?;
        Ok(sessions.values().cloned().collect())
    }

    /// Remove every session whose deadline has passed.
    pub fn delete_expired(&self) -> Result<usize> {
        self.delete_expired_at(Instant::now())
    }

    /// Remove every session whose deadline is at or before `now`.
    ///
    /// Live sessions are moved to `TIMEOUT` first so that anyone still
    /// holding them, or subscribed to their events, sees a terminal status.
    /// Returns the number of sessions removed.
    pub fn delete_expired_at(&self, now: Instant) -> Result<usize> {
        let mut expired = Vec::new();

        for session in self.snapshot()? {
            match session.lock() {
                Ok(mut locked) => {
                    if locked.is_expired(now) {
                        if let Some(result) = locked.expire() {
                            relay_timeout(&result);
                        }
                        expired.push(session.token().clone());
                    }
                }
                Err(_) => {
                    warn!(session = %session.token(), "dropping session with poisoned lock");
                    expired.push(session.token().clone());
                }
            }
        }

        if expired.is_empty() {
            return Ok(0);
        }

        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| SessionError::LockPoisoned)?;
        let mut removed = 0;
        for token in &expired {
            if sessions.remove(token).is_some() {
                info!(session = %token, "deleting expired session");
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn relay_timeout(result: &SessionResult) {
    match serde_json::to_string(result) {
        Ok(json) => info!(session = %result.token, status = %result.status, result = %json, "session finished"),
        Err(e) => warn!(session = %result.token, error = %e, "unserializable session result"),
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

//! A single credential-exchange session and its handler operations.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, info};

use super::{Status, StatusEvents, Token};
use crate::engine::{CredentialEngine, EngineError};
use crate::error::{ErrorKind, RemoteError, SessionError};
use crate::protocol::{
    Action, ClientRequest, Disclosure, IssueCommitmentMessage, ProofStatus, ProtocolVersion,
    RequestorRequest, SessionRequest, SessionResult, SignedMessage,
};
use crate::Result;

/// How long a session may live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimeouts {
    /// Lifetime granted on creation, on every protocol request and as grace
    /// period after reaching a terminal state.
    pub lifetime: Duration,
    /// Deadline for the holder's first contact, if shorter or longer than
    /// `lifetime`.
    pub client_timeout: Option<Duration>,
}

impl Default for SessionTimeouts {
    fn default() -> Self {
        Self {
            lifetime: Duration::from_secs(5 * 60),
            client_timeout: None,
        }
    }
}

/// A credential-exchange session.
///
/// The token, action and requestor request never change. Everything else
/// lives behind the session lock and is reached through [`Session::lock`].
pub struct Session {
    token: Token,
    action: Action,
    rrequest: RequestorRequest,
    engine: Arc<dyn CredentialEngine>,
    lifetime: Duration,
    /// Deadline extension while the holder has not connected yet.
    first_contact: Duration,
    inner: Mutex<SessionInner>,
}

struct SessionInner {
    status: Status,
    /// Status as of the end of the previous routed request.
    prev_status: Status,
    result: Option<SessionResult>,
    version: Option<ProtocolVersion>,
    deadline: Instant,
    events: watch::Sender<Status>,
}

impl Session {
    pub fn new(
        token: Token,
        rrequest: RequestorRequest,
        engine: Arc<dyn CredentialEngine>,
        timeouts: SessionTimeouts,
    ) -> Self {
        let now = Instant::now();
        let first_contact = rrequest
            .client_timeout()
            .or(timeouts.client_timeout)
            .unwrap_or(timeouts.lifetime);
        let (events, _) = watch::channel(Status::Initialized);

        Self {
            token,
            action: rrequest.action(),
            rrequest,
            engine,
            lifetime: timeouts.lifetime,
            first_contact,
            inner: Mutex::new(SessionInner {
                status: Status::Initialized,
                prev_status: Status::Initialized,
                result: None,
                version: None,
                deadline: now + first_contact,
                events,
            }),
        }
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn action(&self) -> Action {
        self.action
    }

    /// The requestor's original request.
    pub fn request(&self) -> &RequestorRequest {
        &self.rrequest
    }

    /// Acquire the session lock.
    ///
    /// All handler operations are methods on the returned guard; the lock is
    /// released when it is dropped.
    pub fn lock(&self) -> Result<LockedSession<'_>> {
        let inner = self.inner.lock().map_err(|_| SessionError::LockPoisoned)?;
        Ok(LockedSession {
            session: self,
            inner,
        })
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token)
            .field("action", &self.action)
            .finish_non_exhaustive()
    }
}

/// A session whose lock is held by the caller.
pub struct LockedSession<'a> {
    session: &'a Session,
    inner: MutexGuard<'a, SessionInner>,
}

impl<'a> LockedSession<'a> {
    pub fn token(&self) -> &Token {
        &self.session.token
    }

    pub fn action(&self) -> Action {
        self.session.action
    }

    pub fn status(&self) -> Status {
        self.inner.status
    }

    pub fn result(&self) -> Option<&SessionResult> {
        self.inner.result.as_ref()
    }

    /// Negotiated protocol version, once connected.
    pub fn version(&self) -> Option<ProtocolVersion> {
        self.inner.version
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.inner.deadline
    }

    /// Push the deadline out. Until the holder connects the first-contact
    /// timeout applies, afterwards one lifetime. Finished sessions keep
    /// their grace period.
    pub fn touch(&mut self) {
        let extension = match self.inner.status {
            Status::Initialized => self.session.first_contact,
            Status::Connected => self.session.lifetime,
            _ => return,
        };
        self.inner.deadline = Instant::now() + extension;
    }

    /// Register a status listener.
    pub fn subscribe(&self) -> StatusEvents {
        StatusEvents::new(self.inner.events.subscribe())
    }

    /// Edge-triggered notification step.
    ///
    /// If the status differs from the one recorded at the previous call,
    /// records it and returns the result (if any). Otherwise returns `None`.
    pub fn observe_transition(&mut self) -> Option<SessionResult> {
        if self.inner.status == self.inner.prev_status {
            return None;
        }
        self.inner.prev_status = self.inner.status;
        self.inner.result.clone()
    }

    /// Hand the holder the request and agree on a protocol version.
    pub fn handle_get_request(
        &mut self,
        min: ProtocolVersion,
        max: ProtocolVersion,
    ) -> std::result::Result<ClientRequest, RemoteError> {
        self.require_live()?;
        if self.inner.status != Status::Initialized {
            return Err(RemoteError::new(
                ErrorKind::InvalidRequest,
                "session request already retrieved",
            ));
        }

        let Some(version) = ProtocolVersion::negotiate(min, max) else {
            return Err(self.fail(
                ErrorKind::VersionMismatch,
                format!("client supports {} to {}", min, max),
            ));
        };

        self.inner.version = Some(version);
        self.set_status(Status::Connected);
        self.touch();
        debug!(session = %self.session.token, %version, "protocol version negotiated");

        Ok(ClientRequest {
            protocol_version: version,
            request: self.session.rrequest.request.clone(),
        })
    }

    pub fn handle_get_status(&self) -> Status {
        self.inner.status
    }

    /// Issue credentials in exchange for the holder's commitments.
    pub fn handle_post_commitments(
        &mut self,
        commitments: &IssueCommitmentMessage,
    ) -> std::result::Result<Vec<serde_json::Value>, RemoteError> {
        self.require_live()?;
        let session = self.session;
        let SessionRequest::Issuing(request) = &session.rrequest.request else {
            return Err(wrong_action(session.action));
        };
        self.require_connected()?;

        let engine = Arc::clone(&session.engine);
        match engine.issue(request, commitments) {
            Ok(signatures) => {
                let result = self.new_result(Status::Done);
                self.finish(Status::Done, result);
                Ok(signatures)
            }
            Err(err) => Err(self.reject(err)),
        }
    }

    /// Verify a disclosure.
    pub fn handle_post_disclosure(
        &mut self,
        disclosure: &Disclosure,
    ) -> std::result::Result<ProofStatus, RemoteError> {
        self.require_live()?;
        let session = self.session;
        let SessionRequest::Disclosing(request) = &session.rrequest.request else {
            return Err(wrong_action(session.action));
        };
        self.require_connected()?;

        let engine = Arc::clone(&session.engine);
        match engine.verify_disclosure(request, disclosure) {
            Ok(disclosed) => {
                let mut result = self.new_result(Status::Done);
                result.proof_status = Some(ProofStatus::Valid);
                result.disclosed = disclosed;
                self.finish(Status::Done, result);
                Ok(ProofStatus::Valid)
            }
            Err(err) => Err(self.reject(err)),
        }
    }

    /// Verify an attribute-based signature.
    pub fn handle_post_signature(
        &mut self,
        signature: &SignedMessage,
    ) -> std::result::Result<ProofStatus, RemoteError> {
        self.require_live()?;
        let session = self.session;
        let SessionRequest::Signing(request) = &session.rrequest.request else {
            return Err(wrong_action(session.action));
        };
        self.require_connected()?;

        let engine = Arc::clone(&session.engine);
        match engine.verify_signature(request, signature) {
            Ok(disclosed) => {
                let mut result = self.new_result(Status::Done);
                result.proof_status = Some(ProofStatus::Valid);
                result.disclosed = disclosed;
                result.signature = Some(signature.clone());
                self.finish(Status::Done, result);
                Ok(ProofStatus::Valid)
            }
            Err(err) => Err(self.reject(err)),
        }
    }

    /// Cancel the session. No-op once finished.
    pub fn handle_delete(&mut self) {
        if self.inner.status.is_finished() {
            return;
        }
        info!(session = %self.session.token, "session cancelled");
        let result = self.new_result(Status::Cancelled);
        self.finish(Status::Cancelled, result);
    }

    /// Move a live session to `TIMEOUT`.
    ///
    /// Returns the timeout result, or `None` if the session had already
    /// finished.
    pub fn expire(&mut self) -> Option<SessionResult> {
        if self.inner.status.is_finished() {
            return None;
        }
        info!(session = %self.session.token, status = %self.inner.status, "session expired");
        let result = self.new_result(Status::Timeout);
        self.finish(Status::Timeout, result);
        self.inner.result.clone()
    }

    /// End the session with an error result.
    ///
    /// Returns the error to send to the holder. On a finished session
    /// nothing changes and a session-finished error is returned instead.
    pub fn fail(&mut self, kind: ErrorKind, detail: impl Into<String>) -> RemoteError {
        if self.inner.status.is_finished() {
            return finished_error();
        }
        let err = RemoteError::new(kind, detail);
        info!(session = %self.session.token, error = %err, "session failed");
        let result = self.new_result(Status::Done).with_error(err.clone());
        self.finish(Status::Done, result);
        err
    }

    fn reject(&mut self, err: EngineError) -> RemoteError {
        let kind = match err {
            EngineError::Rejected(_) => ErrorKind::VerificationFailed,
            EngineError::Unsupported(_) => ErrorKind::InvalidRequest,
        };
        let remote = RemoteError::new(kind, err.to_string());
        let mut result = self.new_result(Status::Done).with_error(remote.clone());
        if self.session.action != Action::Issuing {
            result.proof_status = Some(ProofStatus::Invalid);
        }
        info!(session = %self.session.token, error = %remote, "verification failed");
        self.finish(Status::Done, result);
        remote
    }

    fn require_live(&self) -> std::result::Result<(), RemoteError> {
        if self.inner.status.is_finished() {
            Err(finished_error())
        } else {
            Ok(())
        }
    }

    fn require_connected(&self) -> std::result::Result<(), RemoteError> {
        if self.inner.status == Status::Connected {
            Ok(())
        } else {
            Err(RemoteError::new(
                ErrorKind::InvalidRequest,
                format!("not allowed in state {}", self.inner.status),
            ))
        }
    }

    fn new_result(&self, status: Status) -> SessionResult {
        SessionResult::new(self.session.token.clone(), self.session.action, status)
    }

    fn set_status(&mut self, status: Status) {
        if self.inner.status.transition_to(status).is_ok() {
            self.inner.events.send_replace(status);
        }
    }

    /// Enter a terminal state, recording the result once.
    fn finish(&mut self, status: Status, result: SessionResult) {
        if self.inner.status.transition_to(status).is_err() {
            return;
        }
        if self.inner.result.is_none() {
            self.inner.result = Some(result);
        }
        self.inner.deadline = Instant::now() + self.session.lifetime;
        self.inner.events.send_replace(status);
    }
}

fn finished_error() -> RemoteError {
    RemoteError::new(ErrorKind::SessionFinished, "")
}

fn wrong_action(action: Action) -> RemoteError {
    RemoteError::new(
        ErrorKind::InvalidRequest,
        format!("not allowed in a {} session", action),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::UnverifiedEngine;
    use crate::protocol::{DisclosureRequest, IssuanceRequest};

    fn v(s: &str) -> ProtocolVersion {
        s.parse().unwrap()
    }

    fn disclosing() -> Session {
        let request = RequestorRequest::new(SessionRequest::Disclosing(DisclosureRequest {
            disclose: vec![vec!["demo.issuer.card.name".into()]],
        }));
        Session::new(
            Token::generate(),
            request,
            Arc::new(UnverifiedEngine),
            SessionTimeouts::default(),
        )
    }

    fn disclosure() -> Disclosure {
        Disclosure {
            proofs: vec![serde_json::json!({"c": "1"})],
            indices: vec![],
        }
    }

    struct RejectingEngine;

    impl CredentialEngine for RejectingEngine {
        fn validate_issuance_request(&self, _: &IssuanceRequest) -> std::result::Result<(), EngineError> {
            Ok(())
        }
        fn issue(
            &self,
            _: &IssuanceRequest,
            _: &IssueCommitmentMessage,
        ) -> std::result::Result<Vec<serde_json::Value>, EngineError> {
            Err(EngineError::Rejected("bad commitments".into()))
        }
        fn verify_disclosure(
            &self,
            _: &DisclosureRequest,
            _: &Disclosure,
        ) -> std::result::Result<Vec<crate::protocol::DisclosedAttribute>, EngineError> {
            Err(EngineError::Rejected("bad proofs".into()))
        }
        fn verify_signature(
            &self,
            _: &crate::protocol::SignatureRequest,
            _: &SignedMessage,
        ) -> std::result::Result<Vec<crate::protocol::DisclosedAttribute>, EngineError> {
            Err(EngineError::Rejected("bad signature".into()))
        }
    }

    #[test]
    fn test_new_session_is_initialized() {
        let session = disclosing();
        let locked = session.lock().unwrap();
        assert_eq!(locked.status(), Status::Initialized);
        assert!(locked.result().is_none());
        assert!(locked.version().is_none());
        assert_eq!(locked.action(), Action::Disclosing);
    }

    #[test]
    fn test_get_request_connects_once() {
        let session = disclosing();
        let mut locked = session.lock().unwrap();

        let client = locked.handle_get_request(v("2.4"), v("2.5")).unwrap();
        assert_eq!(client.protocol_version, v("2.5"));
        assert_eq!(locked.status(), Status::Connected);

        let err = locked.handle_get_request(v("2.4"), v("2.5")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(locked.status(), Status::Connected);
    }

    #[test]
    fn test_version_mismatch_fails_session() {
        let session = disclosing();
        let mut locked = session.lock().unwrap();

        let err = locked.handle_get_request(v("1.0"), v("1.1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::VersionMismatch);
        assert_eq!(locked.status(), Status::Done);
        let result = locked.result().unwrap();
        assert_eq!(result.error.as_ref().unwrap().kind(), ErrorKind::VersionMismatch);
    }

    #[test]
    fn test_disclosure_before_connect_is_invalid() {
        let session = disclosing();
        let mut locked = session.lock().unwrap();

        let err = locked.handle_post_disclosure(&disclosure()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(locked.status(), Status::Initialized);
    }

    #[test]
    fn test_disclosure_completes_session() {
        let session = disclosing();
        let mut locked = session.lock().unwrap();
        locked.handle_get_request(v("2.4"), v("2.5")).unwrap();

        let status = locked.handle_post_disclosure(&disclosure()).unwrap();
        assert_eq!(status, ProofStatus::Valid);
        assert_eq!(locked.status(), Status::Done);
        let result = locked.result().unwrap();
        assert!(result.is_success());
        assert_eq!(result.disclosed.len(), 1);
    }

    #[test]
    fn test_wrong_payload_kind_is_invalid() {
        let session = disclosing();
        let mut locked = session.lock().unwrap();
        locked.handle_get_request(v("2.4"), v("2.5")).unwrap();

        let commitments = IssueCommitmentMessage {
            proofs: vec![serde_json::json!({})],
            nonce2: "1".into(),
        };
        let err = locked.handle_post_commitments(&commitments).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(locked.status(), Status::Connected);
    }

    #[test]
    fn test_verification_failure_is_a_result() {
        let request = RequestorRequest::new(SessionRequest::Disclosing(DisclosureRequest {
            disclose: vec![vec!["a.b.c.d".into()]],
        }));
        let session = Session::new(
            Token::generate(),
            request,
            Arc::new(RejectingEngine),
            SessionTimeouts::default(),
        );
        let mut locked = session.lock().unwrap();
        locked.handle_get_request(v("2.4"), v("2.5")).unwrap();

        let err = locked.handle_post_disclosure(&disclosure()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::VerificationFailed);
        assert_eq!(locked.status(), Status::Done);
        let result = locked.result().unwrap();
        assert_eq!(result.proof_status, Some(ProofStatus::Invalid));
        assert!(!result.is_success());
    }

    #[test]
    fn test_finished_session_rejects_handlers() {
        let session = disclosing();
        let mut locked = session.lock().unwrap();
        locked.handle_delete();
        assert_eq!(locked.status(), Status::Cancelled);

        let err = locked.handle_get_request(v("2.4"), v("2.5")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SessionFinished);
        let err = locked.handle_post_disclosure(&disclosure()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SessionFinished);
        assert_eq!(locked.status(), Status::Cancelled);
    }

    #[test]
    fn test_result_is_immutable_once_set() {
        let session = disclosing();
        let mut locked = session.lock().unwrap();
        locked.handle_delete();
        let first = locked.result().cloned().unwrap();

        locked.handle_delete();
        locked.fail(ErrorKind::MalformedInput, "late");
        assert!(locked.expire().is_none());
        assert_eq!(locked.result().cloned().unwrap(), first);
        assert_eq!(first.status, Status::Cancelled);
    }

    #[test]
    fn test_fail_on_finished_session_has_no_effect() {
        let session = disclosing();
        let mut locked = session.lock().unwrap();
        let result = locked.expire().unwrap();
        assert_eq!(result.status, Status::Timeout);
        assert!(!result.is_success());

        let err = locked.fail(ErrorKind::MalformedInput, "bad");
        assert_eq!(err.kind(), ErrorKind::SessionFinished);
        assert_eq!(locked.status(), Status::Timeout);
    }

    #[test]
    fn test_observe_transition_is_edge_triggered() {
        let session = disclosing();
        let mut locked = session.lock().unwrap();
        assert!(locked.observe_transition().is_none());

        // Connected carries no result yet
        locked.handle_get_request(v("2.4"), v("2.5")).unwrap();
        assert!(locked.observe_transition().is_none());

        locked.handle_post_disclosure(&disclosure()).unwrap();
        assert!(locked.observe_transition().is_some());
        assert!(locked.observe_transition().is_none());
    }

    #[test]
    fn test_touch_keeps_client_timeout_until_connected() {
        let mut request = RequestorRequest::new(SessionRequest::Disclosing(DisclosureRequest {
            disclose: vec![vec!["a.b.c.d".into()]],
        }));
        request.client_timeout = Some(0);
        let session = Session::new(
            Token::generate(),
            request,
            Arc::new(UnverifiedEngine),
            SessionTimeouts::default(),
        );
        let mut locked = session.lock().unwrap();
        assert!(locked.is_expired(Instant::now()));

        // Activity before the holder connects does not extend the lifetime
        locked.touch();
        assert!(locked.is_expired(Instant::now()));

        // Connecting grants the full lifetime
        locked.handle_get_request(v("2.4"), v("2.5")).unwrap();
        assert!(!locked.is_expired(Instant::now()));
    }

    #[tokio::test]
    async fn test_subscribers_see_terminal_status() {
        let session = disclosing();
        let mut events = session.lock().unwrap().subscribe();

        session.lock().unwrap().handle_delete();

        assert_eq!(events.next().await, Some(Status::Cancelled));
        assert_eq!(events.next().await, None);
    }
}

//! Interface to the attribute-credential engine.
//!
//! Proof verification, credential issuance and scheme-aware request checks
//! live outside this crate. Sessions call into a [`CredentialEngine`] while
//! holding their own lock, so implementations must be bounded, synchronous
//! computations.

use thiserror::Error;

use crate::protocol::{
    DisclosedAttribute, Disclosure, DisclosureRequest, IssuanceRequest, IssueCommitmentMessage,
    SignatureRequest, SignedMessage,
};

/// Why the engine refused a request or payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Proofs, commitments or signature did not verify.
    #[error("verification failed: {0}")]
    Rejected(String),

    /// Request does not fit the known schemes or issuer keys.
    #[error("request not supported by configuration: {0}")]
    Unsupported(String),
}

/// Cryptographic and scheme-aware operations performed on behalf of sessions.
pub trait CredentialEngine: Send + Sync {
    /// Authoritative check of an issuance request against the schemes.
    fn validate_issuance_request(&self, request: &IssuanceRequest) -> Result<(), EngineError>;

    /// Verify commitments and produce issuance signatures.
    ///
    /// The returned values are passed back to the holder verbatim.
    fn issue(
        &self,
        request: &IssuanceRequest,
        commitments: &IssueCommitmentMessage,
    ) -> Result<Vec<serde_json::Value>, EngineError>;

    /// Verify disclosure proofs and extract the disclosed attributes.
    fn verify_disclosure(
        &self,
        request: &DisclosureRequest,
        disclosure: &Disclosure,
    ) -> Result<Vec<DisclosedAttribute>, EngineError>;

    /// Verify an attribute-based signature and extract its attributes.
    fn verify_signature(
        &self,
        request: &SignatureRequest,
        signature: &SignedMessage,
    ) -> Result<Vec<DisclosedAttribute>, EngineError>;
}

/// Engine that accepts everything structurally valid.
///
/// Only meant for development setups and tests without key material; it
/// reports no disclosed attribute values.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnverifiedEngine;

impl CredentialEngine for UnverifiedEngine {
    fn validate_issuance_request(&self, _request: &IssuanceRequest) -> Result<(), EngineError> {
        Ok(())
    }

    fn issue(
        &self,
        request: &IssuanceRequest,
        _commitments: &IssueCommitmentMessage,
    ) -> Result<Vec<serde_json::Value>, EngineError> {
        Ok(request
            .credentials
            .iter()
            .map(|cred| serde_json::json!({ "credential": cred.credential }))
            .collect())
    }

    fn verify_disclosure(
        &self,
        request: &DisclosureRequest,
        _disclosure: &Disclosure,
    ) -> Result<Vec<DisclosedAttribute>, EngineError> {
        Ok(unverified_attributes(&request.disclose))
    }

    fn verify_signature(
        &self,
        request: &SignatureRequest,
        signature: &SignedMessage,
    ) -> Result<Vec<DisclosedAttribute>, EngineError> {
        if signature.message != request.message {
            return Err(EngineError::Rejected("signed message differs from request".into()));
        }
        Ok(unverified_attributes(&request.disclose))
    }
}

fn unverified_attributes(disclose: &[Vec<String>]) -> Vec<DisclosedAttribute> {
    disclose
        .iter()
        .filter_map(|disjunction| disjunction.first())
        .map(|id| DisclosedAttribute {
            id: id.clone(),
            value: String::new(),
        })
        .collect()
}

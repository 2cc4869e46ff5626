//! Requestor-supplied session requests.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{Action, ProtocolVersion};
use crate::error::SessionError;
use crate::Result;

/// Alternatives the holder may choose from; any one attribute satisfies it.
pub type AttributeDisjunction = Vec<String>;

/// Request to disclose attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisclosureRequest {
    /// Every disjunction must be satisfied by one disclosed attribute.
    pub disclose: Vec<AttributeDisjunction>,
}

/// Request to sign a message with disclosed attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRequest {
    /// Message the holder signs.
    pub message: String,
    /// Attributes attached to the signature.
    pub disclose: Vec<AttributeDisjunction>,
}

/// A single credential to issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRequest {
    /// Credential type identifier, e.g. `scheme.issuer.credential`.
    pub credential: String,
    /// Attribute values keyed by attribute identifier.
    pub attributes: BTreeMap<String, String>,
    /// Expiry as a unix timestamp, if not the scheme default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity: Option<u64>,
}

/// Request to issue credentials, optionally combined with a disclosure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuanceRequest {
    pub credentials: Vec<CredentialRequest>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disclose: Vec<AttributeDisjunction>,
}

/// The action-specific part of a session request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SessionRequest {
    Disclosing(DisclosureRequest),
    Signing(SignatureRequest),
    Issuing(IssuanceRequest),
}

impl SessionRequest {
    pub fn action(&self) -> Action {
        match self {
            SessionRequest::Disclosing(_) => Action::Disclosing,
            SessionRequest::Signing(_) => Action::Signing,
            SessionRequest::Issuing(_) => Action::Issuing,
        }
    }

    /// Structural checks that do not need scheme knowledge.
    pub fn validate(&self) -> Result<()> {
        match self {
            SessionRequest::Disclosing(req) => {
                if req.disclose.is_empty() {
                    return Err(invalid("disclosure request names no attributes"));
                }
                validate_disjunctions(&req.disclose)
            }
            SessionRequest::Signing(req) => {
                if req.message.is_empty() {
                    return Err(invalid("signature request has an empty message"));
                }
                if req.disclose.is_empty() {
                    return Err(invalid("signature request names no attributes"));
                }
                validate_disjunctions(&req.disclose)
            }
            SessionRequest::Issuing(req) => {
                if req.credentials.is_empty() {
                    return Err(invalid("issuance request names no credentials"));
                }
                for cred in &req.credentials {
                    if cred.credential.is_empty() {
                        return Err(invalid("credential without type identifier"));
                    }
                    if cred.attributes.is_empty() {
                        return Err(invalid(format!(
                            "credential {} has no attributes",
                            cred.credential
                        )));
                    }
                }
                validate_disjunctions(&req.disclose)
            }
        }
    }
}

fn validate_disjunctions(disjunctions: &[AttributeDisjunction]) -> Result<()> {
    for disjunction in disjunctions {
        if disjunction.is_empty() || disjunction.iter().any(|attr| attr.is_empty()) {
            return Err(invalid("empty attribute disjunction"));
        }
    }
    Ok(())
}

fn invalid(msg: impl Into<String>) -> SessionError {
    SessionError::InvalidRequest(msg.into())
}

/// A session request together with requestor-side options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestorRequest {
    #[serde(flatten)]
    pub request: SessionRequest,
    /// Seconds the holder has to make first contact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_timeout: Option<u64>,
    /// Where the requestor wants results delivered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

impl RequestorRequest {
    pub fn new(request: SessionRequest) -> Self {
        Self {
            request,
            client_timeout: None,
            callback_url: None,
        }
    }

    pub fn action(&self) -> Action {
        self.request.action()
    }

    pub fn client_timeout(&self) -> Option<Duration> {
        self.client_timeout.map(Duration::from_secs)
    }

    /// Copy with issued attribute values blanked, for logging.
    pub fn purged(&self) -> Self {
        let mut copy = self.clone();
        if let SessionRequest::Issuing(req) = &mut copy.request {
            for cred in &mut req.credentials {
                for value in cred.attributes.values_mut() {
                    value.clear();
                }
            }
        }
        copy
    }
}

/// The request as handed to the holder after version negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRequest {
    pub protocol_version: ProtocolVersion,
    #[serde(flatten)]
    pub request: SessionRequest,
}

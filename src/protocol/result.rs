//! Session outcomes and initiation descriptors.

use serde::{Deserialize, Serialize};

use super::{Action, SignedMessage};
use crate::error::RemoteError;
use crate::session::{Status, Token};

/// Outcome of proof verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProofStatus {
    Valid,
    Invalid,
}

/// An attribute value revealed by the holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisclosedAttribute {
    /// Attribute type identifier.
    pub id: String,
    pub value: String,
}

/// The final, authoritative outcome of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResult {
    pub token: Token,
    pub status: Status,
    #[serde(rename = "type")]
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_status: Option<ProofStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disclosed: Vec<DisclosedAttribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<SignedMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RemoteError>,
}

impl SessionResult {
    pub fn new(token: Token, action: Action, status: Status) -> Self {
        Self {
            token,
            status,
            action,
            proof_status: None,
            disclosed: Vec::new(),
            signature: None,
            error: None,
        }
    }

    pub fn with_error(mut self, error: RemoteError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Done && self.error.is_none()
    }
}

/// Tells the holder where and how to start a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPointer {
    /// Fully-qualified protocol URL for the session.
    #[serde(rename = "u")]
    pub url: String,
    pub action: Action,
}

//! Holder-supplied protocol payloads.
//!
//! The proofs inside these messages are opaque here; only their shape is
//! checked before they are handed to the credential engine.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Points at one disclosed attribute: which proof, which attribute in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeIndex {
    pub cred: usize,
    pub attr: usize,
}

/// Commitments sent by the holder during issuance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueCommitmentMessage {
    pub proofs: Vec<Value>,
    pub nonce2: String,
}

/// Disclosure proofs for a disclosure session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disclosure {
    pub proofs: Vec<Value>,
    #[serde(default)]
    pub indices: Vec<Vec<AttributeIndex>>,
}

/// Attribute-based signature over the requested message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedMessage {
    pub signature: Vec<Value>,
    #[serde(default)]
    pub indices: Vec<Vec<AttributeIndex>>,
    pub nonce: String,
    pub context: String,
    pub message: String,
}

/// Structural validity of a decoded payload.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

fn validate_proofs(proofs: &[Value], what: &str) -> Result<(), String> {
    if proofs.is_empty() {
        return Err(format!("no {} present", what));
    }
    if proofs.iter().any(|p| !p.is_object()) {
        return Err(format!("{} must be objects", what));
    }
    Ok(())
}

fn validate_indices(indices: &[Vec<AttributeIndex>], proofs: usize) -> Result<(), String> {
    if indices.iter().flatten().any(|idx| idx.cred >= proofs) {
        return Err("attribute index refers to a missing proof".into());
    }
    Ok(())
}

impl Validate for IssueCommitmentMessage {
    fn validate(&self) -> Result<(), String> {
        validate_proofs(&self.proofs, "proofs")?;
        if self.nonce2.is_empty() {
            return Err("missing nonce2".into());
        }
        Ok(())
    }
}

impl Validate for Disclosure {
    fn validate(&self) -> Result<(), String> {
        validate_proofs(&self.proofs, "proofs")?;
        validate_indices(&self.indices, self.proofs.len())
    }
}

impl Validate for SignedMessage {
    fn validate(&self) -> Result<(), String> {
        validate_proofs(&self.signature, "signature proofs")?;
        validate_indices(&self.indices, self.signature.len())?;
        if self.nonce.is_empty() || self.context.is_empty() {
            return Err("missing nonce or context".into());
        }
        Ok(())
    }
}

/// Decode JSON and check its structure in one step.
pub fn decode_validated<T>(body: &[u8]) -> Result<T, String>
where
    T: DeserializeOwned + Validate,
{
    let value: T = serde_json::from_slice(body).map_err(|e| e.to_string())?;
    value.validate()?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_disclosure() {
        let body = json!({
            "proofs": [{"c": "1", "A": "2"}],
            "indices": [[{"cred": 0, "attr": 2}]]
        })
        .to_string();
        let disclosure: Disclosure = decode_validated(body.as_bytes()).unwrap();
        assert_eq!(disclosure.proofs.len(), 1);
        assert_eq!(disclosure.indices[0][0], AttributeIndex { cred: 0, attr: 2 });
    }

    #[test]
    fn test_reject_garbage() {
        assert!(decode_validated::<Disclosure>(b"not json").is_err());
        assert!(decode_validated::<Disclosure>(b"{}").is_err());
    }

    #[test]
    fn test_reject_empty_proofs() {
        let body = json!({"proofs": []}).to_string();
        let err = decode_validated::<Disclosure>(body.as_bytes()).unwrap_err();
        assert!(err.contains("no proofs"));
    }

    #[test]
    fn test_reject_dangling_index() {
        let body = json!({
            "proofs": [{"c": "1"}],
            "indices": [[{"cred": 1, "attr": 0}]]
        })
        .to_string();
        assert!(decode_validated::<Disclosure>(body.as_bytes()).is_err());
    }

    #[test]
    fn test_commitments_need_nonce() {
        let body = json!({"proofs": [{"U": "1"}], "nonce2": ""}).to_string();
        assert!(decode_validated::<IssueCommitmentMessage>(body.as_bytes()).is_err());

        let body = json!({"proofs": [{"U": "1"}], "nonce2": "42"}).to_string();
        assert!(decode_validated::<IssueCommitmentMessage>(body.as_bytes()).is_ok());
    }

    #[test]
    fn test_signed_message() {
        let body = json!({
            "signature": [{"c": "1"}],
            "nonce": "1",
            "context": "1",
            "message": "I agree"
        })
        .to_string();
        let msg: SignedMessage = decode_validated(body.as_bytes()).unwrap();
        assert_eq!(msg.message, "I agree");
    }
}

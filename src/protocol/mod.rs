//! Protocol data model.
//!
//! Types exchanged with requestors (session requests, results, pointers)
//! and with holders (versions, commitments, disclosures, signatures).

mod action;
mod message;
mod request;
mod result;
mod version;

pub use action::Action;
pub use message::{
    decode_validated, AttributeIndex, Disclosure, IssueCommitmentMessage, SignedMessage, Validate,
};
pub use request::{
    AttributeDisjunction, ClientRequest, CredentialRequest, DisclosureRequest, IssuanceRequest,
    RequestorRequest, SessionRequest, SignatureRequest,
};
pub use result::{DisclosedAttribute, ProofStatus, SessionPointer, SessionResult};
pub use version::{
    ParseVersionError, ProtocolVersion, MAX_VERSION_HEADER, MIN_VERSION_HEADER, SUPPORTED_MAX,
    SUPPORTED_MIN,
};

//! # Error Hierarchy
//!
//! Structured error types for zkcred, built with `thiserror`. No
//! `Box<dyn Error>`, no `.unwrap()` outside tests.
//!
//! Every operation except proof verification either succeeds with a value
//! or fails with one of these typed errors. Verification alone collapses to
//! a boolean, and only at the protocol boundary.

use thiserror::Error;

use crate::artifact::RevocationRegistryDelta;
use crate::credential::CredentialInfo;
use crate::identity::RevocationRegistryId;

/// Top-level error type for zkcred.
#[derive(Error, Debug)]
pub enum ZkcredError {
    /// A referenced artifact has no entry on the ledger.
    #[error("not found: {0}")]
    NotFound(#[from] NotFoundError),

    /// No held credential satisfies a requested attribute or predicate.
    #[error("no held credential satisfies referent \"{referent}\"")]
    NoMatchingCredential {
        /// The proof-request referent that could not be satisfied.
        referent: String,
    },

    /// A non-idempotent store hit an id that is already on the ledger.
    #[error("artifact already exists on the ledger: {0}")]
    AlreadyExists(String),

    /// The revocation registry has issued its full capacity.
    #[error("revocation registry {registry} is full ({max} credentials issued)")]
    CapacityExceeded {
        /// The full registry.
        registry: RevocationRegistryId,
        /// Its maximum credential number.
        max: u32,
    },

    /// The cryptography engine rejected the operation. Never retried.
    #[error("cryptographic error: {0}")]
    Cryptographic(String),

    /// A credential exists off-ledger but its registry did not advance.
    #[error("consistency error: {0}")]
    Consistency(#[from] ConsistencyError),

    /// Caller lacks the ledger role the operation needs.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Ledger transport failure unrelated to artifact content.
    #[error("ledger error: {0}")]
    Ledger(String),

    /// The holder's local key-value store failed.
    #[error("wallet storage error: {0}")]
    Wallet(String),

    /// Domain primitive validation failure.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Canonicalization failure while signing or hashing.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The referenced artifact id has no entry on the ledger.
///
/// Always propagated to the caller, never silently defaulted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotFoundError {
    /// Schema id unknown to the ledger.
    #[error("schema {0}")]
    Schema(String),

    /// Credential definition id unknown to the ledger.
    #[error("credential definition {0}")]
    CredentialDefinition(String),

    /// Revocation registry definition id unknown to the ledger.
    #[error("revocation registry {0}")]
    RevocationRegistry(String),

    /// No revocation entry at or before the requested point in time.
    #[error("revocation delta for {registry} at or before {timestamp}")]
    RevocationDelta {
        /// The registry queried.
        registry: String,
        /// The upper bound of the query, Unix seconds.
        timestamp: i64,
    },

    /// DID has no NYM record on the ledger.
    #[error("identity {0}")]
    Identity(String),

    /// Credential id unknown to the holder's wallet.
    #[error("credential {0}")]
    Credential(String),
}

/// A credential was produced by the cryptography engine but the registry
/// delta recording it could not be written.
///
/// Carries everything an operator needs to retry the ledger write without
/// re-issuing: the pending delta and the credential that depends on it.
#[derive(Error, Debug)]
#[error("credential issued against {registry} but its revocation delta was not persisted: {reason}")]
pub struct ConsistencyError {
    /// Registry whose delta stream did not advance.
    pub registry: RevocationRegistryId,
    /// The delta that still needs to be appended.
    pub pending_delta: Box<RevocationRegistryDelta>,
    /// The credential already produced off-ledger.
    pub credential: Box<CredentialInfo>,
    /// Why the append failed.
    pub reason: String,
}

/// Errors during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed during canonicalization.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Validation errors for domain primitive newtypes.
///
/// Each carries the offending input and the expected shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// DID does not match `did:<method>:<identifier>`.
    #[error("invalid DID format: \"{0}\" (expected did:<method>:<identifier>)")]
    InvalidDid(String),

    /// Schema id does not match `{did}:2:{name}:{version}`.
    #[error("invalid schema id: \"{0}\" (expected <did>:2:<name>:<version>)")]
    InvalidSchemaId(String),

    /// Credential definition id does not match `{did}:3:CL:{seqNo}:{tag}`.
    #[error("invalid credential definition id: \"{0}\" (expected <did>:3:CL:<seqNo>:<tag>)")]
    InvalidCredentialDefinitionId(String),

    /// Revocation registry id does not match `{did}:4:{credDefId}:CL_ACCUM:{tag}`.
    #[error("invalid revocation registry id: \"{0}\" (expected <did>:4:<credDefId>:CL_ACCUM:<tag>)")]
    InvalidRevocationRegistryId(String),

    /// A name, version, or tag segment is empty or contains a colon.
    #[error("invalid id segment \"{value}\" for {field}: must be non-empty and contain no ':'")]
    InvalidSegment {
        /// Which segment was rejected.
        field: &'static str,
        /// The rejected value.
        value: String,
    },

    /// Schema attribute list is empty or has duplicates.
    #[error("invalid schema attributes: {0}")]
    InvalidAttributes(String),

    /// Timestamp out of the representable range.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(i64),

    /// Interval with `from` after `to`.
    #[error("invalid interval: from {from} is after to {to}")]
    InvalidInterval {
        /// Lower bound, Unix seconds.
        from: i64,
        /// Upper bound, Unix seconds.
        to: i64,
    },

    /// Credential proposal JSON is malformed.
    #[error("invalid credential proposal: {0}")]
    InvalidProposal(String),

    /// Registry capacity outside the supported range.
    #[error("invalid registry capacity {0}: must be between 1 and {max}", max = crate::artifact::MAX_REGISTRY_CAPACITY)]
    InvalidCapacity(u32),
}

impl ZkcredError {
    /// Whether this error means "the ledger has no such artifact".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display_names_the_artifact() {
        let err = ZkcredError::from(NotFoundError::Schema("did:sov:abc:2:passport:1.0".into()));
        let msg = err.to_string();
        assert!(msg.contains("not found"));
        assert!(msg.contains("passport"));
        assert!(err.is_not_found());
    }

    #[test]
    fn revocation_delta_not_found_carries_timestamp() {
        let err = NotFoundError::RevocationDelta {
            registry: "reg".into(),
            timestamp: 1_700_000_000,
        };
        assert!(err.to_string().contains("1700000000"));
    }

    #[test]
    fn no_matching_credential_names_referent() {
        let err = ZkcredError::NoMatchingCredential {
            referent: "age_ge_18".into(),
        };
        assert!(err.to_string().contains("age_ge_18"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn validation_errors_show_expected_shape() {
        let err = ValidationError::InvalidSchemaId("garbage".into());
        assert!(err.to_string().contains("<did>:2:<name>:<version>"));
        let err = ValidationError::InvalidCapacity(0);
        assert!(err.to_string().contains("between 1 and"));
    }

    #[test]
    fn float_rejected_display() {
        let err = CanonicalizationError::FloatRejected(3.5);
        assert!(err.to_string().contains("3.5"));
    }
}

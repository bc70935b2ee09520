//! Errors raised by a credential engine.

use thiserror::Error;
use zkcred_core::{CanonicalizationError, NotFoundError, ZkcredError};

/// The engine rejected an operation.
///
/// A proof that is well-formed but does not verify is *not* an error;
/// [`verify_proof`](crate::CredentialEngine::verify_proof) returns
/// `Ok(false)` for it.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Inputs are inconsistent with each other or with the engine's state.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No private key for this credential definition in this engine.
    #[error("no signing key held for credential definition {0}")]
    UnknownCredentialDefinition(String),

    /// No master secret with this name in this engine.
    #[error("unknown master secret \"{0}\"")]
    UnknownMasterSecret(String),

    /// No stored credential with this id.
    #[error("unknown credential {0}")]
    UnknownCredential(String),

    /// An issued credential failed validation on receipt.
    #[error("credential rejected: {0}")]
    CredentialRejected(String),

    /// Proof blob could not be parsed or is structurally inconsistent.
    #[error("malformed proof: {0}")]
    MalformedProof(String),

    /// Verification inputs are missing an artifact the proof references.
    #[error("missing verification data: {0}")]
    MissingData(String),

    /// Tails file hash differs from the registry definition.
    #[error("tails hash mismatch: definition has {expected}, handle has {actual}")]
    TailsMismatch {
        /// Hash recorded in the registry definition.
        expected: String,
        /// Hash of the opened tails handle.
        actual: String,
    },

    /// The operation is outside what this engine supports.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The active engine policy does not admit this backend.
    #[error("engine backend {backend} rejected: production mode requires a real credential engine")]
    PolicyRejected {
        /// Name of the rejected backend.
        backend: String,
    },

    /// Canonicalization failed while signing or hashing.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// JSON conversion of an opaque payload failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<EngineError> for ZkcredError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::UnknownCredential(id) => {
                ZkcredError::NotFound(NotFoundError::Credential(id))
            }
            EngineError::Canonicalization(e) => ZkcredError::Canonicalization(e),
            other => ZkcredError::Cryptographic(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_map_to_cryptographic() {
        let err: ZkcredError = EngineError::MalformedProof("truncated".into()).into();
        assert!(matches!(err, ZkcredError::Cryptographic(ref m) if m.contains("truncated")));
    }

    #[test]
    fn unknown_credential_maps_to_not_found() {
        let err: ZkcredError = EngineError::UnknownCredential("c-1".into()).into();
        assert!(err.is_not_found());
    }

    #[test]
    fn policy_rejection_names_backend() {
        let err = EngineError::PolicyRejected {
            backend: "mock-transparent".into(),
        };
        assert!(err.to_string().contains("mock-transparent"));
    }
}

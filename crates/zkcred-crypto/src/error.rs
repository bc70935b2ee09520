//! Errors for key handling and signature checks.

use thiserror::Error;

/// Failure parsing key material or checking a signature.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Key bytes or hex are malformed.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Signature bytes or hex are malformed.
    #[error("invalid signature encoding: {0}")]
    InvalidSignature(String),

    /// Signature does not verify under the given key.
    #[error("signature verification failed")]
    VerificationFailed,
}

//! Ledger errors.

use thiserror::Error;
use zkcred_core::{CanonicalizationError, ValidationError, ZkcredError};

/// A ledger rejected or failed a request.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The artifact id is already written. The ledger is append-only.
    #[error("{0} is already on the ledger")]
    AlreadyExists(String),

    /// The submitter is unknown or the write signature does not verify.
    #[error("unauthorized submitter {did}: {reason}")]
    Unauthorized { did: String, reason: String },

    /// The submitter's role does not allow this write.
    #[error("permission denied: {0}")]
    Permission(String),

    /// A write references an artifact the ledger does not hold.
    #[error("write references unknown {0}")]
    MissingReference(String),

    /// The request is well-formed but inconsistent.
    #[error("invalid ledger request: {0}")]
    InvalidRequest(String),

    /// The transport returned a response of the wrong kind.
    #[error("unexpected ledger response to {request}: {response}")]
    UnexpectedResponse { request: String, response: String },

    /// The service has no submitter key and cannot write.
    #[error("ledger service is read-only")]
    ReadOnly,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),
}

impl From<LedgerError> for ZkcredError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::AlreadyExists(id) => ZkcredError::AlreadyExists(id),
            LedgerError::Unauthorized { .. } | LedgerError::Permission(_) | LedgerError::ReadOnly => {
                ZkcredError::Permission(err.to_string())
            }
            LedgerError::Validation(e) => ZkcredError::Validation(e),
            LedgerError::Canonicalization(e) => ZkcredError::Canonicalization(e),
            other => ZkcredError::Ledger(other.to_string()),
        }
    }
}

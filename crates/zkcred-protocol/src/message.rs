//! Wire messages exchanged during sessions.
//!
//! Each protocol is a tagged union with an explicit `Abort` variant. Every
//! message carries the session id so a party can reject traffic that
//! belongs to another exchange.

use serde::{Deserialize, Serialize};
use zkcred_core::{CredentialInfo, CredentialOffer, CredentialRequest, ProofInfo, ProofRequest};
use zkcred_state::SessionId;

/// Messages of the credential issuance protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum IssuanceMessage {
    /// Issuer → holder.
    Offer {
        session_id: SessionId,
        offer: CredentialOffer,
    },
    /// Holder → issuer.
    Request {
        session_id: SessionId,
        request: CredentialRequest,
    },
    /// Issuer → holder.
    Credential {
        session_id: SessionId,
        credential: Box<CredentialInfo>,
    },
    /// Holder → issuer, after the credential is stored.
    Ack { session_id: SessionId },
    /// Either direction.
    Abort {
        session_id: SessionId,
        reason: String,
    },
}

impl IssuanceMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Offer { .. } => "OFFER",
            Self::Request { .. } => "REQUEST",
            Self::Credential { .. } => "CREDENTIAL",
            Self::Ack { .. } => "ACK",
            Self::Abort { .. } => "ABORT",
        }
    }

    pub fn session_id(&self) -> SessionId {
        match self {
            Self::Offer { session_id, .. }
            | Self::Request { session_id, .. }
            | Self::Credential { session_id, .. }
            | Self::Ack { session_id }
            | Self::Abort { session_id, .. } => *session_id,
        }
    }
}

/// Messages of the proof presentation protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum VerificationMessage {
    /// Verifier → prover.
    Request {
        session_id: SessionId,
        request: ProofRequest,
    },
    /// Prover → verifier.
    Proof {
        session_id: SessionId,
        proof: Box<ProofInfo>,
    },
    /// Either direction.
    Abort {
        session_id: SessionId,
        reason: String,
    },
}

impl VerificationMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Request { .. } => "REQUEST",
            Self::Proof { .. } => "PROOF",
            Self::Abort { .. } => "ABORT",
        }
    }

    pub fn session_id(&self) -> SessionId {
        match self {
            Self::Request { session_id, .. }
            | Self::Proof { session_id, .. }
            | Self::Abort { session_id, .. } => *session_id,
        }
    }
}

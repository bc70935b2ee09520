//! Types shared by every exchange: session identity, the transition log,
//! and transition errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use zkcred_core::{sha256_digest, CanonicalBytes, CanonicalizationError, ContentDigest, Timestamp};

/// Identifier of one exchange between two parties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Record of a single state transition in an exchange.
///
/// The evidence digest is the SHA-256 of the canonical form of the message
/// that drove the transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRecord {
    pub from_state: String,
    pub to_state: String,
    pub timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_digest: Option<ContentDigest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl TransitionRecord {
    pub(crate) fn new(
        from_state: &str,
        to_state: &str,
        evidence_digest: Option<ContentDigest>,
        reason: Option<String>,
    ) -> Self {
        Self {
            from_state: from_state.to_string(),
            to_state: to_state.to_string(),
            timestamp: Timestamp::now(),
            evidence_digest,
            reason,
        }
    }
}

/// Errors raised by exchange transitions.
#[derive(Error, Debug)]
pub enum StateError {
    /// Attempted transition is not allowed by the state machine.
    #[error("invalid {machine} transition: {from} -> {to}")]
    InvalidTransition {
        machine: &'static str,
        from: String,
        to: String,
    },

    /// The message driving a transition could not be digested.
    #[error("cannot digest transition evidence: {0}")]
    Evidence(#[from] CanonicalizationError),
}

/// Digest of a transition's evidence.
pub(crate) fn evidence<T: Serialize>(message: &T) -> Result<ContentDigest, StateError> {
    Ok(sha256_digest(&CanonicalBytes::new(message)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn session_id_serializes_as_bare_uuid() {
        let id = SessionId::new();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::Value::String(id.to_string()));
    }

    #[test]
    fn evidence_is_deterministic() {
        let a = evidence(&serde_json::json!({"b": 1, "a": 2})).unwrap();
        let b = evidence(&serde_json::json!({"a": 2, "b": 1})).unwrap();
        assert_eq!(a, b);
    }
}

//! # Verification Exchange Typestate Machine
//!
//! ```text
//! RequestSent ──receive()──▶ ProofReceived ──conclude()──▶ Verified
//!      │                          │
//!      └──────── abort() ─────────┴──▶ Aborted
//! ```
//!
//! `Verified` carries the verdict. A verification that failed for any
//! reason after the proof arrived still concludes, with `valid: false`;
//! `Aborted` means no proof was received.

use serde::{Deserialize, Serialize};
use zkcred_core::{Did, ProofInfo, ProofRequest};

use crate::session::{evidence, SessionId, StateError, TransitionRecord};

// ─── State Types ────────────────────────────────────────────────────

/// The proof request is out.
#[derive(Debug, Clone)]
pub struct RequestSent;

/// A proof arrived and has not been judged yet.
#[derive(Debug, Clone)]
pub struct ProofReceived {
    pub proof: ProofInfo,
}

/// The proof was judged.
#[derive(Debug, Clone)]
pub struct Verified {
    pub proof: ProofInfo,
    pub valid: bool,
}

/// The exchange was abandoned before a verdict.
#[derive(Debug, Clone)]
pub struct Aborted {
    pub reason: String,
}

mod private {
    pub trait Sealed {}
    impl Sealed for super::RequestSent {}
    impl Sealed for super::ProofReceived {}
    impl Sealed for super::Verified {}
    impl Sealed for super::Aborted {}
}

/// Marker trait for verification states. Sealed.
pub trait VerificationState: private::Sealed + std::fmt::Debug {
    fn name() -> &'static str;

    fn is_terminal() -> bool {
        false
    }
}

impl VerificationState for RequestSent {
    fn name() -> &'static str {
        "REQUEST_SENT"
    }
}
impl VerificationState for ProofReceived {
    fn name() -> &'static str {
        "PROOF_RECEIVED"
    }
}
impl VerificationState for Verified {
    fn name() -> &'static str {
        "VERIFIED"
    }
    fn is_terminal() -> bool {
        true
    }
}
impl VerificationState for Aborted {
    fn name() -> &'static str {
        "ABORTED"
    }
    fn is_terminal() -> bool {
        true
    }
}

// ─── The Exchange ───────────────────────────────────────────────────

/// One proof exchange, parameterized by its state.
#[derive(Debug)]
pub struct VerificationExchange<S: VerificationState> {
    pub session_id: SessionId,
    pub verifier: Did,
    pub request: ProofRequest,
    state: S,
    transition_log: Vec<TransitionRecord>,
}

impl<S: VerificationState> VerificationExchange<S> {
    pub fn state_name(&self) -> &'static str {
        S::name()
    }

    pub fn is_terminal(&self) -> bool {
        S::is_terminal()
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn transition_log(&self) -> &[TransitionRecord] {
        &self.transition_log
    }

    fn transition_to<T: VerificationState>(
        mut self,
        state: T,
        record: TransitionRecord,
    ) -> VerificationExchange<T> {
        self.transition_log.push(record);
        VerificationExchange {
            session_id: self.session_id,
            verifier: self.verifier,
            request: self.request,
            state,
            transition_log: self.transition_log,
        }
    }

    fn abort_from(self, reason: impl Into<String>) -> VerificationExchange<Aborted> {
        let reason = reason.into();
        let record = TransitionRecord::new(S::name(), Aborted::name(), None, Some(reason.clone()));
        self.transition_to(Aborted { reason }, record)
    }
}

impl VerificationExchange<RequestSent> {
    pub fn new(session_id: SessionId, verifier: Did, request: ProofRequest) -> Self {
        Self {
            session_id,
            verifier,
            request,
            state: RequestSent,
            transition_log: Vec::new(),
        }
    }

    /// A proof arrived (REQUEST_SENT → PROOF_RECEIVED).
    pub fn receive(
        self,
        proof: ProofInfo,
    ) -> Result<VerificationExchange<ProofReceived>, StateError> {
        let record = TransitionRecord::new(
            RequestSent::name(),
            ProofReceived::name(),
            Some(evidence(&proof)?),
            None,
        );
        Ok(self.transition_to(ProofReceived { proof }, record))
    }

    pub fn abort(self, reason: impl Into<String>) -> VerificationExchange<Aborted> {
        self.abort_from(reason)
    }
}

impl VerificationExchange<ProofReceived> {
    /// Record the verdict (PROOF_RECEIVED → VERIFIED).
    pub fn conclude(self, valid: bool, reason: Option<String>) -> VerificationExchange<Verified> {
        let record = TransitionRecord::new(ProofReceived::name(), Verified::name(), None, reason);
        let proof = self.state.proof.clone();
        self.transition_to(Verified { proof, valid }, record)
    }

    pub fn abort(self, reason: impl Into<String>) -> VerificationExchange<Aborted> {
        self.abort_from(reason)
    }
}

impl VerificationExchange<Verified> {
    pub fn is_valid(&self) -> bool {
        self.state.valid
    }
}

// ─── DynVerificationExchange ────────────────────────────────────────

/// Runtime representation of verification state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DynVerificationState {
    RequestSent,
    ProofReceived,
    Verified,
    Aborted,
}

impl DynVerificationState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RequestSent => RequestSent::name(),
            Self::ProofReceived => ProofReceived::name(),
            Self::Verified => Verified::name(),
            Self::Aborted => Aborted::name(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Verified | Self::Aborted)
    }
}

impl std::fmt::Display for DynVerificationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A verification exchange whose state is only known at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynVerificationExchange {
    pub session_id: SessionId,
    pub verifier: Did,
    pub request: ProofRequest,
    pub state: DynVerificationState,
    /// The verdict, once `Verified`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
    pub transition_log: Vec<TransitionRecord>,
}

macro_rules! impl_into_dyn_verification {
    ($state_type:ty, $dyn_variant:ident, |$s:ident| $valid:expr) => {
        impl From<VerificationExchange<$state_type>> for DynVerificationExchange {
            fn from(e: VerificationExchange<$state_type>) -> Self {
                let $s = &e.state;
                let valid = $valid;
                DynVerificationExchange {
                    session_id: e.session_id,
                    verifier: e.verifier,
                    request: e.request,
                    state: DynVerificationState::$dyn_variant,
                    valid,
                    transition_log: e.transition_log,
                }
            }
        }
    };
}

impl_into_dyn_verification!(RequestSent, RequestSent, |_s| None);
impl_into_dyn_verification!(ProofReceived, ProofReceived, |_s| None);
impl_into_dyn_verification!(Verified, Verified, |s| Some(s.valid));
impl_into_dyn_verification!(Aborted, Aborted, |_s| None);

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use zkcred_core::RequestedProof;

    fn exchange() -> VerificationExchange<RequestSent> {
        VerificationExchange::new(
            SessionId::new(),
            Did::new("did:sov:verifier1").unwrap(),
            ProofRequest::builder("age check", "99").build(),
        )
    }

    fn proof() -> ProofInfo {
        ProofInfo {
            proof: serde_json::json!({"subProofs": []}),
            requested_proof: RequestedProof::default(),
            identifiers: vec![],
        }
    }

    #[test]
    fn verdict_is_recorded() {
        let verified = exchange().receive(proof()).unwrap().conclude(true, None);
        assert!(verified.is_valid());
        assert!(verified.is_terminal());
        assert_eq!(verified.transition_log().len(), 2);
        let dyn_exchange: DynVerificationExchange = verified.into();
        assert_eq!(dyn_exchange.valid, Some(true));
        assert_eq!(dyn_exchange.state, DynVerificationState::Verified);
    }

    #[test]
    fn negative_verdict_is_still_verified() {
        let verified = exchange()
            .receive(proof())
            .unwrap()
            .conclude(false, Some("revoked".into()));
        assert!(!verified.is_valid());
        assert_eq!(verified.state_name(), "VERIFIED");
    }

    #[test]
    fn abort_before_proof() {
        let aborted = exchange().abort("timeout");
        let dyn_exchange: DynVerificationExchange = aborted.into();
        assert_eq!(dyn_exchange.state, DynVerificationState::Aborted);
        assert_eq!(dyn_exchange.valid, None);
    }
}

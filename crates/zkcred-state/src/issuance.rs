//! # Issuance Exchange Typestate Machine
//!
//! Each party to a credential issuance tracks the exchange in its own
//! `IssuanceExchange`. The issuer creates it when it sends an offer; the
//! holder creates it when it receives one. Both advance the same states
//! as messages cross.
//!
//! ## Allowed Transitions
//!
//! ```text
//! OfferSent ──request()──▶ RequestReceived ──issue()──▶ CredentialIssued ──store()──▶ CredentialStored
//!     │                          │                             │
//!     └──────────────────────────┴──────── abort() ────────────┴──▶ Aborted
//! ```
//!
//! `CredentialStored` and `Aborted` are terminal. A holder reaches
//! `CredentialStored` only after the credential has been validated and
//! written to its wallet.
//!
//! ```compile_fail
//! use zkcred_state::issuance::*;
//! # fn f(exchange: IssuanceExchange<OfferSent>, info: zkcred_core::CredentialInfo) {
//! // ERROR: no method named `issue` found for `IssuanceExchange<OfferSent>`
//! let _ = exchange.issue(info);
//! # }
//! ```

use serde::{Deserialize, Serialize};
use zkcred_core::{CredentialInfo, CredentialOffer, CredentialRequest, Did};

use crate::session::{evidence, SessionId, StateError, TransitionRecord};

// ─── State Types ────────────────────────────────────────────────────

/// The offer is out; no request yet.
#[derive(Debug, Clone)]
pub struct OfferSent;

/// The holder's credential request is in hand.
#[derive(Debug, Clone)]
pub struct RequestReceived {
    pub request: CredentialRequest,
}

/// The issuer has produced the credential.
#[derive(Debug, Clone)]
pub struct CredentialIssued {
    pub request: CredentialRequest,
    pub credential: CredentialInfo,
}

/// The holder has stored the credential.
#[derive(Debug, Clone)]
pub struct CredentialStored {
    pub credential: CredentialInfo,
}

/// The exchange was abandoned.
#[derive(Debug, Clone)]
pub struct Aborted {
    pub reason: String,
}

mod private {
    pub trait Sealed {}
    impl Sealed for super::OfferSent {}
    impl Sealed for super::RequestReceived {}
    impl Sealed for super::CredentialIssued {}
    impl Sealed for super::CredentialStored {}
    impl Sealed for super::Aborted {}
}

/// Marker trait for issuance states. Sealed.
pub trait IssuanceState: private::Sealed + std::fmt::Debug {
    fn name() -> &'static str;

    fn is_terminal() -> bool {
        false
    }
}

impl IssuanceState for OfferSent {
    fn name() -> &'static str {
        "OFFER_SENT"
    }
}
impl IssuanceState for RequestReceived {
    fn name() -> &'static str {
        "REQUEST_RECEIVED"
    }
}
impl IssuanceState for CredentialIssued {
    fn name() -> &'static str {
        "CREDENTIAL_ISSUED"
    }
}
impl IssuanceState for CredentialStored {
    fn name() -> &'static str {
        "CREDENTIAL_STORED"
    }
    fn is_terminal() -> bool {
        true
    }
}
impl IssuanceState for Aborted {
    fn name() -> &'static str {
        "ABORTED"
    }
    fn is_terminal() -> bool {
        true
    }
}

// ─── The Exchange ───────────────────────────────────────────────────

/// One credential issuance, parameterized by its state.
#[derive(Debug)]
pub struct IssuanceExchange<S: IssuanceState> {
    pub session_id: SessionId,
    pub issuer: Did,
    /// The holder's DID for this exchange; its session DID once known.
    pub holder: Option<Did>,
    pub offer: CredentialOffer,
    state: S,
    transition_log: Vec<TransitionRecord>,
}

impl<S: IssuanceState> IssuanceExchange<S> {
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

    fn transition_to<T: IssuanceState>(
        mut self,
        state: T,
        record: TransitionRecord,
    ) -> IssuanceExchange<T> {
        self.transition_log.push(record);
        IssuanceExchange {
            session_id: self.session_id,
            issuer: self.issuer,
            holder: self.holder,
            offer: self.offer,
            state,
            transition_log: self.transition_log,
        }
    }

    fn abort_from(self, reason: impl Into<String>) -> IssuanceExchange<Aborted> {
        let reason = reason.into();
        let record = TransitionRecord::new(S::name(), Aborted::name(), None, Some(reason.clone()));
        self.transition_to(Aborted { reason }, record)
    }
}

impl IssuanceExchange<OfferSent> {
    /// Start an exchange around `offer`.
    pub fn new(session_id: SessionId, offer: CredentialOffer) -> Self {
        Self {
            session_id,
            issuer: offer.issuer_did.clone(),
            holder: None,
            offer,
            state: OfferSent,
            transition_log: Vec::new(),
        }
    }

    /// The holder answered with `request` (OFFER_SENT → REQUEST_RECEIVED).
    pub fn request(
        mut self,
        request: CredentialRequest,
    ) -> Result<IssuanceExchange<RequestReceived>, StateError> {
        if request.cred_def_id != self.offer.cred_def_id {
            return Err(StateError::InvalidTransition {
                machine: "issuance",
                from: OfferSent::name().to_string(),
                to: format!("{} for {}", RequestReceived::name(), request.cred_def_id),
            });
        }
        let record = TransitionRecord::new(
            OfferSent::name(),
            RequestReceived::name(),
            Some(evidence(&request)?),
            None,
        );
        self.holder = Some(request.prover_did.clone());
        Ok(self.transition_to(RequestReceived { request }, record))
    }

    pub fn abort(self, reason: impl Into<String>) -> IssuanceExchange<Aborted> {
        self.abort_from(reason)
    }
}

impl IssuanceExchange<RequestReceived> {
    /// The credential was produced (REQUEST_RECEIVED → CREDENTIAL_ISSUED).
    pub fn issue(
        self,
        credential: CredentialInfo,
    ) -> Result<IssuanceExchange<CredentialIssued>, StateError> {
        if credential.credential.cred_def_id != self.offer.cred_def_id {
            return Err(StateError::InvalidTransition {
                machine: "issuance",
                from: RequestReceived::name().to_string(),
                to: format!(
                    "{} for {}",
                    CredentialIssued::name(),
                    credential.credential.cred_def_id
                ),
            });
        }
        let record = TransitionRecord::new(
            RequestReceived::name(),
            CredentialIssued::name(),
            Some(evidence(&credential)?),
            None,
        );
        let request = self.state.request.clone();
        Ok(self.transition_to(CredentialIssued { request, credential }, record))
    }

    pub fn abort(self, reason: impl Into<String>) -> IssuanceExchange<Aborted> {
        self.abort_from(reason)
    }
}

impl IssuanceExchange<CredentialIssued> {
    /// The holder stored the credential (CREDENTIAL_ISSUED → CREDENTIAL_STORED).
    pub fn store(self) -> IssuanceExchange<CredentialStored> {
        let record = TransitionRecord::new(
            CredentialIssued::name(),
            CredentialStored::name(),
            None,
            None,
        );
        let credential = self.state.credential.clone();
        self.transition_to(CredentialStored { credential }, record)
    }

    pub fn abort(self, reason: impl Into<String>) -> IssuanceExchange<Aborted> {
        self.abort_from(reason)
    }
}

// ─── Runtime State for Persistence ─────────────────────────────────

/// Runtime representation of issuance state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DynIssuanceState {
    OfferSent,
    RequestReceived,
    CredentialIssued,
    CredentialStored,
    Aborted,
}

impl DynIssuanceState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OfferSent => OfferSent::name(),
            Self::RequestReceived => RequestReceived::name(),
            Self::CredentialIssued => CredentialIssued::name(),
            Self::CredentialStored => CredentialStored::name(),
            Self::Aborted => Aborted::name(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::CredentialStored | Self::Aborted)
    }
}

impl std::fmt::Display for DynIssuanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// An issuance exchange whose state is only known at runtime, for
/// persistence and reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynIssuanceExchange {
    pub session_id: SessionId,
    pub issuer: Did,
    pub holder: Option<Did>,
    pub offer: CredentialOffer,
    pub state: DynIssuanceState,
    pub transition_log: Vec<TransitionRecord>,
}

impl DynIssuanceExchange {
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

macro_rules! impl_into_dyn_issuance {
    ($state_type:ty, $dyn_variant:ident) => {
        impl From<IssuanceExchange<$state_type>> for DynIssuanceExchange {
            fn from(e: IssuanceExchange<$state_type>) -> Self {
                DynIssuanceExchange {
                    session_id: e.session_id,
                    issuer: e.issuer,
                    holder: e.holder,
                    offer: e.offer,
                    state: DynIssuanceState::$dyn_variant,
                    transition_log: e.transition_log,
                }
            }
        }
    };
}

impl_into_dyn_issuance!(OfferSent, OfferSent);
impl_into_dyn_issuance!(RequestReceived, RequestReceived);
impl_into_dyn_issuance!(CredentialIssued, CredentialIssued);
impl_into_dyn_issuance!(CredentialStored, CredentialStored);
impl_into_dyn_issuance!(Aborted, Aborted);

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use zkcred_core::{
        Credential, CredentialDefinitionId, RevocationBinding, SchemaId,
    };

    fn issuer() -> Did {
        Did::new("did:sov:issuer1").unwrap()
    }

    fn cred_def(seq_no: u64) -> CredentialDefinitionId {
        CredentialDefinitionId::new(issuer(), seq_no, "default").unwrap()
    }

    fn offer() -> CredentialOffer {
        CredentialOffer {
            schema_id: SchemaId::new(issuer(), "passport", "1.0").unwrap(),
            cred_def_id: cred_def(7),
            issuer_did: issuer(),
            nonce: "1234".into(),
        }
    }

    fn request(seq_no: u64) -> CredentialRequest {
        CredentialRequest {
            prover_did: Did::new("did:sov:session1").unwrap(),
            cred_def_id: cred_def(seq_no),
            blinded_ms: serde_json::json!({"commitment": "abc"}),
            nonce: "5678".into(),
        }
    }

    fn credential(seq_no: u64) -> CredentialInfo {
        CredentialInfo {
            credential: Credential {
                schema_id: SchemaId::new(issuer(), "passport", "1.0").unwrap(),
                cred_def_id: cred_def(seq_no),
                values: Default::default(),
                signature: serde_json::json!({}),
                revocation: RevocationBinding::NonRevocable,
            },
            delta: None,
            delta_timestamp: None,
        }
    }

    #[test]
    fn happy_path_reaches_stored() {
        let exchange = IssuanceExchange::new(SessionId::new(), offer());
        assert_eq!(exchange.state_name(), "OFFER_SENT");
        let exchange = exchange.request(request(7)).unwrap();
        assert_eq!(exchange.holder, Some(Did::new("did:sov:session1").unwrap()));
        let exchange = exchange.issue(credential(7)).unwrap();
        let stored = exchange.store();
        assert!(stored.is_terminal());
        assert_eq!(stored.transition_log().len(), 3);
        assert_eq!(stored.transition_log()[2].to_state, "CREDENTIAL_STORED");
        assert!(stored.transition_log()[0].evidence_digest.is_some());
    }

    #[test]
    fn request_for_another_definition_is_rejected() {
        let err = IssuanceExchange::new(SessionId::new(), offer())
            .request(request(8))
            .unwrap_err();
        assert!(matches!(err, StateError::InvalidTransition { machine: "issuance", .. }));
    }

    #[test]
    fn credential_for_another_definition_is_rejected() {
        let exchange = IssuanceExchange::new(SessionId::new(), offer())
            .request(request(7))
            .unwrap();
        assert!(exchange.issue(credential(9)).is_err());
    }

    #[test]
    fn abort_records_reason() {
        let aborted = IssuanceExchange::new(SessionId::new(), offer())
            .request(request(7))
            .unwrap()
            .abort("timed out");
        assert!(aborted.is_terminal());
        assert_eq!(aborted.state().reason, "timed out");
        let record = aborted.transition_log().last().unwrap();
        assert_eq!(record.from_state, "REQUEST_RECEIVED");
        assert_eq!(record.reason.as_deref(), Some("timed out"));
    }

    #[test]
    fn dyn_record_keeps_the_transition_log() {
        let aborted = IssuanceExchange::new(SessionId::new(), offer())
            .request(request(7))
            .unwrap()
            .abort("peer left");
        let record: DynIssuanceExchange = aborted.into();
        assert_eq!(record.state, DynIssuanceState::Aborted);
        assert!(record.is_terminal());
        let names: Vec<_> = record
            .transition_log
            .iter()
            .map(|t| t.to_state.as_str())
            .collect();
        assert_eq!(names, ["REQUEST_RECEIVED", "ABORTED"]);
    }

    #[test]
    fn dyn_state_wire_names() {
        let json = serde_json::to_value(DynIssuanceState::CredentialIssued).unwrap();
        assert_eq!(json, "CREDENTIAL_ISSUED");
        assert_eq!(DynIssuanceState::CredentialIssued.to_string(), "CREDENTIAL_ISSUED");
    }
}

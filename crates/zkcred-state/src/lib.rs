//! # zkcred-state — Typestate-Encoded Exchange State Machines
//!
//! Each protocol exchange is a state machine whose states are distinct
//! Rust types. Transitions consume the current state and produce the next
//! one, so a credential cannot be stored before it was issued and a proof
//! cannot be judged before it arrived.
//!
//! ## State Machines
//!
//! - **Issuance** (`issuance.rs`): `OfferSent → RequestReceived →
//!   CredentialIssued → CredentialStored`, with `Aborted` reachable from
//!   every non-terminal state.
//!
//! - **Verification** (`verification.rs`): `RequestSent → ProofReceived →
//!   Verified`, with `Aborted` before a verdict.
//!
//! ## Design
//!
//! Transitions that accept a message record its canonical digest in the
//! transition log. `Dyn*` counterparts carry the state as a runtime enum
//! for persistence and reporting, and are only built from a typed exchange.

pub mod issuance;
pub mod session;
pub mod verification;

pub use session::{SessionId, StateError, TransitionRecord};

// ─── Issuance re-exports ────────────────────────────────────────────

pub use issuance::{
    CredentialIssued, CredentialStored, DynIssuanceExchange, DynIssuanceState, IssuanceExchange,
    IssuanceState, OfferSent, RequestReceived,
};

// ─── Verification re-exports ────────────────────────────────────────

pub use verification::{
    DynVerificationExchange, DynVerificationState, ProofReceived, RequestSent, Verified,
    VerificationExchange, VerificationState,
};

//! # zkcred-zkp — Credential Engine Boundary
//!
//! Everything cryptographic about anonymous credentials sits behind the
//! [`CredentialEngine`] trait: issuer key generation, blinded credential
//! requests, signing, revocation witnesses, proof construction, and proof
//! verification. Orchestration crates only move value objects across it.
//!
//! ## Architecture
//!
//! - **Traits** (`traits.rs`): the engine contract. Mock and real engines
//!   are interchangeable behind it.
//!
//! - **Policy** (`policy.rs`): [`EnginePolicy`] decides whether a backend
//!   may be used. Production refuses the mock engine.
//!
//! - **Mock** (`mock/`, feature `mock`): [`MockCredentialEngine`], a
//!   transparent engine built from SHA-256 commitments and Ed25519
//!   signatures. Tamper-evident, not private.
//!
//! ## Crate Policy
//!
//! - Depends on `zkcred-core` and `zkcred-crypto` internally.
//! - No `unsafe`.

pub mod error;
#[cfg(feature = "mock")]
pub mod mock;
pub mod policy;
pub mod tails;
pub mod traits;

pub use error::EngineError;
#[cfg(feature = "mock")]
pub use mock::MockCredentialEngine;
pub use policy::{EngineBackend, EnginePolicy, PolicyMode, ENGINE_POLICY_ENV};
pub use tails::TailsHandle;
pub use traits::{CredentialEngine, CredentialsForProofRequest, RevocationSlot, RevocationStates};

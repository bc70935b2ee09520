//! # zkcred-vc — Issuer, Prover, and Verifier Roles
//!
//! The three credential lifecycle roles, each built on a
//! [`WalletHolder`](zkcred_wallet::WalletHolder):
//!
//! - [`Issuer`]: publishes schemas, credential definitions, and
//!   revocation registries; issues and revokes credentials.
//! - [`Prover`]: requests and stores credentials; selects credentials for
//!   a proof request and builds the proof.
//! - [`Verifier`]: builds proof requests; resolves the ledger data a proof
//!   used and checks it.
//!
//! ## Key Design Principles
//!
//! 1. **Idempotent creation.** Creating an artifact that already exists
//!    returns the existing one, including after a lost write race.
//!
//! 2. **Serialized registry writes.** All writes to one revocation
//!    registry go through its counter lock; an index is never handed out
//!    twice.
//!
//! 3. **No silent divergence.** A credential whose revocation delta did
//!    not reach the ledger comes back as a `ConsistencyError` and blocks
//!    the registry until the delta is persisted.
//!
//! ## Crate Policy
//!
//! - Every operation is synchronous. The protocol layer calls these from
//!   async tasks but no lock here is held across `.await`.

pub mod issuer;
pub mod prover;
pub mod registry;
pub mod selection;
pub mod verifier;

pub use issuer::Issuer;
pub use prover::Prover;
pub use registry::{IssuanceCounters, RegistryCounter};
pub use selection::{select_credentials, Selection};
pub use verifier::Verifier;

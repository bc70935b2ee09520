//! # zkcred-protocol — Session Choreography
//!
//! Runs the issuance and verification protocols between parties over
//! async message channels:
//!
//! - [`ChannelSession`]: one end of a bidirectional channel with
//!   timeout-bounded receives.
//! - [`IssuanceMessage`] / [`VerificationMessage`]: tagged wire messages,
//!   each with an explicit `Abort`.
//! - [`run_issuer`], [`run_prover_issuance`], [`run_verifier`],
//!   [`run_prover_verification`]: the per-role session drivers, each
//!   advancing a `zkcred-state` exchange.
//! - [`Node`]: a party with its roles composed, gated by the engine
//!   policy and configured by [`ProtocolConfig`].
//!
//! ## Crate Policy
//!
//! - Each session runs on its own task. Sessions share only the ledger and
//!   the issuer's registry counters.
//! - Ledger and engine calls are synchronous; channel receives are the
//!   only suspension points, and no lock is held across them.
//! - Issuance failures are errors. Verification collapses to a boolean at
//!   this boundary.

pub mod config;
pub mod error;
pub mod issuance;
pub mod message;
pub mod node;
pub mod session;
pub mod verification;

pub use config::{ConfigError, ProtocolConfig, PROOF_VERSION_ENV, SESSION_TIMEOUT_ENV};
pub use error::ProtocolError;
pub use issuance::{run_issuer, run_prover_issuance};
pub use message::{IssuanceMessage, VerificationMessage};
pub use node::Node;
pub use session::ChannelSession;
pub use verification::{run_prover_verification, run_verifier};

//! # zkcred-ledger — Ledger Boundary and Artifact Cache
//!
//! Schemas, credential definitions, revocation registry definitions, and
//! revocation deltas live on an append-only public ledger. This crate
//! provides:
//!
//! - [`LedgerTransport`]: signed `submit` / unsigned `query` against any
//!   ledger.
//! - [`InMemoryLedger`]: an in-process ledger enforcing signatures, roles,
//!   write-once definitions, and monotone entry timestamps.
//! - [`LedgerService`]: typed, read-through cached access with
//!   idempotent creation and revocation-state resolution.
//!
//! ## Resolution Rules
//!
//! - The entry at time `T` is the one with the greatest timestamp `<= T`;
//!   on a tie the later append wins.
//! - The delta for an interval folds every entry up to `to` in append
//!   order. `from` does not narrow it: registry state is cumulative.
//!
//! ## Crate Policy
//!
//! - Locks are `parking_lot` and are never held across `.await`.
//! - The ledger service is passed explicitly; there is no global ledger.

pub mod clock;
pub mod error;
pub mod memory;
pub mod service;
pub mod transport;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::LedgerError;
pub use memory::InMemoryLedger;
pub use service::{
    latest_at_or_before, merge_entries, ArtifactCache, LedgerArtifact, LedgerService, Submitter,
};
pub use transport::{LedgerResponse, LedgerTransport, ReadRequest, SignedWrite, WriteRequest};

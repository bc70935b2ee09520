//! # zkcred-wallet — Identity and Wallet Holder
//!
//! A [`WalletHolder`] is the capability every role composes: a DID and its
//! Ed25519 key, a [`LedgerService`](zkcred_ledger::LedgerService) that
//! signs as that DID, the party's credential engine, and a local
//! [`WalletStore`].
//!
//! ## Session DIDs
//!
//! A holder shows each counterparty a distinct pairwise DID, created once
//! per peer and reused afterwards so one peer never sees two session
//! identities.
//!
//! ## Crate Policy
//!
//! - Private keys stay in memory. The store holds only public records.
//! - Ledger role checks happen before submission and fail with
//!   `ZkcredError::Permission`.

pub mod holder;
pub mod store;

pub use holder::{PairwiseRecord, WalletConfig, WalletHolder, DEFAULT_MASTER_SECRET_ID};
pub use store::{InMemoryWalletStore, WalletStore, WalletStoreError};

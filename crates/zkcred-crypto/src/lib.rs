//! # zkcred-crypto — Identity Key Material
//!
//! Ed25519 keys back every ledger identity. A DID's verification key is
//! published in its NYM record and every ledger write is signed over the
//! canonical bytes of its payload.
//!
//! - [`Ed25519KeyPair`]: signing half, never serialized.
//! - [`Ed25519PublicKey`] / [`Ed25519Signature`]: hex on the wire.
//! - [`did_for_key`]: the DID an identity key is registered under.
//!
//! ## Crate Policy
//!
//! - Depends only on `zkcred-core` internally.
//! - Signing input is always `&CanonicalBytes`; raw byte signing is not
//!   exposed.
//! - Tests use real Ed25519, no mocks.

pub mod did;
pub mod ed25519;
pub mod error;

pub use did::{did_for_key, DEFAULT_DID_METHOD};
pub use ed25519::{verify, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use error::CryptoError;

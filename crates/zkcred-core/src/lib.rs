//! # zkcred-core — Foundational Types for zkcred
//!
//! This crate defines the identifiers, ledger artifacts, credential and
//! proof data model, and error taxonomy shared by every other crate in the
//! workspace. It depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Validated identifier newtypes.** `Did`, `SchemaId`,
//!    `CredentialDefinitionId`, `RevocationRegistryId` parse and render the
//!    canonical ledger string forms. No bare strings for identifiers.
//!
//! 2. **`CanonicalBytes` newtype.** Everything signed or hashed flows
//!    through `CanonicalBytes::new()` (RFC 8785 JCS).
//!
//! 3. **Explicit revocation applicability.** `RevocationBinding` is either
//!    `Revocable { registry, index }` or `NonRevocable`; there is no
//!    nullable pair to forget to check.
//!
//! 4. **Wire shape is the contract.** camelCase JSON keys, ids as canonical
//!    strings, timestamps as Unix seconds.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `zkcred-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod artifact;
pub mod canonical;
pub mod credential;
pub mod digest;
pub mod encoding;
pub mod error;
pub mod identity;
pub mod proof;
pub mod proof_request;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use artifact::{
    CredentialDefinition, IssuanceType, RevocationRegistryDefinition, RevocationRegistryDelta,
    RevocationRegistryEntry, RevocationRegistryInfo, Schema, DEFAULT_TAG, MAX_REGISTRY_CAPACITY,
};
pub use canonical::CanonicalBytes;
pub use credential::{
    AttributeValue, Credential, CredentialInfo, CredentialOffer, CredentialProposal,
    CredentialRequest, CredentialRequestMetadata, HeldCredential, RevocationBinding,
};
pub use digest::{sha256_digest, sha256_hex, ContentDigest};
pub use encoding::{encode_attribute_value, encoded_as_i32, is_encoding_of};
pub use error::{
    CanonicalizationError, ConsistencyError, NotFoundError, ValidationError, ZkcredError,
};
pub use identity::{
    CredentialDefinitionId, CredentialId, Did, IdentityDetails, LedgerRole, RevocationRegistryId,
    SchemaId,
};
pub use proof::{
    PredicateReferent, ProofIdentifier, ProofInfo, RequestedAttribute, RequestedCredentials,
    RequestedPredicate, RequestedProof, RevealedAttribute, RevocationState, UsedData,
};
pub use proof_request::{
    CredentialFieldReference, CredentialPredicateReference, PredicateType, ProofRequest,
    restrictions_admit, ProofRequestBuilder, Restriction, DEFAULT_PROOF_REQUEST_VERSION,
};
pub use temporal::{Interval, Timestamp};

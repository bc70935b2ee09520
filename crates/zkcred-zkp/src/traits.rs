//! # Credential Engine Trait
//!
//! The boundary between orchestration and credential cryptography. The
//! engine owns every secret (issuer signing keys, master secrets, stored
//! credentials), so one engine instance belongs to one party's wallet.
//! Inputs and outputs are the JSON-serializable value objects of
//! `zkcred-core`.
//!
//! ## Contract
//!
//! - Every call is synchronous and CPU-bound. Callers may hold their own
//!   locks across a call; the engine never calls back out.
//! - `verify_proof` distinguishes "does not verify" (`Ok(false)`) from
//!   "cannot be checked" (`Err`).
//! - `credentials_for_proof_request` enumerates candidates in storage order
//!   and applies restrictions only. Value constraints and predicates are the
//!   caller's selection policy.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use zkcred_core::{
    AttributeValue, Credential, CredentialDefinition, CredentialDefinitionId, CredentialId,
    CredentialOffer, CredentialRequest, CredentialRequestMetadata, Did, HeldCredential,
    IssuanceType, ProofInfo, ProofRequest, RequestedCredentials, RevocationRegistryDefinition,
    RevocationRegistryDelta, RevocationRegistryId, RevocationState, Schema, SchemaId, Timestamp,
    UsedData,
};

use crate::error::EngineError;
use crate::policy::EngineBackend;
use crate::tails::TailsHandle;

/// Candidate credentials per referent, each list in storage order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsForProofRequest {
    pub attrs: BTreeMap<String, Vec<HeldCredential>>,
    pub predicates: BTreeMap<String, Vec<HeldCredential>>,
}

/// Registry slot an issuance is bound to, with the registry's cumulative
/// state before the issuance.
#[derive(Debug, Clone, Copy)]
pub struct RevocationSlot<'a> {
    pub definition: &'a RevocationRegistryDefinition,
    pub current: &'a RevocationRegistryDelta,
    pub index: u32,
}

/// Revocation states by registry, then by the ledger timestamp they were
/// built at.
pub type RevocationStates = BTreeMap<RevocationRegistryId, BTreeMap<Timestamp, RevocationState>>;

/// Credential cryptography operations.
pub trait CredentialEngine: Send + Sync {
    /// Which implementation this is, for policy checks.
    fn backend(&self) -> EngineBackend;

    // ── Issuer ──────────────────────────────────────────────────────

    /// Build a schema artifact (not yet written, so without `seq_no`).
    fn create_schema(
        &self,
        issuer: &Did,
        name: &str,
        version: &str,
        attr_names: &[String],
    ) -> Result<Schema, EngineError>;

    /// Generate signing keys for a definition over a written schema.
    ///
    /// The schema must carry its ledger `seq_no`.
    fn create_credential_definition(
        &self,
        issuer: &Did,
        schema: &Schema,
        tag: &str,
        supports_revocation: bool,
    ) -> Result<CredentialDefinition, EngineError>;

    /// Build a registry definition and its genesis delta.
    fn create_revocation_registry(
        &self,
        issuer: &Did,
        cred_def: &CredentialDefinition,
        tag: &str,
        max_cred_num: u32,
        issuance_type: IssuanceType,
    ) -> Result<(RevocationRegistryDefinition, RevocationRegistryDelta), EngineError>;

    /// Offer a credential under a definition this engine holds keys for.
    fn create_credential_offer(
        &self,
        cred_def: &CredentialDefinition,
    ) -> Result<CredentialOffer, EngineError>;

    /// Sign `values` for the requester. With a revocation slot, also return
    /// the delta that records the issuance.
    fn issue_credential(
        &self,
        offer: &CredentialOffer,
        request: &CredentialRequest,
        values: &BTreeMap<String, AttributeValue>,
        revocation: Option<RevocationSlot<'_>>,
    ) -> Result<(Credential, Option<RevocationRegistryDelta>), EngineError>;

    /// The delta revoking `index`, given the registry's cumulative state.
    fn revoke_credential(
        &self,
        definition: &RevocationRegistryDefinition,
        current: &RevocationRegistryDelta,
        index: u32,
    ) -> Result<RevocationRegistryDelta, EngineError>;

    // ── Prover ──────────────────────────────────────────────────────

    /// Create a named master secret. Idempotent per name.
    fn create_master_secret(&self, name: &str) -> Result<(), EngineError>;

    /// Blind the master secret for an offer.
    fn create_credential_request(
        &self,
        prover_did: &Did,
        offer: &CredentialOffer,
        cred_def: &CredentialDefinition,
        master_secret_name: &str,
    ) -> Result<(CredentialRequest, CredentialRequestMetadata), EngineError>;

    /// Validate and store an issued credential.
    fn store_credential(
        &self,
        id: Option<CredentialId>,
        metadata: &CredentialRequestMetadata,
        credential: &Credential,
        cred_def: &CredentialDefinition,
        rev_reg_def: Option<&RevocationRegistryDefinition>,
    ) -> Result<CredentialId, EngineError>;

    /// Enumerate stored credentials that could answer each referent.
    fn credentials_for_proof_request(
        &self,
        request: &ProofRequest,
    ) -> Result<CredentialsForProofRequest, EngineError>;

    /// Witness for `index` against the registry's state at `timestamp`.
    fn create_revocation_state(
        &self,
        tails: &TailsHandle,
        definition: &RevocationRegistryDefinition,
        delta: &RevocationRegistryDelta,
        timestamp: Timestamp,
        index: u32,
    ) -> Result<RevocationState, EngineError>;

    /// Build a proof for `request` from the selected credentials.
    fn create_proof(
        &self,
        request: &ProofRequest,
        requested: &RequestedCredentials,
        master_secret_name: &str,
        schemas: &BTreeMap<SchemaId, Schema>,
        cred_defs: &BTreeMap<CredentialDefinitionId, CredentialDefinition>,
        revocation_states: &RevocationStates,
    ) -> Result<ProofInfo, EngineError>;

    // ── Verifier ────────────────────────────────────────────────────

    /// Check `proof` against `request` and the ledger data it was built on.
    fn verify_proof(
        &self,
        request: &ProofRequest,
        proof: &ProofInfo,
        used: &UsedData,
    ) -> Result<bool, EngineError>;
}

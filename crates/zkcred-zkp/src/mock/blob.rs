//! Payload shapes and hash constructions of the mock engine.
//!
//! Everything that the trait exposes as an opaque `serde_json::Value` has a
//! typed counterpart here. All hashes are SHA-256 over canonical bytes.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use zkcred_core::{
    sha256_hex, CanonicalBytes, CredentialDefinitionId, PredicateType, RevocationBinding,
    RevocationRegistryId, SchemaId,
};
use zkcred_crypto::{Ed25519PublicKey, Ed25519Signature};

use crate::error::EngineError;

/// `CredentialDefinition::value`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CredDefKey {
    pub verkey: Ed25519PublicKey,
}

/// `CredentialRequest::blinded_ms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BlindedSecret {
    pub ms_commitment: String,
    pub offer_nonce: String,
}

/// `CredentialRequestMetadata::master_secret_blinding_data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BlindingData {
    pub offer_nonce: String,
}

/// `Credential::signature`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CredentialSignature {
    pub commitments: BTreeMap<String, String>,
    pub salts: BTreeMap<String, String>,
    pub ms_commitment: String,
    pub signature: Ed25519Signature,
}

/// `RevocationState::value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Witness {
    pub cred_rev_id: u32,
    pub accum: String,
}

/// Opening of one attribute commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Opening {
    pub encoded: String,
    pub salt: String,
}

/// Opening of the attribute a predicate is over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PredicateOpening {
    pub attr_name: String,
    pub p_type: PredicateType,
    pub p_value: i32,
    pub encoded: String,
    pub salt: String,
}

/// One credential's contribution to a proof.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubProof {
    pub schema_id: SchemaId,
    pub cred_def_id: CredentialDefinitionId,
    pub commitments: BTreeMap<String, String>,
    pub ms_commitment: String,
    pub revocation: RevocationBinding,
    pub signature: Ed25519Signature,
    #[serde(default)]
    pub revealed: BTreeMap<String, Opening>,
    #[serde(default)]
    pub predicates: Vec<PredicateOpening>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_revocation: Option<Witness>,
}

/// `ProofInfo::proof`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MockProof {
    pub nonce: String,
    pub sub_proofs: Vec<SubProof>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignedContent<'a> {
    cred_def_id: &'a CredentialDefinitionId,
    schema_id: &'a SchemaId,
    commitments: &'a BTreeMap<String, String>,
    ms_commitment: &'a str,
    revocation: &'a RevocationBinding,
}

/// The bytes an issuer signs for a credential.
pub(crate) fn signed_content(
    cred_def_id: &CredentialDefinitionId,
    schema_id: &SchemaId,
    commitments: &BTreeMap<String, String>,
    ms_commitment: &str,
    revocation: &RevocationBinding,
) -> Result<CanonicalBytes, EngineError> {
    Ok(CanonicalBytes::new(&SignedContent {
        cred_def_id,
        schema_id,
        commitments,
        ms_commitment,
        revocation,
    })?)
}

/// Salted commitment to one attribute.
pub(crate) fn commitment(name: &str, encoded: &str, salt: &str) -> Result<String, EngineError> {
    let cb = CanonicalBytes::new(&serde_json::json!({
        "name": name,
        "encoded": encoded,
        "salt": salt,
    }))?;
    Ok(sha256_hex(&cb))
}

/// Commitment to a master secret.
pub(crate) fn master_secret_commitment(secret: &str) -> Result<String, EngineError> {
    let cb = CanonicalBytes::new(&serde_json::json!({ "masterSecret": secret }))?;
    Ok(sha256_hex(&cb))
}

/// Accumulator value for a registry's cumulative issued/revoked state.
pub(crate) fn accumulator(
    registry: &RevocationRegistryId,
    issued: &BTreeSet<u32>,
    revoked: &BTreeSet<u32>,
) -> Result<String, EngineError> {
    let cb = CanonicalBytes::new(&serde_json::json!({
        "registry": registry,
        "issued": issued,
        "revoked": revoked,
    }))?;
    Ok(sha256_hex(&cb))
}

/// Hash committed to by a registry definition for its tails file.
pub(crate) fn tails_hash(registry: &RevocationRegistryId, max_cred_num: u32) -> Result<String, EngineError> {
    let cb = CanonicalBytes::new(&serde_json::json!({
        "registry": registry,
        "maxCredNum": max_cred_num,
    }))?;
    Ok(sha256_hex(&cb))
}

/// 128 random bits as lowercase hex.
pub(crate) fn random_hex() -> String {
    format!("{:032x}", rand::random::<u128>())
}

/// 80 random bits as a decimal string, the usual nonce width.
pub(crate) fn random_nonce() -> String {
    (rand::random::<u128>() >> 48).to_string()
}

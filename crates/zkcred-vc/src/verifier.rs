//! # Verifier
//!
//! Builds proof requests, gathers the ledger data a received proof was
//! built against, and checks the proof.
//!
//! Cryptographic validity and application-level value checks are separate
//! steps: the engine proves the revealed values are the ones the issuer
//! signed, [`Verifier::check_revealed_values`] compares them to the values
//! the request asked for.

use std::sync::Arc;

use rand::Rng;
use zkcred_core::{
    CredentialDefinition, Interval, ProofInfo, ProofRequest, ProofRequestBuilder,
    RevocationRegistryDefinition, Schema, UsedData, ZkcredError,
};
use zkcred_wallet::WalletHolder;

/// Proof request nonces are drawn below 2^80.
const NONCE_BITS: u32 = 80;

/// The verifying role of a wallet.
#[derive(Debug, Clone)]
pub struct Verifier {
    holder: Arc<WalletHolder>,
}

impl Verifier {
    pub fn new(holder: Arc<WalletHolder>) -> Self {
        Self { holder }
    }

    pub fn holder(&self) -> &Arc<WalletHolder> {
        &self.holder
    }

    /// A fresh decimal nonce for a proof request.
    pub fn generate_nonce() -> String {
        let n: u128 = rand::thread_rng().gen_range(0..(1u128 << NONCE_BITS));
        n.to_string()
    }

    /// Start a proof request with a fresh nonce.
    pub fn new_proof_request(&self, name: impl Into<String>) -> ProofRequestBuilder {
        ProofRequest::builder(name, Self::generate_nonce())
    }

    /// Fetch every ledger artifact the proof's identifiers reference.
    ///
    /// With a non-revocation interval, also each registry definition and
    /// the registry's cumulative state at the identifier's timestamp. Any
    /// missing artifact fails the whole lookup.
    pub fn get_data_used_in_proof(
        &self,
        request: &ProofRequest,
        proof: &ProofInfo,
    ) -> Result<UsedData, ZkcredError> {
        let ledger = self.holder.ledger();
        let mut used = UsedData::default();
        for identifier in &proof.identifiers {
            if !used.schemas.contains_key(&identifier.schema_id) {
                used.schemas.insert(
                    identifier.schema_id.clone(),
                    ledger.require::<Schema>(&identifier.schema_id)?,
                );
            }
            if !used.cred_defs.contains_key(&identifier.cred_def_id) {
                used.cred_defs.insert(
                    identifier.cred_def_id.clone(),
                    ledger.require::<CredentialDefinition>(&identifier.cred_def_id)?,
                );
            }
            if request.non_revoked.is_none() {
                continue;
            }
            let (Some(registry), Some(timestamp)) = (&identifier.rev_reg_id, identifier.timestamp)
            else {
                continue;
            };
            if !used.rev_reg_defs.contains_key(registry) {
                used.rev_reg_defs.insert(
                    registry.clone(),
                    ledger.require::<RevocationRegistryDefinition>(registry)?,
                );
            }
            let at_timestamp = used.rev_regs.entry(registry.clone()).or_default();
            if !at_timestamp.contains_key(&timestamp) {
                let (delta, _) = ledger.retrieve_revocation_delta(registry, Interval::at(timestamp))?;
                at_timestamp.insert(timestamp, delta);
            }
        }
        Ok(used)
    }

    /// Cryptographic check. `Ok(false)` when the proof does not verify,
    /// `Err` when it cannot be checked.
    pub fn verify_proof(
        &self,
        request: &ProofRequest,
        proof: &ProofInfo,
        used: &UsedData,
    ) -> Result<bool, ZkcredError> {
        Ok(self.holder.engine().verify_proof(request, proof, used)?)
    }

    /// Whether every revealed attribute with a requested value carries
    /// exactly that raw value. Attributes requested without a value pass.
    pub fn check_revealed_values(request: &ProofRequest, proof: &ProofInfo) -> bool {
        request
            .expected_values()
            .into_iter()
            .all(|(referent, expected)| {
                let ok = proof.revealed_raw(referent) == Some(expected);
                if !ok {
                    tracing::debug!(referent, expected, "revealed value does not match request");
                }
                ok
            })
    }

    /// Gather ledger data, check the proof, then check revealed values.
    pub fn verify(&self, request: &ProofRequest, proof: &ProofInfo) -> Result<bool, ZkcredError> {
        let used = self.get_data_used_in_proof(request, proof)?;
        if !self.verify_proof(request, proof, &used)? {
            tracing::info!(request = %request.name, "proof failed cryptographic verification");
            return Ok(false);
        }
        let values_match = Self::check_revealed_values(request, proof);
        tracing::info!(request = %request.name, values_match, "verified proof");
        Ok(values_match)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use zkcred_core::{CredentialFieldReference, RequestedProof, RevealedAttribute};

    fn proof_revealing(pairs: &[(&str, &str)]) -> ProofInfo {
        let revealed_attrs: BTreeMap<String, RevealedAttribute> = pairs
            .iter()
            .map(|(referent, raw)| {
                (
                    referent.to_string(),
                    RevealedAttribute {
                        raw: raw.to_string(),
                        encoded: zkcred_core::encode_attribute_value(raw),
                        sub_proof_index: 0,
                    },
                )
            })
            .collect();
        ProofInfo {
            proof: serde_json::json!({}),
            requested_proof: RequestedProof {
                revealed_attrs,
                predicates: BTreeMap::new(),
            },
            identifiers: vec![],
        }
    }

    #[test]
    fn nonces_are_decimal_and_bounded() {
        for _ in 0..32 {
            let nonce = Verifier::generate_nonce();
            let n: u128 = nonce.parse().unwrap();
            assert!(n < 1u128 << NONCE_BITS);
        }
        assert_ne!(Verifier::generate_nonce(), Verifier::generate_nonce());
    }

    #[test]
    fn revealed_values_must_match_requested_values() {
        let request = ProofRequest::builder("check", "1")
            .attribute("name", CredentialFieldReference::new("name").with_value("Alice"))
            .attribute("city", CredentialFieldReference::new("city"))
            .build();
        assert!(Verifier::check_revealed_values(
            &request,
            &proof_revealing(&[("name", "Alice"), ("city", "Paris")])
        ));
        assert!(!Verifier::check_revealed_values(
            &request,
            &proof_revealing(&[("name", "Bob"), ("city", "Paris")])
        ));
        assert!(!Verifier::check_revealed_values(&request, &proof_revealing(&[("city", "Paris")])));
    }
}

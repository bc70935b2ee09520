//! # Prover
//!
//! The holding role of a wallet: requests credentials, stores what it is
//! issued, and answers proof requests.
//!
//! Proof construction resolves everything it needs from the ledger at
//! proof time. Schemas and credential definitions come through the
//! artifact cache; revocation state is rebuilt from the registry's merged
//! delta for the request's interval on every proof.

use std::collections::BTreeMap;
use std::sync::Arc;

use zkcred_core::{
    CredentialDefinition, CredentialId, CredentialInfo, CredentialOffer, CredentialRequest,
    CredentialRequestMetadata, Did, ProofInfo, ProofRequest, RequestedAttribute,
    RequestedCredentials, RequestedPredicate, RevocationBinding, RevocationRegistryDefinition,
    RevocationRegistryDelta, RevocationRegistryId, Schema, Timestamp, ZkcredError,
};
use zkcred_wallet::WalletHolder;
use zkcred_zkp::{RevocationStates, TailsHandle};

use crate::selection::select_credentials;

/// The proving role of a wallet.
#[derive(Debug, Clone)]
pub struct Prover {
    holder: Arc<WalletHolder>,
}

impl Prover {
    pub fn new(holder: Arc<WalletHolder>) -> Self {
        Self { holder }
    }

    pub fn holder(&self) -> &Arc<WalletHolder> {
        &self.holder
    }

    /// Answer `offer` with a blinded request bound to `prover_did`.
    pub fn create_credential_request(
        &self,
        offer: &CredentialOffer,
        prover_did: &Did,
    ) -> Result<(CredentialRequest, CredentialRequestMetadata), ZkcredError> {
        let cred_def = self
            .holder
            .ledger()
            .require::<CredentialDefinition>(&offer.cred_def_id)?;
        Ok(self.holder.engine().create_credential_request(
            prover_did,
            offer,
            &cred_def,
            self.holder.master_secret_id(),
        )?)
    }

    /// Validate an issued credential against its ledger artifacts and
    /// store it.
    pub fn store_credential(
        &self,
        metadata: &CredentialRequestMetadata,
        info: &CredentialInfo,
    ) -> Result<CredentialId, ZkcredError> {
        let ledger = self.holder.ledger();
        let credential = &info.credential;
        ledger.require::<Schema>(&credential.schema_id)?;
        let cred_def = ledger.require::<CredentialDefinition>(&credential.cred_def_id)?;
        let rev_reg_def = match credential.revocation.registry() {
            Some(registry) => Some(ledger.require::<RevocationRegistryDefinition>(registry)?),
            None => None,
        };
        let id = self.holder.engine().store_credential(
            None,
            metadata,
            credential,
            &cred_def,
            rev_reg_def.as_ref(),
        )?;
        tracing::info!(credential_id = %id, cred_def_id = %credential.cred_def_id, "stored credential");
        Ok(id)
    }

    /// Build a proof for `request` from the wallet's stored credentials.
    pub fn create_proof(
        &self,
        request: &ProofRequest,
        master_secret_id: &str,
    ) -> Result<ProofInfo, ZkcredError> {
        let ledger = self.holder.ledger();
        let engine = self.holder.engine();
        let candidates = engine.credentials_for_proof_request(request)?;
        let selection = select_credentials(request, &candidates)?;
        let chosen = selection.distinct();

        let mut timestamps: BTreeMap<&str, Timestamp> = BTreeMap::new();
        let mut revocation_states = RevocationStates::new();
        if let Some(interval) = request.non_revoked {
            let mut resolved: BTreeMap<RevocationRegistryId, (RevocationRegistryDelta, Timestamp)> =
                BTreeMap::new();
            for (cred_id, held) in &chosen {
                let RevocationBinding::Revocable { registry, index } = &held.revocation else {
                    continue;
                };
                let definition = ledger.require::<RevocationRegistryDefinition>(registry)?;
                let (delta, timestamp) = match resolved.get(registry) {
                    Some(found) => found.clone(),
                    None => {
                        let found = ledger.retrieve_revocation_delta(registry, interval)?;
                        resolved.insert(registry.clone(), found.clone());
                        found
                    }
                };
                let state = engine.create_revocation_state(
                    &TailsHandle::for_definition(&definition),
                    &definition,
                    &delta,
                    timestamp,
                    *index,
                )?;
                revocation_states
                    .entry(registry.clone())
                    .or_default()
                    .insert(timestamp, state);
                timestamps.insert(*cred_id, timestamp);
            }
        }

        let requested = RequestedCredentials {
            requested_attributes: selection
                .attrs
                .iter()
                .map(|(referent, held)| {
                    (
                        referent.clone(),
                        RequestedAttribute {
                            cred_id: held.id.clone(),
                            timestamp: timestamps.get(held.id.as_str()).copied(),
                            revealed: true,
                        },
                    )
                })
                .collect(),
            requested_predicates: selection
                .predicates
                .iter()
                .map(|(referent, held)| {
                    (
                        referent.clone(),
                        RequestedPredicate {
                            cred_id: held.id.clone(),
                            timestamp: timestamps.get(held.id.as_str()).copied(),
                        },
                    )
                })
                .collect(),
        };

        let mut schemas = BTreeMap::new();
        let mut cred_defs = BTreeMap::new();
        for held in chosen.values() {
            if !schemas.contains_key(&held.schema_id) {
                schemas.insert(held.schema_id.clone(), ledger.require::<Schema>(&held.schema_id)?);
            }
            if !cred_defs.contains_key(&held.cred_def_id) {
                cred_defs.insert(
                    held.cred_def_id.clone(),
                    ledger.require::<CredentialDefinition>(&held.cred_def_id)?,
                );
            }
        }

        let proof = engine.create_proof(
            request,
            &requested,
            master_secret_id,
            &schemas,
            &cred_defs,
            &revocation_states,
        )?;
        tracing::info!(
            request = %request.name,
            credentials = chosen.len(),
            revocation_states = revocation_states.len(),
            "created proof"
        );
        Ok(proof)
    }
}

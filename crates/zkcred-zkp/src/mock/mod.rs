//! # Mock Credential Engine
//!
//! A deterministic, transparent engine for development and tests.
//!
//! Issuers sign salted SHA-256 commitments to each attribute with a
//! per-definition Ed25519 key. Proofs open the commitments they need and
//! carry the issuer signature, so tampering with a revealed value, a
//! predicate, or the revocation witness makes verification fail. The
//! accumulator is a hash of the registry's cumulative issued/revoked sets.
//!
//! ## Security Notice
//!
//! Proofs reveal predicate values, credential indices, and a stable master
//! secret commitment. There is no zero-knowledge property and proofs are
//! linkable. [`EnginePolicy::production`](crate::EnginePolicy::production)
//! rejects this backend.

mod blob;
mod proof;

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use zkcred_core::{
    is_encoding_of, sha256_hex, AttributeValue, CanonicalBytes, Credential, CredentialDefinition,
    CredentialDefinitionId, CredentialId, CredentialOffer, CredentialRequest,
    CredentialRequestMetadata, Did, HeldCredential, IssuanceType, ProofInfo, ProofRequest,
    RequestedCredentials, RevocationBinding, RevocationRegistryDefinition,
    RevocationRegistryDelta, RevocationRegistryId, RevocationState, Schema, SchemaId, Timestamp,
    UsedData, MAX_REGISTRY_CAPACITY,
};
use zkcred_crypto::{verify, Ed25519KeyPair};

use self::blob::{
    accumulator, commitment, master_secret_commitment, random_hex, random_nonce, signed_content,
    tails_hash, BlindedSecret, BlindingData, CredDefKey, CredentialSignature, Witness,
};
use crate::error::EngineError;
use crate::policy::EngineBackend;
use crate::tails::TailsHandle;
use crate::traits::{CredentialEngine, CredentialsForProofRequest, RevocationSlot, RevocationStates};

/// Signature type written into every definition this engine creates.
pub const SIGNATURE_TYPE: &str = "CL";

#[derive(Debug, Clone)]
struct StoredCredential {
    id: CredentialId,
    credential: Credential,
}

impl StoredCredential {
    fn held(&self) -> HeldCredential {
        HeldCredential {
            id: self.id.clone(),
            attrs: self
                .credential
                .values
                .iter()
                .map(|(k, v)| (k.clone(), v.raw.clone()))
                .collect(),
            schema_id: self.credential.schema_id.clone(),
            cred_def_id: self.credential.cred_def_id.clone(),
            revocation: self.credential.revocation.clone(),
        }
    }
}

/// Transparent in-process credential engine bound to one party.
#[derive(Debug, Default)]
pub struct MockCredentialEngine {
    issuer_keys: RwLock<HashMap<CredentialDefinitionId, Ed25519KeyPair>>,
    master_secrets: RwLock<HashMap<String, String>>,
    /// Insertion order is storage order.
    credentials: RwLock<Vec<StoredCredential>>,
}

impl MockCredentialEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored credentials.
    pub fn credential_count(&self) -> usize {
        self.credentials.read().len()
    }

    fn master_secret(&self, name: &str) -> Result<String, EngineError> {
        self.master_secrets
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownMasterSecret(name.to_string()))
    }

    fn stored(&self, id: &CredentialId) -> Result<StoredCredential, EngineError> {
        self.credentials
            .read()
            .iter()
            .find(|c| &c.id == id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownCredential(id.to_string()))
    }
}

fn cred_def_key(cred_def: &CredentialDefinition) -> Result<CredDefKey, EngineError> {
    serde_json::from_value(cred_def.value.clone()).map_err(|e| {
        EngineError::InvalidInput(format!(
            "credential definition {} has no usable public key: {e}",
            cred_def.id
        ))
    })
}

fn check_registry_capacity(max_cred_num: u32) -> Result<(), EngineError> {
    if max_cred_num == 0 || max_cred_num > MAX_REGISTRY_CAPACITY {
        return Err(EngineError::InvalidInput(format!(
            "registry capacity {max_cred_num} outside 1..={MAX_REGISTRY_CAPACITY}"
        )));
    }
    Ok(())
}

impl CredentialEngine for MockCredentialEngine {
    fn backend(&self) -> EngineBackend {
        EngineBackend::Mock
    }

    fn create_schema(
        &self,
        issuer: &Did,
        name: &str,
        version: &str,
        attr_names: &[String],
    ) -> Result<Schema, EngineError> {
        Schema::new(issuer.clone(), name, version, attr_names.to_vec())
            .map_err(|e| EngineError::InvalidInput(e.to_string()))
    }

    fn create_credential_definition(
        &self,
        issuer: &Did,
        schema: &Schema,
        tag: &str,
        supports_revocation: bool,
    ) -> Result<CredentialDefinition, EngineError> {
        let seq_no = schema.seq_no.ok_or_else(|| {
            EngineError::InvalidInput(format!(
                "schema {} has no ledger sequence number",
                schema.id
            ))
        })?;
        let id = CredentialDefinitionId::new(issuer.clone(), seq_no, tag)
            .map_err(|e| EngineError::InvalidInput(e.to_string()))?;
        // Racing creators of the same id must publish the same key.
        let verkey = self
            .issuer_keys
            .write()
            .entry(id.clone())
            .or_insert_with(Ed25519KeyPair::generate)
            .public_key();
        Ok(CredentialDefinition {
            id,
            schema_id: schema.id.clone(),
            signature_type: SIGNATURE_TYPE.to_string(),
            tag: tag.to_string(),
            value: serde_json::to_value(CredDefKey { verkey })?,
            supports_revocation,
        })
    }

    fn create_revocation_registry(
        &self,
        issuer: &Did,
        cred_def: &CredentialDefinition,
        tag: &str,
        max_cred_num: u32,
        issuance_type: IssuanceType,
    ) -> Result<(RevocationRegistryDefinition, RevocationRegistryDelta), EngineError> {
        if issuance_type != IssuanceType::OnDemand {
            return Err(EngineError::Unsupported(
                "the mock engine only supports ISSUANCE_ON_DEMAND registries".into(),
            ));
        }
        if !cred_def.supports_revocation {
            return Err(EngineError::InvalidInput(format!(
                "credential definition {} does not support revocation",
                cred_def.id
            )));
        }
        check_registry_capacity(max_cred_num)?;
        let id = RevocationRegistryId::new(issuer.clone(), cred_def.id.clone(), tag)
            .map_err(|e| EngineError::InvalidInput(e.to_string()))?;
        let tails = tails_hash(&id, max_cred_num)?;
        let accum_key = sha256_hex(&CanonicalBytes::new(&id)?);
        let genesis = RevocationRegistryDelta {
            prev_accum: None,
            accum: accumulator(&id, &Default::default(), &Default::default())?,
            issued: Default::default(),
            revoked: Default::default(),
        };
        let definition = RevocationRegistryDefinition {
            tails_location: format!("tails/{tails}"),
            id,
            cred_def_id: cred_def.id.clone(),
            tag: tag.to_string(),
            issuance_type,
            max_cred_num,
            public_keys: serde_json::json!({ "accumKey": accum_key }),
            tails_hash: tails,
        };
        Ok((definition, genesis))
    }

    fn create_credential_offer(
        &self,
        cred_def: &CredentialDefinition,
    ) -> Result<CredentialOffer, EngineError> {
        if !self.issuer_keys.read().contains_key(&cred_def.id) {
            return Err(EngineError::UnknownCredentialDefinition(cred_def.id.to_string()));
        }
        Ok(CredentialOffer {
            schema_id: cred_def.schema_id.clone(),
            cred_def_id: cred_def.id.clone(),
            issuer_did: cred_def.id.issuer().clone(),
            nonce: random_nonce(),
        })
    }

    fn issue_credential(
        &self,
        offer: &CredentialOffer,
        request: &CredentialRequest,
        values: &BTreeMap<String, AttributeValue>,
        revocation: Option<RevocationSlot<'_>>,
    ) -> Result<(Credential, Option<RevocationRegistryDelta>), EngineError> {
        if request.cred_def_id != offer.cred_def_id {
            return Err(EngineError::InvalidInput(format!(
                "request is for {}, offer is for {}",
                request.cred_def_id, offer.cred_def_id
            )));
        }
        let blinded: BlindedSecret = serde_json::from_value(request.blinded_ms.clone())
            .map_err(|e| EngineError::InvalidInput(format!("blinded master secret: {e}")))?;
        if blinded.offer_nonce != offer.nonce {
            return Err(EngineError::InvalidInput(
                "credential request does not answer this offer".into(),
            ));
        }
        for (name, value) in values {
            if !is_encoding_of(&value.raw, &value.encoded) {
                return Err(EngineError::InvalidInput(format!(
                    "attribute \"{name}\" encoding does not match its raw value"
                )));
            }
        }

        let (binding, delta) = match revocation {
            None => (RevocationBinding::NonRevocable, None),
            Some(slot) => {
                let def = slot.definition;
                if def.cred_def_id != offer.cred_def_id {
                    return Err(EngineError::InvalidInput(format!(
                        "registry {} does not serve {}",
                        def.id, offer.cred_def_id
                    )));
                }
                if slot.index == 0 || slot.index > def.max_cred_num {
                    return Err(EngineError::InvalidInput(format!(
                        "index {} outside registry capacity {}",
                        slot.index, def.max_cred_num
                    )));
                }
                if slot.current.issued.contains(&slot.index)
                    || slot.current.revoked.contains(&slot.index)
                {
                    return Err(EngineError::InvalidInput(format!(
                        "index {} already allocated in {}",
                        slot.index, def.id
                    )));
                }
                let mut issued = slot.current.issued.clone();
                issued.insert(slot.index);
                let delta = RevocationRegistryDelta {
                    prev_accum: Some(slot.current.accum.clone()),
                    accum: accumulator(&def.id, &issued, &slot.current.revoked)?,
                    issued: [slot.index].into(),
                    revoked: Default::default(),
                };
                (
                    RevocationBinding::Revocable {
                        registry: def.id.clone(),
                        index: slot.index,
                    },
                    Some(delta),
                )
            }
        };

        let mut salts = BTreeMap::new();
        let mut commitments = BTreeMap::new();
        for (name, value) in values {
            let salt = random_hex();
            commitments.insert(name.clone(), commitment(name, &value.encoded, &salt)?);
            salts.insert(name.clone(), salt);
        }
        let content = signed_content(
            &offer.cred_def_id,
            &offer.schema_id,
            &commitments,
            &blinded.ms_commitment,
            &binding,
        )?;
        let signature = {
            let keys = self.issuer_keys.read();
            let key = keys
                .get(&offer.cred_def_id)
                .ok_or_else(|| EngineError::UnknownCredentialDefinition(offer.cred_def_id.to_string()))?;
            key.sign(&content)
        };
        let credential = Credential {
            schema_id: offer.schema_id.clone(),
            cred_def_id: offer.cred_def_id.clone(),
            values: values.clone(),
            signature: serde_json::to_value(CredentialSignature {
                commitments,
                salts,
                ms_commitment: blinded.ms_commitment,
                signature,
            })?,
            revocation: binding,
        };
        Ok((credential, delta))
    }

    fn revoke_credential(
        &self,
        definition: &RevocationRegistryDefinition,
        current: &RevocationRegistryDelta,
        index: u32,
    ) -> Result<RevocationRegistryDelta, EngineError> {
        if current.revoked.contains(&index) {
            return Err(EngineError::InvalidInput(format!(
                "index {index} in {} is already revoked",
                definition.id
            )));
        }
        if !current.issued.contains(&index) {
            return Err(EngineError::InvalidInput(format!(
                "index {index} in {} was never issued",
                definition.id
            )));
        }
        let mut issued = current.issued.clone();
        issued.remove(&index);
        let mut revoked = current.revoked.clone();
        revoked.insert(index);
        Ok(RevocationRegistryDelta {
            prev_accum: Some(current.accum.clone()),
            accum: accumulator(&definition.id, &issued, &revoked)?,
            issued: Default::default(),
            revoked: [index].into(),
        })
    }

    fn create_master_secret(&self, name: &str) -> Result<(), EngineError> {
        if name.is_empty() {
            return Err(EngineError::InvalidInput("master secret name is empty".into()));
        }
        self.master_secrets
            .write()
            .entry(name.to_string())
            .or_insert_with(|| format!("{}{}", random_hex(), random_hex()));
        Ok(())
    }

    fn create_credential_request(
        &self,
        prover_did: &Did,
        offer: &CredentialOffer,
        cred_def: &CredentialDefinition,
        master_secret_name: &str,
    ) -> Result<(CredentialRequest, CredentialRequestMetadata), EngineError> {
        if offer.cred_def_id != cred_def.id {
            return Err(EngineError::InvalidInput(format!(
                "offer is for {}, definition is {}",
                offer.cred_def_id, cred_def.id
            )));
        }
        let secret = self.master_secret(master_secret_name)?;
        let blinded = BlindedSecret {
            ms_commitment: master_secret_commitment(&secret)?,
            offer_nonce: offer.nonce.clone(),
        };
        let nonce = random_nonce();
        let request = CredentialRequest {
            prover_did: prover_did.clone(),
            cred_def_id: cred_def.id.clone(),
            blinded_ms: serde_json::to_value(blinded)?,
            nonce: nonce.clone(),
        };
        let metadata = CredentialRequestMetadata {
            master_secret_name: master_secret_name.to_string(),
            master_secret_blinding_data: serde_json::to_value(BlindingData {
                offer_nonce: offer.nonce.clone(),
            })?,
            nonce,
        };
        Ok((request, metadata))
    }

    fn store_credential(
        &self,
        id: Option<CredentialId>,
        metadata: &CredentialRequestMetadata,
        credential: &Credential,
        cred_def: &CredentialDefinition,
        rev_reg_def: Option<&RevocationRegistryDefinition>,
    ) -> Result<CredentialId, EngineError> {
        let reject = |msg: String| EngineError::CredentialRejected(msg);
        if credential.cred_def_id != cred_def.id || credential.schema_id != cred_def.schema_id {
            return Err(reject(format!(
                "credential does not belong to definition {}",
                cred_def.id
            )));
        }
        let sig: CredentialSignature = serde_json::from_value(credential.signature.clone())
            .map_err(|e| reject(format!("unreadable signature: {e}")))?;
        let content = signed_content(
            &credential.cred_def_id,
            &credential.schema_id,
            &sig.commitments,
            &sig.ms_commitment,
            &credential.revocation,
        )?;
        verify(&content, &sig.signature, &cred_def_key(cred_def)?.verkey)
            .map_err(|_| reject("issuer signature does not verify".into()))?;

        if sig.commitments.len() != credential.values.len() {
            return Err(reject("signed attribute set differs from values".into()));
        }
        for (name, value) in &credential.values {
            let opens = match (sig.commitments.get(name), sig.salts.get(name)) {
                (Some(c), Some(salt)) => *c == commitment(name, &value.encoded, salt)?,
                _ => false,
            };
            if !opens || !is_encoding_of(&value.raw, &value.encoded) {
                return Err(reject(format!("attribute \"{name}\" does not match its commitment")));
            }
        }

        let secret = self.master_secret(&metadata.master_secret_name)?;
        if sig.ms_commitment != master_secret_commitment(&secret)? {
            return Err(reject("credential is bound to a different master secret".into()));
        }

        if let RevocationBinding::Revocable { registry, index } = &credential.revocation {
            match rev_reg_def {
                Some(def) if &def.id == registry && *index <= def.max_cred_num => {}
                Some(def) => {
                    return Err(reject(format!(
                        "revocation binding does not fit registry {}",
                        def.id
                    )))
                }
                None => return Err(reject(format!("registry {registry} not supplied"))),
            }
        }

        let id = id.unwrap_or_default();
        let mut creds = self.credentials.write();
        if creds.iter().any(|c| c.id == id) {
            return Err(EngineError::InvalidInput(format!("credential id {id} already in use")));
        }
        creds.push(StoredCredential {
            id: id.clone(),
            credential: credential.clone(),
        });
        tracing::debug!(credential = %id, cred_def = %cred_def.id, "stored credential");
        Ok(id)
    }

    fn credentials_for_proof_request(
        &self,
        request: &ProofRequest,
    ) -> Result<CredentialsForProofRequest, EngineError> {
        let held: Vec<HeldCredential> = self.credentials.read().iter().map(|c| c.held()).collect();
        let attrs = request
            .requested_attributes
            .iter()
            .map(|(referent, field)| {
                let candidates = held.iter().filter(|c| field.can_supply(c)).cloned().collect();
                (referent.clone(), candidates)
            })
            .collect();
        let predicates = request
            .requested_predicates
            .iter()
            .map(|(referent, pred)| {
                let candidates = held.iter().filter(|c| pred.can_supply(c)).cloned().collect();
                (referent.clone(), candidates)
            })
            .collect();
        Ok(CredentialsForProofRequest { attrs, predicates })
    }

    fn create_revocation_state(
        &self,
        tails: &TailsHandle,
        definition: &RevocationRegistryDefinition,
        delta: &RevocationRegistryDelta,
        timestamp: Timestamp,
        index: u32,
    ) -> Result<RevocationState, EngineError> {
        if !tails.matches(definition) {
            return Err(EngineError::TailsMismatch {
                expected: definition.tails_hash.clone(),
                actual: tails.hash.clone(),
            });
        }
        if index == 0 || index > definition.max_cred_num {
            return Err(EngineError::InvalidInput(format!(
                "index {index} outside registry capacity {}",
                definition.max_cred_num
            )));
        }
        Ok(RevocationState {
            registry: definition.id.clone(),
            timestamp,
            value: serde_json::to_value(Witness {
                cred_rev_id: index,
                accum: delta.accum.clone(),
            })?,
        })
    }

    fn create_proof(
        &self,
        request: &ProofRequest,
        requested: &RequestedCredentials,
        master_secret_name: &str,
        schemas: &BTreeMap<SchemaId, Schema>,
        cred_defs: &BTreeMap<CredentialDefinitionId, CredentialDefinition>,
        revocation_states: &RevocationStates,
    ) -> Result<ProofInfo, EngineError> {
        let secret = self.master_secret(master_secret_name)?;
        proof::create(
            |id| self.stored(id).map(|s| s.credential),
            &master_secret_commitment(&secret)?,
            request,
            requested,
            schemas,
            cred_defs,
            revocation_states,
        )
    }

    fn verify_proof(
        &self,
        request: &ProofRequest,
        proof: &ProofInfo,
        used: &UsedData,
    ) -> Result<bool, EngineError> {
        proof::verify(request, proof, used)
    }
}

//! Proof construction and verification for the mock engine.

use std::collections::{BTreeMap, HashMap};

use zkcred_core::{
    encoded_as_i32, is_encoding_of, restrictions_admit, Credential, CredentialDefinition,
    CredentialDefinitionId, CredentialId, PredicateReferent, ProofIdentifier, ProofInfo,
    ProofRequest, RequestedCredentials, RequestedProof, RevealedAttribute, RevocationBinding,
    Schema, SchemaId, Timestamp, UsedData,
};
use zkcred_crypto::verify as verify_signature;

use super::blob::{
    commitment, signed_content, CredDefKey, CredentialSignature, MockProof, Opening,
    PredicateOpening, SubProof, Witness,
};
use crate::error::EngineError;
use crate::traits::RevocationStates;

struct Selected {
    credential: Credential,
    salts: BTreeMap<String, String>,
}

/// Build a proof. `fetch` resolves a wallet credential id.
pub(super) fn create(
    fetch: impl Fn(&CredentialId) -> Result<Credential, EngineError>,
    ms_commitment: &str,
    request: &ProofRequest,
    requested: &RequestedCredentials,
    schemas: &BTreeMap<SchemaId, Schema>,
    cred_defs: &BTreeMap<CredentialDefinitionId, CredentialDefinition>,
    revocation_states: &RevocationStates,
) -> Result<ProofInfo, EngineError> {
    for referent in request.requested_attributes.keys() {
        if !requested.requested_attributes.contains_key(referent) {
            return Err(EngineError::InvalidInput(format!(
                "no credential selected for attribute referent \"{referent}\""
            )));
        }
    }
    for referent in request.requested_predicates.keys() {
        if !requested.requested_predicates.contains_key(referent) {
            return Err(EngineError::InvalidInput(format!(
                "no credential selected for predicate referent \"{referent}\""
            )));
        }
    }

    let mut sub_proofs: Vec<SubProof> = Vec::new();
    let mut selected: Vec<Selected> = Vec::new();
    let mut identifiers: Vec<ProofIdentifier> = Vec::new();
    let mut index_of: HashMap<(CredentialId, Option<Timestamp>), usize> = HashMap::new();

    let mut sub_proof_index = |cred_id: &CredentialId,
                               timestamp: Option<Timestamp>|
     -> Result<usize, EngineError> {
        if let Some(idx) = index_of.get(&(cred_id.clone(), timestamp)) {
            return Ok(*idx);
        }
        let credential = fetch(cred_id)?;
        let sig: CredentialSignature = serde_json::from_value(credential.signature.clone())
            .map_err(|e| EngineError::InvalidInput(format!("credential {cred_id}: {e}")))?;
        if sig.ms_commitment != ms_commitment {
            return Err(EngineError::InvalidInput(format!(
                "credential {cred_id} is bound to a different master secret"
            )));
        }
        if !schemas.contains_key(&credential.schema_id) {
            return Err(EngineError::MissingData(format!("schema {}", credential.schema_id)));
        }
        if !cred_defs.contains_key(&credential.cred_def_id) {
            return Err(EngineError::MissingData(format!(
                "credential definition {}",
                credential.cred_def_id
            )));
        }

        let non_revocation = match (&credential.revocation, timestamp) {
            (RevocationBinding::Revocable { registry, index }, Some(ts)) => {
                let state = revocation_states
                    .get(registry)
                    .and_then(|by_ts| by_ts.get(&ts))
                    .ok_or_else(|| {
                        EngineError::MissingData(format!("revocation state for {registry} at {ts}"))
                    })?;
                let state: Witness = serde_json::from_value(state.value.clone())
                    .map_err(|e| EngineError::InvalidInput(format!("revocation state: {e}")))?;
                // One state per registry and timestamp serves every index in it.
                Some(Witness {
                    cred_rev_id: *index,
                    accum: state.accum,
                })
            }
            _ => None,
        };

        identifiers.push(ProofIdentifier {
            schema_id: credential.schema_id.clone(),
            cred_def_id: credential.cred_def_id.clone(),
            rev_reg_id: credential.revocation.registry().cloned(),
            timestamp: non_revocation.as_ref().and(timestamp),
        });
        sub_proofs.push(SubProof {
            schema_id: credential.schema_id.clone(),
            cred_def_id: credential.cred_def_id.clone(),
            commitments: sig.commitments,
            ms_commitment: sig.ms_commitment,
            revocation: credential.revocation.clone(),
            signature: sig.signature,
            revealed: BTreeMap::new(),
            predicates: Vec::new(),
            non_revocation,
        });
        selected.push(Selected {
            credential,
            salts: sig.salts,
        });
        let idx = sub_proofs.len() - 1;
        index_of.insert((cred_id.clone(), timestamp), idx);
        Ok(idx)
    };

    let mut attr_slots = Vec::new();
    for (referent, choice) in &requested.requested_attributes {
        let idx = sub_proof_index(&choice.cred_id, choice.timestamp)?;
        attr_slots.push((referent, choice.revealed, idx));
    }
    let mut pred_slots = Vec::new();
    for (referent, choice) in &requested.requested_predicates {
        let idx = sub_proof_index(&choice.cred_id, choice.timestamp)?;
        pred_slots.push((referent, idx));
    }

    let mut requested_proof = RequestedProof::default();
    for (referent, revealed, idx) in attr_slots {
        let field = request.requested_attributes.get(referent).ok_or_else(|| {
            EngineError::InvalidInput(format!("referent \"{referent}\" is not in the request"))
        })?;
        let sel = &selected[idx];
        let value = sel.credential.values.get(&field.name).ok_or_else(|| {
            EngineError::InvalidInput(format!("selected credential has no \"{}\"", field.name))
        })?;
        if !revealed {
            continue;
        }
        let salt = sel.salts.get(&field.name).cloned().unwrap_or_default();
        sub_proofs[idx].revealed.insert(
            field.name.clone(),
            Opening {
                encoded: value.encoded.clone(),
                salt,
            },
        );
        requested_proof.revealed_attrs.insert(
            referent.clone(),
            RevealedAttribute {
                raw: value.raw.clone(),
                encoded: value.encoded.clone(),
                sub_proof_index: idx,
            },
        );
    }
    for (referent, idx) in pred_slots {
        let pred = request.requested_predicates.get(referent).ok_or_else(|| {
            EngineError::InvalidInput(format!("referent \"{referent}\" is not in the request"))
        })?;
        let sel = &selected[idx];
        let value = sel.credential.values.get(&pred.name).ok_or_else(|| {
            EngineError::InvalidInput(format!("selected credential has no \"{}\"", pred.name))
        })?;
        let satisfied = encoded_as_i32(&value.encoded)
            .map(|v| pred.p_type.holds(v, pred.p_value))
            .unwrap_or(false);
        if !satisfied {
            return Err(EngineError::InvalidInput(format!(
                "selected credential does not satisfy {} {} {}",
                pred.name, pred.p_type, pred.p_value
            )));
        }
        sub_proofs[idx].predicates.push(PredicateOpening {
            attr_name: pred.name.clone(),
            p_type: pred.p_type,
            p_value: pred.p_value,
            encoded: value.encoded.clone(),
            salt: sel.salts.get(&pred.name).cloned().unwrap_or_default(),
        });
        requested_proof
            .predicates
            .insert(referent.clone(), PredicateReferent { sub_proof_index: idx });
    }

    let proof = MockProof {
        nonce: request.nonce.clone(),
        sub_proofs,
    };
    Ok(ProofInfo {
        proof: serde_json::to_value(proof)?,
        requested_proof,
        identifiers,
    })
}

enum Verdict {
    Valid,
    Invalid(String),
}

macro_rules! ensure {
    ($cond:expr, $($reason:tt)+) => {
        if !$cond {
            return Ok(Verdict::Invalid(format!($($reason)+)));
        }
    };
}

/// Verify a proof. Missing used-data is an error; anything that merely
/// fails to check out is `Ok(false)`.
pub(super) fn verify(
    request: &ProofRequest,
    proof: &ProofInfo,
    used: &UsedData,
) -> Result<bool, EngineError> {
    match check(request, proof, used)? {
        Verdict::Valid => Ok(true),
        Verdict::Invalid(reason) => {
            tracing::debug!(%reason, request = %request.name, "proof rejected");
            Ok(false)
        }
    }
}

fn check(request: &ProofRequest, proof: &ProofInfo, used: &UsedData) -> Result<Verdict, EngineError> {
    let blob: MockProof = serde_json::from_value(proof.proof.clone())
        .map_err(|e| EngineError::MalformedProof(e.to_string()))?;
    if blob.sub_proofs.len() != proof.identifiers.len() {
        return Err(EngineError::MalformedProof(format!(
            "{} sub-proofs but {} identifiers",
            blob.sub_proofs.len(),
            proof.identifiers.len()
        )));
    }
    ensure!(blob.nonce == request.nonce, "nonce does not match the request");

    let mut ms_commitment: Option<&str> = None;
    for (i, (sp, ident)) in blob.sub_proofs.iter().zip(&proof.identifiers).enumerate() {
        ensure!(
            ident.schema_id == sp.schema_id
                && ident.cred_def_id == sp.cred_def_id
                && ident.rev_reg_id.as_ref() == sp.revocation.registry(),
            "identifier {i} does not describe its sub-proof"
        );
        let schema = used
            .schemas
            .get(&sp.schema_id)
            .ok_or_else(|| EngineError::MissingData(format!("schema {}", sp.schema_id)))?;
        let cred_def = used.cred_defs.get(&sp.cred_def_id).ok_or_else(|| {
            EngineError::MissingData(format!("credential definition {}", sp.cred_def_id))
        })?;
        ensure!(cred_def.schema_id == sp.schema_id, "sub-proof {i} schema/definition mismatch");

        let key: CredDefKey = serde_json::from_value(cred_def.value.clone()).map_err(|e| {
            EngineError::MissingData(format!("public key of {}: {e}", cred_def.id))
        })?;
        let content = signed_content(
            &sp.cred_def_id,
            &sp.schema_id,
            &sp.commitments,
            &sp.ms_commitment,
            &sp.revocation,
        )?;
        ensure!(
            verify_signature(&content, &sp.signature, &key.verkey).is_ok(),
            "sub-proof {i} issuer signature does not verify"
        );

        match ms_commitment {
            None => ms_commitment = Some(sp.ms_commitment.as_str()),
            Some(ms) => ensure!(ms == sp.ms_commitment, "sub-proofs use different master secrets"),
        }

        for (name, opening) in &sp.revealed {
            ensure!(schema.has_attribute(name), "sub-proof {i} reveals unknown attribute {name}");
            ensure!(
                sp.commitments.get(name) == Some(&commitment(name, &opening.encoded, &opening.salt)?),
                "sub-proof {i} opening for {name} does not match"
            );
        }
        for p in &sp.predicates {
            ensure!(
                sp.commitments.get(&p.attr_name) == Some(&commitment(&p.attr_name, &p.encoded, &p.salt)?),
                "sub-proof {i} predicate opening for {} does not match",
                p.attr_name
            );
            let holds = encoded_as_i32(&p.encoded)
                .map(|v| p.p_type.holds(v, p.p_value))
                .unwrap_or(false);
            ensure!(holds, "sub-proof {i} predicate on {} does not hold", p.attr_name);
        }

        if let (Some(interval), RevocationBinding::Revocable { registry, index }) =
            (&request.non_revoked, &sp.revocation)
        {
            let Some(ts) = ident.timestamp else {
                return Ok(Verdict::Invalid(format!("sub-proof {i} has no revocation timestamp")));
            };
            let Some(witness) = &sp.non_revocation else {
                return Ok(Verdict::Invalid(format!("sub-proof {i} has no non-revocation witness")));
            };
            ensure!(witness.cred_rev_id == *index, "sub-proof {i} witness index mismatch");
            if let Some(to) = interval.to {
                ensure!(ts <= to, "sub-proof {i} state at {ts} is after the interval");
            }
            let def = used
                .rev_reg_defs
                .get(registry)
                .ok_or_else(|| EngineError::MissingData(format!("revocation registry {registry}")))?;
            ensure!(def.cred_def_id == sp.cred_def_id, "registry {registry} serves another definition");
            let delta = used
                .rev_regs
                .get(registry)
                .and_then(|by_ts| by_ts.get(&ts))
                .ok_or_else(|| {
                    EngineError::MissingData(format!("revocation delta for {registry} at {ts}"))
                })?;
            ensure!(witness.accum == delta.accum, "sub-proof {i} accumulator is stale");
            ensure!(
                delta.issued.contains(index) && !delta.is_revoked(*index),
                "credential {index} in {registry} is revoked at {ts}"
            );
        }
    }

    for (referent, field) in &request.requested_attributes {
        let Some(attr) = proof.requested_proof.revealed_attrs.get(referent) else {
            return Ok(Verdict::Invalid(format!("attribute referent {referent} not revealed")));
        };
        let Some(sp) = blob.sub_proofs.get(attr.sub_proof_index) else {
            return Ok(Verdict::Invalid(format!("referent {referent} points past the sub-proofs")));
        };
        ensure!(
            sp.revealed.get(&field.name).map(|o| &o.encoded) == Some(&attr.encoded),
            "referent {referent} is not backed by its sub-proof"
        );
        ensure!(is_encoding_of(&attr.raw, &attr.encoded), "referent {referent} raw/encoded mismatch");
        ensure!(
            restrictions_admit(&field.restrictions, &sp.schema_id, &sp.cred_def_id),
            "referent {referent} comes from a disallowed source"
        );
    }
    for (referent, pred) in &request.requested_predicates {
        let Some(pr) = proof.requested_proof.predicates.get(referent) else {
            return Ok(Verdict::Invalid(format!("predicate referent {referent} not proven")));
        };
        let Some(sp) = blob.sub_proofs.get(pr.sub_proof_index) else {
            return Ok(Verdict::Invalid(format!("referent {referent} points past the sub-proofs")));
        };
        ensure!(
            sp.predicates.iter().any(|p| p.attr_name == pred.name
                && p.p_type == pred.p_type
                && p.p_value == pred.p_value),
            "predicate {referent} is not backed by its sub-proof"
        );
        ensure!(
            restrictions_admit(&pred.restrictions, &sp.schema_id, &sp.cred_def_id),
            "predicate {referent} comes from a disallowed source"
        );
    }

    Ok(Verdict::Valid)
}

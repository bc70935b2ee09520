//! # In-Process Ledger
//!
//! An append-only ledger held in memory, for tests, demos, and single-node
//! deployments. It enforces what a public permissioned ledger enforces:
//!
//! - every write is signed by a NYM on the ledger, and that NYM holds a
//!   write-capable role;
//! - schemas, credential definitions, and registry definitions are
//!   write-once per id, and are written by the DID their id names;
//! - revocation entries are timestamped by the ledger clock, and a
//!   registry's timestamps never decrease.
//!
//! Existence check and insert happen under one write lock, so concurrent
//! writers of the same id see exactly one success.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use zkcred_core::{
    CredentialDefinition, CredentialDefinitionId, Did, IdentityDetails, LedgerRole,
    RevocationRegistryDefinition, RevocationRegistryEntry, RevocationRegistryId, Schema, SchemaId,
    Timestamp,
};
use zkcred_crypto::{verify, Ed25519PublicKey};

use crate::clock::{Clock, SystemClock};
use crate::error::LedgerError;
use crate::transport::{LedgerResponse, LedgerTransport, ReadRequest, SignedWrite, WriteRequest};

#[derive(Debug, Default)]
struct LedgerState {
    nyms: HashMap<Did, IdentityDetails>,
    schemas: HashMap<SchemaId, Schema>,
    cred_defs: HashMap<CredentialDefinitionId, CredentialDefinition>,
    rev_reg_defs: HashMap<RevocationRegistryId, RevocationRegistryDefinition>,
    rev_reg_entries: HashMap<RevocationRegistryId, Vec<RevocationRegistryEntry>>,
    last_seq_no: u64,
    last_timestamp: Option<Timestamp>,
}

impl LedgerState {
    fn next_seq_no(&mut self) -> u64 {
        self.last_seq_no += 1;
        self.last_seq_no
    }

    /// Ledger time for a new transaction, never earlier than the last one.
    fn next_timestamp(&mut self, now: Timestamp) -> Timestamp {
        let ts = match self.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_timestamp = Some(ts);
        ts
    }
}

/// In-memory ledger. Cheap to share behind an `Arc`.
pub struct InMemoryLedger {
    clock: Arc<dyn Clock>,
    state: RwLock<LedgerState>,
}

impl std::fmt::Debug for InMemoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("InMemoryLedger")
            .field("transactions", &state.last_seq_no)
            .field("nyms", &state.nyms.len())
            .finish()
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl InMemoryLedger {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: RwLock::new(LedgerState::default()),
        }
    }

    /// Seed the genesis NYM set. Genesis records are not transactions.
    pub fn with_genesis(self, nyms: impl IntoIterator<Item = IdentityDetails>) -> Self {
        {
            let mut state = self.state.write();
            for nym in nyms {
                state.nyms.insert(nym.did.clone(), nym);
            }
        }
        self
    }

    /// Number of accepted write transactions.
    pub fn transaction_count(&self) -> u64 {
        self.state.read().last_seq_no
    }

    /// Number of entries in a registry's delta stream.
    pub fn revocation_entry_count(&self, registry: &RevocationRegistryId) -> usize {
        self.state
            .read()
            .rev_reg_entries
            .get(registry)
            .map_or(0, Vec::len)
    }

    fn authenticate(state: &LedgerState, write: &SignedWrite) -> Result<IdentityDetails, LedgerError> {
        let unauthorized = |reason: &str| LedgerError::Unauthorized {
            did: write.submitter.to_string(),
            reason: reason.to_string(),
        };
        let nym = state
            .nyms
            .get(&write.submitter)
            .ok_or_else(|| unauthorized("no NYM on the ledger"))?;
        let verkey = Ed25519PublicKey::from_hex(&nym.verkey)
            .map_err(|_| unauthorized("NYM verkey is not a valid Ed25519 key"))?;
        let data = SignedWrite::signing_bytes(&write.submitter, &write.request)?;
        verify(&data, &write.signature, &verkey)
            .map_err(|_| unauthorized("signature does not verify"))?;
        if !nym.can_write() {
            return Err(LedgerError::Permission(format!(
                "{} has no write role",
                write.submitter
            )));
        }
        Ok(nym.clone())
    }

    fn require_own(submitter: &Did, owner: &Did, what: &str) -> Result<(), LedgerError> {
        if submitter != owner {
            return Err(LedgerError::Permission(format!(
                "{submitter} cannot write {what} owned by {owner}"
            )));
        }
        Ok(())
    }

    fn apply(
        &self,
        state: &mut LedgerState,
        submitter: &IdentityDetails,
        request: WriteRequest,
    ) -> Result<LedgerResponse, LedgerError> {
        match request {
            WriteRequest::Nym(nym) => {
                match nym.role {
                    Some(LedgerRole::Trustee) if submitter.role != Some(LedgerRole::Trustee) => {
                        return Err(LedgerError::Permission(format!(
                            "only a trustee can grant TRUSTEE to {}",
                            nym.did
                        )));
                    }
                    Some(role) if !submitter.role.is_some_and(|r| r.can_grant()) => {
                        return Err(LedgerError::Permission(format!(
                            "{} cannot grant {role} to {}",
                            submitter.did, nym.did
                        )));
                    }
                    _ => {}
                }
                let granter = submitter.role.is_some_and(|r| r.can_grant());
                if let Some(existing) = state.nyms.get(&nym.did) {
                    if existing.role.is_some() && existing.role != nym.role && !granter {
                        return Err(LedgerError::Permission(format!(
                            "{} cannot change the role of {}",
                            submitter.did, nym.did
                        )));
                    }
                    // Only the DID itself or a granting role may rewrite a record.
                    if *existing != nym && submitter.did != nym.did && !granter {
                        return Err(LedgerError::Permission(format!(
                            "{} cannot update the NYM of {}",
                            submitter.did, nym.did
                        )));
                    }
                }
                Ed25519PublicKey::from_hex(&nym.verkey).map_err(|e| {
                    LedgerError::InvalidRequest(format!("NYM verkey for {}: {e}", nym.did))
                })?;
                state.nyms.insert(nym.did.clone(), nym);
            }
            WriteRequest::Schema(mut schema) => {
                Self::require_own(&submitter.did, schema.id.issuer(), "schema")?;
                if state.schemas.contains_key(&schema.id) {
                    return Err(LedgerError::AlreadyExists(schema.id.to_string()));
                }
                let seq_no = state.next_seq_no();
                let timestamp = state.next_timestamp(self.clock.now());
                schema.seq_no = Some(seq_no);
                state.schemas.insert(schema.id.clone(), schema);
                return Ok(LedgerResponse::Written { seq_no, timestamp });
            }
            WriteRequest::CredDef(cred_def) => {
                Self::require_own(&submitter.did, cred_def.id.issuer(), "credential definition")?;
                if state.cred_defs.contains_key(&cred_def.id) {
                    return Err(LedgerError::AlreadyExists(cred_def.id.to_string()));
                }
                let schema = state.schemas.get(&cred_def.schema_id).ok_or_else(|| {
                    LedgerError::MissingReference(format!("schema {}", cred_def.schema_id))
                })?;
                if schema.seq_no != Some(cred_def.id.schema_seq_no()) {
                    return Err(LedgerError::InvalidRequest(format!(
                        "{} names schema seqNo {}, {} has {:?}",
                        cred_def.id,
                        cred_def.id.schema_seq_no(),
                        schema.id,
                        schema.seq_no
                    )));
                }
                state.cred_defs.insert(cred_def.id.clone(), cred_def);
            }
            WriteRequest::RevRegDef(def) => {
                Self::require_own(&submitter.did, def.id.issuer(), "revocation registry")?;
                if state.rev_reg_defs.contains_key(&def.id) {
                    return Err(LedgerError::AlreadyExists(def.id.to_string()));
                }
                let cred_def = state.cred_defs.get(&def.cred_def_id).ok_or_else(|| {
                    LedgerError::MissingReference(format!("credential definition {}", def.cred_def_id))
                })?;
                if !cred_def.supports_revocation {
                    return Err(LedgerError::InvalidRequest(format!(
                        "{} does not support revocation",
                        cred_def.id
                    )));
                }
                state.rev_reg_defs.insert(def.id.clone(), def);
            }
            WriteRequest::RevRegEntry { registry, delta } => {
                Self::require_own(&submitter.did, registry.issuer(), "revocation entry")?;
                if !state.rev_reg_defs.contains_key(&registry) {
                    return Err(LedgerError::MissingReference(format!(
                        "revocation registry {registry}"
                    )));
                }
                let seq_no = state.next_seq_no();
                let timestamp = state.next_timestamp(self.clock.now());
                state
                    .rev_reg_entries
                    .entry(registry.clone())
                    .or_default()
                    .push(RevocationRegistryEntry {
                        registry_id: registry,
                        timestamp,
                        delta,
                    });
                return Ok(LedgerResponse::Written { seq_no, timestamp });
            }
        }
        let seq_no = state.next_seq_no();
        let timestamp = state.next_timestamp(self.clock.now());
        Ok(LedgerResponse::Written { seq_no, timestamp })
    }
}

impl LedgerTransport for InMemoryLedger {
    fn submit(&self, write: SignedWrite) -> Result<LedgerResponse, LedgerError> {
        let kind = write.request.kind();
        let mut state = self.state.write();
        let submitter = Self::authenticate(&state, &write)?;
        let response = self.apply(&mut state, &submitter, write.request)?;
        if let LedgerResponse::Written { seq_no, timestamp } = &response {
            tracing::debug!(txn = kind, seq_no, %timestamp, submitter = %submitter.did, "ledger write");
        }
        Ok(response)
    }

    fn query(&self, read: ReadRequest) -> Result<LedgerResponse, LedgerError> {
        let state = self.state.read();
        Ok(match read {
            ReadRequest::GetNym(did) => LedgerResponse::Nym(state.nyms.get(&did).cloned()),
            ReadRequest::GetSchema(id) => LedgerResponse::Schema(state.schemas.get(&id).cloned()),
            ReadRequest::GetCredDef(id) => {
                LedgerResponse::CredDef(state.cred_defs.get(&id).cloned())
            }
            ReadRequest::GetRevRegDef(id) => {
                LedgerResponse::RevRegDef(state.rev_reg_defs.get(&id).cloned())
            }
            ReadRequest::GetRevRegEntries { registry, to } => LedgerResponse::RevRegEntries(
                state
                    .rev_reg_entries
                    .get(&registry)
                    .map(|entries| {
                        entries
                            .iter()
                            .filter(|e| to.map_or(true, |to| e.timestamp <= to))
                            .cloned()
                            .collect()
                    })
                    .unwrap_or_default(),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use zkcred_core::{IssuanceType, RevocationRegistryDelta};
    use zkcred_crypto::Ed25519KeyPair;

    struct Party {
        did: Did,
        key: Ed25519KeyPair,
    }

    impl Party {
        fn new(name: &str, seed: u8) -> Self {
            Self {
                did: Did::new(format!("did:sov:{name}")).unwrap(),
                key: Ed25519KeyPair::from_seed(&[seed; 32]),
            }
        }

        fn nym(&self, role: Option<LedgerRole>) -> IdentityDetails {
            IdentityDetails {
                did: self.did.clone(),
                verkey: self.key.public_key().to_hex(),
                role,
                alias: None,
            }
        }

        fn write(&self, request: WriteRequest) -> SignedWrite {
            SignedWrite::sign(self.did.clone(), &self.key, request).unwrap()
        }
    }

    fn ledger(clock: Arc<ManualClock>, trustee: &Party) -> InMemoryLedger {
        InMemoryLedger::new(clock).with_genesis([trustee.nym(Some(LedgerRole::Trustee))])
    }

    fn schema(owner: &Did) -> Schema {
        Schema::new(owner.clone(), "passport", "1.0", vec!["name".into()]).unwrap()
    }

    #[test]
    fn schema_is_write_once_with_seq_no() {
        let trustee = Party::new("trustee", 1);
        let ledger = ledger(Arc::new(ManualClock::at_epoch_secs(100).unwrap()), &trustee);
        let resp = ledger
            .submit(trustee.write(WriteRequest::Schema(schema(&trustee.did))))
            .unwrap();
        assert!(matches!(resp, LedgerResponse::Written { seq_no: 1, .. }));
        let err = ledger
            .submit(trustee.write(WriteRequest::Schema(schema(&trustee.did))))
            .unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyExists(_)));

        let id = schema(&trustee.did).id;
        let LedgerResponse::Schema(Some(stored)) = ledger.query(ReadRequest::GetSchema(id)).unwrap()
        else {
            panic!("schema missing");
        };
        assert_eq!(stored.seq_no, Some(1));
        assert_eq!(ledger.transaction_count(), 1);
    }

    #[test]
    fn unknown_submitter_and_bad_signature_are_rejected() {
        let trustee = Party::new("trustee", 1);
        let stranger = Party::new("stranger", 2);
        let ledger = ledger(Arc::new(ManualClock::at_epoch_secs(100).unwrap()), &trustee);

        let err = ledger
            .submit(stranger.write(WriteRequest::Schema(schema(&stranger.did))))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized { .. }));

        let mut forged = trustee.write(WriteRequest::Schema(schema(&trustee.did)));
        forged.signature = stranger.key.sign(
            &SignedWrite::signing_bytes(&trustee.did, &forged.request).unwrap(),
        );
        let err = ledger.submit(forged).unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized { .. }));
    }

    #[test]
    fn roles_gate_writes_and_grants() {
        let trustee = Party::new("trustee", 1);
        let endorser = Party::new("endorser", 2);
        let plain = Party::new("plain", 3);
        let ledger = ledger(Arc::new(ManualClock::at_epoch_secs(100).unwrap()), &trustee);

        ledger
            .submit(trustee.write(WriteRequest::Nym(endorser.nym(Some(LedgerRole::Endorser)))))
            .unwrap();
        ledger
            .submit(endorser.write(WriteRequest::Nym(plain.nym(None))))
            .unwrap();

        // An endorser cannot hand out roles.
        let err = ledger
            .submit(endorser.write(WriteRequest::Nym(plain.nym(Some(LedgerRole::Endorser)))))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Permission(_)));

        // A role-less NYM can read but not write.
        let err = ledger
            .submit(plain.write(WriteRequest::Schema(schema(&plain.did))))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Permission(_)));

        // Writing under someone else's DID is refused.
        let err = ledger
            .submit(endorser.write(WriteRequest::Schema(schema(&trustee.did))))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Permission(_)));
    }

    #[test]
    fn only_owner_or_granter_rewrites_a_nym() {
        let trustee = Party::new("trustee", 1);
        let endorser = Party::new("endorser", 2);
        let plain = Party::new("plain", 3);
        let hijacker = Party::new("hijacker", 4);
        let ledger = ledger(Arc::new(ManualClock::at_epoch_secs(100).unwrap()), &trustee);
        ledger
            .submit(trustee.write(WriteRequest::Nym(endorser.nym(Some(LedgerRole::Endorser)))))
            .unwrap();
        ledger
            .submit(endorser.write(WriteRequest::Nym(plain.nym(None))))
            .unwrap();

        // Rewriting the identical record is a no-op.
        ledger
            .submit(endorser.write(WriteRequest::Nym(plain.nym(None))))
            .unwrap();

        let swapped = IdentityDetails {
            verkey: hijacker.key.public_key().to_hex(),
            ..plain.nym(None)
        };
        let err = ledger
            .submit(endorser.write(WriteRequest::Nym(swapped.clone())))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Permission(_)));

        ledger
            .submit(trustee.write(WriteRequest::Nym(swapped)))
            .unwrap();

        // An endorser may rotate its own key.
        let rotated = Party::new("endorser", 5);
        ledger
            .submit(endorser.write(WriteRequest::Nym(rotated.nym(Some(LedgerRole::Endorser)))))
            .unwrap();
        ledger
            .submit(rotated.write(WriteRequest::Schema(schema(&rotated.did))))
            .unwrap();
    }

    #[test]
    fn entry_timestamps_never_go_backwards() {
        let trustee = Party::new("trustee", 1);
        let clock = Arc::new(ManualClock::at_epoch_secs(1_000).unwrap());
        let ledger = ledger(clock.clone(), &trustee);

        let did = trustee.did.clone();
        ledger
            .submit(trustee.write(WriteRequest::Schema(schema(&did))))
            .unwrap();
        let mut stored = schema(&did);
        stored.seq_no = Some(1);
        let cd_id = CredentialDefinitionId::new(did.clone(), 1, "default").unwrap();
        ledger
            .submit(trustee.write(WriteRequest::CredDef(CredentialDefinition {
                id: cd_id.clone(),
                schema_id: stored.id.clone(),
                signature_type: "CL".into(),
                tag: "default".into(),
                value: serde_json::json!({}),
                supports_revocation: true,
            })))
            .unwrap();
        let reg = RevocationRegistryId::new(did.clone(), cd_id.clone(), "r1").unwrap();
        ledger
            .submit(trustee.write(WriteRequest::RevRegDef(RevocationRegistryDefinition {
                id: reg.clone(),
                cred_def_id: cd_id,
                tag: "r1".into(),
                issuance_type: IssuanceType::OnDemand,
                max_cred_num: 5,
                public_keys: serde_json::json!({}),
                tails_hash: "h".into(),
                tails_location: "tails/h".into(),
            })))
            .unwrap();

        let append = |accum: &str| {
            let resp = ledger
                .submit(trustee.write(WriteRequest::RevRegEntry {
                    registry: reg.clone(),
                    delta: RevocationRegistryDelta {
                        accum: accum.into(),
                        ..Default::default()
                    },
                }))
                .unwrap();
            match resp {
                LedgerResponse::Written { timestamp, .. } => timestamp.epoch_secs(),
                other => panic!("unexpected {other:?}"),
            }
        };
        assert_eq!(append("a"), 1_000);
        clock.set(Timestamp::from_epoch_secs(500).unwrap());
        assert_eq!(append("b"), 1_000);
        clock.set(Timestamp::from_epoch_secs(2_000).unwrap());
        assert_eq!(append("c"), 2_000);
        assert_eq!(ledger.revocation_entry_count(&reg), 3);

        let LedgerResponse::RevRegEntries(upto) = ledger
            .query(ReadRequest::GetRevRegEntries {
                registry: reg,
                to: Some(Timestamp::from_epoch_secs(1_500).unwrap()),
            })
            .unwrap()
        else {
            panic!("wrong response");
        };
        let accums: Vec<_> = upto.iter().map(|e| e.delta.accum.as_str()).collect();
        assert_eq!(accums, ["a", "b"]);
    }

    #[test]
    fn concurrent_identical_writes_have_one_winner() {
        let trustee = Arc::new(Party::new("trustee", 1));
        let ledger = Arc::new(ledger(Arc::new(ManualClock::at_epoch_secs(1).unwrap()), &trustee));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                let trustee = Arc::clone(&trustee);
                std::thread::spawn(move || {
                    ledger
                        .submit(trustee.write(WriteRequest::Schema(schema(&trustee.did))))
                        .is_ok()
                })
            })
            .collect();
        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(wins, 1);
        assert_eq!(ledger.transaction_count(), 1);
    }
}

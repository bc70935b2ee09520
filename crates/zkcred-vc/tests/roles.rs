//! Issuer, prover, and verifier against one in-process ledger.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use zkcred_core::{
    CredentialDefinitionId, CredentialFieldReference, CredentialInfo, CredentialPredicateReference,
    Interval, LedgerRole, ProofRequest, Restriction, RevocationBinding, Schema, SchemaId,
    ValidationError, ZkcredError,
};
use zkcred_ledger::{
    InMemoryLedger, LedgerError, LedgerResponse, LedgerTransport, ManualClock, ReadRequest,
    SignedWrite, WriteRequest,
};
use zkcred_vc::{Issuer, Prover, Verifier};
use zkcred_wallet::{InMemoryWalletStore, WalletConfig, WalletHolder};
use zkcred_zkp::MockCredentialEngine;

/// Delegates to the in-process ledger; fails revocation entry writes while
/// `fail_entries` is set.
struct FlakyLedger {
    inner: InMemoryLedger,
    fail_entries: AtomicBool,
}

impl LedgerTransport for FlakyLedger {
    fn submit(&self, write: SignedWrite) -> Result<LedgerResponse, LedgerError> {
        if matches!(write.request, WriteRequest::RevRegEntry { .. })
            && self.fail_entries.load(Ordering::SeqCst)
        {
            return Err(LedgerError::InvalidRequest("ledger unavailable".into()));
        }
        self.inner.submit(write)
    }

    fn query(&self, read: ReadRequest) -> Result<LedgerResponse, LedgerError> {
        self.inner.query(read)
    }
}

struct Network {
    clock: Arc<ManualClock>,
    ledger: Arc<FlakyLedger>,
    issuer: Issuer,
    prover: Prover,
    verifier: Verifier,
}

fn wallet(config: WalletConfig, ledger: Arc<FlakyLedger>) -> Arc<WalletHolder> {
    wallet_on(config, ledger, Arc::new(MockCredentialEngine::new()))
}

fn wallet_on(
    config: WalletConfig,
    ledger: Arc<FlakyLedger>,
    engine: Arc<MockCredentialEngine>,
) -> Arc<WalletHolder> {
    Arc::new(
        WalletHolder::open(config, ledger, engine, Arc::new(InMemoryWalletStore::new())).unwrap(),
    )
}

fn network() -> Network {
    let issuer_config = WalletConfig::seeded([1u8; 32]);
    let clock = Arc::new(ManualClock::at_epoch_secs(1_700_000_000).unwrap());
    let ledger = Arc::new(FlakyLedger {
        inner: InMemoryLedger::new(clock.clone())
            .with_genesis([issuer_config.genesis_nym(Some(LedgerRole::Endorser)).unwrap()]),
        fail_entries: AtomicBool::new(false),
    });
    Network {
        clock,
        issuer: Issuer::new(wallet(issuer_config, ledger.clone())),
        prover: Prover::new(wallet(WalletConfig::seeded([2u8; 32]), ledger.clone())),
        verifier: Verifier::new(wallet(WalletConfig::default(), ledger.clone())),
        ledger,
    }
}

fn attrs() -> Vec<String> {
    vec!["name".into(), "age".into()]
}

impl Network {
    fn cred_def(&self, revocable: bool) -> CredentialDefinitionId {
        let schema = self.issuer.create_schema("passport", "1.0", &attrs()).unwrap();
        self.issuer
            .create_credential_definition(&schema.id, revocable)
            .unwrap()
            .id
    }

    fn issue(&self, cred_def: &CredentialDefinitionId, name: &str, age: u32) -> Result<CredentialInfo, ZkcredError> {
        self.issue_from(&self.issuer, cred_def, name, age)
    }

    fn issue_from(
        &self,
        issuer: &Issuer,
        cred_def: &CredentialDefinitionId,
        name: &str,
        age: u32,
    ) -> Result<CredentialInfo, ZkcredError> {
        let offer = issuer.create_credential_offer(cred_def)?;
        let prover_did = self.prover.holder().did().clone();
        let (request, metadata) = self.prover.create_credential_request(&offer, &prover_did)?;
        let info = issuer.issue_credential(
            &request,
            &format!(r#"{{"name":"{name}","age":"{age}"}}"#),
            &offer,
        )?;
        self.prover.store_credential(&metadata, &info)?;
        Ok(info)
    }

    fn age_request(&self, interval: Option<Interval>) -> ProofRequest {
        let mut builder = self
            .verifier
            .new_proof_request("age check")
            .attribute("attr_name", CredentialFieldReference::new("name"))
            .predicate(
                "pred_age",
                CredentialPredicateReference::greater_or_equal("age", 18),
            );
        if let Some(interval) = interval {
            builder = builder.non_revoked(interval);
        }
        builder.build()
    }

    fn prove_and_verify(&self, request: &ProofRequest) -> Result<bool, ZkcredError> {
        let proof = self
            .prover
            .create_proof(request, self.prover.holder().master_secret_id())?;
        self.verifier.verify(request, &proof)
    }
}

#[test]
fn artifact_creation_is_idempotent() {
    let net = network();
    let first = net.issuer.create_schema("passport", "1.0", &attrs()).unwrap();
    let again = net.issuer.create_schema("passport", "1.0", &attrs()).unwrap();
    assert_eq!(first, again);

    let cd1 = net.issuer.create_credential_definition(&first.id, true).unwrap();
    let cd2 = net.issuer.create_credential_definition(&first.id, true).unwrap();
    assert_eq!(cd1, cd2);

    let r1 = net.issuer.create_revocation_registry(&cd1.id, 5).unwrap();
    let r2 = net.issuer.create_revocation_registry(&cd1.id, 5).unwrap();
    assert_eq!(r1.definition, r2.definition);
    assert_eq!(r1.entry.delta, r2.entry.delta);
    assert!(r1.entry.delta.issued.is_empty());
}

#[test]
fn credential_definition_needs_published_schema() {
    let net = network();
    let id = SchemaId::new(net.issuer.holder().did().clone(), "ghost", "1.0").unwrap();
    let err = net.issuer.create_credential_definition(&id, false).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn registry_capacity_is_validated() {
    let net = network();
    let cd = net.cred_def(true);
    let err = net.issuer.create_revocation_registry(&cd, 0).unwrap_err();
    assert!(matches!(err, ZkcredError::Validation(ValidationError::InvalidCapacity(0))));
}

#[test]
fn non_revocable_lifecycle() {
    let net = network();
    let cd = net.cred_def(false);
    let info = net.issue(&cd, "Alice", 30).unwrap();
    assert_eq!(info.credential.revocation, RevocationBinding::NonRevocable);
    assert!(info.delta.is_none());
    assert!(net.prove_and_verify(&net.age_request(None)).unwrap());
}

#[test]
fn proposal_must_match_schema() {
    let net = network();
    let cd = net.cred_def(false);
    let offer = net.issuer.create_credential_offer(&cd).unwrap();
    let prover_did = net.prover.holder().did().clone();
    let (request, _) = net.prover.create_credential_request(&offer, &prover_did).unwrap();
    let err = net
        .issuer
        .issue_credential(&request, r#"{"name":"Alice"}"#, &offer)
        .unwrap_err();
    assert!(matches!(err, ZkcredError::Validation(ValidationError::InvalidProposal(_))));
}

#[test]
fn under_age_prover_has_no_matching_credential() {
    let net = network();
    let cd = net.cred_def(false);
    net.issue(&cd, "Bob", 17).unwrap();
    let err = net.prove_and_verify(&net.age_request(None)).unwrap_err();
    assert!(matches!(
        err,
        ZkcredError::NoMatchingCredential { ref referent } if referent == "pred_age"
    ));
}

#[test]
fn requested_value_is_checked() {
    let net = network();
    let cd = net.cred_def(false);
    net.issue(&cd, "Alice", 30).unwrap();
    let request = net
        .verifier
        .new_proof_request("name check")
        .attribute(
            "attr_name",
            CredentialFieldReference::new("name")
                .with_value("Alice")
                .restricted_to(Restriction::cred_def(cd.clone())),
        )
        .build();
    assert!(net.prove_and_verify(&request).unwrap());

    let mismatch = net
        .verifier
        .new_proof_request("name check")
        .attribute("attr_name", CredentialFieldReference::new("name").with_value("Bob"))
        .build();
    let err = net.prove_and_verify(&mismatch).unwrap_err();
    assert!(matches!(err, ZkcredError::NoMatchingCredential { .. }));
}

#[test]
fn revocation_changes_proofs_after_not_before() {
    let net = network();
    let cd = net.cred_def(true);
    let registry = net.issuer.create_revocation_registry(&cd, 10).unwrap();
    let reg_id = registry.definition.id.clone();

    net.clock.advance(10).unwrap();
    let info = net.issue(&cd, "Alice", 30).unwrap();
    let t_issued = info.delta_timestamp.unwrap();
    assert!(net.prove_and_verify(&net.age_request(Some(Interval::recent()))).unwrap());

    net.clock.advance(10).unwrap();
    let index = match info.credential.revocation {
        RevocationBinding::Revocable { index, .. } => index,
        RevocationBinding::NonRevocable => panic!("expected a revocable credential"),
    };
    let (_, t_revoked) = net.issuer.revoke_credential(&reg_id, index).unwrap();
    assert!(t_revoked > t_issued);

    assert!(!net.prove_and_verify(&net.age_request(Some(Interval::recent()))).unwrap());
    assert!(net
        .prove_and_verify(&net.age_request(Some(Interval::at(t_issued))))
        .unwrap());
}

#[test]
fn registry_capacity_is_enforced() {
    let net = network();
    let cd = net.cred_def(true);
    let registry = net.issuer.create_revocation_registry(&cd, 2).unwrap();
    net.issue(&cd, "A", 20).unwrap();
    net.issue(&cd, "B", 21).unwrap();
    let err = net.issue(&cd, "C", 22).unwrap_err();
    assert!(matches!(err, ZkcredError::CapacityExceeded { max: 2, .. }));
    assert_eq!(net.issuer.issued_count(&registry.definition.id), Some(2));
}

#[test]
fn reopened_registry_recovers_its_counter() {
    let net = network();
    let cd = net.cred_def(true);
    net.issuer.create_revocation_registry(&cd, 3).unwrap();
    net.issue(&cd, "A", 20).unwrap();
    net.issue(&cd, "B", 21).unwrap();

    // A fresh issuer process over the same identity and ledger.
    let restarted = Issuer::new(wallet(WalletConfig::seeded([1u8; 32]), net.ledger.clone()));
    let info = restarted.create_revocation_registry(&cd, 3).unwrap();
    assert_eq!(info.entry.delta.issued.len(), 2);
    assert_eq!(restarted.issued_count(&info.definition.id), Some(2));
}

#[test]
fn issuers_sharing_a_registry_take_fresh_indices() {
    let net = network();
    // Two issuer processes over the same identity, ledger, and key material.
    let engine = Arc::new(MockCredentialEngine::new());
    let process = |engine: Arc<MockCredentialEngine>| {
        Issuer::new(wallet_on(WalletConfig::seeded([1u8; 32]), net.ledger.clone(), engine))
    };
    let first = process(engine.clone());
    let second = process(engine);

    let schema = first.create_schema("passport", "1.0", &attrs()).unwrap();
    let cd = first.create_credential_definition(&schema.id, true).unwrap().id;
    let reg_id = first.create_revocation_registry(&cd, 5).unwrap().definition.id;
    second.create_revocation_registry(&cd, 5).unwrap();

    let index_of = |info: CredentialInfo| match info.credential.revocation {
        RevocationBinding::Revocable { index, .. } => index,
        RevocationBinding::NonRevocable => panic!("expected a revocable credential"),
    };
    assert_eq!(index_of(net.issue_from(&first, &cd, "A", 20).unwrap()), 1);
    assert_eq!(index_of(net.issue_from(&second, &cd, "B", 21).unwrap()), 2);
    assert_eq!(index_of(net.issue_from(&first, &cd, "C", 22).unwrap()), 3);
    assert_eq!(first.issued_count(&reg_id), Some(3));
    assert_eq!(second.issued_count(&reg_id), Some(2));
}

#[test]
fn concurrent_registry_setup_writes_one_genesis() {
    let net = network();
    let cd = net.cred_def(true);
    let issuer = Arc::new(net.issuer);
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let issuer = issuer.clone();
            let cd = cd.clone();
            std::thread::spawn(move || issuer.create_revocation_registry(&cd, 5).unwrap())
        })
        .collect();
    let infos: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(infos.windows(2).all(|w| w[0].definition == w[1].definition));
    assert_eq!(net.ledger.inner.revocation_entry_count(&infos[0].definition.id), 1);
}

#[test]
fn failed_append_blocks_registry_until_persisted() {
    let net = network();
    let cd = net.cred_def(true);
    let registry = net.issuer.create_revocation_registry(&cd, 5).unwrap();
    let reg_id = registry.definition.id.clone();

    net.ledger.fail_entries.store(true, Ordering::SeqCst);
    let err = net.issue(&cd, "Alice", 30).unwrap_err();
    let ZkcredError::Consistency(pending) = err else {
        panic!("expected a consistency error, got {err}");
    };
    assert_eq!(pending.registry, reg_id);
    assert_eq!(
        pending.credential.credential.revocation,
        RevocationBinding::Revocable {
            registry: reg_id.clone(),
            index: 1
        }
    );

    net.ledger.fail_entries.store(false, Ordering::SeqCst);
    let blocked = net.issue(&cd, "Bob", 40).unwrap_err();
    assert!(matches!(blocked, ZkcredError::Ledger(_)));

    net.issuer.persist_revocation_entry(&pending).unwrap();
    let info = net.issue(&cd, "Bob", 40).unwrap();
    assert_eq!(
        info.credential.revocation,
        RevocationBinding::Revocable {
            registry: reg_id,
            index: 2
        }
    );
}

#[test]
fn revoking_unknown_registry_is_not_found() {
    let net = network();
    let cd = net.cred_def(true);
    let reg_id =
        zkcred_core::RevocationRegistryId::new(net.issuer.holder().did().clone(), cd, "nope").unwrap();
    let err = net.issuer.revoke_credential(&reg_id, 1).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn verifier_fetches_each_artifact_once() {
    let net = network();
    let cd = net.cred_def(false);
    net.issue(&cd, "Alice", 30).unwrap();
    let request = net.age_request(None);
    let proof = net
        .prover
        .create_proof(&request, net.prover.holder().master_secret_id())
        .unwrap();
    let used = net.verifier.get_data_used_in_proof(&request, &proof).unwrap();
    assert_eq!(used.schemas.len(), 1);
    assert_eq!(used.cred_defs.len(), 1);
    assert!(used.rev_reg_defs.is_empty());
    assert!(used.schemas.values().all(|s: &Schema| s.seq_no.is_some()));
}

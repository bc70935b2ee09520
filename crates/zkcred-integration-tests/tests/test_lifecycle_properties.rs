//! # Lifecycle Properties
//!
//! Issuer, prover, and verifier roles on one ledger: registry capacity,
//! proof round trips, revocation windows, and predicate boundaries.

use std::sync::Arc;

use zkcred_core::{
    CredentialDefinitionId, CredentialFieldReference, CredentialInfo, CredentialPredicateReference,
    Interval, LedgerRole, ProofInfo, ProofRequest, RevocationBinding, ZkcredError,
};
use zkcred_ledger::{InMemoryLedger, ManualClock};
use zkcred_vc::{Issuer, Prover, Verifier};
use zkcred_wallet::{InMemoryWalletStore, WalletConfig, WalletHolder};
use zkcred_zkp::MockCredentialEngine;

struct Parties {
    clock: Arc<ManualClock>,
    issuer: Issuer,
    prover: Prover,
    verifier: Verifier,
}

fn holder(config: WalletConfig, ledger: Arc<InMemoryLedger>) -> Arc<WalletHolder> {
    Arc::new(
        WalletHolder::open(
            config,
            ledger,
            Arc::new(MockCredentialEngine::new()),
            Arc::new(InMemoryWalletStore::new()),
        )
        .unwrap(),
    )
}

fn parties() -> Parties {
    let issuer_config = WalletConfig::seeded([31u8; 32]);
    let clock = Arc::new(ManualClock::at_epoch_secs(1_700_000_000).unwrap());
    let ledger = Arc::new(
        InMemoryLedger::new(clock.clone())
            .with_genesis([issuer_config.genesis_nym(Some(LedgerRole::Endorser)).unwrap()]),
    );
    Parties {
        clock,
        issuer: Issuer::new(holder(issuer_config, ledger.clone())),
        prover: Prover::new(holder(WalletConfig::seeded([32u8; 32]), ledger.clone())),
        verifier: Verifier::new(holder(WalletConfig::default(), ledger)),
    }
}

impl Parties {
    fn cred_def(&self, revocable: bool, capacity: u32) -> CredentialDefinitionId {
        let attrs = vec!["name".to_string(), "age".to_string()];
        let schema = self.issuer.create_schema("person", "1.0", &attrs).unwrap();
        let cd = self
            .issuer
            .create_credential_definition(&schema.id, revocable)
            .unwrap();
        if revocable {
            self.issuer.create_revocation_registry(&cd.id, capacity).unwrap();
        }
        cd.id
    }

    fn issue(&self, cd: &CredentialDefinitionId, name: &str, age: i32) -> Result<CredentialInfo, ZkcredError> {
        let offer = self.issuer.create_credential_offer(cd)?;
        let did = self.prover.holder().did().clone();
        let (request, metadata) = self.prover.create_credential_request(&offer, &did)?;
        let proposal = serde_json::json!({ "name": name, "age": age.to_string() }).to_string();
        let info = self.issuer.issue_credential(&request, &proposal, &offer)?;
        self.prover.store_credential(&metadata, &info)?;
        Ok(info)
    }

    fn prove(&self, request: &ProofRequest) -> Result<ProofInfo, ZkcredError> {
        self.prover
            .create_proof(request, self.prover.holder().master_secret_id())
    }

    fn verify(&self, request: &ProofRequest) -> bool {
        let proof = self.prove(request).unwrap();
        self.verifier.verify(request, &proof).unwrap()
    }

    fn name_request(&self, expected: &str, interval: Option<Interval>) -> ProofRequest {
        let mut builder = self
            .verifier
            .new_proof_request("name")
            .attribute("attr_name", CredentialFieldReference::new("name").with_value(expected));
        if let Some(interval) = interval {
            builder = builder.non_revoked(interval);
        }
        builder.build()
    }
}

// ---------------------------------------------------------------------------
// 1. Capacity invariant
// ---------------------------------------------------------------------------

#[test]
fn registry_rejects_issuance_past_capacity() {
    let p = parties();
    let cd = p.cred_def(true, 3);
    for i in 0..3 {
        p.issue(&cd, &format!("holder{i}"), 30).unwrap();
    }
    assert_eq!(p.issuer.issued_count(&registry_of(&p, &cd)), Some(3));

    let err = p.issue(&cd, "holder3", 30).unwrap_err();
    assert!(matches!(err, ZkcredError::CapacityExceeded { max: 3, .. }));
    assert_eq!(p.issuer.issued_count(&registry_of(&p, &cd)), Some(3));
}

fn registry_of(p: &Parties, cd: &CredentialDefinitionId) -> zkcred_core::RevocationRegistryId {
    zkcred_core::RevocationRegistryId::new(
        p.issuer.holder().did().clone(),
        cd.clone(),
        zkcred_core::DEFAULT_TAG,
    )
    .unwrap()
}

// ---------------------------------------------------------------------------
// 2. Proof round trip and value check are independent
// ---------------------------------------------------------------------------

#[test]
fn value_check_is_separate_from_cryptographic_validity() {
    let p = parties();
    let cd = p.cred_def(false, 0);
    p.issue(&cd, "Alice", 30).unwrap();

    let alice = p.name_request("Alice", None);
    let proof = p.prove(&alice).unwrap();
    let used = p.verifier.get_data_used_in_proof(&alice, &proof).unwrap();
    assert!(p.verifier.verify_proof(&alice, &proof, &used).unwrap());
    assert!(Verifier::check_revealed_values(&alice, &proof));
    assert!(p.verifier.verify(&alice, &proof).unwrap());

    // Same proof, verifier now expects Bob.
    let mut bob = alice.clone();
    if let Some(field) = bob.requested_attributes.get_mut("attr_name") {
        field.value = "Bob".into();
    }
    assert!(p.verifier.verify_proof(&bob, &proof, &used).unwrap());
    assert!(!Verifier::check_revealed_values(&bob, &proof));
    assert!(!p.verifier.verify(&bob, &proof).unwrap());
}

// ---------------------------------------------------------------------------
// 3. Revocation effect
// ---------------------------------------------------------------------------

#[test]
fn revocation_applies_only_after_its_timestamp() {
    let p = parties();
    let cd = p.cred_def(true, 10);
    let t_issue = p.clock.advance(60).unwrap();
    let info = p.issue(&cd, "Alice", 30).unwrap();
    assert_eq!(info.delta_timestamp, Some(t_issue));

    assert!(p.verify(&p.name_request("Alice", Some(Interval::all_time()))));

    let RevocationBinding::Revocable { registry, index } = info.revocation().clone() else {
        panic!("expected a revocable credential");
    };
    p.clock.advance(60).unwrap();
    let (_, revoked_at) = p.issuer.revoke_credential(&registry, index).unwrap();
    assert!(revoked_at > t_issue);

    assert!(!p.verify(&p.name_request("Alice", Some(Interval::recent()))));
    assert!(!p.verify(&p.name_request("Alice", Some(Interval::all_time()))));

    let before = Interval::between(t_issue, t_issue.plus_secs(30).unwrap()).unwrap();
    assert!(p.verify(&p.name_request("Alice", Some(before))));
}

#[test]
fn revoking_one_credential_leaves_others_valid() {
    let p = parties();
    let cd = p.cred_def(true, 10);
    let first = p.issue(&cd, "Alice", 30).unwrap();
    p.clock.advance(10).unwrap();
    p.issue(&cd, "Carol", 40).unwrap();

    let registry = registry_of(&p, &cd);
    assert_eq!(first.revocation().registry(), Some(&registry));
    p.clock.advance(10).unwrap();
    p.issuer.revoke_credential(&registry, 1).unwrap();

    assert!(!p.verify(&p.name_request("Alice", Some(Interval::recent()))));
    assert!(p.verify(&p.name_request("Carol", Some(Interval::recent()))));
}

// ---------------------------------------------------------------------------
// 4. Predicate boundary
// ---------------------------------------------------------------------------

fn adult_request(verifier: &Verifier) -> ProofRequest {
    verifier
        .new_proof_request("adult")
        .predicate(
            "pred_adult",
            CredentialPredicateReference::greater_or_equal("age", 18),
        )
        .build()
}

#[test]
fn predicate_holds_at_the_boundary() {
    let p = parties();
    let cd = p.cred_def(false, 0);
    p.issue(&cd, "Dana", 18).unwrap();
    assert!(p.verify(&adult_request(&p.verifier)));
}

#[test]
fn predicate_below_boundary_has_no_proof() {
    let p = parties();
    let cd = p.cred_def(false, 0);
    p.issue(&cd, "Eli", 17).unwrap();
    let err = p.prove(&adult_request(&p.verifier)).unwrap_err();
    assert!(matches!(
        err,
        ZkcredError::NoMatchingCredential { ref referent } if referent == "pred_adult"
    ));
}

#[test]
fn first_stored_credential_wins_a_tie() {
    let p = parties();
    let cd = p.cred_def(false, 0);
    p.issue(&cd, "Alice", 30).unwrap();
    p.issue(&cd, "Alice", 45).unwrap();

    let request = p
        .verifier
        .new_proof_request("tie")
        .attribute("attr_name", CredentialFieldReference::new("name"))
        .attribute("attr_age", CredentialFieldReference::new("age"))
        .build();
    let proof = p.prove(&request).unwrap();
    assert_eq!(proof.revealed_raw("attr_age"), Some("30"));
}

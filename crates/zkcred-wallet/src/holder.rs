//! # Wallet Holder
//!
//! One party's identity: its DID and signing key, its ledger access, its
//! credential engine (which holds the master secret), and its local store.
//! Issuer, prover, and verifier roles are built on top of a holder rather
//! than inheriting from it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use zkcred_core::{Did, IdentityDetails, LedgerRole, Timestamp, ZkcredError};
use zkcred_crypto::{did_for_key, Ed25519KeyPair, DEFAULT_DID_METHOD};
use zkcred_ledger::{LedgerService, LedgerTransport, Submitter};
use zkcred_zkp::CredentialEngine;

use crate::store::{WalletStore, WalletStoreError};

/// Master secret name used when the configuration does not choose one.
pub const DEFAULT_MASTER_SECRET_ID: &str = "main";

const PAIRWISE_PREFIX: &str = "pairwise:";

/// How to open a wallet.
#[derive(Debug, Clone)]
pub struct WalletConfig {
    /// Fixed key seed. `None` generates a fresh key.
    pub seed: Option<[u8; 32]>,
    pub did_method: String,
    pub master_secret_id: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            seed: None,
            did_method: DEFAULT_DID_METHOD.to_string(),
            master_secret_id: DEFAULT_MASTER_SECRET_ID.to_string(),
        }
    }
}

impl WalletConfig {
    /// A wallet with a deterministic key.
    pub fn seeded(seed: [u8; 32]) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// The NYM this configuration's identity would have. Used to seed a
    /// ledger's genesis set before any wallet is open.
    pub fn genesis_nym(&self, role: Option<LedgerRole>) -> Result<IdentityDetails, ZkcredError> {
        let seed = self.seed.ok_or_else(|| {
            ZkcredError::Wallet("a genesis identity needs a fixed seed".into())
        })?;
        let key = Ed25519KeyPair::from_seed(&seed);
        Ok(IdentityDetails {
            did: did_for_key(&self.did_method, &key.public_key())?,
            verkey: key.public_key().to_hex(),
            role,
            alias: None,
        })
    }
}

/// The stored half of a pairwise relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairwiseRecord {
    pub my_did: Did,
    pub my_verkey: String,
    pub their_did: Did,
    pub their_verkey: String,
    pub created_at: Timestamp,
}

/// A party's identity and local state.
pub struct WalletHolder {
    did: Did,
    key: Arc<Ed25519KeyPair>,
    ledger: LedgerService,
    engine: Arc<dyn CredentialEngine>,
    store: Arc<dyn WalletStore>,
    master_secret_id: String,
    did_method: String,
    /// Keys of session DIDs created by this process. Never persisted.
    session_keys: RwLock<HashMap<Did, Arc<Ed25519KeyPair>>>,
}

impl std::fmt::Debug for WalletHolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletHolder")
            .field("did", &self.did)
            .field("backend", &self.engine.backend())
            .field("master_secret_id", &self.master_secret_id)
            .finish()
    }
}

impl WalletHolder {
    /// Open a wallet: derive the identity, bind ledger access to it, and
    /// make sure the master secret exists.
    pub fn open(
        config: WalletConfig,
        transport: Arc<dyn LedgerTransport>,
        engine: Arc<dyn CredentialEngine>,
        store: Arc<dyn WalletStore>,
    ) -> Result<Self, ZkcredError> {
        let key = Arc::new(match config.seed {
            Some(seed) => Ed25519KeyPair::from_seed(&seed),
            None => Ed25519KeyPair::generate(),
        });
        let did = did_for_key(&config.did_method, &key.public_key())?;
        let ledger = LedgerService::writer(transport, Submitter::new(did.clone(), key.clone()));
        engine.create_master_secret(&config.master_secret_id)?;
        tracing::info!(%did, backend = engine.backend().name(), "opened wallet");
        Ok(Self {
            did,
            key,
            ledger,
            engine,
            store,
            master_secret_id: config.master_secret_id,
            did_method: config.did_method,
            session_keys: RwLock::new(HashMap::new()),
        })
    }

    pub fn did(&self) -> &Did {
        &self.did
    }

    /// Hex verkey of the wallet's DID.
    pub fn verkey(&self) -> String {
        self.key.public_key().to_hex()
    }

    pub fn ledger(&self) -> &LedgerService {
        &self.ledger
    }

    pub fn engine(&self) -> &Arc<dyn CredentialEngine> {
        &self.engine
    }

    pub fn store(&self) -> &Arc<dyn WalletStore> {
        &self.store
    }

    pub fn master_secret_id(&self) -> &str {
        &self.master_secret_id
    }

    /// This wallet's identity as another party would register it.
    pub fn identity(&self) -> IdentityDetails {
        IdentityDetails {
            did: self.did.clone(),
            verkey: self.verkey(),
            role: None,
            alias: None,
        }
    }

    /// Read a NYM from the ledger.
    pub fn get_identity(&self, did: &Did) -> Result<IdentityDetails, ZkcredError> {
        self.ledger.get_identity(did)
    }

    /// The session DID this wallet uses with `peer`, created on first use.
    ///
    /// Concurrent callers for the same peer agree on one DID: the pairwise
    /// record is inserted with put-if-absent and a losing candidate is
    /// discarded.
    pub fn create_session_did(&self, peer: &IdentityDetails) -> Result<Did, ZkcredError> {
        if let Some(existing) = self.pairwise(&peer.did)? {
            return Ok(existing.my_did);
        }
        let key = Ed25519KeyPair::generate();
        let candidate = PairwiseRecord {
            my_did: did_for_key(&self.did_method, &key.public_key())?,
            my_verkey: key.public_key().to_hex(),
            their_did: peer.did.clone(),
            their_verkey: peer.verkey.clone(),
            created_at: Timestamp::now(),
        };
        let record_key = pairwise_key(&peer.did);
        let stored = self
            .store
            .put_if_absent(&record_key, serde_json::to_value(&candidate)?)?;
        let stored = parse_pairwise(&record_key, stored)?;
        if stored.my_did == candidate.my_did {
            self.session_keys
                .write()
                .insert(candidate.my_did.clone(), Arc::new(key));
            tracing::info!(peer = %peer.did, session_did = %stored.my_did, "created session DID");
        }
        Ok(stored.my_did)
    }

    /// The pairwise record for `peer`, if one exists.
    pub fn pairwise(&self, peer: &Did) -> Result<Option<PairwiseRecord>, ZkcredError> {
        let key = pairwise_key(peer);
        match self.store.get(&key)? {
            Some(value) => Ok(Some(parse_pairwise(&key, value)?)),
            None => Ok(None),
        }
    }

    /// Every pairwise relationship, ordered by peer DID.
    pub fn pairwise_records(&self) -> Result<Vec<PairwiseRecord>, ZkcredError> {
        let mut out = Vec::new();
        for key in self.store.keys(PAIRWISE_PREFIX)? {
            if let Some(value) = self.store.get(&key)? {
                out.push(parse_pairwise(&key, value)?);
            }
        }
        Ok(out)
    }

    /// Whether this process holds the signing key for a session DID.
    pub fn holds_session_key(&self, did: &Did) -> bool {
        self.session_keys.read().contains_key(did)
    }

    /// Grant `role` to `identity` by writing its NYM.
    ///
    /// The caller must be a trustee or steward on the ledger, and only a
    /// trustee grants `TRUSTEE`. Checked before submitting so the failure
    /// names the caller.
    pub fn set_permissions_for(
        &self,
        identity: &IdentityDetails,
        role: LedgerRole,
    ) -> Result<(), ZkcredError> {
        let own_role = match self.ledger.get_identity(&self.did) {
            Ok(nym) => nym.role,
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };
        let allowed = match role {
            LedgerRole::Trustee => own_role == Some(LedgerRole::Trustee),
            _ => own_role.is_some_and(|r| r.can_grant()),
        };
        if !allowed {
            return Err(ZkcredError::Permission(format!(
                "{} ({}) cannot grant {role} to {}",
                self.did,
                own_role.map_or("no role", |r| r.as_str()),
                identity.did
            )));
        }
        self.ledger.write_nym(IdentityDetails {
            role: Some(role),
            ..identity.clone()
        })?;
        tracing::info!(grantee = %identity.did, %role, "granted ledger role");
        Ok(())
    }
}

fn pairwise_key(peer: &Did) -> String {
    format!("{PAIRWISE_PREFIX}{peer}")
}

fn parse_pairwise(key: &str, value: serde_json::Value) -> Result<PairwiseRecord, WalletStoreError> {
    serde_json::from_value(value).map_err(|e| WalletStoreError::Malformed {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryWalletStore;
    use zkcred_ledger::{InMemoryLedger, ManualClock};
    use zkcred_zkp::MockCredentialEngine;

    struct Net {
        ledger: Arc<InMemoryLedger>,
        trustee: WalletHolder,
    }

    fn open(ledger: &Arc<InMemoryLedger>, config: WalletConfig) -> WalletHolder {
        WalletHolder::open(
            config,
            ledger.clone(),
            Arc::new(MockCredentialEngine::new()),
            Arc::new(InMemoryWalletStore::new()),
        )
        .unwrap()
    }

    fn net() -> Net {
        let config = WalletConfig::seeded([1u8; 32]);
        let genesis = config.genesis_nym(Some(LedgerRole::Trustee)).unwrap();
        let clock = Arc::new(ManualClock::at_epoch_secs(1_000).unwrap());
        let ledger = Arc::new(InMemoryLedger::new(clock).with_genesis([genesis]));
        let trustee = open(&ledger, config);
        Net { ledger, trustee }
    }

    #[test]
    fn seeded_wallet_matches_its_genesis_nym() {
        let net = net();
        let nym = net.trustee.get_identity(net.trustee.did()).unwrap();
        assert_eq!(nym.verkey, net.trustee.verkey());
        assert_eq!(nym.role, Some(LedgerRole::Trustee));
    }

    #[test]
    fn session_did_is_created_once_per_peer() {
        let net = net();
        let alice = open(&net.ledger, WalletConfig::default());
        let bob = open(&net.ledger, WalletConfig::default());

        let first = alice.create_session_did(&bob.identity()).unwrap();
        let second = alice.create_session_did(&bob.identity()).unwrap();
        assert_eq!(first, second);
        assert_ne!(&first, alice.did());
        assert!(alice.holds_session_key(&first));

        let with_trustee = alice.create_session_did(&net.trustee.identity()).unwrap();
        assert_ne!(first, with_trustee);
        assert_eq!(alice.pairwise_records().unwrap().len(), 2);
    }

    #[test]
    fn concurrent_session_creation_agrees() {
        let net = net();
        let alice = Arc::new(open(&net.ledger, WalletConfig::default()));
        let peer = open(&net.ledger, WalletConfig::default()).identity();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let alice = Arc::clone(&alice);
                let peer = peer.clone();
                std::thread::spawn(move || alice.create_session_did(&peer).unwrap())
            })
            .collect();
        let dids: Vec<Did> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(dids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(alice.pairwise_records().unwrap().len(), 1);
    }

    #[test]
    fn permissions_require_a_granting_role() {
        let net = net();
        let issuer = open(&net.ledger, WalletConfig::default());
        let outsider = open(&net.ledger, WalletConfig::default());

        let err = outsider
            .set_permissions_for(&issuer.identity(), LedgerRole::Endorser)
            .unwrap_err();
        assert!(matches!(err, ZkcredError::Permission(_)));

        net.trustee
            .set_permissions_for(&issuer.identity(), LedgerRole::Endorser)
            .unwrap();
        assert!(issuer.get_identity(issuer.did()).unwrap().can_write());

        // An endorser cannot grant further.
        let err = issuer
            .set_permissions_for(&outsider.identity(), LedgerRole::Endorser)
            .unwrap_err();
        assert!(matches!(err, ZkcredError::Permission(_)));
    }

    #[test]
    fn genesis_nym_needs_a_seed() {
        assert!(WalletConfig::default().genesis_nym(None).is_err());
    }
}

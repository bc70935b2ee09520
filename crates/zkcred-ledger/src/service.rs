//! # Ledger Service
//!
//! Typed access to a [`LedgerTransport`], with a read-through cache for
//! immutable definitions.
//!
//! ## Caching
//!
//! Schemas, credential definitions, and revocation registry definitions
//! never change once written, so a hit is always current. Revocation
//! entries change with every issuance and revocation and are never cached.
//!
//! ## Idempotent create
//!
//! [`LedgerService::get_or_create`] is the creation path every role uses.
//! It reads first, builds and writes only on a miss, and when the write
//! loses a race to a concurrent creator it returns the winner's artifact.
//! [`LedgerService::store`] is the raw write and surfaces `AlreadyExists`.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;
use zkcred_core::{
    CredentialDefinition, CredentialDefinitionId, Did, IdentityDetails, Interval, NotFoundError,
    RevocationRegistryDefinition, RevocationRegistryDelta, RevocationRegistryEntry,
    RevocationRegistryId, Schema, SchemaId, Timestamp, ZkcredError,
};
use zkcred_crypto::Ed25519KeyPair;

use crate::error::LedgerError;
use crate::transport::{LedgerResponse, LedgerTransport, ReadRequest, SignedWrite, WriteRequest};

// ── Cache ───────────────────────────────────────────────────────────

/// In-process cache of immutable ledger definitions.
#[derive(Debug, Default)]
pub struct ArtifactCache {
    schemas: RwLock<HashMap<SchemaId, Schema>>,
    cred_defs: RwLock<HashMap<CredentialDefinitionId, CredentialDefinition>>,
    rev_reg_defs: RwLock<HashMap<RevocationRegistryId, RevocationRegistryDefinition>>,
}

impl ArtifactCache {
    /// Number of cached definitions of every kind.
    pub fn len(&self) -> usize {
        self.schemas.read().len() + self.cred_defs.read().len() + self.rev_reg_defs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Artifacts ───────────────────────────────────────────────────────

/// An immutable, write-once ledger definition.
pub trait LedgerArtifact: Clone + Send + Sync + Sized + 'static {
    type Id: Clone + Eq + Hash + Display + Send + Sync;

    fn id(&self) -> &Self::Id;

    fn read_request(id: &Self::Id) -> ReadRequest;

    fn write_request(self) -> WriteRequest;

    /// Extract the artifact from a read response.
    fn from_response(response: LedgerResponse) -> Result<Option<Self>, LedgerError>;

    fn not_found(id: &Self::Id) -> NotFoundError;

    fn cache_slot(cache: &ArtifactCache) -> &RwLock<HashMap<Self::Id, Self>>;
}

impl LedgerArtifact for Schema {
    type Id = SchemaId;

    fn id(&self) -> &SchemaId {
        &self.id
    }

    fn read_request(id: &SchemaId) -> ReadRequest {
        ReadRequest::GetSchema(id.clone())
    }

    fn write_request(self) -> WriteRequest {
        WriteRequest::Schema(self)
    }

    fn from_response(response: LedgerResponse) -> Result<Option<Self>, LedgerError> {
        match response {
            LedgerResponse::Schema(s) => Ok(s),
            other => Err(LedgerError::UnexpectedResponse {
                request: "GET_SCHEMA".into(),
                response: other.kind().into(),
            }),
        }
    }

    fn not_found(id: &SchemaId) -> NotFoundError {
        NotFoundError::Schema(id.to_string())
    }

    fn cache_slot(cache: &ArtifactCache) -> &RwLock<HashMap<SchemaId, Schema>> {
        &cache.schemas
    }
}

impl LedgerArtifact for CredentialDefinition {
    type Id = CredentialDefinitionId;

    fn id(&self) -> &CredentialDefinitionId {
        &self.id
    }

    fn read_request(id: &CredentialDefinitionId) -> ReadRequest {
        ReadRequest::GetCredDef(id.clone())
    }

    fn write_request(self) -> WriteRequest {
        WriteRequest::CredDef(self)
    }

    fn from_response(response: LedgerResponse) -> Result<Option<Self>, LedgerError> {
        match response {
            LedgerResponse::CredDef(c) => Ok(c),
            other => Err(LedgerError::UnexpectedResponse {
                request: "GET_CRED_DEF".into(),
                response: other.kind().into(),
            }),
        }
    }

    fn not_found(id: &CredentialDefinitionId) -> NotFoundError {
        NotFoundError::CredentialDefinition(id.to_string())
    }

    fn cache_slot(
        cache: &ArtifactCache,
    ) -> &RwLock<HashMap<CredentialDefinitionId, CredentialDefinition>> {
        &cache.cred_defs
    }
}

impl LedgerArtifact for RevocationRegistryDefinition {
    type Id = RevocationRegistryId;

    fn id(&self) -> &RevocationRegistryId {
        &self.id
    }

    fn read_request(id: &RevocationRegistryId) -> ReadRequest {
        ReadRequest::GetRevRegDef(id.clone())
    }

    fn write_request(self) -> WriteRequest {
        WriteRequest::RevRegDef(self)
    }

    fn from_response(response: LedgerResponse) -> Result<Option<Self>, LedgerError> {
        match response {
            LedgerResponse::RevRegDef(d) => Ok(d),
            other => Err(LedgerError::UnexpectedResponse {
                request: "GET_REV_REG_DEF".into(),
                response: other.kind().into(),
            }),
        }
    }

    fn not_found(id: &RevocationRegistryId) -> NotFoundError {
        NotFoundError::RevocationRegistry(id.to_string())
    }

    fn cache_slot(
        cache: &ArtifactCache,
    ) -> &RwLock<HashMap<RevocationRegistryId, RevocationRegistryDefinition>> {
        &cache.rev_reg_defs
    }
}

// ── Service ─────────────────────────────────────────────────────────

/// The identity a service signs writes with.
#[derive(Debug, Clone)]
pub struct Submitter {
    pub did: Did,
    pub key: Arc<Ed25519KeyPair>,
}

impl Submitter {
    pub fn new(did: Did, key: Arc<Ed25519KeyPair>) -> Self {
        Self { did, key }
    }
}

/// Typed ledger access shared by every role of one node.
#[derive(Clone)]
pub struct LedgerService {
    transport: Arc<dyn LedgerTransport>,
    submitter: Option<Submitter>,
    cache: Arc<ArtifactCache>,
}

impl std::fmt::Debug for LedgerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerService")
            .field("submitter", &self.submitter.as_ref().map(|s| &s.did))
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl LedgerService {
    /// A service that can only read.
    pub fn reader(transport: Arc<dyn LedgerTransport>) -> Self {
        Self {
            transport,
            submitter: None,
            cache: Arc::new(ArtifactCache::default()),
        }
    }

    /// A service that signs writes as `submitter`.
    pub fn writer(transport: Arc<dyn LedgerTransport>, submitter: Submitter) -> Self {
        Self {
            transport,
            submitter: Some(submitter),
            cache: Arc::new(ArtifactCache::default()),
        }
    }

    pub fn submitter_did(&self) -> Option<&Did> {
        self.submitter.as_ref().map(|s| &s.did)
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    fn submit(&self, request: WriteRequest) -> Result<(u64, Timestamp), LedgerError> {
        let submitter = self.submitter.as_ref().ok_or(LedgerError::ReadOnly)?;
        let write = SignedWrite::sign(submitter.did.clone(), &submitter.key, request)?;
        match self.transport.submit(write)? {
            LedgerResponse::Written { seq_no, timestamp } => Ok((seq_no, timestamp)),
            other => Err(LedgerError::UnexpectedResponse {
                request: "submit".into(),
                response: other.kind().into(),
            }),
        }
    }

    /// Read a definition, from cache when possible. `None` if the ledger
    /// does not hold it.
    pub fn retrieve<T: LedgerArtifact>(&self, id: &T::Id) -> Result<Option<T>, ZkcredError> {
        if let Some(hit) = T::cache_slot(&self.cache).read().get(id) {
            tracing::debug!(%id, "ledger cache hit");
            return Ok(Some(hit.clone()));
        }
        let found = T::from_response(self.transport.query(T::read_request(id))?)?;
        if let Some(artifact) = &found {
            tracing::debug!(%id, "ledger read");
            T::cache_slot(&self.cache)
                .write()
                .insert(id.clone(), artifact.clone());
        }
        Ok(found)
    }

    /// [`retrieve`](Self::retrieve), with absence as `NotFound`.
    pub fn require<T: LedgerArtifact>(&self, id: &T::Id) -> Result<T, ZkcredError> {
        self.retrieve(id)?
            .ok_or_else(|| ZkcredError::NotFound(T::not_found(id)))
    }

    /// Write a definition. Fails with `AlreadyExists` if the id is taken.
    ///
    /// Returns the artifact as the ledger holds it, e.g. with its schema
    /// sequence number.
    pub fn store<T: LedgerArtifact>(&self, artifact: T) -> Result<T, ZkcredError> {
        let id = artifact.id().clone();
        self.submit(artifact.write_request())?;
        // Read back the ledger's copy so ledger-assigned fields are present.
        T::cache_slot(&self.cache).write().remove(&id);
        let stored = self.require::<T>(&id)?;
        tracing::info!(%id, "wrote ledger artifact");
        Ok(stored)
    }

    /// Read `id`; on a miss, build, write, and return it. A concurrent
    /// creator winning the write is not an error: its artifact is returned.
    pub fn get_or_create<T, F>(&self, id: &T::Id, build: F) -> Result<T, ZkcredError>
    where
        T: LedgerArtifact,
        F: FnOnce() -> Result<T, ZkcredError>,
    {
        if let Some(existing) = self.retrieve::<T>(id)? {
            return Ok(existing);
        }
        let artifact = build()?;
        if artifact.id() != id {
            return Err(ZkcredError::Ledger(format!(
                "built artifact {} does not have requested id {id}",
                artifact.id()
            )));
        }
        match self.store(artifact) {
            Err(ZkcredError::AlreadyExists(_)) => {
                tracing::warn!(%id, "lost creation race, using ledger copy");
                self.require(id)
            }
            other => other,
        }
    }

    // ── Revocation entries ─────────────────────────────────────────

    fn entries(
        &self,
        registry: &RevocationRegistryId,
        to: Option<Timestamp>,
    ) -> Result<Vec<RevocationRegistryEntry>, ZkcredError> {
        let request = ReadRequest::GetRevRegEntries {
            registry: registry.clone(),
            to,
        };
        match self.transport.query(request)? {
            LedgerResponse::RevRegEntries(entries) => Ok(entries),
            other => Err(LedgerError::UnexpectedResponse {
                request: "GET_REV_REG_ENTRIES".into(),
                response: other.kind().into(),
            }
            .into()),
        }
    }

    /// The entry with the greatest timestamp at or before `timestamp`. On a
    /// timestamp tie the later append wins.
    pub fn retrieve_revocation_entry(
        &self,
        registry: &RevocationRegistryId,
        timestamp: Timestamp,
    ) -> Result<RevocationRegistryEntry, ZkcredError> {
        latest_at_or_before(self.entries(registry, Some(timestamp))?, timestamp).ok_or_else(|| {
            NotFoundError::RevocationDelta {
                registry: registry.to_string(),
                timestamp: timestamp.epoch_secs(),
            }
            .into()
        })
    }

    /// The registry's cumulative state as of `interval.to` (or as of now),
    /// with the timestamp of the last entry folded in.
    pub fn retrieve_revocation_delta(
        &self,
        registry: &RevocationRegistryId,
        interval: Interval,
    ) -> Result<(RevocationRegistryDelta, Timestamp), ZkcredError> {
        merge_entries(&self.entries(registry, interval.to)?).ok_or_else(|| {
            NotFoundError::RevocationDelta {
                registry: registry.to_string(),
                timestamp: interval.upper_bound().epoch_secs(),
            }
            .into()
        })
    }

    /// Append a delta to a registry's stream. Returns the ledger timestamp.
    pub fn append_revocation_entry(
        &self,
        registry: &RevocationRegistryId,
        delta: RevocationRegistryDelta,
    ) -> Result<Timestamp, ZkcredError> {
        let (_, timestamp) = self.submit(WriteRequest::RevRegEntry {
            registry: registry.clone(),
            delta,
        })?;
        tracing::info!(%registry, %timestamp, "appended revocation entry");
        Ok(timestamp)
    }

    // ── Identities ─────────────────────────────────────────────────

    /// Read a NYM.
    pub fn get_identity(&self, did: &Did) -> Result<IdentityDetails, ZkcredError> {
        match self.transport.query(ReadRequest::GetNym(did.clone()))? {
            LedgerResponse::Nym(Some(nym)) => Ok(nym),
            LedgerResponse::Nym(None) => Err(NotFoundError::Identity(did.to_string()).into()),
            other => Err(LedgerError::UnexpectedResponse {
                request: "GET_NYM".into(),
                response: other.kind().into(),
            }
            .into()),
        }
    }

    /// Create or update a NYM.
    pub fn write_nym(&self, nym: IdentityDetails) -> Result<(), ZkcredError> {
        let did = nym.did.clone();
        self.submit(WriteRequest::Nym(nym))?;
        tracing::info!(%did, "wrote NYM");
        Ok(())
    }
}

/// Greatest timestamp `<= at`; the last such entry in append order on ties.
pub fn latest_at_or_before(
    entries: impl IntoIterator<Item = RevocationRegistryEntry>,
    at: Timestamp,
) -> Option<RevocationRegistryEntry> {
    entries
        .into_iter()
        .filter(|e| e.timestamp <= at)
        .fold(None, |best: Option<RevocationRegistryEntry>, e| match best {
            Some(b) if b.timestamp > e.timestamp => Some(b),
            _ => Some(e),
        })
}

/// Fold entries in append order into one cumulative delta, paired with the
/// last entry's timestamp. `None` for an empty stream.
pub fn merge_entries(
    entries: &[RevocationRegistryEntry],
) -> Option<(RevocationRegistryDelta, Timestamp)> {
    let last = entries.last()?.timestamp;
    let mut merged = RevocationRegistryDelta::default();
    for entry in entries {
        merged.merge(&entry.delta);
    }
    Some((merged, last))
}

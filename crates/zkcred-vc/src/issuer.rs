//! # Issuer
//!
//! Creates and publishes schemas, credential definitions, and revocation
//! registries, then issues and revokes credentials against them.
//!
//! Every create is idempotent: an artifact already on the ledger is
//! returned as-is, and a concurrent creator that loses the write race gets
//! the winner's artifact.
//!
//! ## Revocable issuance
//!
//! The capacity check, the engine issuance, and the ledger append for one
//! registry run under that registry's counter lock, so two issuances never
//! receive the same index or append out of order. When the append fails
//! after the engine has produced a credential, the credential is handed
//! back inside a [`ConsistencyError`] together with the pending delta, and
//! the registry refuses further writes until
//! [`Issuer::persist_revocation_entry`] lands that delta.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use zkcred_core::{
    ConsistencyError, CredentialDefinition, CredentialDefinitionId, CredentialInfo,
    CredentialOffer, CredentialProposal, CredentialRequest, Interval, IssuanceType,
    NotFoundError, RevocationRegistryDefinition, RevocationRegistryDelta,
    RevocationRegistryEntry, RevocationRegistryId, RevocationRegistryInfo, Schema, SchemaId,
    Timestamp, ValidationError, ZkcredError, DEFAULT_TAG, MAX_REGISTRY_CAPACITY,
};
use zkcred_wallet::WalletHolder;
use zkcred_zkp::RevocationSlot;

use crate::registry::{IssuanceCounters, RegistryCounter};

/// The issuing role of a wallet.
#[derive(Debug)]
pub struct Issuer {
    holder: Arc<WalletHolder>,
    counters: IssuanceCounters,
    /// Registry new credentials go to, per revocable definition.
    active: RwLock<HashMap<CredentialDefinitionId, RevocationRegistryId>>,
    /// Held while a registry is created or reopened, so the definition
    /// write and its genesis append are never split by a concurrent reopen.
    registry_setup: Mutex<()>,
}

impl Issuer {
    pub fn new(holder: Arc<WalletHolder>) -> Self {
        Self {
            holder,
            counters: IssuanceCounters::new(),
            active: RwLock::new(HashMap::new()),
            registry_setup: Mutex::new(()),
        }
    }

    pub fn holder(&self) -> &Arc<WalletHolder> {
        &self.holder
    }

    /// Indices handed out so far in `registry`, if this issuer tracks it.
    pub fn issued_count(&self, registry: &RevocationRegistryId) -> Option<u32> {
        self.counters.issued(registry)
    }

    // ── Artifacts ───────────────────────────────────────────────────

    /// Publish a schema, or return the one already published under the
    /// same `(issuer, name, version)`.
    pub fn create_schema(
        &self,
        name: &str,
        version: &str,
        attr_names: &[String],
    ) -> Result<Schema, ZkcredError> {
        let id = SchemaId::new(self.holder.did().clone(), name, version)?;
        let schema = self.holder.ledger().get_or_create(&id, || {
            Ok(self
                .holder
                .engine()
                .create_schema(self.holder.did(), name, version, attr_names)?)
        })?;
        tracing::info!(schema_id = %schema.id, "schema ready");
        Ok(schema)
    }

    /// Publish a credential definition over a published schema.
    pub fn create_credential_definition(
        &self,
        schema_id: &SchemaId,
        supports_revocation: bool,
    ) -> Result<CredentialDefinition, ZkcredError> {
        let ledger = self.holder.ledger();
        let schema = ledger.require::<Schema>(schema_id)?;
        let seq_no = schema.seq_no.ok_or_else(|| {
            ZkcredError::Ledger(format!("schema {schema_id} was returned without a seq_no"))
        })?;
        let id = CredentialDefinitionId::new(self.holder.did().clone(), seq_no, DEFAULT_TAG)?;
        let cred_def = ledger.get_or_create(&id, || {
            Ok(self.holder.engine().create_credential_definition(
                self.holder.did(),
                &schema,
                DEFAULT_TAG,
                supports_revocation,
            )?)
        })?;
        if cred_def.supports_revocation != supports_revocation {
            tracing::warn!(
                cred_def_id = %cred_def.id,
                requested = supports_revocation,
                "credential definition already exists with a different revocation setting"
            );
        }
        tracing::info!(cred_def_id = %cred_def.id, "credential definition ready");
        Ok(cred_def)
    }

    /// Open the default-tag registry for `cred_def_id`, creating it if needed.
    pub fn create_revocation_registry(
        &self,
        cred_def_id: &CredentialDefinitionId,
        max_cred_num: u32,
    ) -> Result<RevocationRegistryInfo, ZkcredError> {
        self.create_revocation_registry_with_tag(cred_def_id, DEFAULT_TAG, max_cred_num)
    }

    /// Open the registry `tag` for `cred_def_id`, creating it if needed.
    ///
    /// A new registry gets its genesis entry. An existing one has its
    /// issuance counter recovered from the ledger and is returned with its
    /// merged state; its recorded capacity wins over `max_cred_num`. Either
    /// way it becomes the registry new credentials under `cred_def_id` go to.
    pub fn create_revocation_registry_with_tag(
        &self,
        cred_def_id: &CredentialDefinitionId,
        tag: &str,
        max_cred_num: u32,
    ) -> Result<RevocationRegistryInfo, ZkcredError> {
        if max_cred_num == 0 || max_cred_num > MAX_REGISTRY_CAPACITY {
            return Err(ValidationError::InvalidCapacity(max_cred_num).into());
        }
        let ledger = self.holder.ledger();
        let cred_def = ledger.require::<CredentialDefinition>(cred_def_id)?;
        let id = RevocationRegistryId::new(self.holder.did().clone(), cred_def_id.clone(), tag)?;

        let _setup = self.registry_setup.lock();
        let info = match ledger.retrieve::<RevocationRegistryDefinition>(&id)? {
            Some(definition) => self.reopen(&cred_def, definition)?,
            None => {
                let (definition, genesis) = self.holder.engine().create_revocation_registry(
                    self.holder.did(),
                    &cred_def,
                    tag,
                    max_cred_num,
                    IssuanceType::OnDemand,
                )?;
                match ledger.store(definition) {
                    Ok(definition) => {
                        let timestamp = ledger.append_revocation_entry(&id, genesis.clone())?;
                        self.counters
                            .get_or_insert(&id, RegistryCounter::new(definition.max_cred_num, 0));
                        tracing::info!(registry = %id, max_cred_num, "created revocation registry");
                        RevocationRegistryInfo {
                            definition,
                            entry: RevocationRegistryEntry {
                                registry_id: id.clone(),
                                timestamp,
                                delta: genesis,
                            },
                        }
                    }
                    Err(ZkcredError::AlreadyExists(_)) => {
                        tracing::warn!(registry = %id, "lost registry creation race, reopening");
                        let definition = ledger.require::<RevocationRegistryDefinition>(&id)?;
                        self.reopen(&cred_def, definition)?
                    }
                    Err(e) => return Err(e),
                }
            }
        };
        self.active.write().insert(cred_def_id.clone(), id);
        Ok(info)
    }

    /// Offer a credential under one of this issuer's definitions.
    pub fn create_credential_offer(
        &self,
        cred_def_id: &CredentialDefinitionId,
    ) -> Result<CredentialOffer, ZkcredError> {
        let cred_def = self.holder.ledger().require::<CredentialDefinition>(cred_def_id)?;
        Ok(self.holder.engine().create_credential_offer(&cred_def)?)
    }

    // ── Issuance ────────────────────────────────────────────────────

    /// Issue the credential `request` asks for with the values in
    /// `proposal_json`. The proposal must name exactly the schema's
    /// attributes.
    pub fn issue_credential(
        &self,
        request: &CredentialRequest,
        proposal_json: &str,
        offer: &CredentialOffer,
    ) -> Result<CredentialInfo, ZkcredError> {
        let proposal = CredentialProposal::from_json(proposal_json)?;
        let ledger = self.holder.ledger();
        let cred_def = ledger.require::<CredentialDefinition>(&offer.cred_def_id)?;
        let schema = ledger.require::<Schema>(&cred_def.schema_id)?;
        check_proposal(&schema, &proposal)?;
        let values = proposal.into_values();
        let engine = self.holder.engine();

        if !cred_def.supports_revocation {
            let (credential, _) = engine.issue_credential(offer, request, &values, None)?;
            tracing::info!(cred_def_id = %cred_def.id, "issued non-revocable credential");
            return Ok(CredentialInfo {
                credential,
                delta: None,
                delta_timestamp: None,
            });
        }

        let registry = self.active_registry(&cred_def.id)?;
        let definition = ledger.require::<RevocationRegistryDefinition>(&registry)?;
        let counter = self.counter_for(&definition)?;
        let mut counter = counter.lock();
        counter.ensure_no_pending(&registry)?;
        let (current, _) = ledger.retrieve_revocation_delta(&registry, Interval::all_time())?;
        counter.observe_allocated(highest_index(&current));
        if !counter.has_capacity() {
            return Err(ZkcredError::CapacityExceeded {
                registry,
                max: counter.max_cred_num(),
            });
        }
        let index = counter.next_index();
        let (credential, delta) = engine.issue_credential(
            offer,
            request,
            &values,
            Some(RevocationSlot {
                definition: &definition,
                current: &current,
                index,
            }),
        )?;
        let delta = delta.ok_or_else(|| {
            ZkcredError::Cryptographic(format!(
                "engine returned no revocation delta for index {index} in {registry}"
            ))
        })?;

        // The index is spent once the engine has signed, whether or not
        // the append lands.
        counter.record_issuance();
        match ledger.append_revocation_entry(&registry, delta.clone()) {
            Ok(timestamp) => {
                tracing::info!(%registry, index, "issued revocable credential");
                Ok(CredentialInfo {
                    credential,
                    delta: Some(delta),
                    delta_timestamp: Some(timestamp),
                })
            }
            Err(e) => {
                tracing::error!(%registry, index, error = %e, "issued credential but revocation delta was not persisted");
                counter.set_pending(delta.clone());
                Err(ConsistencyError {
                    registry,
                    pending_delta: Box::new(delta),
                    credential: Box::new(CredentialInfo {
                        credential,
                        delta: None,
                        delta_timestamp: None,
                    }),
                    reason: e.to_string(),
                }
                .into())
            }
        }
    }

    /// Retry the ledger write of a delta left pending by a failed issuance.
    /// Unblocks the registry on success.
    pub fn persist_revocation_entry(&self, pending: &ConsistencyError) -> Result<Timestamp, ZkcredError> {
        let counter = self.counters.get(&pending.registry).ok_or_else(|| {
            ZkcredError::Ledger(format!("{} is not tracked by this issuer", pending.registry))
        })?;
        let mut counter = counter.lock();
        if counter.pending() != Some(pending.pending_delta.as_ref()) {
            return Err(ZkcredError::Ledger(format!(
                "{} has no pending delta matching this issuance",
                pending.registry
            )));
        }
        let timestamp = self
            .holder
            .ledger()
            .append_revocation_entry(&pending.registry, (*pending.pending_delta).clone())?;
        counter.clear_pending();
        tracing::info!(registry = %pending.registry, %timestamp, "persisted pending revocation delta");
        Ok(timestamp)
    }

    /// Revoke the credential at `index` in `registry`.
    pub fn revoke_credential(
        &self,
        registry: &RevocationRegistryId,
        index: u32,
    ) -> Result<(RevocationRegistryDelta, Timestamp), ZkcredError> {
        let ledger = self.holder.ledger();
        let definition = ledger.require::<RevocationRegistryDefinition>(registry)?;
        let counter = self.counter_for(&definition)?;
        let counter = counter.lock();
        counter.ensure_no_pending(registry)?;
        let (current, _) = ledger.retrieve_revocation_delta(registry, Interval::all_time())?;
        let delta = self
            .holder
            .engine()
            .revoke_credential(&definition, &current, index)?;
        let timestamp = ledger.append_revocation_entry(registry, delta.clone())?;
        tracing::info!(%registry, index, %timestamp, "revoked credential");
        Ok((delta, timestamp))
    }

    // ── Internals ───────────────────────────────────────────────────

    fn reopen(
        &self,
        cred_def: &CredentialDefinition,
        definition: RevocationRegistryDefinition,
    ) -> Result<RevocationRegistryInfo, ZkcredError> {
        let ledger = self.holder.ledger();
        let id = definition.id.clone();
        let entry = match ledger.retrieve_revocation_delta(&id, Interval::all_time()) {
            Ok((delta, timestamp)) => RevocationRegistryEntry {
                registry_id: id.clone(),
                timestamp,
                delta,
            },
            Err(e) if e.is_not_found() => {
                // Definition written but genesis never landed.
                let (_, genesis) = self.holder.engine().create_revocation_registry(
                    self.holder.did(),
                    cred_def,
                    &definition.tag,
                    definition.max_cred_num,
                    definition.issuance_type,
                )?;
                let timestamp = ledger.append_revocation_entry(&id, genesis.clone())?;
                RevocationRegistryEntry {
                    registry_id: id.clone(),
                    timestamp,
                    delta: genesis,
                }
            }
            Err(e) => return Err(e),
        };
        let issued = highest_index(&entry.delta);
        let counter = self
            .counters
            .get_or_insert(&id, RegistryCounter::new(definition.max_cred_num, issued));
        tracing::info!(registry = %id, issued = counter.lock().issued(), "reopened revocation registry");
        Ok(RevocationRegistryInfo { definition, entry })
    }

    fn counter_for(
        &self,
        definition: &RevocationRegistryDefinition,
    ) -> Result<Arc<Mutex<RegistryCounter>>, ZkcredError> {
        if let Some(counter) = self.counters.get(&definition.id) {
            return Ok(counter);
        }
        let issued = match self
            .holder
            .ledger()
            .retrieve_revocation_delta(&definition.id, Interval::all_time())
        {
            Ok((delta, _)) => highest_index(&delta),
            Err(e) if e.is_not_found() => 0,
            Err(e) => return Err(e),
        };
        Ok(self
            .counters
            .get_or_insert(&definition.id, RegistryCounter::new(definition.max_cred_num, issued)))
    }

    /// The registry issuance under `cred_def_id` goes to. Falls back to the
    /// default-tag registry on the ledger.
    fn active_registry(
        &self,
        cred_def_id: &CredentialDefinitionId,
    ) -> Result<RevocationRegistryId, ZkcredError> {
        if let Some(id) = self.active.read().get(cred_def_id) {
            return Ok(id.clone());
        }
        let id = RevocationRegistryId::new(self.holder.did().clone(), cred_def_id.clone(), DEFAULT_TAG)?;
        if self
            .holder
            .ledger()
            .retrieve::<RevocationRegistryDefinition>(&id)?
            .is_none()
        {
            return Err(NotFoundError::RevocationRegistry(id.to_string()).into());
        }
        self.active.write().insert(cred_def_id.clone(), id.clone());
        Ok(id)
    }
}

/// Highest index the delta stream has handed out, issued or since revoked.
fn highest_index(delta: &RevocationRegistryDelta) -> u32 {
    delta.issued.iter().chain(&delta.revoked).copied().max().unwrap_or(0)
}

fn check_proposal(schema: &Schema, proposal: &CredentialProposal) -> Result<(), ValidationError> {
    let expected: BTreeSet<&str> = schema.attr_names.iter().map(String::as_str).collect();
    let given: BTreeSet<&str> = proposal.values().keys().map(String::as_str).collect();
    if expected == given {
        return Ok(());
    }
    let missing: Vec<&str> = expected.difference(&given).copied().collect();
    let unknown: Vec<&str> = given.difference(&expected).copied().collect();
    Err(ValidationError::InvalidProposal(format!(
        "proposal does not match schema {}: missing {missing:?}, unknown {unknown:?}",
        schema.id
    )))
}

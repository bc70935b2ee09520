//! # Issuance Counters
//!
//! Each revocation registry has a fixed capacity. The issuer tracks how
//! many indices it has handed out per registry, behind a per-registry
//! mutex that also serializes the registry's ledger appends.
//!
//! A counter is recovered from the ledger when an issuer first touches a
//! registry it did not create in this process, and caught up again before
//! every issuance: the highest index in the merged delta stream, issued or
//! since revoked.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use zkcred_core::{RevocationRegistryDelta, RevocationRegistryId, ZkcredError};

/// Issuance state of one registry. Guard it for the whole
/// check-issue-append sequence.
#[derive(Debug)]
pub struct RegistryCounter {
    max_cred_num: u32,
    issued: u32,
    /// A delta produced by an issuance whose ledger append failed.
    pending: Option<RevocationRegistryDelta>,
}

impl RegistryCounter {
    pub fn new(max_cred_num: u32, issued: u32) -> Self {
        Self {
            max_cred_num,
            issued,
            pending: None,
        }
    }

    pub fn issued(&self) -> u32 {
        self.issued
    }

    pub fn max_cred_num(&self) -> u32 {
        self.max_cred_num
    }

    pub fn has_capacity(&self) -> bool {
        self.issued < self.max_cred_num
    }

    /// The index the next issuance takes. Indices start at 1.
    pub fn next_index(&self) -> u32 {
        self.issued + 1
    }

    pub fn record_issuance(&mut self) {
        self.issued += 1;
    }

    /// Catch up with indices allocated on the ledger by another issuer
    /// process writing to the same registry. Never moves backwards.
    pub fn observe_allocated(&mut self, highest_index: u32) {
        self.issued = self.issued.max(highest_index);
    }

    pub fn pending(&self) -> Option<&RevocationRegistryDelta> {
        self.pending.as_ref()
    }

    pub fn set_pending(&mut self, delta: RevocationRegistryDelta) {
        self.pending = Some(delta);
    }

    pub fn clear_pending(&mut self) {
        self.pending = None;
    }

    /// Fail if an unpersisted delta blocks further registry writes.
    pub fn ensure_no_pending(&self, registry: &RevocationRegistryId) -> Result<(), ZkcredError> {
        match self.pending {
            Some(_) => Err(ZkcredError::Ledger(format!(
                "{registry} has an unpersisted revocation delta; persist it before writing again"
            ))),
            None => Ok(()),
        }
    }
}

/// Counters for every registry an issuer writes to.
#[derive(Debug, Default)]
pub struct IssuanceCounters {
    counters: RwLock<HashMap<RevocationRegistryId, Arc<Mutex<RegistryCounter>>>>,
}

impl IssuanceCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, registry: &RevocationRegistryId) -> Option<Arc<Mutex<RegistryCounter>>> {
        self.counters.read().get(registry).cloned()
    }

    /// Install `counter` unless one exists; return the installed counter.
    pub fn get_or_insert(
        &self,
        registry: &RevocationRegistryId,
        counter: RegistryCounter,
    ) -> Arc<Mutex<RegistryCounter>> {
        self.counters
            .write()
            .entry(registry.clone())
            .or_insert_with(|| Arc::new(Mutex::new(counter)))
            .clone()
    }

    /// Issued count of a registry, if tracked.
    pub fn issued(&self, registry: &RevocationRegistryId) -> Option<u32> {
        self.get(registry).map(|c| c.lock().issued())
    }
}

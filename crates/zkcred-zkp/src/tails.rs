//! Tails handles.
//!
//! A revocation registry's tails file holds the per-index material a prover
//! needs to build a witness. The handle records where the file lives and
//! the hash the registry definition commits to; engines refuse a handle
//! whose hash differs from the definition they are working against.

use serde::{Deserialize, Serialize};
use zkcred_core::RevocationRegistryDefinition;

/// Reference to a tails file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TailsHandle {
    pub location: String,
    pub hash: String,
}

impl TailsHandle {
    pub fn new(location: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            hash: hash.into(),
        }
    }

    /// The handle a registry definition points to.
    pub fn for_definition(def: &RevocationRegistryDefinition) -> Self {
        Self::new(def.tails_location.clone(), def.tails_hash.clone())
    }

    /// Whether this handle is the one `def` commits to.
    pub fn matches(&self, def: &RevocationRegistryDefinition) -> bool {
        self.hash == def.tails_hash
    }
}

//! # Ledger Artifacts
//!
//! The immutable definitions written to the ledger (schemas, credential
//! definitions, revocation registry definitions) and the append-only
//! revocation registry entries.
//!
//! Definitions are write-once per id. Issuance never mutates a definition;
//! it only appends entries to the registry's delta stream.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::{CredentialDefinitionId, Did, RevocationRegistryId, SchemaId};
use crate::temporal::Timestamp;

/// Largest capacity a revocation registry may be created with.
pub const MAX_REGISTRY_CAPACITY: u32 = 100_000;

/// Default tag for credential definitions and registries.
pub const DEFAULT_TAG: &str = "default";

/// Named, versioned list of attribute names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    pub id: SchemaId,
    pub name: String,
    pub version: String,
    /// Attribute names in declaration order.
    pub attr_names: Vec<String>,
    /// Ledger sequence number, assigned on first write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq_no: Option<u64>,
}

impl Schema {
    /// A schema not yet written to the ledger.
    ///
    /// Rejects an empty attribute list, empty names, and duplicates.
    pub fn new(
        issuer: Did,
        name: impl Into<String>,
        version: impl Into<String>,
        attr_names: Vec<String>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        let version = version.into();
        let id = SchemaId::new(issuer, name.clone(), version.clone())?;
        if attr_names.is_empty() {
            return Err(ValidationError::InvalidAttributes(
                "schema must declare at least one attribute".into(),
            ));
        }
        let mut seen = BTreeSet::new();
        for attr in &attr_names {
            if attr.trim().is_empty() {
                return Err(ValidationError::InvalidAttributes(
                    "attribute names must be non-empty".into(),
                ));
            }
            if !seen.insert(attr.as_str()) {
                return Err(ValidationError::InvalidAttributes(format!(
                    "duplicate attribute \"{attr}\""
                )));
            }
        }
        Ok(Self {
            id,
            name,
            version,
            attr_names,
            seq_no: None,
        })
    }

    /// Whether the schema declares `attr`.
    pub fn has_attribute(&self, attr: &str) -> bool {
        self.attr_names.iter().any(|a| a == attr)
    }
}

/// Issuer-specific signing material bound to a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialDefinition {
    pub id: CredentialDefinitionId,
    pub schema_id: SchemaId,
    /// Signature type tag, `CL` for every definition this system writes.
    #[serde(rename = "type")]
    pub signature_type: String,
    pub tag: String,
    /// Public key material, opaque outside the cryptography engine.
    pub value: serde_json::Value,
    pub supports_revocation: bool,
}

/// How credential indices enter a revocation registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssuanceType {
    /// Each issuance appends its index to the registry.
    #[serde(rename = "ISSUANCE_ON_DEMAND")]
    OnDemand,
    /// Every index is considered issued from the start.
    #[serde(rename = "ISSUANCE_BY_DEFAULT")]
    ByDefault,
}

/// Definition of an accumulator-based revocation registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationRegistryDefinition {
    pub id: RevocationRegistryId,
    pub cred_def_id: CredentialDefinitionId,
    pub tag: String,
    pub issuance_type: IssuanceType,
    pub max_cred_num: u32,
    /// Accumulator public key, opaque outside the cryptography engine.
    pub public_keys: serde_json::Value,
    pub tails_hash: String,
    pub tails_location: String,
}

/// Incremental change to a registry's accumulator.
///
/// A single ledger entry carries one delta; folding every entry up to a
/// point in time with [`merge`](Self::merge) yields the cumulative state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationRegistryDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_accum: Option<String>,
    pub accum: String,
    #[serde(default)]
    pub issued: BTreeSet<u32>,
    #[serde(default)]
    pub revoked: BTreeSet<u32>,
}

impl RevocationRegistryDelta {
    /// Fold a later delta into this one.
    ///
    /// The accumulator becomes the later one; an index revoked later leaves
    /// the issued set and vice versa. `prev_accum` keeps the earliest value.
    pub fn merge(&mut self, later: &RevocationRegistryDelta) {
        for idx in &later.issued {
            self.revoked.remove(idx);
            self.issued.insert(*idx);
        }
        for idx in &later.revoked {
            self.issued.remove(idx);
            self.revoked.insert(*idx);
        }
        if self.prev_accum.is_none() && self.accum.is_empty() {
            self.prev_accum = later.prev_accum.clone();
        }
        self.accum = later.accum.clone();
    }

    /// Number of distinct indices ever handed out: issued or since revoked.
    pub fn allocated_count(&self) -> usize {
        self.issued.union(&self.revoked).count()
    }

    /// Whether `index` is revoked in this (cumulative) delta.
    pub fn is_revoked(&self, index: u32) -> bool {
        self.revoked.contains(&index)
    }
}

/// One timestamped entry in a registry's append-only delta stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationRegistryEntry {
    pub registry_id: RevocationRegistryId,
    /// Assigned by the ledger when the entry is appended.
    pub timestamp: Timestamp,
    pub delta: RevocationRegistryDelta,
}

/// A registry definition with its cumulative state at the time it was
/// returned: the genesis entry for a new registry, the merged stream for a
/// reopened one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationRegistryInfo {
    pub definition: RevocationRegistryDefinition,
    pub entry: RevocationRegistryEntry,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn did() -> Did {
        Did::new("did:sov:issuer1").unwrap()
    }

    fn delta(accum: &str, issued: &[u32], revoked: &[u32]) -> RevocationRegistryDelta {
        RevocationRegistryDelta {
            prev_accum: None,
            accum: accum.into(),
            issued: issued.iter().copied().collect(),
            revoked: revoked.iter().copied().collect(),
        }
    }

    #[test]
    fn schema_validates_attributes() {
        assert!(Schema::new(did(), "p", "1.0", vec!["name".into(), "age".into()]).is_ok());
        assert!(Schema::new(did(), "p", "1.0", vec![]).is_err());
        assert!(Schema::new(did(), "p", "1.0", vec!["a".into(), "a".into()]).is_err());
        assert!(Schema::new(did(), "p", "1.0", vec![" ".into()]).is_err());
    }

    #[test]
    fn schema_wire_shape_is_camel_case() {
        let mut s = Schema::new(did(), "passport", "1.0", vec!["name".into()]).unwrap();
        s.seq_no = Some(3);
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["id"], "did:sov:issuer1:2:passport:1.0");
        assert_eq!(v["attrNames"][0], "name");
        assert_eq!(v["seqNo"], 3);
    }

    #[test]
    fn issuance_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&IssuanceType::OnDemand).unwrap(),
            "\"ISSUANCE_ON_DEMAND\""
        );
        assert_eq!(
            serde_json::to_string(&IssuanceType::ByDefault).unwrap(),
            "\"ISSUANCE_BY_DEFAULT\""
        );
    }

    #[test]
    fn merge_applies_issue_then_revoke() {
        let mut acc = delta("a0", &[], &[]);
        acc.merge(&delta("a1", &[1, 2], &[]));
        acc.merge(&delta("a2", &[], &[1]));
        assert_eq!(acc.accum, "a2");
        assert_eq!(acc.issued, BTreeSet::from([2]));
        assert_eq!(acc.revoked, BTreeSet::from([1]));
        assert!(acc.is_revoked(1));
        assert!(!acc.is_revoked(2));
        assert_eq!(acc.allocated_count(), 2);
    }

    #[test]
    fn merge_reissue_clears_revocation() {
        let mut acc = delta("a0", &[5], &[]);
        acc.merge(&delta("a1", &[], &[5]));
        acc.merge(&delta("a2", &[5], &[]));
        assert!(!acc.is_revoked(5));
        assert_eq!(acc.allocated_count(), 1);
    }

    #[test]
    fn merge_into_empty_takes_prev_accum() {
        let mut acc = RevocationRegistryDelta::default();
        let mut later = delta("a1", &[1], &[]);
        later.prev_accum = Some("a0".into());
        acc.merge(&later);
        assert_eq!(acc.prev_accum.as_deref(), Some("a0"));
        assert_eq!(acc.accum, "a1");
    }
}

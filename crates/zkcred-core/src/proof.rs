//! # Proofs
//!
//! The prover's answer to a [`ProofRequest`](crate::ProofRequest) and the
//! inputs on both sides of the engine's proof primitives.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::artifact::{
    CredentialDefinition, RevocationRegistryDefinition, RevocationRegistryDelta, Schema,
};
use crate::identity::{CredentialDefinitionId, CredentialId, RevocationRegistryId, SchemaId};
use crate::temporal::Timestamp;

/// A revealed attribute in a proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealedAttribute {
    pub raw: String,
    pub encoded: String,
    /// Index into [`ProofInfo::identifiers`].
    pub sub_proof_index: usize,
}

/// Which sub-proof answers a predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredicateReferent {
    pub sub_proof_index: usize,
}

/// The structured, non-opaque part of a proof.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestedProof {
    #[serde(default)]
    pub revealed_attrs: BTreeMap<String, RevealedAttribute>,
    #[serde(default)]
    pub predicates: BTreeMap<String, PredicateReferent>,
}

/// The artifacts one sub-proof was built against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofIdentifier {
    pub schema_id: SchemaId,
    pub cred_def_id: CredentialDefinitionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev_reg_id: Option<RevocationRegistryId>,
    /// Ledger timestamp of the revocation state used, when one was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
}

/// A presentation: opaque proof plus the parts the verifier reads directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofInfo {
    /// Engine proof blob.
    pub proof: serde_json::Value,
    pub requested_proof: RequestedProof,
    /// One per sub-proof.
    pub identifiers: Vec<ProofIdentifier>,
}

impl ProofInfo {
    /// Raw revealed value for `referent`.
    pub fn revealed_raw(&self, referent: &str) -> Option<&str> {
        self.requested_proof
            .revealed_attrs
            .get(referent)
            .map(|a| a.raw.as_str())
    }
}

/// Credential chosen for a requested attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestedAttribute {
    pub cred_id: CredentialId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
    pub revealed: bool,
}

/// Credential chosen for a requested predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestedPredicate {
    pub cred_id: CredentialId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
}

/// The prover's per-referent credential selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestedCredentials {
    #[serde(default)]
    pub requested_attributes: BTreeMap<String, RequestedAttribute>,
    #[serde(default)]
    pub requested_predicates: BTreeMap<String, RequestedPredicate>,
}

/// Witness state of one credential in a registry at a ledger timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationState {
    pub registry: RevocationRegistryId,
    pub timestamp: Timestamp,
    /// Engine witness, opaque outside the engine.
    pub value: serde_json::Value,
}

/// Ledger artifacts a proof was built against, assembled for verification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsedData {
    pub schemas: BTreeMap<SchemaId, Schema>,
    pub cred_defs: BTreeMap<CredentialDefinitionId, CredentialDefinition>,
    #[serde(default)]
    pub rev_reg_defs: BTreeMap<RevocationRegistryId, RevocationRegistryDefinition>,
    /// Cumulative registry state by registry, then by ledger timestamp.
    #[serde(default)]
    pub rev_regs: BTreeMap<RevocationRegistryId, BTreeMap<Timestamp, RevocationRegistryDelta>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Did;

    #[test]
    fn revealed_raw_lookup() {
        let mut rp = RequestedProof::default();
        rp.revealed_attrs.insert(
            "attr_name".into(),
            RevealedAttribute {
                raw: "Alice".into(),
                encoded: crate::encode_attribute_value("Alice"),
                sub_proof_index: 0,
            },
        );
        let proof = ProofInfo {
            proof: serde_json::json!({}),
            requested_proof: rp,
            identifiers: vec![],
        };
        assert_eq!(proof.revealed_raw("attr_name"), Some("Alice"));
        assert_eq!(proof.revealed_raw("missing"), None);
    }

    #[test]
    fn identifier_omits_absent_revocation_fields() {
        let did = Did::new("did:sov:issuer1").unwrap();
        let id = ProofIdentifier {
            schema_id: SchemaId::new(did.clone(), "p", "1.0").unwrap(),
            cred_def_id: CredentialDefinitionId::new(did, 1, "default").unwrap(),
            rev_reg_id: None,
            timestamp: None,
        };
        let v = serde_json::to_value(&id).unwrap();
        assert!(v.get("revRegId").is_none());
        assert!(v.get("timestamp").is_none());
        assert_eq!(v["schemaId"], "did:sov:issuer1:2:p:1.0");
    }

    #[test]
    fn used_data_keys_serialize_as_strings() {
        let did = Did::new("did:sov:issuer1").unwrap();
        let schema = Schema::new(did, "p", "1.0", vec!["name".into()]).unwrap();
        let mut used = UsedData::default();
        used.schemas.insert(schema.id.clone(), schema);
        let json = serde_json::to_string(&used).unwrap();
        assert!(json.contains("\"did:sov:issuer1:2:p:1.0\""));
        let back: UsedData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, used);
    }
}

//! # Credential Exchange Types
//!
//! Offer, request, issued credential, and the holder's view of what it
//! stores. Cryptographic payloads (blinded master secret, signature) are
//! opaque `serde_json::Value`s owned by the engine; the orchestration
//! layer only reads the structured fields around them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::artifact::RevocationRegistryDelta;
use crate::encoding::encode_attribute_value;
use crate::error::ValidationError;
use crate::identity::{
    CredentialDefinitionId, CredentialId, Did, RevocationRegistryId, SchemaId,
};
use crate::temporal::Timestamp;

/// Issuer's offer to issue a credential under a definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialOffer {
    pub schema_id: SchemaId,
    pub cred_def_id: CredentialDefinitionId,
    pub issuer_did: Did,
    pub nonce: String,
}

/// Holder's blinded request for a credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRequest {
    pub prover_did: Did,
    pub cred_def_id: CredentialDefinitionId,
    /// Blinded master secret, opaque outside the engine.
    pub blinded_ms: serde_json::Value,
    pub nonce: String,
}

/// Holder-side secrets needed to unblind the issued credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRequestMetadata {
    pub master_secret_name: String,
    pub master_secret_blinding_data: serde_json::Value,
    pub nonce: String,
}

/// One attribute value in both renderings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValue {
    pub raw: String,
    pub encoded: String,
}

impl AttributeValue {
    /// Build from the raw value, computing its encoding.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let encoded = encode_attribute_value(&raw);
        Self { raw, encoded }
    }
}

/// Attribute values the issuer is asked to bind into a credential.
///
/// Accepts either `{"name": "Alice"}` or the explicit
/// `{"name": {"raw": "Alice", "encoded": "..."}}` form. In the explicit
/// form a missing `encoded` is computed; a supplied one must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialProposal(BTreeMap<String, AttributeValue>);

impl CredentialProposal {
    /// An empty proposal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw attribute value.
    pub fn with(mut self, name: impl Into<String>, raw: impl Into<String>) -> Self {
        self.0.insert(name.into(), AttributeValue::from_raw(raw));
        self
    }

    /// Parse proposal JSON in either accepted form.
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| ValidationError::InvalidProposal(e.to_string()))?;
        let obj = value
            .as_object()
            .ok_or_else(|| ValidationError::InvalidProposal("expected a JSON object".into()))?;
        let mut out = BTreeMap::new();
        for (name, v) in obj {
            let attr = match v {
                serde_json::Value::String(raw) => AttributeValue::from_raw(raw.clone()),
                serde_json::Value::Number(n) => AttributeValue::from_raw(n.to_string()),
                serde_json::Value::Object(inner) => {
                    let raw = inner.get("raw").and_then(|r| r.as_str()).ok_or_else(|| {
                        ValidationError::InvalidProposal(format!(
                            "attribute \"{name}\" has no string \"raw\""
                        ))
                    })?;
                    let attr = AttributeValue::from_raw(raw);
                    if let Some(enc) = inner.get("encoded").and_then(|e| e.as_str()) {
                        if enc != attr.encoded {
                            return Err(ValidationError::InvalidProposal(format!(
                                "attribute \"{name}\" encoding does not match its raw value"
                            )));
                        }
                    }
                    attr
                }
                _ => {
                    return Err(ValidationError::InvalidProposal(format!(
                        "attribute \"{name}\" must be a string, number, or {{raw, encoded}}"
                    )))
                }
            };
            out.insert(name.clone(), attr);
        }
        Ok(Self(out))
    }

    /// The attribute values by name.
    pub fn values(&self) -> &BTreeMap<String, AttributeValue> {
        &self.0
    }

    /// Consume into the attribute map.
    pub fn into_values(self) -> BTreeMap<String, AttributeValue> {
        self.0
    }
}

/// Whether a credential participates in a revocation registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RevocationBinding {
    /// Bound to `index` in `registry`.
    Revocable {
        registry: RevocationRegistryId,
        index: u32,
    },
    /// Issued under a definition without revocation support.
    NonRevocable,
}

impl RevocationBinding {
    /// The registry, when revocable.
    pub fn registry(&self) -> Option<&RevocationRegistryId> {
        match self {
            Self::Revocable { registry, .. } => Some(registry),
            Self::NonRevocable => None,
        }
    }
}

/// An issued credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub schema_id: SchemaId,
    pub cred_def_id: CredentialDefinitionId,
    pub values: BTreeMap<String, AttributeValue>,
    /// Issuer signature, opaque outside the engine.
    pub signature: serde_json::Value,
    pub revocation: RevocationBinding,
}

/// Result of an issuance: the credential plus the registry change it made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialInfo {
    pub credential: Credential,
    /// Delta appended for this issuance; `None` when non-revocable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<RevocationRegistryDelta>,
    /// Ledger timestamp of the appended delta.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_timestamp: Option<Timestamp>,
}

impl CredentialInfo {
    /// The credential's revocation binding.
    pub fn revocation(&self) -> &RevocationBinding {
        &self.credential.revocation
    }
}

/// A stored credential as the holder enumerates it when matching requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeldCredential {
    pub id: CredentialId,
    /// Raw attribute values by name.
    pub attrs: BTreeMap<String, String>,
    pub schema_id: SchemaId,
    pub cred_def_id: CredentialDefinitionId,
    pub revocation: RevocationBinding,
}

impl HeldCredential {
    /// The issuer of the credential definition.
    pub fn issuer(&self) -> &Did {
        self.cred_def_id.issuer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proposal_accepts_plain_strings() {
        let p = CredentialProposal::from_json(r#"{"name":"Alice","age":"18"}"#).unwrap();
        assert_eq!(p.values()["age"].encoded, "18");
        assert_eq!(p.values()["name"].raw, "Alice");
    }

    #[test]
    fn proposal_accepts_numbers() {
        let p = CredentialProposal::from_json(r#"{"age":17}"#).unwrap();
        assert_eq!(p.values()["age"].raw, "17");
    }

    #[test]
    fn proposal_accepts_explicit_form() {
        let p = CredentialProposal::from_json(r#"{"age":{"raw":"18","encoded":"18"}}"#).unwrap();
        assert_eq!(p.values()["age"], AttributeValue::from_raw("18"));
        let p = CredentialProposal::from_json(r#"{"name":{"raw":"Alice"}}"#).unwrap();
        assert_eq!(p.values()["name"], AttributeValue::from_raw("Alice"));
    }

    #[test]
    fn proposal_rejects_mismatched_encoding() {
        let err = CredentialProposal::from_json(r#"{"age":{"raw":"18","encoded":"19"}}"#)
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidProposal(_)));
    }

    #[test]
    fn proposal_rejects_non_objects() {
        assert!(CredentialProposal::from_json("[1,2]").is_err());
        assert!(CredentialProposal::from_json(r#"{"a":[1]}"#).is_err());
        assert!(CredentialProposal::from_json("not json").is_err());
    }

    #[test]
    fn builder_and_json_forms_agree() {
        let built = CredentialProposal::new().with("name", "Alice");
        let parsed = CredentialProposal::from_json(r#"{"name":"Alice"}"#).unwrap();
        assert_eq!(built, parsed);
    }

    #[test]
    fn revocation_binding_wire_shape() {
        let json = serde_json::to_value(RevocationBinding::NonRevocable).unwrap();
        assert_eq!(json, "nonRevocable");
        assert_eq!(RevocationBinding::NonRevocable.registry(), None);
    }
}

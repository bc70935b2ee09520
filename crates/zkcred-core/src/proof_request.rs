//! # Proof Requests
//!
//! What a verifier asks for: attributes to reveal, predicates to prove,
//! and optionally a non-revocation interval. Keys of both maps are
//! *referents*, request-local names the proof reports back against.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::credential::HeldCredential;
use crate::identity::{CredentialDefinitionId, Did, SchemaId};
use crate::temporal::Interval;

/// Default proof request version.
pub const DEFAULT_PROOF_REQUEST_VERSION: &str = "1.0";

/// One acceptable credential source. All present fields must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restriction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<SchemaId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cred_def_id: Option<CredentialDefinitionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_did: Option<Did>,
}

impl Restriction {
    /// Restrict to one schema.
    pub fn schema(id: SchemaId) -> Self {
        Self {
            schema_id: Some(id),
            ..Self::default()
        }
    }

    /// Restrict to one credential definition.
    pub fn cred_def(id: CredentialDefinitionId) -> Self {
        Self {
            cred_def_id: Some(id),
            ..Self::default()
        }
    }

    /// Restrict to one issuer.
    pub fn issuer(did: Did) -> Self {
        Self {
            issuer_did: Some(did),
            ..Self::default()
        }
    }

    /// Whether a credential with these ids satisfies every field.
    pub fn matches_ids(&self, schema_id: &SchemaId, cred_def_id: &CredentialDefinitionId) -> bool {
        self.schema_id.as_ref().map_or(true, |s| s == schema_id)
            && self.cred_def_id.as_ref().map_or(true, |c| c == cred_def_id)
            && self.issuer_did.as_ref().map_or(true, |d| d == cred_def_id.issuer())
    }

    /// Whether `cred` satisfies every field of this restriction.
    pub fn matches(&self, cred: &HeldCredential) -> bool {
        self.matches_ids(&cred.schema_id, &cred.cred_def_id)
    }
}

/// Whether a restriction list admits a credential with these ids. An empty
/// list admits everything; otherwise any one restriction must match.
pub fn restrictions_admit(
    restrictions: &[Restriction],
    schema_id: &SchemaId,
    cred_def_id: &CredentialDefinitionId,
) -> bool {
    restrictions.is_empty() || restrictions.iter().any(|r| r.matches_ids(schema_id, cred_def_id))
}

fn restrictions_allow(restrictions: &[Restriction], cred: &HeldCredential) -> bool {
    restrictions_admit(restrictions, &cred.schema_id, &cred.cred_def_id)
}

/// A requested attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialFieldReference {
    pub name: String,
    /// Alternatives; empty means any credential carrying the attribute.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restrictions: Vec<Restriction>,
    /// Required raw value. Empty means reveal without constraining.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
}

impl CredentialFieldReference {
    /// Reveal `name` from any credential.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            restrictions: Vec::new(),
            value: String::new(),
        }
    }

    /// Require the revealed raw value to equal `value`.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Add an acceptable source.
    pub fn restricted_to(mut self, restriction: Restriction) -> Self {
        self.restrictions.push(restriction);
        self
    }

    /// Whether `cred` carries the attribute and passes the restrictions.
    pub fn can_supply(&self, cred: &HeldCredential) -> bool {
        cred.attrs.contains_key(&self.name) && restrictions_allow(&self.restrictions, cred)
    }

    /// [`can_supply`](Self::can_supply), and when a value is set, the
    /// credential holds exactly that raw value.
    pub fn is_satisfied_by(&self, cred: &HeldCredential) -> bool {
        self.can_supply(cred)
            && (self.value.is_empty() || cred.attrs.get(&self.name) == Some(&self.value))
    }
}

/// Predicate comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredicateType {
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = "<")]
    Less,
}

impl PredicateType {
    /// Evaluate `lhs <op> rhs`.
    pub fn holds(&self, lhs: i32, rhs: i32) -> bool {
        match self {
            Self::GreaterOrEqual => lhs >= rhs,
            Self::Greater => lhs > rhs,
            Self::LessOrEqual => lhs <= rhs,
            Self::Less => lhs < rhs,
        }
    }
}

impl std::fmt::Display for PredicateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::GreaterOrEqual => ">=",
            Self::Greater => ">",
            Self::LessOrEqual => "<=",
            Self::Less => "<",
        })
    }
}

/// A requested predicate over an integer attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPredicateReference {
    pub name: String,
    pub p_type: PredicateType,
    pub p_value: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restrictions: Vec<Restriction>,
}

impl CredentialPredicateReference {
    /// `name >= value`.
    pub fn greater_or_equal(name: impl Into<String>, value: i32) -> Self {
        Self {
            name: name.into(),
            p_type: PredicateType::GreaterOrEqual,
            p_value: value,
            restrictions: Vec::new(),
        }
    }

    /// Add an acceptable source.
    pub fn restricted_to(mut self, restriction: Restriction) -> Self {
        self.restrictions.push(restriction);
        self
    }

    /// Whether `cred` carries the attribute and passes the restrictions.
    pub fn can_supply(&self, cred: &HeldCredential) -> bool {
        cred.attrs.contains_key(&self.name) && restrictions_allow(&self.restrictions, cred)
    }

    /// Whether `cred` holds an integer attribute that satisfies the predicate.
    pub fn is_satisfied_by(&self, cred: &HeldCredential) -> bool {
        let Some(value) = cred.attrs.get(&self.name).and_then(|raw| raw.parse::<i32>().ok())
        else {
            return false;
        };
        restrictions_allow(&self.restrictions, cred) && self.p_type.holds(value, self.p_value)
    }
}

/// A verifier's request for a proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRequest {
    pub name: String,
    pub version: String,
    pub nonce: String,
    #[serde(default)]
    pub requested_attributes: BTreeMap<String, CredentialFieldReference>,
    #[serde(default)]
    pub requested_predicates: BTreeMap<String, CredentialPredicateReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_revoked: Option<Interval>,
}

impl ProofRequest {
    /// Start building a request.
    pub fn builder(name: impl Into<String>, nonce: impl Into<String>) -> ProofRequestBuilder {
        ProofRequestBuilder {
            request: ProofRequest {
                name: name.into(),
                version: DEFAULT_PROOF_REQUEST_VERSION.to_string(),
                nonce: nonce.into(),
                requested_attributes: BTreeMap::new(),
                requested_predicates: BTreeMap::new(),
                non_revoked: None,
            },
        }
    }

    /// Referent → expected raw value, for attributes that constrain one.
    pub fn expected_values(&self) -> BTreeMap<&str, &str> {
        self.requested_attributes
            .iter()
            .filter(|(_, f)| !f.value.is_empty())
            .map(|(r, f)| (r.as_str(), f.value.as_str()))
            .collect()
    }
}

/// Builder for [`ProofRequest`].
#[derive(Debug, Clone)]
pub struct ProofRequestBuilder {
    request: ProofRequest,
}

impl ProofRequestBuilder {
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.request.version = version.into();
        self
    }

    pub fn attribute(mut self, referent: impl Into<String>, field: CredentialFieldReference) -> Self {
        self.request.requested_attributes.insert(referent.into(), field);
        self
    }

    pub fn predicate(
        mut self,
        referent: impl Into<String>,
        predicate: CredentialPredicateReference,
    ) -> Self {
        self.request.requested_predicates.insert(referent.into(), predicate);
        self
    }

    pub fn non_revoked(mut self, interval: Interval) -> Self {
        self.request.non_revoked = Some(interval);
        self
    }

    pub fn build(self) -> ProofRequest {
        self.request
    }
}

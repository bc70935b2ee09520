//! # Identifier Newtypes
//!
//! Validated newtypes for every identifier that crosses the ledger or the
//! wire. You cannot pass a `SchemaId` where a `CredentialDefinitionId` is
//! expected, and none of them can be constructed from a malformed string.
//!
//! ## Wire format
//!
//! | Type | Canonical string |
//! |---|---|
//! | [`Did`] | `did:<method>:<identifier>` |
//! | [`SchemaId`] | `{did}:2:{name}:{version}` |
//! | [`CredentialDefinitionId`] | `{did}:3:CL:{seqNo}:{tag}` |
//! | [`RevocationRegistryId`] | `{did}:4:{credDefId}:CL_ACCUM:{tag}` |
//!
//! All of them serialize as their canonical string and validate on
//! deserialization.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

const SCHEMA_MARKER: &str = "2";
const CRED_DEF_MARKER: &str = "3";
const REV_REG_MARKER: &str = "4";
const SIGNATURE_TYPE_CL: &str = "CL";
const REGISTRY_TYPE_CL_ACCUM: &str = "CL_ACCUM";

/// A decentralized identifier: `did:<method>:<identifier>`.
///
/// The method is lowercase alphanumeric. The method-specific identifier is
/// non-empty and restricted to `[A-Za-z0-9._-]`, so a DID is always exactly
/// three colon-separated segments and composite ids stay unambiguous.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Did(String);

impl Did {
    /// Validate and wrap a DID string.
    pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
        let s = s.into();
        let mut parts = s.split(':');
        let valid = matches!(
            (parts.next(), parts.next(), parts.next(), parts.next()),
            (Some("did"), Some(method), Some(id), None)
                if !method.is_empty()
                    && method.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
                    && !id.is_empty()
                    && id.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        );
        if valid {
            Ok(Self(s))
        } else {
            Err(ValidationError::InvalidDid(s))
        }
    }

    /// The DID method, e.g. `sov`.
    pub fn method(&self) -> &str {
        self.0.split(':').nth(1).unwrap_or_default()
    }

    /// The method-specific identifier.
    pub fn method_specific_id(&self) -> &str {
        self.0.split(':').nth(2).unwrap_or_default()
    }

    /// Access the DID string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Did {
    type Error = ValidationError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Did> for String {
    fn from(d: Did) -> Self {
        d.0
    }
}

fn check_segment(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || value.contains(':') {
        return Err(ValidationError::InvalidSegment {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

// ── Schema id ───────────────────────────────────────────────────────

/// Identifier of a schema: issuer DID, name, and version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SchemaId {
    issuer: Did,
    name: String,
    version: String,
}

impl SchemaId {
    /// Build a schema id from its components.
    pub fn new(
        issuer: Did,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        let version = version.into();
        check_segment("schema name", &name)?;
        check_segment("schema version", &version)?;
        Ok(Self {
            issuer,
            name,
            version,
        })
    }

    /// Parse the canonical `{did}:2:{name}:{version}` form.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidSchemaId(s.to_string());
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 6 || parts[3] != SCHEMA_MARKER {
            return Err(invalid());
        }
        let issuer = Did::new(parts[..3].join(":")).map_err(|_| invalid())?;
        Self::new(issuer, parts[4], parts[5]).map_err(|_| invalid())
    }

    /// The DID that published the schema.
    pub fn issuer(&self) -> &Did {
        &self.issuer
    }

    /// Schema name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schema version.
    pub fn version(&self) -> &str {
        &self.version
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{SCHEMA_MARKER}:{}:{}",
            self.issuer, self.name, self.version
        )
    }
}

impl TryFrom<String> for SchemaId {
    type Error = ValidationError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<SchemaId> for String {
    fn from(id: SchemaId) -> Self {
        id.to_string()
    }
}

// ── Credential definition id ────────────────────────────────────────

/// Identifier of a credential definition: issuer DID, the ledger sequence
/// number of its schema, and a tag.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CredentialDefinitionId {
    issuer: Did,
    schema_seq_no: u64,
    tag: String,
}

impl CredentialDefinitionId {
    /// Build a credential definition id from its components.
    pub fn new(
        issuer: Did,
        schema_seq_no: u64,
        tag: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let tag = tag.into();
        check_segment("credential definition tag", &tag)?;
        Ok(Self {
            issuer,
            schema_seq_no,
            tag,
        })
    }

    /// Parse the canonical `{did}:3:CL:{seqNo}:{tag}` form.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidCredentialDefinitionId(s.to_string());
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 7 || parts[3] != CRED_DEF_MARKER || parts[4] != SIGNATURE_TYPE_CL {
            return Err(invalid());
        }
        let issuer = Did::new(parts[..3].join(":")).map_err(|_| invalid())?;
        let seq_no = parts[5].parse::<u64>().map_err(|_| invalid())?;
        Self::new(issuer, seq_no, parts[6]).map_err(|_| invalid())
    }

    /// The DID that published the definition.
    pub fn issuer(&self) -> &Did {
        &self.issuer
    }

    /// Ledger sequence number of the referenced schema.
    pub fn schema_seq_no(&self) -> u64 {
        self.schema_seq_no
    }

    /// Definition tag.
    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl fmt::Display for CredentialDefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{CRED_DEF_MARKER}:{SIGNATURE_TYPE_CL}:{}:{}",
            self.issuer, self.schema_seq_no, self.tag
        )
    }
}

impl TryFrom<String> for CredentialDefinitionId {
    type Error = ValidationError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<CredentialDefinitionId> for String {
    fn from(id: CredentialDefinitionId) -> Self {
        id.to_string()
    }
}

// ── Revocation registry id ──────────────────────────────────────────

/// Identifier of a revocation registry: issuer DID, the credential
/// definition it serves, and a tag.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RevocationRegistryId {
    issuer: Did,
    cred_def_id: CredentialDefinitionId,
    tag: String,
}

impl RevocationRegistryId {
    /// Build a revocation registry id from its components.
    pub fn new(
        issuer: Did,
        cred_def_id: CredentialDefinitionId,
        tag: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let tag = tag.into();
        check_segment("revocation registry tag", &tag)?;
        Ok(Self {
            issuer,
            cred_def_id,
            tag,
        })
    }

    /// Parse the canonical `{did}:4:{credDefId}:CL_ACCUM:{tag}` form.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidRevocationRegistryId(s.to_string());
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 13 || parts[3] != REV_REG_MARKER || parts[11] != REGISTRY_TYPE_CL_ACCUM {
            return Err(invalid());
        }
        let issuer = Did::new(parts[..3].join(":")).map_err(|_| invalid())?;
        let cred_def_id =
            CredentialDefinitionId::parse(&parts[4..11].join(":")).map_err(|_| invalid())?;
        Self::new(issuer, cred_def_id, parts[12]).map_err(|_| invalid())
    }

    /// The DID that published the registry.
    pub fn issuer(&self) -> &Did {
        &self.issuer
    }

    /// The credential definition this registry serves.
    pub fn cred_def_id(&self) -> &CredentialDefinitionId {
        &self.cred_def_id
    }

    /// Registry tag.
    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl fmt::Display for RevocationRegistryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{REV_REG_MARKER}:{}:{REGISTRY_TYPE_CL_ACCUM}:{}",
            self.issuer, self.cred_def_id, self.tag
        )
    }
}

impl TryFrom<String> for RevocationRegistryId {
    type Error = ValidationError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<RevocationRegistryId> for String {
    fn from(id: RevocationRegistryId) -> Self {
        id.to_string()
    }
}

// ── Wallet-local ids ────────────────────────────────────────────────

/// Wallet-local identifier of a stored credential.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialId(String);

impl CredentialId {
    /// Generate a new random credential identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an existing identifier.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Access the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CredentialId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Ledger identities ───────────────────────────────────────────────

/// Ledger role attached to a NYM record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerRole {
    /// Full administrative rights, including granting roles.
    Trustee,
    /// Node operator; may grant roles and write artifacts.
    Steward,
    /// May write artifacts but not grant roles.
    Endorser,
}

impl LedgerRole {
    /// Whether this role may write schemas, definitions, and registry entries.
    pub fn can_write(&self) -> bool {
        true
    }

    /// Whether this role may write NYM records granting roles to others.
    pub fn can_grant(&self) -> bool {
        matches!(self, Self::Trustee | Self::Steward)
    }

    /// Stable name as written on the ledger.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trustee => "TRUSTEE",
            Self::Steward => "STEWARD",
            Self::Endorser => "ENDORSER",
        }
    }
}

impl fmt::Display for LedgerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A NYM record as read from the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityDetails {
    /// The identity's DID.
    pub did: Did,
    /// Hex-encoded Ed25519 verification key.
    pub verkey: String,
    /// Ledger role, if any. `None` means an ordinary identity that can
    /// read but not write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<LedgerRole>,
    /// Human-readable alias.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl IdentityDetails {
    /// Whether this identity may write artifacts to the ledger.
    pub fn can_write(&self) -> bool {
        self.role.map(|r| r.can_write()).unwrap_or(false)
    }
}

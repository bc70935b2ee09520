//! # Ledger Transport
//!
//! The wire boundary to a ledger: signed writes and unsigned reads. Every
//! write carries the submitter's DID and an Ed25519 signature over the
//! canonical bytes of `{submitter, request}`; the ledger checks it against
//! the submitter's NYM verkey.

use serde::{Deserialize, Serialize};
use zkcred_core::{
    CanonicalBytes, CredentialDefinition, CredentialDefinitionId, Did, IdentityDetails,
    RevocationRegistryDefinition, RevocationRegistryDelta, RevocationRegistryEntry,
    RevocationRegistryId, Schema, SchemaId, Timestamp,
};
use zkcred_crypto::{Ed25519KeyPair, Ed25519Signature};

use crate::error::LedgerError;

/// A ledger write transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "txn", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WriteRequest {
    Nym(IdentityDetails),
    Schema(Schema),
    CredDef(CredentialDefinition),
    RevRegDef(RevocationRegistryDefinition),
    RevRegEntry {
        registry: RevocationRegistryId,
        delta: RevocationRegistryDelta,
    },
}

impl WriteRequest {
    /// Short label for logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Nym(_) => "NYM",
            Self::Schema(_) => "SCHEMA",
            Self::CredDef(_) => "CRED_DEF",
            Self::RevRegDef(_) => "REV_REG_DEF",
            Self::RevRegEntry { .. } => "REV_REG_ENTRY",
        }
    }
}

/// A ledger read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "query", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReadRequest {
    GetNym(Did),
    GetSchema(SchemaId),
    GetCredDef(CredentialDefinitionId),
    GetRevRegDef(RevocationRegistryId),
    /// Entries of one registry in append order, optionally only those at
    /// or before `to`.
    GetRevRegEntries {
        registry: RevocationRegistryId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<Timestamp>,
    },
}

impl ReadRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GetNym(_) => "GET_NYM",
            Self::GetSchema(_) => "GET_SCHEMA",
            Self::GetCredDef(_) => "GET_CRED_DEF",
            Self::GetRevRegDef(_) => "GET_REV_REG_DEF",
            Self::GetRevRegEntries { .. } => "GET_REV_REG_ENTRIES",
        }
    }
}

/// A ledger's answer to a read or write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", content = "data", rename_all = "camelCase")]
pub enum LedgerResponse {
    /// A write was accepted as transaction `seq_no` at `timestamp`.
    #[serde(rename_all = "camelCase")]
    Written { seq_no: u64, timestamp: Timestamp },
    Nym(Option<IdentityDetails>),
    Schema(Option<Schema>),
    CredDef(Option<CredentialDefinition>),
    RevRegDef(Option<RevocationRegistryDefinition>),
    RevRegEntries(Vec<RevocationRegistryEntry>),
}

impl LedgerResponse {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Written { .. } => "written",
            Self::Nym(_) => "nym",
            Self::Schema(_) => "schema",
            Self::CredDef(_) => "credDef",
            Self::RevRegDef(_) => "revRegDef",
            Self::RevRegEntries(_) => "revRegEntries",
        }
    }
}

#[derive(Serialize)]
struct SigningPayload<'a> {
    submitter: &'a Did,
    request: &'a WriteRequest,
}

/// A write request signed by its submitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedWrite {
    pub submitter: Did,
    pub request: WriteRequest,
    pub signature: Ed25519Signature,
}

impl SignedWrite {
    /// Sign `request` as `submitter`.
    pub fn sign(
        submitter: Did,
        key: &Ed25519KeyPair,
        request: WriteRequest,
    ) -> Result<Self, LedgerError> {
        let signature = key.sign(&Self::signing_bytes(&submitter, &request)?);
        Ok(Self {
            submitter,
            request,
            signature,
        })
    }

    /// The bytes a write signature covers.
    pub fn signing_bytes(
        submitter: &Did,
        request: &WriteRequest,
    ) -> Result<CanonicalBytes, LedgerError> {
        Ok(CanonicalBytes::new(&SigningPayload { submitter, request })?)
    }
}

/// Submit and query against a ledger.
///
/// Implementations are synchronous; an implementation backed by a network
/// pool blocks the calling thread for the round trip.
pub trait LedgerTransport: Send + Sync {
    fn submit(&self, write: SignedWrite) -> Result<LedgerResponse, LedgerError>;

    fn query(&self, read: ReadRequest) -> Result<LedgerResponse, LedgerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_request_wire_shape() {
        let did = Did::new("did:sov:abc").unwrap();
        let json = serde_json::to_value(ReadRequest::GetNym(did)).unwrap();
        assert_eq!(json["query"], "GET_NYM");
        assert_eq!(json["data"], "did:sov:abc");
    }

    #[test]
    fn signature_covers_submitter() {
        let key = Ed25519KeyPair::from_seed(&[7u8; 32]);
        let a = Did::new("did:sov:aaa").unwrap();
        let b = Did::new("did:sov:bbb").unwrap();
        let req = WriteRequest::Nym(IdentityDetails {
            did: b.clone(),
            verkey: key.public_key().to_hex(),
            role: None,
            alias: None,
        });
        let signed = SignedWrite::sign(a.clone(), &key, req.clone()).unwrap();
        let data_b = SignedWrite::signing_bytes(&b, &req).unwrap();
        assert!(zkcred_crypto::verify(&data_b, &signed.signature, &key.public_key()).is_err());
        let data_a = SignedWrite::signing_bytes(&a, &req).unwrap();
        assert!(zkcred_crypto::verify(&data_a, &signed.signature, &key.public_key()).is_ok());
    }
}

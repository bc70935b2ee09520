//! Credential selection for proof requests.
//!
//! For each referent the first candidate in enumeration order that
//! satisfies it wins: restrictions plus the requested value for
//! attributes, restrictions plus the comparison for predicates. A referent
//! with no satisfying candidate fails the whole selection.

use std::collections::BTreeMap;

use zkcred_core::{HeldCredential, ProofRequest, ZkcredError};
use zkcred_zkp::CredentialsForProofRequest;

/// One credential per referent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub attrs: BTreeMap<String, HeldCredential>,
    pub predicates: BTreeMap<String, HeldCredential>,
}

impl Selection {
    /// Every selected credential, each once, keyed by credential id.
    pub fn distinct(&self) -> BTreeMap<&str, &HeldCredential> {
        self.attrs
            .values()
            .chain(self.predicates.values())
            .map(|c| (c.id.as_str(), c))
            .collect()
    }
}

/// Pick a credential for every referent of `request`.
pub fn select_credentials(
    request: &ProofRequest,
    candidates: &CredentialsForProofRequest,
) -> Result<Selection, ZkcredError> {
    let mut selection = Selection::default();
    for (referent, field) in &request.requested_attributes {
        let chosen = candidates
            .attrs
            .get(referent)
            .and_then(|list| list.iter().find(|c| field.is_satisfied_by(c)))
            .ok_or_else(|| no_match(referent))?;
        selection.attrs.insert(referent.clone(), chosen.clone());
    }
    for (referent, predicate) in &request.requested_predicates {
        let chosen = candidates
            .predicates
            .get(referent)
            .and_then(|list| list.iter().find(|c| predicate.is_satisfied_by(c)))
            .ok_or_else(|| no_match(referent))?;
        selection.predicates.insert(referent.clone(), chosen.clone());
    }
    Ok(selection)
}

fn no_match(referent: &str) -> ZkcredError {
    tracing::debug!(referent, "no candidate satisfies referent");
    ZkcredError::NoMatchingCredential {
        referent: referent.to_string(),
    }
}

//! DID derivation from verification keys.
//!
//! A key-derived DID takes the first 16 bytes of the verkey as its
//! method-specific identifier, hex encoded. The ledger checks writes
//! against the verkey in the NYM record, not against this derivation, so a
//! DID can still rotate its key after registration.

use zkcred_core::{Did, ValidationError};

use crate::ed25519::{to_hex, Ed25519PublicKey};

/// DID method used for identities this system creates.
pub const DEFAULT_DID_METHOD: &str = "sov";

/// The DID `did:<method>:<hex(verkey[..16])>`.
pub fn did_for_key(method: &str, key: &Ed25519PublicKey) -> Result<Did, ValidationError> {
    Did::new(format!("did:{method}:{}", to_hex(&key.as_bytes()[..16])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Ed25519KeyPair;

    #[test]
    fn derived_did_uses_key_prefix() {
        let kp = Ed25519KeyPair::from_seed(&[3u8; 32]);
        let did = did_for_key(DEFAULT_DID_METHOD, &kp.public_key()).unwrap();
        assert_eq!(did.method(), "sov");
        assert_eq!(did.method_specific_id().len(), 32);
        assert!(kp.public_key().to_hex().starts_with(did.method_specific_id()));
    }

    #[test]
    fn distinct_keys_give_distinct_dids() {
        let a = did_for_key("sov", &Ed25519KeyPair::generate().public_key()).unwrap();
        let b = did_for_key("sov", &Ed25519KeyPair::generate().public_key()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn invalid_method_is_rejected() {
        let pk = Ed25519KeyPair::generate().public_key();
        assert!(did_for_key("Bad:Method", &pk).is_err());
    }
}

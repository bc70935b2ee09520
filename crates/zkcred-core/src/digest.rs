//! # Content Digests
//!
//! SHA-256 digests over [`CanonicalBytes`]. Used for accumulator values,
//! credential value commitments, tails hashes, and ledger transaction ids.
//!
//! `sha256_digest()` accepts only `&CanonicalBytes`, so every digest in the
//! system is computed over the same canonical form of an artifact.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;

/// A 32-byte SHA-256 digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest(pub [u8; 32]);

impl ContentDigest {
    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Decimal rendering of the digest read as a big-endian unsigned integer.
    ///
    /// This is the form attribute encodings and accumulator values take on
    /// the wire.
    pub fn to_decimal(&self) -> String {
        be_bytes_to_decimal(&self.0)
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sha256:{}", self.to_hex())
    }
}

/// SHA-256 over canonical bytes.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    sha256_raw(data.as_bytes())
}

/// Hex form of [`sha256_digest()`].
pub fn sha256_hex(data: &CanonicalBytes) -> String {
    sha256_digest(data).to_hex()
}

/// SHA-256 over raw bytes.
///
/// Restricted to the crate: attribute encoding hashes the raw UTF-8 value
/// (not a JSON rendering of it) to stay compatible with existing ledger
/// content.
pub(crate) fn sha256_raw(bytes: &[u8]) -> ContentDigest {
    let hash = Sha256::digest(bytes);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hash);
    ContentDigest(out)
}

/// Render big-endian bytes as a base-10 integer string.
pub(crate) fn be_bytes_to_decimal(bytes: &[u8]) -> String {
    BigUint::from_bytes_be(bytes).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_sha256_vector_for_empty_object() {
        let cb = CanonicalBytes::new(&serde_json::json!({})).unwrap();
        assert_eq!(
            sha256_hex(&cb),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }

    #[test]
    fn display_is_prefixed() {
        let d = sha256_digest(&CanonicalBytes::new(&"x").unwrap());
        let s = d.to_string();
        assert!(s.starts_with("sha256:"));
        assert_eq!(s.len(), 7 + 64);
    }

    #[test]
    fn decimal_of_small_values() {
        assert_eq!(be_bytes_to_decimal(&[]), "0");
        assert_eq!(be_bytes_to_decimal(&[0, 0]), "0");
        assert_eq!(be_bytes_to_decimal(&[0x01, 0x00]), "256");
        assert_eq!(be_bytes_to_decimal(&[0xff, 0xff, 0xff, 0xff]), "4294967295");
        assert_eq!(
            be_bytes_to_decimal(&[0xff; 16]),
            u128::MAX.to_string()
        );
    }

    #[test]
    fn decimal_matches_u128_for_sixteen_bytes() {
        let bytes: [u8; 16] = [
            0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde, 0xf0, 0x0f, 0xed, 0xcb, 0xa9, 0x87, 0x65,
            0x43, 0x21,
        ];
        assert_eq!(
            be_bytes_to_decimal(&bytes),
            u128::from_be_bytes(bytes).to_string()
        );
    }
}

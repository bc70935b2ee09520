//! # Attribute Encoding
//!
//! Every credential attribute carries a `raw` string and an `encoded`
//! integer rendering that the signature scheme operates on. Values that
//! parse as 32-bit signed integers encode to themselves, which is what
//! makes `>=` predicates over them possible. Everything else encodes to
//! the decimal form of the big-endian SHA-256 of its UTF-8 bytes.
//!
//! The rule matches the encoding already present on existing ledgers, so
//! credentials issued here verify elsewhere and vice versa.

use crate::digest::sha256_raw;

/// Encode a raw attribute value.
pub fn encode_attribute_value(raw: &str) -> String {
    match raw.parse::<i32>() {
        Ok(n) => n.to_string(),
        Err(_) => sha256_raw(raw.as_bytes()).to_decimal(),
    }
}

/// The integer an encoded value stands for, if it is in predicate range.
pub fn encoded_as_i32(encoded: &str) -> Option<i32> {
    encoded.parse::<i32>().ok()
}

/// Whether `encoded` is the encoding of `raw`.
pub fn is_encoding_of(raw: &str, encoded: &str) -> bool {
    encode_attribute_value(raw) == encoded
}

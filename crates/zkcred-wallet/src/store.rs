//! # Wallet Store
//!
//! The holder's local key-value persistence. Values are JSON records;
//! keys are namespaced strings such as `pairwise:<did>`. Key material is
//! never written here.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;
use zkcred_core::ZkcredError;

/// A wallet store operation failed.
#[derive(Error, Debug)]
pub enum WalletStoreError {
    #[error("wallet backend failure: {0}")]
    Backend(String),

    #[error("record {key} is malformed: {reason}")]
    Malformed { key: String, reason: String },
}

impl From<WalletStoreError> for ZkcredError {
    fn from(err: WalletStoreError) -> Self {
        ZkcredError::Wallet(err.to_string())
    }
}

/// Key-value persistence owned by one holder.
pub trait WalletStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, WalletStoreError>;

    fn put(&self, key: &str, value: Value) -> Result<(), WalletStoreError>;

    /// Insert `value` unless `key` is present. Returns the value stored
    /// under `key` afterwards, which is the existing one if there was one.
    fn put_if_absent(&self, key: &str, value: Value) -> Result<Value, WalletStoreError>;

    /// Returns whether a record was removed.
    fn delete(&self, key: &str) -> Result<bool, WalletStoreError>;

    /// Keys starting with `prefix`, in lexicographic order.
    fn keys(&self, prefix: &str) -> Result<Vec<String>, WalletStoreError>;
}

/// In-memory [`WalletStore`].
#[derive(Debug, Default)]
pub struct InMemoryWalletStore {
    records: RwLock<BTreeMap<String, Value>>,
}

impl InMemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl WalletStore for InMemoryWalletStore {
    fn get(&self, key: &str) -> Result<Option<Value>, WalletStoreError> {
        Ok(self.records.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: Value) -> Result<(), WalletStoreError> {
        self.records.write().insert(key.to_string(), value);
        Ok(())
    }

    fn put_if_absent(&self, key: &str, value: Value) -> Result<Value, WalletStoreError> {
        Ok(self
            .records
            .write()
            .entry(key.to_string())
            .or_insert(value)
            .clone())
    }

    fn delete(&self, key: &str) -> Result<bool, WalletStoreError> {
        Ok(self.records.write().remove(key).is_some())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, WalletStoreError> {
        Ok(self
            .records
            .read()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn put_if_absent_keeps_first_value() {
        let store = InMemoryWalletStore::new();
        assert_eq!(store.put_if_absent("k", json!(1)).unwrap(), json!(1));
        assert_eq!(store.put_if_absent("k", json!(2)).unwrap(), json!(1));
        store.put("k", json!(3)).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(json!(3)));
    }

    #[test]
    fn keys_filter_by_prefix() {
        let store = InMemoryWalletStore::new();
        for k in ["pairwise:b", "pairwise:a", "other:x", "pairwisf"] {
            store.put(k, json!(null)).unwrap();
        }
        assert_eq!(store.keys("pairwise:").unwrap(), ["pairwise:a", "pairwise:b"]);
        assert!(store.delete("other:x").unwrap());
        assert!(!store.delete("other:x").unwrap());
        assert_eq!(store.len(), 3);
    }
}

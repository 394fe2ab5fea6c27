//! In-memory key-value store
//!
//! Used by tests and as the working set behind the file-backed store.

use super::kv::{KvStore, Namespace, StorageError, StoreKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MemoryStore {
    namespaces: BTreeMap<Namespace, BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in a namespace
    pub fn len(&self, namespace: Namespace) -> usize {
        self.namespaces.get(&namespace).map_or(0, |ns| ns.len())
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.values().all(|ns| ns.is_empty())
    }

    pub(crate) fn entries(&self) -> &BTreeMap<Namespace, BTreeMap<String, Vec<u8>>> {
        &self.namespaces
    }

    pub(crate) fn insert_raw(&mut self, namespace: Namespace, key: String, value: Vec<u8>) {
        self.namespaces
            .entry(namespace)
            .or_default()
            .insert(key, value);
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &StoreKey) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self
            .namespaces
            .get(&key.namespace)
            .and_then(|ns| ns.get(&key.key))
            .cloned())
    }

    fn set(&mut self, key: &StoreKey, value: Vec<u8>) -> Result<(), StorageError> {
        self.insert_raw(key.namespace, key.key.clone(), value);
        Ok(())
    }

    fn has(&self, key: &StoreKey) -> Result<bool, StorageError> {
        Ok(self
            .namespaces
            .get(&key.namespace)
            .is_some_and(|ns| ns.contains_key(&key.key)))
    }

    fn delete(&mut self, key: &StoreKey) -> Result<(), StorageError> {
        if let Some(ns) = self.namespaces.get_mut(&key.namespace) {
            ns.remove(&key.key);
        }
        Ok(())
    }

    fn scan(&self, namespace: Namespace) -> Result<Vec<(String, Vec<u8>)>, StorageError> {
        Ok(self
            .namespaces
            .get(&namespace)
            .map(|ns| ns.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }
}

//! Key-value store port
//!
//! The keeper persists wallets and transactions through this trait. Keys are
//! two-segment (namespace, entity key); a scan covers exactly one namespace.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Entity namespaces sharing one store
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    Wallet,
    Transaction,
}

impl Namespace {
    /// Tag used when rendering a flat key (`wallet-<address>`)
    pub fn tag(&self) -> &'static str {
        match self {
            Namespace::Wallet => "wallet",
            Namespace::Transaction => "transaction",
        }
    }
}

/// A namespaced store key
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StoreKey {
    pub namespace: Namespace,
    pub key: String,
}

impl StoreKey {
    pub fn new(namespace: Namespace, key: impl Into<String>) -> Self {
        Self {
            namespace,
            key: key.into(),
        }
    }

    pub fn wallet(address: &str) -> Self {
        Self::new(Namespace::Wallet, address)
    }

    pub fn transaction(id: impl fmt::Display) -> Self {
        Self::new(Namespace::Transaction, id.to_string())
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.namespace.tag(), self.key)
    }
}

/// Synchronous key-value store supplied by the host.
///
/// Every call either completes or fails outright; there are no partial writes.
pub trait KvStore {
    /// Get a value by key
    fn get(&self, key: &StoreKey) -> Result<Option<Vec<u8>>, StorageError>;

    /// Insert or overwrite a value
    fn set(&mut self, key: &StoreKey, value: Vec<u8>) -> Result<(), StorageError>;

    /// Check if a key exists
    fn has(&self, key: &StoreKey) -> Result<bool, StorageError> {
        Ok(self.get(key)?.is_some())
    }

    /// Delete a key (no-op when absent)
    fn delete(&mut self, key: &StoreKey) -> Result<(), StorageError>;

    /// All (entity key, value) pairs of one namespace, in key order
    fn scan(&self, namespace: Namespace) -> Result<Vec<(String, Vec<u8>)>, StorageError>;
}

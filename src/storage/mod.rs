//! Storage module: the key-value port and its adapters

pub mod kv;
pub mod memory;
pub mod persistence;

pub use kv::{KvStore, Namespace, StorageError, StoreKey};
pub use memory::MemoryStore;
pub use persistence::{FileStore, StorageConfig};

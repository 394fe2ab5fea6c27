//! Threshold Keeper: k-of-n wallets and aggregated threshold signatures
//!
//! This crate provides:
//! - Threshold wallets with canonical key ordering and derived addresses
//! - A transaction ledger tracking signature collection and completion
//! - A codec packing any subset of signer slots into one aggregated signature
//! - Command handlers and a read-only query surface
//! - A namespaced key-value storage port with memory and file adapters
//!
//! # Example
//!
//! ```rust
//! use threshold_keeper::handler::{handle, Command};
//! use threshold_keeper::multisig::{Coin, Keeper, KeeperConfig};
//! use threshold_keeper::storage::MemoryStore;
//!
//! let mut keeper = Keeper::new(MemoryStore::new(), KeeperConfig::default());
//! let keys = vec!["pk-a".to_string(), "pk-b".to_string(), "pk-c".to_string()];
//! let wallet = keeper.create_wallet("treasury", keys, 2).unwrap();
//!
//! let command = Command::create_transaction(&wallet.address, "recipient", Coin::new(10, "stake"));
//! handle(&mut keeper, 1, command).unwrap();
//! assert_eq!(keeper.list_transactions_by_from(&wallet.address).unwrap().len(), 1);
//! ```

pub mod cli;
pub mod codec;
pub mod crypto;
pub mod handler;
pub mod multisig;
pub mod query;
pub mod storage;

// Re-export commonly used types
pub use codec::{aggregate, AggregatedSignature, CodecError, ParticipationMask};
pub use crypto::AddressPolicy;
pub use handler::{handle, Command, CommandOutcome};
pub use multisig::{
    Coin, ErrorKind, Keeper, KeeperConfig, MultisigError, Signature, Transaction,
    TransactionStatus, Wallet,
};
pub use query::{Query, QueryResponse};
pub use storage::{FileStore, KvStore, MemoryStore, Namespace, StorageConfig, StoreKey};

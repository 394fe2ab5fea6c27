//! Threshold (k-of-n) wallets and their pending transactions
//!
//! # Example
//!
//! ```ignore
//! use threshold_keeper::multisig::{Coin, Keeper, KeeperConfig, Signature};
//! use threshold_keeper::storage::MemoryStore;
//!
//! let mut keeper = Keeper::new(MemoryStore::new(), KeeperConfig::default());
//!
//! // Create a 2-of-3 wallet
//! let wallet = keeper.create_wallet("treasury", vec![pk1, pk2, pk3], 2)?;
//!
//! // Open a transfer at block 120 and collect signatures
//! let tx = keeper.create_transaction(id, &wallet.address, recipient, "100stake".parse()?, 120)?;
//! keeper.add_signature(&tx.id, &pk1, Signature::new(&sig1, None))?;
//! keeper.add_signature(&tx.id, &pk3, Signature::new(&sig3, None))?;
//!
//! // Token for the host ledger
//! let token = keeper.aggregate_signature(&tx.id)?;
//! ```

pub mod error;
pub mod keeper;
pub mod transaction;
pub mod wallet;

pub use error::{ErrorKind, MultisigError};
pub use keeper::{Keeper, KeeperConfig, DEFAULT_MAX_TRANSACTION_AGE};
pub use transaction::{Coin, Signature, SignatureSlot, Transaction, TransactionStatus};
pub use wallet::{Wallet, WalletConfig};

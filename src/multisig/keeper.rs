//! Wallet registry and transaction ledger over a key-value store
//!
//! Every record is a single JSON blob under `(namespace, key)`; listings scan
//! one namespace and filter in memory.

use crate::crypto::AddressPolicy;
use crate::multisig::error::MultisigError;
use crate::multisig::transaction::{Coin, Signature, Transaction};
use crate::multisig::wallet::{Wallet, WalletConfig};
use crate::storage::{KvStore, Namespace, StorageError, StoreKey};
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

/// Default staleness window in blocks
pub const DEFAULT_MAX_TRANSACTION_AGE: u64 = 100_000;

/// Keeper configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeeperConfig {
    /// How wallet addresses are derived
    pub address_policy: AddressPolicy,
    /// Blocks a transaction may live before the sweep purges it
    pub max_transaction_age: u64,
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            address_policy: AddressPolicy::default(),
            max_transaction_age: DEFAULT_MAX_TRANSACTION_AGE,
        }
    }
}

/// Owns wallet and transaction records
#[derive(Debug)]
pub struct Keeper<S: KvStore> {
    store: S,
    config: KeeperConfig,
}

impl<S: KvStore> Keeper<S> {
    pub fn new(store: S, config: KeeperConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &KeeperConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    // ========================================================================
    // Wallets
    // ========================================================================

    /// Validate a key set and derive its address without registering it
    pub fn preview_wallet(
        &self,
        name: &str,
        public_keys: Vec<String>,
        min_signatures: u8,
    ) -> Result<Wallet, MultisigError> {
        let config = WalletConfig::new(name, public_keys, min_signatures)?;
        Wallet::new(config, self.config.address_policy)
    }

    /// Register a new wallet
    pub fn create_wallet(
        &mut self,
        name: &str,
        public_keys: Vec<String>,
        min_signatures: u8,
    ) -> Result<Wallet, MultisigError> {
        let wallet = self.preview_wallet(name, public_keys, min_signatures)?;

        let key = StoreKey::wallet(&wallet.address);
        if self.store.has(&key)? {
            return Err(MultisigError::DuplicateWallet(wallet.address));
        }
        self.save(&key, &wallet)?;

        info!(
            "Created {} wallet '{}' at {}",
            wallet.description(),
            wallet.name,
            wallet.address
        );
        Ok(wallet)
    }

    /// Get a wallet by address
    pub fn get_wallet(&self, address: &str) -> Result<Wallet, MultisigError> {
        self.load(&StoreKey::wallet(address))?
            .ok_or_else(|| MultisigError::WalletNotFound(address.to_string()))
    }

    /// List all wallets, ordered by address
    pub fn list_wallets(&self) -> Result<Vec<Wallet>, MultisigError> {
        self.scan(Namespace::Wallet)
    }

    /// Wallets that include `public_key` among their signers
    pub fn list_wallets_by_public_key(
        &self,
        public_key: &str,
    ) -> Result<Vec<Wallet>, MultisigError> {
        Ok(self
            .list_wallets()?
            .into_iter()
            .filter(|w| w.is_signer(public_key))
            .collect())
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Open a transaction against an existing wallet at block `height`
    pub fn create_transaction(
        &mut self,
        id: Uuid,
        from: &str,
        to: &str,
        amount: Coin,
        height: u64,
    ) -> Result<Transaction, MultisigError> {
        if to.trim().is_empty() {
            return Err(MultisigError::invalid("recipient address cannot be empty"));
        }
        amount.validate()?;

        let wallet = self.get_wallet(from)?;
        let key = StoreKey::transaction(id);
        if self.store.has(&key)? {
            return Err(MultisigError::DuplicateTransaction(id.to_string()));
        }

        let tx = Transaction::new(id, &wallet, to, amount, height);
        self.save(&key, &tx)?;

        info!(
            "Created transaction {} from {} ({} signature(s) required)",
            tx.id,
            tx.from,
            tx.min_signatures
        );
        Ok(tx)
    }

    /// Get a transaction by id
    pub fn get_transaction(&self, id: &Uuid) -> Result<Transaction, MultisigError> {
        self.load(&StoreKey::transaction(id))?
            .ok_or_else(|| MultisigError::TransactionNotFound(id.to_string()))
    }

    /// Record `signature` from `pub_key`, replacing any earlier one
    pub fn add_signature(
        &mut self,
        id: &Uuid,
        pub_key: &str,
        signature: Signature,
    ) -> Result<Transaction, MultisigError> {
        let mut tx = self.get_transaction(id)?;
        let slot = tx.add_signature(pub_key, signature)?;
        self.save(&StoreKey::transaction(id), &tx)?;

        info!(
            "Signature for {} in slot {} ({}/{})",
            tx.id,
            slot,
            tx.signature_count(),
            tx.min_signatures
        );
        Ok(tx)
    }

    /// Attach the host ledger id; allowed once
    pub fn complete_transaction(
        &mut self,
        id: &Uuid,
        chain_tx_id: &str,
    ) -> Result<Transaction, MultisigError> {
        let mut tx = self.get_transaction(id)?;
        tx.complete(chain_tx_id)?;
        self.save(&StoreKey::transaction(id), &tx)?;

        info!("Completed transaction {} as {}", tx.id, chain_tx_id);
        Ok(tx)
    }

    /// List all transactions
    pub fn list_transactions(&self) -> Result<Vec<Transaction>, MultisigError> {
        self.scan(Namespace::Transaction)
    }

    /// Transactions drawn from wallet `address`
    pub fn list_transactions_by_from(
        &self,
        address: &str,
    ) -> Result<Vec<Transaction>, MultisigError> {
        Ok(self
            .list_transactions()?
            .into_iter()
            .filter(|tx| tx.from == address)
            .collect())
    }

    /// Delete every transaction older than `max_age` blocks, whatever its state
    pub fn cleanup_stale(
        &mut self,
        current_height: u64,
        max_age: u64,
    ) -> Result<usize, MultisigError> {
        let stale: Vec<Uuid> = self
            .list_transactions()?
            .into_iter()
            .filter(|tx| tx.is_stale(current_height, max_age))
            .map(|tx| tx.id)
            .collect();

        for id in &stale {
            self.store.delete(&StoreKey::transaction(id))?;
            debug!("Purged stale transaction {}", id);
        }

        if !stale.is_empty() {
            info!(
                "Removed {} stale transaction(s) at height {}",
                stale.len(),
                current_height
            );
        }
        Ok(stale.len())
    }

    /// [`cleanup_stale`](Self::cleanup_stale) with the configured window
    pub fn sweep(&mut self, current_height: u64) -> Result<usize, MultisigError> {
        self.cleanup_stale(current_height, self.config.max_transaction_age)
    }

    /// Aggregated-signature token for a transaction's collected signatures
    pub fn aggregate_signature(&self, id: &Uuid) -> Result<String, MultisigError> {
        let tx = self.get_transaction(id)?;
        let wallet = self.get_wallet(&tx.from)?;
        let token = tx.aggregate(&wallet)?.encode();

        debug!(
            "Aggregated {} signature(s) for {}",
            tx.signature_count(),
            tx.id
        );
        Ok(token)
    }

    // ========================================================================
    // Record helpers
    // ========================================================================

    fn load<T: DeserializeOwned>(&self, key: &StoreKey) -> Result<Option<T>, MultisigError> {
        match self.store.get(key)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|source| MultisigError::CorruptRecord {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    fn save<T: Serialize>(&mut self, key: &StoreKey, record: &T) -> Result<(), MultisigError> {
        let bytes = serde_json::to_vec(record).map_err(StorageError::from)?;
        self.store.set(key, bytes)?;
        Ok(())
    }

    fn scan<T: DeserializeOwned>(&self, namespace: Namespace) -> Result<Vec<T>, MultisigError> {
        self.store
            .scan(namespace)?
            .into_iter()
            .map(|(key, bytes)| {
                serde_json::from_slice(&bytes).map_err(|source| MultisigError::CorruptRecord {
                    key: StoreKey::new(namespace, &key).to_string(),
                    source,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{AggregatedSignature, CodecError};
    use crate::multisig::{ErrorKind, TransactionStatus};
    use crate::storage::MemoryStore;
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    fn keeper() -> Keeper<MemoryStore> {
        Keeper::new(MemoryStore::new(), KeeperConfig::default())
    }

    fn keys() -> Vec<String> {
        vec!["pk-b".to_string(), "pk-c".to_string(), "pk-a".to_string()]
    }

    fn sig(seed: u8) -> Signature {
        Signature::new(&STANDARD.encode([seed; 64]), None)
    }

    fn setup() -> (Keeper<MemoryStore>, Wallet, Transaction) {
        let mut keeper = keeper();
        let wallet = keeper.create_wallet("treasury", keys(), 2).unwrap();
        let tx = keeper
            .create_transaction(
                Uuid::new_v4(),
                &wallet.address,
                "recipient",
                Coin::new(100, "stake"),
                50,
            )
            .unwrap();
        (keeper, wallet, tx)
    }

    #[test]
    fn test_wallet_creation() {
        let mut keeper = keeper();
        let wallet = keeper.create_wallet("treasury", keys(), 2).unwrap();

        assert!(!wallet.address.is_empty());
        assert_eq!(wallet.public_keys, vec!["pk-a", "pk-b", "pk-c"]);
        assert_eq!(keeper.get_wallet(&wallet.address).unwrap(), wallet);
        assert_eq!(keeper.list_wallets().unwrap().len(), 1);
    }

    #[test]
    fn test_threshold_rejected_before_storage() {
        let mut keeper = keeper();
        for k in [0u8, 4] {
            let err = keeper.create_wallet("w", keys(), k).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
        assert!(keeper.list_wallets().unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_wallet() {
        let mut keeper = keeper();
        keeper.create_wallet("treasury", keys(), 2).unwrap();

        let mut reordered = keys();
        reordered.reverse();
        let err = keeper.create_wallet("other", reordered, 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        // A different threshold is a different wallet
        assert!(keeper.create_wallet("other", keys(), 3).is_ok());
    }

    #[test]
    fn test_name_digest_policy() {
        let config = KeeperConfig {
            address_policy: AddressPolicy::NameDigest,
            ..KeeperConfig::default()
        };
        let mut keeper = Keeper::new(MemoryStore::new(), config);

        let a = keeper.create_wallet("shared", keys(), 2).unwrap();
        assert!(a.address.starts_with('1'));
        let err = keeper
            .create_wallet("shared", vec!["other".to_string()], 1)
            .unwrap_err();
        assert!(matches!(err, MultisigError::DuplicateWallet(_)));
    }

    #[test]
    fn test_preview_does_not_persist() {
        let keeper = keeper();
        let wallet = keeper.preview_wallet("p", keys(), 2).unwrap();
        assert!(matches!(
            keeper.get_wallet(&wallet.address),
            Err(MultisigError::WalletNotFound(_))
        ));
    }

    #[test]
    fn test_list_wallets_by_public_key() {
        let mut keeper = keeper();
        keeper.create_wallet("one", keys(), 2).unwrap();
        keeper
            .create_wallet("two", vec!["pk-a".to_string(), "pk-z".to_string()], 1)
            .unwrap();

        assert_eq!(keeper.list_wallets_by_public_key("pk-a").unwrap().len(), 2);
        assert_eq!(keeper.list_wallets_by_public_key("pk-z").unwrap().len(), 1);
        assert!(keeper.list_wallets_by_public_key("pk-x").unwrap().is_empty());
    }

    #[test]
    fn test_create_transaction() {
        let (keeper, wallet, tx) = setup();

        assert_eq!(tx.signatures.len(), wallet.public_keys.len());
        assert!(tx.signatures.iter().all(|s| s.signature.is_none()));
        assert_eq!(tx.created_at_height, 50);
        assert_eq!(tx.min_signatures, 2);
        assert_eq!(keeper.get_transaction(&tx.id).unwrap(), tx);
    }

    #[test]
    fn test_create_transaction_errors() {
        let (mut keeper, wallet, tx) = setup();

        let err = keeper
            .create_transaction(tx.id, &wallet.address, "r", Coin::new(1, "stake"), 51)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err = keeper
            .create_transaction(Uuid::new_v4(), "3Unknown", "r", Coin::new(1, "stake"), 51)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = keeper
            .create_transaction(Uuid::new_v4(), &wallet.address, "r", Coin::new(0, "stake"), 51)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = keeper
            .create_transaction(Uuid::new_v4(), &wallet.address, "", Coin::new(1, "stake"), 51)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(keeper.list_transactions().unwrap().len(), 1);
    }

    #[test]
    fn test_signing_is_idempotent_per_key() {
        let (mut keeper, _, tx) = setup();

        keeper.add_signature(&tx.id, "pk-b", sig(1)).unwrap();
        let updated = keeper.add_signature(&tx.id, "pk-b", sig(2)).unwrap();

        assert_eq!(updated.signature_count(), 1);
        assert_eq!(updated.signatures[1].signature, Some(sig(2)));
        assert_eq!(keeper.get_transaction(&tx.id).unwrap(), updated);
    }

    #[test]
    fn test_unknown_signer_leaves_record_untouched() {
        let (mut keeper, _, tx) = setup();
        keeper.add_signature(&tx.id, "pk-a", sig(1)).unwrap();
        let before = keeper.get_transaction(&tx.id).unwrap();

        let err = keeper.add_signature(&tx.id, "pk-x", sig(2)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownSigner);
        assert_eq!(keeper.get_transaction(&tx.id).unwrap(), before);

        let err = keeper
            .add_signature(&Uuid::new_v4(), "pk-a", sig(1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_completion_is_single_shot() {
        let (mut keeper, _, tx) = setup();
        keeper.add_signature(&tx.id, "pk-a", sig(1)).unwrap();
        keeper.add_signature(&tx.id, "pk-c", sig(3)).unwrap();

        let done = keeper.complete_transaction(&tx.id, "ABC123").unwrap();
        assert_eq!(done.status(), TransactionStatus::Completed);

        let err = keeper.complete_transaction(&tx.id, "DEF456").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(
            keeper.get_transaction(&tx.id).unwrap().chain_tx_id.as_deref(),
            Some("ABC123")
        );

        let err = keeper
            .complete_transaction(&Uuid::new_v4(), "X")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_cleanup_stale_boundary() {
        let (mut keeper, wallet, old) = setup();
        let young = keeper
            .create_transaction(
                Uuid::new_v4(),
                &wallet.address,
                "recipient",
                Coin::new(5, "stake"),
                80,
            )
            .unwrap();
        keeper.complete_transaction(&old.id, "ABC").unwrap();

        // 50 + 30 == 80, not strictly less
        assert_eq!(keeper.cleanup_stale(80, 30).unwrap(), 0);
        assert_eq!(keeper.cleanup_stale(81, 30).unwrap(), 1);
        assert!(keeper.get_transaction(&old.id).is_err());
        assert!(keeper.get_transaction(&young.id).is_ok());
        assert_eq!(keeper.cleanup_stale(81, 30).unwrap(), 0);
    }

    #[test]
    fn test_sweep_uses_config() {
        let mut keeper = Keeper::new(
            MemoryStore::new(),
            KeeperConfig {
                max_transaction_age: 10,
                ..KeeperConfig::default()
            },
        );
        let wallet = keeper.create_wallet("w", keys(), 1).unwrap();
        keeper
            .create_transaction(Uuid::new_v4(), &wallet.address, "r", Coin::new(1, "stake"), 5)
            .unwrap();

        assert_eq!(keeper.sweep(15).unwrap(), 0);
        assert_eq!(keeper.sweep(16).unwrap(), 1);
    }

    #[test]
    fn test_list_transactions_by_from() {
        let (mut keeper, wallet, _) = setup();
        let other = keeper
            .create_wallet("other", vec!["pk-q".to_string()], 1)
            .unwrap();
        keeper
            .create_transaction(Uuid::new_v4(), &other.address, "r", Coin::new(1, "stake"), 1)
            .unwrap();

        assert_eq!(keeper.list_transactions().unwrap().len(), 2);
        assert_eq!(
            keeper.list_transactions_by_from(&wallet.address).unwrap().len(),
            1
        );
        assert!(keeper.list_transactions_by_from("nobody").unwrap().is_empty());
    }

    #[test]
    fn test_aggregate_every_subset() {
        for bits in 1u8..8 {
            let (mut keeper, wallet, tx) = setup();
            let subset: Vec<usize> = (0..3).filter(|i| bits & (1 << i) != 0).collect();
            for slot in &subset {
                let pk = wallet.public_keys[*slot].clone();
                keeper.add_signature(&tx.id, &pk, sig(*slot as u8 + 1)).unwrap();
            }

            let token = keeper.aggregate_signature(&tx.id).unwrap();
            let decoded = AggregatedSignature::decode(&token).unwrap();

            assert_eq!(decoded.mask().signers().collect::<Vec<_>>(), subset);
            let expected: Vec<Vec<u8>> = subset
                .iter()
                .map(|slot| vec![*slot as u8 + 1; 64])
                .collect();
            assert_eq!(decoded.signatures(), expected.as_slice());
        }
    }

    #[test]
    fn test_aggregate_errors() {
        let (mut keeper, _, tx) = setup();

        let err = keeper.aggregate_signature(&tx.id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedEncoding);

        keeper
            .add_signature(&tx.id, "pk-a", Signature::new("***", None))
            .unwrap();
        assert!(matches!(
            keeper.aggregate_signature(&tx.id),
            Err(MultisigError::Encoding(CodecError::MalformedSignature { slot: 0, .. }))
        ));

        let err = keeper.aggregate_signature(&Uuid::new_v4()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_corrupt_record_is_storage_error() {
        let mut store = MemoryStore::new();
        store
            .set(&StoreKey::wallet("3Bad"), b"not json".to_vec())
            .unwrap();
        let keeper = Keeper::new(store, KeeperConfig::default());

        assert_eq!(
            keeper.get_wallet("3Bad").unwrap_err().kind(),
            ErrorKind::Storage
        );
        assert_eq!(keeper.list_wallets().unwrap_err().kind(), ErrorKind::Storage);
    }

    #[test]
    fn test_failed_write_leaves_no_wallet() {
        use crate::storage::{FileStore, StorageConfig};

        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            data_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let tmp = dir.path().join(format!("{}.tmp", config.store_file));
        let store = FileStore::open(config).unwrap();
        let mut keeper = Keeper::new(store, KeeperConfig::default());

        std::fs::create_dir(&tmp).unwrap();
        let err = keeper.create_wallet("vault", keys(), 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(keeper.list_wallets().unwrap().is_empty());

        std::fs::remove_dir(&tmp).unwrap();
        let wallet = keeper.create_wallet("vault", keys(), 2).unwrap();
        assert_eq!(keeper.list_wallets().unwrap(), vec![wallet]);
    }
}

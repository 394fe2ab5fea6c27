//! File-backed key-value store
//!
//! Keeps the working set in memory and rewrites a single JSON file after every
//! mutation. Writes go to a temporary file first and are renamed into place.

use super::kv::{KvStore, Namespace, StorageError, StoreKey};
use super::memory::MemoryStore;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub store_file: String,
    pub backup_enabled: bool,
    pub max_backups: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".multisig_data"),
            store_file: "store.json".to_string(),
            backup_enabled: true,
            max_backups: 3,
        }
    }
}

/// On-disk layout: namespace -> entity key -> base64 value
type DiskLayout = BTreeMap<Namespace, BTreeMap<String, String>>;

/// JSON file store
#[derive(Debug)]
pub struct FileStore {
    config: StorageConfig,
    cache: MemoryStore,
}

impl FileStore {
    /// Open (or create) the store under `config.data_dir`
    pub fn open(config: StorageConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.data_dir)?;

        let mut store = Self {
            config,
            cache: MemoryStore::new(),
        };

        if store.exists() {
            store.cache = store.load()?;
            log::info!(
                "Loaded {} wallets and {} transactions from {:?}",
                store.cache.len(Namespace::Wallet),
                store.cache.len(Namespace::Transaction),
                store.store_path()
            );
        } else {
            log::info!("No existing store at {:?}", store.store_path());
        }

        Ok(store)
    }

    /// Open with default configuration
    pub fn with_defaults() -> Result<Self, StorageError> {
        Self::open(StorageConfig::default())
    }

    fn store_path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.store_file)
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.backup.{}", self.config.store_file, index))
    }

    /// Check if a saved store exists
    pub fn exists(&self) -> bool {
        self.store_path().exists()
    }

    fn load(&self) -> Result<MemoryStore, StorageError> {
        let file = fs::File::open(self.store_path())?;
        let layout: DiskLayout = serde_json::from_reader(BufReader::new(file))?;

        let mut cache = MemoryStore::new();
        for (namespace, entries) in layout {
            for (key, encoded) in entries {
                let value = STANDARD.decode(&encoded).map_err(|e| {
                    StorageError::InvalidData(format!("{}-{}: {}", namespace.tag(), key, e))
                })?;
                cache.insert_raw(namespace, key, value);
            }
        }
        Ok(cache)
    }

    /// Write the working set to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        let path = self.store_path();

        if self.config.backup_enabled && self.config.max_backups > 0 && path.exists() {
            self.rotate_backups()?;
            fs::copy(&path, self.backup_path(0))?;
        }

        let layout: DiskLayout = self
            .cache
            .entries()
            .iter()
            .map(|(namespace, entries)| {
                let encoded = entries
                    .iter()
                    .map(|(k, v)| (k.clone(), STANDARD.encode(v)))
                    .collect();
                (*namespace, encoded)
            })
            .collect();

        let temp_path = self
            .config
            .data_dir
            .join(format!("{}.tmp", self.config.store_file));
        let mut writer = BufWriter::new(fs::File::create(&temp_path)?);
        serde_json::to_writer_pretty(&mut writer, &layout)?;
        writer.flush()?;
        drop(writer);

        // Atomic rename
        fs::rename(&temp_path, &path)?;
        log::debug!("Flushed store to {:?}", path);

        Ok(())
    }

    /// Rotate backup files, dropping the oldest
    fn rotate_backups(&self) -> Result<(), StorageError> {
        let oldest = self.backup_path(self.config.max_backups - 1);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }

        for i in (0..self.config.max_backups - 1).rev() {
            let current = self.backup_path(i);
            if current.exists() {
                fs::rename(&current, self.backup_path(i + 1))?;
            }
        }

        Ok(())
    }

    /// Flush, putting `key` back to `previous` in memory if the write fails
    fn flush_or_restore(
        &mut self,
        key: &StoreKey,
        previous: Option<Vec<u8>>,
    ) -> Result<(), StorageError> {
        let result = self.flush();
        if let Err(e) = &result {
            log::warn!("Flush failed, rolling back {}: {}", key, e);
            match previous {
                Some(value) => self.cache.set(key, value)?,
                None => self.cache.delete(key)?,
            }
        }
        result
    }

    /// List available backups
    pub fn list_backups(&self) -> Vec<usize> {
        (0..self.config.max_backups)
            .filter(|i| self.backup_path(*i).exists())
            .collect()
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &StoreKey) -> Result<Option<Vec<u8>>, StorageError> {
        self.cache.get(key)
    }

    fn set(&mut self, key: &StoreKey, value: Vec<u8>) -> Result<(), StorageError> {
        let previous = self.cache.get(key)?;
        self.cache.set(key, value)?;
        self.flush_or_restore(key, previous)
    }

    fn has(&self, key: &StoreKey) -> Result<bool, StorageError> {
        self.cache.has(key)
    }

    fn delete(&mut self, key: &StoreKey) -> Result<(), StorageError> {
        let previous = self.cache.get(key)?;
        self.cache.delete(key)?;
        self.flush_or_restore(key, previous)
    }

    fn scan(&self, namespace: Namespace) -> Result<Vec<(String, Vec<u8>)>, StorageError> {
        self.cache.scan(namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config(dir: &tempfile::TempDir) -> StorageConfig {
        StorageConfig {
            data_dir: dir.path().to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_reopen_preserves_entries() {
        let temp_dir = tempfile::tempdir().unwrap();

        {
            let mut store = FileStore::open(temp_config(&temp_dir)).unwrap();
            store.set(&StoreKey::wallet("3abc"), b"{}".to_vec()).unwrap();
            store
                .set(&StoreKey::transaction("t1"), vec![0, 159, 255])
                .unwrap();
            assert!(store.exists());
        }

        let store = FileStore::open(temp_config(&temp_dir)).unwrap();
        assert_eq!(
            store.get(&StoreKey::wallet("3abc")).unwrap(),
            Some(b"{}".to_vec())
        );
        assert_eq!(
            store.get(&StoreKey::transaction("t1")).unwrap(),
            Some(vec![0, 159, 255])
        );
    }

    #[test]
    fn test_delete_is_persisted() {
        let temp_dir = tempfile::tempdir().unwrap();

        {
            let mut store = FileStore::open(temp_config(&temp_dir)).unwrap();
            store.set(&StoreKey::transaction("t1"), vec![1]).unwrap();
            store.delete(&StoreKey::transaction("t1")).unwrap();
        }

        let store = FileStore::open(temp_config(&temp_dir)).unwrap();
        assert!(!store.has(&StoreKey::transaction("t1")).unwrap());
    }

    #[test]
    fn test_backup_rotation() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            max_backups: 2,
            ..temp_config(&temp_dir)
        };

        let mut store = FileStore::open(config).unwrap();
        for i in 0..5u8 {
            store.set(&StoreKey::wallet("w"), vec![i]).unwrap();
        }

        assert_eq!(store.list_backups(), vec![0, 1]);
    }

    #[test]
    fn test_failed_flush_rolls_back() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = temp_config(&temp_dir);
        let tmp = config.data_dir.join(format!("{}.tmp", config.store_file));

        let mut store = FileStore::open(config).unwrap();
        store.set(&StoreKey::wallet("kept"), vec![1]).unwrap();

        // A directory where the temp file goes makes every flush fail
        fs::create_dir(&tmp).unwrap();
        assert!(store.set(&StoreKey::wallet("new"), vec![2]).is_err());
        assert!(store.set(&StoreKey::wallet("kept"), vec![9]).is_err());
        assert!(store.delete(&StoreKey::wallet("kept")).is_err());

        assert!(!store.has(&StoreKey::wallet("new")).unwrap());
        assert_eq!(
            store.get(&StoreKey::wallet("kept")).unwrap(),
            Some(vec![1])
        );

        fs::remove_dir(&tmp).unwrap();
        store.set(&StoreKey::wallet("new"), vec![2]).unwrap();
        assert_eq!(store.scan(Namespace::Wallet).unwrap().len(), 2);
    }

    #[test]
    fn test_corrupt_value_is_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = temp_config(&temp_dir);
        fs::write(
            config.data_dir.join(&config.store_file),
            r#"{"wallet":{"w":"not base64!"}}"#,
        )
        .unwrap();

        assert!(matches!(
            FileStore::open(config),
            Err(StorageError::InvalidData(_))
        ));
    }
}

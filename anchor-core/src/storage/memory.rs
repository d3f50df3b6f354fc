use std::collections::BTreeMap;
use std::sync::Arc;

use rst_common::standard::async_trait::async_trait;
use rst_common::with_tokio::tokio::sync::Mutex;

use super::types::{StorageBuilder, StorageError};

/// `MemoryStorage` is an in-process [`StorageBuilder`] backed by an ordered map
///
/// Clones share the same map, which makes it usable as a fresh "reload" of the same store in
/// tests: build new components over a clone and they observe everything written before
#[derive(Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl StorageBuilder for MemoryStorage {
    async fn get(&self, key: String) -> Result<Option<Vec<u8>>, StorageError> {
        let entries = self.entries.lock().await;
        Ok(entries.get(&key).cloned())
    }

    async fn set(&self, key: String, value: Vec<u8>) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().await;
        entries.insert(key, value);
        Ok(())
    }

    async fn delete(&self, key: String) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().await;
        entries.remove(&key);
        Ok(())
    }

    async fn list_keys_by_prefix(&self, prefix: String) -> Result<Vec<String>, StorageError> {
        let entries = self.entries.lock().await;
        let keys = entries
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .map(|(key, _)| key.to_owned())
            .collect();

        Ok(keys)
    }
}

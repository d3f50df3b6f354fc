use std::borrow::Cow;

use derive_more::{Display, From, Into};

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::de::DeserializeOwned;
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;
use rst_common::with_errors::thiserror::{self, Error};

pub const KEY_SEPARATOR: &str = ":";

#[derive(Debug, PartialEq, Error, Clone)]
pub enum StorageError {
    #[error("storage engine error: {0}")]
    EngineError(String),

    #[error("serialize error: {0}")]
    SerializeError(String),

    #[error("unserialize error: {0}")]
    UnserializeError(String),
}

/// `WalletID` identifies the wallet owning a persisted entity. Every key written through
/// [`Keyspace`] starts with it so two wallets sharing one engine never see each other's data
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From, Into)]
#[serde(crate = "self::serde")]
pub struct WalletID(String);

impl WalletID {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// `key_segment` is the id as written in storage keys, percent encoded so a
    /// [`KEY_SEPARATOR`] inside the id can't reach into another wallet's prefix
    pub fn key_segment(&self) -> Cow<'_, str> {
        urlencoding::encode(self.as_str())
    }
}

/// `StorageBuilder` is the external key-value store contract
///
/// Writes are last-writer-wins per key. No cross-key transaction is assumed, callers keep their
/// own invariants (idempotent creation, monotonic updates) instead of locking
#[async_trait]
pub trait StorageBuilder: Clone + Send + Sync {
    async fn get(&self, key: String) -> Result<Option<Vec<u8>>, StorageError>;
    async fn set(&self, key: String, value: Vec<u8>) -> Result<(), StorageError>;
    async fn delete(&self, key: String) -> Result<(), StorageError>;
    async fn list_keys_by_prefix(&self, prefix: String) -> Result<Vec<String>, StorageError>;
}

/// `Keyspace` builds wallet scoped keys for one collection: `<wallet>:<collection>:<id>`
#[derive(Debug, Clone)]
pub struct Keyspace {
    collection: &'static str,
}

impl Keyspace {
    pub const fn new(collection: &'static str) -> Self {
        Self { collection }
    }

    pub fn key(&self, wallet: &WalletID, id: &str) -> String {
        format!(
            "{}{sep}{}{sep}{}",
            wallet.key_segment(),
            self.collection,
            id,
            sep = KEY_SEPARATOR
        )
    }

    pub fn prefix(&self, wallet: &WalletID) -> String {
        format!(
            "{}{sep}{}{sep}",
            wallet.key_segment(),
            self.collection,
            sep = KEY_SEPARATOR
        )
    }

    /// `load` reads and unserializes a single entity, a missing key is `Ok(None)`
    pub async fn load<TStorage, T>(
        &self,
        storage: &TStorage,
        wallet: &WalletID,
        id: &str,
    ) -> Result<Option<T>, StorageError>
    where
        TStorage: StorageBuilder,
        T: DeserializeOwned,
    {
        let value = storage.get(self.key(wallet, id)).await?;
        value
            .map(|bytes| {
                serde_json::from_slice::<T>(&bytes)
                    .map_err(|err| StorageError::UnserializeError(err.to_string()))
            })
            .transpose()
    }

    pub async fn save<TStorage, T>(
        &self,
        storage: &TStorage,
        wallet: &WalletID,
        id: &str,
        entity: &T,
    ) -> Result<(), StorageError>
    where
        TStorage: StorageBuilder,
        T: Serialize + Sync,
    {
        let bytes =
            serde_json::to_vec(entity).map_err(|err| StorageError::SerializeError(err.to_string()))?;

        storage.set(self.key(wallet, id), bytes).await
    }

    pub async fn remove<TStorage>(
        &self,
        storage: &TStorage,
        wallet: &WalletID,
        id: &str,
    ) -> Result<(), StorageError>
    where
        TStorage: StorageBuilder,
    {
        storage.delete(self.key(wallet, id)).await
    }

    /// `load_all` reads every entity of this collection for the wallet. Entries removed between
    /// listing the keys and reading them are skipped
    pub async fn load_all<TStorage, T>(
        &self,
        storage: &TStorage,
        wallet: &WalletID,
    ) -> Result<Vec<T>, StorageError>
    where
        TStorage: StorageBuilder,
        T: DeserializeOwned,
    {
        let keys = storage.list_keys_by_prefix(self.prefix(wallet)).await?;

        let mut entities = Vec::with_capacity(keys.len());
        for key in keys {
            let value = storage.get(key).await?;
            if let Some(bytes) = value {
                let entity = serde_json::from_slice::<T>(&bytes)
                    .map_err(|err| StorageError::UnserializeError(err.to_string()))?;
                entities.push(entity);
            }
        }

        Ok(entities)
    }
}

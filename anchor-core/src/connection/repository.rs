use rst_common::with_logging::log::debug;

use crate::storage::{Keyspace, StorageBuilder, WalletID};

use super::types::{ConnectionError, ConnectionPair};

pub const CONNECTION_KEYSPACE: Keyspace = Keyspace::new("connection");

/// `ConnectionRepository` persists established [`ConnectionPair`], at most one per
/// (local, remote) DID pair
#[derive(Clone)]
pub struct ConnectionRepository<TStorage>
where
    TStorage: StorageBuilder,
{
    storage: TStorage,
}

impl<TStorage> ConnectionRepository<TStorage>
where
    TStorage: StorageBuilder,
{
    pub fn new(storage: TStorage) -> Self {
        Self { storage }
    }

    /// `save_unique` writes the pair unless the same DID pair already exists. The existing
    /// pair is returned untouched in that case
    pub async fn save_unique(
        &self,
        wallet: &WalletID,
        pair: ConnectionPair,
    ) -> Result<(ConnectionPair, bool), ConnectionError> {
        if let Some(existing) = self
            .get(wallet, pair.get_local_did(), pair.get_remote_did())
            .await?
        {
            debug!("[connection:save_unique] duplicate pair: {}", existing.get_id());
            return Ok((existing, false));
        }

        CONNECTION_KEYSPACE
            .save(&self.storage, wallet, &pair.get_id(), &pair)
            .await?;

        Ok((pair, true))
    }

    pub async fn get(
        &self,
        wallet: &WalletID,
        local_did: &str,
        remote_did: &str,
    ) -> Result<Option<ConnectionPair>, ConnectionError> {
        let pair = CONNECTION_KEYSPACE
            .load(&self.storage, wallet, &ConnectionPair::pair_id(local_did, remote_did))
            .await?;

        Ok(pair)
    }

    pub async fn list(&self, wallet: &WalletID) -> Result<Vec<ConnectionPair>, ConnectionError> {
        let mut pairs: Vec<ConnectionPair> =
            CONNECTION_KEYSPACE.load_all(&self.storage, wallet).await?;

        pairs.sort_by_key(|pair| pair.get_created_at());
        Ok(pairs)
    }
}

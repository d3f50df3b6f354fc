use rst_common::standard::async_trait::async_trait;
use rst_common::with_logging::log::debug;
use rstdev_storage::engine::rocksdb::db::DB;

use prople_anchor_core::storage::{StorageBuilder, StorageError};

use crate::db::{DbError, Instruction, OutputOpts, Runner};

/// `Repository` is the RocksDB backed [`StorageBuilder`] used by the wallet runtime
#[derive(Clone)]
pub struct Repository {
    db: Runner<DB>,
}

impl Repository {
    pub fn new(db: Runner<DB>) -> Self {
        Self { db }
    }

    async fn exec(&self, instruction: Instruction) -> Result<OutputOpts, StorageError> {
        self.db
            .exec(instruction)
            .await
            .map_err(|err: DbError| StorageError::EngineError(err.to_string()))
    }
}

#[async_trait]
impl StorageBuilder for Repository {
    async fn get(&self, key: String) -> Result<Option<Vec<u8>>, StorageError> {
        match self.exec(Instruction::GetCf { key }).await? {
            OutputOpts::SingleByte { value } => Ok(value),
            _ => Err(StorageError::EngineError(
                "invalid output return type".to_string(),
            )),
        }
    }

    async fn set(&self, key: String, value: Vec<u8>) -> Result<(), StorageError> {
        debug!("[repository:set] key: {}", key);
        let _ = self.exec(Instruction::SaveCf { key, value }).await?;
        Ok(())
    }

    async fn delete(&self, key: String) -> Result<(), StorageError> {
        debug!("[repository:delete] key: {}", key);
        let _ = self.exec(Instruction::RemoveCf { key }).await?;
        Ok(())
    }

    async fn list_keys_by_prefix(&self, prefix: String) -> Result<Vec<String>, StorageError> {
        match self.exec(Instruction::PrefixKeysCf { prefix }).await? {
            OutputOpts::Keys { keys } => Ok(keys),
            _ => Err(StorageError::EngineError(
                "invalid output return type".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rst_common::standard::serde_json::json;
    use rst_common::standard::uuid::Uuid;
    use rst_common::with_tokio::tokio;

    use prople_anchor_core::invitation::{FormatDetector, InvitationStateMachine, Status};
    use prople_anchor_core::request::{Decision, PendingRequestQueue};
    use prople_anchor_core::storage::WalletID;

    use crate::common::helpers::testdb;

    fn repository() -> Repository {
        Repository::new(testdb::global_db_runner().to_owned())
    }

    fn unique_wallet() -> WalletID {
        WalletID::new(format!("wallet-{}", Uuid::new_v4()))
    }

    #[test]
    fn test_runner_uses_configured_column_family() {
        assert_eq!(testdb::global_db_runner().get_column_family(), "wallet-cf")
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let repo = repository();
        let key = format!("{}:test:item", unique_wallet());

        assert_eq!(repo.get(key.clone()).await, Ok(None));
        assert!(repo.set(key.clone(), b"value".to_vec()).await.is_ok());
        assert_eq!(repo.get(key.clone()).await, Ok(Some(b"value".to_vec())));

        assert!(repo.delete(key.clone()).await.is_ok());
        assert_eq!(repo.get(key).await, Ok(None))
    }

    #[tokio::test]
    async fn test_prefix_scan_stays_inside_prefix() {
        let repo = repository();
        let wallet = unique_wallet();
        let neighbour = format!("{}z", wallet);

        for id in ["b", "a", "c"] {
            let _ = repo.set(format!("{}:request:{}", wallet, id), vec![1]).await;
        }
        let _ = repo.set(format!("{}:pin:ca", wallet), vec![1]).await;
        let _ = repo.set(format!("{}:request:x", neighbour), vec![1]).await;

        let keys = repo
            .list_keys_by_prefix(format!("{}:request:", wallet))
            .await
            .unwrap();

        assert_eq!(
            keys,
            vec![
                format!("{}:request:a", wallet),
                format!("{}:request:b", wallet),
                format!("{}:request:c", wallet),
            ]
        )
    }

    #[tokio::test]
    async fn test_core_components_over_rocksdb() {
        let wallet = unique_wallet();

        let machine = InvitationStateMachine::new(repository());
        let invitation = FormatDetector::detect("did:peer:2.dave").unwrap().into_invitation();
        let _ = machine.create_received(&wallet, invitation).await;
        assert_eq!(machine.mark_previewed(&wallet, "did:peer:2.dave").await, Ok(true));

        let reloaded = InvitationStateMachine::new(repository());
        let records = reloaded.list(&wallet).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get_status(), Status::Previewed);

        let queue = PendingRequestQueue::new(repository());
        let _ = queue
            .enqueue(&wallet, json!({"id": "req-1", "from": "did:peer:2.erin"}), None)
            .await;
        let _ = queue
            .handle_request(&wallet, "req-1", Decision::Rejected, None)
            .await;

        let reloaded = PendingRequestQueue::new(repository());
        assert!(reloaded.list_pending(&wallet).await.unwrap().is_empty());
        assert_eq!(reloaded.list_all(&wallet).await.unwrap().len(), 1)
    }
}

use rst_common::with_logging::log::{debug, info, warn};

use crate::storage::{Keyspace, StorageBuilder, WalletID};

use super::record::{Applied, InvitationRecord, Status};
use super::types::{Invitation, InvitationError};

pub const INVITATION_KEYSPACE: Keyspace = Keyspace::new("invitation");

/// `InvitationStateMachine` persists and transitions [`InvitationRecord`]
///
/// Every transition reads the current record, checks it against the requested status and only
/// then writes. The storage contract has no transactions, so creation is check-then-create and
/// transitions are monotonic: replaying any of them is harmless.
///
/// Transitions return `Ok(false)` when the record doesn't exist. It's not fatal, the caller
/// decides whether a missing record matters
#[derive(Clone)]
pub struct InvitationStateMachine<TStorage>
where
    TStorage: StorageBuilder,
{
    storage: TStorage,
}

impl<TStorage> InvitationStateMachine<TStorage>
where
    TStorage: StorageBuilder,
{
    pub fn new(storage: TStorage) -> Self {
        Self { storage }
    }

    /// `create_generated` registers an invitation created by this wallet
    pub async fn create_generated(
        &self,
        wallet: &WalletID,
        invitation: Invitation,
    ) -> Result<InvitationRecord, InvitationError> {
        if let Some(existing) = self.get(wallet, invitation.get_id()).await? {
            debug!("[machine:create_generated] already exists: {}", existing.get_id());
            return Ok(existing);
        }

        let record = InvitationRecord::generated(wallet.to_owned(), invitation);
        self.save(&record).await?;

        info!("[machine:create_generated] invitation: {}", record.get_id());
        Ok(record)
    }

    /// `create_received` registers an invitation scanned by this wallet
    pub async fn create_received(
        &self,
        wallet: &WalletID,
        invitation: Invitation,
    ) -> Result<InvitationRecord, InvitationError> {
        if let Some(existing) = self.get(wallet, invitation.get_id()).await? {
            debug!("[machine:create_received] already exists: {}", existing.get_id());
            return Ok(existing);
        }

        let record = InvitationRecord::received(wallet.to_owned(), invitation);
        self.save(&record).await?;

        info!("[machine:create_received] invitation: {}", record.get_id());
        Ok(record)
    }

    pub async fn mark_previewed(&self, wallet: &WalletID, id: &str) -> Result<bool, InvitationError> {
        self.transition(wallet, id, |_| Status::Previewed).await
    }

    /// `mark_request_sent` picks `RequestSent` or `ConnectionRequestSent` from the record role
    pub async fn mark_request_sent(
        &self,
        wallet: &WalletID,
        id: &str,
    ) -> Result<bool, InvitationError> {
        self.transition(wallet, id, InvitationRecord::request_sent_status)
            .await
    }

    pub async fn mark_established(
        &self,
        wallet: &WalletID,
        id: &str,
    ) -> Result<bool, InvitationError> {
        self.transition(wallet, id, |_| Status::Established).await
    }

    pub async fn mark_rejected(&self, wallet: &WalletID, id: &str) -> Result<bool, InvitationError> {
        self.transition(wallet, id, |_| Status::Rejected).await
    }

    pub async fn get(
        &self,
        wallet: &WalletID,
        id: &str,
    ) -> Result<Option<InvitationRecord>, InvitationError> {
        let record = INVITATION_KEYSPACE.load(&self.storage, wallet, id).await?;
        Ok(record)
    }

    /// `list` returns the wallet's records, oldest first
    pub async fn list(&self, wallet: &WalletID) -> Result<Vec<InvitationRecord>, InvitationError> {
        let mut records: Vec<InvitationRecord> =
            INVITATION_KEYSPACE.load_all(&self.storage, wallet).await?;

        records.sort_by(|a, b| {
            a.get_created_at()
                .cmp(&b.get_created_at())
                .then_with(|| a.get_id().cmp(b.get_id()))
        });

        Ok(records)
    }

    async fn transition<F>(&self, wallet: &WalletID, id: &str, target: F) -> Result<bool, InvitationError>
    where
        F: FnOnce(&InvitationRecord) -> Status,
    {
        let Some(mut record) = self.get(wallet, id).await? else {
            warn!("[machine:transition] invitation not found: {}", id);
            return Ok(false);
        };

        let status = target(&record);
        match record.apply(status)? {
            Applied::Changed => {
                self.save(&record).await?;
                info!("[machine:transition] invitation: {} | status: {:?}", id, status);
            }
            Applied::Unchanged => {
                debug!("[machine:transition] invitation: {} | already at: {:?}", id, record.get_status());
            }
        }

        Ok(true)
    }

    async fn save(&self, record: &InvitationRecord) -> Result<(), InvitationError> {
        INVITATION_KEYSPACE
            .save(&self.storage, record.get_wallet(), record.get_id(), record)
            .await?;

        Ok(())
    }
}

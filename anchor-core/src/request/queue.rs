use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde_json::Value;
use rst_common::with_logging::log::{debug, info};

use crate::invitation::AttachmentExtractor;
use crate::storage::{Keyspace, StorageBuilder, WalletID};
use crate::verifiable::CredentialProof;

use super::types::{ConnectionRequestRecord, Decision, Enqueued, RequestError};

pub const REQUEST_KEYSPACE: Keyspace = Keyspace::new("request");

/// `PendingRequestQueue` keeps inbound connection requests until the user decides
///
/// Decided requests stay in storage with their terminal decision, that's what keeps a rejected
/// request from coming back when the same message is delivered again
#[derive(Clone)]
pub struct PendingRequestQueue<TStorage>
where
    TStorage: StorageBuilder,
{
    storage: TStorage,
}

impl<TStorage> PendingRequestQueue<TStorage>
where
    TStorage: StorageBuilder,
{
    pub fn new(storage: TStorage) -> Self {
        Self { storage }
    }

    pub async fn enqueue(
        &self,
        wallet: &WalletID,
        message: Value,
        presentation: Option<&Value>,
    ) -> Result<Enqueued, RequestError> {
        self.enqueue_at(wallet, message, presentation, Utc::now())
            .await
    }

    /// `enqueue_at` stores the request with an explicit arrival time
    ///
    /// The credential comes from the request's own attachments first, then from `presentation`
    /// when it belongs to the same thread. No credential at all is fine
    pub async fn enqueue_at(
        &self,
        wallet: &WalletID,
        message: Value,
        presentation: Option<&Value>,
        received_at: DateTime<Utc>,
    ) -> Result<Enqueued, RequestError> {
        let id = message
            .get("id")
            .or_else(|| message.get("@id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(RequestError::MalformedRequest(
                "request message has no id".to_string(),
            ))?;

        if self.get(wallet, &id).await?.is_some() {
            debug!("[queue:enqueue] duplicate request: {}", id);
            return Ok(Enqueued::Duplicate);
        }

        let credential = Self::extract_credential(&id, &message, presentation);
        let record =
            ConnectionRequestRecord::new(id, wallet.to_owned(), message, credential, received_at);

        REQUEST_KEYSPACE
            .save(&self.storage, wallet, record.get_id(), &record)
            .await?;

        info!(
            "[queue:enqueue] request: {} | from: {:?} | credential: {}",
            record.get_id(),
            record.get_sender_did(),
            record.get_credential().is_some()
        );

        Ok(Enqueued::Added(record))
    }

    fn extract_credential(
        id: &str,
        message: &Value,
        presentation: Option<&Value>,
    ) -> Option<CredentialProof> {
        let from_message = AttachmentExtractor::credentials(message)
            .into_iter()
            .find_map(|attachment| attachment.credential().cloned());

        if from_message.is_some() {
            return from_message;
        }

        presentation
            .filter(|presentation| thread_id(presentation) == Some(id))
            .and_then(|presentation| {
                AttachmentExtractor::credentials(presentation)
                    .into_iter()
                    .find_map(|attachment| attachment.credential().cloned())
            })
    }

    /// `handle_request` records the decision
    ///
    /// `Ok(false)` when the request is unknown. Deciding an already decided request is a no-op,
    /// the first decision stays
    pub async fn handle_request(
        &self,
        wallet: &WalletID,
        id: &str,
        outcome: Decision,
        metadata: Option<Value>,
    ) -> Result<bool, RequestError> {
        if !outcome.is_terminal() {
            return Err(RequestError::ValidationError(
                "a decision must accept or reject".to_string(),
            ));
        }

        let Some(mut record) = self.get(wallet, id).await? else {
            return Ok(false);
        };

        if record.get_decision().is_terminal() {
            debug!(
                "[queue:handle_request] request: {} | already: {:?}",
                id,
                record.get_decision()
            );
            return Ok(true);
        }

        record.decide(outcome, metadata);
        REQUEST_KEYSPACE
            .save(&self.storage, wallet, id, &record)
            .await?;

        info!("[queue:handle_request] request: {} | decision: {:?}", id, outcome);
        Ok(true)
    }

    pub async fn get(
        &self,
        wallet: &WalletID,
        id: &str,
    ) -> Result<Option<ConnectionRequestRecord>, RequestError> {
        let record = REQUEST_KEYSPACE.load(&self.storage, wallet, id).await?;
        Ok(record)
    }

    /// `list_pending` is FIFO by arrival time
    pub async fn list_pending(
        &self,
        wallet: &WalletID,
    ) -> Result<Vec<ConnectionRequestRecord>, RequestError> {
        let pending = self
            .list_all(wallet)
            .await?
            .into_iter()
            .filter(|record| record.get_decision() == Decision::Pending)
            .collect();

        Ok(pending)
    }

    pub async fn list_all(
        &self,
        wallet: &WalletID,
    ) -> Result<Vec<ConnectionRequestRecord>, RequestError> {
        let mut records: Vec<ConnectionRequestRecord> =
            REQUEST_KEYSPACE.load_all(&self.storage, wallet).await?;

        records.sort_by(|a, b| {
            a.get_received_at()
                .cmp(&b.get_received_at())
                .then_with(|| a.get_id().cmp(b.get_id()))
        });

        Ok(records)
    }
}

fn thread_id(message: &Value) -> Option<&str> {
    message
        .get("thid")
        .or_else(|| message.get("~thread").and_then(|thread| thread.get("thid")))
        .and_then(Value::as_str)
}

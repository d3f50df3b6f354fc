use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::Value;
use rst_common::with_errors::thiserror::{self, Error};

use crate::storage::{StorageError, WalletID};
use crate::verifiable::CredentialProof;

#[derive(Debug, PartialEq, Error, Clone)]
pub enum RequestError {
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("storage error: {0}")]
    StorageError(String),
}

impl From<StorageError> for RequestError {
    fn from(value: StorageError) -> Self {
        RequestError::StorageError(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "self::serde", rename_all = "snake_case")]
pub enum Decision {
    Pending,
    Accepted,
    Rejected,
}

impl Decision {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Decision::Pending)
    }
}

/// `Enqueued` is the result of [`super::PendingRequestQueue::enqueue`]. A duplicate is not an
/// error, the stored request is left as it was
#[derive(Debug, Clone, PartialEq)]
pub enum Enqueued {
    Added(ConnectionRequestRecord),
    Duplicate,
}

/// `ConnectionRequestRecord` is an inbound connection request waiting for the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ConnectionRequestRecord {
    id: String,
    wallet: WalletID,
    sender_did: Option<String>,
    invitation_id: Option<String>,
    message: Value,
    credential: Option<CredentialProof>,
    received_at: DateTime<Utc>,
    decision: Decision,
    metadata: Option<Value>,
    decided_at: Option<DateTime<Utc>>,
}

impl ConnectionRequestRecord {
    pub fn new(
        id: String,
        wallet: WalletID,
        message: Value,
        credential: Option<CredentialProof>,
        received_at: DateTime<Utc>,
    ) -> Self {
        let sender_did = message
            .get("from")
            .and_then(Value::as_str)
            .map(str::to_string);

        let invitation_id = message
            .get("pthid")
            .or_else(|| message.get("~thread").and_then(|thread| thread.get("pthid")))
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            id,
            wallet,
            sender_did,
            invitation_id,
            message,
            credential,
            received_at,
            decision: Decision::Pending,
            metadata: None,
            decided_at: None,
        }
    }

    pub(crate) fn decide(&mut self, decision: Decision, metadata: Option<Value>) {
        self.decision = decision;
        self.metadata = metadata;
        self.decided_at = Some(Utc::now());
    }

    pub fn get_id(&self) -> &str {
        &self.id
    }

    pub fn get_wallet(&self) -> &WalletID {
        &self.wallet
    }

    pub fn get_sender_did(&self) -> Option<&str> {
        self.sender_did.as_deref()
    }

    /// the invitation this request answers, taken from the parent thread id
    pub fn get_invitation_id(&self) -> Option<&str> {
        self.invitation_id.as_deref()
    }

    pub fn get_message(&self) -> &Value {
        &self.message
    }

    pub fn get_credential(&self) -> Option<&CredentialProof> {
        self.credential.as_ref()
    }

    pub fn get_received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn get_decision(&self) -> Decision {
        self.decision
    }

    pub fn get_metadata(&self) -> Option<&Value> {
        self.metadata.as_ref()
    }

    pub fn get_decided_at(&self) -> Option<DateTime<Utc>> {
        self.decided_at
    }
}

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::{json, Value};
use rst_common::standard::uuid::Uuid;
use rst_common::with_errors::thiserror::{self, Error};

use crate::invitation::Invitation;
use crate::storage::StorageError;
use crate::verifiable::CredentialProof;

pub const CONNECTION_REQUEST_TYPE: &str = "https://didcomm.org/didexchange/1.1/request";
pub const CONNECTION_RESPONSE_TYPE: &str = "https://didcomm.org/didexchange/1.1/response";
pub const CONNECTION_PROBLEM_TYPE: &str = "https://didcomm.org/didexchange/1.1/problem_report";
pub const PRESENTATION_ATTACHMENT_ID: &str = "credential-proof";

/// ConnectionError is a base error types for the `Connection` domain
#[derive(Debug, PartialEq, Error, Clone)]
pub enum ConnectionError {
    #[error("transport failure: {0}")]
    TransportFailure(String),

    #[error("handshake rejected: {0}")]
    HandshakeRejected(String),

    #[error("remote agent error: {0}")]
    RemoteAgentError(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("build invitation error: {0}")]
    InvitationError(String),
}

impl From<StorageError> for ConnectionError {
    fn from(value: StorageError) -> Self {
        ConnectionError::StorageError(value.to_string())
    }
}

/// `ExecutionContext` selects the backend running the handshake
///
/// `Local` uses this wallet's own transport, `Remote` delegates to a cloud agent. Nothing
/// produced for one context is forwarded to the other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "self::serde", rename_all = "snake_case")]
pub enum ExecutionContext {
    Local,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde", rename_all = "snake_case", tag = "route")]
pub enum ConnectionRoute {
    DirectLink,
    Handshake { request_id: String },
    RemoteAgent { connection_id: String },
}

/// `ConnectionPair` is an established link between a local and a remote DID
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ConnectionPair {
    local_did: String,
    remote_did: String,
    route: ConnectionRoute,
    created_at: DateTime<Utc>,
}

impl ConnectionPair {
    pub fn new(local_did: impl Into<String>, remote_did: impl Into<String>, route: ConnectionRoute) -> Self {
        Self {
            local_did: local_did.into(),
            remote_did: remote_did.into(),
            route,
            created_at: Utc::now(),
        }
    }

    /// `pair_id` is the storage identifier, unique per (local, remote) DID pair
    pub fn pair_id(local_did: &str, remote_did: &str) -> String {
        format!("{}|{}", local_did, remote_did)
    }

    pub fn get_id(&self) -> String {
        Self::pair_id(&self.local_did, &self.remote_did)
    }

    pub fn get_local_did(&self) -> &str {
        &self.local_did
    }

    pub fn get_remote_did(&self) -> &str {
        &self.remote_did
    }

    pub fn get_route(&self) -> &ConnectionRoute {
        &self.route
    }

    pub fn get_created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "self::serde", rename_all = "snake_case")]
pub enum TransportState {
    Pending,
    Active,
    Rejected,
}

/// `TransportConnection` is a connection as the local transport reports it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct TransportConnection {
    pub local_did: String,
    pub remote_did: String,
    pub state: TransportState,
}

/// `OutboundMessage` is a protocol message handed to the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct OutboundMessage {
    pub id: String,

    #[serde(rename = "type")]
    pub message_type: String,

    pub from: String,
    pub to: Vec<String>,
    pub thid: Option<String>,
    pub pthid: Option<String>,
    pub body: Value,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub requests_attach: Vec<Value>,
}

impl OutboundMessage {
    /// `connection_request` answers `invitation`, the optional credential travels as a json
    /// attachment holding only the disclosed fields
    pub fn connection_request(
        own_did: &str,
        invitation: &Invitation,
        credential: Option<&CredentialProof>,
    ) -> Self {
        let id = Uuid::new_v4().to_string();
        let requests_attach = credential
            .map(|credential| {
                vec![json!({
                    "@id": PRESENTATION_ATTACHMENT_ID,
                    "mime-type": "application/json",
                    "data": {"json": credential.to_value()}
                })]
            })
            .unwrap_or_default();

        Self {
            thid: Some(id.clone()),
            id,
            message_type: CONNECTION_REQUEST_TYPE.to_string(),
            from: own_did.to_string(),
            to: vec![invitation.get_from().to_string()],
            pthid: Some(invitation.get_id().to_string()),
            body: json!({"label": invitation.get_label(), "goal_code": invitation.get_goal_code()}),
            requests_attach,
        }
    }

    /// `connection_response` replies to an inbound request, `accepted == false` sends a problem
    /// report instead
    pub fn connection_response(own_did: &str, to: &str, request_id: &str, accepted: bool) -> Self {
        let (message_type, body) = match accepted {
            true => (CONNECTION_RESPONSE_TYPE, json!({"did": own_did})),
            false => (
                CONNECTION_PROBLEM_TYPE,
                json!({"code": "request_not_accepted", "comment": "connection request rejected"}),
            ),
        };

        Self {
            id: Uuid::new_v4().to_string(),
            message_type: message_type.to_string(),
            from: own_did.to_string(),
            to: vec![to.to_string()],
            thid: Some(request_id.to_string()),
            pthid: None,
            body,
            requests_attach: Vec::new(),
        }
    }
}

/// `MessageHandler` receives inbound messages pushed by the transport
pub trait MessageHandler: Send + Sync {
    fn handle(&self, message: Value);
}

/// `TransportBuilder` is the local message transport
#[async_trait]
pub trait TransportBuilder: Clone + Send + Sync {
    async fn send(&self, message: OutboundMessage) -> Result<(), ConnectionError>;
    async fn subscribe(&self, handler: Box<dyn MessageHandler>) -> Result<(), ConnectionError>;
    async fn list_connections(&self) -> Result<Vec<TransportConnection>, ConnectionError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct RemoteAcceptance {
    pub connection_id: String,
    pub remote_did: Option<String>,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct RemoteInvitation {
    pub invitation_url: String,
    pub connection_id: String,
}

/// `RemoteAgentBuilder` is the cloud agent used by the remote execution context
///
/// It only ever receives invitation URLs and labels, never credentials held by this wallet
#[async_trait]
pub trait RemoteAgentBuilder: Clone + Send + Sync {
    async fn accept_invitation(&self, url: String) -> Result<RemoteAcceptance, ConnectionError>;
    async fn create_invitation(&self, label: String) -> Result<RemoteInvitation, ConnectionError>;
}

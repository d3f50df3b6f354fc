use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::Value;
use rst_common::with_errors::thiserror::{self, Error};

use crate::storage::StorageError;
use crate::trust::AuthorityKind;

pub const PEER_DID_PREFIX: &str = "did:peer:";

/// query parameters carrying an encoded invitation, in lookup order
pub const INVITATION_QUERY_PARAMS: [&str; 4] = ["oob", "_oob", "c_i", "d_m"];

pub const OOB_V2_INVITATION_TYPE: &str = "https://didcomm.org/out-of-band/2.0/invitation";

/// InvitationError is a base error types for the `Invitation` domain
#[derive(Debug, PartialEq, Error, Clone)]
pub enum InvitationError {
    #[error("malformed invitation: {0}")]
    MalformedInvitation(String),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("build invitation error: {0}")]
    BuildError(String),
}

impl From<StorageError> for InvitationError {
    fn from(value: StorageError) -> Self {
        InvitationError::StorageError(value.to_string())
    }
}

/// `InvitationFormat` is the wire dialect an invitation was received in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "self::serde", rename_all = "snake_case")]
pub enum InvitationFormat {
    RawIdentifier,
    Standard,
    Legacy,
}

/// `Dialect` tells a peer to peer invitation apart from an authority one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "self::serde", rename_all = "snake_case", tag = "dialect", content = "kind")]
pub enum Dialect {
    PeerToPeer,
    Authority(AuthorityKind),
}

/// `Invitation` is an out-of-band invitation after detection. It is never mutated once parsed
///
/// `body` keeps the decoded wire JSON so attachments can be extracted later from both the modern
/// and the legacy field names, and `raw` keeps the text as it was scanned because a remote agent
/// needs the original URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Invitation {
    id: String,
    from: String,
    label: Option<String>,
    goal_code: Option<String>,
    goal: Option<String>,
    accept: Vec<String>,
    message_type: Option<String>,
    format: InvitationFormat,
    dialect: Dialect,
    body: Value,
    raw: String,
}

impl Invitation {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: String,
        from: String,
        label: Option<String>,
        goal_code: Option<String>,
        goal: Option<String>,
        accept: Vec<String>,
        message_type: Option<String>,
        format: InvitationFormat,
        dialect: Dialect,
        body: Value,
        raw: String,
    ) -> Self {
        Self {
            id,
            from,
            label,
            goal_code,
            goal,
            accept,
            message_type,
            format,
            dialect,
            body,
            raw,
        }
    }

    /// a bare peer DID is its own invitation: identified and originated by the DID itself
    pub fn from_peer_did(did: &str, raw: &str) -> Self {
        Self {
            id: did.to_string(),
            from: did.to_string(),
            label: None,
            goal_code: None,
            goal: None,
            accept: Vec::new(),
            message_type: None,
            format: InvitationFormat::RawIdentifier,
            dialect: Dialect::PeerToPeer,
            body: Value::Null,
            raw: raw.to_string(),
        }
    }

    pub fn get_id(&self) -> &str {
        &self.id
    }

    pub fn get_from(&self) -> &str {
        &self.from
    }

    pub fn get_label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn get_goal_code(&self) -> Option<&str> {
        self.goal_code.as_deref()
    }

    pub fn get_goal(&self) -> Option<&str> {
        self.goal.as_deref()
    }

    pub fn get_accept(&self) -> &[String] {
        &self.accept
    }

    pub fn get_message_type(&self) -> Option<&str> {
        self.message_type.as_deref()
    }

    pub fn get_format(&self) -> InvitationFormat {
        self.format
    }

    pub fn get_dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn get_body(&self) -> &Value {
        &self.body
    }

    pub fn get_raw(&self) -> &str {
        &self.raw
    }

    pub fn authority(&self) -> Option<AuthorityKind> {
        match self.dialect {
            Dialect::Authority(kind) => Some(kind),
            Dialect::PeerToPeer => None,
        }
    }
}

/// `ClassifiedInvitation` is the output of the format detection
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifiedInvitation {
    RawIdentifier(Invitation),
    Standard(Invitation),
    Legacy(Invitation),
}

impl ClassifiedInvitation {
    pub fn invitation(&self) -> &Invitation {
        match self {
            ClassifiedInvitation::RawIdentifier(invitation)
            | ClassifiedInvitation::Standard(invitation)
            | ClassifiedInvitation::Legacy(invitation) => invitation,
        }
    }

    pub fn into_invitation(self) -> Invitation {
        match self {
            ClassifiedInvitation::RawIdentifier(invitation)
            | ClassifiedInvitation::Standard(invitation)
            | ClassifiedInvitation::Legacy(invitation) => invitation,
        }
    }

    pub fn format(&self) -> InvitationFormat {
        self.invitation().get_format()
    }

    pub fn authority(&self) -> Option<AuthorityKind> {
        self.invitation().authority()
    }

    pub fn is_raw_identifier(&self) -> bool {
        matches!(self, ClassifiedInvitation::RawIdentifier(_))
    }
}

/// `MessageType` is a parsed protocol URI such as `https://didcomm.org/out-of-band/2.0/invitation`
/// or `did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/connections/1.0/invitation`
#[derive(Debug, Clone, PartialEq)]
pub struct MessageType {
    pub protocol: String,
    pub major: u32,
    pub minor: u32,
    pub name: String,
}

impl MessageType {
    pub fn parse(uri: &str) -> Option<Self> {
        let mut segments = uri.trim().trim_end_matches('/').rsplit('/');
        let name = segments.next()?;
        let version = segments.next()?;
        let protocol = segments.next()?;

        let (major, minor) = version.split_once('.').unwrap_or((version, "0"));
        let major = major.parse::<u32>().ok()?;
        let minor = minor.parse::<u32>().ok()?;

        if protocol.is_empty() || name.is_empty() {
            return None;
        }

        Some(Self {
            protocol: protocol.to_string(),
            major,
            minor,
            name: name.to_string(),
        })
    }

    /// `format` maps a known protocol to its invitation dialect
    pub fn format(&self) -> Option<InvitationFormat> {
        match (self.protocol.as_str(), self.major) {
            ("out-of-band", 2) => Some(InvitationFormat::Standard),
            ("out-of-band", 1) | ("connections", 1) => Some(InvitationFormat::Legacy),
            _ => None,
        }
    }
}

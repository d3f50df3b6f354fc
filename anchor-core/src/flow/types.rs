use rst_common::standard::serde_json::Value;
use rst_common::with_errors::thiserror::{self, Error};

use crate::connection::{ConnectionError, ConnectionPair, CredentialResponse, ExecutionContext};
use crate::invitation::{AttachmentKind, ClassifiedInvitation, InvitationError, InvitationRecord};
use crate::request::RequestError;
use crate::storage::StorageError;
use crate::trust::{AuthorityKind, PinStatus, PinnedIdentity, TrustError};
use crate::verifiable::{Badge, CredentialProof, ValidationResult};

/// `FlowError` is the error surfaced to the wallet UI
///
/// - [`FlowError::SecurityPinMismatch`] carries the pin store message verbatim and must be shown
///   as is, it's never retried
/// - [`FlowError::MalformedInvitation`] and [`FlowError::TransportFailure`] are recoverable, the
///   user may scan again or retry
/// - [`FlowError::ValidationFailure`] may be overridden by acknowledging the risk
#[derive(Debug, PartialEq, Error, Clone)]
pub enum FlowError {
    #[error("malformed invitation: {0}")]
    MalformedInvitation(String),

    #[error("validation failure: {0}")]
    ValidationFailure(String),

    #[error("{0}")]
    SecurityPinMismatch(String),

    #[error("transport failure: {0}")]
    TransportFailure(String),

    #[error("handshake rejected: {0}")]
    HandshakeRejected(String),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("decrypt error: {0}")]
    DecryptError(String),

    #[error("storage error: {0}")]
    StorageError(String),
}

impl FlowError {
    pub fn is_security(&self) -> bool {
        matches!(self, FlowError::SecurityPinMismatch(_))
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FlowError::MalformedInvitation(_)
                | FlowError::TransportFailure(_)
                | FlowError::ValidationFailure(_)
                | FlowError::MalformedRequest(_)
        )
    }
}

impl From<InvitationError> for FlowError {
    fn from(value: InvitationError) -> Self {
        match value {
            InvitationError::MalformedInvitation(msg) | InvitationError::BuildError(msg) => {
                FlowError::MalformedInvitation(msg)
            }
            InvitationError::InvalidTransition(msg) => FlowError::InvalidTransition(msg),
            InvitationError::StorageError(msg) => FlowError::StorageError(msg),
        }
    }
}

impl From<TrustError> for FlowError {
    fn from(value: TrustError) -> Self {
        match value {
            TrustError::SecurityPinMismatch { .. } => FlowError::SecurityPinMismatch(value.to_string()),
            TrustError::StorageError(msg) => FlowError::StorageError(msg),
            TrustError::ValidationError(msg) => FlowError::ValidationFailure(msg),
        }
    }
}

impl From<ConnectionError> for FlowError {
    fn from(value: ConnectionError) -> Self {
        match value {
            ConnectionError::TransportFailure(msg) | ConnectionError::RemoteAgentError(msg) => {
                FlowError::TransportFailure(msg)
            }
            ConnectionError::HandshakeRejected(msg) => FlowError::HandshakeRejected(msg),
            ConnectionError::ValidationError(msg) => FlowError::ValidationFailure(msg),
            ConnectionError::StorageError(msg) => FlowError::StorageError(msg),
            ConnectionError::InvitationError(msg) => FlowError::MalformedInvitation(msg),
        }
    }
}

impl From<RequestError> for FlowError {
    fn from(value: RequestError) -> Self {
        match value {
            RequestError::MalformedRequest(msg) => FlowError::MalformedRequest(msg),
            RequestError::ValidationError(msg) => FlowError::ValidationFailure(msg),
            RequestError::StorageError(msg) => FlowError::StorageError(msg),
        }
    }
}

impl From<StorageError> for FlowError {
    fn from(value: StorageError) -> Self {
        FlowError::StorageError(value.to_string())
    }
}

/// `FlowPolicy` holds the wallet level decisions the user can't change per invitation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowPolicy {
    /// whether an authority invitation whose credential isn't verified may still be accepted
    /// once the user acknowledged the risk
    pub allow_risk_override: bool,
}

impl Default for FlowPolicy {
    fn default() -> Self {
        Self {
            allow_risk_override: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CredentialPreview {
    pub attachment_id: String,
    pub kind: AttachmentKind,
    pub credential: CredentialProof,
    pub result: ValidationResult,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthorityPreview {
    pub kind: AuthorityKind,
    pub did: String,
    pub status: PinStatus,
    pub pinned: Option<PinnedIdentity>,
}

/// `InvitationPreview` is everything the user sees before deciding
#[derive(Debug, Clone, PartialEq)]
pub struct InvitationPreview {
    pub invitation: ClassifiedInvitation,
    pub record: Option<InvitationRecord>,
    pub credentials: Vec<CredentialPreview>,
    pub presentation_requests: Vec<Value>,
    pub authority: Option<AuthorityPreview>,
}

impl InvitationPreview {
    /// the first verified credential, `None` is the "no verified identity" default
    pub fn verified_identity(&self) -> Option<&CredentialPreview> {
        self.credentials
            .iter()
            .find(|preview| preview.result.badge == Badge::Verified)
    }

    pub fn authority_credential(&self) -> Option<&CredentialPreview> {
        self.credentials
            .iter()
            .find(|preview| matches!(preview.kind, AttachmentKind::AuthorityCredential(_)))
    }
}

/// `AcceptRequest` is the user's answer to an invitation
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptRequest {
    pub context: ExecutionContext,
    pub response: Option<CredentialResponse>,
    pub acknowledge_risk: bool,
}

impl AcceptRequest {
    pub fn local() -> Self {
        Self {
            context: ExecutionContext::Local,
            response: None,
            acknowledge_risk: false,
        }
    }

    pub fn remote() -> Self {
        Self {
            context: ExecutionContext::Remote,
            ..Self::local()
        }
    }

    pub fn with_response(mut self, response: CredentialResponse) -> Self {
        self.response = Some(response);
        self
    }

    pub fn acknowledge_risk(mut self) -> Self {
        self.acknowledge_risk = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AcceptOutcome {
    Established {
        pair: ConnectionPair,
        pinned: Option<PinnedIdentity>,
    },
    Rejected {
        reason: String,
    },
}

/// `InboundMessage` is a message as delivered by the transport, possibly still encrypted
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Plain(Value),
    Encrypted { ciphertext: Vec<u8>, key: Vec<u8> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use table_test::table_test;

    #[test]
    fn test_error_classification() {
        let table = vec![
            (FlowError::SecurityPinMismatch("x".to_string()), (true, false)),
            (FlowError::MalformedInvitation("x".to_string()), (false, true)),
            (FlowError::TransportFailure("x".to_string()), (false, true)),
            (FlowError::ValidationFailure("x".to_string()), (false, true)),
            (FlowError::HandshakeRejected("x".to_string()), (false, false)),
            (FlowError::StorageError("x".to_string()), (false, false)),
        ];

        for (validator, err, expected) in table_test!(table) {
            validator
                .given(&format!("{:?}", err))
                .when("classify")
                .then(&format!("{:?}", expected))
                .assert_eq(expected, (err.is_security(), err.is_recoverable()));
        }
    }

    #[test]
    fn test_pin_mismatch_is_verbatim() {
        let trust = TrustError::SecurityPinMismatch {
            kind: AuthorityKind::Company,
            pinned: "did:peer:xyz".to_string(),
            presented: "did:peer:abc".to_string(),
        };

        let message = trust.to_string();
        let flow: FlowError = trust.into();
        assert!(flow.is_security());
        assert_eq!(flow.to_string(), message)
    }
}

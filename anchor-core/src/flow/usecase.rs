use rst_common::standard::serde_json::{self, Value};
use rst_common::with_logging::log::{debug, info, warn};
use rst_common::with_tokio::tokio::sync::mpsc::UnboundedReceiver;

use crate::connection::{
    Clock, ConnectionError, ConnectionPair, ConnectionRepository, ConnectionRoute,
    ConnectionRouter, CreatedInvitation, ExecutionContext, InboundRelay, InvitationOptions,
    OutboundMessage, RemoteAgentBuilder, RetryPolicy, TransportBuilder,
};
use crate::context::WalletContext;
use crate::invitation::{
    AttachmentExtractor, AttachmentPayload, ClassifiedInvitation, FormatDetector,
    InvitationStateMachine, Role,
};
use crate::request::{Decision, Enqueued, PendingRequestQueue};
use crate::storage::{StorageBuilder, WalletID};
use crate::trust::{PinOutcome, TrustPinStore};
use crate::verifiable::{Badge, CredentialProof, ProofValidator, VerifierBuilder};

use super::types::{
    AcceptOutcome, AcceptRequest, AuthorityPreview, CredentialPreview, FlowError, FlowPolicy,
    InboundMessage, InvitationPreview,
};

/// `TrustFlow` drives an invitation from the scanned text to an established or rejected
/// connection, and inbound connection requests to a decision
///
/// Every collaborator comes from the [`WalletContext`]. The flow never holds state of its own,
/// everything it knows is read back from storage, so two flows over the same storage behave as
/// one
#[derive(Clone)]
pub struct TrustFlow<TStorage, TVerifier, TTransport, TRemote, TClock>
where
    TStorage: StorageBuilder,
    TVerifier: VerifierBuilder,
    TTransport: TransportBuilder,
    TRemote: RemoteAgentBuilder,
    TClock: Clock,
{
    transport: TTransport,
    verifier: TVerifier,
    validator: ProofValidator<TVerifier>,
    pins: TrustPinStore<TStorage, TVerifier>,
    machine: InvitationStateMachine<TStorage>,
    router: ConnectionRouter<TStorage, TTransport, TRemote, TClock>,
    queue: PendingRequestQueue<TStorage>,
    connections: ConnectionRepository<TStorage>,
    policy: FlowPolicy,
}

impl<TStorage, TVerifier, TTransport, TRemote, TClock>
    TrustFlow<TStorage, TVerifier, TTransport, TRemote, TClock>
where
    TStorage: StorageBuilder,
    TVerifier: VerifierBuilder,
    TTransport: TransportBuilder,
    TRemote: RemoteAgentBuilder,
    TClock: Clock,
{
    pub fn new(
        context: WalletContext<TStorage, TVerifier, TTransport, TRemote>,
        clock: TClock,
        retry: RetryPolicy,
    ) -> Self {
        let storage = context.storage();
        Self {
            transport: context.transport(),
            verifier: context.verifier(),
            validator: ProofValidator::new(context.verifier()),
            pins: TrustPinStore::new(storage.clone(), context.verifier()),
            machine: InvitationStateMachine::new(storage.clone()),
            router: ConnectionRouter::new(
                storage.clone(),
                context.transport(),
                context.remote(),
                clock,
                retry,
            ),
            queue: PendingRequestQueue::new(storage.clone()),
            connections: ConnectionRepository::new(storage),
            policy: FlowPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FlowPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// `preview` parses the invitation, validates its credentials and records that the user saw
    /// it
    ///
    /// An authority invitation presenting a DID different from the pinned one fails with
    /// [`FlowError::SecurityPinMismatch`] before any record is created or touched
    pub async fn preview(&self, wallet: &WalletID, raw: &str) -> Result<InvitationPreview, FlowError> {
        let classified = FormatDetector::detect(raw)?;
        let invitation = classified.invitation();

        let authority = match classified.authority() {
            Some(kind) => {
                let status = self.pins.enforce(wallet, kind, invitation.get_from()).await?;
                let pinned = self.pins.get_pinned(wallet, kind).await?;

                Some(AuthorityPreview {
                    kind,
                    did: invitation.get_from().to_string(),
                    status,
                    pinned,
                })
            }
            None => None,
        };

        let mut credentials = Vec::new();
        let mut presentation_requests = Vec::new();
        for attachment in AttachmentExtractor::extract(invitation) {
            match attachment.payload {
                AttachmentPayload::Credential(credential) => {
                    let result = self.validator.validate(&credential).await;
                    credentials.push(CredentialPreview {
                        attachment_id: attachment.id,
                        kind: attachment.kind,
                        credential,
                        result,
                    });
                }
                AttachmentPayload::PresentationRequest(request) => {
                    presentation_requests.push(request)
                }
            }
        }

        let _ = self
            .machine
            .create_received(wallet, invitation.to_owned())
            .await?;
        let _ = self.machine.mark_previewed(wallet, invitation.get_id()).await?;
        let record = self.machine.get(wallet, invitation.get_id()).await?;

        info!(
            "[flow:preview] invitation: {} | format: {:?} | credentials: {}",
            invitation.get_id(),
            classified.format(),
            credentials.len()
        );

        Ok(InvitationPreview {
            invitation: classified,
            record,
            credentials,
            presentation_requests,
            authority,
        })
    }

    /// `accept` connects to the invitation's originator
    ///
    /// - the pin is enforced again, a mismatch leaves the record untouched
    /// - a transport failure leaves the record at its request sent status, accepting again is
    ///   safe
    /// - a rejected handshake is terminal
    pub async fn accept(
        &self,
        wallet: &WalletID,
        raw: &str,
        own_did: &str,
        request: AcceptRequest,
    ) -> Result<AcceptOutcome, FlowError> {
        let classified = FormatDetector::detect(raw)?;
        let invitation = classified.invitation();
        let id = invitation.get_id().to_string();
        let authority = classified.authority();

        let authority_credential = match authority {
            Some(kind) => {
                self.pins.enforce(wallet, kind, invitation.get_from()).await?;
                let credential = AttachmentExtractor::authority_credential(invitation, kind);
                self.check_risk(&credential, &request).await?;
                credential
            }
            None => None,
        };

        let record = self
            .machine
            .create_received(wallet, invitation.to_owned())
            .await?;

        if record.get_status().is_terminal() {
            return Err(FlowError::InvalidTransition(format!(
                "invitation {} is already {:?}",
                id,
                record.get_status()
            )));
        }

        self.machine.mark_previewed(wallet, &id).await?;
        self.machine.mark_request_sent(wallet, &id).await?;

        let routed = self
            .router
            .connect(
                wallet,
                own_did,
                &classified,
                request.context,
                request.response.as_ref(),
            )
            .await;

        let outcome = match routed {
            Ok(outcome) => outcome,
            Err(ConnectionError::HandshakeRejected(reason)) => {
                self.machine.mark_rejected(wallet, &id).await?;
                info!("[flow:accept] invitation: {} | rejected: {}", id, reason);
                return Ok(AcceptOutcome::Rejected { reason });
            }
            Err(err) => {
                warn!("[flow:accept] invitation: {} | routing failed: {}", id, err);
                return Err(err.into());
            }
        };

        self.machine.mark_established(wallet, &id).await?;

        let pinned = match authority {
            Some(kind) => {
                let pinned = self
                    .pins
                    .pin_from_credential(
                        wallet,
                        kind,
                        invitation.get_from(),
                        authority_credential.as_ref(),
                    )
                    .await?;

                match pinned {
                    PinOutcome::Pinned(identity) | PinOutcome::AlreadyPinned(identity) => {
                        Some(identity)
                    }
                }
            }
            None => None,
        };

        info!(
            "[flow:accept] invitation: {} | connected: {} | new pair: {}",
            id,
            outcome.pair.get_remote_did(),
            outcome.created
        );

        Ok(AcceptOutcome::Established {
            pair: outcome.pair,
            pinned,
        })
    }

    /// `check_risk` gates an authority invitation whose credential isn't verified
    async fn check_risk(
        &self,
        credential: &Option<CredentialProof>,
        request: &AcceptRequest,
    ) -> Result<(), FlowError> {
        let badge = match credential {
            Some(credential) => self.validator.validate(credential).await.badge,
            None => Badge::Unverified,
        };

        if !badge.needs_warning() {
            return Ok(());
        }

        if !request.acknowledge_risk {
            return Err(FlowError::ValidationFailure(format!(
                "authority credential is {:?}, the risk must be acknowledged",
                badge
            )));
        }

        if !self.policy.allow_risk_override {
            return Err(FlowError::ValidationFailure(format!(
                "authority credential is {:?} and the wallet policy forbids overriding it",
                badge
            )));
        }

        warn!("[flow:accept] accepting {:?} authority credential at user's risk", badge);
        Ok(())
    }

    pub async fn reject(&self, wallet: &WalletID, invitation_id: &str) -> Result<bool, FlowError> {
        let rejected = self.machine.mark_rejected(wallet, invitation_id).await?;
        Ok(rejected)
    }

    /// `create_invitation` generates an invitation and starts tracking it as the inviter
    pub async fn create_invitation(
        &self,
        wallet: &WalletID,
        own_did: &str,
        context: ExecutionContext,
        options: &InvitationOptions,
    ) -> Result<CreatedInvitation, FlowError> {
        let created = self.router.create_invitation(own_did, context, options).await?;
        if let Some(invitation) = &created.invitation {
            let _ = self
                .machine
                .create_generated(wallet, invitation.to_owned())
                .await?;
        }

        Ok(created)
    }

    /// `subscribe_inbound` registers with the transport, inbound messages arrive on the returned
    /// channel and are meant to be passed to [`TrustFlow::receive_request`]
    pub async fn subscribe_inbound(&self) -> Result<UnboundedReceiver<Value>, FlowError> {
        let (relay, receiver) = InboundRelay::channel();
        self.transport.subscribe(Box::new(relay)).await?;
        Ok(receiver)
    }

    pub async fn receive_request(
        &self,
        wallet: &WalletID,
        message: InboundMessage,
        presentation: Option<InboundMessage>,
    ) -> Result<Enqueued, FlowError> {
        let message = self.open(message).await?;
        let presentation = match presentation {
            Some(presentation) => Some(self.open(presentation).await?),
            None => None,
        };

        let enqueued = self
            .queue
            .enqueue(wallet, message, presentation.as_ref())
            .await?;

        Ok(enqueued)
    }

    async fn open(&self, message: InboundMessage) -> Result<Value, FlowError> {
        match message {
            InboundMessage::Plain(value) => Ok(value),
            InboundMessage::Encrypted { ciphertext, key } => {
                let plaintext = self
                    .verifier
                    .decrypt(ciphertext, key)
                    .await
                    .map_err(|err| FlowError::DecryptError(err.to_string()))?;

                serde_json::from_slice::<Value>(&plaintext)
                    .map_err(|err| FlowError::MalformedRequest(err.to_string()))
            }
        }
    }

    /// `decide_request` answers an inbound request
    ///
    /// The reply is sent first, a transport failure leaves the request pending. Deciding an
    /// already decided request sends nothing
    pub async fn decide_request(
        &self,
        wallet: &WalletID,
        request_id: &str,
        own_did: &str,
        accept: bool,
        metadata: Option<Value>,
    ) -> Result<bool, FlowError> {
        let Some(record) = self.queue.get(wallet, request_id).await? else {
            return Ok(false);
        };

        if record.get_decision().is_terminal() {
            debug!("[flow:decide_request] request: {} | already decided", request_id);
            return Ok(true);
        }

        if let Some(sender) = record.get_sender_did() {
            let reply = OutboundMessage::connection_response(own_did, sender, request_id, accept);
            self.transport
                .send(reply)
                .await
                .map_err(|err| FlowError::TransportFailure(err.to_string()))?;
        }

        let outcome = match accept {
            true => Decision::Accepted,
            false => Decision::Rejected,
        };

        self.queue
            .handle_request(wallet, request_id, outcome, metadata)
            .await?;

        if let (true, Some(sender)) = (accept, record.get_sender_did()) {
            let pair = ConnectionPair::new(
                own_did,
                sender,
                ConnectionRoute::Handshake {
                    request_id: request_id.to_string(),
                },
            );

            let _ = self.connections.save_unique(wallet, pair).await?;
        }

        if let Some(invitation_id) = record.get_invitation_id() {
            self.advance_inviter(wallet, invitation_id, accept).await?;
        }

        info!("[flow:decide_request] request: {} | accepted: {}", request_id, accept);
        Ok(true)
    }

    /// `advance_inviter` moves this wallet's own invitation along with the decision on a request
    /// answering it. A multi use invitation may already be terminal, that's logged and skipped
    async fn advance_inviter(
        &self,
        wallet: &WalletID,
        invitation_id: &str,
        accept: bool,
    ) -> Result<(), FlowError> {
        let Some(record) = self.machine.get(wallet, invitation_id).await? else {
            return Ok(());
        };

        if record.get_role() != Role::Inviter {
            return Ok(());
        }

        let advanced = match accept {
            true => match self.machine.mark_request_sent(wallet, invitation_id).await {
                Ok(_) => self.machine.mark_established(wallet, invitation_id).await,
                Err(err) => Err(err),
            },
            false => self.machine.mark_rejected(wallet, invitation_id).await,
        };

        if let Err(err) = advanced {
            warn!("[flow:advance_inviter] invitation: {} | {}", invitation_id, err);
        }

        Ok(())
    }

    pub fn machine(&self) -> &InvitationStateMachine<TStorage> {
        &self.machine
    }

    pub fn pins(&self) -> &TrustPinStore<TStorage, TVerifier> {
        &self.pins
    }

    pub fn queue(&self) -> &PendingRequestQueue<TStorage> {
        &self.queue
    }

    pub fn router(&self) -> &ConnectionRouter<TStorage, TTransport, TRemote, TClock> {
        &self.router
    }

    /// `classify` exposes detection alone, nothing is recorded
    pub fn classify(raw: &str) -> Result<ClassifiedInvitation, FlowError> {
        let classified = FormatDetector::detect(raw)?;
        Ok(classified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;

    use rst_common::standard::async_trait::async_trait;
    use rst_common::standard::serde_json::json;
    use rst_common::with_tokio::tokio;

    use crate::connection::retry::tests::FakeClock;
    use crate::connection::{
        MessageHandler, RemoteAcceptance, RemoteInvitation, TransportConnection, TransportState,
    };
    use crate::invitation::{InvitationBuilder, Status};
    use crate::request::Decision;
    use crate::storage::MemoryStorage;
    use crate::trust::{AuthorityKind, PinStatus, PinnedIdentity};
    use crate::verifiable::{VerifiableError, Verification};

    mock!(
        FakeVerifier{}

        impl Clone for FakeVerifier {
            fn clone(&self) -> Self;
        }

        #[async_trait]
        impl VerifierBuilder for FakeVerifier {
            async fn verify(&self, proof: &CredentialProof) -> Result<Verification, VerifiableError>;
            async fn decrypt(&self, ciphertext: Vec<u8>, key: Vec<u8>) -> Result<Vec<u8>, VerifiableError>;
            async fn hash(&self, bytes: Vec<u8>) -> Result<String, VerifiableError>;
        }
    );

    mock!(
        FakeTransport{}

        impl Clone for FakeTransport {
            fn clone(&self) -> Self;
        }

        #[async_trait]
        impl TransportBuilder for FakeTransport {
            async fn send(&self, message: OutboundMessage) -> Result<(), ConnectionError>;
            async fn subscribe(&self, handler: Box<dyn MessageHandler>) -> Result<(), ConnectionError>;
            async fn list_connections(&self) -> Result<Vec<TransportConnection>, ConnectionError>;
        }
    );

    mock!(
        FakeRemote{}

        impl Clone for FakeRemote {
            fn clone(&self) -> Self;
        }

        #[async_trait]
        impl RemoteAgentBuilder for FakeRemote {
            async fn accept_invitation(&self, url: String) -> Result<RemoteAcceptance, ConnectionError>;
            async fn create_invitation(&self, label: String) -> Result<RemoteInvitation, ConnectionError>;
        }
    );

    type Flow = TrustFlow<MemoryStorage, MockFakeVerifier, MockFakeTransport, MockFakeRemote, FakeClock>;

    const OWN_DID: &str = "did:peer:2.bob";
    const CA_DID: &str = "did:peer:2.ca";

    fn wallet() -> WalletID {
        WalletID::new("wallet-1")
    }

    /// signed proofs verify, unsigned ones don't
    fn verifier() -> MockFakeVerifier {
        let mut mock = MockFakeVerifier::new();
        mock.expect_verify()
            .returning(|proof: &CredentialProof| match proof.get_signature() {
                Some(_) => Ok(Verification::valid("did:peer:issuer")),
                None => Ok(Verification::invalid(Vec::new())),
            });
        mock.expect_decrypt().returning(|ciphertext, _| Ok(ciphertext));
        mock.expect_hash().returning(|_| Ok("hash-1".to_string()));
        mock.expect_clone().returning(verifier);
        mock
    }

    fn hash_offline() -> MockFakeVerifier {
        let mut mock = MockFakeVerifier::new();
        mock.expect_verify()
            .returning(|_| Ok(Verification::valid("did:peer:issuer")));
        mock.expect_hash()
            .returning(|_| Err(VerifiableError::HashError("hsm offline".to_string())));
        mock.expect_clone().returning(hash_offline);
        mock
    }

    /// every counterpart is connected right away
    fn online() -> MockFakeTransport {
        let mut mock = MockFakeTransport::new();
        mock.expect_send().returning(|_| Ok(()));
        mock.expect_subscribe().returning(|_| Ok(()));
        mock.expect_list_connections().returning(|| {
            Ok(vec![TransportConnection {
                local_did: OWN_DID.to_string(),
                remote_did: CA_DID.to_string(),
                state: TransportState::Active,
            }])
        });
        mock.expect_clone().returning(online);
        mock
    }

    fn offline() -> MockFakeTransport {
        let mut mock = MockFakeTransport::new();
        mock.expect_send()
            .returning(|_| Err(ConnectionError::TransportFailure("offline".to_string())));
        mock.expect_list_connections().returning(|| Ok(Vec::new()));
        mock.expect_clone().returning(offline);
        mock
    }

    fn remote() -> MockFakeRemote {
        let mut mock = MockFakeRemote::new();
        mock.expect_clone().returning(remote);
        mock
    }

    fn flow(storage: MemoryStorage, transport: fn() -> MockFakeTransport) -> Flow {
        let context = WalletContext::new(storage, verifier(), transport(), remote());
        TrustFlow::new(context, FakeClock::default(), RetryPolicy::default())
    }

    fn ca_credential(signed: bool) -> CredentialProof {
        let proof = CredentialProof::new(vec!["VerifiableCredential".to_string()], "did:peer:issuer")
            .with_claim("name", json!("Acme CA"))
            .with_claim("jurisdiction", json!("ID"));

        match signed {
            true => proof.with_signature(json!({"type": "Ed25519Signature2020"})),
            false => proof,
        }
    }

    fn ca_invitation(from: &str, signed: bool) -> String {
        InvitationBuilder::new(from)
            .id("inv-ca")
            .label("Acme CA")
            .goal("ca-identity-verification", "verify the certification authority")
            .attach_credential("ca-authority-credential", &ca_credential(signed))
            .to_value()
            .to_string()
    }

    #[tokio::test]
    async fn test_preview_authority_invitation() {
        let flow = flow(MemoryStorage::new(), online);
        let preview = flow.preview(&wallet(), &ca_invitation(CA_DID, true)).await;
        assert!(!preview.is_err());

        let preview = preview.unwrap();
        assert_eq!(preview.record.as_ref().map(|record| record.get_status()), Some(Status::Previewed));
        assert_eq!(preview.credentials.len(), 1);
        assert!(preview.verified_identity().is_some());

        let authority = preview.authority.unwrap();
        assert_eq!(authority.kind, AuthorityKind::Ca);
        assert_eq!(authority.status, PinStatus::Unpinned);
        assert!(authority.pinned.is_none())
    }

    #[tokio::test]
    async fn test_preview_malformed_creates_nothing() {
        let storage = MemoryStorage::new();
        let flow = flow(storage.clone(), online);

        let preview = flow.preview(&wallet(), "not an invitation").await;
        assert!(matches!(preview, Err(FlowError::MalformedInvitation(_))));
        assert!(storage.is_empty().await)
    }

    #[tokio::test]
    async fn test_accept_pins_authority() {
        let flow = flow(MemoryStorage::new(), online);
        let raw = ca_invitation(CA_DID, true);

        let outcome = flow
            .accept(&wallet(), &raw, OWN_DID, AcceptRequest::local())
            .await
            .unwrap();

        let AcceptOutcome::Established { pair, pinned } = outcome else {
            panic!("expected an established connection")
        };

        assert_eq!(pair.get_remote_did(), CA_DID);
        let pinned = pinned.unwrap();
        assert_eq!(pinned.get_did(), CA_DID);
        assert_eq!(pinned.get_display_name(), Some("Acme CA"));

        let record = flow.machine().get(&wallet(), "inv-ca").await.unwrap().unwrap();
        assert_eq!(record.get_status(), Status::Established)
    }

    #[tokio::test]
    async fn test_accept_pins_authority_when_hash_fails() {
        let context = WalletContext::new(MemoryStorage::new(), hash_offline(), online(), remote());
        let flow: Flow = TrustFlow::new(context, FakeClock::default(), RetryPolicy::default());

        let outcome = flow
            .accept(&wallet(), &ca_invitation(CA_DID, true), OWN_DID, AcceptRequest::local())
            .await;

        let Ok(AcceptOutcome::Established { pinned, .. }) = outcome else {
            panic!("expected an established connection")
        };
        let pinned = pinned.unwrap();
        assert_eq!(pinned.get_did(), CA_DID);
        assert_eq!(pinned.get_credential_hash(), None);
        assert_eq!(flow.pins().is_pinned(&wallet(), AuthorityKind::Ca).await, Ok(true));

        let substituted = flow
            .accept(
                &wallet(),
                &ca_invitation("did:peer:2.mallory", true),
                OWN_DID,
                AcceptRequest::local(),
            )
            .await;
        assert!(matches!(substituted, Err(FlowError::SecurityPinMismatch(_))))
    }

    #[tokio::test]
    async fn test_accept_refuses_substituted_authority() {
        let storage = MemoryStorage::new();
        let flow = flow(storage, online);
        let _ = flow
            .pins()
            .pin(&wallet(), PinnedIdentity::new(AuthorityKind::Ca, "did:peer:2.original"))
            .await;

        let preview = flow.preview(&wallet(), &ca_invitation(CA_DID, true)).await;
        assert!(matches!(&preview, Err(err) if err.is_security()));

        let accepted = flow
            .accept(&wallet(), &ca_invitation(CA_DID, true), OWN_DID, AcceptRequest::local())
            .await;
        assert!(matches!(accepted, Err(FlowError::SecurityPinMismatch(_))));

        let accepted = flow
            .accept(
                &wallet(),
                &ca_invitation(CA_DID, true),
                OWN_DID,
                AcceptRequest::local().acknowledge_risk(),
            )
            .await;
        assert!(matches!(accepted, Err(FlowError::SecurityPinMismatch(_))));
        assert!(flow.machine().get(&wallet(), "inv-ca").await.unwrap().is_none())
    }

    #[tokio::test]
    async fn test_replayed_invitation_with_other_did_keeps_record() {
        let flow = flow(MemoryStorage::new(), online);
        let _ = flow
            .pins()
            .pin(&wallet(), PinnedIdentity::new(AuthorityKind::Ca, CA_DID))
            .await;

        let preview = flow.preview(&wallet(), &ca_invitation(CA_DID, true)).await.unwrap();
        assert_eq!(preview.authority.map(|authority| authority.status), Some(PinStatus::Match));

        let replayed = flow
            .accept(
                &wallet(),
                &ca_invitation("did:peer:2.impostor", true),
                OWN_DID,
                AcceptRequest::local(),
            )
            .await;
        assert!(matches!(replayed, Err(FlowError::SecurityPinMismatch(_))));

        let record = flow.machine().get(&wallet(), "inv-ca").await.unwrap().unwrap();
        assert_eq!(record.get_status(), Status::Previewed);
        assert!(!record.get_status().is_terminal())
    }

    #[tokio::test]
    async fn test_unverified_authority_needs_acknowledged_risk() {
        let flow = flow(MemoryStorage::new(), online);
        let raw = ca_invitation(CA_DID, false);

        let refused = flow
            .accept(&wallet(), &raw, OWN_DID, AcceptRequest::local())
            .await;
        assert!(matches!(refused, Err(FlowError::ValidationFailure(_))));

        let accepted = flow
            .accept(&wallet(), &raw, OWN_DID, AcceptRequest::local().acknowledge_risk())
            .await;
        assert!(matches!(accepted, Ok(AcceptOutcome::Established { .. })))
    }

    #[tokio::test]
    async fn test_policy_forbids_risk_override() {
        let flow = flow(MemoryStorage::new(), online).with_policy(FlowPolicy {
            allow_risk_override: false,
        });

        let accepted = flow
            .accept(
                &wallet(),
                &ca_invitation(CA_DID, false),
                OWN_DID,
                AcceptRequest::local().acknowledge_risk(),
            )
            .await;
        assert!(matches!(accepted, Err(FlowError::ValidationFailure(_))))
    }

    #[tokio::test]
    async fn test_transport_failure_is_retryable() {
        let storage = MemoryStorage::new();
        let raw = ca_invitation(CA_DID, true);

        let failing = flow(storage.clone(), offline);
        let accepted = failing
            .accept(&wallet(), &raw, OWN_DID, AcceptRequest::local())
            .await;
        assert!(matches!(&accepted, Err(err) if err.is_recoverable()));

        let record = failing.machine().get(&wallet(), "inv-ca").await.unwrap().unwrap();
        assert_eq!(record.get_status(), Status::ConnectionRequestSent);

        let working = flow(storage, online);
        let accepted = working
            .accept(&wallet(), &raw, OWN_DID, AcceptRequest::local())
            .await;
        assert!(matches!(accepted, Ok(AcceptOutcome::Established { .. })))
    }

    #[tokio::test]
    async fn test_rejected_invitation_is_terminal() {
        let flow = flow(MemoryStorage::new(), online);
        let raw = ca_invitation(CA_DID, true);
        let _ = flow.preview(&wallet(), &raw).await;

        assert_eq!(flow.reject(&wallet(), "inv-ca").await, Ok(true));
        assert_eq!(flow.reject(&wallet(), "unknown").await, Ok(false));

        let accepted = flow
            .accept(&wallet(), &raw, OWN_DID, AcceptRequest::local())
            .await;
        assert!(matches!(accepted, Err(FlowError::InvalidTransition(_))))
    }

    #[tokio::test]
    async fn test_encrypted_request_is_decrypted() {
        let flow = flow(MemoryStorage::new(), online);
        let message = json!({"id": "req-1", "from": "did:peer:2.carol"});
        let ciphertext = message.to_string().into_bytes();

        let enqueued = flow
            .receive_request(
                &wallet(),
                InboundMessage::Encrypted {
                    ciphertext,
                    key: b"key".to_vec(),
                },
                None,
            )
            .await;
        assert!(matches!(enqueued, Ok(Enqueued::Added(_))));

        let garbage = flow
            .receive_request(
                &wallet(),
                InboundMessage::Encrypted {
                    ciphertext: b"not json".to_vec(),
                    key: b"key".to_vec(),
                },
                None,
            )
            .await;
        assert!(matches!(garbage, Err(FlowError::MalformedRequest(_))))
    }

    #[tokio::test]
    async fn test_decide_request_keeps_pending_on_transport_failure() {
        let storage = MemoryStorage::new();
        let message = json!({"id": "req-1", "from": "did:peer:2.carol"});

        let failing = flow(storage.clone(), offline);
        let _ = failing
            .receive_request(&wallet(), InboundMessage::Plain(message), None)
            .await;

        let decided = failing
            .decide_request(&wallet(), "req-1", OWN_DID, true, None)
            .await;
        assert!(matches!(decided, Err(FlowError::TransportFailure(_))));
        assert_eq!(failing.queue().list_pending(&wallet()).await.unwrap().len(), 1);

        let working = flow(storage, online);
        let decided = working
            .decide_request(&wallet(), "req-1", OWN_DID, true, None)
            .await;
        assert_eq!(decided, Ok(true));

        let record = working.queue().get(&wallet(), "req-1").await.unwrap().unwrap();
        assert_eq!(record.get_decision(), Decision::Accepted);

        let connections = working.router().list_connections(&wallet()).await.unwrap();
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].get_remote_did(), "did:peer:2.carol")
    }

    #[tokio::test]
    async fn test_request_answering_own_invitation_establishes_it() {
        let flow = flow(MemoryStorage::new(), online);
        let created = flow
            .create_invitation(
                &wallet(),
                OWN_DID,
                ExecutionContext::Local,
                &InvitationOptions {
                    label: "Bob".to_string(),
                    base_url: "https://wallet.example/invite".to_string(),
                    ..InvitationOptions::default()
                },
            )
            .await
            .unwrap();

        let invitation_id = created.invitation.unwrap().get_id().to_string();
        let message = json!({"id": "req-1", "from": "did:peer:2.carol", "pthid": invitation_id});
        let _ = flow
            .receive_request(&wallet(), InboundMessage::Plain(message), None)
            .await;

        assert_eq!(
            flow.decide_request(&wallet(), "req-1", OWN_DID, true, None).await,
            Ok(true)
        );

        let record = flow.machine().get(&wallet(), &invitation_id).await.unwrap().unwrap();
        assert_eq!(record.get_status(), Status::Established)
    }

    #[tokio::test]
    async fn test_subscribe_inbound() {
        let flow = flow(MemoryStorage::new(), online);
        assert!(flow.subscribe_inbound().await.is_ok())
    }
}

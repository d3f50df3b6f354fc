use rst_common::with_logging::log::{debug, info, warn};

use crate::invitation::{ClassifiedInvitation, FormatDetector, Invitation, InvitationBuilder};
use crate::storage::{StorageBuilder, WalletID};
use crate::verifiable::CredentialProof;

use super::repository::ConnectionRepository;
use super::retry::{retry, Attempt, Clock, RetryError, RetryPolicy};
use super::types::{
    ConnectionError, ConnectionPair, ConnectionRoute, ExecutionContext, OutboundMessage,
    RemoteAgentBuilder, TransportBuilder, TransportConnection, TransportState,
};

const REMOTE_REJECTED_STATES: [&str; 3] = ["rejected", "abandoned", "error"];

/// `CredentialResponse` is the credential the user selected to answer an invitation with, and
/// the claim fields they agreed to reveal
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialResponse {
    credential: CredentialProof,
    fields: Vec<String>,
}

impl CredentialResponse {
    pub fn new(credential: CredentialProof, fields: Vec<String>) -> Self {
        Self { credential, fields }
    }

    /// the proof as it leaves the wallet, undisclosed claims removed
    pub fn disclosed(&self) -> CredentialProof {
        self.credential.disclose(&self.fields)
    }

    pub fn get_fields(&self) -> &[String] {
        &self.fields
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteOutcome {
    pub pair: ConnectionPair,

    /// false when the same DID pair was already connected
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedInvitation {
    pub url: String,
    pub invitation: Option<Invitation>,
    pub connection_id: Option<String>,
}

/// `InvitationOptions` describes an invitation this wallet generates
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InvitationOptions {
    pub label: String,
    pub goal_code: Option<String>,
    pub goal: Option<String>,
    pub base_url: String,
}

/// `ConnectionRouter` runs the connection for a classified invitation in the chosen
/// [`ExecutionContext`]
///
/// - a raw peer DID is linked directly, there is no handshake
/// - `Local` sends a connection request through the transport and polls
///   [`TransportBuilder::list_connections`] until the counterpart shows up, bounded by
///   [`RetryPolicy`]
/// - `Remote` delegates to the cloud agent, which never receives a credential
#[derive(Clone)]
pub struct ConnectionRouter<TStorage, TTransport, TRemote, TClock>
where
    TStorage: StorageBuilder,
    TTransport: TransportBuilder,
    TRemote: RemoteAgentBuilder,
    TClock: Clock,
{
    repo: ConnectionRepository<TStorage>,
    transport: TTransport,
    remote: TRemote,
    clock: TClock,
    policy: RetryPolicy,
}

impl<TStorage, TTransport, TRemote, TClock> ConnectionRouter<TStorage, TTransport, TRemote, TClock>
where
    TStorage: StorageBuilder,
    TTransport: TransportBuilder,
    TRemote: RemoteAgentBuilder,
    TClock: Clock,
{
    pub fn new(
        storage: TStorage,
        transport: TTransport,
        remote: TRemote,
        clock: TClock,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            repo: ConnectionRepository::new(storage),
            transport,
            remote,
            clock,
            policy,
        }
    }

    pub async fn connect(
        &self,
        wallet: &WalletID,
        own_did: &str,
        classified: &ClassifiedInvitation,
        context: ExecutionContext,
        response: Option<&CredentialResponse>,
    ) -> Result<RouteOutcome, ConnectionError> {
        debug!(
            "[router:connect] invitation: {} | format: {:?} | context: {:?}",
            classified.invitation().get_id(),
            classified.format(),
            context
        );

        match (classified, context) {
            (ClassifiedInvitation::RawIdentifier(invitation), ExecutionContext::Local) => {
                self.link(wallet, own_did, invitation).await
            }
            (ClassifiedInvitation::RawIdentifier(_), ExecutionContext::Remote) => {
                Err(ConnectionError::ValidationError(
                    "a raw peer identifier can't be delegated to the remote agent".to_string(),
                ))
            }
            (_, ExecutionContext::Local) => {
                self.handshake(wallet, own_did, classified.invitation(), response)
                    .await
            }
            (_, ExecutionContext::Remote) => match response {
                Some(_) => Err(ConnectionError::ValidationError(
                    "credentials are never forwarded to the remote agent".to_string(),
                )),
                None => self.delegate(wallet, own_did, classified.invitation()).await,
            },
        }
    }

    async fn link(
        &self,
        wallet: &WalletID,
        own_did: &str,
        invitation: &Invitation,
    ) -> Result<RouteOutcome, ConnectionError> {
        let pair = ConnectionPair::new(own_did, invitation.get_from(), ConnectionRoute::DirectLink);
        self.persist(wallet, pair).await
    }

    async fn handshake(
        &self,
        wallet: &WalletID,
        own_did: &str,
        invitation: &Invitation,
        response: Option<&CredentialResponse>,
    ) -> Result<RouteOutcome, ConnectionError> {
        let disclosed = response.map(CredentialResponse::disclosed);
        let message = OutboundMessage::connection_request(own_did, invitation, disclosed.as_ref());
        let request_id = message.id.clone();

        self.transport
            .send(message)
            .await
            .map_err(|err| ConnectionError::TransportFailure(err.to_string()))?;

        info!("[router:handshake] request sent: {} | to: {}", request_id, invitation.get_from());

        let counterpart = invitation.get_from().to_string();
        let confirmed = retry(&self.policy, &self.clock, |attempt| {
            let transport = self.transport.clone();
            let counterpart = counterpart.clone();

            async move { Self::poll(&transport, &counterpart, attempt).await }
        })
        .await;

        match confirmed {
            Ok(connection) => {
                let pair = ConnectionPair::new(
                    own_did,
                    connection.remote_did,
                    ConnectionRoute::Handshake { request_id },
                );

                self.persist(wallet, pair).await
            }
            Err(RetryError::Aborted(err)) => Err(err),
            Err(RetryError::Timeout { attempts }) => Err(ConnectionError::TransportFailure(format!(
                "{} not connected after {} attempts",
                counterpart, attempts
            ))),
        }
    }

    async fn poll(
        transport: &TTransport,
        counterpart: &str,
        attempt: u32,
    ) -> Attempt<TransportConnection, ConnectionError> {
        let connections = match transport.list_connections().await {
            Ok(connections) => connections,
            Err(err) => {
                warn!("[router:poll] attempt: {} | list connections failed: {}", attempt, err);
                return Attempt::Pending;
            }
        };

        let found = connections
            .into_iter()
            .find(|connection| connection.remote_did == counterpart);

        match found {
            Some(connection) if connection.state == TransportState::Active => {
                Attempt::Ready(connection)
            }
            Some(connection) if connection.state == TransportState::Rejected => {
                Attempt::Abort(ConnectionError::HandshakeRejected(format!(
                    "{} rejected the connection request",
                    connection.remote_did
                )))
            }
            _ => Attempt::Pending,
        }
    }

    async fn delegate(
        &self,
        wallet: &WalletID,
        own_did: &str,
        invitation: &Invitation,
    ) -> Result<RouteOutcome, ConnectionError> {
        let acceptance = self
            .remote
            .accept_invitation(invitation.get_raw().to_string())
            .await?;

        if REMOTE_REJECTED_STATES.contains(&acceptance.state.to_lowercase().as_str()) {
            return Err(ConnectionError::HandshakeRejected(format!(
                "remote agent connection {} is {}",
                acceptance.connection_id, acceptance.state
            )));
        }

        info!(
            "[router:delegate] remote connection: {} | state: {}",
            acceptance.connection_id, acceptance.state
        );

        let remote_did = acceptance
            .remote_did
            .unwrap_or(invitation.get_from().to_string());

        let pair = ConnectionPair::new(
            own_did,
            remote_did,
            ConnectionRoute::RemoteAgent {
                connection_id: acceptance.connection_id,
            },
        );

        self.persist(wallet, pair).await
    }

    async fn persist(
        &self,
        wallet: &WalletID,
        pair: ConnectionPair,
    ) -> Result<RouteOutcome, ConnectionError> {
        let (pair, created) = self.repo.save_unique(wallet, pair).await?;
        Ok(RouteOutcome { pair, created })
    }

    /// `create_invitation` generates an invitation in the chosen context
    ///
    /// The remote agent's URL is parsed back when possible so the inviter can track it, an
    /// unparsable URL is still returned to the caller
    pub async fn create_invitation(
        &self,
        own_did: &str,
        context: ExecutionContext,
        options: &InvitationOptions,
    ) -> Result<CreatedInvitation, ConnectionError> {
        match context {
            ExecutionContext::Local => {
                let mut builder = InvitationBuilder::new(own_did).label(options.label.to_owned());
                if let Some(goal_code) = &options.goal_code {
                    builder = builder.goal(
                        goal_code.to_owned(),
                        options.goal.to_owned().unwrap_or_default(),
                    );
                }

                let classified = builder
                    .build(&options.base_url)
                    .map_err(|err| ConnectionError::InvitationError(err.to_string()))?;

                let invitation = classified.into_invitation();
                Ok(CreatedInvitation {
                    url: invitation.get_raw().to_string(),
                    invitation: Some(invitation),
                    connection_id: None,
                })
            }
            ExecutionContext::Remote => {
                let created = self.remote.create_invitation(options.label.to_owned()).await?;
                let invitation = FormatDetector::detect(&created.invitation_url)
                    .map(ClassifiedInvitation::into_invitation)
                    .map_err(|err| {
                        warn!("[router:create_invitation] remote invitation not parsable: {}", err);
                        err
                    })
                    .ok();

                Ok(CreatedInvitation {
                    url: created.invitation_url,
                    invitation,
                    connection_id: Some(created.connection_id),
                })
            }
        }
    }

    pub async fn list_connections(
        &self,
        wallet: &WalletID,
    ) -> Result<Vec<ConnectionPair>, ConnectionError> {
        self.repo.list(wallet).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use mockall::predicate::*;

    use rst_common::standard::async_trait::async_trait;
    use rst_common::standard::serde_json::json;
    use rst_common::with_tokio::tokio;

    use crate::connection::retry::tests::FakeClock;
    use crate::connection::types::{MessageHandler, RemoteAcceptance, RemoteInvitation};
    use crate::storage::MemoryStorage;

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

    const OWN_DID: &str = "did:peer:2.bob";

    fn wallet() -> WalletID {
        WalletID::new("wallet-1")
    }

    fn standard() -> ClassifiedInvitation {
        FormatDetector::detect(
            r#"{"type":"https://didcomm.org/out-of-band/2.0/invitation","id":"inv-1","from":"did:peer:2.alice"}"#,
        )
        .unwrap()
    }

    fn connection(state: TransportState) -> TransportConnection {
        TransportConnection {
            local_did: OWN_DID.to_string(),
            remote_did: "did:peer:2.alice".to_string(),
            state,
        }
    }

    /// the transport mock is cloned for every poll, each clone answers with the next state
    fn transport_answering(states: Vec<Option<TransportState>>, send_ok: bool) -> MockFakeTransport {
        let mut transport = MockFakeTransport::new();
        transport.expect_send().times(1).returning(move |_| match send_ok {
            true => Ok(()),
            false => Err(ConnectionError::TransportFailure("offline".to_string())),
        });

        let mut states = states.into_iter();
        transport.expect_clone().returning(move || {
            let state = states.next().flatten();
            let mut clone = MockFakeTransport::new();
            clone.expect_list_connections().returning(move || {
                Ok(state.map(|state| vec![connection(state)]).unwrap_or_default())
            });
            clone
        });

        transport
    }

    fn router(
        storage: MemoryStorage,
        transport: MockFakeTransport,
        remote: MockFakeRemote,
        clock: FakeClock,
    ) -> ConnectionRouter<MemoryStorage, MockFakeTransport, MockFakeRemote, FakeClock> {
        ConnectionRouter::new(storage, transport, remote, clock, RetryPolicy::default())
    }

    #[tokio::test]
    async fn test_raw_identifier_links_directly() {
        let router = router(
            MemoryStorage::new(),
            MockFakeTransport::new(),
            MockFakeRemote::new(),
            FakeClock::default(),
        );

        let classified = FormatDetector::detect("did:peer:2.carol").unwrap();
        let outcome = router
            .connect(&wallet(), OWN_DID, &classified, ExecutionContext::Local, None)
            .await;

        assert!(!outcome.is_err());
        let outcome = outcome.unwrap();
        assert!(outcome.created);
        assert_eq!(outcome.pair.get_remote_did(), "did:peer:2.carol");
        assert_eq!(outcome.pair.get_route(), &ConnectionRoute::DirectLink)
    }

    #[tokio::test]
    async fn test_local_handshake_polls_until_active() {
        let clock = FakeClock::default();
        let transport = transport_answering(
            vec![None, Some(TransportState::Pending), Some(TransportState::Active)],
            true,
        );

        let storage = MemoryStorage::new();
        let router = router(storage, transport, MockFakeRemote::new(), clock.clone());
        let outcome = router
            .connect(&wallet(), OWN_DID, &standard(), ExecutionContext::Local, None)
            .await
            .unwrap();

        assert_eq!(outcome.pair.get_remote_did(), "did:peer:2.alice");
        assert!(matches!(outcome.pair.get_route(), ConnectionRoute::Handshake { .. }));
        assert_eq!(clock.slept().len(), 2);
        assert_eq!(router.list_connections(&wallet()).await.unwrap().len(), 1)
    }

    #[tokio::test]
    async fn test_local_handshake_rejected() {
        let transport = transport_answering(vec![Some(TransportState::Rejected)], true);
        let router = router(MemoryStorage::new(), transport, MockFakeRemote::new(), FakeClock::default());

        let outcome = router
            .connect(&wallet(), OWN_DID, &standard(), ExecutionContext::Local, None)
            .await;

        assert!(matches!(outcome, Err(ConnectionError::HandshakeRejected(_))))
    }

    #[tokio::test]
    async fn test_local_handshake_times_out() {
        let clock = FakeClock::default();
        let transport = transport_answering(vec![], true);
        let router = router(MemoryStorage::new(), transport, MockFakeRemote::new(), clock.clone());

        let outcome = router
            .connect(&wallet(), OWN_DID, &standard(), ExecutionContext::Local, None)
            .await;

        assert!(matches!(outcome, Err(ConnectionError::TransportFailure(_))));
        assert_eq!(clock.slept().len(), 9);
        assert!(router.list_connections(&wallet()).await.unwrap().is_empty())
    }

    #[tokio::test]
    async fn test_send_failure_is_transport_failure() {
        let transport = transport_answering(vec![], false);
        let router = router(MemoryStorage::new(), transport, MockFakeRemote::new(), FakeClock::default());

        let outcome = router
            .connect(&wallet(), OWN_DID, &standard(), ExecutionContext::Local, None)
            .await;

        assert!(matches!(outcome, Err(ConnectionError::TransportFailure(_))))
    }

    #[tokio::test]
    async fn test_remote_delegates_with_raw_url() {
        let classified = standard();
        let raw = classified.invitation().get_raw().to_string();

        let mut remote = MockFakeRemote::new();
        remote
            .expect_accept_invitation()
            .with(eq(raw))
            .times(1)
            .returning(|_| {
                Ok(RemoteAcceptance {
                    connection_id: "conn-1".to_string(),
                    remote_did: None,
                    state: "completed".to_string(),
                })
            });

        let router = router(MemoryStorage::new(), MockFakeTransport::new(), remote, FakeClock::default());
        let outcome = router
            .connect(&wallet(), OWN_DID, &classified, ExecutionContext::Remote, None)
            .await
            .unwrap();

        assert_eq!(
            outcome.pair.get_route(),
            &ConnectionRoute::RemoteAgent {
                connection_id: "conn-1".to_string()
            }
        );
        assert_eq!(outcome.pair.get_remote_did(), "did:peer:2.alice")
    }

    #[tokio::test]
    async fn test_remote_never_receives_credentials() {
        let mut remote = MockFakeRemote::new();
        remote.expect_accept_invitation().times(0);

        let router = router(MemoryStorage::new(), MockFakeTransport::new(), remote, FakeClock::default());
        let response = CredentialResponse::new(
            CredentialProof::new(vec!["VerifiableCredential".to_string()], "did:peer:issuer")
                .with_claim("name", json!("Bob")),
            vec!["name".to_string()],
        );

        let outcome = router
            .connect(&wallet(), OWN_DID, &standard(), ExecutionContext::Remote, Some(&response))
            .await;

        assert!(matches!(outcome, Err(ConnectionError::ValidationError(_))))
    }

    #[tokio::test]
    async fn test_create_invitation_local_and_remote() {
        let mut remote = MockFakeRemote::new();
        remote
            .expect_create_invitation()
            .with(eq("Bob".to_string()))
            .times(1)
            .returning(|_| {
                Ok(RemoteInvitation {
                    invitation_url: "https://agent.example?oob=not-json".to_string(),
                    connection_id: "conn-2".to_string(),
                })
            });

        let router = router(MemoryStorage::new(), MockFakeTransport::new(), remote, FakeClock::default());
        let options = InvitationOptions {
            label: "Bob".to_string(),
            base_url: "https://wallet.example/invite".to_string(),
            ..Default::default()
        };

        let local = router
            .create_invitation(OWN_DID, ExecutionContext::Local, &options)
            .await
            .unwrap();
        assert!(local.url.starts_with("https://wallet.example/invite?oob="));
        assert_eq!(local.invitation.unwrap().get_from(), OWN_DID);

        let remote = router
            .create_invitation(OWN_DID, ExecutionContext::Remote, &options)
            .await
            .unwrap();
        assert!(remote.invitation.is_none());
        assert_eq!(remote.connection_id, Some("conn-2".to_string()))
    }
}

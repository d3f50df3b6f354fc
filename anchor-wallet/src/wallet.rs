use rst_common::with_logging::log::info;
use rstdev_storage::engine::rocksdb::db::DB;

use prople_anchor_core::connection::{
    Clock, ConnectionRepository, RemoteAgentBuilder, RetryPolicy, TokioClock, TransportBuilder,
};
use prople_anchor_core::context::WalletContext;
use prople_anchor_core::flow::TrustFlow;
use prople_anchor_core::invitation::InvitationStateMachine;
use prople_anchor_core::request::PendingRequestQueue;
use prople_anchor_core::storage::WalletID;
use prople_anchor_core::trust::TrustPinStore;
use prople_anchor_core::verifiable::{ProofValidator, VerifierBuilder};

use crate::common::helpers;
use crate::common::types::CommonError;
use crate::config::{Config, Parser};
use crate::db::{Builder, Runner};
use crate::repository::Repository;
use crate::verifier::UnavailableVerifier;

/// `Wallet` is the runtime of one configured wallet: its identity, its RocksDB storage and the
/// core components built over it
#[derive(Clone)]
pub struct Wallet {
    config: Config,
    repository: Repository,
}

impl Wallet {
    /// `new` parses and validates the TOML file at `conf_file`, then opens the database
    pub fn new(conf_file: String) -> Result<Self, CommonError> {
        let config = Parser::new(conf_file)
            .parse()
            .map_err(|err| CommonError::ConfigError(err.to_string()))?;

        helpers::validate(config.clone())?;

        let runner = Builder::new(config.storage().to_owned()).build()?;

        Ok(Self::with_runner(config, runner))
    }

    pub fn with_runner(config: Config, runner: Runner<DB>) -> Self {
        let (wallet_id, own_did) = config.app().get_app_config();
        info!("[wallet:new] wallet: {} | did: {}", wallet_id, own_did);

        Self {
            config,
            repository: Repository::new(runner),
        }
    }

    pub fn wallet_id(&self) -> WalletID {
        self.config.wallet_id()
    }

    pub fn own_did(&self) -> String {
        self.config.own_did()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.config.retry_policy()
    }

    pub fn storage(&self) -> Repository {
        self.repository.clone()
    }

    pub fn invitations(&self) -> InvitationStateMachine<Repository> {
        InvitationStateMachine::new(self.storage())
    }

    pub fn requests(&self) -> PendingRequestQueue<Repository> {
        PendingRequestQueue::new(self.storage())
    }

    pub fn connections(&self) -> ConnectionRepository<Repository> {
        ConnectionRepository::new(self.storage())
    }

    /// pins read and removed without a crypto layer, pinning itself goes through [`Wallet::flow`]
    pub fn pins(&self) -> TrustPinStore<Repository, UnavailableVerifier> {
        TrustPinStore::new(self.storage(), UnavailableVerifier)
    }

    pub fn validator(&self) -> ProofValidator<UnavailableVerifier> {
        ProofValidator::new(UnavailableVerifier)
    }

    /// `flow` assembles the full trust flow once the crypto layer, the transport and the remote
    /// agent are available
    pub fn flow<TVerifier, TTransport, TRemote>(
        &self,
        verifier: TVerifier,
        transport: TTransport,
        remote: TRemote,
    ) -> TrustFlow<Repository, TVerifier, TTransport, TRemote, TokioClock>
    where
        TVerifier: VerifierBuilder,
        TTransport: TransportBuilder,
        TRemote: RemoteAgentBuilder,
    {
        self.flow_with_clock(verifier, transport, remote, TokioClock)
    }

    pub fn flow_with_clock<TVerifier, TTransport, TRemote, TClock>(
        &self,
        verifier: TVerifier,
        transport: TTransport,
        remote: TRemote,
        clock: TClock,
    ) -> TrustFlow<Repository, TVerifier, TTransport, TRemote, TClock>
    where
        TVerifier: VerifierBuilder,
        TTransport: TransportBuilder,
        TRemote: RemoteAgentBuilder,
        TClock: Clock,
    {
        let context = WalletContext::new(self.storage(), verifier, transport, remote);
        TrustFlow::new(context, clock, self.retry_policy())
    }
}

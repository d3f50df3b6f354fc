use crate::connection::{RemoteAgentBuilder, TransportBuilder};
use crate::storage::StorageBuilder;
use crate::verifiable::VerifierBuilder;

/// `WalletContext` carries every collaborator used by the trust flow
///
/// Components receive what they need from it explicitly, nothing is resolved from ambient
/// state, which keeps two wallets (or a wallet and its tests) fully isolated
#[derive(Clone)]
pub struct WalletContext<TStorage, TVerifier, TTransport, TRemote>
where
    TStorage: StorageBuilder,
    TVerifier: VerifierBuilder,
    TTransport: TransportBuilder,
    TRemote: RemoteAgentBuilder,
{
    storage: TStorage,
    verifier: TVerifier,
    transport: TTransport,
    remote: TRemote,
}

impl<TStorage, TVerifier, TTransport, TRemote> WalletContext<TStorage, TVerifier, TTransport, TRemote>
where
    TStorage: StorageBuilder,
    TVerifier: VerifierBuilder,
    TTransport: TransportBuilder,
    TRemote: RemoteAgentBuilder,
{
    pub fn new(storage: TStorage, verifier: TVerifier, transport: TTransport, remote: TRemote) -> Self {
        Self {
            storage,
            verifier,
            transport,
            remote,
        }
    }

    pub fn storage(&self) -> TStorage {
        self.storage.clone()
    }

    pub fn verifier(&self) -> TVerifier {
        self.verifier.clone()
    }

    pub fn transport(&self) -> TTransport {
        self.transport.clone()
    }

    pub fn remote(&self) -> TRemote {
        self.remote.clone()
    }
}

use rst_common::with_logging::log::{info, warn};

use crate::storage::{Keyspace, StorageBuilder, StorageError, WalletID};
use crate::verifiable::{CredentialProof, VerifierBuilder};

use super::types::{AuthorityKind, PinStatus, PinnedIdentity, RepinConsent, TrustError};

pub const PIN_KEYSPACE: Keyspace = Keyspace::new("pin");

impl From<StorageError> for TrustError {
    fn from(value: StorageError) -> Self {
        TrustError::StorageError(value.to_string())
    }
}

/// `PinOutcome` is the result of a successful [`TrustPinStore::pin`]
#[derive(Debug, Clone, PartialEq)]
pub enum PinOutcome {
    Pinned(PinnedIdentity),
    AlreadyPinned(PinnedIdentity),
}

/// `TrustPinStore` implements Trust-On-First-Use for authority roles
///
/// The first identity connected for a role is pinned, every later invitation claiming the same
/// role must present the same DID. A different DID is a [`TrustError::SecurityPinMismatch`],
/// it's returned as is and nothing in this crate retries it or lets the user override it.
/// Replacing a pin is only possible through [`TrustPinStore::repin`] with an explicit
/// [`RepinConsent`]
#[derive(Clone)]
pub struct TrustPinStore<TStorage, TVerifier>
where
    TStorage: StorageBuilder,
    TVerifier: VerifierBuilder,
{
    storage: TStorage,
    verifier: TVerifier,
}

impl<TStorage, TVerifier> TrustPinStore<TStorage, TVerifier>
where
    TStorage: StorageBuilder,
    TVerifier: VerifierBuilder,
{
    pub fn new(storage: TStorage, verifier: TVerifier) -> Self {
        Self { storage, verifier }
    }

    pub async fn is_pinned(&self, wallet: &WalletID, kind: AuthorityKind) -> Result<bool, TrustError> {
        let pinned = self.get_pinned(wallet, kind).await?;
        Ok(pinned.is_some())
    }

    pub async fn get_pinned(
        &self,
        wallet: &WalletID,
        kind: AuthorityKind,
    ) -> Result<Option<PinnedIdentity>, TrustError> {
        let pinned = PIN_KEYSPACE
            .load(&self.storage, wallet, kind.as_str())
            .await?;

        Ok(pinned)
    }

    pub async fn check(
        &self,
        wallet: &WalletID,
        kind: AuthorityKind,
        candidate_did: &str,
    ) -> Result<PinStatus, TrustError> {
        let status = match self.get_pinned(wallet, kind).await? {
            None => PinStatus::Unpinned,
            Some(pinned) if pinned.get_did() == candidate_did => PinStatus::Match,
            Some(pinned) => PinStatus::Mismatch {
                pinned: pinned.get_did().to_string(),
            },
        };

        Ok(status)
    }

    /// `verify` is true when nothing is pinned yet or when the candidate is exactly the pinned DID
    pub async fn verify(
        &self,
        wallet: &WalletID,
        kind: AuthorityKind,
        candidate_did: &str,
    ) -> Result<bool, TrustError> {
        let status = self.check(wallet, kind, candidate_did).await?;
        Ok(!matches!(status, PinStatus::Mismatch { .. }))
    }

    /// `enforce` turns a mismatch into [`TrustError::SecurityPinMismatch`]
    pub async fn enforce(
        &self,
        wallet: &WalletID,
        kind: AuthorityKind,
        candidate_did: &str,
    ) -> Result<PinStatus, TrustError> {
        match self.check(wallet, kind, candidate_did).await? {
            PinStatus::Mismatch { pinned } => {
                warn!(
                    "[pin:enforce] security pin mismatch | kind: {} | pinned: {} | presented: {}",
                    kind, pinned, candidate_did
                );

                Err(TrustError::SecurityPinMismatch {
                    kind,
                    pinned,
                    presented: candidate_did.to_string(),
                })
            }
            status => Ok(status),
        }
    }

    /// `pin` stores the identity if its role is still unpinned
    ///
    /// Pinning the same DID again is [`PinOutcome::AlreadyPinned`], the stored identity is kept
    /// untouched. A different DID is never written
    pub async fn pin(
        &self,
        wallet: &WalletID,
        identity: PinnedIdentity,
    ) -> Result<PinOutcome, TrustError> {
        let kind = identity.get_kind();
        match self.get_pinned(wallet, kind).await? {
            Some(pinned) if pinned.get_did() == identity.get_did() => {
                Ok(PinOutcome::AlreadyPinned(pinned))
            }
            Some(pinned) => Err(TrustError::SecurityPinMismatch {
                kind,
                pinned: pinned.get_did().to_string(),
                presented: identity.get_did().to_string(),
            }),
            None => {
                self.save(wallet, &identity).await?;
                info!("[pin:pin] pinned | kind: {} | did: {}", kind, identity.get_did());
                Ok(PinOutcome::Pinned(identity))
            }
        }
    }

    /// `pin_from_credential` builds the identity from the justifying credential, then pins it
    pub async fn pin_from_credential(
        &self,
        wallet: &WalletID,
        kind: AuthorityKind,
        did: &str,
        credential: Option<&CredentialProof>,
    ) -> Result<PinOutcome, TrustError> {
        let identity = PinnedIdentity::from_credential(kind, did, credential, &self.verifier).await;
        self.pin(wallet, identity).await
    }

    /// `repin` replaces whatever is pinned for the identity's role
    pub async fn repin(
        &self,
        wallet: &WalletID,
        identity: PinnedIdentity,
        consent: RepinConsent,
    ) -> Result<PinnedIdentity, TrustError> {
        let previous = self.get_pinned(wallet, identity.get_kind()).await?;
        self.save(wallet, &identity).await?;

        warn!(
            "[pin:repin] kind: {} | from: {:?} | to: {} | reason: {}",
            identity.get_kind(),
            previous.map(|pinned| pinned.get_did().to_string()),
            identity.get_did(),
            consent.reason()
        );

        Ok(identity)
    }

    /// `unpin` removes the pinned identity, the next authority of this role will be pinned again
    /// on first use
    pub async fn unpin(
        &self,
        wallet: &WalletID,
        kind: AuthorityKind,
        consent: RepinConsent,
    ) -> Result<bool, TrustError> {
        if !self.is_pinned(wallet, kind).await? {
            return Ok(false);
        }

        PIN_KEYSPACE
            .remove(&self.storage, wallet, kind.as_str())
            .await?;

        warn!("[pin:unpin] kind: {} | reason: {}", kind, consent.reason());
        Ok(true)
    }

    pub async fn list(&self, wallet: &WalletID) -> Result<Vec<PinnedIdentity>, TrustError> {
        let pins = PIN_KEYSPACE.load_all(&self.storage, wallet).await?;
        Ok(pins)
    }

    async fn save(&self, wallet: &WalletID, identity: &PinnedIdentity) -> Result<(), TrustError> {
        PIN_KEYSPACE
            .save(&self.storage, wallet, identity.get_kind().as_str(), identity)
            .await?;

        Ok(())
    }
}

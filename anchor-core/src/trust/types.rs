use std::collections::BTreeMap;
use std::fmt;

use rst_common::standard::chrono::serde::ts_seconds;
use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::Value;
use rst_common::with_errors::thiserror::{self, Error};
use rst_common::with_logging::log::warn;

use crate::verifiable::{CredentialProof, VerifierBuilder};

pub const CA_GOAL_MARKERS: [&str; 3] = [
    "ca-identity-verification",
    "ca-authority-invitation",
    "certification-authority",
];

pub const COMPANY_GOAL_MARKERS: [&str; 3] = [
    "company-identity-verification",
    "company-authority-invitation",
    "company-registration",
];

const NAME_CLAIMS: [&str; 4] = ["name", "displayName", "legalName", "companyName"];
const JURISDICTION_CLAIMS: [&str; 2] = ["jurisdiction", "country"];

/// `TrustError` covers the trust pinning domain
///
/// [`TrustError::SecurityPinMismatch`] is the MITM detection boundary. It must reach the user
/// as is and must never be retried or overridden
#[derive(Debug, PartialEq, Error, Clone)]
pub enum TrustError {
    #[error("security error: {kind} is pinned to {pinned} but the invitation presents {presented}")]
    SecurityPinMismatch {
        kind: AuthorityKind,
        pinned: String,
        presented: String,
    },

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// `AuthorityKind` are the authority roles pinned on first use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(crate = "self::serde", rename_all = "snake_case")]
pub enum AuthorityKind {
    Ca,
    Company,
}

impl AuthorityKind {
    pub fn all() -> [AuthorityKind; 2] {
        [AuthorityKind::Ca, AuthorityKind::Company]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorityKind::Ca => "ca",
            AuthorityKind::Company => "company",
        }
    }

    /// the attachment identifier carrying the credential that justifies this authority
    pub fn attachment_id(&self) -> &'static str {
        match self {
            AuthorityKind::Ca => "ca-authority-credential",
            AuthorityKind::Company => "company-authority-credential",
        }
    }

    pub fn from_attachment_id(id: &str) -> Option<Self> {
        AuthorityKind::all()
            .into_iter()
            .find(|kind| kind.attachment_id() == id)
    }

    /// `from_goal` sniffs the goal code, then the free text goal, for an authority marker
    pub fn from_goal(goal_code: Option<&str>, goal: Option<&str>) -> Option<Self> {
        let matches = |markers: &[&str], text: &str| {
            let text = text.to_lowercase();
            markers.iter().any(|marker| text.contains(marker))
        };

        let sniff = |text: &str| {
            if matches(&CA_GOAL_MARKERS, text) {
                return Some(AuthorityKind::Ca);
            }

            if matches(&COMPANY_GOAL_MARKERS, text) {
                return Some(AuthorityKind::Company);
            }

            None
        };

        goal_code.and_then(sniff).or_else(|| goal.and_then(sniff))
    }

    pub fn parse(value: &str) -> Result<Self, TrustError> {
        match value.to_lowercase().as_str() {
            "ca" => Ok(AuthorityKind::Ca),
            "company" => Ok(AuthorityKind::Company),
            other => Err(TrustError::ValidationError(format!(
                "unknown authority kind: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for AuthorityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `PinStatus` is the comparison between a candidate DID and the pinned one
#[derive(Debug, Clone, PartialEq)]
pub enum PinStatus {
    Unpinned,
    Match,
    Mismatch { pinned: String },
}

/// `RepinConsent` is the explicit user consent required before a pinned identity is replaced
/// or removed. There is no other way to overwrite a pin
#[derive(Debug, Clone, PartialEq)]
pub struct RepinConsent {
    reason: String,
}

impl RepinConsent {
    pub fn granted(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// `PinnedIdentity` is the first seen identity of an authority role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct PinnedIdentity {
    kind: AuthorityKind,
    did: String,
    display_name: Option<String>,
    jurisdiction: Option<String>,
    registration: BTreeMap<String, Value>,
    credential_hash: Option<String>,

    #[serde(with = "ts_seconds")]
    pinned_at: DateTime<Utc>,
}

impl PinnedIdentity {
    pub fn new(kind: AuthorityKind, did: impl Into<String>) -> Self {
        Self {
            kind,
            did: did.into(),
            display_name: None,
            jurisdiction: None,
            registration: BTreeMap::new(),
            credential_hash: None,
            pinned_at: Utc::now(),
        }
    }

    /// `from_credential` builds the identity from the credential that justified the connection
    ///
    /// The credential content hash goes through the verification capability, it may suspend. A
    /// failed hash leaves `credential_hash` empty, the DID alone is what gets enforced
    pub async fn from_credential<TVerifier>(
        kind: AuthorityKind,
        did: impl Into<String>,
        credential: Option<&CredentialProof>,
        verifier: &TVerifier,
    ) -> Self
    where
        TVerifier: VerifierBuilder,
    {
        let mut identity = Self::new(kind, did);
        let Some(credential) = credential else {
            return identity;
        };

        let claims = credential.disclosed_claims();
        identity.display_name = first_claim(&claims, &NAME_CLAIMS);
        identity.jurisdiction = first_claim(&claims, &JURISDICTION_CLAIMS);
        identity.registration = claims
            .into_iter()
            .filter(|(name, _)| {
                !NAME_CLAIMS.contains(&name.as_str()) && !JURISDICTION_CLAIMS.contains(&name.as_str())
            })
            .collect();

        identity.credential_hash = match credential.to_bytes() {
            Ok(bytes) => match verifier.hash(bytes).await {
                Ok(hash) => Some(hash),
                Err(err) => {
                    warn!("[pin:from_credential] kind: {} | hash failed: {}", kind, err);
                    None
                }
            },
            Err(err) => {
                warn!("[pin:from_credential] kind: {} | credential bytes: {}", kind, err);
                None
            }
        };

        identity
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn get_kind(&self) -> AuthorityKind {
        self.kind
    }

    pub fn get_did(&self) -> &str {
        &self.did
    }

    pub fn get_display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn get_jurisdiction(&self) -> Option<&str> {
        self.jurisdiction.as_deref()
    }

    pub fn get_registration(&self) -> &BTreeMap<String, Value> {
        &self.registration
    }

    pub fn get_credential_hash(&self) -> Option<&str> {
        self.credential_hash.as_deref()
    }

    pub fn get_pinned_at(&self) -> DateTime<Utc> {
        self.pinned_at
    }
}

fn first_claim(claims: &BTreeMap<String, Value>, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| claims.get(*name).and_then(Value::as_str))
        .map(str::to_string)
}

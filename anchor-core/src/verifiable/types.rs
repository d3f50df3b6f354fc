use std::collections::BTreeMap;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::Value;
use rst_common::with_errors::thiserror::{self, Error};

use super::CredentialProof;

#[derive(Debug, PartialEq, Error, Clone)]
pub enum VerifiableError {
    #[error("proof decode error: {0}")]
    DecodeError(String),

    #[error("verification capability error: {0}")]
    CapabilityError(String),

    #[error("decrypt error: {0}")]
    DecryptError(String),

    #[error("hash error: {0}")]
    HashError(String),
}

/// `IssueCategory` is the structured reason attached to each verification finding
///
/// The verification capability must classify its findings, the badge is derived from these
/// categories and never from the human readable message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "self::serde", rename_all = "snake_case")]
pub enum IssueCategory {
    SchemaMismatch,
    SignatureInvalid,
    Malformed,
    Expired,
    NotYetValid,
    Revoked,
    IssuerMismatch,
    Unclassified,
}

impl IssueCategory {
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, IssueCategory::SchemaMismatch)
    }

    /// structural or cryptographic findings, the ones turning a credential into [`Badge::Invalid`]
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            IssueCategory::SignatureInvalid
                | IssueCategory::Malformed
                | IssueCategory::Expired
                | IssueCategory::NotYetValid
                | IssueCategory::Revoked
                | IssueCategory::IssuerMismatch
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct VerificationIssue {
    pub category: IssueCategory,
    pub message: String,
}

impl VerificationIssue {
    pub fn new(category: IssueCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }
}

/// `Verification` is the raw answer of [`VerifierBuilder::verify`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Verification {
    pub valid: bool,
    pub issuer: Option<String>,
    pub issues: Vec<VerificationIssue>,
}

impl Verification {
    pub fn valid(issuer: impl Into<String>) -> Self {
        Self {
            valid: true,
            issuer: Some(issuer.into()),
            issues: Vec::new(),
        }
    }

    pub fn invalid(issues: Vec<VerificationIssue>) -> Self {
        Self {
            valid: false,
            issuer: None,
            issues,
        }
    }
}

/// `Badge` is the verdict category presented next to a credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "self::serde", rename_all = "kebab-case")]
pub enum Badge {
    Verified,
    Unverified,
    DifferentSchema,
    Invalid,
}

impl Badge {
    /// `from_findings` applies the badge precedence:
    ///
    /// 1. a valid verification is always [`Badge::Verified`]
    /// 2. a schema mismatch with no structural finding is [`Badge::DifferentSchema`]
    /// 3. any structural or cryptographic finding is [`Badge::Invalid`], also when a schema
    ///    mismatch was reported alongside
    /// 4. anything else is [`Badge::Unverified`]
    pub fn from_findings(valid: bool, errors: &[VerificationIssue]) -> Self {
        if valid {
            return Badge::Verified;
        }

        let structural = errors.iter().any(|issue| issue.category.is_structural());
        let schema = errors.iter().any(|issue| issue.category.is_schema_mismatch());

        match (schema, structural) {
            (true, false) => Badge::DifferentSchema,
            (_, true) => Badge::Invalid,
            _ => Badge::Unverified,
        }
    }

    /// every credential badge can be overridden by the user at elevated risk, only pin
    /// mismatches are a hard stop and those never reach a badge
    pub fn needs_warning(&self) -> bool {
        !matches!(self, Badge::Verified)
    }
}

/// `ValidationResult` is the outcome of validating a [`CredentialProof`]
///
/// `disclosed` only contains the claim fields the presenter chose to reveal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ValidationResult {
    pub valid: bool,
    pub badge: Badge,
    pub errors: Vec<VerificationIssue>,
    pub warnings: Vec<VerificationIssue>,
    pub issuer: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub disclosed: BTreeMap<String, Value>,
}

impl ValidationResult {
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(|issue| issue.message.to_owned()).collect()
    }

    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings
            .iter()
            .map(|issue| issue.message.to_owned())
            .collect()
    }
}

/// `VerifierBuilder` is the cryptographic capability consumed by this crate
///
/// Signature checks, decryption and hashing all live behind it, the implementations may call
/// the network or a secure element and are expected to suspend
#[async_trait]
pub trait VerifierBuilder: Clone + Send + Sync {
    async fn verify(&self, proof: &CredentialProof) -> Result<Verification, VerifiableError>;
    async fn decrypt(&self, ciphertext: Vec<u8>, key: Vec<u8>) -> Result<Vec<u8>, VerifiableError>;
    async fn hash(&self, bytes: Vec<u8>) -> Result<String, VerifiableError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use table_test::table_test;

    fn issue(category: IssueCategory) -> VerificationIssue {
        VerificationIssue::new(category, format!("{:?}", category))
    }

    #[test]
    fn test_badge_precedence() {
        let table = vec![
            ((true, vec![]), Badge::Verified),
            ((false, vec![]), Badge::Unverified),
            ((false, vec![issue(IssueCategory::Unclassified)]), Badge::Unverified),
            ((false, vec![issue(IssueCategory::SchemaMismatch)]), Badge::DifferentSchema),
            (
                (
                    false,
                    vec![
                        issue(IssueCategory::SchemaMismatch),
                        issue(IssueCategory::Unclassified),
                    ],
                ),
                Badge::DifferentSchema,
            ),
            ((false, vec![issue(IssueCategory::SignatureInvalid)]), Badge::Invalid),
            ((false, vec![issue(IssueCategory::Expired)]), Badge::Invalid),
            (
                (
                    false,
                    vec![
                        issue(IssueCategory::SchemaMismatch),
                        issue(IssueCategory::Malformed),
                    ],
                ),
                Badge::Invalid,
            ),
        ];

        for (validator, (valid, errors), expected) in table_test!(table) {
            let badge = Badge::from_findings(valid, &errors);

            validator
                .given(&format!("valid: {} | errors: {:?}", valid, errors))
                .when("derive badge")
                .then(&format!("{:?}", expected))
                .assert_eq(expected, badge);
        }
    }

    #[test]
    fn test_badge_serialized_kebab_case() {
        let json = rst_common::standard::serde_json::to_string(&Badge::DifferentSchema).unwrap();
        assert_eq!(json, "\"different-schema\"")
    }
}

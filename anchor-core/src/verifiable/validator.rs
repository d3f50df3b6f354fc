use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::with_logging::log::{debug, warn};

use super::types::{
    Badge, IssueCategory, ValidationResult, Verification, VerificationIssue, VerifierBuilder,
};
use super::CredentialProof;

/// `ProofValidator` runs the local structural checks and the external cryptographic
/// verification of a [`CredentialProof`]
///
/// The verification capability is authoritative for validity. Local findings are added as
/// errors when the capability rejects the proof and kept as warnings when it accepts it, so a
/// proof the capability verifies always ends up [`Badge::Verified`] with no errors.
///
/// Validation never fails: a capability error is converted into an unverified result so that a
/// broken credential cannot break an invitation preview
#[derive(Clone)]
pub struct ProofValidator<TVerifier>
where
    TVerifier: VerifierBuilder,
{
    verifier: TVerifier,
}

impl<TVerifier> ProofValidator<TVerifier>
where
    TVerifier: VerifierBuilder,
{
    pub fn new(verifier: TVerifier) -> Self {
        Self { verifier }
    }

    pub async fn validate(&self, proof: &CredentialProof) -> ValidationResult {
        self.validate_at(proof, Utc::now()).await
    }

    pub async fn validate_at(&self, proof: &CredentialProof, now: DateTime<Utc>) -> ValidationResult {
        let (local_issues, issued_at, expires_at) = Self::check_structure(proof, now);

        let verification = self.verifier.verify(proof).await.unwrap_or_else(|err| {
            warn!("[validator:validate] verification capability failed: {}", err);
            Verification::invalid(vec![VerificationIssue::new(
                IssueCategory::Unclassified,
                format!("unable to verify credential: {}", err),
            )])
        });

        let issuer = verification.issuer.clone().or(proof.get_issuer());

        let (errors, warnings) = match verification.valid {
            true => {
                let mut warnings = verification.issues;
                warnings.extend(local_issues);
                (Vec::new(), warnings)
            }
            false => {
                let mut errors = verification.issues;
                errors.extend(local_issues);
                (errors, Vec::new())
            }
        };

        let badge = Badge::from_findings(verification.valid, &errors);
        debug!(
            "[validator:validate] issuer: {:?} | badge: {:?} | errors: {}",
            issuer,
            badge,
            errors.len()
        );

        ValidationResult {
            valid: verification.valid,
            badge,
            errors,
            warnings,
            issuer,
            issued_at,
            expires_at,
            disclosed: proof.disclosed_claims(),
        }
    }

    /// `check_structure` inspects the proof without any cryptography
    pub fn check_structure(
        proof: &CredentialProof,
        now: DateTime<Utc>,
    ) -> (Vec<VerificationIssue>, Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        let mut issues = Vec::new();

        if proof.get_types().is_empty() {
            issues.push(VerificationIssue::new(
                IssueCategory::Malformed,
                "credential type is missing",
            ));
        }

        if proof.get_issuer().is_none() {
            issues.push(VerificationIssue::new(
                IssueCategory::Malformed,
                "credential issuer is missing",
            ));
        }

        if proof.get_signature().is_none() {
            issues.push(VerificationIssue::new(
                IssueCategory::Malformed,
                "credential signature envelope is missing",
            ));
        }

        let issued_at = proof.issued_at().unwrap_or_else(|err| {
            issues.push(VerificationIssue::new(IssueCategory::Malformed, err.to_string()));
            None
        });

        let expires_at = proof.expires_at().unwrap_or_else(|err| {
            issues.push(VerificationIssue::new(IssueCategory::Malformed, err.to_string()));
            None
        });

        if let (Some(issued), Some(expires)) = (issued_at, expires_at) {
            if expires < issued {
                issues.push(VerificationIssue::new(
                    IssueCategory::Malformed,
                    "credential expires before it was issued",
                ));
            }
        }

        if let Some(expires) = expires_at {
            if expires < now {
                issues.push(VerificationIssue::new(
                    IssueCategory::Expired,
                    format!("credential expired at {}", expires.to_rfc3339()),
                ));
            }
        }

        if let Some(issued) = issued_at {
            if issued > now {
                issues.push(VerificationIssue::new(
                    IssueCategory::NotYetValid,
                    format!("credential not valid before {}", issued.to_rfc3339()),
                ));
            }
        }

        (issues, issued_at, expires_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;

    use rst_common::standard::async_trait::async_trait;
    use rst_common::standard::chrono::TimeZone;
    use rst_common::standard::serde_json::{json, Value};
    use rst_common::with_tokio::tokio;

    use crate::verifiable::types::VerifiableError;

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

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    fn credential(expiration: &str) -> CredentialProof {
        let value: Value = json!({
            "type": ["VerifiableCredential", "CertificationAuthorityCredential"],
            "issuer": "did:peer:issuer",
            "issuanceDate": "2024-01-01T00:00:00Z",
            "expirationDate": expiration,
            "credentialSubject": {"name": "Anchor CA", "jurisdiction": "ID", "taxId": "T-1"},
            "disclosed": ["name", "jurisdiction"],
            "proof": {"type": "Ed25519Signature2020"}
        });

        CredentialProof::from_value(&value).unwrap()
    }

    fn validator_with(verification: Result<Verification, VerifiableError>) -> ProofValidator<MockFakeVerifier> {
        let mut verifier = MockFakeVerifier::new();
        verifier
            .expect_verify()
            .times(1)
            .return_once(move |_| verification);

        ProofValidator::new(verifier)
    }

    #[tokio::test]
    async fn test_verified_has_no_errors() {
        let validator = validator_with(Ok(Verification::valid("did:peer:issuer")));
        let result = validator
            .validate_at(&credential("2030-01-01T00:00:00Z"), now())
            .await;

        assert!(result.valid);
        assert_eq!(result.badge, Badge::Verified);
        assert!(result.errors.is_empty());
        assert_eq!(result.issuer, Some("did:peer:issuer".to_string()))
    }

    #[tokio::test]
    async fn test_verified_keeps_local_findings_as_warnings() {
        let validator = validator_with(Ok(Verification::valid("did:peer:issuer")));
        let result = validator
            .validate_at(&credential("2025-01-01T00:00:00Z"), now())
            .await;

        assert_eq!(result.badge, Badge::Verified);
        assert!(result.errors.is_empty());
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].category, IssueCategory::Expired)
    }

    #[tokio::test]
    async fn test_schema_mismatch_is_different_schema() {
        let validator = validator_with(Ok(Verification::invalid(vec![VerificationIssue::new(
            IssueCategory::SchemaMismatch,
            "unknown credential schema",
        )])));

        let result = validator
            .validate_at(&credential("2030-01-01T00:00:00Z"), now())
            .await;

        assert!(!result.valid);
        assert_eq!(result.badge, Badge::DifferentSchema);
        assert_eq!(result.error_messages(), vec!["unknown credential schema".to_string()])
    }

    #[tokio::test]
    async fn test_signature_invalid_is_invalid() {
        let validator = validator_with(Ok(Verification::invalid(vec![VerificationIssue::new(
            IssueCategory::SignatureInvalid,
            "signature mismatch",
        )])));

        let result = validator
            .validate_at(&credential("2030-01-01T00:00:00Z"), now())
            .await;

        assert_eq!(result.badge, Badge::Invalid)
    }

    #[tokio::test]
    async fn test_local_structural_error_blocks_different_schema() {
        let validator = validator_with(Ok(Verification::invalid(vec![VerificationIssue::new(
            IssueCategory::SchemaMismatch,
            "unknown credential schema",
        )])));

        let result = validator
            .validate_at(&credential("2025-01-01T00:00:00Z"), now())
            .await;

        assert_eq!(result.badge, Badge::Invalid)
    }

    #[tokio::test]
    async fn test_capability_failure_is_unverified() {
        let validator = validator_with(Err(VerifiableError::CapabilityError(
            "network unreachable".to_string(),
        )));

        let result = validator
            .validate_at(&credential("2030-01-01T00:00:00Z"), now())
            .await;

        assert!(!result.valid);
        assert_eq!(result.badge, Badge::Unverified);
        assert!(result.error_messages()[0].contains("network unreachable"))
    }

    #[tokio::test]
    async fn test_disclosed_claims_only() {
        let validator = validator_with(Ok(Verification::valid("did:peer:issuer")));
        let result = validator
            .validate_at(&credential("2030-01-01T00:00:00Z"), now())
            .await;

        assert_eq!(result.disclosed.len(), 2);
        assert!(result.disclosed.contains_key("name"));
        assert!(!result.disclosed.contains_key("taxId"))
    }

    #[test]
    fn test_check_structure_missing_fields() {
        let proof = CredentialProof::from_value(&json!({"credentialSubject": {"name": "x"}})).unwrap();
        let (issues, _, _) = ProofValidator::<MockFakeVerifier>::check_structure(&proof, now());

        let categories: Vec<IssueCategory> = issues.iter().map(|issue| issue.category).collect();
        assert_eq!(
            categories,
            vec![
                IssueCategory::Malformed,
                IssueCategory::Malformed,
                IssueCategory::Malformed
            ]
        )
    }
}

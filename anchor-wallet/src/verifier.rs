use rst_common::standard::async_trait::async_trait;

use prople_anchor_core::verifiable::{
    CredentialProof, IssueCategory, VerifiableError, Verification, VerificationIssue,
    VerifierBuilder,
};

/// `UnavailableVerifier` stands in when the wallet runs without its crypto layer, for example
/// from the command line
///
/// Nothing is ever verified: credentials come out unverified or invalid from their local
/// findings, decryption and hashing fail
#[derive(Clone, Default)]
pub struct UnavailableVerifier;

#[async_trait]
impl VerifierBuilder for UnavailableVerifier {
    async fn verify(&self, _proof: &CredentialProof) -> Result<Verification, VerifiableError> {
        Ok(Verification::invalid(vec![VerificationIssue::new(
            IssueCategory::Unclassified,
            "no verification capability configured",
        )]))
    }

    async fn decrypt(&self, _ciphertext: Vec<u8>, _key: Vec<u8>) -> Result<Vec<u8>, VerifiableError> {
        Err(VerifiableError::CapabilityError(
            "no decryption capability configured".to_string(),
        ))
    }

    async fn hash(&self, _bytes: Vec<u8>) -> Result<String, VerifiableError> {
        Err(VerifiableError::CapabilityError(
            "no hashing capability configured".to_string(),
        ))
    }
}

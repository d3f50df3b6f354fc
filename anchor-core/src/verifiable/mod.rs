//! `verifiable` covers the credential proofs attached to invitations and inbound requests
//!
//! The cryptography is not implemented here. [`VerifierBuilder`] is the capability provided by
//! the wallet's crypto layer, [`ProofValidator`] only interprets what it returns and derives the
//! [`Badge`] shown to the user
pub mod types;
pub use types::{
    Badge, IssueCategory, ValidationResult, VerifiableError, Verification, VerificationIssue,
    VerifierBuilder,
};

mod proof;
pub use proof::CredentialProof;

mod validator;
pub use validator::ProofValidator;

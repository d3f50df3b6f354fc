//! `flow` wires the invitation, trust, connection and request components into the operations
//! exposed to the wallet UI
pub mod types;
pub use types::{
    AcceptOutcome, AcceptRequest, AuthorityPreview, CredentialPreview, FlowError, FlowPolicy,
    InboundMessage, InvitationPreview,
};

mod usecase;
pub use usecase::TrustFlow;

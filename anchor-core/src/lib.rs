//! `prople-anchor-core` is the trust establishment core of the `prople/anchor` wallet
//!
//! It takes an out-of-band invitation from the moment it is scanned or pasted until the
//! connection it asks for is established or rejected:
//!
//! - [`invitation`] detects the invitation dialect, extracts its attachments and tracks the
//!   lifecycle of each invitation through [`invitation::InvitationStateMachine`]
//! - [`verifiable`] validates attached credential proofs through an external verification
//!   capability and derives the badge shown to the user
//! - [`trust`] pins the identity of authorities (`CA` and `Company`) on first use and refuses
//!   any later substitution
//! - [`connection`] routes the handshake to the local transport or to a remote agent
//! - [`request`] keeps inbound connection requests until the user decides
//! - [`flow`] wires everything above into the preview/accept/reject operations
//!
//! Every collaborator (storage, transport, verifier, remote agent) is injected through
//! [`context::WalletContext`]; nothing is looked up from ambient state.
pub mod connection;
pub mod context;
pub mod flow;
pub mod invitation;
pub mod request;
pub mod storage;
pub mod trust;
pub mod verifiable;

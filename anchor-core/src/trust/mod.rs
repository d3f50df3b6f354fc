//! `trust` pins authority identities on first use
pub mod types;
pub use types::{AuthorityKind, PinStatus, PinnedIdentity, RepinConsent, TrustError};

mod pin;
pub use pin::{PinOutcome, TrustPinStore, PIN_KEYSPACE};

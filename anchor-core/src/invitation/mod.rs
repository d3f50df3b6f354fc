//! `invitation` parses out-of-band invitations and tracks their lifecycle
//!
//! Parsing is pure ([`FormatDetector`], [`AttachmentExtractor`]), nothing is persisted until the
//! user previews or accepts. From there [`InvitationStateMachine`] owns the record
pub mod types;
pub use types::{
    ClassifiedInvitation, Dialect, Invitation, InvitationError, InvitationFormat, MessageType,
    PEER_DID_PREFIX,
};

mod detector;
pub use detector::FormatDetector;

pub mod attachment;
pub use attachment::{
    AttachmentEncoding, AttachmentExtractor, AttachmentField, AttachmentKind, AttachmentPayload,
    ExtractedAttachment,
};

mod builder;
pub use builder::InvitationBuilder;

pub mod record;
pub use record::{InvitationRecord, Role, Status};

mod machine;
pub use machine::{InvitationStateMachine, INVITATION_KEYSPACE};

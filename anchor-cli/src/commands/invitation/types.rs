use cli_table::Table;

use prople_anchor_core::invitation::{
    ClassifiedInvitation, Dialect, ExtractedAttachment, InvitationRecord,
};
use prople_anchor_core::verifiable::ValidationResult;

#[derive(Table, Clone, Debug, PartialEq)]
pub(crate) struct InvitationSummary {
    #[table(title = "ID")]
    pub(crate) id: String,

    #[table(title = "Format")]
    pub(crate) format: String,

    #[table(title = "Dialect")]
    pub(crate) dialect: String,

    #[table(title = "From")]
    pub(crate) from: String,

    #[table(title = "Goal")]
    pub(crate) goal_code: String,
}

impl From<&ClassifiedInvitation> for InvitationSummary {
    fn from(classified: &ClassifiedInvitation) -> Self {
        let invitation = classified.invitation();
        Self {
            id: invitation.get_id().to_string(),
            format: format!("{:?}", classified.format()),
            dialect: dialect_name(invitation.get_dialect()),
            from: invitation.get_from().to_string(),
            goal_code: invitation.get_goal_code().unwrap_or("-").to_string(),
        }
    }
}

#[derive(Table, Clone, Debug, PartialEq)]
pub(crate) struct AttachmentRow {
    #[table(title = "Attachment")]
    pub(crate) id: String,

    #[table(title = "Kind")]
    pub(crate) kind: String,

    #[table(title = "Encoding")]
    pub(crate) encoding: String,

    #[table(title = "Badge")]
    pub(crate) badge: String,

    #[table(title = "Findings")]
    pub(crate) findings: String,
}

impl AttachmentRow {
    pub(crate) fn new(attachment: &ExtractedAttachment, result: Option<&ValidationResult>) -> Self {
        let (badge, findings) = match result {
            Some(result) => {
                let mut findings = result.error_messages();
                findings.extend(result.warning_messages());
                (format!("{:?}", result.badge), findings.join("; "))
            }
            None => ("-".to_string(), "".to_string()),
        };

        Self {
            id: attachment.id.to_owned(),
            kind: format!("{:?}", attachment.kind),
            encoding: format!("{:?}", attachment.encoding),
            badge,
            findings,
        }
    }
}

#[derive(Table, Clone, Debug, PartialEq)]
pub(crate) struct InvitationRow {
    #[table(title = "ID")]
    pub(crate) id: String,

    #[table(title = "Role")]
    pub(crate) role: String,

    #[table(title = "Status")]
    pub(crate) status: String,

    #[table(title = "Peer")]
    pub(crate) peer: String,

    #[table(title = "Updated At")]
    pub(crate) updated_at: String,
}

impl From<&InvitationRecord> for InvitationRow {
    fn from(record: &InvitationRecord) -> Self {
        Self {
            id: record.get_id().to_string(),
            role: format!("{:?}", record.get_role()),
            status: format!("{:?}", record.get_status()),
            peer: record.get_peer_did().unwrap_or("-").to_string(),
            updated_at: record.get_updated_at().to_rfc3339(),
        }
    }
}

fn dialect_name(dialect: Dialect) -> String {
    match dialect {
        Dialect::PeerToPeer => "peer-to-peer".to_string(),
        Dialect::Authority(kind) => format!("authority ({})", kind),
    }
}

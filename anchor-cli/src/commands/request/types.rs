use cli_table::Table;

use prople_anchor_core::request::ConnectionRequestRecord;

#[derive(Table, Clone, Debug, PartialEq)]
pub(crate) struct RequestRow {
    #[table(title = "ID")]
    pub(crate) id: String,

    #[table(title = "From")]
    pub(crate) sender: String,

    #[table(title = "Invitation")]
    pub(crate) invitation: String,

    #[table(title = "Credential")]
    pub(crate) credential: String,

    #[table(title = "Decision")]
    pub(crate) decision: String,

    #[table(title = "Received At")]
    pub(crate) received_at: String,
}

impl From<&ConnectionRequestRecord> for RequestRow {
    fn from(record: &ConnectionRequestRecord) -> Self {
        let credential = record
            .get_credential()
            .map(|credential| credential.get_issuer().unwrap_or("unknown issuer".to_string()))
            .unwrap_or("-".to_string());

        Self {
            id: record.get_id().to_string(),
            sender: record.get_sender_did().unwrap_or("-").to_string(),
            invitation: record.get_invitation_id().unwrap_or("-").to_string(),
            credential,
            decision: format!("{:?}", record.get_decision()),
            received_at: record.get_received_at().to_rfc3339(),
        }
    }
}

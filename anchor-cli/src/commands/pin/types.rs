use cli_table::Table;

use prople_anchor_core::trust::PinnedIdentity;

#[derive(Table, Clone, Debug, PartialEq)]
pub(crate) struct PinRow {
    #[table(title = "Kind")]
    pub(crate) kind: String,

    #[table(title = "DID")]
    pub(crate) did: String,

    #[table(title = "Name")]
    pub(crate) name: String,

    #[table(title = "Jurisdiction")]
    pub(crate) jurisdiction: String,

    #[table(title = "Pinned At")]
    pub(crate) pinned_at: String,
}

impl From<&PinnedIdentity> for PinRow {
    fn from(identity: &PinnedIdentity) -> Self {
        Self {
            kind: identity.get_kind().to_string(),
            did: identity.get_did().to_string(),
            name: identity.get_display_name().unwrap_or("-").to_string(),
            jurisdiction: identity.get_jurisdiction().unwrap_or("-").to_string(),
            pinned_at: identity.get_pinned_at().to_rfc3339(),
        }
    }
}

use rst_common::with_errors::thiserror::{self, Error};

pub const ANCHOR_DEFAULT_DIR: &str = ".anchor";
pub const ANCHOR_CONFIG_FILE: &str = "anchor.toml";

#[derive(Debug, Error)]
pub enum CliError {
    #[error("homedir error: {0}")]
    HomeDirError(String),

    #[error("wallet error: {0}")]
    WalletError(String),

    #[error("invitation error: {0}")]
    InvitationError(String),

    #[error("pin error: {0}")]
    PinError(String),

    #[error("request error: {0}")]
    RequestError(String),

    #[error("table error: {0}")]
    TableError(String),
}

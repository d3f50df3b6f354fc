use rst_common::standard::serde::{self, Deserialize};

use prople_anchor_core::connection::RetryPolicy;
use prople_anchor_core::storage::WalletID;

use crate::common::types::{CommonError, ToValidate};

use super::{App, Router, Storage};

/// `Config` is the wallet's TOML file: `[app]`, `[storage]` and the optional `[router]`
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(crate = "self::serde")]
pub struct Config {
    pub(super) app: App,
    pub(super) storage: Storage,

    #[serde(default)]
    pub(super) router: Router,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn wallet_id(&self) -> WalletID {
        let (wallet_id, _) = self.app.get_app_config();
        WalletID::new(wallet_id)
    }

    pub fn own_did(&self) -> String {
        let (_, own_did) = self.app.get_app_config();
        own_did
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.router.get_retry_policy()
    }
}

impl ToValidate for Config {
    fn validate(&self) -> Result<(), CommonError> {
        self.app.validate()?;
        self.router.validate()?;
        self.storage.validate()?;

        Ok(())
    }
}

use rst_common::standard::serde::{self, Deserialize};

use crate::common::types::{CommonError, ToValidate};

/// `App` identifies the wallet this process runs for
#[derive(Deserialize, Debug, Clone)]
#[serde(crate = "self::serde")]
pub struct App {
    pub(super) wallet_id: String,
    pub(super) own_did: String,
}

impl App {
    pub fn get_app_config(&self) -> (String, String) {
        (self.wallet_id.to_owned(), self.own_did.to_owned())
    }
}

impl Default for App {
    fn default() -> Self {
        Self {
            wallet_id: "".to_string(),
            own_did: "".to_string(),
        }
    }
}

impl ToValidate for App {
    fn validate(&self) -> Result<(), CommonError> {
        if self.wallet_id.is_empty() {
            return Err(CommonError::ValidationError(
                "config: app:wallet_id is missing".to_string(),
            ));
        }

        if !self.own_did.starts_with("did:") {
            return Err(CommonError::ValidationError(
                "config: app:own_did must be a DID".to_string(),
            ));
        }

        Ok(())
    }
}

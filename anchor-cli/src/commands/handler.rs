use rst_common::with_logging::log::debug;

use prople_anchor_wallet::Wallet;

use crate::types::CliError;

/// `ContextHandler` carries the opened wallet to every command handler
pub struct ContextHandler {
    wallet: Wallet,
}

impl ContextHandler {
    pub fn new(wallet: Wallet) -> Self {
        Self { wallet }
    }

    pub fn open(conf_file: String) -> Result<Self, CliError> {
        debug!("[ctx:open] config: {}", conf_file);

        let wallet = Wallet::new(conf_file).map_err(|err| CliError::WalletError(err.to_string()))?;
        Ok(Self::new(wallet))
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }
}

use rstdev_config::format::use_toml;
use rstdev_config::parser::from_file;
use rstdev_config::{types::ConfigError, Builder};

use super::Config;

pub struct Parser {
    conf_file: String,
}

impl Parser {
    pub fn new(conf_file: String) -> Self {
        Self { conf_file }
    }

    pub fn parse(&self) -> Result<Config, ConfigError> {
        let config_toml: Result<Config, ConfigError> =
            Builder::new(from_file(self.conf_file.to_owned()))
                .fetch()?
                .parse(use_toml);

        config_toml
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::path::PathBuf;

    use crate::common::helpers;

    #[test]
    fn test_parse_config() {
        let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        path.push("src/config/fixtures");

        let toml_file = format!("{}/config.toml", path.display());
        let parser = Parser::new(toml_file);
        let config_builder = parser.parse();

        assert!(!config_builder.is_err());
        let config = config_builder.unwrap();

        let (wallet_id, own_did) = config.app().get_app_config();
        assert_eq!("wallet-alice".to_string(), wallet_id);
        assert_eq!("did:peer:2.alice".to_string(), own_did);

        assert_eq!(config.storage().get_path(), "./wallet-storage");
        assert_eq!(config.storage().get_column_family(), "wallet-cf");
        assert_eq!(config.storage().get_wal_dir(), "./wallet-db-wal");

        assert_eq!(config.router().get_retry_policy().get_max_attempts(), 5);
        assert!(helpers::validate(config).is_ok())
    }

    #[test]
    fn test_parse_missing_file() {
        let parser = Parser::new("/nonexistent/anchor.toml".to_string());
        assert!(parser.parse().is_err())
    }
}

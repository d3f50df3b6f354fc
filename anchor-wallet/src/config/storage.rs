use rst_common::standard::serde::{self, Deserialize};

use crate::common::types::{CommonError, ToValidate};

pub const DEFAULT_COLUMN_FAMILY: &str = "anchor";

fn default_column_family() -> String {
    DEFAULT_COLUMN_FAMILY.to_string()
}

fn default_create_if_missing() -> bool {
    true
}

/// `Storage` is the `[storage]` section, the RocksDB holding every keyspace of the wallet
///
/// Invitations, pins, connections and requests share one column family, their keys are already
/// namespaced by wallet and collection. The write ahead log goes to `<path>/wal` unless `wal_dir`
/// says otherwise
#[derive(Deserialize, Debug, Clone)]
#[serde(crate = "self::serde")]
pub struct Storage {
    pub(super) path: String,

    #[serde(default = "default_column_family")]
    pub(super) column_family: String,

    #[serde(default)]
    pub(super) wal_dir: Option<String>,

    #[serde(default = "default_create_if_missing")]
    pub(super) create_if_missing: bool,
}

impl Storage {
    pub fn get_path(&self) -> String {
        self.path.to_owned()
    }

    pub fn get_column_family(&self) -> String {
        self.column_family.to_owned()
    }

    pub fn get_wal_dir(&self) -> String {
        self.wal_dir
            .to_owned()
            .unwrap_or(format!("{}/wal", self.path.trim_end_matches('/')))
    }

    pub fn get_create_if_missing(&self) -> bool {
        self.create_if_missing
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            path: String::new(),
            column_family: default_column_family(),
            wal_dir: None,
            create_if_missing: default_create_if_missing(),
        }
    }
}

impl ToValidate for Storage {
    fn validate(&self) -> Result<(), CommonError> {
        if self.path.trim().is_empty() {
            return Err(CommonError::ValidationError(
                "config: storage:path is missing".to_string(),
            ));
        }

        if self.column_family.trim().is_empty() {
            return Err(CommonError::ValidationError(
                "config: storage:column_family must not be empty".to_string(),
            ));
        }

        if let Some(wal_dir) = &self.wal_dir {
            if wal_dir.trim().is_empty() {
                return Err(CommonError::ValidationError(
                    "config: storage:wal_dir must not be empty when set".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::path::PathBuf;

    use rstdev_config::format::use_toml;
    use rstdev_config::parser::from_file;
    use rstdev_config::{types::ConfigError, Builder};
    use table_test::table_test;

    use crate::common::helpers;

    fn fixture(name: &str) -> String {
        let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        path.push("src/config/fixtures");

        format!("{}/{}", path.display(), name)
    }

    #[test]
    fn test_parse_storage_config() -> Result<(), ConfigError> {
        let storage: Storage =
            Builder::new(from_file(fixture("config_storage.toml"))).fetch()?.parse(use_toml)?;

        assert_eq!(storage.get_path(), "./wallet-storage");
        assert_eq!(storage.get_column_family(), "wallet-cf");
        assert_eq!(storage.get_wal_dir(), "./wallet-db-wal");
        assert!(storage.get_create_if_missing());
        Ok(())
    }

    #[test]
    fn test_storage_defaults() -> Result<(), ConfigError> {
        let storage: Storage = Builder::new(from_file(fixture("config_storage_minimal.toml")))
            .fetch()?
            .parse(use_toml)?;

        assert_eq!(storage.get_column_family(), DEFAULT_COLUMN_FAMILY);
        assert_eq!(storage.get_wal_dir(), "/var/lib/anchor/wal");
        assert!(storage.get_create_if_missing());
        assert!(helpers::validate(storage).is_ok());
        Ok(())
    }

    #[test]
    fn test_storage_validation() {
        let valid = Storage {
            path: "./wallet-storage".to_string(),
            ..Storage::default()
        };

        let table = vec![
            (Storage::default(), Some("storage:path")),
            (
                Storage {
                    column_family: " ".to_string(),
                    ..valid.clone()
                },
                Some("storage:column_family"),
            ),
            (
                Storage {
                    wal_dir: Some("".to_string()),
                    ..valid.clone()
                },
                Some("storage:wal_dir"),
            ),
            (valid, None),
        ];

        for (validator, storage, expected) in table_test!(table) {
            let message = helpers::validate(storage.clone())
                .err()
                .map(|err| err.to_string());

            let matched = match (message, expected) {
                (Some(message), Some(expected)) => message.contains(expected),
                (None, None) => true,
                _ => false,
            };

            validator
                .given(&format!("{:?}", storage))
                .when("validate storage")
                .then(&format!("{:?}", expected))
                .assert_eq(true, matched);
        }
    }
}

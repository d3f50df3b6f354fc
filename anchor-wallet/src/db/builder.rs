use rst_common::with_logging::log::debug;
use rstdev_storage::engine::rocksdb::db::DB;
use rstdev_storage::engine::rocksdb::options::Options;

use crate::common::types::CommonError;
use crate::config::Storage;

use super::Runner;

/// `Builder` opens the wallet's RocksDB from its `[storage]` section
///
/// The column family is created on first open. Opening an existing database is never an error,
/// the wallet reopens the same storage on every start
pub struct Builder {
    storage: Storage,
}

impl Builder {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub fn build(&self) -> Result<Runner<DB>, CommonError> {
        let path = self.storage.get_path();
        let column_family = self.storage.get_column_family();
        let wal_dir = self.storage.get_wal_dir();
        let create_if_missing = self.storage.get_create_if_missing();

        debug!(
            "[db:build] path: {} | cf: {} | wal: {}",
            path, column_family, wal_dir
        );

        let mut db_opts = Options::new(path, column_family.to_owned());
        db_opts.build_default_opts().set_db_opts(move |opt| {
            opt.create_if_missing(create_if_missing);
            opt.create_missing_column_families(true);
            opt.set_error_if_exists(false);
            opt.set_wal_dir(wal_dir);

            opt
        });

        let mut db = DB::new(db_opts).map_err(|err| CommonError::DBError(err.to_string()))?;
        let db_instance = db
            .build()
            .map_err(|err| CommonError::DBError(err.to_string()))?;

        db.set_db(db_instance);
        Ok(Runner::new(db, column_family))
    }
}

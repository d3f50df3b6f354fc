use rst_common::with_tokio::tokio::task::spawn_blocking;
use rstdev_storage::engine::rocksdb::db::DB;
use rstdev_storage::engine::rocksdb::rocksdb::rust_rocksdb::{Direction, IteratorMode};
use rstdev_storage::types::Storage;

use super::types::{DbError, Instruction, OutputOpts};

#[derive(Clone)]
pub struct Runner<TStorage>
where
    TStorage: Storage<Instance = DB>,
{
    instance: TStorage,
    column_family: String,
}

impl<TStorage> Runner<TStorage>
where
    TStorage: Storage<Instance = DB>,
{
    pub fn new(instance: TStorage, column_family: String) -> Self {
        Self {
            instance,
            column_family,
        }
    }

    pub fn get_column_family(&self) -> &str {
        &self.column_family
    }
}

impl Runner<DB> {
    pub async fn exec(&self, instruction: Instruction) -> Result<OutputOpts, DbError> {
        let instance = self.instance.clone().get_instance();

        let db_instance = instance
            .db
            .clone()
            .ok_or(DbError::EngineError("db instance is missing".to_string()))?;

        let cf_def = self.column_family.to_owned();

        match instruction {
            Instruction::SaveCf { key, value } => {
                spawn_blocking(move || {
                    let cf = db_instance
                        .cf_handle(cf_def.as_str())
                        .ok_or(DbError::EngineError("cf handler failed".to_string()))?;

                    db_instance
                        .put_cf(cf, key, value)
                        .map_err(|err| DbError::EngineError(err.to_string()))
                })
                .await
                .map_err(|err| DbError::EngineError(err.to_string()))??;

                Ok(OutputOpts::None)
            }
            Instruction::GetCf { key } => {
                let value = spawn_blocking(move || {
                    let cf = db_instance
                        .cf_handle(cf_def.as_str())
                        .ok_or(DbError::EngineError("cf handler failed".to_string()))?;

                    db_instance
                        .get_cf(cf, key)
                        .map_err(|err| DbError::EngineError(err.to_string()))
                })
                .await
                .map_err(|err| DbError::EngineError(err.to_string()))??;

                Ok(OutputOpts::SingleByte { value })
            }
            Instruction::RemoveCf { key } => {
                spawn_blocking(move || {
                    let cf = db_instance
                        .cf_handle(cf_def.as_str())
                        .ok_or(DbError::EngineError("cf handler failed".to_string()))?;

                    db_instance
                        .delete_cf(cf, key)
                        .map_err(|err| DbError::EngineError(err.to_string()))
                })
                .await
                .map_err(|err| DbError::EngineError(err.to_string()))??;

                Ok(OutputOpts::None)
            }
            Instruction::PrefixKeysCf { prefix } => {
                let keys = spawn_blocking(move || {
                    let cf = db_instance
                        .cf_handle(cf_def.as_str())
                        .ok_or(DbError::EngineError("cf handler failed".to_string()))?;

                    let mode = IteratorMode::From(prefix.as_bytes(), Direction::Forward);
                    let mut keys = Vec::new();
                    for item in db_instance.iterator_cf(cf, mode) {
                        let (key, _) = item.map_err(|err| DbError::EngineError(err.to_string()))?;
                        if !key.starts_with(prefix.as_bytes()) {
                            break;
                        }

                        let key = String::from_utf8(key.to_vec())
                            .map_err(|err| DbError::InstructionError(err.to_string()))?;
                        keys.push(key);
                    }

                    Ok::<Vec<String>, DbError>(keys)
                })
                .await
                .map_err(|err| DbError::EngineError(err.to_string()))??;

                Ok(OutputOpts::Keys { keys })
            }
        }
    }
}

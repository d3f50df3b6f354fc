//! `storage` defines the key-value contract every persisted entity of this crate goes through
//!
//! The storage engine itself is not part of this crate. Implementers only need to provide
//! [`StorageBuilder`], all keys are namespaced by the wallet identifier through [`Keyspace`]
pub mod types;
pub use types::{Keyspace, StorageBuilder, StorageError, WalletID};

mod memory;
pub use memory::MemoryStorage;

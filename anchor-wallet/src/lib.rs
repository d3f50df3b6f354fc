//! `prople-anchor-wallet` runs the trust establishment core for one configured wallet
//!
//! It reads the wallet's TOML configuration, opens its RocksDB storage and exposes the core
//! components of `prople-anchor-core` built over that storage through [`Wallet`]
pub mod common;
pub mod config;

mod db;
pub use db::{
    Builder as DbBuilder, DbError, Instruction as DbInstruction, OutputOpts as DbOutput,
    Runner as DbRunner,
};

mod repository;
pub use repository::Repository;

mod verifier;
pub use verifier::UnavailableVerifier;

mod wallet;
pub use wallet::Wallet;

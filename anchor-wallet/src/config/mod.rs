mod storage;
pub use storage::{Storage, DEFAULT_COLUMN_FAMILY};

mod app;
pub use app::App;

mod router;
pub use router::Router;

#[allow(clippy::module_inception)]
mod config;
pub use config::Config;

mod parser;
pub use parser::Parser;

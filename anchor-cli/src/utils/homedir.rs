use std::fs;
use std::path::Path;

use homedir::my_home;
use rst_common::with_logging::log::debug;

use crate::types::{CliError, ANCHOR_CONFIG_FILE, ANCHOR_DEFAULT_DIR};

pub fn setup_homedir(dir: &str) -> Result<String, CliError> {
    let current_homedir = my_home().map_err(|err| CliError::HomeDirError(err.to_string()))?;

    match current_homedir {
        Some(current_dir) => {
            let anchor_dir = format!("{}/{}", current_dir.display(), dir);
            let anchor_path = Path::new(anchor_dir.as_str()).to_owned();

            if !anchor_path.exists() {
                debug!("anchor directory still not exists");
                fs::create_dir_all(anchor_path.clone())
                    .map_err(|err| CliError::HomeDirError(err.to_string()))?;
            }

            debug!("anchor home directory: {}", anchor_path.display());
            Ok(anchor_path.display().to_string())
        }
        None => Err(CliError::HomeDirError(
            "unknown home directory path".to_string(),
        )),
    }
}

/// `config_path` is the explicit `--config` file, or `~/.anchor/anchor.toml`
pub fn config_path(explicit: Option<String>) -> Result<String, CliError> {
    match explicit {
        Some(path) => Ok(path),
        None => {
            let anchor_dir = setup_homedir(ANCHOR_DEFAULT_DIR)?;
            Ok(format!("{}/{}", anchor_dir, ANCHOR_CONFIG_FILE))
        }
    }
}

pub mod error;
pub mod provider;

pub use error::*;
pub use provider::{PollSettings, ProviderConfig, TimeoutSettings};

use std::path::PathBuf;

pub const CONFIG_PATH_ENV: &str = "ARMATURE_CONFIG_PATH";

const CANDIDATES: [&str; 2] = ["armature.local.yaml", "armature.yaml"];

/// Find the provider configuration file
///
/// Search order:
/// 1. `ARMATURE_CONFIG_PATH` (direct path)
/// 2. current directory: armature.local.yaml, armature.yaml
/// 3. `./.armature/`: same order
/// 4. `~/.config/armature/config.yaml` (global)
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!("{} points at {}, which does not exist", CONFIG_PATH_ENV, path.display());
    }

    let current_dir = std::env::current_dir()?;

    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let armature_dir = current_dir.join(".armature");
    if armature_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = armature_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("armature").join("config.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

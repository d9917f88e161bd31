use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "Config file not found. Looked in:\n\
        - current directory: armature.local.yaml, armature.yaml\n\
        - ./.armature/ directory\n\
        - ~/.config/armature/config.yaml\n\
        Set ARMATURE_CONFIG_PATH to point at a file, or set ARM_SUBSCRIPTION_ID"
    )]
    ConfigFileNotFound,

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("No subscription ID configured (set subscription_id or ARM_SUBSCRIPTION_ID)")]
    MissingSubscription,

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

//! Provider configuration file

use crate::error::{ConfigError, Result};
use crate::find_config_file;
use armature_cloud::{PollConfig, Timeouts};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SUBSCRIPTION_ID_ENV: &str = "ARM_SUBSCRIPTION_ID";
pub const ENDPOINT_ENV: &str = "ARM_ENDPOINT";
pub const SKIP_PROVIDER_REGISTRATION_ENV: &str = "ARM_SKIP_PROVIDER_REGISTRATION";
pub const ACCESS_TOKEN_ENV: &str = "ARM_ACCESS_TOKEN";

/// Provider settings
///
/// ```yaml
/// subscription_id: 00000000-0000-0000-0000-000000000000
/// skip_provider_registration: false
/// poll:
///   initial_interval_ms: 1000
///   max_interval_ms: 30000
/// timeouts:
///   create_minutes: 60
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    pub subscription_id: Option<String>,

    /// ARM endpoint; the public cloud when unset
    pub endpoint: Option<String>,

    pub skip_provider_registration: bool,

    pub poll: PollSettings,

    pub timeouts: TimeoutSettings,

    /// Bearer token, only ever taken from the environment
    #[serde(skip)]
    pub access_token: Option<String>,

    /// File the settings were read from
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollSettings {
    pub initial_interval_ms: u64,
    pub max_interval_ms: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        let defaults = PollConfig::default();
        Self {
            initial_interval_ms: defaults.initial_interval.as_millis() as u64,
            max_interval_ms: defaults.max_interval.as_millis() as u64,
        }
    }
}

/// Per-operation deadlines; unset ones keep the built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutSettings {
    pub create_minutes: Option<u64>,
    pub read_minutes: Option<u64>,
    pub update_minutes: Option<u64>,
    pub delete_minutes: Option<u64>,
}

impl ProviderConfig {
    pub fn from_yaml(content: &str) -> Result<Self> {
        Self::parse(content, Path::new("<inline>"))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&content, path)?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    fn parse(content: &str, path: &Path) -> Result<Self> {
        // An empty file is an empty mapping.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Discover the config file, apply environment overrides and validate.
    ///
    /// Without a file the environment alone may configure the provider.
    pub fn load() -> Result<Self> {
        let (mut config, found) = match find_config_file() {
            Ok(path) => {
                tracing::debug!("Loading provider config from {}", path.display());
                (Self::from_file(&path)?, true)
            }
            Err(ConfigError::ConfigFileNotFound) => (Self::default(), false),
            Err(e) => return Err(e),
        };

        config.apply_env()?;

        if !found && config.subscription_id.is_none() {
            return Err(ConfigError::ConfigFileNotFound);
        }
        config.validate()?;
        Ok(config)
    }

    /// Overlay `ARM_*` environment variables
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(subscription_id) = env_var(SUBSCRIPTION_ID_ENV) {
            self.subscription_id = Some(subscription_id);
        }
        if let Some(endpoint) = env_var(ENDPOINT_ENV) {
            self.endpoint = Some(endpoint);
        }
        if let Some(value) = env_var(SKIP_PROVIDER_REGISTRATION_ENV) {
            self.skip_provider_registration = parse_bool(SKIP_PROVIDER_REGISTRATION_ENV, &value)?;
        }
        self.access_token = env_var(ACCESS_TOKEN_ENV);
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.subscription_id.as_deref().is_none_or(|s| s.trim().is_empty()) {
            return Err(ConfigError::MissingSubscription);
        }
        if self.poll.initial_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                name: "poll.initial_interval_ms".to_string(),
                value: "0".to_string(),
            });
        }
        if self.poll.max_interval_ms < self.poll.initial_interval_ms {
            return Err(ConfigError::InvalidValue {
                name: "poll.max_interval_ms".to_string(),
                value: format!(
                    "{} (less than initial_interval_ms {})",
                    self.poll.max_interval_ms, self.poll.initial_interval_ms
                ),
            });
        }
        Ok(())
    }

    pub fn subscription_id(&self) -> Result<&str> {
        self.subscription_id
            .as_deref()
            .ok_or(ConfigError::MissingSubscription)
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            initial_interval: Duration::from_millis(self.poll.initial_interval_ms),
            max_interval: Duration::from_millis(self.poll.max_interval_ms),
            ..PollConfig::default()
        }
    }

    pub fn timeouts(&self) -> Timeouts {
        let defaults = Timeouts::default();
        let minutes = |value: Option<u64>, default: Duration| {
            value.map_or(default, |m| Duration::from_secs(m.saturating_mul(60)))
        };
        Timeouts {
            create: minutes(self.timeouts.create_minutes, defaults.create),
            read: minutes(self.timeouts.read_minutes, defaults.read),
            update: minutes(self.timeouts.update_minutes, defaults.update),
            delete: minutes(self.timeouts.delete_minutes, defaults.delete),
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}

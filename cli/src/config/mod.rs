//! # Launcher Configuration
//!
//! Optional YAML file read from `$DECKHAND_CONFIG`, or
//! `~/.deckhand/config.yaml` when that is unset. A missing file means
//! defaults for everything.
//!
//! ```yaml
//! delegate:
//!   image: deckhand/delegate:latest
//!   network: host
//!   labels:
//!     name: deckhand
//! registry:
//!   public_aliases:
//!     - index.docker.io
//!     - docker.io
//! ```

mod delegate;
mod registry;

pub use delegate::DelegateConfig;
pub use registry::RegistryConfig;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::HostContext;
use crate::error::ConfigError;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "DECKHAND_CONFIG";

/// Complete launcher configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LauncherConfig {
    #[serde(default)]
    pub delegate: DelegateConfig,

    #[serde(default)]
    pub registry: RegistryConfig,
}

impl LauncherConfig {
    /// Path of the config file for this host
    pub fn path(host: &HostContext) -> PathBuf {
        match host.var(CONFIG_ENV) {
            Some(explicit) => PathBuf::from(explicit),
            None => host.home.join(".deckhand").join("config.yaml"),
        }
    }

    /// Load the host's config file, or defaults when it does not exist
    pub fn load(host: &HostContext) -> Result<Self, ConfigError> {
        Self::load_from(&Self::path(host))
    }

    /// Load a config file, or defaults when it does not exist
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("No launcher config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let config = Self::parse(&content, path)?;
        config.validate()?;
        debug!("Loaded launcher config from {}", path.display());
        Ok(config)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let parsed: Option<Self> =
            serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        Ok(parsed.unwrap_or_default())
    }

    /// Reject values the delegate invocation cannot be built from
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.delegate.image.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "delegate.image".to_string(),
                value: self.delegate.image.clone(),
            });
        }
        if self.delegate.network.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "delegate.network".to_string(),
                value: self.delegate.network.clone(),
            });
        }
        if self.registry.aliases().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "registry.public_aliases".to_string(),
                value: "[]".to_string(),
            });
        }
        Ok(())
    }
}

//! Public registry configuration.

use serde::{Deserialize, Serialize};

use crate::domain::registry::{RegistryAliases, DEFAULT_PUBLIC_ALIASES};

/// Registry lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Hostname spellings of the default public registry, canonical first
    #[serde(default = "default_public_aliases")]
    pub public_aliases: Vec<String>,
}

fn default_public_aliases() -> Vec<String> {
    DEFAULT_PUBLIC_ALIASES.iter().map(|s| s.to_string()).collect()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            public_aliases: default_public_aliases(),
        }
    }
}

impl RegistryConfig {
    /// Alias group used by extraction and resolution
    pub fn aliases(&self) -> RegistryAliases {
        RegistryAliases::new(self.public_aliases.iter().cloned())
    }
}

//! Delegate container configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::DelegateSettings;

/// Delegate container configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegateConfig {
    /// Delegate image reference (overridden by `--image` / `DECKHAND_IMAGE`)
    #[serde(default = "default_image")]
    pub image: String,

    /// Container network mode
    #[serde(default = "default_network")]
    pub network: String,

    /// Labels applied to the delegate container
    #[serde(default = "default_labels")]
    pub labels: BTreeMap<String, String>,
}

fn default_image() -> String {
    "deckhand/delegate:latest".to_string()
}

fn default_network() -> String {
    "host".to_string()
}

fn default_labels() -> BTreeMap<String, String> {
    BTreeMap::from([("name".to_string(), "deckhand".to_string())])
}

impl Default for DelegateConfig {
    fn default() -> Self {
        Self {
            image: default_image(),
            network: default_network(),
            labels: default_labels(),
        }
    }
}

impl DelegateConfig {
    /// Container settings, with an optional image override
    pub fn settings(&self, image_override: Option<&str>) -> DelegateSettings {
        let image = image_override
            .map(str::trim)
            .filter(|i| !i.is_empty())
            .unwrap_or(&self.image);
        DelegateSettings {
            image: image.to_string(),
            network: self.network.clone(),
            labels: self.labels.clone(),
        }
    }
}

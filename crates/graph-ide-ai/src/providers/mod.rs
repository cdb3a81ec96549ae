//! Classification provider implementations

pub mod canned;
pub mod openrouter;

use crate::bridge::ClassificationProvider;
use anyhow::Result;
use graph_ide_core::ProviderConfig;
use std::path::Path;

pub use canned::StaticProvider;
pub use openrouter::OpenRouterProvider;

/// Factory function to create classification providers
pub fn create_provider(config: &ProviderConfig, responses_dir: Option<&Path>) -> Result<Box<dyn ClassificationProvider>> {
    match config.name.as_str() {
        "openrouter" => Ok(Box::new(OpenRouterProvider::from_config(config)?)),
        "static" => {
            let dir = responses_dir.ok_or_else(|| anyhow::anyhow!("the static provider needs a responses directory"))?;
            Ok(Box::new(StaticProvider::from_dir(dir)?))
        }
        other => anyhow::bail!("Unknown classification provider: {}", other),
    }
}

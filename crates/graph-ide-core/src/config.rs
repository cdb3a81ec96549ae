//! Project configuration (`graph-ide.toml`)

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Optional per-project configuration file, looked up at the project root.
pub const CONFIG_FILE: &str = "graph-ide.toml";

pub const DEFAULT_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"];

pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    "out",
    "coverage",
    ".next",
    crate::cache::CACHE_DIR,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphIdeConfig {
    /// File extensions (without the dot) that are analysed.
    pub extensions: Vec<String>,
    /// Directory names skipped anywhere in the tree.
    pub exclude_dirs: Vec<String>,
    /// Extra glob patterns, relative to the project root, that are skipped.
    pub exclude_globs: Vec<String>,
    pub respect_gitignore: bool,
    pub provider: ProviderConfig,
}

impl Default for GraphIdeConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            exclude_dirs: DEFAULT_EXCLUDE_DIRS.iter().map(|d| d.to_string()).collect(),
            exclude_globs: Vec::new(),
            respect_gitignore: false,
            provider: ProviderConfig::default(),
        }
    }
}

/// Classification collaborator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub name: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: "openrouter".to_string(),
            model: "anthropic/claude-3.5-sonnet".to_string(),
            api_key_env: "OPENROUTER_API_KEY".to_string(),
        }
    }
}

impl GraphIdeConfig {
    /// Load `graph-ide.toml` from `root`, falling back to defaults when absent.
    pub fn load(root: &Path) -> anyhow::Result<Self> {
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)?;
        let config: GraphIdeConfig = toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("invalid {}: {}", path.display(), e))?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }
}

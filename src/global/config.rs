use std::path::Path;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use crate::global::utils::get_global_config_file;
use crate::http::ResolverConfig;
use crate::manifest::Manifest;

/// User-wide settings stored in `<config dir>/pinmap/config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct GlobalConfig {
    #[serde(default)]
    pub resolver: ResolverConfig,
}

impl GlobalConfig {
    /// Loads the config at `path`; a missing file gives the defaults.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<GlobalConfig> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)
                .with_context(|| format!("Invalid global config {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(GlobalConfig::default()),
            Err(e) => Err(e).with_context(|| format!("Could not read {}", path.display())),
        }
    }

    /// Loads the user-wide config. Without a home directory the defaults are used.
    pub fn load() -> Result<GlobalConfig> {
        match get_global_config_file() {
            Ok(path) => GlobalConfig::load_from(path),
            Err(e) => {
                tracing::debug!(error = %e, "no global config directory");
                Ok(GlobalConfig::default())
            }
        }
    }
}

/// The manifest's `[resolver]` table wins over the global config.
pub fn effective_resolver_config(manifest: &Manifest, global: &GlobalConfig) -> ResolverConfig {
    manifest
        .resolver
        .clone()
        .unwrap_or_else(|| global.resolver.clone())
}

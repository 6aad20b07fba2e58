use std::path::PathBuf;
use anyhow::{anyhow, Result};
use directories::ProjectDirs;

pub const GLOBAL_CONFIG_FILE: &str = "config.toml";

pub fn get_global_config_dir() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("org", "pinmap", "pinmap")
        .ok_or_else(|| anyhow!("Could not get project directories"))?;
    Ok(proj_dirs.config_dir().to_path_buf())
}

pub fn get_global_config_file() -> Result<PathBuf> {
    Ok(get_global_config_dir()?.join(GLOBAL_CONFIG_FILE))
}

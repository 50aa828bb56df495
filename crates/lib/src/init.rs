//! Initialize the configuration directory: create ~/.snapvault, a default
//! config file, and the photo storage directory.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Create the config directory and default files if they do not exist.
/// - Creates the config directory (parent of config file path).
/// - Writes `config.json` with `{}` if missing.
/// - Creates the `photos` storage subdirectory.
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if !config_path.exists() {
        let default_config = b"{}";
        std::fs::write(config_path, default_config)
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
        log::info!("created default config at {}", config_path.display());
    }

    let photos = config_dir.join("photos");
    if !photos.exists() {
        std::fs::create_dir_all(&photos)
            .with_context(|| format!("creating storage directory {}", photos.display()))?;
        log::info!("created storage directory at {}", photos.display());
    } else {
        log::debug!("storage directory already exists at {}, skipping", photos.display());
    }

    Ok(config_dir.to_path_buf())
}

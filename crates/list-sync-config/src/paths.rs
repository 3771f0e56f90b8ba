use anyhow::Result;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "trakt-sync";

/// Base path override for containers and service installs.
pub fn container_base_path() -> Option<PathBuf> {
    std::env::var_os("TRAKT_SYNC_BASE_PATH")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

pub struct PathManager {
    config_dir: PathBuf,
}

impl PathManager {
    pub fn new() -> Result<Self> {
        let base_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join(APP_DIR);
        Ok(Self::with_base(base_dir))
    }

    pub fn with_base(base: PathBuf) -> Self {
        Self { config_dir: base }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    pub fn credentials_file(&self) -> PathBuf {
        self.config_dir.join("credentials.toml")
    }

}

impl Default for PathManager {
    fn default() -> Self {
        if let Some(base) = container_base_path() {
            return Self::with_base(base);
        }

        // ~/.config/trakt-sync on Linux
        Self::new().unwrap_or_else(|_| Self::with_base(PathBuf::from(".").join(APP_DIR)))
    }
}

use list_sync_models::{Category, ListPrivacy, MediaKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Problems `Config::validate` reports.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{0} must be greater than 0")]
    NonPositive(&'static str),

    #[error("{field} must be between 0 and {max}")]
    OutOfRange { field: &'static str, max: u32 },

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("daemon.interval '{value}' is invalid: {reason}")]
    InvalidInterval { value: String, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub trakt: TraktConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TraktConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    /// Owner of the managed lists
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Items fetched per ranked category
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Lower bound of the Trakt rating filter (0 disables it)
    #[serde(default = "default_min_rating")]
    pub min_rating: u8,
    #[serde(default)]
    pub list_privacy: ListPrivacy,
    #[serde(default = "default_full_refresh_days")]
    pub full_refresh_days: i64,
    /// Ranked categories combined into each list, in priority order
    #[serde(default = "default_sources")]
    pub sources: Vec<Category>,
    #[serde(default)]
    pub lists: ListToggles,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ListToggles {
    #[serde(default = "default_true")]
    pub movies: bool,
    #[serde(default = "default_true")]
    pub shows: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Time between sync passes, e.g. "6h" or "90m"
    #[serde(default = "default_interval")]
    pub interval: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "text" or "json". Unset picks JSON when stdout is not a terminal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_limit() -> u32 {
    30
}

fn default_min_rating() -> u8 {
    60
}

fn default_full_refresh_days() -> i64 {
    7
}

pub fn default_sources() -> Vec<Category> {
    vec![Category::Trending, Category::MostWatched]
}

fn default_interval() -> String {
    "6h".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            min_rating: default_min_rating(),
            list_privacy: ListPrivacy::default(),
            full_refresh_days: default_full_refresh_days(),
            sources: default_sources(),
            lists: ListToggles::default(),
        }
    }
}

impl Default for ListToggles {
    fn default() -> Self {
        Self {
            movies: true,
            shows: true,
        }
    }
}

impl ListToggles {
    pub fn is_enabled(&self, kind: MediaKind) -> bool {
        match kind {
            MediaKind::Movie => self.movies,
            MediaKind::Show => self.shows,
        }
    }

    pub fn enabled_kinds(&self) -> Vec<MediaKind> {
        [MediaKind::Movie, MediaKind::Show]
            .into_iter()
            .filter(|kind| self.is_enabled(*kind))
            .collect()
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
        }
    }
}

impl DaemonConfig {
    pub fn interval(&self) -> Result<Duration, ConfigError> {
        parse_interval(&self.interval)
    }
}

/// Parse a human duration such as "6h" or "1h 30m". Zero is rejected.
pub fn parse_interval(value: &str) -> Result<Duration, ConfigError> {
    let interval = humantime::parse_duration(value.trim()).map_err(|e| ConfigError::InvalidInterval {
        value: value.to_string(),
        reason: e.to_string(),
    })?;
    if interval.is_zero() {
        return Err(ConfigError::InvalidInterval {
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(interval)
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
            file: None,
        }
    }
}

impl Config {
    pub fn load_from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the config, writing a default file first when none exists.
    pub fn load_or_create(path: &PathBuf) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Config::default();
            config.save_to_file(path)?;
            return Ok(config);
        }
        Self::load_from_file(path)
    }

    pub fn save_to_file(&self, path: &PathBuf) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trakt.client_id.trim().is_empty() {
            return Err(ConfigError::Missing("trakt.client_id"));
        }
        if self.trakt.client_secret.trim().is_empty() {
            return Err(ConfigError::Missing("trakt.client_secret"));
        }
        if self.trakt.username.trim().is_empty() {
            return Err(ConfigError::Missing("trakt.username"));
        }
        if self.sync.limit == 0 {
            return Err(ConfigError::NonPositive("sync.limit"));
        }
        if self.sync.min_rating > 100 {
            return Err(ConfigError::OutOfRange {
                field: "sync.min_rating",
                max: 100,
            });
        }
        if self.sync.full_refresh_days <= 0 {
            return Err(ConfigError::NonPositive("sync.full_refresh_days"));
        }
        if self.sync.sources.is_empty() {
            return Err(ConfigError::Empty("sync.sources"));
        }
        self.daemon.interval()?;
        Ok(())
    }

    pub fn is_trakt_configured(&self) -> bool {
        !self.trakt.client_id.trim().is_empty() && !self.trakt.client_secret.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, TempDir};

    fn valid_config() -> Config {
        Config {
            trakt: TraktConfig {
                client_id: "test_id".to_string(),
                client_secret: "test_secret".to_string(),
                username: "someone".to_string(),
            },
            ..Config::default()
        }
    }

    #[test]
    fn test_config_load_and_save() {
        let file = NamedTempFile::new().unwrap();
        let mut config = valid_config();
        config.sync.list_privacy = ListPrivacy::Public;
        config.sync.sources = vec![Category::Popular];
        config.sync.lists.shows = false;

        let path = file.path().to_path_buf();
        config.save_to_file(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.trakt.client_id, "test_id");
        assert_eq!(loaded.trakt.username, "someone");
        assert_eq!(loaded.sync.list_privacy, ListPrivacy::Public);
        assert_eq!(loaded.sync.sources, vec![Category::Popular]);
        assert!(loaded.sync.lists.movies);
        assert!(!loaded.sync.lists.shows);
    }

    #[test]
    fn test_defaults_from_sparse_file() {
        let config: Config = toml::from_str("[trakt]\nclient_id = \"abc\"\n").unwrap();
        assert_eq!(config.sync.limit, 30);
        assert_eq!(config.sync.min_rating, 60);
        assert_eq!(config.sync.full_refresh_days, 7);
        assert_eq!(config.sync.list_privacy, ListPrivacy::Private);
        assert_eq!(config.sync.sources, default_sources());
        assert_eq!(config.sync.lists.enabled_kinds(), vec![MediaKind::Movie, MediaKind::Show]);
        assert_eq!(config.daemon.interval().unwrap(), Duration::from_secs(6 * 3600));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_or_create(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.sync.limit, 30);

        let again = Config::load_or_create(&path).unwrap();
        assert_eq!(again.sync.sources, config.sync.sources);
    }

    #[test]
    fn test_config_validate() {
        assert!(valid_config().validate().is_ok());

        let mut config = valid_config();
        config.trakt.username.clear();
        assert_eq!(config.validate(), Err(ConfigError::Missing("trakt.username")));

        let mut config = valid_config();
        config.sync.limit = 0;
        assert_eq!(config.validate(), Err(ConfigError::NonPositive("sync.limit")));

        let mut config = valid_config();
        config.sync.full_refresh_days = -1;
        assert_eq!(config.validate(), Err(ConfigError::NonPositive("sync.full_refresh_days")));

        let mut config = valid_config();
        config.sync.min_rating = 101;
        assert!(matches!(config.validate(), Err(ConfigError::OutOfRange { .. })));

        let mut config = valid_config();
        config.sync.sources.clear();
        assert_eq!(config.validate(), Err(ConfigError::Empty("sync.sources")));

        let mut config = valid_config();
        config.daemon.interval = "often".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidInterval { .. })));
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("90m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_interval("1h 30m").unwrap(), Duration::from_secs(5400));
        assert!(parse_interval("0s").is_err());
    }

    #[test]
    fn test_is_trakt_configured() {
        assert!(!Config::default().is_trakt_configured());
        assert!(valid_config().is_trakt_configured());
    }
}

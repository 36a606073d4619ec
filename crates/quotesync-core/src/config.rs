use quotesync_api::{RetryConfig, DEFAULT_BASE_URL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::sync::Resolution;
use crate::transfer::ImportStrictness;

/// Main configuration structure
///
/// Loaded from `config.toml` in the platform config dir. CLI flags override
/// whatever is in the file; missing keys fall back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub sync: SyncConfig,
    pub storage: StorageConfig,
    pub import: ImportConfig,
    pub notifications: NotificationConfig,
}

impl Config {
    /// Load config from the default location, or defaults if there is no file
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| crate::Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Save config to the default location
    pub fn save(&self) -> crate::Result<PathBuf> {
        let path = Self::config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// `<config dir>/quotesync/config.toml`
    pub fn config_path() -> crate::Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| crate::Error::Config("Could not find config directory".into()))?;
        Ok(config_dir.join("quotesync").join("config.toml"))
    }

    /// Database path from config, or `<data dir>/quotesync/quotes.db`
    pub fn db_path(&self) -> crate::Result<PathBuf> {
        if let Some(path) = &self.storage.db_path {
            return Ok(path.clone());
        }

        let data_dir = dirs::data_dir()
            .ok_or_else(|| crate::Error::Config("Could not find data directory".into()))?;
        Ok(data_dir.join("quotesync").join("quotes.db"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,

    /// Only the first N posts become candidates (0 = all of them)
    pub fetch_limit: usize,

    /// `userId` sent along with pushed quotes
    pub user_id: u64,

    pub retry: RetryConfig,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            fetch_limit: crate::remote::DEFAULT_FETCH_LIMIT,
            user_id: 1,
            retry: RetryConfig::default(),
        }
    }
}

/// What to do when local and server quotes differ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionPolicy {
    /// Ask every time
    #[default]
    Prompt,
    Accept,
    Decline,
}

impl ResolutionPolicy {
    /// The fixed answer, if this policy doesn't ask
    pub fn fixed(&self) -> Option<Resolution> {
        match self {
            ResolutionPolicy::Prompt => None,
            ResolutionPolicy::Accept => Some(Resolution::Accept),
            ResolutionPolicy::Decline => Some(Resolution::Decline),
        }
    }
}

impl std::str::FromStr for ResolutionPolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "prompt" => Ok(ResolutionPolicy::Prompt),
            "accept" => Ok(ResolutionPolicy::Accept),
            "decline" => Ok(ResolutionPolicy::Decline),
            other => Err(crate::Error::Config(format!(
                "Unknown resolution policy '{}' (expected prompt, accept or decline)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds between scheduled syncs
    pub interval_secs: u64,
    pub resolution: ResolutionPolicy,
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            resolution: ResolutionPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ImportConfig {
    pub strictness: ImportStrictness,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotificationConfig {
    /// How long notices stay up, in milliseconds
    pub duration_ms: u64,
}

impl NotificationConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { duration_ms: 3000 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.remote.base_url, "https://jsonplaceholder.typicode.com");
        assert_eq!(config.remote.fetch_limit, 10);
        assert_eq!(config.sync.interval(), Duration::from_secs(30));
        assert_eq!(config.sync.resolution, ResolutionPolicy::Prompt);
        assert_eq!(config.import.strictness, ImportStrictness::Strict);
        assert_eq!(config.notifications.duration(), Duration::from_millis(3000));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [sync]
            resolution = "decline"

            [import]
            strictness = "lax"
            "#,
        )
        .unwrap();

        assert_eq!(config.sync.resolution, ResolutionPolicy::Decline);
        assert_eq!(config.sync.interval_secs, 30);
        assert_eq!(config.import.strictness, ImportStrictness::Lax);
        assert_eq!(config.remote, RemoteConfig::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quotesync").join("config.toml");

        let mut config = Config::default();
        config.sync.interval_secs = 5;
        config.storage.db_path = Some(dir.path().join("q.db"));
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "sync = [[[").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(crate::Error::Config(_))
        ));
    }

    #[test]
    fn test_resolution_policy_parsing() {
        assert_eq!("Accept".parse::<ResolutionPolicy>().unwrap(), ResolutionPolicy::Accept);
        assert_eq!(ResolutionPolicy::Decline.fixed(), Some(Resolution::Decline));
        assert_eq!(ResolutionPolicy::Prompt.fixed(), None);
        assert!("maybe".parse::<ResolutionPolicy>().is_err());
    }

    #[test]
    fn test_config_db_path_override() {
        let mut config = Config::default();
        config.storage.db_path = Some(PathBuf::from("/tmp/quotes.db"));
        assert_eq!(config.db_path().unwrap(), PathBuf::from("/tmp/quotes.db"));
    }
}

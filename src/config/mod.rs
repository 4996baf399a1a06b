//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::export::CsvExporter;
use crate::models::Region;
use crate::parse_duration;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Game client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Folder the client writes replays and the match file into
    #[serde(default = "default_replays_folder")]
    pub replays_folder: PathBuf,

    #[serde(default = "default_arena_file")]
    pub arena_file: String,

    /// How often the match file is polled, e.g. "5s"
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,
}

fn default_replays_folder() -> PathBuf {
    PathBuf::from("C:/Games/World_of_Warships/replays")
}

fn default_arena_file() -> String {
    "tempArenaInfo.json".to_string()
}

fn default_poll_interval() -> String {
    "5s".to_string()
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            replays_folder: default_replays_folder(),
            arena_file: default_arena_file(),
            poll_interval: default_poll_interval(),
        }
    }
}

/// Stats API configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub application_id: String,

    #[serde(default)]
    pub region: Region,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_timeout() -> u64 {
    15
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            application_id: String::new(),
            region: Region::default(),
            timeout_seconds: default_timeout(),
        }
    }
}

/// Auxiliary public feeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_expected_values_url")]
    pub expected_values_url: String,

    /// Per-ship damage color limits; ship damage stays neutral without it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage_limits_url: Option<String>,

    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_hours: i64,
}

fn default_expected_values_url() -> String {
    "https://api.wows-numbers.com/personal/rating/expected/json/".to_string()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./cache")
}

fn default_cache_ttl() -> i64 {
    24
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            expected_values_url: default_expected_values_url(),
            damage_limits_url: None,
            cache_dir: default_cache_dir(),
            cache_ttl_hours: default_cache_ttl(),
        }
    }
}

/// Display options.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Append the personal rating as a trailing column
    #[serde(default)]
    pub show_rating: bool,
}

/// Where resolved matches are saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Write each resolved match to a CSV file
    #[serde(default)]
    pub save_match_csv: bool,

    #[serde(default = "default_matches_dir")]
    pub matches_dir: PathBuf,
}

fn default_matches_dir() -> PathBuf {
    PathBuf::from("./matches")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            save_match_csv: false,
            matches_dir: default_matches_dir(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub game: GameConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub feeds: FeedConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            game: GameConfig::default(),
            api: ApiConfig::default(),
            feeds: FeedConfig::default(),
            display: DisplayConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            warn!("Config file {} not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate the configuration.
    ///
    /// An empty application id passes here so the binary can start and
    /// report the problem through the status channel.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "API timeout must be greater than 0".to_string(),
            ));
        }

        match parse_duration(&self.game.poll_interval) {
            Some(d) if !d.is_zero() => {}
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid poll interval: {:?}",
                    self.game.poll_interval
                )))
            }
        }

        if self.feeds.cache_ttl_hours < 0 {
            return Err(ConfigError::ValidationError(
                "Cache TTL must not be negative".to_string(),
            ));
        }

        Ok(())
    }

    /// Whether the API section carries an application id.
    pub fn has_credentials(&self) -> bool {
        !self.api.application_id.trim().is_empty()
    }

    /// Full path of the match file.
    pub fn arena_path(&self) -> PathBuf {
        self.game.replays_folder.join(&self.game.arena_file)
    }

    /// CSV exporter, when saving matches is enabled.
    pub fn csv_exporter(&self) -> Option<CsvExporter> {
        self.output
            .save_match_csv
            .then(|| CsvExporter::new(self.output.matches_dir.clone()))
    }

    /// Poll interval, falling back to five seconds if unparseable.
    pub fn poll_interval(&self) -> Duration {
        parse_duration(&self.game.poll_interval)
            .filter(|d| !d.is_zero())
            .unwrap_or(Duration::from_secs(5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.log_level, "info");
        assert_eq!(config.api.region, Region::Eu);
        assert_eq!(config.api.timeout_seconds, 15);
        assert_eq!(config.game.arena_file, "tempArenaInfo.json");
        assert_eq!(config.feeds.cache_ttl_hours, 24);
        assert!(!config.display.show_rating);
    }

    #[test]
    fn test_config_validation_ok() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_timeout() {
        let mut config = AppConfig::default();
        config.api.timeout_seconds = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bad_poll_interval() {
        let mut config = AppConfig::default();
        config.game.poll_interval = "soon".to_string();
        assert!(config.validate().is_err());

        config.game.poll_interval = "0s".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_output_section() {
        assert_eq!(AppConfig::default().csv_exporter(), None);

        let config: AppConfig = toml::from_str(
            r#"
[output]
save_match_csv = true
matches_dir = "saved"
"#,
        )
        .unwrap();
        let exporter = config.csv_exporter().unwrap();
        assert_eq!(exporter.dir(), Path::new("saved"));
    }

    #[test]
    fn test_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[api]
application_id = "abc123"
region = "na"

[display]
show_rating = true
"#
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.api.application_id, "abc123");
        assert_eq!(config.api.region, Region::Na);
        assert_eq!(config.api.timeout_seconds, 15);
        assert!(config.display.show_rating);
        assert!(config.has_credentials());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_or_default(&dir.path().join("none.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(!config.has_credentials());
    }

    #[test]
    fn test_arena_path_and_interval() {
        let mut config = AppConfig::default();
        config.game.replays_folder = PathBuf::from("/games/replays");
        config.game.poll_interval = "2s".to_string();

        assert_eq!(
            config.arena_path(),
            PathBuf::from("/games/replays/tempArenaInfo.json")
        );
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();

        // Should be parseable
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }
}

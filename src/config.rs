//! Configuration system using TOML files.
//!
//! Config is looked up in this order:
//! 1. An explicit `--config` path
//! 2. `./config.toml` in the working directory
//! 3. The OS-standard config directory:
//!    - Windows: %APPDATA%\spotidal\config.toml
//!    - macOS: ~/Library/Application Support/spotidal/config.toml
//!    - Linux: ~/.config/spotidal/config.toml
//!
//! A missing file is created with defaults. Unknown keys and malformed
//! values are rejected; a config error is fatal before any job starts.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::catalog::Quality;
use crate::matcher::MatchConfig;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Input and output locations
    pub paths: PathsConfig,

    /// Pipeline behaviour
    pub downloader: DownloaderConfig,

    /// Audio quality and lyrics
    pub songs: SongsConfig,

    /// Log level and retention
    pub logging: LoggingConfig,

    /// Matcher weights and floor
    pub matching: MatchConfig,

    /// Backend instances
    pub catalog: CatalogConfig,
}

/// Input and output locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct PathsConfig {
    /// Exported playlist CSV
    pub playlist_file: PathBuf,
    /// Root directory for downloaded audio and lyrics
    pub download_path: PathBuf,
    /// Directory holding `completed.json` and `failed.json`
    pub cache_path: PathBuf,
    /// Directory for log files
    pub log_path: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            playlist_file: PathBuf::from("./playlist.csv"),
            download_path: PathBuf::from("./downloads"),
            cache_path: PathBuf::from("./cache"),
            log_path: PathBuf::from("./logs"),
        }
    }
}

/// Pipeline behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct DownloaderConfig {
    /// Remove downloads whose entries left the playlist
    pub sync: bool,
    /// Retry entries recorded as failed on earlier runs
    pub retry_failed: bool,
    /// Name files after the catalog track instead of the playlist entry
    pub prefer_tidal_naming: bool,
    /// Strip characters Windows rejects in file names
    pub windows_safe_file_names: bool,
    /// Maximum jobs in flight
    pub concurrent_downloads: usize,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            sync: false,
            retry_failed: true,
            prefer_tidal_naming: false,
            windows_safe_file_names: true,
            concurrent_downloads: 3,
        }
    }
}

/// Audio quality and lyrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct SongsConfig {
    pub quality: Quality,
    /// Download lyrics after the audio
    pub lyrics: bool,
    /// Fall back to plain lyrics when no synced lyrics exist
    pub unsynced_lyrics: bool,
}

impl Default for SongsConfig {
    fn default() -> Self {
        Self {
            quality: Quality::High,
            lyrics: true,
            unsynced_lyrics: false,
        }
    }
}

/// Log level and retention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct LoggingConfig {
    /// One of trace, debug, info, warn, error
    pub level: String,
    /// Number of log files to keep
    pub file_limit: usize,
    /// Log skipped entries at info level instead of debug
    pub log_skipped: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_limit: 5,
            log_skipped: true,
        }
    }
}

/// Backend instances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct CatalogConfig {
    /// Search API instances; the fastest one is used
    pub api_instances: Vec<String>,
    /// Streaming instances; the fastest one is used
    pub streaming_instances: Vec<String>,
    /// LRCLIB lookup endpoint
    pub lyrics_url: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_instances: vec![
                "https://tidal-api.binimum.org".to_string(),
                "https://monochrome-api.samidy.com".to_string(),
            ],
            streaming_instances: vec![
                "https://tidal.kinoplus.online".to_string(),
                "https://triton.squid.wtf".to_string(),
            ],
            lyrics_url: "https://lrclib.net/api/get".to_string(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.downloader.concurrent_downloads == 0 {
            return Err(ConfigError::invalid(
                "downloader.concurrentDownloads",
                "must be at least 1",
            ));
        }
        if self.logging.file_limit == 0 {
            return Err(ConfigError::invalid("logging.fileLimit", "must be at least 1"));
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::invalid(
                "logging.level",
                format!("expected one of {}", LOG_LEVELS.join(", ")),
            ));
        }
        self.matching.validate()?;
        if self.catalog.api_instances.is_empty() {
            return Err(ConfigError::invalid("catalog.apiInstances", "must not be empty"));
        }
        if self.catalog.streaming_instances.is_empty() {
            return Err(ConfigError::invalid(
                "catalog.streamingInstances",
                "must not be empty",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("spotidal"))
}

/// Resolve which config file to use.
pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    let local = PathBuf::from("config.toml");
    if local.exists() {
        return local;
    }
    config_dir()
        .map(|d| d.join("config.toml"))
        .unwrap_or(local)
}

/// Parse and validate a config document.
pub fn parse(contents: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(contents).map_err(ConfigError::Parse)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from disk, writing defaults if the file is missing.
///
/// Unlike a GUI preference file, a broken config is fatal here: running a
/// download with silently substituted defaults could fill the wrong folder.
pub fn load_or_create(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        tracing::info!("No config file found at {:?}, writing defaults", path);
        let config = Config::default();
        save(&config, path)?;
        return Ok(config);
    }

    let contents =
        std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
    let config = parse(&contents)?;
    tracing::debug!("Loaded config from {:?}", path);
    Ok(config)
}

/// Save configuration to disk
///
/// Creates the parent directory if it doesn't exist.
pub fn save(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    // Serialize to pretty TOML
    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, path)
        .map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(toml::de::Error),

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: String, message: String },

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[paths]"));
        assert!(toml.contains("[downloader]"));
        assert!(toml.contains("[songs]"));
        assert!(toml.contains("[logging]"));
        assert!(toml.contains("concurrentDownloads = 3"));
        assert!(toml.contains("quality = \"high\""));
    }

    #[test]
    fn test_default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.downloader.retry_failed = false;
        config.songs.quality = Quality::Lossless;
        config.paths.download_path = PathBuf::from("/music");

        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed = parse(&toml).unwrap();

        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml = r#"
[downloader]
concurrentDownloads = 8

[songs]
quality = "lossless"
"#;
        let config = parse(toml).unwrap();

        assert_eq!(config.downloader.concurrent_downloads, 8);
        assert_eq!(config.songs.quality, Quality::Lossless);

        // Other fields use defaults
        assert!(config.downloader.retry_failed);
        assert!(config.songs.lyrics);
        assert_eq!(config.paths.cache_path, PathBuf::from("./cache"));
        assert_eq!(config.logging.file_limit, 5);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let toml = r#"
[downloader]
concurentDownloads = 8
"#;
        assert!(matches!(parse(toml), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_unknown_section_is_rejected() {
        assert!(matches!(parse("[ui]\ntheme = \"dark\"\n"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_bad_quality_is_rejected() {
        let toml = "[songs]\nquality = \"ultra\"\n";
        assert!(matches!(parse(toml), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        let toml = "[downloader]\nconcurrentDownloads = 0\n";
        assert!(matches!(
            parse(toml),
            Err(ConfigError::Invalid { ref key, .. }) if key == "downloader.concurrentDownloads"
        ));
    }

    #[test]
    fn test_bad_log_level_is_rejected() {
        let toml = "[logging]\nlevel = \"verbose\"\n";
        assert!(matches!(parse(toml), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_load_or_create_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = load_or_create(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());

        // Second load reads the file back
        let again = load_or_create(&path).unwrap();
        assert_eq!(again, config);
    }

    #[test]
    fn test_resolve_path_prefers_explicit() {
        let explicit = Path::new("/etc/spotidal.toml");
        assert_eq!(resolve_path(Some(explicit)), PathBuf::from("/etc/spotidal.toml"));
    }
}

//! Configuration file parser for ~/.config/readmaster/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are accepted but logged, since they are usually typos.
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::adapter::DEFAULT_YOUTUBE_FEED_BASE;
use crate::analysis::DEFAULT_ANALYSIS_BASE_URL;
use crate::feed::{DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_FEED_SIZE};
use crate::normalize::DEFAULT_SUMMARY_CHARS;
use crate::sync::DEFAULT_MAX_CONCURRENT_SYNCS;

/// Environment variable that overrides `openai_api_key`.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

const KNOWN_KEYS: &[&str] = &[
    "database_path",
    "fetch_timeout_secs",
    "max_feed_bytes",
    "user_agent",
    "summary_chars",
    "max_concurrent_syncs",
    "youtube_feed_base",
    "analysis_base_url",
    "openai_api_key",
];

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration
// ============================================================================

/// Top-level application configuration.
///
/// Any subset of keys can be specified; missing keys take their defaults.
/// `Debug` masks `openai_api_key`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite file. Defaults to `readmaster.db` next to the config file.
    pub database_path: Option<PathBuf>,

    /// Wall-clock budget for one feed request, in seconds.
    pub fetch_timeout_secs: u64,

    /// Feed responses larger than this are rejected.
    pub max_feed_bytes: usize,

    pub user_agent: String,

    /// Summary length in characters before the truncation marker.
    pub summary_chars: usize,

    /// Sources synced concurrently by `sync` without `--source`.
    pub max_concurrent_syncs: usize,

    pub youtube_feed_base: String,

    pub analysis_base_url: String,

    /// OpenAI API key (alternative to the OPENAI_API_KEY env var).
    /// Env var takes precedence over config file.
    pub openai_api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT.as_secs(),
            max_feed_bytes: DEFAULT_MAX_FEED_SIZE,
            user_agent: format!("readmaster/{}", env!("CARGO_PKG_VERSION")),
            summary_chars: DEFAULT_SUMMARY_CHARS,
            max_concurrent_syncs: DEFAULT_MAX_CONCURRENT_SYNCS,
            youtube_feed_base: DEFAULT_YOUTUBE_FEED_BASE.to_string(),
            analysis_base_url: DEFAULT_ANALYSIS_BASE_URL.to_string(),
            openai_api_key: None,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("max_feed_bytes", &self.max_feed_bytes)
            .field("user_agent", &self.user_agent)
            .field("summary_chars", &self.summary_chars)
            .field("max_concurrent_syncs", &self.max_concurrent_syncs)
            .field("youtube_feed_base", &self.youtube_feed_base)
            .field("analysis_base_url", &self.analysis_base_url)
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigFileError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigFileError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigFileError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigFileError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }

    /// The API key, preferring the environment over the file.
    pub fn api_key(&self) -> Option<SecretString> {
        let from_env = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty());
        self.resolve_api_key(from_env)
    }

    fn resolve_api_key(&self, from_env: Option<String>) -> Option<SecretString> {
        from_env
            .or_else(|| self.openai_api_key.clone())
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from)
    }

    /// `database_path`, or `readmaster.db` inside `config_dir`.
    pub fn database_path_in(&self, config_dir: &Path) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| config_dir.join("readmaster.db"))
    }
}

// ============================================================================
// Tests
// ============================================================================

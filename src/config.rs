//! Configuration management.
//!
//! Loads settings from a TOML file with sensible defaults for everything,
//! so the proxy runs against the live API with nothing but an API key.

use crate::normalize::CurationRules;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// External catalog API settings
    pub api: ApiConfig,

    /// Outbound rate limiting
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Cache store settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Tag curation rules for the details normalizer
    #[serde(default)]
    pub curation: CurationRules,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// External API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Catalog site base URL (also the base for canonical book URLs)
    pub base_url: String,

    /// API key credential attached to every request
    pub key: String,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum outbound requests admitted per rolling window
    pub requests_per_window: usize,

    /// Window length in milliseconds
    pub window_ms: u64,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// When false, reads always miss; writes still happen
    pub enabled: bool,

    /// Redis connection URL
    pub redis_url: String,

    /// Key namespace prefix
    pub namespace: String,

    /// TTL for shelf listing pages, in seconds
    pub shelf_ttl_seconds: u64,

    /// TTL for book detail pages, in seconds
    pub details_ttl_seconds: u64,
}

/// Logging configuration (serde-facing mirror of [`crate::logging::LogConfig`])
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub log_dir: String,
    pub default_level: String,
    pub console: bool,
    pub file: bool,
    pub json_format: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: 3,
            window_ms: 1_000,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            redis_url: "redis://127.0.0.1/".to_string(),
            namespace: "goodreads".to_string(),
            shelf_ttl_seconds: 300,
            details_ttl_seconds: 604_800,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: "data/logs".to_string(),
            default_level: "info".to_string(),
            console: true,
            file: false,
            json_format: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "https://www.goodreads.com".to_string(),
                key: String::new(),
            },
            rate_limit: RateLimitConfig::default(),
            cache: CacheConfig::default(),
            curation: CurationRules::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// If the file doesn't exist, returns the default configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Rate limiter window as a [`Duration`]
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_millis(self.rate_limit.window_ms)
    }

    /// Shelf page TTL as a [`Duration`]
    pub fn shelf_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.shelf_ttl_seconds)
    }

    /// Book details TTL as a [`Duration`]
    pub fn details_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.details_ttl_seconds)
    }
}

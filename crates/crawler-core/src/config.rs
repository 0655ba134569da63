//! Configuration for the crawler.
//!
//! Configuration is resolved once at process start and injected into the
//! parsers. Nothing reads the environment after that.
//!
//! ## Configuration Hierarchy
//!
//! 1. **Defaults**: see [`CrawlerConfig::default`]
//! 2. **Config file**: `config.toml` in the platform config directory, or an explicit path
//! 3. **Environment**: `TIBIA_CRAWLER_BASE_URL` overrides the base URL
//!
//! ## Example Configuration File
//!
//! ```toml
//! base_url = "https://proxy.example.com/"
//! retries = 3
//! timeout_secs = 20
//! rate_limit_ms = 750
//!
//! [server_save]
//! start = "07:58"
//! end = "09:00"
//! ```
//!
//! ## Examples
//!
//! ```rust
//! use crawler_core::CrawlerConfig;
//!
//! let config = CrawlerConfig::default();
//! assert_eq!(config.base_url, "https://www.tibia.com/");
//! assert_eq!(config.endpoint_url("/library/?subtopic=boostablebosses"),
//!     "https://www.tibia.com/library/?subtopic=boostablebosses");
//! ```

use crate::window::ServerSaveWindow;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default base URL of tibia.com.
pub const DEFAULT_BASE_URL: &str = "https://www.tibia.com/";

/// Host tibia.com redirects to while under maintenance.
pub const MAINTENANCE_HOST: &str = "maintenance.tibia.com";

/// Environment variable overriding the base URL, e.g. to route through a proxy.
pub const BASE_URL_ENV: &str = "TIBIA_CRAWLER_BASE_URL";

/// Crawler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Base URL every endpoint is joined to.
    pub base_url: String,

    /// Daily server save window, in UTC.
    pub server_save: WindowConfig,

    /// Attempt budget used when the caller does not pass one. `0` and `1` both
    /// mean a single attempt.
    pub retries: u8,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Minimum spacing between requests in milliseconds for the default rate
    /// limiter. `0` disables it.
    pub rate_limit_ms: u64,
}

/// Server save window boundaries as `HH:MM` strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Start of the window, exclusive.
    pub start: String,
    /// End of the window, exclusive.
    pub end: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            start: "07:58".to_string(),
            end: "09:00".to_string(),
        }
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            server_save: WindowConfig::default(),
            retries: 1,
            timeout_secs: 30,
            rate_limit_ms: 750,
        }
    }
}

impl CrawlerConfig {
    /// Load the configuration from the default location and the environment.
    ///
    /// A missing config file is not an error; defaults are used instead.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Load the configuration from an explicit file, then apply the environment.
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::from_file(path)?.with_env_overrides(|key| std::env::var(key).ok())
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply environment overrides using the given lookup and validate the result.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup(BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            tracing::debug!("Base URL overridden by {BASE_URL_ENV}: {base_url}");
            self.base_url = base_url;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check that the base URL and window boundaries are usable.
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("Invalid base URL '{}': {e}", self.base_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "Unsupported base URL scheme '{}'",
                url.scheme()
            )));
        }
        self.server_save_window()?;
        Ok(())
    }

    /// Parse the configured server save window.
    pub fn server_save_window(&self) -> Result<ServerSaveWindow> {
        ServerSaveWindow::parse(&self.server_save.start, &self.server_save.end)
    }

    /// Request timeout as a [`Duration`].
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Rate limiter interval, if pacing is enabled.
    pub const fn rate_limit_interval(&self) -> Option<Duration> {
        if self.rate_limit_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.rate_limit_ms))
        }
    }

    /// Join an endpoint path onto the base URL.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), endpoint)
    }

    /// Location of the default config file.
    ///
    /// - Linux: `~/.config/tibia-crawler/config.toml`
    /// - macOS: `~/Library/Application Support/dev.tibia-crawler.tibia-crawler/config.toml`
    /// - Windows: `%APPDATA%\tibia-crawler\tibia-crawler\config\config.toml`
    pub fn config_path() -> Result<PathBuf> {
        let project_dirs = directories::ProjectDirs::from("dev", "tibia-crawler", "tibia-crawler")
            .ok_or_else(|| Error::Config("Failed to determine project directories".into()))?;
        Ok(project_dirs.config_dir().join("config.toml"))
    }
}

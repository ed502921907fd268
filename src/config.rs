use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::constants;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub catalog: CatalogConfig,

    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub base_url: String,

    /// v3 API key, sent as the `api_key` query parameter.
    /// Overridden by `TMDB_API_KEY`.
    pub api_key: Option<String>,

    /// v4 read access token, sent as a bearer token. Takes precedence over
    /// `api_key`. Overridden by `TMDB_ACCESS_TOKEN`.
    pub access_token: Option<String>,

    pub language: Option<String>,

    pub include_adult: bool,

    /// Request timeout in seconds (default: 10)
    pub request_timeout_seconds: u64,

    pub user_agent: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.themoviedb.org/3".to_string(),
            api_key: None,
            access_token: None,
            language: Some("en-US".to_string()),
            include_adult: false,
            request_timeout_seconds: constants::fetch::DEFAULT_TIMEOUT.as_secs(),
            user_agent: "Cinesearch/1.0".to_string(),
        }
    }
}

impl CatalogConfig {
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Delay between the last keystroke and the committed query (default: 400)
    pub debounce_ms: u64,

    /// Pages loaded up front by the `search` command (default: 1)
    pub initial_pages: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: constants::search::DEBOUNCE_DELAY_MS,
            initial_pages: 1,
        }
    }
}

impl SearchConfig {
    #[must_use]
    pub const fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Config {
    /// Returns the first existing file on the config search path.
    #[must_use]
    pub fn locate() -> Option<PathBuf> {
        Self::config_paths().into_iter().find(|path| path.exists())
    }

    /// Loads `path`, or the defaults when there is none, then applies
    /// environment overrides.
    ///
    /// Runs before tracing is set up, so it does not log.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_path(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("cinesearch").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".cinesearch").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    /// Credentials from the environment win over the config file.
    pub fn apply_env_overrides(&mut self) {
        if let Some(key) = non_empty_env(constants::env::API_KEY) {
            self.catalog.api_key = Some(key);
        }
        if let Some(token) = non_empty_env(constants::env::ACCESS_TOKEN) {
            self.catalog.access_token = Some(token);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.catalog.base_url.trim().is_empty() {
            anyhow::bail!("Catalog base URL cannot be empty");
        }

        url::Url::parse(&self.catalog.base_url)
            .with_context(|| format!("Invalid catalog base URL: {}", self.catalog.base_url))?;

        if self.catalog.request_timeout_seconds == 0 {
            anyhow::bail!("Catalog request timeout must be > 0");
        }

        if self.search.debounce_delay() > constants::search::MAX_DEBOUNCE_DELAY {
            anyhow::bail!(
                "Debounce delay must be at most {}ms",
                constants::search::MAX_DEBOUNCE_DELAY.as_millis()
            );
        }

        Ok(())
    }

    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.catalog.api_key.is_some() || self.catalog.access_token.is_some()
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

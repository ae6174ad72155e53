//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Lower bound on the keep-warm timer period.
const MIN_REFRESH_PERIOD: Duration = Duration::from_millis(500);

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Listening address of the published API
    #[serde(default)]
    pub server: ServerConfig,

    /// Status page polling and caching
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Audio relay settings
    #[serde(default)]
    pub relay: RelayConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Overlay the process environment on top of this configuration.
    pub fn with_env(self) -> Self {
        let mut config = self;
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Overlay environment-style overrides read through `lookup`.
    ///
    /// Recognized keys: `PORT`, `SCRAPE_URL`, `CACHE_MS`, `FETCH_TIMEOUT_MS`
    /// (or the older `AXIOS_TIMEOUT`), `USER_AGENT`, `STREAM_URL`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = parse_env(&lookup, "PORT") {
            self.server.port = port;
        }
        if let Some(url) = lookup("SCRAPE_URL").filter(|v| !v.trim().is_empty()) {
            self.upstream.url = url.trim().to_string();
        }
        if let Some(cache_ms) = parse_env(&lookup, "CACHE_MS") {
            self.upstream.cache_ms = cache_ms;
        }
        if let Some(timeout_ms) =
            parse_env(&lookup, "FETCH_TIMEOUT_MS").or_else(|| parse_env(&lookup, "AXIOS_TIMEOUT"))
        {
            self.upstream.timeout_ms = timeout_ms;
        }
        if let Some(agent) = lookup("USER_AGENT").filter(|v| !v.trim().is_empty()) {
            self.upstream.user_agent = agent;
        }
        if let Some(url) = lookup("STREAM_URL").filter(|v| !v.trim().is_empty()) {
            self.relay.url = url.trim().to_string();
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.upstream.url.trim().is_empty() {
            return Err(AppError::validation("upstream.url is empty"));
        }
        Url::parse(&self.upstream.url)
            .map_err(|e| AppError::validation(format!("upstream.url is invalid: {e}")))?;
        if self.upstream.user_agent.trim().is_empty() {
            return Err(AppError::validation("upstream.user_agent is empty"));
        }
        if self.upstream.timeout_ms == 0 {
            return Err(AppError::validation("upstream.timeout_ms must be > 0"));
        }
        if self.relay.enabled {
            Url::parse(&self.relay.url)
                .map_err(|e| AppError::validation(format!("relay.url is invalid: {e}")))?;
            if self.relay.timeout_ms == 0 {
                return Err(AppError::validation("relay.timeout_ms must be > 0"));
            }
        }
        Ok(())
    }
}

fn parse_env<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring {key}={raw:?}: not a valid number");
            None
        }
    }
}

/// Listening address of the published API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "defaults::host")]
    pub host: String,

    #[serde(default = "defaults::port")]
    pub port: u16,
}

impl ServerConfig {
    /// Socket address string for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::host(),
            port: defaults::port(),
        }
    }
}

/// Status page polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// URL of the SHOUTcast status page
    #[serde(default = "defaults::scrape_url")]
    pub url: String,

    /// Maximum age of the cached record in milliseconds
    #[serde(default = "defaults::cache_ms")]
    pub cache_ms: u64,

    /// Fetch timeout in milliseconds
    #[serde(default = "defaults::timeout_ms")]
    pub timeout_ms: u64,

    /// User-Agent header for status page requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,
}

impl UpstreamConfig {
    pub fn cache_duration(&self) -> Duration {
        Duration::from_millis(self.cache_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Period of the keep-warm timer: the cache duration, but never under 500ms.
    pub fn refresh_period(&self) -> Duration {
        self.cache_duration().max(MIN_REFRESH_PERIOD)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: defaults::scrape_url(),
            cache_ms: defaults::cache_ms(),
            timeout_ms: defaults::timeout_ms(),
            user_agent: defaults::user_agent(),
        }
    }
}

/// Audio relay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "defaults::relay_enabled")]
    pub enabled: bool,

    /// Upstream audio stream URL
    #[serde(default = "defaults::stream_url")]
    pub url: String,

    /// Time allowed for the upstream to answer with headers
    #[serde(default = "defaults::relay_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "defaults::relay_user_agent")]
    pub user_agent: String,
}

impl RelayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::relay_enabled(),
            url: defaults::stream_url(),
            timeout_ms: defaults::relay_timeout_ms(),
            user_agent: defaults::relay_user_agent(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    // Server defaults
    pub fn host() -> String {
        "0.0.0.0".into()
    }
    pub fn port() -> u16 {
        3000
    }

    // Upstream defaults
    pub fn scrape_url() -> String {
        "http://sonicpanel.oficialserver.com:8342/index.html".into()
    }
    pub fn cache_ms() -> u64 {
        1000
    }
    pub fn timeout_ms() -> u64 {
        8000
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; Scraper/1.0)".into()
    }

    // Relay defaults
    pub fn relay_enabled() -> bool {
        true
    }
    pub fn stream_url() -> String {
        "http://sonicpanel.oficialserver.com:8342/;".into()
    }
    pub fn relay_timeout_ms() -> u64 {
        20_000
    }
    pub fn relay_user_agent() -> String {
        "StreamProxy/1.0".into()
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Placeholder values shipped in the example config.
const TOKEN_PLACEHOLDER: &str = "YOUR_BOT_TOKEN_HERE";
const CHAT_ID_PLACEHOLDER: &str = "YOUR_CHAT_ID_HERE";

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Upstream feed settings
    #[serde(default)]
    pub feed: FeedConfig,

    /// Messaging endpoint settings
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Poll loop behavior
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// What counts as an update worth announcing
    #[serde(default)]
    pub detection: DetectionConfig,

    /// State file location
    #[serde(default)]
    pub state: StateConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values.
    ///
    /// Every failure here is a [`AppError::Config`] and stops startup.
    pub fn validate(&self) -> Result<()> {
        let token = self.telegram.bot_token.trim();
        if token.is_empty() || token == TOKEN_PLACEHOLDER {
            return Err(AppError::config("telegram.bot_token is not set"));
        }
        let chat_id = self.telegram.chat_id.trim();
        if chat_id.is_empty() || chat_id == CHAT_ID_PLACEHOLDER {
            return Err(AppError::config("telegram.chat_id is not set"));
        }
        if self.monitor.poll_interval_secs == 0 {
            return Err(AppError::config("monitor.poll_interval_secs must be > 0"));
        }
        if self.feed.timeout_secs == 0 {
            return Err(AppError::config("feed.timeout_secs must be > 0"));
        }
        if self.telegram.timeout_secs == 0 {
            return Err(AppError::config("telegram.timeout_secs must be > 0"));
        }
        if self.feed.user_agent.trim().is_empty() {
            return Err(AppError::config("feed.user_agent is empty"));
        }
        for (name, value) in [
            ("feed.url", &self.feed.url),
            ("feed.document_base_url", &self.feed.document_base_url),
            ("feed.index_url", &self.feed.index_url),
            ("telegram.api_base", &self.telegram.api_base),
        ] {
            Url::parse(value).map_err(|e| AppError::config(format!("{name} is invalid: {e}")))?;
        }
        if self.state.path.as_os_str().is_empty() {
            return Err(AppError::config("state.path is empty"));
        }
        Ok(())
    }
}

/// Upstream feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// JSON endpoint listing active applications
    #[serde(default = "defaults::feed_url")]
    pub url: String,

    /// Base that relative document paths are joined onto
    #[serde(default = "defaults::document_base_url")]
    pub document_base_url: String,

    /// Page listing every application, linked at the end of alerts
    #[serde(default = "defaults::index_url")]
    pub index_url: String,

    /// User-Agent header for feed requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::feed_timeout")]
    pub timeout_secs: u64,

    /// Append a timestamp query parameter to bypass CDN caches
    #[serde(default = "defaults::enabled")]
    pub cache_bust: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: defaults::feed_url(),
            document_base_url: defaults::document_base_url(),
            index_url: defaults::index_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::feed_timeout(),
            cache_bust: defaults::enabled(),
        }
    }
}

/// Telegram Bot API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,

    /// Destination chat or channel id (`-100...` or `@channel`)
    #[serde(default)]
    pub chat_id: String,

    /// Bot API root
    #[serde(default = "defaults::telegram_api_base")]
    pub api_base: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::telegram_timeout")]
    pub timeout_secs: u64,

    /// Pause between consecutive alerts in milliseconds
    #[serde(default = "defaults::send_delay")]
    pub send_delay_ms: u64,

    #[serde(default)]
    pub disable_web_page_preview: bool,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            api_base: defaults::telegram_api_base(),
            timeout_secs: defaults::telegram_timeout(),
            send_delay_ms: defaults::send_delay(),
            disable_web_page_preview: false,
        }
    }
}

/// Poll loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between cycles
    #[serde(default = "defaults::poll_interval")]
    pub poll_interval_secs: u64,

    /// Record the first snapshot of an empty store without alerting
    #[serde(default = "defaults::enabled")]
    pub seed_silently: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: defaults::poll_interval(),
            seed_silently: defaults::enabled(),
        }
    }
}

/// Policy for re-announcing known listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Announce status transitions such as Active to Withdrawn
    #[serde(default = "defaults::enabled")]
    pub notify_on_status_change: bool,

    /// Announce added or removed documents
    #[serde(default = "defaults::enabled")]
    pub notify_on_document_change: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            notify_on_status_change: true,
            notify_on_document_change: true,
        }
    }
}

impl DetectionConfig {
    /// Only brand-new ids are announced.
    pub fn new_only() -> Self {
        Self {
            notify_on_status_change: false,
            notify_on_document_change: false,
        }
    }
}

/// State file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    #[serde(default = "defaults::state_path")]
    pub path: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: defaults::state_path(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset
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
    use std::path::PathBuf;

    pub fn enabled() -> bool {
        true
    }

    // Feed defaults
    pub fn feed_url() -> String {
        "https://www1.hkexnews.hk/ncms/json/eds/appactive_app_sehk_c.json".into()
    }
    pub fn document_base_url() -> String {
        "https://www1.hkexnews.hk/app/".into()
    }
    pub fn index_url() -> String {
        "https://www1.hkexnews.hk/app/appindex.html?lang=zh".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; listing-monitor/0.1)".into()
    }
    pub fn feed_timeout() -> u64 {
        30
    }

    // Telegram defaults
    pub fn telegram_api_base() -> String {
        "https://api.telegram.org".into()
    }
    pub fn telegram_timeout() -> u64 {
        15
    }
    pub fn send_delay() -> u64 {
        1000
    }

    // Monitor defaults
    pub fn poll_interval() -> u64 {
        60
    }

    pub fn state_path() -> PathBuf {
        PathBuf::from("listings_state.json")
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

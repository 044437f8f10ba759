// src/config.rs

//! Configuration loading utilities.
//!
//! Settings come from a TOML file, then environment variables override the
//! values that are usually kept out of files (credentials, paths).

use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::models::Config;

/// Environment variable names recognised as overrides.
pub const ENV_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_CHAT_ID: &str = "TELEGRAM_CHAT_ID";
pub const ENV_POLL_INTERVAL: &str = "POLL_INTERVAL_SECONDS";
pub const ENV_STATE_PATH: &str = "LISTING_STATE_PATH";

/// Load configuration from a TOML file and the process environment.
///
/// A missing file silently falls back to defaults, callers decide whether to
/// report it. A file that exists but does not parse is a configuration error.
/// The result is not validated.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        Config::load(path).map_err(|e| {
            AppError::config(format!("failed to load {}: {}", path.display(), e))
        })?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

/// Load, apply overrides and validate.
pub fn load_validated(path: &Path) -> Result<Config> {
    let config = load_config(path)?;
    config.validate()?;
    Ok(config)
}

/// Apply overrides from a variable lookup.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(token) = value(ENV_BOT_TOKEN) {
        config.telegram.bot_token = token;
    }
    if let Some(chat_id) = value(ENV_CHAT_ID) {
        config.telegram.chat_id = chat_id;
    }
    if let Some(interval) = value(ENV_POLL_INTERVAL) {
        config.monitor.poll_interval_secs = interval.trim().parse().map_err(|_| {
            AppError::config(format!("{ENV_POLL_INTERVAL} must be a whole number of seconds"))
        })?;
    }
    if let Some(path) = value(ENV_STATE_PATH) {
        config.state.path = PathBuf::from(path);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        apply_env_overrides(
            &mut config,
            env(&[
                (ENV_BOT_TOKEN, "42:token"),
                (ENV_CHAT_ID, "@hk_ipo"),
                (ENV_POLL_INTERVAL, "120"),
                (ENV_STATE_PATH, "/var/lib/monitor/state.json"),
            ]),
        )
        .unwrap();

        assert_eq!(config.telegram.bot_token, "42:token");
        assert_eq!(config.telegram.chat_id, "@hk_ipo");
        assert_eq!(config.monitor.poll_interval_secs, 120);
        assert_eq!(
            config.state.path,
            PathBuf::from("/var/lib/monitor/state.json")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_blank_env_values_ignored() {
        let mut config = Config::default();
        config.telegram.chat_id = "from-file".to_string();
        apply_env_overrides(&mut config, env(&[(ENV_CHAT_ID, "  ")])).unwrap();
        assert_eq!(config.telegram.chat_id, "from-file");
    }

    #[test]
    fn test_bad_interval_is_config_error() {
        let mut config = Config::default();
        let result = apply_env_overrides(&mut config, env(&[(ENV_POLL_INTERVAL, "soon")]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config.feed.url, Config::default().feed.url);
    }

    #[test]
    fn test_unparseable_file_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[telegram\nbot_token = ").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_file_values_loaded() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            "[telegram]\nbot_token = \"1:abc\"\nchat_id = \"-100\"\n\n[monitor]\npoll_interval_secs = 30\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.monitor.poll_interval_secs, 30);
        assert!(config.validate().is_ok());
    }
}

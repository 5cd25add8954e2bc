//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default trigger mention scanned for in casts.
pub const DEFAULT_TRIGGER: &str = "@bantabro";

/// Telegram credentials for the moderator alert channel.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: SecretString,
    pub chat_id: String,
}

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Mention that marks a cast as a command candidate.
    pub trigger: String,
    /// Base URL for challenge deep links.
    pub app_url: String,
    /// Moderation dashboard URL included in alerts.
    pub dashboard_url: String,
    /// Moderator alert credentials. `None` disables alerts.
    pub telegram: Option<TelegramConfig>,
    /// Telegram Bot API base URL.
    pub telegram_api_url: String,
    /// Upper bound on a single alert delivery.
    pub notify_timeout: Duration,
    /// libSQL database file.
    pub db_path: PathBuf,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            trigger: DEFAULT_TRIGGER.to_string(),
            app_url: "https://bantabro.com".to_string(),
            dashboard_url: "https://dashboard.bantabro.com".to_string(),
            telegram: None,
            telegram_api_url: "https://api.telegram.org".to_string(),
            notify_timeout: Duration::from_secs(10),
            db_path: PathBuf::from("./data/bantabro.db"),
        }
    }
}

impl BotConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let trigger = get("BANTABRO_TRIGGER").unwrap_or(defaults.trigger);
        if !trigger.starts_with('@') || trigger.len() < 2 {
            return Err(ConfigError::InvalidValue {
                key: "BANTABRO_TRIGGER".into(),
                message: format!("expected a mention like @bantabro, got {trigger:?}"),
            });
        }

        let telegram = match (get("TELEGRAM_BOT_TOKEN"), get("TELEGRAM_CHAT_ID")) {
            (Some(token), Some(chat_id)) => Some(TelegramConfig {
                bot_token: SecretString::from(token),
                chat_id,
            }),
            _ => None,
        };

        let notify_timeout = match get("BANTABRO_NOTIFY_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "BANTABRO_NOTIFY_TIMEOUT_SECS".into(),
                    message: format!("not a whole number of seconds: {raw}"),
                })?;
                Duration::from_secs(secs)
            }
            None => defaults.notify_timeout,
        };

        Ok(Self {
            trigger,
            app_url: get("APP_URL").unwrap_or(defaults.app_url),
            dashboard_url: get("DASHBOARD_URL").unwrap_or(defaults.dashboard_url),
            telegram,
            telegram_api_url: get("TELEGRAM_API_URL").unwrap_or(defaults.telegram_api_url),
            notify_timeout,
            db_path: get("BANTABRO_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = BotConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.trigger, "@bantabro");
        assert_eq!(config.app_url, "https://bantabro.com");
        assert!(config.telegram.is_none());
        assert_eq!(config.notify_timeout, Duration::from_secs(10));
    }

    #[test]
    fn telegram_needs_both_values() {
        let config = BotConfig::from_lookup(lookup(&[("TELEGRAM_BOT_TOKEN", "123:abc")])).unwrap();
        assert!(config.telegram.is_none());

        let config = BotConfig::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("TELEGRAM_CHAT_ID", "-10042"),
        ]))
        .unwrap();
        let telegram = config.telegram.unwrap();
        assert_eq!(telegram.bot_token.expose_secret(), "123:abc");
        assert_eq!(telegram.chat_id, "-10042");
    }

    #[test]
    fn empty_values_count_as_unset() {
        let config = BotConfig::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "  "),
            ("TELEGRAM_CHAT_ID", "-10042"),
            ("APP_URL", ""),
        ]))
        .unwrap();
        assert!(config.telegram.is_none());
        assert_eq!(config.app_url, "https://bantabro.com");
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        let err = BotConfig::from_lookup(lookup(&[("BANTABRO_NOTIFY_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn trigger_must_be_a_mention() {
        let err = BotConfig::from_lookup(lookup(&[("BANTABRO_TRIGGER", "bantabro")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}

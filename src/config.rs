//! Process configuration from the environment

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_TTL_SECS: u64 = 120;
/// Longest inactivity window a paused conversation may be kept for
pub const MAX_TTL_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Bot configuration
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub bot_token: String,
    /// Chat id or `@username` of the registrations channel
    pub channel_id: String,
    pub db_path: PathBuf,
    pub port: u16,
    pub conversation_ttl: Duration,
    pub api_url: String,
    pub webhook_secret: Option<String>,
}

impl BotConfig {
    /// Read configuration from the process environment, after loading `.env`
    /// if one is present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Blank values count as unset
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| var(name).ok_or(ConfigError::Missing(name));

        let bot_token = required("TG_BOT_API_TOKEN")?;
        let channel_id = required("TELEGRAM_CHANNEL_ID")?;

        let db_path = var("REGBOT_DB_PATH").map_or_else(
            || {
                let home = var("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(format!("{home}/.regbot/regbot.db"))
            },
            PathBuf::from,
        );

        let port = parse_or("REGBOT_PORT", var("REGBOT_PORT"), DEFAULT_PORT)?;
        let ttl_secs = parse_or(
            "CONVERSATION_TTL_SECS",
            var("CONVERSATION_TTL_SECS"),
            DEFAULT_TTL_SECS,
        )?;
        if ttl_secs == 0 || ttl_secs > MAX_TTL_SECS {
            return Err(ConfigError::Invalid {
                name: "CONVERSATION_TTL_SECS",
                value: ttl_secs.to_string(),
            });
        }

        Ok(Self {
            bot_token,
            channel_id,
            db_path,
            port,
            conversation_ttl: Duration::from_secs(ttl_secs),
            api_url: var("TELEGRAM_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            webhook_secret: var("TELEGRAM_WEBHOOK_SECRET"),
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

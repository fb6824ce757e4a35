//! Process configuration
//!
//! Built once at startup from the environment (after `.env` is loaded) and
//! passed into every component. Nothing below `main` reads the environment.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Network configuration
pub mod network {
    use super::Duration;

    /// Default bind port for the HTTP server
    pub const DEFAULT_PORT: u16 = 3000;

    /// Timeout for outbound HTTP requests to Supabase (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 15;

    /// Upper bound for one authorization decision, storage fetch or share write (in seconds)
    pub const LOOKUP_TIMEOUT_SECS: u64 = 5;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }

    /// Lookup timeout duration
    pub fn lookup_timeout() -> Duration {
        Duration::from_secs(LOOKUP_TIMEOUT_SECS)
    }
}

/// Init data verification configuration
pub mod init_data {
    /// Maximum accepted age of `auth_date` (24 hours)
    pub const MAX_AGE_SECS: u64 = 86400;
}

/// Storage configuration
pub mod storage {
    /// Supabase Storage bucket holding memo attachments
    pub const DEFAULT_BUCKET: &str = "memo-files";
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Application configuration
pub struct Config {
    /// Bot token; also the shared secret for init data signatures
    pub bot_token: SecretString,
    /// Supabase project URL, e.g. `https://xyz.supabase.co`
    pub supabase_url: Url,
    /// Supabase service role key
    pub supabase_service_key: SecretString,
    /// Storage bucket with memo attachments
    pub storage_bucket: String,
    /// HTTP server bind address
    pub bind_addr: SocketAddr,
    /// Timeout for outbound HTTP requests
    pub request_timeout: Duration,
    /// Bound on one authorization decision, storage fetch or share write
    pub lookup_timeout: Duration,
    /// Maximum age of init data; `None` disables the freshness check
    pub init_data_max_age: Option<Duration>,
    /// Custom Bot API server (local `telegram-bot-api`), if any
    pub bot_api_url: Option<Url>,
    /// Optional log file in addition to the terminal
    pub log_file_path: Option<String>,
}

impl Config {
    /// Loads `.env` if present and reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Empty or whitespace-only values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key).and_then(|value| {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
        };

        let bot_token = get("BOT_TOKEN")
            .or_else(|| get("TELOXIDE_TOKEN"))
            .ok_or(ConfigError::Missing("BOT_TOKEN"))?;

        let supabase_url = get("SUPABASE_URL").ok_or(ConfigError::Missing("SUPABASE_URL"))?;
        let supabase_url = parse_url("SUPABASE_URL", &supabase_url)?;

        let supabase_service_key = get("SUPABASE_SERVICE_KEY").ok_or(ConfigError::Missing("SUPABASE_SERVICE_KEY"))?;

        let storage_bucket = get("STORAGE_BUCKET").unwrap_or_else(|| storage::DEFAULT_BUCKET.to_string());

        let host = match get("HOST") {
            Some(raw) => raw.parse::<IpAddr>().map_err(|e| ConfigError::Invalid {
                key: "HOST",
                reason: e.to_string(),
            })?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };
        let port = parse_number("PORT", get("PORT"))?.unwrap_or(network::DEFAULT_PORT);

        let request_timeout = parse_number("REQUEST_TIMEOUT_SECS", get("REQUEST_TIMEOUT_SECS"))?
            .map(Duration::from_secs)
            .unwrap_or_else(network::timeout);
        let lookup_timeout = parse_number("LOOKUP_TIMEOUT_SECS", get("LOOKUP_TIMEOUT_SECS"))?
            .map(Duration::from_secs)
            .unwrap_or_else(network::lookup_timeout);

        // 0 disables the freshness check
        let max_age_secs =
            parse_number::<u64>("INIT_DATA_MAX_AGE_SECS", get("INIT_DATA_MAX_AGE_SECS"))?.unwrap_or(init_data::MAX_AGE_SECS);
        let init_data_max_age = (max_age_secs > 0).then(|| Duration::from_secs(max_age_secs));

        let bot_api_url = get("BOT_API_URL")
            .map(|raw| parse_url("BOT_API_URL", &raw))
            .transpose()?;

        Ok(Self {
            bot_token: SecretString::from(bot_token),
            supabase_url,
            supabase_service_key: SecretString::from(supabase_service_key),
            storage_bucket,
            bind_addr: SocketAddr::new(host, port),
            request_timeout,
            lookup_timeout,
            init_data_max_age,
            bot_api_url,
            log_file_path: get("LOG_FILE_PATH"),
        })
    }

    /// Returns true if a custom (local) Bot API server is configured.
    pub fn uses_local_bot_api(&self) -> bool {
        self.bot_api_url
            .as_ref()
            .map(|url| url.host_str() != Some("api.telegram.org"))
            .unwrap_or(false)
    }
}

fn parse_url(key: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })
}

fn parse_number<T>(key: &'static str, raw: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    raw.map(|value| {
        value.parse::<T>().map_err(|e| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        })
    })
    .transpose()
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bot_token", &redact(self.bot_token.expose_secret()))
            .field("supabase_url", &self.supabase_url.as_str())
            .field("supabase_service_key", &redact(self.supabase_service_key.expose_secret()))
            .field("storage_bucket", &self.storage_bucket)
            .field("bind_addr", &self.bind_addr)
            .field("request_timeout", &self.request_timeout)
            .field("lookup_timeout", &self.lookup_timeout)
            .field("init_data_max_age", &self.init_data_max_age)
            .field("bot_api_url", &self.bot_api_url.as_ref().map(Url::as_str))
            .field("log_file_path", &self.log_file_path)
            .finish()
    }
}

/// Masks a secret down to its length, e.g. `[redacted; 46 chars]`.
pub fn redact(secret: &str) -> String {
    format!("[redacted; {} chars]", secret.chars().count())
}

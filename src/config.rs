//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default Gemini model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Upper bound for `CHAT_SESSION_TTL_HOURS` (ten years).
pub const MAX_SESSION_TTL_HOURS: u64 = 24 * 365 * 10;

/// Default GNews REST endpoint.
pub const DEFAULT_GNEWS_BASE_URL: &str = "https://gnews.io";

/// Server configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub db_path: PathBuf,
    pub uploads_dir: PathBuf,
    pub log_dir: Option<PathBuf>,
    pub gemini_api_key: SecretString,
    pub gemini_model: String,
    pub llm_timeout: Duration,
    pub news: NewsConfig,
    pub session_ttl: Duration,
}

/// News provider configuration.
#[derive(Debug, Clone)]
pub struct NewsConfig {
    /// `None` disables the news fetch; reports fall back to "No News Found".
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub country: String,
    pub lang: String,
    pub max_articles: usize,
    pub timeout: Duration,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_GNEWS_BASE_URL.to_string(),
            country: "in".to_string(),
            lang: "en".to_string(),
            max_articles: 5,
            timeout: Duration::from_secs(15),
        }
    }
}

impl AppConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let gemini_api_key = lookup("GEMINI_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("GEMINI_API_KEY".to_string()))?;

        let port = parse_or(&lookup, "CHAT_PORT", 3001u16)?;
        let llm_timeout_secs = parse_or(&lookup, "CHAT_LLM_TIMEOUT_SECS", 60u64)?;
        let session_ttl_hours = parse_or(&lookup, "CHAT_SESSION_TTL_HOURS", 24u64)?;
        let session_ttl = session_ttl_hours
            .checked_mul(3600)
            .filter(|_| session_ttl_hours <= MAX_SESSION_TTL_HOURS)
            .map(Duration::from_secs)
            .ok_or_else(|| ConfigError::InvalidValue {
                key: "CHAT_SESSION_TTL_HOURS".to_string(),
                message: format!("must be at most {MAX_SESSION_TTL_HOURS}"),
            })?;

        let defaults = NewsConfig::default();
        let news = NewsConfig {
            api_key: lookup("GNEWS_API_KEY")
                .filter(|k| !k.trim().is_empty())
                .map(SecretString::from),
            base_url: lookup("GNEWS_BASE_URL").unwrap_or(defaults.base_url),
            country: lookup("NEWS_COUNTRY").unwrap_or(defaults.country),
            lang: lookup("NEWS_LANG").unwrap_or(defaults.lang),
            max_articles: parse_or(&lookup, "NEWS_MAX", defaults.max_articles)?,
            timeout: defaults.timeout,
        };

        Ok(Self {
            port,
            db_path: lookup("CHAT_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data/chat.db")),
            uploads_dir: lookup("CHAT_UPLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./uploads")),
            log_dir: lookup("CHAT_LOG_DIR").map(PathBuf::from),
            gemini_api_key: SecretString::from(gemini_api_key),
            gemini_model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            llm_timeout: Duration::from_secs(llm_timeout_secs),
            news,
            session_ttl,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional; defaults target a backend on localhost.
//!
//! - `SHOPFRONT_API_URL` - Base URL of the shop REST API (default: `http://127.0.0.1:8000/api`)
//! - `SHOPFRONT_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `SHOPFRONT_HEALTH_TIMEOUT_SECS` - Timeout for the health probe (default: 5)
//! - `SHOPFRONT_TOAST_SECS` - How long a notification stays visible (default: 3)
//! - `SHOPFRONT_CATALOG_CACHE_SECS` - Product cache TTL (default: 300)
//! - `SHOPFRONT_REVALIDATE_SECS` - Session re-validation interval (default: 5)
//! - `SHOPFRONT_SESSION_FILE` - Session storage file (default: `.shopfront/session.json`)
//! - `SHOPFRONT_CURRENCY` - Display currency code (default: INR)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use shopfront_core::CurrencyCode;
use thiserror::Error;
use url::Url;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST API; always ends with `/`
    pub api_url: Url,
    /// Timeout applied to every API request
    pub request_timeout: Duration,
    /// Timeout for the catalog health probe
    pub health_timeout: Duration,
    /// Notification lifetime
    pub toast_duration: Duration,
    /// Product cache time-to-live
    pub catalog_cache_ttl: Duration,
    /// Interval between session storage re-reads
    pub revalidate_interval: Duration,
    /// Where the CLI persists the session
    pub session_file: PathBuf,
    /// Currency used when formatting prices
    pub currency: CurrencyCode,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl ClientConfig {
    /// Configuration for the given API base URL with every other value at its default.
    #[must_use]
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url: normalize_base(api_url),
            request_timeout: Duration::from_secs(10),
            health_timeout: Duration::from_secs(5),
            toast_duration: Duration::from_secs(3),
            catalog_cache_ttl: Duration::from_secs(300),
            revalidate_interval: Duration::from_secs(5),
            session_file: PathBuf::from(".shopfront/session.json"),
            currency: CurrencyCode::default(),
            sentry_dsn: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = parse_api_url(
            "SHOPFRONT_API_URL",
            &get_env_or_default("SHOPFRONT_API_URL", DEFAULT_API_URL),
        )?;

        Ok(Self {
            api_url,
            request_timeout: get_secs("SHOPFRONT_TIMEOUT_SECS", 10)?,
            health_timeout: get_secs("SHOPFRONT_HEALTH_TIMEOUT_SECS", 5)?,
            toast_duration: get_secs("SHOPFRONT_TOAST_SECS", 3)?,
            catalog_cache_ttl: get_secs("SHOPFRONT_CATALOG_CACHE_SECS", 300)?,
            revalidate_interval: get_secs("SHOPFRONT_REVALIDATE_SECS", 5)?,
            session_file: PathBuf::from(get_env_or_default(
                "SHOPFRONT_SESSION_FILE",
                ".shopfront/session.json",
            )),
            currency: parse_env("SHOPFRONT_CURRENCY", "INR")?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
        })
    }

    /// Parse `api_url` and build a default configuration around it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `api_url` is not an http(s) URL.
    pub fn for_api_url(api_url: &str) -> Result<Self, ConfigError> {
        parse_api_url("api_url", api_url).map(Self::new)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn get_secs(key: &str, default: u64) -> Result<Duration, ConfigError> {
    let secs: u64 = parse_env(key, &default.to_string())?;
    if secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

fn parse_api_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(normalize_base(url))
}

/// Ensure the path ends with `/` so relative joins append instead of replacing.
fn normalize_base(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

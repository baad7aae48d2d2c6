//! Runtime configuration loaded from the environment.
//!
//! Values come from process environment variables, optionally seeded from a
//! `.env` file via `dotenvy`. [`PipelineConfig::from_lookup`] accepts any key
//! lookup so tests never touch the real environment.

use std::time::Duration;
use thiserror::Error;

const DEFAULT_METRIKA_API_URL: &str = "https://api-metrika.yandex.net";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LOG_POLL_INTERVAL_SECS: u64 = 8;
const DEFAULT_LOG_MAX_POLLS: u32 = 225;
const DEFAULT_UPLOAD_POLL_INTERVAL_SECS: u64 = 30;
const DEFAULT_UPLOAD_MAX_POLLS: u32 = 10;
const DEFAULT_DISPATCH_CONCURRENCY: usize = 4;
const DEFAULT_DATABASE_POOL_SIZE: u32 = 8;

/// Errors returned while reading configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is absent or blank.
    #[error("missing required configuration variable {0}")]
    Missing(&'static str),

    /// A variable is present but cannot be parsed.
    #[error("invalid value for {key}: {reason}")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// Parse failure description.
        reason: String,
    },
}

/// Typed pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Public base URL used to build webhook callback URLs.
    pub public_base_url: String,
    /// Base URL of the Metrika management API.
    pub metrika_api_url: String,
    /// Timeout applied to every outbound HTTP request.
    pub http_timeout: Duration,
    /// Delay between log-request status checks.
    pub log_poll_interval: Duration,
    /// Maximum number of log-request status checks before giving up.
    pub log_max_polls: u32,
    /// Delay between conversion upload status checks.
    pub upload_poll_interval: Duration,
    /// Maximum number of status checks made when reconciling an upload.
    pub upload_max_polls: u32,
    /// Maximum number of webhook conversions sent concurrently.
    pub dispatch_concurrency: usize,
    /// Postgres connection string; `None` selects the in-memory stores.
    pub database_url: Option<String>,
    /// Maximum size of the Postgres connection pool.
    pub database_pool_size: u32,
}

impl PipelineConfig {
    /// Loads configuration from the process environment.
    ///
    /// A `.env` file in the working directory is applied first when present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a required variable is missing or a value
    /// fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(err) = dotenvy::dotenv() {
            tracing::debug!(error = %err, "no .env file applied");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a required variable is missing or a value
    /// fails to parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &'static str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let public_base_url = read("PUBLIC_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_owned())
            .ok_or(ConfigError::Missing("PUBLIC_BASE_URL"))?;
        ensure_http_url("PUBLIC_BASE_URL", &public_base_url)?;

        let metrika_api_url = read("METRIKA_API_URL")
            .map_or_else(
                || DEFAULT_METRIKA_API_URL.to_owned(),
                |url| url.trim_end_matches('/').to_owned(),
            );
        ensure_http_url("METRIKA_API_URL", &metrika_api_url)?;

        let http_timeout = Duration::from_secs(parse_or(
            "METRIKA_HTTP_TIMEOUT_SECS",
            read("METRIKA_HTTP_TIMEOUT_SECS"),
            DEFAULT_HTTP_TIMEOUT_SECS,
        )?);
        let log_poll_interval = Duration::from_secs(parse_or(
            "METRIKA_LOG_POLL_INTERVAL_SECS",
            read("METRIKA_LOG_POLL_INTERVAL_SECS"),
            DEFAULT_LOG_POLL_INTERVAL_SECS,
        )?);
        let log_max_polls = parse_or(
            "METRIKA_LOG_MAX_POLLS",
            read("METRIKA_LOG_MAX_POLLS"),
            DEFAULT_LOG_MAX_POLLS,
        )?;
        let upload_poll_interval = Duration::from_secs(parse_or(
            "CONVERSION_UPLOAD_POLL_INTERVAL_SECS",
            read("CONVERSION_UPLOAD_POLL_INTERVAL_SECS"),
            DEFAULT_UPLOAD_POLL_INTERVAL_SECS,
        )?);
        let upload_max_polls = parse_or(
            "CONVERSION_UPLOAD_MAX_POLLS",
            read("CONVERSION_UPLOAD_MAX_POLLS"),
            DEFAULT_UPLOAD_MAX_POLLS,
        )?;
        if upload_max_polls == 0 {
            return Err(ConfigError::Invalid {
                key: "CONVERSION_UPLOAD_MAX_POLLS",
                reason: "must be at least 1".to_owned(),
            });
        }
        let dispatch_concurrency = parse_or(
            "WEBHOOK_DISPATCH_CONCURRENCY",
            read("WEBHOOK_DISPATCH_CONCURRENCY"),
            DEFAULT_DISPATCH_CONCURRENCY,
        )?;
        if dispatch_concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "WEBHOOK_DISPATCH_CONCURRENCY",
                reason: "must be at least 1".to_owned(),
            });
        }
        let database_pool_size = parse_or(
            "DATABASE_POOL_SIZE",
            read("DATABASE_POOL_SIZE"),
            DEFAULT_DATABASE_POOL_SIZE,
        )?;

        Ok(Self {
            public_base_url,
            metrika_api_url,
            http_timeout,
            log_poll_interval,
            log_max_polls,
            upload_poll_interval,
            upload_max_polls,
            dispatch_concurrency,
            database_url: read("DATABASE_URL"),
            database_pool_size,
        })
    }
}

fn parse_or<T>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.map_or(Ok(default), |raw| {
        raw.parse::<T>().map_err(|err| ConfigError::Invalid {
            key,
            reason: err.to_string(),
        })
    })
}

fn ensure_http_url(key: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        return Ok(());
    }
    Err(ConfigError::Invalid {
        key,
        reason: format!("'{value}' must start with http:// or https://"),
    })
}

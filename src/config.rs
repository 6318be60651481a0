//! Configuration types for hn-fetch
//!
//! Every component receives the slice of [`Config`] it needs by value at
//! construction time. Values come from serde defaults, optionally overridden
//! by environment variables through [`Config::from_env`].

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, str::FromStr, time::Duration};

/// Upper bound for [`RetryPolicy::max_attempts`]
pub const MAX_RETRY_ATTEMPTS: u32 = 10;

/// Source API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the item API (default: "https://hacker-news.firebaseio.com/v0")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (default: 10 seconds)
    #[serde(default = "default_request_timeout", with = "duration_ms_serde")]
    pub request_timeout: Duration,

    /// Maximum number of ids taken from the new-items list (default: 100)
    #[serde(default = "default_max_items")]
    pub max_items: usize,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout: default_request_timeout(),
            max_items: default_max_items(),
            user_agent: default_user_agent(),
        }
    }
}

/// Storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Database path (default: "hn-fetch.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Exponential backoff policy for transient failures
///
/// Immutable once handed to a [`crate::retry::RetryExecutor`]; a call may run
/// under a different policy through [`crate::retry::RetryExecutor::with_policy`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total number of attempts including the first one (default: 3, range 1..=10)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_ms_serde")]
    pub initial_delay: Duration,

    /// Upper bound for any single delay (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_ms_serde")]
    pub max_delay: Duration,

    /// Multiplier applied to the delay after each retry (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Stretch each delay by a random 0-100% (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// Check the policy bounds
    ///
    /// `max_attempts` must be within `1..=10`, both delays must be non-zero and
    /// the multiplier must be a finite number of at least 1.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 || self.max_attempts > MAX_RETRY_ATTEMPTS {
            return Err(Error::config(
                format!(
                    "max_attempts must be between 1 and {MAX_RETRY_ATTEMPTS}, got {}",
                    self.max_attempts
                ),
                "RETRY_MAX_ATTEMPTS",
            ));
        }
        if self.initial_delay.is_zero() {
            return Err(Error::config(
                "initial_delay must be positive",
                "RETRY_INITIAL_DELAY_MS",
            ));
        }
        if self.max_delay.is_zero() {
            return Err(Error::config(
                "max_delay must be positive",
                "RETRY_MAX_DELAY_MS",
            ));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(Error::config(
                format!(
                    "backoff_multiplier must be at least 1, got {}",
                    self.backoff_multiplier
                ),
                "RETRY_BACKOFF_MULTIPLIER",
            ));
        }
        Ok(())
    }
}

/// Orchestration settings for a single run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pause after every item fetch to respect the source's rate limits (default: 100ms)
    #[serde(default = "default_item_delay", with = "duration_ms_serde")]
    pub item_delay: Duration,

    /// Emit a progress event every N items; 0 disables progress events (default: 10)
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            item_delay: default_item_delay(),
            progress_interval: default_progress_interval(),
        }
    }
}

/// Top-level configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Item API settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Storage settings
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Default retry policy for source requests
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Run orchestration settings
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Build the configuration from the process environment
    ///
    /// A `.env` file in the working directory is loaded first when present.
    pub fn from_env() -> Result<Self> {
        // Missing .env is the normal case in production
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    ///
    /// Unset keys keep their defaults. Every value is validated before the
    /// configuration is returned.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(url) = lookup("HACKERNEWS_API_URL") {
            config.source.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(max) = parse_var::<usize>(&lookup, "MAX_STORIES")? {
            config.source.max_items = max;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "REQUEST_TIMEOUT")? {
            config.source.request_timeout = Duration::from_millis(ms);
        }
        if let Some(path) = lookup("DATABASE_PATH") {
            config.persistence.database_path = PathBuf::from(path);
        }
        if let Some(attempts) = parse_var::<u32>(&lookup, "RETRY_MAX_ATTEMPTS")? {
            config.retry.max_attempts = attempts;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "RETRY_INITIAL_DELAY_MS")? {
            config.retry.initial_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "RETRY_MAX_DELAY_MS")? {
            config.retry.max_delay = Duration::from_millis(ms);
        }
        if let Some(multiplier) = parse_var::<f64>(&lookup, "RETRY_BACKOFF_MULTIPLIER")? {
            config.retry.backoff_multiplier = multiplier;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "FETCH_ITEM_DELAY_MS")? {
            config.pipeline.item_delay = Duration::from_millis(ms);
        }
        if let Some(every) = parse_var::<usize>(&lookup, "FETCH_PROGRESS_INTERVAL")? {
            config.pipeline.progress_interval = every;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        let base = url::Url::parse(&self.source.base_url).map_err(|e| {
            Error::config(
                format!("invalid API url {:?}: {}", self.source.base_url, e),
                "HACKERNEWS_API_URL",
            )
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(Error::config(
                format!("API url must be http(s), got {}", base.scheme()),
                "HACKERNEWS_API_URL",
            ));
        }
        if self.source.max_items == 0 {
            return Err(Error::config("max_items must be positive", "MAX_STORIES"));
        }
        if self.source.request_timeout.is_zero() {
            return Err(Error::config(
                "request_timeout must be positive",
                "REQUEST_TIMEOUT",
            ));
        }
        if self.persistence.database_path.as_os_str().is_empty() {
            return Err(Error::config(
                "database_path must not be empty",
                "DATABASE_PATH",
            ));
        }
        self.retry.validate()
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::config(format!("{key}={raw:?} is not valid: {e}"), key)),
    }
}

fn default_base_url() -> String {
    "https://hacker-news.firebaseio.com/v0".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_max_items() -> usize {
    100
}

fn default_user_agent() -> String {
    format!("hn-fetch/{}", env!("CARGO_PKG_VERSION"))
}

fn default_database_path() -> PathBuf {
    PathBuf::from("hn-fetch.db")
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_item_delay() -> Duration {
    Duration::from_millis(100)
}

fn default_progress_interval() -> usize {
    10
}

// Durations are written as whole milliseconds
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

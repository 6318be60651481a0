//! Retry logic with exponential backoff
//!
//! This module wraps any fallible async operation in a bounded retry loop.
//! The delay before attempt `k` (k >= 2) is
//! `min(initial_delay * backoff_multiplier^(k-2), max_delay)`, optionally
//! stretched by random jitter. When attempts run out, the error of the last
//! attempt is returned unchanged.
//!
//! # Example
//!
//! ```no_run
//! use hn_fetch::config::RetryPolicy;
//! use hn_fetch::retry::{IsRetryable, NoHooks, RetryExecutor};
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{self:?}")
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let executor = RetryExecutor::new(RetryPolicy::default())?;
//! let value = executor
//!     .execute(&NoHooks, || async { Ok::<_, MyError>(42) })
//!     .await;
//! assert_eq!(value.ok(), Some(42));
//! # Ok(())
//! # }
//! ```

use crate::config::RetryPolicy;
use crate::error::{Error, Result};
use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::Level;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (timeouts, refused connections, 5xx, 429) return `true`.
/// Permanent failures (schema mismatch, storage errors, bad arguments) return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // Connect covers refused connections and DNS resolution failures
            Error::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Error::HttpStatus { status, .. } => (500..600).contains(status) || *status == 429,
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::Interrupted
            ),
            Error::Other(msg) => {
                let lower = msg.to_ascii_lowercase();
                lower.contains("timeout")
                    || msg.contains("ECONNREFUSED")
                    || msg.contains("ETIMEDOUT")
                    || msg.contains("ENOTFOUND")
            }
            // A schema mismatch does not heal on its own
            Error::Validation(_) | Error::Serialization(_) => false,
            Error::Database(_) | Error::Sqlx(_) => false,
            Error::Config { .. } => false,
            Error::InvalidArgument(_) => false,
            Error::Cancelled => false,
        }
    }
}

/// Observation and classification hooks for a retried call
///
/// All methods have no-op defaults, so implementors only override what they need.
pub trait RetryHooks<E> {
    /// Override the default classification; `None` falls back to [`IsRetryable`]
    fn should_retry(&self, _error: &E) -> Option<bool> {
        None
    }

    /// Called before sleeping ahead of the next attempt
    fn on_retry(&self, _attempt: u32, _error: &E, _delay: Duration) {}

    /// Called once with the attempt number that succeeded
    fn on_success(&self, _attempt: u32) {}
}

/// Hooks that do nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl<E> RetryHooks<E> for NoHooks {}

/// Hooks that report retries through `tracing` at a chosen level
#[derive(Debug, Clone)]
pub struct LogHooks {
    operation: String,
    level: Level,
}

impl LogHooks {
    /// Report retries of `operation` at WARN
    pub fn warn(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            level: Level::WARN,
        }
    }

    /// Report retries of `operation` at DEBUG
    pub fn debug(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            level: Level::DEBUG,
        }
    }
}

impl<E: Display> RetryHooks<E> for LogHooks {
    fn on_retry(&self, attempt: u32, error: &E, delay: Duration) {
        let delay_ms = delay.as_millis() as u64;
        if self.level == Level::WARN {
            tracing::warn!(
                operation = %self.operation,
                attempt,
                delay_ms,
                error = %error,
                "Operation failed, retrying"
            );
        } else {
            tracing::debug!(
                operation = %self.operation,
                attempt,
                delay_ms,
                error = %error,
                "Operation failed, retrying"
            );
        }
    }

    fn on_success(&self, attempt: u32) {
        if attempt > 1 {
            tracing::info!(
                operation = %self.operation,
                attempts = attempt,
                "Operation succeeded after retry"
            );
        }
    }
}

/// Retry executor bound to a validated default policy
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    /// Create an executor; fails if the policy is out of bounds
    pub fn new(policy: RetryPolicy) -> Result<Self> {
        policy.validate()?;
        Ok(Self { policy })
    }

    /// The policy applied by [`Self::execute`]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Executor for a single call that needs a different policy
    pub fn with_policy(&self, policy: RetryPolicy) -> Result<Self> {
        Self::new(policy)
    }

    /// Run `operation` under this executor's policy
    pub async fn execute<F, Fut, T, E, H>(&self, hooks: &H, operation: F) -> std::result::Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: IsRetryable + Display,
        H: RetryHooks<E> + ?Sized,
    {
        with_retry(&self.policy, hooks, operation).await
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// # Arguments
///
/// * `policy` - Attempt limit, delays and backoff multiplier
/// * `hooks` - Classification override and observation callbacks
/// * `operation` - Closure producing a fresh future for every attempt
///
/// # Returns
///
/// The first successful value, or the error of the final attempt. A
/// non-retryable error is returned immediately.
pub async fn with_retry<F, Fut, T, E, H>(
    policy: &RetryPolicy,
    hooks: &H,
    mut operation: F,
) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: IsRetryable + Display,
    H: RetryHooks<E> + ?Sized,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt: u32 = 1;

    loop {
        match operation().await {
            Ok(value) => {
                hooks.on_success(attempt);
                return Ok(value);
            }
            Err(e) => {
                let retryable = hooks.should_retry(&e).unwrap_or_else(|| e.is_retryable());

                if attempt >= max_attempts || !retryable {
                    tracing::debug!(
                        error = %e,
                        attempts = attempt,
                        retryable,
                        "Giving up on operation"
                    );
                    return Err(e);
                }

                let base = backoff_delay(policy, attempt + 1);
                let delay = if policy.jitter { add_jitter(base) } else { base };

                hooks.on_retry(attempt, &e, delay);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Delay slept before `attempt` (attempt 1 has no delay)
pub fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    if attempt < 2 {
        return Duration::ZERO;
    }

    let exponent = i32::try_from(attempt - 2).unwrap_or(i32::MAX);
    let secs = policy.initial_delay.as_secs_f64() * policy.backoff_multiplier.powi(exponent);
    let cap = policy.max_delay.as_secs_f64();

    if !secs.is_finite() || secs >= cap {
        policy.max_delay
    } else {
        Duration::from_secs_f64(secs)
    }
}

/// Add random jitter to a delay
///
/// The result lies between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}

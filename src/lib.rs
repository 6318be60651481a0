//! # hn-fetch
//!
//! Retry-governed fetch-and-persist pipeline for the Hacker News item API.
//!
//! ## Design
//!
//! - **Fail per item, not per run** - A missing or malformed item is skipped; only a failed id-list fetch fails the run
//! - **One audit record per run** - Every run is recorded in `fetch_runs`, written once at start and once at the end
//! - **Idempotent** - Items are keyed by their source id and updated in place on later runs
//! - **Injectable seams** - The orchestrator works against the [`ItemSource`] and [`ItemStore`] traits
//!
//! ## Quick Start
//!
//! ```no_run
//! use hn_fetch::{Config, Database, FetchOrchestrator, SourceClient};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!
//!     let db = Arc::new(Database::new(&config.persistence.database_path).await?);
//!     let client = Arc::new(SourceClient::new(&config.source, config.retry.clone())?);
//!
//!     let result = FetchOrchestrator::new(client, db, config.pipeline.clone())
//!         .run()
//!         .await?;
//!     println!("fetched {} items", result.total_fetched);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Fetch run orchestration
pub mod fetcher;
/// Tracing subscriber setup
pub mod logging;
/// Retry logic with exponential backoff
pub mod retry;
/// Item API client
pub mod source;
/// Core types
pub mod types;
/// Payload validation
pub mod validation;

// Re-export commonly used types
pub use config::{Config, PipelineConfig, RetryPolicy, SourceConfig};
pub use db::{Database, ItemStore};
pub use error::{DatabaseError, Error, Result, ValidationError};
pub use fetcher::FetchOrchestrator;
pub use retry::{IsRetryable, RetryExecutor, RetryHooks};
pub use source::{ItemSource, SourceClient};
pub use types::{FetchResult, Item, ItemId, ReconcileStats, RunId, RunState};

use tokio_util::sync::CancellationToken;

/// Cancel `token` once a termination signal arrives.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use hn_fetch::cancel_on_signal;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() {
/// let token = CancellationToken::new();
/// tokio::spawn(cancel_on_signal(token.clone()));
/// # }
/// ```
pub async fn cancel_on_signal(token: CancellationToken) {
    tokio::select! {
        _ = wait_for_signal() => {
            tracing::info!("Cancelling fetch run");
            token.cancel();
        }
        _ = token.cancelled() => {}
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}

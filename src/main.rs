//! hn-fetch: run the fetch pipeline once and exit.
//!
//! Exit status is 0 when the run completed and 1 when it failed or could not
//! start.

use hn_fetch::logging::{self, LogFormat};
use hn_fetch::{Config, Database, FetchOrchestrator, FetchResult, SourceClient, cancel_on_signal};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    logging::init(LogFormat::from_env());

    let started = Instant::now();
    match run().await {
        Ok(result) => {
            report(&result, started);
            if result.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            error!(error = %e, code = e.error_code(), "Fatal startup error");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> hn_fetch::Result<FetchResult> {
    let config = Config::from_env()?;
    info!(
        base_url = %config.source.base_url,
        max_items = config.source.max_items,
        database = %config.persistence.database_path.display(),
        "Starting hn-fetch"
    );

    let db = Arc::new(Database::new(&config.persistence.database_path).await?);
    db.ping().await?;

    let client = Arc::new(SourceClient::new(&config.source, config.retry.clone())?);

    let cancel = CancellationToken::new();
    let signals = tokio::spawn(cancel_on_signal(cancel.clone()));

    let result = FetchOrchestrator::new(client, db.clone(), config.pipeline.clone())
        .with_cancellation(cancel.clone())
        .run()
        .await;

    // Stops the signal listener
    cancel.cancel();
    let _ = signals.await;

    match Arc::try_unwrap(db) {
        Ok(db) => db.close().await,
        Err(db) => db.pool().close().await,
    }

    result
}

fn report(result: &FetchResult, started: Instant) {
    info!(
        run_id = %result.run_id,
        success = result.success,
        total_fetched = result.total_fetched,
        new_items = result.new_items,
        updated_items = result.updated_items,
        duration_ms = started.elapsed().as_millis() as u64,
        "Fetch run summary"
    );

    if !result.errors.is_empty() {
        warn!(run_id = %result.run_id, errors = ?result.errors, "Fetch run reported errors");
    }
}

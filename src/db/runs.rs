//! Fetch run audit records.

use crate::error::DatabaseError;
use crate::types::RunId;
use crate::{Error, Result};

use super::{Database, FetchRun, RunCompletion};

impl Database {
    /// Start an audit record; only `started_at` is set
    pub async fn create_run(&self, started_at: i64) -> Result<RunId> {
        let result = sqlx::query("INSERT INTO fetch_runs (started_at) VALUES (?)")
            .bind(started_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to insert fetch run: {}",
                    e
                )))
            })?;

        Ok(RunId(result.last_insert_rowid()))
    }

    /// Write the final figures of a run
    ///
    /// Only a run that has not been completed yet is touched, so an audit
    /// record is written at most once after creation.
    pub async fn complete_run(&self, run: RunId, completion: &RunCompletion) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE fetch_runs
            SET completed_at = ?, items_fetched = ?, items_new = ?, items_updated = ?,
                error_summary = ?, success = ?
            WHERE id = ? AND completed_at IS NULL
            "#,
        )
        .bind(completion.completed_at)
        .bind(completion.items_fetched as i64)
        .bind(completion.items_new as i64)
        .bind(completion.items_updated as i64)
        .bind(&completion.error_summary)
        .bind(completion.success)
        .bind(run.0)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to update fetch run {}: {}",
                run, e
            )))
        })?;

        if result.rows_affected() == 0 {
            return match self.get_run(run).await? {
                Some(_) => Err(Error::Database(DatabaseError::ConstraintViolation(
                    format!("fetch run {} is already completed", run),
                ))),
                None => Err(Error::Database(DatabaseError::NotFound(format!(
                    "fetch run {}",
                    run
                )))),
            };
        }

        Ok(())
    }

    /// Get a run by ID
    pub async fn get_run(&self, run: RunId) -> Result<Option<FetchRun>> {
        let row = sqlx::query_as::<_, FetchRun>(
            r#"
            SELECT id, started_at, completed_at, items_fetched, items_new, items_updated,
                   error_summary, success
            FROM fetch_runs
            WHERE id = ?
            "#,
        )
        .bind(run.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(row)
    }

    /// Most recent runs first
    pub async fn latest_runs(&self, limit: usize) -> Result<Vec<FetchRun>> {
        let rows = sqlx::query_as::<_, FetchRun>(
            r#"
            SELECT id, started_at, completed_at, items_fetched, items_new, items_updated,
                   error_summary, success
            FROM fetch_runs
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(rows)
    }
}

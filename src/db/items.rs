//! Item lookup, insert and in-place update.

use crate::error::DatabaseError;
use crate::types::ItemId;
use crate::{Error, Result};

use super::{Database, ItemUpdate, NewItem, StoredItem};

impl Database {
    /// Get a stored item by its source id
    pub async fn get_item(&self, external_id: ItemId) -> Result<Option<StoredItem>> {
        let item = sqlx::query_as::<_, StoredItem>(
            r#"
            SELECT id, external_id, title, url, text, score, author, created_at_epoch,
                   descendants, item_type, dead, deleted, fetched_at, updated_at
            FROM items
            WHERE external_id = ?
            "#,
        )
        .bind(external_id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get item {}: {}",
                external_id, e
            )))
        })?;

        Ok(item)
    }

    /// Insert a new item
    ///
    /// `fetched_at` and `updated_at` are both set to now. Fails with a
    /// constraint violation if the source id is already stored.
    pub async fn create_item(&self, item: &NewItem) -> Result<i64> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO items (
                external_id, title, url, text, score, author, created_at_epoch,
                descendants, item_type, dead, deleted, fetched_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(item.external_id.get())
        .bind(&item.title)
        .bind(&item.url)
        .bind(&item.text)
        .bind(item.score)
        .bind(&item.author)
        .bind(item.created_at_epoch)
        .bind(item.descendants)
        .bind(&item.item_type)
        .bind(item.dead)
        .bind(item.deleted)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                Error::Database(DatabaseError::ConstraintViolation(format!(
                    "item {} already stored",
                    item.external_id
                )))
            }
            other => Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert item {}: {}",
                item.external_id, other
            ))),
        })?;

        Ok(result.last_insert_rowid())
    }

    /// Refresh title, score and descendants of a stored item
    ///
    /// All other columns are left untouched; `updated_at` is set to now.
    pub async fn refresh_item(&self, update: &ItemUpdate) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            UPDATE items
            SET title = ?, score = ?, descendants = ?, updated_at = ?
            WHERE external_id = ?
            "#,
        )
        .bind(&update.title)
        .bind(update.score)
        .bind(update.descendants)
        .bind(now)
        .bind(update.external_id.get())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to update item {}: {}",
                update.external_id, e
            )))
        })?;

        if result.rows_affected() == 0 {
            return Err(Error::Database(DatabaseError::NotFound(format!(
                "item {}",
                update.external_id
            ))));
        }

        Ok(())
    }

    /// Count stored items
    pub async fn count_items(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM items")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Sqlx)?;

        Ok(count)
    }
}

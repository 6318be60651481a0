//! Database layer for hn-fetch
//!
//! Handles SQLite persistence for fetched items and the per-run audit log.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] — Database lifecycle, schema migrations
//! - [`items`] — Item lookup, insert and in-place update
//! - [`runs`] — Fetch run audit records
//!
//! The orchestrator only sees the [`ItemStore`] trait, which [`Database`]
//! implements by delegating to those methods.

use crate::error::Result;
use crate::types::{Item, ItemId, RunId};
use async_trait::async_trait;
use sqlx::{FromRow, sqlite::SqlitePool};

mod items;
mod migrations;
mod runs;

/// New item to be inserted into the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    /// Source id (unique)
    pub external_id: ItemId,
    /// Headline ("" when the source sent none)
    pub title: String,
    /// Link target
    pub url: Option<String>,
    /// Body text
    pub text: Option<String>,
    /// Score
    pub score: i64,
    /// Author username
    pub author: Option<String>,
    /// Creation time at the source in Unix seconds
    pub created_at_epoch: i64,
    /// Number of descendants
    pub descendants: i64,
    /// Source item type
    pub item_type: Option<String>,
    /// Flagged dead by the source
    pub dead: bool,
    /// Deleted at the source
    pub deleted: bool,
}

impl From<&Item> for NewItem {
    fn from(item: &Item) -> Self {
        Self {
            external_id: item.id,
            title: item.title.clone().unwrap_or_default(),
            url: item.url.clone(),
            text: item.text.clone(),
            score: item.score,
            author: item.author.clone(),
            created_at_epoch: item.created_at_epoch,
            descendants: item.descendants,
            item_type: item.item_type.clone(),
            dead: item.dead,
            deleted: item.deleted,
        }
    }
}

/// Fields refreshed on an item that is already stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemUpdate {
    /// Source id of the stored item
    pub external_id: ItemId,
    /// Headline ("" when the source sent none)
    pub title: String,
    /// Latest score
    pub score: i64,
    /// Latest descendant count
    pub descendants: i64,
}

impl From<&Item> for ItemUpdate {
    fn from(item: &Item) -> Self {
        Self {
            external_id: item.id,
            title: item.title.clone().unwrap_or_default(),
            score: item.score,
            descendants: item.descendants,
        }
    }
}

/// Item record from database
#[derive(Debug, Clone, FromRow)]
pub struct StoredItem {
    /// Unique database ID
    pub id: i64,
    /// Source id
    pub external_id: i64,
    /// Headline
    pub title: String,
    /// Link target
    pub url: Option<String>,
    /// Body text
    pub text: Option<String>,
    /// Score
    pub score: i64,
    /// Author username
    pub author: Option<String>,
    /// Creation time at the source in Unix seconds
    pub created_at_epoch: i64,
    /// Number of descendants
    pub descendants: i64,
    /// Source item type
    pub item_type: Option<String>,
    /// Flagged dead by the source
    pub dead: bool,
    /// Deleted at the source
    pub deleted: bool,
    /// Unix timestamp of the first insert
    pub fetched_at: i64,
    /// Unix timestamp of the last write
    pub updated_at: i64,
}

/// Final figures written to a run audit record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunCompletion {
    /// Unix timestamp when the run ended
    pub completed_at: i64,
    /// Number of items fetched
    pub items_fetched: u64,
    /// Number of items inserted
    pub items_new: u64,
    /// Number of items updated
    pub items_updated: u64,
    /// Joined error messages, if the run failed
    pub error_summary: Option<String>,
    /// Whether the run completed
    pub success: bool,
}

/// Fetch run audit record from database
#[derive(Debug, Clone, FromRow)]
pub struct FetchRun {
    /// Unique database ID
    pub id: i64,
    /// Unix timestamp when the run started
    pub started_at: i64,
    /// Unix timestamp when the run ended
    pub completed_at: Option<i64>,
    /// Number of items fetched
    pub items_fetched: i64,
    /// Number of items inserted
    pub items_new: i64,
    /// Number of items updated
    pub items_updated: i64,
    /// Joined error messages
    pub error_summary: Option<String>,
    /// Whether the run completed
    pub success: bool,
}

/// Persistence operations required by a fetch run
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Look up a stored item by its source id
    async fn find_by_external_id(&self, id: ItemId) -> Result<Option<StoredItem>>;

    /// Insert an item that is not stored yet
    async fn insert_item(&self, item: &NewItem) -> Result<()>;

    /// Overwrite title, score and descendants of a stored item and bump `updated_at`
    async fn update_item(&self, update: &ItemUpdate) -> Result<()>;

    /// Create an audit record with only `started_at` set
    async fn insert_run(&self, started_at: i64) -> Result<RunId>;

    /// Write the final figures of a run; a run can be completed only once
    async fn update_run(&self, run: RunId, completion: &RunCompletion) -> Result<()>;
}

/// Database handle for hn-fetch
pub struct Database {
    pool: SqlitePool,
}

#[async_trait]
impl ItemStore for Database {
    async fn find_by_external_id(&self, id: ItemId) -> Result<Option<StoredItem>> {
        self.get_item(id).await
    }

    async fn insert_item(&self, item: &NewItem) -> Result<()> {
        self.create_item(item).await.map(|_| ())
    }

    async fn update_item(&self, update: &ItemUpdate) -> Result<()> {
        self.refresh_item(update).await
    }

    async fn insert_run(&self, started_at: i64) -> Result<RunId> {
        self.create_run(started_at).await
    }

    async fn update_run(&self, run: RunId, completion: &RunCompletion) -> Result<()> {
        self.complete_run(run, completion).await
    }
}

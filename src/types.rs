//! Core types shared by the source client, the store and the orchestrator

use serde::{Deserialize, Serialize};

/// External id of an item as assigned by the source API
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub i64);

impl ItemId {
    /// Create a new ItemId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }

    /// Source ids are strictly positive
    pub fn is_valid(&self) -> bool {
        self.0 > 0
    }
}

impl From<i64> for ItemId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<ItemId> for i64 {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

impl PartialEq<i64> for ItemId {
    fn eq(&self, other: &i64) -> bool {
        self.0 == *other
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Database id of a fetch run audit record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub i64);

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validated item as returned by the source
///
/// Numeric and boolean fields already carry their defaults. `title` stays
/// optional here; storage maps an absent title to the empty string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Source id (unique key)
    pub id: ItemId,
    /// Headline, if the source sent one
    pub title: Option<String>,
    /// Link target
    pub url: Option<String>,
    /// Body text (HTML as delivered)
    pub text: Option<String>,
    /// Score (default 0)
    pub score: i64,
    /// Author username
    pub author: Option<String>,
    /// Creation time in Unix seconds (default 0)
    pub created_at_epoch: i64,
    /// Number of descendants (default 0)
    pub descendants: i64,
    /// Source item type ("story", "job", ...)
    pub item_type: Option<String>,
    /// Flagged dead by the source
    pub dead: bool,
    /// Deleted at the source
    pub deleted: bool,
}

impl Item {
    /// Item with only an id set and every other field at its default
    pub fn with_id(id: impl Into<ItemId>) -> Self {
        Self {
            id: id.into(),
            title: None,
            url: None,
            text: None,
            score: 0,
            author: None,
            created_at_epoch: 0,
            descendants: 0,
            item_type: None,
            dead: false,
            deleted: false,
        }
    }
}

/// States of a single fetch run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Audit record created
    Started,
    /// Pulling the id list and the individual items
    Fetching,
    /// Writing fetched items to storage
    Reconciling,
    /// Finished; the audit is marked successful
    Completed,
    /// Aborted; the audit carries the error summary
    Failed,
}

impl RunState {
    /// Completed and Failed are terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunState::Started => "started",
            RunState::Fetching => "fetching",
            RunState::Reconciling => "reconciling",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Insert/update counts produced by reconciliation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileStats {
    /// Items inserted for the first time
    pub new: u64,
    /// Existing items updated in place
    pub updated: u64,
    /// Items whose write failed and was skipped
    pub failed: u64,
}

/// Summary returned to the caller at the end of a run
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResult {
    /// Audit record of this run
    pub run_id: RunId,
    /// Whether the run completed
    pub success: bool,
    /// Number of items fetched successfully
    pub total_fetched: u64,
    /// Number of items inserted
    pub new_items: u64,
    /// Number of items updated
    pub updated_items: u64,
    /// Run-level error messages (empty on success)
    pub errors: Vec<String>,
}

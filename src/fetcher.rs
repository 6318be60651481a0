//! Fetch run orchestration
//!
//! [`FetchOrchestrator`] drives one run end to end:
//!
//! 1. Create the audit record (`Started`)
//! 2. Pull the id list, then every item in order with a fixed pause after each (`Fetching`)
//! 3. Insert new items and refresh stored ones (`Reconciling`)
//! 4. Write the final figures to the audit record (`Completed` or `Failed`)
//!
//! Only the id-list fetch can fail a run. A missing item or a failed write is
//! logged and skipped.
//!
//! # Example
//!
//! ```no_run
//! use hn_fetch::config::Config;
//! use hn_fetch::db::Database;
//! use hn_fetch::fetcher::FetchOrchestrator;
//! use hn_fetch::source::SourceClient;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let db = Arc::new(Database::new(&config.persistence.database_path).await?);
//! let client = Arc::new(SourceClient::new(&config.source, config.retry.clone())?);
//!
//! let orchestrator = FetchOrchestrator::new(client, db, config.pipeline.clone());
//! let result = orchestrator.run().await?;
//! println!("{} new, {} updated", result.new_items, result.updated_items);
//! # Ok(())
//! # }
//! ```

use crate::config::PipelineConfig;
use crate::db::{ItemStore, ItemUpdate, NewItem, RunCompletion};
use crate::error::Result;
use crate::source::ItemSource;
use crate::types::{FetchResult, Item, ItemId, ReconcileStats, RunId, RunState};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Why a run ended in `Failed`
struct RunFailure {
    message: String,
    fetched: u64,
}

/// What reconciliation did with a single item
enum Reconciled {
    New,
    Updated,
}

/// Drives fetch runs against an item source and a store
pub struct FetchOrchestrator {
    source: Arc<dyn ItemSource>,
    store: Arc<dyn ItemStore>,
    config: PipelineConfig,
    cancel: CancellationToken,
}

impl FetchOrchestrator {
    /// Create an orchestrator over the given source and store
    pub fn new(
        source: Arc<dyn ItemSource>,
        store: Arc<dyn ItemStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            source,
            store,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop runs early once `token` is cancelled
    ///
    /// The token is checked before each item fetch and during the pause
    /// between items. A cancelled run ends in `Failed` and keeps the count of
    /// items fetched so far.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Execute one fetch run
    ///
    /// Every call starts a fresh audit record; a previous run is never resumed.
    ///
    /// # Errors
    ///
    /// Only when the audit record cannot be created or finalised. Source
    /// failures are reported through [`FetchResult::errors`] instead.
    pub async fn run(&self) -> Result<FetchResult> {
        let run_id = self.store.insert_run(now()).await?;
        self.transition(run_id, RunState::Started);
        info!(run_id = %run_id, "Fetch run started");

        self.transition(run_id, RunState::Fetching);
        let items = match self.fetch_items(run_id).await {
            Ok(items) => items,
            Err(failure) => return self.fail(run_id, failure).await,
        };

        self.transition(run_id, RunState::Reconciling);
        let stats = self.reconcile(run_id, &items).await;

        self.complete(run_id, items.len() as u64, stats).await
    }

    async fn fetch_items(&self, run_id: RunId) -> std::result::Result<Vec<Item>, RunFailure> {
        let ids = self
            .source
            .fetch_id_list(None)
            .await
            .map_err(|e| RunFailure {
                message: format!("Fetch operation failed: {}", e),
                fetched: 0,
            })?;

        let total = ids.len();
        info!(run_id = %run_id, count = total, "Fetched item id list");

        let mut items = Vec::with_capacity(total);
        for (index, id) in ids.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(RunFailure {
                    message: format!(
                        "Fetch operation cancelled after {} of {} items",
                        index, total
                    ),
                    fetched: items.len() as u64,
                });
            }

            if let Some(item) = self.fetch_one(id).await {
                items.push(item);
            }

            let current = index + 1;
            if self.config.progress_interval > 0 && current % self.config.progress_interval == 0 {
                info!(
                    run_id = %run_id,
                    current,
                    total,
                    fetched = items.len(),
                    "Fetch progress"
                );
            }

            self.pause().await;
        }

        Ok(items)
    }

    async fn fetch_one(&self, id: ItemId) -> Option<Item> {
        match self.source.fetch_item(id).await {
            Ok(Some(item)) => Some(item),
            Ok(None) => {
                debug!(item_id = %id, "Item unavailable, skipping");
                None
            }
            Err(e) => {
                warn!(item_id = %id, error = %e, "Item fetch rejected, skipping");
                None
            }
        }
    }

    /// Fixed pause between item fetches; returns early on cancellation
    async fn pause(&self) {
        if self.config.item_delay.is_zero() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(self.config.item_delay) => {}
            _ = self.cancel.cancelled() => {}
        }
    }

    async fn reconcile(&self, run_id: RunId, items: &[Item]) -> ReconcileStats {
        let mut stats = ReconcileStats::default();

        for item in items {
            match self.reconcile_item(item).await {
                Ok(Reconciled::New) => stats.new += 1,
                Ok(Reconciled::Updated) => stats.updated += 1,
                Err(e) => {
                    stats.failed += 1;
                    warn!(
                        run_id = %run_id,
                        item_id = %item.id,
                        error = %e,
                        "Failed to store item, skipping"
                    );
                }
            }
        }

        if stats.failed > 0 {
            warn!(run_id = %run_id, failed = stats.failed, "Some items could not be stored");
        }

        stats
    }

    async fn reconcile_item(&self, item: &Item) -> Result<Reconciled> {
        match self.store.find_by_external_id(item.id).await? {
            Some(_) => {
                self.store.update_item(&ItemUpdate::from(item)).await?;
                Ok(Reconciled::Updated)
            }
            None => {
                self.store.insert_item(&NewItem::from(item)).await?;
                Ok(Reconciled::New)
            }
        }
    }

    async fn complete(
        &self,
        run_id: RunId,
        fetched: u64,
        stats: ReconcileStats,
    ) -> Result<FetchResult> {
        let completion = RunCompletion {
            completed_at: now(),
            items_fetched: fetched,
            items_new: stats.new,
            items_updated: stats.updated,
            error_summary: None,
            success: true,
        };
        self.store.update_run(run_id, &completion).await?;
        self.transition(run_id, RunState::Completed);

        info!(
            run_id = %run_id,
            total_fetched = fetched,
            new_items = stats.new,
            updated_items = stats.updated,
            "Fetch run completed"
        );

        Ok(FetchResult {
            run_id,
            success: true,
            total_fetched: fetched,
            new_items: stats.new,
            updated_items: stats.updated,
            errors: Vec::new(),
        })
    }

    async fn fail(&self, run_id: RunId, failure: RunFailure) -> Result<FetchResult> {
        warn!(run_id = %run_id, error = %failure.message, "Fetch run failed");

        let errors = vec![failure.message];
        let completion = RunCompletion {
            completed_at: now(),
            items_fetched: failure.fetched,
            items_new: 0,
            items_updated: 0,
            error_summary: Some(errors.join("\n")),
            success: false,
        };
        self.store.update_run(run_id, &completion).await?;
        self.transition(run_id, RunState::Failed);

        Ok(FetchResult {
            run_id,
            success: false,
            total_fetched: failure.fetched,
            new_items: 0,
            updated_items: 0,
            errors,
        })
    }

    fn transition(&self, run_id: RunId, state: RunState) {
        debug!(run_id = %run_id, state = %state, terminal = state.is_terminal(), "Run state changed");
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, StoredItem};
    use crate::error::{DatabaseError, Error};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory source with a fixed id list and item set
    #[derive(Default)]
    struct FakeSource {
        ids: Vec<ItemId>,
        id_list_error: Option<String>,
        items: HashMap<i64, Item>,
        rejected: Vec<ItemId>,
        requested: Mutex<Vec<ItemId>>,
        cancel_after: Option<(ItemId, CancellationToken)>,
    }

    impl FakeSource {
        fn with_items(items: Vec<Item>) -> Self {
            Self {
                ids: items.iter().map(|i| i.id).collect(),
                items: items.into_iter().map(|i| (i.id.get(), i)).collect(),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl ItemSource for FakeSource {
        async fn fetch_id_list(&self, _limit: Option<usize>) -> Result<Vec<ItemId>> {
            match &self.id_list_error {
                Some(msg) => Err(Error::Other(msg.clone())),
                None => Ok(self.ids.clone()),
            }
        }

        async fn fetch_item(&self, id: ItemId) -> Result<Option<Item>> {
            self.requested.lock().unwrap().push(id);
            if let Some((after, token)) = &self.cancel_after {
                if *after == id {
                    token.cancel();
                }
            }
            if self.rejected.contains(&id) {
                return Err(Error::InvalidArgument(format!("bad id {}", id)));
            }
            Ok(self.items.get(&id.get()).cloned())
        }
    }

    /// In-memory store recording writes in order
    #[derive(Default)]
    struct MemoryStore {
        items: Mutex<HashMap<i64, StoredItem>>,
        writes: Mutex<Vec<ItemId>>,
        runs: Mutex<Vec<(i64, Option<RunCompletion>)>>,
        fail_writes_for: Option<ItemId>,
        fail_insert_run: bool,
    }

    impl MemoryStore {
        fn stored(&self, id: i64) -> Option<StoredItem> {
            self.items.lock().unwrap().get(&id).cloned()
        }

        fn completion(&self, run: RunId) -> Option<RunCompletion> {
            self.runs.lock().unwrap()[(run.0 - 1) as usize].1.clone()
        }
    }

    #[async_trait]
    impl ItemStore for MemoryStore {
        async fn find_by_external_id(&self, id: ItemId) -> Result<Option<StoredItem>> {
            Ok(self.stored(id.get()))
        }

        async fn insert_item(&self, item: &NewItem) -> Result<()> {
            if self.fail_writes_for == Some(item.external_id) {
                return Err(Error::Database(DatabaseError::QueryFailed("disk full".into())));
            }
            let mut items = self.items.lock().unwrap();
            if items.contains_key(&item.external_id.get()) {
                return Err(Error::Database(DatabaseError::ConstraintViolation(
                    "duplicate".into(),
                )));
            }
            let next_id = items.len() as i64 + 1;
            items.insert(
                item.external_id.get(),
                StoredItem {
                    id: next_id,
                    external_id: item.external_id.get(),
                    title: item.title.clone(),
                    url: item.url.clone(),
                    text: item.text.clone(),
                    score: item.score,
                    author: item.author.clone(),
                    created_at_epoch: item.created_at_epoch,
                    descendants: item.descendants,
                    item_type: item.item_type.clone(),
                    dead: item.dead,
                    deleted: item.deleted,
                    fetched_at: 1,
                    updated_at: 1,
                },
            );
            self.writes.lock().unwrap().push(item.external_id);
            Ok(())
        }

        async fn update_item(&self, update: &ItemUpdate) -> Result<()> {
            if self.fail_writes_for == Some(update.external_id) {
                return Err(Error::Database(DatabaseError::QueryFailed("disk full".into())));
            }
            let mut items = self.items.lock().unwrap();
            let stored = items
                .get_mut(&update.external_id.get())
                .ok_or_else(|| Error::Database(DatabaseError::NotFound("item".into())))?;
            stored.title = update.title.clone();
            stored.score = update.score;
            stored.descendants = update.descendants;
            stored.updated_at += 1;
            self.writes.lock().unwrap().push(update.external_id);
            Ok(())
        }

        async fn insert_run(&self, started_at: i64) -> Result<RunId> {
            if self.fail_insert_run {
                return Err(Error::Database(DatabaseError::ConnectionFailed(
                    "unreachable".into(),
                )));
            }
            let mut runs = self.runs.lock().unwrap();
            runs.push((started_at, None));
            Ok(RunId(runs.len() as i64))
        }

        async fn update_run(&self, run: RunId, completion: &RunCompletion) -> Result<()> {
            let mut runs = self.runs.lock().unwrap();
            let slot = &mut runs[(run.0 - 1) as usize].1;
            if slot.is_some() {
                return Err(Error::Database(DatabaseError::ConstraintViolation(
                    "already completed".into(),
                )));
            }
            *slot = Some(completion.clone());
            Ok(())
        }
    }

    fn story(id: i64, score: i64) -> Item {
        Item {
            title: Some(format!("Story {id}")),
            url: Some(format!("https://example.com/{id}")),
            author: Some("dang".to_string()),
            score,
            descendants: 1,
            created_at_epoch: 1_700_000_000,
            item_type: Some("story".to_string()),
            ..Item::with_id(id)
        }
    }

    fn no_pause() -> PipelineConfig {
        PipelineConfig {
            item_delay: Duration::ZERO,
            progress_interval: 1,
        }
    }

    fn orchestrator(source: Arc<FakeSource>, store: Arc<MemoryStore>) -> FetchOrchestrator {
        FetchOrchestrator::new(source, store, no_pause())
    }

    #[tokio::test]
    async fn absent_item_is_excluded_from_totals() {
        let mut source = FakeSource::with_items(vec![story(101, 5), story(103, 7)]);
        source.ids = vec![ItemId(101), ItemId(102), ItemId(103)];
        let source = Arc::new(source);
        let store = Arc::new(MemoryStore::default());

        let result = orchestrator(source.clone(), store.clone())
            .run()
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.total_fetched, 2);
        assert_eq!(result.new_items, 2);
        assert_eq!(result.updated_items, 0);
        assert!(result.errors.is_empty());

        let audit = store.completion(result.run_id).unwrap();
        assert_eq!(audit.items_fetched, 2);
        assert_eq!(audit.items_new, 2);
        assert!(audit.success);
        assert!(audit.error_summary.is_none());

        assert_eq!(
            *source.requested.lock().unwrap(),
            vec![ItemId(101), ItemId(102), ItemId(103)]
        );
    }

    #[tokio::test]
    async fn id_list_failure_fails_the_run() {
        let source = Arc::new(FakeSource {
            id_list_error: Some("connect ECONNREFUSED 127.0.0.1:443".into()),
            ..Default::default()
        });
        let store = Arc::new(MemoryStore::default());

        let result = orchestrator(source.clone(), store.clone())
            .run()
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.total_fetched, 0);
        assert_eq!(result.new_items, 0);
        assert_eq!(result.updated_items, 0);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("Fetch operation failed: "));
        assert!(result.errors[0].contains("ECONNREFUSED"));

        let audit = store.completion(result.run_id).unwrap();
        assert!(!audit.success);
        assert!(audit.completed_at > 0);
        assert!(!audit.error_summary.unwrap().is_empty());
        assert!(source.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_run_updates_instead_of_inserting() {
        let source = Arc::new(FakeSource::with_items(vec![story(1, 10), story(2, 20)]));
        let store = Arc::new(MemoryStore::default());
        let orchestrator = orchestrator(source, store.clone());

        let first = orchestrator.run().await.unwrap();
        let second = orchestrator.run().await.unwrap();

        assert_eq!(first.new_items, 2);
        assert_eq!(second.new_items, 0);
        assert_eq!(second.updated_items, 2);
        assert_ne!(first.run_id, second.run_id);
        assert_eq!(store.items.lock().unwrap().len(), 2);
        assert_eq!(store.runs.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_leaves_other_fields_untouched() {
        let store = Arc::new(MemoryStore::default());
        store.insert_item(&NewItem::from(&story(42, 3))).await.unwrap();

        let refreshed = Item {
            title: None,
            url: Some("https://changed.example/".into()),
            author: Some("someone-else".into()),
            score: 99,
            descendants: 12,
            ..Item::with_id(42)
        };
        let source = Arc::new(FakeSource::with_items(vec![refreshed]));

        let result = orchestrator(source, store.clone()).run().await.unwrap();
        assert_eq!(result.new_items, 0);
        assert_eq!(result.updated_items, 1);

        let stored = store.stored(42).unwrap();
        assert_eq!(stored.score, 99);
        assert_eq!(stored.descendants, 12);
        assert_eq!(stored.title, "");
        assert_eq!(stored.url.as_deref(), Some("https://example.com/42"));
        assert_eq!(stored.author.as_deref(), Some("dang"));
        assert_eq!(stored.created_at_epoch, 1_700_000_000);
    }

    #[tokio::test]
    async fn write_failure_skips_only_that_item() {
        let source = Arc::new(FakeSource::with_items(vec![
            story(1, 1),
            story(2, 2),
            story(3, 3),
        ]));
        let store = Arc::new(MemoryStore {
            fail_writes_for: Some(ItemId(2)),
            ..Default::default()
        });

        let result = orchestrator(source, store.clone()).run().await.unwrap();

        assert!(result.success);
        assert_eq!(result.total_fetched, 3);
        assert_eq!(result.new_items, 2);
        assert_eq!(*store.writes.lock().unwrap(), vec![ItemId(1), ItemId(3)]);
    }

    #[tokio::test]
    async fn items_are_written_in_fetch_order() {
        let source = Arc::new(FakeSource::with_items(vec![
            story(30, 0),
            story(10, 0),
            story(20, 0),
        ]));
        let store = Arc::new(MemoryStore::default());

        let _ = orchestrator(source, store.clone()).run().await.unwrap();

        assert_eq!(
            *store.writes.lock().unwrap(),
            vec![ItemId(30), ItemId(10), ItemId(20)]
        );
    }

    #[tokio::test]
    async fn rejected_item_is_skipped() {
        let mut source = FakeSource::with_items(vec![story(1, 0), story(2, 0)]);
        source.rejected = vec![ItemId(1)];
        let store = Arc::new(MemoryStore::default());

        let result = orchestrator(Arc::new(source), store).run().await.unwrap();

        assert!(result.success);
        assert_eq!(result.total_fetched, 1);
    }

    #[tokio::test]
    async fn audit_creation_failure_is_an_error() {
        let source = Arc::new(FakeSource::with_items(vec![story(1, 0)]));
        let store = Arc::new(MemoryStore {
            fail_insert_run: true,
            ..Default::default()
        });

        let err = orchestrator(source.clone(), store).run().await.unwrap_err();

        assert!(matches!(
            err,
            Error::Database(DatabaseError::ConnectionFailed(_))
        ));
        assert!(source.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancellation_fails_the_run_with_partial_count() {
        let token = CancellationToken::new();
        let mut source = FakeSource::with_items(vec![story(1, 0), story(2, 0), story(3, 0)]);
        source.cancel_after = Some((ItemId(2), token.clone()));
        let source = Arc::new(source);
        let store = Arc::new(MemoryStore::default());

        let result = orchestrator(source.clone(), store.clone())
            .with_cancellation(token)
            .run()
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.total_fetched, 2);
        assert_eq!(result.new_items, 0);
        assert_eq!(
            result.errors,
            vec!["Fetch operation cancelled after 2 of 3 items".to_string()]
        );
        assert_eq!(source.requested.lock().unwrap().len(), 2);
        // Nothing reconciled
        assert!(store.items.lock().unwrap().is_empty());

        let audit = store.completion(result.run_id).unwrap();
        assert_eq!(audit.items_fetched, 2);
        assert!(!audit.success);
    }

    #[tokio::test(start_paused = true)]
    async fn items_are_paced() {
        let source = Arc::new(FakeSource::with_items(vec![
            story(1, 0),
            story(2, 0),
            story(3, 0),
        ]));
        let store = Arc::new(MemoryStore::default());
        let config = PipelineConfig {
            item_delay: Duration::from_millis(100),
            progress_interval: 10,
        };

        let start = tokio::time::Instant::now();
        let result = FetchOrchestrator::new(source, store, config)
            .run()
            .await
            .unwrap();

        assert!(result.success);
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    mod end_to_end {
        use super::*;
        use crate::config::{RetryPolicy, SourceConfig};
        use crate::source::SourceClient;
        use serde_json::json;
        use tempfile::NamedTempFile;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        fn client_for(base_url: String) -> SourceClient {
            let config = SourceConfig {
                base_url,
                request_timeout: Duration::from_secs(5),
                max_items: 10,
                ..SourceConfig::default()
            };
            let policy = RetryPolicy {
                max_attempts: 2,
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(2),
                backoff_multiplier: 2.0,
                jitter: false,
            };
            SourceClient::new(&config, policy).unwrap()
        }

        async fn mount_item(server: &MockServer, id: i64, score: i64) {
            Mock::given(method("GET"))
                .and(path(format!("/item/{id}.json")))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "id": id,
                    "type": "story",
                    "by": "pg",
                    "time": 1_700_000_000,
                    "title": format!("Story {id}"),
                    "url": format!("https://example.com/{id}"),
                    "score": score,
                    "descendants": 0
                })))
                .mount(server)
                .await;
        }

        async fn mount_scenario(server: &MockServer, score: i64) {
            Mock::given(method("GET"))
                .and(path("/newstories.json"))
                .respond_with(ResponseTemplate::new(200).set_body_json(vec![101, 102, 103]))
                .mount(server)
                .await;
            mount_item(server, 101, score).await;
            Mock::given(method("GET"))
                .and(path("/item/102.json"))
                .respond_with(ResponseTemplate::new(500))
                .mount(server)
                .await;
            mount_item(server, 103, score).await;
        }

        #[tokio::test]
        async fn run_against_http_source_and_sqlite() {
            let server = MockServer::start().await;
            mount_scenario(&server, 5).await;

            let temp_file = NamedTempFile::new().unwrap();
            let db = Arc::new(Database::new(temp_file.path()).await.unwrap());
            let orchestrator =
                FetchOrchestrator::new(Arc::new(client_for(server.uri())), db.clone(), no_pause());

            let first = orchestrator.run().await.unwrap();
            assert!(first.success);
            assert_eq!(first.total_fetched, 2);
            assert_eq!(first.new_items, 2);
            assert_eq!(first.updated_items, 0);

            let audit = db.get_run(first.run_id).await.unwrap().unwrap();
            assert_eq!(audit.items_fetched, 2);
            assert_eq!(audit.items_new, 2);
            assert!(audit.success);
            assert!(audit.completed_at.is_some());

            server.reset().await;
            mount_scenario(&server, 50).await;

            let second = orchestrator.run().await.unwrap();
            assert_eq!(second.new_items, 0);
            assert_eq!(second.updated_items, 2);
            assert_eq!(db.count_items().await.unwrap(), 2);

            let stored = db.get_item(ItemId(101)).await.unwrap().unwrap();
            assert_eq!(stored.score, 50);
            assert_eq!(stored.author.as_deref(), Some("pg"));
        }

        #[tokio::test]
        async fn unreachable_source_records_failed_audit() {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = listener.local_addr().unwrap();
            drop(listener);
            let client = client_for(format!("http://{addr}/v0"));

            let temp_file = NamedTempFile::new().unwrap();
            let db = Arc::new(Database::new(temp_file.path()).await.unwrap());

            let result = FetchOrchestrator::new(Arc::new(client), db.clone(), no_pause())
                .run()
                .await
                .unwrap();

            assert!(!result.success);
            assert_eq!(result.total_fetched, 0);
            assert!(result.errors[0].starts_with("Fetch operation failed: "));

            let audit = db.get_run(result.run_id).await.unwrap().unwrap();
            assert!(!audit.success);
            assert!(audit.completed_at.is_some());
            assert!(audit.error_summary.is_some());
        }
    }
}

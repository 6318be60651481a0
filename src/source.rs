//! Source API client
//!
//! [`SourceClient`] talks to the item API over HTTP. Every request goes
//! through its own retry loop and every response through [`crate::validation`].
//! The orchestrator depends on the [`ItemSource`] trait so runs can be driven
//! by in-memory sources in tests.

use crate::config::{RetryPolicy, SourceConfig};
use crate::error::{Error, Result};
use crate::retry::{LogHooks, RetryExecutor};
use crate::types::{Item, ItemId};
use crate::validation::{parse_id_list, parse_item};
use async_trait::async_trait;
use tracing::{debug, error, info, warn};

/// Operations the orchestrator needs from an item source
#[async_trait]
pub trait ItemSource: Send + Sync {
    /// Fetch the newest item ids, truncated to `limit` (or the configured maximum)
    ///
    /// # Errors
    ///
    /// Fails once retries are exhausted or the payload is invalid, and for
    /// `Some(0)` before any request is made.
    async fn fetch_id_list(&self, limit: Option<usize>) -> Result<Vec<ItemId>>;

    /// Fetch a single item
    ///
    /// Returns `Ok(None)` when the item could not be fetched or validated.
    ///
    /// # Errors
    ///
    /// Only for a non-positive id, before any request is made.
    async fn fetch_item(&self, id: ItemId) -> Result<Option<Item>>;
}

/// HTTP client for the item API
pub struct SourceClient {
    http_client: reqwest::Client,
    base_url: String,
    max_items: usize,
    retry: RetryExecutor,
}

impl SourceClient {
    /// Create a new source client
    ///
    /// # Errors
    ///
    /// Returns error if the retry policy is invalid or the HTTP client cannot be created
    pub fn new(config: &SourceConfig, retry_policy: RetryPolicy) -> Result<Self> {
        let retry = RetryExecutor::new(retry_policy)?;

        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_items: config.max_items,
            retry,
        })
    }

    /// The retry executor applied to every request
    pub fn retry(&self) -> &RetryExecutor {
        &self.retry
    }

    fn id_list_url(&self) -> String {
        format!("{}/newstories.json", self.base_url)
    }

    fn item_url(&self, id: ItemId) -> String {
        format!("{}/item/{}.json", self.base_url, id)
    }

    /// Perform one GET and decode the body as JSON
    ///
    /// Non-2xx statuses become [`Error::HttpStatus`]; undecodable bodies
    /// become [`Error::Validation`].
    async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        let response = self.http_client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| {
            Error::Validation(crate::error::ValidationError::Malformed(format!(
                "response from {} is not JSON: {}",
                url, e
            )))
        })
    }
}

#[async_trait]
impl ItemSource for SourceClient {
    async fn fetch_id_list(&self, limit: Option<usize>) -> Result<Vec<ItemId>> {
        if limit == Some(0) {
            return Err(Error::InvalidArgument(
                "id list limit must be positive".to_string(),
            ));
        }
        let max = limit.unwrap_or(self.max_items);
        let url = self.id_list_url();
        let url = url.as_str();

        let hooks = LogHooks::warn("fetch new item ids");
        let result = self
            .retry
            .execute(&hooks, move || async move {
                let body = self.get_json(url).await?;
                let mut ids = parse_id_list(&body)?;
                ids.truncate(max);
                Ok::<_, Error>(ids)
            })
            .await;

        match result {
            Ok(ids) => {
                info!(count = ids.len(), limit = max, "Fetched new item ids");
                Ok(ids)
            }
            Err(e) => {
                error!(error = %e, error_code = e.error_code(), "Failed to fetch new item ids");
                Err(e)
            }
        }
    }

    async fn fetch_item(&self, id: ItemId) -> Result<Option<Item>> {
        if !id.is_valid() {
            return Err(Error::InvalidArgument(format!(
                "item id must be positive, got {id}"
            )));
        }
        let url = self.item_url(id);
        let url = url.as_str();

        let hooks = LogHooks::debug(format!("fetch item {id}"));
        let result = self
            .retry
            .execute(&hooks, move || async move {
                let body = self.get_json(url).await?;
                Ok::<_, Error>(parse_item(&body)?)
            })
            .await;

        match result {
            Ok(item) => {
                if item.id != id {
                    debug!(requested = %id, returned = %item.id, "Source returned a different item id");
                }
                Ok(Some(item))
            }
            Err(e) => {
                warn!(
                    item_id = %id,
                    error = %e,
                    error_code = e.error_code(),
                    "Error fetching item after retries"
                );
                Ok(None)
            }
        }
    }
}

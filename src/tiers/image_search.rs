//! Tier 1: dual image search.
//!
//! Two searches per request: batch A is the user text alone, batch B adds the
//! expected category. The gap between the two result *counts* is itself a
//! signal — a brand that is everywhere without the category but vanishes with
//! it is probably filed under the wrong category. Providers report far more
//! results than we fetch, so each batch carries the provider's total count
//! alongside the capped result list.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::error::SearchError;
use crate::constants::IMAGE_BATCH_LIMIT;

/// One image search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResult {
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub context_link: String,
    pub thumbnail_url: String,
}

/// One search's outcome: fetched results plus the provider's total count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchBatch {
    /// Fetched results, capped by the caller.
    pub results: Vec<ImageResult>,
    /// Total matches the provider reports for the query, which is usually far
    /// larger than the fetched page.
    pub total_results: u64,
}

impl SearchBatch {
    /// Builds snippet strings (title + snippet) for the web-text tier.
    pub fn snippets(&self) -> Vec<String> {
        self.results
            .iter()
            .map(|r| format!("{} — {}", r.title, r.snippet))
            .collect()
    }

    /// Image URLs for the vision tier, capped at `limit`.
    pub fn urls(&self, limit: usize) -> Vec<String> {
        self.results
            .iter()
            .take(limit)
            .map(|r| r.url.clone())
            .collect()
    }
}

/// Image search provider.
pub trait ImageSearchClient: Send + Sync {
    /// Runs one image search for `query`.
    fn search(
        &self,
        query: &str,
        language: &str,
    ) -> impl std::future::Future<Output = Result<SearchBatch, SearchError>> + Send;
}

/// Google Custom Search (image mode) client.
pub struct GoogleImageSearch {
    client: reqwest::Client,
    api_key: Option<String>,
    engine_id: String,
}

const CSE_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

#[derive(Deserialize)]
struct CseResponse {
    #[serde(default)]
    items: Vec<CseItem>,
    #[serde(default, rename = "searchInformation")]
    search_information: Option<CseSearchInformation>,
}

#[derive(Deserialize)]
struct CseSearchInformation {
    #[serde(default, rename = "totalResults")]
    total_results: String,
}

#[derive(Deserialize)]
struct CseItem {
    #[serde(default)]
    link: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    image: Option<CseImage>,
}

#[derive(Deserialize)]
struct CseImage {
    #[serde(default, rename = "contextLink")]
    context_link: String,
    #[serde(default, rename = "thumbnailLink")]
    thumbnail_link: String,
}

impl GoogleImageSearch {
    /// Creates a client. Without an API key the client is permanently
    /// degraded and every search reports [`SearchError::MissingCredentials`].
    pub fn new(
        api_key: Option<String>,
        engine_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        if api_key.is_none() {
            warn!("image search API key not configured; tier will run degraded");
        }

        Ok(Self {
            client,
            api_key,
            engine_id: engine_id.into(),
        })
    }
}

impl ImageSearchClient for GoogleImageSearch {
    async fn search(&self, query: &str, language: &str) -> Result<SearchBatch, SearchError> {
        let api_key = self.api_key.as_ref().ok_or(SearchError::MissingCredentials)?;

        let response = self
            .client
            .get(CSE_ENDPOINT)
            .query(&[
                ("key", api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("searchType", "image"),
                ("hl", language),
                ("num", "6"),
            ])
            .send()
            .await
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        let parsed: CseResponse = response
            .json()
            .await
            .map_err(|e| SearchError::DecodeFailed(e.to_string()))?;

        let results: Vec<ImageResult> = parsed
            .items
            .into_iter()
            .map(|item| {
                let image = item.image.unwrap_or(CseImage {
                    context_link: String::new(),
                    thumbnail_link: String::new(),
                });
                ImageResult {
                    url: item.link,
                    title: item.title,
                    snippet: item.snippet,
                    context_link: image.context_link,
                    thumbnail_url: image.thumbnail_link,
                }
            })
            .collect();

        let total_results = parsed
            .search_information
            .and_then(|info| info.total_results.parse().ok())
            .unwrap_or(results.len() as u64);

        Ok(SearchBatch {
            results,
            total_results,
        })
    }
}

/// Tier-1 wrapper running both searches and capping each batch.
pub struct DualImageSearch<C> {
    client: C,
}

impl<C: ImageSearchClient> DualImageSearch<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Runs search A (text alone) and search B (text + category).
    ///
    /// A failed search degrades to an empty batch; fetched results are capped
    /// at [`IMAGE_BATCH_LIMIT`] per batch while `total_results` keeps the
    /// provider's full count.
    #[instrument(skip(self), fields(category = category, language = language))]
    pub async fn dual_search(
        &self,
        text: &str,
        category: &str,
        language: &str,
    ) -> (SearchBatch, SearchBatch) {
        let filtered_query = format!("{text} {category}");

        let batch_a = self.run_one(text, language, "A").await;
        let batch_b = self.run_one(&filtered_query, language, "B").await;

        debug!(
            batch_a = batch_a.results.len(),
            batch_a_total = batch_a.total_results,
            batch_b = batch_b.results.len(),
            batch_b_total = batch_b.total_results,
            "Dual image search complete"
        );

        (batch_a, batch_b)
    }

    async fn run_one(&self, query: &str, language: &str, label: &str) -> SearchBatch {
        match self.client.search(query, language).await {
            Ok(mut batch) => {
                batch.results.truncate(IMAGE_BATCH_LIMIT);
                batch
            }
            Err(e) => {
                warn!(batch = label, error = %e, "Image search failed, continuing with empty batch");
                SearchBatch::default()
            }
        }
    }
}

#[cfg(any(test, feature = "mock"))]
pub struct MockImageSearchClient {
    responses: parking_lot::RwLock<std::collections::HashMap<String, SearchBatch>>,
    calls: std::sync::atomic::AtomicUsize,
    fail: std::sync::atomic::AtomicBool,
}

#[cfg(any(test, feature = "mock"))]
impl MockImageSearchClient {
    pub fn new() -> Self {
        Self {
            responses: parking_lot::RwLock::new(std::collections::HashMap::new()),
            calls: std::sync::atomic::AtomicUsize::new(0),
            fail: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Registers results for an exact query string; the provider total
    /// defaults to the result count.
    pub fn insert(&self, query: &str, results: Vec<ImageResult>) {
        let total_results = results.len() as u64;
        self.insert_with_total(query, results, total_results);
    }

    /// Registers results with an explicit provider total.
    pub fn insert_with_total(&self, query: &str, results: Vec<ImageResult>, total_results: u64) {
        self.responses.write().insert(
            query.to_string(),
            SearchBatch {
                results,
                total_results,
            },
        );
    }

    pub fn fail_all(&self) {
        self.fail.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Builds `n` placeholder results tagged with `stem`.
    pub fn results(stem: &str, n: usize) -> Vec<ImageResult> {
        (0..n)
            .map(|i| ImageResult {
                url: format!("https://img.example/{stem}/{i}.jpg"),
                title: format!("{stem} product shot {i}"),
                snippet: format!("{stem} on a store shelf"),
                context_link: format!("https://shop.example/{stem}"),
                thumbnail_url: format!("https://img.example/{stem}/{i}_t.jpg"),
            })
            .collect()
    }
}

#[cfg(any(test, feature = "mock"))]
impl Default for MockImageSearchClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "mock"))]
impl ImageSearchClient for MockImageSearchClient {
    async fn search(&self, query: &str, _language: &str) -> Result<SearchBatch, SearchError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(SearchError::RequestFailed("mock failure".to_string()));
        }
        Ok(self
            .responses
            .read()
            .get(query)
            .cloned()
            .unwrap_or_default())
    }
}

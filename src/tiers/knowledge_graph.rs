//! Tier 3: knowledge-graph entity verification.
//!
//! Confirms that a candidate name is a real-world entity and checks the
//! entity's category against the expected survey category. The orchestrator
//! runs one speculative lookup on the raw user text during the fan-out and a
//! confirming lookup on the vision-derived dominant candidate afterwards.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::error::KgError;
use super::product_type::ProductTypeMatcher;
use crate::evidence::KgEntity;

/// Raw knowledge-graph record, before category checking.
#[derive(Debug, Clone, PartialEq)]
pub struct KgRecord {
    /// Canonical entity name.
    pub name: String,
    /// Graph entity type (e.g. `Brand`, `Organization`).
    pub entity_type: String,
    /// Short description of the entity.
    pub description: String,
}

/// Knowledge-graph provider.
pub trait KnowledgeGraphClient: Send + Sync {
    /// Looks up `entity`; `Ok(None)` means the graph knows nothing about it.
    fn lookup(
        &self,
        entity: &str,
    ) -> impl std::future::Future<Output = Result<Option<KgRecord>, KgError>> + Send;
}

/// Google Knowledge Graph Search API client.
pub struct GoogleKnowledgeGraph {
    client: reqwest::Client,
    api_key: Option<String>,
}

const KG_ENDPOINT: &str = "https://kgsearch.googleapis.com/v1/entities:search";

#[derive(Deserialize)]
struct KgResponse {
    #[serde(default, rename = "itemListElement")]
    items: Vec<KgItem>,
}

#[derive(Deserialize)]
struct KgItem {
    result: KgResult,
}

#[derive(Deserialize)]
struct KgResult {
    #[serde(default)]
    name: String,
    #[serde(default, rename = "@type")]
    types: Vec<String>,
    #[serde(default)]
    description: String,
    #[serde(default, rename = "detailedDescription")]
    detailed: Option<KgDetailedDescription>,
}

#[derive(Deserialize)]
struct KgDetailedDescription {
    #[serde(default, rename = "articleBody")]
    article_body: String,
}

impl GoogleKnowledgeGraph {
    /// Creates a client. Without an API key the client is permanently
    /// degraded and every lookup reports [`KgError::MissingCredentials`].
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self, KgError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KgError::RequestFailed(e.to_string()))?;

        if api_key.is_none() {
            warn!("knowledge graph API key not configured; tier will run degraded");
        }

        Ok(Self { client, api_key })
    }
}

impl KnowledgeGraphClient for GoogleKnowledgeGraph {
    async fn lookup(&self, entity: &str) -> Result<Option<KgRecord>, KgError> {
        let api_key = self.api_key.as_ref().ok_or(KgError::MissingCredentials)?;

        let response = self
            .client
            .get(KG_ENDPOINT)
            .query(&[
                ("key", api_key.as_str()),
                ("query", entity),
                ("limit", "1"),
            ])
            .send()
            .await
            .map_err(|e| KgError::RequestFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| KgError::RequestFailed(e.to_string()))?;

        let parsed: KgResponse = response
            .json()
            .await
            .map_err(|e| KgError::DecodeFailed(e.to_string()))?;

        Ok(parsed.items.into_iter().next().map(|item| {
            let result = item.result;
            let description = match result.detailed {
                Some(detailed) if !detailed.article_body.is_empty() => detailed.article_body,
                _ => result.description,
            };
            KgRecord {
                name: result.name,
                entity_type: primary_type(&result.types),
                description,
            }
        }))
    }
}

/// Prefers the most specific type the graph offers.
fn primary_type(types: &[String]) -> String {
    for preferred in ["Brand", "Organization", "Corporation"] {
        if types.iter().any(|t| t == preferred) {
            return preferred.to_string();
        }
    }
    types
        .iter()
        .find(|t| *t != "Thing")
        .or_else(|| types.first())
        .cloned()
        .unwrap_or_default()
}

/// Tier-3 validator.
pub struct KnowledgeGraphValidator<K> {
    client: K,
    matcher: ProductTypeMatcher,
}

impl<K: KnowledgeGraphClient> KnowledgeGraphValidator<K> {
    pub fn new(client: K, matcher: ProductTypeMatcher) -> Self {
        Self { client, matcher }
    }

    pub fn client(&self) -> &K {
        &self.client
    }

    /// Looks up one entity and checks it against the expected category.
    ///
    /// The result map is keyed by the queried name; a `None` value records a
    /// lookup that found nothing. A client failure degrades to an empty map.
    #[instrument(skip(self), fields(category = expected_category))]
    pub async fn validate(
        &self,
        entity: &str,
        expected_category: &str,
    ) -> HashMap<String, Option<KgEntity>> {
        let mut results = HashMap::new();

        match self.client.lookup(entity).await {
            Ok(Some(record)) => {
                let haystack = format!("{} {}", record.description, record.entity_type);
                let matches_category = self
                    .matcher
                    .category_matches_text(expected_category, &haystack);
                let category = self
                    .matcher
                    .detect_category(&haystack)
                    .unwrap_or_else(|| "unknown".to_string());

                debug!(
                    entity = entity,
                    resolved = %record.name,
                    entity_type = %record.entity_type,
                    matches_category = matches_category,
                    "Knowledge graph entity verified"
                );

                results.insert(
                    entity.to_string(),
                    Some(KgEntity {
                        name: record.name,
                        verified: true,
                        entity_type: record.entity_type,
                        category,
                        matches_category,
                        description: record.description,
                    }),
                );
            }
            Ok(None) => {
                debug!(entity = entity, "Knowledge graph found no entity");
                results.insert(entity.to_string(), None);
            }
            Err(e) => {
                warn!(entity = entity, error = %e, "Knowledge graph lookup failed, returning empty map");
            }
        }

        results
    }
}

#[cfg(any(test, feature = "mock"))]
pub struct MockKnowledgeGraphClient {
    records: parking_lot::RwLock<HashMap<String, KgRecord>>,
    calls: std::sync::atomic::AtomicUsize,
    fail: std::sync::atomic::AtomicBool,
}

#[cfg(any(test, feature = "mock"))]
impl MockKnowledgeGraphClient {
    pub fn new() -> Self {
        Self {
            records: parking_lot::RwLock::new(HashMap::new()),
            calls: std::sync::atomic::AtomicUsize::new(0),
            fail: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Registers an entity record, keyed case-insensitively.
    pub fn insert(&self, name: &str, entity_type: &str, description: &str) {
        self.records.write().insert(
            name.to_lowercase(),
            KgRecord {
                name: name.to_string(),
                entity_type: entity_type.to_string(),
                description: description.to_string(),
            },
        );
    }

    pub fn fail_all(&self) {
        self.fail.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "mock"))]
impl Default for MockKnowledgeGraphClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "mock"))]
impl KnowledgeGraphClient for MockKnowledgeGraphClient {
    async fn lookup(&self, entity: &str) -> Result<Option<KgRecord>, KgError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(KgError::RequestFailed("mock failure".to_string()));
        }
        Ok(self.records.read().get(&entity.to_lowercase()).cloned())
    }
}

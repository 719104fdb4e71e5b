//! Tier 0: vector-similarity brand cache with an exact-match front cache.
//!
//! The whole pipeline exists to make this tier cheap: a hit above the
//! namespace threshold terminates the request before any model or search API
//! is touched. An in-memory exact-match cache keyed by the BLAKE3 hash of the
//! normalized `(category, answer)` pair sits in front of the vector lookup and
//! replays recent matches without an embedding round-trip.

use std::sync::Arc;

use moka::sync::Cache;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::SearchPointsBuilder;
use qdrant_client::qdrant::point_id::PointIdOptions;
use tracing::{debug, info, instrument, warn};

use super::embedding::Embedder;
use super::error::VectorStoreError;
use crate::constants::{
    CACHE_CATEGORY_THRESHOLD, CACHE_GLOBAL_THRESHOLD, CATEGORY_NAMESPACE_PREFIX,
    DEFAULT_FRONT_CACHE_CAPACITY, GLOBAL_NAMESPACE,
};
use crate::evidence::CacheMatch;
use crate::hashing::hash_namespace_key;
use crate::normalize::normalize_answer;

/// One ranked brand from the vector store.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredBrand {
    /// Vector-store point id.
    pub id: u64,
    /// Canonical brand name from the point payload.
    pub name: String,
    /// Cosine similarity to the query.
    pub score: f32,
}

/// Read-only vector store access for Tier 0.
pub trait VectorSearchBackend: Send + Sync {
    /// Searches `namespace` for the vectors closest to `query`.
    fn search(
        &self,
        namespace: &str,
        query: Vec<f32>,
        limit: u64,
    ) -> impl std::future::Future<Output = Result<Vec<ScoredBrand>, VectorStoreError>> + Send;
}

/// Qdrant-backed vector store, one collection per namespace.
#[derive(Clone)]
pub struct QdrantSearchBackend {
    client: Qdrant,
    url: String,
}

impl QdrantSearchBackend {
    /// Creates a backend for `url`.
    pub async fn new(url: &str) -> Result<Self, VectorStoreError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| VectorStoreError::ConnectionFailed {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    /// Returns the configured URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Performs a basic health check request.
    pub async fn health_check(&self) -> Result<(), VectorStoreError> {
        self.client
            .health_check()
            .await
            .map_err(|e| VectorStoreError::ConnectionFailed {
                url: self.url.clone(),
                message: e.to_string(),
            })?;
        Ok(())
    }
}

impl VectorSearchBackend for QdrantSearchBackend {
    async fn search(
        &self,
        namespace: &str,
        query: Vec<f32>,
        limit: u64,
    ) -> Result<Vec<ScoredBrand>, VectorStoreError> {
        let builder = SearchPointsBuilder::new(namespace, query, limit).with_payload(true);

        let response =
            self.client
                .search_points(builder)
                .await
                .map_err(|e| VectorStoreError::SearchFailed {
                    namespace: namespace.to_string(),
                    message: e.to_string(),
                })?;

        let brands = response
            .result
            .into_iter()
            .filter_map(|point| {
                let id = match point.id.and_then(|pid| pid.point_id_options) {
                    Some(PointIdOptions::Num(n)) => n,
                    _ => return None,
                };
                let name = point
                    .payload
                    .get("name")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())?;
                Some(ScoredBrand {
                    id,
                    name,
                    score: point.score,
                })
            })
            .collect();

        Ok(brands)
    }
}

/// Tier-0 validator: front cache, then global namespace, then category
/// namespace, each gated by its similarity threshold.
pub struct BrandCacheValidator<B, E> {
    backend: B,
    embedder: Arc<E>,
    front: Cache<[u8; 32], CacheMatch>,
}

impl<B, E> std::fmt::Debug for BrandCacheValidator<B, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrandCacheValidator")
            .field("front_entries", &self.front.entry_count())
            .finish_non_exhaustive()
    }
}

impl<B: VectorSearchBackend, E: Embedder> BrandCacheValidator<B, E> {
    pub fn new(backend: B, embedder: Arc<E>) -> Self {
        Self::with_front_capacity(backend, embedder, DEFAULT_FRONT_CACHE_CAPACITY)
    }

    pub fn with_front_capacity(backend: B, embedder: Arc<E>, capacity: u64) -> Self {
        Self {
            backend,
            embedder,
            front: Cache::builder().max_capacity(capacity).build(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Number of entries in the exact-match front cache.
    pub fn front_len(&self) -> u64 {
        self.front.entry_count()
    }

    /// Looks up the closest cached brand for `text` within `category`.
    ///
    /// Any backend or embedding failure is a cache miss, never an error: the
    /// remaining tiers are the fallback.
    #[instrument(skip(self), fields(category = category))]
    pub async fn validate(&self, text: &str, category: &str) -> Option<CacheMatch> {
        let normalized = normalize_answer(text);
        if normalized.is_empty() {
            debug!("Empty answer after normalization, cache miss");
            return None;
        }

        let front_key = hash_namespace_key(category, &normalized);
        if let Some(hit) = self.front.get(&front_key) {
            info!(brand = %hit.name, similarity = hit.similarity, "Front cache hit");
            return Some(hit);
        }

        let query = match self.embedder.embed(&normalized).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Query embedding failed, treating as cache miss");
                return None;
            }
        };

        if let Some(hit) = self
            .probe(GLOBAL_NAMESPACE, query.clone(), CACHE_GLOBAL_THRESHOLD, true)
            .await
        {
            self.front.insert(front_key, hit.clone());
            return Some(hit);
        }

        let category_namespace = category_namespace(category);
        if let Some(hit) = self
            .probe(&category_namespace, query, CACHE_CATEGORY_THRESHOLD, false)
            .await
        {
            self.front.insert(front_key, hit.clone());
            return Some(hit);
        }

        debug!("Cache miss in both namespaces");
        None
    }

    async fn probe(
        &self,
        namespace: &str,
        query: Vec<f32>,
        threshold: f32,
        is_global: bool,
    ) -> Option<CacheMatch> {
        let results = match self.backend.search(namespace, query, 1).await {
            Ok(r) => r,
            Err(e) => {
                warn!(namespace = namespace, error = %e, "Vector search failed, treating as miss");
                return None;
            }
        };

        let top = results.into_iter().next()?;
        if top.score < threshold {
            debug!(
                namespace = namespace,
                best = top.score,
                threshold = threshold,
                "Best candidate below namespace threshold"
            );
            return None;
        }

        info!(
            namespace = namespace,
            brand = %top.name,
            similarity = top.score,
            "Cache hit above threshold"
        );

        Some(CacheMatch {
            id: top.id,
            name: top.name,
            similarity: top.score,
            namespace: namespace.to_string(),
            is_global,
        })
    }
}

/// Collection name for a category namespace (`brands_cat_{slug}`).
pub fn category_namespace(category: &str) -> String {
    let slug: String = normalize_answer(category)
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    format!("{CATEGORY_NAMESPACE_PREFIX}{slug}")
}

#[cfg(any(test, feature = "mock"))]
pub struct MockVectorSearchBackend {
    namespaces:
        parking_lot::RwLock<std::collections::HashMap<String, Vec<(u64, String, Vec<f32>)>>>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "mock"))]
impl MockVectorSearchBackend {
    pub fn new() -> Self {
        Self {
            namespaces: parking_lot::RwLock::new(std::collections::HashMap::new()),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Indexes a brand vector under a namespace.
    pub fn insert(&self, namespace: &str, id: u64, name: &str, vector: Vec<f32>) {
        self.namespaces
            .write()
            .entry(namespace.to_string())
            .or_default()
            .push((id, name.to_string(), vector));
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "mock"))]
impl Default for MockVectorSearchBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "mock"))]
impl VectorSearchBackend for MockVectorSearchBackend {
    async fn search(
        &self,
        namespace: &str,
        query: Vec<f32>,
        limit: u64,
    ) -> Result<Vec<ScoredBrand>, VectorStoreError> {
        use super::embedding::cosine_similarity;

        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        let namespaces = self.namespaces.read();
        let Some(points) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };

        let mut results: Vec<ScoredBrand> = points
            .iter()
            .map(|(id, name, vector)| ScoredBrand {
                id: *id,
                name: name.clone(),
                score: cosine_similarity(&query, vector),
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(limit as usize);
        Ok(results)
    }
}

//! Embedding service seam and the Tier-4 similarity validator.
//!
//! The embedder is shared between Tier 0 (query embedding for the vector
//! cache) and Tier 4 (candidate similarity). Tier 4 runs only after the vision
//! tier resolves, because it needs the vision-derived candidate list.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::error::EmbeddingError;
use crate::normalize::is_same_answer;

/// Text embedding service.
pub trait Embedder: Send + Sync {
    /// Embeds one text into a dense vector.
    fn embed(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<Vec<f32>, EmbeddingError>> + Send;
}

/// Cosine similarity between two vectors; 0.0 for mismatched or empty inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

/// Remote embedding service speaking the common `/embeddings` JSON shape.
pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    /// Creates a client for `endpoint`. A missing API key leaves the embedder
    /// permanently degraded: it never attempts calls.
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmbeddingError::RequestFailed(e.to_string()))?;

        if api_key.is_none() {
            warn!("embedding API key not configured; embedder will return errors");
        }

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key,
        })
    }
}

impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let api_key = self.api_key.as_ref().ok_or(EmbeddingError::NotConfigured)?;

        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbeddingError::RequestFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| EmbeddingError::RequestFailed(e.to_string()))?;

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::DecodeFailed(e.to_string()))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::DecodeFailed("empty data array".to_string()))
    }
}

/// Tier 4: cosine similarity of each candidate name to the anchor text.
pub struct EmbeddingSimilarityValidator<E> {
    embedder: Arc<E>,
}

impl<E: Embedder> EmbeddingSimilarityValidator<E> {
    pub fn new(embedder: Arc<E>) -> Self {
        Self { embedder }
    }

    /// Computes per-candidate similarity to `anchor`.
    ///
    /// Returns an empty map (never an error) when the candidate list is empty,
    /// when every candidate is just the anchor spelled the same way, or when
    /// the anchor embedding fails.
    #[instrument(skip(self, candidates), fields(anchor = anchor, candidates = candidates.len()))]
    pub async fn validate(&self, anchor: &str, candidates: &[String]) -> HashMap<String, f32> {
        if candidates.is_empty() {
            debug!("No candidates for embedding comparison, skipping tier");
            return HashMap::new();
        }

        if candidates.iter().all(|c| is_same_answer(c, anchor)) {
            debug!("All candidates equal the anchor, skipping tier");
            return HashMap::new();
        }

        let anchor_vec = match self.embedder.embed(anchor).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Anchor embedding failed, returning empty similarities");
                return HashMap::new();
            }
        };

        let futures: Vec<_> = candidates
            .iter()
            .map(|candidate| {
                let candidate = candidate.clone();
                async move {
                    let result = self.embedder.embed(&candidate).await;
                    (candidate, result)
                }
            })
            .collect();

        let mut similarities = HashMap::with_capacity(candidates.len());
        for (candidate, result) in join_all(futures).await {
            match result {
                Ok(vec) => {
                    similarities.insert(candidate, cosine_similarity(&anchor_vec, &vec));
                }
                Err(e) => {
                    warn!(candidate = %candidate, error = %e, "Candidate embedding failed, skipping");
                }
            }
        }

        debug!(computed = similarities.len(), "Embedding similarities ready");
        similarities
    }
}

#[cfg(any(test, feature = "mock"))]
pub struct MockEmbedder {
    vectors: parking_lot::RwLock<HashMap<String, Vec<f32>>>,
    calls: std::sync::atomic::AtomicUsize,
    fail: std::sync::atomic::AtomicBool,
}

#[cfg(any(test, feature = "mock"))]
impl MockEmbedder {
    pub fn new() -> Self {
        Self {
            vectors: parking_lot::RwLock::new(HashMap::new()),
            calls: std::sync::atomic::AtomicUsize::new(0),
            fail: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Registers a fixed vector for a text.
    pub fn insert(&self, text: &str, vector: Vec<f32>) {
        self.vectors.write().insert(text.to_string(), vector);
    }

    /// Makes every subsequent call fail, for degraded-path tests.
    pub fn fail_all(&self) {
        self.fail.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Deterministic fallback vector for unregistered texts.
    fn derived_vector(text: &str) -> Vec<f32> {
        let seed = crate::hashing::hash_to_u64(text.as_bytes());
        (0..8)
            .map(|i| {
                let mixed = seed.wrapping_mul(31).wrapping_add(i) % 1000;
                mixed as f32 / 1000.0
            })
            .collect()
    }
}

#[cfg(any(test, feature = "mock"))]
impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "mock"))]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(EmbeddingError::RequestFailed("mock failure".to_string()));
        }
        Ok(self
            .vectors
            .read()
            .get(text)
            .cloned()
            .unwrap_or_else(|| Self::derived_vector(text)))
    }
}

//! Validation orchestrator: five strictly ordered phases.
//!
//! 1. cache check — a Tier-0 hit terminates the request immediately;
//! 2. dual image search;
//! 3. concurrent fan-out of web-text, vision, and a speculative
//!    knowledge-graph lookup on the user text;
//! 4. post-vision sequential step — candidate merging, the confirming
//!    knowledge-graph lookup on the dominant candidate, then embeddings over
//!    the vision candidate list;
//! 5. pattern routing, with cumulative cost/latency attached to the result.
//!
//! Every tier failure degrades to neutral evidence inside the owning
//! validator; the orchestrator itself can only fail on the pattern router's
//! exhaustion invariant.

pub mod error;
pub mod metrics;

pub use error::{BuildError, ValidationError};
pub use metrics::{MetricsRecorder, PhaseMetrics};

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::constants::{
    COST_CACHE_LOOKUP, COST_EMBEDDING, COST_IMAGE_SEARCH, COST_KG_LOOKUP, COST_VISION_ANALYSIS,
    COST_WEB_TEXT_ANALYSIS, VISION_URLS_PER_BATCH,
};
use crate::evidence::{CacheMatch, EvidenceBundle};
use crate::merge::CandidateMerger;
use crate::normalize::is_same_answer;
use crate::patterns::PatternRouter;
use crate::tiers::{
    BrandCacheValidator, DualImageSearch, Embedder, EmbeddingSimilarityValidator, GenaiTextModel,
    GenaiVisionModel, GoogleImageSearch, GoogleKnowledgeGraph, HttpEmbedder, ImageSearchClient,
    KnowledgeGraphClient, KnowledgeGraphValidator, ProductTypeMatcher, QdrantSearchBackend,
    TextAnalysisModel, VectorSearchBackend, VisionModel, VisionValidator, WebTextValidator,
};
use crate::verdict::{
    SignalStrength, UiAction, ValidationResult, ValidationSources, VerdictType, clamp_confidence,
};

/// The orchestrator wired to the real service clients.
pub type DefaultBrandValidator = BrandValidator<
    QdrantSearchBackend,
    HttpEmbedder,
    GoogleImageSearch,
    GenaiTextModel,
    GenaiVisionModel,
    GoogleKnowledgeGraph,
>;

impl DefaultBrandValidator {
    /// Builds the engine from configuration, constructing every real client.
    ///
    /// Clients with missing API keys come up degraded rather than failing the
    /// build; their tiers contribute neutral evidence.
    pub async fn from_config(config: &Config) -> Result<Self, BuildError> {
        let timeout = config.tier_timeout();

        let backend = QdrantSearchBackend::new(&config.qdrant_url).await?;
        let embedder = Arc::new(HttpEmbedder::new(
            config.embedding_endpoint.clone(),
            config.embedding_model.clone(),
            config.embedding_api_key.clone(),
            timeout,
        )?);
        let cache = BrandCacheValidator::with_front_capacity(
            backend,
            embedder.clone(),
            config.front_cache_capacity,
        );

        let image_search = DualImageSearch::new(GoogleImageSearch::new(
            config.search_api_key.clone(),
            config.search_engine_id.clone(),
            timeout,
        )?);

        let web_text = WebTextValidator::new(
            GenaiTextModel::new(config.text_model.clone(), timeout),
            ProductTypeMatcher::new(),
        );
        let vision = VisionValidator::new(
            GenaiVisionModel::new(config.vision_model.clone(), timeout),
            ProductTypeMatcher::new(),
        );
        let knowledge_graph = KnowledgeGraphValidator::new(
            GoogleKnowledgeGraph::new(config.kg_api_key.clone(), timeout)?,
            ProductTypeMatcher::new(),
        );
        let embeddings = EmbeddingSimilarityValidator::new(embedder);

        Ok(Self::new(
            cache,
            image_search,
            web_text,
            vision,
            knowledge_graph,
            embeddings,
        ))
    }
}

/// The validation engine. Generic over the six external-service seams; every
/// collaborator is injected at construction (no ambient globals).
pub struct BrandValidator<B, E, I, T, V, K>
where
    B: VectorSearchBackend,
    E: Embedder,
    I: ImageSearchClient,
    T: TextAnalysisModel,
    V: VisionModel,
    K: KnowledgeGraphClient,
{
    cache: BrandCacheValidator<B, E>,
    image_search: DualImageSearch<I>,
    web_text: WebTextValidator<T>,
    vision: VisionValidator<V>,
    knowledge_graph: KnowledgeGraphValidator<K>,
    embeddings: EmbeddingSimilarityValidator<E>,
    merger: CandidateMerger,
    router: PatternRouter,
}

impl<B, E, I, T, V, K> std::fmt::Debug for BrandValidator<B, E, I, T, V, K>
where
    B: VectorSearchBackend,
    E: Embedder,
    I: ImageSearchClient,
    T: TextAnalysisModel,
    V: VisionModel,
    K: KnowledgeGraphClient,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrandValidator")
            .field("router", &self.router)
            .finish_non_exhaustive()
    }
}

impl<B, E, I, T, V, K> BrandValidator<B, E, I, T, V, K>
where
    B: VectorSearchBackend,
    E: Embedder,
    I: ImageSearchClient,
    T: TextAnalysisModel,
    V: VisionModel,
    K: KnowledgeGraphClient,
{
    pub fn new(
        cache: BrandCacheValidator<B, E>,
        image_search: DualImageSearch<I>,
        web_text: WebTextValidator<T>,
        vision: VisionValidator<V>,
        knowledge_graph: KnowledgeGraphValidator<K>,
        embeddings: EmbeddingSimilarityValidator<E>,
    ) -> Self {
        Self {
            cache,
            image_search,
            web_text,
            vision,
            knowledge_graph,
            embeddings,
            merger: CandidateMerger::new(),
            router: PatternRouter::with_default_detectors(),
        }
    }

    /// Replaces the default pattern router (tests, custom detector sets).
    pub fn with_router(mut self, router: PatternRouter) -> Self {
        self.router = router;
        self
    }

    pub fn router(&self) -> &PatternRouter {
        &self.router
    }

    pub fn cache(&self) -> &BrandCacheValidator<B, E> {
        &self.cache
    }

    pub fn image_search(&self) -> &DualImageSearch<I> {
        &self.image_search
    }

    pub fn web_text(&self) -> &WebTextValidator<T> {
        &self.web_text
    }

    pub fn vision(&self) -> &VisionValidator<V> {
        &self.vision
    }

    pub fn knowledge_graph(&self) -> &KnowledgeGraphValidator<K> {
        &self.knowledge_graph
    }

    /// Validates one survey answer against its expected category.
    ///
    /// Always returns a [`ValidationResult`] unless the pattern router's
    /// termination invariant is violated.
    #[instrument(
        skip(self),
        fields(request_id = %Uuid::new_v4(), category = category, language = language)
    )]
    pub async fn validate(
        &self,
        user_text: &str,
        category: &str,
        language: &str,
    ) -> Result<ValidationResult, ValidationError> {
        let mut metrics = MetricsRecorder::new();

        // Phase 1: cache check.
        let phase = Instant::now();
        let cache_hit = self.cache.validate(user_text, category).await;
        metrics.record("cache_lookup", COST_CACHE_LOOKUP, phase.elapsed());

        if let Some(hit) = cache_hit {
            info!(brand = %hit.name, similarity = hit.similarity, "Cache hit, short-circuiting");
            return Ok(self.cache_hit_result(hit, user_text, &metrics));
        }

        debug!("Cache miss, running full pipeline");

        // Phase 2: dual image search.
        let phase = Instant::now();
        let (batch_a, batch_b) = self
            .image_search
            .dual_search(user_text, category, language)
            .await;
        metrics.record("image_search", 2.0 * COST_IMAGE_SEARCH, phase.elapsed());

        let snippets_a = batch_a.snippets();
        let snippets_b = batch_b.snippets();
        let urls_a = batch_a.urls(VISION_URLS_PER_BATCH);
        let urls_b = batch_b.urls(VISION_URLS_PER_BATCH);

        // Phase 3: concurrent fan-out. The knowledge-graph lookup here is
        // speculative, keyed by the user text; the dominant candidate is not
        // known until vision resolves.
        let phase = Instant::now();
        let (web, mut vision, mut kg_results) = tokio::join!(
            self.web_text.validate(&snippets_a, &snippets_b, category),
            self.vision.validate(&urls_a, &urls_b, category),
            self.knowledge_graph.validate(user_text, category),
        );
        let mut fan_out_cost = COST_VISION_ANALYSIS + COST_KG_LOOKUP;
        if !snippets_a.is_empty() || !snippets_b.is_empty() {
            fan_out_cost += COST_WEB_TEXT_ANALYSIS;
        }
        metrics.record("parallel_fan_out", fan_out_cost, phase.elapsed());

        // Phase 4: merge candidates, confirm the dominant entity, embeddings.
        let phase = Instant::now();
        self.merger.merge_vision(&mut vision);
        let mut web = web;
        if let Some(web) = web.as_mut() {
            self.merger.merge_web(web);
        }

        let dominant = vision.dominant().map(|(name, _)| name);

        if let Some(dominant) = dominant.as_deref()
            && !is_same_answer(dominant, user_text)
            && !kg_results.contains_key(dominant)
        {
            debug!(dominant = dominant, "Confirming dominant candidate in the knowledge graph");
            let confirmed = self.knowledge_graph.validate(dominant, category).await;
            kg_results.extend(confirmed);
            metrics.record("kg_confirmation", COST_KG_LOOKUP, phase.elapsed());
        }

        let mut candidates: Vec<String> = vision.aggregated_frequencies().into_keys().collect();
        candidates.sort();

        let phase = Instant::now();
        let embedding_similarities = self.embeddings.validate(user_text, &candidates).await;
        let embedding_attempted = !candidates.is_empty();
        if embedding_attempted {
            metrics.record(
                "embeddings",
                COST_EMBEDDING * (candidates.len() as f64 + 1.0),
                phase.elapsed(),
            );
        } else {
            debug!("No vision candidates; embedding tier skipped");
        }

        // Phase 5: pattern routing.
        let bundle = EvidenceBundle {
            user_text: user_text.to_string(),
            category: category.to_string(),
            cache_match: None,
            vision,
            web,
            search_a_count: batch_a.total_results as usize,
            search_b_count: batch_b.total_results as usize,
            kg_results,
            embedding_similarities,
            dominant_candidate: dominant,
        };

        let mut result = self.router.detect(&bundle)?;

        let tier_reached = if embedding_attempted { 4 } else { 3 };
        result
            .sources
            .detail
            .insert("phases".to_string(), metrics.to_detail());
        result.sources.detail.insert(
            "evaluated_at_ms".to_string(),
            Value::from(chrono::Utc::now().timestamp_millis()),
        );
        let result = result.with_metrics(
            metrics.total_cost(),
            metrics.total_latency_ms(),
            tier_reached,
        );

        info!(
            verdict = %result.verdict,
            confidence = result.confidence,
            cost_usd = result.cost_usd,
            latency_ms = result.latency_ms,
            "Validation complete"
        );

        Ok(result)
    }

    fn cache_hit_result(
        &self,
        hit: CacheMatch,
        user_text: &str,
        metrics: &MetricsRecorder,
    ) -> ValidationResult {
        let verdict = if hit.is_global {
            VerdictType::GlobalCode
        } else {
            VerdictType::BrandMatch
        };
        let confidence = clamp_confidence((hit.similarity * 100.0).round() as i64);

        let reasoning = format!(
            "{user_text:?} matched cached brand {:?} in namespace {:?} with similarity {:.2}",
            hit.name, hit.namespace, hit.similarity
        );

        let mut sources = ValidationSources {
            decision_tree: vec![crate::verdict::DecisionCheck {
                name: "cache_similarity".to_string(),
                passed: true,
                detail: format!(
                    "similarity {:.2} above the {} namespace threshold",
                    hit.similarity,
                    if hit.is_global { "global" } else { "category" }
                ),
                signal: SignalStrength::Strong,
                impact: confidence as i32,
            }],
            ..Default::default()
        };
        sources
            .detail
            .insert("pattern".to_string(), Value::from("cache_hit"));
        match serde_json::to_value(&hit) {
            Ok(value) => {
                sources.detail.insert("cache_match".to_string(), value);
            }
            Err(e) => warn!(error = %e, "Failed to serialize cache match detail"),
        }
        sources
            .detail
            .insert("phases".to_string(), metrics.to_detail());
        sources.detail.insert(
            "evaluated_at_ms".to_string(),
            Value::from(chrono::Utc::now().timestamp_millis()),
        );

        ValidationResult::new(verdict, confidence, UiAction::Approve, reasoning)
            .with_sources(sources)
            .with_metrics(metrics.total_cost(), metrics.total_latency_ms(), 0)
    }
}

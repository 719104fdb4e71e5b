//! Brandcheck library crate (used by service binaries and integration tests).
//!
//! Multi-tier validation of free-text survey answers against real-world brand
//! existence. One operation is exposed to callers —
//! [`BrandValidator::validate`] — which short-circuits through a
//! vector-similarity cache, fans out to independent signal tiers, and routes
//! the aggregated evidence through ordered pattern detectors to a single
//! confidence-scored [`ValidationResult`].
//!
//! # Public API Surface
//!
//! ## Core Types (Stable)
//! - [`Config`], [`ConfigError`] - Engine configuration
//! - [`EvidenceBundle`] and the per-tier evidence types
//! - [`ValidationResult`], [`VerdictType`], [`UiAction`] - The output contract
//! - [`BrandValidator`], [`ValidationError`] - The orchestrator
//!
//! ## Tiers
//! - [`BrandCacheValidator`], [`VectorSearchBackend`] - Tier 0
//! - [`DualImageSearch`], [`ImageSearchClient`] - Tier 1
//! - [`WebTextValidator`], [`TextAnalysisModel`] - Tier 1.5
//! - [`VisionValidator`], [`VisionModel`] - Tier 2
//! - [`KnowledgeGraphValidator`], [`KnowledgeGraphClient`] - Tier 3
//! - [`EmbeddingSimilarityValidator`], [`Embedder`] - Tier 4
//!
//! ## Patterns
//! - [`PatternRouter`], [`PatternDetector`] and the five detectors
//!
//! ## Utilities
//! - [`confidence::breakdown`] - The confidence breakdown calculator
//! - [`CandidateMerger`] - Near-duplicate candidate merging
//! - Hashing and normalization helpers for cache keys
//!
//! ## Test/Mock Support
//! Mock implementations of every service trait are available behind
//! `#[cfg(any(test, feature = "mock"))]`.

pub mod confidence;
pub mod config;
pub mod constants;
pub mod evidence;
pub mod hashing;
pub mod merge;
pub mod normalize;
pub mod orchestrator;
pub mod patterns;
pub mod tiers;
pub mod verdict;

pub use config::{Config, ConfigError};
pub use evidence::{
    BatchTally, CacheMatch, EvidenceBundle, ImageFrequency, KgEntity, PatternTag, VisionEvidence,
    WebEvidence, WebFrequency,
};
pub use hashing::{hash_answer, hash_namespace_key, hash_to_u64};
pub use merge::CandidateMerger;
pub use normalize::{is_same_answer, normalize_answer};
pub use orchestrator::{
    BrandValidator, BuildError, DefaultBrandValidator, MetricsRecorder, PhaseMetrics,
    ValidationError,
};
pub use patterns::{
    CategoryErrorDetector, CategoryValidatedDetector, ClearMatchDetector, DescriptorDetector,
    PatternDetector, PatternError, PatternRouter, UnclearDetector,
};
pub use tiers::{
    BrandCacheValidator, DualImageSearch, Embedder, EmbeddingError, EmbeddingSimilarityValidator,
    GenaiTextModel, GenaiVisionModel, GoogleImageSearch, GoogleKnowledgeGraph, HttpEmbedder,
    ImageAnalysis, ImageResult, ImageSearchClient, KgError, KgRecord, KnowledgeGraphClient,
    KnowledgeGraphValidator, ModelError, ProductTypeMatcher, QdrantSearchBackend, ScoredBrand,
    SearchBatch, SearchError, SnippetAnalysis, TextAnalysisModel, TypeMatch, VectorSearchBackend,
    VectorStoreError, VisionModel, VisionValidator, WebTextValidator, category_namespace,
    cosine_similarity,
};
#[cfg(any(test, feature = "mock"))]
pub use tiers::{
    MockEmbedder, MockImageSearchClient, MockKnowledgeGraphClient, MockTextAnalysisModel,
    MockVectorSearchBackend, MockVisionModel,
};
pub use verdict::{
    CandidateScore, ConfidenceBreakdown, DecisionCheck, Issue, Severity, SignalStrength,
    TierContribution, UiAction, ValidationResult, ValidationSources, VerdictType,
};

//! Tier validators: one independent signal source per module.
//!
//! Every tier wraps one external service behind a narrow trait and exposes a
//! `validate(...)` surface that never fails — external errors are logged and
//! degrade to the tier's neutral result so the pipeline always completes.

pub mod cache;
pub mod embedding;
pub mod error;
pub mod image_search;
pub mod knowledge_graph;
mod model_json;
pub mod product_type;
pub mod vision;
pub mod web_text;

pub use cache::{
    BrandCacheValidator, QdrantSearchBackend, ScoredBrand, VectorSearchBackend, category_namespace,
};
#[cfg(any(test, feature = "mock"))]
pub use cache::MockVectorSearchBackend;
pub use embedding::{
    cosine_similarity, Embedder, EmbeddingSimilarityValidator, HttpEmbedder,
};
#[cfg(any(test, feature = "mock"))]
pub use embedding::MockEmbedder;
pub use error::{EmbeddingError, KgError, ModelError, SearchError, VectorStoreError};
pub use image_search::{
    DualImageSearch, GoogleImageSearch, ImageResult, ImageSearchClient, SearchBatch,
};
#[cfg(any(test, feature = "mock"))]
pub use image_search::MockImageSearchClient;
pub use knowledge_graph::{
    GoogleKnowledgeGraph, KgRecord, KnowledgeGraphClient, KnowledgeGraphValidator,
};
#[cfg(any(test, feature = "mock"))]
pub use knowledge_graph::MockKnowledgeGraphClient;
pub use product_type::{ProductTypeMatcher, TypeMatch};
pub use vision::{GenaiVisionModel, ImageAnalysis, VisionModel, VisionValidator};
#[cfg(any(test, feature = "mock"))]
pub use vision::MockVisionModel;
pub use web_text::{GenaiTextModel, SnippetAnalysis, TextAnalysisModel, WebTextValidator};
#[cfg(any(test, feature = "mock"))]
pub use web_text::MockTextAnalysisModel;

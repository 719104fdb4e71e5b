use thiserror::Error;

use crate::patterns::PatternError;
use crate::tiers::{EmbeddingError, KgError, SearchError, VectorStoreError};

#[derive(Debug, Error)]
/// Errors the orchestrator can return to its caller.
///
/// Degraded external services never surface here — they show up as low
/// confidence in the result. The only failure that propagates is a pattern
/// router invariant violation.
pub enum ValidationError {
    /// The pattern router exhausted its detectors (catch-all misconfigured).
    #[error("pattern detection failed: {0}")]
    Pattern(#[from] PatternError),
}

#[derive(Debug, Error)]
/// Errors while wiring the real service clients from configuration.
///
/// Missing API keys are NOT build errors — clients construct degraded and the
/// owning tier returns neutral evidence. Only structural failures (an
/// unreachable vector store URL, a malformed HTTP client) surface here.
pub enum BuildError {
    /// Vector store client construction failed.
    #[error("vector store setup failed: {0}")]
    VectorStore(#[from] VectorStoreError),

    /// Embedding client construction failed.
    #[error("embedder setup failed: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Image search client construction failed.
    #[error("image search setup failed: {0}")]
    Search(#[from] SearchError),

    /// Knowledge graph client construction failed.
    #[error("knowledge graph setup failed: {0}")]
    KnowledgeGraph(#[from] KgError),
}

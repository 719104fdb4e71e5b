use thiserror::Error;

#[derive(Debug, Error)]
/// Errors from the Tier-0 vector store backend.
pub enum VectorStoreError {
    /// Could not reach the vector store.
    #[error("vector store connection failed ({url}): {message}")]
    ConnectionFailed {
        /// Endpoint URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// Search request failed.
    #[error("vector search failed in namespace {namespace}: {message}")]
    SearchFailed {
        /// Namespace (collection) queried.
        namespace: String,
        /// Error message.
        message: String,
    },

    /// A returned point was missing required payload fields.
    #[error("malformed vector store payload: {reason}")]
    MalformedPayload {
        /// What was missing or invalid.
        reason: String,
    },
}

#[derive(Debug, Error)]
/// Errors from the image search client.
pub enum SearchError {
    /// No API credentials were configured.
    #[error("image search credentials missing")]
    MissingCredentials,

    /// HTTP request failed (network, timeout, non-2xx).
    #[error("image search request failed: {0}")]
    RequestFailed(String),

    /// Response body did not match the expected shape.
    #[error("image search response decode failed: {0}")]
    DecodeFailed(String),
}

#[derive(Debug, Error)]
/// Errors from model-backed tiers (web-text, vision).
pub enum ModelError {
    /// Provider call failed.
    #[error("model provider error: {0}")]
    Provider(String),

    /// The model reply was not the expected JSON shape.
    #[error("malformed model response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Error)]
/// Errors from the knowledge-graph client.
pub enum KgError {
    /// No API credentials were configured.
    #[error("knowledge graph credentials missing")]
    MissingCredentials,

    /// HTTP request failed.
    #[error("knowledge graph request failed: {0}")]
    RequestFailed(String),

    /// Response body did not match the expected shape.
    #[error("knowledge graph response decode failed: {0}")]
    DecodeFailed(String),
}

#[derive(Debug, Error)]
/// Errors from the embedding service.
pub enum EmbeddingError {
    /// No endpoint/credentials were configured.
    #[error("embedding service not configured")]
    NotConfigured,

    /// HTTP request failed.
    #[error("embedding request failed: {0}")]
    RequestFailed(String),

    /// Response body did not match the expected shape.
    #[error("embedding response decode failed: {0}")]
    DecodeFailed(String),
}

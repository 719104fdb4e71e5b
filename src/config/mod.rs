//! Environment-backed configuration.
//!
//! Most settings have defaults. Override with `BRANDCHECK_*` environment
//! variables. API keys have no defaults: a missing key leaves the owning tier
//! permanently degraded rather than failing construction (see the tier
//! validators).

pub mod error;

#[cfg(test)]
mod tests;

pub use error::ConfigError;

use std::env;
use std::time::Duration;

use crate::constants::{DEFAULT_FRONT_CACHE_CAPACITY, DEFAULT_TIER_TIMEOUT_SECS};

/// Engine configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `BRANDCHECK_*` overrides on top of
/// defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Qdrant endpoint URL for the Tier-0 vector cache.
    /// Default: `http://localhost:6334`.
    pub qdrant_url: String,

    /// Embedding service endpoint.
    /// Default: `https://api.openai.com/v1/embeddings`.
    pub embedding_endpoint: String,

    /// Embedding model name. Default: `text-embedding-3-small`.
    pub embedding_model: String,

    /// Embedding service API key. Missing → degraded Tiers 0 and 4.
    pub embedding_api_key: Option<String>,

    /// Image search API key. Missing → degraded Tier 1.
    pub search_api_key: Option<String>,

    /// Image search engine id (Google CSE `cx`).
    pub search_engine_id: String,

    /// Knowledge graph API key. Missing → degraded Tier 3.
    pub kg_api_key: Option<String>,

    /// Chat model used for snippet analysis. Default: `gpt-4o-mini`.
    pub text_model: String,

    /// Vision-capable model used for image analysis. Default: `gpt-4o`.
    pub vision_model: String,

    /// Per-call network timeout for tier clients, seconds. Default: `10`.
    pub tier_timeout_secs: u64,

    /// Max entries in the exact-match front cache. Default: `10_000`.
    pub front_cache_capacity: u64,
}

/// Default Qdrant URL used when `BRANDCHECK_QDRANT_URL` is not set.
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
/// Default embedding endpoint.
pub const DEFAULT_EMBEDDING_ENDPOINT: &str = "https://api.openai.com/v1/embeddings";
/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
/// Default snippet-analysis model.
pub const DEFAULT_TEXT_MODEL: &str = "gpt-4o-mini";
/// Default vision model.
pub const DEFAULT_VISION_MODEL: &str = "gpt-4o";

impl Default for Config {
    fn default() -> Self {
        Self {
            qdrant_url: DEFAULT_QDRANT_URL.to_string(),
            embedding_endpoint: DEFAULT_EMBEDDING_ENDPOINT.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_api_key: None,
            search_api_key: None,
            search_engine_id: String::new(),
            kg_api_key: None,
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            tier_timeout_secs: DEFAULT_TIER_TIMEOUT_SECS,
            front_cache_capacity: DEFAULT_FRONT_CACHE_CAPACITY,
        }
    }
}

impl Config {
    const ENV_QDRANT_URL: &'static str = "BRANDCHECK_QDRANT_URL";
    const ENV_EMBEDDING_ENDPOINT: &'static str = "BRANDCHECK_EMBEDDING_ENDPOINT";
    const ENV_EMBEDDING_MODEL: &'static str = "BRANDCHECK_EMBEDDING_MODEL";
    const ENV_EMBEDDING_API_KEY: &'static str = "BRANDCHECK_EMBEDDING_API_KEY";
    const ENV_SEARCH_API_KEY: &'static str = "BRANDCHECK_SEARCH_API_KEY";
    const ENV_SEARCH_ENGINE_ID: &'static str = "BRANDCHECK_SEARCH_ENGINE_ID";
    const ENV_KG_API_KEY: &'static str = "BRANDCHECK_KG_API_KEY";
    const ENV_TEXT_MODEL: &'static str = "BRANDCHECK_TEXT_MODEL";
    const ENV_VISION_MODEL: &'static str = "BRANDCHECK_VISION_MODEL";
    const ENV_TIER_TIMEOUT_SECS: &'static str = "BRANDCHECK_TIER_TIMEOUT_SECS";
    const ENV_FRONT_CACHE_CAPACITY: &'static str = "BRANDCHECK_FRONT_CACHE_CAPACITY";

    /// Loads configuration from environment variables (falling back to
    /// defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            qdrant_url: Self::parse_string_from_env(Self::ENV_QDRANT_URL, defaults.qdrant_url),
            embedding_endpoint: Self::parse_string_from_env(
                Self::ENV_EMBEDDING_ENDPOINT,
                defaults.embedding_endpoint,
            ),
            embedding_model: Self::parse_string_from_env(
                Self::ENV_EMBEDDING_MODEL,
                defaults.embedding_model,
            ),
            embedding_api_key: Self::parse_optional_from_env(Self::ENV_EMBEDDING_API_KEY),
            search_api_key: Self::parse_optional_from_env(Self::ENV_SEARCH_API_KEY),
            search_engine_id: Self::parse_string_from_env(
                Self::ENV_SEARCH_ENGINE_ID,
                defaults.search_engine_id,
            ),
            kg_api_key: Self::parse_optional_from_env(Self::ENV_KG_API_KEY),
            text_model: Self::parse_string_from_env(Self::ENV_TEXT_MODEL, defaults.text_model),
            vision_model: Self::parse_string_from_env(
                Self::ENV_VISION_MODEL,
                defaults.vision_model,
            ),
            tier_timeout_secs: Self::parse_u64_from_env(
                Self::ENV_TIER_TIMEOUT_SECS,
                defaults.tier_timeout_secs,
            )?,
            front_cache_capacity: Self::parse_u64_from_env(
                Self::ENV_FRONT_CACHE_CAPACITY,
                defaults.front_cache_capacity,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates basic invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tier_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout {
                value: self.tier_timeout_secs,
            });
        }
        if self.front_cache_capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                value: self.front_cache_capacity,
            });
        }
        Ok(())
    }

    /// Per-call network timeout as a [`Duration`].
    pub fn tier_timeout(&self) -> Duration {
        Duration::from_secs(self.tier_timeout_secs)
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        env::var(var_name).unwrap_or(default)
    }

    fn parse_optional_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_u64_from_env(var_name: &'static str, default: u64) -> Result<u64, ConfigError> {
        match env::var(var_name) {
            Ok(value) => value.parse().map_err(|e| ConfigError::NumberParseError {
                var: var_name,
                value,
                source: e,
            }),
            Err(_) => Ok(default),
        }
    }
}

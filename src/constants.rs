//! Cross-cutting, shared constants.
//!
//! Prefer deriving secondary constants (e.g. the confidence ceiling) from primary
//! ones to avoid drift.
//!
//! # Confidence Invariants
//!
//! The per-tier contribution caps are treated as invariants across modules
//! (confidence, patterns, orchestrator). A total confidence value is always the
//! sum of at most four capped tier contributions plus bounded pattern bonuses,
//! clamped to [`CONFIDENCE_MAX`].

/// Maximum confidence contribution from the vision tier.
pub const VISION_CONTRIBUTION_MAX: u8 = 35;
/// Maximum confidence contribution from the web-text tier.
pub const WEB_CONTRIBUTION_MAX: u8 = 30;
/// Maximum confidence contribution from the knowledge-graph tier.
pub const KG_CONTRIBUTION_MAX: u8 = 15;
/// Maximum confidence contribution from the embedding tier.
pub const EMBEDDING_CONTRIBUTION_MAX: u8 = 20;

/// Upper bound for any confidence value.
pub const CONFIDENCE_MAX: u8 = 100;

/// Qualitative signal thresholds applied to the underlying rate/similarity
/// (not the scaled score).
pub const SIGNAL_STRONG_THRESHOLD: f32 = 0.80;
pub const SIGNAL_MODERATE_THRESHOLD: f32 = 0.50;

/// Tier-0 similarity gate for the global brand namespace.
pub const CACHE_GLOBAL_THRESHOLD: f32 = 0.85;
/// Tier-0 similarity gate for category-scoped namespaces.
pub const CACHE_CATEGORY_THRESHOLD: f32 = 0.70;

/// Collection name for globally recognized brands.
pub const GLOBAL_NAMESPACE: &str = "brands_global";
/// Prefix for category-scoped collections (`brands_cat_{category}`).
pub const CATEGORY_NAMESPACE_PREFIX: &str = "brands_cat_";

/// Images requested per search batch.
pub const IMAGE_BATCH_LIMIT: usize = 6;
/// Images forwarded to the vision model per originating batch.
pub const VISION_URLS_PER_BATCH: usize = 5;
/// Snippets forwarded to the web-text model per batch.
pub const WEB_SNIPPET_LIMIT: usize = 12;

/// Dominance cutoff: a candidate above this merged frequency is a clear leader.
pub const DOMINANT_FREQUENCY_THRESHOLD: f32 = 0.50;
/// Below this top frequency, with enough distinct candidates, the distribution
/// reads as a descriptor rather than a brand.
pub const DESCRIPTOR_FREQUENCY_CEILING: f32 = 0.40;
/// Minimum distinct candidates for the descriptor pattern.
pub const DESCRIPTOR_MIN_CANDIDATES: usize = 3;

/// Generic product descriptors that match many brands' sub-lines.
/// Case-insensitive substring match against the user text.
pub const DESCRIPTOR_KEYWORDS: [&str; 10] = [
    "extra", "white", "whitening", "fresh", "pro", "advanced", "complete", "ultra", "max", "plus",
];

/// Jaro-Winkler threshold for merging near-duplicate candidate spellings.
pub const CANDIDATE_MERGE_THRESHOLD: f64 = 0.90;

/// Clear-match detector only returns when post-bonus confidence reaches this floor.
pub const CLEAR_MATCH_CONFIDENCE_FLOOR: u8 = 70;

/// Category-validated trigger: minimum filtered correct matches (vision + web).
pub const CATEGORY_VALIDATED_MIN_CORRECT: u32 = 3;
/// Category-validated trigger: minimum unfiltered mismatches (vision + web).
pub const CATEGORY_VALIDATED_MIN_MISMATCHED: u32 = 2;
/// Category-validated base confidence before bonuses.
pub const CATEGORY_VALIDATED_BASE: u8 = 88;
/// Ceiling for pattern confidences that carry bonuses.
pub const PATTERN_CONFIDENCE_CAP: u8 = 98;
/// Category-validated approval threshold.
pub const CATEGORY_VALIDATED_APPROVE_AT: u8 = 92;
/// Clear-match approval threshold.
pub const CLEAR_MATCH_APPROVE_AT: u8 = 85;

/// Category-error trigger: minimum search-A result count.
pub const CATEGORY_ERROR_MIN_SEARCH_A: usize = 10;
/// Category-error trigger: search-B results must stay below this.
pub const CATEGORY_ERROR_MAX_SEARCH_B: usize = 5;
/// Category-error trigger: minimum embedding similarity.
pub const CATEGORY_ERROR_MIN_SIMILARITY: f32 = 0.85;

/// Issue threshold: embedding similarity below this is an anomaly.
pub const ISSUE_LOW_SIMILARITY: f32 = 0.40;
/// Issue threshold: filtered web mention rate below this is an anomaly.
pub const ISSUE_LOW_WEB_MENTION_RATE: f32 = 0.50;

/// Per-call cost estimates (USD), summed into `ValidationResult::cost_usd`.
pub const COST_CACHE_LOOKUP: f64 = 0.0001;
pub const COST_IMAGE_SEARCH: f64 = 0.005;
pub const COST_WEB_TEXT_ANALYSIS: f64 = 0.002;
pub const COST_VISION_ANALYSIS: f64 = 0.010;
pub const COST_KG_LOOKUP: f64 = 0.001;
pub const COST_EMBEDDING: f64 = 0.0001;

/// Default network timeout for tier clients, in seconds.
pub const DEFAULT_TIER_TIMEOUT_SECS: u64 = 10;

/// Default capacity of the in-memory exact-match front cache.
pub const DEFAULT_FRONT_CACHE_CAPACITY: u64 = 10_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_caps_sum_to_confidence_max() {
        let total = VISION_CONTRIBUTION_MAX
            + WEB_CONTRIBUTION_MAX
            + KG_CONTRIBUTION_MAX
            + EMBEDDING_CONTRIBUTION_MAX;
        assert_eq!(total, CONFIDENCE_MAX);
    }

    #[test]
    fn thresholds_are_ordered() {
        assert!(SIGNAL_STRONG_THRESHOLD > SIGNAL_MODERATE_THRESHOLD);
        assert!(CACHE_GLOBAL_THRESHOLD > CACHE_CATEGORY_THRESHOLD);
        assert!(DOMINANT_FREQUENCY_THRESHOLD > DESCRIPTOR_FREQUENCY_CEILING);
    }
}

//! Priority 1: real brand, wrong category.
//!
//! The signature: image search finds the answer everywhere on its own but
//! almost nowhere once the category is added, the knowledge graph verifies the
//! answer itself under a *different* category, and embeddings confirm the
//! vision candidates really are the answer. Confidence is deliberately kept
//! low — the verdict asks for a category review, not an approval.

use serde_json::Value;

use super::{PatternDetector, decision_tree, issues};
use crate::confidence;
use crate::constants::{
    CATEGORY_ERROR_MAX_SEARCH_B, CATEGORY_ERROR_MIN_SEARCH_A, CATEGORY_ERROR_MIN_SIMILARITY,
    EMBEDDING_CONTRIBUTION_MAX,
};
use crate::evidence::EvidenceBundle;
use crate::verdict::{SignalStrength, UiAction, ValidationResult, VerdictType, clamp_confidence};

#[derive(Debug, Default)]
pub struct CategoryErrorDetector;

impl CategoryErrorDetector {
    pub fn new() -> Self {
        Self
    }
}

impl PatternDetector for CategoryErrorDetector {
    fn name(&self) -> &'static str {
        "category_error"
    }

    fn priority(&self) -> u8 {
        1
    }

    fn detect(&self, evidence: &EvidenceBundle) -> Option<ValidationResult> {
        if evidence.search_a_count < CATEGORY_ERROR_MIN_SEARCH_A
            || evidence.search_b_count >= CATEGORY_ERROR_MAX_SEARCH_B
        {
            return None;
        }

        let user_entity = evidence.kg_entity(&evidence.user_text)?;
        if !user_entity.verified || user_entity.matches_category {
            return None;
        }

        let max_similarity = evidence.max_embedding_similarity();
        if max_similarity <= CATEGORY_ERROR_MIN_SIMILARITY {
            return None;
        }

        // int(max_similarity * 20): truncation keeps the score below the
        // embedding cap, signalling "real entity, wrong shelf".
        let confidence =
            clamp_confidence((max_similarity * EMBEDDING_CONTRIBUTION_MAX as f32) as i64);

        let anchor = Some(evidence.user_text.as_str());
        let breakdown = confidence::breakdown(
            Some(&evidence.vision),
            evidence.web.as_ref(),
            Some(&evidence.kg_results),
            Some(&evidence.embedding_similarities),
            anchor,
        );

        let reasoning = format!(
            "{:?} is a verified {} under category {:?}, not the expected {:?}: unfiltered image \
             search returned {} results but only {} remained with the category filter",
            user_entity.name,
            user_entity.entity_type,
            user_entity.category,
            evidence.category,
            evidence.search_a_count,
            evidence.search_b_count,
        );

        let mut sources = crate::verdict::ValidationSources {
            breakdown: Some(breakdown),
            decision_tree: decision_tree::standard_checks(evidence, &breakdown, anchor)
                .check(
                    "final_score",
                    false,
                    format!(
                        "category mismatch caps confidence at {confidence} \
                         (max similarity {max_similarity:.2})"
                    ),
                    SignalStrength::Weak,
                    confidence as i32,
                )
                .build(),
            issues: issues::detect_issues(evidence, anchor),
            ..Default::default()
        };
        sources
            .detail
            .insert("pattern".to_string(), Value::from(self.name()));
        sources.detail.insert(
            "kg_category".to_string(),
            Value::from(user_entity.category.clone()),
        );
        sources.detail.insert(
            "search_a_count".to_string(),
            Value::from(evidence.search_a_count),
        );
        sources.detail.insert(
            "search_b_count".to_string(),
            Value::from(evidence.search_b_count),
        );

        Some(
            ValidationResult::new(
                VerdictType::CategoryError,
                confidence,
                UiAction::ReviewCategory,
                reasoning,
            )
            .with_sources(sources),
        )
    }
}

//! Priority 0: category-validated multi-source agreement.
//!
//! Fires when both search modes corroborate the expected category *and* the
//! unfiltered searches also show the brand under other categories. That
//! combination is the signature of a strong multi-category brand answered in
//! the right category, so it outranks every other pattern.

use serde_json::Value;

use super::{PatternDetector, decision_tree, issues, kg_entity_bonus};
use crate::confidence;
use crate::constants::{
    CATEGORY_VALIDATED_APPROVE_AT, CATEGORY_VALIDATED_BASE, CATEGORY_VALIDATED_MIN_CORRECT,
    CATEGORY_VALIDATED_MIN_MISMATCHED, PATTERN_CONFIDENCE_CAP,
};
use crate::evidence::EvidenceBundle;
use crate::verdict::{SignalStrength, UiAction, ValidationResult, VerdictType, clamp_confidence};

#[derive(Debug, Default)]
pub struct CategoryValidatedDetector;

impl CategoryValidatedDetector {
    pub fn new() -> Self {
        Self
    }
}

impl PatternDetector for CategoryValidatedDetector {
    fn name(&self) -> &'static str {
        "category_validated"
    }

    fn priority(&self) -> u8 {
        0
    }

    fn detect(&self, evidence: &EvidenceBundle) -> Option<ValidationResult> {
        let correct = evidence.multi_source_correct();
        let mismatched = evidence.multi_source_mismatched();

        if correct < CATEGORY_VALIDATED_MIN_CORRECT
            || mismatched < CATEGORY_VALIDATED_MIN_MISMATCHED
        {
            return None;
        }

        let anchor = evidence.dominant_candidate.as_deref();
        let breakdown = confidence::breakdown(
            Some(&evidence.vision),
            evidence.web.as_ref(),
            Some(&evidence.kg_results),
            Some(&evidence.embedding_similarities),
            anchor,
        );

        let kg_entity = anchor.and_then(|a| evidence.kg_entity(a));
        let kg_bonus = kg_entity_bonus(kg_entity);
        let similarity = anchor
            .map(|a| evidence.embedding_similarity(a))
            .unwrap_or(0.0);
        let embedding_bonus = (similarity * 10.0).round() as i64;

        let confidence = clamp_confidence(
            (CATEGORY_VALIDATED_BASE as i64 + kg_bonus as i64 + embedding_bonus)
                .min(PATTERN_CONFIDENCE_CAP as i64),
        );

        let ui_action = if confidence >= CATEGORY_VALIDATED_APPROVE_AT {
            UiAction::Approve
        } else {
            UiAction::ManualReview
        };

        let subject = anchor.unwrap_or(evidence.user_text.as_str());
        let reasoning = format!(
            "{subject:?} is corroborated by {correct} category-matched detections across image \
             and web search, with {mismatched} detections under other categories confirming a \
             multi-category brand in the expected category {:?}",
            evidence.category
        );

        let mut sources = crate::verdict::ValidationSources {
            breakdown: Some(breakdown),
            decision_tree: decision_tree::standard_checks(evidence, &breakdown, anchor)
                .check(
                    "final_score",
                    true,
                    format!(
                        "base {CATEGORY_VALIDATED_BASE} + KG bonus {kg_bonus} + embedding bonus \
                         {embedding_bonus} = {confidence}"
                    ),
                    SignalStrength::Strong,
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
            "multi_source_total".to_string(),
            Value::from(correct + mismatched),
        );
        sources
            .detail
            .insert("multi_source_correct".to_string(), Value::from(correct));
        sources.detail.insert(
            "multi_source_mismatched".to_string(),
            Value::from(mismatched),
        );

        Some(
            ValidationResult::new(VerdictType::ClearMatch, confidence, ui_action, reasoning)
                .with_sources(sources),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{BatchTally, KgEntity};

    fn qualifying_bundle() -> EvidenceBundle {
        let mut evidence = EvidenceBundle::new("колгейт", "toothpaste");
        evidence.vision.tally_filtered = BatchTally {
            correct: 2,
            mismatched: 0,
            total: 5,
        };
        evidence.vision.tally_unfiltered = BatchTally {
            correct: 1,
            mismatched: 2,
            total: 5,
        };
        evidence.web = Some(crate::evidence::WebEvidence {
            tally_filtered: BatchTally {
                correct: 1,
                mismatched: 0,
                total: 3,
            },
            tally_unfiltered: BatchTally {
                correct: 1,
                mismatched: 1,
                total: 3,
            },
            ..Default::default()
        });
        evidence.dominant_candidate = Some("Colgate".to_string());
        evidence
    }

    #[test]
    fn declines_below_thresholds() {
        let detector = CategoryValidatedDetector::new();

        let mut evidence = qualifying_bundle();
        evidence.vision.tally_filtered.correct = 0;
        evidence.web.as_mut().unwrap().tally_filtered.correct = 0;
        assert!(detector.detect(&evidence).is_none());

        let mut evidence = qualifying_bundle();
        evidence.vision.tally_unfiltered.mismatched = 0;
        evidence.web.as_mut().unwrap().tally_unfiltered.mismatched = 0;
        assert!(detector.detect(&evidence).is_none());
    }

    #[test]
    fn base_confidence_without_bonuses() {
        let detector = CategoryValidatedDetector::new();
        let evidence = qualifying_bundle();
        let result = detector.detect(&evidence).unwrap();

        assert_eq!(result.verdict, VerdictType::ClearMatch);
        assert_eq!(result.confidence, 88);
        assert_eq!(result.ui_action, UiAction::ManualReview);
    }

    #[test]
    fn bonuses_raise_confidence_to_cap() {
        let detector = CategoryValidatedDetector::new();
        let mut evidence = qualifying_bundle();
        evidence.kg_results.insert(
            "Colgate".to_string(),
            Some(KgEntity {
                name: "Colgate".to_string(),
                verified: true,
                entity_type: "Brand".to_string(),
                category: "toothpaste".to_string(),
                matches_category: true,
                description: String::new(),
            }),
        );
        evidence
            .embedding_similarities
            .insert("Colgate".to_string(), 0.9);

        let result = detector.detect(&evidence).unwrap();
        // 88 + 15 + 9 = 112, capped at 98.
        assert_eq!(result.confidence, 98);
        assert_eq!(result.ui_action, UiAction::Approve);
    }

    #[test]
    fn emits_multi_source_total_detail() {
        let detector = CategoryValidatedDetector::new();
        let evidence = qualifying_bundle();
        let result = detector.detect(&evidence).unwrap();

        assert_eq!(
            result.sources.detail_value("multi_source_total"),
            Some(&Value::from(6u32))
        );
        let final_check = result.sources.decision_tree.last().unwrap();
        assert_eq!(final_check.name, "final_score");
    }
}

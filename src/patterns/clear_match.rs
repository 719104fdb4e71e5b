//! Priority 3: single dominant candidate.
//!
//! One brand carries more than half of the vision detections. The weighted
//! blend of frequency, knowledge-graph score, and embedding similarity (plus
//! the KG entity-type bonus) must clear an explicit floor — a dominant but
//! otherwise unsupported candidate declines here so the catch-all can route it
//! to manual review instead of approving on frequency alone.

use serde_json::Value;

use super::{PatternDetector, decision_tree, issues, kg_entity_bonus};
use crate::confidence;
use crate::constants::{
    CLEAR_MATCH_APPROVE_AT, CLEAR_MATCH_CONFIDENCE_FLOOR, DOMINANT_FREQUENCY_THRESHOLD,
    PATTERN_CONFIDENCE_CAP,
};
use crate::evidence::EvidenceBundle;
use crate::verdict::{SignalStrength, UiAction, ValidationResult, VerdictType, clamp_confidence};

/// Weight of the dominant frequency in the blended score.
const VISION_WEIGHT: f32 = 0.50;
/// Weight of the knowledge-graph score in the blended score.
const KG_WEIGHT: f32 = 0.30;
/// Weight of embedding similarity in the blended score.
const EMBEDDING_WEIGHT: f32 = 0.20;

#[derive(Debug, Default)]
pub struct ClearMatchDetector;

impl ClearMatchDetector {
    pub fn new() -> Self {
        Self
    }
}

impl PatternDetector for ClearMatchDetector {
    fn name(&self) -> &'static str {
        "clear_match"
    }

    fn priority(&self) -> u8 {
        3
    }

    fn detect(&self, evidence: &EvidenceBundle) -> Option<ValidationResult> {
        let (dominant, frequency) = evidence.vision.dominant()?;
        if frequency <= DOMINANT_FREQUENCY_THRESHOLD {
            return None;
        }

        let kg_entity = evidence.kg_entity(&dominant);
        let kg_score = match kg_entity {
            Some(entity) if entity.verified && entity.matches_category => 1.0,
            Some(entity) if entity.verified => 0.5,
            _ => 0.0,
        };
        let similarity = evidence.embedding_similarity(&dominant);

        let blended =
            frequency * VISION_WEIGHT + kg_score * KG_WEIGHT + similarity * EMBEDDING_WEIGHT;
        let bonus = kg_entity_bonus(kg_entity);
        let confidence = clamp_confidence(
            (((blended * 100.0) as i64) + bonus as i64).min(PATTERN_CONFIDENCE_CAP as i64),
        );

        // Explicit floor: a weaker blend declines so the catch-all applies.
        if confidence < CLEAR_MATCH_CONFIDENCE_FLOOR {
            return None;
        }

        let ui_action = if confidence >= CLEAR_MATCH_APPROVE_AT {
            UiAction::Approve
        } else {
            UiAction::ManualReview
        };

        let reasoning = format!(
            "{dominant:?} dominates vision evidence with frequency {frequency:.2}, \
             knowledge-graph score {kg_score:.1} and embedding similarity {similarity:.2}",
        );

        let breakdown = confidence::breakdown(
            Some(&evidence.vision),
            evidence.web.as_ref(),
            Some(&evidence.kg_results),
            Some(&evidence.embedding_similarities),
            Some(&dominant),
        );

        let mut sources = crate::verdict::ValidationSources {
            breakdown: Some(breakdown),
            decision_tree: decision_tree::standard_checks(evidence, &breakdown, Some(&dominant))
                .check(
                    "final_score",
                    true,
                    format!(
                        "blend {blended:.2} scaled + KG bonus {bonus} = {confidence}, \
                         floor {CLEAR_MATCH_CONFIDENCE_FLOOR}"
                    ),
                    SignalStrength::Strong,
                    confidence as i32,
                )
                .build(),
            issues: issues::detect_issues(evidence, Some(&dominant)),
            ..Default::default()
        };
        sources
            .detail
            .insert("pattern".to_string(), Value::from(self.name()));
        sources
            .detail
            .insert("dominant_candidate".to_string(), Value::from(dominant));
        sources.detail.insert(
            "dominant_frequency".to_string(),
            Value::from(frequency as f64),
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
    use crate::evidence::{BatchTally, ImageFrequency, KgEntity};

    fn dominant_bundle(frequency_count: u32, total: u32) -> EvidenceBundle {
        let mut evidence = EvidenceBundle::new("колгейт", "toothpaste");
        evidence.vision.frequencies_filtered.insert(
            "Colgate".to_string(),
            ImageFrequency {
                count: frequency_count,
                frequency: frequency_count as f32 / total as f32,
            },
        );
        evidence.vision.tally_filtered = BatchTally {
            correct: frequency_count,
            mismatched: 0,
            total,
        };
        evidence.dominant_candidate = Some("Colgate".to_string());
        evidence
    }

    fn verified_brand() -> KgEntity {
        KgEntity {
            name: "Colgate".to_string(),
            verified: true,
            entity_type: "Brand".to_string(),
            category: "toothpaste".to_string(),
            matches_category: true,
            description: String::new(),
        }
    }

    #[test]
    fn fully_supported_dominant_approves() {
        let detector = ClearMatchDetector::new();
        let mut evidence = dominant_bundle(17, 20);
        evidence
            .kg_results
            .insert("Colgate".to_string(), Some(verified_brand()));
        evidence
            .embedding_similarities
            .insert("Colgate".to_string(), 0.85);

        let result = detector.detect(&evidence).unwrap();
        assert_eq!(result.verdict, VerdictType::ClearMatch);
        // blend = 0.85*0.5 + 1.0*0.3 + 0.85*0.2 = 0.895 -> 89 + 15 = 104, cap 98
        assert_eq!(result.confidence, 98);
        assert_eq!(result.ui_action, UiAction::Approve);
    }

    #[test]
    fn declines_without_a_dominant_candidate() {
        let detector = ClearMatchDetector::new();
        let evidence = dominant_bundle(10, 20);
        assert!(detector.detect(&evidence).is_none());
    }

    #[test]
    fn floor_declines_weakly_supported_dominant() {
        let detector = ClearMatchDetector::new();
        // Dominant at 0.6 with no KG and no embeddings: blend 0.30 -> 30 < 70.
        let evidence = dominant_bundle(12, 20);
        assert!(detector.detect(&evidence).is_none());
    }

    #[test]
    fn mid_confidence_routes_to_manual_review() {
        let detector = ClearMatchDetector::new();
        let mut evidence = dominant_bundle(12, 20);
        // Verified but wrong category: kg_score 0.5, bonus 15.
        let mut entity = verified_brand();
        entity.matches_category = false;
        evidence.kg_results.insert("Colgate".to_string(), Some(entity));
        evidence
            .embedding_similarities
            .insert("Colgate".to_string(), 0.8);

        let result = detector.detect(&evidence).unwrap();
        // blend = 0.6*0.5 + 0.5*0.3 + 0.8*0.2 = 0.61 -> 61 + 15 = 76
        assert_eq!(result.confidence, 76);
        assert_eq!(result.ui_action, UiAction::ManualReview);
    }

    #[test]
    fn emits_dominant_detail() {
        let detector = ClearMatchDetector::new();
        let mut evidence = dominant_bundle(17, 20);
        evidence
            .kg_results
            .insert("Colgate".to_string(), Some(verified_brand()));
        let result = detector.detect(&evidence).unwrap();
        assert_eq!(
            result.sources.detail_value("dominant_candidate"),
            Some(&Value::from("Colgate"))
        );
    }
}

//! Confidence breakdown calculator.
//!
//! Pure function of the evidence: no side effects, never fails. Missing or
//! partial tiers degrade to a zero contribution with status `none`.

use std::collections::HashMap;

use crate::constants::{
    EMBEDDING_CONTRIBUTION_MAX, KG_CONTRIBUTION_MAX, SIGNAL_MODERATE_THRESHOLD,
    SIGNAL_STRONG_THRESHOLD, VISION_CONTRIBUTION_MAX, WEB_CONTRIBUTION_MAX,
};
use crate::evidence::{KgEntity, VisionEvidence, WebEvidence};
use crate::verdict::{ConfidenceBreakdown, SignalStrength, TierContribution};

/// KG contribution when the anchor is verified and its category matches.
const KG_VERIFIED_MATCHING: u8 = KG_CONTRIBUTION_MAX;
/// KG contribution when the anchor is verified under a different category.
const KG_VERIFIED_MISMATCHED: u8 = 5;

/// Computes the four-tier breakdown for an optional anchor candidate.
///
/// Each tier's numeric contribution is scaled from the underlying rate or
/// similarity; the qualitative status is derived from that *unscaled* value.
pub fn breakdown(
    vision: Option<&VisionEvidence>,
    web: Option<&WebEvidence>,
    kg_results: Option<&HashMap<String, Option<KgEntity>>>,
    embedding_similarities: Option<&HashMap<String, f32>>,
    anchor: Option<&str>,
) -> ConfidenceBreakdown {
    let vision_tier = vision
        .map(vision_contribution)
        .unwrap_or_else(|| TierContribution::none(VISION_CONTRIBUTION_MAX));

    let web_tier = web
        .map(web_contribution)
        .unwrap_or_else(|| TierContribution::none(WEB_CONTRIBUTION_MAX));

    let kg_tier = match (kg_results, anchor) {
        (Some(results), Some(anchor)) => kg_contribution(results.get(anchor).and_then(Option::as_ref)),
        _ => TierContribution::none(KG_CONTRIBUTION_MAX),
    };

    let embedding_tier = match (embedding_similarities, anchor) {
        (Some(similarities), Some(anchor)) => {
            embedding_contribution(similarities.get(anchor).copied())
        }
        _ => TierContribution::none(EMBEDDING_CONTRIBUTION_MAX),
    };

    let total = vision_tier.score + web_tier.score + kg_tier.score + embedding_tier.score;

    ConfidenceBreakdown {
        vision: vision_tier,
        web: web_tier,
        knowledge_graph: kg_tier,
        embeddings: embedding_tier,
        total,
    }
}

fn vision_contribution(vision: &VisionEvidence) -> TierContribution {
    let tally = vision.tally_filtered;
    if tally.total == 0 {
        return TierContribution::none(VISION_CONTRIBUTION_MAX);
    }
    let rate = tally.correct_rate();
    TierContribution {
        score: scale(rate, VISION_CONTRIBUTION_MAX),
        max: VISION_CONTRIBUTION_MAX,
        status: status_for(rate),
    }
}

fn web_contribution(web: &WebEvidence) -> TierContribution {
    let tally = web.tally_filtered;
    if tally.total == 0 {
        return TierContribution::none(WEB_CONTRIBUTION_MAX);
    }
    let rate = tally.correct_rate();
    TierContribution {
        score: scale(rate, WEB_CONTRIBUTION_MAX),
        max: WEB_CONTRIBUTION_MAX,
        status: status_for(rate),
    }
}

fn kg_contribution(entity: Option<&KgEntity>) -> TierContribution {
    match entity {
        Some(entity) if entity.verified && entity.matches_category => TierContribution {
            score: KG_VERIFIED_MATCHING,
            max: KG_CONTRIBUTION_MAX,
            status: SignalStrength::Strong,
        },
        Some(entity) if entity.verified => TierContribution {
            score: KG_VERIFIED_MISMATCHED,
            max: KG_CONTRIBUTION_MAX,
            status: SignalStrength::Moderate,
        },
        Some(_) => TierContribution {
            score: 0,
            max: KG_CONTRIBUTION_MAX,
            status: SignalStrength::Weak,
        },
        None => TierContribution::none(KG_CONTRIBUTION_MAX),
    }
}

fn embedding_contribution(similarity: Option<f32>) -> TierContribution {
    match similarity {
        Some(similarity) => TierContribution {
            score: scale(similarity, EMBEDDING_CONTRIBUTION_MAX),
            max: EMBEDDING_CONTRIBUTION_MAX,
            status: status_for(similarity),
        },
        None => TierContribution::none(EMBEDDING_CONTRIBUTION_MAX),
    }
}

fn scale(rate: f32, max: u8) -> u8 {
    let clamped = rate.clamp(0.0, 1.0);
    (clamped * max as f32).round() as u8
}

fn status_for(rate: f32) -> SignalStrength {
    if rate >= SIGNAL_STRONG_THRESHOLD {
        SignalStrength::Strong
    } else if rate >= SIGNAL_MODERATE_THRESHOLD {
        SignalStrength::Moderate
    } else {
        SignalStrength::Weak
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::BatchTally;

    fn vision(correct: u32, mismatched: u32, total: u32) -> VisionEvidence {
        VisionEvidence {
            tally_filtered: BatchTally {
                correct,
                mismatched,
                total,
            },
            ..VisionEvidence::default()
        }
    }

    fn web(correct: u32, total: u32) -> WebEvidence {
        WebEvidence {
            tally_filtered: BatchTally {
                correct,
                mismatched: 0,
                total,
            },
            ..WebEvidence::default()
        }
    }

    fn kg_entity(verified: bool, matches_category: bool) -> KgEntity {
        KgEntity {
            name: "Colgate".into(),
            verified,
            entity_type: "Brand".into(),
            category: "toothpaste".into(),
            matches_category,
            description: String::new(),
        }
    }

    #[test]
    fn all_tiers_missing_yields_zero_total() {
        let b = breakdown(None, None, None, None, None);
        assert_eq!(b.total, 0);
        assert_eq!(b.vision.status, SignalStrength::None);
        assert_eq!(b.web.status, SignalStrength::None);
        assert_eq!(b.knowledge_graph.status, SignalStrength::None);
        assert_eq!(b.embeddings.status, SignalStrength::None);
    }

    #[test]
    fn vision_scales_to_35() {
        let v = vision(7, 1, 10);
        let b = breakdown(Some(&v), None, None, None, None);
        // 0.7 * 35 = 24.5 -> 25
        assert_eq!(b.vision.score, 25);
        assert_eq!(b.vision.status, SignalStrength::Moderate);
    }

    #[test]
    fn perfect_vision_hits_the_cap() {
        let v = vision(10, 0, 10);
        let b = breakdown(Some(&v), None, None, None, None);
        assert_eq!(b.vision.score, 35);
        assert_eq!(b.vision.status, SignalStrength::Strong);
    }

    #[test]
    fn web_scales_to_30() {
        let w = web(6, 12);
        let b = breakdown(None, Some(&w), None, None, None);
        assert_eq!(b.web.score, 15);
        assert_eq!(b.web.status, SignalStrength::Moderate);
    }

    #[test]
    fn kg_scores_by_verification_and_category() {
        let mut results: HashMap<String, Option<KgEntity>> = HashMap::new();
        results.insert("colgate".into(), Some(kg_entity(true, true)));
        let b = breakdown(None, None, Some(&results), None, Some("colgate"));
        assert_eq!(b.knowledge_graph.score, 15);
        assert_eq!(b.knowledge_graph.status, SignalStrength::Strong);

        results.insert("colgate".into(), Some(kg_entity(true, false)));
        let b = breakdown(None, None, Some(&results), None, Some("colgate"));
        assert_eq!(b.knowledge_graph.score, 5);

        results.insert("colgate".into(), Some(kg_entity(false, false)));
        let b = breakdown(None, None, Some(&results), None, Some("colgate"));
        assert_eq!(b.knowledge_graph.score, 0);
        assert_eq!(b.knowledge_graph.status, SignalStrength::Weak);
    }

    #[test]
    fn kg_anchor_missing_from_map_scores_none() {
        let results: HashMap<String, Option<KgEntity>> = HashMap::new();
        let b = breakdown(None, None, Some(&results), None, Some("colgate"));
        assert_eq!(b.knowledge_graph.score, 0);
        assert_eq!(b.knowledge_graph.status, SignalStrength::None);
    }

    #[test]
    fn embedding_scales_similarity_to_20() {
        let mut similarities = HashMap::new();
        similarities.insert("colgate".to_string(), 0.85f32);
        let b = breakdown(None, None, None, Some(&similarities), Some("colgate"));
        assert_eq!(b.embeddings.score, 17);
        assert_eq!(b.embeddings.status, SignalStrength::Strong);
    }

    #[test]
    fn anchor_absent_from_embeddings_scores_none() {
        let similarities = HashMap::new();
        let b = breakdown(None, None, None, Some(&similarities), Some("colgate"));
        assert_eq!(b.embeddings.score, 0);
        assert_eq!(b.embeddings.status, SignalStrength::None);
    }

    #[test]
    fn total_is_sum_of_tiers_and_bounded() {
        let v = vision(10, 0, 10);
        let w = web(12, 12);
        let mut results = HashMap::new();
        results.insert("colgate".to_string(), Some(kg_entity(true, true)));
        let mut similarities = HashMap::new();
        similarities.insert("colgate".to_string(), 1.0f32);

        let b = breakdown(
            Some(&v),
            Some(&w),
            Some(&results),
            Some(&similarities),
            Some("colgate"),
        );
        assert_eq!(b.total, 35 + 30 + 15 + 20);
        assert!(b.total <= 100);
    }

    #[test]
    fn status_uses_unscaled_rate_not_scaled_score() {
        // 0.8 * 35 = 28: a low scaled score, but the rate is strong.
        let v = vision(8, 0, 10);
        let b = breakdown(Some(&v), None, None, None, None);
        assert_eq!(b.vision.score, 28);
        assert_eq!(b.vision.status, SignalStrength::Strong);
    }
}

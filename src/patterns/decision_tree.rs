//! Decision-tree construction.
//!
//! The "tree" is an ordered audit trail, not a branching structure: the list
//! of checks a detector inspected, each with its outcome, a human-readable
//! detail, a qualitative signal, and its numeric confidence impact.

use crate::constants::{CATEGORY_VALIDATED_MIN_CORRECT, SIGNAL_MODERATE_THRESHOLD};
use crate::evidence::EvidenceBundle;
use crate::verdict::{ConfidenceBreakdown, DecisionCheck, SignalStrength};

/// Accumulates checks in inspection order.
#[derive(Debug, Default)]
pub struct DecisionTreeBuilder {
    checks: Vec<DecisionCheck>,
}

impl DecisionTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(
        mut self,
        name: &str,
        passed: bool,
        detail: impl Into<String>,
        signal: SignalStrength,
        impact: i32,
    ) -> Self {
        self.checks.push(DecisionCheck {
            name: name.to_string(),
            passed,
            detail: detail.into(),
            signal,
            impact,
        });
        self
    }

    pub fn build(self) -> Vec<DecisionCheck> {
        self.checks
    }
}

/// Builds the five standard evidence checks shared by all detectors, in the
/// fixed inspection order: vision rate, web rate, multi-source agreement,
/// KG verification, embedding similarity. The winning detector appends its
/// own `final_score` check.
pub fn standard_checks(
    evidence: &EvidenceBundle,
    breakdown: &ConfidenceBreakdown,
    anchor: Option<&str>,
) -> DecisionTreeBuilder {
    let vision_tally = evidence.vision.tally_filtered;
    let web_tally = evidence
        .web
        .as_ref()
        .map(|w| w.tally_filtered)
        .unwrap_or_default();

    let correct = evidence.multi_source_correct();
    let mismatched = evidence.multi_source_mismatched();
    let agreement = correct >= CATEGORY_VALIDATED_MIN_CORRECT;
    let agreement_signal = if agreement && vision_tally.correct > 0 && web_tally.correct > 0 {
        SignalStrength::Strong
    } else if agreement {
        SignalStrength::Moderate
    } else if correct > 0 {
        SignalStrength::Weak
    } else {
        SignalStrength::None
    };

    let kg_entity = anchor.and_then(|a| evidence.kg_entity(a));
    let kg_detail = match kg_entity {
        Some(entity) if entity.matches_category => format!(
            "{} verified as {} in the expected category",
            entity.name, entity.entity_type
        ),
        Some(entity) => format!(
            "{} verified as {} under category {:?}",
            entity.name, entity.entity_type, entity.category
        ),
        None => "anchor not verified in the knowledge graph".to_string(),
    };

    let similarity = anchor
        .map(|a| evidence.embedding_similarity(a))
        .unwrap_or(0.0);

    DecisionTreeBuilder::new()
        .check(
            "vision_rate",
            vision_tally.correct_rate() >= SIGNAL_MODERATE_THRESHOLD,
            format!(
                "{}/{} filtered images matched the expected category",
                vision_tally.correct, vision_tally.total
            ),
            breakdown.vision.status,
            breakdown.vision.score as i32,
        )
        .check(
            "web_rate",
            web_tally.correct_rate() >= SIGNAL_MODERATE_THRESHOLD,
            format!(
                "{}/{} filtered snippets matched the expected category",
                web_tally.correct, web_tally.total
            ),
            breakdown.web.status,
            breakdown.web.score as i32,
        )
        .check(
            "multi_source_agreement",
            agreement,
            format!("{correct} corroborating matches, {mismatched} cross-category detections"),
            agreement_signal,
            0,
        )
        .check(
            "kg_verification",
            kg_entity.map(|e| e.verified).unwrap_or(false),
            kg_detail,
            breakdown.knowledge_graph.status,
            breakdown.knowledge_graph.score as i32,
        )
        .check(
            "embedding_similarity",
            similarity >= SIGNAL_MODERATE_THRESHOLD,
            format!("anchor similarity {similarity:.2}"),
            breakdown.embeddings.status,
            breakdown.embeddings.score as i32,
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confidence;
    use crate::evidence::BatchTally;

    #[test]
    fn standard_checks_keep_inspection_order() {
        let mut evidence = EvidenceBundle::new("колгейт", "toothpaste");
        evidence.vision.tally_filtered = BatchTally {
            correct: 4,
            mismatched: 0,
            total: 5,
        };

        let breakdown = confidence::breakdown(
            Some(&evidence.vision),
            evidence.web.as_ref(),
            Some(&evidence.kg_results),
            Some(&evidence.embedding_similarities),
            None,
        );

        let checks = standard_checks(&evidence, &breakdown, None).build();
        let names: Vec<&str> = checks.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "vision_rate",
                "web_rate",
                "multi_source_agreement",
                "kg_verification",
                "embedding_similarity"
            ]
        );
        assert!(checks[0].passed);
        assert_eq!(checks[0].impact, breakdown.vision.score as i32);
    }

    #[test]
    fn builder_appends_custom_checks() {
        let checks = DecisionTreeBuilder::new()
            .check("final_score", true, "88 >= 70", SignalStrength::Strong, 88)
            .build();
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].name, "final_score");
        assert_eq!(checks[0].impact, 88);
    }
}

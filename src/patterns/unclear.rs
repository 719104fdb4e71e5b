//! Priority 4: the catch-all.
//!
//! Matches every bundle. Degraded evidence is not an error — it is a verdict
//! of `unclear` at zero confidence, routed to manual review. Removing this
//! detector breaks the router's termination guarantee.

use serde_json::Value;

use super::{PatternDetector, decision_tree, issues};
use crate::confidence;
use crate::evidence::EvidenceBundle;
use crate::verdict::{SignalStrength, UiAction, ValidationResult, VerdictType};

#[derive(Debug, Default)]
pub struct UnclearDetector;

impl UnclearDetector {
    pub fn new() -> Self {
        Self
    }
}

impl PatternDetector for UnclearDetector {
    fn name(&self) -> &'static str {
        "unclear"
    }

    fn priority(&self) -> u8 {
        4
    }

    fn detect(&self, evidence: &EvidenceBundle) -> Option<ValidationResult> {
        let anchor = evidence.dominant_candidate.as_deref();
        let breakdown = confidence::breakdown(
            Some(&evidence.vision),
            evidence.web.as_ref(),
            Some(&evidence.kg_results),
            Some(&evidence.embedding_similarities),
            anchor,
        );

        let reasoning = format!(
            "no validation pattern matched {:?} in category {:?}; the gathered evidence \
             (breakdown total {}) is too weak for an automated verdict",
            evidence.user_text, evidence.category, breakdown.total
        );

        let mut sources = crate::verdict::ValidationSources {
            breakdown: Some(breakdown),
            decision_tree: decision_tree::standard_checks(evidence, &breakdown, anchor)
                .check(
                    "final_score",
                    false,
                    "no pattern matched; confidence forced to 0",
                    SignalStrength::None,
                    0,
                )
                .build(),
            issues: issues::detect_issues(evidence, anchor),
            ..Default::default()
        };
        sources
            .detail
            .insert("pattern".to_string(), Value::from(self.name()));

        Some(
            ValidationResult::new(
                VerdictType::Unclear,
                0,
                UiAction::ManualReview,
                reasoning,
            )
            .with_sources(sources),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_an_empty_bundle() {
        let detector = UnclearDetector::new();
        let result = detector.detect(&EvidenceBundle::new("", "")).unwrap();
        assert_eq!(result.verdict, VerdictType::Unclear);
        assert_eq!(result.confidence, 0);
        assert_eq!(result.ui_action, UiAction::ManualReview);
    }

    #[test]
    fn matches_any_bundle() {
        let detector = UnclearDetector::new();
        let mut evidence = EvidenceBundle::new("колгейт", "toothpaste");
        evidence.dominant_candidate = Some("Colgate".to_string());
        assert!(detector.detect(&evidence).is_some());
    }
}

//! Priority 2: ambiguous product descriptor.
//!
//! "Extra", "White", "Fresh" are sub-lines shared by many brands, not brands.
//! The signature: several distinct vision candidates, none dominant, and
//! either the answer itself matches a descriptor keyword or the vision tier
//! tagged the distribution as descriptor-like. The verdict hands the ranked
//! candidates back to the respondent to choose from.

use serde_json::Value;

use super::{PatternDetector, decision_tree, issues};
use crate::confidence;
use crate::constants::{DESCRIPTOR_FREQUENCY_CEILING, DESCRIPTOR_MIN_CANDIDATES};
use crate::evidence::{EvidenceBundle, PatternTag};
use crate::verdict::{
    CandidateScore, SignalStrength, UiAction, ValidationResult, VerdictType, clamp_confidence,
};

/// Weight of vision frequency in the candidate composite.
const FREQUENCY_WEIGHT: f32 = 0.50;
/// Weight of knowledge-graph verification in the candidate composite.
const KG_WEIGHT: f32 = 0.30;
/// Weight of embedding similarity in the candidate composite.
const EMBEDDING_WEIGHT: f32 = 0.20;
/// Scale from the top composite to the verdict confidence.
const COMPOSITE_CONFIDENCE_SCALE: f32 = 50.0;

#[derive(Debug, Default)]
pub struct DescriptorDetector;

impl DescriptorDetector {
    pub fn new() -> Self {
        Self
    }
}

impl PatternDetector for DescriptorDetector {
    fn name(&self) -> &'static str {
        "ambiguous_descriptor"
    }

    fn priority(&self) -> u8 {
        2
    }

    fn detect(&self, evidence: &EvidenceBundle) -> Option<ValidationResult> {
        let frequencies = evidence.vision.aggregated_frequencies();
        if frequencies.len() < DESCRIPTOR_MIN_CANDIDATES {
            return None;
        }

        let top_frequency = frequencies
            .values()
            .map(|f| f.frequency)
            .fold(0.0f32, f32::max);
        if top_frequency >= DESCRIPTOR_FREQUENCY_CEILING {
            return None;
        }

        let keyword_match = evidence.matches_descriptor_keyword();
        let tagged = evidence.vision.pattern_tag == Some(PatternTag::Descriptor);
        if !keyword_match && !tagged {
            return None;
        }

        let mut candidates: Vec<CandidateScore> = frequencies
            .iter()
            .map(|(name, freq)| {
                let kg_score = if evidence
                    .kg_entity(name)
                    .map(|e| e.verified)
                    .unwrap_or(false)
                {
                    1.0
                } else {
                    0.5
                };
                let embedding = evidence.embedding_similarity(name);
                CandidateScore {
                    name: name.clone(),
                    composite: freq.frequency * FREQUENCY_WEIGHT
                        + kg_score * KG_WEIGHT
                        + embedding * EMBEDDING_WEIGHT,
                    frequency: freq.frequency,
                    kg_score,
                    embedding,
                }
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.composite
                .partial_cmp(&a.composite)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });

        let top_composite = candidates.first().map(|c| c.composite).unwrap_or(0.0);
        let confidence = clamp_confidence((top_composite * COMPOSITE_CONFIDENCE_SCALE).round() as i64);

        let trigger = if keyword_match {
            "matches a known descriptor keyword"
        } else {
            "was tagged as a descriptor distribution by vision analysis"
        };
        let reasoning = format!(
            "{:?} {trigger} and {} distinct brands share it with no dominant candidate \
             (top frequency {top_frequency:.2}); the respondent should pick the intended brand",
            evidence.user_text,
            candidates.len(),
        );

        let breakdown = confidence::breakdown(
            Some(&evidence.vision),
            evidence.web.as_ref(),
            Some(&evidence.kg_results),
            Some(&evidence.embedding_similarities),
            candidates.first().map(|c| c.name.as_str()),
        );

        let anchor = candidates.first().map(|c| c.name.clone());
        let mut sources = crate::verdict::ValidationSources {
            breakdown: Some(breakdown),
            decision_tree: decision_tree::standard_checks(evidence, &breakdown, anchor.as_deref())
                .check(
                    "final_score",
                    true,
                    format!(
                        "top composite {top_composite:.2} scaled to confidence {confidence}"
                    ),
                    SignalStrength::Moderate,
                    confidence as i32,
                )
                .build(),
            issues: issues::detect_issues(evidence, anchor.as_deref()),
            ..Default::default()
        };
        sources
            .detail
            .insert("pattern".to_string(), Value::from(self.name()));
        sources.detail.insert(
            "descriptor_trigger".to_string(),
            Value::from(if keyword_match { "keyword" } else { "vision_tag" }),
        );
        sources.detail.insert(
            "candidate_count".to_string(),
            Value::from(candidates.len()),
        );

        Some(
            ValidationResult::new(
                VerdictType::AmbiguousDescriptor,
                confidence,
                UiAction::AskUserChoose,
                reasoning,
            )
            .with_candidates(candidates)
            .with_sources(sources),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{BatchTally, ImageFrequency, KgEntity};

    fn descriptor_bundle() -> EvidenceBundle {
        let mut evidence = EvidenceBundle::new("extra", "chewing gum");
        let entries = [("Orbit", 3u32, 0.35f32), ("Dirol", 3, 0.33), ("Eclipse", 3, 0.32)];
        for (name, count, frequency) in entries {
            evidence.vision.frequencies_filtered.insert(
                name.to_string(),
                ImageFrequency { count, frequency },
            );
        }
        evidence.vision.tally_filtered = BatchTally {
            correct: 9,
            mismatched: 0,
            total: 9,
        };
        evidence
    }

    #[test]
    fn fires_for_keyword_descriptor_with_spread_candidates() {
        let detector = DescriptorDetector::new();
        let result = detector.detect(&descriptor_bundle()).unwrap();

        assert_eq!(result.verdict, VerdictType::AmbiguousDescriptor);
        assert_eq!(result.ui_action, UiAction::AskUserChoose);
        let candidates = result.candidates.as_ref().unwrap();
        assert_eq!(candidates.len(), 3);
    }

    #[test]
    fn candidates_are_sorted_descending_by_composite() {
        let detector = DescriptorDetector::new();
        let mut evidence = descriptor_bundle();
        evidence.kg_results.insert(
            "Dirol".to_string(),
            Some(KgEntity {
                name: "Dirol".to_string(),
                verified: true,
                entity_type: "Brand".to_string(),
                category: "chewing gum".to_string(),
                matches_category: true,
                description: String::new(),
            }),
        );

        let result = detector.detect(&evidence).unwrap();
        let candidates = result.candidates.as_ref().unwrap();
        // KG verification lifts Dirol above the slightly more frequent Orbit.
        assert_eq!(candidates[0].name, "Dirol");
        for pair in candidates.windows(2) {
            assert!(pair[0].composite >= pair[1].composite);
        }
    }

    #[test]
    fn confidence_scales_from_top_composite() {
        let detector = DescriptorDetector::new();
        let result = detector.detect(&descriptor_bundle()).unwrap();
        // Aggregated top frequency 3/9; composite = 0.333*0.5 + 0.5*0.3 = 0.317 -> 16.
        assert_eq!(result.confidence, 16);
    }

    #[test]
    fn declines_with_too_few_candidates() {
        let detector = DescriptorDetector::new();
        let mut evidence = descriptor_bundle();
        evidence.vision.frequencies_filtered.remove("Eclipse");
        assert!(detector.detect(&evidence).is_none());
    }

    #[test]
    fn declines_when_a_candidate_dominates() {
        let detector = DescriptorDetector::new();
        let mut evidence = descriptor_bundle();
        evidence.vision.frequencies_filtered.insert(
            "Orbit".to_string(),
            ImageFrequency {
                count: 5,
                frequency: 0.55,
            },
        );
        assert!(detector.detect(&evidence).is_none());
    }

    #[test]
    fn declines_without_keyword_or_tag() {
        let detector = DescriptorDetector::new();
        let mut evidence = descriptor_bundle();
        evidence.user_text = "колгейт".to_string();
        assert!(detector.detect(&evidence).is_none());

        // The vision tag alone re-enables the pattern.
        evidence.vision.pattern_tag = Some(PatternTag::Descriptor);
        assert!(detector.detect(&evidence).is_some());
    }
}

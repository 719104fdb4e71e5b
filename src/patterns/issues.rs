//! Anomaly detection over the assembled evidence.
//!
//! Issues do not change the verdict; they annotate it. Each rule inspects one
//! kind of disagreement between tiers and tags it with a severity. The list is
//! sorted by severity descending before it reaches the result.

use crate::constants::{ISSUE_LOW_SIMILARITY, ISSUE_LOW_WEB_MENTION_RATE};
use crate::evidence::EvidenceBundle;
use crate::normalize::is_same_answer;
use crate::verdict::{Issue, Severity, sort_issues};

/// Runs every anomaly rule against the bundle for the given anchor candidate.
pub fn detect_issues(evidence: &EvidenceBundle, anchor: Option<&str>) -> Vec<Issue> {
    let mut issues = Vec::new();

    if let Some(anchor) = anchor {
        check_kg_entity(evidence, anchor, &mut issues);
        check_embedding(evidence, anchor, &mut issues);
        check_web_mentions(evidence, anchor, &mut issues);
    }
    check_vision_mismatch(evidence, &mut issues);

    sort_issues(&mut issues);
    issues
}

fn check_kg_entity(evidence: &EvidenceBundle, anchor: &str, issues: &mut Vec<Issue>) {
    match evidence.kg_results.get(anchor) {
        Some(Some(entity)) => {
            if !is_same_answer(&entity.name, anchor) {
                issues.push(Issue {
                    code: "kg_entity_differs".to_string(),
                    message: format!(
                        "knowledge graph resolved {anchor:?} to a different entity {:?}",
                        entity.name
                    ),
                    severity: Severity::Medium,
                });
            }
            if entity.verified && !entity.matches_category {
                issues.push(Issue {
                    code: "kg_category_mismatch".to_string(),
                    message: format!(
                        "{:?} is verified under category {:?}, expected {:?}",
                        entity.name, entity.category, evidence.category
                    ),
                    severity: Severity::High,
                });
            }
        }
        Some(None) | None => {
            issues.push(Issue {
                code: "kg_absent".to_string(),
                message: format!("{anchor:?} is entirely absent from the knowledge graph"),
                severity: Severity::Medium,
            });
        }
    }
}

fn check_embedding(evidence: &EvidenceBundle, anchor: &str, issues: &mut Vec<Issue>) {
    if let Some(similarity) = evidence.embedding_similarities.get(anchor)
        && *similarity < ISSUE_LOW_SIMILARITY
    {
        issues.push(Issue {
            code: "low_embedding_similarity".to_string(),
            message: format!(
                "embedding similarity between {:?} and {anchor:?} is only {similarity:.2}",
                evidence.user_text
            ),
            severity: Severity::Medium,
        });
    }
}

fn check_web_mentions(evidence: &EvidenceBundle, anchor: &str, issues: &mut Vec<Issue>) {
    if let Some(web) = &evidence.web
        && web.tally_filtered.total > 0
    {
        let rate = web.mention_rate(anchor);
        if rate < ISSUE_LOW_WEB_MENTION_RATE {
            issues.push(Issue {
                code: "low_web_mention_rate".to_string(),
                message: format!(
                    "{anchor:?} appears in only {:.0}% of filtered web snippets",
                    rate * 100.0
                ),
                severity: Severity::Low,
            });
        }
    }
}

fn check_vision_mismatch(evidence: &EvidenceBundle, issues: &mut Vec<Issue>) {
    let tally = evidence.vision.tally_unfiltered;
    if tally.total > 0 && tally.mismatched > tally.correct {
        issues.push(Issue {
            code: "vision_mismatch_dominates".to_string(),
            message: format!(
                "unfiltered image search shows more cross-category detections ({}) than matches ({})",
                tally.mismatched, tally.correct
            ),
            severity: Severity::Medium,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{BatchTally, KgEntity, WebEvidence, WebFrequency};

    fn entity(name: &str, matches_category: bool) -> KgEntity {
        KgEntity {
            name: name.to_string(),
            verified: true,
            entity_type: "Brand".to_string(),
            category: "technology".to_string(),
            matches_category,
            description: String::new(),
        }
    }

    #[test]
    fn clean_evidence_has_no_issues() {
        let mut evidence = EvidenceBundle::new("колгейт", "toothpaste");
        evidence
            .kg_results
            .insert("Colgate".to_string(), Some(entity("Colgate", true)));
        evidence
            .embedding_similarities
            .insert("Colgate".to_string(), 0.9);

        let issues = detect_issues(&evidence, Some("Colgate"));
        assert!(issues.is_empty());
    }

    #[test]
    fn category_mismatch_is_high_severity() {
        let mut evidence = EvidenceBundle::new("apple", "toothpaste");
        evidence
            .kg_results
            .insert("apple".to_string(), Some(entity("Apple Inc.", false)));

        let issues = detect_issues(&evidence, Some("apple"));
        assert!(issues.iter().any(|i| i.code == "kg_category_mismatch"));
        assert_eq!(issues[0].severity, Severity::High);
    }

    #[test]
    fn resolved_name_difference_is_flagged() {
        let mut evidence = EvidenceBundle::new("колгейт", "toothpaste");
        evidence
            .kg_results
            .insert("колгейт".to_string(), Some(entity("Colgate", true)));

        let issues = detect_issues(&evidence, Some("колгейт"));
        assert!(issues.iter().any(|i| i.code == "kg_entity_differs"));
    }

    #[test]
    fn absent_kg_entry_is_flagged() {
        let evidence = EvidenceBundle::new("zzyzx", "toothpaste");
        let issues = detect_issues(&evidence, Some("zzyzx"));
        assert!(issues.iter().any(|i| i.code == "kg_absent"));
    }

    #[test]
    fn low_similarity_and_low_mentions_are_flagged() {
        let mut evidence = EvidenceBundle::new("extra", "chewing gum");
        evidence
            .kg_results
            .insert("Orbit".to_string(), Some(entity("Orbit", true)));
        evidence
            .kg_results
            .get_mut("Orbit")
            .unwrap()
            .as_mut()
            .unwrap()
            .matches_category = true;
        evidence
            .embedding_similarities
            .insert("Orbit".to_string(), 0.2);
        evidence.web = Some(WebEvidence {
            tally_filtered: BatchTally {
                correct: 4,
                mismatched: 0,
                total: 10,
            },
            ..WebEvidence::default()
        });
        evidence.web.as_mut().unwrap().frequencies_filtered.insert(
            "Orbit".to_string(),
            WebFrequency {
                count: 3,
                frequency: 0.3,
                sources: vec![],
            },
        );

        let issues = detect_issues(&evidence, Some("Orbit"));
        let codes: Vec<&str> = issues.iter().map(|i| i.code.as_str()).collect();
        assert!(codes.contains(&"low_embedding_similarity"));
        assert!(codes.contains(&"low_web_mention_rate"));
    }

    #[test]
    fn issues_are_sorted_by_severity() {
        let mut evidence = EvidenceBundle::new("apple", "toothpaste");
        evidence
            .kg_results
            .insert("apple".to_string(), Some(entity("Apple Inc.", false)));
        evidence.vision.tally_unfiltered = BatchTally {
            correct: 1,
            mismatched: 4,
            total: 6,
        };
        evidence
            .embedding_similarities
            .insert("apple".to_string(), 0.1);

        let issues = detect_issues(&evidence, Some("apple"));
        assert!(issues.len() >= 3);
        for pair in issues.windows(2) {
            assert!(pair[0].severity <= pair[1].severity);
        }
        assert_eq!(issues[0].severity, Severity::High);
    }
}

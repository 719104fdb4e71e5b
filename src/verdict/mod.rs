//! The terminal output contract: verdicts, UI actions, and the evidence trail.
//!
//! [`ValidationResult`] is the single value the engine hands back to its
//! caller. It is immutable once the pattern router returns it and serializes
//! to JSON without loss (enums as snake_case strings, floats bounded).

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::constants::CONFIDENCE_MAX;

/// Final classification of a validation call. Exactly one per result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictType {
    /// Tier-0 hit in the global brand namespace.
    GlobalCode,
    /// Tier-0 hit in a category namespace.
    BrandMatch,
    /// Real brand, wrong category.
    CategoryError,
    /// The answer is a product descriptor shared by several brands.
    AmbiguousDescriptor,
    /// One brand clearly dominates the evidence.
    ClearMatch,
    /// Evidence too weak for any other verdict.
    Unclear,
}

impl VerdictType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictType::GlobalCode => "global_code",
            VerdictType::BrandMatch => "brand_match",
            VerdictType::CategoryError => "category_error",
            VerdictType::AmbiguousDescriptor => "ambiguous_descriptor",
            VerdictType::ClearMatch => "clear_match",
            VerdictType::Unclear => "unclear",
        }
    }
}

impl std::fmt::Display for VerdictType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the survey UI should do with the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UiAction {
    Approve,
    AskUserChoose,
    ReviewCategory,
    ManualReview,
}

impl UiAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            UiAction::Approve => "approve",
            UiAction::AskUserChoose => "ask_user_choose",
            UiAction::ReviewCategory => "review_category",
            UiAction::ManualReview => "manual_review",
        }
    }
}

/// Issue severity, ordered so `High` sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    Medium,
    Low,
}

/// Qualitative label for a tier's underlying rate or similarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalStrength {
    Strong,
    Moderate,
    Weak,
    None,
}

/// One inspected check in a detector's audit trail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionCheck {
    /// Check name (e.g. `vision_rate`, `final_score`).
    pub name: String,
    pub passed: bool,
    /// Human-readable detail ("7/10 filtered images matched").
    pub detail: String,
    pub signal: SignalStrength,
    /// Signed confidence impact of this check.
    pub impact: i32,
}

/// A detected anomaly in the evidence, tagged with severity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    /// Stable machine-readable code (e.g. `kg_category_mismatch`).
    pub code: String,
    pub message: String,
    pub severity: Severity,
}

/// Per-candidate composite used by the ambiguous-descriptor verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateScore {
    pub name: String,
    /// Weighted blend of frequency, KG verification, and embedding similarity.
    pub composite: f32,
    pub frequency: f32,
    pub kg_score: f32,
    pub embedding: f32,
}

/// One tier's share of the confidence total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierContribution {
    /// Scaled score, `0..=max`.
    pub score: u8,
    /// Cap for this tier.
    pub max: u8,
    /// Qualitative status of the underlying rate/similarity.
    pub status: SignalStrength,
}

impl TierContribution {
    pub fn none(max: u8) -> Self {
        Self {
            score: 0,
            max,
            status: SignalStrength::None,
        }
    }
}

/// The four-tier confidence breakdown plus total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConfidenceBreakdown {
    pub vision: TierContribution,
    pub web: TierContribution,
    pub knowledge_graph: TierContribution,
    pub embeddings: TierContribution,
    pub total: u8,
}

/// Full per-tier breakdown, audit trail, anomalies, and pattern-specific
/// detail for one result.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationSources {
    pub breakdown: Option<ConfidenceBreakdown>,
    /// Ordered audit trail of the winning detector's checks.
    pub decision_tree: Vec<DecisionCheck>,
    /// Anomalies sorted by severity descending.
    pub issues: Vec<Issue>,
    /// Pattern-specific keys (e.g. `multi_source_total`), flattened into the
    /// serialized `sources` object.
    #[serde(flatten)]
    pub detail: Map<String, Value>,
}

impl ValidationSources {
    /// Returns the pattern-specific detail under `key`, if present.
    pub fn detail_value(&self, key: &str) -> Option<&Value> {
        self.detail.get(key)
    }
}

/// The terminal, immutable output of one validation call.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub verdict: VerdictType,
    /// Always within `0..=100`.
    pub confidence: u8,
    pub ui_action: UiAction,
    pub reasoning: String,
    /// Ranked candidates, present only for `ambiguous_descriptor`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<CandidateScore>>,
    pub sources: ValidationSources,
    pub cost_usd: f64,
    pub latency_ms: u64,
    pub tier_reached: u8,
}

impl ValidationResult {
    /// Creates a result with zeroed metrics; the orchestrator fills them in
    /// via [`ValidationResult::with_metrics`].
    pub fn new(
        verdict: VerdictType,
        confidence: u8,
        ui_action: UiAction,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            verdict,
            confidence: confidence.min(CONFIDENCE_MAX),
            ui_action,
            reasoning: reasoning.into(),
            candidates: None,
            sources: ValidationSources::default(),
            cost_usd: 0.0,
            latency_ms: 0,
            tier_reached: 0,
        }
    }

    pub fn with_candidates(mut self, candidates: Vec<CandidateScore>) -> Self {
        self.candidates = Some(candidates);
        self
    }

    pub fn with_sources(mut self, sources: ValidationSources) -> Self {
        self.sources = sources;
        self
    }

    /// Attaches cumulative cost/latency and the deepest tier that ran.
    pub fn with_metrics(mut self, cost_usd: f64, latency_ms: u64, tier_reached: u8) -> Self {
        self.cost_usd = cost_usd;
        self.latency_ms = latency_ms;
        self.tier_reached = tier_reached;
        self
    }

    pub fn is_terminal_cache_hit(&self) -> bool {
        matches!(
            self.verdict,
            VerdictType::GlobalCode | VerdictType::BrandMatch
        )
    }
}

/// Sorts issues by severity descending, preserving insertion order within a
/// severity class.
pub fn sort_issues(issues: &mut [Issue]) {
    issues.sort_by_key(|i| i.severity);
}

/// Clamps an additive confidence computation into `0..=100`.
pub fn clamp_confidence(value: i64) -> u8 {
    value.clamp(0, CONFIDENCE_MAX as i64) as u8
}

/// Builds a serializable map of per-candidate embedding similarities for
/// sources detail.
pub fn similarities_to_detail(similarities: &HashMap<String, f32>) -> Value {
    let map: Map<String, Value> = similarities
        .iter()
        .map(|(name, sim)| (name.clone(), Value::from(*sim as f64)))
        .collect();
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdicts_serialize_as_snake_case() {
        let json = serde_json::to_value(VerdictType::AmbiguousDescriptor).unwrap();
        assert_eq!(json, Value::String("ambiguous_descriptor".to_string()));
        let json = serde_json::to_value(UiAction::AskUserChoose).unwrap();
        assert_eq!(json, Value::String("ask_user_choose".to_string()));
    }

    #[test]
    fn confidence_is_clamped_at_construction() {
        let result = ValidationResult::new(
            VerdictType::ClearMatch,
            255,
            UiAction::Approve,
            "over the top",
        );
        assert_eq!(result.confidence, 100);
        assert_eq!(clamp_confidence(-5), 0);
        assert_eq!(clamp_confidence(142), 100);
        assert_eq!(clamp_confidence(88), 88);
    }

    #[test]
    fn issues_sort_high_first() {
        let mut issues = vec![
            Issue {
                code: "low".into(),
                message: String::new(),
                severity: Severity::Low,
            },
            Issue {
                code: "high".into(),
                message: String::new(),
                severity: Severity::High,
            },
            Issue {
                code: "medium".into(),
                message: String::new(),
                severity: Severity::Medium,
            },
        ];
        sort_issues(&mut issues);
        assert_eq!(issues[0].code, "high");
        assert_eq!(issues[1].code, "medium");
        assert_eq!(issues[2].code, "low");
    }

    #[test]
    fn detail_keys_flatten_into_sources_json() {
        let mut sources = ValidationSources::default();
        sources
            .detail
            .insert("multi_source_total".into(), Value::from(5));
        let result = ValidationResult::new(VerdictType::ClearMatch, 90, UiAction::Approve, "ok")
            .with_sources(sources);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["sources"]["multi_source_total"], Value::from(5));
        assert_eq!(json["verdict"], Value::from("clear_match"));
    }
}

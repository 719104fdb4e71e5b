//! Tier 1.5: web-text model over search snippets.
//!
//! The snippets from both image searches are handed to a text model that names
//! the product candidate and product type each snippet describes. Mentions are
//! tallied per candidate and the product types are scored against the expected
//! category, batch by batch.

use genai::Client;
use genai::chat::{ChatMessage, ChatRequest};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::error::ModelError;
use super::model_json::parse_model_array;
use super::product_type::{ProductTypeMatcher, TypeMatch};
use crate::constants::WEB_SNIPPET_LIMIT;
use crate::evidence::{BatchTally, WebEvidence, WebFrequency};

/// Model verdict for one search snippet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SnippetAnalysis {
    /// Brand/entity the snippet is about; empty when none is identifiable.
    #[serde(default)]
    pub candidate: String,
    /// Product type the snippet describes.
    #[serde(default)]
    pub product_type: String,
    /// Model confidence in [0, 1].
    #[serde(default)]
    pub confidence: f32,
    /// One-line justification.
    #[serde(default)]
    pub reasoning: String,
}

/// Text model that analyzes snippet batches.
///
/// Implementations return one [`SnippetAnalysis`] per input snippet, in input
/// order.
pub trait TextAnalysisModel: Send + Sync {
    fn batch_analyze(
        &self,
        snippets: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<SnippetAnalysis>, ModelError>> + Send;
}

/// genai-backed text model with a bounded per-call timeout.
pub struct GenaiTextModel {
    client: Client,
    model: String,
    timeout: std::time::Duration,
}

const SNIPPET_SYSTEM_PROMPT: &str = "You analyze web search snippets about consumer products. \
For each numbered snippet, identify the brand it is about and the product type it describes. \
Reply with only a JSON array, one object per snippet in order: \
[{\"candidate\": \"...\", \"product_type\": \"...\", \"confidence\": 0.0, \"reasoning\": \"...\"}]. \
Use an empty candidate when no brand is identifiable.";

impl GenaiTextModel {
    pub fn new(model: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self {
            client: Client::default(),
            model: model.into(),
            timeout,
        }
    }
}

impl TextAnalysisModel for GenaiTextModel {
    async fn batch_analyze(&self, snippets: &[String]) -> Result<Vec<SnippetAnalysis>, ModelError> {
        let numbered: String = snippets
            .iter()
            .enumerate()
            .map(|(i, s)| format!("{}. {}\n", i + 1, s))
            .collect();

        let request = ChatRequest::new(vec![
            ChatMessage::system(SNIPPET_SYSTEM_PROMPT),
            ChatMessage::user(numbered),
        ]);

        let response = tokio::time::timeout(
            self.timeout,
            self.client.exec_chat(&self.model, request, None),
        )
        .await
        .map_err(|_| ModelError::Provider("request timed out".to_string()))?
        .map_err(|e| ModelError::Provider(e.to_string()))?;

        let text = response
            .first_text()
            .ok_or_else(|| ModelError::MalformedResponse("empty reply".to_string()))?;

        parse_model_array(text)
    }
}

/// Tier-1.5 validator.
pub struct WebTextValidator<M> {
    model: M,
    matcher: ProductTypeMatcher,
}

impl<M: TextAnalysisModel> WebTextValidator<M> {
    pub fn new(model: M, matcher: ProductTypeMatcher) -> Self {
        Self { model, matcher }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Analyzes both snippet batches against the expected category.
    ///
    /// Returns `None` when the model fails on either batch — the caller treats
    /// the whole tier as missing. Empty input batches are not a failure; they
    /// produce zeroed evidence.
    #[instrument(skip(self, batch_a, batch_b), fields(category = category, a = batch_a.len(), b = batch_b.len()))]
    pub async fn validate(
        &self,
        batch_a: &[String],
        batch_b: &[String],
        category: &str,
    ) -> Option<WebEvidence> {
        let batch_a = &batch_a[..batch_a.len().min(WEB_SNIPPET_LIMIT)];
        let batch_b = &batch_b[..batch_b.len().min(WEB_SNIPPET_LIMIT)];

        let unfiltered = match self.analyze_batch(batch_a, category, "A").await {
            Some(result) => result,
            None => return None,
        };
        let filtered = match self.analyze_batch(batch_b, category, "B").await {
            Some(result) => result,
            None => return None,
        };

        debug!(
            unfiltered_candidates = unfiltered.0.len(),
            filtered_candidates = filtered.0.len(),
            "Web-text analysis complete"
        );

        Some(WebEvidence {
            frequencies_unfiltered: unfiltered.0,
            frequencies_filtered: filtered.0,
            tally_unfiltered: unfiltered.1,
            tally_filtered: filtered.1,
        })
    }

    async fn analyze_batch(
        &self,
        snippets: &[String],
        category: &str,
        label: &str,
    ) -> Option<(std::collections::HashMap<String, WebFrequency>, BatchTally)> {
        if snippets.is_empty() {
            return Some((std::collections::HashMap::new(), BatchTally::default()));
        }

        let analyses = match self.model.batch_analyze(snippets).await {
            Ok(a) => a,
            Err(e) => {
                warn!(batch = label, error = %e, "Web-text model failed, dropping tier");
                return None;
            }
        };

        let total = snippets.len() as u32;
        let mut tally = BatchTally {
            total,
            ..BatchTally::default()
        };
        let mut frequencies: std::collections::HashMap<String, WebFrequency> =
            std::collections::HashMap::new();

        for (i, analysis) in analyses.iter().enumerate() {
            match self.matcher.classify(&analysis.product_type, category) {
                TypeMatch::Correct => tally.correct += 1,
                TypeMatch::Mismatched => tally.mismatched += 1,
                TypeMatch::Unknown => {}
            }

            if analysis.candidate.is_empty() {
                continue;
            }

            let entry = frequencies
                .entry(analysis.candidate.clone())
                .or_insert_with(|| WebFrequency {
                    count: 0,
                    frequency: 0.0,
                    sources: Vec::new(),
                });
            entry.count += 1;
            if let Some(snippet) = snippets.get(i) {
                entry.sources.push(snippet.clone());
            }
        }

        for frequency in frequencies.values_mut() {
            frequency.frequency = frequency.count as f32 / total as f32;
        }

        Some((frequencies, tally))
    }
}

#[cfg(any(test, feature = "mock"))]
pub struct MockTextAnalysisModel {
    rules: parking_lot::RwLock<Vec<(String, SnippetAnalysis)>>,
    calls: std::sync::atomic::AtomicUsize,
    fail: std::sync::atomic::AtomicBool,
}

#[cfg(any(test, feature = "mock"))]
impl MockTextAnalysisModel {
    pub fn new() -> Self {
        Self {
            rules: parking_lot::RwLock::new(Vec::new()),
            calls: std::sync::atomic::AtomicUsize::new(0),
            fail: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Maps any snippet containing `keyword` to the given verdict.
    pub fn map(&self, keyword: &str, candidate: &str, product_type: &str, confidence: f32) {
        self.rules.write().push((
            keyword.to_string(),
            SnippetAnalysis {
                candidate: candidate.to_string(),
                product_type: product_type.to_string(),
                confidence,
                reasoning: format!("snippet mentions {keyword}"),
            },
        ));
    }

    pub fn fail_all(&self) {
        self.fail.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "mock"))]
impl Default for MockTextAnalysisModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "mock"))]
impl TextAnalysisModel for MockTextAnalysisModel {
    async fn batch_analyze(&self, snippets: &[String]) -> Result<Vec<SnippetAnalysis>, ModelError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(ModelError::Provider("mock failure".to_string()));
        }

        let rules = self.rules.read();
        Ok(snippets
            .iter()
            .map(|snippet| {
                rules
                    .iter()
                    .find(|(keyword, _)| snippet.contains(keyword.as_str()))
                    .map(|(_, analysis)| analysis.clone())
                    .unwrap_or_else(|| SnippetAnalysis {
                        candidate: String::new(),
                        product_type: String::new(),
                        confidence: 0.0,
                        reasoning: "no brand identified".to_string(),
                    })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snippets(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn tallies_mentions_and_product_types() {
        let model = MockTextAnalysisModel::new();
        model.map("Orbit", "Orbit", "chewing gum", 0.9);
        model.map("Dirol", "Dirol", "chewing gum", 0.85);

        let validator = WebTextValidator::new(model, ProductTypeMatcher::new());
        let batch_b = snippets(&["Orbit gum ad", "Orbit flavors", "Dirol fresh mint"]);
        let evidence = validator.validate(&[], &batch_b, "chewing gum").await.unwrap();

        assert_eq!(evidence.tally_filtered.correct, 3);
        assert_eq!(evidence.tally_filtered.total, 3);
        assert_eq!(evidence.frequencies_filtered["Orbit"].count, 2);
        assert!((evidence.frequencies_filtered["Orbit"].frequency - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(evidence.frequencies_filtered["Orbit"].sources.len(), 2);
    }

    #[tokio::test]
    async fn mismatched_product_types_are_tallied_not_dropped() {
        let model = MockTextAnalysisModel::new();
        model.map("Wrigley", "Wrigley", "chewing gum", 0.9);

        let validator = WebTextValidator::new(model, ProductTypeMatcher::new());
        let batch_a = snippets(&["Wrigley gum"]);
        let evidence = validator.validate(&batch_a, &[], "toothpaste").await.unwrap();

        assert_eq!(evidence.tally_unfiltered.mismatched, 1);
        assert_eq!(evidence.tally_unfiltered.correct, 0);
        // The candidate still appears in the frequency map.
        assert_eq!(evidence.frequencies_unfiltered["Wrigley"].count, 1);
    }

    #[tokio::test]
    async fn model_failure_drops_the_tier() {
        let model = MockTextAnalysisModel::new();
        model.fail_all();
        let validator = WebTextValidator::new(model, ProductTypeMatcher::new());
        let batch = snippets(&["anything"]);
        assert!(validator.validate(&batch, &[], "toothpaste").await.is_none());
    }

    #[tokio::test]
    async fn empty_batches_yield_zeroed_evidence_without_model_calls() {
        let model = MockTextAnalysisModel::new();
        let validator = WebTextValidator::new(model, ProductTypeMatcher::new());
        let evidence = validator.validate(&[], &[], "toothpaste").await.unwrap();
        assert_eq!(evidence.tally_unfiltered, BatchTally::default());
        assert_eq!(evidence.tally_filtered, BatchTally::default());
        assert_eq!(validator.model().call_count(), 0);
    }

    #[tokio::test]
    async fn batches_are_capped_at_snippet_limit() {
        let model = MockTextAnalysisModel::new();
        model.map("Orbit", "Orbit", "chewing gum", 0.9);
        let validator = WebTextValidator::new(model, ProductTypeMatcher::new());

        let batch: Vec<String> = (0..20).map(|i| format!("Orbit snippet {i}")).collect();
        let evidence = validator.validate(&batch, &[], "chewing gum").await.unwrap();
        assert_eq!(evidence.tally_unfiltered.total, WEB_SNIPPET_LIMIT as u32);
    }
}

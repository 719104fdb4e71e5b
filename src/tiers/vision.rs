//! Tier 2: vision-model analysis of search images.
//!
//! Up to ten image URLs (five per originating search batch) go to a
//! vision-capable model in one call. Results are split back by originating
//! batch, product types are classified against the expected category, and
//! per-candidate frequencies are aggregated. Mismatched product types are
//! tallied and kept: a brand repeatedly detected under the wrong product type
//! is evidence of a multi-category brand or a category error, not noise.

use std::collections::HashMap;

use genai::Client;
use genai::chat::{ChatMessage, ChatRequest};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::error::ModelError;
use super::model_json::parse_model_array;
use super::product_type::{ProductTypeMatcher, TypeMatch};
use crate::constants::{
    DESCRIPTOR_FREQUENCY_CEILING, DESCRIPTOR_MIN_CANDIDATES, VISION_URLS_PER_BATCH,
};
use crate::evidence::{BatchTally, ImageFrequency, PatternTag, VisionEvidence};

/// Model verdict for one image.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImageAnalysis {
    /// Brand shown in the image; empty when none is identifiable.
    #[serde(default)]
    pub candidate: String,
    /// Product type shown in the image.
    #[serde(default)]
    pub product_type: String,
    /// Product variant/sub-line, when visible ("Total", "Extra Fresh").
    #[serde(default)]
    pub variant: Option<String>,
    /// Model confidence in [0, 1].
    #[serde(default)]
    pub confidence: f32,
    /// `false` for logos, storefronts, and other non-product imagery.
    #[serde(default)]
    pub is_product: bool,
}

/// Vision model over image URLs.
///
/// Implementations return one [`ImageAnalysis`] per input URL, in input order.
pub trait VisionModel: Send + Sync {
    fn batch_analyze(
        &self,
        image_urls: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<ImageAnalysis>, ModelError>> + Send;
}

/// genai-backed vision model with a bounded per-call timeout.
pub struct GenaiVisionModel {
    client: Client,
    model: String,
    timeout: std::time::Duration,
}

const VISION_SYSTEM_PROMPT: &str = "You identify consumer products in images. \
For each numbered image URL, name the brand shown and the product type. \
Reply with only a JSON array, one object per image in order: \
[{\"candidate\": \"...\", \"product_type\": \"...\", \"variant\": null, \
\"confidence\": 0.0, \"is_product\": true}]. \
Use an empty candidate and is_product=false when no product is visible.";

impl GenaiVisionModel {
    pub fn new(model: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self {
            client: Client::default(),
            model: model.into(),
            timeout,
        }
    }
}

impl VisionModel for GenaiVisionModel {
    async fn batch_analyze(&self, image_urls: &[String]) -> Result<Vec<ImageAnalysis>, ModelError> {
        let numbered: String = image_urls
            .iter()
            .enumerate()
            .map(|(i, url)| format!("{}. {}\n", i + 1, url))
            .collect();

        let request = ChatRequest::new(vec![
            ChatMessage::system(VISION_SYSTEM_PROMPT),
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

/// Tier-2 validator.
pub struct VisionValidator<V> {
    model: V,
    matcher: ProductTypeMatcher,
}

impl<V: VisionModel> VisionValidator<V> {
    pub fn new(model: V, matcher: ProductTypeMatcher) -> Self {
        Self { model, matcher }
    }

    pub fn model(&self) -> &V {
        &self.model
    }

    /// Analyzes up to five URLs per batch in one model call and aggregates
    /// frequencies split by originating batch.
    ///
    /// A model failure degrades to zeroed evidence; the pipeline continues.
    #[instrument(skip(self, urls_a, urls_b), fields(category = category, a = urls_a.len(), b = urls_b.len()))]
    pub async fn validate(
        &self,
        urls_a: &[String],
        urls_b: &[String],
        category: &str,
    ) -> VisionEvidence {
        let urls_a = &urls_a[..urls_a.len().min(VISION_URLS_PER_BATCH)];
        let urls_b = &urls_b[..urls_b.len().min(VISION_URLS_PER_BATCH)];

        if urls_a.is_empty() && urls_b.is_empty() {
            debug!("No image URLs to analyze");
            return VisionEvidence::default();
        }

        let combined: Vec<String> = urls_a.iter().chain(urls_b.iter()).cloned().collect();

        let analyses = match self.model.batch_analyze(&combined).await {
            Ok(a) => a,
            Err(e) => {
                warn!(error = %e, "Vision model failed, continuing with empty aggregates");
                return VisionEvidence::default();
            }
        };

        // Results come back in input order; the boundary splits them by
        // originating search batch.
        let boundary = urls_a.len().min(analyses.len());
        let (analyses_a, analyses_b) = analyses.split_at(boundary);

        let (frequencies_unfiltered, tally_unfiltered) =
            self.aggregate_batch(analyses_a, urls_a.len(), category);
        let (frequencies_filtered, tally_filtered) =
            self.aggregate_batch(analyses_b, urls_b.len(), category);

        let mut evidence = VisionEvidence {
            frequencies_unfiltered,
            frequencies_filtered,
            tally_unfiltered,
            tally_filtered,
            pattern_tag: None,
        };
        evidence.pattern_tag = detect_pattern_tag(&evidence);

        debug!(
            candidates = evidence.distinct_candidates(),
            correct_filtered = evidence.tally_filtered.correct,
            mismatched_unfiltered = evidence.tally_unfiltered.mismatched,
            tag = ?evidence.pattern_tag,
            "Vision analysis complete"
        );

        evidence
    }

    fn aggregate_batch(
        &self,
        analyses: &[ImageAnalysis],
        batch_size: usize,
        category: &str,
    ) -> (HashMap<String, ImageFrequency>, BatchTally) {
        let total = batch_size as u32;
        let mut tally = BatchTally {
            total,
            ..BatchTally::default()
        };
        let mut counts: HashMap<String, u32> = HashMap::new();

        for analysis in analyses {
            if !analysis.is_product {
                continue;
            }

            match self.matcher.classify(&analysis.product_type, category) {
                TypeMatch::Correct => tally.correct += 1,
                TypeMatch::Mismatched => tally.mismatched += 1,
                TypeMatch::Unknown => {}
            }

            if !analysis.candidate.is_empty() {
                *counts.entry(analysis.candidate.clone()).or_default() += 1;
            }
        }

        let frequencies = counts
            .into_iter()
            .map(|(name, count)| {
                let frequency = if total == 0 {
                    0.0
                } else {
                    count as f32 / total as f32
                };
                (name, ImageFrequency { count, frequency })
            })
            .collect();

        (frequencies, tally)
    }
}

/// Tags a many-candidates, no-leader, single-product-type distribution as a
/// descriptor answer.
fn detect_pattern_tag(evidence: &VisionEvidence) -> Option<PatternTag> {
    if evidence.distinct_candidates() < DESCRIPTOR_MIN_CANDIDATES {
        return None;
    }
    let top = evidence.dominant().map(|(_, f)| f).unwrap_or(0.0);
    if top >= DESCRIPTOR_FREQUENCY_CEILING {
        return None;
    }
    let mismatched = evidence.tally_unfiltered.mismatched + evidence.tally_filtered.mismatched;
    let correct = evidence.tally_unfiltered.correct + evidence.tally_filtered.correct;
    if mismatched == 0 && correct > 0 {
        Some(PatternTag::Descriptor)
    } else {
        None
    }
}

#[cfg(any(test, feature = "mock"))]
pub struct MockVisionModel {
    rules: parking_lot::RwLock<Vec<(String, ImageAnalysis)>>,
    calls: std::sync::atomic::AtomicUsize,
    fail: std::sync::atomic::AtomicBool,
}

#[cfg(any(test, feature = "mock"))]
impl MockVisionModel {
    pub fn new() -> Self {
        Self {
            rules: parking_lot::RwLock::new(Vec::new()),
            calls: std::sync::atomic::AtomicUsize::new(0),
            fail: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Maps any URL containing `keyword` to the given analysis.
    pub fn map(&self, keyword: &str, candidate: &str, product_type: &str, confidence: f32) {
        self.rules.write().push((
            keyword.to_string(),
            ImageAnalysis {
                candidate: candidate.to_string(),
                product_type: product_type.to_string(),
                variant: None,
                confidence,
                is_product: true,
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
impl Default for MockVisionModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "mock"))]
impl VisionModel for MockVisionModel {
    async fn batch_analyze(&self, image_urls: &[String]) -> Result<Vec<ImageAnalysis>, ModelError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(ModelError::Provider("mock failure".to_string()));
        }

        let rules = self.rules.read();
        Ok(image_urls
            .iter()
            .map(|url| {
                rules
                    .iter()
                    .find(|(keyword, _)| url.contains(keyword.as_str()))
                    .map(|(_, analysis)| analysis.clone())
                    .unwrap_or(ImageAnalysis {
                        candidate: String::new(),
                        product_type: String::new(),
                        variant: None,
                        confidence: 0.0,
                        is_product: false,
                    })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(stem: &str, n: usize) -> Vec<String> {
        (0..n)
            .map(|i| format!("https://img.example/{stem}/{i}.jpg"))
            .collect()
    }

    #[tokio::test]
    async fn aggregates_frequencies_split_by_batch() {
        let model = MockVisionModel::new();
        model.map("colgate", "Colgate", "toothpaste", 0.95);

        let validator = VisionValidator::new(model, ProductTypeMatcher::new());
        let evidence = validator
            .validate(&urls("colgate", 4), &urls("colgate", 3), "toothpaste")
            .await;

        assert_eq!(evidence.frequencies_unfiltered["Colgate"].count, 4);
        assert_eq!(evidence.frequencies_filtered["Colgate"].count, 3);
        assert_eq!(evidence.tally_unfiltered.correct, 4);
        assert_eq!(evidence.tally_filtered.correct, 3);
        assert_eq!(evidence.tally_unfiltered.total, 4);
        assert_eq!(evidence.tally_filtered.total, 3);
    }

    #[tokio::test]
    async fn url_batches_are_capped_at_five() {
        let model = MockVisionModel::new();
        model.map("colgate", "Colgate", "toothpaste", 0.95);

        let validator = VisionValidator::new(model, ProductTypeMatcher::new());
        let evidence = validator
            .validate(&urls("colgate", 8), &[], "toothpaste")
            .await;

        assert_eq!(evidence.tally_unfiltered.total, VISION_URLS_PER_BATCH as u32);
        assert_eq!(
            evidence.frequencies_unfiltered["Colgate"].count,
            VISION_URLS_PER_BATCH as u32
        );
    }

    #[tokio::test]
    async fn mismatched_types_are_kept_in_frequencies() {
        let model = MockVisionModel::new();
        model.map("gum", "Orbit", "chewing gum", 0.9);

        let validator = VisionValidator::new(model, ProductTypeMatcher::new());
        let evidence = validator.validate(&urls("gum", 3), &[], "toothpaste").await;

        assert_eq!(evidence.tally_unfiltered.mismatched, 3);
        assert_eq!(evidence.frequencies_unfiltered["Orbit"].count, 3);
    }

    #[tokio::test]
    async fn non_product_images_count_toward_total_only() {
        let model = MockVisionModel::new();
        model.map("shelf/0", "Colgate", "toothpaste", 0.9);
        // URLs 1 and 2 match no rule and come back as non-product.

        let validator = VisionValidator::new(model, ProductTypeMatcher::new());
        let evidence = validator.validate(&urls("shelf", 3), &[], "toothpaste").await;

        assert_eq!(evidence.tally_unfiltered.total, 3);
        assert_eq!(evidence.tally_unfiltered.correct, 1);
        assert_eq!(evidence.frequencies_unfiltered.len(), 1);
    }

    #[tokio::test]
    async fn model_failure_yields_zeroed_evidence() {
        let model = MockVisionModel::new();
        model.fail_all();
        let validator = VisionValidator::new(model, ProductTypeMatcher::new());
        let evidence = validator.validate(&urls("x", 3), &[], "toothpaste").await;
        assert!(evidence.is_empty());
        assert!(evidence.frequencies_unfiltered.is_empty());
    }

    #[tokio::test]
    async fn descriptor_distribution_is_tagged() {
        let model = MockVisionModel::new();
        model.map("/0.jpg", "Colgate", "toothpaste", 0.9);
        model.map("/1.jpg", "Sensodyne", "toothpaste", 0.9);
        model.map("/2.jpg", "Splat", "toothpaste", 0.9);
        model.map("/3.jpg", "Lacalut", "toothpaste", 0.9);

        let validator = VisionValidator::new(model, ProductTypeMatcher::new());
        let evidence = validator
            .validate(&urls("white", 5), &urls("white2", 5), "toothpaste")
            .await;

        // Eight distinct detections over ten images, no candidate above 0.4.
        assert!(evidence.distinct_candidates() >= DESCRIPTOR_MIN_CANDIDATES);
        assert_eq!(evidence.pattern_tag, Some(PatternTag::Descriptor));
    }

    #[tokio::test]
    async fn dominant_distribution_is_not_tagged() {
        let model = MockVisionModel::new();
        model.map("colgate", "Colgate", "toothpaste", 0.95);

        let validator = VisionValidator::new(model, ProductTypeMatcher::new());
        let evidence = validator
            .validate(&urls("colgate", 5), &urls("colgate", 5), "toothpaste")
            .await;
        assert_eq!(evidence.pattern_tag, None);
    }
}

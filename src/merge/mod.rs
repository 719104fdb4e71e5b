//! Near-duplicate candidate merging.
//!
//! Vision and web models surface the same brand under several spellings
//! ("Colgate", "colgate ", "Колгейт" transliterated back as "Kolgate"). This
//! pass folds spellings whose Jaro-Winkler similarity clears a threshold into
//! one canonical candidate before the decision logic runs. It is deliberately
//! decoupled from the pattern detectors so it can be tested on its own.

use std::collections::HashMap;

use strsim::jaro_winkler;
use tracing::debug;

use crate::constants::CANDIDATE_MERGE_THRESHOLD;
use crate::evidence::{ImageFrequency, VisionEvidence, WebEvidence, WebFrequency};
use crate::normalize::normalize_answer;

/// Folds near-duplicate candidate spellings into canonical names.
#[derive(Debug, Clone)]
pub struct CandidateMerger {
    threshold: f64,
}

impl CandidateMerger {
    pub fn new() -> Self {
        Self {
            threshold: CANDIDATE_MERGE_THRESHOLD,
        }
    }

    pub fn with_threshold(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Builds a spelling → canonical-name mapping.
    ///
    /// Names are processed by descending weight (count), so the most frequent
    /// spelling of a group becomes its canonical form.
    pub fn canonicalize(&self, names_with_weights: &[(String, u32)]) -> HashMap<String, String> {
        let mut ordered: Vec<&(String, u32)> = names_with_weights.iter().collect();
        ordered.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut canonical_names: Vec<String> = Vec::new();
        let mut mapping = HashMap::with_capacity(names_with_weights.len());

        for (name, _) in ordered {
            let normalized = normalize_answer(name);
            let target = canonical_names
                .iter()
                .find(|canonical| {
                    jaro_winkler(&normalize_answer(canonical), &normalized) >= self.threshold
                })
                .cloned();

            match target {
                Some(canonical) => {
                    mapping.insert(name.clone(), canonical);
                }
                None => {
                    canonical_names.push(name.clone());
                    mapping.insert(name.clone(), name.clone());
                }
            }
        }

        mapping
    }

    /// Merges both frequency maps of a vision evidence in place, using one
    /// canonical mapping across the two batches so their keys stay aligned.
    pub fn merge_vision(&self, evidence: &mut VisionEvidence) {
        let mut weights: HashMap<String, u32> = HashMap::new();
        for (name, freq) in evidence
            .frequencies_unfiltered
            .iter()
            .chain(evidence.frequencies_filtered.iter())
        {
            *weights.entry(name.clone()).or_default() += freq.count;
        }

        let weights: Vec<(String, u32)> = weights.into_iter().collect();
        let mapping = self.canonicalize(&weights);

        let before = evidence.distinct_candidates();
        evidence.frequencies_unfiltered =
            fold_image_frequencies(std::mem::take(&mut evidence.frequencies_unfiltered), &mapping);
        evidence.frequencies_filtered =
            fold_image_frequencies(std::mem::take(&mut evidence.frequencies_filtered), &mapping);
        let after = evidence.distinct_candidates();

        if after < before {
            debug!(before = before, after = after, "Merged near-duplicate vision candidates");
        }
    }

    /// Merges both frequency maps of a web evidence in place.
    pub fn merge_web(&self, evidence: &mut WebEvidence) {
        let mut weights: HashMap<String, u32> = HashMap::new();
        for (name, freq) in evidence
            .frequencies_unfiltered
            .iter()
            .chain(evidence.frequencies_filtered.iter())
        {
            *weights.entry(name.clone()).or_default() += freq.count;
        }

        let weights: Vec<(String, u32)> = weights.into_iter().collect();
        let mapping = self.canonicalize(&weights);

        evidence.frequencies_unfiltered =
            fold_web_frequencies(std::mem::take(&mut evidence.frequencies_unfiltered), &mapping);
        evidence.frequencies_filtered =
            fold_web_frequencies(std::mem::take(&mut evidence.frequencies_filtered), &mapping);
    }
}

impl Default for CandidateMerger {
    fn default() -> Self {
        Self::new()
    }
}

fn fold_image_frequencies(
    map: HashMap<String, ImageFrequency>,
    mapping: &HashMap<String, String>,
) -> HashMap<String, ImageFrequency> {
    let mut folded: HashMap<String, ImageFrequency> = HashMap::new();
    for (name, freq) in map {
        let canonical = mapping.get(&name).cloned().unwrap_or(name);
        let entry = folded.entry(canonical).or_insert(ImageFrequency {
            count: 0,
            frequency: 0.0,
        });
        entry.count += freq.count;
        entry.frequency += freq.frequency;
    }
    folded
}

fn fold_web_frequencies(
    map: HashMap<String, WebFrequency>,
    mapping: &HashMap<String, String>,
) -> HashMap<String, WebFrequency> {
    let mut folded: HashMap<String, WebFrequency> = HashMap::new();
    for (name, freq) in map {
        let canonical = mapping.get(&name).cloned().unwrap_or(name);
        let entry = folded.entry(canonical).or_insert(WebFrequency {
            count: 0,
            frequency: 0.0,
            sources: Vec::new(),
        });
        entry.count += freq.count;
        entry.frequency += freq.frequency;
        entry.sources.extend(freq.sources);
    }
    folded
}

//! Per-tier evidence shapes and the request-scoped evidence bundle.
//!
//! Every tier contributes a closed, concretely typed slice of evidence; the
//! orchestrator assembles them into an [`EvidenceBundle`] that the pattern
//! detectors read. Missing data is represented explicitly (`Option`, zeroed
//! tallies), never by absent fields.

use std::collections::HashMap;

use serde::Serialize;

use crate::constants::DESCRIPTOR_KEYWORDS;

/// Tier-0 result: the closest cached brand above its namespace threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheMatch {
    /// Vector-store point id.
    pub id: u64,
    /// Canonical brand name stored with the point.
    pub name: String,
    /// Cosine similarity in [0, 1].
    pub similarity: f32,
    /// Namespace (collection) the match came from.
    pub namespace: String,
    /// `true` when the match came from the global brand namespace.
    pub is_global: bool,
}

/// Per-candidate aggregate from the vision tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImageFrequency {
    /// Images in which the candidate was identified.
    pub count: u32,
    /// `count / total_images` for the originating batch, in [0, 1].
    pub frequency: f32,
}

/// Per-candidate aggregate from the web-text tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebFrequency {
    /// Snippets mentioning the candidate.
    pub count: u32,
    /// `count / total_snippets` for the originating batch, in [0, 1].
    pub frequency: f32,
    /// Source snippets (or their origin titles) backing the mentions.
    pub sources: Vec<String>,
}

/// Correct/mismatched product-type tallies for one search batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchTally {
    /// Results whose detected product type matches the expected category.
    pub correct: u32,
    /// Results identified under a different product type. Retained, not
    /// discarded: a brand showing up under the wrong product type across many
    /// results is itself evidence (multi-category brand or category error).
    pub mismatched: u32,
    /// All analyzed results in the batch, including non-product images.
    pub total: u32,
}

impl BatchTally {
    /// Correct-match rate over the batch, 0.0 when the batch is empty.
    pub fn correct_rate(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f32 / self.total as f32
        }
    }
}

/// Distribution-level tag the vision tier attaches to its aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternTag {
    /// Many low-frequency candidates of one product type: the answer names a
    /// product descriptor, not a brand.
    Descriptor,
}

/// Knowledge-graph record for one entity, already checked against the
/// expected category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KgEntity {
    /// Canonical entity name the graph resolved, which may differ from the
    /// name that was looked up.
    pub name: String,
    /// Entity exists in the knowledge graph.
    pub verified: bool,
    /// Graph entity type (e.g. `Brand`, `Organization`).
    pub entity_type: String,
    /// Category the graph assigns to the entity.
    pub category: String,
    /// Graph category matches the expected survey category.
    pub matches_category: bool,
    /// Short graph description.
    pub description: String,
}

/// Tier-2 output: frequency maps and tallies, split by originating search.
///
/// `unfiltered` corresponds to search A (text alone), `filtered` to search B
/// (text + category). A vision failure yields the zeroed default.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VisionEvidence {
    pub frequencies_unfiltered: HashMap<String, ImageFrequency>,
    pub frequencies_filtered: HashMap<String, ImageFrequency>,
    pub tally_unfiltered: BatchTally,
    pub tally_filtered: BatchTally,
    pub pattern_tag: Option<PatternTag>,
}

impl VisionEvidence {
    /// Combines both batches into one frequency map (counts summed, frequency
    /// recomputed over the combined total).
    pub fn aggregated_frequencies(&self) -> HashMap<String, ImageFrequency> {
        let total = self.tally_unfiltered.total + self.tally_filtered.total;
        if total == 0 {
            return HashMap::new();
        }

        let mut counts: HashMap<String, u32> = HashMap::new();
        for (name, freq) in self
            .frequencies_unfiltered
            .iter()
            .chain(self.frequencies_filtered.iter())
        {
            *counts.entry(name.clone()).or_default() += freq.count;
        }

        counts
            .into_iter()
            .map(|(name, count)| {
                let frequency = count as f32 / total as f32;
                (name, ImageFrequency { count, frequency })
            })
            .collect()
    }

    /// The highest-frequency candidate across both batches, with its frequency.
    pub fn dominant(&self) -> Option<(String, f32)> {
        self.aggregated_frequencies()
            .into_iter()
            .max_by(|a, b| {
                a.1.frequency
                    .partial_cmp(&b.1.frequency)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(name, freq)| (name, freq.frequency))
    }

    /// Number of distinct candidates across both batches.
    pub fn distinct_candidates(&self) -> usize {
        let mut names: Vec<&String> = self
            .frequencies_unfiltered
            .keys()
            .chain(self.frequencies_filtered.keys())
            .collect();
        names.sort();
        names.dedup();
        names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tally_unfiltered.total == 0 && self.tally_filtered.total == 0
    }
}

/// Tier-1.5 output, shaped like [`VisionEvidence`] over search snippets.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WebEvidence {
    pub frequencies_unfiltered: HashMap<String, WebFrequency>,
    pub frequencies_filtered: HashMap<String, WebFrequency>,
    pub tally_unfiltered: BatchTally,
    pub tally_filtered: BatchTally,
}

impl WebEvidence {
    /// Mention rate of `name` across the filtered batch, 0.0 when absent.
    pub fn mention_rate(&self, name: &str) -> f32 {
        self.frequencies_filtered
            .get(name)
            .map(|f| f.frequency)
            .unwrap_or(0.0)
    }
}

/// Everything the pattern detectors are allowed to see for one request.
///
/// Built by the orchestrator, owned by it for the duration of the call, and
/// dropped once the pattern router returns.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EvidenceBundle {
    pub user_text: String,
    pub category: String,
    pub cache_match: Option<CacheMatch>,
    pub vision: VisionEvidence,
    /// `None` when the web-text tier failed outright (missing tier).
    pub web: Option<WebEvidence>,
    /// Raw result count of image search A (text alone).
    pub search_a_count: usize,
    /// Raw result count of image search B (text + category).
    pub search_b_count: usize,
    /// Keyed by looked-up entity name; `None` marks a lookup that found nothing.
    pub kg_results: HashMap<String, Option<KgEntity>>,
    /// Cosine similarity of each vision candidate to the user text.
    pub embedding_similarities: HashMap<String, f32>,
    /// Highest-frequency vision candidate; anchors KG and embedding reads.
    pub dominant_candidate: Option<String>,
}

impl EvidenceBundle {
    pub fn new(user_text: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            user_text: user_text.into(),
            category: category.into(),
            ..Self::default()
        }
    }

    /// Frequency of the dominant candidate, 0.0 without vision evidence.
    pub fn dominant_frequency(&self) -> f32 {
        self.vision.dominant().map(|(_, f)| f).unwrap_or(0.0)
    }

    /// Resolved KG entity for `name`, if the lookup found one.
    pub fn kg_entity(&self, name: &str) -> Option<&KgEntity> {
        self.kg_results.get(name).and_then(|e| e.as_ref())
    }

    /// KG entity for the dominant candidate.
    pub fn kg_for_dominant(&self) -> Option<&KgEntity> {
        self.dominant_candidate
            .as_deref()
            .and_then(|name| self.kg_entity(name))
    }

    /// Embedding similarity for `name`, 0.0 when absent.
    pub fn embedding_similarity(&self, name: &str) -> f32 {
        self.embedding_similarities.get(name).copied().unwrap_or(0.0)
    }

    /// Highest embedding similarity across all candidates.
    pub fn max_embedding_similarity(&self) -> f32 {
        self.embedding_similarities
            .values()
            .copied()
            .fold(0.0, f32::max)
    }

    /// Filtered-batch correct matches summed across vision and web.
    pub fn multi_source_correct(&self) -> u32 {
        let web = self
            .web
            .as_ref()
            .map(|w| w.tally_filtered.correct)
            .unwrap_or(0);
        self.vision.tally_filtered.correct + web
    }

    /// Unfiltered-batch mismatches summed across vision and web.
    pub fn multi_source_mismatched(&self) -> u32 {
        let web = self
            .web
            .as_ref()
            .map(|w| w.tally_unfiltered.mismatched)
            .unwrap_or(0);
        self.vision.tally_unfiltered.mismatched + web
    }

    /// `true` when the user text contains one of the fixed descriptor keywords.
    pub fn matches_descriptor_keyword(&self) -> bool {
        let lowered = self.user_text.to_lowercase();
        DESCRIPTOR_KEYWORDS.iter().any(|kw| lowered.contains(kw))
    }
}

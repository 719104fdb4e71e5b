//! Pattern router: ordered dispatch with a termination guarantee.

use tracing::{debug, instrument};

use super::error::PatternError;
use super::{
    CategoryErrorDetector, CategoryValidatedDetector, ClearMatchDetector, DescriptorDetector,
    PatternDetector, UnclearDetector,
};
use crate::evidence::EvidenceBundle;
use crate::verdict::ValidationResult;

/// Holds detectors sorted ascending by priority (ties broken by insertion
/// order) and returns the first match.
pub struct PatternRouter {
    detectors: Vec<Box<dyn PatternDetector>>,
}

impl std::fmt::Debug for PatternRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternRouter")
            .field("detectors", &self.detector_names())
            .finish()
    }
}

impl PatternRouter {
    /// Creates an empty router. Prefer [`PatternRouter::with_default_detectors`]
    /// unless a test needs full control over the detector set.
    pub fn new() -> Self {
        Self {
            detectors: Vec::new(),
        }
    }

    /// Creates a router with the five standard detectors in priority order.
    pub fn with_default_detectors() -> Self {
        let mut router = Self::new();
        router.register(Box::new(CategoryValidatedDetector::new()));
        router.register(Box::new(CategoryErrorDetector::new()));
        router.register(Box::new(DescriptorDetector::new()));
        router.register(Box::new(ClearMatchDetector::new()));
        router.register(Box::new(UnclearDetector::new()));
        router
    }

    /// Registers a detector, keeping the list sorted by ascending priority.
    /// Among equal priorities, earlier registrations run first.
    pub fn register(&mut self, detector: Box<dyn PatternDetector>) {
        let index = self
            .detectors
            .partition_point(|existing| existing.priority() <= detector.priority());
        self.detectors.insert(index, detector);
    }

    /// Removes a detector by name. Returns `true` when one was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.detectors.len();
        self.detectors.retain(|d| d.name() != name);
        self.detectors.len() < before
    }

    /// Registered detector names, in dispatch order.
    pub fn detector_names(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    /// Runs the detectors in order and returns the first match.
    ///
    /// Exhaustion is [`PatternError::Exhausted`] — an invariant violation that
    /// must abort the request, since the catch-all matches everything.
    #[instrument(skip(self, evidence), fields(user_text = %evidence.user_text))]
    pub fn detect(&self, evidence: &EvidenceBundle) -> Result<ValidationResult, PatternError> {
        for detector in &self.detectors {
            if let Some(result) = detector.detect(evidence) {
                debug!(
                    pattern = detector.name(),
                    verdict = %result.verdict,
                    confidence = result.confidence,
                    "Pattern matched"
                );
                return Ok(result);
            }
            debug!(pattern = detector.name(), "Pattern declined");
        }

        Err(PatternError::Exhausted {
            checked: self.detectors.len(),
        })
    }
}

impl Default for PatternRouter {
    fn default() -> Self {
        Self::with_default_detectors()
    }
}

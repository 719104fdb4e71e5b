use thiserror::Error;

#[derive(Debug, Error)]
/// Errors from the pattern router.
pub enum PatternError {
    /// Every detector declined. This is an invariant violation, not a weak
    /// result: the catch-all detector must match any bundle, so reaching this
    /// state means it was removed or misconfigured.
    #[error("pattern detection exhausted after {checked} detectors without a match")]
    Exhausted {
        /// Detectors that were tried.
        checked: usize,
    },
}

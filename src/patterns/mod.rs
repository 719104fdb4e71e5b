//! Pattern detection: ordered rules over the evidence bundle.
//!
//! Each detector is a pure predicate-plus-builder tried once, in strict
//! priority order, by the [`PatternRouter`]. The first detector that matches
//! produces the terminal [`crate::verdict::ValidationResult`]; the catch-all
//! guarantees termination.

pub mod category_error;
pub mod category_validated;
pub mod clear_match;
pub mod decision_tree;
pub mod descriptor;
pub mod error;
pub mod issues;
pub mod router;
pub mod unclear;

pub use category_error::CategoryErrorDetector;
pub use category_validated::CategoryValidatedDetector;
pub use clear_match::ClearMatchDetector;
pub use descriptor::DescriptorDetector;
pub use error::PatternError;
pub use router::PatternRouter;
pub use unclear::UnclearDetector;

use crate::evidence::{EvidenceBundle, KgEntity};
use crate::verdict::ValidationResult;

/// One ordered rule over the evidence bundle.
///
/// Detectors are pure and synchronous: for a fixed bundle they always return
/// the same result. A detector that does not match returns `None` and the
/// router moves on.
pub trait PatternDetector: Send + Sync {
    /// Stable detector name, used for registration and removal.
    fn name(&self) -> &'static str;

    /// Priority, ascending; lower runs first.
    fn priority(&self) -> u8;

    /// Inspects the evidence and either builds a terminal result or declines.
    fn detect(&self, evidence: &EvidenceBundle) -> Option<ValidationResult>;
}

/// Bonus confidence for a verified knowledge-graph entity, by entity type.
pub(crate) fn kg_entity_bonus(entity: Option<&KgEntity>) -> u8 {
    match entity {
        Some(entity) if !entity.verified => 0,
        Some(entity) if entity.entity_type == "Brand" => 15,
        Some(entity)
            if entity.entity_type == "Organization" || entity.entity_type == "Corporation" =>
        {
            10
        }
        Some(_) => 5,
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(entity_type: &str, verified: bool) -> KgEntity {
        KgEntity {
            name: "x".into(),
            verified,
            entity_type: entity_type.into(),
            category: "toothpaste".into(),
            matches_category: true,
            description: String::new(),
        }
    }

    #[test]
    fn kg_bonus_by_entity_type() {
        assert_eq!(kg_entity_bonus(Some(&entity("Brand", true))), 15);
        assert_eq!(kg_entity_bonus(Some(&entity("Organization", true))), 10);
        assert_eq!(kg_entity_bonus(Some(&entity("Corporation", true))), 10);
        assert_eq!(kg_entity_bonus(Some(&entity("Movie", true))), 5);
        assert_eq!(kg_entity_bonus(Some(&entity("Brand", false))), 0);
        assert_eq!(kg_entity_bonus(None), 0);
    }
}

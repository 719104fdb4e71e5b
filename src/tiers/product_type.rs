//! Product-type classification against an expected survey category.
//!
//! The vision and web-text models return free-form product types ("toothpaste",
//! "зубная паста", "chewing gum"). A detected type is classified as correct or
//! mismatched relative to the expected category using per-category keyword
//! lists that include common transliterations. Unknown categories fall back to
//! matching the category name itself.

use std::collections::HashMap;

/// Classification of a detected product type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeMatch {
    /// Detected type belongs to the expected category.
    Correct,
    /// Detected type names a different product category.
    Mismatched,
    /// Nothing usable was detected (empty type, not a product).
    Unknown,
}

/// Keyword tables for the categories the survey pipeline sees most.
/// Keys and keywords are stored normalized (lowercase).
const BUILTIN_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "toothpaste",
        &[
            "toothpaste",
            "tooth paste",
            "dental",
            "dentifrice",
            "зубная паста",
            "паста",
        ],
    ),
    (
        "chewing gum",
        &["chewing gum", "gum", "bubble gum", "жевательная резинка", "жвачка"],
    ),
    (
        "soft drink",
        &[
            "soft drink",
            "soda",
            "beverage",
            "cola",
            "lemonade",
            "напиток",
            "газировка",
            "лимонад",
        ],
    ),
    (
        "chocolate",
        &["chocolate", "candy bar", "chocolate bar", "шоколад", "шоколадка"],
    ),
    (
        "shampoo",
        &["shampoo", "hair care", "conditioner", "шампунь"],
    ),
    (
        "coffee",
        &["coffee", "instant coffee", "espresso", "кофе"],
    ),
    (
        "laundry detergent",
        &[
            "laundry detergent",
            "detergent",
            "washing powder",
            "стиральный порошок",
            "порошок",
        ],
    ),
];

/// Classifies detected product types against an expected category.
#[derive(Debug, Clone)]
pub struct ProductTypeMatcher {
    categories: HashMap<String, Vec<String>>,
}

impl ProductTypeMatcher {
    /// Creates a matcher with the built-in category tables.
    pub fn new() -> Self {
        let categories = BUILTIN_CATEGORIES
            .iter()
            .map(|(category, keywords)| {
                (
                    category.to_string(),
                    keywords.iter().map(|k| k.to_string()).collect(),
                )
            })
            .collect();
        Self { categories }
    }

    /// Adds or replaces the keyword list for a category. Keywords are
    /// normalized to lowercase.
    pub fn with_category(mut self, category: &str, keywords: &[&str]) -> Self {
        self.categories.insert(
            category.to_lowercase(),
            keywords.iter().map(|k| k.to_lowercase()).collect(),
        );
        self
    }

    /// Classifies a detected product type against the expected category.
    pub fn classify(&self, detected_type: &str, expected_category: &str) -> TypeMatch {
        let detected = detected_type.trim().to_lowercase();
        if detected.is_empty() {
            return TypeMatch::Unknown;
        }

        if self.category_matches_text(expected_category, &detected) {
            TypeMatch::Correct
        } else {
            TypeMatch::Mismatched
        }
    }

    /// Scans the known category tables and returns the first category whose
    /// keywords appear in `text`.
    pub fn detect_category(&self, text: &str) -> Option<String> {
        let text = text.to_lowercase();
        let mut categories: Vec<&String> = self.categories.keys().collect();
        categories.sort();
        categories
            .into_iter()
            .find(|category| {
                text.contains(category.as_str())
                    || self.categories[*category]
                        .iter()
                        .any(|kw| text.contains(kw.as_str()))
            })
            .cloned()
    }

    /// Returns `true` when `text` mentions the expected category (by keyword
    /// or by the category name itself). Also used for knowledge-graph
    /// descriptions and web snippets.
    pub fn category_matches_text(&self, expected_category: &str, text: &str) -> bool {
        let expected = expected_category.trim().to_lowercase();
        let text = text.to_lowercase();
        let trimmed = text.trim();
        if expected.is_empty() || trimmed.is_empty() {
            return false;
        }

        if text.contains(&expected) || expected.contains(trimmed) {
            return true;
        }

        match self.categories.get(&expected) {
            Some(keywords) => keywords
                .iter()
                .any(|kw| text.contains(kw.as_str()) || kw.contains(trimmed)),
            None => false,
        }
    }
}

impl Default for ProductTypeMatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_category_name_is_correct() {
        let matcher = ProductTypeMatcher::new();
        assert_eq!(
            matcher.classify("toothpaste", "toothpaste"),
            TypeMatch::Correct
        );
    }

    #[test]
    fn keyword_variants_are_correct() {
        let matcher = ProductTypeMatcher::new();
        assert_eq!(
            matcher.classify("dental care product", "toothpaste"),
            TypeMatch::Correct
        );
        assert_eq!(matcher.classify("soda can", "soft drink"), TypeMatch::Correct);
    }

    #[test]
    fn transliterations_are_correct() {
        let matcher = ProductTypeMatcher::new();
        assert_eq!(
            matcher.classify("зубная паста", "toothpaste"),
            TypeMatch::Correct
        );
        assert_eq!(
            matcher.classify("жевательная резинка", "chewing gum"),
            TypeMatch::Correct
        );
    }

    #[test]
    fn different_category_is_mismatched() {
        let matcher = ProductTypeMatcher::new();
        assert_eq!(
            matcher.classify("chewing gum", "toothpaste"),
            TypeMatch::Mismatched
        );
        assert_eq!(matcher.classify("smartphone", "coffee"), TypeMatch::Mismatched);
    }

    #[test]
    fn empty_detection_is_unknown() {
        let matcher = ProductTypeMatcher::new();
        assert_eq!(matcher.classify("", "toothpaste"), TypeMatch::Unknown);
        assert_eq!(matcher.classify("   ", "toothpaste"), TypeMatch::Unknown);
    }

    #[test]
    fn unknown_category_falls_back_to_name_match() {
        let matcher = ProductTypeMatcher::new();
        assert_eq!(
            matcher.classify("energy drink", "energy drink"),
            TypeMatch::Correct
        );
        assert_eq!(
            matcher.classify("yogurt", "energy drink"),
            TypeMatch::Mismatched
        );
    }

    #[test]
    fn custom_category_table_overrides() {
        let matcher =
            ProductTypeMatcher::new().with_category("snacks", &["chips", "crisps", "чипсы"]);
        assert_eq!(matcher.classify("чипсы", "snacks"), TypeMatch::Correct);
    }

    #[test]
    fn kg_description_matching() {
        let matcher = ProductTypeMatcher::new();
        assert!(matcher.category_matches_text(
            "toothpaste",
            "Colgate is a brand of toothpaste sold worldwide"
        ));
        assert!(!matcher.category_matches_text(
            "toothpaste",
            "Apple Inc. is an American technology company"
        ));
    }
}

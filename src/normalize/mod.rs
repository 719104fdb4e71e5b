//! Answer normalization for cache keys and candidate comparison.
//!
//! Survey answers arrive with stray whitespace, mixed case, and decorative
//! punctuation ("Colgate!!", "  колгейт "). Normalization keeps cache keys and
//! candidate-name comparisons stable without altering the script of the answer.

/// Normalizes a free-text answer: Unicode lowercase, trimmed, inner whitespace
/// collapsed to single spaces, leading/trailing punctuation stripped.
pub fn normalize_answer(text: &str) -> String {
    let lowered = text.to_lowercase();
    let trimmed = lowered.trim_matches(|c: char| c.is_whitespace() || is_edge_punctuation(c));

    let mut out = String::with_capacity(trimmed.len());
    let mut last_was_space = false;
    for c in trimmed.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out
}

/// Returns `true` when two names are the same answer after normalization.
pub fn is_same_answer(a: &str, b: &str) -> bool {
    normalize_answer(a) == normalize_answer(b)
}

fn is_edge_punctuation(c: char) -> bool {
    matches!(c, '.' | ',' | '!' | '?' | ';' | ':' | '"' | '\'' | '«' | '»' | '(' | ')')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_trims() {
        assert_eq!(normalize_answer("  Colgate  "), "colgate");
        assert_eq!(normalize_answer("SENSODYNE"), "sensodyne");
    }

    #[test]
    fn collapses_inner_whitespace() {
        assert_eq!(normalize_answer("oral   b"), "oral b");
        assert_eq!(normalize_answer("oral\t b"), "oral b");
    }

    #[test]
    fn strips_edge_punctuation_only() {
        assert_eq!(normalize_answer("«Colgate!»"), "colgate");
        assert_eq!(normalize_answer("head & shoulders"), "head & shoulders");
    }

    #[test]
    fn preserves_non_latin_scripts() {
        assert_eq!(normalize_answer(" Колгейт "), "колгейт");
        assert_eq!(normalize_answer("ローソン"), "ローソン");
    }

    #[test]
    fn same_answer_ignores_case_and_spacing() {
        assert!(is_same_answer("Oral-B", "oral-b"));
        assert!(is_same_answer("  colgate ", "Colgate"));
        assert!(!is_same_answer("colgate", "sensodyne"));
    }
}

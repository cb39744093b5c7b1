//! Text cleanup shared by the store and the decorators.
//!
//! Normalization is deliberately shallow: accent stripping and case
//! folding only. No locale-aware linguistics.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Remove diacritics: NFD-decompose, then drop combining marks.
///
/// `"José"` → `"Jose"`, `"Zoë"` → `"Zoe"`. Characters without a
/// decomposition pass through untouched.
pub fn strip_accents(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Display text as stored: surrounding whitespace removed.
pub fn clean_text(s: &str) -> String {
    s.trim().to_string()
}

/// Locale codes are stored trimmed and lowercase.
pub fn clean_locale(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Case-insensitive comparison used by the dedupe predicates.
pub fn eq_fold(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_accents() {
        assert_eq!(strip_accents("José"), "Jose");
        assert_eq!(strip_accents("Zoë"), "Zoe");
        assert_eq!(strip_accents("Àngela"), "Angela");
        assert_eq!(strip_accents("Łukasz"), "Łukasz");
        assert_eq!(strip_accents("John"), "John");
    }

    #[test]
    fn test_clean_locale() {
        assert_eq!(clean_locale("  ES "), "es");
        assert_eq!(clean_text("  Mary Ann "), "Mary Ann");
    }

    #[test]
    fn test_eq_fold() {
        assert!(eq_fold("Juan", "JUAN"));
        assert!(!eq_fold("Juan", "Joan"));
    }
}

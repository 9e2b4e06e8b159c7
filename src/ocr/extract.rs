use regex::Regex;
use std::sync::OnceLock;

/// A single optionally signed integer, nothing else on the line.
const READING_PATTERN: &str = r"^[+-]?\d+$";

fn reading_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(READING_PATTERN).ok()).as_ref()
}

/// Parses recognized display text into a pressure reading.
///
/// Surrounding whitespace and newlines are ignored. Empty text, several
/// tokens, stray characters or values that overflow `i64` give `None`.
pub fn parse_reading(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    if !reading_regex()?.is_match(trimmed) {
        return None;
    }
    trimmed.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_numbers() {
        assert_eq!(parse_reading("42"), Some(42));
        assert_eq!(parse_reading("0"), Some(0));
        assert_eq!(parse_reading("007"), Some(7));
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        // Tesseract ends its output with a newline and form feed
        assert_eq!(parse_reading("  118\n\x0c"), Some(118));
    }

    #[test]
    fn test_signed_numbers() {
        assert_eq!(parse_reading("-3"), Some(-3));
        assert_eq!(parse_reading("+15"), Some(15));
    }

    #[test]
    fn test_rejects_non_numeric() {
        assert_eq!(parse_reading(""), None);
        assert_eq!(parse_reading("   \n"), None);
        assert_eq!(parse_reading("abc"), None);
        assert_eq!(parse_reading("4O"), None);
        assert_eq!(parse_reading("12.5"), None);
    }

    #[test]
    fn test_rejects_multiple_tokens() {
        assert_eq!(parse_reading("12 34"), None);
        assert_eq!(parse_reading("12\n34"), None);
    }

    #[test]
    fn test_rejects_overflow() {
        assert_eq!(parse_reading("99999999999999999999"), None);
    }
}

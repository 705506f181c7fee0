//! Length bounding for free-text fields headed into fixed-width columns.

/// Bound `input` to `max_chars` characters, marking truncation with an
/// ellipsis. Character-based, so multi-byte text never splits a scalar.
pub fn limited(input: &str, max_chars: usize) -> String {
    if input.chars().count() > max_chars {
        let mut out: String = input.chars().take(max_chars.saturating_sub(2)).collect();
        out.push('…');
        out
    } else {
        input.to_string()
    }
}

/// [`limited`], then case-folded for lookup-friendly columns (author
/// initials and suffixes).
pub fn limited_lower(input: &str, max_chars: usize) -> String {
    limited(input, max_chars).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_strings_pass_through() {
        assert_eq!(limited("Smith", 20), "Smith");
    }

    #[test]
    fn long_strings_get_ellipsis() {
        let out = limited("abcdefghij", 6);
        assert_eq!(out, "abcd…");
        assert_eq!(out.chars().count(), 5);
    }

    #[test]
    fn lowering_applies_after_bounding() {
        assert_eq!(limited_lower("JMA", 20), "jma");
        assert_eq!(limited_lower("ABCDEFGHIJ", 6), "abcd…");
    }
}

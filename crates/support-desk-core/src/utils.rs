//! Small text helpers.

/// Truncate a string to at most `max_chars` characters, respecting UTF-8 boundaries.
#[must_use]
pub fn truncate_str(s: impl AsRef<str>, max_chars: usize) -> String {
    let s = s.as_ref();
    s.char_indices()
        .nth(max_chars)
        .map_or_else(|| s.to_string(), |(pos, _)| s[..pos].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str_unicode() {
        assert_eq!(truncate_str("Привет, мир!", 6), "Привет");
        assert_eq!(truncate_str("short", 100), "short");
        assert_eq!(truncate_str("", 3), "");
    }
}

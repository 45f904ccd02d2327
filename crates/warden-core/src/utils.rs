//! String helpers.

/// Truncate `s` to at most `max_chars` Unicode scalar values.
///
/// Always cuts on a character boundary, so multi-byte text is never split.
#[must_use]
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_no_truncation() {
        assert_eq!(truncate_chars("hello", 10), "hello");
    }

    #[test]
    fn ascii_truncation() {
        assert_eq!(truncate_chars("hello world", 5), "hello");
    }

    #[test]
    fn exact_length_is_untouched() {
        assert_eq!(truncate_chars("abc", 3), "abc");
    }

    #[test]
    fn multibyte_counts_characters() {
        let s = "héllo wörld";
        assert_eq!(truncate_chars(s, 4), "héll");
        assert_eq!(truncate_chars("日本語テキスト", 3), "日本語");
    }

    #[test]
    fn zero_max() {
        assert_eq!(truncate_chars("abc", 0), "");
    }
}

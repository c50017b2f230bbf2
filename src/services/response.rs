//! Helpers for working with raw completion responses.

/// Extract a JSON object from a response that might have surrounding text.
///
/// Backends occasionally wrap the object in prose or code fences; the widest
/// `{..}` window is taken. Returns the trimmed input unchanged when no
/// object is found, leaving the parse error to the caller.
pub(crate) fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return trimmed;
    }
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if end > start {
            return &trimmed[start..=end];
        }
    }
    trimmed
}

/// Truncate to at most `max_chars` characters on a char boundary.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_passes_bare_object_through() {
        assert_eq!(extract_json(r#"{"a": 1}"#), r#"{"a": 1}"#);
    }

    #[test]
    fn test_extract_json_strips_fences_and_prose() {
        assert_eq!(
            extract_json("Here you go:\n```json\n{\"a\": 1}\n```"),
            r#"{"a": 1}"#
        );
        assert_eq!(extract_json("prefix {\"a\": {\"b\": 2}} suffix"), r#"{"a": {"b": 2}}"#);
    }

    #[test]
    fn test_extract_json_returns_input_when_no_object() {
        assert_eq!(extract_json("no json at all"), "no json at all");
        assert_eq!(extract_json("  unbalanced } { pair  "), "unbalanced } { pair");
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("ab", 10), "ab");
        assert_eq!(truncate_chars("", 3), "");
    }
}

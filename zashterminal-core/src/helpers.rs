//! Small string helpers shared by the GUI and CLI

use std::collections::HashSet;

pub use crate::config::keybindings::accelerator_to_label;

/// Maximum length of a session, folder or layout name
pub const MAX_NAME_LENGTH: usize = 128;

const FORBIDDEN_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*', '\0'];

/// Makes a user-supplied name safe to use as a file name.
///
/// Forbidden characters become `_`, control characters are dropped, leading
/// and trailing spaces and dots are trimmed, and the result is capped at
/// [`MAX_NAME_LENGTH`] characters. Empty results become `"unnamed"`.
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if FORBIDDEN_NAME_CHARS.contains(&c) { '_' } else { c })
        .filter(|c| u32::from(*c) >= 32)
        .collect();
    let trimmed = replaced.trim_matches(|c| c == ' ' || c == '.');
    if trimmed.is_empty() {
        return "unnamed".to_string();
    }
    trimmed.chars().take(MAX_NAME_LENGTH).collect()
}

/// Returns `base` (sanitized) or the first free `"base (n)"`
#[must_use]
pub fn generate_unique_name(base: &str, existing: &HashSet<String>) -> String {
    let base = sanitize_name(base);
    if !existing.contains(&base) {
        return base;
    }
    (1..)
        .map(|n| format!("{base} ({n})"))
        .find(|candidate| !existing.contains(candidate))
        .unwrap_or(base)
}

/// `true` for URLs with a scheme and host, and for bare e-mail addresses
#[must_use]
pub fn is_valid_url(text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() {
        return false;
    }
    if let Some((_, domain)) = text.rsplit_once('@')
        && domain.contains('.')
        && !["http", "ftp", "mailto"].iter().any(|s| text.starts_with(s))
    {
        return true;
    }
    url::Url::parse(text).is_ok_and(|u| u.host_str().is_some_and(|h| !h.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_forbidden_characters() {
        assert_eq!(sanitize_name("a/b:c"), "a_b_c");
        assert_eq!(sanitize_name("  ..name.. "), "name");
        assert_eq!(sanitize_name("tab\there"), "tabhere");
        assert_eq!(sanitize_name(""), "unnamed");
        assert_eq!(sanitize_name(" . "), "unnamed");
        assert_eq!(sanitize_name(&"x".repeat(200)).len(), MAX_NAME_LENGTH);
    }

    #[test]
    fn unique_names_count_up() {
        let mut existing = HashSet::new();
        assert_eq!(generate_unique_name("web", &existing), "web");
        existing.insert("web".to_string());
        existing.insert("web (1)".to_string());
        assert_eq!(generate_unique_name("web", &existing), "web (2)");
    }

    #[test]
    fn url_detection() {
        assert!(is_valid_url("https://example.com/path"));
        assert!(is_valid_url("user@example.com"));
        assert!(!is_valid_url("user@host"));
        assert!(!is_valid_url("not a url"));
        assert!(!is_valid_url(""));
    }
}

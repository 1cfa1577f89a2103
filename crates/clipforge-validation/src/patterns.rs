//! Dangerous-pattern detection (§4.J, §8 property 9, §9 "dynamic string-to-code
//! evaluation ... removed").

/// Rejects `<script>` tags, `javascript:` URIs, path-traversal segments, and
/// raw control characters. Deliberately simple substring/char-class checks:
/// the point is a closed deny-list a reviewer can audit at a glance, not a
/// general-purpose sanitizer.
pub fn contains_dangerous_pattern(input: &str) -> bool {
    let lower = input.to_ascii_lowercase();
    if lower.contains("<script") || lower.contains("javascript:") || lower.contains("../") {
        return true;
    }
    input.chars().any(|c| c.is_control() && c != '\n' && c != '\t' && c != '\r')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_script_tags_and_js_uris_and_traversal() {
        assert!(contains_dangerous_pattern("<script>alert(1)</script>"));
        assert!(contains_dangerous_pattern("javascript:alert(1)"));
        assert!(contains_dangerous_pattern("../../etc/passwd"));
        assert!(contains_dangerous_pattern("hello\u{0007}world"));
    }

    #[test]
    fn accepts_ordinary_text() {
        assert!(!contains_dangerous_pattern("Three Morning Habits"));
        assert!(!contains_dangerous_pattern("a/b/c.mp4"));
    }
}

//! Unified diffs for `--dry-run` previews.

use similar::TextDiff;

/// Lines of unchanged context around each hunk.
const CONTEXT_LINES: usize = 3;

/// Unified diff of `old` to `new`, labelled `a/<path>` and `b/<path>`.
///
/// Returns an empty string when the texts are identical.
pub fn unified_diff(path: &str, old: &str, new: &str) -> String {
    if old == new {
        return String::new();
    }
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(CONTEXT_LINES)
        .header(&format!("a/{}", path), &format!("b/{}", path))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_text_has_empty_diff() {
        assert_eq!(unified_diff("f.ts", "same\n", "same\n"), "");
    }

    #[test]
    fn diff_has_headers_and_changes() {
        let diff = unified_diff("src/f.ts", "a\nold\nc\n", "a\nnew\nc\n");
        assert!(diff.starts_with("--- a/src/f.ts\n+++ b/src/f.ts\n"));
        assert!(diff.contains("\n-old\n"));
        assert!(diff.contains("\n+new\n"));
        assert!(diff.contains("@@"));
    }

    #[test]
    fn removed_lines_are_minus() {
        let diff = unified_diff("f", "keep\ndrop1\ndrop2\n", "keep\n");
        assert_eq!(diff.matches("\n-drop").count(), 2);
    }
}

//! Patch IR: spans, edits and an atomically applied `PatchSet`.
//!
//! The rewrite step describes every change to the source (line deletions,
//! anchored insertions, method replacement) as an [`Edit`] against the same
//! original text. The set is checked for overlaps and applied in one pass,
//! so either every edit lands or none does.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Hash type for content verification (SHA-256, stored as hex string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
    /// Compute SHA-256 hash of the given bytes, returning hex-encoded string.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentHash(hex::encode(hasher.finalize()))
    }

    /// Create from an existing hex string without validation.
    pub fn from_hex_unchecked(hex: &str) -> Self {
        ContentHash(hex.to_string())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Span
// ============================================================================

/// Byte offsets into content. Half-open: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl Span {
    /// Create a new span.
    ///
    /// # Panics
    /// Panics if `start > end`.
    pub fn new(start: usize, end: usize) -> Self {
        assert!(
            start <= end,
            "Span start ({}) must be <= end ({})",
            start,
            end
        );
        Span { start, end }
    }

    /// Empty span at `offset`, used for insertions.
    pub fn point(offset: usize) -> Self {
        Span::new(offset, offset)
    }

    /// Check if span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Check if this span overlaps with another.
    ///
    /// Adjacent spans do not overlap. An empty span overlaps a non-empty
    /// span only when it lies strictly inside it.
    pub fn overlaps(&self, other: &Span) -> bool {
        if self.is_empty() || other.is_empty() {
            let (point, range) = if self.is_empty() {
                (self, other)
            } else {
                (other, self)
            };
            return !range.is_empty() && range.start < point.start && point.start < range.end;
        }
        self.start < other.end && other.start < self.end
    }

    /// Check if this span contains another span entirely.
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

// ============================================================================
// Anchor Resolution
// ============================================================================

/// Result of locating a literal anchor in content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorResolution {
    /// Exactly one occurrence.
    Resolved(Span),
    /// No occurrence.
    NotFound,
    /// More than one occurrence.
    Ambiguous { matches: Vec<Span> },
}

/// Find every non-overlapping occurrence of `anchor` in `content`.
pub fn resolve_literal(content: &str, anchor: &str) -> AnchorResolution {
    if anchor.is_empty() {
        return AnchorResolution::NotFound;
    }
    let matches: Vec<Span> = content
        .match_indices(anchor)
        .map(|(start, m)| Span::new(start, start + m.len()))
        .collect();
    match matches.len() {
        0 => AnchorResolution::NotFound,
        1 => AnchorResolution::Resolved(matches[0]),
        _ => AnchorResolution::Ambiguous { matches },
    }
}

// ============================================================================
// Conflicts
// ============================================================================

/// A detected problem that prevents a `PatchSet` from applying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Conflict {
    /// Two edits touch overlapping bytes.
    OverlappingSpans { first: Span, second: Span },
    /// An edit's span lies outside the content.
    SpanOutOfBounds { span: Span, content_len: usize },
}

impl Conflict {
    /// Byte offset where the conflict begins.
    pub fn offset(&self) -> usize {
        match self {
            Conflict::OverlappingSpans { first, second } => first.start.min(second.start),
            Conflict::SpanOutOfBounds { span, .. } => span.start,
        }
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conflict::OverlappingSpans { first, second } => {
                write!(f, "edit at {} overlaps edit at {}", first, second)
            }
            Conflict::SpanOutOfBounds { span, content_len } => {
                write!(f, "edit at {} is outside content of {} bytes", span, content_len)
            }
        }
    }
}

// ============================================================================
// Edit Operations
// ============================================================================

/// The kind of edit operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditKind {
    /// Insert text at `span.start`.
    Insert,
    /// Delete the bytes in `span`.
    Delete,
    /// Replace the bytes in `span` with new text.
    Replace,
}

/// A single text change against the original content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    /// Stable identifier; also orders insertions at the same offset.
    pub id: u32,
    pub kind: EditKind,
    pub span: Span,
    /// The new text (empty for Delete).
    pub text: String,
    /// Human-readable provenance.
    pub label: String,
}

impl Edit {
    /// Create an Insert edit at `offset`.
    pub fn insert(id: u32, offset: usize, text: impl Into<String>) -> Self {
        Edit {
            id,
            kind: EditKind::Insert,
            span: Span::point(offset),
            text: text.into(),
            label: String::new(),
        }
    }

    /// Create a Delete edit.
    pub fn delete(id: u32, span: Span) -> Self {
        Edit {
            id,
            kind: EditKind::Delete,
            span,
            text: String::new(),
            label: String::new(),
        }
    }

    /// Create a Replace edit.
    pub fn replace(id: u32, span: Span, text: impl Into<String>) -> Self {
        Edit {
            id,
            kind: EditKind::Replace,
            span,
            text: text.into(),
            label: String::new(),
        }
    }

    /// Attach a provenance label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

// ============================================================================
// PatchSet
// ============================================================================

/// An ordered set of edits against one text, applied atomically.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatchSet {
    pub edits: Vec<Edit>,
}

impl PatchSet {
    /// Create an empty PatchSet.
    pub fn new() -> Self {
        PatchSet::default()
    }

    /// Add an edit.
    pub fn push(&mut self, edit: Edit) {
        self.edits.push(edit);
    }

    /// Next unused edit id.
    pub fn next_id(&self) -> u32 {
        self.edits.iter().map(|e| e.id + 1).max().unwrap_or(0)
    }

    /// Detect overlapping or out-of-bounds edits.
    #[must_use]
    pub fn detect_conflicts(&self, content_len: usize) -> Vec<Conflict> {
        let mut conflicts = Vec::new();

        for edit in &self.edits {
            if edit.span.end > content_len {
                conflicts.push(Conflict::SpanOutOfBounds {
                    span: edit.span,
                    content_len,
                });
            }
        }

        for i in 0..self.edits.len() {
            for j in (i + 1)..self.edits.len() {
                let a = self.edits[i].span;
                let b = self.edits[j].span;
                if a.overlaps(&b) {
                    conflicts.push(Conflict::OverlappingSpans {
                        first: a,
                        second: b,
                    });
                }
            }
        }

        conflicts
    }

    /// Apply every edit to `content`, or none of them.
    ///
    /// Edits apply from the highest offset down so earlier spans stay valid.
    /// At equal offsets deletions and replacements run before insertions,
    /// and insertions keep their id order in the output.
    pub fn apply(&self, content: &str) -> Result<String, Vec<Conflict>> {
        let conflicts = self.detect_conflicts(content.len());
        if !conflicts.is_empty() {
            return Err(conflicts);
        }

        let mut ordered: Vec<&Edit> = self.edits.iter().collect();
        ordered.sort_by(|a, b| {
            b.span
                .start
                .cmp(&a.span.start)
                .then_with(|| {
                    let a_insert = a.kind == EditKind::Insert;
                    let b_insert = b.kind == EditKind::Insert;
                    a_insert.cmp(&b_insert)
                })
                .then_with(|| b.id.cmp(&a.id))
        });

        let mut output = content.to_string();
        for edit in ordered {
            match edit.kind {
                EditKind::Insert => output.insert_str(edit.span.start, &edit.text),
                EditKind::Delete => output.replace_range(edit.span.start..edit.span.end, ""),
                EditKind::Replace => {
                    output.replace_range(edit.span.start..edit.span.end, &edit.text)
                }
            }
        }

        Ok(output)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod content_hash_tests {
        use super::*;

        #[test]
        fn content_hash_compute_produces_hex() {
            let hash = ContentHash::compute(b"hello");
            assert_eq!(hash.0.len(), 64);
            assert!(hash.0.chars().all(|c| c.is_ascii_hexdigit()));
        }

        #[test]
        fn content_hash_differs_for_different_content() {
            assert_ne!(ContentHash::compute(b"a"), ContentHash::compute(b"b"));
        }

        #[test]
        fn content_hash_display() {
            let hash = ContentHash::from_hex_unchecked("abc123");
            assert_eq!(format!("{}", hash), "abc123");
        }
    }

    mod span_tests {
        use super::*;

        #[test]
        fn span_overlap_detection() {
            let span1 = Span::new(10, 20);
            let span2 = Span::new(15, 25);
            let span3 = Span::new(20, 30);

            assert!(span1.overlaps(&span2));
            assert!(span2.overlaps(&span1));
            assert!(!span1.overlaps(&span3));
            assert!(!span3.overlaps(&span1));
        }

        #[test]
        fn point_overlaps_only_interior() {
            let range = Span::new(10, 20);
            assert!(Span::point(15).overlaps(&range));
            assert!(range.overlaps(&Span::point(15)));
            assert!(!Span::point(10).overlaps(&range));
            assert!(!Span::point(20).overlaps(&range));
            assert!(!Span::point(5).overlaps(&Span::point(5)));
        }

        #[test]
        fn span_contains() {
            let outer = Span::new(10, 30);
            assert!(outer.contains(&Span::new(15, 25)));
            assert!(!outer.contains(&Span::new(20, 40)));
        }

        #[test]
        #[should_panic(expected = "must be <= end")]
        fn inverted_span_panics() {
            let _ = Span::new(5, 4);
        }
    }

    mod anchor_tests {
        use super::*;

        #[test]
        fn single_occurrence_resolves() {
            let content = "import a;\nimport b;\n";
            assert_eq!(
                resolve_literal(content, "import b;"),
                AnchorResolution::Resolved(Span::new(10, 19))
            );
        }

        #[test]
        fn missing_anchor_not_found() {
            assert_eq!(resolve_literal("abc", "xyz"), AnchorResolution::NotFound);
            assert_eq!(resolve_literal("abc", ""), AnchorResolution::NotFound);
        }

        #[test]
        fn repeated_anchor_is_ambiguous() {
            match resolve_literal("x;\nx;\n", "x;") {
                AnchorResolution::Ambiguous { matches } => assert_eq!(matches.len(), 2),
                other => panic!("expected ambiguous, got {:?}", other),
            }
        }
    }

    mod apply_tests {
        use super::*;

        #[test]
        fn apply_mixed_edits() {
            let content = "aaa\nbbb\nccc\n";
            let mut patch = PatchSet::new();
            patch.push(Edit::delete(0, Span::new(4, 8)));
            patch.push(Edit::insert(1, 0, "head\n"));
            patch.push(Edit::replace(2, Span::new(8, 11), "CCC"));
            assert_eq!(patch.apply(content).unwrap(), "head\naaa\nCCC\n");
        }

        #[test]
        fn insert_after_adjacent_delete_survives() {
            let content = "keep\ndrop\nanchor\n";
            let mut patch = PatchSet::new();
            patch.push(Edit::delete(0, Span::new(5, 10)));
            patch.push(Edit::insert(1, 10, "new\n"));
            assert_eq!(patch.apply(content).unwrap(), "keep\nnew\nanchor\n");
        }

        #[test]
        fn inserts_at_same_offset_keep_id_order() {
            let mut patch = PatchSet::new();
            patch.push(Edit::insert(0, 1, "1"));
            patch.push(Edit::insert(1, 1, "2"));
            assert_eq!(patch.apply("ab").unwrap(), "a12b");
        }

        #[test]
        fn overlapping_edits_fail_without_changes() {
            let mut patch = PatchSet::new();
            patch.push(Edit::delete(0, Span::new(0, 5)));
            patch.push(Edit::replace(1, Span::new(3, 7), "x"));
            let conflicts = patch.apply("0123456789").unwrap_err();
            assert_eq!(conflicts.len(), 1);
            assert!(matches!(conflicts[0], Conflict::OverlappingSpans { .. }));
            assert_eq!(conflicts[0].offset(), 0);
        }

        #[test]
        fn conflict_offset_is_earliest_start() {
            let overlap = Conflict::OverlappingSpans {
                first: Span::new(6, 9),
                second: Span::new(4, 7),
            };
            assert_eq!(overlap.offset(), 4);
            let outside = Conflict::SpanOutOfBounds {
                span: Span::new(2, 50),
                content_len: 5,
            };
            assert_eq!(outside.offset(), 2);
        }

        #[test]
        fn out_of_bounds_edit_fails() {
            let mut patch = PatchSet::new();
            patch.push(Edit::delete(0, Span::new(2, 50)));
            let conflicts = patch.apply("short").unwrap_err();
            assert_eq!(
                conflicts,
                vec![Conflict::SpanOutOfBounds {
                    span: Span::new(2, 50),
                    content_len: 5
                }]
            );
        }

        #[test]
        fn empty_patch_is_identity() {
            let patch = PatchSet::new();
            assert_eq!(patch.apply("same").unwrap(), "same");
        }

        #[test]
        fn next_id_follows_highest() {
            let mut patch = PatchSet::new();
            assert_eq!(patch.next_id(), 0);
            patch.push(Edit::insert(4, 0, "x"));
            assert_eq!(patch.next_id(), 5);
        }
    }
}

//! Line-oriented document model and position utilities.
//!
//! A [`Document`] is the in-memory form of a source file that every step
//! works on. It stores each line together with its original terminator so
//! that joining the lines reproduces the input byte-for-byte.
//!
//! ## Coordinate Conventions
//!
//! - Document lines are **0-indexed** (this is what listings record)
//! - Conflict positions from [`byte_offset_to_position`] are **1-indexed**
//! - Byte offsets are **0-indexed**

use crate::patch::Span;

// ============================================================================
// Document
// ============================================================================

/// An ordered sequence of lines, each keeping its line terminator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    lines: Vec<String>,
}

impl Document {
    /// Split text into lines, keeping `\n` (and any preceding `\r`) on each.
    ///
    /// A trailing newline does not produce an extra empty line.
    pub fn parse(text: &str) -> Self {
        let lines = text.split_inclusive('\n').map(str::to_string).collect();
        Document { lines }
    }

    /// Number of lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// True if the document has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Iterate lines without terminators.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|l| strip_line_ending(l))
    }

    /// Text of lines `start..=end`, terminators included.
    ///
    /// Returns `None` if the range is inverted or extends past the document.
    pub fn slice(&self, start: usize, end: usize) -> Option<String> {
        if start > end || end >= self.lines.len() {
            return None;
        }
        Some(self.lines[start..=end].concat())
    }

    /// Byte span covering lines `start..=end` and their terminators.
    pub fn lines_span(&self, start: usize, end: usize) -> Option<Span> {
        if start > end || end >= self.lines.len() {
            return None;
        }
        let offset: usize = self.lines[..start].iter().map(String::len).sum();
        let len: usize = self.lines[start..=end].iter().map(String::len).sum();
        Some(Span::new(offset, offset + len))
    }

    /// Reassemble the document into its text.
    pub fn to_text(&self) -> String {
        self.lines.concat()
    }
}

fn strip_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

// ============================================================================
// Position Conversions
// ============================================================================

/// Convert a byte offset to a 1-indexed `(line, col)` pair.
///
/// Columns count bytes. Offsets past the end clamp to the end of content.
pub fn byte_offset_to_position(content: &str, offset: usize) -> (u32, u32) {
    let offset = offset.min(content.len());
    let mut line = 1u32;
    let mut col = 1u32;

    for &byte in &content.as_bytes()[..offset] {
        if byte == b'\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    (line, col)
}

/// Count the number of lines in the content.
pub fn line_count(content: &str) -> usize {
    Document::parse(content).line_count()
}

// ============================================================================
// Tests
// ============================================================================

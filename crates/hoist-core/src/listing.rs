//! Intermediate listing of handler descriptors.
//!
//! The listing carries scan results between steps. Its on-disk form is one
//! `name:start:end` record per line with 0-indexed, inclusive line numbers,
//! optionally preceded by a header recording the SHA-256 of the scanned
//! source:
//!
//! ```text
//! # source-sha256: 9f86d08...
//! handleEventFoo:1:3
//! handleStateMessage:5:7
//! ```
//!
//! When the header is present, later steps refuse to run against a source
//! whose hash differs, since line ranges are positional.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{HoistError, HoistResult};
use crate::patch::ContentHash;

const HASH_HEADER: &str = "# source-sha256:";

/// One located method and its inclusive line range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerDescriptor {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

impl HandlerDescriptor {
    pub fn new(name: impl Into<String>, start: usize, end: usize) -> Self {
        HandlerDescriptor {
            name: name.into(),
            start,
            end,
        }
    }

    /// Number of lines covered.
    pub fn line_len(&self) -> usize {
        self.end - self.start + 1
    }
}

impl fmt::Display for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.name, self.start, self.end)
    }
}

/// Ordered descriptors plus the hash of the source they were taken from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Listing {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_hash: Option<ContentHash>,
    pub handlers: Vec<HandlerDescriptor>,
}

impl Listing {
    /// Create a listing bound to the source text it describes.
    pub fn for_source(source: &str, handlers: Vec<HandlerDescriptor>) -> Self {
        Listing {
            source_hash: Some(ContentHash::compute(source.as_bytes())),
            handlers,
        }
    }

    /// Parse the on-disk form.
    ///
    /// Blank lines and `#` comments are skipped; the hash header is read if
    /// present. Each record must have exactly three `:`-separated fields.
    pub fn parse(text: &str) -> HoistResult<Self> {
        let mut listing = Listing::default();

        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(hash) = line.strip_prefix(HASH_HEADER) {
                listing.source_hash = Some(ContentHash::from_hex_unchecked(hash.trim()));
                continue;
            }
            if line.starts_with('#') {
                continue;
            }
            listing.handlers.push(parse_record(index + 1, line)?);
        }

        Ok(listing)
    }

    /// Render the on-disk form.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(hash) = &self.source_hash {
            out.push_str(&format!("{} {}\n", HASH_HEADER, hash));
        }
        for handler in &self.handlers {
            out.push_str(&format!("{}\n", handler));
        }
        out
    }

    /// Fail with `StaleListing` if the recorded hash differs from `source`.
    ///
    /// A listing without a hash header is accepted as-is.
    pub fn verify_source(&self, source: &str) -> HoistResult<()> {
        let Some(expected) = &self.source_hash else {
            return Ok(());
        };
        let actual = ContentHash::compute(source.as_bytes());
        if &actual != expected {
            return Err(HoistError::StaleListing {
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(())
    }

    /// Fail with `RangeOutOfBounds` if any descriptor ends past `line_count`.
    pub fn check_bounds(&self, line_count: usize) -> HoistResult<()> {
        for h in &self.handlers {
            if h.end >= line_count {
                return Err(HoistError::RangeOutOfBounds {
                    name: h.name.clone(),
                    start: h.start,
                    end: h.end,
                    line_count,
                });
            }
        }
        Ok(())
    }

    /// Split into descriptors to relocate and those named `exception`.
    pub fn partition(&self, exception: &str) -> (Vec<&HandlerDescriptor>, Vec<&HandlerDescriptor>) {
        self.handlers.iter().partition(|h| h.name != exception)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

fn parse_record(line_no: usize, line: &str) -> HoistResult<HandlerDescriptor> {
    let fields: Vec<&str> = line.split(':').collect();
    if fields.len() != 3 {
        return Err(HoistError::malformed_listing(
            line_no,
            line,
            format!("expected 3 fields, found {}", fields.len()),
        ));
    }
    let name = fields[0];
    if name.is_empty() {
        return Err(HoistError::malformed_listing(line_no, line, "empty name"));
    }
    let start: usize = fields[1].parse().map_err(|_| {
        HoistError::malformed_listing(line_no, line, "start is not a non-negative integer")
    })?;
    let end: usize = fields[2].parse().map_err(|_| {
        HoistError::malformed_listing(line_no, line, "end is not a non-negative integer")
    })?;
    if start > end {
        return Err(HoistError::malformed_listing(
            line_no,
            line,
            "start is after end",
        ));
    }
    Ok(HandlerDescriptor::new(name, start, end))
}

// ============================================================================
// Tests
// ============================================================================

//! Extractor: copy relocated methods into the target file.
//!
//! Every listed method except the exception is sliced out of the source and
//! the concatenation replaces the placeholder marker in the target. The
//! replacement is `section_header`, then each method followed by one blank
//! line, then `closing`.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{HoistError, HoistResult};
use crate::listing::Listing;
use crate::text::Document;

/// Placeholder left at the end of the target class.
pub const DEFAULT_PLACEHOLDER: &str = "  // Placeholder - will be filled with actual handler implementations
  // This is just the structure, the actual implementations will be extracted from MessageRouter.ts
}";

/// Comment introducing the relocated methods.
pub const DEFAULT_SECTION_HEADER: &str =
    "\n  // ========== EVENT HANDLERS - FULL IMPLEMENTATION ==========\n\n";

/// Text written after the relocated methods; closes the class again.
pub const DEFAULT_CLOSING: &str = "}";

/// Method that stays in the source and is never relocated.
pub const DEFAULT_EXCEPTION: &str = "handleStateMessage";

/// How the extracted methods are placed into the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    pub exception: String,
    pub placeholder: String,
    pub section_header: String,
    pub closing: String,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            exception: DEFAULT_EXCEPTION.to_string(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            section_header: DEFAULT_SECTION_HEADER.to_string(),
            closing: DEFAULT_CLOSING.to_string(),
        }
    }
}

/// Result of running the extractor against a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// Placeholder replaced; `content` is the new target text.
    Applied {
        content: String,
        extracted: Vec<String>,
    },
    /// Placeholder not present; the target must be left untouched.
    PlaceholderMissing { extracted: Vec<String> },
}

impl ExtractOutcome {
    /// Names of the methods selected for relocation.
    pub fn extracted(&self) -> &[String] {
        match self {
            ExtractOutcome::Applied { extracted, .. } => extracted,
            ExtractOutcome::PlaceholderMissing { extracted } => extracted,
        }
    }

    /// New target content, if the placeholder was found.
    pub fn content(&self) -> Option<&str> {
        match self {
            ExtractOutcome::Applied { content, .. } => Some(content),
            ExtractOutcome::PlaceholderMissing { .. } => None,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, ExtractOutcome::Applied { .. })
    }
}

/// Build the relocated section from `source` and splice it into `target`.
pub fn extract(
    source: &Document,
    listing: &Listing,
    target: &str,
    opts: &ExtractOptions,
) -> HoistResult<ExtractOutcome> {
    if opts.placeholder.is_empty() {
        return Err(HoistError::invalid_args("placeholder text must not be empty"));
    }
    listing.check_bounds(source.line_count())?;

    let (relocated, _kept) = listing.partition(&opts.exception);
    let extracted: Vec<String> = relocated.iter().map(|h| h.name.clone()).collect();

    let Some(at) = target.find(&opts.placeholder) else {
        warn!(
            handlers = extracted.len(),
            "placeholder not found in target; leaving it unchanged"
        );
        return Ok(ExtractOutcome::PlaceholderMissing { extracted });
    };

    let mut section = opts.section_header.clone();
    for handler in &relocated {
        let block = source
            .slice(handler.start, handler.end)
            .ok_or_else(|| HoistError::internal(format!("range of {} vanished", handler)))?;
        section.push_str(&block);
        if !block.ends_with('\n') {
            section.push('\n');
        }
        section.push('\n');
    }
    section.push_str(&opts.closing);

    let mut content = String::with_capacity(target.len() + section.len());
    content.push_str(&target[..at]);
    content.push_str(&section);
    content.push_str(&target[at + opts.placeholder.len()..]);

    info!(handlers = extracted.len(), "extracted handlers into target");
    Ok(ExtractOutcome::Applied { content, extracted })
}

// ============================================================================
// Tests
// ============================================================================

//! Scan, extract and rewrite in one pass over in-memory text.
//!
//! The three steps share one parsed [`Document`] of the source, so line
//! ranges cannot drift between scanning and use, and no listing file is
//! needed.

use tracing::info;

use crate::config::{RelocationConfig, ScanConfig};
use crate::error::HoistResult;
use crate::extract::{extract, ExtractOutcome};
use crate::listing::Listing;
use crate::rewrite::{rewrite, RewriteOutcome};
use crate::scan::{scan, ScanReport};
use crate::text::Document;

/// Scan `source` and build a listing bound to its hash.
pub fn scan_listing(source: &str, config: &ScanConfig) -> HoistResult<(Listing, ScanReport)> {
    let matcher = config.matcher()?;
    let doc = Document::parse(source);
    let report = scan(&doc, &matcher, config.brace_mode);
    let listing = Listing::for_source(source, report.handlers.clone());
    Ok((listing, report))
}

/// Everything produced by a full run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub listing: Listing,
    pub scan: ScanReport,
    pub extract: ExtractOutcome,
    pub rewrite: RewriteOutcome,
}

/// A full relocation over in-memory source and target text.
pub struct Relocation;

impl Relocation {
    /// Run all three steps. Nothing is written; callers persist
    /// `extract.content()` and `rewrite.content`.
    pub fn run(source: &str, target: &str, config: &RelocationConfig) -> HoistResult<RunOutcome> {
        config.validate()?;
        let matcher = config.scan.matcher()?;
        let doc = Document::parse(source);

        let report = scan(&doc, &matcher, config.scan.brace_mode);
        let listing = Listing::for_source(source, report.handlers.clone());

        let extracted = extract(&doc, &listing, target, &config.extract_options())?;
        let rewritten = rewrite(&doc, &listing, &config.rewrite_options())?;

        info!(
            handlers = listing.len(),
            relocated = rewritten.removed.len(),
            placeholder_found = extracted.is_applied(),
            "relocation complete"
        );

        Ok(RunOutcome {
            listing,
            scan: report,
            extract: extracted,
            rewrite: rewritten,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

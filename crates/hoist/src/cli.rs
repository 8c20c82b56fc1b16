//! Command implementations behind the `hoist` binary.
//!
//! Each function reads its inputs from disk, runs one step from
//! `hoist_core`, writes results atomically and returns the response the
//! binary prints. With `dry_run` nothing is written and the response carries
//! a unified diff instead.
//!
//! Writes happen only after every check has passed, so a failing command
//! leaves all files as they were.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use hoist_core::config::{RelocationConfig, ScanConfig};
use hoist_core::diff::unified_diff;
use hoist_core::error::HoistResult;
use hoist_core::extract::{extract, ExtractOptions};
use hoist_core::fsutil::{atomic_write, read_text};
use hoist_core::listing::Listing;
use hoist_core::output::{
    ExtractResponse, RewriteResponse, RunResponse, ScanResponse, SCHEMA_VERSION,
};
use hoist_core::pipeline::{scan_listing, Relocation};
use hoist_core::rewrite::{rewrite, RewriteOptions};
use hoist_core::text::Document;

/// Response for `hoist config`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigResponse {
    pub status: String,
    pub schema_version: String,
    pub config: RelocationConfig,
}

impl ConfigResponse {
    pub fn new(config: RelocationConfig) -> Self {
        ConfigResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            config,
        }
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

/// Read source and listing, refusing a listing taken from different source
/// text unless `force` is set.
fn load_inputs(source: &Path, listing: &Path, force: bool) -> HoistResult<(String, Listing)> {
    let source_text = read_text(source)?;
    let listing = Listing::parse(&read_text(listing)?)?;
    match listing.verify_source(&source_text) {
        Ok(()) => {}
        Err(err) if force => {
            warn!(error = %err, "using stale listing because --force was given");
        }
        Err(err) => return Err(err),
    }
    Ok((source_text, listing))
}

// ============================================================================
// Scan
// ============================================================================

/// Scan `source` and write the listing to `listing`.
pub fn run_scan(source: &Path, listing: &Path, config: &ScanConfig) -> HoistResult<ScanResponse> {
    let source_text = read_text(source)?;
    let (found, report) = scan_listing(&source_text, config)?;
    atomic_write(listing, &found.render())?;
    info!(
        source = %source.display(),
        listing = %listing.display(),
        handlers = found.len(),
        "listing written"
    );
    Ok(ScanResponse::new(display(listing), report, true))
}

// ============================================================================
// Extract
// ============================================================================

/// Copy the listed methods into the placeholder of `target`.
///
/// A target without the placeholder is left untouched and reported with
/// `placeholder_found: false`; this is not an error.
pub fn run_extract(
    source: &Path,
    listing: &Path,
    target: &Path,
    opts: &ExtractOptions,
    force: bool,
    dry_run: bool,
) -> HoistResult<ExtractResponse> {
    let (source_text, listing) = load_inputs(source, listing, force)?;
    let target_text = read_text(target)?;
    let doc = Document::parse(&source_text);

    let outcome = extract(&doc, &listing, &target_text, opts)?;
    let extracted = outcome.extracted().to_vec();

    let Some(content) = outcome.content() else {
        return Ok(ExtractResponse::new(display(target), extracted, false, false));
    };

    if dry_run {
        let diff = unified_diff(&display(target), &target_text, content);
        return Ok(ExtractResponse::new(display(target), extracted, true, false).with_diff(diff));
    }

    atomic_write(target, content)?;
    Ok(ExtractResponse::new(display(target), extracted, true, true))
}

// ============================================================================
// Rewrite
// ============================================================================

/// Remove the listed methods from `source` and apply the anchored edits.
pub fn run_rewrite(
    source: &Path,
    listing: &Path,
    opts: &RewriteOptions,
    force: bool,
    dry_run: bool,
) -> HoistResult<RewriteResponse> {
    let (source_text, listing) = load_inputs(source, listing, force)?;
    let doc = Document::parse(&source_text);

    let outcome = rewrite(&doc, &listing, opts)?;

    if dry_run {
        let diff = unified_diff(&display(source), &source_text, &outcome.content);
        return Ok(RewriteResponse::new(display(source), &outcome, false).with_diff(diff));
    }

    atomic_write(source, &outcome.content)?;
    Ok(RewriteResponse::new(display(source), &outcome, true))
}

// ============================================================================
// Run
// ============================================================================

/// Scan, extract and rewrite in one pass using the paths in `config`.
///
/// When the target has no placeholder nothing is written at all, so running
/// twice does not delete methods from the source a second time.
pub fn run_all(config: &RelocationConfig, dry_run: bool) -> HoistResult<RunResponse> {
    let source_text = read_text(&config.source)?;
    let target_text = read_text(&config.target)?;

    let outcome = Relocation::run(&source_text, &target_text, config)?;

    let source_name = display(&config.source);
    let target_name = display(&config.target);
    let extracted = outcome.extract.extracted().to_vec();
    let mut files_written = Vec::new();

    let (extract_response, rewrite_response) = match outcome.extract.content() {
        None => {
            warn!(target = %target_name, "placeholder not found; no files written");
            (
                ExtractResponse::new(target_name, extracted, false, false),
                RewriteResponse::new(source_name, &outcome.rewrite, false),
            )
        }
        Some(target_content) if dry_run => (
            ExtractResponse::new(target_name.clone(), extracted, true, false)
                .with_diff(unified_diff(&target_name, &target_text, target_content)),
            RewriteResponse::new(source_name.clone(), &outcome.rewrite, false).with_diff(
                unified_diff(&source_name, &source_text, &outcome.rewrite.content),
            ),
        ),
        Some(target_content) => {
            atomic_write(&config.target, target_content)?;
            files_written.push(target_name.clone());
            atomic_write(&config.source, &outcome.rewrite.content)?;
            files_written.push(source_name.clone());
            (
                ExtractResponse::new(target_name, extracted, true, true),
                RewriteResponse::new(source_name, &outcome.rewrite, true),
            )
        }
    };

    Ok(RunResponse::new(
        outcome.listing.handlers,
        extract_response,
        rewrite_response,
        files_written,
    ))
}

// ============================================================================
// Tests
// ============================================================================

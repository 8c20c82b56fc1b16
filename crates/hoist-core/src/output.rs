//! CLI response types.
//!
//! Every response serializes with `status` as its first field followed by
//! `schema_version`. The same responses render as short human-readable
//! summaries for the default text format.

use std::fmt::Write as _;
use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::error::{HoistError, OutputErrorCode};
use crate::listing::HandlerDescriptor;
use crate::rewrite::{EditReport, EditStatus, RewriteOutcome};
use crate::scan::{OpenMethod, ScanReport};

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

/// Human-readable rendering of a response.
pub trait TextSummary {
    fn text_summary(&self) -> String;
}

// ============================================================================
// Scan
// ============================================================================

/// Response for `hoist scan`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResponse {
    pub status: String,
    pub schema_version: String,
    /// Path the listing was written to.
    pub listing: String,
    pub brace_mode: String,
    pub total_lines: usize,
    pub handlers: Vec<HandlerDescriptor>,
    pub abandoned: Vec<OpenMethod>,
    pub unterminated: Option<OpenMethod>,
    pub written: bool,
}

impl ScanResponse {
    pub fn new(listing: impl Into<String>, report: ScanReport, written: bool) -> Self {
        ScanResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            listing: listing.into(),
            brace_mode: report.brace_mode.as_str().to_string(),
            total_lines: report.total_lines,
            handlers: report.handlers,
            abandoned: report.abandoned,
            unterminated: report.unterminated,
            written,
        }
    }
}

impl TextSummary for ScanResponse {
    fn text_summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Found {} state handlers:", self.handlers.len());
        for h in &self.handlers {
            let _ = writeln!(out, "  - {}: lines {}-{}", h.name, h.start, h.end);
        }
        for m in &self.abandoned {
            let _ = writeln!(
                out,
                "  ! {} (line {}) abandoned before its body closed",
                m.name, m.start
            );
        }
        if let Some(m) = &self.unterminated {
            let _ = writeln!(out, "  ! {} (line {}) never closed", m.name, m.start);
        }
        if self.written {
            let _ = writeln!(out, "\nHandler info saved to {}", self.listing);
        }
        out
    }
}

// ============================================================================
// Extract
// ============================================================================

/// Response for `hoist extract`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractResponse {
    pub status: String,
    pub schema_version: String,
    pub target: String,
    pub extracted: Vec<String>,
    pub placeholder_found: bool,
    pub written: bool,
    /// Unified diff of the target (present with `--dry-run`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

impl ExtractResponse {
    pub fn new(
        target: impl Into<String>,
        extracted: Vec<String>,
        placeholder_found: bool,
        written: bool,
    ) -> Self {
        ExtractResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            target: target.into(),
            extracted,
            placeholder_found,
            written,
            diff: None,
        }
    }

    pub fn with_diff(mut self, diff: String) -> Self {
        self.diff = Some(diff);
        self
    }
}

impl TextSummary for ExtractResponse {
    fn text_summary(&self) -> String {
        let mut out = String::new();
        if let Some(diff) = &self.diff {
            out.push_str(diff);
        }
        if !self.placeholder_found {
            let _ = writeln!(
                out,
                "Placeholder not found in {}; nothing extracted",
                self.target
            );
            return out;
        }
        let _ = writeln!(
            out,
            "Extracted {} handlers to {}",
            self.extracted.len(),
            self.target
        );
        let _ = writeln!(out, "Handlers extracted:");
        for name in &self.extracted {
            let _ = writeln!(out, "  - {}", name);
        }
        out
    }
}

// ============================================================================
// Rewrite
// ============================================================================

/// Response for `hoist rewrite`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteResponse {
    pub status: String,
    pub schema_version: String,
    pub source: String,
    pub removed: Vec<String>,
    pub lines_before: usize,
    pub lines_removed: usize,
    pub lines_after: usize,
    pub edits: Vec<EditReport>,
    pub written: bool,
    /// Unified diff of the source (present with `--dry-run`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

impl RewriteResponse {
    pub fn new(source: impl Into<String>, outcome: &RewriteOutcome, written: bool) -> Self {
        RewriteResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            source: source.into(),
            removed: outcome.removed.clone(),
            lines_before: outcome.lines_before,
            lines_removed: outcome.lines_removed,
            lines_after: outcome.lines_after,
            edits: outcome.edits.clone(),
            written,
            diff: None,
        }
    }

    pub fn with_diff(mut self, diff: String) -> Self {
        self.diff = Some(diff);
        self
    }
}

impl TextSummary for RewriteResponse {
    fn text_summary(&self) -> String {
        let mut out = String::new();
        if let Some(diff) = &self.diff {
            out.push_str(diff);
        }
        if self.written {
            let _ = writeln!(out, "{} updated successfully!", self.source);
        }
        let _ = writeln!(out, "Removed {} handler methods", self.removed.len());
        let _ = writeln!(
            out,
            "Lines: {} -> {} ({} removed)",
            self.lines_before, self.lines_after, self.lines_removed
        );
        write_edit_lines(&mut out, &self.edits);
        out
    }
}

fn write_edit_lines(out: &mut String, edits: &[EditReport]) {
    for edit in edits {
        let status = match &edit.status {
            EditStatus::Applied => "applied".to_string(),
            EditStatus::AnchorNotFound => "skipped: anchor not found".to_string(),
            EditStatus::Ambiguous { matches } => {
                format!("skipped: anchor matched {} times", matches)
            }
            EditStatus::BodyNotClosed => "skipped: method body not closed".to_string(),
        };
        let _ = writeln!(out, "  - {}: {}", edit.label, status);
    }
}

// ============================================================================
// Run
// ============================================================================

/// Response for `hoist run`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResponse {
    pub status: String,
    pub schema_version: String,
    pub handlers: Vec<HandlerDescriptor>,
    pub extract: ExtractResponse,
    pub rewrite: RewriteResponse,
    /// Files actually written, in write order.
    pub files_written: Vec<String>,
}

impl RunResponse {
    pub fn new(
        handlers: Vec<HandlerDescriptor>,
        extract: ExtractResponse,
        rewrite: RewriteResponse,
        files_written: Vec<String>,
    ) -> Self {
        RunResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            handlers,
            extract,
            rewrite,
            files_written,
        }
    }
}

impl TextSummary for RunResponse {
    fn text_summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Found {} state handlers", self.handlers.len());
        out.push_str(&self.extract.text_summary());
        out.push_str(&self.rewrite.text_summary());
        out
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error details for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code, also used as the process exit code.
    pub code: u8,
    pub message: String,
    /// Error-specific structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorInfo {
    pub fn from_error(err: &HoistError) -> Self {
        let details = match err {
            HoistError::MalformedListing {
                line,
                content,
                reason,
            } => Some(serde_json::json!({
                "line": line,
                "content": content,
                "reason": reason,
            })),
            HoistError::StaleListing { expected, actual } => Some(serde_json::json!({
                "expected": expected,
                "actual": actual,
            })),
            HoistError::RangeOutOfBounds {
                name,
                start,
                end,
                line_count,
            } => Some(serde_json::json!({
                "name": name,
                "start": start,
                "end": end,
                "line_count": line_count,
            })),
            HoistError::AnchorNotFound { label, .. } => Some(serde_json::json!({ "label": label })),
            HoistError::PatchConflict {
                conflicts,
                positions,
            } => {
                let positions: Vec<serde_json::Value> = positions
                    .iter()
                    .map(|(line, col)| serde_json::json!({ "line": line, "col": col }))
                    .collect();
                serde_json::to_value(conflicts).ok().map(|c| {
                    serde_json::json!({
                        "conflicts": c,
                        "positions": positions,
                    })
                })
            }
            _ => None,
        };
        ErrorInfo {
            code: OutputErrorCode::from(err).code(),
            message: err.to_string(),
            details,
        }
    }
}

/// Response emitted on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub schema_version: String,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    pub fn from_error(err: &HoistError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

// ============================================================================
// Emission
// ============================================================================

/// Emit a response as pretty-printed JSON.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

// ============================================================================
// Tests
// ============================================================================

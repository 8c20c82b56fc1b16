//! Rewriter: remove relocated methods from the source and wire in the new
//! collaborator.
//!
//! All changes are expressed as one [`PatchSet`] against the original
//! source text:
//!
//! - each relocated method's lines become a `Delete` edit
//! - `insert_after` / `insert_before` edits resolve a literal anchor
//! - `replace_method` locates a declaration by regex and replaces the whole
//!   method through its structurally matching closing brace
//!
//! Anchors are resolved as if the deletions had already happened: an
//! occurrence inside a deleted method does not count.

use std::collections::BTreeSet;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{HoistError, HoistResult};
use crate::extract::DEFAULT_EXCEPTION;
use crate::lexer::{find_body_open, find_matching_close};
use crate::listing::Listing;
use crate::patch::{resolve_literal, AnchorResolution, Edit, PatchSet, Span};
use crate::text::{byte_offset_to_position, line_count, Document};

// ============================================================================
// Default Edits
// ============================================================================

const NLP_IMPORT: &str = "import { NLPRouter } from '../routing/NLPRouter.js';";
const STATE_IMPORT: &str = "\nimport { StateRouter } from '../routing/StateRouter.js';";

const NLP_FIELD: &str = "  private nlpRouter: NLPRouter;";
const STATE_FIELD: &str = "\n  private stateRouter: StateRouter;";

const MENU_CALLBACK_COMMENT: &str = "    // Set callback for showing menu after authentication";
const STATE_ROUTER_INIT: &str = "    // Initialize StateRouter with required dependencies
    this.stateRouter = new StateRouter(
      stateManager,
      eventService,
      reminderService,
      taskService,
      settingsService,
      this.commandRouter,
      this.sendMessage.bind(this),
      this.reactToLastMessage.bind(this)
    );

";

const HANDLE_STATE_DECLARATION: &str = r"(?m)^  private async handleStateMessage\(";
const HANDLE_STATE_DELEGATE: &str = "  private async handleStateMessage(
    phone: string,
    userId: string,
    state: ConversationState,
    text: string
  ): Promise<void> {
    // Handle MAIN_MENU state here (not delegated to StateRouter)
    if (state === ConversationState.IDLE || state === ConversationState.MAIN_MENU) {
      await this.handleMainMenuChoice(phone, userId, text);
      return;
    }

    // Delegate all other states to StateRouter
    await this.stateRouter.handleStateMessage(phone, userId, state, text);
  }";

// ============================================================================
// Anchored Edits
// ============================================================================

/// A change to make in the source after the relocated methods are removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnchorEdit {
    /// Insert `text` immediately after the literal `anchor`.
    InsertAfter {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        anchor: String,
        text: String,
    },
    /// Insert `text` immediately before the literal `anchor`.
    InsertBefore {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        anchor: String,
        text: String,
    },
    /// Replace the method whose declaration matches the `declaration` regex.
    ReplaceMethod {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        declaration: String,
        text: String,
    },
}

impl AnchorEdit {
    /// Label used in reports and logs.
    pub fn label(&self) -> String {
        match self {
            AnchorEdit::InsertAfter { label, anchor, .. } => label
                .clone()
                .unwrap_or_else(|| format!("insert after {:?}", anchor)),
            AnchorEdit::InsertBefore { label, anchor, .. } => label
                .clone()
                .unwrap_or_else(|| format!("insert before {:?}", anchor)),
            AnchorEdit::ReplaceMethod {
                label, declaration, ..
            } => label
                .clone()
                .unwrap_or_else(|| format!("replace method /{}/", declaration)),
        }
    }

    /// The four edits that hand state handling over to `StateRouter`.
    pub fn state_router_defaults() -> Vec<AnchorEdit> {
        vec![
            AnchorEdit::InsertAfter {
                label: Some("import StateRouter".to_string()),
                anchor: NLP_IMPORT.to_string(),
                text: STATE_IMPORT.to_string(),
            },
            AnchorEdit::InsertAfter {
                label: Some("stateRouter field".to_string()),
                anchor: NLP_FIELD.to_string(),
                text: STATE_FIELD.to_string(),
            },
            AnchorEdit::InsertBefore {
                label: Some("construct StateRouter".to_string()),
                anchor: MENU_CALLBACK_COMMENT.to_string(),
                text: STATE_ROUTER_INIT.to_string(),
            },
            AnchorEdit::ReplaceMethod {
                label: Some("delegate handleStateMessage".to_string()),
                declaration: HANDLE_STATE_DECLARATION.to_string(),
                text: HANDLE_STATE_DELEGATE.to_string(),
            },
        ]
    }
}

/// Options for the rewrite step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteOptions {
    /// Method kept in the source even though it is listed.
    pub exception: String,
    pub edits: Vec<AnchorEdit>,
    /// Fail instead of skipping when an anchor does not resolve.
    pub strict: bool,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        RewriteOptions {
            exception: DEFAULT_EXCEPTION.to_string(),
            edits: AnchorEdit::state_router_defaults(),
            strict: false,
        }
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// What happened to one anchored edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EditStatus {
    Applied,
    AnchorNotFound,
    Ambiguous { matches: usize },
    /// The declaration matched but its body never closed.
    BodyNotClosed,
}

impl EditStatus {
    fn describe(&self) -> String {
        match self {
            EditStatus::Applied => "applied".to_string(),
            EditStatus::AnchorNotFound => "was not found".to_string(),
            EditStatus::Ambiguous { matches } => format!("matched {} times", matches),
            EditStatus::BodyNotClosed => "has no closed method body".to_string(),
        }
    }
}

/// Report line for one anchored edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditReport {
    pub label: String,
    #[serde(flatten)]
    pub status: EditStatus,
}

/// Result of the rewrite step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutcome {
    /// The rewritten source text.
    pub content: String,
    /// Names of the methods whose lines were deleted.
    pub removed: Vec<String>,
    pub lines_before: usize,
    /// Distinct source lines deleted.
    pub lines_removed: usize,
    pub lines_after: usize,
    pub edits: Vec<EditReport>,
}

impl RewriteOutcome {
    pub fn applied_count(&self) -> usize {
        self.edits
            .iter()
            .filter(|e| e.status == EditStatus::Applied)
            .count()
    }
}

// ============================================================================
// Rewrite
// ============================================================================

/// Build and apply the rewrite patch for `source`.
pub fn rewrite(
    source: &Document,
    listing: &Listing,
    opts: &RewriteOptions,
) -> HoistResult<RewriteOutcome> {
    listing.check_bounds(source.line_count())?;
    let content = source.to_text();

    let (relocated, _kept) = listing.partition(&opts.exception);
    let removed: Vec<String> = relocated.iter().map(|h| h.name.clone()).collect();

    let doomed: BTreeSet<usize> = relocated.iter().flat_map(|h| h.start..=h.end).collect();
    let deleted_spans = line_runs(&doomed)
        .into_iter()
        .map(|(start, end)| {
            source
                .lines_span(start, end)
                .ok_or_else(|| HoistError::internal(format!("lines {}-{} vanished", start, end)))
        })
        .collect::<HoistResult<Vec<Span>>>()?;

    let mut patch = PatchSet::new();
    for span in &deleted_spans {
        let id = patch.next_id();
        patch.push(Edit::delete(id, *span).with_label("remove relocated lines"));
    }

    let mut reports = Vec::with_capacity(opts.edits.len());
    for anchor_edit in &opts.edits {
        let label = anchor_edit.label();
        let status = match resolve_edit(&content, anchor_edit, &deleted_spans)? {
            Ok(edit) => {
                let id = patch.next_id();
                patch.push(Edit { id, ..edit }.with_label(label.clone()));
                EditStatus::Applied
            }
            Err(status) => status,
        };

        if status != EditStatus::Applied {
            if opts.strict {
                return Err(HoistError::AnchorNotFound {
                    label,
                    reason: status.describe(),
                });
            }
            warn!(edit = %label, status = %status.describe(), "anchored edit skipped");
        }
        reports.push(EditReport { label, status });
    }

    let rewritten = patch
        .apply(&content)
        .map_err(|conflicts| {
            let positions = conflicts
                .iter()
                .map(|c| byte_offset_to_position(&content, c.offset()))
                .collect();
            HoistError::PatchConflict {
                conflicts,
                positions,
            }
        })?;

    let outcome = RewriteOutcome {
        lines_before: source.line_count(),
        lines_removed: doomed.len(),
        lines_after: line_count(&rewritten),
        content: rewritten,
        removed,
        edits: reports,
    };
    info!(
        removed = outcome.removed.len(),
        lines_removed = outcome.lines_removed,
        edits_applied = outcome.applied_count(),
        "rewrote source"
    );
    Ok(outcome)
}

/// Collapse sorted line indices into inclusive `(start, end)` runs.
fn line_runs(lines: &BTreeSet<usize>) -> Vec<(usize, usize)> {
    let mut runs: Vec<(usize, usize)> = Vec::new();
    for &line in lines {
        match runs.last_mut() {
            Some((_, end)) if *end + 1 == line => *end = line,
            _ => runs.push((line, line)),
        }
    }
    runs
}

/// Resolve one anchored edit to a concrete edit, or the reason it cannot apply.
///
/// The outer `Result` carries configuration errors (bad regex); the inner one
/// carries resolution failures, which are reportable.
fn resolve_edit(
    content: &str,
    edit: &AnchorEdit,
    deleted: &[Span],
) -> HoistResult<Result<Edit, EditStatus>> {
    let surviving = |span: &Span| !deleted.iter().any(|d| d.contains(span));

    let resolved = match edit {
        AnchorEdit::InsertAfter { anchor, text, .. } => {
            resolve_surviving_literal(content, anchor, surviving)
                .map(|span| Edit::insert(0, span.end, text.clone()))
        }
        AnchorEdit::InsertBefore { anchor, text, .. } => {
            resolve_surviving_literal(content, anchor, surviving)
                .map(|span| Edit::insert(0, span.start, text.clone()))
        }
        AnchorEdit::ReplaceMethod {
            declaration, text, ..
        } => {
            let regex = Regex::new(declaration)
                .map_err(|e| HoistError::invalid_pattern(declaration.clone(), &e))?;
            let matches: Vec<Span> = regex
                .find_iter(content)
                .map(|m| Span::new(m.start(), m.end()))
                .filter(|s| surviving(s))
                .collect();
            match matches.as_slice() {
                [] => Err(EditStatus::AnchorNotFound),
                [only] => method_span(content, *only)
                    .map(|span| Edit::replace(0, span, text.clone()))
                    .ok_or(EditStatus::BodyNotClosed),
                many => Err(EditStatus::Ambiguous {
                    matches: many.len(),
                }),
            }
        }
    };

    Ok(resolved)
}

fn resolve_surviving_literal(
    content: &str,
    anchor: &str,
    surviving: impl Fn(&Span) -> bool,
) -> Result<Span, EditStatus> {
    let candidates = match resolve_literal(content, anchor) {
        AnchorResolution::Resolved(span) => vec![span],
        AnchorResolution::Ambiguous { matches } => matches,
        AnchorResolution::NotFound => Vec::new(),
    };
    let live: Vec<Span> = candidates.into_iter().filter(|s| surviving(s)).collect();
    match live.as_slice() {
        [] => Err(EditStatus::AnchorNotFound),
        [only] => Ok(*only),
        many => Err(EditStatus::Ambiguous {
            matches: many.len(),
        }),
    }
}

/// Span from the declaration match through the matching closing brace.
fn method_span(content: &str, declaration: Span) -> Option<Span> {
    let open = find_body_open(content, declaration.start)?;
    let close = find_matching_close(content, open)?;
    Some(Span::new(declaration.start, close + 1))
}

// ============================================================================
// Tests
// ============================================================================

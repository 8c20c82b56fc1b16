//! Scanner: locate method declarations and the lines their bodies span.
//!
//! The scanner walks a [`Document`] line by line. A line matching the
//! [`DeclarationMatcher`] starts a method; a [`BraceCounter`] then tracks
//! nesting until the depth returns to zero after at least one opening brace.
//! The closing line ends the method and a [`HandlerDescriptor`] is recorded.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{HoistError, HoistResult};
use crate::lexer::BraceMode;
use crate::listing::HandlerDescriptor;
use crate::text::Document;

/// Declaration prefix used when no explicit pattern is configured.
pub const DEFAULT_DECLARATION: &str = "  private async ";

/// Method name prefixes relocated by default.
pub const DEFAULT_PREFIXES: &[&str] = &[
    "handleEvent",
    "handleReminder",
    "handleTask",
    "handleSettings",
    "handleState",
    "handleAdding",
    "handleListing",
    "handleMarking",
    "handleDeleting",
    "handleUpdating",
    "handleBulk",
];

// ============================================================================
// Declaration Matching
// ============================================================================

/// Recognizes method declaration lines and extracts the method name.
#[derive(Debug, Clone)]
pub struct DeclarationMatcher {
    regex: Regex,
}

impl DeclarationMatcher {
    /// Build a matcher for `<declaration><prefix>...(` lines.
    ///
    /// The declaration text and prefixes are matched literally. The name is
    /// the prefix followed by any identifier characters.
    pub fn from_prefixes(declaration: &str, prefixes: &[String]) -> HoistResult<Self> {
        if prefixes.is_empty() {
            return Err(HoistError::invalid_args(
                "at least one method name prefix is required",
            ));
        }
        let alternatives = prefixes
            .iter()
            .map(|p| regex::escape(p))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = format!(
            r"^{}(?P<name>(?:{})[\w$]*)\s*\(",
            regex::escape(declaration),
            alternatives
        );
        Self::from_pattern(&pattern)
    }

    /// Build a matcher from a raw regular expression.
    ///
    /// The pattern must contain a capture group named `name`.
    pub fn from_pattern(pattern: &str) -> HoistResult<Self> {
        let regex = Regex::new(pattern).map_err(|e| HoistError::invalid_pattern(pattern, &e))?;
        if !regex.capture_names().any(|n| n == Some("name")) {
            return Err(HoistError::InvalidPattern {
                pattern: pattern.to_string(),
                message: "pattern must define a capture group named `name`".to_string(),
            });
        }
        Ok(DeclarationMatcher { regex })
    }

    /// Return the declared method name if `line` is a declaration.
    pub fn match_line<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.regex
            .captures(line)
            .and_then(|caps| caps.name("name"))
            .map(|m| m.as_str())
    }
}

impl Default for DeclarationMatcher {
    fn default() -> Self {
        let prefixes: Vec<String> = DEFAULT_PREFIXES.iter().map(|p| p.to_string()).collect();
        // The default declaration and prefixes are fixed literals and always compile.
        match DeclarationMatcher::from_prefixes(DEFAULT_DECLARATION, &prefixes) {
            Ok(matcher) => matcher,
            Err(err) => unreachable!("default declaration pattern is invalid: {}", err),
        }
    }
}

// ============================================================================
// Scan Report
// ============================================================================

/// A method whose tracking stopped before its body closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenMethod {
    pub name: String,
    pub start: usize,
    /// Brace depth when tracking stopped.
    pub depth: isize,
}

/// Everything the scanner found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Closed methods in file order.
    pub handlers: Vec<HandlerDescriptor>,
    /// Methods dropped because another declaration started before they closed.
    pub abandoned: Vec<OpenMethod>,
    /// Method still open at end of file, if any.
    pub unterminated: Option<OpenMethod>,
    /// Number of lines in the scanned document.
    pub total_lines: usize,
    pub brace_mode: BraceMode,
}

struct Tracking {
    name: String,
    start: usize,
    depth: isize,
    seen_open: bool,
}

impl Tracking {
    fn into_open(self) -> OpenMethod {
        OpenMethod {
            name: self.name,
            start: self.start,
            depth: self.depth,
        }
    }
}

// ============================================================================
// Scan
// ============================================================================

/// Scan `doc` for declarations and record each method's line range.
///
/// The counter starts with the declaration line's own braces, so a method
/// declared and closed on one line is recorded with `start == end`.
pub fn scan(doc: &Document, matcher: &DeclarationMatcher, mode: BraceMode) -> ScanReport {
    let mut counter = mode.counter();
    let mut handlers = Vec::new();
    let mut abandoned = Vec::new();
    let mut current: Option<Tracking> = None;

    for (index, line) in doc.lines().enumerate() {
        let braces = counter.count_line(line);

        if let Some(name) = matcher.match_line(line) {
            if let Some(open) = current.take() {
                warn!(
                    name = %open.name,
                    start = open.start,
                    restarted_at = index,
                    "declaration found before previous method closed; abandoning it"
                );
                abandoned.push(open.into_open());
            }
            current = Some(Tracking {
                name: name.to_string(),
                start: index,
                depth: 0,
                seen_open: false,
            });
        }

        let Some(tracking) = current.as_mut() else {
            continue;
        };
        tracking.depth += braces.delta();
        tracking.seen_open |= braces.opens > 0;

        if tracking.seen_open && tracking.depth == 0 {
            let descriptor = HandlerDescriptor::new(tracking.name.clone(), tracking.start, index);
            debug!(
                name = %descriptor.name,
                start = descriptor.start,
                end = descriptor.end,
                "found handler"
            );
            handlers.push(descriptor);
            current = None;
        }
    }

    let unterminated = current.map(|open| {
        warn!(
            name = %open.name,
            start = open.start,
            depth = open.depth,
            "method still open at end of file; not recorded"
        );
        open.into_open()
    });

    info!(
        handlers = handlers.len(),
        lines = doc.line_count(),
        mode = mode.as_str(),
        "scan complete"
    );

    ScanReport {
        handlers,
        abandoned,
        unterminated,
        total_lines: doc.line_count(),
        brace_mode: mode,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const TOY_SOURCE: &str = "\
class Router {
  private async handleEventFoo(phone: string): Promise<void> {
    await this.send(phone, 'foo');
  }

  private async handleStateMessage(phone: string): Promise<void> {
    await this.route(phone);
  }
}
";

    fn scan_default(source: &str, mode: BraceMode) -> ScanReport {
        scan(&Document::parse(source), &DeclarationMatcher::default(), mode)
    }

    mod matcher_tests {
        use super::*;

        #[test]
        fn default_matches_prefixed_declaration() {
            let matcher = DeclarationMatcher::default();
            assert_eq!(
                matcher.match_line("  private async handleTaskCreate(phone: string) {"),
                Some("handleTaskCreate")
            );
            assert_eq!(
                matcher.match_line("  private async handleState(x) {"),
                Some("handleState")
            );
        }

        #[test]
        fn default_rejects_other_methods() {
            let matcher = DeclarationMatcher::default();
            assert_eq!(matcher.match_line("  private async sendMessage(x) {"), None);
            assert_eq!(matcher.match_line("  public async handleEventFoo(x) {"), None);
            assert_eq!(matcher.match_line("    private async handleEventFoo(x) {"), None);
        }

        #[test]
        fn prefixes_are_literal() {
            let matcher =
                DeclarationMatcher::from_prefixes("fn ", &["on.".to_string()]).unwrap();
            assert_eq!(matcher.match_line("fn on.x()"), Some("on.x"));
            assert_eq!(matcher.match_line("fn onAx()"), None);
        }

        #[test]
        fn empty_prefixes_rejected() {
            let err = DeclarationMatcher::from_prefixes("fn ", &[]).unwrap_err();
            assert_eq!(err.error_code().code(), 2);
        }

        #[test]
        fn pattern_requires_name_group() {
            let err = DeclarationMatcher::from_pattern(r"^fn (\w+)").unwrap_err();
            assert!(matches!(err, HoistError::InvalidPattern { .. }));
            assert!(DeclarationMatcher::from_pattern(r"^fn (?P<name>\w+)").is_ok());
        }

        #[test]
        fn invalid_regex_rejected() {
            let err = DeclarationMatcher::from_pattern("(?P<name>").unwrap_err();
            assert!(matches!(err, HoistError::InvalidPattern { .. }));
        }
    }

    mod scan_tests {
        use super::*;

        #[test]
        fn toy_source_yields_two_descriptors() {
            let report = scan_default(TOY_SOURCE, BraceMode::Lexical);
            assert_eq!(
                report.handlers,
                vec![
                    HandlerDescriptor::new("handleEventFoo", 1, 3),
                    HandlerDescriptor::new("handleStateMessage", 5, 7),
                ]
            );
            assert_eq!(report.total_lines, 9);
            assert!(report.abandoned.is_empty());
            assert!(report.unterminated.is_none());
        }

        #[test]
        fn multi_line_signature() {
            let source = "  private async handleStateMessage(
    phone: string,
    text: string
  ): Promise<void> {
    switch (state) {
      case 1: break;
    }
  }
";
            let report = scan_default(source, BraceMode::Lexical);
            assert_eq!(
                report.handlers,
                vec![HandlerDescriptor::new("handleStateMessage", 0, 7)]
            );
        }

        #[test]
        fn single_line_method() {
            let source = "  private async handleBulkNoop(): Promise<void> { return; }\nother();\n";
            let report = scan_default(source, BraceMode::Lexical);
            assert_eq!(
                report.handlers,
                vec![HandlerDescriptor::new("handleBulkNoop", 0, 0)]
            );
        }

        #[test]
        fn brace_in_string_fools_textual_counter_only() {
            let source = "  private async handleEventLog(x: string) {
    log('}');
    more();
  }
  private async handleTaskDone(x: string) {
    done();
  }
";
            let lexical = scan_default(source, BraceMode::Lexical);
            assert_eq!(
                lexical.handlers,
                vec![
                    HandlerDescriptor::new("handleEventLog", 0, 3),
                    HandlerDescriptor::new("handleTaskDone", 4, 6),
                ]
            );

            let textual = scan_default(source, BraceMode::Textual);
            assert_eq!(
                textual.handlers[0],
                HandlerDescriptor::new("handleEventLog", 0, 1)
            );
        }

        #[test]
        fn new_declaration_abandons_open_method() {
            let source = "  private async handleEventA(x) {
    if (x) {
  private async handleEventB(y) {
  }
";
            let report = scan_default(source, BraceMode::Lexical);
            assert_eq!(report.abandoned.len(), 1);
            assert_eq!(report.abandoned[0].name, "handleEventA");
            assert_eq!(
                report.handlers,
                vec![HandlerDescriptor::new("handleEventB", 2, 3)]
            );
        }

        #[test]
        fn unterminated_method_not_recorded() {
            let source = "  private async handleEventA(x) {\n    work();\n";
            let report = scan_default(source, BraceMode::Lexical);
            assert!(report.handlers.is_empty());
            let open = report.unterminated.unwrap();
            assert_eq!(open.name, "handleEventA");
            assert_eq!(open.depth, 1);
        }

        #[test]
        fn ranges_are_valid_and_ordered() {
            let report = scan_default(TOY_SOURCE, BraceMode::Lexical);
            let mut previous_end: Option<usize> = None;
            for h in &report.handlers {
                assert!(h.start <= h.end);
                assert!(h.end < report.total_lines);
                if let Some(prev) = previous_end {
                    assert!(h.start > prev);
                }
                previous_end = Some(h.end);
            }
        }

        #[test]
        fn empty_document_has_no_handlers() {
            let report = scan_default("", BraceMode::Lexical);
            assert!(report.handlers.is_empty());
            assert_eq!(report.total_lines, 0);
        }
    }
}

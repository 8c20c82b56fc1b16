//! Structural delimiter lexer for C-family and TypeScript sources.
//!
//! The scanner needs to know where a method body ends. Counting every `{`
//! and `}` character goes wrong as soon as a brace sits inside a string, a
//! comment, a template literal or a regular expression. [`Lexer`] tracks
//! those contexts and reports only the delimiters that belong to code.
//!
//! Recognized contexts:
//!
//! - `// line` and `/* block */` comments
//! - `'single'` and `"double"` quoted strings with backslash escapes
//! - `` `template` `` literals, including nested `${ ... }` interpolations
//! - `/regex/` literals, detected by the preceding token
//!
//! State carries across calls to [`Lexer::feed`], so a block comment or a
//! template literal may span many lines.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A structural delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delim {
    OpenBrace,
    CloseBrace,
    OpenParen,
    CloseParen,
}

/// A delimiter and its byte offset within the text passed to the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelimToken {
    pub offset: usize,
    pub delim: Delim,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    LineComment,
    BlockComment,
    Quoted(char),
    Template,
    Regex { in_class: bool },
}

/// Keywords after which a `/` starts a regular expression, not a division.
const REGEX_PRECEDING_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "case", "do", "else", "in", "of", "new", "delete", "void",
    "throw", "yield", "await",
];

/// Incremental lexer that reports structural delimiters.
#[derive(Debug, Clone)]
pub struct Lexer {
    mode: Mode,
    /// Brace depth inside each open `${ ... }` interpolation, innermost last.
    interpolations: Vec<usize>,
    escaped: bool,
    regex_allowed: bool,
    word: String,
}

impl Default for Lexer {
    fn default() -> Self {
        Lexer::new()
    }
}

impl Lexer {
    pub fn new() -> Self {
        Lexer {
            mode: Mode::Code,
            interpolations: Vec::new(),
            escaped: false,
            regex_allowed: true,
            word: String::new(),
        }
    }

    /// Lex `text`, returning its structural delimiters in order.
    pub fn feed(&mut self, text: &str) -> Vec<DelimToken> {
        let mut tokens = Vec::new();
        let mut chars = text.char_indices().peekable();

        while let Some((offset, ch)) = chars.next() {
            let next = chars.peek().map(|&(_, c)| c);

            match self.mode {
                Mode::LineComment => {
                    if ch == '\n' {
                        self.mode = Mode::Code;
                    }
                }
                Mode::BlockComment => {
                    if ch == '*' && next == Some('/') {
                        chars.next();
                        self.mode = Mode::Code;
                    }
                }
                Mode::Quoted(quote) => {
                    if self.escaped {
                        self.escaped = false;
                    } else if ch == '\\' {
                        self.escaped = true;
                    } else if ch == quote || ch == '\n' {
                        self.mode = Mode::Code;
                        self.regex_allowed = false;
                    }
                }
                Mode::Template => {
                    if self.escaped {
                        self.escaped = false;
                    } else if ch == '\\' {
                        self.escaped = true;
                    } else if ch == '`' {
                        self.mode = Mode::Code;
                        self.regex_allowed = false;
                    } else if ch == '$' && next == Some('{') {
                        chars.next();
                        self.interpolations.push(0);
                        self.mode = Mode::Code;
                        self.regex_allowed = true;
                    }
                }
                Mode::Regex { in_class } => {
                    if self.escaped {
                        self.escaped = false;
                    } else if ch == '\\' {
                        self.escaped = true;
                    } else if ch == '\n' {
                        self.mode = Mode::Code;
                    } else if in_class {
                        if ch == ']' {
                            self.mode = Mode::Regex { in_class: false };
                        }
                    } else if ch == '[' {
                        self.mode = Mode::Regex { in_class: true };
                    } else if ch == '/' {
                        self.mode = Mode::Code;
                        self.regex_allowed = false;
                    }
                }
                Mode::Code => {
                    if is_word_char(ch) {
                        self.word.push(ch);
                        continue;
                    }
                    self.finish_word();
                    if let Some(delim) = self.code_char(ch, next, &mut chars) {
                        tokens.push(DelimToken { offset, delim });
                    }
                }
            }
        }

        tokens
    }

    /// Mark the end of a line that was fed without its terminator.
    ///
    /// Line comments and unterminated quoted strings or regexes end here.
    /// Block comments and template literals continue.
    pub fn end_line(&mut self) {
        self.finish_word();
        match self.mode {
            Mode::LineComment | Mode::Quoted(_) | Mode::Regex { .. } => {
                self.mode = Mode::Code;
                self.escaped = false;
            }
            Mode::Code | Mode::BlockComment | Mode::Template => {}
        }
    }

    fn finish_word(&mut self) {
        if !self.word.is_empty() {
            self.regex_allowed = REGEX_PRECEDING_KEYWORDS.contains(&self.word.as_str());
            self.word.clear();
        }
    }

    fn code_char(
        &mut self,
        ch: char,
        next: Option<char>,
        chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    ) -> Option<Delim> {
        match ch {
            c if c.is_whitespace() => None,
            '/' if next == Some('/') => {
                chars.next();
                self.mode = Mode::LineComment;
                None
            }
            '/' if next == Some('*') => {
                chars.next();
                self.mode = Mode::BlockComment;
                None
            }
            '/' if self.regex_allowed => {
                self.mode = Mode::Regex { in_class: false };
                None
            }
            '\'' | '"' => {
                self.mode = Mode::Quoted(ch);
                None
            }
            '`' => {
                self.mode = Mode::Template;
                None
            }
            '{' => {
                if let Some(depth) = self.interpolations.last_mut() {
                    *depth += 1;
                }
                self.regex_allowed = true;
                Some(Delim::OpenBrace)
            }
            '}' => match self.interpolations.last_mut() {
                Some(0) => {
                    self.interpolations.pop();
                    self.mode = Mode::Template;
                    None
                }
                Some(depth) => {
                    *depth -= 1;
                    self.regex_allowed = true;
                    Some(Delim::CloseBrace)
                }
                None => {
                    self.regex_allowed = true;
                    Some(Delim::CloseBrace)
                }
            },
            '(' => {
                self.regex_allowed = true;
                Some(Delim::OpenParen)
            }
            ')' => {
                self.regex_allowed = false;
                Some(Delim::CloseParen)
            }
            ']' => {
                self.regex_allowed = false;
                None
            }
            _ => {
                self.regex_allowed = true;
                None
            }
        }
    }
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

/// Lex a complete text and return its structural delimiters.
pub fn structural_delims(text: &str) -> Vec<DelimToken> {
    Lexer::new().feed(text)
}

/// Offset of the `}` matching the structural `{` at `open_offset`.
///
/// Returns `None` if `open_offset` is not a structural opening brace or the
/// brace is never closed.
pub fn find_matching_close(text: &str, open_offset: usize) -> Option<usize> {
    let braces = structural_delims(text)
        .into_iter()
        .filter(|t| matches!(t.delim, Delim::OpenBrace | Delim::CloseBrace));

    let mut depth: Option<usize> = None;
    for token in braces {
        match (depth, token.delim) {
            (None, Delim::OpenBrace) if token.offset == open_offset => depth = Some(1),
            (None, _) => {}
            (Some(d), Delim::OpenBrace) => depth = Some(d + 1),
            (Some(1), Delim::CloseBrace) => return Some(token.offset),
            (Some(d), _) => depth = Some(d - 1),
        }
    }
    None
}

/// Offset of the first structural `{` at or after `from` that is not nested
/// inside parentheses opened after `from`.
///
/// Used to find the body of a declaration whose parameter list may itself
/// contain braces (default values, destructuring).
pub fn find_body_open(text: &str, from: usize) -> Option<usize> {
    let mut parens = 0usize;
    for token in structural_delims(text)
        .into_iter()
        .filter(|t| t.offset >= from)
    {
        match token.delim {
            Delim::OpenParen => parens += 1,
            Delim::CloseParen => parens = parens.saturating_sub(1),
            Delim::OpenBrace if parens == 0 => return Some(token.offset),
            _ => {}
        }
    }
    None
}

// ============================================================================
// Brace Counting
// ============================================================================

/// Opening and closing braces found on one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineBraces {
    pub opens: usize,
    pub closes: usize,
}

impl LineBraces {
    /// Net change in depth contributed by the line.
    pub fn delta(&self) -> isize {
        self.opens as isize - self.closes as isize
    }
}

/// Counts braces line by line, possibly carrying state between lines.
pub trait BraceCounter {
    /// Count the braces on one line (given without its terminator).
    fn count_line(&mut self, line: &str) -> LineBraces;
}

/// Counts every `{` and `}` character, whatever context it appears in.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextualCounter;

impl BraceCounter for TextualCounter {
    fn count_line(&mut self, line: &str) -> LineBraces {
        LineBraces {
            opens: line.matches('{').count(),
            closes: line.matches('}').count(),
        }
    }
}

/// Counts only structural braces, using [`Lexer`].
#[derive(Debug, Clone, Default)]
pub struct LexicalCounter {
    lexer: Lexer,
}

impl BraceCounter for LexicalCounter {
    fn count_line(&mut self, line: &str) -> LineBraces {
        let mut counts = LineBraces::default();
        for token in self.lexer.feed(line) {
            match token.delim {
                Delim::OpenBrace => counts.opens += 1,
                Delim::CloseBrace => counts.closes += 1,
                Delim::OpenParen | Delim::CloseParen => {}
            }
        }
        self.lexer.end_line();
        counts
    }
}

/// Which brace counter the scanner uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BraceMode {
    /// Count every brace character (the historical behavior).
    Textual,
    /// Skip braces inside strings, comments, templates and regexes.
    #[default]
    Lexical,
}

impl BraceMode {
    /// Create a fresh counter for this mode.
    pub fn counter(self) -> Box<dyn BraceCounter> {
        match self {
            BraceMode::Textual => Box::new(TextualCounter),
            BraceMode::Lexical => Box::new(LexicalCounter::default()),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BraceMode::Textual => "textual",
            BraceMode::Lexical => "lexical",
        }
    }
}

impl FromStr for BraceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "textual" => Ok(BraceMode::Textual),
            "lexical" => Ok(BraceMode::Lexical),
            other => Err(format!(
                "unknown brace mode '{}', expected 'textual' or 'lexical'",
                other
            )),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

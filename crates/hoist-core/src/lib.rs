//! Core library for hoist.
//!
//! hoist relocates a family of methods from one TypeScript class file into
//! another in three steps:
//! - Scanner: find declarations and the line range of each method body
//! - Extractor: copy the methods into a placeholder in the target class
//! - Rewriter: delete the methods from the source and patch in delegation
//!
//! Supporting modules provide the document model, a structural lexer for
//! brace matching, the span-based patch engine, configuration, JSON output
//! types, diffs and atomic file writes.

pub mod config;
pub mod diff;
pub mod error;
pub mod extract;
pub mod fsutil;
pub mod lexer;
pub mod listing;
pub mod output;
pub mod patch;
pub mod pipeline;
pub mod rewrite;
pub mod scan;
pub mod text;

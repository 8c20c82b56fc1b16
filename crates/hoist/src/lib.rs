//! hoist - relocate a family of methods between TypeScript classes.
//!
//! This crate provides the CLI binary. The steps themselves live in
//! `hoist_core`.
//!
//! ## Modules
//!
//! - `cli` - CLI command implementations

pub mod cli;

// Re-export core types for convenience
pub use hoist_core::config::RelocationConfig;
pub use hoist_core::error::{HoistError, OutputErrorCode};
pub use hoist_core::output::{ErrorInfo, ErrorResponse, SCHEMA_VERSION};

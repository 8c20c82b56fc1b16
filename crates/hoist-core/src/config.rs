//! Relocation configuration.
//!
//! Every field has a default, so an empty JSON object (or no config file at
//! all) reproduces the MessageRouter to StateRouter relocation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{HoistError, HoistResult};
use crate::extract::{
    ExtractOptions, DEFAULT_CLOSING, DEFAULT_EXCEPTION, DEFAULT_PLACEHOLDER,
    DEFAULT_SECTION_HEADER,
};
use crate::fsutil::read_text;
use crate::lexer::BraceMode;
use crate::rewrite::{AnchorEdit, RewriteOptions};
use crate::scan::{DeclarationMatcher, DEFAULT_DECLARATION, DEFAULT_PREFIXES};

pub const DEFAULT_SOURCE: &str = "src/services/MessageRouter.ts";
pub const DEFAULT_TARGET: &str = "src/routing/StateRouter.ts";
pub const DEFAULT_LISTING: &str = "handler_info.txt";

/// Scanner settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Literal text that starts every candidate declaration line.
    pub declaration: String,
    /// Accepted method-name prefixes.
    pub prefixes: Vec<String>,
    /// Full regex with a `name` group; replaces `declaration` and `prefixes`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    pub brace_mode: BraceMode,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            declaration: DEFAULT_DECLARATION.to_string(),
            prefixes: DEFAULT_PREFIXES.iter().map(|p| p.to_string()).collect(),
            pattern: None,
            brace_mode: BraceMode::default(),
        }
    }
}

impl ScanConfig {
    /// Compile the declaration matcher these settings describe.
    pub fn matcher(&self) -> HoistResult<DeclarationMatcher> {
        match &self.pattern {
            Some(pattern) => DeclarationMatcher::from_pattern(pattern),
            None => DeclarationMatcher::from_prefixes(&self.declaration, &self.prefixes),
        }
    }
}

/// Where the relocated section goes in the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub placeholder: String,
    pub section_header: String,
    pub closing: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        ExtractConfig {
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            section_header: DEFAULT_SECTION_HEADER.to_string(),
            closing: DEFAULT_CLOSING.to_string(),
        }
    }
}

/// Edits applied to the source after removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    pub edits: Vec<AnchorEdit>,
    pub strict: bool,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        RewriteConfig {
            edits: AnchorEdit::state_router_defaults(),
            strict: false,
        }
    }
}

/// Complete configuration for one relocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelocationConfig {
    pub source: PathBuf,
    pub target: PathBuf,
    pub listing: PathBuf,
    /// Listed method that stays in the source.
    pub exception: String,
    pub scan: ScanConfig,
    pub extract: ExtractConfig,
    pub rewrite: RewriteConfig,
}

impl Default for RelocationConfig {
    fn default() -> Self {
        RelocationConfig {
            source: PathBuf::from(DEFAULT_SOURCE),
            target: PathBuf::from(DEFAULT_TARGET),
            listing: PathBuf::from(DEFAULT_LISTING),
            exception: DEFAULT_EXCEPTION.to_string(),
            scan: ScanConfig::default(),
            extract: ExtractConfig::default(),
            rewrite: RewriteConfig::default(),
        }
    }
}

impl RelocationConfig {
    /// Load a JSON config file; missing fields take their defaults.
    pub fn load(path: &Path) -> HoistResult<Self> {
        let text = read_text(path)?;
        Self::from_json(&text).map_err(|err| match err {
            HoistError::InvalidArguments { message } => HoistError::invalid_args(format!(
                "{}: {}",
                path.display(),
                message
            )),
            other => other,
        })
    }

    /// Parse config from JSON text.
    pub fn from_json(text: &str) -> HoistResult<Self> {
        let config: RelocationConfig = serde_json::from_str(text)
            .map_err(|e| HoistError::invalid_args(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no step could run with.
    pub fn validate(&self) -> HoistResult<()> {
        if self.exception.is_empty() {
            return Err(HoistError::invalid_args("exception must not be empty"));
        }
        if self.extract.placeholder.is_empty() {
            return Err(HoistError::invalid_args("placeholder text must not be empty"));
        }
        self.scan.matcher().map(|_| ())
    }

    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            exception: self.exception.clone(),
            placeholder: self.extract.placeholder.clone(),
            section_header: self.extract.section_header.clone(),
            closing: self.extract.closing.clone(),
        }
    }

    pub fn rewrite_options(&self) -> RewriteOptions {
        RewriteOptions {
            exception: self.exception.clone(),
            edits: self.rewrite.edits.clone(),
            strict: self.rewrite.strict,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

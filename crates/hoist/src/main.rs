//! Binary entry point for the hoist CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Record handler line ranges
//! hoist scan --source src/services/MessageRouter.ts
//!
//! # Copy the handlers into the target's placeholder
//! hoist extract --target src/routing/StateRouter.ts
//!
//! # Remove them from the source and wire in delegation
//! hoist rewrite
//!
//! # All three steps at once, previewing as diffs
//! hoist run --dry-run
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use hoist::cli::{run_all, run_extract, run_rewrite, run_scan, ConfigResponse};
use hoist_core::config::RelocationConfig;
use hoist_core::error::{HoistError, OutputErrorCode};
use hoist_core::lexer::BraceMode;
use hoist_core::output::{emit_response, ErrorResponse, TextSummary};

// ============================================================================
// CLI Structure
// ============================================================================

/// Relocate a cluster of methods from one TypeScript class into another.
#[derive(Parser, Debug)]
#[command(name = "hoist", version, about = "Relocate methods between TypeScript classes")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// JSON configuration file (defaults apply to anything it omits).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Format of log lines written to stderr.
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Log line format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Output format for command results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable summary (default).
    #[default]
    Text,
    /// Full JSON response.
    Json,
}

/// Brace counting mode for the scanner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum BraceModeArg {
    /// Count every brace character.
    Textual,
    /// Ignore braces in strings, comments, templates and regexes.
    Lexical,
}

impl From<BraceModeArg> for BraceMode {
    fn from(mode: BraceModeArg) -> Self {
        match mode {
            BraceModeArg::Textual => BraceMode::Textual,
            BraceModeArg::Lexical => BraceMode::Lexical,
        }
    }
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Locate handler methods and write the listing.
    Scan {
        /// Source file to scan.
        #[arg(long)]
        source: Option<PathBuf>,
        /// Listing file to write.
        #[arg(long)]
        listing: Option<PathBuf>,
        /// Brace counting mode.
        #[arg(long, value_enum)]
        brace_mode: Option<BraceModeArg>,
    },
    /// Copy listed handlers into the target's placeholder.
    Extract {
        #[arg(long)]
        source: Option<PathBuf>,
        #[arg(long)]
        listing: Option<PathBuf>,
        /// File containing the placeholder.
        #[arg(long)]
        target: Option<PathBuf>,
        /// Use the listing even if the source changed since it was written.
        #[arg(long)]
        force: bool,
        /// Print a diff instead of writing.
        #[arg(long)]
        dry_run: bool,
    },
    /// Remove listed handlers from the source and apply delegation edits.
    Rewrite {
        #[arg(long)]
        source: Option<PathBuf>,
        #[arg(long)]
        listing: Option<PathBuf>,
        /// Use the listing even if the source changed since it was written.
        #[arg(long)]
        force: bool,
        /// Fail if any edit anchor is missing or ambiguous.
        #[arg(long)]
        strict: bool,
        /// Print a diff instead of writing.
        #[arg(long)]
        dry_run: bool,
    },
    /// Scan, extract and rewrite in one step without a listing file.
    Run {
        #[arg(long)]
        source: Option<PathBuf>,
        #[arg(long)]
        target: Option<PathBuf>,
        /// Fail if any edit anchor is missing or ambiguous.
        #[arg(long)]
        strict: bool,
        /// Print diffs instead of writing.
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the effective configuration as JSON.
    Config,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level, cli.global.log_format);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::from_error(&err);

            // Errors go to stdout as JSON regardless of --format.
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel, format: LogFormat) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Load the config file if given, otherwise defaults.
fn load_config(global: &GlobalArgs) -> Result<RelocationConfig, HoistError> {
    match &global.config {
        Some(path) => RelocationConfig::load(path),
        None => Ok(RelocationConfig::default()),
    }
}

/// Print a response in the requested format.
fn emit<T: Serialize + TextSummary>(format: OutputFormat, response: &T) -> Result<(), HoistError> {
    let mut stdout = io::stdout();
    let result = match format {
        OutputFormat::Json => emit_response(response, &mut stdout),
        OutputFormat::Text => write!(stdout, "{}", response.text_summary()),
    };
    result.map_err(|source| HoistError::Io {
        path: "<stdout>".to_string(),
        source,
    })
}

/// Execute the CLI command.
fn execute(cli: Cli) -> Result<(), HoistError> {
    let mut config = load_config(&cli.global)?;
    let format = cli.global.format;

    match cli.command {
        Command::Scan {
            source,
            listing,
            brace_mode,
        } => {
            override_path(&mut config.source, source);
            override_path(&mut config.listing, listing);
            if let Some(mode) = brace_mode {
                config.scan.brace_mode = mode.into();
            }
            let response = run_scan(&config.source, &config.listing, &config.scan)?;
            emit(format, &response)
        }
        Command::Extract {
            source,
            listing,
            target,
            force,
            dry_run,
        } => {
            override_path(&mut config.source, source);
            override_path(&mut config.listing, listing);
            override_path(&mut config.target, target);
            let response = run_extract(
                &config.source,
                &config.listing,
                &config.target,
                &config.extract_options(),
                force,
                dry_run,
            )?;
            emit(format, &response)
        }
        Command::Rewrite {
            source,
            listing,
            force,
            strict,
            dry_run,
        } => {
            override_path(&mut config.source, source);
            override_path(&mut config.listing, listing);
            config.rewrite.strict |= strict;
            let response = run_rewrite(
                &config.source,
                &config.listing,
                &config.rewrite_options(),
                force,
                dry_run,
            )?;
            emit(format, &response)
        }
        Command::Run {
            source,
            target,
            strict,
            dry_run,
        } => {
            override_path(&mut config.source, source);
            override_path(&mut config.target, target);
            config.rewrite.strict |= strict;
            let response = run_all(&config, dry_run)?;
            emit(format, &response)
        }
        Command::Config => {
            let response = ConfigResponse::new(config);
            emit_response(&response, &mut io::stdout()).map_err(|source| HoistError::Io {
                path: "<stdout>".to_string(),
                source,
            })
        }
    }
}

fn override_path(slot: &mut PathBuf, value: Option<PathBuf>) {
    if let Some(path) = value {
        *slot = path;
    }
}

// ============================================================================
// Tests
// ============================================================================

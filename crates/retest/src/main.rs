//! Binary entry point for the retest CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Rewrite every eligible .rs file under src/ in place
//! retest src/
//!
//! # Preview the changes as a unified diff
//! retest --dry-run src/
//!
//! # Placeholder instances, cross-checked against a re-exported API
//! retest --mode placeholder --export-path neptune_cash::api::export src/
//! ```
//!
//! WARNING: without `--dry-run`, files are modified in place.

use std::io::{self, Write};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{Parser, ValueEnum};
use tracing::error;

use retest::cli::{run, RunArgs};
use retest_core::classify::DEFAULT_TEST_FEATURE;
use retest_core::error::{ExitStatus, RetestError};
use retest_core::output::{emit_response, write_text_summary, ErrorResponse};
use retest_core::scaffold::{Codec, InstanceMode};

// ============================================================================
// CLI Structure
// ============================================================================

/// Neutralize existing Rust test code and scaffold serialization tests.
///
/// Every `#[cfg(test)]` block in each `.rs` file under ROOT (except `lib.rs`
/// and `mod.rs`) is wrapped in a block comment, and a `generated_tests`
/// module with one round-trip test per struct/enum is appended.
#[derive(Parser, Debug)]
#[command(name = "retest", version, about = "Neutralize Rust test code and scaffold serialization tests")]
struct Cli {
    /// Root directory to process recursively.
    root: PathBuf,

    /// Print a unified diff instead of writing files.
    #[arg(long)]
    dry_run: bool,

    /// Number of worker threads (default: one per core).
    #[arg(long, short = 'j')]
    jobs: Option<NonZeroUsize>,

    /// How generated tests construct their instance.
    #[arg(long, value_enum, default_value_t = ModeArg::Default)]
    mode: ModeArg,

    /// Serialization codec to round-trip through (repeatable; default: bincode, serde-json).
    #[arg(long = "codec", value_enum)]
    codecs: Vec<CodecArg>,

    /// Rust path re-exporting the same types, for byte-identity cross-checks.
    #[arg(long)]
    export_path: Option<String>,

    /// Feature accepted in `#[cfg(any(test, feature = "..."))]` markers.
    #[arg(long, default_value = DEFAULT_TEST_FEATURE)]
    test_feature: String,

    /// Output format for the run summary.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Log level (overridden by RUST_LOG).
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Emit log events as JSON lines on stderr.
    #[arg(long)]
    log_json: bool,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
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

/// Output format for the run summary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Diffs (in dry runs) and a one-line summary (default).
    #[default]
    Text,
    /// Full JSON summary.
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    /// `T::default()`.
    Default,
    /// `todo!()`, to be completed by hand.
    Placeholder,
}

impl From<ModeArg> for InstanceMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Default => InstanceMode::Default,
            ModeArg::Placeholder => InstanceMode::Placeholder,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum CodecArg {
    Bincode,
    SerdeJson,
    SerdeJsonWasm,
}

impl From<CodecArg> for Codec {
    fn from(codec: CodecArg) -> Self {
        match codec {
            CodecArg::Bincode => Codec::Bincode,
            CodecArg::SerdeJson => Codec::SerdeJson,
            CodecArg::SerdeJsonWasm => Codec::SerdeJsonWasm,
        }
    }
}

impl Cli {
    fn run_args(&self) -> RunArgs {
        RunArgs {
            root: self.root.clone(),
            dry_run: self.dry_run,
            jobs: self.jobs,
            mode: self.mode.into(),
            codecs: self.codecs.iter().copied().map(Codec::from).collect(),
            export_path: self.export_path.clone(),
            test_feature: self.test_feature.clone(),
        }
    }
}

// ============================================================================
// Main
// ============================================================================

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Usage goes to stdout, as do help and version.
            let _ = write!(io::stdout(), "{}", err.render());
            let _ = io::stdout().flush();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(ExitStatus::InvalidArguments.code()),
            };
        }
    };

    init_tracing(cli.log_level, cli.log_json);

    match run(&cli.run_args()) {
        Ok(summary) => {
            let mut stdout = io::stdout();
            let written = match cli.format {
                OutputFormat::Text => write_text_summary(&summary, &mut stdout),
                OutputFormat::Json => emit_response(&summary, &mut stdout),
            };
            let _ = stdout.flush();
            match written {
                Ok(()) => ExitCode::SUCCESS,
                Err(err) => {
                    error!("cannot write summary: {}", err);
                    ExitCode::from(ExitStatus::IoError.code())
                }
            }
        }
        Err(err) => report_error(&err, cli.format),
    }
}

/// Print a run-level error and map it to an exit code.
fn report_error(err: &RetestError, format: OutputFormat) -> ExitCode {
    error!("{}", err);
    match format {
        OutputFormat::Text => {
            let _ = writeln!(io::stdout(), "error: {}", err);
        }
        OutputFormat::Json => {
            let _ = emit_response(&ErrorResponse::new(err), &mut io::stdout());
        }
    }
    let _ = io::stdout().flush();
    ExitCode::from(ExitStatus::from(err).code())
}

/// Initialize tracing with the given log level, writing to stderr.
fn init_tracing(level: LogLevel, json: bool) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

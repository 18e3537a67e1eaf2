//! Core pipeline for retest.
//!
//! This crate rewrites Rust source files in two steps:
//! - Neutralize existing test code by wrapping each `#[cfg(test)]` block in
//!   a block comment, byte for byte
//! - Append a `mod generated_tests` module with one serialization
//!   round-trip test per discovered `struct`/`enum`
//!
//! Modules, leaves first:
//! - `scan` - lexical scanner, delimiter matching, opaque region map
//! - `locate` - type names and declaration sites
//! - `block` - block extraction with preamble absorption
//! - `classify` - test-marker classification
//! - `patch` - rewrite plan and neutralization
//! - `scaffold` - generated test module
//! - `pipeline` - one file, end to end
//! - `workspace`, `batch`, `diff`, `output` - the run over a source tree

pub mod batch;
pub mod block;
pub mod classify;
pub mod diff;
pub mod error;
pub mod locate;
pub mod output;
pub mod patch;
pub mod pipeline;
pub mod scaffold;
pub mod scan;
pub mod text;
pub mod types;
pub mod workspace;

pub use batch::{run_batch, RunOptions, RunSummary};
pub use error::{ConfigError, ExitStatus, RetestError, ScanError};
pub use pipeline::{process_source, FileOutcome, FileReport, Pipeline, PipelineConfig};
pub use scaffold::{Codec, InstanceMode, ScaffoldConfig};
pub use workspace::{FsStore, SourceStore};

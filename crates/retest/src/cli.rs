//! CLI front door.
//!
//! `main.rs` owns argument parsing, logging and exit codes. Everything
//! after parsing lives here so it can be driven from tests without
//! spawning the binary.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use tracing::info;

use retest_core::classify::DEFAULT_TEST_FEATURE;
use retest_core::error::RetestError;
use retest_core::scaffold::{Codec, InstanceMode, ScaffoldConfig};
use retest_core::{run_batch, FsStore, Pipeline, PipelineConfig, RunOptions, RunSummary};

/// Parsed options for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunArgs {
    pub root: PathBuf,
    pub dry_run: bool,
    pub jobs: Option<NonZeroUsize>,
    pub mode: InstanceMode,
    /// Empty means the default codec set.
    pub codecs: Vec<Codec>,
    pub export_path: Option<String>,
    pub test_feature: String,
}

impl RunArgs {
    /// Defaults for everything but the root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        RunArgs {
            root: root.into(),
            dry_run: false,
            jobs: None,
            mode: InstanceMode::default(),
            codecs: Vec::new(),
            export_path: None,
            test_feature: DEFAULT_TEST_FEATURE.to_string(),
        }
    }

    /// Pipeline settings implied by these arguments.
    pub fn pipeline_config(&self) -> PipelineConfig {
        let mut scaffold = ScaffoldConfig {
            instance_mode: self.mode,
            export_path: self.export_path.clone(),
            ..ScaffoldConfig::default()
        };
        if !self.codecs.is_empty() {
            scaffold.codecs = self.codecs.clone();
        }
        PipelineConfig {
            scaffold,
            test_feature: self.test_feature.clone(),
        }
    }
}

/// Validate the arguments and process every file under the root.
///
/// # Errors
///
/// - [`RetestError::RootNotFound`] if the root is missing (checked first,
///   before any configuration is looked at)
/// - [`RetestError::Config`] for a rejected codec set, export path or
///   feature name
///
/// Per-file problems end up in the returned summary.
pub fn run(args: &RunArgs) -> Result<RunSummary, RetestError> {
    if !args.root.is_dir() {
        return Err(RetestError::RootNotFound {
            path: args.root.clone(),
        });
    }

    let pipeline = Pipeline::new(&args.pipeline_config())?;
    info!(
        root = %args.root.display(),
        mode = %args.mode,
        "Rewriting test code in place"
    );

    let options = RunOptions {
        dry_run: args.dry_run,
        jobs: args.jobs.map(NonZeroUsize::get),
    };
    run_batch(&args.root, &pipeline, &FsStore, options)
}

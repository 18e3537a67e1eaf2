//! Batch runner: drives the pipeline over every selected file under a root.
//!
//! Files are independent, so they are processed with a rayon parallel
//! iterator. Each worker owns its file's text and outcome; only the
//! counters in [`Counters`] are shared. A file is written only after its
//! whole pipeline has finished, and a failure on one file never stops the
//! others.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{error, info, info_span};

use crate::diff::unified_diff;
use crate::error::RetestError;
use crate::output::SCHEMA_VERSION;
use crate::pipeline::{FileReport, Pipeline};
use crate::workspace::{collect_source_files, SourceStore};

/// Knobs that do not affect per-file output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Compute everything, write nothing, collect diffs.
    pub dry_run: bool,
    /// Worker threads; `None` uses rayon's global pool.
    pub jobs: Option<usize>,
}

/// A file that could not be read or written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileError {
    pub path: String,
    pub message: String,
}

/// Dry-run diff for one changed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDiff {
    pub path: String,
    pub diff: String,
}

/// Structural warnings for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileWarnings {
    pub path: String,
    pub report: FileReport,
}

/// Aggregate result of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub schema_version: String,
    pub root: String,
    pub dry_run: bool,
    pub files_scanned: usize,
    pub files_changed: usize,
    pub files_skipped: usize,
    pub blocks_neutralized: usize,
    pub scaffolds_appended: usize,
    pub warnings: usize,
    /// Files with structural warnings, sorted by path.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warned_files: Vec<FileWarnings>,
    pub errors: Vec<FileError>,
    /// Present only in dry runs, sorted by path.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diffs: Vec<FileDiff>,
}

impl RunSummary {
    /// True if no file failed.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Default)]
struct Counters {
    scanned: AtomicUsize,
    changed: AtomicUsize,
    neutralized: AtomicUsize,
    appended: AtomicUsize,
    warnings: AtomicUsize,
}

/// What happened to one file, beyond the counters.
enum FileResult {
    Unchanged,
    Written,
    Diff(FileDiff),
    Failed(FileError),
}

/// Process every source file under `root`.
///
/// # Errors
///
/// - [`RetestError::RootNotFound`] if `root` is not a directory
/// - [`RetestError::Internal`] if the worker pool cannot be built
///
/// Per-file failures are reported in [`RunSummary::errors`], not here.
pub fn run_batch(
    root: &Path,
    pipeline: &Pipeline,
    store: &dyn SourceStore,
    options: RunOptions,
) -> Result<RunSummary, RetestError> {
    if !root.is_dir() {
        return Err(RetestError::RootNotFound {
            path: root.to_path_buf(),
        });
    }

    let selection = collect_source_files(root);
    info!(
        root = %root.display(),
        files = selection.files.len(),
        dry_run = options.dry_run,
        "starting run"
    );

    let counters = Counters::default();
    let work = || -> Vec<(PathBuf, FileResult, FileReport)> {
        selection
            .files
            .par_iter()
            .map(|path| {
                let (result, report) =
                    process_file(root, path, pipeline, store, options.dry_run, &counters);
                (path.clone(), result, report)
            })
            .collect()
    };

    let results = match options.jobs {
        Some(jobs) => rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .map_err(|e| RetestError::internal(format!("cannot build worker pool: {}", e)))?
            .install(work),
        None => work(),
    };

    let mut summary = RunSummary {
        schema_version: SCHEMA_VERSION.to_string(),
        root: root.display().to_string(),
        dry_run: options.dry_run,
        files_scanned: counters.scanned.load(Ordering::Relaxed),
        files_changed: counters.changed.load(Ordering::Relaxed),
        files_skipped: selection.skipped.len(),
        blocks_neutralized: counters.neutralized.load(Ordering::Relaxed),
        scaffolds_appended: counters.appended.load(Ordering::Relaxed),
        warnings: counters.warnings.load(Ordering::Relaxed),
        warned_files: Vec::new(),
        errors: selection
            .errors
            .iter()
            .map(|(path, message)| FileError {
                path: relative(root, path),
                message: message.clone(),
            })
            .collect(),
        diffs: Vec::new(),
    };

    // Results come back in file order, which is sorted.
    for (path, result, report) in results {
        if !report.warnings.is_empty() {
            summary.warned_files.push(FileWarnings {
                path: relative(root, &path),
                report,
            });
        }
        match result {
            FileResult::Unchanged | FileResult::Written => {}
            FileResult::Diff(diff) => summary.diffs.push(diff),
            FileResult::Failed(err) => summary.errors.push(err),
        }
    }

    info!(
        scanned = summary.files_scanned,
        changed = summary.files_changed,
        errors = summary.errors.len(),
        "run complete"
    );
    Ok(summary)
}

fn process_file(
    root: &Path,
    path: &Path,
    pipeline: &Pipeline,
    store: &dyn SourceStore,
    dry_run: bool,
    counters: &Counters,
) -> (FileResult, FileReport) {
    let rel = relative(root, path);
    let _span = info_span!("file", path = %rel).entered();
    info!("Processing file");

    let text = match store.read(path) {
        Ok(text) => text,
        Err(err) => {
            error!("cannot read file: {}", err);
            let failure = FileError {
                path: rel,
                message: RetestError::io(path, err).to_string(),
            };
            return (FileResult::Failed(failure), FileReport::default());
        }
    };
    counters.scanned.fetch_add(1, Ordering::Relaxed);

    let outcome = pipeline.process_source(&text);
    counters
        .neutralized
        .fetch_add(outcome.report.neutralized.len(), Ordering::Relaxed);
    counters
        .warnings
        .fetch_add(outcome.report.warnings.len(), Ordering::Relaxed);
    if outcome.report.scaffold_appended {
        counters.appended.fetch_add(1, Ordering::Relaxed);
    }

    if !outcome.changed() {
        return (FileResult::Unchanged, outcome.report);
    }
    counters.changed.fetch_add(1, Ordering::Relaxed);

    if dry_run {
        let diff = unified_diff(&rel, &text, &outcome.edits);
        return (
            FileResult::Diff(FileDiff {
                path: rel,
                diff,
            }),
            outcome.report,
        );
    }

    match store.write(path, &outcome.text) {
        Ok(()) => (FileResult::Written, outcome.report),
        Err(err) => {
            error!("cannot write file: {}", err);
            let failure = FileError {
                path: rel,
                message: RetestError::io(path, err).to_string(),
            };
            (FileResult::Failed(failure), outcome.report)
        }
    }
}

/// Forward-slash path relative to `root`, for output.
fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineConfig;
    use std::collections::HashMap;
    use std::io;
    use std::sync::Mutex;

    /// In-memory store; paths listed in `fail_writes` reject writes.
    #[derive(Default)]
    struct MemStore {
        files: Mutex<HashMap<PathBuf, String>>,
        fail_writes: Vec<PathBuf>,
    }

    impl SourceStore for MemStore {
        fn read(&self, path: &Path) -> io::Result<String> {
            self.files
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "missing"))
        }

        fn write(&self, path: &Path, text: &str) -> io::Result<()> {
            if self.fail_writes.iter().any(|p| p == path) {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
            }
            self.files
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), text.to_string());
            Ok(())
        }
    }

    fn pipeline() -> Pipeline {
        Pipeline::new(&PipelineConfig::default()).unwrap()
    }

    #[test]
    fn missing_root_is_an_error() {
        let store = MemStore::default();
        let result = run_batch(
            Path::new("/definitely/not/here"),
            &pipeline(),
            &store,
            RunOptions::default(),
        );
        assert!(matches!(result, Err(RetestError::RootNotFound { .. })));
    }

    #[test]
    fn relative_paths_use_forward_slashes() {
        let root = Path::new("/r");
        assert_eq!(relative(root, Path::new("/r/src/a.rs")), "src/a.rs");
        assert_eq!(relative(root, Path::new("/elsewhere.rs")), "/elsewhere.rs");
    }

    #[test]
    fn write_failure_is_recorded_not_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let a = dir.path().join("a.rs");
        let b = dir.path().join("b.rs");
        std::fs::write(&a, "").unwrap();
        std::fs::write(&b, "").unwrap();

        let store = MemStore {
            fail_writes: vec![a.clone()],
            ..Default::default()
        };
        {
            let mut files = store.files.lock().unwrap();
            files.insert(a.clone(), "struct A { x: u8 }\n".to_string());
            files.insert(b.clone(), "struct B { x: u8 }\n".to_string());
        }

        let summary = run_batch(dir.path(), &pipeline(), &store, RunOptions::default()).unwrap();
        assert_eq!(summary.files_scanned, 2);
        assert_eq!(summary.files_changed, 2);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].path, "a.rs");
        assert!(!summary.is_clean());
        let b_text = store.read(&b).unwrap();
        assert!(b_text.contains("mod generated_tests"));
    }

    #[test]
    fn jobs_option_uses_dedicated_pool() {
        let dir = tempfile::TempDir::new().unwrap();
        for name in ["a.rs", "b.rs", "c.rs"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let store = MemStore::default();
        {
            let mut files = store.files.lock().unwrap();
            for name in ["a.rs", "b.rs", "c.rs"] {
                files.insert(dir.path().join(name), "enum E { A }\n".to_string());
            }
        }
        let options = RunOptions {
            dry_run: true,
            jobs: Some(2),
        };
        let summary = run_batch(dir.path(), &pipeline(), &store, options).unwrap();
        assert_eq!(summary.scaffolds_appended, 3);
        let paths: Vec<_> = summary.diffs.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, vec!["a.rs", "b.rs", "c.rs"]);
        // Dry run leaves the store untouched.
        assert_eq!(store.read(&dir.path().join("a.rs")).unwrap(), "enum E { A }\n");
    }
}

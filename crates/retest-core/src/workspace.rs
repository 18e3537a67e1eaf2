//! Source tree access: file selection and the read/write seam.
//!
//! The pipeline never touches the filesystem itself. The batch runner reads
//! and writes through a [`SourceStore`], and gets its file list from
//! [`collect_source_files`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};
use walkdir::{DirEntry, WalkDir};

/// Extension of files the pipeline processes.
pub const SOURCE_EXTENSION: &str = "rs";

/// Module aggregator files. Rewriting them risks breaking `mod` wiring the
/// pipeline does not understand.
pub const RESERVED_FILE_NAMES: &[&str] = &["lib.rs", "mod.rs"];

/// Directories never descended into.
const DEFAULT_EXCLUDE_DIRS: &[&str] = &["target", ".git"];

// ============================================================================
// Source Store
// ============================================================================

/// Whole-file read and write.
///
/// Implementations must be usable from several worker threads at once.
pub trait SourceStore: Sync {
    /// Read a file as UTF-8 text.
    fn read(&self, path: &Path) -> io::Result<String>;

    /// Replace a file's content.
    fn write(&self, path: &Path, text: &str) -> io::Result<()>;
}

/// [`SourceStore`] backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStore;

impl SourceStore for FsStore {
    fn read(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn write(&self, path: &Path, text: &str) -> io::Result<()> {
        fs::write(path, text)
    }
}

// ============================================================================
// File Selection
// ============================================================================

/// Files found under a root.
#[derive(Debug, Clone, Default)]
pub struct FileSelection {
    /// Files to process, sorted by path.
    pub files: Vec<PathBuf>,
    /// Source files passed over because of their name.
    pub skipped: Vec<PathBuf>,
    /// Entries the walk could not read.
    pub errors: Vec<(PathBuf, String)>,
}

/// Check if a file name is one of the reserved aggregator names.
pub fn is_reserved_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| RESERVED_FILE_NAMES.contains(&n))
}

/// Check if a path has the source extension.
pub fn is_source_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(SOURCE_EXTENSION)
}

/// The root itself is never excluded, whatever its name.
fn should_exclude(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| DEFAULT_EXCLUDE_DIRS.contains(&name))
}

/// Walk `root` recursively and select source files.
///
/// Unreadable entries are logged and recorded; they never stop the walk.
pub fn collect_source_files(root: &Path) -> FileSelection {
    let mut selection = FileSelection::default();

    for entry in WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !should_exclude(e))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                error!(path = %path.display(), "cannot read directory entry: {}", err);
                selection.errors.push((path, err.to_string()));
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_source_file(entry.path()) {
            continue;
        }
        if is_reserved_file(entry.path()) {
            info!(path = %entry.path().display(), "Skipping file");
            selection.skipped.push(entry.into_path());
            continue;
        }
        selection.files.push(entry.into_path());
    }

    selection.files.sort();
    selection.skipped.sort();
    debug!(
        files = selection.files.len(),
        skipped = selection.skipped.len(),
        "collected source files"
    );
    selection
}

// ============================================================================
// Tests
// ============================================================================

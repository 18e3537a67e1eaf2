//! Error types and exit status mapping for retest.
//!
//! Errors fall into three families:
//! - **Scan errors** (`ScanError`): structural ambiguity in a single file.
//!   These never abort a run; the affected block is left untouched.
//! - **Config errors** (`ConfigError`): invalid scaffold or classifier settings,
//!   detected before any file is read.
//! - **Run errors** (`RetestError`): the few conditions that end a run early
//!   (missing root, bad config) plus per-file I/O failures that the batch
//!   runner records and skips.
//!
//! ## Exit Status Mapping
//!
//! - `1`: Invalid arguments or configuration
//! - `3`: Root directory not found
//! - `10`: Internal errors (bugs, unexpected state)

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

// ============================================================================
// Scan Errors
// ============================================================================

/// Structural ambiguity found by the delimiter scanner.
///
/// Offsets are byte offsets into the text that was scanned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    /// End of text reached before the opening delimiter was balanced.
    #[error("unbalanced delimiter opened at offset {open}")]
    Unbalanced { open: usize },

    /// A `/*` without a following `*/`.
    #[error("unterminated block comment starting at offset {start}")]
    UnterminatedBlockComment { start: usize },

    /// A string or char literal without its closing quote.
    #[error("unterminated literal starting at offset {start}")]
    UnterminatedLiteral { start: usize },

    /// The offset handed to the scanner does not hold an opening delimiter.
    #[error("no opening delimiter at offset {offset}")]
    NotAnOpener { offset: usize },
}

impl ScanError {
    /// Byte offset where the offending construct starts.
    pub fn offset(&self) -> usize {
        match self {
            ScanError::Unbalanced { open } => *open,
            ScanError::UnterminatedBlockComment { start } => *start,
            ScanError::UnterminatedLiteral { start } => *start,
            ScanError::NotAnOpener { offset } => *offset,
        }
    }
}

// ============================================================================
// Config Errors
// ============================================================================

/// Invalid pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The codec set lacks a binary or a text codec.
    #[error("codec set must include at least one binary and one text codec (got: {codecs})")]
    IncompleteCodecSet { codecs: String },

    /// The export path is not a `::`-separated Rust path.
    #[error("invalid export path '{path}': {reason}")]
    InvalidExportPath { path: String, reason: String },

    /// The test feature name is empty or contains characters a feature name cannot.
    #[error("invalid feature name '{name}'")]
    InvalidFeatureName { name: String },
}

// ============================================================================
// Run Errors
// ============================================================================

/// Run-level error.
#[derive(Debug, Error)]
pub enum RetestError {
    /// The root directory does not exist or is not a directory.
    #[error("root directory '{}' not found", path.display())]
    RootNotFound { path: PathBuf },

    /// Configuration rejected before the run started.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Reading or writing a single file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl RetestError {
    /// Create an I/O error bound to a path.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        RetestError::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        RetestError::Internal {
            message: message.into(),
        }
    }
}

// ============================================================================
// Exit Status
// ============================================================================

/// Process exit codes for run-level failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitStatus {
    /// Invalid arguments or configuration.
    InvalidArguments = 1,
    /// Root directory not found.
    RootNotFound = 3,
    /// Per-file I/O surfaced as a run error.
    IoError = 4,
    /// Internal errors.
    Internal = 10,
}

impl ExitStatus {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<&RetestError> for ExitStatus {
    fn from(err: &RetestError) -> Self {
        match err {
            RetestError::Config(_) => ExitStatus::InvalidArguments,
            RetestError::RootNotFound { .. } => ExitStatus::RootNotFound,
            RetestError::Io { .. } => ExitStatus::IoError,
            RetestError::Internal { .. } => ExitStatus::Internal,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

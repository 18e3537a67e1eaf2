//! Run output: JSON responses and the plain-text summary.
//!
//! JSON output is deterministic (same run, same bytes) and always carries
//! `schema_version`.

use std::io::{self, Write};

use serde::Serialize;

use crate::batch::RunSummary;
use crate::error::{ExitStatus, RetestError};

/// Current schema version for all JSON output.
pub const SCHEMA_VERSION: &str = "1";

/// Error details for JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    /// Exit code the process ends with.
    pub code: u8,
    pub message: String,
}

impl ErrorInfo {
    /// Describe a run-level error.
    pub fn from_error(err: &RetestError) -> Self {
        ErrorInfo {
            code: ExitStatus::from(err).code(),
            message: err.to_string(),
        }
    }
}

/// Response emitted when a run cannot start.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub status: String,
    pub schema_version: String,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    /// Build an error response.
    pub fn new(err: &RetestError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

/// Write a human-readable summary: dry-run diffs first, then warnings,
/// errors and the closing counts.
pub fn write_text_summary(summary: &RunSummary, writer: &mut impl Write) -> io::Result<()> {
    for diff in &summary.diffs {
        write!(writer, "{}", diff.diff)?;
    }
    for file in &summary.warned_files {
        for warning in &file.report.warnings {
            writeln!(
                writer,
                "warning: {}:{}:{}: {}",
                file.path, warning.line, warning.col, warning.message
            )?;
        }
    }
    for error in &summary.errors {
        writeln!(writer, "error: {}: {}", error.path, error.message)?;
    }

    let verb = if summary.dry_run { "would change" } else { "changed" };
    writeln!(
        writer,
        "Done: scanned {} file(s), {} {}, skipped {}; neutralized {} block(s), appended {} scaffold(s); {} warning(s), {} error(s).",
        summary.files_scanned,
        verb,
        summary.files_changed,
        summary.files_skipped,
        summary.blocks_neutralized,
        summary.scaffolds_appended,
        summary.warnings,
        summary.errors.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{FileDiff, FileError};

    fn summary() -> RunSummary {
        RunSummary {
            schema_version: SCHEMA_VERSION.to_string(),
            root: "/r".to_string(),
            dry_run: false,
            files_scanned: 3,
            files_changed: 2,
            files_skipped: 1,
            blocks_neutralized: 4,
            scaffolds_appended: 2,
            warnings: 0,
            warned_files: Vec::new(),
            errors: Vec::new(),
            diffs: Vec::new(),
        }
    }

    #[test]
    fn json_summary_has_schema_version_and_omits_empty_diffs() {
        let mut out = Vec::new();
        emit_response(&summary(), &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["schema_version"], "1");
        assert_eq!(value["files_changed"], 2);
        assert!(value.get("diffs").is_none());
        assert!(value["errors"].as_array().unwrap().is_empty());
    }

    #[test]
    fn json_output_is_deterministic() {
        let mut a = Vec::new();
        let mut b = Vec::new();
        emit_response(&summary(), &mut a).unwrap();
        emit_response(&summary(), &mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn text_summary_lists_diffs_and_errors() {
        let mut s = summary();
        s.dry_run = true;
        s.diffs.push(FileDiff {
            path: "a.rs".to_string(),
            diff: "--- a/a.rs\n+++ b/a.rs\n".to_string(),
        });
        s.errors.push(FileError {
            path: "b.rs".to_string(),
            message: "denied".to_string(),
        });
        let mut out = Vec::new();
        write_text_summary(&s, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("--- a/a.rs\n+++ b/a.rs\n"));
        assert!(text.contains("error: b.rs: denied\n"));
        assert!(text.contains("would change 2"));
    }

    #[test]
    fn error_response_carries_exit_code() {
        let err = RetestError::RootNotFound {
            path: "/missing".into(),
        };
        let response = ErrorResponse::new(&err);
        assert_eq!(response.status, "error");
        assert_eq!(response.error.code, 3);
        assert!(response.error.message.contains("/missing"));
    }
}

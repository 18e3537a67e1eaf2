//! Unified diff rendering for dry runs.
//!
//! Edits are widened to whole lines and edits touching the same line are
//! merged into one hunk. Hunks carry no extra context lines.

use std::fmt::Write as _;

use crate::patch::ReplacementOp;
use crate::text::LineIndex;

/// A run of whole lines in the original text plus its edits.
struct Hunk<'e> {
    first_line: usize,
    last_line: usize,
    start: usize,
    end: usize,
    edits: Vec<&'e ReplacementOp>,
}

/// Render `edits` (non-overlapping, against `original`) as a unified diff.
///
/// Returns an empty string when there are no edits.
pub fn unified_diff(path: &str, original: &str, edits: &[ReplacementOp]) -> String {
    if edits.is_empty() {
        return String::new();
    }

    let lines = LineIndex::new(original);
    let mut sorted: Vec<&ReplacementOp> = edits.iter().collect();
    sorted.sort_by_key(|op| op.start);

    let mut hunks: Vec<Hunk<'_>> = Vec::new();
    for op in sorted {
        let first_line = lines.line_of(op.start);
        let last_line = if op.length == 0 {
            first_line
        } else {
            lines.line_of(op.start + op.length - 1)
        };
        if let Some(hunk) = hunks.last_mut() {
            if first_line <= hunk.last_line {
                hunk.last_line = hunk.last_line.max(last_line);
                hunk.end = line_end_inclusive(&lines, original, hunk.last_line);
                hunk.edits.push(op);
                continue;
            }
        }
        hunks.push(Hunk {
            first_line,
            last_line,
            start: lines.line_start(first_line).unwrap_or(original.len()),
            end: line_end_inclusive(&lines, original, last_line),
            edits: vec![op],
        });
    }

    let mut diff = String::new();
    let _ = writeln!(diff, "--- a/{}", path);
    let _ = writeln!(diff, "+++ b/{}", path);

    let mut delta: isize = 0;
    for hunk in hunks {
        let old_text = &original[hunk.start..hunk.end];
        let mut new_text = old_text.to_string();
        for op in hunk.edits.iter().rev() {
            let local = op.start - hunk.start;
            new_text.replace_range(local..local + op.length, &op.replacement);
        }

        let old_lines: Vec<&str> = old_text.lines().collect();
        let new_lines: Vec<&str> = new_text.lines().collect();
        let old_missing_newline = !old_text.is_empty() && !old_text.ends_with('\n');
        let new_missing_newline = !new_text.is_empty() && !new_text.ends_with('\n');

        // An empty range is addressed by the line before it.
        let old_start = if old_lines.is_empty() {
            hunk.first_line
        } else {
            hunk.first_line + 1
        };
        let new_start = (old_start as isize + delta).max(0) as usize;
        let new_start = if old_lines.is_empty() && !new_lines.is_empty() {
            new_start + 1
        } else {
            new_start
        };
        delta += new_lines.len() as isize - old_lines.len() as isize;

        let _ = writeln!(
            diff,
            "@@ -{},{} +{},{} @@",
            old_start,
            old_lines.len(),
            new_start,
            new_lines.len()
        );
        for (i, line) in old_lines.iter().enumerate() {
            let _ = writeln!(diff, "-{}", line);
            if old_missing_newline && i == old_lines.len() - 1 {
                diff.push_str("\\ No newline at end of file\n");
            }
        }
        for (i, line) in new_lines.iter().enumerate() {
            let _ = writeln!(diff, "+{}", line);
            if new_missing_newline && i == new_lines.len() - 1 {
                diff.push_str("\\ No newline at end of file\n");
            }
        }
    }

    diff
}

/// Offset just past `line`, including its `\n` when present.
fn line_end_inclusive(lines: &LineIndex, text: &str, line: usize) -> usize {
    match lines.line_start(line + 1) {
        Some(next) => next,
        None => text.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(start: usize, length: usize, replacement: &str) -> ReplacementOp {
        ReplacementOp {
            start,
            length,
            replacement: replacement.to_string(),
        }
    }

    #[test]
    fn no_edits_no_diff() {
        assert_eq!(unified_diff("a.rs", "fn a() {}\n", &[]), "");
    }

    #[test]
    fn wrapped_block_hunk() {
        let text = "fn a() {}\n#[cfg(test)]\nfn t() {}\n";
        let start = text.find("#[cfg").unwrap();
        let block = "#[cfg(test)]\nfn t() {}";
        let edit = op(start, block.len(), &format!("/*\n{}\n*/", block));
        let diff = unified_diff("src/a.rs", text, &[edit]);
        assert_eq!(
            diff,
            "--- a/src/a.rs\n+++ b/src/a.rs\n\
             @@ -2,2 +2,4 @@\n\
             -#[cfg(test)]\n-fn t() {}\n\
             +/*\n+#[cfg(test)]\n+fn t() {}\n+*/\n"
        );
    }

    #[test]
    fn append_at_end_shifts_new_line_numbers() {
        let text = "#[cfg(test)]\nfn t() {}\nstruct S { a: u8 }\n";
        let block = "#[cfg(test)]\nfn t() {}";
        let wrap = op(0, block.len(), &format!("/*\n{}\n*/", block));
        let append = op(text.len(), 0, "\nmod generated_tests {\n}\n");
        let diff = unified_diff("s.rs", text, &[append, wrap]);
        assert!(diff.contains("@@ -1,2 +1,4 @@\n"));
        // Original has 3 lines; new text has 5 lines before the insertion.
        assert!(diff.contains("@@ -3,0 +6,3 @@\n+\n+mod generated_tests {\n+}\n"));
    }

    #[test]
    fn missing_final_newline_is_marked() {
        let text = "struct S(u8);";
        let append = op(text.len(), 0, "\n\nmod generated_tests {}\n");
        let diff = unified_diff("s.rs", text, &[append]);
        assert!(diff.contains("@@ -1,1 +1,3 @@\n-struct S(u8);\n\\ No newline at end of file\n+struct S(u8);\n+\n+mod generated_tests {}\n"));
    }
}

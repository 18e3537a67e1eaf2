//! Line index and byte offset to line:column conversions.
//!
//! ## Coordinate Conventions
//!
//! - Lines and columns are **1-indexed** (matching editor conventions)
//! - Byte offsets are **0-indexed**
//! - Line indices used internally by [`LineIndex`] are **0-indexed**
//!
//! A [`LineIndex`] is built once per text version. It must never be reused
//! against a text that has had replacements applied.

/// Precomputed start offset of every line in a text.
///
/// A line ends at its `\n` (exclusive). A trailing `\r` belongs to the line
/// bytes but is excluded from [`LineIndex::line_text`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    /// Build the index for `text` in one pass.
    pub fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            text.bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| i + 1),
        );
        LineIndex {
            starts,
            len: text.len(),
        }
    }

    /// 0-indexed line containing `offset`. Offsets past the end clamp to the last line.
    pub fn line_of(&self, offset: usize) -> usize {
        let offset = offset.min(self.len);
        match self.starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        }
    }

    /// Start offset of a 0-indexed line.
    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.starts.get(line).copied()
    }

    /// End offset of a 0-indexed line, excluding the newline.
    pub fn line_end(&self, line: usize) -> Option<usize> {
        if line >= self.starts.len() {
            return None;
        }
        Some(
            self.starts
                .get(line + 1)
                .map(|next| next - 1)
                .unwrap_or(self.len),
        )
    }

    /// Text of a 0-indexed line without its line terminator.
    pub fn line_text<'a>(&self, text: &'a str, line: usize) -> Option<&'a str> {
        let start = self.line_start(line)?;
        let end = self.line_end(line)?;
        let raw = text.get(start..end)?;
        Some(raw.strip_suffix('\r').unwrap_or(raw))
    }

    /// Convert a byte offset to 1-indexed `(line, col)`.
    ///
    /// Columns count bytes, not characters.
    pub fn position(&self, offset: usize) -> (u32, u32) {
        let offset = offset.min(self.len);
        let line = self.line_of(offset);
        let col = offset - self.starts[line];
        (line as u32 + 1, col as u32 + 1)
    }
}

// ============================================================================
// Tests
// ============================================================================

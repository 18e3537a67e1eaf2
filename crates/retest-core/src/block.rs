//! Block extractor.
//!
//! A block is a declaration's body extended backwards over its preamble:
//! the contiguous run of blank, attribute (`#[`) and comment (`//`, `/*`)
//! lines directly above the declaration's own line.

use tracing::warn;

use crate::error::ScanError;
use crate::scan::find_matching_close;
use crate::text::LineIndex;
use crate::types::{Block, DeclarationSite, TerminatorKind};

/// Prefixes (after trimming) that let a line join a preamble.
const PREAMBLE_MARKERS: &[&str] = &["#[", "//", "/*"];

/// Why a declaration site produced no block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSite {
    pub declaration_offset: usize,
    pub declaration_text: String,
    pub reason: ScanError,
}

/// Shared per-file state for extracting many blocks from one text.
pub struct BlockExtractor<'a> {
    text: &'a str,
    lines: LineIndex,
}

impl<'a> BlockExtractor<'a> {
    /// Build the line index for `text` once.
    pub fn new(text: &'a str) -> Self {
        BlockExtractor {
            text,
            lines: LineIndex::new(text),
        }
    }

    /// Line index of the underlying text.
    pub fn lines(&self) -> &LineIndex {
        &self.lines
    }

    /// Extract the block for one declaration site.
    ///
    /// The returned block is unclassified (`is_test_block == false`).
    ///
    /// # Errors
    ///
    /// Returns the scanner's error when the body's extent is unknown.
    pub fn extract(&self, site: &DeclarationSite) -> Result<Block, ScanError> {
        let end = match site.terminator {
            TerminatorKind::BlockOpen => find_matching_close(self.text, site.terminator_offset)?,
            TerminatorKind::StatementEnd => site.terminator_offset,
        };

        let start = self.preamble_start(site.declaration_offset);

        Ok(Block {
            start,
            end,
            declaration_offset: site.declaration_offset,
            declaration_text: site.declaration_text.clone(),
            text: self.text[start..=end].to_string(),
            is_test_block: false,
        })
    }

    /// Walk backwards from the declaration's line over preamble lines.
    fn preamble_start(&self, declaration_offset: usize) -> usize {
        let declaration_line = self.lines.line_of(declaration_offset);
        let mut start_line = declaration_line;

        while start_line > 0 {
            let candidate = start_line - 1;
            let Some(line) = self.lines.line_text(self.text, candidate) else {
                break;
            };
            let trimmed = line.trim();
            let absorbs =
                trimmed.is_empty() || PREAMBLE_MARKERS.iter().any(|m| trimmed.starts_with(m));
            if !absorbs {
                break;
            }
            start_line = candidate;
        }

        self.lines.line_start(start_line).unwrap_or(0)
    }
}

/// Extract blocks for every site, dropping (and logging) the ones whose
/// extent cannot be determined.
pub fn extract_blocks(text: &str, sites: &[DeclarationSite]) -> (Vec<Block>, Vec<SkippedSite>) {
    let extractor = BlockExtractor::new(text);
    let mut blocks = Vec::with_capacity(sites.len());
    let mut skipped = Vec::new();

    for site in sites {
        match extractor.extract(site) {
            Ok(block) => blocks.push(block),
            Err(reason) => {
                let (line, col) = extractor.lines().position(site.declaration_offset);
                warn!(
                    line,
                    col,
                    declaration = %site.declaration_text,
                    "skipping block starting at offset {}: {}",
                    site.declaration_offset,
                    reason
                );
                skipped.push(SkippedSite {
                    declaration_offset: site.declaration_offset,
                    declaration_text: site.declaration_text.clone(),
                    reason,
                });
            }
        }
    }

    (blocks, skipped)
}

// ============================================================================
// Tests
// ============================================================================

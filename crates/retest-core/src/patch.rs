//! Rewriter: replacement ops computed against one frozen text and applied
//! from the highest offset down.
//!
//! - Ops never partially overlap (conflicts are detected up front)
//! - Nested test blocks collapse into their outermost block
//! - Apply is a pure fold producing a new `String`

use std::fmt;

use serde::Serialize;

use crate::types::Block;

/// Opening of the neutralization wrapper.
pub const NEUTRALIZE_OPEN: &str = "/*\n";

/// Closing of the neutralization wrapper.
pub const NEUTRALIZE_CLOSE: &str = "\n*/";

/// Check that `text` stays one comment once wrapped.
///
/// Block comments nest and ignore string literals, so every `/*` and `*/`
/// in the text counts. The wrapper holds only if they balance and never
/// close more than they open.
pub fn fits_in_block_comment(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i + 1 < bytes.len() {
        match (bytes[i], bytes[i + 1]) {
            (b'/', b'*') => {
                depth += 1;
                i += 2;
            }
            (b'*', b'/') => {
                let Some(d) = depth.checked_sub(1) else {
                    return false;
                };
                depth = d;
                i += 2;
            }
            _ => i += 1,
        }
    }
    depth == 0
}

// ============================================================================
// Core Types
// ============================================================================

/// Byte offsets into file content.
///
/// Spans are half-open intervals: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl Span {
    /// Check if this span overlaps with another.
    ///
    /// Adjacent spans (one ends where another starts) do NOT overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Check if this span contains another span entirely.
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// A substitution against the original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementOp {
    pub start: usize,
    pub length: usize,
    pub replacement: String,
}

impl ReplacementOp {
    /// Wrap a block's exact text in a block comment.
    pub fn neutralize(block: &Block) -> Self {
        let mut replacement =
            String::with_capacity(NEUTRALIZE_OPEN.len() + block.text.len() + NEUTRALIZE_CLOSE.len());
        replacement.push_str(NEUTRALIZE_OPEN);
        replacement.push_str(&block.text);
        replacement.push_str(NEUTRALIZE_CLOSE);
        ReplacementOp {
            start: block.start,
            length: block.len(),
            replacement,
        }
    }

    /// Byte range replaced in the original text.
    pub fn span(&self) -> Span {
        Span {
            start: self.start,
            end: self.start + self.length,
        }
    }
}

// ============================================================================
// Conflicts
// ============================================================================

/// Why a replacement was left out of a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    /// The op shares bytes with an earlier op without being nested in it.
    PartialOverlap { kept: Span, dropped: Span },
    /// The op does not fit the text or splits a UTF-8 sequence.
    OutOfBounds { span: Span, text_len: usize },
    /// The block's own comment delimiters would end its wrapper early.
    Unwrappable { span: Span },
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conflict::PartialOverlap { kept, dropped } => {
                write!(f, "replacement {} partially overlaps {}", dropped, kept)
            }
            Conflict::OutOfBounds { span, text_len } => {
                write!(f, "replacement {} out of bounds (text is {} bytes)", span, text_len)
            }
            Conflict::Unwrappable { span } => {
                write!(f, "test block {} has unbalanced comment delimiters; left as is", span)
            }
        }
    }
}

// ============================================================================
// Rewrite Plan
// ============================================================================

/// A conflict-free batch of replacements against one text snapshot.
#[derive(Debug, Clone, Default)]
pub struct RewritePlan {
    ops: Vec<ReplacementOp>,
    nested: usize,
}

impl RewritePlan {
    /// Build a plan neutralizing every block flagged as test code.
    ///
    /// Blocks nested inside another test block are covered by the outer
    /// wrapper and produce no op of their own. A block whose text would
    /// break out of its wrapper is reported and left alone.
    pub fn from_test_blocks(text: &str, blocks: &[Block]) -> (Self, Vec<Conflict>) {
        let mut unwrappable = Vec::new();
        let mut ops = Vec::new();
        for block in blocks.iter().filter(|b| b.is_test_block) {
            let op = ReplacementOp::neutralize(block);
            if fits_in_block_comment(&block.text) {
                ops.push(op);
            } else {
                unwrappable.push(Conflict::Unwrappable { span: op.span() });
            }
        }
        let (plan, mut conflicts) = Self::from_ops(text, ops);
        unwrappable.append(&mut conflicts);
        (plan, unwrappable)
    }

    /// Build a plan from arbitrary ops, dropping conflicting ones.
    pub fn from_ops(text: &str, mut ops: Vec<ReplacementOp>) -> (Self, Vec<Conflict>) {
        // Outer ops sort before the ops they contain.
        ops.sort_by(|a, b| a.start.cmp(&b.start).then(b.length.cmp(&a.length)));

        let mut plan = RewritePlan::default();
        let mut conflicts = Vec::new();
        let mut last: Option<Span> = None;

        for op in ops {
            let span = op.span();
            if text.get(span.start..span.end).is_none() {
                conflicts.push(Conflict::OutOfBounds {
                    span,
                    text_len: text.len(),
                });
                continue;
            }
            if let Some(kept) = last {
                if kept.contains(&span) {
                    plan.nested += 1;
                    continue;
                }
                if kept.overlaps(&span) {
                    conflicts.push(Conflict::PartialOverlap {
                        kept,
                        dropped: span,
                    });
                    continue;
                }
            }
            last = Some(span);
            plan.ops.push(op);
        }

        (plan, conflicts)
    }

    /// Ops in ascending offset order.
    pub fn ops(&self) -> &[ReplacementOp] {
        &self.ops
    }

    /// Number of ops dropped because an outer op covers them.
    pub fn nested_count(&self) -> usize {
        self.nested
    }

    /// Check if the plan changes nothing.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Apply the plan to the text it was built against.
    ///
    /// Ops are applied in descending start order so earlier offsets stay valid.
    pub fn apply(&self, text: &str) -> String {
        let growth: usize = self
            .ops
            .iter()
            .map(|op| op.replacement.len().saturating_sub(op.length))
            .sum();
        let mut out = String::with_capacity(text.len() + growth);
        out.push_str(text);
        for op in self.ops.iter().rev() {
            out.replace_range(op.start..op.start + op.length, &op.replacement);
        }
        out
    }
}

// ============================================================================
// Tests
// ============================================================================

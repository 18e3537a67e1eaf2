//! Shared data model for one file's trip through the pipeline.
//!
//! Every offset here is a byte offset into the exact text it was computed
//! against. None of these values outlive the file they describe.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

// ============================================================================
// Type Names
// ============================================================================

/// Name of a discovered `struct` or `enum`, case preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TypeName(String);

impl TypeName {
    /// Create a type name.
    pub fn new(name: impl Into<String>) -> Self {
        TypeName(name.into())
    }

    /// The name as written in source.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered, de-duplicated set of type names (first appearance wins).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TypeNames {
    order: Vec<TypeName>,
    #[serde(skip)]
    seen: HashSet<String>,
}

impl TypeNames {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a name; returns `false` if it was already present.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.seen.contains(&name) {
            return false;
        }
        self.seen.insert(name.clone());
        self.order.push(TypeName(name));
        true
    }

    /// Check membership.
    pub fn contains(&self, name: &str) -> bool {
        self.seen.contains(name)
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if no names were found.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &TypeName> {
        self.order.iter()
    }
}

impl<S: Into<String>> FromIterator<S> for TypeNames {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut names = TypeNames::new();
        for name in iter {
            names.insert(name);
        }
        names
    }
}

impl<'a> IntoIterator for &'a TypeNames {
    type Item = &'a TypeName;
    type IntoIter = std::slice::Iter<'a, TypeName>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.iter()
    }
}

// ============================================================================
// Declaration Sites
// ============================================================================

/// Keyword that introduced a declaration site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationKind {
    Mod,
    Fn,
    Use,
}

/// How a declaration header ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminatorKind {
    /// `{`: the body runs to the matching `}`.
    BlockOpen,
    /// `;`: the declaration ends at the terminator.
    StatementEnd,
}

/// A declaration found by the locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationSite {
    pub kind: DeclarationKind,
    /// Offset of the introducing keyword.
    pub declaration_offset: usize,
    /// Header text from the keyword up to the terminator, trailing whitespace trimmed.
    pub declaration_text: String,
    pub terminator: TerminatorKind,
    pub terminator_offset: usize,
}

// ============================================================================
// Blocks
// ============================================================================

/// A preamble + declaration + body unit that can be replaced atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// First byte of the absorbed preamble (a line start).
    pub start: usize,
    /// Last byte of the body (inclusive).
    pub end: usize,
    /// Offset of the declaration keyword; `[start, declaration_offset)` is the preamble.
    pub declaration_offset: usize,
    pub declaration_text: String,
    pub text: String,
    pub is_test_block: bool,
}

impl Block {
    /// Number of bytes covered.
    pub fn len(&self) -> usize {
        self.end + 1 - self.start
    }

    /// Always false: a block covers at least its terminator.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Preamble text (attributes, comments, blank lines, and anything
    /// on the declaration's line before the keyword).
    pub fn preamble(&self) -> &str {
        &self.text[..self.declaration_offset - self.start]
    }

    /// Check if `other` lies entirely within this block.
    pub fn contains(&self, other: &Block) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Check if the two blocks share any byte.
    pub fn overlaps(&self, other: &Block) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

// ============================================================================
// Tests
// ============================================================================

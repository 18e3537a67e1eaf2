//! Delimiter scanner: a lexically-aware cursor over Rust source text.
//!
//! The scanner is a small state machine with one code state and a handful
//! of opaque states (line comment, block comment, string, raw string, char
//! literal). Bytes inside an opaque region never reach delimiter counting.
//!
//! Two entry points build on the same cursor:
//!
//! - [`find_matching_close`]: offset of the delimiter that balances an opener.
//! - [`RegionMap::build`]: every opaque region of a file, in order.
//!
//! The scanner is not a tokenizer. Block comments do not nest (the first
//! `*/` closes), and a single quote only opens a char literal when the
//! shape `'x'` or `'\..'` follows; otherwise it is a lifetime or label.

use crate::error::ScanError;

// ============================================================================
// Scanner States
// ============================================================================

/// Kind of opaque region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    /// `// ...` up to (not including) the newline.
    LineComment,
    /// `/* ... */`.
    BlockComment,
    /// `"..."` or `b"..."`.
    Str,
    /// `r"..."`, `r#"..."#`, `br"..."`.
    RawStr,
    /// `'x'`, `'\n'`, `'\u{1F600}'`.
    Char,
}

/// Cursor state at a given position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    LineComment,
    BlockComment,
    Str,
    RawStr { hashes: usize },
    Char,
}

/// A half-open byte range `[start, end)` whose contents are opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpaqueRegion {
    pub start: usize,
    pub end: usize,
    pub kind: RegionKind,
}

impl OpaqueRegion {
    /// Check if `offset` falls inside this region.
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

/// One step of the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Piece {
    /// A byte of ordinary code.
    Code { offset: usize, byte: u8 },
    /// A complete opaque region.
    Opaque(OpaqueRegion),
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

// ============================================================================
// Cursor
// ============================================================================

/// Forward cursor yielding code bytes and opaque regions.
///
/// After an error the cursor is exhausted.
pub struct Cursor<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> Cursor<'a> {
    /// Start scanning at the beginning of `text`.
    pub fn new(text: &'a str) -> Self {
        Self::at(text, 0)
    }

    /// Start scanning at `offset`, which must be in code state.
    pub fn at(text: &'a str, offset: usize) -> Self {
        Cursor {
            text,
            bytes: text.as_bytes(),
            pos: offset.min(text.len()),
            failed: false,
        }
    }

    /// Current position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Decide which state the byte at `i` enters from code state.
    fn enter(&self, i: usize) -> Mode {
        let bytes = self.bytes;
        match bytes[i] {
            b'/' => match bytes.get(i + 1) {
                Some(b'/') => Mode::LineComment,
                Some(b'*') => Mode::BlockComment,
                _ => Mode::Code,
            },
            b'"' => Mode::Str,
            b'\'' => {
                if self.char_literal_end(i).is_some() {
                    Mode::Char
                } else {
                    Mode::Code
                }
            }
            b'r' | b'b' => match self.raw_string_prefix(i) {
                Some(hashes) => Mode::RawStr { hashes },
                None => Mode::Code,
            },
            _ => Mode::Code,
        }
    }

    /// If a raw string starts at `i`, return its hash count.
    fn raw_string_prefix(&self, i: usize) -> Option<usize> {
        let bytes = self.bytes;
        if i > 0 && is_ident_byte(bytes[i - 1]) {
            return None;
        }
        let mut j = i;
        if bytes[j] == b'b' {
            j += 1;
        }
        if bytes.get(j) != Some(&b'r') {
            return None;
        }
        j += 1;
        let hashes = bytes[j..].iter().take_while(|&&b| b == b'#').count();
        if bytes.get(j + hashes) == Some(&b'"') {
            Some(hashes)
        } else {
            None
        }
    }

    /// End (exclusive) of the char literal opening at `i`, if one does.
    ///
    /// An escaped literal runs to the next `'` on the same line. An
    /// unescaped one must be exactly one char followed by `'`.
    fn char_literal_end(&self, i: usize) -> Option<usize> {
        let bytes = self.bytes;
        match bytes.get(i + 1)? {
            b'\\' => {
                let mut j = i + 3;
                while j < bytes.len() && bytes[j] != b'\n' {
                    if bytes[j] == b'\'' {
                        return Some(j + 1);
                    }
                    j += 1;
                }
                None
            }
            b'\'' | b'\n' => None,
            _ => {
                let ch = self.text[i + 1..].chars().next()?;
                let close = i + 1 + ch.len_utf8();
                (bytes.get(close) == Some(&b'\'')).then_some(close + 1)
            }
        }
    }

    /// Scan an opaque region entered at `start`; return its end (exclusive).
    fn scan_opaque(&self, mode: Mode, start: usize) -> Result<usize, ScanError> {
        let bytes = self.bytes;
        match mode {
            Mode::Code => Ok(start + 1),
            Mode::LineComment => Ok(bytes[start..]
                .iter()
                .position(|&b| b == b'\n')
                .map(|p| start + p)
                .unwrap_or(bytes.len())),
            Mode::BlockComment => self.text[start + 2..]
                .find("*/")
                .map(|p| start + 2 + p + 2)
                .ok_or(ScanError::UnterminatedBlockComment { start }),
            Mode::Str => {
                let mut j = start + 1;
                while j < bytes.len() {
                    match bytes[j] {
                        b'\\' => j += 2,
                        b'"' => return Ok(j + 1),
                        _ => j += 1,
                    }
                }
                Err(ScanError::UnterminatedLiteral { start })
            }
            Mode::RawStr { hashes } => {
                let quote = start + bytes[start..].iter().position(|&b| b == b'"').unwrap_or(0);
                let mut j = quote + 1;
                while j < bytes.len() {
                    if bytes[j] == b'"'
                        && bytes.len() >= j + 1 + hashes
                        && bytes[j + 1..j + 1 + hashes].iter().all(|&b| b == b'#')
                    {
                        return Ok(j + 1 + hashes);
                    }
                    j += 1;
                }
                Err(ScanError::UnterminatedLiteral { start })
            }
            Mode::Char => self
                .char_literal_end(start)
                .ok_or(ScanError::UnterminatedLiteral { start }),
        }
    }
}

impl Iterator for Cursor<'_> {
    type Item = Result<Piece, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.bytes.len() {
            return None;
        }
        let start = self.pos;
        let mode = self.enter(start);
        if mode == Mode::Code {
            self.pos += 1;
            return Some(Ok(Piece::Code {
                offset: start,
                byte: self.bytes[start],
            }));
        }
        match self.scan_opaque(mode, start) {
            Ok(end) => {
                self.pos = end;
                let kind = match mode {
                    Mode::LineComment => RegionKind::LineComment,
                    Mode::BlockComment => RegionKind::BlockComment,
                    Mode::Str => RegionKind::Str,
                    Mode::RawStr { .. } => RegionKind::RawStr,
                    Mode::Char | Mode::Code => RegionKind::Char,
                };
                Some(Ok(Piece::Opaque(OpaqueRegion { start, end, kind })))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

// ============================================================================
// Matching Close
// ============================================================================

/// Closing delimiter for a supported opener.
fn closer_for(open: u8) -> Option<u8> {
    match open {
        b'{' => Some(b'}'),
        b'(' => Some(b')'),
        b'[' => Some(b']'),
        _ => None,
    }
}

/// Find the offset of the delimiter that balances the opener at `open`.
///
/// Only the opener's own delimiter pair is counted. Comments and literals
/// are skipped whole.
///
/// # Errors
///
/// - [`ScanError::NotAnOpener`] if `open` does not hold `{`, `(` or `[`
/// - [`ScanError::Unbalanced`] if the text ends first
/// - [`ScanError::UnterminatedBlockComment`] / [`ScanError::UnterminatedLiteral`]
///   if an opaque region never closes
pub fn find_matching_close(text: &str, open: usize) -> Result<usize, ScanError> {
    let open_byte = *text
        .as_bytes()
        .get(open)
        .ok_or(ScanError::NotAnOpener { offset: open })?;
    let close_byte = closer_for(open_byte).ok_or(ScanError::NotAnOpener { offset: open })?;

    let mut depth = 0usize;
    for piece in Cursor::at(text, open) {
        if let Piece::Code { offset, byte } = piece? {
            if byte == open_byte {
                depth += 1;
            } else if byte == close_byte {
                depth -= 1;
                if depth == 0 {
                    return Ok(offset);
                }
            }
        }
    }
    Err(ScanError::Unbalanced { open })
}

// ============================================================================
// Region Map
// ============================================================================

/// All opaque regions of one text, in ascending order.
///
/// When the text contains an unterminated comment or literal, the final
/// region runs to end of text and [`RegionMap::unterminated`] reports it.
#[derive(Debug, Clone, Default)]
pub struct RegionMap {
    regions: Vec<OpaqueRegion>,
    unterminated: Option<ScanError>,
}

impl RegionMap {
    /// Scan `text` once and record every opaque region.
    pub fn build(text: &str) -> Self {
        let mut map = RegionMap::default();
        for piece in Cursor::new(text) {
            match piece {
                Ok(Piece::Opaque(region)) => map.regions.push(region),
                Ok(Piece::Code { .. }) => {}
                Err(err) => {
                    let kind = match err {
                        ScanError::UnterminatedBlockComment { .. } => RegionKind::BlockComment,
                        _ => RegionKind::Str,
                    };
                    map.regions.push(OpaqueRegion {
                        start: err.offset(),
                        end: text.len(),
                        kind,
                    });
                    map.unterminated = Some(err);
                }
            }
        }
        map
    }

    /// Regions in ascending order.
    pub fn regions(&self) -> &[OpaqueRegion] {
        &self.regions
    }

    /// The scan error that cut the map short, if any.
    pub fn unterminated(&self) -> Option<&ScanError> {
        self.unterminated.as_ref()
    }

    /// Region containing `offset`, if any.
    pub fn region_at(&self, offset: usize) -> Option<&OpaqueRegion> {
        let idx = self.regions.partition_point(|r| r.end <= offset);
        self.regions.get(idx).filter(|r| r.contains(offset))
    }

    /// Check if `offset` falls inside a comment or literal.
    pub fn is_opaque(&self, offset: usize) -> bool {
        self.region_at(offset).is_some()
    }

    /// Check if `offset` lies at or beyond the start of an unterminated region.
    pub fn is_after_unterminated(&self, offset: usize) -> bool {
        self.unterminated
            .as_ref()
            .is_some_and(|err| offset >= err.offset())
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Declaration locator.
//!
//! Finds two independent sets over the same text:
//!
//! - **Type declarations**: `struct`/`enum` names, de-duplicated in first-seen order.
//! - **Declaration sites**: `mod`, `fn` and `use` items with their terminator.
//!
//! Both are pattern matches over raw text, filtered through a [`RegionMap`]
//! so that matches starting inside a comment or literal are ignored. The
//! declaration header (between the name and the terminator) is walked with
//! the scanner so a `{` inside a `use` tree or a `;` inside `[u8; 4]` is not
//! mistaken for the terminator.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::scan::{Cursor, Piece, RegionMap};
use crate::types::{DeclarationKind, DeclarationSite, TerminatorKind, TypeNames};

/// `struct`/`enum` keyword and name. The body form is checked separately.
static TYPE_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:struct|enum)\s+([A-Za-z_][A-Za-z0-9_]*)")
        .expect("type keyword pattern is valid")
});

/// Keyword and (for `mod`/`fn`) name of a declaration site.
static DECL_SITE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:(?P<kw>mod|fn)\s+(?:r#)?[A-Za-z_][A-Za-z0-9_]*|use\s)")
        .expect("declaration site pattern is valid")
});

// ============================================================================
// Type Declarations
// ============================================================================

/// Find every `struct`/`enum` name declared in live code.
///
/// Only brace-bodied and tuple declarations count; unit structs are skipped.
/// Each keyword hit is checked on its own, so a header that does not qualify
/// never hides the declaration after it.
pub fn find_type_names(text: &str, regions: &RegionMap) -> TypeNames {
    let mut names = TypeNames::new();
    for caps in TYPE_KEYWORD.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if regions.is_opaque(whole.start()) {
            continue;
        }
        if has_type_body(text, name.end()) {
            names.insert(name.as_str());
        } else {
            debug!(name = name.as_str(), "skipping declaration without a body");
        }
    }
    names
}

/// Walk a `struct`/`enum` header from just past its name.
///
/// True when the header reaches a `{` outside generics and parentheses, or
/// ends in `;` after a tuple field list opened directly behind the generics.
fn has_type_body(text: &str, from: usize) -> bool {
    let mut depth = 0usize;
    let mut tuple = false;
    let mut word_seen = false;
    let mut prev = 0u8;
    for piece in Cursor::at(text, from) {
        let byte = match piece {
            Ok(Piece::Code { byte, .. }) => byte,
            Ok(Piece::Opaque(_)) => continue,
            Err(_) => return false,
        };
        match byte {
            b'<' | b'[' => depth += 1,
            b'(' => {
                if depth == 0 && !word_seen {
                    tuple = true;
                }
                depth += 1;
            }
            // `->` inside a `Fn() -> T` bound.
            b'>' if prev == b'-' => {}
            b'>' | b']' | b')' => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            b'{' if depth == 0 => return true,
            b';' if depth == 0 => return tuple,
            b'}' if depth == 0 => return false,
            b if depth == 0 && (b.is_ascii_alphanumeric() || b == b'_') => word_seen = true,
            _ => {}
        }
        prev = byte;
    }
    false
}

// ============================================================================
// Declaration Sites
// ============================================================================

/// Outcome of locating declaration sites in one text.
#[derive(Debug, Clone, Default)]
pub struct LocatedSites {
    /// Sites in ascending offset order.
    pub sites: Vec<DeclarationSite>,
    /// Offsets of matches dropped because they begin inside or after an
    /// unterminated comment or literal.
    pub ambiguous: Vec<usize>,
}

/// Find every `mod`, `fn` and `use` declaration in live code.
pub fn find_declaration_sites(text: &str, regions: &RegionMap) -> LocatedSites {
    let mut located = LocatedSites::default();

    for m in DECL_SITE.find_iter(text) {
        let start = m.start();
        if regions.is_after_unterminated(start) {
            located.ambiguous.push(start);
            continue;
        }
        if regions.is_opaque(start) {
            continue;
        }

        let kind = if text[start..].starts_with("mod") {
            DeclarationKind::Mod
        } else if text[start..].starts_with("fn") {
            DeclarationKind::Fn
        } else {
            DeclarationKind::Use
        };

        match header_terminator(text, kind, m.end()) {
            Some((terminator, terminator_offset)) => {
                let declaration_text = text[start..terminator_offset].trim_end().to_string();
                located.sites.push(DeclarationSite {
                    kind,
                    declaration_offset: start,
                    declaration_text,
                    terminator,
                    terminator_offset,
                });
            }
            None => {
                debug!(offset = start, ?kind, "no terminator for declaration header");
            }
        }
    }

    located
}

/// Walk a declaration header starting at `from` and find its terminator.
///
/// - `mod NAME` must be followed (after whitespace) directly by `{` or `;`.
/// - `fn NAME` ends at the first `{` or `;` outside parentheses and brackets.
/// - `use ...` ends at the first `;` outside braces, parentheses and brackets.
fn header_terminator(text: &str, kind: DeclarationKind, from: usize) -> Option<(TerminatorKind, usize)> {
    let mut depth = 0usize;
    for piece in Cursor::at(text, from) {
        let (offset, byte) = match piece {
            Ok(Piece::Code { offset, byte }) => (offset, byte),
            Ok(Piece::Opaque(_)) => continue,
            Err(_) => return None,
        };
        match kind {
            DeclarationKind::Mod => match byte {
                b'{' => return Some((TerminatorKind::BlockOpen, offset)),
                b';' => return Some((TerminatorKind::StatementEnd, offset)),
                b if b.is_ascii_whitespace() => {}
                _ => return None,
            },
            DeclarationKind::Fn => match byte {
                b'(' | b'[' => depth += 1,
                b')' | b']' => depth = depth.checked_sub(1)?,
                b'{' if depth == 0 => return Some((TerminatorKind::BlockOpen, offset)),
                b';' if depth == 0 => return Some((TerminatorKind::StatementEnd, offset)),
                b'}' if depth == 0 => return None,
                _ => {}
            },
            DeclarationKind::Use => match byte {
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => depth = depth.checked_sub(1)?,
                b';' if depth == 0 => return Some((TerminatorKind::StatementEnd, offset)),
                _ => {}
            },
        }
    }
    None
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn names(text: &str) -> Vec<String> {
        let regions = RegionMap::build(text);
        find_type_names(text, &regions)
            .iter()
            .map(|n| n.as_str().to_string())
            .collect()
    }

    fn sites(text: &str) -> Vec<DeclarationSite> {
        let regions = RegionMap::build(text);
        find_declaration_sites(text, &regions).sites
    }

    mod type_name_tests {
        use super::*;

        #[test]
        fn finds_structs_and_enums() {
            let text = "pub struct Alpha {\n    a: u8,\n}\n\nenum Beta { X, Y }\n";
            assert_eq!(names(text), vec!["Alpha", "Beta"]);
        }

        #[test]
        fn finds_tuple_structs() {
            let text = "pub struct Id(pub u64);\nstruct Pair(u8, u16);\n";
            assert_eq!(names(text), vec!["Id", "Pair"]);
        }

        #[test]
        fn finds_generic_and_where_forms() {
            let text = "pub struct Wrapper<T: Into<String>> { inner: T }\n\
                        pub enum Either<L, R>\nwhere\n    L: Clone,\n{\n    Left(L),\n    Right(R),\n}\n";
            assert_eq!(names(text), vec!["Wrapper", "Either"]);
        }

        #[test]
        fn unit_structs_are_not_types() {
            assert!(names("pub struct Marker;\n").is_empty());
        }

        #[test]
        fn duplicates_collapse() {
            let text = "#[cfg(feature = \"a\")]\npub struct Dup { a: u8 }\n\
                        #[cfg(not(feature = \"a\"))]\npub struct Dup { b: u8 }\n";
            assert_eq!(names(text), vec!["Dup"]);
        }

        #[test]
        fn ignores_comments_and_strings() {
            let text = "// struct Ghost { }\n/* enum Phantom { A } */\n\
                        const S: &str = \"struct Quoted { }\";\nstruct Real { }\n";
            assert_eq!(names(text), vec!["Real"]);
        }

        #[test]
        fn generic_unit_struct_does_not_hide_next_type() {
            let text = "pub struct Marker<T>;\n\npub struct Real<U> {\n    u: U,\n}\n";
            assert_eq!(names(text), vec!["Real"]);
        }

        #[test]
        fn doc_comment_mentioning_generic_struct() {
            let text = "/// Like struct Old<T> but faster.\npub struct Fast<T> {\n    t: T,\n}\n";
            assert_eq!(names(text), vec!["Fast"]);
        }

        #[test]
        fn doc_comment_mentioning_parenthesized_struct() {
            let text = "/// Replaces struct Old (deprecated).\npub struct New(pub u8);\n";
            assert_eq!(names(text), vec!["New"]);
        }

        #[test]
        fn fn_bound_arrow_in_generics() {
            let text = "struct Hook<F: Fn(u8) -> u8> { f: F }\nstruct Tag<T>(T) where T: Copy;\n";
            assert_eq!(names(text), vec!["Hook", "Tag"]);
        }

        #[test]
        fn unit_struct_with_where_clause_is_skipped() {
            assert!(names("struct Unit<T> where T: Fn();\n").is_empty());
        }

        #[test]
        fn keyword_inside_identifier_is_not_a_match() {
            assert!(names("let mystruct Foo {").is_empty());
        }
    }

    mod site_tests {
        use super::*;

        #[test]
        fn mod_with_block() {
            let text = "mod tests {\n}\n";
            let found = sites(text);
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].kind, DeclarationKind::Mod);
            assert_eq!(found[0].declaration_text, "mod tests");
            assert_eq!(found[0].terminator, TerminatorKind::BlockOpen);
            assert_eq!(found[0].terminator_offset, 10);
        }

        #[test]
        fn mod_declaration_statement() {
            let found = sites("pub mod inner;\n");
            assert_eq!(found[0].terminator, TerminatorKind::StatementEnd);
            assert_eq!(found[0].declaration_text, "mod inner");
            assert_eq!(found[0].declaration_offset, 4);
        }

        #[test]
        fn fn_with_return_type_and_array() {
            let text = "fn digest(x: [u8; 4]) -> [u8; 32] {\n    todo!()\n}\n";
            let found = sites(text);
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].terminator, TerminatorKind::BlockOpen);
            assert_eq!(&text[found[0].terminator_offset..=found[0].terminator_offset], "{");
            assert_eq!(found[0].declaration_text, "fn digest(x: [u8; 4]) -> [u8; 32]");
        }

        #[test]
        fn generic_fn() {
            let text = "fn check<T: Fn() -> u8>(f: T) where T: Copy {}\n";
            let found = sites(text);
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].terminator_offset, text.len() - 3);
        }

        #[test]
        fn trait_fn_without_body() {
            let found = sites("trait T {\n    fn required(&self);\n}\n");
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].terminator, TerminatorKind::StatementEnd);
        }

        #[test]
        fn use_tree_brace_is_not_terminator() {
            let text = "use std::{fmt, io};\n";
            let found = sites(text);
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].kind, DeclarationKind::Use);
            assert_eq!(found[0].terminator, TerminatorKind::StatementEnd);
            assert_eq!(found[0].terminator_offset, text.len() - 2);
            assert_eq!(found[0].declaration_text, "use std::{fmt, io}");
        }

        #[test]
        fn sites_in_comments_are_skipped() {
            let text = "/*\n#[cfg(test)]\nmod tests {\n    fn a() {}\n}\n*/\nfn live() {}\n";
            let found = sites(text);
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].declaration_text, "fn live()");
        }

        #[test]
        fn nested_sites_are_all_found() {
            let text = "mod outer {\n    use super::*;\n    fn inner() {}\n}\n";
            let kinds: Vec<_> = sites(text).iter().map(|s| s.kind).collect();
            assert_eq!(
                kinds,
                vec![DeclarationKind::Mod, DeclarationKind::Use, DeclarationKind::Fn]
            );
        }

        #[test]
        fn sites_after_unterminated_comment_are_ambiguous() {
            let text = "fn ok() {}\n/* open\nfn lost() {}\n";
            let regions = RegionMap::build(text);
            let located = find_declaration_sites(text, &regions);
            assert_eq!(located.sites.len(), 1);
            assert_eq!(located.ambiguous, vec![text.find("fn lost").unwrap()]);
        }

        #[test]
        fn identifiers_containing_keywords_are_not_sites() {
            assert!(sites("let refuse = 1; let fnord = 2;").is_empty());
        }
    }
}

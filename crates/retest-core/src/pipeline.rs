//! Whole-file pipeline.
//!
//! One linear pass per file:
//!
//! ```text
//! regions -> type names -> declaration sites -> blocks -> classify
//!         -> rewrite plan -> apply -> (append scaffold)
//! ```
//!
//! The scaffold is appended only when the file declares at least one type
//! and does not already contain `mod generated_tests`.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::block::extract_blocks;
use crate::classify::{TestClassifier, DEFAULT_TEST_FEATURE};
use crate::error::ConfigError;
use crate::locate::{find_declaration_sites, find_type_names};
use crate::patch::{Conflict, ReplacementOp, RewritePlan};
use crate::scaffold::{ScaffoldConfig, ScaffoldGenerator};
use crate::scan::RegionMap;
use crate::text::LineIndex;
use crate::types::{DeclarationKind, TypeNames};

// ============================================================================
// Configuration
// ============================================================================

/// Settings shared by every file in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub scaffold: ScaffoldConfig,
    /// Feature accepted in `#[cfg(any(test, feature = "..."))]`.
    pub test_feature: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            scaffold: ScaffoldConfig::default(),
            test_feature: DEFAULT_TEST_FEATURE.to_string(),
        }
    }
}

// ============================================================================
// Report Types
// ============================================================================

/// 1-indexed, inclusive line range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineSpan {
    pub start_line: u32,
    pub end_line: u32,
}

/// A structural problem that left part of a file untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuralWarning {
    pub line: u32,
    pub col: u32,
    pub message: String,
}

/// What the pipeline found and did in one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub type_names: TypeNames,
    /// Lines of each neutralized block in the input text.
    pub neutralized: Vec<LineSpan>,
    pub reserved_module_found: bool,
    pub scaffold_appended: bool,
    pub warnings: Vec<StructuralWarning>,
}

/// New text for one file plus its report.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub text: String,
    pub report: FileReport,
    /// Every substitution made, against the input text, ascending.
    pub edits: Vec<ReplacementOp>,
    changed: bool,
}

impl FileOutcome {
    /// True iff the new text differs from the input.
    pub fn changed(&self) -> bool {
        self.changed
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// A validated [`PipelineConfig`], ready to process files.
///
/// Holds no per-file state; one instance is shared by all workers.
#[derive(Debug, Clone)]
pub struct Pipeline {
    classifier: TestClassifier,
    generator: ScaffoldGenerator,
}

impl Pipeline {
    /// Validate `config` and compile the classifier.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an invalid feature name, codec set or
    /// export path.
    pub fn new(config: &PipelineConfig) -> Result<Self, ConfigError> {
        Ok(Pipeline {
            classifier: TestClassifier::new(&config.test_feature)?,
            generator: ScaffoldGenerator::new(config.scaffold.clone())?,
        })
    }

    /// Run the whole pipeline over one file's text.
    pub fn process_source(&self, text: &str) -> FileOutcome {
        let lines = LineIndex::new(text);
        let regions = RegionMap::build(text);
        let mut report = FileReport::default();

        report.type_names = find_type_names(text, &regions);

        let located = find_declaration_sites(text, &regions);
        if let Some(err) = regions.unterminated() {
            let (line, col) = lines.position(err.offset());
            let message = if located.ambiguous.is_empty() {
                err.to_string()
            } else {
                format!(
                    "{}; {} declaration(s) after it left untouched",
                    err,
                    located.ambiguous.len()
                )
            };
            warn!(line, col, "{}", message);
            report.warnings.push(StructuralWarning { line, col, message });
        }

        report.reserved_module_found = located.sites.iter().any(|site| {
            site.kind == DeclarationKind::Mod && TestClassifier::is_exempt(&site.declaration_text)
        });

        let (mut blocks, skipped) = extract_blocks(text, &located.sites);
        for skip in skipped {
            let (line, col) = lines.position(skip.declaration_offset);
            report.warnings.push(StructuralWarning {
                line,
                col,
                message: format!("skipped '{}': {}", skip.declaration_text, skip.reason),
            });
        }

        self.classifier.classify_all(&mut blocks);

        let (plan, conflicts) = RewritePlan::from_test_blocks(text, &blocks);
        for conflict in conflicts {
            let offset = match &conflict {
                Conflict::PartialOverlap { dropped, .. } => dropped.start,
                Conflict::OutOfBounds { span, .. } | Conflict::Unwrappable { span } => span.start,
            };
            let (line, col) = lines.position(offset);
            warn!(line, col, "{}", conflict);
            report.warnings.push(StructuralWarning {
                line,
                col,
                message: conflict.to_string(),
            });
        }
        if plan.nested_count() > 0 {
            debug!(nested = plan.nested_count(), "test blocks covered by an outer test block");
        }

        report.neutralized = plan
            .ops()
            .iter()
            .map(|op| LineSpan {
                start_line: lines.position(op.start).0,
                end_line: lines.position(op.start + op.length.saturating_sub(1)).0,
            })
            .collect();

        let mut new_text = plan.apply(text);
        let mut edits = plan.ops().to_vec();

        if report.reserved_module_found {
            info!("Preserving existing 'mod generated_tests' module");
        } else if !report.type_names.is_empty() {
            let mut appended = String::new();
            if !text.is_empty() && !text.ends_with('\n') {
                appended.push('\n');
            }
            appended.push_str(&self.generator.generate(&report.type_names));
            new_text.push_str(&appended);
            edits.push(ReplacementOp {
                start: text.len(),
                length: 0,
                replacement: appended,
            });
            report.scaffold_appended = true;
        }

        let changed = new_text != text;
        FileOutcome {
            text: new_text,
            report,
            edits,
            changed,
        }
    }
}

/// Process one file's text with a freshly validated pipeline.
///
/// Batch callers should build a [`Pipeline`] once instead.
///
/// # Errors
///
/// See [`Pipeline::new`].
pub fn process_source(text: &str, config: &PipelineConfig) -> Result<FileOutcome, ConfigError> {
    Ok(Pipeline::new(config)?.process_source(text))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str) -> FileOutcome {
        Pipeline::new(&PipelineConfig::default())
            .unwrap()
            .process_source(text)
    }

    mod scenario_tests {
        use super::*;

        #[test]
        fn type_and_test_fn_get_wrapped_and_scaffolded() {
            let text = "pub struct TypeA {\n    pub x: u8,\n}\n\n#[cfg(test)]\nfn helper() {\n    let s = \"}\";\n}\n";
            let outcome = run(text);
            assert!(outcome.changed());
            let block = "\n#[cfg(test)]\nfn helper() {\n    let s = \"}\";\n}";
            assert!(outcome.text.contains(&format!("/*\n{}\n*/", block)));
            assert!(outcome.text.contains("mod generated_tests {"));
            assert!(outcome.text.contains("fn serialization_roundtrip_typea()"));
            assert!(outcome.report.scaffold_appended);
            assert_eq!(outcome.report.neutralized.len(), 1);
            assert_eq!(outcome.report.neutralized[0].end_line, 8);
        }

        #[test]
        fn no_types_no_tests_is_identity() {
            let text = "fn main() {\n    println!(\"{}\", 1);\n}\n";
            let outcome = run(text);
            assert!(!outcome.changed());
            assert_eq!(outcome.text, text);
            assert!(!outcome.report.scaffold_appended);
        }

        #[test]
        fn existing_scaffold_is_preserved_and_stray_test_wrapped() {
            let scaffold = "#[cfg(test)]\n#[allow(unused_imports)]\nmod generated_tests {\n    use super::*;\n\n    #[test]\n    fn serialization_roundtrip_a() {}\n}\n";
            let text = format!(
                "struct A {{ x: u8 }}\n\n#[cfg(test)]\nfn stray() {{}}\n\n{}",
                scaffold
            );
            let outcome = run(&text);
            assert!(outcome.report.reserved_module_found);
            assert!(!outcome.report.scaffold_appended);
            assert!(outcome.text.contains("/*\n\n#[cfg(test)]\nfn stray() {}\n*/"));
            assert!(outcome.text.ends_with(scaffold));
            assert_eq!(outcome.text.matches("mod generated_tests").count(), 1);
        }

        #[test]
        fn no_types_but_test_code_is_neutralized_only() {
            let text = "fn live() {}\n#[cfg(test)]\nmod tests {\n    #[test]\n    fn t() {}\n}\n";
            let outcome = run(text);
            assert!(outcome.changed());
            assert!(!outcome.report.scaffold_appended);
            assert!(!outcome.text.contains("generated_tests"));
            assert_eq!(outcome.report.neutralized.len(), 1);
        }
    }

    mod idempotence_tests {
        use super::*;

        const INPUT: &str = "use serde::{Deserialize, Serialize};\n\n\
            #[derive(Default, Serialize, Deserialize, PartialEq, Debug)]\n\
            pub struct Utxo {\n    amount: u64,\n}\n\n\
            #[derive(Default, Serialize, Deserialize, PartialEq, Debug)]\n\
            pub enum Kind {\n    #[default]\n    A,\n    B(u8),\n}\n\n\
            #[cfg(any(test, feature = \"arbitrary-impls\"))]\n\
            pub mod arbitrary {\n    use super::*;\n    fn gen() -> u8 { b'{' as u8 }\n}\n\n\
            #[cfg(test)]\nmod tests {\n    use super::*;\n\n    #[test]\n    fn works() {\n        assert_eq!(\"{\", \"{\");\n    }\n}\n";

        #[test]
        fn second_run_is_a_fixed_point() {
            let first = run(INPUT);
            assert!(first.changed());
            assert_eq!(first.report.neutralized.len(), 2);
            let second = run(&first.text);
            assert!(!second.changed(), "second run changed:\n{}", second.text);
            assert!(second.report.reserved_module_found);
            assert!(second.report.neutralized.is_empty());
        }

        #[test]
        fn leftover_marker_is_caught_on_rerun() {
            let first = run(INPUT);
            let edited = format!("{}\n#[cfg(test)]\nfn late() {{}}\n", first.text);
            let second = run(&edited);
            assert_eq!(second.report.neutralized.len(), 1);
            assert!(second.text.contains("/*\n\n#[cfg(test)]\nfn late() {}\n*/"));
            assert_eq!(second.text.matches("mod generated_tests").count(), 1);
        }

        #[test]
        fn wrapped_blocks_keep_their_bytes() {
            let first = run(INPUT);
            let start = INPUT.find("#[cfg(test)]").unwrap();
            let tests_block = &INPUT[start..INPUT.len() - 1];
            assert!(first.text.contains(tests_block));
        }
    }

    mod warning_tests {
        use super::*;

        #[test]
        fn unterminated_comment_leaves_later_code_alone() {
            let text = "struct S { a: u8 }\n/* open\n#[cfg(test)]\nfn t() {}\n";
            let outcome = run(text);
            assert!(outcome.report.neutralized.is_empty());
            assert_eq!(outcome.report.warnings.len(), 1);
            assert_eq!(outcome.report.warnings[0].line, 2);
        }

        #[test]
        fn unbalanced_test_block_is_skipped() {
            let text = "#[cfg(test)]\nmod tests {\n    fn a() {}\n";
            let outcome = run(text);
            assert!(outcome.report.neutralized.is_empty());
            assert_eq!(outcome.report.warnings.len(), 1);
            assert!(outcome.report.warnings[0].message.contains("mod tests"));
            assert_eq!(outcome.text, text);
        }

        #[test]
        fn block_with_comment_close_in_string_is_skipped() {
            let text = "struct S { a: u8 }\n\n#[cfg(test)]\nmod tests {\n    const END: &str = \"*/\";\n}\n";
            let outcome = run(text);
            assert!(outcome.report.neutralized.is_empty());
            assert_eq!(outcome.report.warnings.len(), 1);
            assert_eq!(outcome.report.warnings[0].line, 2);
            assert!(outcome.report.warnings[0].message.contains("unbalanced comment delimiters"));
            assert!(outcome.text.starts_with(text));
            assert!(outcome.report.scaffold_appended);
        }
    }

    mod config_tests {
        use super::*;

        #[test]
        fn invalid_feature_is_rejected() {
            let config = PipelineConfig {
                test_feature: "no spaces".to_string(),
                ..Default::default()
            };
            assert!(Pipeline::new(&config).is_err());
            assert!(process_source("", &config).is_err());
        }

        #[test]
        fn free_function_matches_pipeline() {
            let text = "enum E { A }\n";
            let outcome = process_source(text, &PipelineConfig::default()).unwrap();
            assert_eq!(outcome.text, run(text).text);
            assert!(outcome.text.starts_with(text));
        }

        #[test]
        fn missing_trailing_newline_is_added_before_scaffold() {
            let outcome = run("struct P(u8);");
            assert!(outcome.text.starts_with("struct P(u8);\n\n#[cfg(test)]\n"));
        }
    }
}

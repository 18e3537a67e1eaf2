//! Test-block classifier.
//!
//! A block is test code when its preamble carries, at the start of a line,
//! `#[cfg(test)]` or `#[cfg(any(test, feature = "<flag>"))]`. The generated
//! scaffold module is never test code for this purpose: re-running must
//! leave it alone.

use regex::Regex;

use crate::error::ConfigError;
use crate::types::Block;

/// Declaration text of the module the scaffold generator emits.
pub const SCAFFOLD_MODULE: &str = "mod generated_tests";

/// Feature flag accepted by the compound marker unless configured otherwise.
pub const DEFAULT_TEST_FEATURE: &str = "arbitrary-impls";

/// Classifies blocks as test code.
#[derive(Debug, Clone)]
pub struct TestClassifier {
    marker: Regex,
}

impl TestClassifier {
    /// Build a classifier accepting `feature` in the compound marker.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidFeatureName`] if `feature` is empty or
    /// contains characters outside `[A-Za-z0-9_-]`.
    pub fn new(feature: &str) -> Result<Self, ConfigError> {
        let valid = !feature.is_empty()
            && feature
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        if !valid {
            return Err(ConfigError::InvalidFeatureName {
                name: feature.to_string(),
            });
        }
        let pattern = format!(
            r#"(?m)^\s*#\[cfg\((?:test|any\(test,\s*feature\s*=\s*"{}"\))\)\]"#,
            regex::escape(feature)
        );
        let marker = Regex::new(&pattern).map_err(|_| ConfigError::InvalidFeatureName {
            name: feature.to_string(),
        })?;
        Ok(TestClassifier { marker })
    }

    /// Check a preamble for a line-anchored test marker.
    pub fn has_test_marker(&self, preamble: &str) -> bool {
        self.marker.is_match(preamble)
    }

    /// Check if a declaration is the reserved scaffold module.
    pub fn is_exempt(declaration_text: &str) -> bool {
        declaration_text.trim() == SCAFFOLD_MODULE
    }

    /// Decide whether `block` must be neutralized.
    pub fn is_test_block(&self, block: &Block) -> bool {
        !Self::is_exempt(&block.declaration_text) && self.has_test_marker(block.preamble())
    }

    /// Set `is_test_block` on every block.
    pub fn classify_all(&self, blocks: &mut [Block]) {
        for block in blocks {
            block.is_test_block = self.is_test_block(block);
        }
    }
}

impl Default for TestClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_TEST_FEATURE).expect("default test feature is a valid name")
    }
}

// ============================================================================
// Tests
// ============================================================================

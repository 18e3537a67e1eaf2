//! Scaffold generator: one serialization round-trip test per discovered type.
//!
//! The generated module is named `generated_tests` (see
//! [`SCAFFOLD_MODULE`](crate::classify::SCAFFOLD_MODULE)), which the
//! classifier exempts so repeated runs neither wrap nor duplicate it.
//!
//! Each test:
//! 1. constructs an instance (per [`InstanceMode`]),
//! 2. round-trips it through every configured [`Codec`] (at least one binary
//!    and one text form),
//! 3. asserts the decoded value equals the original,
//! 4. optionally cross-checks against the same-named type re-exported from
//!    `export_path`: identical encodings, and the local encoding decodes into
//!    the exported type and re-encodes identically.
//!
//! Generated tests require the type to implement `Serialize`,
//! `DeserializeOwned`, `PartialEq` and `Debug` (plus `Default` in
//! [`InstanceMode::Default`]).

use std::collections::{HashMap, HashSet};
use std::fmt::{self, Write as _};

use serde::Serialize;

use crate::error::ConfigError;
use crate::types::{TypeName, TypeNames};

// ============================================================================
// Configuration
// ============================================================================

/// How a generated test obtains its representative instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceMode {
    /// `T::default()`.
    #[default]
    Default,
    /// `todo!()`: the test compiles but must be completed by hand.
    Placeholder,
}

impl fmt::Display for InstanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceMode::Default => write!(f, "default"),
            InstanceMode::Placeholder => write!(f, "placeholder"),
        }
    }
}

/// Serialization format exercised by generated tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Codec {
    /// `bincode` 1.x (binary).
    Bincode,
    /// `serde_json` (text).
    SerdeJson,
    /// `serde_json_wasm` (text).
    SerdeJsonWasm,
}

impl Codec {
    /// Crate path used in generated code.
    pub fn crate_name(&self) -> &'static str {
        match self {
            Codec::Bincode => "bincode",
            Codec::SerdeJson => "serde_json",
            Codec::SerdeJsonWasm => "serde_json_wasm",
        }
    }

    /// Check if the codec produces bytes rather than text.
    pub fn is_binary(&self) -> bool {
        matches!(self, Codec::Bincode)
    }

    fn encoded_type(&self) -> &'static str {
        if self.is_binary() {
            "Vec<u8>"
        } else {
            "String"
        }
    }

    fn encode_fn(&self) -> &'static str {
        if self.is_binary() {
            "serialize"
        } else {
            "to_string"
        }
    }

    fn decode_fn(&self) -> &'static str {
        if self.is_binary() {
            "deserialize"
        } else {
            "from_str"
        }
    }

    fn encode(&self, value: &str) -> String {
        format!("{}::{}(&{})", self.crate_name(), self.encode_fn(), value)
    }

    fn decode(&self, encoded: &str) -> String {
        format!("{}::{}(&{})", self.crate_name(), self.decode_fn(), encoded)
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.crate_name())
    }
}

/// Settings for scaffold generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaffoldConfig {
    pub instance_mode: InstanceMode,
    /// Codecs in emission order; duplicates are ignored.
    pub codecs: Vec<Codec>,
    /// Rust path re-exporting counterpart types, e.g. `neptune_cash::api::export`.
    pub export_path: Option<String>,
}

impl Default for ScaffoldConfig {
    fn default() -> Self {
        ScaffoldConfig {
            instance_mode: InstanceMode::Default,
            codecs: vec![Codec::Bincode, Codec::SerdeJson],
            export_path: None,
        }
    }
}

impl ScaffoldConfig {
    /// Check the codec set and export path.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::IncompleteCodecSet`] without a binary and a text codec
    /// - [`ConfigError::InvalidExportPath`] if the path is not `ident(::ident)*`
    pub fn validate(&self) -> Result<(), ConfigError> {
        let has_binary = self.codecs.iter().any(Codec::is_binary);
        let has_text = self.codecs.iter().any(|c| !c.is_binary());
        if !has_binary || !has_text {
            let codecs = self
                .codecs
                .iter()
                .map(Codec::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(ConfigError::IncompleteCodecSet { codecs });
        }
        if let Some(path) = &self.export_path {
            validate_export_path(path)?;
        }
        Ok(())
    }

    fn unique_codecs(&self) -> Vec<Codec> {
        let mut seen = HashSet::new();
        self.codecs
            .iter()
            .copied()
            .filter(|c| seen.insert(*c))
            .collect()
    }
}

fn validate_export_path(path: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidExportPath {
        path: path.to_string(),
        reason: reason.to_string(),
    };
    if path.is_empty() {
        return Err(invalid("path is empty"));
    }
    for segment in path.split("::") {
        let mut chars = segment.chars();
        let Some(first) = chars.next() else {
            return Err(invalid("empty path segment"));
        };
        if !(first.is_ascii_alphabetic() || first == '_')
            || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(invalid(&format!("'{}' is not an identifier", segment)));
        }
    }
    Ok(())
}

// ============================================================================
// Function Naming
// ============================================================================

/// Derive one unique function-name stem per type.
///
/// The stem is the lower-cased type name. A stem already taken gets the
/// smallest numeric suffix (`_2`, `_3`, ...) that is still free.
pub fn function_stems(types: &TypeNames) -> Vec<(TypeName, String)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut used: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(types.len());

    for name in types {
        let base = name.as_str().to_lowercase();
        let count = counts.entry(base.clone()).or_insert(0);
        let mut stem = base.clone();
        loop {
            *count += 1;
            if *count > 1 {
                stem = format!("{}_{}", base, count);
            }
            if used.insert(stem.clone()) {
                break;
            }
        }
        out.push((name.clone(), stem));
    }

    out
}

// ============================================================================
// Generation
// ============================================================================

/// Emits the `generated_tests` module for a set of types.
#[derive(Debug, Clone)]
pub struct ScaffoldGenerator {
    config: ScaffoldConfig,
}

impl ScaffoldGenerator {
    /// Create a generator; the config is validated here.
    ///
    /// # Errors
    ///
    /// See [`ScaffoldConfig::validate`].
    pub fn new(config: ScaffoldConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(ScaffoldGenerator { config })
    }

    /// Module source text, starting with a blank line and ending with `}\n`.
    pub fn generate(&self, types: &TypeNames) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_module(&mut out, types);
        out
    }

    fn write_module(&self, out: &mut String, types: &TypeNames) -> fmt::Result {
        writeln!(out)?;
        writeln!(out, "#[cfg(test)]")?;
        writeln!(out, "#[allow(unused_imports)]")?;
        writeln!(out, "#[allow(unused_variables)]")?;
        writeln!(out, "#[allow(unreachable_code)]")?;
        writeln!(out, "mod generated_tests {{")?;
        writeln!(
            out,
            "    // Generated by retest. Instance mode: {}.",
            self.config.instance_mode
        )?;
        writeln!(out, "    use super::*;")?;

        if let Some(path) = &self.config.export_path {
            let list = types
                .iter()
                .map(TypeName::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(out)?;
            writeln!(out, "    mod exported {{")?;
            writeln!(out, "        pub use {}::{{{}}};", path, list)?;
            writeln!(out, "    }}")?;
        }

        let codecs = self.config.unique_codecs();
        for (name, stem) in function_stems(types) {
            writeln!(out)?;
            self.write_test(out, &name, &stem, &codecs)?;
        }

        writeln!(out, "}}")
    }

    fn construct(&self, ty: &str) -> String {
        match self.config.instance_mode {
            InstanceMode::Default => format!("{}::default()", ty),
            InstanceMode::Placeholder => format!("todo!(\"construct a representative {}\")", ty),
        }
    }

    fn write_test(&self, out: &mut String, name: &TypeName, stem: &str, codecs: &[Codec]) -> fmt::Result {
        let ty = name.as_str();
        writeln!(out, "    #[test]")?;
        writeln!(out, "    fn serialization_roundtrip_{}() {{", stem)?;
        writeln!(out, "        let original: {} = {};", ty, self.construct(ty))?;

        for codec in codecs {
            writeln!(out)?;
            writeln!(out, "        {{")?;
            writeln!(
                out,
                "            let encoded: {} = {}.expect(\"{} serialize {}\");",
                codec.encoded_type(),
                codec.encode("original"),
                codec,
                ty
            )?;
            writeln!(
                out,
                "            let decoded: {} = {}.expect(\"{} deserialize {}\");",
                ty,
                codec.decode("encoded"),
                codec,
                ty
            )?;
            writeln!(
                out,
                "            assert_eq!(original, decoded, \"{} round-trip changed {}\");",
                codec, ty
            )?;
            writeln!(out, "        }}")?;
        }

        if self.config.export_path.is_some() {
            let exported_ty = format!("exported::{}", ty);
            writeln!(out)?;
            writeln!(
                out,
                "        let exported_instance: {} = {};",
                exported_ty,
                self.construct(&exported_ty)
            )?;
            for codec in codecs {
                writeln!(out)?;
                writeln!(out, "        {{")?;
                writeln!(
                    out,
                    "            let local: {} = {}.expect(\"{} serialize {}\");",
                    codec.encoded_type(),
                    codec.encode("original"),
                    codec,
                    ty
                )?;
                writeln!(
                    out,
                    "            let remote: {} = {}.expect(\"{} serialize {}\");",
                    codec.encoded_type(),
                    codec.encode("exported_instance"),
                    codec,
                    exported_ty
                )?;
                writeln!(
                    out,
                    "            assert_eq!(local, remote, \"{} encodings of {} and {} differ\");",
                    codec, ty, exported_ty
                )?;
                writeln!(
                    out,
                    "            let crossed: {} = {}.expect(\"{} deserialize {} into {}\");",
                    exported_ty,
                    codec.decode("local"),
                    codec,
                    ty,
                    exported_ty
                )?;
                writeln!(
                    out,
                    "            let recrossed: {} = {}.expect(\"{} serialize {}\");",
                    codec.encoded_type(),
                    codec.encode("crossed"),
                    codec,
                    exported_ty
                )?;
                writeln!(
                    out,
                    "            assert_eq!(local, recrossed, \"{} re-encoding through {} changed bytes\");",
                    codec, exported_ty
                )?;
                writeln!(out, "        }}")?;
            }
        }

        writeln!(out, "    }}")
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Drives the CLI entry point against scratch trees.

use std::fs;

use retest::cli::{run, RunArgs};
use retest::{ExitStatus, RetestError};
use retest_core::scaffold::{Codec, InstanceMode};
use tempfile::TempDir;

const SOURCE: &str = "#[derive(Default, PartialEq, Debug)]\npub struct Utxo {\n    coins: Vec<u64>,\n}\n\n#[cfg(any(test, feature = \"fuzzing\"))]\nmod arbitrary {\n    use super::*;\n}\n";

fn tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("utxo.rs"), SOURCE).unwrap();
    dir
}

#[test]
fn missing_root_maps_to_exit_code_3() {
    let err = run(&RunArgs::new("/no/such/dir")).unwrap_err();
    assert!(matches!(err, RetestError::RootNotFound { .. }));
    assert_eq!(ExitStatus::from(&err).code(), 3);
    assert_eq!(err.to_string(), "root directory '/no/such/dir' not found");
}

#[test]
fn invalid_export_path_maps_to_exit_code_1() {
    let dir = tree();
    let mut args = RunArgs::new(dir.path());
    args.export_path = Some("not::a path".to_string());
    let err = run(&args).unwrap_err();
    assert_eq!(ExitStatus::from(&err).code(), 1);
    // Nothing was touched.
    assert_eq!(fs::read_to_string(dir.path().join("utxo.rs")).unwrap(), SOURCE);
}

#[test]
fn configured_feature_marks_test_code() {
    let dir = tree();
    let mut args = RunArgs::new(dir.path());
    args.test_feature = "fuzzing".to_string();
    let summary = run(&args).unwrap();
    assert_eq!(summary.blocks_neutralized, 1);

    let out = fs::read_to_string(dir.path().join("utxo.rs")).unwrap();
    assert!(out.contains("/*\n\n#[cfg(any(test, feature = \"fuzzing\"))]\nmod arbitrary {"));
}

#[test]
fn default_feature_leaves_other_features_alone() {
    let dir = tree();
    let summary = run(&RunArgs::new(dir.path())).unwrap();
    assert_eq!(summary.blocks_neutralized, 0);
    assert_eq!(summary.scaffolds_appended, 1);
}

#[test]
fn placeholder_mode_export_path_and_codecs_reach_generated_code() {
    let dir = tree();
    let mut args = RunArgs::new(dir.path());
    args.mode = InstanceMode::Placeholder;
    args.codecs = vec![Codec::Bincode, Codec::SerdeJsonWasm];
    args.export_path = Some("neptune_cash::api::export".to_string());
    run(&args).unwrap();

    let out = fs::read_to_string(dir.path().join("utxo.rs")).unwrap();
    assert!(out.contains("let original: Utxo = todo!("));
    assert!(out.contains("pub use neptune_cash::api::export::{Utxo};"));
    assert!(out.contains("serde_json_wasm::to_string(&original)"));
    assert!(!out.contains("serde_json::to_string"));
}

#[test]
fn summary_serializes_with_schema_version() {
    let dir = tree();
    let mut args = RunArgs::new(dir.path());
    args.dry_run = true;
    let summary = run(&args).unwrap();
    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["schema_version"], retest::SCHEMA_VERSION);
    assert_eq!(json["dry_run"], true);
    assert_eq!(json["diffs"][0]["path"], "utxo.rs");
}

//! retest - neutralize Rust test code and scaffold serialization tests.
//!
//! This crate provides the `retest` binary. The library half exists so the
//! run can be exercised from tests.
//!
//! ## Modules
//!
//! - `cli` - run arguments and the `run` entry point

pub mod cli;

// Re-export core types for convenience
pub use retest_core::error::{ExitStatus, RetestError};
pub use retest_core::output::SCHEMA_VERSION;
pub use retest_core::RunSummary;

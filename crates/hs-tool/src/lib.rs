mod case;
mod runner;
mod source;

pub use case::{Expectation, TestAction, TestCase, TESTCASE_SCHEMA_V1};
pub use runner::{assert_case, run_case, Mismatch, RunReport};
pub use source::{collect_case_files, read_test_case};

use std::path::PathBuf;

use hs_core::ErrorDescriptor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HsToolError {
    #[error("Failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse testcase {path}: {source}")]
    ParseCase {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid testcase schema version \"{found}\", expected \"{expected}\".")]
    InvalidSchemaVersion { expected: String, found: String },
    #[error("No .json testcases under {path}.")]
    SourceEmpty { path: PathBuf },
    #[error("Failed to start the async runtime: {0}")]
    AsyncRuntime(std::io::Error),
    #[error("Runtime error: {0}")]
    Runtime(ErrorDescriptor),
    #[error("Action {index} targets \"{target}\": {source}")]
    ActionTarget {
        index: usize,
        target: String,
        source: ErrorDescriptor,
    },
    #[error("{count} behaviour(s) failed to install, first: {first}")]
    ScanFailed { count: usize, first: ErrorDescriptor },
    #[error("Handler reported an error: {error}")]
    HandlerFailed { error: ErrorDescriptor },
    #[error("Expectation {index} failed. expected={expected} actual={actual}")]
    ExpectationMismatch {
        index: usize,
        expected: String,
        actual: String,
    },
    #[error("Failed to serialize expectation for diff: {0}")]
    ExpectationSerialize(serde_json::Error),
}

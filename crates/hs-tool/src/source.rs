use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::{HsToolError, TestCase, TESTCASE_SCHEMA_V1};

/// Every `.json` case under `root` in path order, or `root` itself when it is a file.
pub fn collect_case_files(root: &Path) -> Result<Vec<PathBuf>, HsToolError> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let cases: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();

    if cases.is_empty() {
        return Err(HsToolError::SourceEmpty {
            path: root.to_path_buf(),
        });
    }
    Ok(cases)
}

pub fn read_test_case(case_path: &Path) -> Result<TestCase, HsToolError> {
    let raw = fs::read_to_string(case_path).map_err(|source| HsToolError::ReadFile {
        path: case_path.to_path_buf(),
        source,
    })?;
    let parsed: TestCase = serde_json::from_str(&raw).map_err(|source| HsToolError::ParseCase {
        path: case_path.to_path_buf(),
        source,
    })?;

    if parsed.schema_version != TESTCASE_SCHEMA_V1 {
        return Err(HsToolError::InvalidSchemaVersion {
            expected: TESTCASE_SCHEMA_V1.to_string(),
            found: parsed.schema_version,
        });
    }

    Ok(parsed)
}

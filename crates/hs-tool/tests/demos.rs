use std::path::PathBuf;

use hs_tool::{assert_case, collect_case_files, read_test_case};

fn demos_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("demos")
}

#[test]
fn every_demo_case_passes() {
    let cases = collect_case_files(&demos_root()).expect("demos should contain cases");
    assert!(cases.len() >= 10);

    let failures: Vec<String> = cases
        .iter()
        .filter_map(|path| {
            assert_case(path)
                .err()
                .map(|error| format!("{}: {}", path.display(), error))
        })
        .collect();
    assert!(failures.is_empty(), "failing demos:\n{}", failures.join("\n"));
}

#[test]
fn every_demo_case_is_named() {
    for path in collect_case_files(&demos_root()).expect("demos should contain cases") {
        let case = read_test_case(&path).expect("demo should parse");
        assert!(case.name.is_some(), "{} has no name", path.display());
        assert!(!case.expectations.is_empty(), "{} checks nothing", path.display());
    }
}

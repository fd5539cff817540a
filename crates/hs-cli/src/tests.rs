use super::*;

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time should be monotonic")
        .as_nanos();
    std::env::temp_dir().join(format!("hs-cli-{}-{}", name, nanos))
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent should be created");
    }
    fs::write(path, content).expect("file should be written");
}

fn exec_args(markup: &Path) -> ExecArgs {
    ExecArgs {
        markup: markup.to_string_lossy().to_string(),
        config: None,
        triggers: Vec::new(),
        detail: None,
        run: None,
        on: None,
    }
}

fn demos_dir() -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("demos")
        .to_string_lossy()
        .to_string()
}

#[test]
fn parse_trigger_splits_selector_and_event() {
    assert_eq!(
        parse_trigger("#save:click").expect("trigger"),
        ("#save".to_string(), "click".to_string())
    );
    assert_eq!(
        parse_trigger("main > button : custom").expect("trigger"),
        ("main > button".to_string(), "custom".to_string())
    );
    let error = parse_trigger("#save").expect_err("no event");
    assert_eq!(error.code, "CLI_TRIGGER_INVALID");
    assert!(!error.suggestions.is_empty());
    assert!(parse_trigger(":click").is_err());
}

#[test]
fn execute_installs_triggers_and_serializes_markup() {
    let root = temp_path("exec");
    let markup = root.join("page.xhtml");
    write_file(
        &markup,
        r#"<main><button id="b" _="on click add .active to me then set $clicked to event.detail"/></main>"#,
    );
    let config = root.join("config.json");
    write_file(&config, r#"{"emitNotifications": false}"#);

    let mut args = exec_args(&markup);
    args.config = Some(config.to_string_lossy().to_string());
    args.triggers = vec!["#b:click".to_string()];
    args.detail = Some(r#"{"x": 1}"#.to_string());
    let output = execute(&args).expect("exec should pass");

    assert_eq!(output.scan.installed.len(), 1);
    assert_eq!(output.invocations.len(), 1);
    assert!(output.invocations[0].outcome.success);
    assert!(output.markup.contains(r#"class="active""#), "{}", output.markup);
}

#[test]
fn execute_runs_ad_hoc_commands_on_a_selected_element() {
    let markup = temp_path("exec-run").join("page.xhtml");
    write_file(&markup, r#"<main><p id="out">old</p></main>"#);

    let mut args = exec_args(&markup);
    args.run = Some("put 'new' into me".to_string());
    args.on = Some("#out".to_string());
    let output = execute(&args).expect("exec should pass");
    assert_eq!(output.invocations[0].event, "run");
    assert!(output.markup.contains(">new</p>"), "{}", output.markup);
}

#[test]
fn execute_reports_input_errors() {
    let missing = temp_path("missing").join("page.xhtml");
    let error = execute(&exec_args(&missing)).expect_err("missing markup");
    assert_eq!(error.code, "CLI_SOURCE_READ");

    let markup = temp_path("exec-errors").join("page.xhtml");
    write_file(&markup, "<main/>");

    let mut args = exec_args(&markup);
    args.triggers = vec!["#ghost:click".to_string()];
    assert_eq!(
        execute(&args).expect_err("unknown target").code,
        "API_TARGET_NOT_FOUND"
    );

    let mut args = exec_args(&markup);
    args.detail = Some("{".to_string());
    assert_eq!(execute(&args).expect_err("bad detail").code, "CLI_DETAIL_INVALID");

    let mut args = exec_args(&markup);
    args.config = Some(temp_path("no-config").to_string_lossy().to_string());
    assert_eq!(execute(&args).expect_err("missing config").code, "CLI_CONFIG_READ");
}

#[test]
fn case_command_runs_the_demos() {
    assert_eq!(run_cli_from_args(["hs-cli", "case", demos_dir().as_str()]), 0);
}

#[test]
fn case_command_fails_on_a_failing_case() {
    let case = temp_path("failing-case").join("case.json");
    write_file(
        &case,
        r##"{"schemaVersion":"hs-tool-case.v1","markup":"<main id=\"m\"/>","expectations":[{"kind":"hasClass","target":"#m","class":"x"}]}"##,
    );
    let case = case.to_string_lossy().to_string();
    assert_eq!(run_cli_from_args(["hs-cli", "case", case.as_str()]), 1);

    let empty = temp_path("empty-cases");
    fs::create_dir_all(&empty).expect("dir should be created");
    let empty = empty.to_string_lossy().to_string();
    assert_eq!(run_cli_from_args(["hs-cli", "case", empty.as_str()]), 1);
}

#[test]
fn cli_rejects_unknown_arguments_and_emits_errors() {
    assert_eq!(run_cli_from_args(["hs-cli", "explode"]), 2);
    assert_eq!(run_cli_from_args(["hs-cli", "exec", "x.xhtml", "--on", "#b"]), 2);
    assert_eq!(
        emit_error(ErrorDescriptor::invalid_argument("CLI_TEST", "boom").suggest("try again")),
        1
    );
}

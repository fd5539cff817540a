use std::path::Path;
use std::time::Duration;

use hs_api::{create_runtime, CreateRuntimeOptions, InvocationReport, Runtime};
use hs_core::{ElementId, ErrorDescriptor, Value};
use hs_dom::Document;
use log::debug;
use serde::Serialize;

use crate::source::read_test_case;
use crate::{Expectation, HsToolError, TestAction, TestCase};

/// One expectation that did not hold, with the state actually observed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    pub index: usize,
    pub expected: Expectation,
    pub actual: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub scan_errors: Vec<ErrorDescriptor>,
    pub invocations: Vec<InvocationReport>,
    pub mismatches: Vec<Mismatch>,
}

impl RunReport {
    pub fn handler_errors(&self) -> impl Iterator<Item = &ErrorDescriptor> {
        self.invocations.iter().flat_map(|invocation| {
            invocation
                .errors
                .iter()
                .chain(invocation.outcome.error.as_ref())
        })
    }
}

/// Runs the case on a paused-clock, single-threaded runtime, so `wait` and `advance` use
/// virtual time and finish instantly.
pub fn run_case(case: &TestCase) -> Result<RunReport, HsToolError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .map_err(HsToolError::AsyncRuntime)?;
    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, drive_case(case))
}

async fn drive_case(case: &TestCase) -> Result<RunReport, HsToolError> {
    let runtime = create_runtime(CreateRuntimeOptions {
        markup: case.markup.clone(),
        options: case.config.clone(),
        options_json: None,
    })
    .map_err(HsToolError::Runtime)?;
    let scan = runtime.scan().await;
    let mut invocations = scan.invocations;

    for (index, action) in case.actions.iter().enumerate() {
        debug!("action {}: {}", index, action.kind_name());
        match action {
            TestAction::Trigger {
                target,
                event,
                detail,
                detached,
            } => {
                let element =
                    runtime
                        .select(target)
                        .map_err(|source| HsToolError::ActionTarget {
                            index,
                            target: target.clone(),
                            source,
                        })?;
                let detail = detail.as_ref().map(Value::from_json).unwrap_or(Value::Null);
                if *detached {
                    let background = runtime.clone();
                    let event = event.clone();
                    tokio::task::spawn_local(async move {
                        background.trigger(element, &event, detail).await;
                    });
                    // let the detached handlers run up to their first suspension point
                    tokio::task::yield_now().await;
                } else {
                    invocations.extend(runtime.trigger(element, event, detail).await);
                }
            }
            TestAction::Advance { ms } => {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
        }
    }

    let mismatches = case
        .expectations
        .iter()
        .enumerate()
        .filter_map(|(index, expectation)| {
            check_expectation(&runtime, expectation)
                .err()
                .map(|actual| Mismatch {
                    index,
                    expected: expectation.clone(),
                    actual,
                })
        })
        .collect();

    Ok(RunReport {
        scan_errors: scan.errors,
        invocations,
        mismatches,
    })
}

/// `Err` carries a description of what was found instead.
fn check_expectation(runtime: &Runtime, expectation: &Expectation) -> Result<(), String> {
    match expectation {
        Expectation::HasClass { target, class } | Expectation::LacksClass { target, class } => {
            let wanted = matches!(expectation, Expectation::HasClass { .. });
            with_element(runtime, target, |doc, id| {
                let classes = doc.class_list(id);
                if classes.iter().any(|name| name == class) == wanted {
                    Ok(())
                } else {
                    Err(format!("class=\"{}\"", classes.join(" ")))
                }
            })
        }
        Expectation::Text { target, text } => with_element(runtime, target, |doc, id| {
            let actual = doc.text_content(id);
            if actual.trim() == text.trim() {
                Ok(())
            } else {
                Err(format!("text={:?}", actual))
            }
        }),
        Expectation::Attribute {
            target,
            name,
            value,
        } => with_element(runtime, target, |doc, id| {
            let actual = doc.get_attribute(id, name);
            if actual == value.as_deref() {
                Ok(())
            } else {
                Err(format!("{}={:?}", name, actual))
            }
        }),
        Expectation::Hidden { target } | Expectation::Visible { target } => {
            let wanted = matches!(expectation, Expectation::Hidden { .. });
            with_element(runtime, target, |doc, id| {
                if is_hidden(doc, id) == wanted {
                    Ok(())
                } else {
                    Err(format!(
                        "{} (style=\"{}\")",
                        if wanted { "visible" } else { "hidden" },
                        doc.get_attribute(id, "style").unwrap_or_default()
                    ))
                }
            })
        }
        Expectation::Global { name, value } => {
            let actual = runtime
                .global(name)
                .map(|global| global.to_json())
                .unwrap_or(serde_json::Value::Null);
            if &actual == value {
                Ok(())
            } else {
                Err(format!("{}={}", name, actual))
            }
        }
        Expectation::Count { selector, count } => {
            let found = runtime
                .dom()
                .read(|doc| doc.query_selector_all(selector))
                .map_err(|error| error.to_string())?;
            if found.len() == *count {
                Ok(())
            } else {
                Err(format!("{} element(s)", found.len()))
            }
        }
    }
}

fn with_element(
    runtime: &Runtime,
    selector: &str,
    check: impl FnOnce(&Document, ElementId) -> Result<(), String>,
) -> Result<(), String> {
    let element = runtime.select(selector).map_err(|error| error.message)?;
    runtime.dom().read(|doc| check(doc, element))
}

fn is_hidden(doc: &Document, id: ElementId) -> bool {
    doc.has_attribute(id, "hidden") || doc.style_property(id, "display").as_deref() == Some("none")
}

/// Reads, runs and checks one case file. Scan failures, handler errors (unless the case
/// allows them) and the first failed expectation are reported as errors.
pub fn assert_case(case_path: &Path) -> Result<RunReport, HsToolError> {
    let case = read_test_case(case_path)?;
    let report = run_case(&case)?;

    if let Some(error) = report.scan_errors.first() {
        return Err(HsToolError::ScanFailed {
            count: report.scan_errors.len(),
            first: error.clone(),
        });
    }
    if !case.allow_errors {
        if let Some(error) = report.handler_errors().next() {
            return Err(HsToolError::HandlerFailed {
                error: error.clone(),
            });
        }
    }
    if let Some(mismatch) = report.mismatches.first() {
        let expected =
            serde_json::to_string(&mismatch.expected).map_err(HsToolError::ExpectationSerialize)?;
        return Err(HsToolError::ExpectationMismatch {
            index: mismatch.index,
            expected,
            actual: mismatch.actual.clone(),
        });
    }

    Ok(report)
}

#[cfg(test)]
mod runner_tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time should move forward")
            .as_nanos();
        std::env::temp_dir().join(format!("hs-tool-runner-{}-{}", name, nanos))
    }

    fn case(markup: &str, actions: Vec<TestAction>, expectations: Vec<Expectation>) -> TestCase {
        TestCase {
            schema_version: crate::TESTCASE_SCHEMA_V1.to_string(),
            name: None,
            markup: markup.to_string(),
            config: None,
            allow_errors: false,
            actions,
            expectations,
        }
    }

    fn click(target: &str) -> TestAction {
        TestAction::Trigger {
            target: target.to_string(),
            event: "click".to_string(),
            detail: None,
            detached: false,
        }
    }

    #[test]
    fn run_case_triggers_handlers_and_checks_every_expectation_kind() {
        let report = run_case(&case(
            r#"<main>
                 <button id="b" _="on click toggle .on then put 'done' into #out then increment $n then hide #gone"/>
                 <p id="out">old</p>
                 <p id="gone"/>
                 <ul><li/><li/></ul>
               </main>"#,
            vec![click("#b")],
            vec![
                Expectation::HasClass {
                    target: "#b".to_string(),
                    class: "on".to_string(),
                },
                Expectation::LacksClass {
                    target: "#out".to_string(),
                    class: "on".to_string(),
                },
                Expectation::Text {
                    target: "#out".to_string(),
                    text: "done".to_string(),
                },
                Expectation::Attribute {
                    target: "#out".to_string(),
                    name: "title".to_string(),
                    value: None,
                },
                Expectation::Hidden {
                    target: "#gone".to_string(),
                },
                Expectation::Visible {
                    target: "#out".to_string(),
                },
                Expectation::Global {
                    name: "$n".to_string(),
                    value: serde_json::json!(1),
                },
                Expectation::Count {
                    selector: "li".to_string(),
                    count: 2,
                },
            ],
        ))
        .expect("run should pass");

        assert!(report.scan_errors.is_empty());
        assert_eq!(report.invocations.len(), 1);
        assert_eq!(report.mismatches, Vec::new());
    }

    #[test]
    fn run_case_reports_mismatches_with_observed_state() {
        let report = run_case(&case(
            r#"<main><button id="b" class="idle"/></main>"#,
            Vec::new(),
            vec![
                Expectation::HasClass {
                    target: "#b".to_string(),
                    class: "active".to_string(),
                },
                Expectation::Global {
                    name: "$missing".to_string(),
                    value: serde_json::json!(true),
                },
                Expectation::Text {
                    target: "#nowhere".to_string(),
                    text: String::new(),
                },
            ],
        ))
        .expect("run should pass");

        let actual: Vec<(usize, String)> = report
            .mismatches
            .iter()
            .map(|mismatch| (mismatch.index, mismatch.actual.clone()))
            .collect();
        assert_eq!(
            actual,
            vec![
                (0, "class=\"idle\"".to_string()),
                (1, "$missing=null".to_string()),
                (2, "No element matches '#nowhere'.".to_string()),
            ]
        );
    }

    #[test]
    fn detached_trigger_observes_state_between_waits() {
        let markup = r#"<main><button id="b" _="on click add .busy then wait 1s then remove .busy then add .finished"/></main>"#;
        let detached = TestAction::Trigger {
            target: "#b".to_string(),
            event: "click".to_string(),
            detail: None,
            detached: true,
        };
        let busy = Expectation::HasClass {
            target: "#b".to_string(),
            class: "busy".to_string(),
        };
        let finished = Expectation::HasClass {
            target: "#b".to_string(),
            class: "finished".to_string(),
        };

        let midway = run_case(&case(
            markup,
            vec![detached.clone(), TestAction::Advance { ms: 500 }],
            vec![busy.clone(), finished.clone()],
        ))
        .expect("midway run");
        assert_eq!(midway.mismatches.len(), 1);
        assert_eq!(midway.mismatches[0].index, 1);

        let after = run_case(&case(
            markup,
            vec![detached, TestAction::Advance { ms: 1_500 }],
            vec![finished],
        ))
        .expect("late run");
        assert_eq!(after.mismatches, Vec::new());
    }

    #[test]
    fn run_case_fails_on_unknown_action_target_and_bad_markup() {
        let error = run_case(&case("<main/>", vec![click("#ghost")], Vec::new()))
            .expect_err("missing target");
        assert!(matches!(error, HsToolError::ActionTarget { index: 0, .. }));

        let error = run_case(&case("<main>", Vec::new(), Vec::new())).expect_err("bad markup");
        assert!(matches!(error, HsToolError::Runtime(_)));
    }

    #[test]
    fn assert_case_surfaces_handler_errors_unless_allowed() {
        let root = temp_dir("assert");
        fs::create_dir_all(&root).expect("root should exist");
        let failing = root.join("failing.json");
        let body = |allow: bool| {
            format!(
                r##"{{
  "schemaVersion": "hs-tool-case.v1",
  "markup": "<main><button id=\"b\" _=\"on click set $x to 1 / 0\"/></main>",
  "allowErrors": {},
  "actions": [{{"kind": "trigger", "target": "#b", "event": "click"}}]
}}"##,
                allow
            )
        };

        fs::write(&failing, body(false)).expect("case should be written");
        let error = assert_case(&failing).expect_err("handler error");
        assert!(matches!(error, HsToolError::HandlerFailed { .. }));

        fs::write(&failing, body(true)).expect("case should be written");
        let report = assert_case(&failing).expect("errors allowed");
        assert_eq!(report.handler_errors().count(), 1);
    }

    #[test]
    fn assert_case_reports_scan_failures_and_mismatches() {
        let root = temp_dir("assert-fail");
        fs::create_dir_all(&root).expect("root should exist");

        let broken = root.join("broken.json");
        fs::write(
            &broken,
            r#"{"schemaVersion":"hs-tool-case.v1","markup":"<main _=\"click add .x\"/>"}"#,
        )
        .expect("case should be written");
        assert!(matches!(
            assert_case(&broken).expect_err("scan failure"),
            HsToolError::ScanFailed { count: 1, .. }
        ));

        let wrong = root.join("wrong.json");
        fs::write(
            &wrong,
            r##"{"schemaVersion":"hs-tool-case.v1","markup":"<main id=\"m\"/>","expectations":[{"kind":"hidden","target":"#m"}]}"##,
        )
        .expect("case should be written");
        assert!(matches!(
            assert_case(&wrong).expect_err("mismatch"),
            HsToolError::ExpectationMismatch { index: 0, .. }
        ));
    }
}

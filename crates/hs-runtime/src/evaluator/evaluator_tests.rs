use hs_core::{ErrorKind, ResultEnvelope, ValueType};
use hs_dom::{parse_document, Dom};

use super::*;
use crate::context::Globals;

fn fixture() -> (Dom, ElementIds) {
    let doc = parse_document(r#"<main><button id="a"/><div id="b"/></main>"#)
        .expect("fixture should parse");
    let dom = Dom::new(doc);
    let ids = dom.read(|doc| ElementIds {
        a: doc.elements_by_id("a")[0],
        b: doc.elements_by_id("b")[0],
    });
    (dom, ids)
}

struct ElementIds {
    a: hs_core::ElementId,
    b: hs_core::ElementId,
}

fn context(options: &RuntimeOptions) -> (Evaluator, ExecutionContext, ElementIds) {
    let (dom, ids) = fixture();
    let ctx = ExecutionContext::new(dom, Globals::default()).with_me(ids.a);
    (Evaluator::new(options.clone()), ctx, ids)
}

async fn run(
    evaluator: &Evaluator,
    ctx: &mut ExecutionContext,
    source: &str,
) -> BoundaryOutcome {
    let body = hs_parser::parse_commands(source).expect("commands should parse");
    evaluator.run_to_boundary(&body, ctx).await
}

fn eval(evaluator: &Evaluator, ctx: &ExecutionContext, source: &str) -> EvalResult {
    let node = hs_parser::parse_expression(source).expect("expression should parse");
    evaluator.evaluate(&node, ctx)
}

#[test]
fn literals_evaluate_with_inferred_types() {
    let (evaluator, ctx, ids) = context(&RuntimeOptions::default());
    let cases = [
        ("42", ValueType::Number),
        ("'hi'", ValueType::String),
        ("true", ValueType::Boolean),
        ("null", ValueType::Null),
        ("[1, 2]", ValueType::Array),
        ("{a: 1}", ValueType::Object),
        ("me", ValueType::Element),
        ("nothing", ValueType::Undefined),
    ];
    for (source, expected) in cases {
        let value = eval(&evaluator, &ctx, source).expect("literal should evaluate");
        assert_eq!(value.value_type(), expected, "{}", source);
    }
    assert_eq!(
        eval(&evaluator, &ctx, "#b").expect("id ref"),
        Value::Element(ids.b)
    );
    assert_eq!(eval(&evaluator, &ctx, "#missing").expect("missing id"), Value::Null);
}

#[test]
fn division_by_zero_surfaces_as_failed_envelope() {
    let (evaluator, ctx, _) = context(&RuntimeOptions::default());
    let envelope = ResultEnvelope::from(&eval(&evaluator, &ctx, "10 / 0"));
    assert!(!envelope.success);
    let error = envelope.error.expect("error should be present");
    assert_eq!(error.kind, ErrorKind::RuntimeError);

    let envelope = ResultEnvelope::from(&eval(&evaluator, &ctx, "1 + 2 * 3"));
    assert!(envelope.success);
    assert_eq!(envelope.value, Some(serde_json::json!(7)));
    assert_eq!(envelope.value_type, Some(ValueType::Number));
}

#[test]
fn logical_operators_short_circuit() {
    let (evaluator, ctx, _) = context(&RuntimeOptions::default());
    assert_eq!(
        eval(&evaluator, &ctx, "false and (1 / 0)").expect("and short-circuits"),
        Value::Boolean(false)
    );
    assert_eq!(
        eval(&evaluator, &ctx, "true or (1 / 0)").expect("or short-circuits"),
        Value::Boolean(true)
    );
    assert!(eval(&evaluator, &ctx, "true and (1 / 0)").is_err());
}

#[test]
fn unknown_function_in_expression_is_a_validation_error() {
    let (evaluator, ctx, _) = context(&RuntimeOptions::default());
    let error = eval(&evaluator, &ctx, "frobnicate(1)").expect_err("unknown function");
    assert_eq!(error.kind, ErrorKind::ValidationError);
    assert_eq!(error.code, "EVAL_UNKNOWN_FUNCTION");
}

#[tokio::test]
async fn nested_loop_break_only_leaves_the_inner_loop() {
    let (evaluator, mut ctx, _) = context(&RuntimeOptions::default());
    let outcome = run(
        &evaluator,
        &mut ctx,
        "repeat for x in [1, 2]
           repeat for y in [1, 2, 3]
             if y is 3 break end
             increment $count
           end
         end",
    )
    .await;
    assert!(outcome.result.is_ok());
    assert_eq!(ctx.global("$count"), Some(Value::Number(4.0)));
    assert!(!ctx.flags.breaking);
    assert!(ctx.errors().is_empty());
}

#[tokio::test]
async fn continue_skips_the_rest_of_the_iteration() {
    let (evaluator, mut ctx, _) = context(&RuntimeOptions::default());
    run(
        &evaluator,
        &mut ctx,
        "repeat for n in [1, 2, 3, 4, 5]
           if n mod 2 is 0 continue end
           increment $odd
         end",
    )
    .await;
    assert_eq!(ctx.global("$odd"), Some(Value::Number(3.0)));
    assert!(!ctx.flags.continuing);
}

#[tokio::test]
async fn return_is_absorbed_at_the_function_boundary() {
    let (evaluator, mut ctx, _) = context(&RuntimeOptions::default());
    evaluator.define_function(FunctionDef {
        name: "double".to_string(),
        params: vec!["n".to_string()],
        body: hs_parser::parse_commands("return n * 2 then set $unreached to true")
            .expect("body should parse"),
    });
    let outcome = run(&evaluator, &mut ctx, "call double(21) then set $after to it").await;
    assert_eq!(outcome.result, Ok(Value::Number(42.0)));
    assert_eq!(ctx.global("$after"), Some(Value::Number(42.0)));
    assert_eq!(ctx.global("$unreached"), None);
    assert!(!outcome.halted);

    let error = eval(&evaluator, &ctx, "double(2) + 1").expect_err("command function");
    assert_eq!(error.kind, ErrorKind::ContextError);
}

#[tokio::test]
async fn halt_stops_every_remaining_command() {
    let (evaluator, mut ctx, _) = context(&RuntimeOptions::default());
    let outcome = run(
        &evaluator,
        &mut ctx,
        "set $a to 1 then repeat 3 times halt end then set $a to 2",
    )
    .await;
    assert!(outcome.halted);
    assert_eq!(outcome.result, Ok(Value::Undefined));
    assert_eq!(ctx.global("$a"), Some(Value::Number(1.0)));
}

#[tokio::test]
async fn halt_inside_a_function_halts_the_caller() {
    let (evaluator, mut ctx, _) = context(&RuntimeOptions::default());
    evaluator.define_function(FunctionDef {
        name: "stop".to_string(),
        params: Vec::new(),
        body: hs_parser::parse_commands("halt").expect("body should parse"),
    });
    let outcome = run(&evaluator, &mut ctx, "call stop() then set $after to 1").await;
    assert!(outcome.halted);
    assert_eq!(ctx.global("$after"), None);
}

#[tokio::test]
async fn unknown_command_reports_a_suggestion_and_continues() {
    let (evaluator, mut ctx, ids) = context(&RuntimeOptions::default());
    run(&evaluator, &mut ctx, "ad .x then add .y").await;
    let errors = ctx.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::ValidationError);
    assert_eq!(errors[0].code, "EVAL_UNKNOWN_COMMAND");
    assert!(errors[0].suggestions.iter().any(|hint| hint.contains("'add'")));
    assert!(errors[0].span.is_some());
    assert!(ctx.dom().read(|doc| doc.has_class(ids.a, "y")));
}

#[tokio::test]
async fn failed_command_is_skipped_under_the_continue_policy() {
    let (evaluator, mut ctx, _) = context(&RuntimeOptions::default());
    let outcome = run(
        &evaluator,
        &mut ctx,
        "set $a to 1 then set $b to 10 / 0 then set $c to 3",
    )
    .await;
    assert!(outcome.result.is_ok());
    assert_eq!(ctx.global("$c"), Some(Value::Number(3.0)));
    assert_eq!(ctx.global("$b"), None);
    let errors = ctx.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, "EVAL_DIVISION_BY_ZERO");
}

#[tokio::test]
async fn abort_policy_ends_the_sequence_at_the_first_error() {
    let options = RuntimeOptions {
        error_policy: ErrorPolicy::Abort,
        ..RuntimeOptions::default()
    };
    let (evaluator, mut ctx, _) = context(&options);
    let outcome = run(
        &evaluator,
        &mut ctx,
        "set $a to 1 then set $b to 10 / 0 then set $c to 3",
    )
    .await;
    let error = outcome.result.expect_err("abort policy should fail");
    assert_eq!(error.kind, ErrorKind::RuntimeError);
    assert!(error.span.is_some());
    assert_eq!(ctx.global("$a"), Some(Value::Number(1.0)));
    assert_eq!(ctx.global("$c"), None);
}

#[tokio::test]
async fn tell_scopes_you_and_keeps_locals_in_the_child() {
    let (evaluator, mut ctx, ids) = context(&RuntimeOptions::default());
    run(
        &evaluator,
        &mut ctx,
        "set x to 1
         tell #b
           add .told
           set x to 2
           set $seen to x
           set $you to you
         end
         set $after to x",
    )
    .await;
    assert!(ctx.errors().is_empty(), "{:?}", ctx.errors());
    assert_eq!(ctx.global("$seen"), Some(Value::Number(2.0)));
    assert_eq!(ctx.global("$after"), Some(Value::Number(1.0)));
    assert_eq!(ctx.global("$you"), Some(Value::Element(ids.b)));
    ctx.dom().read(|doc| {
        assert!(doc.has_class(ids.b, "told"));
        assert!(!doc.has_class(ids.a, "told"));
    });
}

#[tokio::test]
async fn repeat_is_guarded_by_the_iteration_limit() {
    let options = RuntimeOptions {
        max_loop_iterations: 5,
        error_policy: ErrorPolicy::Abort,
        ..RuntimeOptions::default()
    };
    let (evaluator, mut ctx, _) = context(&options);
    let outcome = run(&evaluator, &mut ctx, "repeat forever increment $n end").await;
    let error = outcome.result.expect_err("loop limit");
    assert_eq!(error.code, "CMD_LOOP_LIMIT");
    assert_eq!(ctx.global("$n"), Some(Value::Number(5.0)));
}

#[tokio::test]
async fn stray_break_ends_a_handler_body_quietly() {
    let (evaluator, mut ctx, _) = context(&RuntimeOptions::default());
    let outcome = run(&evaluator, &mut ctx, "set $a to 1 then break then set $a to 2").await;
    assert!(outcome.result.is_ok());
    assert!(!outcome.halted);
    assert!(!ctx.flags.breaking);
    assert_eq!(ctx.global("$a"), Some(Value::Number(1.0)));
}

#[tokio::test]
async fn array_index_writes_replace_or_append_and_reject_gaps() {
    let (evaluator, mut ctx, _) = context(&RuntimeOptions::default());
    let outcome = run(
        &evaluator,
        &mut ctx,
        concat!(
            "set $arr to [1] then set $arr[0] to 5 then set $arr[1] to 6 ",
            "then set $arr[100000000000000000000] to 1 then set $arr[3] to 1",
        ),
    )
    .await;
    assert!(outcome.result.is_ok());
    assert_eq!(
        ctx.global("$arr"),
        Some(Value::Array(vec![Value::Number(5.0), Value::Number(6.0)]))
    );
    let errors = ctx.errors();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|error| error.code == "EVAL_BAD_INDEX"));
    assert_eq!(errors[0].kind, ErrorKind::InvalidArgument);
}

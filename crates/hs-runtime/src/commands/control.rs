use futures_util::future::{FutureExt, LocalBoxFuture};
use hs_core::{CommandNode, CommandResult, Completion, ControlSignal, ErrorDescriptor, Value};

use super::{ready, require_args};
use crate::context::ExecutionContext;
use crate::protocol::{ArgMode, Command, CommandInput, ValidationReport};
use crate::resolver::resolve_targets;

pub struct IfCommand;

impl Command for IfCommand {
    fn name(&self) -> &'static str {
        "if"
    }

    fn arg_mode(&self) -> ArgMode {
        ArgMode::Lazy
    }

    fn validate(&self, node: &CommandNode) -> ValidationReport {
        require_args(node, 1, "if <condition> <commands> [else <commands>] end")
    }

    fn execute<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        input: CommandInput<'a>,
    ) -> LocalBoxFuture<'a, CommandResult> {
        async move {
            let Some(condition) = input.node.args.first() else {
                return Ok(Completion::undefined());
            };
            let branch = if input.evaluator.evaluate(condition, ctx)?.is_truthy() {
                input.node.blocks.first()
            } else {
                input.node.blocks.get(1)
            };
            match branch {
                Some(commands) => input.evaluator.run_sequence(commands, ctx).await,
                None => Ok(Completion::undefined()),
            }
        }
        .boxed_local()
    }
}

enum LoopSource {
    Items { variable: Option<String>, items: Vec<Value> },
    Times(usize),
    While(bool),
    Forever,
}

fn iterable_items(value: Value) -> Result<Vec<Value>, ErrorDescriptor> {
    match value {
        Value::Array(items) => Ok(items),
        Value::ElementList(ids) => Ok(ids.into_iter().map(Value::Element).collect()),
        Value::String(text) => Ok(text.chars().map(|ch| Value::String(ch.to_string())).collect()),
        Value::Object(entries) => Ok(entries.into_keys().map(Value::String).collect()),
        Value::Null | Value::Undefined => Ok(Vec::new()),
        other => Err(ErrorDescriptor::type_mismatch(
            "CMD_NOT_ITERABLE",
            format!("Cannot repeat over {}.", other.type_name()),
        )
        .suggest("Loop over an array, element list, string or object.")),
    }
}

/// `repeat for x in ...`, `repeat in ...`, `repeat N times`, `repeat while|until ...`,
/// `repeat forever`. Absorbs `break`/`continue`; other signals leave the loop.
pub struct RepeatCommand;

impl Command for RepeatCommand {
    fn name(&self) -> &'static str {
        "repeat"
    }

    fn arg_mode(&self) -> ArgMode {
        ArgMode::Lazy
    }

    fn validate(&self, node: &CommandNode) -> ValidationReport {
        let forms = ["in", "times", "while", "until", "forever"];
        if forms.iter().any(|form| node.modifiers.contains_key(*form)) {
            return ValidationReport::ok();
        }
        let mut report = ValidationReport::error(ErrorDescriptor::missing_argument(
            "CMD_REPEAT_FORM",
            "'repeat' needs a loop form.",
        ));
        report.suggestions.extend(
            [
                "repeat for x in <expr>",
                "repeat 3 times",
                "repeat while <cond>",
                "repeat until <cond>",
                "repeat forever",
            ]
            .map(String::from),
        );
        report
    }

    fn execute<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        input: CommandInput<'a>,
    ) -> LocalBoxFuture<'a, CommandResult> {
        async move {
            let node = input.node;
            let evaluator = input.evaluator;
            let body = node.blocks.first().map(Vec::as_slice).unwrap_or_default();
            let limit = evaluator.options().max_loop_iterations;

            let source = if let Some(items) = node.modifiers.get("in") {
                let variable = match node.args.first() {
                    Some(hs_core::Node::Identifier { name }) => Some(name.clone()),
                    _ => None,
                };
                LoopSource::Items {
                    variable,
                    items: iterable_items(evaluator.evaluate(items, ctx)?)?,
                }
            } else if let Some(count) = node.modifiers.get("times") {
                let value = evaluator.evaluate(count, ctx)?;
                match value.to_number() {
                    Some(count) if count >= 0.0 => LoopSource::Times(count.floor() as usize),
                    _ => {
                        return Err(ErrorDescriptor::invalid_argument(
                            "CMD_BAD_COUNT",
                            format!("'{}' is not a valid repeat count.", value.to_text()),
                        ))
                    }
                }
            } else if node.modifiers.contains_key("while") {
                LoopSource::While(true)
            } else if node.modifiers.contains_key("until") {
                LoopSource::While(false)
            } else {
                LoopSource::Forever
            };

            let mut iteration = 0usize;
            loop {
                let proceed = match &source {
                    LoopSource::Items { variable, items } => match items.get(iteration) {
                        Some(item) => {
                            if let Some(variable) = variable {
                                ctx.set_local(variable, item.clone());
                            }
                            ctx.set_result(item.clone());
                            true
                        }
                        None => false,
                    },
                    LoopSource::Times(count) => iteration < *count,
                    LoopSource::While(expected) => {
                        let keyword = if *expected { "while" } else { "until" };
                        match node.modifiers.get(keyword) {
                            Some(condition) => {
                                evaluator.evaluate(condition, ctx)?.is_truthy() == *expected
                            }
                            None => false,
                        }
                    }
                    LoopSource::Forever => true,
                };
                if !proceed {
                    break;
                }
                if iteration >= limit {
                    return Err(ErrorDescriptor::runtime(
                        "CMD_LOOP_LIMIT",
                        format!("'repeat' exceeded {} iterations.", limit),
                    )
                    .suggest("Add a break condition, or raise maxLoopIterations."));
                }
                iteration += 1;

                match evaluator.run_sequence(body, ctx).await? {
                    Completion::Normal(_) => {}
                    Completion::Signal(ControlSignal::Break) => {
                        ctx.flags.clear_loop_signal();
                        break;
                    }
                    Completion::Signal(ControlSignal::Continue) => {
                        ctx.flags.clear_loop_signal();
                    }
                    signal => return Ok(signal),
                }
            }
            Ok(Completion::undefined())
        }
        .boxed_local()
    }
}

/// Runs its block once per resolved target with `you` bound to that target.
pub struct TellCommand;

impl Command for TellCommand {
    fn name(&self) -> &'static str {
        "tell"
    }

    fn arg_mode(&self) -> ArgMode {
        ArgMode::Lazy
    }

    fn validate(&self, node: &CommandNode) -> ValidationReport {
        require_args(node, 1, "tell <target> <commands> end")
    }

    fn execute<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        input: CommandInput<'a>,
    ) -> LocalBoxFuture<'a, CommandResult> {
        async move {
            let Some(target) = input.node.args.first() else {
                return Ok(Completion::undefined());
            };
            let body = input.node.blocks.first().map(Vec::as_slice).unwrap_or_default();
            let targets = resolve_targets(ctx, &input.evaluator.evaluate(target, ctx)?);
            for told in &targets {
                let mut child = ctx.derive_told(*told);
                let completion = input.evaluator.run_sequence(body, &mut child).await?;
                if let Completion::Signal(signal) = completion {
                    ctx.flags.record(&signal);
                    return Ok(Completion::Signal(signal));
                }
            }
            Ok(Completion::Normal(Value::ElementList(targets)))
        }
        .boxed_local()
    }
}

/// Commands whose whole job is to raise a control signal.
macro_rules! signal_command {
    ($command:ident, $name:literal, $signal:expr) => {
        pub struct $command;

        impl Command for $command {
            fn name(&self) -> &'static str {
                $name
            }

            fn execute<'a>(
                &'a self,
                _ctx: &'a mut ExecutionContext,
                _input: CommandInput<'a>,
            ) -> LocalBoxFuture<'a, CommandResult> {
                ready(Ok(Completion::Signal($signal)))
            }
        }
    };
}

signal_command!(BreakCommand, "break", ControlSignal::Break);
signal_command!(ContinueCommand, "continue", ControlSignal::Continue);
signal_command!(HaltCommand, "halt", ControlSignal::Halt);
signal_command!(ExitCommand, "exit", ControlSignal::Return(Value::Undefined));

pub struct ReturnCommand;

impl Command for ReturnCommand {
    fn name(&self) -> &'static str {
        "return"
    }

    fn execute<'a>(
        &'a self,
        _ctx: &'a mut ExecutionContext,
        input: CommandInput<'a>,
    ) -> LocalBoxFuture<'a, CommandResult> {
        let value = input.arg(0).cloned().unwrap_or_default();
        ready(Ok(Completion::Signal(ControlSignal::Return(value))))
    }
}

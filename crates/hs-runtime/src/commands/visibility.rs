use futures_util::future::LocalBoxFuture;
use hs_core::{CommandResult, Completion, Value};

use super::{ready, value_targets_or_default};
use crate::context::ExecutionContext;
use crate::protocol::{Command, CommandInput};

/// `hide [<target>]`: inline `display: none`.
pub struct HideCommand;

impl Command for HideCommand {
    fn name(&self) -> &'static str {
        "hide"
    }

    fn execute<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        input: CommandInput<'a>,
    ) -> LocalBoxFuture<'a, CommandResult> {
        ready(set_display(ctx, &input, "hidden", "none"))
    }
}

/// `show [<target>]`: drops the inline `display` so the element's own styling applies again.
pub struct ShowCommand;

impl Command for ShowCommand {
    fn name(&self) -> &'static str {
        "show"
    }

    fn execute<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        input: CommandInput<'a>,
    ) -> LocalBoxFuture<'a, CommandResult> {
        ready(set_display(ctx, &input, "shown", ""))
    }
}

fn set_display(
    ctx: &mut ExecutionContext,
    input: &CommandInput<'_>,
    verb: &str,
    display: &str,
) -> CommandResult {
    let command = input.node.name.as_str();
    let targets = value_targets_or_default(ctx, input.arg(0), command)?;
    ctx.dom().write(|doc| {
        for target in &targets {
            doc.set_style_property(*target, "display", display);
            if display.is_empty() {
                doc.remove_attribute(*target, "hidden");
            }
        }
    });
    let result = Value::ElementList(targets.clone());
    input
        .evaluator
        .notifier()
        .notify(ctx, command, verb, &targets, &result);
    Ok(Completion::Normal(result))
}

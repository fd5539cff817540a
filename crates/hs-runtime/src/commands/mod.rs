//! Builtin command catalog. Each command is a unit struct implementing [`Command`].

mod classes;
mod content;
mod control;
mod events;
mod variables;
mod visibility;

use futures_util::future::{self, FutureExt, LocalBoxFuture};
use hs_core::{CommandNode, CommandResult, ElementId, ErrorDescriptor, Node, Value};

use crate::context::ExecutionContext;
use crate::evaluator::Evaluator;
use crate::protocol::{Command, CommandRegistry, ValidationReport};
use crate::resolver::resolve_targets;

pub use classes::{AddCommand, RemoveCommand, ToggleCommand};
pub use content::{GetCommand, LogCommand, PutCommand};
pub use control::{
    BreakCommand, ContinueCommand, ExitCommand, HaltCommand, IfCommand, RepeatCommand,
    ReturnCommand, TellCommand,
};
pub use events::{SendCommand, WaitCommand};
pub use variables::{IncrementCommand, SetCommand};
pub use visibility::{HideCommand, ShowCommand};

pub fn register_builtins(registry: &mut CommandRegistry) {
    registry.register(AddCommand);
    registry.register(RemoveCommand);
    registry.register(ToggleCommand);
    registry.register(PutCommand);
    registry.register(GetCommand::named("get"));
    registry.register(GetCommand::named("call"));
    registry.register(LogCommand);
    registry.register(SetCommand);
    registry.register(IncrementCommand::increment());
    registry.register(IncrementCommand::decrement());
    registry.register(HideCommand);
    registry.register(ShowCommand);
    registry.register(WaitCommand);
    registry.register(SendCommand::named("send"));
    registry.register(SendCommand::named("trigger"));
    registry.register(IfCommand);
    registry.register(RepeatCommand);
    registry.register(TellCommand);
    registry.register(BreakCommand);
    registry.register(ContinueCommand);
    registry.register(ReturnCommand);
    registry.register(ExitCommand);
    registry.register(HaltCommand);
}

/// Wraps a synchronously computed result for [`Command::execute`].
pub(crate) fn ready<'a>(result: CommandResult) -> LocalBoxFuture<'a, CommandResult> {
    future::ready(result).boxed_local()
}

/// The element a command acts on when the source names none.
pub(crate) fn implicit_target(
    ctx: &ExecutionContext,
    command: &str,
) -> Result<ElementId, ErrorDescriptor> {
    ctx.implicit_target().ok_or_else(|| {
        ErrorDescriptor::context(
            "CMD_NO_ME",
            format!("'{}' has no target and no 'me' element is set.", command),
        )
        .suggest(format!("Name a target explicitly, e.g. '{} ... to #id'.", command))
    })
}

/// Evaluates an optional target expression, falling back to the implicit target.
/// A target that resolves to nothing yields an empty list; callers decide if that is an error.
pub(crate) fn targets_or_default(
    ctx: &ExecutionContext,
    evaluator: &Evaluator,
    node: Option<&Node>,
    command: &str,
) -> Result<Vec<ElementId>, ErrorDescriptor> {
    match node {
        Some(node) => Ok(resolve_targets(ctx, &evaluator.evaluate(node, ctx)?)),
        None => Ok(vec![implicit_target(ctx, command)?]),
    }
}

/// Same as [`targets_or_default`] for commands whose operands were evaluated eagerly.
pub(crate) fn value_targets_or_default(
    ctx: &ExecutionContext,
    value: Option<&Value>,
    command: &str,
) -> Result<Vec<ElementId>, ErrorDescriptor> {
    match value {
        Some(value) => Ok(resolve_targets(ctx, value)),
        None => Ok(vec![implicit_target(ctx, command)?]),
    }
}

/// Checks that a command received at least `count` positional operands.
pub(crate) fn require_args(node: &CommandNode, count: usize, usage: &str) -> ValidationReport {
    if node.args.len() >= count {
        return ValidationReport::ok();
    }
    ValidationReport::error(
        ErrorDescriptor::missing_argument(
            "CMD_MISSING_ARGUMENT",
            format!("'{}' is missing an operand.", node.name),
        )
        .suggest(format!("Usage: {}", usage)),
    )
}

pub(crate) fn require_modifier(node: &CommandNode, keyword: &str, usage: &str) -> ValidationReport {
    if node.modifiers.contains_key(keyword) {
        return ValidationReport::ok();
    }
    ValidationReport::error(
        ErrorDescriptor::missing_argument(
            "CMD_MISSING_ARGUMENT",
            format!("'{}' needs a '{}' clause.", node.name, keyword),
        )
        .suggest(format!("Usage: {}", usage)),
    )
}

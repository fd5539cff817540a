use futures_util::future::LocalBoxFuture;
use hs_core::{CommandNode, CommandResult, Completion, ErrorDescriptor, Value};

use super::{ready, require_args, require_modifier};
use crate::context::ExecutionContext;
use crate::protocol::{ArgMode, Command, CommandInput, ValidationReport};

pub struct SetCommand;

impl Command for SetCommand {
    fn name(&self) -> &'static str {
        "set"
    }

    fn arg_mode(&self) -> ArgMode {
        ArgMode::Lazy
    }

    fn validate(&self, node: &CommandNode) -> ValidationReport {
        let usage = "set <place> to <value>";
        let mut report = require_args(node, 1, usage);
        report.errors.extend(require_modifier(node, "to", usage).errors);
        report
    }

    fn execute<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        input: CommandInput<'a>,
    ) -> LocalBoxFuture<'a, CommandResult> {
        ready(set(ctx, &input))
    }
}

fn set(ctx: &mut ExecutionContext, input: &CommandInput<'_>) -> CommandResult {
    let (Some(place), Some(value_node)) = (input.node.args.first(), input.modifier_node("to")) else {
        return Ok(Completion::undefined());
    };
    let value = input.evaluator.evaluate(value_node, ctx)?;
    let changed = input.evaluator.assign(place, value.clone(), ctx)?;
    input
        .evaluator
        .notifier()
        .notify(ctx, "set", "set", &changed, &value);
    Ok(Completion::Normal(value))
}

/// `increment` and `decrement`. A missing or null place counts as zero.
pub struct IncrementCommand {
    name: &'static str,
    verb: &'static str,
    sign: f64,
}

impl IncrementCommand {
    pub fn increment() -> Self {
        Self {
            name: "increment",
            verb: "incremented",
            sign: 1.0,
        }
    }

    pub fn decrement() -> Self {
        Self {
            name: "decrement",
            verb: "decremented",
            sign: -1.0,
        }
    }

    fn number(&self, value: &Value, role: &str) -> Result<f64, ErrorDescriptor> {
        if value.is_nullish() {
            return Ok(0.0);
        }
        value.to_number().ok_or_else(|| {
            ErrorDescriptor::type_mismatch(
                "CMD_NOT_A_NUMBER",
                format!(
                    "'{}' needs a numeric {} but got {} ({}).",
                    self.name,
                    role,
                    value.type_name(),
                    value.to_text()
                ),
            )
        })
    }
}

impl Command for IncrementCommand {
    fn name(&self) -> &'static str {
        self.name
    }

    fn arg_mode(&self) -> ArgMode {
        ArgMode::Lazy
    }

    fn validate(&self, node: &CommandNode) -> ValidationReport {
        require_args(node, 1, &format!("{} <place> [by <amount>]", self.name))
    }

    fn execute<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        input: CommandInput<'a>,
    ) -> LocalBoxFuture<'a, CommandResult> {
        ready(self.step(ctx, &input))
    }
}

impl IncrementCommand {
    fn step(&self, ctx: &mut ExecutionContext, input: &CommandInput<'_>) -> CommandResult {
        let Some(place) = input.node.args.first() else {
            return Ok(Completion::undefined());
        };
        let current = self.number(&input.evaluator.evaluate(place, ctx)?, "value")?;
        let step = match input.modifier_node("by") {
            Some(amount) => self.number(&input.evaluator.evaluate(amount, ctx)?, "amount")?,
            None => 1.0,
        };
        let next = current + self.sign * step;
        if !next.is_finite() {
            return Err(ErrorDescriptor::runtime(
                "CMD_NUMBER_OVERFLOW",
                format!("'{}' overflowed.", self.name),
            ));
        }
        let value = Value::Number(next);
        let changed = input.evaluator.assign(place, value.clone(), ctx)?;
        input
            .evaluator
            .notifier()
            .notify(ctx, self.name, self.verb, &changed, &value);
        Ok(Completion::Normal(value))
    }
}

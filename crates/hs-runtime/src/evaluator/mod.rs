mod operators;
mod places;
mod properties;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use futures_util::future::{FutureExt, LocalBoxFuture};
use hs_core::{
    CommandNode, CommandResult, Completion, ControlSignal, ErrorDescriptor, EvalResult,
    FunctionRef, Node, Positional, Value,
};
use log::{debug, warn};

use crate::context::ExecutionContext;
use crate::notify::Notifier;
use crate::options::{ErrorPolicy, RuntimeOptions};
use crate::protocol::{similar_names, ArgMode, CommandInput, CommandRegistry, ExpressionRegistry};
use crate::resolver::resolve_targets;

pub use operators::{apply_binary, apply_unary};
pub use properties::{get_property, index_value, set_element_property};
pub(crate) use properties::replace_inner_html;

/// A `def` feature: named parameters and a command body.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<CommandNode>,
}

/// How a handler or function body ended once its boundary absorbed any `return`.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryOutcome {
    pub result: EvalResult,
    pub halted: bool,
}

/// Walks command sequences and expression trees against an [`ExecutionContext`].
pub struct Evaluator {
    commands: CommandRegistry,
    expressions: ExpressionRegistry,
    functions: RefCell<BTreeMap<String, Rc<FunctionDef>>>,
    options: RuntimeOptions,
    notifier: Notifier,
}

impl Evaluator {
    pub fn new(options: RuntimeOptions) -> Self {
        Self::with_registries(
            options,
            CommandRegistry::with_builtins(),
            ExpressionRegistry::with_builtins(),
        )
    }

    pub fn with_registries(
        options: RuntimeOptions,
        commands: CommandRegistry,
        expressions: ExpressionRegistry,
    ) -> Self {
        Self {
            commands,
            expressions,
            functions: RefCell::new(BTreeMap::new()),
            notifier: Notifier::from_options(&options),
            options,
        }
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn define_function(&self, function: FunctionDef) {
        debug!("defined function {}", function.name);
        self.functions
            .borrow_mut()
            .insert(function.name.clone(), Rc::new(function));
    }

    pub fn function(&self, name: &str) -> Option<Rc<FunctionDef>> {
        self.functions.borrow().get(name).cloned()
    }

    // Expressions

    pub fn evaluate(&self, node: &Node, ctx: &ExecutionContext) -> EvalResult {
        match node {
            Node::Literal { value } => Ok(Value::from_literal(value)),
            Node::Identifier { name } => Ok(self.resolve_identifier(name, ctx)),
            Node::ClassRef { name } => Ok(Value::ElementList(resolve_targets(
                ctx,
                &Value::string(format!(".{}", name)),
            ))),
            Node::IdRef { id } => Ok(resolve_targets(ctx, &Value::string(format!("#{}", id)))
                .first()
                .copied()
                .map(Value::Element)
                .unwrap_or(Value::Null)),
            Node::Query { selector } => Ok(Value::ElementList(resolve_targets(
                ctx,
                &Value::string(selector.clone()),
            ))),
            Node::AttributeRef { name } => Ok(match ctx.implicit_target() {
                Some(target) => get_property(ctx, &Value::Element(target), &format!("@{}", name)),
                None => Value::Undefined,
            }),
            Node::Property { object, name } => {
                let base = self.evaluate(object, ctx)?;
                Ok(get_property(ctx, &base, name))
            }
            Node::Index { object, index } => {
                let base = self.evaluate(object, ctx)?;
                let index = self.evaluate(index, ctx)?;
                Ok(index_value(&base, &index))
            }
            Node::Array { items } => Ok(Value::Array(self.evaluate_all(items, ctx)?)),
            Node::Object { entries } => {
                let mut object = BTreeMap::new();
                for (key, value) in entries {
                    object.insert(key.clone(), self.evaluate(value, ctx)?);
                }
                Ok(Value::Object(object))
            }
            Node::Unary { op, operand } => apply_unary(*op, &self.evaluate(operand, ctx)?),
            Node::Binary { op, left, right } if op.is_logical() => {
                let left = self.evaluate(left, ctx)?.is_truthy();
                let decided = match op {
                    hs_core::BinaryOp::And => !left,
                    _ => left,
                };
                if decided {
                    return Ok(Value::Boolean(left));
                }
                Ok(Value::Boolean(self.evaluate(right, ctx)?.is_truthy()))
            }
            Node::Binary { op, left, right } => {
                let left = self.evaluate(left, ctx)?;
                let right = self.evaluate(right, ctx)?;
                apply_binary(ctx, *op, &left, &right)
            }
            Node::Call { callee, args } => self.call_expression(callee, args, ctx),
            Node::Closest { selector } => {
                let Some(start) = ctx.implicit_target() else {
                    return Ok(Value::Null);
                };
                let selector = crate::resolver::normalize_selector(selector);
                let found = ctx.dom().read(|doc| doc.closest(start, selector))?;
                Ok(found.map(Value::Element).unwrap_or(Value::Null))
            }
            Node::Positional { which, source } => {
                let source = self.evaluate(source, ctx)?;
                let name = match which {
                    Positional::First => "first",
                    Positional::Last => "last",
                };
                Ok(get_property(ctx, &source, name))
            }
        }
    }

    pub fn evaluate_all(&self, nodes: &[Node], ctx: &ExecutionContext) -> EvalResult<Vec<Value>> {
        nodes.iter().map(|node| self.evaluate(node, ctx)).collect()
    }

    fn resolve_identifier(&self, name: &str, ctx: &ExecutionContext) -> Value {
        let value = ctx.resolve(name);
        if !matches!(value, Value::Undefined) || ExecutionContext::is_special_name(name) {
            return value;
        }
        if self.function(name).is_some() || self.expressions.get(name).is_some() {
            return Value::Function(FunctionRef {
                name: name.to_string(),
            });
        }
        value
    }

    fn call_expression(&self, callee: &str, args: &[Node], ctx: &ExecutionContext) -> EvalResult {
        if let Some(expression) = self.expressions.get(callee) {
            expression.validate(args).into_result()?;
            let values = self.evaluate_all(args, ctx)?;
            return expression.evaluate(ctx, &values);
        }
        if self.function(callee).is_some() {
            return Err(ErrorDescriptor::context(
                "EVAL_COMMAND_FUNCTION",
                format!("'{}' runs commands and can only be invoked by 'call' or 'get'.", callee),
            )
            .suggest(format!("call {}(...)", callee)));
        }
        let mut known = self.expressions.names();
        known.extend(self.functions.borrow().keys().cloned());
        let suggestions = similar_names(callee, known.iter().map(String::as_str));
        Err(ErrorDescriptor::validation(
            "EVAL_UNKNOWN_FUNCTION",
            format!("Unknown function '{}'.", callee),
        )
        .suggest_all(suggestions.into_iter().map(|name| format!("Did you mean '{}'?", name))))
    }

    /// Evaluates `node`, running a `def` function when the node calls or names one.
    pub fn evaluate_invocation<'a>(
        &'a self,
        node: &'a Node,
        ctx: &'a ExecutionContext,
    ) -> LocalBoxFuture<'a, CommandResult> {
        async move {
            if let Node::Call { callee, args } = node {
                if self.function(callee).is_some() {
                    let values = self.evaluate_all(args, ctx)?;
                    return self.call_function(callee, values, ctx).await;
                }
            }
            let value = self.evaluate(node, ctx)?;
            if let Value::Function(function) = &value {
                if self.function(&function.name).is_some() {
                    return self.call_function(&function.name, Vec::new(), ctx).await;
                }
            }
            Ok(Completion::Normal(value))
        }
        .boxed_local()
    }

    // Commands

    /// Runs commands in source order. Signals stop the sequence and are handed to the caller;
    /// failed commands are recorded and skipped unless the policy is [`ErrorPolicy::Abort`].
    pub fn run_sequence<'a>(
        &'a self,
        commands: &'a [CommandNode],
        ctx: &'a mut ExecutionContext,
    ) -> LocalBoxFuture<'a, CommandResult> {
        async move {
            ctx.flags.begin_frame();
            let mut last = Value::Undefined;
            for command in commands {
                if ctx.flags.halted {
                    return Ok(Completion::Signal(ControlSignal::Halt));
                }
                match self.execute_command(command, ctx).await {
                    Ok(Completion::Normal(value)) => last = value,
                    Ok(Completion::Signal(signal)) => {
                        debug!("{} signal raised by '{}'", signal.name(), command.source);
                        ctx.flags.record(&signal);
                        return Ok(Completion::Signal(signal));
                    }
                    Err(error) => match self.options.error_policy {
                        ErrorPolicy::Continue => {
                            warn!("'{}' failed and was skipped: {}", command.source, error);
                            ctx.report_error(error);
                        }
                        ErrorPolicy::Abort => return Err(error),
                    },
                }
            }
            Ok(Completion::Normal(last))
        }
        .boxed_local()
    }

    /// Looks up, validates and executes one command. A non-undefined result becomes `it`.
    pub fn execute_command<'a>(
        &'a self,
        node: &'a CommandNode,
        ctx: &'a mut ExecutionContext,
    ) -> LocalBoxFuture<'a, CommandResult> {
        async move {
            let command = self.lookup_command(node)?;
            command
                .validate(node)
                .into_result()
                .map_err(|error| with_command_span(error, node))?;
            debug!("dispatch {}: {}", node.name, node.source);

            let (args, modifiers) = match command.arg_mode() {
                ArgMode::Lazy => (Vec::new(), BTreeMap::new()),
                ArgMode::Eager => {
                    let args = self
                        .evaluate_all(&node.args, ctx)
                        .map_err(|error| with_command_span(error, node))?;
                    let mut modifiers = BTreeMap::new();
                    for (keyword, modifier) in &node.modifiers {
                        let value = self
                            .evaluate(modifier, ctx)
                            .map_err(|error| with_command_span(error, node))?;
                        modifiers.insert(keyword.clone(), value);
                    }
                    (args, modifiers)
                }
            };
            let input = CommandInput {
                node,
                args,
                modifiers,
                evaluator: self,
            };
            let completion = command
                .execute(ctx, input)
                .await
                .map_err(|error| with_command_span(error, node))?;
            if let Completion::Normal(value) = &completion {
                if !matches!(value, Value::Undefined) {
                    ctx.set_result(value.clone());
                }
            }
            Ok(completion)
        }
        .boxed_local()
    }

    fn lookup_command(
        &self,
        node: &CommandNode,
    ) -> Result<Rc<dyn crate::protocol::Command>, ErrorDescriptor> {
        if let Some(command) = self.commands.get(&node.name) {
            return Ok(command);
        }
        let names = self.commands.names();
        let suggestions = similar_names(&node.name, names.iter().map(String::as_str));
        Err(with_command_span(
            ErrorDescriptor::validation(
                "EVAL_UNKNOWN_COMMAND",
                format!("Unknown command '{}'.", node.name),
            )
            .suggest_all(suggestions.into_iter().map(|name| format!("Did you mean '{}'?", name))),
            node,
        ))
    }

    /// Runs a handler or function body. `return` is consumed here; stray `break`/`continue`
    /// simply end the body.
    pub async fn run_to_boundary(
        &self,
        body: &[CommandNode],
        ctx: &mut ExecutionContext,
    ) -> BoundaryOutcome {
        let result = match self.run_sequence(body, ctx).await {
            Ok(Completion::Normal(_)) => Ok(ctx.it.clone()),
            Ok(Completion::Signal(ControlSignal::Return(value))) => {
                ctx.flags.returning = false;
                Ok(value)
            }
            Ok(Completion::Signal(ControlSignal::Halt)) => Ok(Value::Undefined),
            Ok(Completion::Signal(_)) => {
                ctx.flags.clear_loop_signal();
                Ok(ctx.it.clone())
            }
            Err(error) => Err(error),
        };
        BoundaryOutcome {
            result,
            halted: ctx.flags.halted,
        }
    }

    /// Calls a `def` function in a fresh frame. `halt` inside the body halts the caller too.
    pub fn call_function<'a>(
        &'a self,
        name: &'a str,
        args: Vec<Value>,
        ctx: &'a ExecutionContext,
    ) -> LocalBoxFuture<'a, CommandResult> {
        async move {
            let Some(function) = self.function(name) else {
                return Err(ErrorDescriptor::validation(
                    "EVAL_UNKNOWN_FUNCTION",
                    format!("Unknown function '{}'.", name),
                ));
            };
            let mut params = BTreeMap::new();
            let mut args = args.into_iter();
            for param in &function.params {
                params.insert(param.clone(), args.next().unwrap_or_default());
            }
            let mut frame = ctx.derive_call(params);
            debug!("call {}", name);
            let outcome = self.run_to_boundary(&function.body, &mut frame).await;
            if outcome.halted {
                return Ok(Completion::Signal(ControlSignal::Halt));
            }
            outcome.result.map(Completion::Normal)
        }
        .boxed_local()
    }
}

fn with_command_span(mut error: ErrorDescriptor, node: &CommandNode) -> ErrorDescriptor {
    if error.span.is_none() {
        error.span = node.span.clone();
    }
    error
}

#[cfg(test)]
mod evaluator_tests;
